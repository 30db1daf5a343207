use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fetched post as handed over by the forum client.
#[derive(Debug, Clone, PartialEq)]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub permalink: String,
    pub subreddit: String,
    pub score: i64,
}

/// Ranking window for "top" listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeFilter {
    pub const ALL_VALUES: [TimeFilter; 6] = [
        TimeFilter::Hour,
        TimeFilter::Day,
        TimeFilter::Week,
        TimeFilter::Month,
        TimeFilter::Year,
        TimeFilter::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Hour => "hour",
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
            TimeFilter::All => "all",
        }
    }
}

impl Default for TimeFilter {
    fn default() -> Self {
        TimeFilter::All
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        TimeFilter::ALL_VALUES
            .into_iter()
            .find(|filter| filter.as_str() == normalized)
            .ok_or_else(|| {
                CoreError::invalid_input(format!(
                    "time_filter must be one of [hour, day, week, month, year, all], got '{}'",
                    s
                ))
            })
    }
}

/// Closed three-way sentiment taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Maps a raw classifier label onto the taxonomy by case-insensitive prefix.
    pub fn from_raw_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if label.starts_with("pos") {
            Sentiment::Positive
        } else if label.starts_with("neg") {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    pub fn record(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

impl FromIterator<Sentiment> for SentimentCounts {
    fn from_iter<I: IntoIterator<Item = Sentiment>>(iter: I) -> Self {
        let mut counts = SentimentCounts::default();
        for sentiment in iter {
            counts.record(sentiment);
        }
        counts
    }
}

/// One row of the analysis dataset, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub post_id: String,
    pub title: String,
    pub combined_text: String,
    pub url: String,
    pub subreddit: String,
    pub reddit_score: i64,
}

impl PostRecord {
    pub fn into_output(self, sentiment: Sentiment, confidence: f64) -> PostOut {
        PostOut {
            post_id: self.post_id,
            title: self.title,
            url: self.url,
            subreddit: self.subreddit,
            reddit_score: self.reddit_score,
            sentiment,
            confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostOut {
    pub post_id: String,
    pub title: String,
    pub url: String,
    pub subreddit: String,
    pub reddit_score: i64,
    pub sentiment: Sentiment,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub query: String,
    pub subreddit: String,
    pub time_filter: TimeFilter,
    pub counts: SentimentCounts,
    pub posts: Vec<PostOut>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping_uses_prefixes() {
        assert_eq!(Sentiment::from_raw_label("POSITIVE"), Sentiment::Positive);
        assert_eq!(Sentiment::from_raw_label("positive"), Sentiment::Positive);
        assert_eq!(Sentiment::from_raw_label("Pos"), Sentiment::Positive);
        assert_eq!(Sentiment::from_raw_label("NEGATIVE"), Sentiment::Negative);
        assert_eq!(Sentiment::from_raw_label("neg"), Sentiment::Negative);
    }

    #[test]
    fn test_unknown_labels_default_to_neutral() {
        for label in ["LABEL_1", "neutral", "", "mixed", "  ", "xpos"] {
            assert_eq!(Sentiment::from_raw_label(label), Sentiment::Neutral, "{label}");
        }
    }

    #[test]
    fn test_counts_sum_to_records() {
        let counts: SentimentCounts = [
            Sentiment::Positive,
            Sentiment::Negative,
            Sentiment::Positive,
            Sentiment::Neutral,
        ]
        .into_iter()
        .collect();

        assert_eq!(counts.positive, 2);
        assert_eq!(counts.negative, 1);
        assert_eq!(counts.neutral, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_counts_serialize_with_all_keys() {
        let json = serde_json::to_value(SentimentCounts::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"positive": 0, "neutral": 0, "negative": 0})
        );
    }

    #[test]
    fn test_time_filter_parsing() {
        assert_eq!("week".parse::<TimeFilter>().unwrap(), TimeFilter::Week);
        assert_eq!(" ALL ".parse::<TimeFilter>().unwrap(), TimeFilter::All);
        assert!("fortnight".parse::<TimeFilter>().is_err());
        assert_eq!(TimeFilter::default().to_string(), "all");
    }

    #[test]
    fn test_post_output_shape() {
        let record = PostRecord {
            post_id: "abc".to_string(),
            title: "Great film".to_string(),
            combined_text: "Great film loved it".to_string(),
            url: "https://www.reddit.com/r/movies/comments/abc/".to_string(),
            subreddit: "movies".to_string(),
            reddit_score: -3,
        };

        let out = record.into_output(Sentiment::Positive, 0.97);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["sentiment"], "positive");
        assert_eq!(json["reddit_score"], -3);
        assert!(json.get("combined_text").is_none());
    }
}
