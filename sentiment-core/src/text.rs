//! Text normalization for post titles, bodies and comments.

use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"http\S+").expect("valid URL pattern"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));
static NUMERIC_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").expect("valid numeric reference pattern")
});

/// Numeric character references to C0 control characters, which the entity decoder
/// leaves as literal text. Whitespace controls become a space, the rest are dropped.
fn strip_control_references(text: &str) -> std::borrow::Cow<'_, str> {
    NUMERIC_REF_RE.replace_all(text, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        match code.and_then(char::from_u32) {
            Some(ch) if (ch as u32) < 32 && ch.is_whitespace() => " ".to_string(),
            Some(ch) if (ch as u32) < 32 => String::new(),
            _ => caps[0].to_string(),
        }
    })
}

/// Normalize raw forum text into a single line.
///
/// Steps, in order: decode HTML entities, drop URL-shaped substrings, remove control
/// characters (anything below U+0020 that is not whitespace), then fold every run of
/// whitespace into one space and trim. Never fails; empty input gives empty output.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let unescaped = html_escape::decode_html_entities(&strip_control_references(text))
        .into_owned();
    let without_urls = URL_RE.replace_all(&unescaped, "");
    // Control whitespace (\n, \t, ...) is left for the fold below.
    let printable: String = without_urls
        .chars()
        .filter(|ch| (*ch as u32) >= 32 || ch.is_whitespace())
        .collect();

    WS_RE.replace_all(&printable, " ").trim().to_string()
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
