pub mod config;
pub mod error;
pub mod error_utils;
pub mod text;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use text::{clean_text, truncate_chars};
pub use types::*;
