//! Core data models for lazylog
//!
//! Plain data shared by the processing pipeline and the rendering layer:
//! styled spans, numbered log lines and search matches.

pub mod log_line;
pub mod search_match;
pub mod styled_span;

// Re-exports for convenience
pub use log_line::LogLine;
pub use search_match::Match;
pub use styled_span::{AnsiColor, SpanStyle, StyledSpan};
