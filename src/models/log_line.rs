//! Log Line Model
//!
//! Represents a single numbered line of log output, already decoded into
//! styled spans.

use serde::{Deserialize, Serialize};

use super::styled_span::StyledSpan;

/// A numbered, decoded log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// 1-based line number, unique within a processed block
    pub number: usize,

    /// Styled spans in display order
    pub content: Vec<StyledSpan>,
}

impl LogLine {
    /// Create a new log line
    pub fn new(number: usize, content: Vec<StyledSpan>) -> Self {
        Self { number, content }
    }

    /// Create a line holding a single unstyled span
    pub fn plain(number: usize, text: impl Into<String>) -> Self {
        Self::new(number, vec![StyledSpan::plain(text)])
    }

    /// Visible text of the line, spans concatenated
    pub fn plain_text(&self) -> String {
        self.content.iter().map(|span| span.text.as_str()).collect()
    }

    /// Check if any span carries styling
    pub fn has_styling(&self) -> bool {
        self.content.iter().any(|span| !span.style.is_plain())
    }
}
