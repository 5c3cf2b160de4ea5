//! Search Match Model

use serde::{Deserialize, Serialize};

/// Location of one search hit
///
/// `start_index..end_index` is a half-open byte range into the text of
/// `content[part_index]` of the line numbered `line_number`. Both ends always
/// fall on `char` boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub line_number: usize,
    pub part_index: usize,
    pub start_index: usize,
    pub end_index: usize,
}

impl Match {
    /// Length of the matched range in bytes
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    /// True for a zero-width range
    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }
}
