//! Line Processing and Wrapping
//!
//! Splits a block of raw text into numbered [`LogLine`]s, decoding ANSI
//! styling per line and optionally wrapping overlong lines into
//! continuation segments.

use serde::{Deserialize, Serialize};

use super::escapes::{split_at_visible, visible_length};
use crate::ansi::AnsiDecoder;
use crate::models::LogLine;

/// Prefix placed in front of every continuation segment of a wrapped line
pub const CONTINUATION_MARKER: &str = "↪ ";

/// Visible columns taken by [`CONTINUATION_MARKER`]
pub const CONTINUATION_WIDTH: usize = 2;

/// Default wrap width used by viewer call sites
pub const DEFAULT_MAX_LINE_LENGTH: usize = 100;

/// Options for [`LineProcessor::process`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessOptions {
    /// Wrap lines longer than `max_line_length` visible characters
    pub wrap: bool,
    /// Wrap width in visible characters
    pub max_line_length: usize,
    /// Number given to the first produced line
    pub start_line_number: usize,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            wrap: false,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            start_line_number: 1,
        }
    }
}

impl ProcessOptions {
    /// Same options, numbering from `start_line_number`
    pub fn starting_at(self, start_line_number: usize) -> Self {
        Self {
            start_line_number,
            ..self
        }
    }
}

/// Turns raw text blocks into numbered, decoded lines
#[derive(Debug, Clone, Default)]
pub struct LineProcessor {
    decoder: AnsiDecoder,
}

impl LineProcessor {
    /// Create a new line processor
    pub fn new() -> Self {
        Self {
            decoder: AnsiDecoder::new(),
        }
    }

    /// Split `text` on `\n` and decode every segment
    ///
    /// Each `\n`-delimited segment (a trailing empty one included) becomes
    /// one line before wrapping. Carriage returns are left in place. Output
    /// line numbers strictly increase until they saturate at `usize::MAX`.
    pub fn process(&self, text: &str, opts: &ProcessOptions) -> Vec<LogLine> {
        let mut lines = Vec::new();
        let mut number = opts.start_line_number;

        for segment in text.split('\n') {
            if opts.wrap && visible_length(segment) > opts.max_line_length {
                let wrapped = self.wrap_segment(segment, opts.max_line_length, number);
                number = number.saturating_add(wrapped.len());
                lines.extend(wrapped);
            } else {
                lines.push(LogLine::new(number, self.decoder.parse(segment)));
                number = number.saturating_add(1);
            }
        }

        lines
    }

    /// Wrap one overlong segment into a head line plus continuation lines
    ///
    /// The head may hold `max_line_length` visible characters, every
    /// continuation `max_line_length - 2` to leave room for the marker.
    /// Both budgets are at least one so each pass consumes input.
    pub fn wrap_segment(&self, segment: &str, max_line_length: usize, first_number: usize) -> Vec<LogLine> {
        let head_budget = max_line_length.max(1);
        let tail_budget = max_line_length.saturating_sub(CONTINUATION_WIDTH).max(1);

        let mut lines = Vec::new();
        let mut remaining = segment.to_string();
        let mut number = first_number;
        let mut first = true;

        while !remaining.is_empty() {
            let budget = if first { head_budget } else { tail_budget };
            let (chunk, rest) = split_at_visible(&remaining, budget);

            // No forward progress: nothing visible left to place
            if visible_length(&chunk) == 0 && !first {
                break;
            }

            let content = if first {
                self.decoder.parse(&chunk)
            } else {
                self.decoder.parse(&format!("{}{}", CONTINUATION_MARKER, chunk))
            };
            lines.push(LogLine::new(number, content));

            number = number.saturating_add(1);
            first = false;
            remaining = rest;
        }

        lines
    }
}

/// Process text with a default [`LineProcessor`]
pub fn process_text(text: &str, opts: &ProcessOptions) -> Vec<LogLine> {
    LineProcessor::new().process(text, opts)
}
