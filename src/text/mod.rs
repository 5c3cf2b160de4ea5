//! Text processing for raw log blocks
//!
//! - [`escapes`]: measure, strip and cut text without breaking escape codes
//! - [`processor`]: split blocks into numbered lines, with optional wrapping

pub mod escapes;
pub mod processor;

pub use escapes::{active_ansi_codes, split_at_visible, strip_ansi_codes, visible_length};
pub use processor::{
    process_text, LineProcessor, ProcessOptions, CONTINUATION_MARKER, DEFAULT_MAX_LINE_LENGTH,
};
