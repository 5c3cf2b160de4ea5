//! `text/event-stream` decoder
//!
//! Incremental: bytes may be split anywhere, including inside a UTF-8
//! sequence or between the CR and LF of a line ending.

use std::time::Duration;

use super::transport::{ServerEvent, DEFAULT_EVENT_TYPE};

const BOM: char = '\u{feff}';

/// Longest line kept by default; longer lines are dropped
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental server-sent events decoder
#[derive(Debug, Clone)]
pub struct SseDecoder {
    /// Bytes of the line in progress
    line: Vec<u8>,
    max_line_bytes: usize,
    /// Line in progress went over `max_line_bytes`; skip to its terminator
    overflowed: bool,
    /// Last byte seen was CR; a following LF belongs to the same line ending
    pending_cr: bool,
    /// First line not yet seen, BOM still possible
    at_stream_start: bool,
    data: String,
    event_type: String,
    last_event_id: String,
    retry: Option<Duration>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    /// Create a decoder at the start of a stream
    pub fn new() -> Self {
        Self {
            line: Vec::new(),
            max_line_bytes: MAX_LINE_BYTES,
            overflowed: false,
            pending_cr: false,
            at_stream_start: true,
            data: String::new(),
            event_type: String::new(),
            last_event_id: String::new(),
            retry: None,
        }
    }

    /// Set the longest line, in bytes, the decoder will buffer
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes.max(1);
        self
    }

    /// Feed a chunk and return the events it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        let mut events = Vec::new();

        for &byte in chunk {
            if std::mem::take(&mut self.pending_cr) && byte == b'\n' {
                continue;
            }
            match byte {
                b'\n' => self.finish_line(&mut events),
                b'\r' => {
                    self.pending_cr = true;
                    self.finish_line(&mut events);
                }
                _ => self.push_byte(byte),
            }
        }

        events
    }

    /// Last event id seen, if any
    pub fn last_event_id(&self) -> Option<&str> {
        (!self.last_event_id.is_empty()).then_some(self.last_event_id.as_str())
    }

    /// Reconnection time last requested by the server
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    /// Drop any partial line or event, keeping the last event id
    ///
    /// Called when the underlying connection is replaced.
    pub fn reset_event(&mut self) {
        self.line.clear();
        self.overflowed = false;
        self.pending_cr = false;
        self.at_stream_start = true;
        self.data.clear();
        self.event_type.clear();
    }

    fn push_byte(&mut self, byte: u8) {
        if self.overflowed {
            return;
        }
        if self.line.len() >= self.max_line_bytes {
            warn!(
                limit = self.max_line_bytes,
                "Dropping event-stream line longer than the limit"
            );
            self.line = Vec::new();
            self.overflowed = true;
            return;
        }
        self.line.push(byte);
    }

    fn finish_line(&mut self, events: &mut Vec<ServerEvent>) {
        if std::mem::take(&mut self.overflowed) {
            // The dropped line is not a blank line
            self.at_stream_start = false;
            return;
        }
        let raw = std::mem::take(&mut self.line);
        let decoded = String::from_utf8_lossy(&raw);
        let mut line: &str = &decoded;
        if std::mem::take(&mut self.at_stream_start) {
            line = line.strip_prefix(BOM).unwrap_or(line);
        }

        if line.is_empty() {
            if let Some(event) = self.dispatch() {
                events.push(event);
            }
            return;
        }
        if line.starts_with(':') {
            // Comment
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event_type = value.to_string(),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "id" => {
                if !value.contains('\0') {
                    self.last_event_id = value.to_string();
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(ms) = value.parse::<u64>() {
                        self.retry = Some(Duration::from_millis(ms));
                    }
                }
            }
            _ => {
                trace!(field, "Ignoring unknown event-stream field");
            }
        }
    }

    /// Build the event accumulated since the last blank line
    fn dispatch(&mut self) -> Option<ServerEvent> {
        let event_type = std::mem::take(&mut self.event_type);
        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }

        Some(ServerEvent {
            event_type: if event_type.is_empty() {
                DEFAULT_EVENT_TYPE.to_string()
            } else {
                event_type
            },
            data,
            last_event_id: self.last_event_id().map(str::to_string),
        })
    }
}
