//! ANSI escape code processing
//!
//! Decodes a single line of raw log text containing ANSI SGR escape
//! sequences into styled spans.
//!
//! Each line is decoded on its own: style state never carries over from one
//! call to the next.

use crate::models::{AnsiColor, SpanStyle, StyledSpan};

const ESC: char = '\x1b';

/// ANSI SGR decoder
///
/// Stateless between calls. All scan state lives in a parser state value
/// that is folded across the characters of one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiDecoder;

/// Where the scanner is inside the input
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum ScanMode {
    /// Ordinary text
    #[default]
    Text,
    /// Saw ESC, waiting to see if `[` follows
    Escape,
    /// Inside `ESC[`, collecting parameters until a final letter
    Params(String),
}

/// Scan state threaded through one decode call
#[derive(Debug, Clone, Default)]
struct ParserState {
    /// Style attributes currently in effect
    style: SpanStyle,
    /// Text accumulated for the span in progress
    current: String,
    /// Completed spans
    spans: Vec<StyledSpan>,
    mode: ScanMode,
}

impl ParserState {
    /// Feed one character
    fn step(mut self, ch: char) -> Self {
        match std::mem::take(&mut self.mode) {
            ScanMode::Text => {
                if ch == ESC {
                    self.mode = ScanMode::Escape;
                } else {
                    self.current.push(ch);
                }
            }
            ScanMode::Escape => {
                if ch == '[' {
                    self.mode = ScanMode::Params(String::new());
                } else {
                    // Lone ESC is kept as literal text
                    self.current.push(ESC);
                    return self.step(ch);
                }
            }
            ScanMode::Params(mut buffer) => {
                if ch == ESC {
                    // A new introducer abandons the partial sequence
                    self.mode = ScanMode::Escape;
                } else if ch.is_ascii_alphabetic() {
                    if ch == 'm' {
                        self.apply_sequence(&buffer);
                    }
                    // Other CSI finals (K, G, H, ...) are consumed without effect
                } else {
                    buffer.push(ch);
                    self.mode = ScanMode::Params(buffer);
                }
            }
        }
        self
    }

    /// Close the line and return the spans plus the style left active
    fn finish(mut self) -> (Vec<StyledSpan>, SpanStyle) {
        match self.mode {
            ScanMode::Escape => self.current.push(ESC),
            // Unterminated sequence: the buffered parameters are dropped
            ScanMode::Params(_) | ScanMode::Text => {}
        }
        if !self.current.is_empty() {
            let text = std::mem::take(&mut self.current);
            self.spans.push(StyledSpan::styled(text, self.style));
        }
        (self.spans, self.style)
    }

    /// Apply a complete `ESC[...m` parameter buffer
    fn apply_sequence(&mut self, buffer: &str) {
        if !self.current.is_empty() {
            let text = std::mem::take(&mut self.current);
            self.spans.push(StyledSpan::styled(text, self.style));
        }

        // An empty leading token acts as 0; later empty tokens are skipped
        for (index, token) in buffer.split(';').enumerate() {
            let token = token.trim();
            if token.is_empty() {
                if index == 0 {
                    self.style = SpanStyle::default();
                }
                continue;
            }
            if let Ok(code) = token.parse::<u16>() {
                self.apply_code(code);
            }
        }
    }

    fn apply_code(&mut self, code: u16) {
        let style = &mut self.style;
        match code {
            0 => *style = SpanStyle::default(),
            1 => style.bold = true,
            3 => style.italic = true,
            4 => style.underline = true,
            5 => style.blink = true,
            7 => style.inverse = true,
            22 => style.bold = false,
            23 => style.italic = false,
            24 => style.underline = false,
            25 => style.blink = false,
            27 => style.inverse = false,
            30..=37 | 90..=97 => style.foreground = AnsiColor::from_foreground_code(code),
            40..=47 | 100..=107 => style.background = AnsiColor::from_background_code(code),
            _ => {
                // Ignore unknown codes
            }
        }
    }
}

impl AnsiDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self
    }

    /// Decode a line into styled spans
    ///
    /// A line without any ESC character comes back as exactly one unstyled
    /// span holding the whole line (even when the line is empty).
    pub fn parse(&self, line: &str) -> Vec<StyledSpan> {
        self.parse_with_state(line).0
    }

    /// Decode a line and also return the style still active at its end
    pub fn parse_with_state(&self, line: &str) -> (Vec<StyledSpan>, SpanStyle) {
        if !line.contains(ESC) {
            return (vec![StyledSpan::plain(line)], SpanStyle::default());
        }

        line.chars()
            .fold(ParserState::default(), ParserState::step)
            .finish()
    }
}

/// Decode a line with a default [`AnsiDecoder`]
pub fn parse_ansi(line: &str) -> Vec<StyledSpan> {
    AnsiDecoder::new().parse(line)
}
