//! Styled Span Model
//!
//! A contiguous run of log text sharing one ANSI style state, plus the
//! named color palette the SGR color codes map onto.

use serde::{Deserialize, Serialize};

/// Named ANSI color as produced by SGR codes 30-37/90-97 (and 40-47/100-107)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Grey,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

/// Base palette, indexed by `code - 30` / `code - 40`
const BASE_COLORS: [AnsiColor; 8] = [
    AnsiColor::Black,
    AnsiColor::Red,
    AnsiColor::Green,
    AnsiColor::Yellow,
    AnsiColor::Blue,
    AnsiColor::Magenta,
    AnsiColor::Cyan,
    AnsiColor::White,
];

/// Bright palette, indexed by `code - 90` / `code - 100`
const BRIGHT_COLORS: [AnsiColor; 8] = [
    AnsiColor::Grey,
    AnsiColor::BrightRed,
    AnsiColor::BrightGreen,
    AnsiColor::BrightYellow,
    AnsiColor::BrightBlue,
    AnsiColor::BrightMagenta,
    AnsiColor::BrightCyan,
    AnsiColor::BrightWhite,
];

impl AnsiColor {
    /// Color selected by a foreground SGR code (30-37, 90-97)
    pub fn from_foreground_code(code: u16) -> Option<Self> {
        match code {
            30..=37 => Some(BASE_COLORS[usize::from(code - 30)]),
            90..=97 => Some(BRIGHT_COLORS[usize::from(code - 90)]),
            _ => None,
        }
    }

    /// Color selected by a background SGR code (40-47, 100-107)
    pub fn from_background_code(code: u16) -> Option<Self> {
        match code {
            40..=47 => Some(BASE_COLORS[usize::from(code - 40)]),
            100..=107 => Some(BRIGHT_COLORS[usize::from(code - 100)]),
            _ => None,
        }
    }

    /// Name used by the rendering layer (`"red"`, `"grey"`, `"brightred"`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            AnsiColor::Black => "black",
            AnsiColor::Red => "red",
            AnsiColor::Green => "green",
            AnsiColor::Yellow => "yellow",
            AnsiColor::Blue => "blue",
            AnsiColor::Magenta => "magenta",
            AnsiColor::Cyan => "cyan",
            AnsiColor::White => "white",
            AnsiColor::Grey => "grey",
            AnsiColor::BrightRed => "brightred",
            AnsiColor::BrightGreen => "brightgreen",
            AnsiColor::BrightYellow => "brightyellow",
            AnsiColor::BrightBlue => "brightblue",
            AnsiColor::BrightMagenta => "brightmagenta",
            AnsiColor::BrightCyan => "brightcyan",
            AnsiColor::BrightWhite => "brightwhite",
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Style attributes active for a span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground: Option<AnsiColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<AnsiColor>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub blink: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub inverse: bool,
}

impl SpanStyle {
    /// True when no attribute is set
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// One contiguous run of text sharing one style state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledSpan {
    /// Visible text of the span (escape codes removed)
    pub text: String,

    /// Style active for the whole span
    #[serde(flatten)]
    pub style: SpanStyle,
}

impl StyledSpan {
    /// Create an unstyled span
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: SpanStyle::default(),
        }
    }

    /// Create a span with the given style
    pub fn styled(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}
