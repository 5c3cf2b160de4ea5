//! Line highlighting
//!
//! A highlight spec selects lines to mark: a single line, an inclusive
//! `[start, end]` range, or an arbitrary list. On the wire it is a number or
//! an array of numbers; an array of exactly two numbers is a range.

use serde::{Serialize, Serializer};
use std::fmt;

/// Which lines to highlight
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightSpec {
    /// Exactly one line
    Line(usize),
    /// Inclusive range of lines
    Range(usize, usize),
    /// Any listed line
    Lines(Vec<usize>),
}

impl HighlightSpec {
    /// Build a spec from a list, treating two entries as a range
    pub fn from_numbers(numbers: Vec<usize>) -> Self {
        match numbers.as_slice() {
            [start, end] => HighlightSpec::Range(*start, *end),
            _ => HighlightSpec::Lines(numbers),
        }
    }

    /// True if `line_number` is selected
    pub fn contains(&self, line_number: usize) -> bool {
        match self {
            HighlightSpec::Line(line) => *line == line_number,
            HighlightSpec::Range(start, end) => (*start..=*end).contains(&line_number),
            HighlightSpec::Lines(lines) => lines.contains(&line_number),
        }
    }
}

impl From<usize> for HighlightSpec {
    fn from(line: usize) -> Self {
        HighlightSpec::Line(line)
    }
}

impl From<Vec<usize>> for HighlightSpec {
    fn from(numbers: Vec<usize>) -> Self {
        HighlightSpec::from_numbers(numbers)
    }
}

/// True if `line_number` is selected by `spec`
pub fn is_highlighted(line_number: usize, spec: &HighlightSpec) -> bool {
    spec.contains(line_number)
}

impl Serialize for HighlightSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            HighlightSpec::Line(line) => serializer.serialize_u64(*line as u64),
            HighlightSpec::Range(start, end) => [*start, *end].serialize(serializer),
            HighlightSpec::Lines(lines) => lines.serialize(serializer),
        }
    }
}

impl<'de> serde::Deserialize<'de> for HighlightSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct HighlightVisitor;

        impl<'de> Visitor<'de> for HighlightVisitor {
            type Value = HighlightSpec;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a line number or an array of line numbers")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                usize::try_from(value)
                    .map(HighlightSpec::Line)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                usize::try_from(value)
                    .map(HighlightSpec::Line)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut numbers = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(number) = seq.next_element::<usize>()? {
                    numbers.push(number);
                }
                Ok(HighlightSpec::from_numbers(numbers))
            }
        }

        deserializer.deserialize_any(HighlightVisitor)
    }
}
