//! Search and match navigation
//!
//! Scans decoded lines for a term and records every hit as a [`Match`]
//! pointing into a single span. Hits are reported in scan order: line, then
//! span, then position. Overlapping occurrences are all reported.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{LogLine, Match};

/// Shortest term that triggers a scan by default
pub const DEFAULT_MIN_CHARACTERS: usize = 3;

/// Search behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Compare lowercased text on both sides
    pub case_insensitive: bool,
    /// Terms shorter than this (in characters) return no matches
    pub min_characters: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            min_characters: DEFAULT_MIN_CHARACTERS,
        }
    }
}

/// Lowercased copy of `text` with a map back to byte ranges in `text`
///
/// `ranges[i]` is the `(start, end)` of the original character that produced
/// byte `i` of the folded string. A character may fold to several.
struct FoldedText {
    folded: String,
    ranges: Vec<(usize, usize)>,
}

impl FoldedText {
    fn new(text: &str) -> Self {
        let mut folded = String::with_capacity(text.len());
        let mut ranges = Vec::with_capacity(text.len());

        for (start, ch) in text.char_indices() {
            let end = start + ch.len_utf8();
            for lower in ch.to_lowercase() {
                folded.push(lower);
                ranges.extend(std::iter::repeat((start, end)).take(lower.len_utf8()));
            }
        }

        Self { folded, ranges }
    }

    /// Map a folded byte range back onto the original text
    fn original_range(&self, start: usize, end: usize) -> (usize, usize) {
        (self.ranges[start].0, self.ranges[end - 1].1)
    }
}

/// Byte offsets of every occurrence of `needle` in `haystack`, overlaps included
fn occurrences<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    let mut cursor = 0usize;
    std::iter::from_fn(move || {
        if needle.is_empty() || cursor > haystack.len() {
            return None;
        }
        let found = cursor + haystack[cursor..].find(needle)?;
        // Step one character so overlapping hits are found too
        let step = haystack[found..].chars().next().map_or(1, char::len_utf8);
        cursor = found + step;
        Some(found)
    })
}

/// Matches of `term` inside one span's text
fn matches_in_span(
    line_number: usize,
    part_index: usize,
    text: &str,
    term: &str,
    case_insensitive: bool,
) -> Vec<Match> {
    let to_match = |start: usize, end: usize| Match {
        line_number,
        part_index,
        start_index: start,
        end_index: end,
    };

    if case_insensitive {
        let haystack = FoldedText::new(text);
        let needle = term.to_lowercase();
        occurrences(&haystack.folded, &needle)
            .map(|at| {
                let (start, end) = haystack.original_range(at, at + needle.len());
                to_match(start, end)
            })
            .collect()
    } else {
        occurrences(text, term)
            .map(|at| to_match(at, at + term.len()))
            .collect()
    }
}

/// Find every occurrence of `term` across `lines`
///
/// Returns nothing when `term` has fewer than `options.min_characters`
/// characters, or is empty.
pub fn find(lines: &[LogLine], term: &str, options: &SearchOptions) -> Vec<Match> {
    if term.is_empty() || term.chars().count() < options.min_characters {
        return Vec::new();
    }

    lines
        .iter()
        .flat_map(|line| {
            line.content
                .iter()
                .enumerate()
                .filter(|(_, span)| !span.text.is_empty())
                .flat_map(move |(part_index, span)| {
                    matches_in_span(
                        line.number,
                        part_index,
                        &span.text,
                        term,
                        options.case_insensitive,
                    )
                })
        })
        .collect()
}

/// Distinct line numbers holding a match, in first-seen order
pub fn lines_with_matches(matches: &[Match]) -> Vec<usize> {
    let mut seen = HashSet::new();
    matches
        .iter()
        .map(|m| m.line_number)
        .filter(|line_number| seen.insert(*line_number))
        .collect()
}

/// All matches on one line
pub fn matches_for_line(matches: &[Match], line_number: usize) -> Vec<Match> {
    matches
        .iter()
        .filter(|m| m.line_number == line_number)
        .copied()
        .collect()
}

/// The match at `active_index`, if it lies on `line_number`
pub fn active_match_for_line(matches: &[Match], active_index: isize, line_number: usize) -> Option<Match> {
    let index = usize::try_from(active_index).ok()?;
    matches
        .get(index)
        .filter(|m| m.line_number == line_number)
        .copied()
}

/// Index after `current`, wrapping; `-1` when there is nothing to navigate
pub fn next_index(current: isize, total: usize) -> isize {
    if total == 0 {
        return -1;
    }
    let total = total as isize;
    (current + 1).rem_euclid(total)
}

/// Index before `current`, wrapping; `-1` when there is nothing to navigate
pub fn previous_index(current: isize, total: usize) -> isize {
    if total == 0 {
        return -1;
    }
    if current <= 0 {
        total as isize - 1
    } else {
        current - 1
    }
}

/// Search term plus the current result set and navigation cursor
#[derive(Debug, Clone)]
pub struct SearchState {
    term: String,
    options: SearchOptions,
    matches: Vec<Match>,
    active: isize,
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new(SearchOptions::default())
    }
}

impl SearchState {
    /// Create an empty search state
    pub fn new(options: SearchOptions) -> Self {
        Self {
            term: String::new(),
            options,
            matches: Vec::new(),
            active: -1,
        }
    }

    /// Current term
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Options in effect
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Replace the options and rescan `lines`
    pub fn set_options(&mut self, options: SearchOptions, lines: &[LogLine]) {
        self.options = options;
        self.refresh(lines);
    }

    /// Start a new search; the first hit becomes active
    pub fn set_term(&mut self, term: impl Into<String>, lines: &[LogLine]) {
        self.term = term.into();
        self.matches = find(lines, &self.term, &self.options);
        self.active = if self.matches.is_empty() { -1 } else { 0 };
        debug!(term = %self.term, matches = self.matches.len(), "Search updated");
    }

    /// Rescan after the line set changed, keeping the cursor when still valid
    pub fn refresh(&mut self, lines: &[LogLine]) {
        self.matches = find(lines, &self.term, &self.options);
        let in_range = usize::try_from(self.active).is_ok_and(|i| i < self.matches.len());
        if !in_range {
            self.active = if self.matches.is_empty() { -1 } else { 0 };
        }
    }

    /// Drop the term and all results
    pub fn clear(&mut self) {
        self.term.clear();
        self.matches.clear();
        self.active = -1;
    }

    /// Current result set
    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Active index, `-1` when there are no matches
    pub fn active_index(&self) -> isize {
        self.active
    }

    /// The active match
    pub fn active_match(&self) -> Option<Match> {
        usize::try_from(self.active)
            .ok()
            .and_then(|i| self.matches.get(i))
            .copied()
    }

    /// Advance to the next match, wrapping at the end
    pub fn next(&mut self) -> Option<Match> {
        self.active = next_index(self.active, self.matches.len());
        self.active_match()
    }

    /// Step back to the previous match, wrapping at the start
    pub fn previous(&mut self) -> Option<Match> {
        self.active = previous_index(self.active, self.matches.len());
        self.active_match()
    }

    /// Line numbers holding a match
    pub fn lines_with_matches(&self) -> Vec<usize> {
        lines_with_matches(&self.matches)
    }

    /// Matches on one line
    pub fn matches_for_line(&self, line_number: usize) -> Vec<Match> {
        matches_for_line(&self.matches, line_number)
    }

    /// The active match if it lies on `line_number`
    pub fn active_match_for_line(&self, line_number: usize) -> Option<Match> {
        active_match_for_line(&self.matches, self.active, line_number)
    }
}
