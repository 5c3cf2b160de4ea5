//! Accumulating log view
//!
//! [`LogView`] owns the processed lines of one log, keeps numbering
//! continuous across appends and reruns the active search whenever lines
//! arrive. Streamed chunks are buffered until a full line is available.

use std::sync::{Arc, Mutex};

use crate::config::ViewerConfig;
use crate::connection::{lock, MessageHandler};
use crate::highlight::HighlightSpec;
use crate::models::{LogLine, Match};
use crate::search::{SearchOptions, SearchState};
use crate::text::{LineProcessor, ProcessOptions};

/// A log view shared with connection callbacks
pub type SharedLogView = Arc<Mutex<LogView>>;

/// Processed lines plus search and highlight state
#[derive(Debug, Clone, Default)]
pub struct LogView {
    processor: LineProcessor,
    options: ProcessOptions,
    lines: Vec<LogLine>,
    /// Text after the last `\n` of streamed chunks
    pending: String,
    search: SearchState,
    highlight: Option<HighlightSpec>,
}

impl LogView {
    /// Create an empty view
    pub fn new(options: ProcessOptions, search_options: SearchOptions) -> Self {
        Self {
            processor: LineProcessor::new(),
            options,
            lines: Vec::new(),
            pending: String::new(),
            search: SearchState::new(search_options),
            highlight: None,
        }
    }

    /// Create an empty view with display and search settings from `config`
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(config.process_options(), config.search_options())
    }

    /// Wrap in the shared handle used by [`message_sink`]
    pub fn into_shared(self) -> SharedLogView {
        Arc::new(Mutex::new(self))
    }

    /// Number the next line would get
    fn next_line_number(&self) -> usize {
        self.lines
            .last()
            .map_or(self.options.start_line_number, |line| line.number.saturating_add(1))
    }

    /// Process a complete block and append its lines
    ///
    /// Returns how many lines were added.
    pub fn append_text(&mut self, text: &str) -> usize {
        let opts = self.options.starting_at(self.next_line_number());
        let new_lines = self.processor.process(text, &opts);
        let added = new_lines.len();

        self.lines.extend(new_lines);
        if !self.search.term().is_empty() {
            self.search.refresh(&self.lines);
        }

        trace!(added, total = self.lines.len(), "Appended log text");
        added
    }

    /// Feed a piece of a stream
    ///
    /// Everything up to the last `\n` is appended; the rest waits for the
    /// next chunk or [`flush`](Self::flush).
    pub fn push_chunk(&mut self, chunk: &str) -> usize {
        self.pending.push_str(chunk);

        let Some(end) = self.pending.rfind('\n') else {
            return 0;
        };
        let rest = self.pending.split_off(end + 1);
        let mut complete = std::mem::replace(&mut self.pending, rest);
        complete.truncate(end);

        self.append_text(&complete)
    }

    /// Append any buffered partial line
    pub fn flush(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let pending = std::mem::take(&mut self.pending);
        self.append_text(&pending)
    }

    /// Replace the whole content
    pub fn set_text(&mut self, text: &str) {
        self.lines.clear();
        self.pending.clear();
        self.append_text(text);
    }

    /// Drop every line, the buffered partial line and the search results
    ///
    /// The search term survives and applies to lines added later.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.pending.clear();
        self.search.refresh(&self.lines);
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Buffered text without a line ending yet
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn process_options(&self) -> &ProcessOptions {
        &self.options
    }

    /// Change display options; existing lines are kept as processed
    pub fn set_process_options(&mut self, options: ProcessOptions) {
        self.options = options;
    }

    /// Search for `term`; an empty term clears the search
    pub fn search(&mut self, term: &str) -> &[Match] {
        if term.is_empty() {
            self.search.clear();
        } else {
            self.search.set_term(term, &self.lines);
        }
        self.search.matches()
    }

    /// Change search options and rescan
    pub fn set_search_options(&mut self, options: SearchOptions) {
        self.search.set_options(options, &self.lines);
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    /// Move to the next match, wrapping
    pub fn next_match(&mut self) -> Option<Match> {
        self.search.next()
    }

    /// Move to the previous match, wrapping
    pub fn previous_match(&mut self) -> Option<Match> {
        self.search.previous()
    }

    pub fn set_highlight(&mut self, highlight: Option<HighlightSpec>) {
        self.highlight = highlight;
    }

    pub fn highlight(&self) -> Option<&HighlightSpec> {
        self.highlight.as_ref()
    }

    /// True if `line_number` falls in the current highlight
    pub fn is_highlighted(&self, line_number: usize) -> bool {
        self.highlight
            .as_ref()
            .is_some_and(|spec| spec.contains(line_number))
    }

    /// Get view statistics
    pub fn stats(&self) -> ViewStats {
        ViewStats {
            line_count: self.lines.len(),
            pending_length: self.pending.len(),
            match_count: self.search.matches().len(),
            active_match: self.search.active_index(),
        }
    }
}

/// View statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewStats {
    /// Number of processed lines
    pub line_count: usize,
    /// Bytes waiting for a line ending
    pub pending_length: usize,
    /// Number of current search matches
    pub match_count: usize,
    /// Active match index, `-1` when none
    pub active_match: isize,
}

/// Message handler that appends every message to `view`
pub fn message_sink(view: &SharedLogView) -> MessageHandler {
    let view = Arc::clone(view);
    Arc::new(move |message: String| {
        lock(&view).append_text(&message);
    })
}
