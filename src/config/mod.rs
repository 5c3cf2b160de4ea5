//! Configuration management for lazylog
//!
//! A [`ViewerConfig`] holds display, search and connection settings. Every
//! field has a default, so a config file only needs the keys it changes.
//! Sections convert into the runtime option bags the pipeline and the
//! connection clients take.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::connection::{EventStreamOptions, SocketOptions};
use crate::error::{Error, Result};
use crate::search::{SearchOptions, DEFAULT_MIN_CHARACTERS};
use crate::text::{ProcessOptions, DEFAULT_MAX_LINE_LENGTH};

pub use loader::{ConfigFormat, ConfigLoader, LoadOptions};

/// Smallest wrap width that leaves room for the continuation marker
pub const MIN_LINE_LENGTH: usize = 3;

const DEFAULT_RECONNECT_WAIT_SECS: f64 = 1.0;
const DEFAULT_MAX_EMPTY_EVENTS: u32 = 100;

/// Main configuration structure for lazylog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// How text is split and numbered
    pub display: DisplayConfig,

    /// Search defaults
    pub search: SearchConfig,

    /// Bidirectional socket client
    pub websocket: WebSocketConfig,

    /// Server-push event stream client
    pub eventsource: EventSourceConfig,
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Wrap long lines
    pub wrap_lines: bool,

    /// Wrap width in visible characters
    pub max_line_length: usize,

    /// Number of the first line
    pub start_line_number: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            wrap_lines: false,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            start_line_number: 1,
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Shortest term, in characters, that runs a search
    pub min_characters: usize,

    /// Ignore case when matching
    pub case_insensitive: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_characters: DEFAULT_MIN_CHARACTERS,
            case_insensitive: false,
        }
    }
}

/// Socket client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Reconnect after an unexpected close
    pub reconnect: bool,

    /// Seconds to wait before reconnecting
    pub reconnect_wait_secs: f64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            reconnect: false,
            reconnect_wait_secs: DEFAULT_RECONNECT_WAIT_SECS,
        }
    }
}

/// Event stream client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSourceConfig {
    /// `None` leaves reconnecting to the transport, `false` makes a close
    /// final, `true` schedules reconnects from the client
    pub reconnect: Option<bool>,

    /// Seconds to wait before a client-driven reconnect
    pub reconnect_wait_secs: f64,

    /// Disconnect after this many delivered messages
    pub max_events: Option<u64>,

    /// Deliver queued messages one per interval
    pub event_delay_ms: Option<u64>,

    /// Empty frames tolerated in a row before giving up
    pub max_empty_events: u32,

    /// Ask the transport to send credentials
    pub with_credentials: bool,
}

impl Default for EventSourceConfig {
    fn default() -> Self {
        Self {
            reconnect: None,
            reconnect_wait_secs: DEFAULT_RECONNECT_WAIT_SECS,
            max_events: None,
            event_delay_ms: None,
            max_empty_events: DEFAULT_MAX_EMPTY_EVENTS,
            with_credentials: false,
        }
    }
}

impl ViewerConfig {
    /// Check every field for values the pipeline cannot use
    pub fn validate(&self) -> Result<()> {
        if self.display.max_line_length < MIN_LINE_LENGTH {
            return Err(invalid(
                "display.max_line_length",
                format!("Line length must be at least {}", MIN_LINE_LENGTH),
            ));
        }

        if self.display.start_line_number == 0 {
            return Err(invalid("display.start_line_number", "Line numbers start at 1"));
        }

        if self.search.min_characters == 0 {
            return Err(invalid(
                "search.min_characters",
                "Minimum search length must be greater than 0",
            ));
        }

        validate_wait("websocket.reconnect_wait_secs", self.websocket.reconnect_wait_secs)?;
        validate_wait("eventsource.reconnect_wait_secs", self.eventsource.reconnect_wait_secs)?;

        if self.eventsource.max_empty_events == 0 {
            return Err(invalid(
                "eventsource.max_empty_events",
                "Empty event threshold must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Options for the line processor
    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions {
            wrap: self.display.wrap_lines,
            max_line_length: self.display.max_line_length,
            start_line_number: self.display.start_line_number,
        }
    }

    /// Options for the match engine
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            case_insensitive: self.search.case_insensitive,
            min_characters: self.search.min_characters,
        }
    }

    /// Options for a socket client, without hooks or formatter
    pub fn socket_options(&self) -> SocketOptions {
        let mut options = SocketOptions::default();
        let wait = wait_duration(self.websocket.reconnect_wait_secs, options.reconnect_wait);
        if self.websocket.reconnect {
            options = options.with_reconnect(wait);
        } else {
            options.reconnect_wait = wait;
        }
        options
    }

    /// Options for an event stream client, without hooks or formatter
    pub fn event_stream_options(&self) -> EventStreamOptions {
        let source = &self.eventsource;
        let mut options = EventStreamOptions::default()
            .with_max_empty_events(source.max_empty_events);

        options.reconnect = source.reconnect;
        options.reconnect_wait = wait_duration(source.reconnect_wait_secs, options.reconnect_wait);
        options.max_events = source.max_events;
        options.event_delay = source
            .event_delay_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        options.with_credentials = source.with_credentials;
        options
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> Error {
    Error::ConfigValidationFailed {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn validate_wait(field: &str, secs: f64) -> Result<()> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(invalid(field, "Reconnect wait must be a non-negative number of seconds"));
    }
    Ok(())
}

fn wait_duration(secs: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(fallback)
}

/// Configuration utilities
pub mod utils {
    use super::*;

    /// Get configuration file format from path
    pub fn get_config_format(path: &Path) -> Option<ConfigFormat> {
        match path.extension()?.to_str()? {
            "toml" => Some(ConfigFormat::Toml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Render the default configuration in `format`
    pub fn create_default_config_content(format: ConfigFormat) -> Result<String> {
        let config = ViewerConfig::default();

        match format {
            ConfigFormat::Toml => {
                toml::to_string_pretty(&config).map_err(|e| Error::ConfigSerializationFailed {
                    format: "TOML".to_string(),
                    reason: e.to_string(),
                })
            }
            ConfigFormat::Json => serde_json::to_string_pretty(&config).map_err(|e| {
                Error::ConfigSerializationFailed {
                    format: "JSON".to_string(),
                    reason: e.to_string(),
                }
            }),
        }
    }
}
