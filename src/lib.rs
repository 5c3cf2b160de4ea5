//! lazylog - the processing and streaming core of an embeddable log viewer
//!
//! Turns raw text carrying ANSI escape codes into numbered, styled lines,
//! searches them and feeds them from live WebSocket or server-sent-event
//! connections. Rendering is left to the host.
//!
//! ## Module Organization
//!
//! ### Processing
//!
//! - [`ansi`] - ANSI SGR decoding into styled spans
//! - [`text`] - Escape-aware text helpers and the line processor
//! - [`search`] - Match engine and search navigation state
//! - [`highlight`] - Highlighted line specifications
//! - [`viewer`] - Accumulating log view combining the above
//! - [`models`] - Data structures (StyledSpan, LogLine, Match)
//!
//! ### Connections
//!
//! - [`connection`] - Socket and event stream clients, transports, SSE decoding
//!
//! ### Support
//!
//! - [`config`] - Configuration loading and validation
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```
//! use lazylog::{LogView, ViewerConfig};
//!
//! let mut view = LogView::from_config(&ViewerConfig::default());
//! view.append_text("\x1b[31merror\x1b[0m: disk full\nretrying");
//!
//! assert_eq!(view.line_count(), 2);
//! assert_eq!(view.search("error").len(), 1);
//! ```
//!
//! ## Architecture
//!
//! Processing is synchronous and pure. Connection clients run on Tokio: one
//! pump task per connection plus timer tasks for reconnects and delayed
//! delivery, all owned by the client and aborted on `disconnect()`. Message
//! callbacks run outside internal locks, so they may call back into the
//! client.

#![allow(unexpected_cfgs)]

#[macro_use]
extern crate tracing;

// Processing modules
pub mod ansi;
pub mod highlight;
pub mod search;
pub mod text;
pub mod viewer;

// Connection modules
pub mod connection;

// Support modules
pub mod config;
pub mod error;

// Model modules
pub mod models;

// Re-exports for core functionality
pub use ansi::{parse_ansi, AnsiDecoder};
pub use config::ViewerConfig;
pub use error::{Error, Result};
pub use highlight::{is_highlighted, HighlightSpec};
pub use models::{AnsiColor, LogLine, Match, SpanStyle, StyledSpan};
pub use search::{find, SearchOptions, SearchState};
pub use text::{process_text, LineProcessor, ProcessOptions};
pub use viewer::{message_sink, LogView, SharedLogView};

// Convenience re-exports for connections
pub use config::loader::ConfigLoader;
pub use connection::{
    ClientCallbacks, ConnectionClient, ConnectionState, EventStreamClient, EventStreamOptions,
    HttpEventSourceTransport, Payload, SocketOptions, StreamSocketClient,
};

// Version information
/// The current version of lazylog from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The crate description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Install a compact `tracing` subscriber
///
/// `RUST_LOG` wins over `default_level`. Calling this again, or after the
/// host installed its own subscriber, does nothing.
pub fn init_tracing(default_level: &str) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());

    let installed = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from(env_filter))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init()
        .is_ok();

    if installed {
        debug!("Tracing initialized for {} v{}", NAME, VERSION);
    }
}

/// Load the configuration for this process
///
/// Reads the file named by `LAZYLOG_CONFIG`, then the standard locations.
/// Any failure falls back to defaults with a warning.
pub fn init() -> ViewerConfig {
    info!("🚀 Initializing {} v{}", NAME, VERSION);

    let loaded = match ConfigLoader::load_from_env() {
        Ok(Some(config)) => {
            info!("✅ Configuration loaded from ${}", config::loader::CONFIG_ENV_VAR);
            Ok(config)
        }
        Ok(None) => ConfigLoader::load(),
        Err(e) => Err(e),
    };

    match loaded {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load configuration: {}. Using defaults", e);
            ViewerConfig::default()
        }
    }
}

/// Load the configuration from an explicit file
///
/// Unlike [`init`], failures are returned to the caller.
pub fn init_with_config(config_path: &std::path::Path) -> Result<ViewerConfig> {
    info!(
        "🚀 Initializing {} v{} with config: {}",
        NAME,
        VERSION,
        config_path.display()
    );

    match ConfigLoader::load_from_file(config_path) {
        Ok(config) => {
            info!("✅ Custom configuration loaded from: {}", config_path.display());
            Ok(config)
        }
        Err(e) => {
            error!(
                "Failed to load custom configuration from {}: {}",
                config_path.display(),
                e
            );
            Err(e)
        }
    }
}

/// Human-readable advice for a startup error
pub fn handle_startup_error(error: &Error) -> String {
    match error {
        Error::ConfigLoadFailed { path, reason } => {
            format!(
                "Configuration Error: Failed to load config from '{}': {}\n\nTry:\n• Check the path in ${}\n• Ensure file permissions are correct",
                path.display(),
                reason,
                config::loader::CONFIG_ENV_VAR
            )
        }
        Error::ConfigParseFailed { format, reason } => {
            format!(
                "Configuration Error: Failed to parse {} config: {}\n\nTry:\n• Check configuration file syntax\n• Ensure file is valid {}",
                format, reason, format
            )
        }
        Error::ConfigValidationFailed { field, reason } => {
            format!(
                "Configuration Error: Validation failed for '{}': {}\n\nTry:\n• Check configuration value\n• Remove the key to use its default",
                field, reason
            )
        }
        Error::ConfigNotFound => {
            "Configuration Error: Config file not found\n\nTry:\n• Create a configuration file\n• Use default configuration".to_string()
        }
        Error::NoRuntime => {
            "Runtime Error: connections need a Tokio runtime\n\nTry:\n• Call connect() from within a Tokio runtime".to_string()
        }
        _ => {
            format!(
                "Unexpected Error: {}\n\nPlease report this issue with debug logs enabled",
                error
            )
        }
    }
}
