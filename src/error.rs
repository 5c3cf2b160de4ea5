//! Error types and Result aliases for lazylog

use std::fmt;
use std::path::PathBuf;

/// Result type alias for lazylog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lazylog
#[derive(Debug)]
pub enum Error {
    // === Connection errors ===
    /// The transport could not be created for the target address
    TransportOpenFailed {
        url: String,
        reason: String,
    },

    /// The transport reported a failure after it was created
    Transport {
        url: String,
        reason: String,
    },

    /// Writing a frame to an open transport failed
    SendFailed {
        reason: String,
    },

    /// Operation requires an open connection
    NotConnected,

    /// An object payload could not be turned into text
    SerializationFailed {
        reason: String,
    },

    /// Closed by policy: too many consecutive empty events
    EmptyEventFlood {
        url: String,
        count: u32,
    },

    /// Closed by policy: configured event budget used up
    MaxEventsReached {
        url: String,
        max: u64,
    },

    /// `connect()` was called outside a Tokio runtime
    NoRuntime,

    // === Configuration errors ===
    /// Configuration file not found
    ConfigNotFound,

    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    /// Failed to serialize configuration
    ConfigSerializationFailed {
        format: String,
        reason: String,
    },

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors
    Other(String),
}

impl Error {
    /// True when the client shut itself down because a threshold was hit,
    /// as opposed to the remote end or the network closing the connection.
    pub fn is_policy_shutdown(&self) -> bool {
        matches!(
            self,
            Error::EmptyEventFlood { .. } | Error::MaxEventsReached { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Connection errors
            Error::TransportOpenFailed { url, reason } => {
                write!(f, "Failed to open connection to '{}': {}", url, reason)
            }
            Error::Transport { url, reason } => {
                write!(f, "Connection error on '{}': {}", url, reason)
            }
            Error::SendFailed { reason } => {
                write!(f, "Failed to send message: {}", reason)
            }
            Error::NotConnected => {
                write!(f, "Connection is not open")
            }
            Error::SerializationFailed { reason } => {
                write!(f, "Failed to serialize message: {}", reason)
            }
            Error::EmptyEventFlood { url, count } => {
                write!(
                    f,
                    "EventSource '{}' disconnected after {} empty events",
                    url, count
                )
            }
            Error::MaxEventsReached { url, max } => {
                write!(
                    f,
                    "EventSource '{}' closed after reaching the maximum of {} events",
                    url, max
                )
            }
            Error::NoRuntime => {
                write!(f, "No Tokio runtime available to drive the connection")
            }

            // Configuration errors
            Error::ConfigNotFound => {
                write!(f, "Configuration file not found")
            }
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }
            Error::ConfigSerializationFailed { format, reason } => {
                write!(f, "Failed to serialize {} config: {}", format, reason)
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),

            // Generic fallback
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
