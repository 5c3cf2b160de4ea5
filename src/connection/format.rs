//! Shared message formatting and error reporting
//!
//! Both client kinds turn inbound payloads into text the same way and report
//! failures through the same callback pair, so that logic lives here rather
//! than in either client.

use std::fmt;
use std::sync::Arc;

use crate::error::Error;

/// Receives every decoded message
pub type MessageHandler = Arc<dyn Fn(String) + Send + Sync>;

/// Receives every reported error
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// Turns an inbound payload into the text handed to [`MessageHandler`]
pub type MessageFormatter = Arc<dyn Fn(&Payload) -> String + Send + Sync>;

/// An inbound or outbound message body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Text frame or event data
    Text(String),
    /// Structured value, serialized to JSON text when sent or formatted
    Json(serde_json::Value),
    /// Binary frame
    Binary(Vec<u8>),
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(bytes)
    }
}

/// Text for a payload, or `None` when it cannot be turned into text
///
/// A configured formatter alone decides the result. Without one, text passes
/// through, binary is decoded as lossy UTF-8 and JSON values are serialized.
/// Serialization failures are logged, never propagated.
pub fn format_payload(formatter: Option<&MessageFormatter>, payload: &Payload) -> Option<String> {
    if let Some(format) = formatter {
        return Some(format(payload));
    }

    match payload {
        Payload::Text(text) => Some(text.clone()),
        Payload::Binary(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Payload::Json(value) => match serde_json::to_string(value) {
            Ok(text) => Some(text),
            Err(e) => {
                error!("Failed to stringify message data: {}", e);
                None
            }
        },
    }
}

/// The callback pair every client is built with
#[derive(Clone)]
pub struct ClientCallbacks {
    on_message: MessageHandler,
    on_error: Option<ErrorHandler>,
}

impl ClientCallbacks {
    /// Callbacks with only a message handler
    pub fn new<F>(on_message: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Self {
            on_message: Arc::new(on_message),
            on_error: None,
        }
    }

    /// Callbacks from an already shared message handler
    pub fn from_handler(on_message: MessageHandler) -> Self {
        Self {
            on_message,
            on_error: None,
        }
    }

    /// Add an error handler
    pub fn with_error_handler<F>(mut self, on_error: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    /// Hand a decoded message to the consumer
    pub fn deliver(&self, text: String) {
        (self.on_message)(text);
    }

    /// Log an error and hand it to the error handler, if any
    pub fn report_error(&self, err: &Error) {
        error!("Connection error: {}", err);
        if let Some(on_error) = &self.on_error {
            on_error(err);
        }
    }
}

impl fmt::Debug for ClientCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCallbacks")
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}
