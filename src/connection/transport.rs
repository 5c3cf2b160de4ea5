//! Transport primitives consumed by the clients
//!
//! A transport turns a URL into a live connection: a stream of events plus a
//! handle for outbound operations. Clients depend only on these shapes, so a
//! host can plug in any socket or push implementation.

use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

/// Failures raised by a transport implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    #[error("failed to open transport: {0}")]
    Open(String),

    #[error("failed to send frame: {0}")]
    Send(String),

    #[error("transport closed")]
    Closed,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("stream error: {0}")]
    Stream(String),
}

/// Close code sent on an explicit client disconnect
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the connection dropped without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Reason sent on an explicit client disconnect
pub const CLIENT_DISCONNECT_REASON: &str = "Client disconnected";

/// One socket frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Close code and reason of a socket close
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Close seen when the event stream ended without a close frame
    pub fn abnormal() -> Self {
        Self::new(ABNORMAL_CLOSURE, "")
    }
}

/// Events raised by a socket transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Open,
    Message(SocketFrame),
    Error(String),
    Close(CloseFrame),
}

/// Outbound half of a socket connection
pub trait SocketSink: Send {
    /// Queue a frame for sending
    fn send(&mut self, frame: SocketFrame) -> std::result::Result<(), TransportError>;

    /// Start the closing handshake
    fn close(&mut self, code: u16, reason: &str);
}

/// A live socket: outbound sink plus inbound events
pub struct SocketConnection {
    pub sink: Box<dyn SocketSink>,
    pub events: UnboundedReceiver<SocketEvent>,
}

impl fmt::Debug for SocketConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketConnection").finish_non_exhaustive()
    }
}

/// Opens bidirectional socket connections
pub trait SocketTransport: Send + Sync {
    fn open(&self, url: &str) -> std::result::Result<SocketConnection, TransportError>;
}

/// One server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerEvent {
    /// Event type, `"message"` unless the server named one
    pub event_type: String,
    /// Data lines joined with `\n`
    pub data: String,
    /// Last event id seen on the stream
    pub last_event_id: Option<String>,
}

impl ServerEvent {
    /// Default-typed event with the given data
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            event_type: DEFAULT_EVENT_TYPE.to_string(),
            data: data.into(),
            last_event_id: None,
        }
    }

    /// Event of a named type
    pub fn named(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: data.into(),
            last_event_id: None,
        }
    }

    /// True for the default `message` type
    pub fn is_default_type(&self) -> bool {
        self.event_type == DEFAULT_EVENT_TYPE
    }
}

/// Type carried by events without an `event:` field
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Events raised by a push transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSourceEvent {
    Open,
    Message(ServerEvent),
    /// `closed` is true when the transport gave up and will not reconnect
    Error { message: String, closed: bool },
}

/// Settings passed to a push transport when opening
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventSourceInit {
    pub with_credentials: bool,
}

/// Control handle of a push connection
pub trait EventSourceHandle: Send {
    /// Stop the stream; no further events are raised
    fn close(&mut self);
}

/// A live push connection
pub struct EventSourceConnection {
    pub handle: Box<dyn EventSourceHandle>,
    pub events: UnboundedReceiver<EventSourceEvent>,
}

impl fmt::Debug for EventSourceConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSourceConnection").finish_non_exhaustive()
    }
}

/// Opens unidirectional push connections
pub trait EventSourceTransport: Send + Sync {
    fn open(
        &self,
        url: &str,
        init: EventSourceInit,
    ) -> std::result::Result<EventSourceConnection, TransportError>;
}
