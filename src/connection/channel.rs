//! In-process transports backed by channels
//!
//! Each transport comes with a peer handle that plays the remote end: it
//! raises open/message/error/close events on the most recent connection and
//! records whatever the client sends or closes. Hosts that already own a
//! socket or push stream can forward it through a peer; tests drive clients
//! with it directly.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedSender};

use super::transport::{
    CloseFrame, EventSourceConnection, EventSourceEvent, EventSourceHandle, EventSourceInit,
    EventSourceTransport, ServerEvent, SocketConnection, SocketEvent, SocketFrame, SocketSink,
    SocketTransport, TransportError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Socket
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SocketChannelState {
    /// Id of the most recent connection
    connection_id: u64,
    current: Option<UnboundedSender<SocketEvent>>,
    opened_urls: Vec<String>,
    sent: Vec<SocketFrame>,
    close_frames: Vec<CloseFrame>,
    fail_sends: Option<String>,
    fail_next_open: Option<String>,
}

/// Socket transport whose remote end is a [`SocketPeer`]
#[derive(Debug, Clone, Default)]
pub struct ChannelSocketTransport {
    shared: Arc<Mutex<SocketChannelState>>,
}

/// Remote end of a [`ChannelSocketTransport`]
#[derive(Debug, Clone)]
pub struct SocketPeer {
    shared: Arc<Mutex<SocketChannelState>>,
}

impl ChannelSocketTransport {
    /// Create a transport and the peer that drives it
    pub fn new() -> (Self, SocketPeer) {
        let transport = Self::default();
        let peer = SocketPeer {
            shared: Arc::clone(&transport.shared),
        };
        (transport, peer)
    }
}

impl SocketTransport for ChannelSocketTransport {
    fn open(&self, url: &str) -> Result<SocketConnection, TransportError> {
        let mut state = lock(&self.shared);
        if let Some(reason) = state.fail_next_open.take() {
            return Err(TransportError::Open(reason));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.connection_id += 1;
        state.current = Some(tx);
        state.opened_urls.push(url.to_string());

        let sink = ChannelSocketSink {
            connection_id: state.connection_id,
            shared: Arc::clone(&self.shared),
        };
        Ok(SocketConnection {
            sink: Box::new(sink),
            events: rx,
        })
    }
}

struct ChannelSocketSink {
    connection_id: u64,
    shared: Arc<Mutex<SocketChannelState>>,
}

impl SocketSink for ChannelSocketSink {
    fn send(&mut self, frame: SocketFrame) -> Result<(), TransportError> {
        let mut state = lock(&self.shared);
        if let Some(reason) = &state.fail_sends {
            return Err(TransportError::Send(reason.clone()));
        }
        if state.connection_id != self.connection_id || state.current.is_none() {
            return Err(TransportError::Closed);
        }
        state.sent.push(frame);
        Ok(())
    }

    fn close(&mut self, code: u16, reason: &str) {
        let mut state = lock(&self.shared);
        state.close_frames.push(CloseFrame::new(code, reason));
        if state.connection_id == self.connection_id {
            state.current = None;
        }
    }
}

impl SocketPeer {
    fn emit(&self, event: SocketEvent) -> bool {
        let state = lock(&self.shared);
        state
            .current
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// Signal that the connection is open
    pub fn open(&self) -> bool {
        self.emit(SocketEvent::Open)
    }

    /// Deliver a text frame
    pub fn message(&self, text: impl Into<String>) -> bool {
        self.emit(SocketEvent::Message(SocketFrame::Text(text.into())))
    }

    /// Deliver a binary frame
    pub fn binary(&self, bytes: Vec<u8>) -> bool {
        self.emit(SocketEvent::Message(SocketFrame::Binary(bytes)))
    }

    /// Raise a transport-level error
    pub fn error(&self, message: impl Into<String>) -> bool {
        self.emit(SocketEvent::Error(message.into()))
    }

    /// Close from the remote side with a close frame
    pub fn close(&self, code: u16, reason: impl Into<String>) -> bool {
        let sent = self.emit(SocketEvent::Close(CloseFrame::new(code, reason)));
        lock(&self.shared).current = None;
        sent
    }

    /// Drop the connection without a close frame
    pub fn drop_connection(&self) {
        lock(&self.shared).current = None;
    }

    /// True while a connection is attached
    pub fn is_attached(&self) -> bool {
        lock(&self.shared).current.is_some()
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> usize {
        lock(&self.shared).opened_urls.len()
    }

    /// URLs opened so far, in order
    pub fn opened_urls(&self) -> Vec<String> {
        lock(&self.shared).opened_urls.clone()
    }

    /// Frames the client sent
    pub fn sent(&self) -> Vec<SocketFrame> {
        lock(&self.shared).sent.clone()
    }

    /// Close frames the client sent
    pub fn close_frames(&self) -> Vec<CloseFrame> {
        lock(&self.shared).close_frames.clone()
    }

    /// Make every send fail with `reason` (or succeed again with `None`)
    pub fn fail_sends(&self, reason: Option<&str>) {
        lock(&self.shared).fail_sends = reason.map(str::to_string);
    }

    /// Make the next open fail with `reason`
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        lock(&self.shared).fail_next_open = Some(reason.into());
    }
}

// ---------------------------------------------------------------------------
// Event source
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct EventChannelState {
    connection_id: u64,
    current: Option<UnboundedSender<EventSourceEvent>>,
    opened_urls: Vec<String>,
    last_init: Option<EventSourceInit>,
    close_count: usize,
    fail_next_open: Option<String>,
}

/// Push transport whose remote end is an [`EventSourcePeer`]
#[derive(Debug, Clone, Default)]
pub struct ChannelEventSourceTransport {
    shared: Arc<Mutex<EventChannelState>>,
}

/// Remote end of a [`ChannelEventSourceTransport`]
#[derive(Debug, Clone)]
pub struct EventSourcePeer {
    shared: Arc<Mutex<EventChannelState>>,
}

impl ChannelEventSourceTransport {
    /// Create a transport and the peer that drives it
    pub fn new() -> (Self, EventSourcePeer) {
        let transport = Self::default();
        let peer = EventSourcePeer {
            shared: Arc::clone(&transport.shared),
        };
        (transport, peer)
    }
}

impl EventSourceTransport for ChannelEventSourceTransport {
    fn open(&self, url: &str, init: EventSourceInit) -> Result<EventSourceConnection, TransportError> {
        let mut state = lock(&self.shared);
        if let Some(reason) = state.fail_next_open.take() {
            return Err(TransportError::Open(reason));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.connection_id += 1;
        state.current = Some(tx);
        state.opened_urls.push(url.to_string());
        state.last_init = Some(init);

        let handle = ChannelEventSourceHandle {
            connection_id: state.connection_id,
            shared: Arc::clone(&self.shared),
        };
        Ok(EventSourceConnection {
            handle: Box::new(handle),
            events: rx,
        })
    }
}

struct ChannelEventSourceHandle {
    connection_id: u64,
    shared: Arc<Mutex<EventChannelState>>,
}

impl EventSourceHandle for ChannelEventSourceHandle {
    fn close(&mut self) {
        let mut state = lock(&self.shared);
        state.close_count += 1;
        if state.connection_id == self.connection_id {
            state.current = None;
        }
    }
}

impl EventSourcePeer {
    fn emit(&self, event: EventSourceEvent) -> bool {
        let state = lock(&self.shared);
        state
            .current
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// Signal that the stream is open
    pub fn open(&self) -> bool {
        self.emit(EventSourceEvent::Open)
    }

    /// Deliver a default-typed event
    pub fn message(&self, data: impl Into<String>) -> bool {
        self.emit(EventSourceEvent::Message(ServerEvent::message(data)))
    }

    /// Deliver an event of a named type
    pub fn event(&self, event_type: impl Into<String>, data: impl Into<String>) -> bool {
        self.emit(EventSourceEvent::Message(ServerEvent::named(event_type, data)))
    }

    /// Deliver a fully built event
    pub fn emit_event(&self, event: ServerEvent) -> bool {
        self.emit(EventSourceEvent::Message(event))
    }

    /// Raise an error; `closed` marks the stream as given up
    pub fn error(&self, message: impl Into<String>, closed: bool) -> bool {
        let sent = self.emit(EventSourceEvent::Error {
            message: message.into(),
            closed,
        });
        if closed {
            lock(&self.shared).current = None;
        }
        sent
    }

    /// True while a connection is attached
    pub fn is_attached(&self) -> bool {
        lock(&self.shared).current.is_some()
    }

    /// Number of successful opens so far
    pub fn open_count(&self) -> usize {
        lock(&self.shared).opened_urls.len()
    }

    /// Number of times the client closed a connection
    pub fn close_count(&self) -> usize {
        lock(&self.shared).close_count
    }

    /// Settings passed on the most recent open
    pub fn last_init(&self) -> Option<EventSourceInit> {
        lock(&self.shared).last_init
    }

    /// Make the next open fail with `reason`
    pub fn fail_next_open(&self, reason: impl Into<String>) {
        lock(&self.shared).fail_next_open = Some(reason.into());
    }
}
