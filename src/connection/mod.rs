//! Live connections feeding the log pipeline
//!
//! Two client kinds share one capability set, [`ConnectionClient`]:
//! [`StreamSocketClient`] over a bidirectional socket and
//! [`EventStreamClient`] over a server-push stream. Both decode inbound
//! frames to text with the shared policy in [`format`] and hand the result to
//! the consumer's message handler.
//!
//! Transports are pluggable ([`transport`]). [`channel`] provides in-process
//! transports driven by a peer handle, [`http`] streams server-sent events
//! over HTTP and [`sse`] decodes that wire format.

pub mod channel;
pub mod event_stream;
pub mod format;
pub mod http;
pub mod socket;
pub mod sse;
pub mod transport;

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

pub use channel::{ChannelEventSourceTransport, ChannelSocketTransport, EventSourcePeer, SocketPeer};
pub use event_stream::{EventListener, EventStreamClient, EventStreamOptions, ListenerId};
pub use format::{format_payload, ClientCallbacks, ErrorHandler, MessageFormatter, MessageHandler, Payload};
pub use http::HttpEventSourceTransport;
pub use socket::{SocketOptions, StreamSocketClient};
pub use sse::{SseDecoder, MAX_LINE_BYTES};
pub use transport::{
    CloseFrame, EventSourceEvent, EventSourceInit, EventSourceTransport, ServerEvent, SocketEvent,
    SocketFrame, SocketTransport, TransportError,
};

/// Called when a connection opens
pub type OpenHook = Arc<dyn Fn() + Send + Sync>;

/// Called with the raw transport message when a transport error is seen
pub type ErrorHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Lifecycle of one client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport, nothing scheduled
    #[default]
    Disconnected,
    /// Transport created, waiting for it to open
    Connecting,
    /// Transport open, frames flowing
    Open,
    /// Transport gone, a reconnect timer is armed
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Capability set shared by every client kind
pub trait ConnectionClient: Send + Sync {
    /// Target address
    fn url(&self) -> &str;

    /// Open a transport, replacing any existing one
    ///
    /// Returns immediately; open, message, error and close arrive later
    /// through the configured callbacks.
    fn connect(&self);

    /// Release the transport and cancel every pending timer
    ///
    /// Safe to call any number of times.
    fn disconnect(&self);

    /// True while the transport is open
    fn is_connected(&self) -> bool;

    /// Current lifecycle state
    fn state(&self) -> ConnectionState;

    /// Send a payload; unidirectional clients always return `false`
    fn send(&self, _payload: Payload) -> bool {
        false
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spawn on the current runtime, if there is one
pub(crate) fn spawn_task<F>(future: F) -> Option<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::runtime::Handle::try_current()
        .ok()
        .map(|runtime| runtime.spawn(future))
}

/// Abort a task handle if present
pub(crate) fn abort_task(handle: &mut Option<JoinHandle<()>>) {
    if let Some(task) = handle.take() {
        task.abort();
    }
}
