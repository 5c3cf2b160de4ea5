//! Bidirectional socket client
//!
//! Wraps one [`SocketTransport`] connection at a time. Inbound frames are
//! formatted and delivered in arrival order. An unexpected close can arm a
//! reconnect timer; an explicit [`StreamSocketClient::disconnect`] never does.

use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use super::format::{format_payload, ClientCallbacks, MessageFormatter, Payload};
use super::transport::{
    CloseFrame, SocketEvent, SocketFrame, SocketSink, SocketTransport, CLIENT_DISCONNECT_REASON,
    NORMAL_CLOSURE,
};
use super::{abort_task, lock, spawn_task, ConnectionClient, ConnectionState, ErrorHook, OpenHook};
use crate::error::Error;

/// Called with the close frame when the socket closes
pub type CloseHook = Arc<dyn Fn(&CloseFrame) + Send + Sync>;

/// Default wait before a reconnect attempt
pub const DEFAULT_RECONNECT_WAIT: Duration = Duration::from_secs(1);

/// Options for [`StreamSocketClient`]
#[derive(Clone)]
pub struct SocketOptions {
    /// Reconnect after an unexpected close
    pub reconnect: bool,
    /// Wait before reconnecting
    pub reconnect_wait: Duration,
    /// Custom inbound formatter
    pub format_message: Option<MessageFormatter>,
    pub on_open: Option<OpenHook>,
    pub on_close: Option<CloseHook>,
    pub on_error: Option<ErrorHook>,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            reconnect: false,
            reconnect_wait: DEFAULT_RECONNECT_WAIT,
            format_message: None,
            on_open: None,
            on_close: None,
            on_error: None,
        }
    }
}

impl SocketOptions {
    /// Reconnect after `wait` when the socket closes unexpectedly
    pub fn with_reconnect(mut self, wait: Duration) -> Self {
        self.reconnect = true;
        self.reconnect_wait = wait;
        self
    }

    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&Payload) -> String + Send + Sync + 'static,
    {
        self.format_message = Some(Arc::new(formatter));
        self
    }

    pub fn on_open<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_open = Some(Arc::new(hook));
        self
    }

    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CloseFrame) + Send + Sync + 'static,
    {
        self.on_close = Some(Arc::new(hook));
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for SocketOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketOptions")
            .field("reconnect", &self.reconnect)
            .field("reconnect_wait", &self.reconnect_wait)
            .field("format_message", &self.format_message.is_some())
            .finish_non_exhaustive()
    }
}

/// Mutable part of the client, guarded by one lock
#[derive(Default)]
struct SocketShared {
    /// Bumped on every connect and disconnect; tasks of older epochs stop
    epoch: u64,
    state: ConnectionState,
    sink: Option<Box<dyn SocketSink>>,
    pump: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
}

impl SocketShared {
    /// End the current epoch: cancel tasks and close the sink
    fn teardown(&mut self, code: u16, reason: &str) {
        self.epoch += 1;
        abort_task(&mut self.pump);
        abort_task(&mut self.reconnect_timer);
        if let Some(mut sink) = self.sink.take() {
            sink.close(code, reason);
        }
        self.state = ConnectionState::Disconnected;
    }
}

struct SocketInner {
    url: String,
    options: SocketOptions,
    callbacks: ClientCallbacks,
    transport: Arc<dyn SocketTransport>,
    shared: Mutex<SocketShared>,
}

/// Client for a bidirectional socket endpoint
pub struct StreamSocketClient {
    inner: Arc<SocketInner>,
}

impl StreamSocketClient {
    /// Create a disconnected client
    pub fn new(
        url: impl Into<String>,
        transport: Arc<dyn SocketTransport>,
        callbacks: ClientCallbacks,
        options: SocketOptions,
    ) -> Self {
        Self {
            inner: Arc::new(SocketInner {
                url: url.into(),
                options,
                callbacks,
                transport,
                shared: Mutex::new(SocketShared::default()),
            }),
        }
    }

    /// Target address
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Open the socket, replacing any existing connection
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// Close with code 1000 and cancel any pending reconnect
    pub fn disconnect(&self) {
        self.disconnect_with(NORMAL_CLOSURE, CLIENT_DISCONNECT_REASON);
    }

    /// Close with a specific code and reason
    pub fn disconnect_with(&self, code: u16, reason: &str) {
        let mut shared = lock(&self.inner.shared);
        let had_transport = shared.sink.is_some();
        shared.teardown(code, reason);
        if had_transport {
            debug!(url = %self.inner.url, code, "WebSocket disconnected by client");
        }
    }

    /// True while the socket is open
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.shared).state
    }

    /// Send a payload; `false` when not open or when the send fails
    pub fn send(&self, payload: Payload) -> bool {
        let frame = match payload {
            Payload::Text(text) => SocketFrame::Text(text),
            Payload::Binary(bytes) => SocketFrame::Binary(bytes),
            Payload::Json(value) => match serde_json::to_string(&value) {
                Ok(text) => SocketFrame::Text(text),
                Err(e) => {
                    self.report_serialization_failure(e);
                    return false;
                }
            },
        };
        self.inner.send_frame(frame)
    }

    /// Send a text frame
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.inner.send_frame(SocketFrame::Text(text.into()))
    }

    /// Serialize `value` to JSON and send it as a text frame
    pub fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        if !self.is_connected() {
            warn!("Cannot send: WebSocket is not connected");
            return false;
        }
        match serde_json::to_string(value) {
            Ok(text) => self.inner.send_frame(SocketFrame::Text(text)),
            Err(e) => {
                self.report_serialization_failure(e);
                false
            }
        }
    }

    fn report_serialization_failure(&self, err: serde_json::Error) {
        self.inner.callbacks.report_error(&Error::SerializationFailed {
            reason: err.to_string(),
        });
    }
}

impl SocketInner {
    fn current_epoch(&self) -> u64 {
        lock(&self.shared).epoch
    }

    fn connect(self: &Arc<Self>) {
        if tokio::runtime::Handle::try_current().is_err() {
            self.callbacks.report_error(&Error::NoRuntime);
            return;
        }

        let epoch = {
            let mut shared = lock(&self.shared);
            shared.teardown(NORMAL_CLOSURE, CLIENT_DISCONNECT_REASON);
            shared.state = ConnectionState::Connecting;
            shared.epoch
        };

        let connection = match self.transport.open(&self.url) {
            Ok(connection) => connection,
            Err(e) => {
                {
                    let mut shared = lock(&self.shared);
                    if shared.epoch == epoch {
                        shared.state = ConnectionState::Disconnected;
                    }
                }
                self.callbacks.report_error(&Error::TransportOpenFailed {
                    url: self.url.clone(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        let mut sink = connection.sink;
        let mut shared = lock(&self.shared);
        if shared.epoch != epoch {
            // Superseded while the transport was opening
            sink.close(NORMAL_CLOSURE, CLIENT_DISCONNECT_REASON);
            return;
        }
        shared.sink = Some(sink);
        shared.pump = spawn_task(run_pump(Arc::downgrade(self), epoch, connection.events));
        debug!(url = %self.url, epoch, "WebSocket connecting");
    }

    fn send_frame(&self, frame: SocketFrame) -> bool {
        let result = {
            let mut guard = lock(&self.shared);
            let shared = &mut *guard;
            match shared.sink.as_mut() {
                Some(sink) if shared.state == ConnectionState::Open => sink.send(frame),
                _ => {
                    warn!("Cannot send: WebSocket is not connected");
                    return false;
                }
            }
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                self.callbacks.report_error(&Error::SendFailed {
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    fn handle_event(self: &Arc<Self>, epoch: u64, event: SocketEvent) {
        match event {
            SocketEvent::Open => {
                {
                    let mut shared = lock(&self.shared);
                    if shared.epoch != epoch {
                        return;
                    }
                    shared.state = ConnectionState::Open;
                }
                info!(url = %self.url, "WebSocket connection established");
                if let Some(hook) = &self.options.on_open {
                    hook();
                }
            }
            SocketEvent::Message(frame) => {
                let payload = match frame {
                    SocketFrame::Text(text) => Payload::Text(text),
                    SocketFrame::Binary(bytes) => Payload::Binary(bytes),
                };
                if let Some(text) = format_payload(self.options.format_message.as_ref(), &payload) {
                    self.callbacks.deliver(text);
                }
            }
            SocketEvent::Error(message) => {
                if let Some(hook) = &self.options.on_error {
                    hook(&message);
                }
                self.callbacks.report_error(&Error::Transport {
                    url: self.url.clone(),
                    reason: message,
                });
            }
            SocketEvent::Close(frame) => self.handle_close(epoch, frame),
        }
    }

    fn handle_close(self: &Arc<Self>, epoch: u64, frame: CloseFrame) {
        {
            let mut shared = lock(&self.shared);
            if shared.epoch != epoch {
                return;
            }
            shared.state = ConnectionState::Disconnected;
            shared.sink = None;
            // Running inside the pump: detach rather than abort
            shared.pump = None;
        }
        info!(url = %self.url, code = frame.code, reason = %frame.reason, "WebSocket connection closed");

        if let Some(hook) = &self.options.on_close {
            hook(&frame);
        }

        if self.options.reconnect {
            self.schedule_reconnect(epoch);
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, epoch: u64) {
        let mut shared = lock(&self.shared);
        // The close hook may have reconnected or disconnected already
        if shared.epoch != epoch {
            return;
        }

        let wait = self.options.reconnect_wait;
        info!(url = %self.url, "Attempting to reconnect in {:?}...", wait);

        let weak = Arc::downgrade(self);
        shared.state = ConnectionState::Reconnecting;
        shared.reconnect_timer = spawn_task(async move {
            tokio::time::sleep(wait).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut shared = lock(&inner.shared);
                if shared.epoch != epoch {
                    return;
                }
                // This task is the timer: detach its handle before connecting
                shared.reconnect_timer = None;
            }
            inner.connect();
        });
    }
}

async fn run_pump(weak: Weak<SocketInner>, epoch: u64, mut events: UnboundedReceiver<SocketEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if inner.current_epoch() != epoch {
            return;
        }
        let closing = matches!(event, SocketEvent::Close(_));
        inner.handle_event(epoch, event);
        if closing {
            return;
        }
    }

    // Event stream ended without a close frame
    if let Some(inner) = weak.upgrade() {
        if inner.current_epoch() == epoch {
            inner.handle_close(epoch, CloseFrame::abnormal());
        }
    }
}

impl ConnectionClient for StreamSocketClient {
    fn url(&self) -> &str {
        StreamSocketClient::url(self)
    }

    fn connect(&self) {
        StreamSocketClient::connect(self);
    }

    fn disconnect(&self) {
        StreamSocketClient::disconnect(self);
    }

    fn is_connected(&self) -> bool {
        StreamSocketClient::is_connected(self)
    }

    fn state(&self) -> ConnectionState {
        StreamSocketClient::state(self)
    }

    fn send(&self, payload: Payload) -> bool {
        StreamSocketClient::send(self, payload)
    }
}

impl fmt::Debug for StreamSocketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSocketClient")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for StreamSocketClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
