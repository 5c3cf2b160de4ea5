//! Server-push event stream client
//!
//! Wraps one push connection at a time and applies the stream quality
//! policies: consecutive empty frames past a threshold shut the client down,
//! an optional event budget closes it after the last allowed delivery, and an
//! optional delay spreads deliveries out through a FIFO queue.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use super::format::{format_payload, ClientCallbacks, MessageFormatter, Payload};
use super::transport::{
    EventSourceEvent, EventSourceHandle, EventSourceInit, EventSourceTransport, ServerEvent,
};
use super::{abort_task, lock, spawn_task, ConnectionClient, ConnectionState, ErrorHook, OpenHook};
use crate::error::Error;

/// Default number of consecutive empty frames tolerated
pub const DEFAULT_MAX_EMPTY_EVENTS: u32 = 100;

/// Default wait before a manual reconnect attempt
pub const DEFAULT_RECONNECT_WAIT: Duration = Duration::from_secs(1);

/// Keep-alive token some servers send as event data
const NO_OP_TOKEN: &str = ":ok";

/// Handler for a named event type
pub type EventListener = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Identifies a registered named-event listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Options for [`EventStreamClient`]
#[derive(Clone)]
pub struct EventStreamOptions {
    /// `None` leaves reconnection to the transport, `Some(false)` treats any
    /// error as final, `Some(true)` reconnects manually after a terminal close
    pub reconnect: Option<bool>,
    /// Wait before a manual reconnect
    pub reconnect_wait: Duration,
    /// Custom inbound formatter
    pub format_message: Option<MessageFormatter>,
    /// Close after this many delivered events
    pub max_events: Option<u64>,
    /// Spread deliveries out by this interval
    pub event_delay: Option<Duration>,
    /// Consecutive empty frames tolerated before shutting down
    pub max_empty_events: u32,
    /// Passed to the transport on open
    pub with_credentials: bool,
    pub on_open: Option<OpenHook>,
    /// Called when the transport closes for good
    pub on_close: Option<OpenHook>,
    pub on_error: Option<ErrorHook>,
}

impl Default for EventStreamOptions {
    fn default() -> Self {
        Self {
            reconnect: None,
            reconnect_wait: DEFAULT_RECONNECT_WAIT,
            format_message: None,
            max_events: None,
            event_delay: None,
            max_empty_events: DEFAULT_MAX_EMPTY_EVENTS,
            with_credentials: false,
            on_open: None,
            on_close: None,
            on_error: None,
        }
    }
}

impl EventStreamOptions {
    pub fn with_reconnect(mut self, reconnect: bool, wait: Duration) -> Self {
        self.reconnect = Some(reconnect);
        self.reconnect_wait = wait;
        self
    }

    pub fn with_max_events(mut self, max: u64) -> Self {
        self.max_events = Some(max);
        self
    }

    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = Some(delay);
        self
    }

    pub fn with_max_empty_events(mut self, max: u32) -> Self {
        self.max_empty_events = max;
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
        F: Fn() + Send + Sync + 'static,
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

    /// Delay in effect, zero meaning none
    fn delay(&self) -> Option<Duration> {
        self.event_delay.filter(|delay| !delay.is_zero())
    }
}

impl fmt::Debug for EventStreamOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStreamOptions")
            .field("reconnect", &self.reconnect)
            .field("reconnect_wait", &self.reconnect_wait)
            .field("max_events", &self.max_events)
            .field("event_delay", &self.event_delay)
            .field("max_empty_events", &self.max_empty_events)
            .field("with_credentials", &self.with_credentials)
            .finish_non_exhaustive()
    }
}

/// Empty, whitespace-only or keep-alive data
fn is_empty_frame(data: &str) -> bool {
    data == NO_OP_TOKEN || data.trim().is_empty()
}

#[derive(Default)]
struct EventShared {
    /// Bumped on every connect and disconnect; tasks of older epochs stop
    epoch: u64,
    state: ConnectionState,
    handle: Option<Box<dyn EventSourceHandle>>,
    pump: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    drain: Option<JoinHandle<()>>,
    queue: VecDeque<String>,
    event_count: u64,
    empty_count: u32,
    listeners: HashMap<String, Vec<(ListenerId, EventListener)>>,
    next_listener_id: u64,
}

impl EventShared {
    /// End the current epoch; returns the messages still queued
    fn teardown(&mut self) -> VecDeque<String> {
        self.epoch += 1;
        abort_task(&mut self.pump);
        abort_task(&mut self.reconnect_timer);
        abort_task(&mut self.drain);
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
        self.listeners.clear();
        self.state = ConnectionState::Disconnected;
        std::mem::take(&mut self.queue)
    }
}

/// Why a frame ended the epoch
enum PolicyShutdown {
    EmptyFlood(u32),
    MaxEvents(u64),
}

struct EventInner {
    url: String,
    options: EventStreamOptions,
    callbacks: ClientCallbacks,
    transport: Arc<dyn EventSourceTransport>,
    shared: Mutex<EventShared>,
}

/// Client for a server-push event stream endpoint
pub struct EventStreamClient {
    inner: Arc<EventInner>,
}

impl EventStreamClient {
    /// Create a disconnected client
    pub fn new(
        url: impl Into<String>,
        transport: Arc<dyn EventSourceTransport>,
        callbacks: ClientCallbacks,
        options: EventStreamOptions,
    ) -> Self {
        Self {
            inner: Arc::new(EventInner {
                url: url.into(),
                options,
                callbacks,
                transport,
                shared: Mutex::new(EventShared::default()),
            }),
        }
    }

    /// Target address
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Open the stream, replacing any existing one and resetting counters
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// Close the stream, drop queued messages and remove all listeners
    pub fn disconnect(&self) {
        let dropped = lock(&self.inner.shared).teardown();
        if !dropped.is_empty() {
            debug!(url = %self.inner.url, dropped = dropped.len(), "Discarded queued events");
        }
    }

    /// True while the stream is open
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        lock(&self.inner.shared).state
    }

    /// Events delivered (or queued) in the current epoch
    pub fn event_count(&self) -> u64 {
        lock(&self.inner.shared).event_count
    }

    /// Consecutive empty frames seen
    pub fn empty_event_count(&self) -> u32 {
        lock(&self.inner.shared).empty_count
    }

    /// Messages waiting in the delay queue
    pub fn pending_messages(&self) -> usize {
        lock(&self.inner.shared).queue.len()
    }

    /// Listen for a named event type on the current connection
    ///
    /// Returns `None` when there is no active connection. Listeners live until
    /// removed or until the connection ends.
    pub fn add_event_listener<F>(&self, event_type: impl Into<String>, listener: F) -> Option<ListenerId>
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        let mut shared = lock(&self.inner.shared);
        if shared.handle.is_none() {
            error!("Cannot add event listener: EventSource is not connected");
            return None;
        }

        shared.next_listener_id += 1;
        let id = ListenerId(shared.next_listener_id);
        shared
            .listeners
            .entry(event_type.into())
            .or_default()
            .push((id, Arc::new(listener)));
        Some(id)
    }

    /// Remove a listener added with [`Self::add_event_listener`]
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut shared = lock(&self.inner.shared);
        if shared.handle.is_none() {
            error!("Cannot remove event listener: EventSource is not connected");
            return false;
        }

        let mut removed = false;
        shared.listeners.retain(|_, listeners| {
            let before = listeners.len();
            listeners.retain(|(listener_id, _)| *listener_id != id);
            removed |= listeners.len() != before;
            !listeners.is_empty()
        });
        removed
    }

    /// Number of listeners registered for `event_type`
    pub fn listener_count(&self, event_type: &str) -> usize {
        lock(&self.inner.shared)
            .listeners
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

impl EventInner {
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
            shared.teardown();
            shared.event_count = 0;
            shared.empty_count = 0;
            shared.state = ConnectionState::Connecting;
            shared.epoch
        };

        let init = EventSourceInit {
            with_credentials: self.options.with_credentials,
        };
        let connection = match self.transport.open(&self.url, init) {
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

        let mut handle = connection.handle;
        let mut shared = lock(&self.shared);
        if shared.epoch != epoch {
            handle.close();
            return;
        }
        shared.handle = Some(handle);
        shared.pump = spawn_task(run_pump(Arc::downgrade(self), epoch, connection.events));
        debug!(url = %self.url, epoch, "EventSource connecting");
    }

    fn handle_event(self: &Arc<Self>, epoch: u64, event: EventSourceEvent) {
        match event {
            EventSourceEvent::Open => {
                {
                    let mut shared = lock(&self.shared);
                    if shared.epoch != epoch {
                        return;
                    }
                    shared.state = ConnectionState::Open;
                }
                info!(url = %self.url, "EventSource connection established");
                if let Some(hook) = &self.options.on_open {
                    hook();
                }
            }
            EventSourceEvent::Message(event) if !event.is_default_type() => {
                self.dispatch_named(epoch, &event);
            }
            EventSourceEvent::Message(event) => self.handle_message(epoch, event),
            EventSourceEvent::Error { message, closed } => self.handle_error(epoch, message, closed),
        }
    }

    fn dispatch_named(&self, epoch: u64, event: &ServerEvent) {
        let listeners: Vec<EventListener> = {
            let shared = lock(&self.shared);
            if shared.epoch != epoch {
                return;
            }
            shared
                .listeners
                .get(&event.event_type)
                .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };

        for listener in listeners {
            listener(event);
        }
    }

    fn handle_message(self: &Arc<Self>, epoch: u64, event: ServerEvent) {
        if is_empty_frame(&event.data) {
            let flooded = {
                let mut shared = lock(&self.shared);
                if shared.epoch != epoch {
                    return;
                }
                shared.empty_count += 1;
                (shared.empty_count > self.options.max_empty_events).then_some(shared.empty_count)
            };
            if let Some(count) = flooded {
                warn!(url = %self.url, "Received {} consecutive empty events, disconnecting", count);
                self.policy_shutdown(epoch, PolicyShutdown::EmptyFlood(count));
            }
            return;
        }

        {
            let mut shared = lock(&self.shared);
            if shared.epoch != epoch {
                return;
            }
            shared.empty_count = 0;
        }

        let Some(text) = format_payload(self.options.format_message.as_ref(), &Payload::Text(event.data)) else {
            return;
        };
        if text.trim().is_empty() {
            debug!(url = %self.url, "Formatter produced an empty message, skipping");
            return;
        }

        let (immediate, limit_hit) = {
            let mut shared = lock(&self.shared);
            if shared.epoch != epoch {
                return;
            }
            shared.event_count += 1;
            let limit_hit = self
                .options
                .max_events
                .filter(|max| shared.event_count >= *max);

            match self.options.delay() {
                Some(delay) => {
                    shared.queue.push_back(text);
                    if shared.drain.is_none() && limit_hit.is_none() {
                        shared.drain = spawn_task(run_drain(Arc::downgrade(self), epoch, delay));
                    }
                    (None, limit_hit)
                }
                None => (Some(text), limit_hit),
            }
        };

        if let Some(text) = immediate {
            self.callbacks.deliver(text);
        }

        if let Some(max) = limit_hit {
            info!(url = %self.url, "Maximum events ({}) reached, closing connection", max);
            self.policy_shutdown(epoch, PolicyShutdown::MaxEvents(max));
        }
    }

    /// Disconnect on a threshold breach and report it once
    fn policy_shutdown(&self, epoch: u64, reason: PolicyShutdown) {
        let pending = {
            let mut shared = lock(&self.shared);
            if shared.epoch != epoch {
                return;
            }
            shared.teardown()
        };

        let err = match reason {
            PolicyShutdown::EmptyFlood(count) => Error::EmptyEventFlood {
                url: self.url.clone(),
                count,
            },
            PolicyShutdown::MaxEvents(max) => {
                // Everything accepted before the limit still goes out, in order
                for text in pending {
                    self.callbacks.deliver(text);
                }
                Error::MaxEventsReached {
                    url: self.url.clone(),
                    max,
                }
            }
        };
        self.callbacks.report_error(&err);
    }

    fn handle_error(self: &Arc<Self>, epoch: u64, message: String, closed: bool) {
        if let Some(hook) = &self.options.on_error {
            hook(&message);
        }
        self.callbacks.report_error(&Error::Transport {
            url: self.url.clone(),
            reason: message,
        });

        match self.options.reconnect {
            Some(false) => {
                let had_transport = {
                    let mut shared = lock(&self.shared);
                    if shared.epoch != epoch {
                        return;
                    }
                    let had = shared.handle.is_some();
                    shared.teardown();
                    had
                };
                if had_transport {
                    self.notify_closed();
                }
            }
            _ if closed => self.handle_closed(epoch),
            _ => {
                // Transport retries on its own
                let mut shared = lock(&self.shared);
                if shared.epoch == epoch {
                    shared.state = ConnectionState::Connecting;
                }
            }
        }
    }

    /// The transport gave up for good
    fn handle_closed(self: &Arc<Self>, epoch: u64) {
        {
            let mut shared = lock(&self.shared);
            if shared.epoch != epoch {
                return;
            }
            if let Some(mut handle) = shared.handle.take() {
                handle.close();
            }
            // Running inside the pump: detach rather than abort
            shared.pump = None;
            shared.listeners.clear();
            shared.state = ConnectionState::Disconnected;
        }
        self.notify_closed();

        if self.options.reconnect == Some(true) {
            self.schedule_reconnect(epoch);
        }
    }

    fn notify_closed(&self) {
        info!(url = %self.url, "EventSource connection closed");
        if let Some(hook) = &self.options.on_close {
            hook();
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, epoch: u64) {
        let mut shared = lock(&self.shared);
        // The close hook may have reconnected or disconnected already
        if shared.epoch != epoch || shared.handle.is_some() {
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
                shared.reconnect_timer = None;
            }
            inner.connect();
        });
    }
}

async fn run_pump(weak: Weak<EventInner>, epoch: u64, mut events: UnboundedReceiver<EventSourceEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if inner.current_epoch() != epoch {
            return;
        }
        let terminal = matches!(event, EventSourceEvent::Error { closed: true, .. });
        inner.handle_event(epoch, event);
        if terminal {
            return;
        }
    }

    // Stream ended without a terminal error
    if let Some(inner) = weak.upgrade() {
        if inner.current_epoch() == epoch {
            inner.handle_closed(epoch);
        }
    }
}

/// Deliver queued messages one per `delay`, stopping when the queue empties
async fn run_drain(weak: Weak<EventInner>, epoch: u64, delay: Duration) {
    loop {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let next = {
            let mut shared = lock(&inner.shared);
            if shared.epoch != epoch {
                return;
            }
            match shared.queue.pop_front() {
                Some(text) => text,
                None => {
                    shared.drain = None;
                    return;
                }
            }
        };
        inner.callbacks.deliver(next);
        drop(inner);

        tokio::time::sleep(delay).await;
    }
}

impl ConnectionClient for EventStreamClient {
    fn url(&self) -> &str {
        EventStreamClient::url(self)
    }

    fn connect(&self) {
        EventStreamClient::connect(self);
    }

    fn disconnect(&self) {
        EventStreamClient::disconnect(self);
    }

    fn is_connected(&self) -> bool {
        EventStreamClient::is_connected(self)
    }

    fn state(&self) -> ConnectionState {
        EventStreamClient::state(self)
    }
}

impl fmt::Debug for EventStreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStreamClient")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for EventStreamClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
