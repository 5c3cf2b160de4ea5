//! Server-sent events over HTTP
//!
//! Streams a URL with `reqwest`, decodes the body as `text/event-stream` and
//! reconnects on its own after network failures, sending `Last-Event-ID`.
//! A non-2xx status or a foreign content type ends the stream for good.

use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, Url};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use super::sse::SseDecoder;
use super::transport::{
    EventSourceConnection, EventSourceEvent, EventSourceHandle, EventSourceInit,
    EventSourceTransport, TransportError,
};
use crate::error::{Error, Result};

/// Wait between reconnects until the server sends `retry:`
pub const DEFAULT_RETRY: Duration = Duration::from_secs(3);

const EVENT_STREAM_MIME: &str = "text/event-stream";
const LAST_EVENT_ID_HEADER: &str = "Last-Event-ID";

/// Push transport reading server-sent events from an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpEventSourceTransport {
    client: Client,
    default_retry: Duration,
}

impl HttpEventSourceTransport {
    /// Create a transport with its own HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::TransportOpenFailed {
                url: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self::with_client(client))
    }

    /// Create a transport sharing an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            default_retry: DEFAULT_RETRY,
        }
    }

    /// Wait between reconnects when the server does not say
    pub fn with_default_retry(mut self, retry: Duration) -> Self {
        self.default_retry = retry;
        self
    }
}

impl EventSourceTransport for HttpEventSourceTransport {
    fn open(&self, url: &str, init: EventSourceInit) -> std::result::Result<EventSourceConnection, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                url,
                parsed.scheme()
            )));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| TransportError::Open("no Tokio runtime".to_string()))?;

        if init.with_credentials {
            // Cookies and auth headers come from the supplied client
            debug!(url, "with_credentials has no effect beyond the HTTP client's own settings");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(run_stream(self.client.clone(), parsed, self.default_retry, tx));

        Ok(EventSourceConnection {
            handle: Box::new(HttpEventSourceHandle { task: Some(task) }),
            events: rx,
        })
    }
}

struct HttpEventSourceHandle {
    task: Option<JoinHandle<()>>,
}

impl EventSourceHandle for HttpEventSourceHandle {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for HttpEventSourceHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Why one HTTP attempt ended
enum AttemptEnd {
    /// Retry after the reconnection time
    Retry(String),
    /// Give up
    Fatal(String),
    /// Receiver gone
    Abandoned,
}

async fn run_stream(client: Client, url: Url, default_retry: Duration, tx: UnboundedSender<EventSourceEvent>) {
    let mut decoder = SseDecoder::new();

    loop {
        match stream_once(&client, &url, &mut decoder, &tx).await {
            AttemptEnd::Abandoned => return,
            AttemptEnd::Fatal(message) => {
                let _ = tx.send(EventSourceEvent::Error {
                    message,
                    closed: true,
                });
                return;
            }
            AttemptEnd::Retry(message) => {
                if tx.send(EventSourceEvent::Error { message, closed: false }).is_err() {
                    return;
                }
            }
        }

        decoder.reset_event();
        let wait = decoder.retry().unwrap_or(default_retry);
        debug!(url = %url, "Event stream reconnecting in {:?}", wait);
        tokio::time::sleep(wait).await;
    }
}

async fn stream_once(
    client: &Client,
    url: &Url,
    decoder: &mut SseDecoder,
    tx: &UnboundedSender<EventSourceEvent>,
) -> AttemptEnd {
    let mut request = client
        .get(url.clone())
        .header(ACCEPT, EVENT_STREAM_MIME)
        .header(CACHE_CONTROL, "no-cache");
    if let Some(id) = decoder.last_event_id() {
        request = request.header(LAST_EVENT_ID_HEADER, id);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return AttemptEnd::Retry(format!("request failed: {}", e)),
    };

    let status = response.status();
    if !status.is_success() {
        return AttemptEnd::Fatal(TransportError::Status(status.as_u16()).to_string());
    }
    let is_event_stream = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().starts_with(EVENT_STREAM_MIME));
    if !is_event_stream {
        return AttemptEnd::Fatal(format!("unexpected content type, expected {}", EVENT_STREAM_MIME));
    }

    if tx.send(EventSourceEvent::Open).is_err() {
        return AttemptEnd::Abandoned;
    }

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => return AttemptEnd::Retry(TransportError::Stream(e.to_string()).to_string()),
        };
        for event in decoder.feed(&bytes) {
            if tx.send(EventSourceEvent::Message(event)).is_err() {
                return AttemptEnd::Abandoned;
            }
        }
    }

    AttemptEnd::Retry("stream ended".to_string())
}
