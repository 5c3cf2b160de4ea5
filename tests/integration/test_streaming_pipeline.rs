//! End-to-end tests: connection clients feeding a log view
//!
//! Channel transports cover the client side; a throwaway HTTP server on
//! localhost covers the server-sent events transport over real sockets.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use lazylog::connection::{
    ChannelEventSourceTransport, ChannelSocketTransport, ClientCallbacks, EventStreamClient,
    EventStreamOptions, HttpEventSourceTransport, SocketOptions, StreamSocketClient,
};
use lazylog::{message_sink, ConnectionState, HighlightSpec, LogView, ViewerConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_utils::settle;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[cfg(test)]
mod channel_pipeline {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_socket_messages_land_in_view() {
        let view = LogView::from_config(&ViewerConfig::default()).into_shared();
        let (transport, peer) = ChannelSocketTransport::new();
        let client = StreamSocketClient::new(
            "ws://logs/tail",
            Arc::new(transport),
            ClientCallbacks::from_handler(message_sink(&view)),
            SocketOptions::default(),
        );

        client.connect();
        peer.open();
        peer.message("\x1b[32mINFO\x1b[0m started");
        peer.message("\x1b[31mERROR\x1b[0m failed\n\x1b[31mERROR\x1b[0m again");
        settle().await;

        let mut view = view.lock().unwrap();
        assert_eq!(view.line_count(), 3);
        let numbers: Vec<usize> = view.lines().iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        assert_eq!(view.search("ERROR").len(), 2);
        assert_eq!(view.search_state().lines_with_matches(), vec![2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_follows_live_stream() {
        let view = LogView::default().into_shared();
        view.lock().unwrap().search("timeout");

        let (transport, peer) = ChannelEventSourceTransport::new();
        let client = EventStreamClient::new(
            "http://logs/events",
            Arc::new(transport),
            ClientCallbacks::from_handler(message_sink(&view)),
            EventStreamOptions::default(),
        );
        client.connect();
        peer.open();
        peer.message("request 1 ok");
        peer.message("request 2 timeout");
        peer.message("request 3 timeout");
        settle().await;

        let mut view = view.lock().unwrap();
        assert_eq!(view.search_state().matches().len(), 2);
        assert_eq!(view.search_state().active_index(), 0);
        assert_eq!(view.next_match().map(|m| m.line_number), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrapped_stream_with_highlight() {
        let mut config = ViewerConfig::default();
        config.display.wrap_lines = true;
        config.display.max_line_length = 20;
        let view = LogView::from_config(&config).into_shared();
        view.lock().unwrap().set_highlight(Some(HighlightSpec::from_numbers(vec![2, 3])));

        let (transport, peer) = ChannelSocketTransport::new();
        let client = StreamSocketClient::new(
            "ws://logs/tail",
            Arc::new(transport),
            ClientCallbacks::from_handler(message_sink(&view)),
            config.socket_options(),
        );
        client.connect();
        peer.open();
        peer.message("short");
        peer.message("x".repeat(30));
        settle().await;

        let view = view.lock().unwrap();
        assert_eq!(view.line_count(), 3);
        assert!(view.lines()[2].plain_text().starts_with(lazylog::text::CONTINUATION_MARKER));
        assert!(!view.is_highlighted(1));
        assert!(view.is_highlighted(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_stream_budget_end_to_end() {
        let mut config = ViewerConfig::default();
        config.eventsource.event_delay_ms = Some(50);
        config.eventsource.max_events = Some(3);

        let view = LogView::default().into_shared();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let error_sink = Arc::clone(&errors);
        let callbacks = ClientCallbacks::from_handler(message_sink(&view))
            .with_error_handler(move |err| error_sink.lock().unwrap().push(err.is_policy_shutdown()));

        let (transport, peer) = ChannelEventSourceTransport::new();
        let client = EventStreamClient::new(
            "http://logs/events",
            Arc::new(transport),
            callbacks,
            config.event_stream_options(),
        );
        client.connect();
        peer.message("one");
        settle().await;
        assert_eq!(view.lock().unwrap().line_count(), 1);

        peer.message("two");
        peer.message("three");
        settle().await;

        assert_eq!(view.lock().unwrap().line_count(), 3);
        assert_eq!(*errors.lock().unwrap(), vec![true]);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}

#[cfg(test)]
mod http_event_source {
    use super::*;

    /// Read one request head, returning it as text
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    async fn respond_events(stream: &mut TcpStream, body: &str) {
        let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n";
        stream.write_all(head.as_bytes()).await.unwrap();
        stream.write_all(body.as_bytes()).await.unwrap();
        stream.flush().await.unwrap();
    }

    async fn wait_until<F: Fn() -> bool>(condition: F) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within 5s");
    }

    #[tokio::test]
    async fn test_streams_events_and_resumes_with_last_id() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/events", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        let server = tokio::spawn(async move {
            let (mut first, _) = listener.accept().await.unwrap();
            let request = read_request(&mut first).await;
            seen.lock().unwrap().push(request);
            respond_events(&mut first, "retry: 20\nid: 5\ndata: alpha\n\ndata: beta\n\n").await;
            drop(first);

            let (mut second, _) = listener.accept().await.unwrap();
            let request = read_request(&mut second).await;
            seen.lock().unwrap().push(request);
            respond_events(&mut second, "data: gamma\n\n").await;
            // Keep the stream open until the client goes away
            let mut rest = Vec::new();
            let _ = second.read_to_end(&mut rest).await;
        });

        let view = LogView::default().into_shared();
        let client = EventStreamClient::new(
            url,
            Arc::new(HttpEventSourceTransport::new().unwrap()),
            ClientCallbacks::from_handler(message_sink(&view)),
            EventStreamOptions::default(),
        );
        client.connect();

        let watched = Arc::clone(&view);
        wait_until(move || watched.lock().unwrap().line_count() == 3).await;

        let texts: Vec<String> = view.lock().unwrap().lines().iter().map(|l| l.plain_text()).collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);

        let requests = requests.lock().unwrap().clone();
        assert!(requests[0].to_ascii_lowercase().contains("accept: text/event-stream"));
        assert!(requests[1].to_ascii_lowercase().contains("last-event-id: 5"));

        client.disconnect();
        server.abort();
    }

    #[tokio::test]
    async fn test_error_status_is_final() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/events", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            stream
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
        });

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let client = EventStreamClient::new(
            url,
            Arc::new(HttpEventSourceTransport::new().unwrap()),
            ClientCallbacks::new(|_| {}).with_error_handler(move |err| sink.lock().unwrap().push(err.to_string())),
            EventStreamOptions::default(),
        );
        client.connect();

        let watched = Arc::clone(&errors);
        wait_until(move || !watched.lock().unwrap().is_empty()).await;
        wait_until(|| client.state() == ConnectionState::Disconnected).await;

        assert!(errors.lock().unwrap()[0].contains("503"));
        server.abort();
    }
}
