//! Test Fixtures
//!
//! Common test data and fixtures for testing

use lazylog::connection::ClientCallbacks;
use lazylog::{process_text, LogLine, ProcessOptions};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Process `text` with default options
pub fn create_test_lines(text: &str) -> Vec<LogLine> {
    process_text(text, &ProcessOptions::default())
}

/// Create sample ANSI output for testing
pub fn create_ansi_output() -> Vec<String> {
    vec![
        "\x1b[31mRed text\x1b[0m".to_string(),
        "\x1b[32mGreen text\x1b[0m".to_string(),
        "\x1b[1mBold text\x1b[0m".to_string(),
        "\x1b[4mUnderlined text\x1b[0m".to_string(),
    ]
}

/// Create sample plain output for testing
pub fn create_plain_output() -> Vec<String> {
    vec![
        "2024-05-01T10:00:00Z INFO  server started".to_string(),
        "2024-05-01T10:00:01Z WARN  cache miss ratio high".to_string(),
        "2024-05-01T10:00:02Z ERROR upstream timed out".to_string(),
        "2024-05-01T10:00:03Z INFO  retrying upstream".to_string(),
    ]
}

/// Let spawned client tasks run (time is paused in client tests)
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Records everything a client hands to its callbacks
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    messages: Arc<Mutex<Vec<String>>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks pushing into this recorder
    pub fn callbacks(&self) -> ClientCallbacks {
        let messages = Arc::clone(&self.messages);
        let errors = Arc::clone(&self.errors);
        ClientCallbacks::new(move |text| messages.lock().unwrap().push(text))
            .with_error_handler(move |err| errors.lock().unwrap().push(err.to_string()))
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}
