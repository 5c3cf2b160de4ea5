//! Test Utilities
//!
//! Shared fixtures and recording helpers for the lazylog test suites.

#![allow(dead_code)]

pub mod fixtures;

// Re-exports for convenience
pub use fixtures::{
    create_ansi_output, create_plain_output, create_test_lines, settle, Recorder,
};
