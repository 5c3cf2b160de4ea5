//! Property-based tests for line processing
//!
//! Numbering, wrap widths and text preservation over random input.

use lazylog::text::{visible_length, CONTINUATION_MARKER};
use lazylog::{process_text, LogLine, ProcessOptions};
use proptest::prelude::*;

fn wrapping(max_line_length: usize) -> ProcessOptions {
    ProcessOptions {
        wrap: true,
        max_line_length,
        ..ProcessOptions::default()
    }
}

/// Rejoin the pieces of one wrapped segment
fn unwrap_pieces(lines: &[LogLine]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let text = line.plain_text();
            if i == 0 {
                text
            } else {
                text.strip_prefix(CONTINUATION_MARKER).unwrap_or(&text).to_string()
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn test_processor_doesnt_panic(s in "\\PC{0,500}", wrap in any::<bool>(), max in 1usize..120) {
        let opts = ProcessOptions { wrap, max_line_length: max, start_line_number: 1 };
        let _ = process_text(&s, &opts);
    }

    #[test]
    fn test_numbers_consecutive_from_start(
        s in "[a-z \n]{0,400}",
        start in 1usize..10_000,
        wrap in any::<bool>(),
    ) {
        let opts = ProcessOptions { wrap, max_line_length: 12, start_line_number: start };
        let lines = process_text(&s, &opts);

        prop_assert!(!lines.is_empty());
        for (offset, line) in lines.iter().enumerate() {
            prop_assert_eq!(line.number, start + offset);
        }
    }

    #[test]
    fn test_unwrapped_text_preserved(s in "[a-zA-Z0-9 \t\n]{0,400}") {
        let lines = process_text(&s, &ProcessOptions::default());

        prop_assert_eq!(lines.len(), s.split('\n').count());
        let rejoined: Vec<String> = lines.iter().map(LogLine::plain_text).collect();
        prop_assert_eq!(rejoined.join("\n"), s);
    }

    #[test]
    fn test_wrapped_lines_fit_width(s in "[a-z ]{0,300}", max in 3usize..60) {
        let lines = process_text(&s, &wrapping(max));

        for line in &lines {
            prop_assert!(visible_length(&line.plain_text()) <= max);
        }
    }

    #[test]
    fn test_wrapping_preserves_text(s in "[a-zA-Z0-9 ]{1,300}", max in 3usize..60) {
        let lines = process_text(&s, &wrapping(max));
        prop_assert_eq!(unwrap_pieces(&lines), s);
    }

    #[test]
    fn test_wrapping_preserves_styled_text(
        body in "[a-z]{1,200}",
        color_code in 30u16..38,
        max in 3usize..40,
    ) {
        let line = format!("\x1b[{}m{}\x1b[0m", color_code, body);
        let lines = process_text(&line, &wrapping(max));

        prop_assert_eq!(unwrap_pieces(&lines), body);
        for wrapped in &lines {
            prop_assert!(wrapped.content.iter().any(|span| span.style.foreground.is_some()));
        }
    }
}
