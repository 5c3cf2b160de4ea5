//! Unit tests for line processing and wrapping

#[path = "../test_utils/mod.rs"]
mod test_utils;

use lazylog::text::{visible_length, CONTINUATION_MARKER};
use lazylog::{LineProcessor, LogLine, ProcessOptions};
use test_utils::{create_plain_output, create_test_lines};

fn wrapping(max_line_length: usize) -> ProcessOptions {
    ProcessOptions {
        wrap: true,
        max_line_length,
        ..ProcessOptions::default()
    }
}

fn texts(lines: &[LogLine]) -> Vec<String> {
    lines.iter().map(LogLine::plain_text).collect()
}

#[cfg(test)]
mod splitting_tests {
    use super::*;

    #[test]
    fn test_lines_numbered_from_one() {
        let lines = create_test_lines(&create_plain_output().join("\n"));

        assert_eq!(lines.len(), 4);
        let numbers: Vec<usize> = lines.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert!(lines[2].plain_text().contains("ERROR"));
    }

    #[test]
    fn test_trailing_newline_gives_empty_line() {
        let lines = create_test_lines("a\nb\n");
        assert_eq!(texts(&lines), vec!["a", "b", ""]);
    }

    #[test]
    fn test_empty_input_gives_one_line() {
        let lines = create_test_lines("");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].plain_text(), "");
    }

    #[test]
    fn test_carriage_return_kept() {
        let lines = create_test_lines("a\r\nb");
        assert_eq!(texts(&lines), vec!["a\r", "b"]);
    }

    #[test]
    fn test_custom_start_number() {
        let processor = LineProcessor::new();
        let lines = processor.process("x\ny", &ProcessOptions::default().starting_at(41));
        assert_eq!(lines[0].number, 41);
        assert_eq!(lines[1].number, 42);
    }

    #[test]
    fn test_no_wrap_keeps_long_lines() {
        let lines = create_test_lines(&"z".repeat(500));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].plain_text().len(), 500);
    }
}

#[cfg(test)]
mod wrapping_tests {
    use super::*;

    #[test]
    fn test_wrap_budgets() {
        let processor = LineProcessor::new();
        let lines = processor.process(&"a".repeat(25), &wrapping(10));

        assert_eq!(
            texts(&lines),
            vec![
                "a".repeat(10),
                format!("{}{}", CONTINUATION_MARKER, "a".repeat(8)),
                format!("{}{}", CONTINUATION_MARKER, "a".repeat(7)),
            ]
        );
    }

    #[test]
    fn test_wrap_exact_fit_not_wrapped() {
        let processor = LineProcessor::new();
        let lines = processor.process(&"a".repeat(10), &wrapping(10));
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_wrap_numbers_continue_across_segments() {
        let processor = LineProcessor::new();
        let text = format!("{}\nshort", "b".repeat(15));
        let lines = processor.process(&text, &wrapping(10));

        let numbers: Vec<usize> = lines.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(lines[2].plain_text(), "short");
    }

    #[test]
    fn test_wrap_ignores_escape_codes_in_width() {
        let processor = LineProcessor::new();
        let text = format!("\x1b[32m{}\x1b[0m", "g".repeat(10));
        let lines = processor.process(&text, &wrapping(10));
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_wrap_carries_style_onto_continuations() {
        let processor = LineProcessor::new();
        let text = format!("\x1b[1;31m{}", "r".repeat(15));
        let lines = processor.process(&text, &wrapping(10));

        assert_eq!(lines.len(), 2);
        for line in &lines {
            assert!(line.content.iter().any(|span| span.style.bold && span.text.contains('r')));
        }
    }

    #[test]
    fn test_wrap_pieces_fit_width() {
        let processor = LineProcessor::new();
        let lines = processor.process(&"w".repeat(1000), &wrapping(100));

        for line in &lines {
            assert!(visible_length(&line.plain_text()) <= 100);
        }
        let rejoined: String = lines
            .iter()
            .map(|l| l.plain_text().replace(CONTINUATION_MARKER, ""))
            .collect();
        assert_eq!(rejoined, "w".repeat(1000));
    }

    #[test]
    fn test_tiny_width_still_progresses() {
        let processor = LineProcessor::new();
        let lines = processor.process("abcd", &wrapping(1));
        assert_eq!(lines.len(), 4);
    }
}
