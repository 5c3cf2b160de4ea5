//! Property-based tests for the ANSI decoder
//!
//! Random input must never panic, and decoding must keep every visible
//! character exactly once.

use lazylog::text::strip_ansi_codes;
use lazylog::{parse_ansi, StyledSpan};
use proptest::prelude::*;

fn joined(spans: &[StyledSpan]) -> String {
    spans.iter().map(|span| span.text.as_str()).collect()
}

/// Text interleaved with well-formed SGR sequences
fn styled_line() -> impl Strategy<Value = String> {
    let piece = prop_oneof![
        "[a-zA-Z0-9 .:=-]{0,20}",
        prop::collection::vec(0u16..108, 0..4).prop_map(|codes| {
            let params: Vec<String> = codes.iter().map(u16::to_string).collect();
            format!("\x1b[{}m", params.join(";"))
        }),
    ];
    prop::collection::vec(piece, 0..12).prop_map(|pieces| pieces.concat())
}

proptest! {
    #[test]
    fn test_decoder_doesnt_panic_on_random_input(s in "\\PC*") {
        let _ = parse_ansi(&s);
    }

    #[test]
    fn test_decoder_doesnt_panic_on_escape_soup(s in "[\x1b\\[;0-9mKa-z]{0,200}") {
        let _ = parse_ansi(&s);
    }

    #[test]
    fn test_plain_text_is_one_unstyled_span(s in "[a-zA-Z0-9 ]{0,200}") {
        let spans = parse_ansi(&s);

        prop_assert_eq!(spans.len(), 1);
        prop_assert!(spans[0].style.is_plain());
        prop_assert_eq!(&spans[0].text, &s);
    }

    #[test]
    fn test_visible_text_preserved(line in styled_line()) {
        let spans = parse_ansi(&line);
        prop_assert_eq!(joined(&spans), strip_ansi_codes(&line).into_owned());
    }

    #[test]
    fn test_no_empty_spans_from_escapes(line in styled_line()) {
        let spans = parse_ansi(&line);
        if line.contains('\x1b') {
            prop_assert!(spans.iter().all(|span| !span.text.is_empty()));
        }
    }

    #[test]
    fn test_colored_text_is_styled(
        text in "[a-zA-Z]{1,50}",
        color_code in 30u16..38,
    ) {
        let spans = parse_ansi(&format!("\x1b[{}m{}\x1b[0m", color_code, text));

        prop_assert_eq!(spans.len(), 1);
        prop_assert!(spans[0].style.foreground.is_some());
        prop_assert_eq!(&spans[0].text, &text);
    }

    #[test]
    fn test_resets_alone_give_nothing_visible(count in 1usize..20) {
        let spans = parse_ansi(&"\x1b[0m".repeat(count));
        prop_assert_eq!(joined(&spans), "");
    }
}
