#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::ast::QuoteStyle;
    use crate::builder::{escape, slashy_representable, string_value, unescape};

    const QUOTED_STYLES: [QuoteStyle; 4] = [
        QuoteStyle::Single,
        QuoteStyle::Double,
        QuoteStyle::TripleSingle,
        QuoteStyle::TripleDouble,
    ];

    #[test]
    fn test_single_quote_table() {
        assert_eq!(unescape(r"it\'s", QuoteStyle::Single), "it's");
        assert_eq!(unescape(r"a\nb\tc", QuoteStyle::Single), "a\nb\tc");
        assert_eq!(unescape(r"back\\slash", QuoteStyle::Single), "back\\slash");
        assert_eq!(unescape(r"A", QuoteStyle::Single), "A");
        assert_eq!(unescape(r"keep \q", QuoteStyle::Single), "keep \\q");
    }

    #[test]
    fn test_double_quote_table() {
        assert_eq!(unescape(r#"say \"hi\""#, QuoteStyle::Double), "say \"hi\"");
        assert_eq!(unescape(r"cost \$5", QuoteStyle::Double), "cost $5");
    }

    #[test]
    fn test_triple_quotes_strip_carriage_returns() {
        assert_eq!(unescape("a\r\nb", QuoteStyle::TripleDouble), "a\nb");
        assert_eq!(unescape("a\r\nb", QuoteStyle::TripleSingle), "a\nb");
        assert_eq!(unescape("a\\\nb", QuoteStyle::TripleSingle), "ab");
        assert_eq!(unescape("a\r\nb", QuoteStyle::Double), "a\r\nb");
    }

    #[test]
    fn test_slashy_only_unescapes_slash() {
        assert_eq!(unescape(r"\d+\/\w", QuoteStyle::Slashy), r"\d+/\w");
        assert_eq!(unescape("a\r\nb", QuoteStyle::Slashy), "a\nb");
    }

    #[test]
    fn test_string_value_strips_delimiters() {
        assert_eq!(string_value("'abc'"), Some(("abc".to_string(), QuoteStyle::Single)));
        assert_eq!(string_value("\"abc\""), Some(("abc".to_string(), QuoteStyle::Double)));
        assert_eq!(string_value("'''a'b'''"), Some(("a'b".to_string(), QuoteStyle::TripleSingle)));
        assert_eq!(string_value("\"\"\"x\"\"\""), Some(("x".to_string(), QuoteStyle::TripleDouble)));
        assert_eq!(string_value("/a\\/b/"), Some(("a/b".to_string(), QuoteStyle::Slashy)));
        assert_eq!(string_value("''"), Some((String::new(), QuoteStyle::Single)));
        assert_eq!(string_value("abc"), None);
    }

    #[test]
    fn test_slashy_representable_text() {
        assert!(slashy_representable(r"\d+/x"));
        assert!(slashy_representable("a\nb"));
        assert!(!slashy_representable(""));
        assert!(!slashy_representable("ends\\"));
        assert!(!slashy_representable("cost $5"));
        assert!(!slashy_representable("a\rb"));
    }

    #[test]
    fn test_escape_keeps_delimiter_out() {
        assert_eq!(escape("it's", QuoteStyle::Single), r"it\'s");
        assert_eq!(escape("it's", QuoteStyle::Double), "it's");
        assert_eq!(escape("$x \"y\"", QuoteStyle::Double), r#"\$x \"y\""#);
        assert_eq!(escape("a/b", QuoteStyle::Slashy), r"a\/b");
        assert_eq!(escape("line\nbreak", QuoteStyle::TripleDouble), "line\nbreak");
    }

    proptest! {
        #[test]
        fn prop_escape_round_trips(s in "[a-zA-Z0-9 '\"\\\\$\n\t\r{}/.-]{0,40}") {
            for style in QUOTED_STYLES {
                prop_assert_eq!(unescape(&escape(&s, style), style), s.clone(), "style {:?}", style);
            }
        }

        #[test]
        fn prop_slashy_round_trips(s in "[a-zA-Z0-9 '\"\\\\{}/.-]{0,40}") {
            prop_assert_eq!(unescape(&escape(&s, QuoteStyle::Slashy), QuoteStyle::Slashy), s);
        }
    }
}
