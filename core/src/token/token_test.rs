#[cfg(test)]
mod tests {
    use crate::token::{GStringPart, Position, Token, Tokenizer};

    fn tokens(src: &str) -> Vec<Token> {
        Tokenizer::tokenize(src).unwrap().0
    }

    fn id(name: &str) -> Token {
        Token::Id(name.to_string())
    }

    #[test]
    fn basic_assignment() {
        let expected = vec![
            id("process"),
            Token::Dot,
            id("cpus"),
            Token::Assign,
            Token::Number("4".to_string()),
        ];
        assert_eq!(tokens("process.cpus = 4"), expected);
    }

    #[test]
    fn test_spans_are_aligned_with_tokens() {
        let (toks, spans) = Tokenizer::tokenize("a.b = 'x'").unwrap();
        assert_eq!(toks.len(), spans.len());
        assert_eq!(spans[0].start, Position::new(1, 1, 0));
        assert_eq!(spans[4].start.column, 7);
        assert_eq!(spans[4].end.column, 10);
    }

    #[test]
    fn test_newlines_collapse_and_vanish_inside_brackets() {
        let toks = tokens("a = [1,\n 2]\n\n\nb = (3\n)");
        let newlines = toks.iter().filter(|t| **t == Token::Newline).count();
        assert_eq!(newlines, 1, "only the separator between statements survives: {:?}", toks);
    }

    #[test]
    fn test_newlines_inside_braces_are_kept() {
        let toks = tokens("p {\n a = 1\n}");
        assert_eq!(toks.iter().filter(|t| **t == Token::Newline).count(), 2);
    }

    #[test]
    fn test_comments_and_shebang_are_skipped() {
        let toks = tokens("#!/usr/bin/env nextflow\n// line\na = 1 /* block\n comment */ + 2");
        assert_eq!(
            toks,
            vec![
                id("a"),
                Token::Assign,
                Token::Number("1".to_string()),
                Token::Add,
                Token::Number("2".to_string())
            ]
        );
    }

    #[test]
    fn test_string_tokens_keep_raw_delimiters() {
        let toks = tokens(r#"'a\'b' "c" '''d''' """e""""#);
        assert_eq!(
            toks,
            vec![
                Token::Str(r"'a\'b'".to_string()),
                Token::Str("\"c\"".to_string()),
                Token::Str("'''d'''".to_string()),
                Token::Str("\"\"\"e\"\"\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_single_quotes_do_not_interpolate() {
        assert_eq!(tokens("'$a ${b}'"), vec![Token::Str("'$a ${b}'".to_string())]);
    }

    #[test]
    fn test_gstring_parts() {
        let toks = tokens(r#""x $a.b y ${c + 1}""#);
        let Token::GString(g) = &toks[0] else {
            panic!("expected gstring, got {:?}", toks);
        };
        assert_eq!(g.delimiter, "\"");
        assert_eq!(g.parts.len(), 4);
        assert!(matches!(&g.parts[0], GStringPart::Text { raw, .. } if raw == "x "));
        assert!(matches!(&g.parts[1], GStringPart::Path { raw, .. } if raw == "a.b"));
        assert!(matches!(&g.parts[2], GStringPart::Text { raw, .. } if raw == " y "));
        match &g.parts[3] {
            GStringPart::Expr { source, origin, span } => {
                assert_eq!(source, "c + 1");
                assert_eq!(origin.column, 13);
                assert_eq!(span.start.column, 11);
            }
            other => panic!("unexpected part {:?}", other),
        }
    }

    #[test]
    fn test_slashy_string_only_at_operand_start() {
        let toks = tokens("x = /a\\/b/");
        assert_eq!(toks[2], Token::Str("/a\\/b/".to_string()));

        let toks = tokens("x = a / b / c");
        assert_eq!(toks.iter().filter(|t| **t == Token::Div).count(), 2);
    }

    #[test]
    fn test_number_forms_are_raw() {
        let toks = tokens("0xFF 1_000 2.5e3 10L 3.0f 017 0b101");
        let raws: Vec<_> = toks
            .iter()
            .map(|t| match t {
                Token::Number(n) => n.clone(),
                other => panic!("not a number: {:?}", other),
            })
            .collect();
        assert_eq!(raws, vec!["0xFF", "1_000", "2.5e3", "10L", "3.0f", "017", "0b101"]);
    }

    #[test]
    fn test_member_access_on_integer() {
        assert_eq!(
            tokens("2.GB"),
            vec![Token::Number("2".to_string()), Token::Dot, id("GB")]
        );
        assert_eq!(
            tokens("1..5"),
            vec![Token::Number("1".to_string()), Token::Range, Token::Number("5".to_string())]
        );
    }

    #[test]
    fn test_operators() {
        let toks = tokens("a ?. b *. c ?: d <=> e ==~ f =~ g ..< h <.. i <..< j !in k ** l ?[0]");
        for expected in [
            Token::SafeDot,
            Token::SpreadDot,
            Token::Elvis,
            Token::Compare,
            Token::RegexMatch,
            Token::RegexFind,
            Token::RangeExclusiveRight,
            Token::RangeExclusiveLeft,
            Token::RangeExclusiveBoth,
            Token::NotIn,
            Token::Pow,
            Token::SafeIndex,
        ] {
            assert!(toks.contains(&expected), "missing {:?}", expected);
        }
    }

    #[test]
    fn test_shift_is_lexed_as_adjacent_angles() {
        assert_eq!(tokens("a >> 2")[1..3], [Token::Gt, Token::Gt]);
    }

    #[test]
    fn test_keywords() {
        let toks = tokens("includeConfig if else return assert def true false null instanceof as in");
        assert!(toks.iter().all(|t| t.is_keyword()), "{:?}", toks);
    }

    #[test]
    fn test_unterminated_string_error_has_position() {
        let err = Tokenizer::tokenize("a = 'abc\nb = 1").unwrap_err();
        let span = err.span.expect("lexer errors carry a position");
        assert_eq!(span.start.line, 1);
    }

    #[test]
    fn test_tokenize_at_offsets_positions() {
        let (_, spans) = Tokenizer::tokenize_at("x", Position::new(3, 7, 40)).unwrap();
        assert_eq!(spans[0].start, Position::new(3, 7, 40));
    }

    #[test]
    fn test_has_comments_ignores_comment_markers_in_strings() {
        assert_eq!(Tokenizer::has_comments("x = 'http://host/*path'"), Some(false));
        assert_eq!(Tokenizer::has_comments("x = 1 // note"), Some(true));
        assert_eq!(Tokenizer::has_comments("/* head */\nx = 1"), Some(true));
        assert_eq!(Tokenizer::has_comments("#!/usr/bin/env flow\nx = 1"), Some(true));
        assert_eq!(Tokenizer::has_comments("x = 'open"), None);
    }
}
