#[cfg(test)]
mod tests {
    use crate::cst::{CstArg, CstExpr, CstLiteral, CstPathElement, CstScriptStmt, CstStmt};
    use crate::parser::{PredictionMode, parse, parse_with_mode};

    fn statements(src: &str) -> Vec<CstStmt> {
        let parsed = parse(src, "test.config").unwrap();
        assert!(parsed.errors.is_empty(), "unexpected errors: {:?}", parsed.errors);
        parsed.cst.statements
    }

    #[test]
    fn test_assignment_path() {
        let stmts = statements("process.cpus = 4");
        assert_eq!(stmts.len(), 1);
        let CstStmt::Assignment(assign) = &stmts[0] else {
            panic!("expected assignment, got {:?}", stmts[0]);
        };
        let path: Vec<_> = assign.path.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(path, vec!["process", "cpus"]);
        assert!(matches!(
            &assign.value,
            CstExpr::Literal { value: CstLiteral::Number(n), .. } if n == "4"
        ));
        assert_eq!(assign.span.start.column, 1);
        assert_eq!(assign.span.end.column, 17);
    }

    #[test]
    fn test_nested_blocks_and_selector() {
        let stmts = statements("process {\n  withLabel: big {\n    memory = '8 GB'\n  }\n}\n");
        let CstStmt::Block(block) = &stmts[0] else {
            panic!("expected block");
        };
        assert_eq!(block.name.text, "process");
        let CstStmt::Selector(sel) = &block.statements[0] else {
            panic!("expected selector, got {:?}", block.statements);
        };
        assert_eq!(sel.kind.text, "withLabel");
        assert_eq!(sel.target.text, "big");
        assert_eq!(sel.statements.len(), 1);
    }

    #[test]
    fn test_quoted_selector_target() {
        let stmts = statements("process {\n withName: 'foo|bar' { cpus = 2 }\n}");
        let CstStmt::Block(block) = &stmts[0] else {
            panic!("expected block");
        };
        let CstStmt::Selector(sel) = &block.statements[0] else {
            panic!("expected selector");
        };
        assert!(sel.target.quoted);
        assert_eq!(sel.target.text, "'foo|bar'");
    }

    #[test]
    fn test_append_block() {
        let stmts = statements("plugins {\n  id 'nf-amazon'\n  id 'nf-schema@2.0.0'\n}");
        let CstStmt::AppendBlock(block) = &stmts[0] else {
            panic!("expected append block, got {:?}", stmts[0]);
        };
        assert_eq!(block.name.text, "plugins");
        assert_eq!(block.statements.len(), 2);
        assert_eq!(block.statements[0].target.text, "id");
    }

    #[test]
    fn test_include_and_incomplete() {
        let stmts = statements("includeConfig 'base.config'\nprocess.\n");
        assert!(matches!(stmts[0], CstStmt::Include(_)));
        match &stmts[1] {
            CstStmt::Incomplete(inc) => {
                assert_eq!(inc.text, "process.");
                assert!(!inc.recovered);
            }
            other => panic!("expected incomplete, got {:?}", other),
        }
    }

    #[test]
    fn test_method_chain_with_trailing_closure() {
        let stmts = statements("workflow.onComplete {\n  println \"done\"\n}");
        let CstStmt::Statement(CstScriptStmt::Expression(CstExpr::Path { elements, .. })) = &stmts[0] else {
            panic!("expected path expression, got {:?}", stmts[0]);
        };
        assert!(matches!(elements[0], CstPathElement::Property { .. }));
        let CstPathElement::Closure(closure) = &elements[1] else {
            panic!("expected trailing closure");
        };
        assert!(matches!(
            &closure.body[0],
            CstScriptStmt::Expression(CstExpr::Command { .. })
        ));
    }

    #[test]
    fn test_named_arguments_and_closure_params() {
        let stmts = statements("x = foo(a: 1, 2) { p, q -> p + q }");
        let CstStmt::Assignment(assign) = &stmts[0] else {
            panic!("expected assignment");
        };
        let CstExpr::Path { elements, .. } = &assign.value else {
            panic!("expected call path");
        };
        let CstPathElement::Arguments { args, .. } = &elements[0] else {
            panic!("expected arguments");
        };
        assert!(matches!(args[0], CstArg::Named { .. }));
        assert!(matches!(args[1], CstArg::Positional(_)));
        let CstPathElement::Closure(closure) = &elements[1] else {
            panic!("expected closure");
        };
        assert_eq!(closure.params.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_precedence() {
        let stmts = statements("x = 1 + 2 * 3");
        let CstStmt::Assignment(assign) = &stmts[0] else {
            panic!("expected assignment");
        };
        let CstExpr::Binary { rhs, .. } = &assign.value else {
            panic!("expected binary");
        };
        assert!(matches!(**rhs, CstExpr::Binary { .. }), "multiplication binds tighter");
    }

    #[test]
    fn test_shift_joins_adjacent_angles() {
        let stmts = statements("x = a >> 2\ny = a > b");
        let CstStmt::Assignment(assign) = &stmts[0] else {
            panic!("expected assignment");
        };
        let CstExpr::Binary { op, .. } = &assign.value else {
            panic!("expected binary");
        };
        assert_eq!(op.tokens.len(), 2);
    }

    #[test]
    fn test_map_and_list_literals() {
        let stmts = statements("a = [x: 1, 'y': 2]\nb = [1, 2, 3,]\nc = [:]");
        let values: Vec<_> = stmts
            .iter()
            .map(|s| match s {
                CstStmt::Assignment(a) => &a.value,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert!(matches!(values[0], CstExpr::Map { entries, .. } if entries.len() == 2));
        assert!(matches!(values[1], CstExpr::List { items, .. } if items.len() == 3));
        assert!(matches!(values[2], CstExpr::Map { entries, .. } if entries.is_empty()));
    }

    #[test]
    fn test_gstring_sub_lists() {
        let stmts = statements("a = \"${x} and $y.z\"");
        let CstStmt::Assignment(assign) = &stmts[0] else {
            panic!("expected assignment");
        };
        let CstExpr::GString(g) = &assign.value else {
            panic!("expected gstring");
        };
        assert_eq!(g.exprs.len(), 1);
        assert_eq!(g.paths.len(), 1);
        assert_eq!(g.paths[0].names.len(), 2);
        assert_eq!(g.texts.len(), 1);
        assert_eq!(g.paths[0].names[1].span.start.column, 18);
    }

    #[test]
    fn test_fast_mode_bails_on_ambiguity() {
        let src = "a = [(key): 1]";
        assert!(parse_with_mode(src, "t", PredictionMode::Fast).is_err());
        let parsed = parse(src, "t").unwrap();
        assert_eq!(parsed.mode, PredictionMode::Full);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let CstStmt::Assignment(assign) = &parsed.cst.statements[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(&assign.value, CstExpr::Map { entries, .. } if entries.len() == 1));
    }

    #[test]
    fn test_full_mode_falls_back_to_append_block() {
        let src = "plugins {\n  id !disabled\n}";
        assert!(parse_with_mode(src, "t", PredictionMode::Fast).is_err());
        let parsed = parse(src, "t").unwrap();
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert!(matches!(parsed.cst.statements[0], CstStmt::AppendBlock(_)));
    }

    #[test]
    fn test_full_mode_resolves_declaration_vs_command() {
        let parsed = parse("def f = {\n  String x\n  println x\n}", "t").unwrap();
        assert_eq!(parsed.mode, PredictionMode::Full);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    }

    #[test]
    fn test_fast_and_full_agree_on_unambiguous_input() {
        let src = "\
params.outdir = 'results'
process {
    executor = 'slurm'
    withLabel: 'big' {
        cpus = 16
        memory = { 8.GB * task.attempt }
    }
}
profiles {
    test {
        params.input = \"${projectDir}/assets/samplesheet.csv\"
    }
}
";
        let fast = parse_with_mode(src, "t", PredictionMode::Fast).unwrap();
        let full = parse_with_mode(src, "t", PredictionMode::Full).unwrap();
        assert_eq!(fast.cst, full.cst);
        assert!(full.errors.is_empty());
    }

    #[test]
    fn test_tokenizer_failure_is_not_retried() {
        let failure = parse("a = 'unterminated\n", "t").unwrap_err();
        let span = failure.error.span.expect("span");
        assert_eq!(span.start.line, 1);
    }

    #[test]
    fn test_lexical_error_in_interpolation_is_a_failure() {
        assert!(parse("a = \"${ 'x }\"", "t").is_err());
    }
}
