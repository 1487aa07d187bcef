#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::ast::{Ast, NodeKind, NodeRef};
    use crate::builder::build;
    use crate::index::{PositionIndex, find_node};
    use crate::parser::parse;

    fn ast(src: &str) -> Ast {
        let parsed = parse(src, "t").unwrap();
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        build(&parsed.cst).unwrap().ast
    }

    fn assert_children_contained(ast: &Ast) {
        ast.walk(|node| {
            for child in node.children() {
                assert!(
                    node.span().contains_span(&child.span()),
                    "{:?} at {} does not contain {:?} at {}",
                    node.kind(),
                    node.span(),
                    child.kind(),
                    child.span()
                );
            }
        });
    }

    #[test]
    fn test_index_covers_every_node() {
        let ast = ast("process {\n  cpus = 2\n  memory = { 8.GB * task.attempt }\n}\n");
        let index = PositionIndex::build(&ast);
        let mut count = 0;
        ast.walk(|_| count += 1);
        assert_eq!(index.len(), count);
    }

    #[test]
    fn test_parent_links() {
        let ast = ast("process {\n  cpus = 2\n}\n");
        let index = PositionIndex::build(&ast);
        let block = &ast.statements[0];
        let crate::ast::StmtKind::Block(b) = &block.kind else {
            panic!("expected block");
        };
        let assign = &b.statements[0];
        assert_eq!(index.parent(assign.id), Some(block.id));
        assert_eq!(index.parent(block.id), None);
        let crate::ast::StmtKind::Assign(a) = &assign.kind else {
            panic!("expected assignment");
        };
        assert_eq!(index.parent(a.value.id), Some(assign.id));
        assert_eq!(index.ancestors(a.value.id), vec![assign.id, block.id]);
    }

    #[test]
    fn test_nodes_at_is_innermost_first() {
        let ast = ast("process {\n  cpus = 2 + x\n}\n");
        let index = PositionIndex::build(&ast);
        // `x` on line 2
        let hits = index.nodes_at(2, 14);
        let kinds: Vec<NodeKind> = hits.iter().map(|id| index.entry(*id).unwrap().kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Variable, NodeKind::Binary, NodeKind::Assign, NodeKind::Block]
        );
        assert!(index.nodes_at(5, 1).is_empty());
    }

    #[test]
    fn test_span_end_is_exclusive() {
        let ast = ast("a = 1");
        let index = PositionIndex::build(&ast);
        assert_eq!(index.nodes_at(1, 5).len(), 2);
        assert!(index.nodes_at(1, 6).is_empty());
    }

    #[test]
    fn test_find_node_resolves_ids() {
        let ast = ast("a = [1, 2]");
        let index = PositionIndex::build(&ast);
        let innermost = index.nodes_at(1, 9)[0];
        let node = find_node(&ast, innermost).unwrap();
        assert!(matches!(node, NodeRef::Expr(_)));
        assert_eq!(node.kind(), NodeKind::Constant);
    }

    #[test]
    fn test_containment_on_calls_and_interpolation() {
        let ast = ast(
            "workflow.onComplete {\n  println \"done ${workflow.success} $x.y\"\n}\nx = foo(a: 1, (b)) { p -> p }\ny = -3\n",
        );
        assert_children_contained(&ast);
    }

    fn ident() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-z][a-z0-9]{0,5}")
            .expect("valid regex")
            .prop_filter("not a keyword", |s| {
                !matches!(
                    s.as_str(),
                    "if" | "else" | "in" | "as" | "def" | "return" | "assert" | "true" | "false" | "null" | "instanceof"
                )
            })
    }

    fn member() -> impl Strategy<Value = String> {
        prop_oneof![Just("size"), Just("name"), Just("text"), Just("value")].prop_map(String::from)
    }

    fn value() -> impl Strategy<Value = String> {
        let leaf = prop_oneof![
            (0u32..10_000).prop_map(|n| n.to_string()),
            "[a-z ]{0,6}".prop_map(|s| format!("'{}'", s)),
            ident().prop_map(|s| format!("\"pre ${{{}}} post\"", s)),
            ident().prop_map(|s| format!("\"${}.size\"", s)),
            ident(),
            Just("true".to_string()),
        ];
        leaf.prop_recursive(3, 24, 3, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{} + {}", a, b)),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{} ?: {}", a, b)),
                prop::collection::vec(inner.clone(), 0..3).prop_map(|v| format!("[{}]", v.join(", "))),
                (ident(), inner.clone()).prop_map(|(k, v)| format!("[{}: {}]", k, v)),
                inner.clone().prop_map(|v| format!("{{ {} }}", v)),
                (ident(), inner.clone()).prop_map(|(f, v)| format!("{}({})", f, v)),
                (ident(), inner.clone()).prop_map(|(f, v)| format!("{}(key: {})", f, v)),
                inner.clone().prop_map(|v| format!("({})", v)),
                (inner.clone(), member()).prop_map(|(v, m)| format!("({}).{}", v, m)),
                (inner.clone(), inner.clone()).prop_map(|(a, i)| format!("({})[{}]", a, i)),
            ]
        })
    }

    fn statement() -> impl Strategy<Value = String> {
        (prop::collection::vec(ident(), 1..3), value()).prop_map(|(path, v)| format!("{} = {}", path.join("."), v))
    }

    fn document() -> impl Strategy<Value = String> {
        (
            prop::collection::vec(statement(), 1..4),
            prop::collection::vec(statement(), 0..3),
            ident(),
        )
            .prop_map(|(top, nested, label)| {
                let mut doc = top.join("\n");
                doc.push_str("\nprocess {\n");
                doc.push_str(&format!("  withLabel: {} {{\n", label));
                for stmt in nested {
                    doc.push_str("    ");
                    doc.push_str(&stmt);
                    doc.push('\n');
                }
                doc.push_str("  }\n}\n");
                doc
            })
    }

    proptest! {
        #[test]
        fn prop_children_within_parent_span(doc in document()) {
            let ast = ast(&doc);
            assert_children_contained(&ast);

            let index = PositionIndex::build(&ast);
            for entry in index.entries() {
                if let Some(parent) = index.parent(entry.id) {
                    let parent_span = index.entry(parent).unwrap().span;
                    prop_assert!(parent_span.contains_span(&entry.span));
                }
                if entry.span.start != entry.span.end {
                    let hits = index.nodes_at(entry.span.start.line, entry.span.start.column);
                    prop_assert!(hits.contains(&entry.id));
                }
            }
        }

        #[test]
        fn prop_reparse_is_idempotent(doc in document()) {
            prop_assert_eq!(ast(&doc), ast(&doc));
        }
    }
}
