use flowls_core::ast::{Ast, NodeId, NodeKind, NodeRef, StmtKind};
use flowls_core::index::{PositionIndex, find_node};
use flowls_core::token::Span;

const MAX_SOURCE_PREVIEW: usize = 200;

/// Markdown describing the innermost node at a 1-based position.
pub fn describe(ast: &Ast, index: &PositionIndex, line: u32, column: u32) -> Option<(String, Span)> {
    let innermost = *index.nodes_at(line, column).first()?;
    let node = find_node(ast, innermost)?;

    let mut text = format!("**{}**", node.kind().as_str());
    if let Some(path) = setting_path(ast, index, innermost) {
        text.push_str(&format!("\n\n`{}`", path));
    }
    if let NodeRef::Expr(expr) = node {
        let source = ast.render_expr(expr);
        if source.len() <= MAX_SOURCE_PREVIEW {
            text.push_str(&format!("\n\n```groovy\n{}\n```", source));
        }
    }
    Some((text, node.span()))
}

/// Dotted path of the assignment at or around `id`, prefixed by enclosing block names.
fn setting_path(ast: &Ast, index: &PositionIndex, id: NodeId) -> Option<String> {
    let mut chain = vec![id];
    chain.extend(index.ancestors(id));

    let at = chain.iter().position(|candidate| {
        index
            .entry(*candidate)
            .is_some_and(|e| matches!(e.kind, NodeKind::Assign | NodeKind::Append))
    })?;

    let mut segments: Vec<String> = Vec::new();
    for block_id in chain[at + 1..].iter().rev() {
        if let Some(NodeRef::Stmt(stmt)) = find_node(ast, *block_id) {
            if let StmtKind::Block(block) = &stmt.kind {
                if let Some(name) = block.name() {
                    segments.push(name.to_string());
                }
            }
        }
    }

    match find_node(ast, chain[at])? {
        NodeRef::Stmt(stmt) => match &stmt.kind {
            StmtKind::Assign(assign) | StmtKind::Append(assign) => segments.extend(assign.path.iter().cloned()),
            _ => return None,
        },
        _ => return None,
    }
    Some(segments.join("."))
}
