//! Parent links and position lookup over a built [`Ast`].
//!
//! Nodes are flattened into an arena in preorder; parent links are arena indices.

use crate::ast::{Ast, NodeId, NodeKind, NodeRef};
use crate::token::Span;
use crate::util::fast_map::{FastHashMap, fast_hash_map_with_capacity};

#[cfg(test)]
mod index_test;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: NodeId,
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<usize>,
    pub depth: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    arena: Vec<IndexEntry>,
    slots: FastHashMap<NodeId, usize>,
}

impl PositionIndex {
    pub fn build(ast: &Ast) -> Self {
        let mut arena: Vec<IndexEntry> = Vec::new();
        let mut stack: Vec<(NodeRef<'_>, Option<usize>, u32)> =
            ast.statements.iter().rev().map(|s| (NodeRef::Stmt(s), None, 0)).collect();

        while let Some((node, parent, depth)) = stack.pop() {
            let slot = arena.len();
            arena.push(IndexEntry {
                id: node.id(),
                kind: node.kind(),
                span: node.span(),
                parent,
                depth,
            });
            for child in node.children().into_iter().rev() {
                stack.push((child, Some(slot), depth + 1));
            }
        }

        let mut slots = fast_hash_map_with_capacity(arena.len());
        for (slot, entry) in arena.iter().enumerate() {
            slots.insert(entry.id, slot);
        }
        Self { arena, slots }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn entry(&self, id: NodeId) -> Option<&IndexEntry> {
        self.slots.get(&id).map(|slot| &self.arena[*slot])
    }

    /// Parent node id; `None` for top-level statements and unknown ids.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let entry = self.entry(id)?;
        entry.parent.map(|slot| self.arena[slot].id)
    }

    /// Ancestors from the direct parent up to the top-level statement.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.entry(id).and_then(|e| e.parent);
        while let Some(slot) = current {
            out.push(self.arena[slot].id);
            current = self.arena[slot].parent;
        }
        out
    }

    /// Every node whose span contains the 1-based position, innermost first.
    pub fn nodes_at(&self, line: u32, column: u32) -> Vec<NodeId> {
        let mut hits: Vec<&IndexEntry> = self.arena.iter().filter(|e| e.span.contains(line, column)).collect();
        hits.sort_by(|a, b| b.depth.cmp(&a.depth));
        hits.into_iter().map(|e| e.id).collect()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.arena
    }
}

/// Borrow the node with `id` from `ast`.
pub fn find_node(ast: &Ast, id: NodeId) -> Option<NodeRef<'_>> {
    let mut found = None;
    ast.walk(|node| {
        if found.is_none() && node.id() == id {
            found = Some(node);
        }
    });
    found
}
