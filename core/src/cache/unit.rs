use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;
use twox_hash::XxHash64;
use url::Url;

use crate::ast::{Ast, NodeId, StmtKind};
use crate::compile::CompiledSource;
use crate::diagnostic::{Diagnostic, Phase};
use crate::index::PositionIndex;
use crate::token::Span;

pub(crate) fn content_hash(text: &str) -> u64 {
    let mut hasher = XxHash64::default();
    text.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IncludeStatus {
    /// Not validated since the includer was rebuilt.
    Unchecked,
    Resolved,
    Missing,
    /// Target lives under a foreign scheme and is not verified.
    Skipped,
    /// The edge closes a cycle in the include graph.
    Cycle,
}

/// One `includeConfig` statement and where it points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncludeEdge {
    pub stmt: NodeId,
    pub span: Span,
    pub source: String,
    pub target: Option<Url>,
    pub status: IncludeStatus,
}

impl IncludeEdge {
    pub(crate) fn diagnostic(&self) -> Option<Diagnostic> {
        let message = match self.status {
            IncludeStatus::Missing => format!("Invalid include source: '{}'", self.source),
            IncludeStatus::Cycle => format!(
                "Include cycle detected: {}",
                self.target.as_ref().map(Url::as_str).unwrap_or(&self.source)
            ),
            _ => return None,
        };
        Some(Diagnostic::error(Phase::IncludeResolution, message, self.span))
    }
}

/// Compiled state of one document. Units are replaced wholesale, never mutated in place.
#[derive(Debug)]
pub struct SourceUnit {
    pub uri: Url,
    pub hash: u64,
    pub ast: Option<Arc<Ast>>,
    syntax: Vec<Diagnostic>,
    includes: Vec<IncludeEdge>,
    semantic: Vec<Diagnostic>,
    index: OnceCell<Arc<PositionIndex>>,
}

impl SourceUnit {
    pub(crate) fn new(uri: Url, hash: u64, compiled: CompiledSource) -> Self {
        let includes = match &compiled.ast {
            Some(ast) => collect_includes(ast, &uri),
            None => Vec::new(),
        };
        Self {
            uri,
            hash,
            ast: compiled.ast,
            syntax: compiled.diagnostics,
            includes,
            semantic: Vec::new(),
            index: OnceCell::new(),
        }
    }

    /// Copy of `self` with new include statuses and semantic diagnostics.
    /// A position index that was already built is carried over.
    pub(crate) fn reseal(&self, includes: Vec<IncludeEdge>, semantic: Vec<Diagnostic>) -> Self {
        let index = OnceCell::new();
        if let Some(built) = self.index.get() {
            let _ = index.set(built.clone());
        }
        Self {
            uri: self.uri.clone(),
            hash: self.hash,
            ast: self.ast.clone(),
            syntax: self.syntax.clone(),
            includes,
            semantic,
            index,
        }
    }

    pub fn includes(&self) -> &[IncludeEdge] {
        &self.includes
    }

    pub fn semantic_diagnostics(&self) -> &[Diagnostic] {
        &self.semantic
    }

    pub fn syntax_error_count(&self) -> usize {
        self.syntax
            .iter()
            .filter(|d| d.phase == Phase::Syntax && d.is_error())
            .count()
    }

    /// All diagnostics, ordered by position and then phase.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = self.syntax.clone();
        out.extend(self.includes.iter().filter_map(IncludeEdge::diagnostic));
        out.extend(self.semantic.iter().cloned());
        out.sort_by_key(|d| (d.span.start, d.phase));
        out
    }

    /// Built on first use.
    pub fn index(&self) -> Option<Arc<PositionIndex>> {
        let ast = self.ast.as_ref()?;
        Some(self.index.get_or_init(|| Arc::new(PositionIndex::build(ast))).clone())
    }
}

fn collect_includes(ast: &Ast, base: &Url) -> Vec<IncludeEdge> {
    let mut edges = Vec::new();
    ast.walk(|node| {
        if let crate::ast::NodeRef::Stmt(stmt) = node
            && let StmtKind::Include(include) = &stmt.kind
        {
            let (source, target, status) = match include.literal_source() {
                Some(source) => match super::includes::resolve_target(base, source) {
                    Some(target) => (source.to_string(), Some(target), IncludeStatus::Unchecked),
                    None => (source.to_string(), None, IncludeStatus::Skipped),
                },
                // dynamic sources cannot be checked statically
                None => (ast.render_expr(&include.source), None, IncludeStatus::Skipped),
            };
            edges.push(IncludeEdge {
                stmt: stmt.id,
                span: stmt.span,
                source,
                target,
                status,
            });
        }
    });
    edges
}
