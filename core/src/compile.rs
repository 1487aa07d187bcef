//! Text to AST plus syntax diagnostics for a single document.

use std::sync::Arc;

use tracing::debug;

use crate::ast::Ast;
use crate::builder::build;
use crate::diagnostic::{Diagnostic, Phase};
use crate::parser::parse;

#[derive(Debug, Clone)]
pub struct CompiledSource {
    /// `None` when the text could not be tokenized or the build hit a fatal shape.
    pub ast: Option<Arc<Ast>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledSource {
    pub fn syntax_error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.phase == Phase::Syntax && d.is_error())
            .count()
    }
}

pub fn compile(text: &str, name: &str) -> CompiledSource {
    let parsed = match parse(text, name) {
        Ok(parsed) => parsed,
        Err(failure) => {
            debug!(name, error = %failure, "tokenizer failure");
            return CompiledSource {
                ast: None,
                diagnostics: vec![Diagnostic::from(&failure.error)],
            };
        }
    };

    let mut diagnostics: Vec<Diagnostic> = parsed.errors.iter().map(Diagnostic::from).collect();
    let ast = match build(&parsed.cst) {
        Ok(output) => {
            diagnostics.extend(output.diagnostics);
            Some(output.ast)
        }
        Err(failure) => {
            debug!(name, error = %failure.error, "AST construction failed");
            diagnostics.extend(failure.diagnostics);
            diagnostics.push(Diagnostic::error(Phase::Syntax, failure.error.message, failure.error.span));
            failure.partial
        }
    };
    diagnostics.sort_by_key(|d| (d.span.start, d.phase));
    CompiledSource {
        ast: ast.map(Arc::new),
        diagnostics,
    }
}
