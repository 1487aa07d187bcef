//! CST to AST construction.
//!
//! Statement alternatives are matched exhaustively. Malformed number literals are
//! remembered (first one wins) and reported only after the whole tree is built, so the
//! partial tree stays available to callers.

use std::fmt;

use crate::ast::{
    Assignment, Ast, AstMeta, BlockAddress, ConfigBlock, Declaration, Expr, ExprKind, Include, NodeId, QuoteStyle,
    Stmt, StmtKind,
};
use crate::cst::{CstDeclTarget, CstFile, CstPrimary, CstScriptStmt, CstStmt};
use crate::diagnostic::{Diagnostic, Phase};
use crate::token::Span;

mod expr;
mod numbers;
mod strings;

#[cfg(test)]
mod strings_test;

pub use numbers::parse_number;
pub use strings::{escape, slashy_representable, string_value, unescape};

/// The only block whose body may use `name value` append statements.
pub const APPEND_SCOPE: &str = "plugins";

pub const APPEND_MISUSE: &str = "Append syntax is only allowed in the plugins block";

#[derive(Debug, Clone, PartialEq)]
pub struct BuildError {
    pub message: String,
    pub span: Span,
}

impl BuildError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

impl std::error::Error for BuildError {}

#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub ast: Ast,
    /// Recoverable problems found while building (append misuse, incomplete statements).
    pub diagnostics: Vec<Diagnostic>,
}

/// Fatal construction error. `partial` holds the finished tree when the error was a
/// deferred number-format error.
#[derive(Debug, Clone)]
pub struct BuildFailure {
    pub error: BuildError,
    pub partial: Option<Ast>,
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for BuildFailure {}

pub fn build(cst: &CstFile) -> Result<BuildOutput, BuildFailure> {
    let mut builder = AstBuilder::default();
    let statements = match builder.config_statements(&cst.statements) {
        Ok(statements) => statements,
        Err(error) => {
            return Err(BuildFailure {
                error,
                partial: None,
                diagnostics: builder.diagnostics,
            });
        }
    };
    let ast = Ast {
        name: cst.name.clone(),
        statements,
        span: cst.span,
        meta: builder.meta,
    };
    match builder.number_error {
        Some(error) => Err(BuildFailure {
            error,
            partial: Some(ast),
            diagnostics: builder.diagnostics,
        }),
        None => Ok(BuildOutput {
            ast,
            diagnostics: builder.diagnostics,
        }),
    }
}

#[derive(Default)]
pub(crate) struct AstBuilder {
    next_id: u32,
    pub(crate) meta: AstMeta,
    pub(crate) diagnostics: Vec<Diagnostic>,
    number_error: Option<BuildError>,
}

type BuildResult<T> = Result<T, BuildError>;

impl AstBuilder {
    pub(crate) fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn expr_node(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr {
            id: self.next_id(),
            span,
            kind,
        }
    }

    fn stmt_node(&mut self, kind: StmtKind, span: Span) -> Stmt {
        Stmt {
            id: self.next_id(),
            span,
            kind,
        }
    }

    pub(crate) fn record_number_error(&mut self, message: String, span: Span) {
        if self.number_error.is_none() {
            self.number_error = Some(BuildError::new(message, span));
        }
    }

    /// Text of a config name; quoted names are unescaped.
    fn primary_text(&self, primary: &CstPrimary) -> (String, Option<QuoteStyle>) {
        if primary.quoted
            && let Some((value, style)) = string_value(&primary.text)
        {
            return (value, Some(style));
        }
        (primary.text.clone(), None)
    }

    fn config_statements(&mut self, statements: &[CstStmt]) -> BuildResult<Vec<Stmt>> {
        statements.iter().map(|s| self.config_statement(s)).collect()
    }

    fn config_statement(&mut self, cst: &CstStmt) -> BuildResult<Stmt> {
        match cst {
            CstStmt::Include(include) => {
                let source = self.expr(&include.source)?;
                Ok(self.stmt_node(StmtKind::Include(Include { source }), include.span))
            }
            CstStmt::Assignment(assign) => {
                let path = assign.path.iter().map(|p| self.primary_text(p).0).collect();
                let value = self.expr(&assign.value)?;
                Ok(self.stmt_node(StmtKind::Assign(Assignment { path, value }), assign.span))
            }
            CstStmt::Block(block) => {
                let (name, style) = self.primary_text(&block.name);
                let statements = self.config_statements(&block.statements)?;
                let stmt = self.stmt_node(
                    StmtKind::Block(ConfigBlock {
                        address: BlockAddress::Name(name),
                        statements,
                    }),
                    block.span,
                );
                if let Some(style) = style {
                    self.meta.set_quote_style(stmt.id, style);
                }
                Ok(stmt)
            }
            CstStmt::AppendBlock(block) => {
                let (name, _) = self.primary_text(&block.name);
                if name != APPEND_SCOPE {
                    self.diagnostics
                        .push(Diagnostic::warning(Phase::Syntax, APPEND_MISUSE, block.span));
                }
                let mut statements = Vec::with_capacity(block.statements.len());
                for append in &block.statements {
                    let (target, _) = self.primary_text(&append.target);
                    let value = self.expr(&append.value)?;
                    statements.push(self.stmt_node(
                        StmtKind::Append(Assignment {
                            path: vec![target],
                            value,
                        }),
                        append.span,
                    ));
                }
                Ok(self.stmt_node(
                    StmtKind::Block(ConfigBlock {
                        address: BlockAddress::Name(name),
                        statements,
                    }),
                    block.span,
                ))
            }
            CstStmt::Selector(selector) => {
                let (kind, _) = self.primary_text(&selector.kind);
                let (target, style) = self.primary_text(&selector.target);
                let statements = self.config_statements(&selector.statements)?;
                let stmt = self.stmt_node(
                    StmtKind::Block(ConfigBlock {
                        address: BlockAddress::Selector { kind, target },
                        statements,
                    }),
                    selector.span,
                );
                if let Some(style) = style {
                    self.meta.set_quote_style(stmt.id, style);
                }
                Ok(stmt)
            }
            CstStmt::Incomplete(incomplete) => {
                if !incomplete.recovered {
                    self.diagnostics
                        .push(Diagnostic::error(Phase::Syntax, "Incomplete statement", incomplete.span));
                }
                Ok(self.stmt_node(StmtKind::Incomplete(incomplete.text.clone()), incomplete.span))
            }
            CstStmt::Statement(stmt) => self.script_statement(stmt),
        }
    }

    pub(crate) fn script_statement(&mut self, cst: &CstScriptStmt) -> BuildResult<Stmt> {
        let kind = match cst {
            CstScriptStmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let condition = self.expr(condition)?;
                let then_branch = Box::new(self.script_statement(then_branch)?);
                let else_branch = match else_branch {
                    Some(stmt) => Some(Box::new(self.script_statement(stmt)?)),
                    None => None,
                };
                StmtKind::If {
                    condition,
                    then_branch,
                    else_branch,
                }
            }
            CstScriptStmt::Block { statements, .. } => StmtKind::Compound(self.script_statements(statements)?),
            CstScriptStmt::Return { value, .. } => StmtKind::Return(self.opt_expr(value.as_ref())?),
            CstScriptStmt::Assert { condition, message, .. } => StmtKind::Assert {
                condition: self.expr(condition)?,
                message: self.opt_expr(message.as_ref())?,
            },
            CstScriptStmt::Declaration {
                type_name,
                target,
                value,
                ..
            } => {
                let target = match target {
                    CstDeclTarget::Single(name) => self.expr_node(ExprKind::Variable(name.name.clone()), name.span),
                    CstDeclTarget::Tuple { names, span } => {
                        let items = names
                            .iter()
                            .map(|n| self.expr_node(ExprKind::Variable(n.name.clone()), n.span))
                            .collect();
                        self.expr_node(ExprKind::Tuple(items), *span)
                    }
                };
                StmtKind::Decl(Declaration {
                    type_name: type_name.as_ref().map(|t| t.name.clone()),
                    target,
                    value: self.opt_expr(value.as_ref())?,
                })
            }
            CstScriptStmt::Expression(expr) => StmtKind::Expr(self.expr(expr)?),
            CstScriptStmt::Incomplete(incomplete) => StmtKind::Incomplete(incomplete.text.clone()),
        };
        Ok(self.stmt_node(kind, cst.span()))
    }

    pub(crate) fn script_statements(&mut self, statements: &[CstScriptStmt]) -> BuildResult<Vec<Stmt>> {
        statements.iter().map(|s| self.script_statement(s)).collect()
    }
}
