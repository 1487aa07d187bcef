//! Grammar-shaped parse output.
//!
//! The CST mirrors the config grammar alternatives one-to-one and keeps raw literal
//! text; the AST builder consumes it and discards it.

use crate::token::{Position, Span, Token};

#[derive(Debug, Clone, PartialEq)]
pub struct CstFile {
    pub name: String,
    pub statements: Vec<CstStmt>,
    pub span: Span,
}

/// Config statement alternatives.
#[derive(Debug, Clone, PartialEq)]
pub enum CstStmt {
    Include(CstInclude),
    Assignment(CstAssignment),
    Block(CstBlock),
    AppendBlock(CstAppendBlock),
    Selector(CstSelector),
    Incomplete(CstIncomplete),
    Statement(CstScriptStmt),
}

impl CstStmt {
    pub fn span(&self) -> Span {
        match self {
            CstStmt::Include(s) => s.span,
            CstStmt::Assignment(s) => s.span,
            CstStmt::Block(s) => s.span,
            CstStmt::AppendBlock(s) => s.span,
            CstStmt::Selector(s) => s.span,
            CstStmt::Incomplete(s) => s.span,
            CstStmt::Statement(s) => s.span(),
        }
    }
}

/// Identifier, keyword or quoted string used as a config name. `text` is raw source.
#[derive(Debug, Clone, PartialEq)]
pub struct CstPrimary {
    pub text: String,
    pub quoted: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstInclude {
    pub source: CstExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstAssignment {
    pub path: Vec<CstPrimary>,
    pub value: CstExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstBlock {
    pub name: CstPrimary,
    pub statements: Vec<CstStmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstAppendBlock {
    pub name: CstPrimary,
    pub statements: Vec<CstAppendStmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstAppendStmt {
    pub target: CstPrimary,
    pub value: CstExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstSelector {
    pub kind: CstPrimary,
    pub target: CstPrimary,
    pub statements: Vec<CstStmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstIncomplete {
    pub text: String,
    /// Produced by error recovery; the parser already reported the problem.
    pub recovered: bool,
    pub span: Span,
}

/// General scripting statements (closure bodies and top-level code).
#[derive(Debug, Clone, PartialEq)]
pub enum CstScriptStmt {
    If {
        condition: CstExpr,
        then_branch: Box<CstScriptStmt>,
        else_branch: Option<Box<CstScriptStmt>>,
        span: Span,
    },
    Block {
        statements: Vec<CstScriptStmt>,
        span: Span,
    },
    Return {
        value: Option<CstExpr>,
        span: Span,
    },
    Assert {
        condition: CstExpr,
        message: Option<CstExpr>,
        span: Span,
    },
    Declaration {
        type_name: Option<CstName>,
        target: CstDeclTarget,
        value: Option<CstExpr>,
        span: Span,
    },
    Expression(CstExpr),
    Incomplete(CstIncomplete),
}

impl CstScriptStmt {
    pub fn span(&self) -> Span {
        match self {
            CstScriptStmt::If { span, .. }
            | CstScriptStmt::Block { span, .. }
            | CstScriptStmt::Return { span, .. }
            | CstScriptStmt::Assert { span, .. }
            | CstScriptStmt::Declaration { span, .. } => *span,
            CstScriptStmt::Expression(e) => e.span(),
            CstScriptStmt::Incomplete(i) => i.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CstDeclTarget {
    Single(CstName),
    Tuple { names: Vec<CstName>, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstName {
    pub name: String,
    pub span: Span,
}

/// Operator as written, possibly several adjacent tokens (`>>`, `>>>`).
#[derive(Debug, Clone, PartialEq)]
pub struct CstOp {
    pub tokens: Vec<Token>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CstLiteral {
    Number(String),
    Str(String),
    True,
    False,
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstGString {
    /// `"`, `"""` or `/`
    pub delimiter: String,
    pub texts: Vec<CstGStringText>,
    /// `$name.prop` values.
    pub paths: Vec<CstGStringPath>,
    /// `${ ... }` values; `expr` is `None` for `${}`.
    pub exprs: Vec<CstGStringExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstGStringText {
    pub raw: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstGStringPath {
    pub names: Vec<CstName>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstGStringExpr {
    pub expr: Option<Box<CstExpr>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CstArg {
    Positional(CstExpr),
    Named { name: CstPrimary, value: CstExpr, span: Span },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstMapEntry {
    pub key: CstExpr,
    pub value: CstExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstParam {
    pub type_name: Option<CstName>,
    pub name: CstName,
    pub default: Option<CstExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CstClosure {
    pub params: Option<Vec<CstParam>>,
    pub body: Vec<CstScriptStmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CstAccess {
    Dot,
    Safe,
    Spread,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CstPathElement {
    Property { access: CstAccess, name: CstName, span: Span },
    Arguments { args: Vec<CstArg>, span: Span },
    Closure(CstClosure),
    Index { index: CstExpr, safe: bool, span: Span },
}

impl CstPathElement {
    pub fn span(&self) -> Span {
        match self {
            CstPathElement::Property { span, .. }
            | CstPathElement::Arguments { span, .. }
            | CstPathElement::Index { span, .. } => *span,
            CstPathElement::Closure(c) => c.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CstExpr {
    Literal { value: CstLiteral, span: Span },
    GString(CstGString),
    Name(CstName),
    Paren { inner: Box<CstExpr>, span: Span },
    /// `(a, b)` on the left of `=`.
    Tuple { items: Vec<CstExpr>, span: Span },
    List { items: Vec<CstExpr>, span: Span },
    Map { entries: Vec<CstMapEntry>, span: Span },
    Closure(CstClosure),
    Path { primary: Box<CstExpr>, elements: Vec<CstPathElement>, span: Span },
    /// Paren-less call such as `println 'x'`.
    Command { callee: Box<CstExpr>, args: Vec<CstArg>, span: Span },
    Unary { op: CstOp, operand: Box<CstExpr>, span: Span },
    Binary { op: CstOp, lhs: Box<CstExpr>, rhs: Box<CstExpr>, span: Span },
    Range { op: CstOp, from: Box<CstExpr>, to: Box<CstExpr>, span: Span },
    Ternary { condition: Box<CstExpr>, then_expr: Box<CstExpr>, else_expr: Box<CstExpr>, span: Span },
    Cast { expr: Box<CstExpr>, type_name: CstName, span: Span },
    Assignment { op: CstOp, target: Box<CstExpr>, value: Box<CstExpr>, span: Span },
}

impl CstExpr {
    pub fn span(&self) -> Span {
        match self {
            CstExpr::Literal { span, .. }
            | CstExpr::Paren { span, .. }
            | CstExpr::Tuple { span, .. }
            | CstExpr::List { span, .. }
            | CstExpr::Map { span, .. }
            | CstExpr::Path { span, .. }
            | CstExpr::Command { span, .. }
            | CstExpr::Unary { span, .. }
            | CstExpr::Binary { span, .. }
            | CstExpr::Range { span, .. }
            | CstExpr::Ternary { span, .. }
            | CstExpr::Cast { span, .. }
            | CstExpr::Assignment { span, .. } => *span,
            CstExpr::GString(g) => g.span,
            CstExpr::Name(n) => n.span,
            CstExpr::Closure(c) => c.span,
        }
    }

    pub fn start(&self) -> Position {
        self.span().start
    }
}
