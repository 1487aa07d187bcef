//! Semantic tree built from the CST.
//!
//! Nodes are immutable after construction. Every statement, expression and parameter
//! carries a [`NodeId`]; formatting metadata lives in [`AstMeta`] side tables keyed by it.

use serde::Serialize;

use crate::token::Span;

mod display;
mod meta;
mod node;

pub use meta::{AstMeta, QuoteStyle};
pub use node::{NodeKind, NodeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub name: String,
    pub statements: Vec<Stmt>,
    pub span: Span,
    pub meta: AstMeta,
}

impl Ast {
    /// Preorder walk over every node.
    pub fn walk<'a>(&'a self, mut f: impl FnMut(NodeRef<'a>)) {
        let mut stack: Vec<NodeRef<'a>> = self.statements.iter().rev().map(NodeRef::Stmt).collect();
        while let Some(node) = stack.pop() {
            f(node);
            let children = node.children();
            stack.extend(children.into_iter().rev());
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `a.b.c = value`
    Assign(Assignment),
    /// `name value` inside the append-capable block.
    Append(Assignment),
    Block(ConfigBlock),
    Include(Include),
    /// Raw text of a statement that could not be parsed.
    Incomplete(String),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Compound(Vec<Stmt>),
    Return(Option<Expr>),
    Assert {
        condition: Expr,
        message: Option<Expr>,
    },
    Decl(Declaration),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Dotted name path; never empty.
    pub path: Vec<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigBlock {
    pub address: BlockAddress,
    pub statements: Vec<Stmt>,
}

/// A block is addressed either by name or by a `kind: target` selector.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockAddress {
    Name(String),
    Selector { kind: String, target: String },
}

impl ConfigBlock {
    pub fn name(&self) -> Option<&str> {
        match &self.address {
            BlockAddress::Name(name) => Some(name),
            BlockAddress::Selector { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<&str> {
        match &self.address {
            BlockAddress::Name(_) => None,
            BlockAddress::Selector { kind, .. } => Some(kind),
        }
    }

    pub fn target(&self) -> Option<&str> {
        match &self.address {
            BlockAddress::Name(_) => None,
            BlockAddress::Selector { target, .. } => Some(target),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub source: Expr,
}

impl Include {
    /// The include path when it is a plain string constant.
    pub fn literal_source(&self) -> Option<&str> {
        match &self.source.kind {
            ExprKind::Constant(Literal::String(s)) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub type_name: Option<String>,
    /// A variable, or a tuple of variables for multiple assignment.
    pub target: Expr,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub type_name: Option<String>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Constant(Literal),
    GString(Vec<GStringPart>),
    Variable(String),
    Property {
        object: Box<Expr>,
        property: String,
        safe: bool,
        spread_safe: bool,
    },
    MethodCall(MethodCall),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    List(Vec<Expr>),
    Map(Vec<MapEntry>),
    Range {
        from: Box<Expr>,
        to: Box<Expr>,
        exclusive_from: bool,
        exclusive_to: bool,
    },
    Closure(Closure),
    Cast {
        expr: Box<Expr>,
        type_name: String,
    },
    /// Multiple-assignment target `(a, b)`.
    Tuple(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Decimal(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GStringPart {
    Text(String),
    Value(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// `None` for implicit-this calls.
    pub object: Option<Box<Expr>>,
    pub method: String,
    pub args: Vec<Expr>,
    pub implicit_this: bool,
    pub safe: bool,
    pub spread_safe: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    /// `None` when the closure declares no parameter list (implicit `it`).
    pub params: Option<Vec<Param>>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Compare,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    RegexFind,
    RegexMatch,
    In,
    NotIn,
    Instanceof,
    Elvis,
    Index,
    SafeIndex,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Compare => "<=>",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::RegexFind => "=~",
            BinaryOp::RegexMatch => "==~",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "!in",
            BinaryOp::Instanceof => "instanceof",
            BinaryOp::Elvis => "?:",
            BinaryOp::Index => "[",
            BinaryOp::SafeIndex => "?[",
            BinaryOp::Assign => "=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::ModAssign => "%=",
        }
    }

    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::ModAssign
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}
