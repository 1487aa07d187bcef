use crate::token::Span;

use super::{Expr, ExprKind, GStringPart, NodeId, Param, Stmt, StmtKind};

/// Borrowed handle to any node of an [`Ast`](super::Ast).
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Param(&'a Param),
}

/// Short, stable name of a node's variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Assign,
    Append,
    Block,
    Include,
    Incomplete,
    If,
    Compound,
    Return,
    Assert,
    Declaration,
    ExpressionStatement,
    Constant,
    GString,
    Variable,
    Property,
    MethodCall,
    Binary,
    Unary,
    Ternary,
    List,
    Map,
    Range,
    Closure,
    Cast,
    Tuple,
    Parameter,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Assign => "assignment",
            NodeKind::Append => "append",
            NodeKind::Block => "block",
            NodeKind::Include => "include",
            NodeKind::Incomplete => "incomplete",
            NodeKind::If => "if",
            NodeKind::Compound => "compound",
            NodeKind::Return => "return",
            NodeKind::Assert => "assert",
            NodeKind::Declaration => "declaration",
            NodeKind::ExpressionStatement => "expression statement",
            NodeKind::Constant => "constant",
            NodeKind::GString => "gstring",
            NodeKind::Variable => "variable",
            NodeKind::Property => "property",
            NodeKind::MethodCall => "method call",
            NodeKind::Binary => "binary",
            NodeKind::Unary => "unary",
            NodeKind::Ternary => "ternary",
            NodeKind::List => "list",
            NodeKind::Map => "map",
            NodeKind::Range => "range",
            NodeKind::Closure => "closure",
            NodeKind::Cast => "cast",
            NodeKind::Tuple => "tuple",
            NodeKind::Parameter => "parameter",
        }
    }
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        match self {
            NodeRef::Stmt(s) => s.id,
            NodeRef::Expr(e) => e.id,
            NodeRef::Param(p) => p.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            NodeRef::Stmt(s) => s.span,
            NodeRef::Expr(e) => e.span,
            NodeRef::Param(p) => p.span,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Stmt(s) => match &s.kind {
                StmtKind::Assign(_) => NodeKind::Assign,
                StmtKind::Append(_) => NodeKind::Append,
                StmtKind::Block(_) => NodeKind::Block,
                StmtKind::Include(_) => NodeKind::Include,
                StmtKind::Incomplete(_) => NodeKind::Incomplete,
                StmtKind::If { .. } => NodeKind::If,
                StmtKind::Compound(_) => NodeKind::Compound,
                StmtKind::Return(_) => NodeKind::Return,
                StmtKind::Assert { .. } => NodeKind::Assert,
                StmtKind::Decl(_) => NodeKind::Declaration,
                StmtKind::Expr(_) => NodeKind::ExpressionStatement,
            },
            NodeRef::Expr(e) => match &e.kind {
                ExprKind::Constant(_) => NodeKind::Constant,
                ExprKind::GString(_) => NodeKind::GString,
                ExprKind::Variable(_) => NodeKind::Variable,
                ExprKind::Property { .. } => NodeKind::Property,
                ExprKind::MethodCall(_) => NodeKind::MethodCall,
                ExprKind::Binary { .. } => NodeKind::Binary,
                ExprKind::Unary { .. } => NodeKind::Unary,
                ExprKind::Ternary { .. } => NodeKind::Ternary,
                ExprKind::List(_) => NodeKind::List,
                ExprKind::Map(_) => NodeKind::Map,
                ExprKind::Range { .. } => NodeKind::Range,
                ExprKind::Closure(_) => NodeKind::Closure,
                ExprKind::Cast { .. } => NodeKind::Cast,
                ExprKind::Tuple(_) => NodeKind::Tuple,
            },
            NodeRef::Param(_) => NodeKind::Parameter,
        }
    }

    /// Direct children in source order. Every node reachable from the root
    /// is returned by exactly one parent.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        match *self {
            NodeRef::Stmt(stmt) => stmt_children(stmt, &mut out),
            NodeRef::Expr(expr) => expr_children(expr, &mut out),
            NodeRef::Param(param) => {
                if let Some(default) = &param.default {
                    out.push(NodeRef::Expr(default));
                }
            }
        }
        out
    }
}

fn stmt_children<'a>(stmt: &'a Stmt, out: &mut Vec<NodeRef<'a>>) {
    match &stmt.kind {
        StmtKind::Assign(a) | StmtKind::Append(a) => out.push(NodeRef::Expr(&a.value)),
        StmtKind::Block(block) => out.extend(block.statements.iter().map(NodeRef::Stmt)),
        StmtKind::Include(include) => out.push(NodeRef::Expr(&include.source)),
        StmtKind::Incomplete(_) => {}
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            out.push(NodeRef::Expr(condition));
            out.push(NodeRef::Stmt(then_branch));
            if let Some(else_branch) = else_branch {
                out.push(NodeRef::Stmt(else_branch));
            }
        }
        StmtKind::Compound(statements) => out.extend(statements.iter().map(NodeRef::Stmt)),
        StmtKind::Return(value) => {
            if let Some(value) = value {
                out.push(NodeRef::Expr(value));
            }
        }
        StmtKind::Assert { condition, message } => {
            out.push(NodeRef::Expr(condition));
            if let Some(message) = message {
                out.push(NodeRef::Expr(message));
            }
        }
        StmtKind::Decl(decl) => {
            out.push(NodeRef::Expr(&decl.target));
            if let Some(value) = &decl.value {
                out.push(NodeRef::Expr(value));
            }
        }
        StmtKind::Expr(expr) => out.push(NodeRef::Expr(expr)),
    }
}

fn expr_children<'a>(expr: &'a Expr, out: &mut Vec<NodeRef<'a>>) {
    match &expr.kind {
        ExprKind::Constant(_) | ExprKind::Variable(_) => {}
        ExprKind::GString(parts) => {
            for part in parts {
                if let GStringPart::Value(value) = part {
                    out.push(NodeRef::Expr(value));
                }
            }
        }
        ExprKind::Property { object, .. } => out.push(NodeRef::Expr(object)),
        ExprKind::MethodCall(call) => {
            if let Some(object) = &call.object {
                out.push(NodeRef::Expr(object));
            }
            out.extend(call.args.iter().map(NodeRef::Expr));
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            out.push(NodeRef::Expr(lhs));
            out.push(NodeRef::Expr(rhs));
        }
        ExprKind::Unary { operand, .. } => out.push(NodeRef::Expr(operand)),
        ExprKind::Ternary {
            condition,
            then_expr,
            else_expr,
        } => {
            out.push(NodeRef::Expr(condition));
            out.push(NodeRef::Expr(then_expr));
            out.push(NodeRef::Expr(else_expr));
        }
        ExprKind::List(items) | ExprKind::Tuple(items) => out.extend(items.iter().map(NodeRef::Expr)),
        ExprKind::Map(entries) => {
            for entry in entries {
                out.push(NodeRef::Expr(&entry.key));
                out.push(NodeRef::Expr(&entry.value));
            }
        }
        ExprKind::Range { from, to, .. } => {
            out.push(NodeRef::Expr(from));
            out.push(NodeRef::Expr(to));
        }
        ExprKind::Closure(closure) => {
            if let Some(params) = &closure.params {
                out.extend(params.iter().map(NodeRef::Param));
            }
            out.extend(closure.body.iter().map(NodeRef::Stmt));
        }
        ExprKind::Cast { expr, .. } => out.push(NodeRef::Expr(expr)),
    }
}
