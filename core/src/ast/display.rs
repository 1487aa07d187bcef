use std::fmt;

use crate::builder::{escape, slashy_representable};

use super::{
    Ast, BinaryOp, BlockAddress, Closure, Expr, ExprKind, GStringPart, Literal, MethodCall, Param, QuoteStyle, Stmt,
    StmtKind,
};

const INDENT: &str = "    ";

const RESERVED: &[&str] = &[
    "includeConfig",
    "if",
    "else",
    "return",
    "assert",
    "def",
    "in",
    "instanceof",
    "as",
    "true",
    "false",
    "null",
];

fn is_plain_name(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        && !RESERVED.contains(&s)
}

fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_plain_name(name) {
        write!(f, "{}", name)
    } else {
        write!(f, "'{}'", escape(name, QuoteStyle::Single))
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printer = Printer { ast: self };
        for stmt in &self.statements {
            printer.stmt(f, stmt, 0)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Ast {
    /// Source text of `expr`, rendered with this tree's side tables.
    pub fn render_expr(&self, expr: &Expr) -> String {
        struct Rendered<'a>(&'a Ast, &'a Expr);

        impl fmt::Display for Rendered<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                Printer { ast: self.0 }.expr(f, self.1, 0)
            }
        }

        Rendered(self, expr).to_string()
    }
}

struct Printer<'a> {
    ast: &'a Ast,
}

impl Printer<'_> {
    fn indent(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        for _ in 0..level {
            f.write_str(INDENT)?;
        }
        Ok(())
    }

    /// Writes `stmt` at `level`; the caller emits the trailing newline.
    fn stmt(&self, f: &mut fmt::Formatter<'_>, stmt: &Stmt, level: usize) -> fmt::Result {
        self.indent(f, level)?;
        self.stmt_body(f, stmt, level)
    }

    fn stmt_body(&self, f: &mut fmt::Formatter<'_>, stmt: &Stmt, level: usize) -> fmt::Result {
        match &stmt.kind {
            StmtKind::Assign(assign) => {
                for (i, name) in assign.path.iter().enumerate() {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write_name(f, name)?;
                }
                write!(f, " = ")?;
                self.expr(f, &assign.value, level)
            }
            StmtKind::Append(append) => {
                write_name(f, append.path.first().map(String::as_str).unwrap_or_default())?;
                write!(f, " ")?;
                self.expr(f, &append.value, level)
            }
            StmtKind::Block(block) => {
                let label = match &block.address {
                    BlockAddress::Name(name) => name,
                    BlockAddress::Selector { kind, target } => {
                        write!(f, "{}: ", kind)?;
                        target
                    }
                };
                match self.ast.meta.quote_style(stmt.id) {
                    Some(style) => write!(f, "{0}{1}{0}", style.delimiter(), escape(label, style))?,
                    None => write_name(f, label)?,
                }
                write!(f, " ")?;
                self.braced(f, &block.statements, level)
            }
            StmtKind::Include(include) => {
                write!(f, "includeConfig ")?;
                self.expr(f, &include.source, level)
            }
            StmtKind::Incomplete(text) => write!(f, "{}", text),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                write!(f, "if (")?;
                self.expr(f, condition, level)?;
                write!(f, ") ")?;
                self.stmt_body(f, then_branch, level)?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else ")?;
                    self.stmt_body(f, else_branch, level)?;
                }
                Ok(())
            }
            StmtKind::Compound(statements) => self.braced(f, statements, level),
            StmtKind::Return(value) => {
                write!(f, "return")?;
                if let Some(value) = value {
                    write!(f, " ")?;
                    self.expr(f, value, level)?;
                }
                Ok(())
            }
            StmtKind::Assert { condition, message } => {
                write!(f, "assert ")?;
                self.expr(f, condition, level)?;
                if let Some(message) = message {
                    write!(f, " : ")?;
                    self.expr(f, message, level)?;
                }
                Ok(())
            }
            StmtKind::Decl(decl) => {
                match &decl.type_name {
                    Some(type_name) => write!(f, "{} ", type_name)?,
                    None => write!(f, "def ")?,
                }
                self.expr(f, &decl.target, level)?;
                if let Some(value) = &decl.value {
                    write!(f, " = ")?;
                    self.expr(f, value, level)?;
                }
                Ok(())
            }
            StmtKind::Expr(expr) => self.expr(f, expr, level),
        }
    }

    fn braced(&self, f: &mut fmt::Formatter<'_>, statements: &[Stmt], level: usize) -> fmt::Result {
        if statements.is_empty() {
            return write!(f, "{{}}");
        }
        writeln!(f, "{{")?;
        for stmt in statements {
            self.stmt(f, stmt, level + 1)?;
            writeln!(f)?;
        }
        self.indent(f, level)?;
        write!(f, "}}")
    }

    fn expr(&self, f: &mut fmt::Formatter<'_>, expr: &Expr, level: usize) -> fmt::Result {
        let depth = self.ast.meta.paren_depth(expr.id);
        for _ in 0..depth {
            write!(f, "(")?;
        }
        self.expr_body(f, expr, level)?;
        for _ in 0..depth {
            write!(f, ")")?;
        }
        Ok(())
    }

    fn expr_body(&self, f: &mut fmt::Formatter<'_>, expr: &Expr, level: usize) -> fmt::Result {
        match &expr.kind {
            ExprKind::Constant(literal) => self.constant(f, expr, literal),
            ExprKind::GString(parts) => {
                let style = self.ast.meta.quote_style(expr.id).unwrap_or(QuoteStyle::Double);
                let delimiter = style.delimiter();
                write!(f, "{}", delimiter)?;
                for part in parts {
                    match part {
                        GStringPart::Text(text) => write!(f, "{}", escape(text, style))?,
                        GStringPart::Value(value) => {
                            write!(f, "${{")?;
                            self.expr(f, value, level)?;
                            write!(f, "}}")?;
                        }
                    }
                }
                write!(f, "{}", delimiter)
            }
            ExprKind::Variable(name) => write!(f, "{}", name),
            ExprKind::Property {
                object,
                property,
                safe,
                spread_safe,
            } => {
                self.expr(f, object, level)?;
                write!(f, "{}", access(*safe, *spread_safe))?;
                write_name(f, property)
            }
            ExprKind::MethodCall(call) => self.method_call(f, call, level),
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(f, lhs, level)?;
                match op {
                    BinaryOp::Index | BinaryOp::SafeIndex => {
                        write!(f, "{}", op.symbol())?;
                        self.expr(f, rhs, level)?;
                        write!(f, "]")
                    }
                    _ => {
                        write!(f, " {} ", op.symbol())?;
                        self.expr(f, rhs, level)
                    }
                }
            }
            ExprKind::Unary { op, operand } => {
                write!(f, "{}", op.symbol())?;
                self.expr(f, operand, level)
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.expr(f, condition, level)?;
                write!(f, " ? ")?;
                self.expr(f, then_expr, level)?;
                write!(f, " : ")?;
                self.expr(f, else_expr, level)
            }
            ExprKind::List(items) => {
                write!(f, "[")?;
                self.comma_separated(f, items, level)?;
                write!(f, "]")
            }
            ExprKind::Map(entries) => {
                if entries.is_empty() {
                    return write!(f, "[:]");
                }
                write!(f, "[")?;
                self.entries(f, entries, level)?;
                write!(f, "]")
            }
            ExprKind::Range {
                from,
                to,
                exclusive_from,
                exclusive_to,
            } => {
                self.expr(f, from, level)?;
                let op = match (exclusive_from, exclusive_to) {
                    (false, false) => "..",
                    (false, true) => "..<",
                    (true, false) => "<..",
                    (true, true) => "<..<",
                };
                write!(f, "{}", op)?;
                self.expr(f, to, level)
            }
            ExprKind::Closure(closure) => self.closure(f, closure, level),
            ExprKind::Cast { expr, type_name } => {
                self.expr(f, expr, level)?;
                write!(f, " as {}", type_name)
            }
            ExprKind::Tuple(items) => {
                write!(f, "(")?;
                self.comma_separated(f, items, level)?;
                write!(f, ")")
            }
        }
    }

    fn constant(&self, f: &mut fmt::Formatter<'_>, expr: &Expr, literal: &Literal) -> fmt::Result {
        if let Some(text) = self.ast.meta.verbatim_number(expr.id) {
            return write!(f, "{}", text);
        }
        match literal {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Decimal(d) if d.is_finite() && d.fract() == 0.0 => write!(f, "{:.1}", d),
            Literal::Decimal(d) => write!(f, "{}", d),
            Literal::String(s) => {
                let style = match self.ast.meta.quote_style(expr.id).unwrap_or(QuoteStyle::Single) {
                    QuoteStyle::Slashy if !slashy_representable(s) => QuoteStyle::Double,
                    style => style,
                };
                write!(f, "{0}{1}{0}", style.delimiter(), escape(s, style))
            }
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "null"),
        }
    }

    fn method_call(&self, f: &mut fmt::Formatter<'_>, call: &MethodCall, level: usize) -> fmt::Result {
        if let Some(object) = &call.object {
            self.expr(f, object, level)?;
            write!(f, "{}", access(call.safe, call.spread_safe))?;
        }
        write_name(f, &call.method)?;

        let trailing = call
            .args
            .iter()
            .rev()
            .take_while(|arg| matches!(arg.kind, ExprKind::Closure(_)) && self.ast.meta.paren_depth(arg.id) == 0)
            .count();
        let (inner, closures) = call.args.split_at(call.args.len() - trailing);

        write!(f, "(")?;
        for (i, arg) in inner.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match &arg.kind {
                ExprKind::Map(entries) if self.ast.meta.is_named_args(arg.id) => self.entries(f, entries, level)?,
                _ => self.expr(f, arg, level)?,
            }
        }
        write!(f, ")")?;
        for closure in closures {
            write!(f, " ")?;
            self.expr(f, closure, level)?;
        }
        Ok(())
    }

    fn entries(&self, f: &mut fmt::Formatter<'_>, entries: &[super::MapEntry], level: usize) -> fmt::Result {
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            self.map_key(f, &entry.key, level)?;
            write!(f, ": ")?;
            self.expr(f, &entry.value, level)?;
        }
        Ok(())
    }

    /// Bare identifier keys carry no quote style and print unquoted.
    fn map_key(&self, f: &mut fmt::Formatter<'_>, key: &Expr, level: usize) -> fmt::Result {
        match &key.kind {
            ExprKind::Constant(Literal::String(s))
                if self.ast.meta.quote_style(key.id).is_none()
                    && self.ast.meta.paren_depth(key.id) == 0
                    && is_plain_name(s) =>
            {
                write!(f, "{}", s)
            }
            _ => self.expr(f, key, level),
        }
    }

    fn closure(&self, f: &mut fmt::Formatter<'_>, closure: &Closure, level: usize) -> fmt::Result {
        write!(f, "{{")?;
        if let Some(params) = &closure.params {
            write!(f, " ")?;
            for (i, param) in params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                self.param(f, param, level)?;
            }
            if !params.is_empty() {
                write!(f, " ")?;
            }
            write!(f, "->")?;
        }
        match closure.body.as_slice() {
            [] => write!(f, " }}"),
            [single] if matches!(single.kind, StmtKind::Expr(_) | StmtKind::Return(_)) => {
                write!(f, " ")?;
                self.stmt_body(f, single, level)?;
                write!(f, " }}")
            }
            body => {
                writeln!(f)?;
                for stmt in body {
                    self.stmt(f, stmt, level + 1)?;
                    writeln!(f)?;
                }
                self.indent(f, level)?;
                write!(f, "}}")
            }
        }
    }

    fn param(&self, f: &mut fmt::Formatter<'_>, param: &Param, level: usize) -> fmt::Result {
        if let Some(type_name) = &param.type_name {
            write!(f, "{} ", type_name)?;
        }
        write!(f, "{}", param.name)?;
        if let Some(default) = &param.default {
            write!(f, " = ")?;
            self.expr(f, default, level)?;
        }
        Ok(())
    }

    fn comma_separated(&self, f: &mut fmt::Formatter<'_>, items: &[Expr], level: usize) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            self.expr(f, item, level)?;
        }
        Ok(())
    }
}

fn access(safe: bool, spread_safe: bool) -> &'static str {
    if spread_safe {
        "*."
    } else if safe {
        "?."
    } else {
        "."
    }
}
