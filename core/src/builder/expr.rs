use crate::ast::{
    BinaryOp, Closure, Expr, ExprKind, GStringPart, Literal, MapEntry, MethodCall, Param, QuoteStyle, UnaryOp,
};
use crate::cst::{
    CstAccess, CstArg, CstClosure, CstExpr, CstGString, CstLiteral, CstName, CstOp, CstParam, CstPathElement,
    CstPrimary,
};
use crate::token::{Position, Span, Token};

use super::numbers::parse_number;
use super::strings::{string_value, unescape};
use super::{AstBuilder, BuildError, BuildResult};

const TUPLE_NESTING: &str = "Nested parenthesis is not allowed in multiple assignment";

/// One piece of an interpolated string, ordered by source position.
enum Piece<'c> {
    Text(&'c str),
    Path(&'c [CstName]),
    Value(Option<&'c CstExpr>, Span),
}

impl AstBuilder {
    pub(crate) fn opt_expr(&mut self, cst: Option<&CstExpr>) -> BuildResult<Option<Expr>> {
        cst.map(|e| self.expr(e)).transpose()
    }

    pub(crate) fn expr(&mut self, cst: &CstExpr) -> BuildResult<Expr> {
        match cst {
            CstExpr::Literal { value, span } => Ok(self.literal(value, *span, false)),
            CstExpr::GString(g) => self.gstring(g),
            CstExpr::Name(name) => Ok(self.expr_node(ExprKind::Variable(name.name.clone()), name.span)),
            CstExpr::Paren { inner, .. } => {
                let expr = self.expr(inner)?;
                let depth = self.meta.paren_depth(expr.id);
                self.meta.set_paren_depth(expr.id, depth + 1);
                Ok(expr)
            }
            CstExpr::Tuple { items, span } => {
                let items = self.exprs(items)?;
                Ok(self.expr_node(ExprKind::Tuple(items), *span))
            }
            CstExpr::List { items, span } => {
                let items = self.exprs(items)?;
                Ok(self.expr_node(ExprKind::List(items), *span))
            }
            CstExpr::Map { entries, span } => {
                let mut built = Vec::with_capacity(entries.len());
                for entry in entries {
                    let key = self.map_key(&entry.key)?;
                    let value = self.expr(&entry.value)?;
                    built.push(MapEntry { key, value });
                }
                Ok(self.expr_node(ExprKind::Map(built), *span))
            }
            CstExpr::Closure(closure) => self.closure(closure),
            CstExpr::Path { primary, elements, .. } => self.path(primary, elements),
            CstExpr::Command { callee, args, span } => self.command(callee, args, *span),
            CstExpr::Unary { op, operand, span } => {
                if op.tokens.first() == Some(&Token::Sub)
                    && let CstExpr::Literal { value, .. } = operand.as_ref()
                    && matches!(value, CstLiteral::Number(_))
                {
                    return Ok(self.literal(value, *span, true));
                }
                let unary = match op.tokens.first() {
                    Some(Token::Sub) => UnaryOp::Neg,
                    Some(Token::Add) => UnaryOp::Pos,
                    Some(Token::Not) => UnaryOp::Not,
                    _ => UnaryOp::BitNot,
                };
                let operand = Box::new(self.expr(operand)?);
                Ok(self.expr_node(ExprKind::Unary { op: unary, operand }, *span))
            }
            CstExpr::Binary { op, lhs, rhs, span } => {
                let binary = binary_op(op).ok_or_else(|| BuildError::new("Unsupported binary operator", op.span))?;
                let lhs = Box::new(self.expr(lhs)?);
                let rhs = Box::new(self.expr(rhs)?);
                Ok(self.expr_node(ExprKind::Binary { op: binary, lhs, rhs }, *span))
            }
            CstExpr::Range { op, from, to, span } => {
                let (exclusive_from, exclusive_to) = match op.tokens.first() {
                    Some(Token::RangeExclusiveLeft) => (true, false),
                    Some(Token::RangeExclusiveRight) => (false, true),
                    Some(Token::RangeExclusiveBoth) => (true, true),
                    _ => (false, false),
                };
                let from = Box::new(self.expr(from)?);
                let to = Box::new(self.expr(to)?);
                Ok(self.expr_node(
                    ExprKind::Range {
                        from,
                        to,
                        exclusive_from,
                        exclusive_to,
                    },
                    *span,
                ))
            }
            CstExpr::Ternary {
                condition,
                then_expr,
                else_expr,
                span,
            } => {
                let condition = Box::new(self.expr(condition)?);
                let then_expr = Box::new(self.expr(then_expr)?);
                let else_expr = Box::new(self.expr(else_expr)?);
                Ok(self.expr_node(
                    ExprKind::Ternary {
                        condition,
                        then_expr,
                        else_expr,
                    },
                    *span,
                ))
            }
            CstExpr::Cast { expr, type_name, span } => {
                let expr = Box::new(self.expr(expr)?);
                Ok(self.expr_node(
                    ExprKind::Cast {
                        expr,
                        type_name: type_name.name.clone(),
                    },
                    *span,
                ))
            }
            CstExpr::Assignment {
                op,
                target,
                value,
                span,
            } => {
                let binary = binary_op(op).ok_or_else(|| BuildError::new("Unsupported assignment operator", op.span))?;
                let target_span = target.span();
                let mut target = self.expr(target)?;
                if let ExprKind::Tuple(items) = &target.kind
                    && let Some(nested) = items.iter().find(|item| self.meta.paren_depth(item.id) > 0)
                {
                    return Err(BuildError::new(TUPLE_NESTING, nested.span));
                }
                // `(a) = x` is a one-element multiple assignment
                if binary == BinaryOp::Assign && matches!(target.kind, ExprKind::Variable(_)) {
                    match self.meta.paren_depth(target.id) {
                        0 => {}
                        1 => {
                            self.meta.set_paren_depth(target.id, 0);
                            target = self.expr_node(ExprKind::Tuple(vec![target]), target_span);
                        }
                        _ => return Err(BuildError::new(TUPLE_NESTING, target.span)),
                    }
                }
                let value = Box::new(self.expr(value)?);
                Ok(self.expr_node(
                    ExprKind::Binary {
                        op: binary,
                        lhs: Box::new(target),
                        rhs: value,
                    },
                    *span,
                ))
            }
        }
    }

    fn exprs(&mut self, items: &[CstExpr]) -> BuildResult<Vec<Expr>> {
        items.iter().map(|item| self.expr(item)).collect()
    }

    fn literal(&mut self, value: &CstLiteral, span: Span, negative: bool) -> Expr {
        match value {
            CstLiteral::Number(raw) => {
                let literal = match parse_number(raw, negative) {
                    Ok(literal) => literal,
                    Err(message) => {
                        self.record_number_error(message, span);
                        if raw.contains('.') {
                            Literal::Decimal(0.0)
                        } else {
                            Literal::Integer(0)
                        }
                    }
                };
                let expr = self.expr_node(ExprKind::Constant(literal), span);
                let verbatim = if negative { format!("-{}", raw) } else { raw.clone() };
                self.meta.set_verbatim_number(expr.id, verbatim);
                expr
            }
            CstLiteral::Str(raw) => self.string_constant(raw, span),
            CstLiteral::True => self.expr_node(ExprKind::Constant(Literal::Bool(true)), span),
            CstLiteral::False => self.expr_node(ExprKind::Constant(Literal::Bool(false)), span),
            CstLiteral::Null => self.expr_node(ExprKind::Constant(Literal::Null), span),
        }
    }

    fn string_constant(&mut self, raw: &str, span: Span) -> Expr {
        let (value, style) = string_value(raw).unwrap_or_else(|| (raw.to_string(), QuoteStyle::Single));
        let expr = self.expr_node(ExprKind::Constant(Literal::String(value)), span);
        self.meta.set_quote_style(expr.id, style);
        expr
    }

    /// Bare identifier keys are string constants.
    fn map_key(&mut self, key: &CstExpr) -> BuildResult<Expr> {
        match key {
            CstExpr::Name(name) => Ok(self.expr_node(
                ExprKind::Constant(Literal::String(name.name.clone())),
                name.span,
            )),
            _ => self.expr(key),
        }
    }

    fn gstring(&mut self, g: &CstGString) -> BuildResult<Expr> {
        let style = QuoteStyle::from_delimiter(&g.delimiter).unwrap_or(QuoteStyle::Double);
        let mut pieces: Vec<(Span, Piece<'_>)> = Vec::new();
        pieces.extend(g.texts.iter().map(|t| (t.span, Piece::Text(&t.raw))));
        pieces.extend(g.paths.iter().map(|p| (p.span, Piece::Path(&p.names))));
        pieces.extend(g.exprs.iter().map(|e| (e.span, Piece::Value(e.expr.as_deref(), e.span))));
        pieces.sort_by_key(|(span, _)| span.start);

        let mut parts: Vec<GStringPart> = Vec::with_capacity(pieces.len());
        for (_, piece) in pieces {
            match piece {
                Piece::Text(raw) => {
                    let text = unescape(raw, style);
                    match parts.last_mut() {
                        Some(GStringPart::Text(prev)) => prev.push_str(&text),
                        _ => parts.push(GStringPart::Text(text)),
                    }
                }
                Piece::Path(names) => {
                    if let Some(value) = self.interpolated_path(names) {
                        parts.push(GStringPart::Value(value));
                    }
                }
                Piece::Value(Some(expr), _) => parts.push(GStringPart::Value(self.expr(expr)?)),
                Piece::Value(None, span) => parts.push(GStringPart::Value(
                    self.expr_node(ExprKind::Constant(Literal::Null), span),
                )),
            }
        }

        let has_values = parts.iter().any(|p| matches!(p, GStringPart::Value(_)));
        let expr = if has_values {
            self.expr_node(ExprKind::GString(parts), g.span)
        } else {
            let text = parts
                .into_iter()
                .map(|p| match p {
                    GStringPart::Text(t) => t,
                    GStringPart::Value(_) => String::new(),
                })
                .collect();
            self.expr_node(ExprKind::Constant(Literal::String(text)), g.span)
        };
        self.meta.set_quote_style(expr.id, style);
        Ok(expr)
    }

    /// `$a.b.c` as property reads on a variable.
    fn interpolated_path(&mut self, names: &[CstName]) -> Option<Expr> {
        let (first, rest) = names.split_first()?;
        let mut current = self.expr_node(ExprKind::Variable(first.name.clone()), first.span);
        for name in rest {
            let span = Span::new(first.span.start, name.span.end);
            current = self.expr_node(
                ExprKind::Property {
                    object: Box::new(current),
                    property: name.name.clone(),
                    safe: false,
                    spread_safe: false,
                },
                span,
            );
        }
        Some(current)
    }

    fn closure(&mut self, closure: &CstClosure) -> BuildResult<Expr> {
        let params = match &closure.params {
            Some(params) => Some(params.iter().map(|p| self.param(p)).collect::<BuildResult<Vec<_>>>()?),
            None => None,
        };
        let body = self.script_statements(&closure.body)?;
        Ok(self.expr_node(ExprKind::Closure(Closure { params, body }), closure.span))
    }

    fn param(&mut self, param: &CstParam) -> BuildResult<Param> {
        let default = self.opt_expr(param.default.as_ref())?;
        Ok(Param {
            id: self.next_id(),
            span: param.span,
            name: param.name.name.clone(),
            type_name: param.type_name.as_ref().map(|t| t.name.clone()),
            default,
        })
    }

    /// Fold postfix elements left to right. A property followed by arguments or a
    /// closure becomes a call on that receiver.
    fn path(&mut self, primary: &CstExpr, elements: &[CstPathElement]) -> BuildResult<Expr> {
        let start = primary.start();
        let mut current = self.expr(primary)?;
        let mut i = 0;
        while i < elements.len() {
            match &elements[i] {
                CstPathElement::Property { access, name, span } => {
                    let safe = *access != CstAccess::Dot;
                    let spread_safe = *access == CstAccess::Spread;
                    let property = member_name(name);
                    let (args, closures, end, consumed) = self.call_arguments(&elements[i + 1..])?;
                    if consumed == 0 {
                        current = self.expr_node(
                            ExprKind::Property {
                                object: Box::new(current),
                                property,
                                safe,
                                spread_safe,
                            },
                            Span::new(start, span.end),
                        );
                        i += 1;
                        continue;
                    }
                    let args = self.arguments(args, closures)?;
                    current = self.expr_node(
                        ExprKind::MethodCall(MethodCall {
                            object: Some(Box::new(current)),
                            method: property,
                            args,
                            implicit_this: false,
                            safe: safe && !spread_safe,
                            spread_safe,
                        }),
                        Span::new(start, end),
                    );
                    i += 1 + consumed;
                }
                CstPathElement::Arguments { .. } | CstPathElement::Closure(_) => {
                    let (args, closures, end, consumed) = self.call_arguments(&elements[i..])?;
                    let args = self.arguments(args, closures)?;
                    current = self.call_on(current, args, Span::new(start, end));
                    i += consumed;
                }
                CstPathElement::Index { index, safe, span } => {
                    let op = if *safe { BinaryOp::SafeIndex } else { BinaryOp::Index };
                    let index = self.expr(index)?;
                    current = self.expr_node(
                        ExprKind::Binary {
                            op,
                            lhs: Box::new(current),
                            rhs: Box::new(index),
                        },
                        Span::new(start, span.end),
                    );
                    i += 1;
                }
            }
        }
        Ok(current)
    }

    /// Leading `(args)` and trailing closures of `elements`: returns the argument list,
    /// the built closures, the end of the last consumed element and how many were consumed.
    #[allow(clippy::type_complexity)]
    fn call_arguments<'c>(
        &mut self,
        elements: &'c [CstPathElement],
    ) -> BuildResult<(&'c [CstArg], Vec<Expr>, Position, usize)> {
        let mut consumed = 0;
        let mut args: &[CstArg] = &[];
        let mut end = Position::default();
        if let Some(CstPathElement::Arguments { args: list, span }) = elements.first() {
            args = list;
            end = span.end;
            consumed = 1;
        }
        let mut closures = Vec::new();
        while let Some(CstPathElement::Closure(closure)) = elements.get(consumed) {
            closures.push(self.closure(closure)?);
            end = closure.span.end;
            consumed += 1;
        }
        Ok((args, closures, end, consumed))
    }

    /// Named arguments become one map prepended to the positional arguments; trailing
    /// closures are appended.
    fn arguments(&mut self, args: &[CstArg], closures: Vec<Expr>) -> BuildResult<Vec<Expr>> {
        let mut named = Vec::new();
        let mut named_span: Option<Span> = None;
        let mut positional = Vec::new();
        for arg in args {
            match arg {
                CstArg::Positional(expr) => positional.push(self.expr(expr)?),
                CstArg::Named { name, value, span } => {
                    let key = self.named_key(name);
                    let value = self.expr(value)?;
                    named.push(MapEntry { key, value });
                    named_span = Some(named_span.map_or(*span, |s| s.to(span)));
                }
            }
        }
        let mut out = Vec::with_capacity(positional.len() + closures.len() + 1);
        if let Some(span) = named_span {
            let map = self.expr_node(ExprKind::Map(named), span);
            self.meta.mark_named_args(map.id);
            out.push(map);
        }
        out.extend(positional);
        out.extend(closures);
        Ok(out)
    }

    fn named_key(&mut self, name: &CstPrimary) -> Expr {
        if name.quoted {
            return self.string_constant(&name.text, name.span);
        }
        self.expr_node(ExprKind::Constant(Literal::String(name.text.clone())), name.span)
    }

    /// Call with an already-built callee that is not a property access.
    fn call_on(&mut self, callee: Expr, args: Vec<Expr>, span: Span) -> Expr {
        let implicit = if self.meta.paren_depth(callee.id) > 0 {
            None
        } else {
            match &callee.kind {
                ExprKind::Variable(name) => Some(name.clone()),
                ExprKind::Constant(Literal::String(name)) => Some(name.clone()),
                _ => None,
            }
        };
        let call = match implicit {
            Some(method) => MethodCall {
                object: None,
                method,
                args,
                implicit_this: true,
                safe: false,
                spread_safe: false,
            },
            None => MethodCall {
                object: Some(Box::new(callee)),
                method: "call".to_string(),
                args,
                implicit_this: false,
                safe: false,
                spread_safe: false,
            },
        };
        self.expr_node(ExprKind::MethodCall(call), span)
    }

    /// Paren-less call `name arg, ...` or `a.b arg, ...`.
    fn command(&mut self, callee: &CstExpr, args: &[CstArg], span: Span) -> BuildResult<Expr> {
        if let CstExpr::Path { primary, elements, .. } = callee
            && let Some((CstPathElement::Property { access, name, .. }, receiver)) = elements.split_last()
        {
            let object = if receiver.is_empty() {
                self.expr(primary)?
            } else {
                self.path(primary, receiver)?
            };
            let safe = *access != CstAccess::Dot;
            let spread_safe = *access == CstAccess::Spread;
            let args = self.arguments(args, Vec::new())?;
            return Ok(self.expr_node(
                ExprKind::MethodCall(MethodCall {
                    object: Some(Box::new(object)),
                    method: member_name(name),
                    args,
                    implicit_this: false,
                    safe: safe && !spread_safe,
                    spread_safe,
                }),
                span,
            ));
        }
        let callee = self.expr(callee)?;
        let args = self.arguments(args, Vec::new())?;
        Ok(self.call_on(callee, args, span))
    }
}

/// Member names written as string literals are unquoted.
fn member_name(name: &CstName) -> String {
    match string_value(&name.name) {
        Some((value, _)) => value,
        None => name.name.clone(),
    }
}

fn binary_op(op: &CstOp) -> Option<BinaryOp> {
    let op = match op.tokens.as_slice() {
        [Token::Lt, Token::Lt] => BinaryOp::Shl,
        [Token::Gt, Token::Gt] => BinaryOp::Shr,
        [Token::Gt, Token::Gt, Token::Gt] => BinaryOp::UShr,
        [single] => match single {
            Token::Add => BinaryOp::Add,
            Token::Sub => BinaryOp::Sub,
            Token::Mul => BinaryOp::Mul,
            Token::Div => BinaryOp::Div,
            Token::Mod => BinaryOp::Mod,
            Token::Pow => BinaryOp::Pow,
            Token::Eq => BinaryOp::Eq,
            Token::Ne => BinaryOp::Ne,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            Token::Compare => BinaryOp::Compare,
            Token::And => BinaryOp::And,
            Token::Or => BinaryOp::Or,
            Token::BitAnd => BinaryOp::BitAnd,
            Token::BitOr => BinaryOp::BitOr,
            Token::BitXor => BinaryOp::BitXor,
            Token::RegexFind => BinaryOp::RegexFind,
            Token::RegexMatch => BinaryOp::RegexMatch,
            Token::In => BinaryOp::In,
            Token::NotIn => BinaryOp::NotIn,
            Token::Instanceof => BinaryOp::Instanceof,
            Token::Elvis => BinaryOp::Elvis,
            Token::Assign => BinaryOp::Assign,
            Token::AddAssign => BinaryOp::AddAssign,
            Token::SubAssign => BinaryOp::SubAssign,
            Token::MulAssign => BinaryOp::MulAssign,
            Token::DivAssign => BinaryOp::DivAssign,
            Token::ModAssign => BinaryOp::ModAssign,
            _ => return None,
        },
        _ => return None,
    };
    Some(op)
}
