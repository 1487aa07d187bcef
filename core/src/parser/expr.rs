use super::{CstParser, LexicalError, PredictionMode};
use crate::cst::{
    CstAccess, CstClosure, CstExpr, CstGString, CstGStringExpr, CstGStringPath, CstGStringText, CstLiteral,
    CstMapEntry, CstName, CstOp, CstParam, CstPathElement,
};
use crate::token::{GStringPart, GStringToken, Position, Span, Token, Tokenizer};
use anyhow::{Result, anyhow};

const PREC_OR: u8 = 1;
const PREC_AND: u8 = 2;
const PREC_BIT_OR: u8 = 3;
const PREC_BIT_XOR: u8 = 4;
const PREC_BIT_AND: u8 = 5;
const PREC_EQUALITY: u8 = 6;
const PREC_RELATIONAL: u8 = 7;
const PREC_SHIFT: u8 = 8;
const PREC_ADDITIVE: u8 = 9;
const PREC_MULTIPLICATIVE: u8 = 10;

impl<'a> CstParser<'a> {
    pub(super) fn parse_expression(&mut self) -> Result<CstExpr> {
        let start = self.start_position();
        let target = self.parse_ternary()?;
        if matches!(
            self.peek(),
            Some(
                Token::Assign
                    | Token::AddAssign
                    | Token::SubAssign
                    | Token::MulAssign
                    | Token::DivAssign
                    | Token::ModAssign
            )
        ) {
            let op = self.take_op(1);
            self.skip_newlines();
            let value = self.parse_expression()?;
            return Ok(CstExpr::Assignment {
                op,
                target: Box::new(target),
                value: Box::new(value),
                span: self.span_from(start),
            });
        }
        Ok(target)
    }

    /// Step over a line break when the next line continues with one of `tokens`.
    fn continue_line_with(&mut self, tokens: &[Token]) {
        if self.check(&Token::Newline) {
            let next = self.skip_newlines_from(0);
            if self.tokens.get(next).is_some_and(|t| tokens.contains(t)) {
                self.pos = next;
            }
        }
    }

    fn parse_ternary(&mut self) -> Result<CstExpr> {
        let start = self.start_position();
        let condition = self.parse_binary(PREC_OR)?;
        self.continue_line_with(&[Token::Question, Token::Elvis]);
        match self.peek() {
            Some(Token::Question) => {
                self.pos += 1;
                self.skip_newlines();
                let then_expr = self.parse_ternary()?;
                self.continue_line_with(&[Token::Colon]);
                self.expect_token(Token::Colon)?;
                self.skip_newlines();
                let else_expr = self.parse_ternary()?;
                Ok(CstExpr::Ternary {
                    condition: Box::new(condition),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                    span: self.span_from(start),
                })
            }
            Some(Token::Elvis) => {
                let op = self.take_op(1);
                self.skip_newlines();
                let rhs = self.parse_ternary()?;
                Ok(CstExpr::Binary {
                    op,
                    lhs: Box::new(condition),
                    rhs: Box::new(rhs),
                    span: self.span_from(start),
                })
            }
            _ => Ok(condition),
        }
    }

    /// Precedence and token count of the binary operator at the cursor.
    fn binary_op_at(&self) -> Option<(u8, usize)> {
        let op = match self.peek()? {
            Token::Or => (PREC_OR, 1),
            Token::And => (PREC_AND, 1),
            Token::BitOr => (PREC_BIT_OR, 1),
            Token::BitXor => (PREC_BIT_XOR, 1),
            Token::BitAnd => (PREC_BIT_AND, 1),
            Token::Eq | Token::Ne | Token::Compare | Token::RegexFind | Token::RegexMatch => (PREC_EQUALITY, 1),
            Token::Lt => {
                if self.peek_ahead(1) == Some(&Token::Lt) && self.adjacent(self.pos) {
                    (PREC_SHIFT, 2)
                } else {
                    (PREC_RELATIONAL, 1)
                }
            }
            Token::Gt => {
                if self.peek_ahead(1) == Some(&Token::Gt) && self.adjacent(self.pos) {
                    if self.peek_ahead(2) == Some(&Token::Gt) && self.adjacent(self.pos + 1) {
                        (PREC_SHIFT, 3)
                    } else {
                        (PREC_SHIFT, 2)
                    }
                } else {
                    (PREC_RELATIONAL, 1)
                }
            }
            Token::Le | Token::Ge | Token::In | Token::NotIn | Token::Instanceof | Token::As => (PREC_RELATIONAL, 1),
            Token::Range | Token::RangeExclusiveLeft | Token::RangeExclusiveRight | Token::RangeExclusiveBoth => {
                (PREC_SHIFT, 1)
            }
            Token::Add | Token::Sub => (PREC_ADDITIVE, 1),
            Token::Mul | Token::Div | Token::Mod => (PREC_MULTIPLICATIVE, 1),
            _ => return None,
        };
        Some(op)
    }

    fn take_op(&mut self, width: usize) -> CstOp {
        let tokens = self.tokens[self.pos..self.pos + width].to_vec();
        let span = self.spans[self.pos].to(&self.spans[self.pos + width - 1]);
        self.pos += width;
        CstOp { tokens, span }
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<CstExpr> {
        let start = self.start_position();
        let mut lhs = self.parse_unary()?;
        while let Some((prec, width)) = self.binary_op_at() {
            if prec < min_prec {
                break;
            }
            let op = self.take_op(width);
            let head = op.tokens[0].clone();
            lhs = match head {
                Token::As => {
                    let type_name = self.parse_type_name()?;
                    CstExpr::Cast {
                        expr: Box::new(lhs),
                        type_name,
                        span: self.span_from(start),
                    }
                }
                Token::Instanceof => {
                    let type_name = self.parse_type_name()?;
                    CstExpr::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(CstExpr::Name(type_name)),
                        span: self.span_from(start),
                    }
                }
                Token::Range | Token::RangeExclusiveLeft | Token::RangeExclusiveRight | Token::RangeExclusiveBoth => {
                    self.skip_newlines();
                    let to = self.parse_binary(prec + 1)?;
                    CstExpr::Range {
                        op,
                        from: Box::new(lhs),
                        to: Box::new(to),
                        span: self.span_from(start),
                    }
                }
                _ => {
                    self.skip_newlines();
                    let rhs = self.parse_binary(prec + 1)?;
                    CstExpr::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                        span: self.span_from(start),
                    }
                }
            };
        }
        Ok(lhs)
    }

    /// Dotted type name such as `nextflow.util.MemoryUnit`.
    fn parse_type_name(&mut self) -> Result<CstName> {
        let first = self.expect_name()?;
        let mut name = first.name;
        let start = first.span.start;
        while self.check(&Token::Dot) && matches!(self.peek_ahead(1), Some(Token::Id(_))) {
            self.pos += 1;
            let part = self.expect_name()?;
            name.push('.');
            name.push_str(&part.name);
        }
        Ok(CstName {
            name,
            span: self.span_from(start),
        })
    }

    fn parse_unary(&mut self) -> Result<CstExpr> {
        match self.peek() {
            Some(Token::Sub | Token::Add | Token::Not | Token::BitNot) => {
                let start = self.start_position();
                let op = self.take_op(1);
                let operand = self.parse_unary()?;
                Ok(CstExpr::Unary {
                    op,
                    operand: Box::new(operand),
                    span: self.span_from(start),
                })
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<CstExpr> {
        let start = self.start_position();
        let base = self.parse_postfix()?;
        if self.check(&Token::Pow) {
            let op = self.take_op(1);
            self.skip_newlines();
            let exponent = self.parse_unary()?;
            return Ok(CstExpr::Binary {
                op,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
                span: self.span_from(start),
            });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<CstExpr> {
        let start = self.start_position();
        let primary = self.parse_primary()?;
        let mut elements = Vec::new();
        loop {
            self.continue_line_with(&[Token::Dot, Token::SafeDot, Token::SpreadDot]);
            let element_start = self.start_position();
            match self.peek() {
                Some(Token::Dot | Token::SafeDot | Token::SpreadDot) => {
                    let access = match self.peek() {
                        Some(Token::SafeDot) => CstAccess::Safe,
                        Some(Token::SpreadDot) => CstAccess::Spread,
                        _ => CstAccess::Dot,
                    };
                    self.pos += 1;
                    self.skip_newlines();
                    let name = self.expect_member_name()?;
                    elements.push(CstPathElement::Property {
                        access,
                        name,
                        span: self.span_from(element_start),
                    });
                }
                Some(Token::LParen) => {
                    self.pos += 1;
                    let mut args = Vec::new();
                    if !self.check(&Token::RParen) {
                        args.push(self.parse_argument()?);
                        while self.eat(&Token::Comma) {
                            if self.check(&Token::RParen) {
                                break;
                            }
                            args.push(self.parse_argument()?);
                        }
                    }
                    self.expect_token(Token::RParen)?;
                    elements.push(CstPathElement::Arguments {
                        args,
                        span: self.span_from(element_start),
                    });
                }
                Some(Token::LBrace) => {
                    let closure = self.parse_closure()?;
                    elements.push(CstPathElement::Closure(closure));
                }
                Some(Token::LBracket | Token::SafeIndex) => {
                    let safe = self.check(&Token::SafeIndex);
                    self.pos += 1;
                    let index = self.parse_expression()?;
                    self.expect_token(Token::RBracket)?;
                    elements.push(CstPathElement::Index {
                        index,
                        safe,
                        span: self.span_from(element_start),
                    });
                }
                _ => break,
            }
        }
        if elements.is_empty() {
            return Ok(primary);
        }
        Ok(CstExpr::Path {
            primary: Box::new(primary),
            elements,
            span: self.span_from(start),
        })
    }

    fn parse_primary(&mut self) -> Result<CstExpr> {
        let Some(tok) = self.peek() else {
            return Err(self.error("Expected expression"));
        };
        let span = self.current_span();
        let literal = match tok {
            Token::Number(raw) => Some(CstLiteral::Number(raw.clone())),
            Token::Str(raw) => Some(CstLiteral::Str(raw.clone())),
            Token::True => Some(CstLiteral::True),
            Token::False => Some(CstLiteral::False),
            Token::Null => Some(CstLiteral::Null),
            _ => None,
        };
        if let Some(value) = literal {
            self.pos += 1;
            return Ok(CstExpr::Literal { value, span });
        }
        match tok {
            Token::GString(g) => {
                let g = g.clone();
                self.pos += 1;
                self.parse_gstring(&g, span)
            }
            Token::Id(_) => Ok(CstExpr::Name(self.expect_name()?)),
            Token::LParen => self.parse_paren(),
            Token::LBracket => self.parse_collection(),
            Token::LBrace => Ok(CstExpr::Closure(self.parse_closure()?)),
            _ => Err(self.error("Expected expression")),
        }
    }

    fn parse_paren(&mut self) -> Result<CstExpr> {
        let start = self.start_position();
        self.expect_token(Token::LParen)?;
        let first = self.parse_expression()?;
        if self.check(&Token::Comma) {
            let mut items = vec![first];
            while self.eat(&Token::Comma) {
                items.push(self.parse_expression()?);
            }
            self.expect_token(Token::RParen)?;
            return Ok(CstExpr::Tuple {
                items,
                span: self.span_from(start),
            });
        }
        self.expect_token(Token::RParen)?;
        Ok(CstExpr::Paren {
            inner: Box::new(first),
            span: self.span_from(start),
        })
    }

    fn parse_collection(&mut self) -> Result<CstExpr> {
        let start = self.start_position();
        self.expect_token(Token::LBracket)?;
        if self.eat(&Token::Colon) {
            self.expect_token(Token::RBracket)?;
            return Ok(CstExpr::Map {
                entries: Vec::new(),
                span: self.span_from(start),
            });
        }
        if self.is_map_literal()? {
            let mut entries = Vec::new();
            loop {
                let entry_start = self.start_position();
                let key = self.parse_map_key()?;
                self.expect_token(Token::Colon)?;
                let value = self.parse_expression()?;
                entries.push(CstMapEntry {
                    key,
                    value,
                    span: self.span_from(entry_start),
                });
                if !self.eat(&Token::Comma) || self.check(&Token::RBracket) {
                    break;
                }
            }
            self.expect_token(Token::RBracket)?;
            return Ok(CstExpr::Map {
                entries,
                span: self.span_from(start),
            });
        }
        let mut items = Vec::new();
        while !self.check(&Token::RBracket) {
            items.push(self.parse_expression()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect_token(Token::RBracket)?;
        Ok(CstExpr::List {
            items,
            span: self.span_from(start),
        })
    }

    /// Decide between `[k: v]` and `[a, b]` with the cursor after `[`.
    fn is_map_literal(&mut self) -> Result<bool> {
        match self.mode {
            PredictionMode::Fast => match (self.peek(), self.peek_ahead(1)) {
                (Some(Token::LParen), _) => Err(self.ambiguity("map or list literal")),
                (Some(tok), Some(Token::Colon)) => Ok(matches!(
                    tok,
                    Token::Id(_)
                        | Token::Str(_)
                        | Token::GString(_)
                        | Token::Number(_)
                        | Token::True
                        | Token::False
                        | Token::Null
                ) || tok.is_keyword()),
                _ => Ok(false),
            },
            PredictionMode::Full => {
                let saved = self.pos;
                let is_map = self
                    .speculate(|p| {
                        p.parse_map_key()?;
                        p.expect_token(Token::Colon)
                    })
                    .is_some();
                self.pos = saved;
                Ok(is_map)
            }
        }
    }

    fn parse_map_key(&mut self) -> Result<CstExpr> {
        match self.peek() {
            Some(Token::Id(_)) => Ok(CstExpr::Name(self.expect_name()?)),
            Some(tok) if tok.is_keyword() && !matches!(tok, Token::True | Token::False | Token::Null) => {
                Ok(CstExpr::Name(self.expect_member_name()?))
            }
            Some(Token::LParen) => self.parse_paren(),
            _ => self.parse_primary(),
        }
    }

    pub(super) fn parse_closure(&mut self) -> Result<CstClosure> {
        let start = self.start_position();
        self.expect_token(Token::LBrace)?;
        self.skip_newlines();
        let params = self.parse_closure_params()?;
        let body = self.parse_script_statements()?;
        self.expect_closing_brace()?;
        Ok(CstClosure {
            params,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_closure_params(&mut self) -> Result<Option<Vec<CstParam>>> {
        if self.eat(&Token::Arrow) {
            return Ok(Some(Vec::new()));
        }
        match self.mode {
            PredictionMode::Fast => {
                if !self.closure_params_ahead()? {
                    return Ok(None);
                }
                let params = self.parse_param_list()?;
                self.expect_token(Token::Arrow)?;
                Ok(Some(params))
            }
            PredictionMode::Full => Ok(self.speculate(|p| {
                let params = p.parse_param_list()?;
                p.expect_token(Token::Arrow)?;
                Ok(params)
            })),
        }
    }

    /// Lookahead for `a, String b ->`; defaults make the parameter list ambiguous.
    fn closure_params_ahead(&self) -> Result<bool> {
        let mut i = 0;
        loop {
            if !matches!(self.peek_ahead(i), Some(Token::Id(_))) {
                return Ok(false);
            }
            i += 1;
            if matches!(self.peek_ahead(i), Some(Token::Id(_))) {
                i += 1;
            }
            match self.peek_ahead(i) {
                Some(Token::Comma) => i += 1,
                Some(Token::Arrow) => return Ok(true),
                Some(Token::Assign) => return Err(self.ambiguity("closure parameters")),
                _ => return Ok(false),
            }
        }
    }

    fn parse_param_list(&mut self) -> Result<Vec<CstParam>> {
        let mut params = vec![self.parse_param()?];
        while self.eat(&Token::Comma) {
            self.skip_newlines();
            params.push(self.parse_param()?);
        }
        self.skip_newlines();
        Ok(params)
    }

    fn parse_param(&mut self) -> Result<CstParam> {
        let start = self.start_position();
        let first = self.expect_name()?;
        let (type_name, name) = if matches!(self.peek(), Some(Token::Id(_))) {
            (Some(first), self.expect_name()?)
        } else {
            (None, first)
        };
        let default = if self.eat(&Token::Assign) {
            Some(self.parse_ternary()?)
        } else {
            None
        };
        Ok(CstParam {
            type_name,
            name,
            default,
            span: self.span_from(start),
        })
    }

    fn parse_gstring(&mut self, g: &GStringToken, span: Span) -> Result<CstExpr> {
        let mut texts = Vec::new();
        let mut paths = Vec::new();
        let mut exprs = Vec::new();
        for part in &g.parts {
            match part {
                GStringPart::Text { raw, span } => texts.push(CstGStringText {
                    raw: raw.clone(),
                    span: *span,
                }),
                GStringPart::Path { raw, span } => paths.push(CstGStringPath {
                    names: split_path(raw, span.start),
                    span: *span,
                }),
                GStringPart::Expr { source, origin, span } => {
                    let expr = self.parse_embedded(source, *origin)?;
                    exprs.push(CstGStringExpr {
                        expr: expr.map(Box::new),
                        span: *span,
                    });
                }
            }
        }
        Ok(CstExpr::GString(CstGString {
            delimiter: g.delimiter.clone(),
            texts,
            paths,
            exprs,
            span,
        }))
    }

    fn parse_embedded(&mut self, source: &str, origin: Position) -> Result<Option<CstExpr>> {
        if source.trim().is_empty() {
            return Ok(None);
        }
        let (tokens, spans) = Tokenizer::tokenize_at(source, origin).map_err(|e| anyhow!(LexicalError(e)))?;
        let mut sub = CstParser::embedded(&tokens, &spans, source, origin.offset, self.mode);
        sub.speculating = self.speculating;
        sub.skip_separators();
        let expr = sub.parse_expression()?;
        sub.skip_separators();
        if !sub.eof() {
            return Err(sub.error("Unexpected token in interpolation"));
        }
        self.errors.append(&mut sub.errors);
        Ok(Some(expr))
    }
}

/// Split `a.b.c` from a `$a.b.c` interpolation into names; `start` is the `$`.
fn split_path(raw: &str, start: Position) -> Vec<CstName> {
    let mut names = Vec::new();
    let mut column = start.column + 1;
    let mut offset = start.offset + 1;
    for part in raw.split('.') {
        let len = part.chars().count();
        let begin = Position::new(start.line, column, offset);
        let end = Position::new(start.line, column + len as u32, offset + len);
        names.push(CstName {
            name: part.to_string(),
            span: Span::new(begin, end),
        });
        column += len as u32 + 1;
        offset += len + 1;
    }
    names
}
