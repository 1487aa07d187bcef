use super::{CstParser, PredictionMode};
use crate::cst::{CstIncomplete, CstName, CstPrimary};
use crate::token::{ParseError, Position, Span, Token};
use anyhow::{Result, anyhow};

impl<'a> CstParser<'a> {
    pub(super) fn eof(&self) -> bool {
        self.pos >= self.len
    }

    pub(super) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(super) fn peek_ahead(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    pub(super) fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    pub(super) fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(super) fn expect_token(&mut self, expected: Token) -> Result<()> {
        if self.eat(&expected) {
            return Ok(());
        }
        Err(self.error(&format!("Expected '{}'", expected)))
    }

    pub(super) fn expect_name(&mut self) -> Result<CstName> {
        match self.peek() {
            Some(Token::Id(name)) => {
                let name = CstName {
                    name: name.clone(),
                    span: self.spans[self.pos],
                };
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("Expected identifier")),
        }
    }

    /// Identifier or keyword after a member-access operator.
    pub(super) fn expect_member_name(&mut self) -> Result<CstName> {
        let name = match self.peek() {
            Some(Token::Id(name)) => name.clone(),
            Some(tok) if tok.is_keyword() => tok.to_string(),
            Some(Token::Str(raw)) => raw.clone(),
            _ => return Err(self.error("Expected property name")),
        };
        let span = self.spans[self.pos];
        self.pos += 1;
        Ok(CstName { name, span })
    }

    pub(super) fn is_primary_at(&self, offset: usize) -> bool {
        matches!(self.peek_ahead(offset), Some(Token::Id(_) | Token::Str(_)))
    }

    pub(super) fn expect_primary(&mut self) -> Result<CstPrimary> {
        let (text, quoted) = match self.peek() {
            Some(Token::Id(name)) => (name.clone(), false),
            Some(Token::Str(raw)) => (raw.clone(), true),
            _ => return Err(self.error("Expected name or string")),
        };
        let span = self.spans[self.pos];
        self.pos += 1;
        Ok(CstPrimary { text, quoted, span })
    }

    pub(super) fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    pub(super) fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(Token::Newline | Token::Semicolon)) {
            self.pos += 1;
        }
    }

    pub(super) fn at_statement_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Newline | Token::Semicolon | Token::RBrace))
    }

    pub(super) fn expect_statement_end(&mut self) -> Result<()> {
        if self.at_statement_end() {
            Ok(())
        } else {
            Err(self.error("Expected newline or ';' after statement"))
        }
    }

    /// Index of the first non-newline token at or after `self.pos + offset`.
    pub(super) fn skip_newlines_from(&self, offset: usize) -> usize {
        let mut i = self.pos + offset;
        while i < self.len && self.tokens[i] == Token::Newline {
            i += 1;
        }
        i
    }

    pub(super) fn start_position(&self) -> Position {
        self.spans
            .get(self.pos)
            .map(|s| s.start)
            .unwrap_or_else(|| self.end_of_input())
    }

    pub(super) fn prev_end(&self) -> Position {
        if self.pos == 0 {
            return self.start_position();
        }
        self.spans[self.pos - 1].end
    }

    pub(super) fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.prev_end())
    }

    fn end_of_input(&self) -> Position {
        self.spans.last().map(|s| s.end).unwrap_or_default()
    }

    pub(super) fn current_span(&self) -> Span {
        match self.spans.get(self.pos) {
            Some(span) => *span,
            None => Span::single(self.end_of_input()),
        }
    }

    /// Whether token `i` ends exactly where token `i + 1` starts.
    pub(super) fn adjacent(&self, i: usize) -> bool {
        match (self.spans.get(i), self.spans.get(i + 1)) {
            (Some(a), Some(b)) => a.end == b.start,
            _ => false,
        }
    }

    pub(super) fn err(&self, msg: &str) -> String {
        match self.peek() {
            Some(Token::Newline) => format!("{}, found end of line", msg),
            Some(tok) => format!("{}, found '{}'", msg, tok),
            None => format!("{}, found end of input", msg),
        }
    }

    pub(super) fn error(&self, msg: &str) -> anyhow::Error {
        anyhow!(ParseError::with_span(self.err(msg), self.current_span()))
    }

    /// Fast mode cannot decide this production from its lookahead.
    pub(super) fn ambiguity(&self, what: &str) -> anyhow::Error {
        anyhow!(ParseError::with_span(
            format!("ambiguous {}", what),
            self.current_span()
        ))
    }

    pub(crate) fn to_parse_error(&self, err: &anyhow::Error) -> ParseError {
        match err.downcast_ref::<ParseError>() {
            Some(parse_err) => parse_err.clone(),
            None => ParseError::with_span(err.to_string(), self.current_span()),
        }
    }

    pub(super) fn recovering(&self) -> bool {
        self.mode == PredictionMode::Full && self.speculating == 0
    }

    /// Run `f`; on failure rewind to where it started. Recovery is off while speculating.
    pub(super) fn speculate<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Option<T> {
        let saved = self.pos;
        self.speculating += 1;
        let result = f(self);
        self.speculating -= 1;
        match result {
            Ok(value) => Some(value),
            Err(_) => {
                self.pos = saved;
                None
            }
        }
    }

    pub(super) fn record(&mut self, err: &anyhow::Error) {
        let parse_err = self.to_parse_error(err);
        self.errors.push(parse_err);
    }

    /// Skip to the next statement boundary at nesting depth zero and return the skipped text.
    pub(super) fn recover(&mut self, start: usize) -> CstIncomplete {
        if self.pos <= start && !self.eof() {
            self.pos = start + 1;
        }
        let mut depth: i32 = 0;
        while let Some(tok) = self.peek() {
            match tok {
                Token::LParen | Token::LBracket | Token::SafeIndex | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket => depth = (depth - 1).max(0),
                Token::RBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                Token::Newline | Token::Semicolon if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }
        let start_pos = self.spans.get(start).map(|s| s.start).unwrap_or_else(|| self.end_of_input());
        let span = Span::new(start_pos, self.prev_end().max(start_pos));
        CstIncomplete {
            text: self.text_of(span),
            recovered: true,
            span,
        }
    }

    pub(super) fn text_of(&self, span: Span) -> String {
        let from = span.start.offset.saturating_sub(self.base_offset);
        let to = span.end.offset.saturating_sub(self.base_offset);
        self.source.chars().skip(from).take(to.saturating_sub(from)).collect()
    }
}
