use super::{CstParser, PredictionMode};
use crate::cst::{CstAccess, CstArg, CstDeclTarget, CstExpr, CstPathElement, CstScriptStmt};
use crate::token::Token;
use anyhow::Result;

impl<'a> CstParser<'a> {
    /// Statements of a closure or script block, up to (not including) the closing brace.
    pub(super) fn parse_script_statements(&mut self) -> Result<Vec<CstScriptStmt>> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.eof() || self.check(&Token::RBrace) {
                break;
            }
            let start = self.pos;
            let result = self
                .parse_script_statement()
                .and_then(|stmt| self.expect_statement_end().map(|_| stmt));
            match result {
                Ok(stmt) => statements.push(stmt),
                Err(err) if self.recovering() => {
                    self.record(&err);
                    statements.push(CstScriptStmt::Incomplete(self.recover(start)));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(statements)
    }

    pub(super) fn parse_script_statement(&mut self) -> Result<CstScriptStmt> {
        match self.peek() {
            Some(Token::If) => self.parse_if(),
            Some(Token::Return) => {
                let start = self.start_position();
                self.pos += 1;
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Ok(CstScriptStmt::Return {
                    value,
                    span: self.span_from(start),
                })
            }
            Some(Token::Assert) => {
                let start = self.start_position();
                self.pos += 1;
                let condition = self.parse_expression()?;
                let message = if self.eat(&Token::Colon) || self.eat(&Token::Comma) {
                    self.skip_newlines();
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(CstScriptStmt::Assert {
                    condition,
                    message,
                    span: self.span_from(start),
                })
            }
            Some(Token::Def) => self.parse_def(),
            Some(Token::LBrace) => {
                let start = self.start_position();
                self.pos += 1;
                let statements = self.parse_script_statements()?;
                self.expect_closing_brace()?;
                Ok(CstScriptStmt::Block {
                    statements,
                    span: self.span_from(start),
                })
            }
            Some(Token::Id(_)) if matches!(self.peek_ahead(1), Some(Token::Id(_))) => self.parse_name_pair(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_if(&mut self) -> Result<CstScriptStmt> {
        let start = self.start_position();
        self.expect_token(Token::If)?;
        self.expect_token(Token::LParen)?;
        let condition = self.parse_expression()?;
        self.expect_token(Token::RParen)?;
        self.skip_newlines();
        let then_branch = Box::new(self.parse_script_statement()?);
        let else_at = self.skip_newlines_from(0);
        let else_branch = if self.tokens.get(else_at) == Some(&Token::Else) {
            self.pos = else_at + 1;
            self.skip_newlines();
            Some(Box::new(self.parse_script_statement()?))
        } else {
            None
        };
        Ok(CstScriptStmt::If {
            condition,
            then_branch,
            else_branch,
            span: self.span_from(start),
        })
    }

    fn parse_def(&mut self) -> Result<CstScriptStmt> {
        let start = self.start_position();
        self.expect_token(Token::Def)?;
        let target = if self.check(&Token::LParen) {
            let tuple_start = self.start_position();
            self.pos += 1;
            let mut names = vec![self.expect_name()?];
            while self.eat(&Token::Comma) {
                names.push(self.expect_name()?);
            }
            self.expect_token(Token::RParen)?;
            CstDeclTarget::Tuple {
                names,
                span: self.span_from(tuple_start),
            }
        } else {
            CstDeclTarget::Single(self.expect_name()?)
        };
        let value = if self.eat(&Token::Assign) {
            self.skip_newlines();
            Some(self.parse_expression()?)
        } else if matches!(target, CstDeclTarget::Tuple { .. }) {
            return Err(self.error("Expected '=' after multiple assignment target"));
        } else {
            None
        };
        Ok(CstScriptStmt::Declaration {
            type_name: None,
            target,
            value,
            span: self.span_from(start),
        })
    }

    /// `Type name = value` versus a command expression such as `println name`.
    fn parse_name_pair(&mut self) -> Result<CstScriptStmt> {
        let declaration = match self.peek_ahead(2) {
            Some(Token::Assign) => true,
            None | Some(Token::Newline | Token::Semicolon | Token::RBrace) => match self.mode {
                PredictionMode::Fast => return Err(self.ambiguity("declaration or command expression")),
                PredictionMode::Full => match self.peek() {
                    Some(Token::Id(first)) => first.chars().next().is_some_and(char::is_uppercase),
                    _ => false,
                },
            },
            _ => false,
        };
        if !declaration {
            return self.parse_expression_statement();
        }
        let start = self.start_position();
        let type_name = self.expect_name()?;
        let name = self.expect_name()?;
        let value = if self.eat(&Token::Assign) {
            self.skip_newlines();
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(CstScriptStmt::Declaration {
            type_name: Some(type_name),
            target: CstDeclTarget::Single(name),
            value,
            span: self.span_from(start),
        })
    }

    fn parse_expression_statement(&mut self) -> Result<CstScriptStmt> {
        if let Some(len) = self.command_callee_len() {
            return Ok(CstScriptStmt::Expression(self.parse_command(len)?));
        }
        Ok(CstScriptStmt::Expression(self.parse_expression()?))
    }

    /// Token length of `name (. name)*` when followed by a command argument on the same line.
    fn command_callee_len(&self) -> Option<usize> {
        if !matches!(self.peek(), Some(Token::Id(_))) {
            return None;
        }
        let mut i = 1;
        while self.peek_ahead(i) == Some(&Token::Dot) && matches!(self.peek_ahead(i + 1), Some(Token::Id(_))) {
            i += 2;
        }
        match self.peek_ahead(i) {
            Some(
                Token::Str(_)
                | Token::GString(_)
                | Token::Number(_)
                | Token::Id(_)
                | Token::True
                | Token::False
                | Token::Null,
            ) => Some(i),
            _ => None,
        }
    }

    fn parse_command(&mut self, callee_len: usize) -> Result<CstExpr> {
        let start = self.start_position();
        let first = self.expect_name()?;
        let mut callee = CstExpr::Name(first);
        if callee_len > 1 {
            let mut elements = Vec::new();
            while self.pos < self.len && elements.len() * 2 + 1 < callee_len {
                let dot_start = self.start_position();
                self.expect_token(Token::Dot)?;
                let name = self.expect_name()?;
                elements.push(CstPathElement::Property {
                    access: CstAccess::Dot,
                    name,
                    span: self.span_from(dot_start),
                });
            }
            callee = CstExpr::Path {
                primary: Box::new(callee),
                elements,
                span: self.span_from(start),
            };
        }
        let mut args = vec![self.parse_argument()?];
        while self.eat(&Token::Comma) {
            self.skip_newlines();
            args.push(self.parse_argument()?);
        }
        Ok(CstExpr::Command {
            callee: Box::new(callee),
            args,
            span: self.span_from(start),
        })
    }

    /// `name: value` or a positional expression.
    pub(super) fn parse_argument(&mut self) -> Result<CstArg> {
        let is_named = matches!(self.peek(), Some(Token::Id(_) | Token::Str(_))) && self.peek_ahead(1) == Some(&Token::Colon);
        if !is_named {
            return Ok(CstArg::Positional(self.parse_expression()?));
        }
        let start = self.start_position();
        let name = self.expect_primary()?;
        self.expect_token(Token::Colon)?;
        self.skip_newlines();
        let value = self.parse_expression()?;
        Ok(CstArg::Named {
            name,
            value,
            span: self.span_from(start),
        })
    }
}
