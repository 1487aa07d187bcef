use super::{CstParser, PredictionMode};
use crate::cst::{
    CstAppendBlock, CstAppendStmt, CstAssignment, CstBlock, CstFile, CstInclude, CstIncomplete, CstPrimary,
    CstSelector, CstStmt,
};
use crate::token::{Position, Span, Token};
use anyhow::Result;

/// Which alternative a statement starting with a config name takes.
#[derive(Debug, PartialEq)]
enum ConfigShape {
    Assignment,
    BlockOrAppend,
    Selector,
    Incomplete,
    Script,
}

/// What the first statement of a block body looks like.
#[derive(Debug, PartialEq)]
enum BodyShape {
    Block,
    Append,
    Unknown,
}

impl<'a> CstParser<'a> {
    pub(crate) fn parse_file(&mut self, name: &str) -> Result<CstFile> {
        let start = Position::start();
        let statements = self.parse_config_statements(true)?;
        if !self.eof() {
            // a stray closing brace at the top level
            let err = self.error("Unexpected closing brace");
            if !self.recovering() {
                return Err(err);
            }
            self.record(&err);
        }
        let end = self.spans.last().map(|s| s.end).unwrap_or(start);
        Ok(CstFile {
            name: name.to_string(),
            statements,
            span: Span::new(start, end),
        })
    }

    /// Statements until end of input (top level) or the closing brace of a block.
    fn parse_config_statements(&mut self, top_level: bool) -> Result<Vec<CstStmt>> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                None => break,
                Some(Token::RBrace) => {
                    if !top_level || !self.recovering() {
                        break;
                    }
                    let start = self.pos;
                    let err = self.error("Unexpected closing brace");
                    self.record(&err);
                    statements.push(CstStmt::Incomplete(self.recover(start)));
                    continue;
                }
                Some(_) => {}
            }
            let start = self.pos;
            let result = self
                .parse_config_statement(top_level)
                .and_then(|stmt| self.expect_statement_end().map(|_| stmt));
            match result {
                Ok(stmt) => statements.push(stmt),
                Err(err) if self.recovering() => {
                    self.record(&err);
                    statements.push(CstStmt::Incomplete(self.recover(start)));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(statements)
    }

    fn parse_config_statement(&mut self, top_level: bool) -> Result<CstStmt> {
        match self.peek() {
            Some(Token::IncludeConfig) => self.parse_include(),
            Some(Token::Id(_) | Token::Str(_)) => match self.config_shape() {
                ConfigShape::Assignment => self.parse_config_assignment(),
                ConfigShape::BlockOrAppend => self.parse_block_or_append(top_level),
                ConfigShape::Selector => self.parse_selector(),
                ConfigShape::Incomplete => self.parse_incomplete(),
                ConfigShape::Script => Ok(CstStmt::Statement(self.parse_script_statement()?)),
            },
            _ => Ok(CstStmt::Statement(self.parse_script_statement()?)),
        }
    }

    /// Scan `prim (. prim)*` and classify by the token that follows.
    fn config_shape(&self) -> ConfigShape {
        let mut i = 1;
        while self.peek_ahead(i) == Some(&Token::Dot) && self.is_primary_at(i + 1) {
            i += 2;
        }
        let single = i == 1;
        match self.peek_ahead(i) {
            Some(Token::Assign) => ConfigShape::Assignment,
            Some(Token::LBrace) if single => ConfigShape::BlockOrAppend,
            Some(Token::Colon)
                if single && self.is_primary_at(i + 1) && self.peek_ahead(i + 2) == Some(&Token::LBrace) =>
            {
                ConfigShape::Selector
            }
            None | Some(Token::Newline | Token::Semicolon | Token::RBrace) => ConfigShape::Incomplete,
            Some(Token::Dot) if matches!(self.peek_ahead(i + 1), None | Some(Token::Newline | Token::Semicolon | Token::RBrace)) => {
                ConfigShape::Incomplete
            }
            _ => ConfigShape::Script,
        }
    }

    fn parse_include(&mut self) -> Result<CstStmt> {
        let start = self.start_position();
        self.expect_token(Token::IncludeConfig)?;
        let source = self.parse_expression()?;
        Ok(CstStmt::Include(CstInclude {
            source,
            span: self.span_from(start),
        }))
    }

    fn parse_config_path(&mut self) -> Result<Vec<CstPrimary>> {
        let mut path = vec![self.expect_primary()?];
        while self.check(&Token::Dot) && self.is_primary_at(1) {
            self.pos += 1;
            path.push(self.expect_primary()?);
        }
        Ok(path)
    }

    fn parse_config_assignment(&mut self) -> Result<CstStmt> {
        let start = self.start_position();
        let path = self.parse_config_path()?;
        self.expect_token(Token::Assign)?;
        self.skip_newlines();
        let value = self.parse_expression()?;
        Ok(CstStmt::Assignment(CstAssignment {
            path,
            value,
            span: self.span_from(start),
        }))
    }

    fn parse_incomplete(&mut self) -> Result<CstStmt> {
        let start = self.start_position();
        self.parse_config_path()?;
        self.eat(&Token::Dot);
        let span = self.span_from(start);
        Ok(CstStmt::Incomplete(CstIncomplete {
            text: self.text_of(span),
            recovered: false,
            span,
        }))
    }

    fn parse_selector(&mut self) -> Result<CstStmt> {
        let start = self.start_position();
        let kind = self.expect_primary()?;
        self.expect_token(Token::Colon)?;
        let target = self.expect_primary()?;
        let statements = self.parse_block_body()?;
        Ok(CstStmt::Selector(CstSelector {
            kind,
            target,
            statements,
            span: self.span_from(start),
        }))
    }

    fn parse_block_or_append(&mut self, top_level: bool) -> Result<CstStmt> {
        let shape = self.body_shape();
        match self.mode {
            PredictionMode::Fast => match shape {
                BodyShape::Block => self.parse_block(),
                BodyShape::Append if top_level => self.parse_append_block(),
                BodyShape::Append => Err(self.error("Append syntax is only allowed at the top level")),
                BodyShape::Unknown => Err(self.ambiguity("block body")),
            },
            // nested in an attempt: recovery is off and the enclosing attempt rewinds
            PredictionMode::Full if self.speculating > 0 => {
                if top_level && shape != BodyShape::Block {
                    if let Some(block) = self.speculate(|p| p.parse_block()) {
                        return Ok(block);
                    }
                    self.parse_append_block()
                } else {
                    self.parse_block()
                }
            }
            PredictionMode::Full => {
                if let Some(block) = self.speculate(|p| p.parse_block()) {
                    return Ok(block);
                }
                if top_level && let Some(append) = self.speculate(|p| p.parse_append_block()) {
                    return Ok(append);
                }
                if top_level && shape != BodyShape::Block {
                    self.parse_append_block()
                } else {
                    self.parse_block()
                }
            }
        }
    }

    /// Classify a block body from its first statement.
    fn body_shape(&self) -> BodyShape {
        let first = self.skip_newlines_from(2);
        if first >= self.len {
            return BodyShape::Block;
        }
        match &self.tokens[first] {
            Token::RBrace => BodyShape::Block,
            Token::Id(_) => match self.tokens.get(first + 1) {
                None
                | Some(
                    Token::Assign
                    | Token::Dot
                    | Token::LBrace
                    | Token::Colon
                    | Token::Newline
                    | Token::Semicolon
                    | Token::RBrace,
                ) => BodyShape::Block,
                Some(
                    Token::Str(_)
                    | Token::GString(_)
                    | Token::Number(_)
                    | Token::Id(_)
                    | Token::True
                    | Token::False
                    | Token::Null
                    | Token::LBracket,
                ) => BodyShape::Append,
                Some(_) => BodyShape::Unknown,
            },
            _ => BodyShape::Block,
        }
    }

    fn parse_block(&mut self) -> Result<CstStmt> {
        let start = self.start_position();
        let name = self.expect_primary()?;
        let statements = self.parse_block_body()?;
        Ok(CstStmt::Block(CstBlock {
            name,
            statements,
            span: self.span_from(start),
        }))
    }

    fn parse_block_body(&mut self) -> Result<Vec<CstStmt>> {
        self.expect_token(Token::LBrace)?;
        let statements = self.parse_config_statements(false)?;
        self.expect_closing_brace()?;
        Ok(statements)
    }

    /// A missing `}` at end of input is recorded rather than fatal when recovering.
    pub(super) fn expect_closing_brace(&mut self) -> Result<()> {
        if self.eat(&Token::RBrace) {
            return Ok(());
        }
        let err = self.error("Expected '}'");
        if self.recovering() && self.eof() {
            self.record(&err);
            return Ok(());
        }
        Err(err)
    }

    fn parse_append_block(&mut self) -> Result<CstStmt> {
        let start = self.start_position();
        let name = self.expect_primary()?;
        if name.quoted {
            return Err(self.error("Expected identifier before append block"));
        }
        self.expect_token(Token::LBrace)?;
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.eof() || self.check(&Token::RBrace) {
                break;
            }
            let stmt_start = self.pos;
            let result = self
                .parse_append_statement()
                .and_then(|stmt| self.expect_statement_end().map(|_| stmt));
            match result {
                Ok(stmt) => statements.push(stmt),
                Err(err) if self.recovering() => {
                    self.record(&err);
                    self.recover(stmt_start);
                }
                Err(err) => return Err(err),
            }
        }
        self.expect_closing_brace()?;
        Ok(CstStmt::AppendBlock(CstAppendBlock {
            name,
            statements,
            span: self.span_from(start),
        }))
    }

    fn parse_append_statement(&mut self) -> Result<CstAppendStmt> {
        let start = self.start_position();
        if !matches!(self.peek(), Some(Token::Id(_))) {
            return Err(self.error("Expected identifier"));
        }
        let target = self.expect_primary()?;
        let value = self.parse_expression()?;
        Ok(CstAppendStmt {
            target,
            value,
            span: self.span_from(start),
        })
    }
}
