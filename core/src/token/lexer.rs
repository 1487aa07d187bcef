use std::fmt;

use crate::token::{ParseError, Position, Span};
use anyhow::{Result, anyhow};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,             // (
    RParen,             // )
    LBrace,             // {
    RBrace,             // }
    LBracket,           // [
    RBracket,           // ]
    SafeIndex,          // ?[
    Dot,                // .
    SafeDot,            // ?.
    SpreadDot,          // *.
    Colon,              // :
    Comma,              // ,
    Semicolon,          // ;
    Newline,            // significant line break
    Assign,             // =
    AddAssign,          // +=
    SubAssign,          // -=
    MulAssign,          // *=
    DivAssign,          // /=
    ModAssign,          // %=
    Eq,                 // ==
    Ne,                 // !=
    Gt,                 // >
    Lt,                 // <
    Ge,                 // >=
    Le,                 // <=
    Compare,            // <=>
    RegexFind,          // =~
    RegexMatch,         // ==~
    And,                // &&
    Or,                 // ||
    Not,                // !
    BitAnd,             // &
    BitOr,              // |
    BitXor,             // ^
    BitNot,             // ~
    Add,                // +
    Sub,                // -
    Mul,                // *
    Div,                // /
    Mod,                // %
    Pow,                // **
    Question,           // ?
    Elvis,              // ?:
    Arrow,              // ->
    Range,              // ..
    RangeExclusiveRight, // ..<
    RangeExclusiveLeft, // <..
    RangeExclusiveBoth, // <..<
    // Keywords
    IncludeConfig,
    If,
    Else,
    Return,
    Assert,
    Def,
    In,
    NotIn, // !in
    Instanceof,
    As,
    True,
    False,
    Null,
    /// Non-interpolated string, raw text including its delimiters.
    Str(String),
    GString(GStringToken),
    /// Raw numeric text; interpreted by the AST builder.
    Number(String),
    Id(String),
}

/// Interpolated string split into raw parts, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct GStringToken {
    /// `"`, `"""` or `/`
    pub delimiter: String,
    pub parts: Vec<GStringPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GStringPart {
    /// Literal text with escapes left untouched.
    Text { raw: String, span: Span },
    /// `$name.prop` form; `raw` excludes the `$`.
    Path { raw: String, span: Span },
    /// `${ expr }` form; `origin` is where `source` starts in the document.
    Expr { source: String, origin: Position, span: Span },
}

impl Token {
    pub fn is_keyword(&self) -> bool {
        self.keyword_text().is_some()
    }

    pub fn keyword_text(&self) -> Option<&'static str> {
        Some(match self {
            Token::IncludeConfig => "includeConfig",
            Token::If => "if",
            Token::Else => "else",
            Token::Return => "return",
            Token::Assert => "assert",
            Token::Def => "def",
            Token::In => "in",
            Token::Instanceof => "instanceof",
            Token::As => "as",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            _ => return None,
        })
    }

    fn from_keyword(word: &str) -> Option<Token> {
        Some(match word {
            "includeConfig" => Token::IncludeConfig,
            "if" => Token::If,
            "else" => Token::Else,
            "return" => Token::Return,
            "assert" => Token::Assert,
            "def" => Token::Def,
            "in" => Token::In,
            "instanceof" => Token::Instanceof,
            "as" => Token::As,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => return None,
        })
    }

    /// Whether a token of this kind can end an operand; decides if `/` divides or opens a slashy string.
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Id(_)
                | Token::Number(_)
                | Token::Str(_)
                | Token::GString(_)
                | Token::RParen
                | Token::RBracket
                | Token::RBrace
                | Token::True
                | Token::False
                | Token::Null
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(kw) = self.keyword_text() {
            return write!(f, "{}", kw);
        }
        let text = match self {
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::SafeIndex => "?[",
            Token::Dot => ".",
            Token::SafeDot => "?.",
            Token::SpreadDot => "*.",
            Token::Colon => ":",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Newline => "newline",
            Token::Assign => "=",
            Token::AddAssign => "+=",
            Token::SubAssign => "-=",
            Token::MulAssign => "*=",
            Token::DivAssign => "/=",
            Token::ModAssign => "%=",
            Token::Eq => "==",
            Token::Ne => "!=",
            Token::Gt => ">",
            Token::Lt => "<",
            Token::Ge => ">=",
            Token::Le => "<=",
            Token::Compare => "<=>",
            Token::RegexFind => "=~",
            Token::RegexMatch => "==~",
            Token::And => "&&",
            Token::Or => "||",
            Token::Not => "!",
            Token::BitAnd => "&",
            Token::BitOr => "|",
            Token::BitXor => "^",
            Token::BitNot => "~",
            Token::Add => "+",
            Token::Sub => "-",
            Token::Mul => "*",
            Token::Div => "/",
            Token::Mod => "%",
            Token::Pow => "**",
            Token::Question => "?",
            Token::Elvis => "?:",
            Token::Arrow => "->",
            Token::Range => "..",
            Token::RangeExclusiveRight => "..<",
            Token::RangeExclusiveLeft => "<..",
            Token::RangeExclusiveBoth => "<..<",
            Token::NotIn => "!in",
            Token::Str(raw) => return write!(f, "{}", raw),
            Token::GString(_) => "interpolated string",
            Token::Number(raw) => return write!(f, "{}", raw),
            Token::Id(name) => return write!(f, "{}", name),
            _ => "keyword",
        };
        write!(f, "{}", text)
    }
}

#[inline]
fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

#[inline]
fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Nesting {
    Paren,
    Bracket,
    Brace,
}

/// [chars] and [idx] can be used for syntax error reporting.
pub struct Tokenizer {
    chars: Vec<char>,
    idx: usize,
    len: usize,
    pub tokens: Vec<Token>,
    pub token_spans: Vec<Span>,
    line: u32,
    column: u32,
    /// Offset of `chars[0]` within the enclosing document.
    base_offset: usize,
    nesting: Vec<Nesting>,
    comments: usize,
}

impl Tokenizer {
    /// Tokenize a whole document; tokens and spans are aligned by index.
    pub fn tokenize(s: &str) -> std::result::Result<(Vec<Token>, Vec<Span>), ParseError> {
        Self::tokenize_at(s, Position::start())
    }

    /// Tokenize a fragment that starts at `origin` in its document (embedded `${...}` sources).
    pub fn tokenize_at(s: &str, origin: Position) -> std::result::Result<(Vec<Token>, Vec<Span>), ParseError> {
        let mut t = Tokenizer::new(s, origin);
        match t.parse() {
            Ok(()) => Ok((t.tokens, t.token_spans)),
            Err(err) => Err(t.enhanced_error(&format!("{}", err))),
        }
    }

    fn new(input: &str, origin: Position) -> Self {
        let chars: Vec<char> = input.chars().collect();
        Self {
            len: chars.len(),
            chars,
            idx: 0,
            tokens: Vec::with_capacity(input.len() / 4),
            token_spans: Vec::with_capacity(input.len() / 4),
            line: origin.line,
            column: origin.column,
            base_offset: origin.offset,
            nesting: Vec::new(),
            comments: 0,
        }
    }

    /// Whether `s` holds any comment or shebang line; `None` when it does not tokenize.
    pub fn has_comments(s: &str) -> Option<bool> {
        let mut t = Tokenizer::new(s, Position::start());
        t.parse().ok()?;
        Some(t.comments > 0)
    }

    /// Get enhanced error message with position information for LSP
    pub fn enhanced_error(&self, msg: &str) -> ParseError {
        ParseError::with_position(msg.to_string(), self.current_position())
    }

    pub fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.base_offset + self.idx)
    }

    fn eof(&self) -> bool {
        self.idx >= self.len
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.idx + ahead).copied()
    }

    fn looking_at(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn expect(&mut self, s: &str) -> bool {
        if !self.looking_at(s) {
            return false;
        }
        for _ in s.chars() {
            self.advance_char();
        }
        true
    }

    fn err<T: AsRef<str>>(&self, msg: T) -> String {
        let l_idx = self.idx.saturating_sub(5);
        let r_idx = (self.idx + 5).min(self.len);
        let chars: String = self.chars[l_idx..r_idx].iter().collect();
        let ctx = match self.chars.get(self.idx) {
            Some(&c) => format!("'{}' near '{}'", c.escape_debug(), chars),
            None => format!("at end, near '{}'", chars),
        };
        format!("{} ({})", msg.as_ref(), ctx)
    }

    fn advance_char(&mut self) {
        if !self.eof() && self.chars[self.idx] == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.idx += 1;
    }

    fn newline_significant(&self) -> bool {
        !matches!(self.nesting.last(), Some(Nesting::Paren | Nesting::Bracket))
    }

    fn skip_line_comment(&mut self) {
        self.comments += 1;
        while !self.eof() && self.chars[self.idx] != '\n' {
            self.advance_char();
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        self.comments += 1;
        while !self.eof() {
            if self.expect("*/") {
                return Ok(());
            }
            self.advance_char();
        }
        Err(anyhow!(self.err("Block comment not closed")))
    }

    fn push_newline(&mut self) {
        let start = self.current_position();
        self.advance_char();
        if !self.newline_significant() {
            return;
        }
        if matches!(self.tokens.last(), None | Some(Token::Newline)) {
            return;
        }
        let end = self.current_position();
        self.push_with_span(Token::Newline, start, end);
    }

    /// Single-quoted forms never interpolate.
    fn parse_single_quoted(&mut self) -> Result<()> {
        let start = self.current_position();
        let begin = self.idx;
        let triple = self.looking_at("'''");
        let delim = if triple { "'''" } else { "'" };
        self.expect(delim);
        loop {
            if self.eof() {
                return Err(anyhow!(self.err("String not closed")));
            }
            let c = self.chars[self.idx];
            if c == '\\' {
                self.advance_char();
                if !self.eof() {
                    self.advance_char();
                }
                continue;
            }
            if c == '\n' && !triple {
                return Err(anyhow!(self.err("String not closed before end of line")));
            }
            if self.expect(delim) {
                break;
            }
            self.advance_char();
        }
        let raw: String = self.chars[begin..self.idx].iter().collect();
        let end = self.current_position();
        self.push_with_span(Token::Str(raw), start, end);
        Ok(())
    }

    /// Double-quoted, triple-double-quoted and slashy strings; these may interpolate.
    fn parse_interpolating(&mut self, delim: &str) -> Result<()> {
        let start = self.current_position();
        let begin = self.idx;
        let multiline = delim != "\"";
        self.expect(delim);

        let mut parts = Vec::new();
        let mut text = String::new();
        let mut text_start = self.current_position();

        loop {
            if self.eof() {
                return Err(anyhow!(self.err("String not closed")));
            }
            let c = self.chars[self.idx];
            if c == '\\' {
                text.push(c);
                self.advance_char();
                if let Some(next) = self.peek_at(0) {
                    text.push(next);
                    self.advance_char();
                }
                continue;
            }
            if c == '\n' && !multiline {
                return Err(anyhow!(self.err("String not closed before end of line")));
            }
            if self.looking_at(delim) {
                break;
            }
            if c == '$' {
                let dollar = self.current_position();
                match self.peek_at(1) {
                    Some('{') => {
                        Self::flush_text(&mut parts, &mut text, text_start, dollar);
                        self.parse_embedded_expr(&mut parts)?;
                        text_start = self.current_position();
                        continue;
                    }
                    Some(n) if is_ident_start(n) && n != '$' => {
                        Self::flush_text(&mut parts, &mut text, text_start, dollar);
                        self.parse_embedded_path(&mut parts);
                        text_start = self.current_position();
                        continue;
                    }
                    _ => {}
                }
            }
            text.push(c);
            self.advance_char();
        }

        let text_end = self.current_position();
        self.expect(delim);
        let end = self.current_position();

        if parts.is_empty() {
            let raw: String = self.chars[begin..self.idx].iter().collect();
            self.push_with_span(Token::Str(raw), start, end);
            return Ok(());
        }
        Self::flush_text(&mut parts, &mut text, text_start, text_end);
        let token = Token::GString(GStringToken {
            delimiter: delim.to_string(),
            parts,
        });
        self.push_with_span(token, start, end);
        Ok(())
    }

    fn flush_text(parts: &mut Vec<GStringPart>, text: &mut String, start: Position, end: Position) {
        if text.is_empty() {
            return;
        }
        parts.push(GStringPart::Text {
            raw: std::mem::take(text),
            span: Span::new(start, end),
        });
    }

    fn parse_embedded_expr(&mut self, parts: &mut Vec<GStringPart>) -> Result<()> {
        let start = self.current_position();
        self.advance_char(); // $
        self.advance_char(); // {
        let origin = self.current_position();
        let begin = self.idx;
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        while !self.eof() {
            let c = self.chars[self.idx];
            match quote {
                Some(q) => {
                    if c == '\\' {
                        self.advance_char();
                    } else if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    '\'' | '"' => quote = Some(c),
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            let source: String = self.chars[begin..self.idx].iter().collect();
                            self.advance_char();
                            let span = Span::new(start, self.current_position());
                            parts.push(GStringPart::Expr { source, origin, span });
                            return Ok(());
                        }
                    }
                    _ => {}
                },
            }
            self.advance_char();
        }
        Err(anyhow!(self.err("Interpolation not closed")))
    }

    fn parse_embedded_path(&mut self, parts: &mut Vec<GStringPart>) {
        let start = self.current_position();
        self.advance_char(); // $
        let mut raw = String::new();
        loop {
            while let Some(c) = self.peek_at(0) {
                if !is_ident_continue(c) || c == '$' {
                    break;
                }
                raw.push(c);
                self.advance_char();
            }
            match (self.peek_at(0), self.peek_at(1)) {
                (Some('.'), Some(n)) if is_ident_start(n) && n != '$' => {
                    raw.push('.');
                    self.advance_char();
                }
                _ => break,
            }
        }
        let span = Span::new(start, self.current_position());
        parts.push(GStringPart::Path { raw, span });
    }

    fn parse_num(&mut self) -> Result<()> {
        let start = self.current_position();
        let begin = self.idx;

        let radix_prefix = self.looking_at("0x") || self.looking_at("0X") || self.looking_at("0b") || self.looking_at("0B");
        if radix_prefix {
            self.advance_char();
            self.advance_char();
            while let Some(c) = self.peek_at(0) {
                if c.is_ascii_hexdigit() || c == '_' {
                    self.advance_char();
                } else {
                    break;
                }
            }
            self.eat_suffix("iIlLgG");
        } else {
            self.eat_digits();
            let mut decimal = false;
            if self.peek_at(0) == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                self.advance_char();
                self.eat_digits();
                decimal = true;
            }
            if matches!(self.peek_at(0), Some('e' | 'E')) {
                let digit_at = if matches!(self.peek_at(1), Some('+' | '-')) { 2 } else { 1 };
                if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    for _ in 0..digit_at {
                        self.advance_char();
                    }
                    self.eat_digits();
                    decimal = true;
                }
            }
            if decimal {
                self.eat_suffix("fFdDgG");
            } else {
                self.eat_suffix("iIlLgGfFdD");
            }
        }

        let raw: String = self.chars[begin..self.idx].iter().collect();
        let end = self.current_position();
        self.push_with_span(Token::Number(raw), start, end);
        Ok(())
    }

    fn eat_digits(&mut self) {
        while let Some(c) = self.peek_at(0) {
            if c.is_ascii_digit() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn eat_suffix(&mut self, suffixes: &str) {
        if let Some(c) = self.peek_at(0)
            && suffixes.contains(c)
            && !self.peek_at(1).is_some_and(is_ident_continue)
        {
            self.advance_char();
        }
    }

    fn parse_id(&mut self) -> Result<()> {
        let start = self.current_position();
        let begin = self.idx;
        while let Some(c) = self.peek_at(0) {
            if is_ident_continue(c) {
                self.advance_char();
            } else {
                break;
            }
        }
        if self.idx == begin {
            return Err(anyhow!(self.err("Unknown character")));
        }
        let word: String = self.chars[begin..self.idx].iter().collect();
        let end = self.current_position();
        let token = Token::from_keyword(&word).unwrap_or(Token::Id(word));
        self.push_with_span(token, start, end);
        Ok(())
    }

    fn slashy_allowed(&self) -> bool {
        !self.tokens.last().is_some_and(Token::ends_operand)
    }

    fn push_op(&mut self, text: &str, token: Token) {
        let start = self.current_position();
        self.expect(text);
        let end = self.current_position();
        self.push_with_span(token, start, end);
    }

    fn open(&mut self, text: &str, token: Token, nesting: Nesting) {
        self.nesting.push(nesting);
        self.push_op(text, token);
    }

    fn close(&mut self, text: &str, token: Token) {
        self.nesting.pop();
        self.push_op(text, token);
    }

    fn parse_punctuations(&mut self) -> Result<()> {
        let c = self.chars[self.idx];
        let next_is_ident_continue = |t: &Self, at: usize| t.peek_at(at).is_some_and(is_ident_continue);
        match c {
            '(' => self.open("(", Token::LParen, Nesting::Paren),
            ')' => self.close(")", Token::RParen),
            '[' => self.open("[", Token::LBracket, Nesting::Bracket),
            ']' => self.close("]", Token::RBracket),
            '{' => self.open("{", Token::LBrace, Nesting::Brace),
            '}' => self.close("}", Token::RBrace),
            ':' => self.push_op(":", Token::Colon),
            ',' => self.push_op(",", Token::Comma),
            ';' => self.push_op(";", Token::Semicolon),
            '~' => self.push_op("~", Token::BitNot),
            '^' => self.push_op("^", Token::BitXor),
            '.' => {
                if self.looking_at("..<") {
                    self.push_op("..<", Token::RangeExclusiveRight)
                } else if self.looking_at("..") {
                    self.push_op("..", Token::Range)
                } else {
                    self.push_op(".", Token::Dot)
                }
            }
            '?' => {
                if self.looking_at("?.") {
                    self.push_op("?.", Token::SafeDot)
                } else if self.looking_at("?:") {
                    self.push_op("?:", Token::Elvis)
                } else if self.looking_at("?[") {
                    self.open("?[", Token::SafeIndex, Nesting::Bracket)
                } else {
                    self.push_op("?", Token::Question)
                }
            }
            '&' => {
                if self.looking_at("&&") {
                    self.push_op("&&", Token::And)
                } else {
                    self.push_op("&", Token::BitAnd)
                }
            }
            '|' => {
                if self.looking_at("||") {
                    self.push_op("||", Token::Or)
                } else {
                    self.push_op("|", Token::BitOr)
                }
            }
            '+' => {
                if self.looking_at("+=") {
                    self.push_op("+=", Token::AddAssign)
                } else {
                    self.push_op("+", Token::Add)
                }
            }
            '-' => {
                if self.looking_at("->") {
                    self.push_op("->", Token::Arrow)
                } else if self.looking_at("-=") {
                    self.push_op("-=", Token::SubAssign)
                } else {
                    self.push_op("-", Token::Sub)
                }
            }
            '*' => {
                if self.looking_at("**") {
                    self.push_op("**", Token::Pow)
                } else if self.looking_at("*=") {
                    self.push_op("*=", Token::MulAssign)
                } else if self.looking_at("*.") {
                    self.push_op("*.", Token::SpreadDot)
                } else {
                    self.push_op("*", Token::Mul)
                }
            }
            '/' => {
                if self.looking_at("/=") && !self.slashy_allowed() {
                    self.push_op("/=", Token::DivAssign)
                } else if self.slashy_allowed() {
                    return self.parse_interpolating("/");
                } else {
                    self.push_op("/", Token::Div)
                }
            }
            '%' => {
                if self.looking_at("%=") {
                    self.push_op("%=", Token::ModAssign)
                } else {
                    self.push_op("%", Token::Mod)
                }
            }
            '=' => {
                if self.looking_at("==~") {
                    self.push_op("==~", Token::RegexMatch)
                } else if self.looking_at("==") {
                    self.push_op("==", Token::Eq)
                } else if self.looking_at("=~") {
                    self.push_op("=~", Token::RegexFind)
                } else {
                    self.push_op("=", Token::Assign)
                }
            }
            '!' => {
                if self.looking_at("!=") {
                    self.push_op("!=", Token::Ne)
                } else if self.looking_at("!in") && !next_is_ident_continue(self, 3) {
                    self.push_op("!in", Token::NotIn)
                } else {
                    self.push_op("!", Token::Not)
                }
            }
            '>' => {
                if self.looking_at(">=") {
                    self.push_op(">=", Token::Ge)
                } else {
                    self.push_op(">", Token::Gt)
                }
            }
            '<' => {
                if self.looking_at("<=>") {
                    self.push_op("<=>", Token::Compare)
                } else if self.looking_at("<..<") {
                    self.push_op("<..<", Token::RangeExclusiveBoth)
                } else if self.looking_at("<..") {
                    self.push_op("<..", Token::RangeExclusiveLeft)
                } else if self.looking_at("<=") {
                    self.push_op("<=", Token::Le)
                } else {
                    self.push_op("<", Token::Lt)
                }
            }
            _ => return Err(anyhow!(self.err("Unknown punctuation"))),
        }
        Ok(())
    }

    fn parse(&mut self) -> Result<()> {
        if self.base_offset == 0 && self.looking_at("#!") {
            self.skip_line_comment();
        }
        while !self.eof() {
            let c = self.chars[self.idx];
            match c {
                '\n' => self.push_newline(),
                '\\' if self.peek_at(1) == Some('\n') || self.looking_at("\\\r\n") => {
                    // line continuation
                    self.advance_char();
                    while self.peek_at(0) != Some('\n') {
                        self.advance_char();
                    }
                    self.advance_char();
                }
                c if c.is_whitespace() => self.advance_char(),
                '/' if self.looking_at("//") => self.skip_line_comment(),
                '/' if self.looking_at("/*") => {
                    self.expect("/*");
                    self.skip_block_comment()?;
                }
                '\'' => self.parse_single_quoted()?,
                '"' => {
                    let delim = if self.looking_at("\"\"\"") { "\"\"\"" } else { "\"" };
                    self.parse_interpolating(delim)?;
                }
                '0'..='9' => self.parse_num()?,
                c if is_ident_start(c) => self.parse_id()?,
                _ => self.parse_punctuations()?,
            }
        }
        Ok(())
    }
}

impl Tokenizer {
    fn push_with_span(&mut self, token: Token, start: Position, end: Position) {
        self.tokens.push(token);
        self.token_spans.push(Span::new(start, end));
    }
}
