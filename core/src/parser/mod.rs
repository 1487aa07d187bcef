//! Config/script parser producing a [`CstFile`].
//!
//! Parsing runs in two tiers. [`PredictionMode::Fast`] decides every alternative from a
//! bounded lookahead and gives up on the first ambiguity or error. The adapter then
//! reparses the same tokens with a fresh [`PredictionMode::Full`] parser, which
//! resolves ambiguities speculatively and recovers from statement-level errors.
//! Tokenizer failures end the parse immediately.

use std::fmt;

use tracing::debug;

use crate::cst::CstFile;
use crate::token::{ParseError, Span, Token, Tokenizer};

mod config;
mod expr;
mod helpers;
mod script;

#[cfg(test)]
mod parser_test;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionMode {
    Fast,
    Full,
}

/// Successful parse: a tree plus the syntax errors full mode recovered from.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub cst: CstFile,
    pub errors: Vec<ParseError>,
    pub mode: PredictionMode,
}

/// The document could not be tokenized.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub error: ParseError,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for ParseFailure {}

/// Marks an error raised while tokenizing an embedded `${...}` source.
#[derive(Debug)]
pub(crate) struct LexicalError(pub ParseError);

impl fmt::Display for LexicalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for LexicalError {}

/// Parse `text` with fast prediction, falling back to full prediction.
pub fn parse(text: &str, name: &str) -> Result<ParsedSource, ParseFailure> {
    let (tokens, spans) = Tokenizer::tokenize(text).map_err(|error| ParseFailure { error })?;

    let mut fast = CstParser::new(&tokens, &spans, text, PredictionMode::Fast);
    match fast.parse_file(name) {
        Ok(cst) => {
            return Ok(ParsedSource {
                cst,
                errors: Vec::new(),
                mode: PredictionMode::Fast,
            });
        }
        Err(err) => {
            if let Some(lexical) = err.downcast_ref::<LexicalError>() {
                return Err(ParseFailure {
                    error: lexical.0.clone(),
                });
            }
            debug!(name, reason = %err, "fast prediction failed, reparsing with full prediction");
        }
    }

    parse_full(&tokens, &spans, text, name)
}

/// Parse with one fixed prediction mode. Fast mode reports its first error as a failure.
pub fn parse_with_mode(text: &str, name: &str, mode: PredictionMode) -> Result<ParsedSource, ParseFailure> {
    let (tokens, spans) = Tokenizer::tokenize(text).map_err(|error| ParseFailure { error })?;
    match mode {
        PredictionMode::Full => parse_full(&tokens, &spans, text, name),
        PredictionMode::Fast => {
            let mut parser = CstParser::new(&tokens, &spans, text, PredictionMode::Fast);
            match parser.parse_file(name) {
                Ok(cst) => Ok(ParsedSource {
                    cst,
                    errors: Vec::new(),
                    mode,
                }),
                Err(err) => Err(ParseFailure {
                    error: parser.to_parse_error(&err),
                }),
            }
        }
    }
}

fn parse_full(tokens: &[Token], spans: &[Span], text: &str, name: &str) -> Result<ParsedSource, ParseFailure> {
    let mut full = CstParser::new(tokens, spans, text, PredictionMode::Full);
    match full.parse_file(name) {
        Ok(cst) => Ok(ParsedSource {
            cst,
            errors: full.errors,
            mode: PredictionMode::Full,
        }),
        Err(err) => {
            let error = match err.downcast_ref::<LexicalError>() {
                Some(lexical) => lexical.0.clone(),
                None => full.to_parse_error(&err),
            };
            Err(ParseFailure { error })
        }
    }
}

pub(crate) struct CstParser<'a> {
    pub(crate) tokens: &'a [Token],
    pub(crate) spans: &'a [Span],
    pub(crate) pos: usize,
    pub(crate) len: usize,
    pub(crate) mode: PredictionMode,
    source: &'a str,
    /// Offset of `source` within the document.
    base_offset: usize,
    pub(crate) errors: Vec<ParseError>,
    speculating: usize,
}

impl<'a> CstParser<'a> {
    pub(crate) fn new(tokens: &'a [Token], spans: &'a [Span], source: &'a str, mode: PredictionMode) -> Self {
        Self {
            tokens,
            spans,
            pos: 0,
            len: tokens.len(),
            mode,
            source,
            base_offset: 0,
            errors: Vec::new(),
            speculating: 0,
        }
    }

    fn embedded(
        tokens: &'a [Token],
        spans: &'a [Span],
        source: &'a str,
        base_offset: usize,
        mode: PredictionMode,
    ) -> Self {
        let mut parser = Self::new(tokens, spans, source, mode);
        parser.base_offset = base_offset;
        parser
    }
}
