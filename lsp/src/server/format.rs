use flowls_core::compile;
use flowls_core::token::Tokenizer;
use tower_lsp::lsp_types::{Position, Range, TextEdit};
use tracing::debug;

/// Whole-document edit that replaces `text` with its printed form.
///
/// `None` when the text has syntax errors or comments, since the printer cannot keep comments.
pub fn format_edits(text: &str, name: &str) -> Option<Vec<TextEdit>> {
    if Tokenizer::has_comments(text) != Some(false) {
        debug!(name, "formatting skipped on comments or lexical errors");
        return None;
    }
    let compiled = compile(text, name);
    if compiled.syntax_error_count() > 0 {
        debug!(name, "formatting skipped on syntax errors");
        return None;
    }
    let formatted = compiled.ast?.to_string();
    if formatted == text {
        return Some(Vec::new());
    }
    let end_line = text.lines().count() as u32 + 1;
    Some(vec![TextEdit {
        range: Range::new(Position::new(0, 0), Position::new(end_line, 0)),
        new_text: formatted,
    }])
}
