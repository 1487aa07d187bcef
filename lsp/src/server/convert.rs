//! Conversions between core positions (1-based) and protocol positions (0-based).

use flowls_core::token::{Position as SourcePosition, Span};
use flowls_core::{Diagnostic as SourceDiagnostic, Severity};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

use super::config::ServerConfig;

pub fn to_lsp_position(pos: &SourcePosition) -> Position {
    Position::new(pos.line.saturating_sub(1), pos.column.saturating_sub(1))
}

pub fn span_to_range(span: &Span) -> Range {
    Range::new(to_lsp_position(&span.start), to_lsp_position(&span.end))
}

/// 1-based `(line, column)` for a protocol position.
pub fn from_lsp_position(pos: Position) -> (u32, u32) {
    (pos.line + 1, pos.character + 1)
}

pub fn to_lsp_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

pub fn to_lsp_diagnostic(diagnostic: &SourceDiagnostic) -> Diagnostic {
    Diagnostic {
        range: span_to_range(&diagnostic.span),
        severity: Some(to_lsp_severity(diagnostic.severity)),
        code: Some(NumberOrString::String(diagnostic.phase.to_string())),
        source: Some("flowls".to_string()),
        message: diagnostic.message.clone(),
        ..Default::default()
    }
}

/// Diagnostics to publish under `config`: errors first when truncating.
pub fn publishable(diagnostics: &[SourceDiagnostic], config: &ServerConfig) -> Vec<Diagnostic> {
    let mut kept: Vec<&SourceDiagnostic> = diagnostics
        .iter()
        .filter(|d| config.show_warnings || d.severity == Severity::Error)
        .collect();
    if kept.len() > config.max_diagnostics {
        kept.sort_by_key(|d| d.severity);
        kept.truncate(config.max_diagnostics);
        kept.sort_by_key(|d| (d.span.start, d.phase));
    }
    kept.into_iter().map(to_lsp_diagnostic).collect()
}
