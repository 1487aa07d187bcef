//! User-facing problems reported for a document.

use std::fmt;

use serde::Serialize;

use crate::token::{ParseError, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// Analysis phase that produced a diagnostic, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Syntax,
    IncludeResolution,
    NameResolution,
    TypeChecking,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "info",
            Severity::Hint => "hint",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Syntax => "syntax",
            Phase::IncludeResolution => "include",
            Phase::NameResolution => "name",
            Phase::TypeChecking => "type",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    pub span: Span,
    pub phase: Phase,
}

impl Diagnostic {
    pub fn error(phase: Phase, message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
            span,
            phase,
        }
    }

    pub fn warning(phase: Phase, message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
            span,
            phase,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(err: &ParseError) -> Self {
        Diagnostic::error(Phase::Syntax, err.message.clone(), err.span.unwrap_or_default())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}[{}]: {}",
            self.span.start.line, self.span.start.column, self.severity, self.phase, self.message
        )
    }
}
