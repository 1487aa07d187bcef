use url::Url;

use crate::ast::Ast;
use crate::diagnostic::{Diagnostic, Phase};

/// Analysis run by the cache over syntax-clean documents, in phase order.
pub trait SemanticPass: Send + Sync {
    fn phase(&self) -> Phase;

    fn name(&self) -> &str;

    fn run(&self, uri: &Url, ast: &Ast) -> Vec<Diagnostic>;
}
