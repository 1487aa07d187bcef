//! Parsing, AST construction and multi-document analysis for workflow config files.

pub mod ast;
pub mod builder;
pub mod cache;
pub mod compile;
pub mod cst;
pub mod diagnostic;
pub mod index;
pub mod parser;
pub mod token;
pub mod util;

pub use cache::{CompilationCache, FileContents, FsLoader, SourceLoader};
pub use compile::{CompiledSource, compile};
pub use diagnostic::{Diagnostic, Phase, Severity};
