use std::path::Path;

use anyhow::Context;
use flowls_core::{CompilationCache, FileContents, FsLoader, Severity};
use url::Url;

const USAGE: &str = "Usage: flowls-lsp --analyze [--errors-only] <file>\n  --analyze <file>     : Diagnostics of the file and its includes as JSON\n  --errors-only        : Show only errors in simple format";

pub(crate) fn try_cli_analyze() -> anyhow::Result<Option<String>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() <= 1 {
        return Ok(None);
    }

    if let Some(i) = args.iter().position(|a| a == "--analyze") {
        let path = args[i + 1..]
            .iter()
            .find(|a| !a.starts_with("--"))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!(USAGE))?;
        let errors_only = args.iter().any(|a| a == "--errors-only");
        return analyze_path(Path::new(&path), errors_only).map(Some);
    }

    Ok(None)
}

/// Compiles `path` and everything it includes, rendered for the terminal.
pub fn analyze_path(path: &Path, errors_only: bool) -> anyhow::Result<String> {
    let absolute = path
        .canonicalize()
        .with_context(|| format!("Failed to read file '{}'", path.display()))?;
    let uri = Url::from_file_path(&absolute)
        .map_err(|_| anyhow::anyhow!("Cannot convert '{}' to a file URL", absolute.display()))?;

    let cache = CompilationCache::new(FsLoader);
    let result = cache.update([uri.clone()], &FileContents::new());
    if cache.unit(&uri).is_none() {
        anyhow::bail!("Failed to read file '{}'", path.display());
    }

    if errors_only {
        let errors: Vec<String> = result
            .iter()
            .flat_map(|(u, diags)| diags.iter().map(move |d| (u, d)))
            .filter(|(_, d)| d.severity == Severity::Error)
            .map(|(u, d)| format!("{} line {}:{}: {}", u.path(), d.span.start.line, d.span.start.column, d.message))
            .collect();
        if errors.is_empty() {
            return Ok("No errors found".to_string());
        }
        return Ok(errors.join("\n"));
    }

    let output = serde_json::json!({
        "uri": uri,
        "diagnostics": result,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}
