use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Once;

use anyhow::Context;
use clap::{Parser, Subcommand};
use flowls_core::{CompilationCache, Diagnostic, FileContents, FsLoader, Severity, compile};
use tracing::debug;
use url::Url;


static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "flowls_core=warn,flowls_cli=info";

#[derive(Debug, Parser)]
#[command(
    name = "flowls",
    author,
    version,
    about = "Checker and formatter for workflow config files",
    long_about = None
)]
struct CliArgs {
    /// Tracing filter such as `flowls_core=debug`; overrides FLOWLS_LOG and RUST_LOG
    #[arg(long, global = true, value_name = "FILTER")]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compile files together with their includes and report diagnostics
    Check {
        #[arg(required = true, value_name = "FILE", value_parser = parse_sanitized_path)]
        files: Vec<PathBuf>,

        /// Print the diagnostics of every document as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the file re-emitted from its syntax tree
    Fmt {
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
    },
    /// Print the syntax tree of a file
    Ast {
        #[arg(value_name = "FILE", value_parser = parse_sanitized_path)]
        file: PathBuf,
    },
}

fn sanitize_path(raw: &str) -> anyhow::Result<PathBuf> {
    let p = Path::new(raw);

    for comp in p.components() {
        if matches!(comp, Component::ParentDir) {
            return Err(anyhow::anyhow!(
                "Parent directory components ('..') are not allowed in file paths."
            ));
        }
    }

    Ok(p.to_path_buf())
}

fn parse_sanitized_path(raw: &str) -> Result<PathBuf, String> {
    sanitize_path(raw).map_err(|e| e.to_string())
}

fn filter_expr_from(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("1")
        || trimmed.eq_ignore_ascii_case("true")
        || trimmed.eq_ignore_ascii_case("on")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn init_tracing(cli_filter: Option<&str>) {
    TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let filter_expr = cli_filter
            .and_then(filter_expr_from)
            .or_else(|| std::env::var("FLOWLS_LOG").ok().and_then(|raw| filter_expr_from(&raw)))
            .or_else(|| std::env::var("RUST_LOG").ok());

        let builder = fmt().with_writer(std::io::stderr);

        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(DEFAULT_TRACE_FILTER),
        };

        let _ = builder.try_init();
    });
}

fn read_file_content(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file '{}'", path.display()))
}

fn file_url(path: &Path) -> anyhow::Result<Url> {
    let absolute = path
        .canonicalize()
        .with_context(|| format!("Failed to read file '{}'", path.display()))?;
    Url::from_file_path(&absolute).map_err(|_| anyhow::anyhow!("Cannot convert '{}' to a file URL", absolute.display()))
}

fn display_path(uri: &Url) -> String {
    uri.to_file_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| uri.to_string())
}

/// One `path:line:col: severity[phase]: message` line per diagnostic.
fn render_report(result: &BTreeMap<Url, Vec<Diagnostic>>) -> String {
    let mut out = String::new();
    for (uri, diagnostics) in result {
        let path = display_path(uri);
        for diagnostic in diagnostics {
            out.push_str(&format!("{}:{}\n", path, diagnostic));
        }
    }
    out
}

fn has_errors(result: &BTreeMap<Url, Vec<Diagnostic>>) -> bool {
    result.values().flatten().any(|d| d.severity == Severity::Error)
}

fn check(files: &[PathBuf], json: bool) -> anyhow::Result<bool> {
    let uris = files.iter().map(|f| file_url(f)).collect::<anyhow::Result<Vec<_>>>()?;
    let cache = CompilationCache::new(FsLoader);
    let result = cache.update(uris, &FileContents::new());
    debug!(documents = cache.len(), "check finished");

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_report(&result));
    }
    Ok(has_errors(&result))
}

fn format_file(file: &Path) -> anyhow::Result<String> {
    let text = read_file_content(file)?;
    let compiled = compile(&text, &file.to_string_lossy());
    if compiled.syntax_error_count() > 0 {
        for diagnostic in compiled.diagnostics.iter().filter(|d| d.is_error()) {
            eprintln!("{}:{}", file.display(), diagnostic);
        }
        anyhow::bail!("'{}' has syntax errors", file.display());
    }
    let ast = compiled
        .ast
        .ok_or_else(|| anyhow::anyhow!("'{}' produced no syntax tree", file.display()))?;
    Ok(ast.to_string())
}

fn print_ast(file: &Path) -> anyhow::Result<()> {
    let text = read_file_content(file)?;
    let compiled = compile(&text, &file.to_string_lossy());
    for diagnostic in &compiled.diagnostics {
        eprintln!("{}:{}", file.display(), diagnostic);
    }
    let ast = compiled
        .ast
        .ok_or_else(|| anyhow::anyhow!("'{}' produced no syntax tree", file.display()))?;
    println!("{:#?}", ast);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let CliArgs { log, command } = CliArgs::parse();
    init_tracing(log.as_deref());

    match command {
        Commands::Check { files, json } => {
            if check(&files, json)? {
                std::process::exit(1);
            }
        }
        Commands::Fmt { file } => print!("{}", format_file(&file)?),
        Commands::Ast { file } => print_ast(&file)?,
    }
    Ok(())
}
