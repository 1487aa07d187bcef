use std::fs;

use flowls_core::ast::Ast;
use flowls_core::index::PositionIndex;
use flowls_lsp::server::cli::analyze_path;
use flowls_lsp::server::hover::describe;

#[test]
fn test_analyze_reports_missing_include_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.config");
    fs::write(&main, "includeConfig 'missing.config'\nprocess.cpus = 4\n").unwrap();

    let output = analyze_path(&main, false).unwrap();
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    let uri = json["uri"].as_str().unwrap();
    let diags = json["diagnostics"][uri].as_array().unwrap();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0]["phase"], "includeResolution");
    assert_eq!(diags[0]["severity"], "error");
    assert_eq!(diags[0]["span"]["start"]["line"], 1);
}

#[test]
fn test_analyze_errors_only() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.config");
    fs::write(&main, "includeConfig 'base.config'\n").unwrap();
    fs::write(dir.path().join("base.config"), "a = = 1\n").unwrap();

    let output = analyze_path(&main, true).unwrap();
    assert_eq!(output.lines().count(), 1);
    assert!(output.contains("base.config line 1:"));

    fs::write(dir.path().join("base.config"), "a = 1\n").unwrap();
    assert_eq!(analyze_path(&main, true).unwrap(), "No errors found");
}

#[test]
fn test_analyze_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(analyze_path(&dir.path().join("nope.config"), false).is_err());
}

fn ast(src: &str) -> Ast {
    flowls_core::compile(src, "hover.config").ast.unwrap().as_ref().clone()
}

#[test]
fn test_hover_describes_innermost_node_with_path() {
    let ast = ast("process {\n    withLabel: big {\n        memory = '8 GB'\n    }\n}\n");
    let index = PositionIndex::build(&ast);

    let (text, span) = describe(&ast, &index, 3, 19).unwrap();
    assert!(text.starts_with("**constant**"), "{}", text);
    assert!(text.contains("`process.memory`"));
    assert!(text.contains("'8 GB'"));
    assert_eq!(span.start.line, 3);

    let (text, _) = describe(&ast, &index, 1, 2).unwrap();
    assert_eq!(text, "**block**");
    assert!(describe(&ast, &index, 9, 1).is_none());
}
