use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::error::Error;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn check_reports_missing_include() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let main = dir.path().join("main.config");
    fs::write(&main, "includeConfig 'missing.config'\nprocess.cpus = 4\n")?;

    let mut cmd = Command::cargo_bin("flowls")?;
    cmd.args(["check", main.to_str().unwrap()]);
    cmd.assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("main.config:1:1: error[include]: Invalid include source: 'missing.config'"));

    Ok(())
}

#[test]
fn check_passes_clean_files_with_includes() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let main = dir.path().join("main.config");
    fs::write(&main, "includeConfig 'base.config'\nprocess.cpus = 4\n")?;
    fs::write(dir.path().join("base.config"), "params.input = 'data/*.fq'\n")?;

    let mut cmd = Command::cargo_bin("flowls")?;
    cmd.args(["check", main.to_str().unwrap()]);
    cmd.assert().success().stdout(predicate::str::is_empty());

    Ok(())
}

#[test]
fn check_warnings_do_not_fail() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let main = dir.path().join("main.config");
    fs::write(&main, "foo {\n    id 'x'\n}\n")?;

    let mut cmd = Command::cargo_bin("flowls")?;
    cmd.args(["check", main.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("warning[syntax]: Append syntax is only allowed in the plugins block"));

    Ok(())
}

#[test]
fn check_json_lists_every_document() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let main = dir.path().join("main.config");
    fs::write(&main, "includeConfig 'base.config'\n")?;
    fs::write(dir.path().join("base.config"), "a = = 1\n")?;

    let output = Command::cargo_bin("flowls")?
        .args(["check", "--json", main.to_str().unwrap()])
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let map = json.as_object().unwrap();
    assert_eq!(map.len(), 2);
    let base = map.iter().find(|(k, _)| k.ends_with("base.config")).unwrap().1;
    assert_eq!(base[0]["phase"], "syntax");

    Ok(())
}

#[test]
fn fmt_prints_normalized_source() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let main = dir.path().join("main.config");
    fs::write(&main, "process {\n  cpus   =   4\n  withLabel: big { memory = '8 GB' }\n}\n")?;

    let mut cmd = Command::cargo_bin("flowls")?;
    cmd.args(["fmt", main.to_str().unwrap()]);
    cmd.assert().success().stdout(predicate::str::diff(
        "process {\n    cpus = 4\n    withLabel: big {\n        memory = '8 GB'\n    }\n}\n",
    ));

    Ok(())
}

#[test]
fn fmt_refuses_syntax_errors() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let main = dir.path().join("main.config");
    fs::write(&main, "a = = 1\n")?;

    let mut cmd = Command::cargo_bin("flowls")?;
    cmd.args(["fmt", main.to_str().unwrap()]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("has syntax errors"));

    Ok(())
}

#[test]
fn ast_prints_debug_tree() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let main = dir.path().join("main.config");
    fs::write(&main, "process.cpus = 4\n")?;

    let mut cmd = Command::cargo_bin("flowls")?;
    cmd.args(["ast", main.to_str().unwrap()]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Assign").and(predicate::str::contains("Integer(")));

    Ok(())
}

#[test]
fn rejects_parent_dir_paths() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("flowls")?;
    cmd.args(["check", "../main.config"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Parent directory components"));

    Ok(())
}
