use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use flowls_core::ast::{Ast, NodeKind, StmtKind};
use flowls_core::cache::SemanticPass;
use flowls_core::{CompilationCache, Diagnostic, FileContents, Phase, Severity, SourceLoader};
use url::Url;

struct NoFiles;

impl SourceLoader for NoFiles {
    fn load(&self, _: &Url) -> Option<String> {
        None
    }
}

fn url(path: &str) -> Url {
    Url::parse(&format!("file:///work/{}", path)).unwrap()
}

fn buffer(uri: &Url, text: &str) -> FileContents {
    FileContents::from([(uri.clone(), text.to_string())])
}

/// Records its invocations and flags every top-level assignment to `forbidden`.
struct RecordingPass {
    phase: Phase,
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl SemanticPass for RecordingPass {
    fn phase(&self) -> Phase {
        self.phase
    }

    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, uri: &Url, ast: &Ast) -> Vec<Diagnostic> {
        self.log.lock().unwrap().push(format!("{}:{}", self.name, uri.path()));
        ast.statements
            .iter()
            .filter_map(|stmt| match &stmt.kind {
                StmtKind::Assign(assign) if assign.path == ["forbidden"] => Some(Diagnostic::warning(
                    self.phase,
                    format!("{} flagged forbidden", self.name),
                    stmt.span,
                )),
                _ => None,
            })
            .collect()
    }
}

fn cache_with_passes(log: &Arc<Mutex<Vec<String>>>) -> CompilationCache {
    CompilationCache::new(NoFiles)
        .with_pass(RecordingPass {
            phase: Phase::TypeChecking,
            name: "types",
            log: log.clone(),
        })
        .with_pass(RecordingPass {
            phase: Phase::NameResolution,
            name: "names",
            log: log.clone(),
        })
}

#[test]
fn test_passes_run_in_phase_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let cache = cache_with_passes(&log);
    let main = url("main.config");

    let result = cache.update([main.clone()], &buffer(&main, "forbidden = 1\n"));
    assert_eq!(*log.lock().unwrap(), vec!["names:/work/main.config", "types:/work/main.config"]);
    let phases: Vec<Phase> = result[&main].iter().map(|d| d.phase).collect();
    assert_eq!(phases, vec![Phase::NameResolution, Phase::TypeChecking]);
}

#[test]
fn test_passes_skip_documents_with_syntax_errors() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let cache = cache_with_passes(&log);
    let main = url("main.config");

    let result = cache.update([main.clone()], &buffer(&main, "forbidden = 1\nb = = 2\n"));
    assert!(log.lock().unwrap().is_empty());
    assert!(result[&main].iter().all(|d| d.phase == Phase::Syntax));
    assert_eq!(cache.errors(&main).len(), 1);
}

#[test]
fn test_warnings_do_not_block_passes() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let cache = cache_with_passes(&log);
    let main = url("main.config");

    let result = cache.update([main.clone()], &buffer(&main, "foo {\n    id 'x'\n}\n"));
    assert_eq!(log.lock().unwrap().len(), 2);
    assert_eq!(result[&main].len(), 1);
    assert_eq!(result[&main][0].severity, Severity::Warning);
    assert!(cache.errors(&main).is_empty());
}

#[test]
fn test_same_content_is_not_recompiled() {
    let cache = CompilationCache::new(NoFiles);
    let main = url("main.config");
    let contents = buffer(&main, "process.cpus = 4\n");

    cache.update([main.clone()], &contents);
    let first = cache.unit(&main).unwrap();
    assert!(cache.update([main.clone()], &contents).is_empty());
    assert!(Arc::ptr_eq(&first, &cache.unit(&main).unwrap()));
}

#[test]
fn test_position_queries_follow_rebuilds() {
    let cache = CompilationCache::new(NoFiles);
    let main = url("main.config");
    cache.update([main.clone()], &buffer(&main, "process {\n    cpus = 2\n}\n"));

    let ast = cache.ast(&main).unwrap();
    let hits = cache.nodes_at(&main, 2, 12);
    assert_eq!(hits.len(), 3);
    let index = cache.unit(&main).unwrap().index().unwrap();
    assert_eq!(index.entry(hits[0]).unwrap().kind, NodeKind::Constant);
    assert_eq!(cache.parent(&main, hits[1]), Some(ast.statements[0].id));

    cache.update([main.clone()], &buffer(&main, "cpus = 2\n"));
    assert!(cache.nodes_at(&main, 2, 12).is_empty());
    assert_eq!(cache.nodes_at(&main, 1, 8).len(), 2);
}

#[test]
fn test_unknown_documents_answer_empty() {
    let cache = CompilationCache::new(NoFiles);
    let nowhere = url("nowhere.config");
    assert!(cache.ast(&nowhere).is_none());
    assert!(cache.errors(&nowhere).is_empty());
    assert!(cache.nodes_at(&nowhere, 1, 1).is_empty());
    assert!(cache.update([nowhere.clone()], &FileContents::new()).is_empty());
    assert!(cache.is_empty());
}

#[test]
fn test_remove_drops_unit() {
    let cache = CompilationCache::new(NoFiles);
    let main = url("main.config");
    cache.update([main.clone()], &buffer(&main, "a = 1\n"));
    assert_eq!(cache.uris(), vec![main.clone()]);
    assert!(cache.remove(&main).is_some());
    assert!(cache.is_empty());
}

/// Blocks inside `run` until released.
struct GatedPass {
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl SemanticPass for GatedPass {
    fn phase(&self) -> Phase {
        Phase::NameResolution
    }

    fn name(&self) -> &str {
        "gated"
    }

    fn run(&self, _: &Url, _: &Ast) -> Vec<Diagnostic> {
        let _ = self.started.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv();
        Vec::new()
    }
}

#[test]
fn test_remove_waits_for_running_update() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let cache = Arc::new(CompilationCache::new(NoFiles).with_pass(GatedPass {
        started: Mutex::new(started_tx),
        release: Mutex::new(release_rx),
    }));
    let main = url("main.config");

    let updater = {
        let cache = cache.clone();
        let main = main.clone();
        thread::spawn(move || cache.update([main.clone()], &buffer(&main, "a = 1\n")))
    };
    started_rx.recv().unwrap();

    let removed = Arc::new(AtomicBool::new(false));
    let remover = {
        let cache = cache.clone();
        let main = main.clone();
        let removed = removed.clone();
        thread::spawn(move || {
            let unit = cache.remove(&main);
            removed.store(true, Ordering::SeqCst);
            unit
        })
    };
    thread::sleep(Duration::from_millis(100));
    assert!(!removed.load(Ordering::SeqCst));

    release_tx.send(()).unwrap();
    let result = updater.join().unwrap();
    assert!(result.contains_key(&main));
    assert!(remover.join().unwrap().is_some());
    assert!(cache.unit(&main).is_none());
    assert!(cache.is_empty());
}

#[test]
fn test_readers_never_observe_partial_units() {
    let cache = Arc::new(CompilationCache::new(NoFiles));
    let main = url("main.config");
    let small = buffer(&main, "a = 1\n");
    let large = buffer(&main, "a = 1\nb = 2\nc = 3\n");
    cache.update([main.clone()], &small);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            let main = main.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let unit = cache.unit(&main).unwrap();
                    let count = unit.ast.as_ref().unwrap().statements.len();
                    assert!(count == 1 || count == 3);
                    assert_eq!(unit.index().unwrap().len(), count * 2);
                }
            })
        })
        .collect();

    for i in 0..50 {
        let contents = if i % 2 == 0 { &large } else { &small };
        cache.update([main.clone()], contents);
    }
    for reader in readers {
        reader.join().unwrap();
    }
}
