use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use flowls_core::cache::IncludeStatus;
use flowls_core::{CompilationCache, FileContents, FsLoader, Phase, Severity, SourceLoader};
use url::Url;

/// Serves fixed documents and records every load attempt.
#[derive(Clone, Default)]
struct CountingLoader {
    files: HashMap<Url, String>,
    loads: Arc<Mutex<Vec<Url>>>,
}

impl CountingLoader {
    fn with(mut self, uri: &Url, text: &str) -> Self {
        self.files.insert(uri.clone(), text.to_string());
        self
    }

    fn loads_of(&self, uri: &Url) -> usize {
        self.loads.lock().unwrap().iter().filter(|u| *u == uri).count()
    }

    fn total(&self) -> usize {
        self.loads.lock().unwrap().len()
    }
}

impl SourceLoader for CountingLoader {
    fn load(&self, uri: &Url) -> Option<String> {
        self.loads.lock().unwrap().push(uri.clone());
        self.files.get(uri).cloned()
    }
}

fn url(path: &str) -> Url {
    Url::parse(&format!("file:///work/{}", path)).unwrap()
}

fn buffers(docs: &[(&Url, &str)]) -> FileContents {
    docs.iter().map(|(u, t)| ((*u).clone(), t.to_string())).collect()
}

#[test]
fn test_missing_include_reports_one_diagnostic_on_statement() {
    let main = url("main.config");
    let cache = CompilationCache::new(CountingLoader::default());
    let contents = buffers(&[(&main, "includeConfig 'missing.config'\nprocess.cpus = 4\n")]);

    let result = cache.update([main.clone()], &contents);
    let diags = &result[&main];
    assert_eq!(diags.len(), 1, "{:?}", diags);
    assert_eq!(diags[0].phase, Phase::IncludeResolution);
    assert_eq!(diags[0].severity, Severity::Error);
    assert!(diags[0].message.contains("missing.config"));

    let ast = cache.ast(&main).unwrap();
    assert_eq!(diags[0].span, ast.statements[0].span);
    let unit = cache.unit(&main).unwrap();
    assert_eq!(unit.includes()[0].status, IncludeStatus::Missing);
}

#[test]
fn test_unchanged_edges_are_not_reloaded() {
    let main = url("main.config");
    let base = url("base.config");
    let loader = CountingLoader::default().with(&base, "process.memory = '2 GB'\n");
    let cache = CompilationCache::new(loader.clone());

    let contents = buffers(&[(&main, "includeConfig 'base.config'\n")]);
    let result = cache.update([main.clone()], &contents);
    assert!(result[&main].is_empty());
    assert!(result.contains_key(&base));
    assert_eq!(loader.loads_of(&base), 1);

    // identical text short-circuits before include resolution
    let result = cache.update([main.clone()], &contents);
    assert!(result.is_empty());
    assert_eq!(loader.loads_of(&base), 1);

    // an edited includer revalidates against the cached target
    let contents = buffers(&[(&main, "includeConfig 'base.config'\nprocess.cpus = 2\n")]);
    let result = cache.update([main.clone()], &contents);
    assert!(result[&main].is_empty());
    assert!(!result.contains_key(&base));
    assert_eq!(loader.loads_of(&base), 1);
    assert_eq!(cache.unit(&main).unwrap().includes()[0].status, IncludeStatus::Resolved);
}

#[test]
fn test_unrelated_change_leaves_edges_alone() {
    let main = url("main.config");
    let other = url("other.config");
    let loader = CountingLoader::default().with(&url("base.config"), "a = 1\n");
    let cache = CompilationCache::new(loader.clone());

    cache.update([main.clone()], &buffers(&[(&main, "includeConfig 'base.config'\n")]));
    let before = loader.total();
    let result = cache.update([other.clone()], &buffers(&[(&other, "b = 2\n")]));
    assert_eq!(result.keys().collect::<Vec<_>>(), vec![&other]);
    assert_eq!(loader.total(), before);
}

#[test]
fn test_targets_load_transitively() {
    let a = url("a.config");
    let b = url("conf/b.config");
    let c = url("c.config");
    let loader = CountingLoader::default()
        .with(&b, "includeConfig '../c.config'\n")
        .with(&c, "x = 1\n");
    let cache = CompilationCache::new(loader);

    let result = cache.update([a.clone()], &buffers(&[(&a, "includeConfig 'conf/b.config'\n")]));
    assert_eq!(cache.uris(), vec![a.clone(), c.clone(), b.clone()]);
    assert!(result.values().all(Vec::is_empty));
    assert_eq!(cache.includers(&c), vec![b]);
}

#[test]
fn test_include_cycle_is_reported_once() {
    let a = url("a.config");
    let b = url("b.config");
    let loader = CountingLoader::default().with(&b, "includeConfig 'a.config'\n");
    let cache = CompilationCache::new(loader);

    let result = cache.update([a.clone()], &buffers(&[(&a, "includeConfig 'b.config'\n")]));
    let cycles: Vec<_> = result
        .values()
        .flatten()
        .filter(|d| d.message.starts_with("Include cycle detected"))
        .collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].phase, Phase::IncludeResolution);
    assert_eq!(cache.errors(&b).len(), 1);
    assert!(cache.errors(&a).is_empty());

    // breaking the cycle clears the diagnostic
    let result = cache.update([a.clone()], &buffers(&[(&a, "x = 1\n")]));
    assert!(result[&a].is_empty());
    assert!(result[&b].is_empty());
    assert_eq!(cache.unit(&b).unwrap().includes()[0].status, IncludeStatus::Resolved);
}

#[test]
fn test_self_include_is_a_cycle() {
    let a = url("a.config");
    let cache = CompilationCache::new(CountingLoader::default());
    let result = cache.update([a.clone()], &buffers(&[(&a, "includeConfig 'a.config'\n")]));
    assert_eq!(result[&a].len(), 1);
    assert!(result[&a][0].message.contains("a.config"));
}

#[test]
fn test_evicted_target_invalidates_includer() {
    let main = url("main.config");
    let base = url("base.config");
    let cache = CompilationCache::new(CountingLoader::default());
    let contents = buffers(&[(&main, "includeConfig 'base.config'\n"), (&base, "a = 1\n")]);
    let result = cache.update([main.clone(), base.clone()], &contents);
    assert!(result[&main].is_empty());

    let contents = buffers(&[(&main, "includeConfig 'base.config'\n")]);
    let result = cache.update([base.clone()], &contents);
    assert!(result[&base].is_empty());
    assert_eq!(result[&main].len(), 1);
    assert!(cache.unit(&base).is_none());
}

#[test]
fn test_late_target_resolves_missing_edge() {
    let main = url("main.config");
    let base = url("base.config");
    let cache = CompilationCache::new(CountingLoader::default());
    let result = cache.update([main.clone()], &buffers(&[(&main, "includeConfig 'base.config'\n")]));
    assert_eq!(result[&main].len(), 1);

    let result = cache.update([base.clone()], &buffers(&[(&base, "a = 1\n")]));
    assert!(result[&main].is_empty());
    assert!(cache.errors(&main).is_empty());
}

#[test]
fn test_foreign_scheme_and_dynamic_sources_are_skipped() {
    let main = url("main.config");
    let loader = CountingLoader::default();
    let cache = CompilationCache::new(loader.clone());
    let text = "includeConfig 'https://example.org/base.config'\nincludeConfig \"${dir}/x.config\"\n";
    let result = cache.update([main.clone()], &buffers(&[(&main, text)]));

    assert!(result[&main].is_empty());
    assert_eq!(loader.total(), 0);
    let unit = cache.unit(&main).unwrap();
    assert!(unit.includes().iter().all(|e| e.status == IncludeStatus::Skipped));
    assert_eq!(unit.includes()[1].source, "\"${dir}/x.config\"");
}

#[test]
fn test_filesystem_loader_resolves_relative_includes() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("conf")).unwrap();
    fs::write(dir.path().join("main.config"), "includeConfig 'conf/base.config'\n").unwrap();
    fs::write(dir.path().join("conf/base.config"), "process.cpus = 2\n").unwrap();

    let main = Url::from_file_path(dir.path().join("main.config")).unwrap();
    let base = Url::from_file_path(dir.path().join("conf/base.config")).unwrap();
    let cache = CompilationCache::new(FsLoader);
    let result = cache.update([main.clone()], &FileContents::new());

    assert!(result[&main].is_empty());
    assert!(cache.ast(&base).is_some());

    fs::remove_file(dir.path().join("conf/base.config")).unwrap();
    let result = cache.update([base.clone()], &FileContents::new());
    assert_eq!(result[&main].len(), 1);
}
