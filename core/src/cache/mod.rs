//! Per-document compilation units and incremental cross-file resolution.
//!
//! [`CompilationCache::update`] is the only writer. Units are immutable once stored and are
//! swapped as a whole, so concurrent readers see either the old or the new unit.

mod includes;
mod loader;
mod passes;
mod unit;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tracing::{debug, trace, warn};
use url::Url;

pub use includes::resolve_target;
pub use loader::{FileContents, FsLoader, SourceLoader};
pub use passes::SemanticPass;
pub use unit::{IncludeEdge, IncludeStatus, SourceUnit};

use crate::ast::{Ast, NodeId};
use crate::compile::compile;
use crate::diagnostic::{Diagnostic, Severity};
use crate::util::fast_map::{FastHashSet, fast_hash_set_new};
use includes::{IncludeGraph, cycle_edges};
use unit::content_hash;

pub struct CompilationCache {
    units: DashMap<Url, Arc<SourceUnit>>,
    loader: Box<dyn SourceLoader>,
    passes: Vec<Box<dyn SemanticPass>>,
    update_lock: Mutex<()>,
}

impl CompilationCache {
    pub fn new(loader: impl SourceLoader + 'static) -> Self {
        Self {
            units: DashMap::new(),
            loader: Box::new(loader),
            passes: Vec::new(),
            update_lock: Mutex::new(()),
        }
    }

    /// Registers a pass. Passes run ordered by phase, then by registration.
    pub fn add_pass(&mut self, pass: Box<dyn SemanticPass>) {
        self.passes.push(pass);
        self.passes.sort_by_key(|p| p.phase());
    }

    pub fn with_pass(mut self, pass: impl SemanticPass + 'static) -> Self {
        self.add_pass(Box::new(pass));
        self
    }

    /// Recompiles `changed` and re-resolves includes affected by them.
    ///
    /// Returns the full diagnostic list of every document whose diagnostics may have
    /// changed. Evicted documents map to an empty list.
    pub fn update(
        &self,
        changed: impl IntoIterator<Item = Url>,
        contents: &FileContents,
    ) -> BTreeMap<Url, Vec<Diagnostic>> {
        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut stale: BTreeSet<Url> = BTreeSet::new();
        let mut evicted: BTreeSet<Url> = BTreeSet::new();
        for uri in changed {
            match self.read(&uri, contents) {
                Some(text) => {
                    if self.rebuild(&uri, &text) {
                        stale.insert(uri);
                    }
                }
                None => {
                    if self.units.remove(&uri).is_some() {
                        debug!(%uri, "evicted source unit");
                        evicted.insert(uri);
                    }
                }
            }
        }

        self.load_targets(&mut stale, &evicted, contents);
        let revised = self.revalidate(&stale, &evicted);

        let mut result = BTreeMap::new();
        for (uri, edges) in revised {
            let Some(unit) = self.unit(&uri) else {
                continue;
            };
            let semantic = self.run_passes(&unit);
            let sealed = Arc::new(unit.reseal(edges, semantic));
            result.insert(uri.clone(), sealed.diagnostics());
            self.units.insert(uri, sealed);
        }
        for uri in evicted {
            result.entry(uri).or_default();
        }
        debug!(changed = result.len(), units = self.units.len(), "cache updated");
        result
    }

    /// Compiles and stores `text` unless its hash matches the cached unit.
    fn rebuild(&self, uri: &Url, text: &str) -> bool {
        let hash = content_hash(text);
        if let Some(unit) = self.units.get(uri)
            && unit.hash == hash
        {
            trace!(%uri, "content unchanged");
            return false;
        }
        let compiled = compile(text, uri.as_str());
        debug!(%uri, diagnostics = compiled.diagnostics.len(), "compiled source unit");
        self.units.insert(uri.clone(), Arc::new(SourceUnit::new(uri.clone(), hash, compiled)));
        true
    }

    fn read(&self, uri: &Url, contents: &FileContents) -> Option<String> {
        contents.get(uri).cloned().or_else(|| self.loader.load(uri))
    }

    /// Loads include targets that are not cached yet, transitively.
    fn load_targets(&self, stale: &mut BTreeSet<Url>, evicted: &BTreeSet<Url>, contents: &FileContents) {
        let mut failed: FastHashSet<Url> = fast_hash_set_new();
        let mut pending = self.uris();
        while let Some(uri) = pending.pop() {
            let Some(unit) = self.unit(&uri) else {
                continue;
            };
            for edge in unit.includes() {
                let Some(target) = &edge.target else {
                    continue;
                };
                if !needs_check(&uri, edge, stale, evicted)
                    || self.units.contains_key(target)
                    || failed.contains(target)
                {
                    continue;
                }
                match self.read(target, contents) {
                    Some(text) => {
                        self.rebuild(target, &text);
                        stale.insert(target.clone());
                        pending.push(target.clone());
                    }
                    None => {
                        trace!(includer = %uri, target = %target, "include target unavailable");
                        failed.insert(target.clone());
                    }
                }
            }
        }
    }

    /// New include edge lists for every unit whose edges were checked or changed status.
    fn revalidate(&self, stale: &BTreeSet<Url>, evicted: &BTreeSet<Url>) -> BTreeMap<Url, Vec<IncludeEdge>> {
        let snapshot: Vec<Arc<SourceUnit>> = self.units.iter().map(|entry| entry.value().clone()).collect();
        let mut graph = IncludeGraph::new();
        let mut revised: BTreeMap<Url, Vec<IncludeEdge>> = BTreeMap::new();

        for unit in &snapshot {
            let mut edges = unit.includes().to_vec();
            let mut touched = stale.contains(&unit.uri);
            for (i, edge) in edges.iter_mut().enumerate() {
                let Some(target) = edge.target.clone() else {
                    continue;
                };
                if needs_check(&unit.uri, edge, stale, evicted) {
                    touched = true;
                    edge.status = if self.units.contains_key(&target) {
                        IncludeStatus::Resolved
                    } else {
                        IncludeStatus::Missing
                    };
                    trace!(includer = %unit.uri, %target, status = ?edge.status, "include revalidated");
                }
                if matches!(edge.status, IncludeStatus::Resolved | IncludeStatus::Cycle) {
                    graph.entry(unit.uri.clone()).or_default().push((i, target));
                }
            }
            if touched {
                revised.insert(unit.uri.clone(), edges);
            }
        }

        let closing = cycle_edges(&graph);
        for unit in &snapshot {
            let was_revised = revised.contains_key(&unit.uri);
            let mut edges = revised
                .remove(&unit.uri)
                .unwrap_or_else(|| unit.includes().to_vec());
            let mut flipped = false;
            for (i, edge) in edges.iter_mut().enumerate() {
                let status = if closing.contains(&(unit.uri.clone(), i)) {
                    IncludeStatus::Cycle
                } else if edge.status == IncludeStatus::Cycle {
                    IncludeStatus::Resolved
                } else {
                    continue;
                };
                if edge.status != status {
                    if status == IncludeStatus::Cycle {
                        warn!(includer = %unit.uri, source = %edge.source, "include cycle");
                    }
                    edge.status = status;
                    flipped = true;
                }
            }
            if was_revised || flipped {
                revised.insert(unit.uri.clone(), edges);
            }
        }
        revised
    }

    fn run_passes(&self, unit: &SourceUnit) -> Vec<Diagnostic> {
        let Some(ast) = &unit.ast else {
            return Vec::new();
        };
        if unit.syntax_error_count() > 0 {
            trace!(uri = %unit.uri, "semantic passes skipped");
            return Vec::new();
        }
        let mut out = Vec::new();
        for pass in &self.passes {
            let found = pass.run(&unit.uri, ast);
            debug!(uri = %unit.uri, pass = pass.name(), diagnostics = found.len(), "semantic pass");
            out.extend(found);
        }
        out
    }

    pub fn unit(&self, uri: &Url) -> Option<Arc<SourceUnit>> {
        self.units.get(uri).map(|entry| entry.value().clone())
    }

    pub fn ast(&self, uri: &Url) -> Option<Arc<Ast>> {
        self.unit(uri)?.ast.clone()
    }

    /// Every diagnostic of `uri` in all phases.
    pub fn diagnostics(&self, uri: &Url) -> Vec<Diagnostic> {
        self.unit(uri).map(|unit| unit.diagnostics()).unwrap_or_default()
    }

    /// Error-severity diagnostics of `uri`.
    pub fn errors(&self, uri: &Url) -> Vec<Diagnostic> {
        let mut all = self.diagnostics(uri);
        all.retain(|d| d.severity == Severity::Error);
        all
    }

    pub fn parent(&self, uri: &Url, node: NodeId) -> Option<NodeId> {
        self.unit(uri)?.index()?.parent(node)
    }

    /// Nodes containing the 1-based position, innermost first.
    pub fn nodes_at(&self, uri: &Url, line: u32, column: u32) -> Vec<NodeId> {
        self.unit(uri)
            .and_then(|unit| unit.index())
            .map(|index| index.nodes_at(line, column))
            .unwrap_or_default()
    }

    /// Drops a unit without revalidating its includers. Waits for a running `update`.
    pub fn remove(&self, uri: &Url) -> Option<Arc<SourceUnit>> {
        let _guard = self.update_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.units.remove(uri).map(|(_, unit)| unit)
    }

    /// Documents that include `uri`.
    pub fn includers(&self, uri: &Url) -> Vec<Url> {
        let mut out: Vec<Url> = self
            .units
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .includes()
                    .iter()
                    .any(|edge| edge.target.as_ref() == Some(uri))
            })
            .map(|entry| entry.key().clone())
            .collect();
        out.sort();
        out
    }

    pub fn uris(&self) -> Vec<Url> {
        let mut out: Vec<Url> = self.units.iter().map(|entry| entry.key().clone()).collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Default for CompilationCache {
    fn default() -> Self {
        Self::new(FsLoader)
    }
}

fn needs_check(includer: &Url, edge: &IncludeEdge, stale: &BTreeSet<Url>, evicted: &BTreeSet<Url>) -> bool {
    let Some(target) = &edge.target else {
        return false;
    };
    edge.status == IncludeStatus::Unchecked
        || stale.contains(includer)
        || stale.contains(target)
        || evicted.contains(target)
}
