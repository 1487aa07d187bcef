//! Include target resolution and cycle detection over the include graph.

use std::collections::{BTreeMap, BTreeSet};

use url::Url;

use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

/// Resolves an include literal against the including document.
///
/// Absolute URLs under a different scheme are unverifiable and yield `None`.
pub fn resolve_target(base: &Url, source: &str) -> Option<Url> {
    // single letter schemes are drive prefixes, not URLs
    if let Ok(url) = Url::parse(source)
        && url.scheme().len() > 1
    {
        return (url.scheme() == base.scheme()).then_some(url);
    }
    base.join(source).ok()
}

/// Outgoing edges per document as `(edge index, target)`.
pub(crate) type IncludeGraph = BTreeMap<Url, Vec<(usize, Url)>>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

/// Edges that close a cycle, as `(includer, edge index)`.
///
/// Depth first from each unvisited document in URL order; an edge into a document
/// that is still on the stack closes a cycle.
pub(crate) fn cycle_edges(graph: &IncludeGraph) -> BTreeSet<(Url, usize)> {
    let mut marks: FastHashMap<&Url, Mark> = fast_hash_map_new();
    let mut closing = BTreeSet::new();

    for root in graph.keys() {
        if marks.contains_key(root) {
            continue;
        }
        marks.insert(root, Mark::Active);
        let mut stack: Vec<(&Url, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let cursor = frame.1;
            let edges = graph.get(node).map(Vec::as_slice).unwrap_or(&[]);
            if cursor >= edges.len() {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            }
            frame.1 += 1;

            let (edge, target) = &edges[cursor];
            match marks.get(target) {
                Some(Mark::Active) => {
                    closing.insert((node.clone(), *edge));
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(target, Mark::Active);
                    stack.push((target, 0));
                }
            }
        }
    }
    closing
}
