use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use flowls_core::{CompilationCache, Diagnostic, FileContents};
use tokio::task;
use tokio::time::sleep;
use tower_lsp::lsp_types::Url;
use tracing::{debug, warn};

use super::convert::publishable;
use super::state::{open_buffers, FlowLanguageServer};

/// Updates `uri` and returns the diagnostics to publish.
///
/// `uri` is always present in the result, also when its content was already cached.
pub fn update_document(
    cache: &CompilationCache,
    uri: &Url,
    contents: &FileContents,
) -> BTreeMap<Url, Vec<Diagnostic>> {
    let mut result = cache.update([uri.clone()], contents);
    if !result.contains_key(uri) {
        result.insert(uri.clone(), cache.diagnostics(uri));
    }
    result
}

impl FlowLanguageServer {
    /// Debounced cache update for `uri`; superseded edits cancel the pending run.
    pub(crate) async fn schedule_update(&self, uri: Url, delay_ms: u64) {
        let seq_snapshot = match self.documents.get(&uri) {
            Some(doc) => doc.debounce_seq,
            None => return,
        };
        let documents = self.documents.clone();
        let cache = self.cache.clone();
        let client = self.client.clone();
        let config = self.config();

        tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            match documents.get(&uri) {
                Some(doc) if doc.debounce_seq == seq_snapshot => {}
                _ => return,
            }

            let contents = open_buffers(&documents);
            let changed = uri.clone();
            let computed = task::spawn_blocking(move || update_document(&cache, &changed, &contents)).await;
            let result: BTreeMap<Url, Vec<Diagnostic>> = match computed {
                Ok(result) => result,
                Err(err) => {
                    warn!(%uri, error = %err, "cache update failed");
                    return;
                }
            };
            debug!(%uri, affected = result.len(), "publishing diagnostics");

            for (target, diagnostics) in result {
                let version = match documents.get(&target) {
                    Some(doc) => doc.version,
                    None => continue,
                };
                client
                    .publish_diagnostics(target, publishable(&diagnostics, &config), Some(version))
                    .await;
            }
        });
    }

    /// Re-reads closed documents that changed on disk.
    pub(crate) async fn refresh_from_disk(&self, uris: Vec<Url>) {
        let closed: Vec<Url> = uris
            .into_iter()
            .filter(|u| !self.documents.contains_key(u))
            .collect();
        if closed.is_empty() {
            return;
        }
        let contents = open_buffers(&self.documents);
        let cache: Arc<_> = self.cache.clone();
        let result = match task::spawn_blocking(move || cache.update(closed, &contents)).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "cache refresh failed");
                return;
            }
        };
        let config = self.config();
        for (target, diagnostics) in result {
            let version = match self.documents.get(&target) {
                Some(doc) => doc.version,
                None => continue,
            };
            self.client
                .publish_diagnostics(target, publishable(&diagnostics, &config), Some(version))
                .await;
        }
    }
}
