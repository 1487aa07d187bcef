use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use flowls_core::{CompilationCache, FileContents, FsLoader};
use tower_lsp::lsp_types::Url;
use tower_lsp::Client;

use super::config::ServerConfig;

/// Buffer of an open document.
#[derive(Debug, Default, Clone)]
pub(crate) struct Document {
    pub(crate) text: String,
    pub(crate) version: i32,
    pub(crate) debounce_seq: u64,
}

/// Primary LSP server state shared across handlers.
pub(crate) struct FlowLanguageServer {
    pub(crate) client: Client,
    pub(crate) documents: Arc<DashMap<Url, Document>>,
    pub(crate) cache: Arc<CompilationCache>,
    pub(crate) config: Arc<Mutex<ServerConfig>>,
}

impl FlowLanguageServer {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(DashMap::new()),
            cache: Arc::new(CompilationCache::new(FsLoader)),
            config: Arc::new(Mutex::new(ServerConfig::default())),
        }
    }

    pub(crate) fn config(&self) -> ServerConfig {
        self.config.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

/// Snapshot of every open buffer.
pub(crate) fn open_buffers(documents: &DashMap<Url, Document>) -> FileContents {
    documents
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().text.clone()))
        .collect()
}
