use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::LanguageServer;
use tracing::info;

use super::{
    convert::{from_lsp_position, span_to_range},
    format::format_edits,
    hover::describe,
    state::{Document, FlowLanguageServer},
};

#[tower_lsp::async_trait]
impl LanguageServer for FlowLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("flowls initializing with root {:?}", params.root_uri);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_formatting_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "flowls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("flowls initialized");
        self.client.log_message(MessageType::INFO, "flowls started").await;
        self.load_config().await;
    }

    async fn shutdown(&self) -> Result<()> {
        info!("flowls shutting down");
        Ok(())
    }

    async fn did_change_configuration(&self, _: DidChangeConfigurationParams) {
        self.load_config().await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.insert(
            uri.clone(),
            Document {
                text: params.text_document.text,
                version: params.text_document.version,
                debounce_seq: 0,
            },
        );
        self.schedule_update(uri, 0).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        // full sync: the last change carries the whole text
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        {
            let mut entry = self.documents.entry(uri.clone()).or_default();
            entry.text = change.text;
            entry.version = params.text_document.version;
            entry.debounce_seq = entry.debounce_seq.wrapping_add(1);
        }
        let delay = self.config().debounce_ms;
        self.schedule_update(uri, delay).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        // the unit stays cached; other documents may include it
        self.documents.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let uris = params.changes.into_iter().map(|event| event.uri).collect();
        self.refresh_from_disk(uris).await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let (line, column) = from_lsp_position(params.text_document_position_params.position);

        let Some(unit) = self.cache.unit(uri) else {
            return Ok(None);
        };
        let (Some(ast), Some(index)) = (unit.ast.as_ref(), unit.index()) else {
            return Ok(None);
        };
        Ok(describe(ast, &index, line, column).map(|(text, span)| Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: text,
            }),
            range: Some(span_to_range(&span)),
        }))
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = &params.text_document.uri;
        let Some(text) = self.documents.get(uri).map(|doc| doc.text.clone()) else {
            return Ok(None);
        };
        // the cached unit may lag behind the buffer while an update is debounced
        Ok(format_edits(&text, uri.as_str()))
    }
}
