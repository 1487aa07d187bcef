use serde::Deserialize;
use tower_lsp::lsp_types::ConfigurationItem;
use tracing::debug;

use super::state::FlowLanguageServer;

pub const CONFIG_SECTION: &str = "flowls";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub max_diagnostics: usize,
    pub show_warnings: bool,
    pub debounce_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_diagnostics: 100,
            show_warnings: true,
            debounce_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FlowLspConfigSection {
    #[serde(default)]
    max_diagnostics: Option<usize>,
    #[serde(default)]
    show_warnings: Option<bool>,
    #[serde(default)]
    debounce_ms: Option<u64>,
}

impl ServerConfig {
    /// Applies a client configuration section; unknown or invalid fields keep their values.
    pub fn apply(&mut self, value: serde_json::Value) {
        let Ok(section) = serde_json::from_value::<FlowLspConfigSection>(value) else {
            return;
        };
        if let Some(v) = section.max_diagnostics.filter(|v| *v > 0) {
            self.max_diagnostics = v;
        }
        if let Some(v) = section.show_warnings {
            self.show_warnings = v;
        }
        if let Some(v) = section.debounce_ms {
            self.debounce_ms = v;
        }
    }
}

impl FlowLanguageServer {
    pub(crate) async fn load_config(&self) {
        let items = vec![ConfigurationItem {
            scope_uri: None,
            section: Some(CONFIG_SECTION.to_string()),
        }];

        if let Ok(values) = self.client.configuration(items).await {
            if let Some(value) = values.into_iter().next() {
                if let Ok(mut guard) = self.config.lock() {
                    guard.apply(value);
                    debug!(config = ?*guard, "configuration loaded");
                }
            }
        }
    }
}
