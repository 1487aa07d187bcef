use std::collections::HashMap;
use std::fs;

use tracing::trace;
use url::Url;

/// Open editor buffers keyed by document URL.
pub type FileContents = HashMap<Url, String>;

/// Reads documents that are not held in editor buffers.
pub trait SourceLoader: Send + Sync {
    fn load(&self, uri: &Url) -> Option<String>;
}

/// Loads `file:` URLs from disk. Other schemes are never loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, uri: &Url) -> Option<String> {
        if uri.scheme() != "file" {
            return None;
        }
        let path = uri.to_file_path().ok()?;
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(err) => {
                trace!(path = %path.display(), error = %err, "unable to read source");
                None
            }
        }
    }
}
