//! Bearer token providers.
//!
//! The client never reads ambient storage; a [`CredentialProvider`] is
//! constructed once and passed in. An absent token simply means no
//! `Authorization` header is sent and the backend decides.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Source of the bearer token attached to every request.
pub trait CredentialProvider: Send + Sync {
    /// Current token, if any.
    fn get(&self) -> Option<String>;

    /// Forget the token (e.g. after the backend rejected it).
    fn clear(&self);
}

/// In-memory token, typically from configuration.
#[derive(Debug, Default)]
pub struct StaticToken {
    token: Mutex<Option<String>>,
}

impl StaticToken {
    /// Wrap a configured token. A blank token counts as no token.
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token.filter(|t| !t.trim().is_empty())),
        }
    }
}

impl CredentialProvider for StaticToken {
    fn get(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn clear(&self) {
        if let Ok(mut token) = self.token.lock() {
            *token = None;
        }
    }
}

/// Token persisted in a file between runs, the CLI's counterpart of the
/// browser's local storage.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store backed by `path`. The file need not exist yet; a missing file
    /// reads as no token.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a token, replacing any previous one. Surrounding whitespace
    /// is trimmed.
    pub fn store(&self, token: &str) -> std::io::Result<()> {
        std::fs::write(&self.path, token.trim())
    }
}

impl CredentialProvider for FileTokenStore {
    fn get(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read token file");
                None
            }
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::info!(path = %self.path.display(), "Cleared stored token"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to clear token file");
            }
        }
    }
}
