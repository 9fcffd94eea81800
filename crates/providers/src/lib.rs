//! Remote document service abstractions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod paperless;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to open file {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to send request: {0}")]
    Network(String),
    #[error("failed to {operation}: received status code {status}, body: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("failed to decode {0}")]
    Decode(String),
}

impl ProviderError {
    /// Numeric HTTP status for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A classification label known to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[async_trait::async_trait]
pub trait DocumentService: Send + Sync {
    /// Full tag catalog of the service.
    async fn fetch_tags(&self) -> Result<Vec<Tag>, ProviderError>;

    /// Submits one document with the given tag ids. Never touches the source file.
    async fn upload(&self, path: &Path, tag_ids: &[i64]) -> Result<(), ProviderError>;
}
