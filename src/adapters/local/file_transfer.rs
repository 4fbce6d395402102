//! File transfer for files reachable on the local filesystem.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::ports::FileTransferService;

/// Copies `file://` URIs and plain paths. Any other scheme has no transfer
/// implementation on this host.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileTransfer;

impl LocalFileTransfer {
    pub fn new() -> Self {
        Self
    }

    fn local_path(source: &str) -> GenieResult<PathBuf> {
        if let Some(path) = source.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if let Some((scheme, _)) = source.split_once("://") {
            return Err(GenieError::NotFound(format!(
                "No file transfer implementation found for scheme {scheme} in {source}"
            )));
        }
        Ok(PathBuf::from(source))
    }
}

#[async_trait]
impl FileTransferService for LocalFileTransfer {
    #[instrument(skip(self, destination), fields(destination = %destination.display()))]
    async fn get_file(&self, source: &str, destination: &Path) -> GenieResult<()> {
        let path = Self::local_path(source)?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        match fs::copy(&path, destination).await {
            Ok(bytes) => {
                debug!(bytes, "Copied file");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(GenieError::NotFound(format!("No file found at {source}")))
            }
            Err(err) => Err(err.into()),
        }
    }
}
