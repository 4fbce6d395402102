//! Attachment store on local disk.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

use crate::domain::errors::{GenieError, GenieResult};
use crate::domain::ports::AttachmentService;

/// Keeps each job's attachments under `<root>/<job id>/`.
pub struct LocalAttachmentService {
    root: PathBuf,
}

impl LocalAttachmentService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn job_dir(&self, job_id: &str) -> GenieResult<PathBuf> {
        validate_path_segment("job id", job_id)?;
        Ok(self.root.join(job_id))
    }
}

/// Rejects values that would not name a single entry directly below a directory.
pub(crate) fn validate_path_segment(kind: &str, value: &str) -> GenieResult<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\');
    if invalid {
        return Err(GenieError::Precondition(format!("Invalid {kind}: {value:?}")));
    }
    Ok(())
}

fn validate_file_name(filename: &str) -> GenieResult<()> {
    validate_path_segment("attachment file name", filename)
}

#[async_trait]
impl AttachmentService for LocalAttachmentService {
    async fn save(&self, job_id: &str, filename: &str, content: &[u8]) -> GenieResult<()> {
        validate_file_name(filename)?;
        let dir = self.job_dir(job_id)?;
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(filename), content).await?;
        debug!(job_id, filename, bytes = content.len(), "Saved attachment");
        Ok(())
    }

    #[instrument(skip(self, destination))]
    async fn copy(&self, job_id: &str, destination: &Path) -> GenieResult<()> {
        let mut entries = match fs::read_dir(self.job_dir(job_id)?).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        fs::create_dir_all(destination).await?;
        let mut copied = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                fs::copy(entry.path(), destination.join(entry.file_name())).await?;
                copied += 1;
            }
        }
        debug!(copied, "Copied attachments");
        Ok(())
    }

    async fn delete(&self, job_id: &str) -> GenieResult<()> {
        match fs::remove_dir_all(self.job_dir(job_id)?).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
