use async_trait::async_trait;
use std::path::Path;

use crate::domain::errors::GenieResult;

/// Port for copying a remote file reference onto local disk.
#[async_trait]
pub trait FileTransferService: Send + Sync {
    /// Fetch `source` into `destination`, creating parent directories.
    async fn get_file(&self, source: &str, destination: &Path) -> GenieResult<()>;
}

/// Port for the store holding files uploaded with a job submission.
#[async_trait]
pub trait AttachmentService: Send + Sync {
    /// Store one attachment for a job.
    async fn save(&self, job_id: &str, filename: &str, content: &[u8]) -> GenieResult<()>;

    /// Copy every attachment of a job into `destination`.
    async fn copy(&self, job_id: &str, destination: &Path) -> GenieResult<()>;

    /// Drop a job's attachments. Deleting nothing is not an error.
    async fn delete(&self, job_id: &str) -> GenieResult<()>;
}
