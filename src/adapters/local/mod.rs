//! Adapters that execute jobs on the local host.
//!
//! - [`LocalFileTransfer`]: stages `file://` and plain-path references
//! - [`LocalAttachmentService`]: per-job attachment directories
//! - [`LocalJobStateService`]: memory ledger, launch script, background process
//! - [`JobMonitor`]: done-file polling and completion bookkeeping
//! - [`LocalJobKillService`]: SIGTERM delivery

pub mod attachments;
pub mod file_transfer;
pub mod job_kill;
pub mod job_monitor;
pub mod job_state;

pub use attachments::LocalAttachmentService;
pub use file_transfer::LocalFileTransfer;
pub use job_kill::LocalJobKillService;
pub use job_monitor::{JobMonitor, MonitorOutcome};
pub use job_state::LocalJobStateService;
