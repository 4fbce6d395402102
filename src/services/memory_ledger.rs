//! Host-local memory accounting.
//!
//! The ledger is the only owner of the "memory in use" counter on a host.
//! Execution-state adapters reserve memory when they schedule a job and
//! release it when the job's done file appears.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

// ============================================================================
// Internal mutable state (held behind Mutex)
// ============================================================================

#[derive(Default)]
struct Inner {
    reservations: HashMap<String, u32>,
    used: u64,
}

// ============================================================================
// MemoryLedger
// ============================================================================

/// Internally synchronized map of job id to reserved MB.
///
/// Each operation is atomic on its own. The ledger does not make a
/// read-then-reserve sequence atomic; callers that check `used` before
/// reserving accept a short over-commit window.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total MB currently reserved.
    pub async fn used(&self) -> u64 {
        self.inner.lock().await.used
    }

    /// Reserve `memory` MB for `job_id`, replacing any earlier reservation.
    pub async fn reserve(&self, job_id: &str, memory: u32) {
        let mut inner = self.inner.lock().await;
        let previous = inner.reservations.insert(job_id.to_string(), memory);
        inner.used = inner.used - u64::from(previous.unwrap_or(0)) + u64::from(memory);
        debug!(job_id, memory, used = inner.used, "Reserved job memory");
    }

    /// Release the reservation held by `job_id`. Returns the released MB.
    pub async fn release(&self, job_id: &str) -> Option<u32> {
        let mut inner = self.inner.lock().await;
        let released = inner.reservations.remove(job_id)?;
        inner.used -= u64::from(released);
        debug!(job_id, released, used = inner.used, "Released job memory");
        Some(released)
    }

    /// MB reserved by one job.
    pub async fn reservation(&self, job_id: &str) -> Option<u32> {
        self.inner.lock().await.reservations.get(job_id).copied()
    }

    pub async fn job_count(&self) -> usize {
        self.inner.lock().await.reservations.len()
    }
}
