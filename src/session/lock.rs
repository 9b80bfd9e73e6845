use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{ReelError, ReelResult};

/// Cooperative cancellation checked by the export loop between frames.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Marks an export as running. Shared between the studio, its playback controller and any
/// caller that needs to gate controls.
#[derive(Clone, Debug, Default)]
pub struct ExportLock(Arc<AtomicBool>);

impl ExportLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_exporting(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Claim the lock for one export. Released when the guard drops.
    pub fn try_acquire(&self) -> ReelResult<ExportGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ReelError::capture("an export is already running"))?;
        Ok(ExportGuard(self.0.clone()))
    }
}

#[derive(Debug)]
pub struct ExportGuard(Arc<AtomicBool>);

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/lock.rs"]
mod tests;
