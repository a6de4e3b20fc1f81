/// Cooperative cancellation shared by the scan and copy phases.
///
/// The token is a single monotonic flag: once set it stays set. Workers poll
/// it at fixed checkpoints (once per directory in the scanner, once per
/// chunk in the copy engine), so a stop request takes effect within one
/// checkpoint interval rather than instantly.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle to a shared "stop requested" flag.
///
/// Clones share the same flag. Cancelling any clone is visible to all of them.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the "not cancelled" state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent and non-blocking.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
