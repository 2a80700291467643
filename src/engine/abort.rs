// src/engine/abort.rs

//! Stop flags shared between the engine, its workers and the outside world.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Clonable handle for requesting that a running traversal stop.
///
/// Workers notice the request at their next queue poll or backoff slice;
/// actions already running are left to finish. Each traversal clears any
/// earlier request when it starts.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The global `stop` flag of one traversal.
///
/// Set internally on completion or terminal failure; also reports stopped
/// when the external [`AbortHandle`] has been triggered.
#[derive(Debug)]
pub(crate) struct StopSignal {
    local: AtomicBool,
    external: AbortHandle,
}

impl StopSignal {
    pub(crate) fn new(external: AbortHandle) -> Self {
        Self {
            local: AtomicBool::new(false),
            external,
        }
    }

    pub(crate) fn stop(&self) {
        self.local.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.local.load(Ordering::SeqCst) || self.external.is_requested()
    }

    pub(crate) fn externally_aborted(&self) -> bool {
        self.external.is_requested()
    }
}
