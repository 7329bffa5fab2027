use crate::ids::ModuleId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Proof that a module is between setup start and teardown.
///
/// The orchestrator issues one lease per activation and revokes it when the
/// module leaves `activating`/`active`. Registries refuse registrations that
/// carry a revoked lease, so a handle kept by a background task cannot add
/// handlers on behalf of a torn-down module.
#[derive(Debug, Clone)]
pub struct ActivationLease {
    module: ModuleId,
    live: Arc<AtomicBool>,
}

impl ActivationLease {
    #[must_use]
    pub fn new(module: ModuleId) -> Self {
        Self { module, live: Arc::new(AtomicBool::new(true)) }
    }

    #[must_use]
    pub const fn module(&self) -> &ModuleId {
        &self.module
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Returns `true` if this call revoked a live lease.
    pub fn revoke(&self) -> bool {
        self.live.swap(false, Ordering::AcqRel)
    }
}
