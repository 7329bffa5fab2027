use crate::error::ModuleSetupError;
use opshub_domain::features::ResolvedFeatures;
use opshub_domain::ids::ModuleId;
use opshub_domain::session::Role;
use opshub_domain::state::ActivationState;
use std::fmt;

/// Outcome of one activation pass.
#[derive(Debug, Clone, Default)]
pub struct ActivationReport {
    /// The feature set the pass was run against.
    pub features: ResolvedFeatures,
    /// Modules set up in this pass, in setup order.
    pub activated: Vec<ModuleId>,
    /// Modules torn down in this pass, in teardown order.
    pub deactivated: Vec<ModuleId>,
    pub failed: Vec<ModuleSetupError>,
    /// Modules left inactive because a dependency or required feature is missing.
    pub skipped: Vec<ModuleId>,
}

impl ActivationReport {
    /// `true` when no setup failed.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// `true` when any module changed state.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        !self.activated.is_empty() || !self.deactivated.is_empty() || !self.failed.is_empty()
    }
}

impl ActivationReport {
    pub(crate) fn record(&mut self, module: &ModuleId, outcome: Result<(), ModuleSetupError>) {
        match outcome {
            Ok(()) => self.activated.push(module.clone()),
            Err(error) => self.failed.push(error),
        }
    }
}

impl fmt::Display for ActivationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} activated, {} deactivated, {} failed, {} skipped",
            self.activated.len(),
            self.deactivated.len(),
            self.failed.len(),
            self.skipped.len()
        )
    }
}

/// Read-only view of a registered module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSnapshot {
    pub id: ModuleId,
    pub state: ActivationState,
    pub depends_on: Vec<ModuleId>,
    pub minimum_role: Role,
    /// Most recent setup failure; cleared by a successful setup.
    pub last_error: Option<ModuleSetupError>,
    /// Number of successful setups since registration.
    pub activations: u32,
}
