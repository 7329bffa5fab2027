use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-module activation state. Only the orchestrator drives transitions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationState {
    #[default]
    Inactive,
    Activating,
    Active,
    Error,
    Deactivating,
}

impl ActivationState {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// `Activating` and `Deactivating` only exist while a lifecycle callback runs.
    #[must_use]
    pub const fn is_transitional(self) -> bool {
        matches!(self, Self::Activating | Self::Deactivating)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Error => "error",
            Self::Deactivating => "deactivating",
        }
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
