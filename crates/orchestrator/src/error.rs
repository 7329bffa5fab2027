use opshub_domain::ids::ModuleId;
use std::borrow::Cow;
use std::time::Duration;

/// Errors returned to callers of the orchestrator.
#[opshub_derive::opshub_error]
pub enum OrchestratorError {
    /// A manifest with the same id is already registered.
    #[error("Duplicate module{}: {message}", format_context(.context))]
    DuplicateModule { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The dependency graph is not a DAG; no module changed state.
    #[error("Cyclic dependency{}: {}", format_context(.context), format_cycle(.cycle))]
    CyclicDependency { cycle: Vec<ModuleId>, context: Option<Cow<'static, str>> },

    #[error("Unknown module{}: {message}", format_context(.context))]
    UnknownModule { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Failure of a single module's setup. Contained per module and recorded on
/// its snapshot; never returned from an activation pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleSetupError {
    #[error("setup of '{module}' failed: {message}")]
    Failed { module: ModuleId, message: String },

    #[error("setup of '{module}' panicked: {message}")]
    Panicked { module: ModuleId, message: String },

    #[error("setup of '{module}' timed out after {}ms", .timeout.as_millis())]
    TimedOut { module: ModuleId, timeout: Duration },
}

impl ModuleSetupError {
    #[must_use]
    pub const fn module(&self) -> &ModuleId {
        match self {
            Self::Failed { module, .. }
            | Self::Panicked { module, .. }
            | Self::TimedOut { module, .. } => module,
        }
    }
}

fn format_cycle(cycle: &[ModuleId]) -> String {
    cycle.iter().map(ModuleId::as_str).collect::<Vec<_>>().join(" -> ")
}
