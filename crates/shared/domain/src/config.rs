use crate::catalogue::CapabilityCatalogue;
use crate::ids::{Capability, InfraSelector};
use crate::manifest::ModuleDescriptor;
use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Top-level host configuration.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfigInner {
    pub orchestrator: OrchestratorSettings,
    pub logging: LoggingSettings,
    /// Falls back to the built-in business catalogue when absent.
    pub catalogue: Option<CapabilityCatalogue>,
    /// Descriptors of modules without code-bound lifecycles.
    pub modules: Vec<ModuleDescriptor>,
    /// Selection applied at startup.
    pub selection: SelectionSettings,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct HostConfig {
    #[serde(flatten, default)]
    inner: Arc<HostConfigInner>,
}

impl Deref for HostConfig {
    type Target = HostConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for HostConfig {
    fn deref_mut(&mut self) -> &mut HostConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Activation pass tuning.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Set up modules of the same dependency depth concurrently.
    pub concurrent_setup: bool,
    /// Upper bound for a single setup callback; unbounded when absent.
    pub setup_timeout_ms: Option<u64>,
}

impl OrchestratorSettings {
    #[must_use]
    pub fn setup_timeout(&self) -> Option<Duration> {
        self.setup_timeout_ms.map(Duration::from_millis)
    }
}

/// Logger settings consumed by the applications.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Extra `EnvFilter` directives, e.g. `opshub_orchestrator=debug`.
    pub filter: Option<String>,
    pub directory: Option<PathBuf>,
    pub json: bool,
}

/// Capability and infrastructure selections.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub capabilities: Vec<Capability>,
    pub infrastructure: Vec<InfraSelector>,
}

// --- Default ---

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_owned(), filter: None, directory: None, json: false }
    }
}
