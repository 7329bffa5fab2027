use crate::context::ModuleContext;
use crate::error::{ModuleSetupError, OrchestratorError};
use crate::graph::{DependencyGraph, teardown_order};
use crate::manifest::{Lifecycle, ModuleManifest};
use crate::registries::{Events, Extensions};
use crate::report::{ActivationReport, ModuleSnapshot};
use futures::future::join_all;
use fxhash::{FxHashMap, FxHashSet};
use opshub_domain::config::OrchestratorSettings;
use opshub_domain::features::ResolvedFeatures;
use opshub_domain::ids::ModuleId;
use opshub_domain::lease::ActivationLease;
use opshub_domain::manifest::ModuleDescriptor;
use opshub_domain::panic::panic_message;
use opshub_domain::session::{Role, SessionSource};
use opshub_domain::state::ActivationState;
use opshub_event_bus::EventBus;
use opshub_extensions::{ActionInfo, Dispatcher};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::{debug, error, info, instrument, warn};

/// Activation pass tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Set up modules of the same dependency depth concurrently.
    pub concurrent_setup: bool,
    /// Upper bound for one setup callback.
    pub setup_timeout: Option<Duration>,
}

impl From<&OrchestratorSettings> for OrchestratorConfig {
    fn from(settings: &OrchestratorSettings) -> Self {
        Self {
            concurrent_setup: settings.concurrent_setup,
            setup_timeout: settings.setup_timeout(),
        }
    }
}

#[derive(Debug, Default)]
struct ModuleRecord {
    state: ActivationState,
    /// Present while the module is active; carries its lease.
    context: Option<ModuleContext>,
    last_error: Option<ModuleSetupError>,
    activations: u32,
}

#[derive(Debug)]
struct Inner {
    config: OrchestratorConfig,
    manifests: RwLock<Vec<ModuleManifest>>,
    records: RwLock<FxHashMap<ModuleId, ModuleRecord>>,
    extensions: Dispatcher,
    events: EventBus,
    /// Serializes activation passes, unregistration and shutdown.
    pass: Mutex<()>,
}

/// Module registry and activation orchestrator.
///
/// Owns the [`Dispatcher`] and [`EventBus`] that module contexts register
/// into and hands out only read and invoke views of them. Clones share the
/// same state.
///
/// Lock order: `manifests` before `records`; neither is held across an await.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

impl Orchestrator {
    /// Orchestrator whose permission predicates see an anonymous session.
    #[must_use]
    pub fn new(config: OrchestratorConfig) -> Self {
        Self::from_registries(config, Dispatcher::new())
    }

    /// Permission predicates are evaluated against `source`.
    #[must_use]
    pub fn with_session_source(config: OrchestratorConfig, source: Arc<dyn SessionSource>) -> Self {
        Self::from_registries(config, Dispatcher::with_session_source(source))
    }

    fn from_registries(config: OrchestratorConfig, extensions: Dispatcher) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                manifests: RwLock::new(Vec::new()),
                records: RwLock::new(FxHashMap::default()),
                extensions,
                events: EventBus::new(),
                pass: Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> OrchestratorConfig {
        self.inner.config
    }

    /// Replaces the session source for subsequent invocations.
    pub fn set_session_source(&self, source: Arc<dyn SessionSource>) {
        self.inner.extensions.set_session_source(source);
    }

    /// Invoke and inspect extension points. Actions are only added through a
    /// [`ModuleContext`] and only removed by the orchestrator.
    #[must_use]
    pub fn extensions(&self) -> Extensions {
        Extensions::new(self.inner.extensions.clone())
    }

    /// Emit, subscribe and inspect events. Module subscriptions are only
    /// removed by the orchestrator.
    #[must_use]
    pub fn events(&self) -> Events {
        Events::new(self.inner.events.clone())
    }

    /// Adds a manifest to the catalogue. It is considered from the next pass on.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::DuplicateModule`] if the id is taken; the
    /// catalogue is left unchanged.
    pub fn register(&self, manifest: ModuleManifest) -> Result<(), OrchestratorError> {
        let id = manifest.id().clone();
        {
            let mut manifests = self.inner.manifests.write();
            if manifests.iter().any(|m| m.id() == &id) {
                return Err(OrchestratorError::DuplicateModule {
                    message: id.to_string().into(),
                    context: Some("Registering module".into()),
                });
            }
            manifests.push(manifest);
            self.inner.records.write().insert(id.clone(), ModuleRecord::default());
        }

        info!(module = %id, "Module registered");
        Ok(())
    }

    /// Reconciles module states with `features`.
    ///
    /// Tears down active modules that lost a required feature or an active
    /// dependency (dependents first), then sets up every eligible inactive or
    /// errored module in dependency order. Active modules that stay eligible
    /// are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::CyclicDependency`] before any state change
    /// if the registered dependencies form a cycle. Setup failures are not
    /// errors; they are listed in the report.
    #[instrument(skip_all, fields(features = %features))]
    pub async fn activate(
        &self,
        features: &ResolvedFeatures,
    ) -> Result<ActivationReport, OrchestratorError> {
        let _pass = self.inner.pass.lock().await;

        let manifests = self.inner.manifests.read().clone();
        let descriptors: Vec<&ModuleDescriptor> = manifests.iter().map(|m| m.descriptor()).collect();
        let graph = DependencyGraph::build(&descriptors).map_err(|cycle| {
            let error = OrchestratorError::CyclicDependency {
                cycle,
                context: Some("Activation pass aborted".into()),
            };
            warn!(%error, "Activation pass rejected");
            error
        })?;

        let mut report = ActivationReport { features: features.clone(), ..ActivationReport::default() };

        let stale = self.stale_modules(&manifests, &graph, features);
        for index in teardown_order(&descriptors, &stale) {
            self.deactivate(&manifests[index]).await;
            report.deactivated.push(manifests[index].id().clone());
        }

        if self.inner.config.concurrent_setup {
            let deepest = graph.depth.iter().copied().max().unwrap_or_default();
            for depth in 0..=deepest {
                let wave: Vec<usize> = graph
                    .order
                    .iter()
                    .copied()
                    .filter(|&index| graph.depth[index] == depth)
                    .filter(|&index| self.is_eligible(&manifests, &graph, index, features, &mut report))
                    .collect();

                let outcomes = join_all(
                    wave.iter().map(|&index| self.activate_module(&manifests[index], features)),
                )
                .await;
                for (&index, outcome) in wave.iter().zip(outcomes) {
                    report.record(manifests[index].id(), outcome);
                }
            }
        } else {
            for &index in &graph.order {
                if self.is_eligible(&manifests, &graph, index, features, &mut report) {
                    let outcome = self.activate_module(&manifests[index], features).await;
                    report.record(manifests[index].id(), outcome);
                }
            }
        }

        info!(%report, "Activation pass finished");
        Ok(report)
    }

    /// Tears down `id`, its active transitive dependents first, and removes it
    /// from the catalogue.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::UnknownModule`] if no manifest has this id.
    pub async fn unregister(&self, id: &str) -> Result<(), OrchestratorError> {
        let _pass = self.inner.pass.lock().await;

        let manifests = self.inner.manifests.read().clone();
        let Some(target) = manifests.iter().position(|m| m.id().as_str() == id) else {
            return Err(OrchestratorError::UnknownModule {
                message: id.to_owned().into(),
                context: Some("Unregistering module".into()),
            });
        };
        let descriptors: Vec<&ModuleDescriptor> = manifests.iter().map(|m| m.descriptor()).collect();

        let mut affected = vec![target];
        let mut cursor = 0;
        while cursor < affected.len() {
            let current = &descriptors[affected[cursor]].id;
            for (index, descriptor) in descriptors.iter().enumerate() {
                if descriptor.depends_on.contains(current) && !affected.contains(&index) {
                    affected.push(index);
                }
            }
            cursor += 1;
        }

        let active: Vec<usize> =
            affected.into_iter().filter(|&index| self.is_active(manifests[index].id())).collect();
        for index in teardown_order(&descriptors, &active) {
            self.deactivate(&manifests[index]).await;
        }

        let module = manifests[target].id().clone();
        {
            let mut manifests = self.inner.manifests.write();
            manifests.retain(|m| m.id() != &module);
            self.inner.records.write().remove(&module);
        }

        info!(module = %module, "Module unregistered");
        Ok(())
    }

    /// Tears down every active module, dependents first, and clears both
    /// registries. Returns the number of modules torn down.
    pub async fn shutdown(&self) -> usize {
        let _pass = self.inner.pass.lock().await;

        let manifests = self.inner.manifests.read().clone();
        let descriptors: Vec<&ModuleDescriptor> = manifests.iter().map(|m| m.descriptor()).collect();
        let active: Vec<usize> =
            (0..manifests.len()).filter(|&index| self.is_active(manifests[index].id())).collect();

        let order = teardown_order(&descriptors, &active);
        for &index in &order {
            self.deactivate(&manifests[index]).await;
        }

        let actions = self.inner.extensions.clear();
        let subscriptions = self.inner.events.shutdown();
        info!(modules = order.len(), actions, subscriptions, "Orchestrator shut down");
        order.len()
    }

    // --- Introspection ---

    /// All registered modules in registration order.
    #[must_use]
    pub fn list_modules(&self) -> Vec<ModuleSnapshot> {
        let manifests = self.inner.manifests.read();
        let records = self.inner.records.read();
        manifests
            .iter()
            .map(|manifest| {
                let descriptor = manifest.descriptor();
                let record = records.get(&descriptor.id);
                ModuleSnapshot {
                    id: descriptor.id.clone(),
                    state: record.map(|r| r.state).unwrap_or_default(),
                    depends_on: descriptor.depends_on.clone(),
                    minimum_role: descriptor.minimum_role,
                    last_error: record.and_then(|r| r.last_error.clone()),
                    activations: record.map_or(0, |r| r.activations),
                }
            })
            .collect()
    }

    #[must_use]
    pub fn module_state(&self, id: &str) -> Option<ActivationState> {
        self.inner.records.read().get(id).map(|r| r.state)
    }

    #[must_use]
    pub fn last_error(&self, id: &str) -> Option<ModuleSetupError> {
        self.inner.records.read().get(id).and_then(|r| r.last_error.clone())
    }

    #[must_use]
    pub fn list_registered_actions(&self, point: &str) -> Vec<ActionInfo> {
        self.inner.extensions.list_actions(point)
    }

    /// Active modules, in registration order.
    #[must_use]
    pub fn active_modules(&self) -> Vec<ModuleId> {
        self.filter_active(|_| true)
    }

    /// Active modules whose minimum role `role` satisfies, in registration order.
    #[must_use]
    pub fn modules_for_role(&self, role: Role) -> Vec<ModuleId> {
        self.filter_active(|descriptor| role.satisfies(descriptor.minimum_role))
    }

    /// Consumed names that no registered manifest provides, with their consumer.
    #[must_use]
    pub fn unprovided_consumers(&self) -> Vec<(ModuleId, String)> {
        let manifests = self.inner.manifests.read();
        let provided: FxHashSet<&str> = manifests
            .iter()
            .flat_map(|m| m.descriptor().provides.iter().map(String::as_str))
            .collect();

        let provided = &provided;
        manifests
            .iter()
            .flat_map(|m| {
                m.descriptor()
                    .consumes
                    .iter()
                    .filter(move |name| !provided.contains(name.as_str()))
                    .map(move |name| (m.id().clone(), name.clone()))
            })
            .collect()
    }

    // --- Internals ---

    fn filter_active(&self, keep: impl Fn(&ModuleDescriptor) -> bool) -> Vec<ModuleId> {
        let manifests = self.inner.manifests.read();
        let records = self.inner.records.read();
        manifests
            .iter()
            .map(ModuleManifest::descriptor)
            .filter(|d| records.get(&d.id).is_some_and(|r| r.state.is_active()))
            .filter(|d| keep(d))
            .map(|d| d.id.clone())
            .collect()
    }

    fn is_active(&self, id: &ModuleId) -> bool {
        self.inner.records.read().get(id).is_some_and(|r| r.state.is_active())
    }

    fn set_state(&self, id: &ModuleId, state: ActivationState) {
        if let Some(record) = self.inner.records.write().get_mut(id) {
            record.state = state;
        }
    }

    /// Active modules that can no longer stay active, in topological order.
    fn stale_modules(
        &self,
        manifests: &[ModuleManifest],
        graph: &DependencyGraph,
        features: &ResolvedFeatures,
    ) -> Vec<usize> {
        let records = self.inner.records.read();
        let active = |index: usize| {
            records.get(manifests[index].id()).is_some_and(|r| r.state.is_active())
        };

        let mut stale = vec![false; manifests.len()];
        for &index in &graph.order {
            if !active(index) {
                continue;
            }
            stale[index] = !graph.missing[index].is_empty()
                || !features.contains_all(&manifests[index].descriptor().required_features)
                || graph.dependencies[index].iter().any(|&dep| stale[dep] || !active(dep));
        }

        graph.order.iter().copied().filter(|&index| stale[index]).collect()
    }

    /// Whether the module at `index` should be set up now. Ineligible modules
    /// are moved to `inactive` and reported as skipped.
    fn is_eligible(
        &self,
        manifests: &[ModuleManifest],
        graph: &DependencyGraph,
        index: usize,
        features: &ResolvedFeatures,
        report: &mut ActivationReport,
    ) -> bool {
        let descriptor = manifests[index].descriptor();
        let mut records = self.inner.records.write();
        let state_of = |id: &ModuleId| records.get(id).map(|r| r.state).unwrap_or_default();

        if state_of(&descriptor.id).is_active() {
            return false;
        }

        let reason = if let Some(missing) = graph.missing[index].first() {
            Some(format!("dependency '{missing}' is not registered"))
        } else if let Some(&dep) =
            graph.dependencies[index].iter().find(|&&dep| !state_of(manifests[dep].id()).is_active())
        {
            Some(format!("dependency '{}' is not active", manifests[dep].id()))
        } else {
            descriptor
                .required_features
                .iter()
                .find(|feature| !features.contains(feature.as_str()))
                .map(|feature| format!("feature '{feature}' is not resolved"))
        };

        let Some(reason) = reason else {
            return true;
        };

        if let Some(record) = records.get_mut(&descriptor.id) {
            record.state = ActivationState::Inactive;
        }
        debug!(module = %descriptor.id, reason, "Module not eligible");
        report.skipped.push(descriptor.id.clone());
        false
    }

    async fn activate_module(
        &self,
        manifest: &ModuleManifest,
        features: &ResolvedFeatures,
    ) -> Result<(), ModuleSetupError> {
        let id = manifest.id().clone();
        let lease = ActivationLease::new(id.clone());
        let ctx = ModuleContext::new(
            Arc::clone(&manifest.descriptor),
            lease.clone(),
            features.clone(),
            self.inner.extensions.clone(),
            self.inner.events.clone(),
        );

        self.set_state(&id, ActivationState::Activating);
        debug!(module = %id, "Module setup started");

        let outcome =
            run_setup(Arc::clone(&manifest.lifecycle), ctx.clone(), self.inner.config.setup_timeout)
                .await;

        match outcome {
            Ok(()) => {
                if let Some(record) = self.inner.records.write().get_mut(&id) {
                    record.state = ActivationState::Active;
                    record.context = Some(ctx);
                    record.last_error = None;
                    record.activations += 1;
                }
                info!(module = %id, "Module activated");
                Ok(())
            },
            Err(error) => {
                lease.revoke();
                let actions = self.inner.extensions.remove_module(&id);
                let subscriptions = self.inner.events.unsubscribe_module(&id);
                if let Some(record) = self.inner.records.write().get_mut(&id) {
                    record.state = ActivationState::Error;
                    record.context = None;
                    record.last_error = Some(error.clone());
                }
                warn!(
                    module = %id,
                    %error,
                    actions,
                    subscriptions,
                    "Module setup failed; registrations rolled back"
                );
                Err(error)
            },
        }
    }

    async fn deactivate(&self, manifest: &ModuleManifest) {
        let id = manifest.id();
        let context = self.inner.records.write().get_mut(id).and_then(|record| {
            record.state = ActivationState::Deactivating;
            record.context.take()
        });

        if let Some(ctx) = context {
            ctx.lease().revoke();
            let lifecycle = Arc::clone(&manifest.lifecycle);
            match tokio::spawn(async move { lifecycle.teardown(ctx).await }).await {
                Ok(Ok(())) => {},
                Ok(Err(err)) => {
                    let message = format!("{err:#}");
                    warn!(module = %id, error = %message, "Module teardown failed");
                },
                Err(join) => {
                    let message = join_failure(join);
                    error!(module = %id, error = %message, "Module teardown aborted");
                },
            }
        }

        let actions = self.inner.extensions.remove_module(id);
        let subscriptions = self.inner.events.unsubscribe_module(id);
        self.set_state(id, ActivationState::Inactive);
        info!(module = %id, actions, subscriptions, "Module deactivated");
    }
}

/// Runs a setup callback in its own task so panics and timeouts stay contained.
async fn run_setup(
    lifecycle: Arc<dyn Lifecycle>,
    ctx: ModuleContext,
    timeout: Option<Duration>,
) -> Result<(), ModuleSetupError> {
    let module = ctx.module_id().clone();
    let mut task = tokio::spawn(async move { lifecycle.setup(ctx).await });

    let joined = match timeout {
        Some(limit) => {
            if let Ok(joined) = tokio::time::timeout(limit, &mut task).await {
                joined
            } else {
                task.abort();
                return Err(ModuleSetupError::TimedOut { module, timeout: limit });
            }
        },
        None => task.await,
    };

    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(ModuleSetupError::Failed { module, message: format!("{err:#}") }),
        Err(join) if join.is_panic() => {
            Err(ModuleSetupError::Panicked { module, message: join_failure(join) })
        },
        Err(join) => Err(ModuleSetupError::Failed { module, message: join_failure(join) }),
    }
}

fn join_failure(join: JoinError) -> String {
    if join.is_panic() { panic_message(join.into_panic().as_ref()) } else { join.to_string() }
}
