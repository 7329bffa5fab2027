use crate::error::{HostError, HostErrorExt};
use opshub_domain::catalogue::CapabilityCatalogue;
use opshub_domain::config::HostConfig;
use opshub_domain::features::ResolvedFeatures;
use opshub_domain::session::{Session, SessionSource};
use opshub_kernel::capabilities::CapabilityResolver;
use opshub_kernel::config::load_config;
use opshub_kernel::session::SharedSession;
use opshub_orchestrator::{
    ActivationReport, Events, Extensions, ModuleManifest, Orchestrator, OrchestratorConfig,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

/// Source id used for events emitted by the host itself.
pub const HOST_SOURCE: &str = "host";

#[derive(Debug, Default)]
pub struct HostBuilder {
    config: HostConfig,
    catalogue: Option<CapabilityCatalogue>,
    manifests: Vec<ModuleManifest>,
    session: Session,
    session_source: Option<Arc<dyn SessionSource>>,
}

impl HostBuilder {
    #[must_use]
    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides both the configured and the built-in catalogue.
    #[must_use]
    pub fn catalogue(mut self, catalogue: CapabilityCatalogue) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    #[must_use]
    pub fn module(mut self, manifest: ModuleManifest) -> Self {
        self.manifests.push(manifest);
        self
    }

    #[must_use]
    pub fn modules(mut self, manifests: impl IntoIterator<Item = ModuleManifest>) -> Self {
        self.manifests.extend(manifests);
        self
    }

    /// Initial session; replace it later with [`Host::set_session`].
    #[must_use]
    pub fn session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// Session source owned by the embedding application. Takes precedence over
    /// [`session`](Self::session) until [`Host::set_session`] is called.
    #[must_use]
    pub fn session_source(mut self, source: Arc<dyn SessionSource>) -> Self {
        self.session_source = Some(source);
        self
    }

    /// Compiles the catalogue and registers every manifest.
    ///
    /// Code manifests are registered first, in the order given; descriptors
    /// from the configuration are then registered as passive modules unless a
    /// code manifest already uses their id.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Orchestrator`] if two code manifests share an id.
    pub fn build(self) -> Result<Host, HostError> {
        let Self { config, catalogue, manifests, session, session_source } = self;

        let catalogue = catalogue
            .or_else(|| config.catalogue.clone())
            .unwrap_or_else(CapabilityCatalogue::business_defaults);
        let resolver = CapabilityResolver::new(&catalogue);

        let session = SharedSession::new(session);
        let source: Arc<dyn SessionSource> = match session_source {
            Some(source) => source,
            None => Arc::new(session.clone()),
        };
        let orchestrator =
            Orchestrator::with_session_source(OrchestratorConfig::from(&config.orchestrator), source);

        for manifest in manifests {
            orchestrator.register(manifest).context("Registering code manifest")?;
        }
        for descriptor in &config.modules {
            if orchestrator.module_state(descriptor.id.as_str()).is_some() {
                debug!(module = %descriptor.id, "Configured descriptor shadowed by code manifest");
                continue;
            }
            orchestrator
                .register(ModuleManifest::passive(descriptor.clone()))
                .context("Registering configured module")?;
        }

        let (features, _) = watch::channel(ResolvedFeatures::empty());
        info!(modules = orchestrator.list_modules().len(), "Host built");

        Ok(Host {
            inner: Arc::new(HostInner {
                config,
                resolver,
                orchestrator,
                session,
                features,
                apply: Mutex::new(()),
            }),
        })
    }
}

#[derive(Debug)]
struct HostInner {
    config: HostConfig,
    resolver: CapabilityResolver,
    orchestrator: Orchestrator,
    session: SharedSession,
    features: watch::Sender<ResolvedFeatures>,
    /// Held from activation to publish; the published set always belongs to
    /// the last completed pass.
    apply: Mutex<()>,
}

/// Capability resolver and orchestrator behind one handle.
#[derive(Debug, Clone)]
pub struct Host {
    inner: Arc<HostInner>,
}

impl Host {
    #[must_use]
    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    /// Builder preloaded with the configuration at `path` (plus `OPSHUB__` overrides).
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Config`] if the configuration cannot be loaded.
    pub fn builder_from_file(path: impl AsRef<Path>) -> Result<HostBuilder, HostError> {
        let config: HostConfig = load_config(Some(path)).context("Loading host config")?;
        Ok(HostBuilder::default().config(config))
    }

    /// Resolves the selection, reconciles modules and publishes the new feature set.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Orchestrator`] on a dependency cycle; the published
    /// feature set is left unchanged in that case.
    pub async fn apply<C, I>(
        &self,
        capabilities: C,
        infrastructure: I,
    ) -> Result<ActivationReport, HostError>
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let features = self.inner.resolver.resolve(capabilities, infrastructure);
        let _apply = self.inner.apply.lock().await;
        let report = self.inner.orchestrator.activate(&features).await?;
        self.inner.features.send_replace(features);
        Ok(report)
    }

    /// [`apply`](Self::apply) with the selection from the configuration.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    pub async fn apply_configured(&self) -> Result<ActivationReport, HostError> {
        let selection = self.inner.config.selection.clone();
        self.apply(&selection.capabilities, &selection.infrastructure).await
    }

    /// Resolves without touching module state.
    pub fn resolve<C, I>(&self, capabilities: C, infrastructure: I) -> ResolvedFeatures
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.inner.resolver.resolve(capabilities, infrastructure)
    }

    /// Feature set of the last successful [`apply`](Self::apply).
    #[must_use]
    pub fn current_features(&self) -> ResolvedFeatures {
        self.inner.features.borrow().clone()
    }

    #[must_use]
    pub fn watch_features(&self) -> watch::Receiver<ResolvedFeatures> {
        self.inner.features.subscribe()
    }

    /// Replaces the session permission predicates are checked against.
    pub fn set_session(&self, session: Session) {
        self.inner.session.replace(session);
        self.inner.orchestrator.set_session_source(Arc::new(self.inner.session.clone()));
    }

    pub fn invoke(&self, point: &str, payload: &Value) -> Vec<Option<Value>> {
        self.inner.orchestrator.extensions().invoke(point, payload)
    }

    /// Emits `event` with the host as source.
    pub fn emit(&self, event: &str, payload: Value) -> usize {
        self.inner.orchestrator.events().emit(event, payload, HOST_SOURCE)
    }

    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn resolver(&self) -> &CapabilityResolver {
        &self.inner.resolver
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }

    /// Invoke and inspect extension points.
    ///
    /// Actions belong to their module and cannot be removed from outside:
    ///
    /// ```compile_fail
    /// let host = opshub::Host::builder().build().unwrap();
    /// host.extensions().clear();
    /// ```
    #[must_use]
    pub fn extensions(&self) -> Extensions {
        self.inner.orchestrator.extensions()
    }

    /// Emit, subscribe and inspect events.
    ///
    /// ```compile_fail
    /// let host = opshub::Host::builder().build().unwrap();
    /// host.events().unsubscribe_module("scheduling");
    /// ```
    #[must_use]
    pub fn events(&self) -> Events {
        self.inner.orchestrator.events()
    }

    /// Tears down every module and publishes an empty feature set.
    pub async fn shutdown(&self) -> usize {
        let _apply = self.inner.apply.lock().await;
        let torn_down = self.inner.orchestrator.shutdown().await;
        self.inner.features.send_replace(ResolvedFeatures::empty());
        info!(modules = torn_down, "Host shut down");
        torn_down
    }
}
