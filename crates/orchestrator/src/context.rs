use opshub_domain::features::ResolvedFeatures;
use opshub_domain::ids::ModuleId;
use opshub_domain::lease::ActivationLease;
use opshub_domain::manifest::ModuleDescriptor;
use opshub_domain::session::Session;
use opshub_event_bus::{EventBus, EventBusError, EventEnvelope, SubscribeOptions, Subscription};
use opshub_extensions::{ActionRegistration, Dispatcher, ExtensionError};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// What a module sees during setup and teardown.
///
/// Registrations made through the context are owned by the module and carry
/// its activation lease: once the module leaves `activating`/`active` they are
/// rejected, and everything already registered is removed in bulk.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    descriptor: Arc<ModuleDescriptor>,
    lease: ActivationLease,
    features: ResolvedFeatures,
    extensions: Dispatcher,
    events: EventBus,
}

impl ModuleContext {
    pub(crate) const fn new(
        descriptor: Arc<ModuleDescriptor>,
        lease: ActivationLease,
        features: ResolvedFeatures,
        extensions: Dispatcher,
        events: EventBus,
    ) -> Self {
        Self { descriptor, lease, features, extensions, events }
    }

    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        &self.descriptor.id
    }

    #[must_use]
    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    /// Feature set of the pass that activated the module.
    #[must_use]
    pub const fn features(&self) -> &ResolvedFeatures {
        &self.features
    }

    /// `true` when `feature` is one of the module's optional features and is resolved.
    #[must_use]
    pub fn has_optional_feature(&self, feature: &str) -> bool {
        self.descriptor.optional_features.iter().any(|f| f.as_str() == feature)
            && self.features.contains(feature)
    }

    /// `false` once teardown has started.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.lease.is_live()
    }

    /// Contributes a handler with default priority to `point`.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::add_action`].
    pub fn add_action<F>(&self, point: &str, handler: F) -> Result<(), ExtensionError>
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.add_action_with_priority(point, 0, handler)
    }

    /// # Errors
    ///
    /// See [`Dispatcher::add_action`].
    pub fn add_action_with_priority<F>(
        &self,
        point: &str,
        priority: i32,
        handler: F,
    ) -> Result<(), ExtensionError>
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.extensions.add_action(self.registration(point, handler).priority(priority))
    }

    /// Contributes a handler that only runs when `permission` accepts the current session.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::add_action`].
    pub fn add_guarded_action<F, P>(
        &self,
        point: &str,
        priority: i32,
        permission: P,
        handler: F,
    ) -> Result<(), ExtensionError>
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
        P: Fn(&Session) -> bool + Send + Sync + 'static,
    {
        self.extensions
            .add_action(self.registration(point, handler).priority(priority).permission(permission))
    }

    /// # Errors
    ///
    /// See [`EventBus::subscribe`].
    pub fn subscribe<F, Fut>(&self, event: &str, handler: F) -> Result<Subscription, EventBusError>
    where
        F: Fn(EventEnvelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.subscribe_with_priority(event, 0, handler)
    }

    /// # Errors
    ///
    /// See [`EventBus::subscribe`].
    pub fn subscribe_with_priority<F, Fut>(
        &self,
        event: &str,
        priority: i32,
        handler: F,
    ) -> Result<Subscription, EventBusError>
    where
        F: Fn(EventEnvelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let options = SubscribeOptions::new(self.module_id().clone())
            .priority(priority)
            .with_lease(self.lease.clone());
        self.events.subscribe(event, options, handler)
    }

    /// Emits `event` with this module as the source.
    pub fn emit(&self, event: &str, payload: Value) -> usize {
        self.events.emit(event, payload, self.module_id().clone())
    }

    pub(crate) const fn lease(&self) -> &ActivationLease {
        &self.lease
    }

    fn registration<F>(&self, point: &str, handler: F) -> ActionRegistration
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        ActionRegistration::new(point, self.module_id().clone(), handler)
            .with_lease(self.lease.clone())
    }
}
