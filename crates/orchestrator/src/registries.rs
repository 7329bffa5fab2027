//! Outward views of the registries owned by an [`Orchestrator`](crate::Orchestrator).
//!
//! Callers can invoke, emit, subscribe and inspect. Removing entries stays with
//! the orchestrator, so an action or module subscription lives exactly as long
//! as its module is active.

use opshub_domain::ids::ModuleId;
use opshub_event_bus::{
    EventBus, EventBusError, EventEnvelope, SubscribeOptions, SubscriberInfo, Subscription,
};
use opshub_extensions::{ActionInfo, Dispatcher};
use serde_json::Value;
use std::future::Future;

/// Invocation and introspection of extension points.
#[derive(Debug, Clone)]
pub struct Extensions {
    dispatcher: Dispatcher,
}

impl Extensions {
    pub(crate) const fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// See [`Dispatcher::invoke`].
    pub fn invoke(&self, point: &str, payload: &Value) -> Vec<Option<Value>> {
        self.dispatcher.invoke(point, payload)
    }

    pub fn invoke_values(&self, point: &str, payload: &Value) -> Vec<Value> {
        self.dispatcher.invoke_values(point, payload)
    }

    #[must_use]
    pub fn list_actions(&self, point: &str) -> Vec<ActionInfo> {
        self.dispatcher.list_actions(point)
    }

    #[must_use]
    pub fn points(&self) -> Vec<String> {
        self.dispatcher.points()
    }

    #[must_use]
    pub fn action_count(&self) -> usize {
        self.dispatcher.action_count()
    }
}

/// Emission, subscription and introspection of the event bus.
#[derive(Debug, Clone)]
pub struct Events {
    bus: EventBus,
}

impl Events {
    pub(crate) const fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    /// See [`EventBus::emit`].
    pub fn emit(&self, event: &str, payload: Value, source: impl Into<ModuleId>) -> usize {
        self.bus.emit(event, payload, source)
    }

    /// Subscribes outside of a module lifecycle. The subscription is dropped
    /// with the module named in `options` when that module is torn down.
    ///
    /// # Errors
    ///
    /// See [`EventBus::subscribe`].
    pub fn subscribe<F, Fut>(
        &self,
        event: &str,
        options: SubscribeOptions,
        handler: F,
    ) -> Result<Subscription, EventBusError>
    where
        F: Fn(EventEnvelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.bus.subscribe(event, options, handler)
    }

    #[must_use]
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.bus.subscriber_count(event)
    }

    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.bus.events()
    }

    #[must_use]
    pub fn subscribers(&self, event: &str) -> Vec<SubscriberInfo> {
        self.bus.subscribers(event)
    }
}
