use crate::error::EventBusError;
use crate::subscription::Subscription;
use futures::FutureExt;
use fxhash::FxHashMap;
use opshub_domain::ids::ModuleId;
use opshub_domain::lease::ActivationLease;
use opshub_domain::panic::panic_message;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tracing::{debug, error, trace, warn};

/// Boxed future returned by every stored handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

type Handler = Arc<dyn Fn(EventEnvelope) -> HandlerFuture + Send + Sync>;

/// One delivery of an emitted event.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub event: Arc<str>,
    /// Shared by all deliveries of the same emission.
    pub payload: Arc<Value>,
    /// Module that emitted the event.
    pub source: ModuleId,
}

/// Owner, priority and optional lease of a new subscription.
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    module: ModuleId,
    priority: i32,
    lease: Option<ActivationLease>,
}

impl SubscribeOptions {
    pub fn new(module: impl Into<ModuleId>) -> Self {
        Self { module: module.into(), priority: 0, lease: None }
    }

    #[must_use]
    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Reject the subscription once the lease is revoked.
    #[must_use]
    pub fn with_lease(mut self, lease: ActivationLease) -> Self {
        self.lease = Some(lease);
        self
    }
}

/// Read-only view of one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberInfo {
    pub event: String,
    pub module: ModuleId,
    pub priority: i32,
}

struct Subscriber {
    id: u64,
    module: ModuleId,
    priority: i32,
    handler: Handler,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("module", &self.module)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Shared registry behind every [`EventBus`] clone.
///
/// Each topic keeps its subscribers sorted by priority, highest first; equal
/// priorities stay in subscription order.
#[derive(Debug, Default)]
pub(crate) struct BusState {
    topics: RwLock<FxHashMap<Arc<str>, Vec<Arc<Subscriber>>>>,
    next_id: AtomicU64,
}

impl BusState {
    pub(crate) fn remove(&self, event: &str, id: u64) -> bool {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(event) else {
            return false;
        };

        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;

        if subscribers.is_empty() {
            topics.remove(event);
        }
        removed
    }

    pub(crate) fn contains(&self, event: &str, id: u64) -> bool {
        self.topics.read().get(event).is_some_and(|subs| subs.iter().any(|s| s.id == id))
    }
}

/// Cheaply cloneable handle to a shared subscriber registry.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    state: Arc<BusState>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event`.
    ///
    /// # Errors
    ///
    /// * [`EventBusError::InvalidEventName`] if the name is empty or contains whitespace.
    /// * [`EventBusError::ModuleNotActive`] if the options carry a revoked lease.
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
        validate_event_name(event)?;

        let SubscribeOptions { module, priority, lease } = options;
        let handler: Handler = Arc::new(move |envelope| Box::pin(handler(envelope)));
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        let topic: Arc<str> = Arc::from(event);

        {
            let mut topics = self.state.topics.write();

            // Checked under the write lock so a concurrent revoke cannot slip in between.
            if let Some(lease) = &lease
                && !lease.is_live()
            {
                return Err(EventBusError::ModuleNotActive {
                    message: module.to_string().into(),
                    context: Some(format!("Subscribing to '{event}'").into()),
                });
            }

            let subscribers = topics.entry(Arc::clone(&topic)).or_default();
            let position = subscribers.partition_point(|s| s.priority >= priority);
            subscribers
                .insert(position, Arc::new(Subscriber { id, module: module.clone(), priority, handler }));
        }

        trace!(event, module = %module, priority, "Subscriber registered");
        Ok(Subscription::new(Arc::downgrade(&self.state), topic, id))
    }

    /// Schedules one delivery per current subscriber and returns how many were scheduled.
    ///
    /// Returns `0` without delivering when called outside a `tokio` runtime.
    pub fn emit(&self, event: &str, payload: Value, source: impl Into<ModuleId>) -> usize {
        let subscribers = self.snapshot(event);
        if subscribers.is_empty() {
            trace!(event, "Event has no subscribers");
            return 0;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!(
                event,
                subscribers = subscribers.len(),
                "Event dropped: emitted outside of a tokio runtime"
            );
            return 0;
        };

        let event: Arc<str> = Arc::from(event);
        let payload = Arc::new(payload);
        let source = source.into();

        for subscriber in &subscribers {
            let envelope = EventEnvelope {
                event: Arc::clone(&event),
                payload: Arc::clone(&payload),
                source: source.clone(),
            };
            runtime.spawn(deliver(Arc::clone(subscriber), envelope));
        }

        debug!(event = %event, source = %source, deliveries = subscribers.len(), "Event emitted");
        subscribers.len()
    }

    /// Removes every subscription owned by `module`; returns how many were removed.
    pub fn unsubscribe_module(&self, module: &ModuleId) -> usize {
        let mut removed = 0;
        self.state.topics.write().retain(|_, subscribers| {
            let before = subscribers.len();
            subscribers.retain(|s| &s.module != module);
            removed += before - subscribers.len();
            !subscribers.is_empty()
        });

        if removed > 0 {
            debug!(module = %module, removed, "Module subscriptions removed");
        }
        removed
    }

    #[must_use]
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.state.topics.read().get(event).map_or(0, Vec::len)
    }

    /// Event names with at least one subscriber, sorted.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        let mut events: Vec<String> =
            self.state.topics.read().keys().map(ToString::to_string).collect();
        events.sort_unstable();
        events
    }

    /// Subscriptions of `event` in delivery order.
    #[must_use]
    pub fn subscribers(&self, event: &str) -> Vec<SubscriberInfo> {
        self.snapshot(event)
            .iter()
            .map(|s| SubscriberInfo {
                event: event.to_owned(),
                module: s.module.clone(),
                priority: s.priority,
            })
            .collect()
    }

    /// Drops all subscriptions. Deliveries already spawned still run.
    pub fn shutdown(&self) -> usize {
        let mut topics = self.state.topics.write();
        let removed = topics.values().map(Vec::len).sum();
        topics.clear();
        drop(topics);

        debug!(removed, "Event bus cleared");
        removed
    }

    fn snapshot(&self, event: &str) -> Vec<Arc<Subscriber>> {
        self.state.topics.read().get(event).cloned().unwrap_or_default()
    }
}

async fn deliver(subscriber: Arc<Subscriber>, envelope: EventEnvelope) {
    let event = Arc::clone(&envelope.event);
    let outcome = AssertUnwindSafe(async { (subscriber.handler)(envelope).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => trace!(event = %event, module = %subscriber.module, "Event delivered"),
        Ok(Err(err)) => {
            let message = format!("{err:#}");
            warn!(event = %event, module = %subscriber.module, error = %message, "Event handler failed");
        },
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(event = %event, module = %subscriber.module, panic = %message, "Event handler panicked");
        },
    }
}

fn validate_event_name(event: &str) -> Result<(), EventBusError> {
    if event.is_empty() {
        return Err(EventBusError::InvalidEventName {
            message: "event name is empty".into(),
            context: None,
        });
    }
    if event.chars().any(char::is_whitespace) {
        return Err(EventBusError::InvalidEventName {
            message: format!("'{event}' contains whitespace").into(),
            context: None,
        });
    }
    Ok(())
}
