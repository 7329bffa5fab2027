use crate::bus::BusState;
use std::sync::{Arc, Weak};

/// Handle returned by [`EventBus::subscribe`](crate::EventBus::subscribe).
///
/// Dropping the handle keeps the subscription alive; call [`unsubscribe`](Self::unsubscribe)
/// or remove the owning module to end it. The handle does not keep the bus alive.
#[derive(Debug, Clone)]
pub struct Subscription {
    state: Weak<BusState>,
    event: Arc<str>,
    id: u64,
}

impl Subscription {
    pub(crate) const fn new(state: Weak<BusState>, event: Arc<str>, id: u64) -> Self {
        Self { state, event, id }
    }

    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Removes the subscription. Returns `false` if it was already gone, so
    /// repeated calls are harmless.
    pub fn unsubscribe(&self) -> bool {
        self.state.upgrade().is_some_and(|state| state.remove(&self.event, self.id))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.upgrade().is_some_and(|state| state.contains(&self.event, self.id))
    }
}
