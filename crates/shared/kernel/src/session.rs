use opshub_domain::session::{Session, SessionSource};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Session handle the embedding application updates in place.
///
/// Clones share the same slot; permission predicates evaluated after
/// [`SharedSession::replace`] see the new session.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<RwLock<Session>>,
}

impl SharedSession {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { inner: Arc::new(RwLock::new(session)) }
    }

    /// Swaps in a new session and returns the previous one.
    pub fn replace(&self, session: Session) -> Session {
        debug!(role = ?session.role, "Session replaced");
        std::mem::replace(&mut *self.inner.write(), session)
    }
}

impl SessionSource for SharedSession {
    fn current(&self) -> Session {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opshub_domain::session::Role;

    #[test]
    fn clones_observe_replacement() {
        let session = SharedSession::default();
        let observer = session.clone();
        assert_eq!(observer.current().role, None);

        let previous = session.replace(Session::with_role(Role::Manager));

        assert_eq!(previous, Session::anonymous());
        assert!(observer.current().has_role(Role::Staff));
    }
}
