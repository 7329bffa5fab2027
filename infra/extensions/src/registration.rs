use opshub_domain::ids::ModuleId;
use opshub_domain::lease::ActivationLease;
use opshub_domain::session::{Role, Session};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Synchronous extension handler.
pub type ActionHandler = Arc<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

/// Decides per call whether the current session may run a handler.
pub type Permission = Arc<dyn Fn(&Session) -> bool + Send + Sync>;

/// A handler contribution to one extension point.
#[derive(Clone)]
pub struct ActionRegistration {
    pub(crate) point: String,
    pub(crate) module: ModuleId,
    pub(crate) priority: i32,
    pub(crate) handler: ActionHandler,
    pub(crate) permission: Option<Permission>,
    pub(crate) lease: Option<ActivationLease>,
}

impl ActionRegistration {
    pub fn new<F>(point: impl Into<String>, module: impl Into<ModuleId>, handler: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            point: point.into(),
            module: module.into(),
            priority: 0,
            handler: Arc::new(handler),
            permission: None,
            lease: None,
        }
    }

    /// Higher runs first. Defaults to `0`.
    #[must_use]
    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn permission<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Session) -> bool + Send + Sync + 'static,
    {
        self.permission = Some(Arc::new(predicate));
        self
    }

    /// Shorthand for a permission that requires at least `role`.
    #[must_use]
    pub fn requires_role(self, role: Role) -> Self {
        self.permission(move |session| session.has_role(role))
    }

    #[must_use]
    pub fn with_lease(mut self, lease: ActivationLease) -> Self {
        self.lease = Some(lease);
        self
    }

    #[must_use]
    pub fn point(&self) -> &str {
        &self.point
    }

    #[must_use]
    pub const fn module(&self) -> &ModuleId {
        &self.module
    }
}

impl fmt::Debug for ActionRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistration")
            .field("point", &self.point)
            .field("module", &self.module)
            .field("priority", &self.priority)
            .field("guarded", &self.permission.is_some())
            .field("lease", &self.lease)
            .finish_non_exhaustive()
    }
}
