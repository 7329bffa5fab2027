use crate::error::ExtensionError;
use crate::registration::{ActionHandler, ActionRegistration, Permission};
use fxhash::FxHashMap;
use opshub_domain::ids::ModuleId;
use opshub_domain::panic::panic_message;
use opshub_domain::session::{Session, SessionSource};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, trace, warn};

/// Read-only view of one registered action, in invocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionInfo {
    pub point: String,
    pub module: ModuleId,
    pub priority: i32,
    /// Global registration counter; breaks priority ties.
    pub sequence: u64,
    /// Whether a permission predicate is attached.
    pub guarded: bool,
}

struct Action {
    sequence: u64,
    module: ModuleId,
    priority: i32,
    handler: ActionHandler,
    permission: Option<Permission>,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("sequence", &self.sequence)
            .field("module", &self.module)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Registry {
    points: RwLock<FxHashMap<Arc<str>, Vec<Arc<Action>>>>,
    sequence: AtomicU64,
    session: RwLock<Arc<dyn SessionSource>>,
}

/// Cheaply cloneable handle to a shared action registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_session_source(Arc::new(Session::anonymous()))
    }
}

impl Dispatcher {
    /// Dispatcher whose permission predicates see an anonymous session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session_source(source: Arc<dyn SessionSource>) -> Self {
        Self {
            registry: Arc::new(Registry {
                points: RwLock::new(FxHashMap::default()),
                sequence: AtomicU64::new(0),
                session: RwLock::new(source),
            }),
        }
    }

    /// Replaces the session source for subsequent invocations.
    pub fn set_session_source(&self, source: Arc<dyn SessionSource>) {
        *self.registry.session.write() = source;
    }

    /// Registers a handler under its extension point.
    ///
    /// # Errors
    ///
    /// * [`ExtensionError::InvalidPointName`] if the point is not `<domain>.<point>`.
    /// * [`ExtensionError::ModuleNotActive`] if the registration carries a revoked lease.
    pub fn add_action(&self, registration: ActionRegistration) -> Result<(), ExtensionError> {
        validate_point_name(&registration.point)?;

        let ActionRegistration { point, module, priority, handler, permission, lease } =
            registration;
        let guarded = permission.is_some();

        let sequence = {
            let mut points = self.registry.points.write();

            if let Some(lease) = &lease
                && !lease.is_live()
            {
                return Err(ExtensionError::ModuleNotActive {
                    message: module.to_string().into(),
                    context: Some(format!("Adding action to '{point}'").into()),
                });
            }

            let sequence = self.registry.sequence.fetch_add(1, Ordering::Relaxed);
            let actions = points.entry(Arc::from(point.as_str())).or_default();
            let position = actions.partition_point(|a| a.priority >= priority);
            actions.insert(
                position,
                Arc::new(Action { sequence, module: module.clone(), priority, handler, permission }),
            );
            sequence
        };

        trace!(point = %point, module = %module, priority, sequence, guarded, "Action registered");
        Ok(())
    }

    /// Runs every handler of `point` and returns one slot per handler.
    ///
    /// Slots are `None` for handlers skipped by their permission predicate and
    /// for handlers that failed or panicked. Unknown points yield an empty vector.
    pub fn invoke(&self, point: &str, payload: &Value) -> Vec<Option<Value>> {
        let actions = self.snapshot(point);
        if actions.is_empty() {
            trace!(point, "Extension point has no actions");
            return Vec::new();
        }

        let source = Arc::clone(&*self.registry.session.read());
        let session = source.current();

        actions.iter().map(|action| run(point, action, &session, payload)).collect()
    }

    /// Like [`invoke`](Self::invoke), keeping only present results.
    pub fn invoke_values(&self, point: &str, payload: &Value) -> Vec<Value> {
        self.invoke(point, payload).into_iter().flatten().collect()
    }

    /// Removes every action owned by `module`; returns how many were removed.
    pub fn remove_module(&self, module: &ModuleId) -> usize {
        let mut removed = 0;
        self.registry.points.write().retain(|_, actions| {
            let before = actions.len();
            actions.retain(|a| &a.module != module);
            removed += before - actions.len();
            !actions.is_empty()
        });

        if removed > 0 {
            debug!(module = %module, removed, "Module actions removed");
        }
        removed
    }

    #[must_use]
    pub fn list_actions(&self, point: &str) -> Vec<ActionInfo> {
        self.snapshot(point)
            .iter()
            .map(|a| ActionInfo {
                point: point.to_owned(),
                module: a.module.clone(),
                priority: a.priority,
                sequence: a.sequence,
                guarded: a.permission.is_some(),
            })
            .collect()
    }

    /// Points with at least one action, sorted.
    #[must_use]
    pub fn points(&self) -> Vec<String> {
        let mut points: Vec<String> =
            self.registry.points.read().keys().map(ToString::to_string).collect();
        points.sort_unstable();
        points
    }

    #[must_use]
    pub fn action_count(&self) -> usize {
        self.registry.points.read().values().map(Vec::len).sum()
    }

    /// Drops all actions; returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut points = self.registry.points.write();
        let removed = points.values().map(Vec::len).sum();
        points.clear();
        removed
    }

    fn snapshot(&self, point: &str) -> Vec<Arc<Action>> {
        self.registry.points.read().get(point).cloned().unwrap_or_default()
    }
}

fn run(point: &str, action: &Action, session: &Session, payload: &Value) -> Option<Value> {
    if let Some(permission) = &action.permission {
        match catch_unwind(AssertUnwindSafe(|| permission(session))) {
            Ok(true) => {},
            Ok(false) => {
                trace!(point, module = %action.module, "Action skipped by permission");
                return None;
            },
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(point, module = %action.module, panic = %message, "Permission predicate panicked");
                return None;
            },
        }
    }

    match catch_unwind(AssertUnwindSafe(|| (action.handler)(payload))) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            let message = format!("{err:#}");
            warn!(point, module = %action.module, error = %message, "Action handler failed");
            None
        },
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(point, module = %action.module, panic = %message, "Action handler panicked");
            None
        },
    }
}

/// `<domain>.<point>`: at least two non-empty dot-separated segments of
/// ASCII alphanumerics, `_` or `-`.
fn validate_point_name(point: &str) -> Result<(), ExtensionError> {
    let segments: Vec<&str> = point.split('.').collect();
    let well_formed = segments.len() >= 2
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        });

    if well_formed {
        Ok(())
    } else {
        Err(ExtensionError::InvalidPointName {
            message: point.to_owned().into(),
            context: Some("expected '<domain>.<point>'".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_names() {
        assert!(validate_point_name("dashboard.widgets").is_ok());
        assert!(validate_point_name("sales.line-items.tax").is_ok());
        assert!(validate_point_name("dashboard").is_err());
        assert!(validate_point_name("dashboard.").is_err());
        assert!(validate_point_name(".widgets").is_err());
        assert!(validate_point_name("dash board.widgets").is_err());
    }
}
