//! # Extensions
//!
//! Named extension points that modules contribute synchronous handlers to.
//!
//! [`Dispatcher::invoke`] runs every handler registered under a point, highest
//! priority first (equal priorities in registration order), and returns one
//! slot per handler. A slot is `None` when the handler's permission predicate
//! rejects the current [`Session`](opshub_domain::session::Session) or when
//! the handler fails or panics; the remaining handlers still run.
//!
//! Handlers are snapshotted before the first one runs and no lock is held
//! while they execute, so handlers may register actions or invoke other points.
//!
//! ```rust
//! use opshub_extensions::{ActionRegistration, Dispatcher};
//! use serde_json::{json, Value};
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher
//!     .add_action(ActionRegistration::new("dashboard.widgets", "inventory", |_: &Value| {
//!         Ok(json!("stock-levels"))
//!     }))
//!     .unwrap();
//!
//! assert_eq!(dispatcher.invoke("dashboard.widgets", &Value::Null), [Some(json!("stock-levels"))]);
//! ```

mod dispatcher;
mod error;
mod registration;

pub use dispatcher::{ActionInfo, Dispatcher};
pub use error::{ExtensionError, ExtensionErrorExt};
pub use registration::{ActionHandler, ActionRegistration, Permission};
