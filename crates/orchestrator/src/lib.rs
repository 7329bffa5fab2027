//! # Orchestrator
//!
//! Registry of module manifests and the activation pass that reconciles module
//! states with a resolved feature set.
//!
//! A module is *eligible* when every required feature is resolved and every
//! dependency is active. [`Orchestrator::activate`] tears down modules that
//! lost eligibility (dependents before dependencies), then sets up eligible
//! modules in dependency order (ties in registration order). Setup failures,
//! panics and timeouts are contained: the module ends in `error`, anything it
//! registered is rolled back, and the pass continues. A dependency cycle
//! aborts the pass before any module changes state.
//!
//! ```rust
//! use opshub_domain::manifest::ModuleDescriptor;
//! use opshub_domain::features::ResolvedFeatures;
//! use opshub_domain::ids::Feature;
//! use opshub_orchestrator::{ModuleManifest, Orchestrator};
//! use serde_json::{json, Value};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let orchestrator = Orchestrator::default();
//! orchestrator.register(ModuleManifest::from_fn(
//!     ModuleDescriptor::new("scheduling").requires(["appointments"]),
//!     |ctx| async move {
//!         ctx.add_action("dashboard.widgets", |_: &Value| Ok(json!("today")))?;
//!         Ok(())
//!     },
//! ))?;
//!
//! let features: ResolvedFeatures = [Feature::from("appointments")].into_iter().collect();
//! let report = orchestrator.activate(&features).await?;
//!
//! assert_eq!(report.activated.len(), 1);
//! assert_eq!(orchestrator.extensions().invoke_values("dashboard.widgets", &Value::Null), [json!("today")]);
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod graph;
mod manifest;
mod orchestrator;
mod registries;
mod report;

pub use context::ModuleContext;
pub use error::{ModuleSetupError, OrchestratorError, OrchestratorErrorExt};
pub use manifest::{Lifecycle, LifecycleFn, ModuleManifest, Passive};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use registries::{Events, Extensions};
pub use report::{ActivationReport, ModuleSnapshot};

pub use async_trait::async_trait;
