//! Facade crate for the module host.
//! Re-exports the domain, kernel, orchestrator and registry crates and composes
//! them into a [`Host`]. Keep this crate thin: it wires other crates together
//! and holds no business logic.
//!
//! ## Usage
//! ```rust
//! use opshub::Host;
//! use opshub::domain::manifest::ModuleDescriptor;
//! use opshub::orchestrator::ModuleManifest;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), opshub::HostError> {
//! let host = Host::builder()
//!     .module(ModuleManifest::passive(ModuleDescriptor::new("scheduling").requires(["appointments"])))
//!     .build()?;
//!
//! let report = host.apply(["professional_services"], [""; 0]).await?;
//! assert_eq!(report.activated.len(), 1);
//! assert!(host.current_features().contains("appointments"));
//! # Ok(())
//! # }
//! ```

mod error;
mod host;

pub use error::{HostError, HostErrorExt};
pub use host::{HOST_SOURCE, Host, HostBuilder};

pub use opshub_domain as domain;
pub use opshub_event_bus as events;
pub use opshub_extensions as extensions;
pub use opshub_kernel as kernel;
pub use opshub_orchestrator as orchestrator;
