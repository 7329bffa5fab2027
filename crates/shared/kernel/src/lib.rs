//! Kernel services shared by the orchestrator and the host facade.
//! Keep this crate lightweight: capability resolution, config loading and the session handle.
//!
//! ## Capability resolution
//! ```rust
//! use opshub_kernel::capabilities::CapabilityResolver;
//! use opshub_kernel::domain::catalogue::CapabilityCatalogue;
//!
//! let resolver = CapabilityResolver::new(&CapabilityCatalogue::business_defaults());
//! let features = resolver.resolve(["professional_services"], ["offline_mode"]);
//!
//! assert!(features.contains("appointments"));
//! assert!(!features.contains("online_booking"));
//! ```
//!
//! ## Config loading
//! ```rust,no_run
//! use opshub_kernel::config::load_config;
//! use opshub_kernel::domain::config::HostConfig;
//!
//! let cfg: HostConfig = load_config(Some("opshub.toml")).unwrap();
//! ```
pub mod capabilities;
pub mod config;
pub mod session;

pub use opshub_domain as domain;
