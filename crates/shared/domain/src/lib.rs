//! # Domain Models
//!
//! Pure data shared by every crate of the module host: opaque identifiers,
//! roles and sessions, activation states, module descriptors and configuration.
//! Keep it lean: no I/O, no locking, no resolution logic, just data and simple helpers.

pub mod catalogue;
pub mod config;
pub mod constants;
pub mod features;
pub mod ids;
pub mod lease;
pub mod manifest;
pub mod panic;
pub mod session;
pub mod state;
