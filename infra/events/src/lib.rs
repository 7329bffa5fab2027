//! # Event Bus
//!
//! Named, asynchronous publish/subscribe channel for cross-module notifications.
//!
//! ## Overview
//!
//! Subscribers register a handler under an event name with an owning module id
//! and a priority. [`EventBus::emit`] returns immediately: every subscriber
//! present at emission time gets its own `tokio` task, scheduled in priority
//! order (higher first, ties in subscription order). Handlers run concurrently,
//! so the order in which they *finish* is not defined.
//!
//! ## Features
//!
//! * **Fire-and-forget**: the emitter never waits and never sees handler results.
//! * **Isolation**: an erroring or panicking handler is logged and affects no one else.
//! * **Snapshot delivery**: subscriptions added or removed during an emission do
//!   not change who receives it.
//! * **Bulk cleanup**: [`EventBus::unsubscribe_module`] drops everything a module owns.
//! * **High Performance**: `FxHashMap` + `parking_lot::RwLock`.
//!
//! # Example
//!
//! ```rust
//! use opshub_event_bus::{EventBus, EventBusError, SubscribeOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!
//!     bus.subscribe("sales.completed", SubscribeOptions::new("inventory"), move |event| {
//!         let tx = tx.clone();
//!         async move {
//!             tx.send(event.payload["total"].clone())?;
//!             Ok(())
//!         }
//!     })?;
//!
//!     assert_eq!(bus.emit("sales.completed", json!({ "total": 42 }), "point-of-sale"), 1);
//!     assert_eq!(rx.recv().await, Some(json!(42)));
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod subscription;

pub use bus::{EventBus, EventEnvelope, HandlerFuture, SubscribeOptions, SubscriberInfo};
pub use error::{EventBusError, EventBusErrorExt};
pub use subscription::Subscription;
