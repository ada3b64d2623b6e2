//! Synchronous in-process event bus.
//!
//! Listeners are registered against opaque event-type strings. Firing an
//! event builds an [`Event`], turns it into an [`EventRecord`] and hands that
//! record to every listener for the type, in registration order, on the
//! caller's thread. No queueing, no background delivery.
//!
//! Consumers bring their own payloads as `serde_json::Value`.

pub mod bus;
pub mod config;
pub mod error;
pub mod listener;
pub mod types;

pub use bus::EventBus;
pub use config::{load_config, BusConfig, FailurePolicy};
pub use error::{EventBusError, ListenerFailure};
pub use listener::Listener;
pub use types::{empty_payload, Event, EventMetadata, EventRecord, EventTypes, Payload};

/// Crate version, as published.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
