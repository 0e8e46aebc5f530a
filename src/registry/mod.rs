//! Host-side registries exposed to scripts.
//!
//! Actions are request/response style functions a script runs by name;
//! events are fire-and-forget notifications fanned out to subscribers.

pub mod action;
pub mod event;

pub use action::{ActionRegistry, ActionShape};
pub use event::{EventBus, SubscriptionId};
