//! Session Management Module
//!
//! The scanning-session state machine:
//! - Controller lifecycle with idempotent start/stop
//! - Debounced bus subscriptions scoped to the running interval
//! - Authentication outcome handling and quick-action dispatch
//! - Foreground indicator projection

pub mod controller;
pub mod events;
pub mod state;

pub use controller::{ScanSessionController, DEBOUNCE_WINDOW};
pub use events::{BusEvent, EventBus};
pub use state::{Effect, SessionState, StartDirective};
