//! Fingerprint quick-action session core.
//!
//! Turns a fingerprint-sensor touch into a configured quick action (sleep,
//! home, expand the notification panel) while the screen is on, without
//! unlocking. The crate owns the scanning-session state machine; every
//! platform effect — launcher UI, device actions, messages, the indicator,
//! preference storage and the sensor itself — sits behind injected traits.

// Declare modules
pub mod error;
pub mod platform;
pub mod sensor;
pub mod session;

pub use error::{FpqaError, FpqaResult};
pub use platform::{ConfigStore, LaunchIntent, MemoryConfig, Platform, QuickAction, ScreenBroadcast};
pub use sensor::{AuthError, AuthOutcome, FingerprintReader};
pub use session::{BusEvent, EventBus, ScanSessionController, StartDirective};
