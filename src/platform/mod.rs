//! Platform Boundary
//!
//! Outbound calls to the host platform: screen broadcasts, launcher UI,
//! quick actions, transient messages and the persistent indicator. All of
//! these are pass-throughs with no logic of their own; the session core
//! only depends on this trait.

pub mod config;

use serde::{Deserialize, Serialize};

use crate::error::FpqaResult;

pub use config::{ConfigStore, MemoryConfig, QuickAction};

/// System broadcasts the session controller listens for while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenBroadcast {
    /// Screen turned on and the user is past the keyguard
    UserPresent,
    /// Screen turned off
    ScreenOff,
}

/// Opaque launch request for a host activity.
///
/// Stashed while a permission prompt is in front and redelivered on the
/// next activation command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchIntent {
    /// Host-defined target identifier
    pub target: String,
}

impl LaunchIntent {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

/// The host-platform surface the session controller drives.
///
/// Implementations perform the real device calls; the controller treats
/// every method as fire-and-forget and never fails an operation because a
/// collaborator did.
pub trait Platform: Send + Sync {
    /// Register a listener for the given screen broadcast.
    fn register_receiver(&self, broadcast: ScreenBroadcast) -> FpqaResult<()>;

    /// Unregister the listener for the given screen broadcast.
    fn unregister_receiver(&self, broadcast: ScreenBroadcast) -> FpqaResult<()>;

    /// Bring up the transient launcher activity that delivers the next
    /// activation command.
    fn present_launcher_ui(&self);

    /// Whether the accessibility capability backing the home/panel quick
    /// actions is currently granted.
    fn is_accessibility_granted(&self) -> bool;

    /// Redirect the user into the accessibility permission flow.
    fn request_accessibility_permission(&self);

    /// Lock and sleep the device.
    fn go_to_sleep(&self);

    /// Navigate to the home screen. Requires accessibility.
    fn go_home(&self);

    /// Expand the system notification panel. Requires accessibility.
    fn expand_notification_panel(&self);

    /// Show a short-lived message to the user.
    fn show_transient_message(&self, text: &str);

    /// Create or replace the persistent foreground indicator.
    fn show_persistent_indicator(&self, text: &str);

    /// Remove the persistent foreground indicator, if shown.
    fn remove_persistent_indicator(&self);

    /// Dispatch a previously stashed launch request.
    fn dispatch_intent(&self, intent: LaunchIntent);

    /// Signal the host that the component may be torn down.
    fn request_teardown(&self);
}
