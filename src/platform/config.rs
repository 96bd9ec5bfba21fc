//! Configuration Access
//!
//! Pull-based preference reads. The storage backend is external; the
//! session core reads every value fresh and caches nothing.

use log::warn;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Show the persistent foreground indicator while the session is running
pub const PREF_FOREGROUND_SERVICE: &str = "pref_foreground_service";
/// Only dispatch the quick action for enrolled-fingerprint matches
pub const PREF_RESPOND_ENROLLED_ONLY: &str = "pref_respond_enrolled_only";
/// Surface sensor error text as a transient message
pub const PREF_NOTIFY_ON_ERROR: &str = "pref_notify_on_error";
/// Which quick action a qualifying touch performs
pub const PREF_QUICK_ACTION: &str = "pref_quick_action";
/// Master switch for the whole capability
pub const PREF_ENABLE_QUICK_ACTION: &str = "pref_enable_quick_action";

/// The device action performed on a qualifying fingerprint touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    /// Lock and sleep the device
    Sleep,
    /// Go to the home screen
    Home,
    /// Expand the system notification panel
    ExpandPanel,
}

impl Default for QuickAction {
    fn default() -> Self {
        Self::Sleep
    }
}

impl QuickAction {
    /// Preference-value spelling of this action.
    pub fn as_config_value(self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Home => "home",
            Self::ExpandPanel => "expand_panel",
        }
    }

    /// Parse a preference value. Unrecognized values fall back to the
    /// default with a warning rather than silently dropping the touch.
    pub fn from_config_value(raw: &str) -> Self {
        match raw {
            "sleep" => Self::Sleep,
            "home" => Self::Home,
            "expand_panel" => Self::ExpandPanel,
            other => {
                warn!(
                    "Unrecognized {} value {:?}, falling back to sleep",
                    PREF_QUICK_ACTION, other
                );
                Self::default()
            }
        }
    }
}

/// Read access to the external preference store.
///
/// Every read reflects the current stored value; implementations must not
/// require the core to observe change notifications for plain reads.
pub trait ConfigStore: Send + Sync {
    /// Read a boolean preference, with a default for unset keys.
    fn get_bool(&self, key: &str, default: bool) -> bool;

    /// Read a string preference, with a default for unset keys.
    fn get_string(&self, key: &str, default: &str) -> String;
}

impl dyn ConfigStore {
    /// Read the configured quick action (default: sleep).
    pub fn quick_action(&self) -> QuickAction {
        let raw = self.get_string(PREF_QUICK_ACTION, QuickAction::default().as_config_value());
        QuickAction::from_config_value(&raw)
    }
}

/// In-memory preference store for tests and the simulator.
#[derive(Debug, Default)]
pub struct MemoryConfig {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a boolean preference.
    pub fn set_bool(&self, key: &str, value: bool) {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
    }

    /// Store a string preference.
    pub fn set_string(&self, key: &str, value: &str) {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
    }
}

impl ConfigStore for MemoryConfig {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .read()
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.values
            .read()
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}
