//! Session State
//!
//! Leaf state of the scan session. Everything here is mutated by the
//! controller only; transitions that other parts of the app must observe
//! return the follow-up explicitly instead of firing it from a setter.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::events::BusEvent;
use crate::platform::LaunchIntent;

/// Directive returned to the host from the activation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartDirective {
    /// Keep the component alive and redeliver activation after a host
    /// restart
    Sticky,
}

/// Follow-up a state transition requires of the caller.
///
/// Returned rather than performed so the side effect is visible at every
/// call site, and so transitions stay testable in isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Effect {
    /// Publish this event on the bus
    Publish(BusEvent),
    /// Recompute the foreground indicator projection
    RefreshIndicator,
}

/// Mutable state of the scan session.
///
/// Invariants: `is_scanning` implies a live, non-cancelled sensor-read
/// request bound to `cancel`; `!is_running` implies no registered
/// receivers, no bus subscriptions and a cancelled `cancel`.
#[derive(Debug)]
pub struct SessionState {
    /// Receivers registered and bus subscriptions live
    pub is_running: bool,
    /// A sensor-read attempt is outstanding
    pub is_scanning: bool,
    /// The last attempt ended in a (non-self-induced) error
    pub is_error: bool,
    /// Debounced copy of `is_scanning`, read by the activity stream's
    /// pre-filter
    pub delay_is_scanning: bool,
    /// Cancellation handle for the outstanding attempt. One-shot: once
    /// cancelled it is replaced, never reset.
    pub cancel: CancellationToken,
    /// Launch request stashed while a permission prompt is in front
    pub pending_intent: Option<LaunchIntent>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            is_running: false,
            is_scanning: false,
            is_error: false,
            delay_is_scanning: false,
            cancel: CancellationToken::new(),
            pending_intent: None,
        }
    }

    /// Transition the scanning flag. The returned effect publishes the
    /// change so the rest of the app can react.
    pub fn set_scanning(&mut self, value: bool) -> Effect {
        self.is_scanning = value;
        Effect::Publish(BusEvent::IsScanningChanged { value })
    }

    /// Transition the error flag. The returned effect re-projects the
    /// foreground indicator.
    pub fn set_error(&mut self, value: bool) -> Effect {
        self.is_error = value;
        Effect::RefreshIndicator
    }

    /// Handle to bind the next sensor-read attempt to. A cancelled token
    /// is replaced with a freshly minted one; a live token is reused for
    /// the attempt it already guards.
    pub fn arm_cancel(&mut self) -> CancellationToken {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        self.cancel.clone()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
