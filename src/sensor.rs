//! Sensor Interface
//!
//! Boundary to the fingerprint-read capability. The capability itself is
//! external; this module only defines the request/outcome contract the
//! session controller drives.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::FpqaResult;

/// Error detail reported with an [`AuthOutcome::Error`] outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthError {
    /// Capability-defined error code (hardware fault, lockout, cancellation, ...)
    pub code: i32,
    /// Human-readable error text, suitable for a transient message
    pub message: String,
}

impl AuthError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Terminal outcome of one sensor-read attempt.
///
/// Every armed attempt delivers exactly one of these (or is cancelled, in
/// which case the capability still reports `Error`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthOutcome {
    /// An enrolled fingerprint matched
    Succeeded,
    /// A touch occurred but no enrolled fingerprint matched
    Failed,
    /// The attempt terminated abnormally
    Error(AuthError),
}

/// Fingerprint-read capability.
///
/// `authenticate` arms one read attempt bound to `cancel`. The attempt is
/// consumed by exactly one outcome, delivered back to the session
/// controller on the owner context via
/// [`ScanSessionController::on_auth_outcome`](crate::session::ScanSessionController::on_auth_outcome)
/// together with the token the attempt was bound to, so a stale outcome
/// can be told from the live attempt's. Cancelling the token requests
/// early termination; the capability then reports an `Error` outcome for
/// the retracted attempt, possibly after a new attempt has been armed. A
/// cancelled token is never reused — the controller mints a fresh one
/// before re-arming.
pub trait FingerprintReader: Send + Sync {
    /// Issue a sensor-read request bound to the given cancellation token.
    fn authenticate(&self, cancel: CancellationToken) -> FpqaResult<()>;
}
