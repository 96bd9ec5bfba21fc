//! Scan Session Controller
//!
//! The scanning-session state machine. Arms a fingerprint-read attempt
//! while the screen is on, retracts it on screen-off, maps authentication
//! outcomes to the configured quick action and projects the persistent
//! foreground indicator.
//!
//! All handlers run to completion on the host's dispatch context; the
//! state mutex only guards against the controller's own debounced
//! subscription tasks.

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::events::{spawn_debounced, BusEvent, EventBus};
use super::state::{Effect, SessionState, StartDirective};
use crate::platform::config::{
    ConfigStore, PREF_ENABLE_QUICK_ACTION, PREF_FOREGROUND_SERVICE, PREF_NOTIFY_ON_ERROR,
    PREF_RESPOND_ENROLLED_ONLY,
};
use crate::platform::{LaunchIntent, Platform, QuickAction, ScreenBroadcast};
use crate::sensor::{AuthOutcome, FingerprintReader};

/// Trailing window applied to both debounced bus subscriptions
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// Indicator body while the session is healthy
pub const INDICATOR_TEXT: &str = "Fingerprint quick action is active";

/// Indicator body after a sensor error
pub const INDICATOR_ERROR_TEXT: &str =
    "Fingerprint quick action stopped on a sensor error, touch to re-enable";

/// Owns the scan session: lifecycle, outcome handling, quick-action
/// dispatch and indicator projection. One instance per host activation;
/// nothing here persists.
pub struct ScanSessionController {
    state: Arc<Mutex<SessionState>>,
    /// Debounced bus subscription tasks, live exactly while running
    subscriptions: Mutex<Vec<JoinHandle<()>>>,
    bus: EventBus,
    config: Arc<dyn ConfigStore>,
    platform: Arc<dyn Platform>,
    reader: Arc<dyn FingerprintReader>,
}

impl ScanSessionController {
    pub fn new(
        config: Arc<dyn ConfigStore>,
        platform: Arc<dyn Platform>,
        reader: Arc<dyn FingerprintReader>,
        bus: EventBus,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            subscriptions: Mutex::new(Vec::new()),
            bus,
            config,
            platform,
            reader,
        }
    }

    /// The bus this controller publishes on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().is_running
    }

    pub fn is_scanning(&self) -> bool {
        self.state.lock().is_scanning
    }

    pub fn is_error(&self) -> bool {
        self.state.lock().is_error
    }

    pub fn delay_is_scanning(&self) -> bool {
        self.state.lock().delay_is_scanning
    }

    /// Run the follow-up of a state transition. Must be called with the
    /// state lock released; indicator refresh re-reads state.
    fn apply(&self, effect: Effect) {
        match effect {
            Effect::Publish(event) => self.bus.publish(event),
            Effect::RefreshIndicator => self.refresh_indicator(),
        }
    }

    /// Register receivers and bus subscriptions. Idempotent: a running
    /// session is left untouched.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if state.is_running {
            return;
        }

        for broadcast in [ScreenBroadcast::UserPresent, ScreenBroadcast::ScreenOff] {
            if let Err(e) = self.platform.register_receiver(broadcast) {
                error!("Failed to register {:?} receiver: {}", broadcast, e);
            }
        }

        let mut subscriptions = self.subscriptions.lock();

        // Foreground-activity stream: drop events while the debounced
        // scanning flag is set, coalesce bursts to the last event per
        // window, drop the survivor if a scan is armed by delivery time,
        // then bring up the launcher UI.
        let pre_state = Arc::clone(&self.state);
        let post_state = Arc::clone(&self.state);
        let platform = Arc::clone(&self.platform);
        subscriptions.push(spawn_debounced(
            &self.bus,
            DEBOUNCE_WINDOW,
            move |event| match event {
                BusEvent::ActivityChanged if !pre_state.lock().delay_is_scanning => {
                    Some(event.clone())
                }
                _ => None,
            },
            move |_event| {
                if !post_state.lock().is_scanning {
                    platform.present_launcher_ui();
                }
            },
        ));

        // Scanning-changed stream: coalesced copy of the scanning flag,
        // one value per window.
        let delay_state = Arc::clone(&self.state);
        subscriptions.push(spawn_debounced(
            &self.bus,
            DEBOUNCE_WINDOW,
            |event| match event {
                BusEvent::IsScanningChanged { .. } => Some(event.clone()),
                _ => None,
            },
            move |event| {
                if let BusEvent::IsScanningChanged { value } = event {
                    delay_state.lock().delay_is_scanning = value;
                }
            },
        ));

        state.is_running = true;
        info!("Scan session started");
    }

    /// Tear the session down. Idempotent: stopping a stopped session is a
    /// no-op. The last scanning intent survives in `delay_is_scanning`
    /// for the next start.
    pub fn stop(&self) {
        let publish = {
            let mut state = self.state.lock();
            if !state.is_running {
                return;
            }

            for broadcast in [ScreenBroadcast::UserPresent, ScreenBroadcast::ScreenOff] {
                if let Err(e) = self.platform.unregister_receiver(broadcast) {
                    warn!("Failed to unregister {:?} receiver: {}", broadcast, e);
                }
            }
            for task in self.subscriptions.lock().drain(..) {
                task.abort();
            }

            state.delay_is_scanning = state.is_scanning;
            state.cancel.cancel();
            let publish = state.set_scanning(false);
            state.is_running = false;
            publish
        };

        self.platform.remove_persistent_indicator();
        self.platform.request_teardown();
        self.apply(publish);
        info!("Scan session stopped");
    }

    /// Arm one sensor-read attempt. Re-entrant-safe: while an attempt is
    /// outstanding this does nothing, so repeated activations never stack
    /// concurrent reads.
    pub fn arm_sensor_session(&self) {
        let publish = {
            let mut state = self.state.lock();
            let cancel = state.arm_cancel();
            if state.is_scanning {
                return;
            }
            match self.reader.authenticate(cancel) {
                Ok(()) => state.set_scanning(true),
                Err(e) => {
                    error!("Sensor-read request failed: {}", e);
                    return;
                }
            }
        };
        self.apply(publish);
    }

    /// Activation command from the host. Always safe to deliver; brings
    /// the session up, (re)arms the sensor, closes any transient launcher
    /// UI, clears the error flag, redelivers a stashed launch request and
    /// checks the accessibility precondition.
    pub fn on_start_command(&self) -> StartDirective {
        self.start();
        self.arm_sensor_session();

        self.bus.publish(BusEvent::CloseLauncherUi);

        let (refresh, pending) = {
            let mut state = self.state.lock();
            (state.set_error(false), state.pending_intent.take())
        };
        self.apply(refresh);

        if let Some(intent) = pending {
            debug!("Redelivering stashed launch request: {}", intent.target);
            self.platform.dispatch_intent(intent);
        }

        if !self.platform.is_accessibility_granted() {
            self.platform.request_accessibility_permission();
        }

        StartDirective::Sticky
    }

    /// Stash a launch request to redeliver on the next activation, used
    /// while a permission prompt sits in front of the launcher UI.
    pub fn set_pending_intent(&self, intent: LaunchIntent) {
        self.state.lock().pending_intent = Some(intent);
    }

    /// Screen turned on past the keyguard. Brings up the launcher UI,
    /// which drives the next activation command, unless a scan is already
    /// armed.
    pub fn on_user_present(&self) {
        if !self.state.lock().is_scanning {
            self.platform.present_launcher_ui();
        }
    }

    /// Screen turned off. Retracts the outstanding attempt but keeps the
    /// session running; receivers stay registered for the next screen-on.
    pub fn on_screen_off(&self) {
        let publish = {
            let mut state = self.state.lock();
            state.cancel.cancel();
            state.set_scanning(false)
        };
        self.apply(publish);
    }

    /// One terminal outcome of a sensor-read attempt, delivered by the
    /// capability on the owner context together with the token the
    /// attempt was bound to.
    ///
    /// Cancellation is cooperative: the error for a retracted attempt
    /// can arrive after the next activation has already minted a fresh
    /// token and armed a new attempt. The echoed token tells a live
    /// attempt's outcome from a stale one.
    pub fn on_auth_outcome(&self, token: CancellationToken, outcome: AuthOutcome) {
        if token.is_cancelled() {
            // Outcome of an attempt we retracted ourselves (screen-off
            // or stop), not something the user should see. A cancelled
            // token is never reused, so if the current token is live a
            // fresh attempt has superseded this one and owns the
            // scanning flag.
            debug!("Ignoring outcome of a cancelled attempt: {:?}", outcome);
            let publish = {
                let mut state = self.state.lock();
                if state.cancel.is_cancelled() {
                    Some(state.set_scanning(false))
                } else {
                    None
                }
            };
            if let Some(publish) = publish {
                self.apply(publish);
            }
            return;
        }

        match outcome {
            AuthOutcome::Succeeded => {
                let publish = self.state.lock().set_scanning(false);
                self.apply(publish);
                self.dispatch_quick_action();
            }

            AuthOutcome::Failed => {
                // A non-matching touch still counts unless the user opted
                // into enrolled prints only. The attempt stays armed; the
                // capability keeps reporting on the same handle.
                if !self.config.get_bool(PREF_RESPOND_ENROLLED_ONLY, false) {
                    self.dispatch_quick_action();
                }
            }

            AuthOutcome::Error(err) => {
                warn!("Sensor error {}: {}", err.code, err.message);
                if self.config.get_bool(PREF_NOTIFY_ON_ERROR, false) {
                    self.platform
                        .show_transient_message(&format!("Fingerprint sensor error: {}", err.message));
                }

                let (refresh, publish) = {
                    let mut state = self.state.lock();
                    (state.set_error(true), state.set_scanning(false))
                };
                self.apply(refresh);
                self.apply(publish);
            }
        }
    }

    /// Perform the configured quick action for a qualifying touch.
    fn dispatch_quick_action(&self) {
        let action = self.config.quick_action();
        debug!("Dispatching quick action {:?}", action);
        match action {
            QuickAction::Sleep => self.platform.go_to_sleep(),
            QuickAction::Home => {
                self.platform.present_launcher_ui();
                self.platform.go_home();
            }
            QuickAction::ExpandPanel => {
                self.platform.present_launcher_ui();
                self.platform.expand_notification_panel();
            }
        }
    }

    /// Recompute the foreground indicator from the error flag and the
    /// foreground-service preference. Runs on every error transition, on
    /// explicit request and when the preference itself changes.
    pub fn refresh_indicator(&self) {
        let is_error = self.state.lock().is_error;
        if self.config.get_bool(PREF_FOREGROUND_SERVICE, false) {
            let text = if is_error {
                INDICATOR_ERROR_TEXT
            } else {
                INDICATOR_TEXT
            };
            self.platform.show_persistent_indicator(text);
        } else {
            self.platform.remove_persistent_indicator();
        }
    }

    /// Preference-changed notification from the settings surface.
    pub fn on_pref_changed(&self, key: &str) {
        match key {
            PREF_FOREGROUND_SERVICE => self.refresh_indicator(),
            PREF_ENABLE_QUICK_ACTION => {
                if !self.config.get_bool(PREF_ENABLE_QUICK_ACTION, false) {
                    self.stop();
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FpqaResult;
    use crate::platform::config::{MemoryConfig, PREF_QUICK_ACTION};
    use crate::sensor::AuthError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio_util::sync::CancellationToken;

    /// Platform stub recording every outbound call in order.
    struct RecordingPlatform {
        calls: Mutex<Vec<String>>,
        accessibility_granted: AtomicBool,
    }

    impl RecordingPlatform {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                accessibility_granted: AtomicBool::new(true),
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn count(&self, call: &str) -> usize {
            self.calls.lock().iter().filter(|c| *c == call).count()
        }
    }

    impl Platform for RecordingPlatform {
        fn register_receiver(&self, broadcast: ScreenBroadcast) -> FpqaResult<()> {
            self.record(format!("register:{:?}", broadcast));
            Ok(())
        }

        fn unregister_receiver(&self, broadcast: ScreenBroadcast) -> FpqaResult<()> {
            self.record(format!("unregister:{:?}", broadcast));
            Ok(())
        }

        fn present_launcher_ui(&self) {
            self.record("present_launcher_ui");
        }

        fn is_accessibility_granted(&self) -> bool {
            self.accessibility_granted.load(Ordering::SeqCst)
        }

        fn request_accessibility_permission(&self) {
            self.record("request_accessibility_permission");
        }

        fn go_to_sleep(&self) {
            self.record("go_to_sleep");
        }

        fn go_home(&self) {
            self.record("go_home");
        }

        fn expand_notification_panel(&self) {
            self.record("expand_notification_panel");
        }

        fn show_transient_message(&self, text: &str) {
            self.record(format!("toast:{}", text));
        }

        fn show_persistent_indicator(&self, text: &str) {
            self.record(format!("indicator:{}", text));
        }

        fn remove_persistent_indicator(&self) {
            self.record("remove_indicator");
        }

        fn dispatch_intent(&self, intent: LaunchIntent) {
            self.record(format!("dispatch:{}", intent.target));
        }

        fn request_teardown(&self) {
            self.record("request_teardown");
        }
    }

    /// Sensor stub capturing the token of every issued request.
    #[derive(Default)]
    struct StubReader {
        requests: Mutex<Vec<CancellationToken>>,
    }

    impl StubReader {
        fn request_count(&self) -> usize {
            self.requests.lock().len()
        }

        fn token(&self, index: usize) -> CancellationToken {
            self.requests.lock()[index].clone()
        }
    }

    impl FingerprintReader for StubReader {
        fn authenticate(&self, cancel: CancellationToken) -> FpqaResult<()> {
            self.requests.lock().push(cancel);
            Ok(())
        }
    }

    struct Fixture {
        controller: ScanSessionController,
        platform: Arc<RecordingPlatform>,
        reader: Arc<StubReader>,
        config: Arc<MemoryConfig>,
        bus: EventBus,
    }

    fn fixture() -> Fixture {
        let platform = Arc::new(RecordingPlatform::new());
        let reader = Arc::new(StubReader::default());
        let config = Arc::new(MemoryConfig::new());
        let bus = EventBus::new();
        let controller = ScanSessionController::new(
            config.clone(),
            platform.clone(),
            reader.clone(),
            bus.clone(),
        );
        Fixture {
            controller,
            platform,
            reader,
            config,
            bus,
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_start_twice_registers_once() {
        let f = fixture();
        f.controller.start();
        f.controller.start();

        assert_eq!(f.platform.count("register:UserPresent"), 1);
        assert_eq!(f.platform.count("register:ScreenOff"), 1);
        assert_eq!(f.controller.subscriptions.lock().len(), 2);
        assert!(f.controller.is_running());
    }

    #[tokio::test]
    async fn test_stop_when_not_running_is_a_noop() {
        let f = fixture();
        f.controller.stop();

        assert!(f.platform.calls().is_empty());
        assert!(!f.controller.is_running());
    }

    #[tokio::test]
    async fn test_stop_cancels_handle_and_clears_scanning() {
        let f = fixture();
        f.controller.on_start_command();
        assert!(f.controller.is_scanning());

        f.controller.stop();

        assert!(f.reader.token(0).is_cancelled());
        assert!(!f.controller.is_scanning());
        assert!(!f.controller.is_running());
        assert_eq!(f.platform.count("unregister:UserPresent"), 1);
        assert_eq!(f.platform.count("unregister:ScreenOff"), 1);
        // Once from the activation's error-clear refresh, once from stop.
        assert_eq!(f.platform.count("remove_indicator"), 2);
        assert_eq!(f.platform.count("request_teardown"), 1);
    }

    #[tokio::test]
    async fn test_stop_snapshots_scanning_intent() {
        let f = fixture();
        f.controller.on_start_command();
        f.controller.stop();

        // The attempt was armed when the session stopped; the next start
        // sees that intent in the debounced copy.
        assert!(f.controller.delay_is_scanning());
    }

    #[tokio::test]
    async fn test_repeated_activation_arms_single_request() {
        let f = fixture();
        f.controller.on_start_command();
        f.controller.on_start_command();

        assert_eq!(f.reader.request_count(), 1);
    }

    #[tokio::test]
    async fn test_rearm_after_cancellation_mints_fresh_token() {
        let f = fixture();
        f.controller.on_start_command();
        f.controller.on_screen_off();

        f.controller.on_start_command();

        assert_eq!(f.reader.request_count(), 2);
        assert!(f.reader.token(0).is_cancelled());
        assert!(!f.reader.token(1).is_cancelled());
    }

    #[tokio::test]
    async fn test_activation_returns_sticky_directive() {
        let f = fixture();
        assert_eq!(f.controller.on_start_command(), StartDirective::Sticky);
    }

    #[tokio::test]
    async fn test_activation_clears_error_flag() {
        let f = fixture();
        f.controller.on_start_command();
        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Error(AuthError::new(1, "hw fault")));
        assert!(f.controller.is_error());

        f.controller.on_start_command();
        assert!(!f.controller.is_error());
    }

    #[tokio::test]
    async fn test_activation_redelivers_pending_intent_once() {
        let f = fixture();
        f.controller
            .set_pending_intent(LaunchIntent::new("settings"));

        f.controller.on_start_command();
        assert_eq!(f.platform.count("dispatch:settings"), 1);

        f.controller.on_start_command();
        assert_eq!(f.platform.count("dispatch:settings"), 1);
    }

    #[tokio::test]
    async fn test_activation_requests_accessibility_when_missing() {
        let f = fixture();
        f.platform
            .accessibility_granted
            .store(false, Ordering::SeqCst);

        f.controller.on_start_command();
        assert_eq!(f.platform.count("request_accessibility_permission"), 1);

        f.platform
            .accessibility_granted
            .store(true, Ordering::SeqCst);
        f.controller.on_start_command();
        assert_eq!(f.platform.count("request_accessibility_permission"), 1);
    }

    #[tokio::test]
    async fn test_success_with_sleep_action() {
        let f = fixture();
        f.controller.on_start_command();

        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Succeeded);

        assert_eq!(f.platform.count("go_to_sleep"), 1);
        assert!(!f.controller.is_scanning());
        assert!(!f.controller.is_error());
    }

    #[tokio::test]
    async fn test_success_with_home_action_presents_launcher_first() {
        let f = fixture();
        f.config.set_string(PREF_QUICK_ACTION, "home");
        f.controller.on_start_command();

        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Succeeded);

        let calls = f.platform.calls();
        let present = calls
            .iter()
            .position(|c| c == "present_launcher_ui")
            .unwrap();
        let home = calls.iter().position(|c| c == "go_home").unwrap();
        assert!(present < home);
    }

    #[tokio::test]
    async fn test_success_with_expand_panel_action() {
        let f = fixture();
        f.config.set_string(PREF_QUICK_ACTION, "expand_panel");
        f.controller.on_start_command();

        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Succeeded);

        let calls = f.platform.calls();
        let present = calls
            .iter()
            .position(|c| c == "present_launcher_ui")
            .unwrap();
        let expand = calls
            .iter()
            .position(|c| c == "expand_notification_panel")
            .unwrap();
        assert!(present < expand);
    }

    #[tokio::test]
    async fn test_unrecognized_action_falls_back_to_sleep() {
        let f = fixture();
        f.config.set_string(PREF_QUICK_ACTION, "double_tap");
        f.controller.on_start_command();

        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Succeeded);

        assert_eq!(f.platform.count("go_to_sleep"), 1);
    }

    #[tokio::test]
    async fn test_failed_outcome_respects_enrolled_only() {
        let f = fixture();
        f.config.set_bool(PREF_RESPOND_ENROLLED_ONLY, true);
        f.controller.on_start_command();

        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Failed);

        assert_eq!(f.platform.count("go_to_sleep"), 0);
        // The attempt stays armed for the next touch.
        assert!(f.controller.is_scanning());
    }

    #[tokio::test]
    async fn test_failed_outcome_dispatches_when_not_enrolled_only() {
        let f = fixture();
        f.controller.on_start_command();

        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Failed);

        assert_eq!(f.platform.count("go_to_sleep"), 1);
        assert!(f.controller.is_scanning());
    }

    #[tokio::test]
    async fn test_error_outcome_notifies_and_flags() {
        let f = fixture();
        f.config.set_bool(PREF_NOTIFY_ON_ERROR, true);
        f.controller.on_start_command();

        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Error(AuthError::new(7, "sensor locked")));

        let calls = f.platform.calls();
        assert!(calls
            .iter()
            .any(|c| c.starts_with("toast:") && c.contains("sensor locked")));
        assert!(f.controller.is_error());
        assert!(!f.controller.is_scanning());
    }

    #[tokio::test]
    async fn test_error_outcome_without_notify_stays_silent() {
        let f = fixture();
        f.controller.on_start_command();

        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Error(AuthError::new(1, "hw fault")));

        assert!(!f.platform.calls().iter().any(|c| c.starts_with("toast:")));
        assert!(f.controller.is_error());
    }

    #[tokio::test]
    async fn test_self_induced_cancellation_error_is_suppressed() {
        let f = fixture();
        f.config.set_bool(PREF_NOTIFY_ON_ERROR, true);
        f.controller.on_start_command();
        f.controller.on_screen_off();

        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Error(AuthError::new(5, "canceled")));

        assert!(!f.platform.calls().iter().any(|c| c.starts_with("toast:")));
        assert!(!f.controller.is_error());
        assert!(!f.controller.is_scanning());
    }

    #[tokio::test]
    async fn test_stale_cancel_error_after_rearm_is_suppressed() {
        let f = fixture();
        f.config.set_bool(PREF_NOTIFY_ON_ERROR, true);
        f.controller.on_start_command();
        f.controller.on_screen_off();
        f.controller.on_start_command();
        assert_eq!(f.reader.request_count(), 2);

        // The retracted attempt's error arrives only now, after a fresh
        // attempt was armed. It must stay invisible and must not touch
        // the live attempt's scanning flag.
        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Error(AuthError::new(5, "canceled")));

        assert!(!f.platform.calls().iter().any(|c| c.starts_with("toast:")));
        assert!(!f.controller.is_error());
        assert!(f.controller.is_scanning());

        // The following activation must not stack a second read either.
        f.controller.on_start_command();
        assert_eq!(f.reader.request_count(), 2);
    }

    #[tokio::test]
    async fn test_outcome_of_superseded_attempt_is_ignored() {
        let f = fixture();
        f.controller.on_start_command();
        f.controller.on_screen_off();
        f.controller.on_start_command();

        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Succeeded);

        assert_eq!(f.platform.count("go_to_sleep"), 0);
        assert!(f.controller.is_scanning());
    }

    #[tokio::test]
    async fn test_screen_off_retracts_attempt_but_stays_running() {
        let f = fixture();
        f.controller.on_start_command();
        assert!(f.controller.is_scanning());

        f.controller.on_screen_off();

        assert!(f.reader.token(0).is_cancelled());
        assert!(!f.controller.is_scanning());
        assert!(f.controller.is_running());
        assert_eq!(f.platform.count("unregister:UserPresent"), 0);
    }

    #[tokio::test]
    async fn test_user_present_presents_launcher_only_when_idle() {
        let f = fixture();
        f.controller.start();

        f.controller.on_user_present();
        assert_eq!(f.platform.count("present_launcher_ui"), 1);

        f.controller.on_start_command();
        f.controller.on_user_present();
        assert_eq!(f.platform.count("present_launcher_ui"), 1);
    }

    #[tokio::test]
    async fn test_indicator_shows_error_wording_on_error_transition() {
        let f = fixture();
        f.config.set_bool(PREF_FOREGROUND_SERVICE, true);
        f.controller.on_start_command();

        f.controller
            .on_auth_outcome(f.reader.token(0), AuthOutcome::Error(AuthError::new(1, "hw fault")));

        assert_eq!(
            f.platform.count(&format!("indicator:{}", INDICATOR_ERROR_TEXT)),
            1
        );
    }

    #[tokio::test]
    async fn test_indicator_removed_when_foreground_disabled() {
        let f = fixture();
        f.controller.refresh_indicator();
        assert_eq!(f.platform.count("remove_indicator"), 1);
    }

    #[tokio::test]
    async fn test_pref_change_foreground_reprojects_indicator() {
        let f = fixture();
        f.config.set_bool(PREF_FOREGROUND_SERVICE, true);

        f.controller.on_pref_changed(PREF_FOREGROUND_SERVICE);

        assert_eq!(f.platform.count(&format!("indicator:{}", INDICATOR_TEXT)), 1);
    }

    #[tokio::test]
    async fn test_pref_change_disable_stops_session() {
        let f = fixture();
        f.config.set_bool(PREF_ENABLE_QUICK_ACTION, true);
        f.controller.on_start_command();

        f.config.set_bool(PREF_ENABLE_QUICK_ACTION, false);
        f.controller.on_pref_changed(PREF_ENABLE_QUICK_ACTION);

        assert!(!f.controller.is_running());
        assert_eq!(f.platform.count("request_teardown"), 1);
    }

    #[tokio::test]
    async fn test_pref_change_enable_still_on_keeps_session() {
        let f = fixture();
        f.config.set_bool(PREF_ENABLE_QUICK_ACTION, true);
        f.controller.on_start_command();

        f.controller.on_pref_changed(PREF_ENABLE_QUICK_ACTION);

        assert!(f.controller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_burst_presents_launcher_exactly_once() {
        let f = fixture();
        f.controller.start();

        for _ in 0..5 {
            f.bus.publish(BusEvent::ActivityChanged);
        }
        settle().await;
        tokio::time::advance(Duration::from_millis(1100)).await;
        settle().await;

        assert_eq!(f.platform.count("present_launcher_ui"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_events_dropped_while_scanning() {
        let f = fixture();
        f.controller.on_start_command();
        assert!(f.controller.is_scanning());

        f.bus.publish(BusEvent::ActivityChanged);
        settle().await;
        tokio::time::advance(Duration::from_millis(1100)).await;
        settle().await;

        assert_eq!(f.platform.count("present_launcher_ui"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_events_dropped_while_delay_flag_set() {
        let f = fixture();
        f.controller.start();
        f.controller.state.lock().delay_is_scanning = true;

        f.bus.publish(BusEvent::ActivityChanged);
        settle().await;
        tokio::time::advance(Duration::from_millis(1100)).await;
        settle().await;

        assert_eq!(f.platform.count("present_launcher_ui"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scanning_stream_updates_delayed_copy() {
        let f = fixture();
        f.controller.start();

        f.bus.publish(BusEvent::IsScanningChanged { value: false });
        settle().await;
        f.bus.publish(BusEvent::IsScanningChanged { value: true });
        settle().await;
        tokio::time::advance(Duration::from_millis(1100)).await;
        settle().await;

        // Latest value of the window wins.
        assert!(f.controller.delay_is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_session_ignores_bus_events() {
        let f = fixture();
        f.controller.start();
        f.controller.stop();

        f.bus.publish(BusEvent::ActivityChanged);
        settle().await;
        tokio::time::advance(Duration::from_millis(1100)).await;
        settle().await;

        assert_eq!(f.platform.count("present_launcher_ui"), 0);
    }
}
