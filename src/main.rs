//! fpqad - interactive simulator for the scan session core.
//!
//! Wires the controller to a platform stub that logs every outbound call,
//! then feeds it system events typed on stdin. Useful for walking the
//! state machine by hand without a device.

use clap::Parser;
use log::{info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use fpqa::platform::config::{
    MemoryConfig, PREF_ENABLE_QUICK_ACTION, PREF_FOREGROUND_SERVICE, PREF_NOTIFY_ON_ERROR,
    PREF_QUICK_ACTION, PREF_RESPOND_ENROLLED_ONLY,
};
use fpqa::{
    AuthError, AuthOutcome, BusEvent, ConfigStore, EventBus, FingerprintReader, FpqaResult,
    LaunchIntent, Platform, ScanSessionController, ScreenBroadcast,
};

#[derive(Parser, Debug)]
#[command(name = "fpqad", about = "Fingerprint quick action session simulator")]
struct Args {
    /// Quick action to perform on a touch (sleep, home, expand_panel)
    #[arg(long, default_value = "sleep")]
    quick_action: String,

    /// Show the persistent foreground indicator
    #[arg(long)]
    foreground: bool,

    /// Surface sensor error text as a transient message
    #[arg(long)]
    notify_on_error: bool,

    /// Only respond to enrolled-fingerprint matches
    #[arg(long)]
    enrolled_only: bool,
}

/// Platform stub: every outbound call becomes a log line.
struct LoggingPlatform;

impl Platform for LoggingPlatform {
    fn register_receiver(&self, broadcast: ScreenBroadcast) -> FpqaResult<()> {
        info!("[platform] register receiver {:?}", broadcast);
        Ok(())
    }

    fn unregister_receiver(&self, broadcast: ScreenBroadcast) -> FpqaResult<()> {
        info!("[platform] unregister receiver {:?}", broadcast);
        Ok(())
    }

    fn present_launcher_ui(&self) {
        info!("[platform] present launcher UI");
    }

    fn is_accessibility_granted(&self) -> bool {
        true
    }

    fn request_accessibility_permission(&self) {
        info!("[platform] request accessibility permission");
    }

    fn go_to_sleep(&self) {
        info!("[platform] lock and sleep the device");
    }

    fn go_home(&self) {
        info!("[platform] go to home screen");
    }

    fn expand_notification_panel(&self) {
        info!("[platform] expand notification panel");
    }

    fn show_transient_message(&self, text: &str) {
        info!("[platform] toast: {}", text);
    }

    fn show_persistent_indicator(&self, text: &str) {
        info!("[platform] indicator: {}", text);
    }

    fn remove_persistent_indicator(&self) {
        info!("[platform] indicator removed");
    }

    fn dispatch_intent(&self, intent: LaunchIntent) {
        info!("[platform] dispatch intent {}", intent.target);
    }

    fn request_teardown(&self) {
        info!("[platform] host may tear down");
    }
}

/// Sensor stub: arming is a log line, outcomes are typed on stdin. Keeps
/// the armed attempt's token so typed outcomes echo it back, the way the
/// real capability reports against the attempt it was given.
#[derive(Default)]
struct SimulatedReader {
    armed: Mutex<Option<CancellationToken>>,
}

impl SimulatedReader {
    fn current_token(&self) -> CancellationToken {
        self.armed.lock().clone().unwrap_or_default()
    }
}

impl FingerprintReader for SimulatedReader {
    fn authenticate(&self, cancel: CancellationToken) -> FpqaResult<()> {
        info!("[sensor] read attempt armed");
        *self.armed.lock() = Some(cancel);
        Ok(())
    }
}

fn print_help() {
    println!("commands:");
    println!("  start          deliver the activation command");
    println!("  present        screen on / user present");
    println!("  off            screen off");
    println!("  ok             touch: enrolled fingerprint matched");
    println!("  fail           touch: no match");
    println!("  err <text>     sensor error");
    println!("  activity       foreground activity changed");
    println!("  pref <key>     preference-changed notification");
    println!("  stop           stop the session");
    println!("  quit           exit");
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = Arc::new(MemoryConfig::new());
    config.set_string(PREF_QUICK_ACTION, &args.quick_action);
    config.set_bool(PREF_FOREGROUND_SERVICE, args.foreground);
    config.set_bool(PREF_NOTIFY_ON_ERROR, args.notify_on_error);
    config.set_bool(PREF_RESPOND_ENROLLED_ONLY, args.enrolled_only);
    config.set_bool(PREF_ENABLE_QUICK_ACTION, true);

    let bus = EventBus::new();
    let reader = Arc::new(SimulatedReader::default());
    let controller = ScanSessionController::new(
        config.clone(),
        Arc::new(LoggingPlatform),
        reader.clone(),
        bus.clone(),
    );

    // Mirror bus traffic as JSON log lines for the session being driven.
    let mut bus_rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match bus_rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!("[bus] {}", json),
                    Err(e) => warn!("Failed to encode bus event: {}", e),
                },
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    controller.on_start_command();
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "start" => {
                controller.on_start_command();
            }
            "present" => controller.on_user_present(),
            "off" => controller.on_screen_off(),
            "ok" => controller.on_auth_outcome(reader.current_token(), AuthOutcome::Succeeded),
            "fail" => controller.on_auth_outcome(reader.current_token(), AuthOutcome::Failed),
            "err" => {
                let text = if rest.is_empty() { "hardware fault" } else { rest };
                controller
                    .on_auth_outcome(reader.current_token(), AuthOutcome::Error(AuthError::new(1, text)));
            }
            "activity" => bus.publish(BusEvent::ActivityChanged),
            "pref" => {
                // Flip boolean prefs before notifying so the handler
                // observes the new value, the way the settings surface
                // would.
                if rest == PREF_FOREGROUND_SERVICE || rest == PREF_ENABLE_QUICK_ACTION {
                    config.set_bool(rest, !config.get_bool(rest, false));
                }
                controller.on_pref_changed(rest);
            }
            "stop" => controller.stop(),
            "quit" => break,
            "" => {}
            other => {
                warn!("Unknown command: {}", other);
                print_help();
            }
        }
    }

    controller.stop();
}
