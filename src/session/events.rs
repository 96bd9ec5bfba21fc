//! Session Events
//!
//! Typed events on the process-wide bus, and the debounced subscription
//! tasks the controller owns while running.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Events carried on the process-wide bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// The foreground activity changed
    ActivityChanged,

    /// The controller's scanning flag changed
    IsScanningChanged { value: bool },

    /// The transient launcher activity should close
    CloseLauncherUi,
}

/// Process-wide publish/subscribe channel.
///
/// An explicit, injected handle rather than a static singleton: the host
/// creates one at process start and hands clones to the controller and to
/// anything else that publishes. Subscriptions live only while the
/// controller is running.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BusEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Publish an event to all current subscribers. Publishing with no
    /// subscribers is not an error.
    pub fn publish(&self, event: BusEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to the raw event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a subscription with a trailing debounce window.
///
/// `select` is applied to every incoming event as it arrives; events it
/// rejects never open or extend a window. The first accepted event opens a
/// `window`-long span during which later accepted events replace it, and
/// when the span ends only the most recent survivor reaches `handle`. The
/// producer is never blocked; intermediate values are dropped.
pub(crate) fn spawn_debounced<S, H>(
    bus: &EventBus,
    window: Duration,
    mut select: S,
    mut handle: H,
) -> JoinHandle<()>
where
    S: FnMut(&BusEvent) -> Option<BusEvent> + Send + 'static,
    H: FnMut(BusEvent) + Send + 'static,
{
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            // Wait for an event that opens a window.
            let mut latest = loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Some(accepted) = select(&event) {
                            break accepted;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            };

            // Coalesce until the window ends; the latest accepted event wins.
            let deadline = tokio::time::sleep(window);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    next = rx.recv() => match next {
                        Ok(event) => {
                            if let Some(accepted) = select(&event) {
                                latest = accepted;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }

            handle(latest);
        }
    })
}
