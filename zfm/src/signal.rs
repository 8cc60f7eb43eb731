//! Step-completion signaling between the correlator task and a flow
//!
//! Replaces the original firmware's shared event-group bits with a
//! one-slot mailbox: the correlator publishes a [`StepOutcome`] for
//! every correlated response, and the single active flow waits on it
//! with a per-step timeout. The outcome carries the whole packet, so a
//! flow reads data like the index bitmap as an ordinary return value
//! instead of decoding overloaded signal bits.

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{timeout, Duration, Instant};

use zfm_core::{Packet, StatusCode};

/// Result of one orchestrator step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Confirmation code was `Ok`
    pub success: bool,

    /// Raw confirmation code
    pub status: StatusCode,

    /// The correlated response packet
    pub packet: Packet,
}

/// One-slot outcome mailbox
///
/// Shared between the correlator task and at most one active flow. A
/// later outcome overwrites an unconsumed earlier one; flows clear the
/// slot before every step.
pub(crate) struct StepSignal {
    slot: Mutex<Option<StepOutcome>>,
    notify: Notify,
}

impl StepSignal {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Drop any unconsumed outcome
    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    /// Publish a step outcome and wake the waiting flow
    pub fn complete(&self, outcome: StepOutcome) {
        *self.slot.lock() = Some(outcome);
        self.notify.notify_one();
    }

    /// Wait up to `limit` for an outcome; `None` on timeout
    pub async fn wait(&self, limit: Duration) -> Option<StepOutcome> {
        let deadline = Instant::now() + limit;
        loop {
            let notified = self.notify.notified();
            if let Some(outcome) = self.slot.lock().take() {
                return Some(outcome);
            }
            let now = Instant::now();
            if now >= deadline {
                return self.slot.lock().take();
            }
            if timeout(deadline - now, notified).await.is_err() {
                return self.slot.lock().take();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use zfm_core::{PacketKind, DEFAULT_ADDRESS};

    fn outcome(status: StatusCode) -> StepOutcome {
        let packet =
            Packet::new(DEFAULT_ADDRESS, PacketKind::Ack, status.raw(), Vec::new()).unwrap();
        StepOutcome {
            success: status.is_ok(),
            status,
            packet,
        }
    }

    #[tokio::test]
    async fn test_complete_then_wait() {
        let signal = StepSignal::new();
        signal.complete(outcome(StatusCode::Ok));

        let received = signal.wait(Duration::from_millis(10)).await.unwrap();
        assert!(received.success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout() {
        let signal = StepSignal::new();
        assert!(signal.wait(Duration::from_secs(1)).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_wakes_on_complete() {
        let signal = Arc::new(StepSignal::new());
        let completer = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                signal.complete(outcome(StatusCode::NoFinger));
            })
        };

        let received = signal.wait(Duration::from_secs(1)).await.unwrap();
        assert!(!received.success);
        assert_eq!(received.status, StatusCode::NoFinger);
        completer.await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_discards_stale_outcome() {
        let signal = StepSignal::new();
        signal.complete(outcome(StatusCode::Ok));
        signal.clear();

        assert!(signal.wait(Duration::from_millis(5)).await.is_none());
    }

    #[tokio::test]
    async fn test_later_outcome_overwrites() {
        let signal = StepSignal::new();
        signal.complete(outcome(StatusCode::Ok));
        signal.complete(outcome(StatusCode::NoFinger));

        let received = signal.wait(Duration::from_millis(5)).await.unwrap();
        assert_eq!(received.status, StatusCode::NoFinger);
    }
}
