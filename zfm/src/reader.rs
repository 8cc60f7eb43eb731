//! Transport reader task
//!
//! Continuously pulls bytes from the serial read half, reassembles
//! frames, and publishes decoded packets to the response queue. Runs
//! until the link closes or the engine shuts down.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use zfm_core::{scan_frames, Packet};
use zfm_transport::{Error as TransportError, SerialRx};

use crate::queue::{Queue, QueueError};

/// Idle tick for each serial read attempt
pub(crate) const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Backoff after a real (non-timeout) read fault
const FAULT_BACKOFF: Duration = Duration::from_millis(50);

pub(crate) async fn run(mut rx: Box<dyn SerialRx>, responses: Arc<Queue<Packet>>) {
    debug!("transport reader running");

    loop {
        if responses.is_closed() {
            break;
        }

        match rx.read(READ_TIMEOUT).await {
            Ok(buf) => {
                for packet in scan_frames(&buf) {
                    match responses.try_push(packet) {
                        Ok(()) => {}
                        Err(QueueError::Closed) => return,
                        Err(_) => warn!("response queue full, dropping frame"),
                    }
                }
            }
            Err(e) if e.is_idle() => continue,
            Err(TransportError::Closed) => {
                debug!("serial link closed, reader exiting");
                break;
            }
            Err(e) => {
                warn!("serial read failed: {}", e);
                tokio::time::sleep(FAULT_BACKOFF).await;
            }
        }
    }
}
