//! The protocol engine
//!
//! Owns the cross-task state: the command-record queue, the response
//! queue, the step signal, and the handler slot. Two background tasks
//! are spawned per engine: the transport reader ([`crate::reader`]) and
//! the correlator, which pairs each response with the oldest
//! outstanding command, derives a semantic event, publishes the step
//! outcome, and delivers the event.
//!
//! Each engine instance is independent; nothing is process-global.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use zfm_core::{Command, Packet, StatusCode, DEFAULT_ADDRESS};
use zfm_transport::{SerialRx, SerialTx};

use crate::{
    error::{Error, Result},
    event::{derive_event, Event, EventHandler, HandlerSlot},
    queue::{Queue, QueueError},
    reader,
    signal::{StepOutcome, StepSignal},
};

/// In-flight command records the engine will hold at most
pub const COMMAND_QUEUE_CAPACITY: usize = 8;

/// Decoded responses the engine will hold at most
pub const RESPONSE_QUEUE_CAPACITY: usize = 8;

/// How long `send` waits for room in the command-record queue
pub(crate) const ENQUEUE_DEADLINE: Duration = Duration::from_millis(100);

/// How long the correlator waits for the record matching a response
pub(crate) const CORRELATE_WAIT: Duration = Duration::from_secs(3);

/// Record of one transmitted command
///
/// Correlation is strictly FIFO: responses arrive in send order on this
/// single-outstanding-command protocol, so the oldest record answers
/// the oldest response. Identical command codes may be outstanding at
/// once.
pub(crate) struct CommandInfo {
    pub command: Command,
    pub sent_at: tokio::time::Instant,
}

/// Non-blocking "finger present" notifier
///
/// Advisory fast-path hint from a touch-detect interrupt; the flows
/// poll GenImg and never depend on it.
#[derive(Clone)]
pub struct FingerHint {
    tx: mpsc::Sender<()>,
}

impl FingerHint {
    /// Post the hint; returns `false` when the slot is already taken
    /// or nobody is listening
    pub fn notify(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

struct Inner {
    address: u32,
    tx: tokio::sync::Mutex<Box<dyn SerialTx>>,
    records: Arc<Queue<CommandInfo>>,
    responses: Arc<Queue<Packet>>,
    signal: Arc<StepSignal>,
    handler: Arc<HandlerSlot>,
    flow_lock: tokio::sync::Mutex<()>,
    hint_tx: mpsc::Sender<()>,
    hint_rx: parking_lot::Mutex<Option<mpsc::Receiver<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.records.close();
        self.responses.close();
    }
}

/// Protocol engine handle
///
/// Cheap to clone; all clones share one engine. Dropping the last
/// clone stops the background tasks.
///
/// # Examples
///
/// ```no_run
/// use tokio::net::TcpStream;
/// use zfm::Engine;
/// use zfm_transport::{IoRx, IoTx};
///
/// #[tokio::main]
/// async fn main() -> zfm::Result<()> {
///     // A ser2net-style bridge in front of the module's UART
///     let stream = TcpStream::connect("192.168.4.1:3333").await.unwrap();
///     let (read_half, write_half) = stream.into_split();
///
///     let engine = Engine::new(IoTx::new(write_half), IoRx::new(read_half));
///     engine.send(zfm::Command::GenImg, &[]).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Create an engine on the default broadcast address and spawn its
    /// background tasks. Must be called within a tokio runtime.
    pub fn new<T, R>(tx: T, rx: R) -> Self
    where
        T: SerialTx + 'static,
        R: SerialRx + 'static,
    {
        Self::with_address(tx, rx, DEFAULT_ADDRESS)
    }

    /// Create an engine bound to a specific device address
    pub fn with_address<T, R>(tx: T, rx: R, address: u32) -> Self
    where
        T: SerialTx + 'static,
        R: SerialRx + 'static,
    {
        let records = Arc::new(Queue::new(COMMAND_QUEUE_CAPACITY));
        let responses = Arc::new(Queue::new(RESPONSE_QUEUE_CAPACITY));
        let signal = Arc::new(StepSignal::new());
        let handler = Arc::new(HandlerSlot::new());
        let (hint_tx, hint_rx) = mpsc::channel(1);

        tokio::spawn(reader::run(Box::new(rx), Arc::clone(&responses)));
        tokio::spawn(run_correlator(
            Arc::clone(&responses),
            Arc::clone(&records),
            Arc::clone(&signal),
            Arc::clone(&handler),
        ));

        Self {
            inner: Arc::new(Inner {
                address,
                tx: tokio::sync::Mutex::new(Box::new(tx)),
                records,
                responses,
                signal,
                handler,
                flow_lock: tokio::sync::Mutex::new(()),
                hint_tx,
                hint_rx: parking_lot::Mutex::new(Some(hint_rx)),
            }),
        }
    }

    /// Device address this engine talks to
    pub fn address(&self) -> u32 {
        self.inner.address
    }

    /// Register the event handler; replaces any previous one
    pub fn register_handler<H>(&self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.inner.handler.register(Box::new(handler));
    }

    /// Notifier for an interrupt-driven finger-present producer
    pub fn finger_hint(&self) -> FingerHint {
        FingerHint {
            tx: self.inner.hint_tx.clone(),
        }
    }

    /// Take the finger-present hint receiver; `None` after the first call
    pub fn take_finger_hints(&self) -> Option<mpsc::Receiver<()>> {
        self.inner.hint_rx.lock().take()
    }

    /// Send one command to the module
    ///
    /// The command record is appended before the bytes go out, so the
    /// correlator always sees the record first.
    ///
    /// # Errors
    ///
    /// [`Error::QueueFull`] when the record queue stayed full for the
    /// whole insertion deadline; [`Error::Core`] for oversized
    /// parameters; [`Error::Transport`] when the write fails (fatal to
    /// any in-progress flow).
    pub async fn send(&self, command: Command, params: &[u8]) -> Result<()> {
        let packet = Packet::command(self.inner.address, command, params)?;

        let info = CommandInfo {
            command,
            sent_at: tokio::time::Instant::now(),
        };
        match self.inner.records.push_timeout(info, ENQUEUE_DEADLINE).await {
            Ok(()) => {}
            Err(QueueError::Closed) => return Err(Error::EngineStopped),
            Err(_) => return Err(Error::QueueFull),
        }

        let frame = packet.encode();
        trace!(command = %command, len = frame.len(), "sending command");
        self.inner.tx.lock().await.write_all(&frame).await?;

        Ok(())
    }

    /// Stop the background tasks; in-flight frames are dropped
    pub fn shutdown(&self) {
        self.inner.records.close();
        self.inner.responses.close();
    }

    /// Clear residue a previous flow may have left behind
    pub(crate) fn reset_flow_state(&self) {
        self.inner.signal.clear();
        let stale = self.inner.records.purge() + self.inner.responses.purge();
        if stale > 0 {
            debug!(stale, "purged stale queue entries");
        }
    }

    pub(crate) fn signal(&self) -> &StepSignal {
        &self.inner.signal
    }

    pub(crate) fn flow_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.inner.flow_lock
    }
}

/// Correlator task: FIFO-pairs responses with command records, then
/// maps and delivers events.
async fn run_correlator(
    responses: Arc<Queue<Packet>>,
    records: Arc<Queue<CommandInfo>>,
    signal: Arc<StepSignal>,
    handler: Arc<HandlerSlot>,
) {
    debug!("correlator running");

    while let Some(packet) = responses.pop().await {
        let info = match records.pop_timeout(CORRELATE_WAIT).await {
            Ok(info) => info,
            Err(QueueError::Closed) => break,
            Err(_) => {
                warn!(code = packet.code, "unmatched response, dropping");
                continue;
            }
        };

        let status = StatusCode::from_raw(packet.code);
        trace!(
            command = %info.command,
            status = %status,
            elapsed_ms = info.sent_at.elapsed().as_millis() as u64,
            "correlated response"
        );

        let kind = derive_event(info.command, status, &packet);

        // Wake the blocked flow step first, then deliver the event
        signal.complete(StepOutcome {
            success: status.is_ok(),
            status,
            packet: packet.clone(),
        });

        if let Some(kind) = kind {
            handler.trigger(&Event {
                kind,
                status,
                packet,
            });
        }
    }

    debug!("correlator exiting");
}
