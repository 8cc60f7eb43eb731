//! Semantic event derivation and delivery
//!
//! A raw confirmation code alone is ambiguous: `Ok` after GenImg means
//! a finger was captured, the same `Ok` after Search means a library
//! match. The mapper splits these by the command the response answers.

use std::fmt;

use parking_lot::Mutex;
use tracing::warn;

use zfm_core::{Command, Packet, StatusCode};

/// Semantic event category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A finger was captured into the image buffer
    FingerDetected,
    /// No finger on the sensor
    NoFingerDetected,
    /// Image capture or quality failure
    ImageFail,
    /// Character file generated
    FeatureExtracted,
    /// Too few feature points to build a character file
    FeatureExtractFail,
    /// Both character buffers merged into a model
    ModelCreated,
    /// Model stored in the library
    TemplateStored,
    /// Library search found a match
    SearchSuccess,
    /// Library search found nothing
    MatchFail,
    /// Stored template count, parsed from the response
    TemplateCount(u16),
    /// Template library is full
    DbFull,
    /// Sensor hardware fault
    SensorError,
    /// Any other recognized or unrecognized device error
    Error,
}

/// One semantic event handed to the registered handler
///
/// Never persisted; delivered synchronously and discarded.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub status: StatusCode,
    pub packet: Packet,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self.kind, self.status)
    }
}

/// Consumer of derived events
///
/// Called synchronously from the correlator task; handlers must not
/// block for long.
pub trait EventHandler: Send {
    fn on_event(&mut self, event: &Event);
}

impl<F> EventHandler for F
where
    F: FnMut(&Event) + Send,
{
    fn on_event(&mut self, event: &Event) {
        self(event)
    }
}

/// Single handler slot; last registration wins
pub(crate) struct HandlerSlot {
    inner: Mutex<Option<Box<dyn EventHandler>>>,
}

impl HandlerSlot {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    pub fn register(&self, handler: Box<dyn EventHandler>) {
        *self.inner.lock() = Some(handler);
    }

    /// Deliver one event; a no-op when nothing is registered
    pub fn trigger(&self, event: &Event) {
        if let Some(handler) = self.inner.lock().as_mut() {
            handler.on_event(event);
        }
    }
}

/// Derive the semantic event for a correlated response, if any
///
/// Total over status codes; `Ok` responses to commands without a
/// discrete event (index-table reads, deletes, configuration) yield
/// `None`; their outcome still reaches the flow through the step
/// signal.
pub fn derive_event(last: Command, status: StatusCode, packet: &Packet) -> Option<EventKind> {
    use Command as C;
    use StatusCode as S;

    match (status, last) {
        (S::Ok, C::Search) => Some(EventKind::SearchSuccess),
        (S::Ok, C::GenImg) => Some(EventKind::FingerDetected),
        (S::Ok, C::Img2Tz) => Some(EventKind::FeatureExtracted),
        (S::Ok, C::RegModel) => Some(EventKind::ModelCreated),
        (S::Ok, C::Store) => Some(EventKind::TemplateStored),
        (S::Ok, C::TemplateNum) => {
            let count = match packet.params.as_ref() {
                [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
                _ => 0,
            };
            Some(EventKind::TemplateCount(count))
        }
        (S::Ok, _) => None,
        (S::NoFinger, _) => Some(EventKind::NoFingerDetected),
        (S::ImageFail | S::ImageMess, _) => Some(EventKind::ImageFail),
        (S::TooFewPoints, _) => Some(EventKind::FeatureExtractFail),
        (S::NoMatch | S::NotFound, C::Search) => Some(EventKind::MatchFail),
        (S::DbFull, _) => Some(EventKind::DbFull),
        (S::SensorAbnormal, _) => Some(EventKind::SensorError),
        (S::Other(code), _) => {
            warn!(code, command = %last, "unrecognized confirmation code");
            Some(EventKind::Error)
        }
        _ => Some(EventKind::Error),
    }
}
