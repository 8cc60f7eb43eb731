//! Template byte accumulator
//!
//! Collects raw template bytes across data packets during an UpChar
//! transfer. Completion is signaled either by the end-of-data packet
//! kind or by the terminator pattern the module appends inside the
//! final payload.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::time::Instant;
use tracing::{debug, trace};

use zfm_core::PacketKind;

/// Hard cap on a collected template
pub const MAX_TEMPLATE_BYTES: usize = 16 * 1024;

/// Longest slice accepted from a single feed call
pub const MAX_FEED_BYTES: usize = 256;

/// Terminator pattern the module appends after the template body
pub const TEMPLATE_TERMINATOR: [u8; 4] = [0x55, 0xAA, 0x55, 0xAA];

/// Collection deadline measured from `start()`
const COLLECT_DEADLINE: std::time::Duration = std::time::Duration::from_secs(5);

const INITIAL_CAPACITY: usize = 256;

/// Collector status after a feed
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    /// More data expected
    Collecting,
    /// Template fully collected; fetch it with `take`
    Complete,
    /// Collection failed; `reset` before reuse
    Error,
}

#[derive(Debug, PartialEq, Eq)]
enum State {
    Idle,
    Collecting,
    Complete,
    Failed,
}

/// Accumulator for one template transfer
#[derive(Debug)]
pub struct TemplateCapture {
    state: State,
    buf: BytesMut,
    capacity: usize,
    started_at: Option<Instant>,
}

impl TemplateCapture {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            buf: BytesMut::new(),
            capacity: INITIAL_CAPACITY,
            started_at: None,
        }
    }

    /// Begin a fresh collection
    pub fn start(&mut self) {
        self.buf = BytesMut::with_capacity(INITIAL_CAPACITY);
        self.capacity = INITIAL_CAPACITY;
        self.state = State::Collecting;
        self.started_at = Some(Instant::now());
    }

    /// Discard everything and return to idle
    pub fn reset(&mut self) {
        self.buf = BytesMut::new();
        self.capacity = INITIAL_CAPACITY;
        self.state = State::Idle;
        self.started_at = None;
    }

    /// Append one packet's payload
    pub fn feed(&mut self, data: &[u8], kind: PacketKind) -> CaptureStatus {
        match self.state {
            State::Collecting => {}
            State::Complete => return CaptureStatus::Complete,
            _ => return CaptureStatus::Error,
        }

        // A transfer that never produced a byte has stalled
        if self.buf.is_empty() {
            if let Some(started_at) = self.started_at {
                if started_at.elapsed() > COLLECT_DEADLINE {
                    debug!("template collection deadline elapsed with no data");
                    self.state = State::Failed;
                    return CaptureStatus::Error;
                }
            }
        }

        // Bound worst-case work per call
        let data = &data[..data.len().min(MAX_FEED_BYTES)];

        if !self.ensure_room(data.len()) {
            debug!(
                have = self.buf.len(),
                extra = data.len(),
                "template exceeds maximum size"
            );
            self.state = State::Failed;
            return CaptureStatus::Error;
        }
        self.buf.put_slice(data);

        // Terminator may straddle a feed boundary, so search the whole
        // buffer rather than just the new slice
        if let Some(pos) = find_terminator(&self.buf) {
            self.buf.truncate(pos + TEMPLATE_TERMINATOR.len());
            trace!(len = self.buf.len(), "terminator found");
            self.state = State::Complete;
            return CaptureStatus::Complete;
        }

        if kind == PacketKind::EndData {
            trace!(len = self.buf.len(), "end-of-data packet");
            self.state = State::Complete;
            return CaptureStatus::Complete;
        }

        CaptureStatus::Collecting
    }

    /// Consume the collected template
    pub fn take(&mut self) -> Option<Bytes> {
        if self.state != State::Complete {
            return None;
        }
        let template = std::mem::take(&mut self.buf).freeze();
        self.reset();
        Some(template)
    }

    /// Doubling growth, capped at [`MAX_TEMPLATE_BYTES`]
    fn ensure_room(&mut self, extra: usize) -> bool {
        let needed = self.buf.len() + extra;
        if needed > MAX_TEMPLATE_BYTES {
            return false;
        }
        while self.capacity < needed {
            self.capacity = (self.capacity * 2).min(MAX_TEMPLATE_BYTES);
        }
        if self.buf.capacity() < self.capacity {
            self.buf.reserve(self.capacity - self.buf.len());
        }
        true
    }
}

impl Default for TemplateCapture {
    fn default() -> Self {
        Self::new()
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(TEMPLATE_TERMINATOR.len())
        .position(|window| window == TEMPLATE_TERMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collects_across_feeds() {
        let mut capture = TemplateCapture::new();
        capture.start();

        assert_eq!(capture.feed(&[1, 2, 3], PacketKind::Data), CaptureStatus::Collecting);
        assert_eq!(capture.feed(&[4, 5], PacketKind::Data), CaptureStatus::Collecting);
        assert_eq!(capture.feed(&[6], PacketKind::EndData), CaptureStatus::Complete);

        let template = capture.take().unwrap();
        assert_eq!(template.as_ref(), &[1, 2, 3, 4, 5, 6][..]);
    }

    #[test]
    fn test_terminator_truncates() {
        let mut capture = TemplateCapture::new();
        capture.start();

        let mut payload = vec![0xAB, 0xCD];
        payload.extend_from_slice(&TEMPLATE_TERMINATOR);
        payload.extend_from_slice(&[0xFF, 0xFF]); // trailing junk is discarded

        assert_eq!(capture.feed(&payload, PacketKind::Data), CaptureStatus::Complete);

        let template = capture.take().unwrap();
        assert_eq!(template.len(), 2 + TEMPLATE_TERMINATOR.len());
        assert_eq!(&template[2..], &TEMPLATE_TERMINATOR[..]);
    }

    #[test]
    fn test_terminator_straddles_feeds() {
        let mut capture = TemplateCapture::new();
        capture.start();

        assert_eq!(
            capture.feed(&TEMPLATE_TERMINATOR[..2], PacketKind::Data),
            CaptureStatus::Collecting
        );
        assert_eq!(
            capture.feed(&TEMPLATE_TERMINATOR[2..], PacketKind::Data),
            CaptureStatus::Complete
        );
    }

    #[test]
    fn test_feed_truncated_to_cap() {
        let mut capture = TemplateCapture::new();
        capture.start();

        let oversized = vec![0u8; MAX_FEED_BYTES * 2];
        capture.feed(&oversized, PacketKind::EndData);

        assert_eq!(capture.take().unwrap().len(), MAX_FEED_BYTES);
    }

    #[test]
    fn test_max_size_exceeded() {
        let mut capture = TemplateCapture::new();
        capture.start();

        let chunk = vec![0u8; MAX_FEED_BYTES];
        for _ in 0..(MAX_TEMPLATE_BYTES / MAX_FEED_BYTES) {
            assert_eq!(capture.feed(&chunk, PacketKind::Data), CaptureStatus::Collecting);
        }
        assert_eq!(capture.feed(&[0], PacketKind::Data), CaptureStatus::Error);
        assert!(capture.take().is_none());
    }

    #[test]
    fn test_feed_without_start_is_error() {
        let mut capture = TemplateCapture::new();
        assert_eq!(capture.feed(&[1], PacketKind::Data), CaptureStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_with_no_data() {
        let mut capture = TemplateCapture::new();
        capture.start();

        tokio::time::advance(std::time::Duration::from_secs(6)).await;

        assert_eq!(capture.feed(&[1], PacketKind::Data), CaptureStatus::Error);
    }

    #[test]
    fn test_reset_allows_reuse() {
        let mut capture = TemplateCapture::new();
        capture.start();
        capture.feed(&[1, 2], PacketKind::Data);
        capture.reset();

        capture.start();
        assert_eq!(capture.feed(&[9], PacketKind::EndData), CaptureStatus::Complete);
        assert_eq!(capture.take().unwrap().as_ref(), &[9][..]);
    }
}
