//! Frame scanning over raw serial reads
//!
//! A single UART read may contain zero, one, or several concatenated
//! frames, possibly preceded by noise bytes and possibly ending in a
//! truncated frame. [`scan_frames`] walks the buffer and extracts every
//! complete valid frame.

use tracing::{debug, trace};

use crate::{
    constants::HEADER_BYTES,
    error::Error,
    packet::Packet,
};

/// Extract every complete frame from `buf`
///
/// Noise bytes before a frame marker are skipped one byte at a time. A
/// frame that fails checksum validation is dropped and scanning resumes
/// past its marker. A truncated trailing frame is dropped entirely; the
/// module retransmits acknowledgements on command retry, so the engine
/// recovers through its step timeouts.
pub fn scan_frames(buf: &[u8]) -> Vec<Packet> {
    let mut packets = Vec::new();
    let mut cursor = 0;

    while cursor + HEADER_BYTES.len() <= buf.len() {
        if buf[cursor..cursor + 2] != HEADER_BYTES {
            cursor += 1;
            continue;
        }

        match Packet::decode(&buf[cursor..]) {
            Ok((packet, used)) => {
                trace!(offset = cursor, used, "decoded frame: {:?}", packet);
                packets.push(packet);
                cursor += used;
            }
            Err(Error::Incomplete { needed, available }) => {
                debug!(
                    offset = cursor,
                    needed, available, "dropping truncated trailing frame"
                );
                break;
            }
            Err(e) => {
                debug!(offset = cursor, "dropping bad frame: {}", e);
                // Step past this marker and hunt for the next one
                cursor += 2;
            }
        }
    }

    packets
}
