//! Protocol constants

/// Frame start marker, transmitted high byte first
pub const HEADER: u16 = 0xEF01;

/// Frame start marker as it appears on the wire
pub const HEADER_BYTES: [u8; 2] = [0xEF, 0x01];

/// Bytes in a frame that are not parameters:
/// header (2) + address (4) + kind (1) + length (2) + code (1) + checksum (2)
pub const FRAME_OVERHEAD: usize = 12;

/// Smallest possible frame (zero parameters)
pub const MIN_FRAME_SIZE: usize = FRAME_OVERHEAD;

/// The length field covers kind + code + params + checksum
pub const LENGTH_OVERHEAD: u16 = 4;

/// Character buffer 1 (first capture slot)
pub const CHAR_BUFFER_1: u8 = 0x01;

/// Character buffer 2 (second capture slot)
pub const CHAR_BUFFER_2: u8 = 0x02;

/// Template library capacity assumed for full-range searches.
///
/// R502 ships with 200 slots; larger R503 variants still accept searches
/// bounded to this range.
pub const LIBRARY_CAPACITY: u16 = 200;

/// Template slots covered by one index-table page
pub const PAGE_SLOTS: u16 = 256;

/// Size of one index-table bitmap in bytes
pub const INDEX_TABLE_BYTES: usize = 32;
