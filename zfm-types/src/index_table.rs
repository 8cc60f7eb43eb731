//! Template library occupancy bitmap

use crate::error::{Error, Result};

/// Bitmap bytes in one index-table page
pub const TABLE_BYTES: usize = 32;

/// Slots described by one page
pub const PAGE_SLOTS: usize = TABLE_BYTES * 8;

/// One page of the module's occupancy index table
///
/// Returned by ReadIndexTable: bit `slot % 8` of byte `slot / 8` is set
/// when that template slot holds a stored model. Read-only snapshot;
/// callers re-fetch whenever occupancy must be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexTable {
    bits: [u8; TABLE_BYTES],
}

impl IndexTable {
    /// Wrap a raw 32-byte bitmap
    pub fn new(bits: [u8; TABLE_BYTES]) -> Self {
        Self { bits }
    }

    /// Parse the bitmap from a response payload
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < TABLE_BYTES {
            return Err(Error::Truncated {
                what: "index table",
                expected: TABLE_BYTES,
                actual: payload.len(),
            });
        }
        let mut bits = [0u8; TABLE_BYTES];
        bits.copy_from_slice(&payload[..TABLE_BYTES]);
        Ok(Self { bits })
    }

    /// Check whether a slot within this page holds a template
    pub fn is_occupied(&self, slot: u8) -> bool {
        self.bits[slot as usize / 8] & (1 << (slot % 8)) != 0
    }

    /// Count occupied slots in this page
    pub fn occupied_count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Lowest free slot in this page, if any
    pub fn first_free(&self) -> Option<u8> {
        (0..=u8::MAX).find(|slot| !self.is_occupied(*slot))
    }
}
