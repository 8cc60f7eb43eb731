//! Search result payload

use crate::error::{Error, Result};

/// One library match reported by a Search acknowledge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Library location of the matched template
    pub page_id: u16,

    /// Match confidence score
    pub score: u16,
}

impl SearchMatch {
    /// Parse from the four parameter bytes following the confirmation code
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < 4 {
            return Err(Error::Truncated {
                what: "search match",
                expected: 4,
                actual: payload.len(),
            });
        }
        Ok(Self {
            page_id: u16::from_be_bytes([payload[0], payload[1]]),
            score: u16::from_be_bytes([payload[2], payload[3]]),
        })
    }
}
