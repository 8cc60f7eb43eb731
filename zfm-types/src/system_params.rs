//! System parameter block returned by ReadSysPara

use crate::error::{Error, Result};

/// Basic status and configuration of the module
///
/// Sixteen payload bytes, all fields big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemParameters {
    /// Status register; see the instance methods for individual bits
    pub status_register: u16,

    /// System identifier code (constant 0x0009 per the datasheet)
    pub system_identifier: u16,

    /// Template library capacity
    pub library_size: u16,

    /// Security level, 1 through 5
    pub security_level: u16,

    /// Device address echoed back
    pub device_address: u32,

    /// Data packet size code: 0 = 32, 1 = 64, 2 = 128, 3 = 256 bytes
    pub packet_size_code: u16,

    /// Baud rate as a multiple of 9600
    pub baud_multiplier: u16,
}

impl SystemParameters {
    /// Parse from the sixteen parameter bytes of a ReadSysPara acknowledge
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < 16 {
            return Err(Error::Truncated {
                what: "system parameters",
                expected: 16,
                actual: payload.len(),
            });
        }
        let be16 = |i: usize| u16::from_be_bytes([payload[i], payload[i + 1]]);
        Ok(Self {
            status_register: be16(0),
            system_identifier: be16(2),
            library_size: be16(4),
            security_level: be16(6),
            device_address: u32::from_be_bytes([payload[8], payload[9], payload[10], payload[11]]),
            packet_size_code: be16(12),
            baud_multiplier: be16(14),
        })
    }

    /// Module is busy executing a command
    pub fn busy(&self) -> bool {
        self.status_register & (1 << 0) != 0
    }

    /// A matching finger was found by the last operation
    pub fn has_finger_match(&self) -> bool {
        self.status_register & (1 << 1) != 0
    }

    /// Password handshake has succeeded
    pub fn password_verified(&self) -> bool {
        self.status_register & (1 << 2) != 0
    }

    /// Image buffer holds a valid image
    pub fn has_valid_image(&self) -> bool {
        self.status_register & (1 << 3) != 0
    }

    /// Data packet size in bytes
    pub fn packet_size(&self) -> usize {
        32 << self.packet_size_code.min(3)
    }

    /// Baud rate in bits per second
    pub fn baud_rate(&self) -> u32 {
        self.baud_multiplier as u32 * 9600
    }
}
