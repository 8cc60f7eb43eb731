//! Error types for zfm-core

/// Result type alias for core protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Command parameters exceed the protocol cap
    #[error("parameters too long: {len} bytes (max: {max} bytes)")]
    ParamsTooLong { len: usize, max: usize },

    /// Buffer does not yet hold a complete frame
    #[error("incomplete frame: need {needed} bytes, have {available}")]
    Incomplete { needed: usize, available: usize },

    /// Frame does not start with the 0xEF01 marker
    #[error("frame header marker not found")]
    BadHeader,

    /// Declared length is impossible for this protocol
    #[error("invalid declared length: {length}")]
    InvalidLength { length: u16 },

    /// Packet kind byte is not a known identifier
    #[error("unknown packet kind: 0x{0:02X}")]
    UnknownPacketKind(u8),

    /// Checksum verification failed
    #[error("checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch { expected: u16, received: u16 },
}
