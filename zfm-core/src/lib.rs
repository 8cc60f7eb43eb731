//! # zfm-core
//!
//! Wire protocol primitives for ZhianTec/GROW ZFM and R50x optical
//! fingerprint modules.
//!
//! This crate provides the low-level protocol pieces:
//! - Packet structure and encoding/decoding
//! - Checksum calculation
//! - Instruction and confirmation code definitions
//! - Frame scanning over raw serial reads
//! - Protocol constants

pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod frame;
pub mod packet;
pub mod status;

pub use command::Command;
pub use error::{Error, Result};
pub use frame::scan_frames;
pub use packet::{Packet, PacketKind};
pub use status::StatusCode;

/// Broadcast/default device address shipped on these modules
pub const DEFAULT_ADDRESS: u32 = 0xFFFF_FFFF;

/// Factory-default module password
pub const DEFAULT_PASSWORD: u32 = 0x0000_0000;

/// Maximum parameter bytes carried by any frame this driver builds or accepts
pub const MAX_PARAMETERS: usize = 32;
