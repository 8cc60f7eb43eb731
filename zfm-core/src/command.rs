//! Instruction code definitions
//!
//! Names follow the R50x datasheet.

use std::fmt;

/// Instruction codes accepted by the module
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Capture a fingerprint image into the image buffer
    GenImg = 0x01,
    /// Generate a character file from the image buffer
    Img2Tz = 0x02,
    /// Compare the two character buffers
    Match = 0x03,
    /// Search the library for the character buffer
    Search = 0x04,
    /// Merge both character buffers into a template model
    RegModel = 0x05,
    /// Store the model at a library location
    Store = 0x06,
    /// Load a stored template into a character buffer
    LoadChar = 0x07,
    /// Upload a character buffer to the host
    UpChar = 0x08,
    /// Download a character buffer from the host
    DownChar = 0x09,
    /// Delete one or more templates
    DeletChar = 0x0C,
    /// Clear the whole template library
    Empty = 0x0D,
    /// Write a system register
    SetSysPara = 0x0E,
    /// Read status and basic configuration
    ReadSysPara = 0x0F,
    /// Verify the module password
    VfyPwd = 0x13,
    /// Read the count of stored templates
    TemplateNum = 0x1D,
    /// Read one page of the occupancy index table
    ReadIndexTable = 0x1F,
    /// Configure the aura LED ring
    AuraLedConfig = 0x35,
    /// Check whether the sensor is operational
    CheckSensor = 0x36,
    /// Soft reset
    SoftRst = 0x3D,
    /// Handshake
    HandShake = 0x40,
}

impl Command {
    /// Wire value of this instruction
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Get datasheet name
    pub fn name(self) -> &'static str {
        match self {
            Self::GenImg => "GenImg",
            Self::Img2Tz => "Img2Tz",
            Self::Match => "Match",
            Self::Search => "Search",
            Self::RegModel => "RegModel",
            Self::Store => "Store",
            Self::LoadChar => "LoadChar",
            Self::UpChar => "UpChar",
            Self::DownChar => "DownChar",
            Self::DeletChar => "DeletChar",
            Self::Empty => "Empty",
            Self::SetSysPara => "SetSysPara",
            Self::ReadSysPara => "ReadSysPara",
            Self::VfyPwd => "VfyPwd",
            Self::TemplateNum => "TemplateNum",
            Self::ReadIndexTable => "ReadIndexTable",
            Self::AuraLedConfig => "AuraLedConfig",
            Self::CheckSensor => "CheckSensor",
            Self::SoftRst => "SoftRst",
            Self::HandShake => "HandShake",
        }
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd.code()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), self.code())
    }
}
