//! Confirmation (status) code definitions
//!
//! Every acknowledge frame carries one of these in its code byte. Codes
//! the module may emit but this driver does not recognize are kept as
//! `Other` so nothing is lost on the way to the event layer.

use std::fmt;

/// Confirmation codes returned by the module
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// Command executed successfully
    Ok,
    /// Error receiving the packet
    PacketErr,
    /// No finger on the sensor
    NoFinger,
    /// Failed to capture an image
    ImageFail,
    /// Image too messy to process
    ImageMess,
    /// Too few feature points in the image
    TooFewPoints,
    /// Fingers in the two buffers do not match
    NoMatch,
    /// No matching template found in the library
    NotFound,
    /// Failed to combine the character buffers
    EnrollMismatch,
    /// Location is beyond the library range
    BadLocation,
    /// Failed to read a template from the library
    DbReadFail,
    /// Failed to upload a character file
    UploadFeatureFail,
    /// Module cannot receive further packets
    PacketReceiveFail,
    /// Failed to upload an image
    UploadImageFail,
    /// Failed to delete a template
    DeleteFail,
    /// Failed to clear the library
    DbClearFail,
    /// Wrong password
    WrongPassword,
    /// No valid primary image in the buffer
    InvalidImage,
    /// Flash write error
    FlashWriteError,
    /// Undefined error
    NoDefinitionError,
    /// Invalid register number
    InvalidRegister,
    /// Incorrect register configuration
    IncorrectConfig,
    /// Wrong notepad page number
    WrongNotepadPage,
    /// Failed to operate the communication port
    CommPortFailure,
    /// Template library is full
    DbFull,
    /// Sensor hardware is abnormal
    SensorAbnormal,
    /// Code not recognized by this driver
    Other(u8),
}

impl StatusCode {
    /// Interpret a raw confirmation byte. Total over all byte values.
    pub fn from_raw(code: u8) -> Self {
        match code {
            0x00 => Self::Ok,
            0x01 => Self::PacketErr,
            0x02 => Self::NoFinger,
            0x03 => Self::ImageFail,
            0x06 => Self::ImageMess,
            0x07 => Self::TooFewPoints,
            0x08 => Self::NoMatch,
            0x09 => Self::NotFound,
            0x0A => Self::EnrollMismatch,
            0x0B => Self::BadLocation,
            0x0C => Self::DbReadFail,
            0x0D => Self::UploadFeatureFail,
            0x0E => Self::PacketReceiveFail,
            0x0F => Self::UploadImageFail,
            0x10 => Self::DeleteFail,
            0x11 => Self::DbClearFail,
            0x13 => Self::WrongPassword,
            0x15 => Self::InvalidImage,
            0x18 => Self::FlashWriteError,
            0x19 => Self::NoDefinitionError,
            0x1A => Self::InvalidRegister,
            0x1B => Self::IncorrectConfig,
            0x1C => Self::WrongNotepadPage,
            0x1D => Self::CommPortFailure,
            0x1F => Self::DbFull,
            0x29 => Self::SensorAbnormal,
            other => Self::Other(other),
        }
    }

    /// Wire value of this code
    pub fn raw(self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::PacketErr => 0x01,
            Self::NoFinger => 0x02,
            Self::ImageFail => 0x03,
            Self::ImageMess => 0x06,
            Self::TooFewPoints => 0x07,
            Self::NoMatch => 0x08,
            Self::NotFound => 0x09,
            Self::EnrollMismatch => 0x0A,
            Self::BadLocation => 0x0B,
            Self::DbReadFail => 0x0C,
            Self::UploadFeatureFail => 0x0D,
            Self::PacketReceiveFail => 0x0E,
            Self::UploadImageFail => 0x0F,
            Self::DeleteFail => 0x10,
            Self::DbClearFail => 0x11,
            Self::WrongPassword => 0x13,
            Self::InvalidImage => 0x15,
            Self::FlashWriteError => 0x18,
            Self::NoDefinitionError => 0x19,
            Self::InvalidRegister => 0x1A,
            Self::IncorrectConfig => 0x1B,
            Self::WrongNotepadPage => 0x1C,
            Self::CommPortFailure => 0x1D,
            Self::DbFull => 0x1F,
            Self::SensorAbnormal => 0x29,
            Self::Other(code) => code,
        }
    }

    /// Check if the command executed successfully
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Check if this code is one this driver recognizes
    pub fn is_recognized(self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02X})", self, self.raw())
    }
}
