//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("read timeout")]
    ReadTimeout,

    #[error("serial link closed by peer")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Timeouts are idle ticks; everything else is a real fault
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::ReadTimeout)
    }
}
