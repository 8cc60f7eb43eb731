//! Serial byte-stream boundary for the ZFM protocol engine
//!
//! The engine talks to the module through two narrow traits: a write
//! half and a read half. UART bring-up (baud rate, pins, driver
//! install) is the platform's business; anything that can move bytes
//! both ways can back these traits: a real UART, a TCP serial bridge,
//! or an in-memory pair in tests.

pub mod error;
pub mod io;

pub use error::{Error, Result};
pub use io::{IoRx, IoTx};

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;

/// Write half of the serial link
#[async_trait]
pub trait SerialTx: Send {
    /// Write the whole buffer to the device
    async fn write_all(&mut self, data: &[u8]) -> Result<()>;
}

/// Read half of the serial link
#[async_trait]
pub trait SerialRx: Send {
    /// Read whatever bytes arrive within `timeout`
    ///
    /// Returns [`Error::ReadTimeout`] when nothing arrived in time; the
    /// caller treats that as an idle tick, not a failure.
    async fn read(&mut self, timeout: Duration) -> Result<BytesMut>;
}
