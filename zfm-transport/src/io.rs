//! Serial halves over any tokio byte stream

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::trace;

use crate::{error::*, SerialRx, SerialTx};

/// Read buffer reserved per call; a burst of concatenated frames still
/// fits with room to spare.
const READ_CAPACITY: usize = 512;

/// Write half over an [`AsyncWrite`] stream
pub struct IoTx<W> {
    writer: W,
}

impl<W> IoTx<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> SerialTx for IoTx<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        trace!("writing {} bytes: {:02X?}", data.len(), &data[..data.len().min(16)]);

        self.writer.write_all(data).await?;
        self.writer.flush().await?;

        Ok(())
    }
}

/// Read half over an [`AsyncRead`] stream
pub struct IoRx<R> {
    reader: R,
}

impl<R> IoRx<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R> SerialRx for IoRx<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read(&mut self, limit: Duration) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(READ_CAPACITY);

        let n = timeout(limit, self.reader.read_buf(&mut buf))
            .await
            .map_err(|_| Error::ReadTimeout)?
            .map_err(Error::Io)?;

        if n == 0 {
            return Err(Error::Closed);
        }

        trace!("read {} bytes: {:02X?}", n, &buf[..n.min(16)]);

        Ok(buf)
    }
}
