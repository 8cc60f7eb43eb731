//! Protocol packet structure and encoding/decoding

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::Command,
    constants::{FRAME_OVERHEAD, HEADER_BYTES, LENGTH_OVERHEAD, MIN_FRAME_SIZE},
    error::{Error, Result},
    MAX_PARAMETERS,
};

/// Packet kind identifier byte
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    /// Command from host to module
    Command = 0x01,
    /// Data packet, more to follow
    Data = 0x02,
    /// Acknowledge from module to host
    Ack = 0x07,
    /// Final data packet of a transfer
    EndData = 0x08,
}

impl TryFrom<u8> for PacketKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::Data),
            0x07 => Ok(Self::Ack),
            0x08 => Ok(Self::EndData),
            other => Err(Error::UnknownPacketKind(other)),
        }
    }
}

/// One wire-format protocol message
///
/// # Frame layout
///
/// ```text
/// ┌────────┬─────────┬──────┬────────┬──────┬──────────┬──────────┐
/// │ 0xEF01 │ address │ kind │ length │ code │  params  │ checksum │
/// │ 2 bytes│ 4 bytes │ 1 B  │ 2 bytes│ 1 B  │ 0..32 B  │ 2 bytes  │
/// └────────┴─────────┴──────┴────────┴──────┴──────────┴──────────┘
/// ```
///
/// All multi-byte fields are big-endian. The length field counts the
/// kind byte, code byte, parameters and checksum; the checksum covers
/// the same bytes minus itself, with header and address excluded.
///
/// Packets are plain values: each decoded packet is handed to the
/// correlation layer once and then dropped.
///
/// # Examples
///
/// ```
/// use zfm_core::{Command, Packet, DEFAULT_ADDRESS};
///
/// let packet = Packet::command(DEFAULT_ADDRESS, Command::GenImg, &[]).unwrap();
/// let encoded = packet.encode();
/// let (decoded, used) = Packet::decode(&encoded).unwrap();
/// assert_eq!(used, encoded.len());
/// assert_eq!(decoded.code, Command::GenImg.code());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Device address
    pub address: u32,

    /// Packet kind
    pub kind: PacketKind,

    /// Instruction code (outbound) or confirmation code (inbound)
    pub code: u8,

    /// Parameter bytes
    pub params: Bytes,
}

impl Packet {
    /// Create a packet of any kind, validating the parameter cap
    pub fn new(address: u32, kind: PacketKind, code: u8, params: impl Into<Bytes>) -> Result<Self> {
        let params = params.into();
        if params.len() > MAX_PARAMETERS {
            return Err(Error::ParamsTooLong {
                len: params.len(),
                max: MAX_PARAMETERS,
            });
        }
        Ok(Self {
            address,
            kind,
            code,
            params,
        })
    }

    /// Create an outbound command packet
    ///
    /// # Examples
    ///
    /// ```
    /// use zfm_core::{Command, Packet, DEFAULT_ADDRESS};
    ///
    /// let packet = Packet::command(DEFAULT_ADDRESS, Command::Img2Tz, &[0x01]).unwrap();
    /// assert_eq!(packet.params.len(), 1);
    /// ```
    pub fn command(address: u32, command: Command, params: &[u8]) -> Result<Self> {
        Self::new(
            address,
            PacketKind::Command,
            command.code(),
            Bytes::copy_from_slice(params),
        )
    }

    /// Declared length: kind + code + params + checksum
    pub fn length(&self) -> u16 {
        LENGTH_OVERHEAD + self.params.len() as u16
    }

    /// Calculate the checksum for this packet
    pub fn checksum(&self) -> u16 {
        checksum::calculate(self.kind as u8, self.length(), self.code, &self.params)
    }

    /// Total size of the encoded frame
    pub fn size(&self) -> usize {
        FRAME_OVERHEAD + self.params.len()
    }

    /// Encode the packet to its wire image
    ///
    /// The checksum is computed last, after the address is already in
    /// place, so callers that assign the address at send time get a
    /// consistent frame.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_slice(&HEADER_BYTES);
        buf.put_u32(self.address);
        buf.put_u8(self.kind as u8);
        buf.put_u16(self.length());
        buf.put_u8(self.code);
        buf.put_slice(&self.params);
        buf.put_u16(self.checksum());

        buf
    }

    /// Decode one packet from the start of `buf`
    ///
    /// Returns the packet and the number of bytes consumed. The caller
    /// state is never touched on failure.
    ///
    /// # Errors
    ///
    /// - [`Error::Incomplete`]: not enough bytes yet; await more input
    /// - [`Error::BadHeader`]: no marker at offset 0; resynchronize
    /// - [`Error::ChecksumMismatch`]: corrupt frame; drop and resynchronize
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < MIN_FRAME_SIZE {
            return Err(Error::Incomplete {
                needed: MIN_FRAME_SIZE,
                available: buf.len(),
            });
        }

        if buf[0..2] != HEADER_BYTES {
            return Err(Error::BadHeader);
        }

        let address = u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]);
        let kind_raw = buf[6];
        let length = u16::from_be_bytes([buf[7], buf[8]]);

        if length < LENGTH_OVERHEAD || (length - LENGTH_OVERHEAD) as usize > MAX_PARAMETERS {
            return Err(Error::InvalidLength { length });
        }

        // header + address + kind + length field, then everything the
        // length declares except the kind byte it re-counts
        let total = 8 + length as usize;
        if buf.len() < total {
            return Err(Error::Incomplete {
                needed: total,
                available: buf.len(),
            });
        }

        let code = buf[9];
        let params_len = (length - LENGTH_OVERHEAD) as usize;
        let params = &buf[10..10 + params_len];
        let received = u16::from_be_bytes([buf[10 + params_len], buf[11 + params_len]]);

        let expected = checksum::calculate(kind_raw, length, code, params);
        if expected != received {
            return Err(Error::ChecksumMismatch { expected, received });
        }

        let kind = PacketKind::try_from(kind_raw)?;

        let packet = Self {
            address,
            kind,
            code,
            params: Bytes::copy_from_slice(params),
        };

        Ok((packet, total))
    }

    /// Scan forward for the next frame marker
    ///
    /// Recovers alignment after a corrupt or partial frame. Returns the
    /// offset of the next candidate frame start, or `None`.
    pub fn resynchronize(buf: &[u8]) -> Option<usize> {
        buf.windows(2).position(|window| window == HEADER_BYTES)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("address", &format_args!("0x{:08X}", self.address))
            .field("kind", &self.kind)
            .field("code", &format_args!("0x{:02X}", self.code))
            .field("params", &format_args!("{}", hex::encode(&self.params)))
            .finish()
    }
}
