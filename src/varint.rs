//! Remaining-length codec.
//!
//! MQTT encodes the size of everything following the fixed header as a variable-length
//! integer: seven value bits per byte, least significant group first, with the top bit flagging
//! that another byte follows. At most four bytes may be used, limiting lengths to 268,435,455.
use crate::mqtt_client::Error;
use heapless::Vec;
use varint_rs::VarintWriter;

/// The largest value representable by an MQTT remaining length field.
pub const MAX_REMAINING_LENGTH: u32 = 268_435_455;

/// The maximum number of bytes an encoded remaining length may occupy.
pub const MAX_LENGTH_SIZE: usize = 4;

/// An encoded remaining length.
#[derive(Default)]
pub struct VarintBuffer {
    pub data: Vec<u8, MAX_LENGTH_SIZE>,
}

impl VarintBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a remaining length using the minimal number of bytes.
    ///
    /// # Returns
    /// The encoded bytes, or an error if the value cannot be represented in four bytes.
    pub fn encode(length: u32) -> Result<Self, ()> {
        let mut buffer = Self::new();
        buffer.write_u32_varint(length)?;
        Ok(buffer)
    }
}

impl VarintWriter for VarintBuffer {
    type Error = ();

    fn write(&mut self, byte: u8) -> Result<(), ()> {
        self.data.push(byte).map_err(|_| ())
    }
}

/// Get the number of bytes required to encode a remaining length.
pub fn encoded_len(length: usize) -> usize {
    if length < 0x80 {
        1
    } else if length < 0x4000 {
        2
    } else if length < 0x20_0000 {
        3
    } else {
        4
    }
}

/// Incremental decoder for a remaining length field arriving one byte at a time.
#[derive(Debug, Default)]
pub struct RemainingLength {
    value: u32,
    size: usize,
}

impl RemainingLength {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next byte of the field into the decoder.
    ///
    /// # Returns
    /// `Some(length)` once the final byte has been seen, `None` if more bytes are required.
    pub fn push(&mut self, byte: u8) -> Result<Option<u32>, Error> {
        self.value |= u32::from(byte & 0x7F) << (7 * self.size);
        self.size += 1;

        if byte & 0x80 == 0 {
            return Ok(Some(self.value));
        }

        // A fifth length byte would be required.
        if self.size == MAX_LENGTH_SIZE {
            warn!("Encountered invalid remaining length");
            return Err(Error::MalformedLength);
        }

        Ok(None)
    }

    /// The number of length bytes consumed so far.
    pub fn size(&self) -> usize {
        self.size
    }
}
