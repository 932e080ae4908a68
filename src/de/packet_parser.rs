use crate::{mqtt_client::Error, varint::RemainingLength};
use bit_field::BitField;

/// A bounds-checked cursor over a received packet.
pub(crate) struct PacketParser<'a> {
    buffer: &'a [u8],
    index: usize,
}

impl<'a> PacketParser<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, index: 0 }
    }

    /// All data that has not yet been consumed.
    pub fn payload(&mut self) -> &'a [u8] {
        let remainder = &self.buffer[self.index..];
        self.index = self.buffer.len();
        remainder
    }

    pub fn read_borrowed(&mut self, count: usize) -> Result<&'a [u8], Error> {
        if self.len() < count {
            return Err(Error::MalformedPacket);
        }

        let borrowed_data = &self.buffer[self.index..][..count];
        self.index += count;

        Ok(borrowed_data)
    }

    pub fn len(&self) -> usize {
        self.buffer.len() - self.index
    }

    /// Read the packet type nibble, the flags nibble and the remaining length.
    pub fn read_fixed_header(&mut self) -> Result<(u8, u8, usize), Error> {
        let header = self.read_u8()?;

        let mut decoder = RemainingLength::new();
        let packet_length = loop {
            if let Some(length) = decoder.push(self.read_u8()?)? {
                break length;
            }
        };

        Ok((
            header.get_bits(4..=7),
            header.get_bits(0..=3),
            packet_length as usize,
        ))
    }

    /// Read a length-prefixed string without validating its encoding.
    pub fn read_string_bytes(&mut self) -> Result<&'a [u8], Error> {
        let string_length = self.read_u16()? as usize;
        self.read_borrowed(string_length)
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let mut buffer: [u8; 2] = [0; 2];
        buffer.copy_from_slice(self.read_borrowed(2)?);
        Ok(u16::from_be_bytes(buffer))
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.read_borrowed(1)?[0])
    }
}

#[cfg(test)]
mod tests {
    use super::PacketParser;
    use crate::mqtt_client::Error;

    #[test]
    fn reads_fixed_header() {
        let mut parser = PacketParser::new(&[0x32, 0x80, 0x01, 0xAA]);
        assert_eq!(parser.read_fixed_header().unwrap(), (3, 2, 128));
        assert_eq!(parser.len(), 1);
    }

    #[test]
    fn strings_are_bounds_checked() {
        let mut parser = PacketParser::new(&[0x00, 0x05, b'a', b'b']);
        assert_eq!(parser.read_string_bytes(), Err(Error::MalformedPacket));
    }

    #[test]
    fn truncated_integer_rejected() {
        let mut parser = PacketParser::new(&[0x01]);
        assert_eq!(parser.read_u16(), Err(Error::MalformedPacket));
    }

    #[test]
    fn payload_consumes_remainder() {
        let mut parser = PacketParser::new(&[0x00, 0x01, b'a', 1, 2, 3]);
        assert_eq!(parser.read_string_bytes().unwrap(), b"a");
        assert_eq!(parser.payload(), [1, 2, 3]);
        assert_eq!(parser.len(), 0);
        assert!(parser.payload().is_empty());
    }
}
