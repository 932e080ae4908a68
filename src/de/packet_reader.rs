use crate::{
    message_types::MessageType,
    mqtt_client::{Error, PayloadSink},
    network_manager::{InterfaceHolder, Transport},
    varint::RemainingLength,
};
use bit_field::BitField;
use embedded_time::{duration::Seconds, Clock};

/// The result of reading a single packet.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// The number of packet bytes stored in the buffer. Zero if the packet was discarded.
    pub length: usize,

    /// The number of bytes used to encode the remaining length.
    pub length_size: usize,

    /// The message ID of a QoS 1 or 2 PUBLISH, captured even if it did not fit the buffer.
    pub packet_id: Option<u16>,
}

/// Reads one packet at a time from the network into a fixed buffer.
pub(crate) struct PacketReader<'a> {
    buffer: &'a mut [u8],
    stored: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, stored: 0 }
    }

    /// Keep a byte if there is space for it.
    fn store(&mut self, byte: u8) {
        if let Some(slot) = self.buffer.get_mut(self.stored) {
            *slot = byte;
            self.stored += 1;
        }
    }

    /// Read a complete packet from the network.
    ///
    /// # Note
    /// Bytes that do not fit into the buffer are consumed from the network but not stored. If a
    /// sink is provided, PUBLISH payload bytes are forwarded to it as they arrive, regardless of
    /// whether they fit. Without a sink, a packet larger than the buffer is discarded and reported
    /// with a length of zero.
    ///
    /// # Args
    /// * `network` - The network to read from.
    /// * `clock` - The clock used to time out each byte.
    /// * `timeout` - The maximum time to wait for each byte.
    /// * `sink` - An optional destination for PUBLISH payload bytes.
    pub fn read_packet<T: Transport, C: Clock<T = u32>>(
        mut self,
        network: &mut InterfaceHolder<T>,
        clock: &C,
        timeout: Seconds<u32>,
        mut sink: Option<&mut (dyn PayloadSink + '_)>,
    ) -> Result<Frame, Error> {
        let header = network.read_byte(clock, timeout)?;
        self.store(header);

        let is_publish = MessageType::from_header(header) == Some(MessageType::Publish);

        let mut decoder = RemainingLength::new();
        let remaining_length = loop {
            let byte = network.read_byte(clock, timeout)?;
            self.store(byte);
            if let Some(length) = decoder.push(byte)? {
                break length as usize;
            }
        };

        let length_size = decoder.size();

        // The topic and message ID of a PUBLISH are never forwarded to the sink.
        let mut skip = 0;
        let mut consumed = 0;
        let mut has_id = false;
        let mut id = [0u8; 2];
        if is_publish && remaining_length >= 2 {
            let msb = network.read_byte(clock, timeout)?;
            self.store(msb);
            let lsb = network.read_byte(clock, timeout)?;
            self.store(lsb);

            skip = u16::from_be_bytes([msb, lsb]) as usize;
            if header.get_bits(1..=2) > 0 {
                skip += 2;
                has_id = true;
            }

            consumed = 2;
        }

        for position in 1..=remaining_length.saturating_sub(consumed) {
            let byte = network.read_byte(clock, timeout)?;

            if has_id && position + 2 > skip && position <= skip {
                id[position + 1 - skip] = byte;
            }

            if is_publish && position > skip {
                if let Some(sink) = sink.as_mut() {
                    sink.write_byte(byte);
                }
            }

            self.store(byte);
        }

        // The loop only reaches the identifier if the body is long enough to hold it.
        let packet_id = (has_id && remaining_length >= skip + consumed)
            .then(|| u16::from_be_bytes(id));

        let total_length = 1 + length_size + remaining_length;
        trace!("Read: {:0x?}", &self.buffer[..self.stored]);

        if sink.is_none() && total_length > self.buffer.len() {
            warn!(
                "Discarding {} byte packet exceeding the {} byte buffer",
                total_length,
                self.buffer.len()
            );
            return Ok(Frame {
                length: 0,
                length_size,
                packet_id,
            });
        }

        Ok(Frame {
            length: self.stored,
            length_size,
            packet_id,
        })
    }
}
