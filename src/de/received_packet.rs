use super::PacketParser;
use crate::{
    message_types::MessageType, mqtt_client::Error, reason_codes::ConnectReturnCode, QoS, Retain,
};
use bit_field::BitField;
use core::convert::TryFrom;

/// A PUBLISH packet received from the broker.
#[derive(Debug, PartialEq)]
pub struct InboundPublish<'a> {
    /// The raw topic bytes, without the length prefix.
    pub topic: &'a [u8],

    /// The message identifier. Only present for QoS above [QoS::AtMostOnce].
    pub packet_id: Option<u16>,

    /// The application payload. May be truncated if the packet did not fit the buffer.
    pub payload: &'a [u8],

    pub qos: QoS,
    pub retain: Retain,
    pub dup: bool,
}

impl<'a> InboundPublish<'a> {
    /// The topic as a string, if it is valid UTF-8.
    pub fn topic(&self) -> Option<&'a str> {
        core::str::from_utf8(self.topic).ok()
    }
}

#[derive(Debug, PartialEq)]
pub enum ReceivedPacket<'a> {
    ConnAck {
        session_present: bool,
        return_code: ConnectReturnCode,
    },
    Publish(InboundPublish<'a>),
    PubAck(u16),
    SubAck(u16),
    UnsubAck(u16),
    PingReq,
    PingResp,
    Other(MessageType),
}

impl<'a> ReceivedPacket<'a> {
    /// Parse a complete frame, including its fixed header.
    pub fn parse(frame: &'a [u8]) -> Result<Self, Error> {
        let mut parser = PacketParser::new(frame);
        let (typ, flags, _length) = parser.read_fixed_header()?;

        let packet_type = MessageType::try_from(typ).map_err(|_| Error::MalformedPacket)?;

        let packet = match packet_type {
            MessageType::ConnAck => {
                let acknowledge_flags = parser.read_u8()?;
                ReceivedPacket::ConnAck {
                    session_present: acknowledge_flags.get_bit(0),
                    return_code: ConnectReturnCode::from(parser.read_u8()?),
                }
            }
            MessageType::Publish => {
                let qos = QoS::try_from(flags.get_bits(1..=2))
                    .map_err(|_| Error::MalformedPacket)?;

                let topic = parser.read_string_bytes()?;
                let packet_id = if qos > QoS::AtMostOnce {
                    Some(parser.read_u16()?)
                } else {
                    None
                };

                ReceivedPacket::Publish(InboundPublish {
                    topic,
                    packet_id,
                    payload: parser.payload(),
                    qos,
                    retain: flags.get_bit(0).into(),
                    dup: flags.get_bit(3),
                })
            }
            MessageType::PubAck => ReceivedPacket::PubAck(parser.read_u16()?),
            MessageType::SubAck => ReceivedPacket::SubAck(parser.read_u16()?),
            MessageType::UnsubAck => ReceivedPacket::UnsubAck(parser.read_u16()?),
            MessageType::PingReq => ReceivedPacket::PingReq,
            MessageType::PingResp => ReceivedPacket::PingResp,
            other => ReceivedPacket::Other(other),
        };

        Ok(packet)
    }
}
