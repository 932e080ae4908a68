use crate::{
    packets::{Connect, Disconnect, PingReq, PingResp, Pub, PubAck, Subscribe, Unsubscribe},
    QoS, Retain,
};
use bit_field::BitField;
use num_enum::TryFromPrimitive;

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum MessageType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    Unsubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
}

impl MessageType {
    /// Extract the message type from the first byte of a fixed header.
    pub fn from_header(header: u8) -> Option<Self> {
        Self::try_from(header.get_bits(4..8)).ok()
    }
}

/// Compute the fixed header flags of a PUBLISH packet.
pub fn publish_flags(qos: QoS, retain: Retain) -> u8 {
    *0u8.set_bits(1..=2, qos as u8)
        .set_bit(0, retain == Retain::Retained)
}

pub trait ControlPacket {
    const MESSAGE_TYPE: MessageType;
    fn fixed_header_flags(&self) -> u8 {
        0u8
    }
}

impl<'a> ControlPacket for Connect<'a> {
    const MESSAGE_TYPE: MessageType = MessageType::Connect;
}

impl<'a> ControlPacket for Pub<'a> {
    const MESSAGE_TYPE: MessageType = MessageType::Publish;
    fn fixed_header_flags(&self) -> u8 {
        publish_flags(QoS::AtMostOnce, self.retain)
    }
}

impl ControlPacket for PubAck {
    const MESSAGE_TYPE: MessageType = MessageType::PubAck;
}

impl<'a> ControlPacket for Subscribe<'a> {
    const MESSAGE_TYPE: MessageType = MessageType::Subscribe;
    fn fixed_header_flags(&self) -> u8 {
        0b0010
    }
}

impl<'a> ControlPacket for Unsubscribe<'a> {
    const MESSAGE_TYPE: MessageType = MessageType::Unsubscribe;
    fn fixed_header_flags(&self) -> u8 {
        0b0010
    }
}

impl ControlPacket for PingReq {
    const MESSAGE_TYPE: MessageType = MessageType::PingReq;
}

impl ControlPacket for PingResp {
    const MESSAGE_TYPE: MessageType = MessageType::PingResp;
}

impl ControlPacket for Disconnect {
    const MESSAGE_TYPE: MessageType = MessageType::Disconnect;
}
