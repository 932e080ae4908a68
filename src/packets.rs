use crate::{
    types::{BinaryData, ProtocolVersion, Utf8String},
    will::Will,
    Retain,
};
use bit_field::BitField;
use serde::Serialize;

use serde::ser::SerializeStruct;

/// An MQTT CONNECT packet.
#[derive(Debug)]
pub struct Connect<'a> {
    /// The protocol revision announced to the broker.
    pub protocol: ProtocolVersion,

    /// Specifies the keep-alive interval of the connection in seconds.
    pub keep_alive: u16,

    /// The ID of the client that is connecting.
    pub client_id: Utf8String<'a>,

    /// An optional will message to be transmitted whenever the connection is lost.
    pub will: Option<&'a Will<'a>>,

    /// The user name to authenticate with.
    pub username: Option<&'a str>,

    /// The password to authenticate with. Only transmitted alongside a user name.
    pub password: Option<&'a [u8]>,

    /// Specified true if the broker should discard any previous session state.
    pub clean_session: bool,
}

impl<'a> Connect<'a> {
    fn flags(&self) -> u8 {
        let mut flags: u8 = 0;
        flags.set_bit(1, self.clean_session);

        if let Some(will) = &self.will {
            // Indicate that the will is present, the QoS of the will message, and whether or not
            // the will message should be retained.
            flags.set_bit(2, true);
            flags.set_bits(3..=4, will.qos as u8);
            flags.set_bit(5, will.retain == Retain::Retained);
        }

        if self.username.is_some() {
            flags.set_bit(7, true);
            flags.set_bit(6, self.password.is_some());
        }

        flags
    }
}

impl<'a> serde::Serialize for Connect<'a> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut item = serializer.serialize_struct("Connect", 0)?;
        item.serialize_field("protocol_name", &Utf8String(self.protocol.name()))?;
        item.serialize_field("protocol_version", &self.protocol.level())?;
        item.serialize_field("flags", &self.flags())?;
        item.serialize_field("keep_alive", &self.keep_alive)?;
        item.serialize_field("client_id", &self.client_id)?;
        item.serialize_field("will", &self.will)?;

        if let Some(username) = self.username {
            item.serialize_field("username", &Utf8String(username))?;
            item.serialize_field("password", &self.password.map(BinaryData))?;
        }

        item.end()
    }
}

/// An outbound MQTT PUBLISH packet. Only QoS 0 transmission is supported.
#[derive(Debug)]
pub struct Pub<'a> {
    /// The topic that the message is published on.
    pub topic: Utf8String<'a>,

    /// The message to be transmitted.
    pub payload: &'a [u8],

    /// Specifies whether or not the message should be retained on the broker.
    pub retain: Retain,
}

impl<'a> serde::Serialize for Pub<'a> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut item = serializer.serialize_struct("Publish", 0)?;
        item.serialize_field("topic", &self.topic)?;
        item.serialize_field("payload", self.payload)?;
        item.end()
    }
}

/// An MQTT SUBSCRIBE control packet carrying a single topic filter.
#[derive(Debug, Serialize)]
pub struct Subscribe<'a> {
    /// Specifies the ID of this subscription request.
    pub packet_id: u16,

    /// The topic filter to subscribe to.
    pub topic: Utf8String<'a>,

    /// The maximum quality-of-service requested for the subscription.
    pub qos: u8,
}

/// An MQTT UNSUBSCRIBE control packet carrying a single topic filter.
#[derive(Debug, Serialize)]
pub struct Unsubscribe<'a> {
    /// Specifies the ID of this request.
    pub packet_id: u16,

    /// The topic filter to unsubscribe from.
    pub topic: Utf8String<'a>,
}

/// An MQTT PUBACK control packet
#[derive(Debug, Serialize)]
pub struct PubAck {
    /// The ID of the packet being acknowledged.
    pub packet_id: u16,
}

/// An MQTT PINGREQ control packet
#[derive(Debug, Serialize)]
pub struct PingReq;

/// An MQTT PINGRESP control packet
#[derive(Debug, Serialize)]
pub struct PingResp;

/// An MQTT DISCONNECT control packet
#[derive(Debug, Serialize)]
pub struct Disconnect;
