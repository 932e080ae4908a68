use crate::{
    types::{BinaryData, Utf8String},
    QoS, Retain,
};
use serde::ser::SerializeStruct;

/// A message published by the broker on the client's behalf when the connection is lost
/// unexpectedly.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Will<'a> {
    pub(crate) topic: &'a str,
    pub(crate) message: &'a [u8],
    pub(crate) qos: QoS,
    pub(crate) retain: Retain,
}

impl<'a> Will<'a> {
    /// Construct a new will message.
    ///
    /// # Args
    /// * `topic` - The topic to send the message on
    /// * `message` - The message to transmit
    pub fn new(topic: &'a str, message: &'a [u8]) -> Self {
        Self {
            topic,
            message,
            qos: QoS::AtMostOnce,
            retain: Retain::NotRetained,
        }
    }

    /// Set the retained status of the will.
    ///
    /// # Args
    /// * `retain` - Specifies whether the broker should retain the will message.
    pub fn retained(mut self, retain: Retain) -> Self {
        self.retain = retain;
        self
    }

    /// Set the quality of service at which the will message is sent.
    ///
    /// # Args
    /// * `qos` - The desired quality-of-service level to send the message at.
    pub fn qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }
}

impl<'a> serde::Serialize for Will<'a> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut item = serializer.serialize_struct("Will", 0)?;
        item.serialize_field("topic", &Utf8String(self.topic))?;
        item.serialize_field("message", &BinaryData(self.message))?;
        item.end()
    }
}
