//! Encoding of MQTT-specified data types.
use serde::ser::SerializeStruct;

/// Binary data prefixed with a 2-byte big-endian length.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BinaryData<'a>(pub &'a [u8]);

impl<'a> serde::Serialize for BinaryData<'a> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = u16::try_from(self.0.len())
            .map_err(|_| serde::ser::Error::custom("Binary data too long"))?;
        let mut item = serializer.serialize_struct("_BinaryData", 0)?;
        item.serialize_field("_len", &len)?;
        item.serialize_field("_data", self.0)?;
        item.end()
    }
}

/// A UTF-8 string prefixed with a 2-byte big-endian length.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Utf8String<'a>(pub &'a str);

impl<'a> serde::Serialize for Utf8String<'a> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = u16::try_from(self.0.len())
            .map_err(|_| serde::ser::Error::custom("String too long"))?;
        let mut item = serializer.serialize_struct("_Utf8String", 0)?;
        item.serialize_field("_len", &len)?;
        item.serialize_field("_string", self.0)?;
        item.end()
    }
}

/// The MQTT protocol revision spoken to the broker.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ProtocolVersion {
    /// MQTT 3.1, identified by the protocol name `MQIsdp`.
    V3_1,

    /// MQTT 3.1.1, identified by the protocol name `MQTT`.
    #[default]
    V3_1_1,
}

impl ProtocolVersion {
    /// The protocol name transmitted in the CONNECT variable header.
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolVersion::V3_1 => "MQIsdp",
            ProtocolVersion::V3_1_1 => "MQTT",
        }
    }

    /// The protocol level transmitted in the CONNECT variable header.
    pub fn level(&self) -> u8 {
        match self {
            ProtocolVersion::V3_1 => 3,
            ProtocolVersion::V3_1_1 => 4,
        }
    }
}
