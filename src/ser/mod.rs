//! Custom MQTT message serializer
//!
//! # Design
//! This serializer handles serializing MQTT packets.
//!
//! This serializer does _not_ assume MQTT packet format. It will encode data linearly into a
//! buffer and converts all data types to big-endian byte notation.
//!
//! The serializer reserves the first five bytes of the buffer for the MQTT fixed header, which is
//! filled out after the rest of the packet has been serialized. The header is right-aligned
//! against the body so that the finished packet is contiguous.
//!
//! # Limitations
//! It is the responsibility of the user to handle prefixing necessary lengths on any
//! MQTT-specified datatypes, such as "Binary Data" and "UTF-8 Encoded Strings".
//!
//! # Supported Data Types
//!
//! Basic data types are supported, including:
//! * Signed & Unsigned integers
//! * Booleans
//! * Strings
//! * Bytes
//! * Options (Some is encoded as the contained contents, None is not encoded as any data)
//! * Sequences
//! * Tuples
//! * Structs
//!
//! Other types are rejected with [Error::Unsupported].
use crate::design_parameters::MAX_FIXED_HEADER_SIZE;
use crate::message_types::{ControlPacket, MessageType};
use crate::varint::VarintBuffer;
use bit_field::BitField;
use serde::{ser::Impossible, Serialize};

/// Errors that result from the serialization process
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Error {
    /// The provided memory buffer did not have enough space to serialize into.
    InsufficientMemory,

    /// The data model type has no MQTT representation.
    Unsupported,

    /// A custom serialization error occurred.
    Custom,
}

impl serde::ser::StdError for Error {}

impl serde::ser::Error for Error {
    fn custom<T: core::fmt::Display>(_msg: T) -> Self {
        error!("{}", _msg);
        Error::Custom
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Error::Custom => "Custom serialization error",
                Error::Unsupported => "Data type cannot be encoded",
                Error::InsufficientMemory => "Not enough space to encode the packet",
            }
        )
    }
}

/// A structure to serialize MQTT data into a buffer.
pub struct MqttSerializer<'a> {
    buf: &'a mut [u8],
    index: usize,
}

impl<'a> MqttSerializer<'a> {
    /// Construct a new serializer.
    ///
    /// # Args
    /// * `buf` - The location to serialize data into.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            index: MAX_FIXED_HEADER_SIZE,
        }
    }

    /// The number of body bytes written so far.
    pub fn len(&self) -> usize {
        self.index - MAX_FIXED_HEADER_SIZE
    }

    /// Encode an MQTT control packet into a buffer.
    ///
    /// # Args
    /// * `buf` - The buffer to encode data into.
    /// * `packet` - The packet to encode.
    pub fn to_buffer<T: Serialize + ControlPacket>(
        buf: &'a mut [u8],
        packet: &T,
    ) -> Result<&'a [u8], Error> {
        let mut serializer = Self::new(buf);
        packet.serialize(&mut serializer)?;
        serializer.finalize(T::MESSAGE_TYPE, packet.fixed_header_flags())
    }

    /// Finalize the packet, prepending the MQTT fixed header.
    ///
    /// # Args
    /// * `typ` - The MQTT message type of the encoded packet.
    /// * `flags` - The MQTT flags associated with the packet.
    ///
    /// # Returns
    /// The serialized packet, starting at its fixed header.
    pub fn finalize(self, typ: MessageType, flags: u8) -> Result<&'a [u8], Error> {
        self.finalize_with_trailer(typ, flags, 0)
    }

    /// Finalize a packet whose final `trailer` bytes will be transmitted separately.
    ///
    /// # Note
    /// The trailing bytes are accounted for in the remaining length but are not part of the
    /// returned slice.
    pub fn finalize_with_trailer(
        self,
        typ: MessageType,
        flags: u8,
        trailer: usize,
    ) -> Result<&'a [u8], Error> {
        if self.buf.len() < MAX_FIXED_HEADER_SIZE {
            return Err(Error::InsufficientMemory);
        }

        let len = self
            .len()
            .checked_add(trailer)
            .and_then(|len| u32::try_from(len).ok())
            .ok_or(Error::InsufficientMemory)?;

        let buffer = VarintBuffer::encode(len).map_err(|_| Error::InsufficientMemory)?;

        // Write the remaining packet length.
        self.buf[MAX_FIXED_HEADER_SIZE - buffer.data.len()..MAX_FIXED_HEADER_SIZE]
            .copy_from_slice(&buffer.data);

        // Write the header
        let offset = MAX_FIXED_HEADER_SIZE - buffer.data.len() - 1;
        self.buf[offset] = *0u8.set_bits(4..8, typ as u8).set_bits(0..4, flags);

        Ok(&self.buf[offset..self.index])
    }

    /// Write data into the packet.
    ///
    /// # Args
    /// * `data` - The data to push to the current head of the packet.
    pub fn push_bytes(&mut self, data: &[u8]) -> Result<(), Error> {
        trace!("Pushing {:?}", data);
        if self.buf.len().saturating_sub(self.index) < data.len() {
            return Err(Error::InsufficientMemory);
        }

        self.buf[self.index..][..data.len()].copy_from_slice(data);
        self.index += data.len();

        Ok(())
    }

    /// Push a byte to the tail of the packet.
    ///
    /// # Args
    /// * `byte` - The byte to write to the tail.
    pub fn push(&mut self, byte: u8) -> Result<(), Error> {
        if self.buf.len().saturating_sub(self.index) < 1 {
            return Err(Error::InsufficientMemory);
        }
        self.buf[self.index] = byte;
        self.index += 1;

        Ok(())
    }
}

impl<'a> serde::Serializer for &mut MqttSerializer<'a> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Self;
    type SerializeStructVariant = Impossible<(), Error>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        self.push(v as u8)
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.push(v as u8)
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.push_bytes(&v.to_be_bytes())
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        self.push_bytes(&v.to_be_bytes())
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        self.push_bytes(&v.to_be_bytes())
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.push(v)
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.push_bytes(&v.to_be_bytes())
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        self.push_bytes(&v.to_be_bytes())
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        self.push_bytes(&v.to_be_bytes())
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        self.serialize_bytes(v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        self.push_bytes(v)
    }

    fn serialize_none(self) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Error> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Error> {
        Ok(self)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Error> {
        Ok(self)
    }

    fn serialize_char(self, _v: char) -> Result<Self::Ok, Self::Error> {
        Err(Error::Unsupported)
    }

    fn serialize_unit(self) -> Result<(), Error> {
        Err(Error::Unsupported)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<(), Error> {
        Err(Error::Unsupported)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), Error> {
        Err(Error::Unsupported)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Err(Error::Unsupported)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(Error::Unsupported)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Error> {
        Err(Error::Unsupported)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(Error::Unsupported)
    }

    fn collect_str<T: ?Sized + core::fmt::Display>(self, _value: &T) -> Result<Self::Ok, Error> {
        Err(Error::Unsupported)
    }

    fn serialize_f32(self, _v: f32) -> Result<Self::Ok, Self::Error> {
        Err(Error::Unsupported)
    }

    fn serialize_f64(self, _v: f64) -> Result<Self::Ok, Self::Error> {
        Err(Error::Unsupported)
    }
}

impl<'a> serde::ser::SerializeStruct for &'a mut MqttSerializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl<'a> serde::ser::SerializeSeq for &'a mut MqttSerializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl<'a> serde::ser::SerializeTuple for &'a mut MqttSerializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}
