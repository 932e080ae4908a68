mod packet_parser;
mod packet_reader;
mod received_packet;
pub(crate) use packet_parser::PacketParser;
pub(crate) use packet_reader::{Frame, PacketReader};
pub(crate) use received_packet::ReceivedPacket;
