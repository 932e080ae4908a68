use num_enum::{FromPrimitive, IntoPrimitive};

/// Return codes a broker may send in a CONNACK packet.
#[derive(PartialEq, Eq, Copy, Clone, Debug, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ConnectReturnCode {
    Accepted = 0x00,
    UnacceptableProtocolVersion = 0x01,
    IdentifierRejected = 0x02,
    ServerUnavailable = 0x03,
    BadUsernameOrPassword = 0x04,
    NotAuthorized = 0x05,

    /// The return code is not one of the documented MQTT return codes.
    #[num_enum(catch_all)]
    Unknown(u8),
}
