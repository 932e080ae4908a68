//! # Design Parameters
//! This module contains design constraints arbitrarily imposed on the library.

/// The recommended packet buffer size. This is the largest packet that may be sent or received
/// without streaming.
pub const DEFAULT_BUFFER_SIZE: usize = 128;

/// The default keep-alive interval in seconds.
pub const DEFAULT_KEEPALIVE: u16 = 15;

/// The default time to wait for each inbound byte, in seconds.
pub const DEFAULT_SOCKET_TIMEOUT: u16 = 15;

/// The maximum size of the MQTT fixed header in bytes. This accounts for the header byte and the
/// maximum remaining length encoding.
pub const MAX_FIXED_HEADER_SIZE: usize = 5;
