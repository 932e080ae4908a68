use crate::{
    broker::Broker,
    design_parameters::{DEFAULT_KEEPALIVE, DEFAULT_SOCKET_TIMEOUT},
    types::ProtocolVersion,
    will::Will,
};

/// Configuration specifying the operational state of the MQTT client.
pub struct Config<'a> {
    pub(crate) broker: Broker<'a>,
    pub(crate) buffer: &'a mut [u8],
    pub(crate) keepalive_interval: u16,
    pub(crate) socket_timeout: u16,
    pub(crate) max_transfer_size: Option<usize>,
    pub(crate) protocol: ProtocolVersion,
}

impl<'a> Config<'a> {
    /// Construct configuration for the MQTT client.
    ///
    /// # Args
    /// * `broker` - The broker to connect to.
    /// * `buffer` - Memory used for both transmitting and receiving packets. The length of this
    /// buffer is the maximum packet size. At least 5 bytes are required.
    pub fn new(broker: impl Into<Broker<'a>>, buffer: &'a mut [u8]) -> Self {
        Self {
            broker: broker.into(),
            buffer,
            keepalive_interval: DEFAULT_KEEPALIVE,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            max_transfer_size: None,
            protocol: ProtocolVersion::default(),
        }
    }

    /// Configure the MQTT keep-alive interval.
    ///
    /// # Args
    /// * `seconds` - The keep-alive interval in seconds. A ping will be transmitted if no other
    /// packets are exchanged within the interval. Zero disables keep-alive.
    pub fn keepalive_interval(mut self, seconds: u16) -> Self {
        self.keepalive_interval = seconds;
        self
    }

    /// Configure how long to wait for each inbound byte before the connection is considered
    /// timed out.
    pub fn socket_timeout(mut self, seconds: u16) -> Self {
        self.socket_timeout = seconds;
        self
    }

    /// Limit the size of individual writes to the transport.
    pub fn max_transfer_size(mut self, size: usize) -> Self {
        self.max_transfer_size.replace(size);
        self
    }

    /// Select the protocol revision spoken to the broker.
    pub fn protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.protocol = protocol;
        self
    }
}

/// Parameters of a single connection attempt.
#[derive(Debug, Copy, Clone)]
pub struct ConnectOptions<'a> {
    pub(crate) client_id: &'a str,
    pub(crate) username: Option<&'a str>,
    pub(crate) password: Option<&'a [u8]>,
    pub(crate) will: Option<Will<'a>>,
    pub(crate) clean_session: bool,
}

impl<'a> ConnectOptions<'a> {
    /// Connect with the provided client ID and a clean session.
    pub fn new(client_id: &'a str) -> Self {
        Self {
            client_id,
            username: None,
            password: None,
            will: None,
            clean_session: true,
        }
    }

    /// Authenticate with the broker.
    ///
    /// # Note
    /// A password is only transmitted alongside a user name.
    pub fn credentials(mut self, username: &'a str, password: Option<&'a [u8]>) -> Self {
        self.username.replace(username);
        self.password = password;
        self
    }

    /// Specify the Will message to be sent if the client disconnects.
    pub fn will(mut self, will: Will<'a>) -> Self {
        self.will.replace(will);
        self
    }

    /// Specify whether the broker should discard any previous session state.
    pub fn clean_session(mut self, clean: bool) -> Self {
        self.clean_session = clean;
        self
    }
}
