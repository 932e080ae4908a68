use crate::MQTT_INSECURE_DEFAULT_PORT;
use embedded_nal::{IpAddr, SocketAddr};

/// The location of the MQTT broker.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Broker<'a> {
    /// A broker at a known socket address.
    Ip(SocketAddr),

    /// A broker that must be resolved by hostname before connecting.
    Named { hostname: &'a str, port: u16 },
}

impl<'a> Broker<'a> {
    /// Construct a broker that will be resolved by name on the default port.
    pub fn named(hostname: &'a str) -> Self {
        Broker::Named {
            hostname,
            port: MQTT_INSECURE_DEFAULT_PORT,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Broker::Ip(addr) => addr.port(),
            Broker::Named { port, .. } => *port,
        }
    }

    /// Use a non-default port for the broker.
    pub fn set_port(&mut self, new_port: u16) {
        match self {
            Broker::Ip(addr) => addr.set_port(new_port),
            Broker::Named { port, .. } => *port = new_port,
        }
    }
}

impl From<IpAddr> for Broker<'_> {
    fn from(addr: IpAddr) -> Self {
        Broker::Ip(SocketAddr::new(addr, MQTT_INSECURE_DEFAULT_PORT))
    }
}

impl From<SocketAddr> for Broker<'_> {
    fn from(addr: SocketAddr) -> Self {
        Broker::Ip(addr)
    }
}
