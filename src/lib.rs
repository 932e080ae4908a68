#![cfg_attr(not(test), no_std)]
//! # PubSubMQ
//!
//! Provides a minimal MQTT 3.1 / 3.1.1 client implementation for embedded devices that are
//! expected to stay connected to a broker for long periods of time.
//!
//! All packet encoding and decoding happens inside a single caller-supplied buffer. Inbound
//! packets are read one byte at a time with a per-byte timeout, and PUBLISH payloads that do not
//! fit into the buffer may be streamed out to a [PayloadSink] as they arrive.
//!
//! ## Design
//! The client is transport-agnostic. Any byte stream implementing [Transport] may be used, and
//! [NalTransport] adapts any `embedded-nal` TCP stack. Time is provided through an
//! `embedded-time` [Clock](embedded_time::Clock).
//!
//! The client is single-threaded and cooperative: every blocking wait spins on
//! [Transport::available] with a deadline and yields through [Transport::relax].
//!
//! ## Limitations
//! * Only QoS 0 messages may be published. Inbound QoS 1 messages are acknowledged.
//! * QoS 2 is not supported.
//! * Session state is not persisted across reconnects.
//!
//! # Example
//! ```no_run
//! use pubsubmq::{Config, ConnectOptions, MqttClient, Retain};
//! # use pubsubmq::{Broker, Transport};
//! # use embedded_time::{clock, fraction::Fraction, Instant};
//! # struct Network;
//! # impl Transport for Network {
//! #     type Error = ();
//! #     fn connect(&mut self, _: &Broker<'_>) -> Result<(), ()> { Ok(()) }
//! #     fn available(&mut self) -> bool { false }
//! #     fn read(&mut self) -> Option<u8> { None }
//! #     fn write(&mut self, data: &[u8]) -> usize { data.len() }
//! #     fn flush(&mut self) {}
//! #     fn stop(&mut self) {}
//! #     fn is_connected(&mut self) -> bool { true }
//! # }
//! # struct SysClock;
//! # impl embedded_time::Clock for SysClock {
//! #     type T = u32;
//! #     const SCALING_FACTOR: Fraction = Fraction::new(1, 1000);
//! #     fn try_now(&self) -> Result<Instant<Self>, clock::Error> { Ok(Instant::new(0)) }
//! # }
//! let mut on_message = |topic: &str, payload: &[u8]| {
//!     // Handle the message.
//!     let _ = (topic, payload);
//! };
//!
//! let mut buffer = [0u8; pubsubmq::design_parameters::DEFAULT_BUFFER_SIZE];
//! let localhost = embedded_nal::IpAddr::V4(embedded_nal::Ipv4Addr::new(127, 0, 0, 1));
//! let mut mqtt = MqttClient::new(
//!     Network,
//!     SysClock,
//!     Config::new(localhost, &mut buffer).keepalive_interval(60),
//! );
//!
//! mqtt.connect(&ConnectOptions::new("sensor")).unwrap();
//! mqtt.subscribe("commands", pubsubmq::QoS::AtLeastOnce).unwrap();
//! mqtt.set_handler(&mut on_message);
//!
//! loop {
//!     if mqtt.poll().is_err() {
//!         break;
//!     }
//!
//!     mqtt.publish("telemetry", b"online", Retain::NotRetained).unwrap();
//! }
//! ```

#[cfg(feature = "logging")]
#[macro_use]
extern crate log;

#[cfg(not(feature = "logging"))]
#[macro_use]
mod mqtt_log {
    macro_rules! trace {
        ($($arg:tt)*) => {{
            let _ = ::core::format_args!($($arg)*);
        }};
    }

    macro_rules! debug {
        ($($arg:tt)*) => {{
            let _ = ::core::format_args!($($arg)*);
        }};
    }

    macro_rules! info {
        ($($arg:tt)*) => {{
            let _ = ::core::format_args!($($arg)*);
        }};
    }

    macro_rules! warn {
        ($($arg:tt)*) => {{
            let _ = ::core::format_args!($($arg)*);
        }};
    }

    macro_rules! error {
        ($($arg:tt)*) => {{
            let _ = ::core::format_args!($($arg)*);
        }};
    }
}

pub mod broker;
mod config;
mod de;
pub mod design_parameters;
mod message_types;
mod mqtt_client;
mod nal_transport;
mod network_manager;
mod packets;
mod reason_codes;
mod ser;
mod session_state;
pub mod types;
pub mod varint;
mod will;

pub use broker::Broker;
pub use config::{Config, ConnectOptions};
pub use embedded_nal;
pub use embedded_time;
pub use mqtt_client::{ConnectionState, Error, MessageHandler, MqttClient, PayloadSink};
pub use nal_transport::{NalError, NalTransport};
pub use network_manager::Transport;
pub use reason_codes::ConnectReturnCode;
pub use types::ProtocolVersion;
pub use will::Will;

use num_enum::TryFromPrimitive;

/// Default port number for unencrypted MQTT traffic
pub const MQTT_INSECURE_DEFAULT_PORT: u16 = 1883;

/// The quality-of-service for an MQTT message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, TryFromPrimitive)]
#[repr(u8)]
pub enum QoS {
    /// A packet will be delivered at most once, but may not be delivered at all.
    AtMostOnce = 0,

    /// A packet will be delivered at least one time, but possibly more than once.
    AtLeastOnce = 1,

    /// A packet will be delivered exactly one time.
    ExactlyOnce = 2,
}

/// The retained status for an MQTT message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Retain {
    /// The message shall not be retained by the broker.
    NotRetained = 0,

    /// The message shall be marked for retention by the broker.
    Retained = 1,
}

impl From<bool> for Retain {
    fn from(retained: bool) -> Self {
        if retained {
            Retain::Retained
        } else {
            Retain::NotRetained
        }
    }
}
