use crate::{
    broker::Broker,
    config::{Config, ConnectOptions},
    de::{Frame, PacketReader, ReceivedPacket},
    message_types::{publish_flags, ControlPacket, MessageType},
    network_manager::{InterfaceHolder, Transport},
    packets::{Connect, Disconnect, PingReq, PingResp, Pub, PubAck, Subscribe, Unsubscribe},
    reason_codes::ConnectReturnCode,
    ser::MqttSerializer,
    session_state::SessionState,
    types::{ProtocolVersion, Utf8String},
    QoS, Retain,
};

use bit_field::BitField;
use embedded_time::duration::Seconds;
use serde::Serialize;

mod sm {

    use smlang::statemachine;

    statemachine! {
        transitions: {
            *Disconnected + TransportOpened = Connecting,
            Connecting + ConnAckAccepted = Connected,
            Connecting + Abort = Disconnected,
            Connected + Abort = Disconnected,
        }
    }

    pub struct Context;

    impl StateMachineContext for Context {}
}

use sm::{Context, Events, StateMachine, States};

/// Possible errors encountered during an MQTT operation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Error {
    /// The operation requires an established session with the broker.
    NotConnected,

    /// The transport could not be opened toward the broker.
    TransportConnectFailed,

    /// The broker did not answer the CONNECT in time.
    HandshakeTimeout,

    /// The broker refused the connection.
    HandshakeRejected(ConnectReturnCode),

    /// A remaining length field did not terminate within four bytes.
    MalformedLength,

    /// A received packet could not be interpreted.
    MalformedPacket,

    /// The packet does not fit into the packet buffer.
    BufferOverflow,

    /// No byte arrived within the socket timeout.
    ReadTimeout,

    /// A keep-alive ping went unanswered.
    KeepAliveTimeout,

    /// The transport reported data but produced none.
    TransportLost,

    /// The transport accepted fewer bytes than requested.
    WriteFail,

    /// The requested operation or value is not supported.
    Unsupported,

    /// The clock could not provide the current time.
    Clock,
}

impl From<crate::ser::Error> for Error {
    fn from(_err: crate::ser::Error) -> Self {
        debug!("Serialization failed: {}", _err);
        Error::BufferOverflow
    }
}

impl From<embedded_time::clock::Error> for Error {
    fn from(_err: embedded_time::clock::Error) -> Self {
        error!("Clock failure: {:?}", _err);
        Error::Clock
    }
}

/// The last observed state of the connection to the broker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// The broker stopped answering, either during a read or a keep-alive ping.
    ConnectionTimeout,

    /// The transport closed underneath an established session.
    ConnectionLost,

    /// The transport could not be opened.
    ConnectFailed,

    /// No session is established.
    Disconnected,

    /// A session with the broker is established.
    Connected,

    /// The broker refused the connection.
    Rejected(ConnectReturnCode),
}

impl ConnectionState {
    /// Get the numeric state code.
    ///
    /// # Note
    /// Rejections report the CONNACK return code as received, including undocumented codes.
    pub fn code(&self) -> i16 {
        match self {
            ConnectionState::ConnectionTimeout => -4,
            ConnectionState::ConnectionLost => -3,
            ConnectionState::ConnectFailed => -2,
            ConnectionState::Disconnected => -1,
            ConnectionState::Connected => 0,
            ConnectionState::Rejected(code) => i16::from(u8::from(*code)),
        }
    }
}

/// Receives application messages published to subscribed topics.
pub trait MessageHandler {
    fn on_message(&mut self, topic: &str, payload: &[u8]);

    /// Receive a message with its raw topic bytes.
    ///
    /// # Note
    /// The default forwards messages with UTF-8 topics to [MessageHandler::on_message] and drops
    /// the rest. Override this to receive every topic as sent by the broker.
    fn on_publish(&mut self, topic: &[u8], payload: &[u8]) {
        match core::str::from_utf8(topic) {
            Ok(topic) => self.on_message(topic, payload),
            Err(_) => warn!("Ignoring message with a non UTF-8 topic"),
        }
    }
}

impl<F: FnMut(&str, &[u8])> MessageHandler for F {
    fn on_message(&mut self, topic: &str, payload: &[u8]) {
        self(topic, payload)
    }
}

/// Receives PUBLISH payload bytes as they arrive from the network.
pub trait PayloadSink {
    fn write_byte(&mut self, byte: u8);
}

impl<F: FnMut(u8)> PayloadSink for F {
    fn write_byte(&mut self, byte: u8) {
        self(byte)
    }
}

/// An automatic response to a received packet.
enum Reply {
    PubAck(u16),
    PingResp,
}

/// A client for interacting with an MQTT Broker.
pub struct MqttClient<'a, Network: Transport, Clock: embedded_time::Clock<T = u32>> {
    network: InterfaceHolder<Network>,
    clock: Clock,
    buffer: &'a mut [u8],
    broker: Broker<'a>,
    protocol: ProtocolVersion,
    socket_timeout: Seconds<u32>,
    session_state: SessionState<Clock>,
    connection_state: StateMachine<Context>,
    state: ConnectionState,
    handler: Option<&'a mut dyn MessageHandler>,
    sink: Option<&'a mut dyn PayloadSink>,
}

impl<'a, Network, Clock> MqttClient<'a, Network, Clock>
where
    Network: Transport,
    Clock: embedded_time::Clock<T = u32>,
{
    /// Construct a new MQTT client.
    ///
    /// # Args
    /// * `network` - The transport to use for communication.
    /// * `clock` - The clock to use for managing MQTT state timing.
    /// * `config` - The configuration of the client.
    pub fn new(network: Network, clock: Clock, config: Config<'a>) -> Self {
        Self {
            network: InterfaceHolder::new(network, config.max_transfer_size),
            clock,
            buffer: config.buffer,
            broker: config.broker,
            protocol: config.protocol,
            socket_timeout: Seconds(config.socket_timeout as u32),
            session_state: SessionState::new(config.keepalive_interval),
            connection_state: StateMachine::new(Context),
            state: ConnectionState::Disconnected,
            handler: None,
            sink: None,
        }
    }

    /// Select the broker used by the next connection attempt.
    pub fn set_broker(&mut self, broker: impl Into<Broker<'a>>) {
        self.broker = broker.into();
    }

    /// Configure the MQTT keep-alive interval.
    ///
    /// # Note
    /// This must be completed before connecting to a broker.
    ///
    /// # Args
    /// * `interval_seconds` - The keep-alive interval in seconds. A ping will be transmitted if
    /// no packet is exchanged within the interval. Zero disables keep-alive.
    pub fn set_keepalive_interval(&mut self, interval_seconds: u16) -> Result<(), Error> {
        if self.connection_state.state() != &States::Disconnected {
            return Err(Error::Unsupported);
        }

        self.session_state.set_keepalive(interval_seconds);
        Ok(())
    }

    /// Configure how long to wait for each inbound byte.
    pub fn set_socket_timeout(&mut self, seconds: u16) {
        self.socket_timeout = Seconds(seconds as u32);
    }

    /// Register the handler invoked for every received application message.
    pub fn set_handler(&mut self, handler: &'a mut dyn MessageHandler) {
        self.handler.replace(handler);
    }

    pub fn remove_handler(&mut self) -> Option<&'a mut dyn MessageHandler> {
        self.handler.take()
    }

    /// Register a sink that receives PUBLISH payloads byte-by-byte as they are read.
    ///
    /// # Note
    /// With a sink registered, packets larger than the buffer are no longer discarded. The
    /// handler then only sees the part of the payload that fit into the buffer.
    pub fn set_sink(&mut self, sink: &'a mut dyn PayloadSink) {
        self.sink.replace(sink);
    }

    pub fn remove_sink(&mut self) -> Option<&'a mut dyn PayloadSink> {
        self.sink.take()
    }

    /// Get the last observed connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Determine if the client has established a connection with the broker.
    ///
    /// # Note
    /// If the transport closed underneath an established session, the session is torn down and
    /// the state becomes [ConnectionState::ConnectionLost].
    ///
    /// # Returns
    /// True if the client is connected to the broker.
    pub fn is_connected(&mut self) -> bool {
        if self.connection_state.state() != &States::Connected {
            return false;
        }

        if !self.network.is_connected() {
            warn!("Transport closed unexpectedly");
            self.state = ConnectionState::ConnectionLost;
            self.connection_state.process_event(Events::Abort).ok();
            self.network.flush();
            self.network.stop();
            return false;
        }

        true
    }

    /// Tear down the session and close the transport.
    fn abort(&mut self, state: ConnectionState) {
        self.state = state;
        self.connection_state.process_event(Events::Abort).ok();
        self.network.stop();
    }

    /// Account for the result of writing a frame.
    fn complete_write(&mut self, result: Result<(), Error>) -> Result<(), Error> {
        if let Err(err) = result {
            error!("Failed to write packet: {:?}", err);
            self.abort(ConnectionState::ConnectionLost);
            return Err(err);
        }

        let now = self.clock.try_now()?;
        self.session_state.register_outbound(now);
        Ok(())
    }

    fn send_packet<T: Serialize + ControlPacket>(&mut self, packet: &T) -> Result<(), Error> {
        let frame = MqttSerializer::to_buffer(&mut *self.buffer, packet)?;
        let result = self.network.write(frame);
        self.complete_write(result)
    }

    fn read_frame(&mut self) -> Result<Frame, Error> {
        PacketReader::new(&mut *self.buffer).read_packet(
            &mut self.network,
            &self.clock,
            self.socket_timeout,
            self.sink.as_deref_mut(),
        )
    }

    /// Connect to the broker.
    ///
    /// # Note
    /// This blocks until the broker acknowledges the connection or the socket timeout elapses.
    ///
    /// # Args
    /// * `options` - The client ID, credentials, will and session flag to connect with.
    pub fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), Error> {
        if self.is_connected() {
            return Ok(());
        }

        info!("Connecting to {:?} as `{}`", self.broker, options.client_id);
        if let Err(err) = self.network.connect(&self.broker) {
            self.state = ConnectionState::ConnectFailed;
            return Err(err);
        }

        self.connection_state
            .process_event(Events::TransportOpened)
            .ok();
        self.session_state.reset();

        let connect = Connect {
            protocol: self.protocol,
            keep_alive: self.session_state.keepalive_interval(),
            client_id: Utf8String(options.client_id),
            will: options.will.as_ref(),
            username: options.username,
            password: options.password,
            clean_session: options.clean_session,
        };

        match self.send_packet(&connect) {
            Ok(()) => {}
            Err(Error::BufferOverflow) => {
                warn!("CONNECT does not fit into the packet buffer");
                self.abort(ConnectionState::Disconnected);
                return Err(Error::BufferOverflow);
            }
            Err(err) => return Err(err),
        }

        if !self.network.wait_available(&self.clock, self.socket_timeout)? {
            warn!("Timed out waiting for CONNACK");
            self.abort(ConnectionState::ConnectionTimeout);
            return Err(Error::HandshakeTimeout);
        }

        let frame = match self.read_frame() {
            Ok(frame) => frame,
            Err(Error::ReadTimeout) => {
                warn!("Timed out reading CONNACK");
                self.abort(ConnectionState::ConnectionTimeout);
                return Err(Error::HandshakeTimeout);
            }
            Err(err) => {
                self.abort(ConnectionState::Disconnected);
                return Err(err);
            }
        };

        // A CONNACK is always exactly four bytes long.
        let return_code = match ReceivedPacket::parse(&self.buffer[..frame.length]) {
            Ok(ReceivedPacket::ConnAck { return_code, .. }) if frame.length == 4 => {
                Some(return_code)
            }
            _ => None,
        };

        match return_code {
            Some(ConnectReturnCode::Accepted) => {
                let now = self.clock.try_now()?;
                self.session_state.register_connection(now);
                self.connection_state
                    .process_event(Events::ConnAckAccepted)
                    .ok();
                self.state = ConnectionState::Connected;
                info!("Connected");
                Ok(())
            }
            Some(code) => {
                warn!("Connection rejected: {:?}", code);
                self.abort(ConnectionState::Rejected(code));
                Err(Error::HandshakeRejected(code))
            }
            None => {
                error!("Expected CONNACK, received {:0x?}", &self.buffer[..frame.length]);
                self.abort(ConnectionState::Disconnected);
                Err(Error::MalformedPacket)
            }
        }
    }

    /// Service the connection.
    ///
    /// # Note
    /// This transmits keep-alive pings when required and processes at most one received packet.
    /// Application messages are delivered to the registered handler and acknowledged as needed
    /// before this returns.
    pub fn poll(&mut self) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let now = self.clock.try_now()?;
        match self.session_state.handle_ping(now) {
            Err(()) => {
                warn!("Keep-alive ping went unanswered");
                self.abort(ConnectionState::ConnectionTimeout);
                return Err(Error::KeepAliveTimeout);
            }

            Ok(true) => {
                debug!("Sending keep-alive ping");
                self.send_packet(&PingReq)?;
            }

            Ok(false) => {}
        }

        if !self.network.available() {
            return Ok(());
        }

        let frame = match self.read_frame() {
            Ok(frame) => frame,
            Err(err) => {
                error!("Failed to read packet: {:?}", err);
                let state = match err {
                    Error::ReadTimeout => ConnectionState::ConnectionTimeout,
                    Error::TransportLost => ConnectionState::ConnectionLost,
                    _ => ConnectionState::Disconnected,
                };
                self.abort(state);
                return Err(err);
            }
        };

        if frame.length == 0 {
            return if self.is_connected() {
                Ok(())
            } else {
                Err(Error::NotConnected)
            };
        }

        let now = self.clock.try_now()?;
        self.session_state.register_inbound(now);

        self.handle_packet(frame)
    }

    fn handle_packet(&mut self, frame: Frame) -> Result<(), Error> {
        let packet = match ReceivedPacket::parse(&self.buffer[..frame.length]) {
            Ok(packet) => packet,
            Err(_err) => {
                warn!("Dropping unparsable packet: {:?}", _err);

                // A QoS 1 PUBLISH whose topic overflowed the buffer is still acknowledged.
                let header = self.buffer[0];
                let at_least_once = MessageType::from_header(header) == Some(MessageType::Publish)
                    && header.get_bits(1..=2) == QoS::AtLeastOnce as u8;
                return match frame.packet_id {
                    Some(packet_id) if at_least_once => self.send_packet(&PubAck { packet_id }),
                    _ => Ok(()),
                };
            }
        };

        let reply = match packet {
            ReceivedPacket::Publish(publish) => {
                debug!(
                    "Received PUBLISH on {:?} ({} bytes)",
                    publish.topic(),
                    publish.payload.len()
                );

                if let Some(handler) = self.handler.as_deref_mut() {
                    handler.on_publish(publish.topic, publish.payload);
                }

                match (publish.qos, frame.packet_id.or(publish.packet_id)) {
                    (QoS::AtLeastOnce, Some(id)) => Some(Reply::PubAck(id)),
                    (QoS::ExactlyOnce, _) => {
                        warn!("QoS 2 delivery is not supported");
                        None
                    }
                    _ => None,
                }
            }

            ReceivedPacket::PingReq => Some(Reply::PingResp),

            ReceivedPacket::PingResp => {
                self.session_state.register_ping_response();
                None
            }

            other => {
                info!("Ignoring {:?}", other);
                None
            }
        };

        match reply {
            Some(Reply::PubAck(packet_id)) => self.send_packet(&PubAck { packet_id }),
            Some(Reply::PingResp) => self.send_packet(&PingResp),
            None => Ok(()),
        }
    }

    /// Publish a message over MQTT.
    ///
    /// # Note
    /// Messages are always transmitted at [QoS::AtMostOnce].
    ///
    /// # Args
    /// * `topic` - The topic to publish the message to.
    /// * `payload` - The data to transmit as the message contents.
    /// * `retain` - Specifies whether the broker should retain the message.
    pub fn publish(&mut self, topic: &str, payload: &[u8], retain: Retain) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        debug!("Publishing to `{}`: {:?}", topic, payload);

        self.send_packet(&Pub {
            topic: Utf8String(topic),
            payload,
            retain,
        })
    }

    /// Begin publishing a message whose payload is supplied afterwards.
    ///
    /// # Note
    /// Exactly `length` payload bytes must then be written with [MqttClient::write_payload]
    /// before calling [MqttClient::end_publish].
    ///
    /// # Args
    /// * `topic` - The topic to publish the message to.
    /// * `length` - The total number of payload bytes that will follow.
    /// * `retain` - Specifies whether the broker should retain the message.
    pub fn begin_publish(&mut self, topic: &str, length: usize, retain: Retain) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let mut serializer = MqttSerializer::new(&mut *self.buffer);
        Pub {
            topic: Utf8String(topic),
            payload: &[],
            retain,
        }
        .serialize(&mut serializer)?;

        let header = serializer.finalize_with_trailer(
            MessageType::Publish,
            publish_flags(QoS::AtMostOnce, retain),
            length,
        )?;

        let result = self.network.write(header);
        self.complete_write(result)
    }

    /// Write part of the payload of a message started with [MqttClient::begin_publish].
    pub fn write_payload(&mut self, data: &[u8]) -> Result<(), Error> {
        if self.connection_state.state() != &States::Connected {
            return Err(Error::NotConnected);
        }

        let result = self.network.write(data);
        self.complete_write(result)
    }

    /// Finish a message started with [MqttClient::begin_publish].
    pub fn end_publish(&mut self) -> Result<(), Error> {
        if self.connection_state.state() != &States::Connected {
            return Err(Error::NotConnected);
        }

        self.network.flush();
        Ok(())
    }

    /// Subscribe to a topic.
    ///
    /// # Note
    /// A subscription is not maintained across a disconnection with the broker. In the case of MQTT
    /// disconnections, topics will need to be subscribed to again.
    ///
    /// # Args
    /// * `topic` - The topic filter to subscribe to.
    /// * `qos` - The maximum quality-of-service to receive messages at. QoS 2 is not supported.
    pub fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<(), Error> {
        if qos > QoS::AtLeastOnce {
            return Err(Error::Unsupported);
        }

        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let packet_id = self.session_state.get_packet_identifier();
        self.send_packet(&Subscribe {
            packet_id,
            topic: Utf8String(topic),
            qos: qos as u8,
        })?;

        info!("Subscribing to `{}`: {}", topic, packet_id);
        self.session_state.increment_packet_identifier();
        Ok(())
    }

    /// Unsubscribe from a topic.
    pub fn unsubscribe(&mut self, topic: &str) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let packet_id = self.session_state.get_packet_identifier();
        self.send_packet(&Unsubscribe {
            packet_id,
            topic: Utf8String(topic),
        })?;

        info!("Unsubscribing from `{}`: {}", topic, packet_id);
        self.session_state.increment_packet_identifier();
        Ok(())
    }

    /// Send a PINGREQ immediately.
    ///
    /// # Note
    /// If the matching PINGRESP has not arrived once the keep-alive interval elapses, the
    /// connection times out.
    pub fn ping(&mut self) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        self.send_packet(&PingReq)?;
        self.session_state.register_ping_request();
        Ok(())
    }

    /// Disconnect from the broker.
    ///
    /// # Note
    /// The transport is closed even if the DISCONNECT could not be transmitted.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        let result = MqttSerializer::to_buffer(&mut *self.buffer, &Disconnect)
            .map_err(Error::from)
            .and_then(|frame| self.network.write(frame));

        info!("Disconnecting");
        self.state = ConnectionState::Disconnected;
        self.connection_state.process_event(Events::Abort).ok();
        self.network.flush();
        self.network.stop();

        let now = self.clock.try_now()?;
        self.session_state.register_inbound(now);
        self.session_state.register_outbound(now);

        result
    }
}

impl<'a, Network, Clock> core::fmt::Write for MqttClient<'a, Network, Clock>
where
    Network: Transport,
    Clock: embedded_time::Clock<T = u32>,
{
    /// Write formatted payload data for a message started with [MqttClient::begin_publish].
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.write_payload(s.as_bytes())
            .map_err(|_| core::fmt::Error)
    }
}
