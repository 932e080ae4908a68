use pubsubmq::{Config, ConnectionState, Error, QoS, Retain};

mod stack;
use stack::{connected_client, localhost, MockClock, MockTransport};

#[test]
fn publish_at_most_once() {
    stack::init_logging();
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 24];
    let mut client = connected_client(&transport, &clock, Config::new(localhost(), &mut buffer));

    client.publish("a", b"hello", Retain::NotRetained).unwrap();
    assert_eq!(
        transport.take_tx(),
        [0x30, 0x08, 0x00, 0x01, b'a', b'h', b'e', b'l', b'l', b'o']
    );

    client.publish("a", b"", Retain::Retained).unwrap();
    assert_eq!(transport.take_tx(), [0x31, 0x03, 0x00, 0x01, b'a']);
}

#[test]
fn oversized_publish_is_refused() {
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 24];
    let mut client = connected_client(&transport, &clock, Config::new(localhost(), &mut buffer));

    assert_eq!(
        client.publish("topic", &[0xAA; 16], Retain::NotRetained),
        Err(Error::BufferOverflow)
    );

    // Nothing was sent and the session survives.
    assert!(transport.take_tx().is_empty());
    assert!(client.is_connected());
}

#[test]
fn publish_requires_connection() {
    let transport = MockTransport::default();
    let mut buffer = [0u8; 64];
    let mut client = pubsubmq::MqttClient::new(
        transport.clone(),
        MockClock::default(),
        Config::new(localhost(), &mut buffer),
    );

    assert_eq!(
        client.publish("a", b"hello", Retain::NotRetained),
        Err(Error::NotConnected)
    );
    assert_eq!(client.subscribe("a", QoS::AtMostOnce), Err(Error::NotConnected));
    assert_eq!(client.unsubscribe("a"), Err(Error::NotConnected));
    assert_eq!(client.ping(), Err(Error::NotConnected));
    assert!(transport.take_tx().is_empty());
}

#[test]
fn short_write_tears_down_session() {
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 64];
    let mut client = connected_client(&transport, &clock, Config::new(localhost(), &mut buffer));

    transport.0.borrow_mut().write_limit = Some(4);
    assert_eq!(
        client.publish("a", b"hello", Retain::NotRetained),
        Err(Error::WriteFail)
    );
    assert_eq!(client.state(), ConnectionState::ConnectionLost);
    assert!(!transport.is_open());
}

#[test]
fn writes_respect_transfer_size() {
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 64];
    let mut client = connected_client(
        &transport,
        &clock,
        Config::new(localhost(), &mut buffer).max_transfer_size(4),
    );

    transport.0.borrow_mut().writes = 0;
    client.publish("a", b"hello", Retain::NotRetained).unwrap();

    assert_eq!(transport.take_tx().len(), 10);
    assert_eq!(transport.0.borrow().writes, 3);
}

#[test]
fn subscribe_uses_increasing_identifiers() {
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 64];
    let mut client = connected_client(&transport, &clock, Config::new(localhost(), &mut buffer));

    client.subscribe("a", QoS::AtLeastOnce).unwrap();
    assert_eq!(
        transport.take_tx(),
        [0x82, 0x06, 0x00, 0x01, 0x00, 0x01, b'a', 0x01]
    );

    client.subscribe("b/#", QoS::AtMostOnce).unwrap();
    assert_eq!(
        transport.take_tx(),
        [0x82, 0x08, 0x00, 0x02, 0x00, 0x03, b'b', b'/', b'#', 0x00]
    );

    client.unsubscribe("a").unwrap();
    assert_eq!(
        transport.take_tx(),
        [0xA2, 0x05, 0x00, 0x03, 0x00, 0x01, b'a']
    );
}

#[test]
fn exactly_once_subscription_is_unsupported() {
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 64];
    let mut client = connected_client(&transport, &clock, Config::new(localhost(), &mut buffer));

    assert_eq!(
        client.subscribe("a", QoS::ExactlyOnce),
        Err(Error::Unsupported)
    );
    assert!(transport.take_tx().is_empty());

    // The refused request did not consume an identifier.
    client.subscribe("a", QoS::AtMostOnce).unwrap();
    assert_eq!(&transport.take_tx()[2..4], [0x00, 0x01]);
}

#[test]
fn packet_identifier_skips_zero_on_wrap() {
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 64];
    let mut client = connected_client(&transport, &clock, Config::new(localhost(), &mut buffer));

    for expected in 1..=u16::MAX {
        client.subscribe("a", QoS::AtMostOnce).unwrap();
        let sent = transport.take_tx();
        assert_eq!(u16::from_be_bytes([sent[2], sent[3]]), expected);
    }

    client.unsubscribe("a").unwrap();
    assert_eq!(&transport.take_tx()[2..4], [0x00, 0x01]);
    assert!(client.is_connected());
}

#[test]
fn packet_identifiers_restart_on_reconnect() {
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 64];
    let mut client = connected_client(&transport, &clock, Config::new(localhost(), &mut buffer));

    client.subscribe("a", QoS::AtMostOnce).unwrap();
    client.subscribe("a", QoS::AtMostOnce).unwrap();
    client.disconnect().unwrap();
    transport.take_tx();

    transport.inject(&stack::CONNACK_ACCEPTED);
    client
        .connect(&pubsubmq::ConnectOptions::new("test"))
        .unwrap();
    transport.take_tx();

    client.subscribe("a", QoS::AtMostOnce).unwrap();
    assert_eq!(&transport.take_tx()[2..4], [0x00, 0x01]);
}
