use pubsubmq::{Config, ConnectionState, Error, Retain};

mod stack;
use stack::{connected_client, localhost, MockClock, MockTransport};

const PINGREQ: [u8; 2] = [0xC0, 0x00];
const PINGRESP: [u8; 2] = [0xD0, 0x00];

#[test]
fn ping_is_sent_after_idle_interval() {
    stack::init_logging();
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 64];
    let mut client = connected_client(
        &transport,
        &clock,
        Config::new(localhost(), &mut buffer).keepalive_interval(1),
    );

    client.poll().unwrap();
    assert!(transport.take_tx().is_empty());

    clock.advance(1_500);
    client.poll().unwrap();
    assert_eq!(transport.take_tx(), PINGREQ);

    // The broker answers and the next interval produces a fresh ping.
    transport.inject(&PINGRESP);
    client.poll().unwrap();
    assert!(transport.take_tx().is_empty());

    clock.advance(1_500);
    client.poll().unwrap();
    assert_eq!(transport.take_tx(), PINGREQ);
    assert!(client.is_connected());
}

#[test]
fn unanswered_ping_times_out() {
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 64];
    let mut client = connected_client(
        &transport,
        &clock,
        Config::new(localhost(), &mut buffer).keepalive_interval(1),
    );

    clock.advance(1_500);
    client.poll().unwrap();
    assert_eq!(transport.take_tx(), PINGREQ);

    clock.advance(1_500);
    assert_eq!(client.poll(), Err(Error::KeepAliveTimeout));
    assert_eq!(client.state(), ConnectionState::ConnectionTimeout);
    assert_eq!(client.state().code(), -4);
    assert!(!transport.is_open());
}

#[test]
fn outbound_traffic_does_not_defer_ping() {
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 64];
    let mut client = connected_client(
        &transport,
        &clock,
        Config::new(localhost(), &mut buffer).keepalive_interval(1),
    );

    for _ in 0..3 {
        clock.advance(600);
        client.publish("a", b"x", Retain::NotRetained).unwrap();
    }
    transport.take_tx();

    // Nothing was received for longer than the interval.
    client.poll().unwrap();
    assert_eq!(transport.take_tx(), PINGREQ);
}

#[test]
fn zero_interval_disables_keepalive() {
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 64];
    let mut client = connected_client(
        &transport,
        &clock,
        Config::new(localhost(), &mut buffer).keepalive_interval(0),
    );

    clock.advance(3_600_000);
    client.poll().unwrap();
    assert!(transport.take_tx().is_empty());
    assert!(client.is_connected());
}

#[test]
fn explicit_ping_expects_response() {
    let transport = MockTransport::default();
    let clock = MockClock::default();
    let mut buffer = [0u8; 64];
    let mut client = connected_client(
        &transport,
        &clock,
        Config::new(localhost(), &mut buffer).keepalive_interval(1),
    );

    client.ping().unwrap();
    assert_eq!(transport.take_tx(), PINGREQ);

    clock.advance(1_500);
    assert_eq!(client.poll(), Err(Error::KeepAliveTimeout));
}

#[test]
fn keepalive_interval_is_advertised() {
    let transport = MockTransport::default();
    let mut buffer = [0u8; 64];
    let mut client = pubsubmq::MqttClient::new(
        transport.clone(),
        MockClock::default(),
        Config::new(localhost(), &mut buffer),
    );
    client.set_keepalive_interval(300).unwrap();

    transport.inject(&stack::CONNACK_ACCEPTED);
    client
        .connect(&pubsubmq::ConnectOptions::new("test"))
        .unwrap();

    assert_eq!(&transport.take_tx()[10..12], [0x01, 0x2C]);
}
