#![allow(dead_code)]

use embedded_nal::{nb, AddrType, Dns, IpAddr, Ipv4Addr, SocketAddr, TcpClientStack, TcpErrorKind};
use embedded_time::{clock, fraction::Fraction, Clock, Instant};
use pubsubmq::{Broker, Config, ConnectOptions, MqttClient, Transport};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

pub const CONNACK_ACCEPTED: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

pub fn localhost() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

#[derive(Default)]
pub struct Link {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    pub writes: usize,
    pub connected: bool,
    pub refuse: bool,
    pub stops: usize,
    pub write_limit: Option<usize>,
    pub broker: Option<String>,
    /// Report data as available even when none can be read.
    pub phantom: bool,
}

/// A scripted byte stream. Clones share the same link.
#[derive(Clone, Default)]
pub struct MockTransport(pub Rc<RefCell<Link>>);

impl MockTransport {
    pub fn inject(&self, data: &[u8]) {
        self.0.borrow_mut().rx.extend(data.iter().copied());
    }

    pub fn take_tx(&self) -> Vec<u8> {
        std::mem::take(&mut self.0.borrow_mut().tx)
    }

    pub fn drop_link(&self) {
        self.0.borrow_mut().connected = false;
    }

    pub fn is_open(&self) -> bool {
        self.0.borrow().connected
    }

    pub fn pending_rx(&self) -> usize {
        self.0.borrow().rx.len()
    }
}

impl Transport for MockTransport {
    type Error = ();

    fn connect(&mut self, broker: &Broker<'_>) -> Result<(), ()> {
        let mut link = self.0.borrow_mut();
        link.broker.replace(format!("{:?}", broker));
        if link.refuse {
            return Err(());
        }

        link.connected = true;
        Ok(())
    }

    fn available(&mut self) -> bool {
        let link = self.0.borrow();
        link.phantom || !link.rx.is_empty()
    }

    fn read(&mut self) -> Option<u8> {
        self.0.borrow_mut().rx.pop_front()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        let mut link = self.0.borrow_mut();
        let accepted = link.write_limit.unwrap_or(data.len()).min(data.len());
        link.tx.extend_from_slice(&data[..accepted]);
        link.writes += 1;
        accepted
    }

    fn flush(&mut self) {}

    fn stop(&mut self) {
        let mut link = self.0.borrow_mut();
        link.connected = false;
        link.stops += 1;
    }

    fn is_connected(&mut self) -> bool {
        self.0.borrow().connected
    }
}

/// A millisecond clock that advances by `step` every time it is sampled.
#[derive(Clone)]
pub struct MockClock {
    now: Rc<Cell<u32>>,
    step: u32,
}

impl Default for MockClock {
    fn default() -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
            step: 1,
        }
    }
}

impl MockClock {
    pub fn advance(&self, millis: u32) {
        self.now.set(self.now.get() + millis);
    }

    pub fn millis(&self) -> u32 {
        self.now.get()
    }
}

impl Clock for MockClock {
    type T = u32;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1000);

    fn try_now(&self) -> Result<Instant<Self>, clock::Error> {
        let now = self.now.get();
        self.now.set(now + self.step);
        Ok(Instant::new(now))
    }
}

/// Connect a client over a mock link and discard the CONNECT it transmitted.
pub fn connected_client<'a>(
    transport: &MockTransport,
    clock: &MockClock,
    config: Config<'a>,
) -> MqttClient<'a, MockTransport, MockClock> {
    let mut client = MqttClient::new(transport.clone(), clock.clone(), config);
    transport.inject(&CONNACK_ACCEPTED);
    client.connect(&ConnectOptions::new("test")).unwrap();
    transport.take_tx();
    client
}

#[derive(Debug)]
pub enum StackError {
    PipeClosed,
}

impl embedded_nal::TcpError for StackError {
    fn kind(&self) -> TcpErrorKind {
        match self {
            StackError::PipeClosed => TcpErrorKind::PipeClosed,
        }
    }
}

#[derive(Default)]
pub struct Wire {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    pub remote: Option<SocketAddr>,
    pub resolved: Option<IpAddr>,
    pub peer_closed: bool,
    pub sockets: usize,
    pub closed: usize,
}

/// An `embedded-nal` stack whose single remote peer is scripted.
#[derive(Clone, Default)]
pub struct MockStack(pub Rc<RefCell<Wire>>);

impl MockStack {
    pub fn inject(&self, data: &[u8]) {
        self.0.borrow_mut().rx.extend(data.iter().copied());
    }

    pub fn take_tx(&self) -> Vec<u8> {
        std::mem::take(&mut self.0.borrow_mut().tx)
    }
}

impl TcpClientStack for MockStack {
    type TcpSocket = usize;
    type Error = StackError;

    fn socket(&mut self) -> Result<usize, StackError> {
        let mut wire = self.0.borrow_mut();
        wire.sockets += 1;
        Ok(wire.sockets)
    }

    fn connect(&mut self, _socket: &mut usize, remote: SocketAddr) -> nb::Result<(), StackError> {
        self.0.borrow_mut().remote.replace(remote);
        Ok(())
    }

    fn send(&mut self, _socket: &mut usize, buffer: &[u8]) -> nb::Result<usize, StackError> {
        let mut wire = self.0.borrow_mut();
        if wire.peer_closed {
            return Err(nb::Error::Other(StackError::PipeClosed));
        }

        wire.tx.extend_from_slice(buffer);
        Ok(buffer.len())
    }

    fn receive(&mut self, _socket: &mut usize, buffer: &mut [u8]) -> nb::Result<usize, StackError> {
        let mut wire = self.0.borrow_mut();
        if wire.rx.is_empty() {
            return if wire.peer_closed {
                Err(nb::Error::Other(StackError::PipeClosed))
            } else {
                Err(nb::Error::WouldBlock)
            };
        }

        let mut count = 0;
        for slot in buffer.iter_mut() {
            match wire.rx.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }

        Ok(count)
    }

    fn close(&mut self, _socket: usize) -> Result<(), StackError> {
        self.0.borrow_mut().closed += 1;
        Ok(())
    }
}

impl Dns for MockStack {
    type Error = ();

    fn get_host_by_name(&mut self, _hostname: &str, _addr_type: AddrType) -> nb::Result<IpAddr, ()> {
        self.0.borrow().resolved.ok_or(nb::Error::Other(()))
    }

    fn get_host_by_address(&self, _addr: IpAddr, _result: &mut [u8]) -> Result<usize, ()> {
        Err(())
    }
}
