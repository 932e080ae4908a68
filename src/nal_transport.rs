//! An [embedded_nal] TCP stack exposed as a byte-stream [Transport].
use crate::{broker::Broker, network_manager::Transport};
use embedded_nal::{nb, AddrType, Dns, SocketAddr, TcpClientStack, TcpError, TcpErrorKind};

/// The number of bytes pulled from the stack per receive call.
const RX_CHUNK_SIZE: usize = 64;

/// Errors encountered while opening the connection.
#[derive(Debug)]
pub enum NalError<E, D> {
    /// The TCP stack failed to allocate or connect a socket.
    Network(E),

    /// The broker hostname could not be resolved.
    Resolution(D),
}

/// Adapts an `embedded-nal` TCP stack with DNS support into a [Transport].
///
/// # Note
/// Received data is staged in a small internal buffer so that single bytes may be peeked and
/// read. Data the stack cannot accept immediately is reported as unwritten.
pub struct NalTransport<S: TcpClientStack> {
    stack: S,
    socket: Option<S::TcpSocket>,
    rx: [u8; RX_CHUNK_SIZE],
    rx_head: usize,
    rx_len: usize,
    closed: bool,
}

impl<S: TcpClientStack> NalTransport<S> {
    pub fn new(stack: S) -> Self {
        Self {
            stack,
            socket: None,
            rx: [0; RX_CHUNK_SIZE],
            rx_head: 0,
            rx_len: 0,
            closed: true,
        }
    }

    /// Get mutable access to the underlying network stack.
    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    fn record_error(&mut self, err: &S::Error) {
        if matches!(err.kind(), TcpErrorKind::PipeClosed) {
            info!("Remote closed the connection");
            self.closed = true;
        } else {
            warn!("TCP stack error: {:?}", err);
        }
    }

    /// Ensure at least one received byte is staged.
    fn fill(&mut self) -> bool {
        if self.rx_head < self.rx_len {
            return true;
        }

        self.rx_head = 0;
        self.rx_len = 0;

        if self.closed {
            return false;
        }

        let Some(socket) = self.socket.as_mut() else {
            return false;
        };

        match self.stack.receive(socket, &mut self.rx) {
            Ok(len) => self.rx_len = len,
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(err)) => self.record_error(&err),
        }

        self.rx_len > 0
    }
}

impl<S: TcpClientStack + Dns> Transport for NalTransport<S> {
    type Error = NalError<<S as TcpClientStack>::Error, <S as Dns>::Error>;

    fn connect(&mut self, broker: &Broker<'_>) -> Result<(), Self::Error> {
        self.stop();

        let remote = match *broker {
            Broker::Ip(addr) => addr,
            Broker::Named { hostname, port } => {
                let ip = nb::block!(self.stack.get_host_by_name(hostname, AddrType::IPv4))
                    .map_err(NalError::Resolution)?;
                debug!("Resolved {} to {}", hostname, ip);
                SocketAddr::new(ip, port)
            }
        };

        let mut socket = self.stack.socket().map_err(NalError::Network)?;
        if let Err(err) = nb::block!(self.stack.connect(&mut socket, remote)) {
            self.stack.close(socket).ok();
            return Err(NalError::Network(err));
        }

        self.socket.replace(socket);
        self.closed = false;
        Ok(())
    }

    fn available(&mut self) -> bool {
        self.fill()
    }

    fn read(&mut self) -> Option<u8> {
        if !self.fill() {
            return None;
        }

        let byte = self.rx[self.rx_head];
        self.rx_head += 1;
        Some(byte)
    }

    fn write(&mut self, data: &[u8]) -> usize {
        let Some(socket) = self.socket.as_mut() else {
            return 0;
        };

        let mut written = 0;
        while written < data.len() {
            match self.stack.send(socket, &data[written..]) {
                Ok(0) | Err(nb::Error::WouldBlock) => break,
                Ok(len) => written += len,
                Err(nb::Error::Other(err)) => {
                    self.record_error(&err);
                    break;
                }
            }
        }

        written
    }

    fn flush(&mut self) {}

    fn stop(&mut self) {
        if let Some(socket) = self.socket.take() {
            if let Err(_err) = self.stack.close(socket) {
                warn!("Failed to close socket: {:?}", _err);
            }
        }

        self.closed = true;
        self.rx_head = 0;
        self.rx_len = 0;
    }

    fn is_connected(&mut self) -> bool {
        self.socket.is_some() && !self.closed
    }
}
