//! Network Interface Holder
//!
//! # Design
//! The byte-stream transport is abstracted away into a separate struct to facilitate simple
//! ownership semantics of reading and writing to the network. This allows the transport to be
//! used to transmit buffers that are stored internally in the client without violating Rust's
//! borrow rules.
use embedded_time::{duration::Seconds, Clock};

use crate::{broker::Broker, mqtt_client::Error};

/// A reliable, ordered byte stream toward an MQTT broker.
pub trait Transport {
    type Error: core::fmt::Debug;

    /// Open the stream toward the broker.
    fn connect(&mut self, broker: &Broker<'_>) -> Result<(), Self::Error>;

    /// Check if at least one byte can be read without blocking.
    fn available(&mut self) -> bool;

    /// Read a single byte. Returns `None` if no data could be produced.
    fn read(&mut self) -> Option<u8>;

    /// Write data to the stream.
    ///
    /// # Returns
    /// The number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> usize;

    /// Push any buffered outbound data onto the wire.
    fn flush(&mut self);

    /// Close the stream.
    fn stop(&mut self);

    /// Check if the stream is still open.
    fn is_connected(&mut self) -> bool;

    /// Called on every iteration of a busy-wait. Cooperative schedulers may yield here.
    fn relax(&mut self) {
        core::hint::spin_loop()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn connect(&mut self, broker: &Broker<'_>) -> Result<(), Self::Error> {
        (**self).connect(broker)
    }

    fn available(&mut self) -> bool {
        (**self).available()
    }

    fn read(&mut self) -> Option<u8> {
        (**self).read()
    }

    fn write(&mut self, data: &[u8]) -> usize {
        (**self).write(data)
    }

    fn flush(&mut self) {
        (**self).flush()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_connected(&mut self) -> bool {
        (**self).is_connected()
    }

    fn relax(&mut self) {
        (**self).relax()
    }
}

/// Simple structure for maintaining state of the network connection.
pub(crate) struct InterfaceHolder<T: Transport> {
    transport: T,
    max_transfer_size: Option<usize>,
}

impl<T: Transport> InterfaceHolder<T> {
    /// Construct a new network holder utility.
    pub fn new(transport: T, max_transfer_size: Option<usize>) -> Self {
        Self {
            transport,
            max_transfer_size,
        }
    }

    /// Open the transport toward the broker.
    pub fn connect(&mut self, broker: &Broker<'_>) -> Result<(), Error> {
        self.transport.connect(broker).map_err(|_err| {
            warn!("Transport connection to {:?} failed: {:?}", broker, _err);
            Error::TransportConnectFailed
        })
    }

    pub fn available(&mut self) -> bool {
        self.transport.available()
    }

    pub fn flush(&mut self) {
        self.transport.flush()
    }

    pub fn stop(&mut self) {
        self.transport.stop()
    }

    pub fn is_connected(&mut self) -> bool {
        self.transport.is_connected()
    }

    /// Wait until data is available or the timeout elapses.
    ///
    /// # Returns
    /// True if data became available before the deadline.
    pub fn wait_available<C: Clock<T = u32>>(
        &mut self,
        clock: &C,
        timeout: Seconds<u32>,
    ) -> Result<bool, Error> {
        let deadline = clock
            .try_now()?
            .checked_add(timeout)
            .ok_or(Error::Clock)?;

        while !self.transport.available() {
            self.transport.relax();
            if clock.try_now()? > deadline {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Read a single byte, waiting at most `timeout` for it to arrive.
    pub fn read_byte<C: Clock<T = u32>>(
        &mut self,
        clock: &C,
        timeout: Seconds<u32>,
    ) -> Result<u8, Error> {
        if !self.wait_available(clock, timeout)? {
            return Err(Error::ReadTimeout);
        }

        self.transport.read().ok_or(Error::TransportLost)
    }

    /// Write data to the interface.
    ///
    /// # Note
    /// Data is split into chunks of at most the configured maximum transfer size. Any short write
    /// fails the whole operation.
    ///
    /// # Args
    /// * `data` - The data to write.
    pub fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        let chunk_size = self.max_transfer_size.unwrap_or(data.len()).max(1);

        for chunk in data.chunks(chunk_size) {
            let written = self.transport.write(chunk);
            trace!("Wrote: {:0x?}", &chunk[..written.min(chunk.len())]);
            if written != chunk.len() {
                warn!("Short write: {} of {} bytes", written, chunk.len());
                return Err(Error::WriteFail);
            }
        }

        Ok(())
    }
}
