//! This module represents the session state of an MQTT communication session.
use embedded_time::{duration::Seconds, Clock, Instant};

pub struct SessionState<C>
where
    C: Clock,
{
    /// (embedded_time doesn't support u16.)
    pub keep_alive_interval: Seconds<u32>,

    /// Timestamp of the last packet received from the broker.
    last_inbound: Option<Instant<C>>,

    /// Timestamp of the last packet sent to the broker, for keep-alive generation.
    last_outbound: Option<Instant<C>>,

    /// Set when a PINGREQ has been sent without receiving the matching PINGRESP.
    pub ping_outstanding: bool,

    packet_id: u16,
}

impl<C> SessionState<C>
where
    C: Clock<T = u32>,
{
    pub fn new(keep_alive_interval: u16) -> SessionState<C> {
        SessionState {
            keep_alive_interval: Seconds(keep_alive_interval as u32),
            last_inbound: None,
            last_outbound: None,
            ping_outstanding: false,
            packet_id: 1,
        }
    }

    pub fn set_keepalive(&mut self, seconds: u16) {
        self.keep_alive_interval = Seconds(seconds as u32);
    }

    /// The keep-alive interval in seconds, as transmitted in CONNECT.
    pub fn keepalive_interval(&self) -> u16 {
        self.keep_alive_interval.0 as u16
    }

    pub fn reset(&mut self) {
        self.packet_id = 1;
        self.last_inbound = None;
        self.last_outbound = None;
        self.ping_outstanding = false;
    }

    /// Record a newly established session.
    pub fn register_connection(&mut self, now: Instant<C>) {
        self.last_inbound.replace(now);
        self.last_outbound.replace(now);
        self.ping_outstanding = false;
    }

    pub fn register_inbound(&mut self, now: Instant<C>) {
        self.last_inbound.replace(now);
    }

    pub fn register_outbound(&mut self, now: Instant<C>) {
        self.last_outbound.replace(now);
    }

    pub fn register_ping_request(&mut self) {
        self.ping_outstanding = true;
    }

    pub fn register_ping_response(&mut self) {
        self.ping_outstanding = false;
    }

    /// Check if the keep-alive interval has elapsed since the last inbound or outbound activity.
    fn keepalive_elapsed(&self, now: Instant<C>) -> bool {
        let expired = |stamp: &Option<Instant<C>>| match stamp {
            Some(stamp) => stamp
                .checked_add(self.keep_alive_interval)
                .map(|deadline| now > deadline)
                .unwrap_or(false),
            None => true,
        };

        expired(&self.last_inbound) || expired(&self.last_outbound)
    }

    /// Determine whether a keep-alive ping must be sent.
    ///
    /// # Returns
    /// `Ok(true)` if a PINGREQ should be transmitted now. The ping is then marked outstanding and
    /// both activity timestamps are refreshed. `Err(())` if a previous ping went unanswered for a
    /// full keep-alive interval.
    pub fn handle_ping(&mut self, now: Instant<C>) -> Result<bool, ()> {
        if self.keep_alive_interval == Seconds(0u32) || !self.keepalive_elapsed(now) {
            return Ok(false);
        }

        if self.ping_outstanding {
            return Err(());
        }

        self.ping_outstanding = true;
        self.register_connection_activity(now);
        Ok(true)
    }

    fn register_connection_activity(&mut self, now: Instant<C>) {
        self.last_inbound.replace(now);
        self.last_outbound.replace(now);
    }

    /// Get the next packet identifier. Identifiers are never zero.
    pub fn get_packet_identifier(&mut self) -> u16 {
        self.packet_id
    }

    pub fn increment_packet_identifier(&mut self) {
        let (result, overflow) = self.packet_id.overflowing_add(1);

        // Packet identifiers must always be non-zero.
        if overflow {
            self.packet_id = 1;
        } else {
            self.packet_id = result;
        }
    }
}
