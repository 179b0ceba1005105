//! Transport collaborator for WFD control messages.
//!
//! The engine never touches sockets. It hands finished message text to a
//! [`Transport`] and asks it for the local address and for reply timers.
//! The host owns the actual RTSP TCP connection (port 7236 by convention)
//! and feeds inbound text back through the engine.
//!
//! - [`Transport`]: the trait the host implements.
//! - [`Outbox`] ([`outbox`]): a recording transport that queues outgoing
//!   text in memory, used by the loopback host and the tests.

pub mod outbox;

use std::fmt;
use std::time::Duration;

pub use outbox::Outbox;

/// Handle for a reply timer created through [`Transport::create_timer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u32);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outbound side of a WFD control connection.
///
/// `send_rtsp_data` is fire-and-forget. Delivery failures surface to the
/// host through its own connection handling, and the engine recovers
/// through reply timeouts.
pub trait Transport {
    /// Queue one serialized message on the control connection.
    fn send_rtsp_data(&mut self, data: &str);

    /// Local IP address, used to build the presentation URL.
    fn local_ip_address(&self) -> String;

    /// Arm a one-shot timer. When it fires the host calls
    /// `on_timer_event` on the engine with the returned id.
    ///
    /// Transports without timer support return `None`, which disables
    /// reply timeouts.
    fn create_timer(&mut self, timeout: Duration) -> Option<TimerId> {
        let _ = timeout;
        None
    }

    /// Cancel a timer armed by [`create_timer`](Self::create_timer).
    fn release_timer(&mut self, id: TimerId) {
        let _ = id;
    }
}
