use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{TimerId, Transport};

#[derive(Debug, Default)]
struct OutboxState {
    sent: VecDeque<String>,
    timers: BTreeMap<TimerId, Duration>,
    next_timer: u32,
}

/// In-memory [`Transport`] that records everything the engine sends.
///
/// Clones share the same queue, so the host keeps one handle while the
/// engine owns another.
///
/// ```
/// use wfd::transport::{Outbox, Transport};
///
/// let outbox = Outbox::new("192.168.1.10");
/// let mut engine_side = outbox.clone();
/// engine_side.send_rtsp_data("OPTIONS * RTSP/1.0\r\nCSeq: 1\r\n\r\n");
///
/// assert_eq!(outbox.len(), 1);
/// assert!(outbox.pop().unwrap().starts_with("OPTIONS"));
/// assert!(outbox.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Outbox {
    local_ip: Arc<str>,
    state: Arc<Mutex<OutboxState>>,
}

impl Outbox {
    pub fn new(local_ip: &str) -> Self {
        Self {
            local_ip: Arc::from(local_ip),
            state: Arc::new(Mutex::new(OutboxState::default())),
        }
    }

    /// Remove and return the oldest recorded message.
    pub fn pop(&self) -> Option<String> {
        self.state.lock().sent.pop_front()
    }

    /// Remove and return every recorded message, oldest first.
    pub fn drain(&self) -> Vec<String> {
        self.state.lock().sent.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().sent.is_empty()
    }

    /// Timers created and not yet released, in creation order.
    pub fn armed_timers(&self) -> Vec<TimerId> {
        self.state.lock().timers.keys().copied().collect()
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new("127.0.0.1")
    }
}

impl Transport for Outbox {
    fn send_rtsp_data(&mut self, data: &str) {
        tracing::trace!(bytes = data.len(), "outbox: message queued");
        self.state.lock().sent.push_back(data.to_string());
    }

    fn local_ip_address(&self) -> String {
        self.local_ip.to_string()
    }

    fn create_timer(&mut self, timeout: Duration) -> Option<TimerId> {
        let mut state = self.state.lock();
        state.next_timer += 1;
        let id = TimerId(state.next_timer);
        state.timers.insert(id, timeout);
        Some(id)
    }

    fn release_timer(&mut self, id: TimerId) {
        self.state.lock().timers.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_are_tracked_until_released() {
        let outbox = Outbox::default();
        let mut transport = outbox.clone();
        let first = transport.create_timer(Duration::from_secs(5)).unwrap();
        let second = transport.create_timer(Duration::from_secs(5)).unwrap();
        assert_ne!(first, second);
        assert_eq!(outbox.armed_timers(), vec![first, second]);

        transport.release_timer(first);
        assert_eq!(outbox.armed_timers(), vec![second]);
    }

    #[test]
    fn drain_returns_messages_in_order() {
        let outbox = Outbox::default();
        let mut transport = outbox.clone();
        transport.send_rtsp_data("a");
        transport.send_rtsp_data("b");
        assert_eq!(outbox.drain(), vec!["a".to_string(), "b".to_string()]);
        assert!(outbox.is_empty());
    }
}
