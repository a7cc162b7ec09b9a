use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::message::{SimpleMessage, Status};

/// Counters and the last-received message, shared by the REST handlers and
/// the broker listener.
#[derive(Debug, Default)]
pub struct Stats {
    sent: AtomicU64,
    received: AtomicU64,
    last_message: Mutex<Option<SimpleMessage>>,
}

impl Stats {
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::SeqCst);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::SeqCst)
    }

    pub fn set_last_message(&self, message: SimpleMessage) {
        *self.last_message.lock().unwrap() = Some(message);
    }

    pub fn last_message(&self) -> Option<SimpleMessage> {
        self.last_message.lock().unwrap().clone()
    }

    pub fn status(&self) -> Status {
        Status {
            sent: self.sent(),
            received: self.received(),
        }
    }

    /// Zeroes both counters and forgets the last message.
    pub fn reset(&self) {
        self.sent.store(0, Ordering::SeqCst);
        self.received.store(0, Ordering::SeqCst);
        *self.last_message.lock().unwrap() = None;
    }
}
