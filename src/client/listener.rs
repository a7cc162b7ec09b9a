use std::error::Error;
use std::sync::Arc;

use tracing::{error, info};

use crate::broker::message::SimpleMessage;
use crate::broker::stats::Stats;

/// Callbacks invoked from the client's event-loop task, never from an HTTP
/// request.
pub trait MessageListener: Send + Sync {
    fn on_message(&self, topic: &str, payload: &[u8]);

    fn on_exception(&self, error: &(dyn Error + 'static)) {
        error!(%error, "Consumer received exception");
    }
}

/// Counts every delivery and keeps the latest text message.
#[derive(Debug, Clone)]
pub struct RecordingListener {
    stats: Arc<Stats>,
}

impl RecordingListener {
    pub fn new(stats: Arc<Stats>) -> Self {
        Self { stats }
    }
}

impl MessageListener for RecordingListener {
    fn on_message(&self, topic: &str, payload: &[u8]) {
        self.stats.record_received();

        match std::str::from_utf8(payload) {
            Ok(body) => {
                info!(topic = %topic, body = %body, "Received message");
                self.stats.set_last_message(SimpleMessage {
                    topic: topic.to_string(),
                    body: body.to_string(),
                });
            }
            Err(_) => {
                error!(
                    topic = %topic,
                    len = payload.len(),
                    "Received message that was not text"
                );
            }
        }
    }
}
