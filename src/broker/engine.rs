use std::sync::Arc;

use tracing::{info, warn};

use super::message::{SimpleMessage, Status};
use super::stats::Stats;
use super::topic::SubscriptionRegistry;
use crate::client::BrokerSession;
use crate::config::SubscriptionMode;
use crate::utils::error::BrokerError;

/// Everything a REST request needs: the broker session (if startup managed
/// to create one), the shared stats, and how subscriptions are tracked.
pub struct Bridge {
    session: Option<Arc<dyn BrokerSession>>,
    stats: Arc<Stats>,
    mode: SubscriptionMode,
    registry: SubscriptionRegistry,
}

impl Bridge {
    pub fn new(
        session: Option<Arc<dyn BrokerSession>>,
        stats: Arc<Stats>,
        mode: SubscriptionMode,
    ) -> Self {
        Self {
            session,
            stats,
            mode,
            registry: SubscriptionRegistry::default(),
        }
    }

    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    pub fn mode(&self) -> SubscriptionMode {
        self.mode
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    fn session(&self) -> Result<&Arc<dyn BrokerSession>, BrokerError> {
        match &self.session {
            Some(session) if session.is_connected() => Ok(session),
            _ => Err(BrokerError::NotConnected),
        }
    }

    /// Publishes `message` and counts it once the client has accepted it.
    pub async fn send(&self, message: &SimpleMessage) -> Result<(), BrokerError> {
        let session = self.session()?;
        if message.topic.is_empty() {
            return Err(BrokerError::InvalidTopic);
        }

        info!(topic = %message.topic, body = %message.body, "Sending message");
        session.publish(&message.topic, &message.body).await?;
        self.stats.record_sent();
        Ok(())
    }

    pub fn last_message(&self) -> Option<SimpleMessage> {
        self.stats.last_message()
    }

    pub async fn add_subscription(&self, topic: &str) -> Result<(), BrokerError> {
        let session = self.session()?;
        if topic.is_empty() {
            return Err(BrokerError::InvalidTopic);
        }

        info!(topic = %topic, "Adding a subscription");
        match self.mode {
            SubscriptionMode::Delegated => session.subscribe(topic).await,
            SubscriptionMode::Tracked => {
                let mut topics = self.registry.lock().await;
                if topics.contains(topic) {
                    warn!(topic = %topic, "Already subscribed");
                    return Err(BrokerError::AlreadySubscribed(topic.to_string()));
                }
                session.subscribe(topic).await?;
                topics.insert(topic.to_string());
                Ok(())
            }
        }
    }

    pub async fn remove_subscription(&self, topic: &str) -> Result<(), BrokerError> {
        let session = self.session()?;
        if topic.is_empty() {
            return Err(BrokerError::InvalidTopic);
        }

        info!(topic = %topic, "Deleting a subscription");
        match self.mode {
            SubscriptionMode::Delegated => session.unsubscribe(topic).await,
            SubscriptionMode::Tracked => {
                let mut topics = self.registry.lock().await;
                if !topics.contains(topic) {
                    warn!(topic = %topic, "Was not subscribed");
                    return Err(BrokerError::NotSubscribed(topic.to_string()));
                }
                session.unsubscribe(topic).await?;
                topics.remove(topic);
                Ok(())
            }
        }
    }

    pub fn status(&self) -> Status {
        self.stats.status()
    }

    pub fn reset(&self) {
        info!("Resetting stats");
        self.stats.reset();
    }
}
