use async_trait::async_trait;

use crate::utils::error::BrokerError;

/// The broker operations the REST layer needs.
///
/// `subscribe` and `unsubscribe` resolve only after the broker has confirmed
/// the request; `publish` is fire-and-forget at the protocol level and
/// resolves once the client has accepted the message.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn publish(&self, topic: &str, body: &str) -> Result<(), BrokerError>;

    async fn subscribe(&self, topic: &str) -> Result<(), BrokerError>;

    async fn unsubscribe(&self, topic: &str) -> Result<(), BrokerError>;
}
