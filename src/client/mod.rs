//! The `client` module owns the connection to the message broker.
//!
//! It provides the `BrokerSession` abstraction the REST layer talks to, the
//! MQTT implementation built on `rumqttc`, and the `MessageListener` that the
//! session's event loop calls for every inbound message.

mod acks;
pub mod listener;
pub mod mqtt;
pub mod session;

pub use listener::{MessageListener, RecordingListener};
pub use mqtt::{BrokerEndpoint, MqttSession, ReconnectPolicy, connect};
pub use session::BrokerSession;

#[cfg(test)]
pub(crate) mod fake;
