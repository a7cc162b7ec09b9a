//! MQTT session
//!
//! Bootstraps one `rumqttc` client from resolved credentials and drives its
//! event loop on a background task. Responsibilities:
//! - walk the broker host list in order until one accepts the connection
//! - route inbound publishes to the `MessageListener`
//! - settle subscribe/unsubscribe confirmations as acks arrive
//! - retry a dropped connection a bounded number of times, then stay down
//!
//! An initial connect that fails is final: nothing retries in the
//! background and the process has to be restarted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, Publish, QoS, SubscribeReasonCode, TlsConfiguration, Transport,
};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use super::acks::AckTracker;
use super::listener::MessageListener;
use super::session::BrokerSession;
use crate::config::{BrokerSettings, Settings};
use crate::credentials::Credentials;
use crate::utils::error::BrokerError;

/// Capacity of the request channel between `AsyncClient` and its event loop.
const REQUEST_CAPACITY: usize = 64;

/// One broker address taken from the credentials' host list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

impl BrokerEndpoint {
    /// Parses `tcp://`, `mqtt://`, `ssl://`, `tls://` and `mqtts://` URIs.
    /// A bare `host:port` is treated as `tcp://`.
    pub fn parse(uri: &str) -> Result<Self, BrokerError> {
        let invalid = || BrokerError::InvalidUri(uri.to_string());

        let full = if uri.contains("://") {
            uri.to_string()
        } else {
            format!("tcp://{uri}")
        };
        let url = Url::parse(&full).map_err(|_| invalid())?;

        let tls = match url.scheme() {
            "tcp" | "mqtt" => false,
            "ssl" | "tls" | "mqtts" => true,
            _ => return Err(invalid()),
        };
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(invalid)?
            .to_string();
        let port = url.port().unwrap_or(if tls { 8883 } else { 1883 });

        Ok(Self { host, port, tls })
    }
}

/// Connection retry tuning.
///
/// The configured values are only used for high-availability services;
/// everything else gets the client defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Extra passes over the whole host list at startup.
    pub connect_retries: u32,
    /// Reconnect attempts after an established connection drops.
    pub reconnect_retries: u32,
    pub reconnect_retry_wait: Duration,
    /// Attempts on one host before moving to the next.
    pub connect_retries_per_host: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            connect_retries: 0,
            reconnect_retries: 3,
            reconnect_retry_wait: Duration::from_millis(3000),
            connect_retries_per_host: 1,
        }
    }
}

impl ReconnectPolicy {
    pub fn from_settings(settings: &BrokerSettings, high_availability: bool) -> Self {
        if !high_availability {
            return Self::default();
        }
        Self {
            connect_retries: settings.connect_retries,
            reconnect_retries: settings.reconnect_retries,
            reconnect_retry_wait: Duration::from_millis(settings.reconnect_retry_wait_ms),
            connect_retries_per_host: settings.connect_retries_per_host,
        }
    }

    fn attempts_per_host(&self) -> u32 {
        self.connect_retries_per_host.max(1)
    }
}

struct Shared {
    connected: AtomicBool,
    subscribes: AckTracker,
    unsubscribes: AckTracker,
}

/// A connected MQTT client.
pub struct MqttSession {
    client: AsyncClient,
    shared: Arc<Shared>,
    request_timeout: Duration,
    max_packet_size: usize,
}

/// Connects to the first reachable host and starts the event loop.
pub async fn connect(
    credentials: &Credentials,
    settings: &Settings,
    listener: Arc<dyn MessageListener>,
) -> Result<MqttSession, BrokerError> {
    let endpoints = credentials
        .hosts
        .iter()
        .map(|h| BrokerEndpoint::parse(h))
        .collect::<Result<Vec<_>, _>>()?;
    if endpoints.is_empty() {
        return Err(BrokerError::NoHosts);
    }

    let policy = ReconnectPolicy::from_settings(&settings.broker, credentials.high_availability);
    let client_id = settings
        .broker
        .client_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let request_timeout = settings.broker.request_timeout();
    let max_packet_size = settings.broker.max_packet_size;

    let needs_tls = settings.tls.enabled || endpoints.iter().any(|e| e.tls);
    let ca = if needs_tls {
        let path = &settings.tls.trust_store;
        Some(std::fs::read(path).map_err(|source| BrokerError::TrustStore {
            path: path.clone(),
            source,
        })?)
    } else {
        None
    };

    info!(
        hosts = %credentials.hosts.join(","),
        vpn = credentials.vpn_name.as_deref().unwrap_or("-"),
        client_id = %client_id,
        ?policy,
        "Connecting to broker"
    );

    let mut last_error = None;
    let mut first = true;
    for pass in 0..=policy.connect_retries {
        for endpoint in &endpoints {
            for attempt in 1..=policy.attempts_per_host() {
                if !first {
                    tokio::time::sleep(policy.reconnect_retry_wait).await;
                }
                first = false;

                let options = mqtt_options(endpoint, &client_id, credentials, settings, ca.as_deref());
                let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

                match await_connack(&mut eventloop, request_timeout).await {
                    Ok(()) => {
                        info!(host = %endpoint.host, port = endpoint.port, "Broker connection established");
                        let shared = Arc::new(Shared {
                            connected: AtomicBool::new(true),
                            subscribes: AckTracker::new("subscribe"),
                            unsubscribes: AckTracker::new("unsubscribe"),
                        });
                        tokio::spawn(run_event_loop(
                            eventloop,
                            shared.clone(),
                            listener,
                            policy,
                        ));
                        return Ok(MqttSession {
                            client,
                            shared,
                            request_timeout,
                            max_packet_size,
                        });
                    }
                    Err(e) => {
                        warn!(
                            host = %endpoint.host,
                            port = endpoint.port,
                            pass,
                            attempt,
                            error = %e,
                            "Connection attempt failed"
                        );
                        last_error = Some(e);
                    }
                }
            }
        }
    }

    Err(BrokerError::ConnectFailed {
        hosts: credentials.hosts.join(","),
        source: last_error.unwrap_or(ConnectionError::NetworkTimeout),
    })
}

fn mqtt_options(
    endpoint: &BrokerEndpoint,
    client_id: &str,
    credentials: &Credentials,
    settings: &Settings,
    ca: Option<&[u8]>,
) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, endpoint.host.clone(), endpoint.port);
    options.set_credentials(credentials.username.clone(), credentials.password.clone());
    options.set_keep_alive(settings.broker.keep_alive());
    options.set_clean_session(true);
    // an oversized packet fails the whole connection, not just the request
    options.set_max_packet_size(
        settings.broker.max_packet_size,
        settings.broker.max_packet_size,
    );

    if let Some(ca) = ca {
        options.set_transport(Transport::tls_with_config(TlsConfiguration::Simple {
            ca: ca.to_vec(),
            alpn: None,
            client_auth: None,
        }));
    }
    options
}

async fn await_connack(eventloop: &mut EventLoop, timeout: Duration) -> Result<(), ConnectionError> {
    let wait = async {
        loop {
            if let Event::Incoming(Packet::ConnAck(ack)) = eventloop.poll().await? {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(ConnectionError::ConnectionRefused(code)),
                };
            }
        }
    };

    tokio::time::timeout(timeout, wait)
        .await
        .unwrap_or(Err(ConnectionError::NetworkTimeout))
}

async fn run_event_loop(
    mut eventloop: EventLoop,
    shared: Arc<Shared>,
    listener: Arc<dyn MessageListener>,
    policy: ReconnectPolicy,
) {
    let mut failures = 0;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                if failures > 0 {
                    info!(attempts = failures, "Broker connection re-established");
                }
                failures = 0;
                shared.connected.store(true, Ordering::SeqCst);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                listener.on_message(&publish.topic, &publish.payload);
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                let rejected = ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure));
                shared.subscribes.settle(ack.pkid, |topic| {
                    if rejected {
                        Err(BrokerError::Rejected(topic.to_string()))
                    } else {
                        Ok(())
                    }
                });
            }
            Ok(Event::Incoming(Packet::UnsubAck(ack))) => {
                shared.unsubscribes.settle(ack.pkid, |_| Ok(()));
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                debug!(pkid = ack.pkid, "Producer received response");
            }
            Ok(Event::Outgoing(Outgoing::Subscribe(pkid))) => shared.subscribes.sent(pkid),
            Ok(Event::Outgoing(Outgoing::Unsubscribe(pkid))) => shared.unsubscribes.sent(pkid),
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => {
                info!("Broker client dropped, closing event loop");
                shared.connected.store(false, Ordering::SeqCst);
                break;
            }
            Err(e) => {
                shared.connected.store(false, Ordering::SeqCst);
                shared.subscribes.fail_all();
                shared.unsubscribes.fail_all();
                listener.on_exception(&e);

                if failures >= policy.reconnect_retries {
                    error!(
                        retries = policy.reconnect_retries,
                        "Giving up on the broker connection; restart to reconnect"
                    );
                    break;
                }
                failures += 1;
                warn!(attempt = failures, "Reconnecting to broker");
                tokio::time::sleep(policy.reconnect_retry_wait).await;
            }
        }
    }
}

#[async_trait]
impl BrokerSession for MqttSession {
    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    async fn publish(&self, topic: &str, body: &str) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }

        let publish = Publish::new(topic, QoS::AtMostOnce, body.as_bytes().to_vec());
        let size = publish.size();
        if size > self.max_packet_size {
            return Err(BrokerError::PayloadTooLarge {
                topic: topic.to_string(),
                size,
                max: self.max_packet_size,
            });
        }

        self.client
            .publish_bytes(publish.topic, QoS::AtMostOnce, false, publish.payload)
            .await?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }
        self.shared
            .subscribes
            .request(topic, self.request_timeout, || {
                self.client.subscribe(topic, QoS::AtLeastOnce)
            })
            .await
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }
        self.shared
            .unsubscribes
            .request(topic, self.request_timeout, || self.client.unsubscribe(topic))
            .await
    }
}
