use serde::Deserialize;
use std::time::Duration;

/// Largest remaining length MQTT 3.1.1 can encode.
pub const MQTT_MAX_PACKET_SIZE: usize = 268_435_455;

/// Top-level configuration settings for the application.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub tls: TlsSettings,
    pub log: LogSettings,
}

/// Address the REST server binds to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// How duplicate subscription requests are handled.
///
/// `Delegated` forwards every request and leaves duplicates to the broker.
/// `Tracked` keeps a local registry of active topics and rejects duplicate
/// adds and unknown removes before the broker is involved.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionMode {
    #[default]
    Delegated,
    Tracked,
}

/// Broker client settings.
///
/// The four retry values are only applied when the bound service is
/// high-availability; single-host bindings run with the client defaults.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub service_label: String,
    pub subscription_mode: SubscriptionMode,
    pub client_id: Option<String>,
    pub keep_alive_secs: u64,
    pub request_timeout_ms: u64,
    pub connect_retries: u32,
    pub reconnect_retries: u32,
    pub reconnect_retry_wait_ms: u64,
    pub connect_retries_per_host: u32,
    /// Largest MQTT packet accepted or sent, in bytes.
    pub max_packet_size: usize,
}

impl BrokerSettings {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Trust store and certificate-install settings.
#[derive(Debug, Deserialize, Clone)]
pub struct TlsSettings {
    pub enabled: bool,
    pub trust_store: String,
    pub install_certificate: bool,
    pub certificate_file: String,
    pub certificate_alias: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub tls: Option<PartialTlsSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub service_label: Option<String>,
    pub subscription_mode: Option<SubscriptionMode>,
    pub client_id: Option<String>,
    pub keep_alive_secs: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub connect_retries: Option<u32>,
    pub reconnect_retries: Option<u32>,
    pub reconnect_retry_wait_ms: Option<u64>,
    pub connect_retries_per_host: Option<u32>,
    pub max_packet_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialTlsSettings {
    pub enabled: Option<bool>,
    pub trust_store: Option<String>,
    pub install_certificate: Option<bool>,
    pub certificate_file: Option<String>,
    pub certificate_alias: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl PartialServerSettings {
    pub fn merge(self, default: ServerSettings) -> ServerSettings {
        ServerSettings {
            host: self.host.unwrap_or(default.host),
            port: self.port.unwrap_or(default.port),
        }
    }
}

impl PartialBrokerSettings {
    pub fn merge(self, default: BrokerSettings) -> BrokerSettings {
        BrokerSettings {
            service_label: self.service_label.unwrap_or(default.service_label),
            subscription_mode: self
                .subscription_mode
                .unwrap_or(default.subscription_mode),
            client_id: self.client_id.or(default.client_id),
            keep_alive_secs: self.keep_alive_secs.unwrap_or(default.keep_alive_secs),
            request_timeout_ms: self
                .request_timeout_ms
                .unwrap_or(default.request_timeout_ms),
            connect_retries: self.connect_retries.unwrap_or(default.connect_retries),
            reconnect_retries: self.reconnect_retries.unwrap_or(default.reconnect_retries),
            reconnect_retry_wait_ms: self
                .reconnect_retry_wait_ms
                .unwrap_or(default.reconnect_retry_wait_ms),
            connect_retries_per_host: self
                .connect_retries_per_host
                .unwrap_or(default.connect_retries_per_host),
            max_packet_size: self.max_packet_size.unwrap_or(default.max_packet_size),
        }
    }
}

impl PartialTlsSettings {
    pub fn merge(self, default: TlsSettings) -> TlsSettings {
        TlsSettings {
            enabled: self.enabled.unwrap_or(default.enabled),
            trust_store: self.trust_store.unwrap_or(default.trust_store),
            install_certificate: self
                .install_certificate
                .unwrap_or(default.install_certificate),
            certificate_file: self.certificate_file.unwrap_or(default.certificate_file),
            certificate_alias: self.certificate_alias.unwrap_or(default.certificate_alias),
        }
    }
}

impl PartialLogSettings {
    pub fn merge(self, default: LogSettings) -> LogSettings {
        LogSettings {
            level: self.level.unwrap_or(default.level),
        }
    }
}

/// Provides default values for `Settings`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            broker: BrokerSettings {
                service_label: "solace-pubsub".to_string(),
                subscription_mode: SubscriptionMode::Delegated,
                client_id: None,
                keep_alive_secs: 60,
                request_timeout_ms: 10_000,
                connect_retries: 1,
                reconnect_retries: 5,
                reconnect_retry_wait_ms: 3000,
                connect_retries_per_host: 20,
                max_packet_size: MQTT_MAX_PACKET_SIZE,
            },
            tls: TlsSettings {
                enabled: false,
                trust_store: "trust/cacerts.pem".to_string(),
                install_certificate: false,
                certificate_file: "my-cert.cer".to_string(),
                certificate_alias: "my-alias".to_string(),
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
