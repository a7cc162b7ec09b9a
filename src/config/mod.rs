mod settings;

use config::{Config, ConfigError, Environment, File};
use settings::PartialSettings;

pub use settings::{
    BrokerSettings, LogSettings, MQTT_MAX_PACKET_SIZE, ServerSettings, Settings, SubscriptionMode,
    TlsSettings,
};

/// Prefix for environment overrides, e.g. `MSGBRIDGE_BROKER__RECONNECT_RETRIES`.
pub const ENV_PREFIX: &str = "MSGBRIDGE";

/// Loads the configuration from the default file and environment variables,
/// merged over `Settings::default()`.
///
/// The platform-assigned `PORT` variable wins over any configured port.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    let mut settings = merge(partial);
    if let Some(port) = platform_port() {
        settings.server.port = port;
    }
    Ok(settings)
}

fn merge(partial: PartialSettings) -> Settings {
    let default = Settings::default();

    Settings {
        server: partial.server.unwrap_or_default().merge(default.server),
        broker: partial.broker.unwrap_or_default().merge(default.broker),
        tls: partial.tls.unwrap_or_default().merge(default.tls),
        log: partial.log.unwrap_or_default().merge(default.log),
    }
}

fn platform_port() -> Option<u16> {
    std::env::var("PORT").ok()?.trim().parse().ok()
}
