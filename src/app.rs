//! Startup wiring shared by the binary and the tests.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::broker::{Bridge, Stats};
use crate::client::{self, BrokerSession, RecordingListener};
use crate::config::Settings;
use crate::credentials::{self, PlatformEnv};
use crate::trust;

/// Installs the certificate (when configured), resolves credentials and
/// connects. Any failure is logged and leaves the bridge without a session;
/// there is no retry until the process restarts.
pub async fn start_broker(
    settings: &Settings,
    env: &PlatformEnv,
    stats: Arc<Stats>,
) -> Option<Arc<dyn BrokerSession>> {
    if settings.tls.install_certificate {
        if let Err(e) = trust::install_certificate(
            Path::new(&settings.tls.certificate_file),
            Path::new(&settings.tls.trust_store),
            &settings.tls.certificate_alias,
        ) {
            error!(error = %e, "Certificate install failed, broker session not started");
            return None;
        }
    }

    let credentials =
        match credentials::resolve(env, &settings.broker.service_label, settings.tls.enabled) {
            Ok(credentials) => credentials,
            Err(e) => {
                error!(error = %e, "Unable to resolve broker credentials");
                return None;
            }
        };
    info!(?credentials, "Resolved broker credentials");

    let listener = Arc::new(RecordingListener::new(stats));
    match client::connect(&credentials, settings, listener).await {
        Ok(session) => {
            let session: Arc<dyn BrokerSession> = Arc::new(session);
            Some(session)
        }
        Err(e) => {
            error!(error = %e, "Error connecting to the broker");
            None
        }
    }
}

/// Builds the bridge the HTTP layer serves, connected or not.
pub async fn build_bridge(settings: &Settings, env: &PlatformEnv) -> Arc<Bridge> {
    let stats = Arc::new(Stats::default());
    let session = start_broker(settings, env, stats.clone()).await;
    Arc::new(Bridge::new(
        session,
        stats,
        settings.broker.subscription_mode,
    ))
}
