//! Credential resolution
//!
//! Turns platform-injected JSON into the connection parameters the broker
//! client needs. Two shapes are understood:
//!
//! - a *service key* (`SERVICE_KEY`): one flat credentials object, as handed
//!   out for TCP-routed apps that are not bound to the service directly;
//! - a *service binding* (`VCAP_SERVICES`): a map from service label to the
//!   list of bound instances, each carrying a `credentials` object.
//!
//! A service key, when present, takes precedence. Resolution never retries;
//! the caller logs the error and carries on without a connection.

mod binding;
mod platform;

use std::fmt;

pub use binding::resolve;
pub use platform::PlatformEnv;

/// Connection parameters resolved from the platform.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Broker URIs in failover order.
    pub hosts: Vec<String>,
    pub vpn_name: Option<String>,
    pub username: String,
    pub password: String,
    pub high_availability: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("hosts", &self.hosts)
            .field("vpn_name", &self.vpn_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("high_availability", &self.high_availability)
            .finish()
    }
}
