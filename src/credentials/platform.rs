use std::env;

pub const SERVICE_KEY: &str = "SERVICE_KEY";
pub const VCAP_SERVICES: &str = "VCAP_SERVICES";
pub const LDAP_CLIENT_USERNAME: &str = "LDAP_CLIENTUSERNAME";
pub const LDAP_CLIENT_PASSWORD: &str = "LDAP_CLIENTPASSWORD";

/// Snapshot of the platform variables credential resolution looks at.
#[derive(Debug, Clone, Default)]
pub struct PlatformEnv {
    pub service_key: Option<String>,
    pub vcap_services: Option<String>,
    pub ldap_username: Option<String>,
    pub ldap_password: Option<String>,
}

impl PlatformEnv {
    pub fn from_env() -> Self {
        Self {
            service_key: env::var(SERVICE_KEY).ok(),
            vcap_services: env::var(VCAP_SERVICES).ok(),
            ldap_username: env::var(LDAP_CLIENT_USERNAME).ok(),
            ldap_password: env::var(LDAP_CLIENT_PASSWORD).ok(),
        }
    }

    /// Platform tooling sets unbound variables to `""` or `"{}"`.
    pub(crate) fn present(value: &Option<String>) -> Option<&str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "{}")
    }

    pub(crate) fn ldap_pair(&self) -> Option<(String, String)> {
        let username = self.ldap_username.as_deref().filter(|u| !u.is_empty())?;
        let password = self.ldap_password.as_deref().filter(|p| !p.is_empty())?;
        Some((username.to_string(), password.to_string()))
    }
}
