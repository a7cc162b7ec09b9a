use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::info;

use super::Credentials;
use super::platform::{PlatformEnv, SERVICE_KEY, VCAP_SERVICES};
use crate::utils::error::CredentialsError;

/// Credential fields as the broker service publishes them. Unknown keys are
/// ignored; the service adds new ones over time.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawCredentials {
    mqtt_uris: Option<Vec<String>>,
    mqtt_tls_uris: Option<Vec<String>>,
    public_mqtt_uris: Option<Vec<String>>,
    msg_vpn_name: Option<String>,
    client_username: Option<String>,
    client_password: Option<String>,
    #[serde(alias = "HA", alias = "ha")]
    high_availability: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Binding {
    credentials: Option<RawCredentials>,
}

/// Resolves broker credentials from the platform environment.
///
/// `service_label` selects the entry in `VCAP_SERVICES`; `tls` picks the
/// TLS host list from a service binding.
pub fn resolve(
    env: &PlatformEnv,
    service_label: &str,
    tls: bool,
) -> Result<Credentials, CredentialsError> {
    if let Some(service_key) = PlatformEnv::present(&env.service_key) {
        info!("Resolving credentials from {SERVICE_KEY}");
        let raw: RawCredentials = parse(SERVICE_KEY, service_key)?;
        let hosts = required_hosts(raw.public_mqtt_uris.clone(), "publicMqttUris")?;
        // service keys carry their own user; LDAP fallback is for bindings only
        let username = raw
            .client_username
            .clone()
            .ok_or(CredentialsError::MissingField("clientUsername"))?;
        let password = raw
            .client_password
            .clone()
            .ok_or(CredentialsError::MissingField("clientPassword"))?;
        return Ok(build(raw, hosts, username, password));
    }

    let vcap = PlatformEnv::present(&env.vcap_services)
        .ok_or(CredentialsError::NotSet(VCAP_SERVICES))?;
    info!("Resolving credentials from {VCAP_SERVICES}");

    let mut services: HashMap<String, serde_json::Value> = parse(VCAP_SERVICES, vcap)?;
    let bindings = services
        .remove(service_label)
        .ok_or_else(|| CredentialsError::ServiceNotFound(service_label.to_string()))?;
    let bindings: Vec<Binding> =
        serde_json::from_value(bindings).map_err(|source| CredentialsError::Malformed {
            var: VCAP_SERVICES,
            source,
        })?;
    info!("Number of provided bindings: {}", bindings.len());

    let raw = bindings
        .into_iter()
        .next()
        .ok_or_else(|| CredentialsError::NoBindings(service_label.to_string()))?
        .credentials
        .ok_or(CredentialsError::MissingCredentials)?;

    let hosts = if tls {
        required_hosts(raw.mqtt_tls_uris.clone(), "mqttTlsUris")?
    } else {
        required_hosts(raw.mqtt_uris.clone(), "mqttUris")?
    };

    let (username, password) = match (&raw.client_username, &raw.client_password) {
        (Some(username), Some(password)) => {
            info!(username = %username, "Using broker-provided authentication");
            (username.clone(), password.clone())
        }
        // clientUsername/clientPassword are absent when the service delegates
        // application access to an LDAP server
        _ => {
            let pair = env
                .ldap_pair()
                .ok_or(CredentialsError::MissingClientCredentials)?;
            info!(username = %pair.0, "Using LDAP-provided authentication");
            pair
        }
    };

    Ok(build(raw, hosts, username, password))
}

fn parse<T: DeserializeOwned>(var: &'static str, text: &str) -> Result<T, CredentialsError> {
    serde_json::from_str(text).map_err(|source| CredentialsError::Malformed { var, source })
}

fn required_hosts(
    hosts: Option<Vec<String>>,
    field: &'static str,
) -> Result<Vec<String>, CredentialsError> {
    let hosts = hosts.ok_or(CredentialsError::MissingField(field))?;
    let hosts: Vec<String> = hosts
        .into_iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();
    if hosts.is_empty() {
        return Err(CredentialsError::EmptyHostList(field));
    }
    Ok(hosts)
}

fn build(raw: RawCredentials, hosts: Vec<String>, username: String, password: String) -> Credentials {
    let high_availability = raw.high_availability.unwrap_or(false) || hosts.len() > 1;
    Credentials {
        hosts,
        vpn_name: raw.msg_vpn_name,
        username,
        password,
        high_availability,
    }
}
