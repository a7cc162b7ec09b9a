//! Error types shared across `msgbridge`.
//!
//! Each concern gets its own enum: resolving platform credentials, talking
//! to the broker, and editing the local trust store. The REST layer maps
//! `BrokerError` into 400 responses; the other two only ever reach the logs.

use thiserror::Error;

/// Why platform credentials could not be turned into connection parameters.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("the {0} variable wasn't set in the environment")]
    NotSet(&'static str),

    #[error("unable to read {var} as a JSON structure")]
    Malformed {
        var: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("did not find provided messaging service \"{0}\"")]
    ServiceNotFound(String),

    #[error("service \"{0}\" has no bindings")]
    NoBindings(String),

    #[error("the service binding has no credentials object")]
    MissingCredentials,

    #[error("unable to find {0} in the credentials")]
    MissingField(&'static str),

    #[error("did not find any entries in the {0} array")]
    EmptyHostList(&'static str),

    #[error(
        "did not find credentials to use, neither clientUsername/clientPassword \
         nor LDAP_CLIENTUSERNAME/LDAP_CLIENTPASSWORD"
    )]
    MissingClientCredentials,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("the session is not connected, please see logs")]
    NotConnected,

    #[error("topic must not be empty")]
    InvalidTopic,

    #[error("already subscribed to {0}")]
    AlreadySubscribed(String),

    #[error("was not subscribed to {0}")]
    NotSubscribed(String),

    #[error("no broker hosts to connect to")]
    NoHosts,

    #[error("unsupported broker uri {0}")]
    InvalidUri(String),

    #[error("unable to connect to {hosts}")]
    ConnectFailed {
        hosts: String,
        #[source]
        source: rumqttc::ConnectionError,
    },

    #[error("the client refused the request")]
    Client(#[from] rumqttc::ClientError),

    #[error("message for {topic} is {size} bytes, over the {max} byte packet limit")]
    PayloadTooLarge {
        topic: String,
        size: usize,
        max: usize,
    },

    #[error("the broker rejected the subscription to {0}")]
    Rejected(String),

    #[error("timed out waiting for the broker to confirm {op} {topic}")]
    Timeout { op: &'static str, topic: String },

    #[error("connection lost before the broker confirmed {op} {topic}")]
    ConnectionLost { op: &'static str, topic: String },

    #[error("unable to read trust store {path}")]
    TrustStore {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TrustStoreError {
    #[error("unable to read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to write trust store {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid PEM data in {path}")]
    Pem {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificate found in {0}")]
    NoCertificate(String),
}
