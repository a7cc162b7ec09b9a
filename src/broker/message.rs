use serde::{Deserialize, Serialize};

/// A text message as published through, or last received from, the broker.
///
/// Also the JSON body of `POST /message` and `GET /message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleMessage {
    pub topic: String,
    pub body: String,
}

/// Body of `POST /subscription` and of the legacy `DELETE /subscription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleSubscription {
    pub subscription: String,
}

/// Counter snapshot returned by `GET /status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(rename = "numMsgsSent")]
    pub sent: u64,
    #[serde(rename = "numMsgsReceived")]
    pub received: u64,
}
