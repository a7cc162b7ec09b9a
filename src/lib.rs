//! # msgbridge
//!
//! `msgbridge` is a small REST service that fronts a managed message broker.
//! It publishes messages, manages topic subscriptions and reports traffic
//! counters over HTTP, while a background MQTT session records whatever the
//! broker delivers.
//!
//! ## Core Modules
//!
//! - `config`: loads settings from `config/default` and the environment.
//! - `credentials`: resolves broker credentials from the platform's service bindings.
//! - `client`: the MQTT session, its event loop and the inbound message listener.
//! - `broker`: the `Bridge` the HTTP handlers call, plus counters and the subscription registry.
//! - `transport`: the axum router and its JSON bodies.
//! - `trust`: installs a broker certificate into the local trust bundle.
//! - `utils`: error types and logging setup.

pub mod app;
pub mod broker;
pub mod client;
pub mod config;
pub mod credentials;
pub mod transport;
pub mod trust;
pub mod utils;
