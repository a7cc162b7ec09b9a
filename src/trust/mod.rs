//! Local trust store for self-signed broker certificates.
//!
//! The store is a PEM bundle (the same file the MQTT client loads as its CA
//! list). Each certificate block may carry a `# alias: <name>` line so an
//! install can replace an earlier certificate with the same alias.

mod store;

pub use store::{TrustStore, install_certificate};

#[cfg(test)]
mod tests;
