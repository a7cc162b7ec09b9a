use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use tempfile::TempDir;

use super::{TrustStore, install_certificate};
use crate::utils::error::TrustStoreError;

// DER-shaped bytes; nothing here parses the certificate itself
const FIRST: &[u8] = &[0x30, 0x03, 0x02, 0x01, 0x01];
const SECOND: &[u8] = &[0x30, 0x03, 0x02, 0x01, 0x02];

fn pem(der: &[u8]) -> String {
    format!(
        "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
        BASE64_STANDARD.encode(der)
    )
}

#[test]
fn test_missing_store_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = TrustStore::load(&dir.path().join("absent.pem")).unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_install_der_creates_store() {
    let dir = TempDir::new().unwrap();
    let cert = dir.path().join("my-cert.cer");
    let store_path = dir.path().join("trust").join("cacerts.pem");
    std::fs::write(&cert, FIRST).unwrap();

    install_certificate(&cert, &store_path, "my-alias").unwrap();

    let text = std::fs::read_to_string(&store_path).unwrap();
    assert!(text.starts_with("# alias: my-alias\n-----BEGIN CERTIFICATE-----"));

    let store = TrustStore::load(&store_path).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.certificate("my-alias"), Some(FIRST));
}

#[test]
fn test_install_pem_replaces_same_alias() {
    let dir = TempDir::new().unwrap();
    let cert = dir.path().join("cert.pem");
    let store_path = dir.path().join("cacerts.pem");

    std::fs::write(&cert, pem(FIRST)).unwrap();
    install_certificate(&cert, &store_path, "broker").unwrap();
    std::fs::write(&cert, pem(SECOND)).unwrap();
    install_certificate(&cert, &store_path, "broker").unwrap();
    install_certificate(&cert, &store_path, "other").unwrap();

    let store = TrustStore::load(&store_path).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.certificate("broker"), Some(SECOND));
    assert_eq!(store.certificate("other"), Some(SECOND));
}

#[test]
fn test_unlabelled_certificates_survive_rewrite() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("cacerts.pem");
    std::fs::write(&store_path, pem(FIRST)).unwrap();

    let mut store = TrustStore::load(&store_path).unwrap();
    assert_eq!(store.len(), 1);
    store.set_certificate_entry("added", SECOND.to_vec());
    store.store(&store_path).unwrap();

    let reloaded = TrustStore::load(&store_path).unwrap();
    assert_eq!(reloaded, store);
    assert_eq!(reloaded.len(), 2);
}

#[test]
fn test_long_certificates_wrap_and_reload() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("cacerts.pem");
    let der: Vec<u8> = (0..200u8).collect();

    let mut store = TrustStore::default();
    store.set_certificate_entry("long", der.clone());
    store.store(&store_path).unwrap();

    let text = std::fs::read_to_string(&store_path).unwrap();
    assert!(text.lines().all(|line| line.len() <= 64));
    assert_eq!(
        TrustStore::load(&store_path).unwrap().certificate("long"),
        Some(der.as_slice())
    );
}

#[test]
fn test_install_errors() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("cacerts.pem");

    let missing = install_certificate(&dir.path().join("nope.cer"), &store_path, "a");
    assert!(matches!(missing, Err(TrustStoreError::Read { .. })));

    let empty = dir.path().join("empty.cer");
    std::fs::write(&empty, b"").unwrap();
    let result = install_certificate(&empty, &store_path, "a");
    assert!(matches!(result, Err(TrustStoreError::NoCertificate(_))));
    assert!(!store_path.exists());
}

#[test]
fn test_rewrite_keeps_comments_and_other_blocks() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("cacerts.pem");
    let original = format!(
        "# corporate roots\n{}\n-----BEGIN TRUSTED CERTIFICATE-----\nMAMCAQE=\n-----END TRUSTED CERTIFICATE-----\n# alias: stale\n# trailing note\n",
        pem(FIRST)
    );
    std::fs::write(&store_path, &original).unwrap();

    let mut store = TrustStore::load(&store_path).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.certificate("stale"), None);
    store.set_certificate_entry("added", SECOND.to_vec());
    store.store(&store_path).unwrap();

    let text = std::fs::read_to_string(&store_path).unwrap();
    assert!(text.starts_with(&original), "{text}");
    assert_eq!(
        &text[original.len()..],
        format!("# alias: added\n{}", pem(SECOND))
    );
}
