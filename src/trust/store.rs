use std::io::Write;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use tempfile::NamedTempFile;
use tracing::info;

use crate::utils::error::TrustStoreError;

const ALIAS_PREFIX: &str = "# alias:";
const BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const END: &str = "-----END CERTIFICATE-----";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Certificate { alias: Option<String>, der: Vec<u8> },
    /// A line this store does not interpret, written back unchanged.
    Text(String),
}

/// An in-memory copy of a PEM trust bundle.
///
/// Comments and PEM blocks other than `CERTIFICATE` are kept in place, so a
/// load/store cycle only changes the certificates that were set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrustStore {
    items: Vec<Item>,
}

impl TrustStore {
    /// Reads the bundle at `path`. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, TrustStoreError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(TrustStoreError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let mut items = Vec::new();
        // the alias line waits for the block it labels
        let mut alias: Option<(String, &str)> = None;
        let mut block: Option<Vec<&str>> = None;

        for raw in text.lines() {
            let line = raw.trim();

            if let Some(mut lines) = block.take() {
                lines.push(raw);
                if line != END {
                    block = Some(lines);
                    continue;
                }
                let pem: String = lines.iter().map(|l| format!("{}\n", l.trim())).collect();
                match decode_first(pem.as_bytes(), path)? {
                    Some(der) => items.push(Item::Certificate {
                        alias: alias.take().map(|(name, _)| name),
                        der,
                    }),
                    None => {
                        flush_alias(&mut items, &mut alias);
                        items.extend(lines.into_iter().map(|l| Item::Text(l.to_string())));
                    }
                }
            } else if let Some(name) = line.strip_prefix(ALIAS_PREFIX) {
                flush_alias(&mut items, &mut alias);
                alias = Some((name.trim().to_string(), raw));
            } else if line == BEGIN {
                block = Some(vec![raw]);
            } else {
                flush_alias(&mut items, &mut alias);
                items.push(Item::Text(raw.to_string()));
            }
        }

        flush_alias(&mut items, &mut alias);
        if let Some(lines) = block {
            items.extend(lines.into_iter().map(|l| Item::Text(l.to_string())));
        }

        Ok(Self { items })
    }

    /// Replaces the certificate filed under `alias`, or appends it.
    pub fn set_certificate_entry(&mut self, alias: &str, der: Vec<u8>) {
        let existing = self.items.iter_mut().find_map(|item| match item {
            Item::Certificate {
                alias: Some(name),
                der: slot,
            } if name.as_str() == alias => Some(slot),
            _ => None,
        });
        match existing {
            Some(slot) => *slot = der,
            None => self.items.push(Item::Certificate {
                alias: Some(alias.to_string()),
                der,
            }),
        }
    }

    pub fn certificate(&self, alias: &str) -> Option<&[u8]> {
        self.certificates()
            .find(|(name, _)| *name == Some(alias))
            .map(|(_, der)| der)
    }

    /// Number of certificates, labelled or not.
    pub fn len(&self) -> usize {
        self.certificates().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn certificates(&self) -> impl Iterator<Item = (Option<&str>, &[u8])> {
        self.items.iter().filter_map(|item| match item {
            Item::Certificate { alias, der } => Some((alias.as_deref(), der.as_slice())),
            Item::Text(_) => None,
        })
    }

    /// Writes the bundle to a temporary file next to `path`, then renames
    /// it over `path`.
    pub fn store(&self, path: &Path) -> Result<(), TrustStoreError> {
        let write_err = |source: std::io::Error| TrustStoreError::Write {
            path: path.display().to_string(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(self.to_pem().as_bytes()).map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }

    fn to_pem(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                Item::Text(line) => {
                    out.push_str(line);
                    out.push('\n');
                }
                Item::Certificate { alias, der } => {
                    if let Some(alias) = alias {
                        out.push_str(&format!("{ALIAS_PREFIX} {alias}\n"));
                    }
                    out.push_str(BEGIN);
                    out.push('\n');
                    let encoded = BASE64_STANDARD.encode(der);
                    // PEM bodies wrap at 64 columns; base64 output is ASCII
                    for chunk in encoded.as_bytes().chunks(64) {
                        out.push_str(&String::from_utf8_lossy(chunk));
                        out.push('\n');
                    }
                    out.push_str(END);
                    out.push('\n');
                }
            }
        }
        out
    }
}

fn flush_alias(items: &mut Vec<Item>, alias: &mut Option<(String, &str)>) {
    if let Some((_, raw)) = alias.take() {
        items.push(Item::Text(raw.to_string()));
    }
}

fn decode_first(mut pem: &[u8], path: &Path) -> Result<Option<Vec<u8>>, TrustStoreError> {
    let certs = rustls_pemfile::certs(&mut pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TrustStoreError::Pem {
            path: path.display().to_string(),
            source,
        })?;
    Ok(certs.into_iter().next().map(|c| c.as_ref().to_vec()))
}

/// Adds the certificate in `certificate_file` (PEM or DER) to the bundle at
/// `trust_store` under `alias`.
pub fn install_certificate(
    certificate_file: &Path,
    trust_store: &Path,
    alias: &str,
) -> Result<(), TrustStoreError> {
    let bytes = std::fs::read(certificate_file).map_err(|source| TrustStoreError::Read {
        path: certificate_file.display().to_string(),
        source,
    })?;

    let is_pem = bytes
        .windows(BEGIN.len())
        .any(|window| window == BEGIN.as_bytes());
    let der = if is_pem {
        decode_first(&bytes, certificate_file)?
    } else if bytes.is_empty() {
        None
    } else {
        Some(bytes)
    };
    let der = der.ok_or_else(|| {
        TrustStoreError::NoCertificate(certificate_file.display().to_string())
    })?;

    let mut store = TrustStore::load(trust_store)?;
    store.set_certificate_entry(alias, der);
    store.store(trust_store)?;

    info!(
        alias = %alias,
        certificate = %certificate_file.display(),
        trust_store = %trust_store.display(),
        "Installed certificate"
    );
    Ok(())
}
