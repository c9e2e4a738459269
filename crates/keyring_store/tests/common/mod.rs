#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pgp_keyring_store::{
    sigtype, ConnectionHandle, EntityKind, Keyring, KeyringConfig, KeyringError, KeyringResult,
    PacketCodec, Record,
};

pub const PRIMARY: &str = "0123456789ABCDEF";
pub const SUBKEY: &str = "FEDCBA9876543210";
pub const OTHER: &str = "1111222233334444";
pub const UID: &str = "Alice Example <alice@example.org>";

/// Decodes packets into a few recognisable fields without parsing OpenPGP.
pub struct StubCodec;

#[async_trait]
impl PacketCodec for StubCodec {
    async fn packet_info(&self, kind: EntityKind, binary: &[u8]) -> KeyringResult<Record> {
        if binary.starts_with(b"corrupt") {
            return Err(KeyringError::codec("corrupt packet"));
        }
        let mut record = Record::new()
            .with("kind", kind.as_str())
            .with("length", binary.len() as i64);
        match kind {
            // Stored columns must win over decoded ones.
            EntityKind::Key | EntityKind::Subkey => {
                record.insert("date", -1_i64);
            }
            EntityKind::Identity => {
                record.insert("userid", String::from_utf8_lossy(binary).into_owned());
            }
            _ => {}
        }
        Ok(record)
    }
}

pub fn sqlite_config(dir: &Path) -> KeyringConfig {
    KeyringConfig::default_sqlite(dir.join("keyring.sqlite").to_string_lossy())
}

pub async fn open_keyring(dir: &Path) -> Keyring {
    Keyring::connect(&sqlite_config(dir), dir, Arc::new(StubCodec))
        .await
        .expect("keyring")
}

pub async fn open_handle(dir: &Path) -> ConnectionHandle {
    ConnectionHandle::connect(&sqlite_config(dir), dir)
        .await
        .expect("handle")
}

pub fn key(id: &str, fingerprint: &str) -> Record {
    Record::new()
        .with("id", id)
        .with("fingerprint", fingerprint)
        .with("binary", format!("key-{id}").into_bytes())
        .with("date", 1_700_000_000_i64)
        .with("security", 0_i64)
}

pub fn identity(id: &str, name: &str, email: &str) -> Record {
    Record::new()
        .with("id", id)
        .with("name", name)
        .with("email", email)
}

pub fn signature(id: &str, issuer: &str, sigtype: i64) -> Record {
    Record::new()
        .with("id", id)
        .with("issuer", issuer)
        .with("date", 1_700_000_100_i64)
        .with("binary", format!("sig-{id}").into_bytes())
        .with("verified", true)
        .with("sigtype", sigtype)
        .with("security", 0_i64)
}

pub fn binding(id: &str, parent: &str) -> Record {
    signature(id, parent, sigtype::SUBKEY_BINDING).with("expires", 1_800_000_000_i64)
}
