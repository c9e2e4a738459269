use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{KeyringResult, Record};

/// Kind of OpenPGP packet a stored row carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Key,
    Subkey,
    Identity,
    Attribute,
    Signature,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Key => "key",
            EntityKind::Subkey => "subkey",
            EntityKind::Identity => "identity",
            EntityKind::Attribute => "attribute",
            EntityKind::Signature => "signature",
        }
    }
}

/// Signature type codes from RFC 4880 section 5.2.1.
pub mod sigtype {
    pub const SUBKEY_BINDING: i64 = 0x18;
    pub const PRIMARY_KEY_BINDING: i64 = 0x19;
    pub const DIRECT_KEY: i64 = 0x1F;
    pub const KEY_REVOCATION: i64 = 0x20;
    pub const SUBKEY_REVOCATION: i64 = 0x28;

    /// Signatures stored against a key that are made over the key itself.
    pub const KEY_SIGTYPES: [i64; 3] = [DIRECT_KEY, KEY_REVOCATION, PRIMARY_KEY_BINDING];
    /// Signatures stored against a subkey that bind it to or revoke it from its parent.
    pub const SUBKEY_SIGTYPES: [i64; 2] = [SUBKEY_BINDING, SUBKEY_REVOCATION];
}

/// Decodes raw packet bytes into the derived fields of a record.
#[async_trait]
pub trait PacketCodec: Send + Sync {
    async fn packet_info(&self, kind: EntityKind, binary: &[u8]) -> KeyringResult<Record>;
}
