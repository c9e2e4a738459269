use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use pgp_keyring_core::{KeyringResult, PacketCodec};

use crate::config::DEFAULT_SQLITE_NAME;
use crate::{Keyring, KeyringConfig};

/// Reads `base/keyring.json`, creating a SQLite default when it is missing.
pub fn load_or_init_config(base: &Path) -> KeyringResult<KeyringConfig> {
    KeyringConfig::load_or_init(base)
}

/// Opens the keyring whose config lives in `base`. Relative SQLite paths in
/// the config resolve against `base` as well.
pub async fn open_keyring(base: &Path, codec: Arc<dyn PacketCodec>) -> KeyringResult<Keyring> {
    let config = load_or_init_config(base)?;
    debug!(
        "keyring: opening {} keyring from {}",
        config.backend_name(),
        base.display()
    );
    Keyring::connect(&config, base, codec).await
}

/// Where the default config places the SQLite database.
pub fn default_sqlite_path(base: &Path) -> PathBuf {
    base.join(DEFAULT_SQLITE_NAME)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use pgp_keyring_core::{EntityKind, KeyApi, KeyringResult, PacketCodec, Record};
    use tempfile::tempdir;

    use super::{default_sqlite_path, load_or_init_config, open_keyring};

    struct NoFields;

    #[async_trait]
    impl PacketCodec for NoFields {
        async fn packet_info(&self, _kind: EntityKind, _binary: &[u8]) -> KeyringResult<Record> {
            Ok(Record::new())
        }
    }

    #[tokio::test]
    async fn opens_keyring_with_default_config() {
        let dir = tempdir().expect("tempdir");
        let base = dir.path();
        let config = load_or_init_config(base).expect("config");
        assert_eq!(config.backend_name(), "sqlite");
        assert!(base.join("keyring.json").exists());
        let keyring = open_keyring(base, Arc::new(NoFields)).await.expect("open keyring");
        assert!(default_sqlite_path(base).exists());
        assert!(!keyring.key_exists("0123456789ABCDEF").await.expect("exists"));
    }
}
