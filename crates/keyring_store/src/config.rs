use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use pgp_keyring_core::{Dialect, KeyringError, KeyringResult};

pub const CONFIG_FILE_NAME: &str = "keyring.json";
pub(crate) const DEFAULT_SQLITE_NAME: &str = "keyring.sqlite";
const DEFAULT_POSTGRES_SCHEMA: &str = "public";
const SQLITE_SCHEMA: &str = "main";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DatabaseConfig {
    Sqlite {
        path: Option<String>,
    },
    Postgres {
        url: String,
        schema: Option<String>,
    },
}

/// Timeouts for the single session the keyring holds.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub connect_timeout_ms: Option<u64>,
    pub acquire_timeout_ms: Option<u64>,
    pub sql_logging: Option<bool>,
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyringConfig {
    pub database: DatabaseConfig,
    pub connection: Option<ConnectionConfig>,
    /// Create missing schema objects when the keyring is opened.
    pub initialise: Option<bool>,
}

impl KeyringConfig {
    pub fn default_sqlite(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig::Sqlite {
                path: Some(path.into()),
            },
            connection: None,
            initialise: Some(true),
        }
    }

    pub fn postgres(url: impl Into<String>, schema: Option<String>) -> Self {
        Self {
            database: DatabaseConfig::Postgres {
                url: url.into(),
                schema,
            },
            connection: None,
            initialise: Some(false),
        }
    }

    /// Reads `keyring.json` from `base_dir`. When the file does not exist a
    /// SQLite config is written whose database sits next to it, referenced by
    /// a relative path so the directory can be moved.
    pub fn load_or_init(base_dir: &Path) -> KeyringResult<Self> {
        let config_path = base_dir.join(CONFIG_FILE_NAME);
        match fs::read_to_string(&config_path) {
            Ok(raw) => Self::parse(&raw).map_err(|err| {
                KeyringError::validation(format!("{}: {err}", config_path.display()))
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(base_dir)?;
                let config = Self::default_sqlite(DEFAULT_SQLITE_NAME);
                let payload = serde_json::to_string_pretty(&config)
                    .map_err(|err| KeyringError::storage(format!("serialize config: {err}")))?;
                fs::write(&config_path, payload)?;
                info!("keyring: wrote default config {}", config_path.display());
                Ok(config)
            }
            Err(err) => Err(KeyringError::storage(format!(
                "read {}: {err}",
                config_path.display()
            ))),
        }
    }

    /// Decodes and validates a JSON config.
    pub fn parse(raw: &str) -> KeyringResult<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| KeyringError::validation(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the driver would only fail on later.
    pub fn validate(&self) -> KeyringResult<()> {
        match &self.database {
            DatabaseConfig::Sqlite { path: Some(path) } if path.trim().is_empty() => {
                Err(KeyringError::validation("sqlite path is empty"))
            }
            DatabaseConfig::Sqlite { .. } => Ok(()),
            DatabaseConfig::Postgres { url, schema } => {
                if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                    return Err(KeyringError::validation(format!(
                        "postgres url must use the postgres:// scheme, got {url:?}"
                    )));
                }
                match schema.as_deref() {
                    Some(name) if name.is_empty() || name.contains('"') => Err(
                        KeyringError::validation(format!("invalid schema name {name:?}")),
                    ),
                    _ => Ok(()),
                }
            }
        }
    }

    pub fn sqlite_path(&self, base_dir: &Path) -> KeyringResult<PathBuf> {
        match &self.database {
            DatabaseConfig::Sqlite { path } => {
                let path = path
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SQLITE_NAME.to_string());
                let candidate = PathBuf::from(path);
                if candidate.is_absolute() {
                    Ok(candidate)
                } else {
                    Ok(base_dir.join(candidate))
                }
            }
            DatabaseConfig::Postgres { .. } => {
                Err(KeyringError::validation("config is not sqlite backend"))
            }
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self.database {
            DatabaseConfig::Sqlite { .. } => Dialect::Sqlite,
            DatabaseConfig::Postgres { .. } => Dialect::Postgres,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.dialect().name()
    }

    /// Schema the keyring relations live in.
    pub fn schema(&self) -> &str {
        match &self.database {
            DatabaseConfig::Sqlite { .. } => SQLITE_SCHEMA,
            DatabaseConfig::Postgres { schema, .. } => {
                schema.as_deref().unwrap_or(DEFAULT_POSTGRES_SCHEMA)
            }
        }
    }

    pub fn connection_url(&self, base_dir: &Path) -> KeyringResult<String> {
        match &self.database {
            DatabaseConfig::Sqlite { .. } => {
                let path = self.sqlite_path(base_dir)?;
                Ok(format!("sqlite://{}?mode=rwc", path.display()))
            }
            DatabaseConfig::Postgres { url, .. } => Ok(url.clone()),
        }
    }

    pub fn initialise_on_open(&self) -> bool {
        self.initialise.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{DatabaseConfig, KeyringConfig};

    #[test]
    fn relative_sqlite_path_resolves_against_base() {
        let config = KeyringConfig::default_sqlite("ring.sqlite");
        let url = config.connection_url(Path::new("/var/lib/ring")).expect("url");
        assert_eq!(url, "sqlite:///var/lib/ring/ring.sqlite?mode=rwc");
        assert_eq!(config.schema(), "main");
    }

    #[test]
    fn validation_rejects_unusable_settings() {
        assert!(KeyringConfig::postgres("mysql://localhost/keys", None)
            .validate()
            .is_err());
        assert!(KeyringConfig::postgres("postgresql://localhost/keys", Some(String::new()))
            .validate()
            .is_err());
        assert!(KeyringConfig::postgres("postgres://localhost/keys", Some("a\"b".into()))
            .validate()
            .is_err());
        assert!(KeyringConfig::default_sqlite(" ").validate().is_err());
        assert!(KeyringConfig::default_sqlite("ring.sqlite").validate().is_ok());
    }

    #[test]
    fn postgres_schema_defaults_to_public() {
        let config = KeyringConfig::postgres("postgres://localhost/keys", None);
        assert_eq!(config.schema(), "public");
        assert_eq!(config.backend_name(), "postgres");
        assert!(config.sqlite_path(Path::new("/tmp")).is_err());
        let config = KeyringConfig {
            database: DatabaseConfig::Postgres {
                url: "postgres://localhost/keys".into(),
                schema: Some("pgp".into()),
            },
            connection: None,
            initialise: None,
        };
        assert_eq!(config.schema(), "pgp");
        assert!(!config.initialise_on_open());
    }
}
