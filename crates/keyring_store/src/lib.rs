pub mod config;
pub mod datastore;
pub mod driver;
pub mod handle;
pub mod keyring;
pub mod mapper;
pub mod query;
pub mod schema;
pub mod tables;
pub mod transaction;

pub use pgp_keyring_core::*;

pub use config::{ConnectionConfig, DatabaseConfig, KeyringConfig};
pub use datastore::{default_sqlite_path, load_or_init_config, open_keyring};
pub use driver::{Driver, RowShape, RowStream, SeaDriver};
pub use handle::ConnectionHandle;
pub use keyring::Keyring;
pub use query::{escape_bytea, BoundQuery, Projection};
pub use schema::{BootstrapReport, ObjectKind, SchemaObject};
pub use transaction::{TransactionCommand, TransactionCoordinator, TransactionState};
