//! The keyring facade: entity operations over the nine keyring relations.
//!
//! Writes open a transaction implicitly; it stays open until
//! [`ChangesApi::save_changes`] or [`ChangesApi::revert_changes`].

mod attributes;
mod identities;
mod keys;
mod search;
mod signatures;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::ready;
use log::info;

use pgp_keyring_core::{
    ChangesApi, Conditions, Filter, KeyringError, KeyringResult, PacketCodec, Record,
    ResultSequence, Value,
};

use crate::handle::ConnectionHandle;
use crate::mapper;
use crate::schema::{self, BootstrapReport};
use crate::tables::{EntityTable, ATTRIBUTES, IDENTITIES, KEY_SIGNATURES, SUBKEYS};
use crate::transaction::TransactionState;
use crate::KeyringConfig;

#[derive(Clone)]
pub struct Keyring {
    handle: Arc<ConnectionHandle>,
    codec: Arc<dyn PacketCodec>,
}

impl Keyring {
    pub fn new(handle: ConnectionHandle, codec: Arc<dyn PacketCodec>) -> Self {
        Self {
            handle: Arc::new(handle),
            codec,
        }
    }

    /// Connects per `config`, creating missing relations when the config asks for it.
    pub async fn connect(
        config: &KeyringConfig,
        base_dir: &Path,
        codec: Arc<dyn PacketCodec>,
    ) -> KeyringResult<Self> {
        let handle = ConnectionHandle::connect(config, base_dir).await?;
        let keyring = Self::new(handle, codec);
        if config.initialise_on_open() {
            let report = keyring.initialise().await?;
            if let Some((name, err)) = report.failed.first() {
                return Err(KeyringError::schema(format!("creating {name} failed: {err}")));
            }
        }
        Ok(keyring)
    }

    /// Creates the keyring relations that do not exist yet.
    pub async fn initialise(&self) -> KeyringResult<BootstrapReport> {
        let report = schema::initialise(&self.handle).await?;
        info!(
            "keyring: schema {} ready ({} created, {} present, {} failed)",
            self.handle.schema(),
            report.created.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.handle.transaction_state()
    }

    fn entries(
        &self,
        table: &'static EntityTable,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record> {
        mapper::get_entries(&self.handle, &self.codec, table, &filter, fields)
    }

    fn ids(
        &self,
        table: &'static EntityTable,
        id_field: &'static str,
        filter: Conditions,
    ) -> ResultSequence<String> {
        mapper::get_list(&self.handle, &self.codec, table, id_field, &filter).map(
            move |value| {
                ready(match value {
                    Value::Str(id) => Ok(id),
                    other => Err(KeyringError::storage(format!(
                        "expected text in {}.{id_field}, found {other:?}",
                        table.name
                    ))),
                })
            },
        )
    }

    async fn entry(
        &self,
        table: &'static EntityTable,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>> {
        mapper::get_entry(&self.handle, &self.codec, table, &filter, fields).await
    }

    async fn exists(&self, table: &'static EntityTable, filter: Conditions) -> KeyringResult<bool> {
        mapper::exists(&self.handle, &self.codec, table, &filter).await
    }

    /// Inserts `record` with the `scope` fields forced to their scoped values.
    async fn add(
        &self,
        table: &'static EntityTable,
        record: Record,
        scope: Record,
    ) -> KeyringResult<()> {
        mapper::add_entry(&self.handle, table, &scope.overlay(record)).await
    }

    async fn update(
        &self,
        table: &'static EntityTable,
        scope: Conditions,
        fields: Record,
    ) -> KeyringResult<()> {
        mapper::update_entries(&self.handle, &self.codec, table, &fields, &scope)
            .await
            .map(|_| ())
    }

    async fn remove(&self, table: &'static EntityTable, scope: Conditions) -> KeyringResult<()> {
        mapper::remove_entries(&self.handle, &self.codec, table, &scope)
            .await
            .map(|_| ())
    }

    /// First kind of row still referring to `key_id`, if any.
    async fn key_dependents(&self, key_id: &str) -> KeyringResult<Option<&'static str>> {
        let checks: [(&'static str, &'static EntityTable, &'static str); 4] = [
            ("identities", &IDENTITIES, "key"),
            ("attributes", &ATTRIBUTES, "key"),
            ("subkeys", &SUBKEYS, "parentkey"),
            ("signatures", &KEY_SIGNATURES, "key"),
        ];
        for (label, table, field) in checks {
            if self.exists(table, scope(&[(field, key_id)])).await? {
                return Ok(Some(label));
            }
        }
        Ok(None)
    }

    async fn ensure_key_removable(&self, key_id: &str) -> KeyringResult<()> {
        match self.key_dependents(key_id).await? {
            Some(label) => Err(KeyringError::dependency_exists(format!(
                "key {key_id} still has {label}"
            ))),
            None => Ok(()),
        }
    }
}

/// Exact-match conditions for each `(field, value)` pair.
fn scope(pairs: &[(&str, &str)]) -> Conditions {
    pairs
        .iter()
        .map(|(field, value)| (*field, Filter::equals(*value)))
        .collect()
}

/// Record holding each `(field, value)` pair.
fn scope_record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .fold(Record::new(), |record, (field, value)| record.with(*field, *value))
}

#[async_trait]
impl ChangesApi for Keyring {
    async fn save_changes(&self) -> KeyringResult<()> {
        self.handle.commit().await
    }

    async fn revert_changes(&self) -> KeyringResult<()> {
        self.handle.rollback().await
    }
}
