use async_trait::async_trait;

use pgp_keyring_core::{
    Conditions, IdentityApi, KeyringError, KeyringResult, Record, ResultSequence,
};

use super::{scope, scope_record, Keyring};
use crate::tables::{IDENTITIES, IDENTITIES_SELFSIGNED, IDENTITY_SIGNATURES};

#[async_trait]
impl IdentityApi for Keyring {
    fn get_identity_list(&self, key_id: &str, filter: Conditions) -> ResultSequence<String> {
        self.ids(&IDENTITIES, "id", filter.scoped(scope(&[("key", key_id)])))
    }

    fn get_identities(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record> {
        self.entries(&IDENTITIES, filter.scoped(scope(&[("key", key_id)])), fields)
    }

    async fn identity_exists(&self, key_id: &str, identity_id: &str) -> KeyringResult<bool> {
        self.exists(&IDENTITIES, scope(&[("key", key_id), ("id", identity_id)]))
            .await
    }

    async fn get_identity(
        &self,
        key_id: &str,
        identity_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>> {
        self.entry(
            &IDENTITIES,
            scope(&[("key", key_id), ("id", identity_id)]),
            fields,
        )
        .await
    }

    fn get_self_signed_identities(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record> {
        self.entries(
            &IDENTITIES_SELFSIGNED,
            filter.scoped(scope(&[("key", key_id)])),
            fields,
        )
    }

    async fn get_self_signed_identity(
        &self,
        key_id: &str,
        identity_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>> {
        self.entry(
            &IDENTITIES_SELFSIGNED,
            scope(&[("key", key_id), ("id", identity_id)]),
            fields,
        )
        .await
    }

    async fn add_identity(&self, key_id: &str, identity: Record) -> KeyringResult<()> {
        self.add(&IDENTITIES, identity, scope_record(&[("key", key_id)]))
            .await
    }

    async fn update_identity(
        &self,
        key_id: &str,
        identity_id: &str,
        fields: Record,
    ) -> KeyringResult<()> {
        self.update(
            &IDENTITIES,
            scope(&[("key", key_id), ("id", identity_id)]),
            fields,
        )
        .await
    }

    async fn remove_identity(&self, key_id: &str, identity_id: &str) -> KeyringResult<()> {
        let signed = self
            .exists(
                &IDENTITY_SIGNATURES,
                scope(&[("key", key_id), ("identity", identity_id)]),
            )
            .await?;
        if signed {
            return Err(KeyringError::dependency_exists(format!(
                "identity {identity_id} of key {key_id} still has signatures"
            )));
        }
        self.remove(&IDENTITIES, scope(&[("key", key_id), ("id", identity_id)]))
            .await
    }
}
