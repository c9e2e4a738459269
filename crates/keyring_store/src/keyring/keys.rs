use async_trait::async_trait;
use log::debug;

use pgp_keyring_core::{
    Conditions, KeyApi, KeyringError, KeyringResult, Record, ResultSequence, SubkeyApi,
};

use super::{scope, Keyring};
use crate::tables::{KEYS, SUBKEYS};

#[async_trait]
impl KeyApi for Keyring {
    fn get_key_list(&self, filter: Conditions) -> ResultSequence<String> {
        self.ids(&KEYS, "id", filter)
    }

    fn get_keys(&self, filter: Conditions, fields: Option<&[&str]>) -> ResultSequence<Record> {
        self.entries(&KEYS, filter, fields)
    }

    async fn key_exists(&self, key_id: &str) -> KeyringResult<bool> {
        self.exists(&KEYS, scope(&[("id", key_id)])).await
    }

    async fn get_key(&self, key_id: &str, fields: Option<&[&str]>) -> KeyringResult<Option<Record>> {
        self.entry(&KEYS, scope(&[("id", key_id)]), fields).await
    }

    async fn add_key(&self, key: Record) -> KeyringResult<()> {
        self.add(&KEYS, key, Record::new()).await
    }

    async fn update_key(&self, key_id: &str, fields: Record) -> KeyringResult<()> {
        self.update(&KEYS, scope(&[("id", key_id)]), fields).await
    }

    async fn remove_key(&self, key_id: &str) -> KeyringResult<()> {
        self.ensure_key_removable(key_id).await?;
        self.remove(&KEYS, scope(&[("id", key_id)])).await
    }
}

#[async_trait]
impl SubkeyApi for Keyring {
    fn get_subkey_list(&self, key_id: &str, filter: Conditions) -> ResultSequence<String> {
        self.ids(&SUBKEYS, "id", filter.scoped(scope(&[("parentkey", key_id)])))
    }

    fn get_subkeys(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record> {
        self.entries(&SUBKEYS, filter.scoped(scope(&[("parentkey", key_id)])), fields)
    }

    async fn subkey_exists(&self, key_id: &str, subkey_id: &str) -> KeyringResult<bool> {
        self.exists(&SUBKEYS, scope(&[("parentkey", key_id), ("id", subkey_id)]))
            .await
    }

    async fn get_subkey(
        &self,
        key_id: &str,
        subkey_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>> {
        self.entry(
            &SUBKEYS,
            scope(&[("parentkey", key_id), ("id", subkey_id)]),
            fields,
        )
        .await
    }

    // Subkeys are defined by their binding signature, so every subkey is self-signed.
    fn get_self_signed_subkeys(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record> {
        self.get_subkeys(key_id, filter, fields)
    }

    async fn get_self_signed_subkey(
        &self,
        key_id: &str,
        subkey_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>> {
        self.get_subkey(key_id, subkey_id, fields).await
    }

    fn get_parent_key_list(&self, subkey_id: &str) -> ResultSequence<String> {
        self.ids(&SUBKEYS, "parentkey", scope(&[("id", subkey_id)]))
    }

    async fn add_subkey(&self, key_id: &str, subkey: Record) -> KeyringResult<()> {
        if !self.key_exists(key_id).await? {
            return Err(KeyringError::validation(format!(
                "cannot add subkey to unknown key {key_id}"
            )));
        }
        self.add(&KEYS, subkey, Record::new()).await
    }

    async fn update_subkey(
        &self,
        key_id: &str,
        subkey_id: &str,
        fields: Record,
    ) -> KeyringResult<()> {
        debug!("keyring: updating subkey {subkey_id} of {key_id}");
        self.update(&KEYS, scope(&[("id", subkey_id)]), fields).await
    }

    async fn remove_subkey(&self, key_id: &str, subkey_id: &str) -> KeyringResult<()> {
        debug!("keyring: removing subkey {subkey_id} of {key_id}");
        self.ensure_key_removable(subkey_id).await?;
        self.remove(&KEYS, scope(&[("id", subkey_id)])).await
    }
}
