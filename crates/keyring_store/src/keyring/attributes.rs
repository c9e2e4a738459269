use async_trait::async_trait;

use pgp_keyring_core::{
    AttributeApi, Conditions, KeyringError, KeyringResult, Record, ResultSequence,
};

use super::{scope, scope_record, Keyring};
use crate::tables::{ATTRIBUTES, ATTRIBUTES_SELFSIGNED, ATTRIBUTE_SIGNATURES};

#[async_trait]
impl AttributeApi for Keyring {
    fn get_attribute_list(&self, key_id: &str, filter: Conditions) -> ResultSequence<String> {
        self.ids(&ATTRIBUTES, "id", filter.scoped(scope(&[("key", key_id)])))
    }

    fn get_attributes(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record> {
        self.entries(&ATTRIBUTES, filter.scoped(scope(&[("key", key_id)])), fields)
    }

    async fn attribute_exists(&self, key_id: &str, attribute_id: &str) -> KeyringResult<bool> {
        self.exists(&ATTRIBUTES, scope(&[("key", key_id), ("id", attribute_id)]))
            .await
    }

    async fn get_attribute(
        &self,
        key_id: &str,
        attribute_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>> {
        self.entry(
            &ATTRIBUTES,
            scope(&[("key", key_id), ("id", attribute_id)]),
            fields,
        )
        .await
    }

    fn get_self_signed_attributes(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record> {
        self.entries(
            &ATTRIBUTES_SELFSIGNED,
            filter.scoped(scope(&[("key", key_id)])),
            fields,
        )
    }

    async fn get_self_signed_attribute(
        &self,
        key_id: &str,
        attribute_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>> {
        self.entry(
            &ATTRIBUTES_SELFSIGNED,
            scope(&[("key", key_id), ("id", attribute_id)]),
            fields,
        )
        .await
    }

    async fn add_attribute(&self, key_id: &str, attribute: Record) -> KeyringResult<()> {
        self.add(&ATTRIBUTES, attribute, scope_record(&[("key", key_id)]))
            .await
    }

    async fn update_attribute(
        &self,
        key_id: &str,
        attribute_id: &str,
        fields: Record,
    ) -> KeyringResult<()> {
        self.update(
            &ATTRIBUTES,
            scope(&[("key", key_id), ("id", attribute_id)]),
            fields,
        )
        .await
    }

    async fn remove_attribute(&self, key_id: &str, attribute_id: &str) -> KeyringResult<()> {
        let signed = self
            .exists(
                &ATTRIBUTE_SIGNATURES,
                scope(&[("key", key_id), ("attribute", attribute_id)]),
            )
            .await?;
        if signed {
            return Err(KeyringError::dependency_exists(format!(
                "attribute {attribute_id} of key {key_id} still has signatures"
            )));
        }
        self.remove(&ATTRIBUTES, scope(&[("key", key_id), ("id", attribute_id)]))
            .await
    }
}
