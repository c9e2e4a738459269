use async_trait::async_trait;
use futures::future::ready;

use pgp_keyring_core::{
    sigtype, AttributeSignatureApi, AttributeSignatureRef, Conditions, Filter,
    IdentitySignatureApi, IdentitySignatureRef, KeySignatureApi, KeySignatureRef, KeyringError,
    KeyringResult, Record, ResultSequence, SubkeySignatureApi, SubkeySignatureRef,
};

use super::{scope, scope_record, Keyring};
use crate::tables::{EntityTable, ATTRIBUTE_SIGNATURES, IDENTITY_SIGNATURES, KEY_SIGNATURES};

fn text(record: &Record, table: &EntityTable, field: &str) -> KeyringResult<String> {
    record.str(field).map(str::to_string).ok_or_else(|| {
        KeyringError::storage(format!("{}.{field} is missing or not text", table.name))
    })
}

fn key_sigtypes() -> Filter {
    Filter::any_of(sigtype::KEY_SIGTYPES)
}

fn subkey_sigtypes() -> Filter {
    Filter::any_of(sigtype::SUBKEY_SIGTYPES)
}

/// One direct-key signature or revocation stored on `key_id`.
fn key_signature(key_id: &str, signature_id: &str) -> Conditions {
    scope(&[("key", key_id), ("id", signature_id)]).restrict("sigtype", key_sigtypes())
}

/// One binding or binding revocation stored on `subkey_id`.
fn subkey_signature(key_id: &str, subkey_id: &str, signature_id: &str) -> Conditions {
    scope(&[("key", subkey_id), ("issuer", key_id), ("id", signature_id)])
        .restrict("sigtype", subkey_sigtypes())
}

impl Keyring {
    /// Signatures of `table` issued by `issuer`, mapped to references.
    fn signatures_by_issuer<T, F>(
        &self,
        table: &'static EntityTable,
        issuer: &str,
        filter: Conditions,
        fields: &'static [&'static str],
        to_ref: F,
    ) -> ResultSequence<T>
    where
        T: Send + 'static,
        F: Fn(&Record) -> KeyringResult<T> + Send + 'static,
    {
        self.entries(table, filter.scoped(scope(&[("issuer", issuer)])), Some(fields))
            .map(move |record| ready(to_ref(&record)))
    }
}

#[async_trait]
impl KeySignatureApi for Keyring {
    fn get_key_signature_list(&self, key_id: &str, filter: Conditions) -> ResultSequence<String> {
        let filter = filter
            .scoped(scope(&[("key", key_id)]))
            .restrict("sigtype", key_sigtypes());
        self.ids(&KEY_SIGNATURES, "id", filter)
    }

    fn get_key_signatures(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record> {
        let filter = filter
            .scoped(scope(&[("key", key_id)]))
            .restrict("sigtype", key_sigtypes());
        self.entries(&KEY_SIGNATURES, filter, fields)
    }

    fn get_key_signature_list_by_issuer(
        &self,
        issuer: &str,
        filter: Conditions,
    ) -> ResultSequence<KeySignatureRef> {
        let filter = filter.restrict("sigtype", key_sigtypes());
        self.signatures_by_issuer(&KEY_SIGNATURES, issuer, filter, &["key", "id"], |record| {
            Ok(KeySignatureRef {
                key_id: text(record, &KEY_SIGNATURES, "key")?,
                signature_id: text(record, &KEY_SIGNATURES, "id")?,
            })
        })
    }

    async fn key_signature_exists(&self, key_id: &str, signature_id: &str) -> KeyringResult<bool> {
        self.exists(&KEY_SIGNATURES, key_signature(key_id, signature_id))
            .await
    }

    async fn get_key_signature(
        &self,
        key_id: &str,
        signature_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>> {
        self.entry(&KEY_SIGNATURES, key_signature(key_id, signature_id), fields)
            .await
    }

    async fn add_key_signature(&self, key_id: &str, signature: Record) -> KeyringResult<()> {
        self.add(&KEY_SIGNATURES, signature, scope_record(&[("key", key_id)]))
            .await
    }

    async fn update_key_signature(
        &self,
        key_id: &str,
        signature_id: &str,
        fields: Record,
    ) -> KeyringResult<()> {
        self.update(&KEY_SIGNATURES, key_signature(key_id, signature_id), fields)
            .await
    }

    async fn remove_key_signature(&self, key_id: &str, signature_id: &str) -> KeyringResult<()> {
        self.remove(&KEY_SIGNATURES, key_signature(key_id, signature_id))
            .await
    }
}

#[async_trait]
impl SubkeySignatureApi for Keyring {
    fn get_subkey_signature_list(
        &self,
        key_id: &str,
        subkey_id: &str,
        filter: Conditions,
    ) -> ResultSequence<String> {
        let filter = filter
            .scoped(scope(&[("key", subkey_id), ("issuer", key_id)]))
            .restrict("sigtype", subkey_sigtypes());
        self.ids(&KEY_SIGNATURES, "id", filter)
    }

    fn get_subkey_signatures(
        &self,
        key_id: &str,
        subkey_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record> {
        let filter = filter
            .scoped(scope(&[("key", subkey_id), ("issuer", key_id)]))
            .restrict("sigtype", subkey_sigtypes());
        self.entries(&KEY_SIGNATURES, filter, fields)
    }

    fn get_subkey_signature_list_by_issuer(
        &self,
        issuer: &str,
        filter: Conditions,
    ) -> ResultSequence<SubkeySignatureRef> {
        let filter = filter.restrict("sigtype", subkey_sigtypes());
        self.signatures_by_issuer(
            &KEY_SIGNATURES,
            issuer,
            filter,
            &["key", "issuer", "id"],
            |record| {
                Ok(SubkeySignatureRef {
                    key_id: text(record, &KEY_SIGNATURES, "issuer")?,
                    subkey_id: text(record, &KEY_SIGNATURES, "key")?,
                    signature_id: text(record, &KEY_SIGNATURES, "id")?,
                })
            },
        )
    }

    async fn subkey_signature_exists(
        &self,
        key_id: &str,
        subkey_id: &str,
        signature_id: &str,
    ) -> KeyringResult<bool> {
        self.exists(
            &KEY_SIGNATURES,
            subkey_signature(key_id, subkey_id, signature_id),
        )
        .await
    }

    async fn get_subkey_signature(
        &self,
        key_id: &str,
        subkey_id: &str,
        signature_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>> {
        self.entry(
            &KEY_SIGNATURES,
            subkey_signature(key_id, subkey_id, signature_id),
            fields,
        )
        .await
    }

    async fn add_subkey_signature(
        &self,
        key_id: &str,
        subkey_id: &str,
        signature: Record,
    ) -> KeyringResult<()> {
        self.add(
            &KEY_SIGNATURES,
            signature,
            scope_record(&[("key", subkey_id), ("issuer", key_id)]),
        )
        .await
    }

    async fn update_subkey_signature(
        &self,
        key_id: &str,
        subkey_id: &str,
        signature_id: &str,
        fields: Record,
    ) -> KeyringResult<()> {
        self.update(
            &KEY_SIGNATURES,
            subkey_signature(key_id, subkey_id, signature_id),
            fields,
        )
        .await
    }

    async fn remove_subkey_signature(
        &self,
        key_id: &str,
        subkey_id: &str,
        signature_id: &str,
    ) -> KeyringResult<()> {
        self.remove(
            &KEY_SIGNATURES,
            subkey_signature(key_id, subkey_id, signature_id),
        )
        .await
    }
}

#[async_trait]
impl IdentitySignatureApi for Keyring {
    fn get_identity_signature_list(
        &self,
        key_id: &str,
        identity_id: &str,
        filter: Conditions,
    ) -> ResultSequence<String> {
        let filter = filter.scoped(scope(&[("key", key_id), ("identity", identity_id)]));
        self.ids(&IDENTITY_SIGNATURES, "id", filter)
    }

    fn get_identity_signatures(
        &self,
        key_id: &str,
        identity_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record> {
        let filter = filter.scoped(scope(&[("key", key_id), ("identity", identity_id)]));
        self.entries(&IDENTITY_SIGNATURES, filter, fields)
    }

    fn get_identity_signature_list_by_issuer(
        &self,
        issuer: &str,
        filter: Conditions,
    ) -> ResultSequence<IdentitySignatureRef> {
        self.signatures_by_issuer(
            &IDENTITY_SIGNATURES,
            issuer,
            filter,
            &["key", "identity", "id"],
            |record| {
                Ok(IdentitySignatureRef {
                    key_id: text(record, &IDENTITY_SIGNATURES, "key")?,
                    identity_id: text(record, &IDENTITY_SIGNATURES, "identity")?,
                    signature_id: text(record, &IDENTITY_SIGNATURES, "id")?,
                })
            },
        )
    }

    async fn identity_signature_exists(
        &self,
        key_id: &str,
        identity_id: &str,
        signature_id: &str,
    ) -> KeyringResult<bool> {
        self.exists(
            &IDENTITY_SIGNATURES,
            scope(&[("key", key_id), ("identity", identity_id), ("id", signature_id)]),
        )
        .await
    }

    async fn get_identity_signature(
        &self,
        key_id: &str,
        identity_id: &str,
        signature_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>> {
        self.entry(
            &IDENTITY_SIGNATURES,
            scope(&[("key", key_id), ("identity", identity_id), ("id", signature_id)]),
            fields,
        )
        .await
    }

    async fn add_identity_signature(
        &self,
        key_id: &str,
        identity_id: &str,
        signature: Record,
    ) -> KeyringResult<()> {
        self.add(
            &IDENTITY_SIGNATURES,
            signature,
            scope_record(&[("key", key_id), ("identity", identity_id)]),
        )
        .await
    }

    async fn update_identity_signature(
        &self,
        key_id: &str,
        identity_id: &str,
        signature_id: &str,
        fields: Record,
    ) -> KeyringResult<()> {
        self.update(
            &IDENTITY_SIGNATURES,
            scope(&[("key", key_id), ("identity", identity_id), ("id", signature_id)]),
            fields,
        )
        .await
    }

    async fn remove_identity_signature(
        &self,
        key_id: &str,
        identity_id: &str,
        signature_id: &str,
    ) -> KeyringResult<()> {
        self.remove(
            &IDENTITY_SIGNATURES,
            scope(&[("key", key_id), ("identity", identity_id), ("id", signature_id)]),
        )
        .await
    }
}

#[async_trait]
impl AttributeSignatureApi for Keyring {
    fn get_attribute_signature_list(
        &self,
        key_id: &str,
        attribute_id: &str,
        filter: Conditions,
    ) -> ResultSequence<String> {
        let filter = filter.scoped(scope(&[("key", key_id), ("attribute", attribute_id)]));
        self.ids(&ATTRIBUTE_SIGNATURES, "id", filter)
    }

    fn get_attribute_signatures(
        &self,
        key_id: &str,
        attribute_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record> {
        let filter = filter.scoped(scope(&[("key", key_id), ("attribute", attribute_id)]));
        self.entries(&ATTRIBUTE_SIGNATURES, filter, fields)
    }

    fn get_attribute_signature_list_by_issuer(
        &self,
        issuer: &str,
        filter: Conditions,
    ) -> ResultSequence<AttributeSignatureRef> {
        self.signatures_by_issuer(
            &ATTRIBUTE_SIGNATURES,
            issuer,
            filter,
            &["key", "attribute", "id"],
            |record| {
                Ok(AttributeSignatureRef {
                    key_id: text(record, &ATTRIBUTE_SIGNATURES, "key")?,
                    attribute_id: text(record, &ATTRIBUTE_SIGNATURES, "attribute")?,
                    signature_id: text(record, &ATTRIBUTE_SIGNATURES, "id")?,
                })
            },
        )
    }

    async fn attribute_signature_exists(
        &self,
        key_id: &str,
        attribute_id: &str,
        signature_id: &str,
    ) -> KeyringResult<bool> {
        self.exists(
            &ATTRIBUTE_SIGNATURES,
            scope(&[("key", key_id), ("attribute", attribute_id), ("id", signature_id)]),
        )
        .await
    }

    async fn get_attribute_signature(
        &self,
        key_id: &str,
        attribute_id: &str,
        signature_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>> {
        self.entry(
            &ATTRIBUTE_SIGNATURES,
            scope(&[("key", key_id), ("attribute", attribute_id), ("id", signature_id)]),
            fields,
        )
        .await
    }

    async fn add_attribute_signature(
        &self,
        key_id: &str,
        attribute_id: &str,
        signature: Record,
    ) -> KeyringResult<()> {
        self.add(
            &ATTRIBUTE_SIGNATURES,
            signature,
            scope_record(&[("key", key_id), ("attribute", attribute_id)]),
        )
        .await
    }

    async fn update_attribute_signature(
        &self,
        key_id: &str,
        attribute_id: &str,
        signature_id: &str,
        fields: Record,
    ) -> KeyringResult<()> {
        self.update(
            &ATTRIBUTE_SIGNATURES,
            scope(&[("key", key_id), ("attribute", attribute_id), ("id", signature_id)]),
            fields,
        )
        .await
    }

    async fn remove_attribute_signature(
        &self,
        key_id: &str,
        attribute_id: &str,
        signature_id: &str,
    ) -> KeyringResult<()> {
        self.remove(
            &ATTRIBUTE_SIGNATURES,
            scope(&[("key", key_id), ("attribute", attribute_id), ("id", signature_id)]),
        )
        .await
    }
}
