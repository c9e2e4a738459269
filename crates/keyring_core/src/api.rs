use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Conditions, KeyringResult, Record, ResultSequence};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KeySignatureRef {
    pub key_id: String,
    pub signature_id: String,
}

/// A subkey binding or revocation issued by `key_id`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubkeySignatureRef {
    pub key_id: String,
    pub subkey_id: String,
    pub signature_id: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IdentitySignatureRef {
    pub key_id: String,
    pub identity_id: String,
    pub signature_id: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AttributeSignatureRef {
    pub key_id: String,
    pub attribute_id: String,
    pub signature_id: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubkeyMatch {
    pub id: String,
    pub expires: Option<i64>,
    pub revoked: Option<String>,
}

/// A key found by id or fingerprint. When the match was a subkey, `id` is
/// the parent and `subkey` describes the matched subkey.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KeyMatch {
    pub id: String,
    pub expires: Option<i64>,
    pub revoked: Option<String>,
    pub subkey: Option<SubkeyMatch>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub expires: Option<i64>,
    pub revoked: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IdentityMatch {
    pub key_id: String,
    pub key_expires: Option<i64>,
    pub key_revoked: Option<String>,
    pub identity: IdentitySummary,
}

/// `fields`, where accepted, restricts the returned record to those fields;
/// `None` returns stored columns plus decoded packet fields.
#[async_trait]
pub trait KeyApi {
    fn get_key_list(&self, filter: Conditions) -> ResultSequence<String>;
    fn get_keys(&self, filter: Conditions, fields: Option<&[&str]>) -> ResultSequence<Record>;
    async fn key_exists(&self, key_id: &str) -> KeyringResult<bool>;
    async fn get_key(&self, key_id: &str, fields: Option<&[&str]>) -> KeyringResult<Option<Record>>;
    async fn add_key(&self, key: Record) -> KeyringResult<()>;
    async fn update_key(&self, key_id: &str, fields: Record) -> KeyringResult<()>;
    async fn remove_key(&self, key_id: &str) -> KeyringResult<()>;
}

#[async_trait]
pub trait SubkeyApi {
    fn get_subkey_list(&self, key_id: &str, filter: Conditions) -> ResultSequence<String>;
    fn get_subkeys(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record>;
    async fn subkey_exists(&self, key_id: &str, subkey_id: &str) -> KeyringResult<bool>;
    async fn get_subkey(
        &self,
        key_id: &str,
        subkey_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>>;
    fn get_self_signed_subkeys(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record>;
    async fn get_self_signed_subkey(
        &self,
        key_id: &str,
        subkey_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>>;
    /// Ids of the keys a subkey is bound to.
    fn get_parent_key_list(&self, subkey_id: &str) -> ResultSequence<String>;
    async fn add_subkey(&self, key_id: &str, subkey: Record) -> KeyringResult<()>;
    async fn update_subkey(&self, key_id: &str, subkey_id: &str, fields: Record)
        -> KeyringResult<()>;
    async fn remove_subkey(&self, key_id: &str, subkey_id: &str) -> KeyringResult<()>;
}

#[async_trait]
pub trait IdentityApi {
    fn get_identity_list(&self, key_id: &str, filter: Conditions) -> ResultSequence<String>;
    fn get_identities(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record>;
    async fn identity_exists(&self, key_id: &str, identity_id: &str) -> KeyringResult<bool>;
    async fn get_identity(
        &self,
        key_id: &str,
        identity_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>>;
    fn get_self_signed_identities(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record>;
    async fn get_self_signed_identity(
        &self,
        key_id: &str,
        identity_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>>;
    async fn add_identity(&self, key_id: &str, identity: Record) -> KeyringResult<()>;
    async fn update_identity(
        &self,
        key_id: &str,
        identity_id: &str,
        fields: Record,
    ) -> KeyringResult<()>;
    async fn remove_identity(&self, key_id: &str, identity_id: &str) -> KeyringResult<()>;
}

#[async_trait]
pub trait AttributeApi {
    fn get_attribute_list(&self, key_id: &str, filter: Conditions) -> ResultSequence<String>;
    fn get_attributes(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record>;
    async fn attribute_exists(&self, key_id: &str, attribute_id: &str) -> KeyringResult<bool>;
    async fn get_attribute(
        &self,
        key_id: &str,
        attribute_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>>;
    fn get_self_signed_attributes(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record>;
    async fn get_self_signed_attribute(
        &self,
        key_id: &str,
        attribute_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>>;
    async fn add_attribute(&self, key_id: &str, attribute: Record) -> KeyringResult<()>;
    async fn update_attribute(
        &self,
        key_id: &str,
        attribute_id: &str,
        fields: Record,
    ) -> KeyringResult<()>;
    async fn remove_attribute(&self, key_id: &str, attribute_id: &str) -> KeyringResult<()>;
}

/// Signatures over a key itself (direct, revocation, primary binding).
#[async_trait]
pub trait KeySignatureApi {
    fn get_key_signature_list(&self, key_id: &str, filter: Conditions) -> ResultSequence<String>;
    fn get_key_signatures(
        &self,
        key_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record>;
    fn get_key_signature_list_by_issuer(
        &self,
        issuer: &str,
        filter: Conditions,
    ) -> ResultSequence<KeySignatureRef>;
    async fn key_signature_exists(&self, key_id: &str, signature_id: &str) -> KeyringResult<bool>;
    async fn get_key_signature(
        &self,
        key_id: &str,
        signature_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>>;
    async fn add_key_signature(&self, key_id: &str, signature: Record) -> KeyringResult<()>;
    async fn update_key_signature(
        &self,
        key_id: &str,
        signature_id: &str,
        fields: Record,
    ) -> KeyringResult<()>;
    async fn remove_key_signature(&self, key_id: &str, signature_id: &str) -> KeyringResult<()>;
}

/// Subkey binding and revocation signatures. They are stored against the
/// subkey and issued by the parent key.
#[async_trait]
pub trait SubkeySignatureApi {
    fn get_subkey_signature_list(
        &self,
        key_id: &str,
        subkey_id: &str,
        filter: Conditions,
    ) -> ResultSequence<String>;
    fn get_subkey_signatures(
        &self,
        key_id: &str,
        subkey_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record>;
    fn get_subkey_signature_list_by_issuer(
        &self,
        issuer: &str,
        filter: Conditions,
    ) -> ResultSequence<SubkeySignatureRef>;
    async fn subkey_signature_exists(
        &self,
        key_id: &str,
        subkey_id: &str,
        signature_id: &str,
    ) -> KeyringResult<bool>;
    async fn get_subkey_signature(
        &self,
        key_id: &str,
        subkey_id: &str,
        signature_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>>;
    async fn add_subkey_signature(
        &self,
        key_id: &str,
        subkey_id: &str,
        signature: Record,
    ) -> KeyringResult<()>;
    async fn update_subkey_signature(
        &self,
        key_id: &str,
        subkey_id: &str,
        signature_id: &str,
        fields: Record,
    ) -> KeyringResult<()>;
    async fn remove_subkey_signature(
        &self,
        key_id: &str,
        subkey_id: &str,
        signature_id: &str,
    ) -> KeyringResult<()>;
}

#[async_trait]
pub trait IdentitySignatureApi {
    fn get_identity_signature_list(
        &self,
        key_id: &str,
        identity_id: &str,
        filter: Conditions,
    ) -> ResultSequence<String>;
    fn get_identity_signatures(
        &self,
        key_id: &str,
        identity_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record>;
    fn get_identity_signature_list_by_issuer(
        &self,
        issuer: &str,
        filter: Conditions,
    ) -> ResultSequence<IdentitySignatureRef>;
    async fn identity_signature_exists(
        &self,
        key_id: &str,
        identity_id: &str,
        signature_id: &str,
    ) -> KeyringResult<bool>;
    async fn get_identity_signature(
        &self,
        key_id: &str,
        identity_id: &str,
        signature_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>>;
    async fn add_identity_signature(
        &self,
        key_id: &str,
        identity_id: &str,
        signature: Record,
    ) -> KeyringResult<()>;
    async fn update_identity_signature(
        &self,
        key_id: &str,
        identity_id: &str,
        signature_id: &str,
        fields: Record,
    ) -> KeyringResult<()>;
    async fn remove_identity_signature(
        &self,
        key_id: &str,
        identity_id: &str,
        signature_id: &str,
    ) -> KeyringResult<()>;
}

#[async_trait]
pub trait AttributeSignatureApi {
    fn get_attribute_signature_list(
        &self,
        key_id: &str,
        attribute_id: &str,
        filter: Conditions,
    ) -> ResultSequence<String>;
    fn get_attribute_signatures(
        &self,
        key_id: &str,
        attribute_id: &str,
        filter: Conditions,
        fields: Option<&[&str]>,
    ) -> ResultSequence<Record>;
    fn get_attribute_signature_list_by_issuer(
        &self,
        issuer: &str,
        filter: Conditions,
    ) -> ResultSequence<AttributeSignatureRef>;
    async fn attribute_signature_exists(
        &self,
        key_id: &str,
        attribute_id: &str,
        signature_id: &str,
    ) -> KeyringResult<bool>;
    async fn get_attribute_signature(
        &self,
        key_id: &str,
        attribute_id: &str,
        signature_id: &str,
        fields: Option<&[&str]>,
    ) -> KeyringResult<Option<Record>>;
    async fn add_attribute_signature(
        &self,
        key_id: &str,
        attribute_id: &str,
        signature: Record,
    ) -> KeyringResult<()>;
    async fn update_attribute_signature(
        &self,
        key_id: &str,
        attribute_id: &str,
        signature_id: &str,
        fields: Record,
    ) -> KeyringResult<()>;
    async fn remove_attribute_signature(
        &self,
        key_id: &str,
        attribute_id: &str,
        signature_id: &str,
    ) -> KeyringResult<()>;
}

#[async_trait]
pub trait SearchApi {
    /// Self-signed identities whose id contains `search`, case-insensitively.
    fn search_identities(&self, search: &str) -> ResultSequence<IdentityMatch>;
    fn search_by_short_key_id(&self, short_id: &str) -> ResultSequence<KeyMatch>;
    fn search_by_long_key_id(&self, key_id: &str) -> ResultSequence<KeyMatch>;
    fn search_by_fingerprint(&self, fingerprint: &str) -> ResultSequence<KeyMatch>;
}

/// Explicit end of the implicit transaction opened by the first write.
#[async_trait]
pub trait ChangesApi {
    async fn save_changes(&self) -> KeyringResult<()>;
    async fn revert_changes(&self) -> KeyringResult<()>;
}
