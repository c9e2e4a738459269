use async_trait::async_trait;
use futures::future::ready;

use pgp_keyring_core::{
    escape_like, Arguments, ColumnType, Conditions, Filter, IdentityMatch, IdentitySummary,
    KeyApi, KeyMatch, KeyringError, KeyringResult, Record, ResultSequence, SearchApi, SubkeyMatch,
    Value,
};

use super::{scope, Keyring};
use crate::driver::RowShape;
use crate::query::BoundQuery;
use crate::tables::SUBKEYS;

const SUMMARY_FIELDS: &[&str] = &["id", "expires", "revoked"];

fn identity_match(row: Record) -> KeyringResult<IdentityMatch> {
    let key_id = row
        .str("keyId")
        .ok_or_else(|| KeyringError::storage("identity search row without key id"))?
        .to_string();
    let id = row
        .str("id")
        .ok_or_else(|| KeyringError::storage("identity search row without identity id"))?
        .to_string();
    Ok(IdentityMatch {
        key_id,
        key_expires: row.i64("keyExpires"),
        key_revoked: row.str("keyRevoked").map(str::to_string),
        identity: IdentitySummary {
            id,
            name: row.str("name").map(str::to_string),
            email: row.str("email").map(str::to_string),
            expires: row.i64("expires"),
            revoked: row.str("revoked").map(str::to_string),
        },
    })
}

fn key_match(row: &Record) -> KeyringResult<KeyMatch> {
    let id = row
        .str("id")
        .ok_or_else(|| KeyringError::storage("key row without id"))?
        .to_string();
    Ok(KeyMatch {
        id,
        expires: row.i64("expires"),
        revoked: row.str("revoked").map(str::to_string),
        subkey: None,
    })
}

impl Keyring {
    fn search_keys(&self, filter: Conditions) -> ResultSequence<KeyMatch> {
        let keyring = self.clone();
        self.get_keys(filter, Some(SUMMARY_FIELDS)).flat_map(move |row| {
            let keyring = keyring.clone();
            async move { keyring.expand_key_match(row).await }
        })
    }

    /// A matched key is reported as itself when anything refers to it, and
    /// once per parent it is bound to as a subkey.
    async fn expand_key_match(&self, row: Record) -> KeyringResult<Vec<KeyMatch>> {
        let found = key_match(&row)?;
        let mut matches = Vec::new();
        if self.key_dependents(&found.id).await?.is_some() {
            matches.push(found.clone());
        }
        let mut bindings = self.entries(
            &SUBKEYS,
            scope(&[("id", found.id.as_str())]),
            Some(&["parentkey", "expires", "revoked"]),
        );
        while let Some(binding) = bindings.next().await? {
            let Some(parent_id) = binding.str("parentkey") else {
                continue;
            };
            let Some(parent) = self.get_key(parent_id, Some(SUMMARY_FIELDS)).await? else {
                continue;
            };
            let mut parent = key_match(&parent)?;
            parent.subkey = Some(SubkeyMatch {
                id: found.id.clone(),
                expires: binding.i64("expires"),
                revoked: binding.str("revoked").map(str::to_string),
            });
            matches.push(parent);
        }
        Ok(matches)
    }
}

#[async_trait]
impl SearchApi for Keyring {
    fn search_identities(&self, search: &str) -> ResultSequence<IdentityMatch> {
        let dialect = self.handle.dialect();
        let mut args = Arguments::new(dialect);
        let pattern = args.push(Value::Str(format!("%{}%", escape_like(search))));
        let condition = dialect.contains_ignore_case("\"found\".\"id\"", &pattern);
        let sql = format!(
            "SELECT \"keys\".\"id\" AS \"keyId\", \"keys\".\"expires\" AS \"keyExpires\", \
             \"keys\".\"revoked\" AS \"keyRevoked\", \"found\".\"id\" AS \"id\", \
             \"found\".\"name\" AS \"name\", \"found\".\"email\" AS \"email\", \
             \"found\".\"expires\" AS \"expires\", \"found\".\"revoked\" AS \"revoked\" \
             FROM \"keys_identities_selfsigned\" AS \"found\" \
             INNER JOIN \"keys\" ON \"found\".\"key\" = \"keys\".\"id\" \
             WHERE {condition}"
        );
        let shape = RowShape::new()
            .column("keyId", ColumnType::Text)
            .column("keyExpires", ColumnType::I64)
            .column("keyRevoked", ColumnType::Text)
            .column("id", ColumnType::Text)
            .column("name", ColumnType::Text)
            .column("email", ColumnType::Text)
            .column("expires", ColumnType::I64)
            .column("revoked", ColumnType::Text);
        self.handle
            .stream(BoundQuery::new(sql, args.into_values()), shape)
            .map(|row| ready(identity_match(row)))
    }

    fn search_by_short_key_id(&self, short_id: &str) -> ResultSequence<KeyMatch> {
        self.search_keys(Conditions::new().with("id", Filter::ShortId(short_id.to_string())))
    }

    fn search_by_long_key_id(&self, key_id: &str) -> ResultSequence<KeyMatch> {
        self.search_keys(Conditions::new().with("id", Filter::equals(key_id.to_uppercase())))
    }

    fn search_by_fingerprint(&self, fingerprint: &str) -> ResultSequence<KeyMatch> {
        self.search_keys(
            Conditions::new().with("fingerprint", Filter::equals(fingerprint.to_uppercase())),
        )
    }
}
