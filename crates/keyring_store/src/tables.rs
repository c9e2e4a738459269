//! Descriptors for the relations the keyring reads and writes.

use pgp_keyring_core::{ColumnType, EntityKind, Record};

use ColumnType::{Bool, Bytes, Text, I64};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelationKind {
    Table,
    View,
}

/// Where the raw packet bytes of a row come from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Payload {
    /// Stored in the named column.
    Stored(&'static str),
    /// Not stored; the named text column is the packet body. Exposed as `binary`.
    Derived(&'static str),
    /// Rows carry no packet.
    Absent,
}

/// Field that holds the packet bytes in returned records.
pub const BINARY_FIELD: &str = "binary";

#[derive(Debug)]
pub struct EntityTable {
    pub name: &'static str,
    pub relation: RelationKind,
    pub kind: EntityKind,
    pub columns: &'static [Column],
    pub primary_key: &'static [&'static str],
    pub payload: Payload,
}

impl EntityTable {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|column| column.name)
    }

    pub fn is_writable(&self) -> bool {
        self.relation == RelationKind::Table
    }

    /// Fields of `record` that are columns of this table.
    pub fn storable(&self, record: &Record) -> Record {
        record
            .iter()
            .filter(|(field, _)| self.has_column(field))
            .map(|(field, value)| (field.to_string(), value.clone()))
            .collect()
    }
}

pub static KEYS: EntityTable = EntityTable {
    name: "keys",
    relation: RelationKind::Table,
    kind: EntityKind::Key,
    columns: &[
        Column::new("id", Text),
        Column::new("fingerprint", Text),
        Column::new("binary", Bytes),
        Column::new("date", I64),
        Column::new("expires", I64),
        Column::new("revoked", Text),
        Column::new("security", I64),
    ],
    primary_key: &["id"],
    payload: Payload::Stored("binary"),
};

/// Keys bound to a parent by a subkey binding signature.
pub static SUBKEYS: EntityTable = EntityTable {
    name: "keys_subkeys",
    relation: RelationKind::View,
    kind: EntityKind::Subkey,
    columns: &[
        Column::new("parentkey", Text),
        Column::new("id", Text),
        Column::new("fingerprint", Text),
        Column::new("binary", Bytes),
        Column::new("security", I64),
        Column::new("date", I64),
        Column::new("expires", I64),
        Column::new("revoked", Text),
    ],
    primary_key: &["parentkey", "id"],
    payload: Payload::Stored("binary"),
};

pub static IDENTITIES: EntityTable = EntityTable {
    name: "keys_identities",
    relation: RelationKind::Table,
    kind: EntityKind::Identity,
    columns: &[
        Column::new("key", Text),
        Column::new("id", Text),
        Column::new("name", Text),
        Column::new("email", Text),
    ],
    primary_key: &["key", "id"],
    payload: Payload::Derived("id"),
};

pub static IDENTITIES_SELFSIGNED: EntityTable = EntityTable {
    name: "keys_identities_selfsigned",
    relation: RelationKind::View,
    kind: EntityKind::Identity,
    columns: &[
        Column::new("key", Text),
        Column::new("id", Text),
        Column::new("name", Text),
        Column::new("email", Text),
        Column::new("expires", I64),
        Column::new("revoked", Text),
    ],
    primary_key: &["key", "id"],
    payload: Payload::Derived("id"),
};

pub static ATTRIBUTES: EntityTable = EntityTable {
    name: "keys_attributes",
    relation: RelationKind::Table,
    kind: EntityKind::Attribute,
    columns: &[
        Column::new("key", Text),
        Column::new("id", Text),
        Column::new("binary", Bytes),
    ],
    primary_key: &["key", "id"],
    payload: Payload::Stored("binary"),
};

pub static ATTRIBUTES_SELFSIGNED: EntityTable = EntityTable {
    name: "keys_attributes_selfsigned",
    relation: RelationKind::View,
    kind: EntityKind::Attribute,
    columns: &[
        Column::new("key", Text),
        Column::new("id", Text),
        Column::new("binary", Bytes),
        Column::new("expires", I64),
        Column::new("revoked", Text),
    ],
    primary_key: &["key", "id"],
    payload: Payload::Stored("binary"),
};

const SIGNATURE_TAIL: [Column; 8] = [
    Column::new("id", Text),
    Column::new("issuer", Text),
    Column::new("date", I64),
    Column::new("binary", Bytes),
    Column::new("verified", Bool),
    Column::new("sigtype", I64),
    Column::new("expires", I64),
    Column::new("revoked", Text),
];

pub static KEY_SIGNATURES: EntityTable = EntityTable {
    name: "keys_signatures",
    relation: RelationKind::Table,
    kind: EntityKind::Signature,
    columns: &[
        Column::new("key", Text),
        SIGNATURE_TAIL[0],
        SIGNATURE_TAIL[1],
        SIGNATURE_TAIL[2],
        SIGNATURE_TAIL[3],
        SIGNATURE_TAIL[4],
        SIGNATURE_TAIL[5],
        SIGNATURE_TAIL[6],
        SIGNATURE_TAIL[7],
        Column::new("security", I64),
    ],
    primary_key: &["key", "id"],
    payload: Payload::Stored("binary"),
};

pub static IDENTITY_SIGNATURES: EntityTable = EntityTable {
    name: "keys_identities_signatures",
    relation: RelationKind::Table,
    kind: EntityKind::Signature,
    columns: &[
        Column::new("key", Text),
        Column::new("identity", Text),
        SIGNATURE_TAIL[0],
        SIGNATURE_TAIL[1],
        SIGNATURE_TAIL[2],
        SIGNATURE_TAIL[3],
        SIGNATURE_TAIL[4],
        SIGNATURE_TAIL[5],
        SIGNATURE_TAIL[6],
        SIGNATURE_TAIL[7],
        Column::new("security", I64),
    ],
    primary_key: &["key", "identity", "id"],
    payload: Payload::Stored("binary"),
};

pub static ATTRIBUTE_SIGNATURES: EntityTable = EntityTable {
    name: "keys_attributes_signatures",
    relation: RelationKind::Table,
    kind: EntityKind::Signature,
    columns: &[
        Column::new("key", Text),
        Column::new("attribute", Text),
        SIGNATURE_TAIL[0],
        SIGNATURE_TAIL[1],
        SIGNATURE_TAIL[2],
        SIGNATURE_TAIL[3],
        SIGNATURE_TAIL[4],
        SIGNATURE_TAIL[5],
        SIGNATURE_TAIL[6],
        SIGNATURE_TAIL[7],
        Column::new("security", I64),
    ],
    primary_key: &["key", "attribute", "id"],
    payload: Payload::Stored("binary"),
};

pub static ALL: [&EntityTable; 9] = [
    &KEYS,
    &SUBKEYS,
    &IDENTITIES,
    &IDENTITIES_SELFSIGNED,
    &ATTRIBUTES,
    &ATTRIBUTES_SELFSIGNED,
    &KEY_SIGNATURES,
    &IDENTITY_SIGNATURES,
    &ATTRIBUTE_SIGNATURES,
];
