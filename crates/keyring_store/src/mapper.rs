//! Filtered reads and transactional writes over one [`EntityTable`].
//!
//! A read splits the caller's conditions into the part the database can
//! evaluate and the part that must run in process, fetches only the columns
//! it needs, reconstructs packet-derived fields when asked for them, applies
//! the in-process conditions and finally strips the record down to the
//! requested fields.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::ready;
use log::debug;

use pgp_keyring_core::{
    Conditions, Filter, KeyringError, KeyringResult, PacketCodec, Record, ResultSequence, Value,
};

use crate::driver::RowShape;
use crate::handle::ConnectionHandle;
use crate::query::{self, Projection};
use crate::tables::{EntityTable, Payload, BINARY_FIELD};

/// Conditions partitioned by where they are evaluated.
#[derive(Clone, Debug, Default)]
pub struct FilterPlan {
    pub sql: Conditions,
    pub app: Conditions,
}

pub fn split_conditions(
    handle: &ConnectionHandle,
    table: &EntityTable,
    conditions: &Conditions,
) -> FilterPlan {
    let (sql, app) = conditions.split(handle.dialect(), |field| table.has_column(field));
    FilterPlan { sql, app }
}

/// Columns to fetch and whether packet decoding is needed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchPlan {
    pub columns: Vec<String>,
    pub decode: bool,
}

pub fn fetch_plan(table: &EntityTable, fields: Option<&[&str]>, plan: &FilterPlan) -> FetchPlan {
    let mut wanted: HashSet<&str> = HashSet::new();
    let mut decode = false;
    match fields {
        Some(fields) => {
            for &field in fields {
                if table.has_column(field) {
                    wanted.insert(field);
                } else {
                    decode = true;
                }
            }
        }
        None => {
            for name in table.column_names() {
                wanted.insert(name);
            }
            decode = true;
        }
    }
    for field in plan.app.fields() {
        if table.has_column(field) {
            wanted.insert(field);
        } else {
            decode = true;
        }
    }
    match table.payload {
        Payload::Stored(column) | Payload::Derived(column) if decode => {
            wanted.insert(column);
        }
        Payload::Absent => decode = false,
        _ => {}
    }
    let columns = table
        .column_names()
        .filter(|name| wanted.contains(name))
        .map(str::to_string)
        .collect();
    FetchPlan { columns, decode }
}

async fn reconstruct(
    codec: &dyn PacketCodec,
    table: &EntityTable,
    mut record: Record,
) -> KeyringResult<Record> {
    let binary = match table.payload {
        Payload::Stored(column) => record.value(column).as_bytes().map(<[u8]>::to_vec),
        Payload::Derived(column) => {
            let derived = record.str(column).map(|text| text.as_bytes().to_vec());
            record.insert(BINARY_FIELD, Value::from(derived.clone()));
            derived
        }
        Payload::Absent => None,
    };
    let Some(binary) = binary else {
        return Ok(record);
    };
    let decoded = codec.packet_info(table.kind, &binary).await?;
    Ok(record.overlay(decoded))
}

/// Records of `table` matching `conditions`, restricted to `fields` when given.
pub fn get_entries(
    handle: &ConnectionHandle,
    codec: &Arc<dyn PacketCodec>,
    table: &'static EntityTable,
    conditions: &Conditions,
    fields: Option<&[&str]>,
) -> ResultSequence<Record> {
    entries(handle, codec, table, conditions, fields, false)
}

fn entries(
    handle: &ConnectionHandle,
    codec: &Arc<dyn PacketCodec>,
    table: &'static EntityTable,
    conditions: &Conditions,
    fields: Option<&[&str]>,
    single: bool,
) -> ResultSequence<Record> {
    let plan = split_conditions(handle, table, conditions);
    let fetch = fetch_plan(table, fields, &plan);
    // LIMIT is only safe when no row can still be rejected in process.
    let suffix = (single && plan.app.is_empty()).then_some("LIMIT 1");
    let projection = Projection::Columns(fetch.columns.clone());
    let select = match query::select(handle.dialect(), table, &projection, &plan.sql, suffix) {
        Ok(select) => select,
        Err(err) => return ResultSequence::failed(err),
    };
    if !plan.app.is_empty() {
        debug!(
            "keyring: {} filters {:?} evaluated in process",
            table.name,
            plan.app.fields().collect::<Vec<_>>()
        );
    }

    let mut rows = handle.stream(select, RowShape::for_table(table, &fetch.columns));
    if fetch.decode {
        let codec = Arc::clone(codec);
        rows = rows.map(move |record| {
            let codec = Arc::clone(&codec);
            async move { reconstruct(codec.as_ref(), table, record).await }
        });
    }
    if !plan.app.is_empty() {
        let app = plan.app;
        rows = rows.filter(move |record| app.matches(record));
    }
    if let Some(fields) = fields {
        let keep: Vec<String> = fields.iter().map(|field| field.to_string()).collect();
        rows = rows.map(move |mut record| {
            record.project(&keep);
            ready(Ok(record))
        });
    }
    rows
}

/// Values of `id_field` for every matching record.
pub fn get_list(
    handle: &ConnectionHandle,
    codec: &Arc<dyn PacketCodec>,
    table: &'static EntityTable,
    id_field: &'static str,
    conditions: &Conditions,
) -> ResultSequence<Value> {
    get_entries(handle, codec, table, conditions, Some(&[id_field]))
        .map(move |record| ready(Ok(record.value(id_field).clone())))
}

pub async fn get_entry(
    handle: &ConnectionHandle,
    codec: &Arc<dyn PacketCodec>,
    table: &'static EntityTable,
    conditions: &Conditions,
    fields: Option<&[&str]>,
) -> KeyringResult<Option<Record>> {
    entries(handle, codec, table, conditions, fields, true)
        .first()
        .await
}

pub async fn exists(
    handle: &ConnectionHandle,
    codec: &Arc<dyn PacketCodec>,
    table: &'static EntityTable,
    conditions: &Conditions,
) -> KeyringResult<bool> {
    entries(handle, codec, table, conditions, Some(&[]), true)
        .exists()
        .await
}

fn ensure_writable(table: &EntityTable) -> KeyringResult<()> {
    if table.is_writable() {
        Ok(())
    } else {
        Err(KeyringError::validation(format!(
            "{} is a view and cannot be written",
            table.name
        )))
    }
}

/// Exact-match conditions on the primary key of every matching record.
fn primary_keys(
    handle: &ConnectionHandle,
    codec: &Arc<dyn PacketCodec>,
    table: &'static EntityTable,
    conditions: &Conditions,
) -> ResultSequence<Conditions> {
    get_entries(handle, codec, table, conditions, Some(table.primary_key)).map(move |row| {
        let target: Conditions = table
            .primary_key
            .iter()
            .map(|column| (*column, Filter::Equals(row.value(column).clone())))
            .collect();
        ready(Ok(target))
    })
}

/// Inserts `fields` into `table` inside the implicit transaction.
pub async fn add_entry(
    handle: &ConnectionHandle,
    table: &'static EntityTable,
    fields: &Record,
) -> KeyringResult<()> {
    ensure_writable(table)?;
    let insert = query::insert(handle.dialect(), table, fields)?;
    handle.begin().await?;
    handle.execute(insert).await?;
    Ok(())
}

/// Updates matching rows. Conditions that only the process can evaluate are
/// resolved to primary keys, one statement per matching row. Returns the
/// number of rows changed.
pub async fn update_entries(
    handle: &ConnectionHandle,
    codec: &Arc<dyn PacketCodec>,
    table: &'static EntityTable,
    fields: &Record,
    conditions: &Conditions,
) -> KeyringResult<u64> {
    ensure_writable(table)?;
    let fields = table.storable(fields);
    if fields.is_empty() {
        return Ok(0);
    }
    let plan = split_conditions(handle, table, conditions);
    handle.begin().await?;
    if plan.app.is_empty() {
        let update = query::update(handle.dialect(), table, &fields, &plan.sql)?;
        return handle.execute(update).await;
    }
    let mut targets = primary_keys(handle, codec, table, conditions);
    let mut changed = 0;
    while let Some(target) = targets.next().await? {
        let update = query::update(handle.dialect(), table, &fields, &target)?;
        changed += handle.execute(update).await?;
    }
    Ok(changed)
}

/// Deletes matching rows, resolving in-process conditions as for updates.
pub async fn remove_entries(
    handle: &ConnectionHandle,
    codec: &Arc<dyn PacketCodec>,
    table: &'static EntityTable,
    conditions: &Conditions,
) -> KeyringResult<u64> {
    ensure_writable(table)?;
    let plan = split_conditions(handle, table, conditions);
    handle.begin().await?;
    if plan.app.is_empty() {
        let delete = query::delete(handle.dialect(), table, &plan.sql)?;
        return handle.execute(delete).await;
    }
    let mut targets = primary_keys(handle, codec, table, conditions);
    let mut removed = 0;
    while let Some(target) = targets.next().await? {
        let delete = query::delete(handle.dialect(), table, &target)?;
        removed += handle.execute(delete).await?;
    }
    Ok(removed)
}
