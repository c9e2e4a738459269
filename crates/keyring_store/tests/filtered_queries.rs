mod common;

use std::sync::Arc;

use pgp_keyring_store::mapper;
use pgp_keyring_store::schema::{bootstrap, parse_structure};
use pgp_keyring_store::tables::{Column, EntityTable, Payload, RelationKind};
use pgp_keyring_store::{
    ColumnType, Conditions, ConnectionHandle, EntityKind, Filter, KeyringResult, PacketCodec,
    Predicate, Record, Value,
};
use tempfile::tempdir;

use common::{open_handle, StubCodec};

static ITEMS: EntityTable = EntityTable {
    name: "items",
    relation: RelationKind::Table,
    kind: EntityKind::Key,
    columns: &[
        Column::new("id", ColumnType::I64),
        Column::new("value", ColumnType::I64),
        Column::new("label", ColumnType::Text),
    ],
    primary_key: &["id"],
    payload: Payload::Absent,
};

#[derive(Debug)]
struct Odd;

impl Predicate for Odd {
    fn evaluate(&self, value: &Value) -> Option<bool> {
        value.as_i64().map(|number| number % 2 != 0)
    }
}

async fn seeded(handle: &ConnectionHandle) -> KeyringResult<()> {
    let objects = parse_structure(
        "CREATE TABLE \"items\" (\"id\" BIGINT NOT NULL PRIMARY KEY, \"value\" BIGINT, \"label\" TEXT);",
    )?;
    let report = bootstrap(handle, &objects).await?;
    assert_eq!(report.created, vec!["items".to_string()]);
    let rows = [
        (1_i64, Some(3_i64), "xabY"),
        (2, Some(7), "xyz"),
        (3, Some(9), "50% off"),
        (4, None, "ABBA"),
    ];
    for (id, value, label) in rows {
        let record = Record::new()
            .with("id", id)
            .with("value", value)
            .with("label", label);
        mapper::add_entry(handle, &ITEMS, &record).await?;
    }
    Ok(())
}

fn codec() -> Arc<dyn PacketCodec> {
    Arc::new(StubCodec)
}

/// Matching ids in the order the rows were produced.
async fn ids(handle: &ConnectionHandle, conditions: Conditions) -> KeyringResult<Vec<i64>> {
    Ok(mapper::get_list(handle, &codec(), &ITEMS, "id", &conditions)
        .collect()
        .await?
        .into_iter()
        .filter_map(|value| value.as_i64())
        .collect())
}

#[tokio::test]
async fn greater_than_filter_runs_in_sql() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let handle = open_handle(dir.path()).await;
    seeded(&handle).await?;

    let found = ids(
        &handle,
        Conditions::new().with("value", Filter::GreaterThan(Value::I64(5))),
    )
    .await?;
    // Rows arrive in insertion order.
    assert_eq!(found, vec![2, 3]);
    Ok(())
}

#[tokio::test]
async fn contains_ignore_case_escapes_patterns() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let handle = open_handle(dir.path()).await;
    seeded(&handle).await?;

    let found = ids(
        &handle,
        Conditions::new().with("label", Filter::ContainsIgnoreCase("AB".into())),
    )
    .await?;
    assert_eq!(found, vec![1, 4]);

    let found = ids(
        &handle,
        Conditions::new().with("label", Filter::ContainsIgnoreCase("0%".into())),
    )
    .await?;
    assert_eq!(found, vec![3]);
    Ok(())
}

#[tokio::test]
async fn split_filters_match_in_process_evaluation() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let handle = open_handle(dir.path()).await;
    seeded(&handle).await?;

    let everything = mapper::get_entries(&handle, &codec(), &ITEMS, &Conditions::new(), None)
        .collect()
        .await?;
    assert_eq!(everything.len(), 4);

    let cases = vec![
        Conditions::new().with("value", Filter::custom(Odd)),
        Conditions::new().with("value", Filter::negate(Filter::GreaterThan(Value::I64(5)))),
        Conditions::new().with(
            "value",
            Filter::Or(vec![Filter::is_null(), Filter::LessThan(Value::I64(4))]),
        ),
        Conditions::new()
            .with("value", Filter::And(vec![Filter::custom(Odd), Filter::GreaterThan(Value::I64(3))]))
            .with("label", Filter::negate(Filter::EqualsIgnoreCase("XYZ".into()))),
        Conditions::new().with("id", Filter::any_of([1_i64, 4])),
    ];
    for conditions in cases {
        let expected: Vec<i64> = everything
            .iter()
            .filter(|record| conditions.matches(record))
            .filter_map(|record| record.i64("id"))
            .collect();
        assert_eq!(ids(&handle, conditions.clone()).await?, expected, "{conditions:?}");
    }
    Ok(())
}

#[tokio::test]
async fn projection_and_single_entry() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let handle = open_handle(dir.path()).await;
    seeded(&handle).await?;

    let entry = mapper::get_entry(
        &handle,
        &codec(),
        &ITEMS,
        &Conditions::new().with("id", 3_i64),
        Some(&["label"]),
    )
    .await?
    .expect("entry");
    assert_eq!(entry, Record::new().with("label", "50% off"));

    assert!(mapper::exists(&handle, &codec(), &ITEMS, &Conditions::new().with("id", 4_i64)).await?);
    assert!(!mapper::exists(&handle, &codec(), &ITEMS, &Conditions::new().with("id", 5_i64)).await?);
    Ok(())
}

#[tokio::test]
async fn writes_resolve_in_process_filters_to_primary_keys() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let handle = open_handle(dir.path()).await;
    seeded(&handle).await?;

    let odd = Conditions::new().with("value", Filter::custom(Odd));
    let changed = mapper::update_entries(
        &handle,
        &codec(),
        &ITEMS,
        &Record::new().with("label", "odd").with("ignored", 1_i64),
        &odd,
    )
    .await?;
    assert_eq!(changed, 3);
    let relabelled = ids(&handle, Conditions::new().with("label", "odd")).await?;
    assert_eq!(relabelled, vec![1, 2, 3]);

    let removed = mapper::remove_entries(
        &handle,
        &codec(),
        &ITEMS,
        &Conditions::new().with("value", Filter::GreaterThanOrEqual(Value::I64(7))),
    )
    .await?;
    assert_eq!(removed, 2);
    assert_eq!(ids(&handle, Conditions::new()).await?, vec![1, 4]);
    Ok(())
}
