mod common;

use std::sync::Arc;

use pgp_keyring_store::schema::{bootstrap, existing_relations, initialise, parse_structure};
use pgp_keyring_store::{Keyring, KeyringError, KeyringResult};
use tempfile::tempdir;

use common::{open_handle, sqlite_config, StubCodec};

#[tokio::test]
async fn second_bootstrap_creates_nothing() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let handle = open_handle(dir.path()).await;

    let first = initialise(&handle).await?;
    assert!(first.is_complete());
    assert_eq!(first.created.len(), 13);
    assert!(first.skipped.is_empty());

    let existing = existing_relations(&handle).await?;
    for name in ["keys", "keys_subkeys", "keys_signatures_issuer_idx"] {
        assert!(existing.contains(name), "{name} missing");
    }

    let second = initialise(&handle).await?;
    assert!(second.created.is_empty());
    assert_eq!(second.skipped, first.created);
    Ok(())
}

#[tokio::test]
async fn failed_objects_do_not_stop_the_rest() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let handle = open_handle(dir.path()).await;
    let objects = parse_structure(
        "CREATE TABLE \"first\" (\"id\" TEXT NOT NULL PRIMARY KEY);\n\
         -- references a relation that does not exist\n\
         CREATE INDEX \"broken\" ON \"missing_table\" (\"id\");\n\
         CREATE TABLE \"second\" (\"id\" TEXT NOT NULL PRIMARY KEY);",
    )?;

    let report = bootstrap(&handle, &objects).await?;
    assert_eq!(report.created, vec!["first".to_string(), "second".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "broken");
    assert!(matches!(report.failed[0].1, KeyringError::Driver { .. }));
    assert!(!report.is_complete());
    Ok(())
}

#[tokio::test]
async fn connect_initialises_when_configured() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let keyring =
        Keyring::connect(&sqlite_config(dir.path()), dir.path(), Arc::new(StubCodec)).await?;

    let report = keyring.initialise().await?;
    assert!(report.created.is_empty());
    assert!(report.is_complete());

    let mut manual = sqlite_config(dir.path());
    manual.initialise = Some(false);
    let reopened = Keyring::connect(&manual, dir.path(), Arc::new(StubCodec)).await?;
    assert_eq!(reopened.initialise().await?.skipped.len(), 13);
    Ok(())
}

#[test]
fn malformed_statements_are_rejected() {
    for sql in [
        "CREATE TABLE \"\" (\"id\" TEXT);",
        "CREATE TABLE keys (\"id\" TEXT);",
        "CREATE SEQUENCE \"keys_seq\";",
    ] {
        let parsed = parse_structure(sql);
        assert!(
            matches!(parsed, Err(KeyringError::Schema { .. })),
            "{sql} should be rejected"
        );
    }
}

#[tokio::test]
async fn lowercase_structure_is_applied() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let handle = open_handle(dir.path()).await;
    let objects = parse_structure(
        "create table \"notes\" (\"id\" TEXT NOT NULL PRIMARY KEY, \"body\" BYTEA);\n\
         create index \"notes_body_idx\" ON \"notes\" (\"body\");",
    )?;

    let report = bootstrap(&handle, &objects).await?;
    assert!(report.is_complete());
    assert_eq!(
        report.created,
        vec!["notes".to_string(), "notes_body_idx".to_string()]
    );
    let existing = existing_relations(&handle).await?;
    assert!(existing.contains("notes_body_idx"));
    Ok(())
}
