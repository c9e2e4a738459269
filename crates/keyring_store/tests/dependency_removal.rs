mod common;

use pgp_keyring_store::{
    sigtype, AttributeApi, AttributeSignatureApi, IdentityApi, IdentitySignatureApi, KeyApi,
    KeySignatureApi, KeyringError, KeyringResult, Record, SubkeyApi, SubkeySignatureApi,
};
use tempfile::tempdir;

use common::{binding, identity, key, open_keyring, signature, OTHER, PRIMARY, SUBKEY, UID};

#[tokio::test]
async fn key_without_dependents_is_removed() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let keyring = open_keyring(dir.path()).await;
    keyring.add_key(key(PRIMARY, "FP-PRIMARY")).await?;

    keyring.remove_key(PRIMARY).await?;
    assert!(!keyring.key_exists(PRIMARY).await?);
    Ok(())
}

#[tokio::test]
async fn key_with_identity_is_kept() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let keyring = open_keyring(dir.path()).await;
    keyring.add_key(key(PRIMARY, "FP-PRIMARY")).await?;
    keyring
        .add_identity(PRIMARY, identity(UID, "Alice Example", "alice@example.org"))
        .await?;

    let removed = keyring.remove_key(PRIMARY).await;
    assert!(matches!(removed, Err(KeyringError::DependencyExists { .. })));
    assert!(keyring.key_exists(PRIMARY).await?);

    keyring.remove_identity(PRIMARY, UID).await?;
    keyring.remove_key(PRIMARY).await?;
    assert!(!keyring.key_exists(PRIMARY).await?);
    Ok(())
}

#[tokio::test]
async fn signed_identities_and_attributes_are_kept() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let keyring = open_keyring(dir.path()).await;
    keyring.add_key(key(PRIMARY, "FP-PRIMARY")).await?;
    keyring
        .add_identity(PRIMARY, identity(UID, "Alice Example", "alice@example.org"))
        .await?;
    keyring
        .add_identity_signature(PRIMARY, UID, signature("S1", PRIMARY, 0x13))
        .await?;
    keyring
        .add_attribute(
            PRIMARY,
            Record::new().with("id", "photo").with("binary", b"jpeg".to_vec()),
        )
        .await?;
    keyring
        .add_attribute_signature(PRIMARY, "photo", signature("A1", PRIMARY, 0x13))
        .await?;

    let identity = keyring.remove_identity(PRIMARY, UID).await;
    assert!(matches!(identity, Err(KeyringError::DependencyExists { .. })));
    let attribute = keyring.remove_attribute(PRIMARY, "photo").await;
    assert!(matches!(attribute, Err(KeyringError::DependencyExists { .. })));

    keyring.remove_identity_signature(PRIMARY, UID, "S1").await?;
    keyring.remove_identity(PRIMARY, UID).await?;
    keyring.remove_attribute_signature(PRIMARY, "photo", "A1").await?;
    keyring.remove_attribute(PRIMARY, "photo").await?;
    assert!(!keyring.identity_exists(PRIMARY, UID).await?);
    assert!(!keyring.attribute_exists(PRIMARY, "photo").await?);
    Ok(())
}

#[tokio::test]
async fn subkey_removal_follows_its_binding() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let keyring = open_keyring(dir.path()).await;
    keyring.add_key(key(PRIMARY, "FP-PRIMARY")).await?;
    keyring.add_subkey(PRIMARY, key(SUBKEY, "FP-SUBKEY")).await?;
    keyring
        .add_subkey_signature(PRIMARY, SUBKEY, binding("B1", PRIMARY))
        .await?;

    let parent = keyring.remove_key(PRIMARY).await;
    assert!(matches!(parent, Err(KeyringError::DependencyExists { .. })));
    let subkey = keyring.remove_subkey(PRIMARY, SUBKEY).await;
    assert!(matches!(subkey, Err(KeyringError::DependencyExists { .. })));

    keyring.remove_subkey_signature(PRIMARY, SUBKEY, "B1").await?;
    assert!(!keyring.subkey_exists(PRIMARY, SUBKEY).await?);
    keyring.remove_subkey(PRIMARY, SUBKEY).await?;
    keyring.remove_key(PRIMARY).await?;
    assert!(!keyring.key_exists(SUBKEY).await?);
    assert!(!keyring.key_exists(PRIMARY).await?);
    Ok(())
}

#[tokio::test]
async fn key_signatures_block_removal_until_removed() -> KeyringResult<()> {
    let dir = tempdir().expect("tempdir");
    let keyring = open_keyring(dir.path()).await;
    keyring.add_key(key(PRIMARY, "FP-PRIMARY")).await?;
    keyring.add_key(key(OTHER, "FP-OTHER")).await?;
    keyring
        .add_key_signature(PRIMARY, signature("R1", OTHER, sigtype::KEY_REVOCATION))
        .await?;

    let removed = keyring.remove_key(PRIMARY).await;
    assert!(matches!(removed, Err(KeyringError::DependencyExists { .. })));
    // Issuing a signature is not a dependency of the issuer.
    keyring.remove_key(OTHER).await?;

    keyring.remove_key_signature(PRIMARY, "R1").await?;
    keyring.remove_key(PRIMARY).await?;
    Ok(())
}
