use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::join;
use parking_lot::Mutex;

use pgp_keyring_store::{
    BoundQuery, Dialect, Driver, KeyringError, KeyringResult, Record, RowShape, RowStream,
    TransactionCommand, TransactionCoordinator, TransactionState,
};

/// Records every statement and yields once before completing it.
#[derive(Default)]
struct RecordingDriver {
    statements: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingDriver {
    fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&self, query: BoundQuery) -> KeyringResult<u64> {
        self.statements.lock().push(query.sql().to_string());
        tokio::task::yield_now().await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(KeyringError::driver("database is locked"));
        }
        Ok(0)
    }

    async fn query(&self, _query: BoundQuery, _shape: RowShape) -> KeyringResult<Vec<Record>> {
        Ok(Vec::new())
    }

    async fn query_stream(&self, _query: BoundQuery, _shape: RowShape) -> KeyringResult<RowStream> {
        Err(KeyringError::driver("not used"))
    }
}

#[tokio::test]
async fn concurrent_begins_issue_one_statement() -> KeyringResult<()> {
    let driver = RecordingDriver::default();
    let coordinator = TransactionCoordinator::new();

    let (first, second) = join!(
        coordinator.request(&driver, TransactionCommand::Begin),
        coordinator.request(&driver, TransactionCommand::Begin),
    );
    first?;
    second?;

    assert_eq!(driver.statements(), vec!["BEGIN".to_string()]);
    assert_eq!(coordinator.state(), TransactionState::Open);
    Ok(())
}

#[tokio::test]
async fn commit_and_rollback_close_the_transaction() -> KeyringResult<()> {
    let driver = RecordingDriver::default();
    let coordinator = TransactionCoordinator::new();

    coordinator.request(&driver, TransactionCommand::Begin).await?;
    coordinator.request(&driver, TransactionCommand::Commit).await?;
    assert_eq!(coordinator.state(), TransactionState::Idle);

    coordinator.request(&driver, TransactionCommand::Begin).await?;
    coordinator.request(&driver, TransactionCommand::Rollback).await?;
    assert_eq!(coordinator.state(), TransactionState::Idle);

    assert_eq!(
        driver.statements(),
        vec!["BEGIN", "COMMIT", "BEGIN", "ROLLBACK"]
    );
    Ok(())
}

#[tokio::test]
async fn closing_an_idle_transaction_does_nothing() -> KeyringResult<()> {
    let driver = RecordingDriver::default();
    let coordinator = TransactionCoordinator::new();

    coordinator.request(&driver, TransactionCommand::Commit).await?;
    coordinator.request(&driver, TransactionCommand::Rollback).await?;

    assert!(driver.statements().is_empty());
    assert_eq!(coordinator.state(), TransactionState::Idle);
    Ok(())
}

#[tokio::test]
async fn queued_requests_resolve_in_arrival_order() -> KeyringResult<()> {
    let driver = RecordingDriver::default();
    let coordinator = TransactionCoordinator::new();

    let (first, second, third) = join!(
        coordinator.request(&driver, TransactionCommand::Begin),
        coordinator.request(&driver, TransactionCommand::Begin),
        coordinator.request(&driver, TransactionCommand::Commit),
    );
    first?;
    second?;
    third?;

    assert_eq!(driver.statements(), vec!["BEGIN", "COMMIT"]);
    assert_eq!(coordinator.state(), TransactionState::Idle);
    Ok(())
}

#[tokio::test]
async fn failure_reaches_every_waiter_and_resets() -> KeyringResult<()> {
    let driver = RecordingDriver::default();
    driver.failing.store(true, Ordering::SeqCst);
    let coordinator = TransactionCoordinator::new();

    let (first, second) = join!(
        coordinator.request(&driver, TransactionCommand::Begin),
        coordinator.request(&driver, TransactionCommand::Begin),
    );
    assert!(matches!(first, Err(KeyringError::Driver { .. })));
    assert!(matches!(second, Err(KeyringError::Driver { .. })));
    assert_eq!(coordinator.state(), TransactionState::Idle);
    assert_eq!(driver.statements(), vec!["BEGIN"]);

    driver.failing.store(false, Ordering::SeqCst);
    coordinator.request(&driver, TransactionCommand::Begin).await?;
    assert_eq!(coordinator.state(), TransactionState::Open);
    assert_eq!(driver.statements(), vec!["BEGIN", "BEGIN"]);
    Ok(())
}
