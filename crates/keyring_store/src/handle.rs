use std::path::Path;
use std::sync::Arc;

use futures::stream::{self, TryStreamExt};

use pgp_keyring_core::{Dialect, KeyringResult, Record, ResultSequence};

use crate::driver::{Driver, RowShape, SeaDriver};
use crate::query::BoundQuery;
use crate::transaction::{TransactionCommand, TransactionCoordinator, TransactionState};
use crate::KeyringConfig;

/// The keyring's single database session, its schema, and its transaction state.
pub struct ConnectionHandle {
    driver: Arc<dyn Driver>,
    schema: String,
    transaction: TransactionCoordinator,
}

impl ConnectionHandle {
    pub fn new(driver: Arc<dyn Driver>, schema: impl Into<String>) -> Self {
        Self {
            driver,
            schema: schema.into(),
            transaction: TransactionCoordinator::new(),
        }
    }

    pub async fn connect(config: &KeyringConfig, base_dir: &Path) -> KeyringResult<Self> {
        let driver = SeaDriver::connect(config, base_dir).await?;
        Ok(Self::new(Arc::new(driver), config.schema()))
    }

    pub fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.transaction.state()
    }

    pub async fn begin(&self) -> KeyringResult<()> {
        self.transaction
            .request(self.driver.as_ref(), TransactionCommand::Begin)
            .await
    }

    pub async fn commit(&self) -> KeyringResult<()> {
        self.transaction
            .request(self.driver.as_ref(), TransactionCommand::Commit)
            .await
    }

    pub async fn rollback(&self) -> KeyringResult<()> {
        self.transaction
            .request(self.driver.as_ref(), TransactionCommand::Rollback)
            .await
    }

    pub async fn execute(&self, query: BoundQuery) -> KeyringResult<u64> {
        self.driver.execute(query).await
    }

    pub async fn query(&self, query: BoundQuery, shape: RowShape) -> KeyringResult<Vec<Record>> {
        self.driver.query(query, shape).await
    }

    /// Rows of `query`, dispatched when the sequence is first pulled.
    pub fn stream(&self, query: BoundQuery, shape: RowShape) -> ResultSequence<Record> {
        let driver = Arc::clone(&self.driver);
        let rows = stream::once(async move { driver.query_stream(query, shape).await }).try_flatten();
        ResultSequence::from_stream(rows)
    }
}
