use std::path::Path;
use std::pin::pin;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use log::{debug, info, warn};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, QueryResult,
    Statement, StreamTrait, Value as SeaValue,
};
use tokio::sync::mpsc;

use pgp_keyring_core::{ColumnType, Dialect, KeyringError, KeyringResult, Record, Value};

use crate::query::BoundQuery;
use crate::tables::EntityTable;
use crate::KeyringConfig;

pub type RowStream = BoxStream<'static, KeyringResult<Record>>;

/// Names and storage types of the columns a query returns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowShape {
    columns: Vec<(String, ColumnType)>,
}

impl RowShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push((name.into(), ty));
        self
    }

    /// Shape of `columns` read from `table`; names that are not columns are skipped.
    pub fn for_table<S: AsRef<str>>(table: &EntityTable, columns: &[S]) -> Self {
        let columns = columns
            .iter()
            .filter_map(|name| table.column(name.as_ref()))
            .map(|column| (column.name.to_string(), column.ty))
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One database session. Statements are executed in the order they are issued.
#[async_trait]
pub trait Driver: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Runs a statement and returns the affected row count.
    async fn execute(&self, query: BoundQuery) -> KeyringResult<u64>;

    async fn query(&self, query: BoundQuery, shape: RowShape) -> KeyringResult<Vec<Record>>;

    /// Streams rows as the database produces them. Dispatch errors surface as
    /// the first item. Statements issued while the stream is still being read
    /// must not wait on its consumer.
    async fn query_stream(&self, query: BoundQuery, shape: RowShape) -> KeyringResult<RowStream>;
}

/// [`Driver`] over a sea-orm connection pool limited to one connection.
#[derive(Clone)]
pub struct SeaDriver {
    conn: DatabaseConnection,
    dialect: Dialect,
}

impl SeaDriver {
    pub async fn connect(config: &KeyringConfig, base_dir: &Path) -> KeyringResult<Self> {
        config.validate()?;
        let url = config.connection_url(base_dir)?;
        let mut options = ConnectOptions::new(url);
        options.max_connections(1).min_connections(1);
        if config.dialect() == Dialect::Postgres {
            options.set_schema_search_path(config.schema().to_string());
        }
        let connection = config.connection.clone().unwrap_or_default();
        if let Some(timeout) = connection.connect_timeout() {
            options.connect_timeout(timeout);
        }
        if let Some(timeout) = connection.acquire_timeout() {
            options.acquire_timeout(timeout);
        }
        options.sqlx_logging(connection.sql_logging.unwrap_or(false));
        let conn = Database::connect(options).await.map_err(KeyringError::from)?;
        info!(
            "keyring: connected to {} (schema {})",
            config.backend_name(),
            config.schema()
        );
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: DatabaseConnection) -> KeyringResult<Self> {
        let dialect = match conn.get_database_backend() {
            DatabaseBackend::Postgres => Dialect::Postgres,
            DatabaseBackend::Sqlite => Dialect::Sqlite,
            other => {
                return Err(KeyringError::validation(format!(
                    "unsupported database backend: {other:?}"
                )))
            }
        };
        Ok(Self { conn, dialect })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    fn backend(&self) -> DatabaseBackend {
        backend_for(self.dialect)
    }
}

fn backend_for(dialect: Dialect) -> DatabaseBackend {
    match dialect {
        Dialect::Postgres => DatabaseBackend::Postgres,
        Dialect::Sqlite => DatabaseBackend::Sqlite,
    }
}

fn statement(backend: DatabaseBackend, query: &BoundQuery) -> Statement {
    let values = query.args().iter().cloned().map(to_sea_value);
    Statement::from_sql_and_values(backend, query.sql(), values)
}

fn to_sea_value(value: Value) -> SeaValue {
    match value {
        Value::Null => SeaValue::String(None),
        Value::Bool(value) => SeaValue::from(value),
        Value::I64(value) => SeaValue::from(value),
        Value::F64(value) => SeaValue::from(value),
        Value::Str(value) => SeaValue::from(value),
        Value::Bytes(value) => SeaValue::from(value),
    }
}

fn decode_row(row: &QueryResult, shape: &RowShape) -> KeyringResult<Record> {
    let mut record = Record::new();
    for (name, ty) in shape.columns() {
        let value = match ty {
            ColumnType::Text => Value::from(row.try_get::<Option<String>>("", name)?),
            ColumnType::I64 => Value::from(row.try_get::<Option<i64>>("", name)?),
            ColumnType::F64 => Value::from(row.try_get::<Option<f64>>("", name)?),
            ColumnType::Bool => Value::from(row.try_get::<Option<bool>>("", name)?),
            ColumnType::Bytes => Value::from(row.try_get::<Option<Vec<u8>>>("", name)?),
        };
        record.insert(name, value);
    }
    Ok(record)
}

fn report(err: sea_orm::DbErr, sql: &str) -> KeyringError {
    warn!("keyring: sql error: {err}; statement: {sql}");
    KeyringError::from(err)
}

#[async_trait]
impl Driver for SeaDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn execute(&self, query: BoundQuery) -> KeyringResult<u64> {
        debug!("keyring: execute {}", query.sql());
        let result = self
            .conn
            .execute(statement(self.backend(), &query))
            .await
            .map_err(|err| report(err, query.sql()))?;
        Ok(result.rows_affected())
    }

    async fn query(&self, query: BoundQuery, shape: RowShape) -> KeyringResult<Vec<Record>> {
        debug!("keyring: query {}", query.sql());
        let rows = self
            .conn
            .query_all(statement(self.backend(), &query))
            .await
            .map_err(|err| report(err, query.sql()))?;
        rows.iter().map(|row| decode_row(row, &shape)).collect()
    }

    async fn query_stream(&self, query: BoundQuery, shape: RowShape) -> KeyringResult<RowStream> {
        debug!("keyring: stream {}", query.sql());
        let conn = self.conn.clone();
        let backend = self.backend();
        // The producer never waits on the consumer, so the session is released
        // as soon as the statement is exhausted even if rows are still unread.
        let (tx, rx) = mpsc::unbounded_channel::<KeyringResult<Record>>();
        tokio::spawn(async move {
            let rows = match conn.stream(statement(backend, &query)).await {
                Ok(rows) => rows,
                Err(err) => {
                    let _ = tx.send(Err(report(err, query.sql())));
                    return;
                }
            };
            let mut rows = pin!(rows);
            while let Some(row) = rows.next().await {
                let item = row
                    .map_err(|err| report(err, query.sql()))
                    .and_then(|row| decode_row(&row, &shape));
                let failed = item.is_err();
                if tx.send(item).is_err() || failed {
                    break;
                }
            }
        });
        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }
}
