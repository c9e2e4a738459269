//! Parameterized SELECT/INSERT/UPDATE/DELETE text for one table.

use std::fmt::Write as _;

use pgp_keyring_core::{quote_ident, Arguments, Conditions, Dialect, KeyringError, KeyringResult, Record, Value};

use crate::tables::EntityTable;

/// Statement text plus its positional arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundQuery {
    sql: String,
    args: Vec<Value>,
}

impl BoundQuery {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }

    /// Replaces byte arguments by their `bytea` octal escape text, for drivers
    /// that can only bind strings.
    pub fn with_escaped_binary(self) -> Self {
        let args = self
            .args
            .into_iter()
            .map(|value| match value {
                Value::Bytes(bytes) => Value::Str(escape_bytea(&bytes)),
                other => other,
            })
            .collect();
        Self {
            sql: self.sql,
            args,
        }
    }
}

/// PostgreSQL escape form of a byte string: `\ooo` per byte.
pub fn escape_bytea(bytes: &[u8]) -> String {
    let mut escaped = String::with_capacity(bytes.len() * 4);
    for byte in bytes {
        let _ = write!(escaped, "\\{byte:03o}");
    }
    escaped
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    Columns(Vec<String>),
    Expression(String),
}

impl Projection {
    pub fn columns<S: AsRef<str>>(columns: impl IntoIterator<Item = S>) -> Self {
        Projection::Columns(columns.into_iter().map(|c| c.as_ref().to_string()).collect())
    }

    fn render(&self) -> String {
        match self {
            Projection::Columns(columns) if columns.is_empty() => "1".to_string(),
            Projection::Columns(columns) => columns
                .iter()
                .map(|column| quote_ident(column))
                .collect::<Vec<_>>()
                .join(", "),
            Projection::Expression(expression) => expression.clone(),
        }
    }
}

fn push_where(sql: &mut String, conditions: &Conditions, args: &mut Arguments) -> KeyringResult<()> {
    if let Some(condition) = conditions.to_sql(args)? {
        sql.push_str(" WHERE ");
        sql.push_str(&condition);
    }
    Ok(())
}

pub fn select(
    dialect: Dialect,
    table: &EntityTable,
    projection: &Projection,
    conditions: &Conditions,
    suffix: Option<&str>,
) -> KeyringResult<BoundQuery> {
    let mut args = Arguments::new(dialect);
    let mut sql = format!("SELECT {} FROM {}", projection.render(), quote_ident(table.name));
    push_where(&mut sql, conditions, &mut args)?;
    if let Some(suffix) = suffix {
        sql.push(' ');
        sql.push_str(suffix);
    }
    Ok(BoundQuery::new(sql, args.into_values()))
}

pub fn insert(dialect: Dialect, table: &EntityTable, fields: &Record) -> KeyringResult<BoundQuery> {
    let fields = table.storable(fields);
    if fields.is_empty() {
        return Err(KeyringError::validation(format!(
            "no storable fields to insert into {}",
            table.name
        )));
    }
    let mut args = Arguments::new(dialect);
    let mut columns = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len());
    for (field, value) in fields.iter() {
        columns.push(quote_ident(field));
        values.push(args.push(value.clone()));
    }
    let sql = format!(
        "INSERT INTO {} ( {} ) VALUES ( {} )",
        quote_ident(table.name),
        columns.join(", "),
        values.join(", ")
    );
    Ok(BoundQuery::new(sql, args.into_values()))
}

/// SET arguments are numbered first; WHERE arguments continue after them.
pub fn update(
    dialect: Dialect,
    table: &EntityTable,
    fields: &Record,
    conditions: &Conditions,
) -> KeyringResult<BoundQuery> {
    let fields = table.storable(fields);
    if fields.is_empty() {
        return Err(KeyringError::validation(format!(
            "no storable fields to update in {}",
            table.name
        )));
    }
    let mut args = Arguments::new(dialect);
    let assignments = fields
        .iter()
        .map(|(field, value)| format!("{} = {}", quote_ident(field), args.push(value.clone())))
        .collect::<Vec<_>>();
    let mut sql = format!(
        "UPDATE {} SET {}",
        quote_ident(table.name),
        assignments.join(", ")
    );
    push_where(&mut sql, conditions, &mut args)?;
    Ok(BoundQuery::new(sql, args.into_values()))
}

pub fn delete(dialect: Dialect, table: &EntityTable, conditions: &Conditions) -> KeyringResult<BoundQuery> {
    let mut args = Arguments::new(dialect);
    let mut sql = format!("DELETE FROM {}", quote_ident(table.name));
    push_where(&mut sql, conditions, &mut args)?;
    Ok(BoundQuery::new(sql, args.into_values()))
}
