//! Creates the keyring relations from the bundled structure script.

use std::collections::HashSet;

use log::{info, warn};

use pgp_keyring_core::{quote_ident, ColumnType, Dialect, KeyringError, KeyringResult, Value};

use crate::driver::RowShape;
use crate::handle::ConnectionHandle;
use crate::query::BoundQuery;

pub const STRUCTURE_SQL: &str = include_str!("../structure.sql");

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ObjectKind {
    Table,
    View,
    Index,
}

impl ObjectKind {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "TABLE" => Some(ObjectKind::Table),
            "VIEW" => Some(ObjectKind::View),
            "INDEX" => Some(ObjectKind::Index),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::Index => "INDEX",
        }
    }
}

/// One named object from the structure script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaObject {
    pub name: String,
    pub kind: ObjectKind,
    verb: String,
    body: String,
}

impl SchemaObject {
    /// Statement text with tables and views qualified by `schema`. Indexes
    /// are left unqualified and resolve through the session's search path.
    pub fn statement(&self, schema: &str, dialect: Dialect) -> String {
        let target = match self.kind {
            ObjectKind::Index => quote_ident(&self.name),
            ObjectKind::Table | ObjectKind::View => {
                format!("{}.{}", quote_ident(schema), quote_ident(&self.name))
            }
        };
        let body = match dialect {
            Dialect::Postgres => self.body.clone(),
            Dialect::Sqlite => self.body.replace(" BYTEA", " BLOB"),
        };
        format!("{} {} {}{}", self.verb, self.kind.keyword(), target, body)
    }
}

/// Splits `sql` into named objects. Lines starting with `--` are comments.
/// Keywords are matched without regard to case; object names must be quoted.
pub fn parse_structure(sql: &str) -> KeyringResult<Vec<SchemaObject>> {
    let code = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    code.split(';')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(parse_statement)
        .collect()
}

fn parse_statement(statement: &str) -> KeyringResult<SchemaObject> {
    let unknown = || {
        KeyringError::schema(format!(
            "unrecognised statement in structure: {}",
            statement.lines().next().unwrap_or_default()
        ))
    };
    let (verb, rest) = statement.split_once(' ').ok_or_else(unknown)?;
    if verb.is_empty() || !verb.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(unknown());
    }
    let (kind, rest) = rest.split_once(' ').ok_or_else(unknown)?;
    let kind = ObjectKind::parse(kind).ok_or_else(unknown)?;
    let rest = rest.strip_prefix('"').ok_or_else(unknown)?;
    let (name, body) = rest.split_once('"').ok_or_else(unknown)?;
    if name.is_empty() {
        return Err(unknown());
    }
    Ok(SchemaObject {
        name: name.to_string(),
        kind,
        verb: verb.to_ascii_uppercase(),
        body: body.to_string(),
    })
}

/// Names of the tables, views and indexes already present in `schema`.
pub async fn existing_relations(handle: &ConnectionHandle) -> KeyringResult<HashSet<String>> {
    let query = match handle.dialect() {
        Dialect::Postgres => BoundQuery::new(
            "SELECT CAST(\"table_name\" AS TEXT) AS \"name\" FROM \"information_schema\".\"tables\" \
             WHERE \"table_schema\" = $1 \
             UNION SELECT CAST(\"indexname\" AS TEXT) AS \"name\" FROM \"pg_indexes\" \
             WHERE \"schemaname\" = $1",
            vec![Value::from(handle.schema())],
        ),
        Dialect::Sqlite => BoundQuery::new(
            format!(
                "SELECT \"name\" FROM {}.\"sqlite_master\" WHERE \"type\" IN ('table', 'view', 'index')",
                quote_ident(handle.schema())
            ),
            Vec::new(),
        ),
    };
    let rows = handle
        .query(query, RowShape::new().column("name", ColumnType::Text))
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| row.str("name").map(str::to_string))
        .collect())
}

#[derive(Clone, Debug, Default)]
pub struct BootstrapReport {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, KeyringError)>,
}

impl BootstrapReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Creates every object in `objects` that does not exist yet. Each statement
/// runs on its own; a failure is recorded and the rest still run.
pub async fn bootstrap(
    handle: &ConnectionHandle,
    objects: &[SchemaObject],
) -> KeyringResult<BootstrapReport> {
    let existing = existing_relations(handle).await?;
    let mut report = BootstrapReport::default();
    for object in objects {
        if existing.contains(&object.name) {
            report.skipped.push(object.name.clone());
            continue;
        }
        let statement = object.statement(handle.schema(), handle.dialect());
        match handle.execute(BoundQuery::raw(statement)).await {
            Ok(_) => {
                info!("keyring: created {} {}", object.kind.keyword(), object.name);
                report.created.push(object.name.clone());
            }
            Err(err) => {
                warn!("keyring: creating {} failed: {err}", object.name);
                report.failed.push((object.name.clone(), err));
            }
        }
    }
    Ok(report)
}

/// Bootstraps the bundled structure script.
pub async fn initialise(handle: &ConnectionHandle) -> KeyringResult<BootstrapReport> {
    let objects = parse_structure(STRUCTURE_SQL)?;
    bootstrap(handle, &objects).await
}

#[cfg(test)]
mod tests {
    use pgp_keyring_core::{Dialect, KeyringError};

    use super::{parse_structure, ObjectKind, STRUCTURE_SQL};

    #[test]
    fn bundled_structure_parses() {
        let objects = parse_structure(STRUCTURE_SQL).expect("parse");
        let names: Vec<_> = objects.iter().map(|object| object.name.as_str()).collect();
        for expected in [
            "keys",
            "keys_identities",
            "keys_attributes",
            "keys_signatures",
            "keys_identities_signatures",
            "keys_attributes_signatures",
            "keys_subkeys",
            "keys_identities_selfsigned",
            "keys_attributes_selfsigned",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        assert!(objects.iter().any(|object| object.kind == ObjectKind::Index));
    }

    #[test]
    fn tables_are_qualified_and_indexes_are_not() {
        let objects = parse_structure(
            "CREATE TABLE \"items\" (\"id\" BYTEA);\nCREATE INDEX \"items_idx\" ON \"items\" (\"id\");",
        )
        .expect("parse");
        assert_eq!(
            objects[0].statement("pgp", Dialect::Postgres),
            "CREATE TABLE \"pgp\".\"items\" (\"id\" BYTEA)"
        );
        assert_eq!(
            objects[0].statement("main", Dialect::Sqlite),
            "CREATE TABLE \"main\".\"items\" (\"id\" BLOB)"
        );
        assert_eq!(
            objects[1].statement("pgp", Dialect::Postgres),
            "CREATE INDEX \"items_idx\" ON \"items\" (\"id\")"
        );
    }

    #[test]
    fn comments_and_blank_chunks_are_ignored() {
        let objects = parse_structure("-- header; with a semicolon\n\n;\nCREATE VIEW \"v\" AS SELECT 1;")
            .expect("parse");
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].kind, ObjectKind::View);
    }

    #[test]
    fn malformed_statement_is_fatal() {
        let err = parse_structure("CREATE TRIGGER \"t\" AFTER INSERT").unwrap_err();
        assert!(matches!(err, KeyringError::Schema { .. }));
        let err = parse_structure("CREATE TABLE t (\"id\" TEXT)").unwrap_err();
        assert!(matches!(err, KeyringError::Schema { .. }));
        let err = parse_structure("CREATE-TABLE \"t\" (\"id\" TEXT)").unwrap_err();
        assert!(matches!(err, KeyringError::Schema { .. }));
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let objects =
            parse_structure("create index \"t_idx\" ON \"t\" (\"id\");\nCreate Table \"t\" (\"id\" TEXT)")
                .expect("parse");
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].kind, ObjectKind::Index);
        assert_eq!(objects[1].kind, ObjectKind::Table);
        assert_eq!(
            objects[1].statement("main", Dialect::Sqlite),
            "CREATE TABLE \"main\".\"t\" (\"id\" TEXT)"
        );
    }
}
