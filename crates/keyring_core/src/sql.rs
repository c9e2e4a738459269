use serde::{Deserialize, Serialize};

use crate::Value;

/// SQL flavour spoken by the connected database.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Positional parameter marker, 1-based.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
        }
    }

    /// Case-insensitive LIKE against an already quoted column expression.
    pub fn contains_ignore_case(self, column: &str, placeholder: &str) -> String {
        match self {
            Dialect::Postgres => format!("{column} ILIKE {placeholder} ESCAPE '\\'"),
            Dialect::Sqlite => format!("LOWER({column}) LIKE LOWER({placeholder}) ESCAPE '\\'"),
        }
    }

    /// 1-based substring of an already quoted column expression.
    pub fn substring(self, column: &str, from: usize, len: usize) -> String {
        match self {
            Dialect::Postgres => format!("SUBSTRING({column} FROM {from} FOR {len})"),
            Dialect::Sqlite => format!("SUBSTR({column}, {from}, {len})"),
        }
    }
}

/// Double-quotes an identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escapes LIKE metacharacters so `pattern` matches literally under `ESCAPE '\'`.
pub fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Ordered bound values for one statement. Placeholder numbers follow push order.
#[derive(Clone, Debug)]
pub struct Arguments {
    dialect: Dialect,
    values: Vec<Value>,
}

impl Arguments {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            values: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Binds `value` and returns the text to splice into the statement.
    /// NULL is emitted as the keyword so it never needs a typed parameter.
    pub fn push(&mut self, value: Value) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        self.values.push(value);
        self.dialect.placeholder(self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Drops every value bound after `mark` (a prior `len()`).
    pub fn rewind(&mut self, mark: usize) {
        self.values.truncate(mark);
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
