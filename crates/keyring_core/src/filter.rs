use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::sql::{escape_like, quote_ident, Arguments};
use crate::{Dialect, KeyringError, KeyringResult, Record, Value};

/// Offset and length of the short key id inside a 16-character key id.
const SHORT_ID_FROM: usize = 9;
const SHORT_ID_LEN: usize = 8;

/// Caller-supplied predicate evaluated in process only.
pub trait Predicate: Send + Sync + fmt::Debug {
    /// `None` means unknown, as for a comparison against NULL.
    fn evaluate(&self, value: &Value) -> Option<bool>;
}

/// Something that can be expressed as a SQL boolean expression over one column.
pub trait SqlRenderable {
    /// Appends bound values to `args` and returns the condition text, or `None`
    /// when the expression has no SQL form. On `None`, `args` is left as it was.
    fn to_condition(&self, column: &str, args: &mut Arguments) -> Option<String>;
}

#[derive(Clone, Debug)]
pub enum Filter {
    Equals(Value),
    EqualsIgnoreCase(String),
    ContainsIgnoreCase(String),
    /// Matches the 8 characters following the first 8 of a key id.
    ShortId(String),
    LessThan(Value),
    LessThanOrEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Custom(Arc<dyn Predicate>),
}

impl Filter {
    pub fn equals(value: impl Into<Value>) -> Self {
        Filter::Equals(value.into())
    }

    pub fn is_null() -> Self {
        Filter::Equals(Value::Null)
    }

    pub fn any_of<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Filter::Or(values.into_iter().map(Filter::equals).collect())
    }

    pub fn negate(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    pub fn custom(predicate: impl Predicate + 'static) -> Self {
        Filter::Custom(Arc::new(predicate))
    }

    /// Three-valued evaluation against one field value.
    pub fn evaluate(&self, value: &Value) -> Option<bool> {
        match self {
            Filter::Equals(Value::Null) => Some(value.is_null()),
            Filter::Equals(expected) => compare(value, expected, |ord| ord == Ordering::Equal),
            Filter::EqualsIgnoreCase(expected) => text(value, |actual| {
                actual.to_lowercase() == expected.to_lowercase()
            }),
            Filter::ContainsIgnoreCase(needle) => text(value, |actual| {
                actual.to_lowercase().contains(&needle.to_lowercase())
            }),
            Filter::ShortId(short) => text(value, |actual| {
                let segment: String = actual
                    .chars()
                    .skip(SHORT_ID_FROM - 1)
                    .take(SHORT_ID_LEN)
                    .collect();
                segment == short.to_uppercase()
            }),
            Filter::LessThan(bound) => compare(value, bound, |ord| ord == Ordering::Less),
            Filter::LessThanOrEqual(bound) => compare(value, bound, |ord| ord != Ordering::Greater),
            Filter::GreaterThan(bound) => compare(value, bound, |ord| ord == Ordering::Greater),
            Filter::GreaterThanOrEqual(bound) => compare(value, bound, |ord| ord != Ordering::Less),
            Filter::Not(inner) => inner.evaluate(value).map(|result| !result),
            Filter::And(children) => {
                let mut unknown = false;
                for child in children {
                    match child.evaluate(value) {
                        Some(false) => return Some(false),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(true)
                }
            }
            Filter::Or(children) => {
                let mut unknown = false;
                for child in children {
                    match child.evaluate(value) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(false)
                }
            }
            Filter::Custom(predicate) => predicate.evaluate(value),
        }
    }

    /// A row passes only when the filter is definitely true.
    pub fn matches(&self, value: &Value) -> bool {
        self.evaluate(value) == Some(true)
    }
}

fn compare(value: &Value, expected: &Value, accept: impl Fn(Ordering) -> bool) -> Option<bool> {
    if value.is_null() || expected.is_null() {
        return None;
    }
    Some(value.sql_cmp(expected).map(accept).unwrap_or(false))
}

fn text(value: &Value, accept: impl Fn(&str) -> bool) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Str(actual) => Some(accept(actual)),
        _ => Some(false),
    }
}

impl SqlRenderable for Filter {
    fn to_condition(&self, column: &str, args: &mut Arguments) -> Option<String> {
        let quoted = quote_ident(column);
        let condition = match self {
            Filter::Equals(Value::Null) => format!("{quoted} IS NULL"),
            Filter::Equals(value) => format!("{quoted} = {}", args.push(value.clone())),
            Filter::EqualsIgnoreCase(value) => {
                format!("LOWER({quoted}) = LOWER({})", args.push(Value::from(value.as_str())))
            }
            Filter::ContainsIgnoreCase(needle) => {
                let placeholder = args.push(Value::Str(format!("%{}%", escape_like(needle))));
                args.dialect().contains_ignore_case(&quoted, &placeholder)
            }
            Filter::ShortId(short) => {
                let segment = args
                    .dialect()
                    .substring(&quoted, SHORT_ID_FROM, SHORT_ID_LEN);
                format!("{segment} = {}", args.push(Value::Str(short.to_uppercase())))
            }
            Filter::LessThan(bound) => format!("{quoted} < {}", args.push(bound.clone())),
            Filter::LessThanOrEqual(bound) => format!("{quoted} <= {}", args.push(bound.clone())),
            Filter::GreaterThan(bound) => format!("{quoted} > {}", args.push(bound.clone())),
            Filter::GreaterThanOrEqual(bound) => {
                format!("{quoted} >= {}", args.push(bound.clone()))
            }
            Filter::Not(inner) => format!("NOT ( {} )", inner.to_condition(column, args)?),
            Filter::And(children) => render_group(children, column, args, " AND ", "1 = 1")?,
            Filter::Or(children) => render_group(children, column, args, " OR ", "1 = 0")?,
            Filter::Custom(_) => return None,
        };
        Some(condition)
    }
}

fn render_group(
    children: &[Filter],
    column: &str,
    args: &mut Arguments,
    joiner: &str,
    empty: &str,
) -> Option<String> {
    if children.is_empty() {
        return Some(empty.to_string());
    }
    let mark = args.len();
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        match child.to_condition(column, args) {
            Some(part) => parts.push(part),
            None => {
                args.rewind(mark);
                return None;
            }
        }
    }
    Some(format!("( {} )", parts.join(joiner)))
}

impl From<Value> for Filter {
    fn from(value: Value) -> Self {
        Filter::Equals(value)
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        Filter::Equals(Value::from(value))
    }
}

impl From<String> for Filter {
    fn from(value: String) -> Self {
        Filter::Equals(Value::Str(value))
    }
}

impl From<i64> for Filter {
    fn from(value: i64) -> Self {
        Filter::Equals(Value::I64(value))
    }
}

impl From<bool> for Filter {
    fn from(value: bool) -> Self {
        Filter::Equals(Value::Bool(value))
    }
}

impl From<Vec<Value>> for Filter {
    fn from(values: Vec<Value>) -> Self {
        Filter::any_of(values)
    }
}

/// Per-field filters, combined with AND. Iteration order is the field order.
#[derive(Clone, Debug, Default)]
pub struct Conditions(BTreeMap<String, Filter>);

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, filter: impl Into<Filter>) -> Self {
        self.insert(field, filter);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, filter: impl Into<Filter>) {
        self.0.insert(field.into(), filter.into());
    }

    /// Adds `filter` for `field`, ANDing it with any filter already present.
    pub fn restrict(mut self, field: impl Into<String>, filter: impl Into<Filter>) -> Self {
        let field = field.into();
        let filter = filter.into();
        let combined = match self.0.remove(&field) {
            Some(existing) => Filter::And(vec![existing, filter]),
            None => filter,
        };
        self.0.insert(field, combined);
        self
    }

    /// Applies every entry of `scope` with [`Conditions::restrict`].
    pub fn scoped(self, scope: Conditions) -> Self {
        scope
            .0
            .into_iter()
            .fold(self, |conditions, (field, filter)| conditions.restrict(field, filter))
    }

    pub fn get(&self, field: &str) -> Option<&Filter> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.0.iter().map(|(field, filter)| (field.as_str(), filter))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.0
            .iter()
            .all(|(field, filter)| filter.matches(record.value(field)))
    }

    /// Partitions into (SQL-side, in-process) halves. An entry goes to SQL when
    /// `is_column` accepts its field and the filter renders for `dialect`.
    pub fn split(&self, dialect: Dialect, is_column: impl Fn(&str) -> bool) -> (Conditions, Conditions) {
        let mut sql = Conditions::new();
        let mut app = Conditions::new();
        for (field, filter) in &self.0 {
            let renders = is_column(field)
                && filter
                    .to_condition(field, &mut Arguments::new(dialect))
                    .is_some();
            let side = if renders { &mut sql } else { &mut app };
            side.0.insert(field.clone(), filter.clone());
        }
        (sql, app)
    }

    /// Renders all entries joined by AND; `None` when there are no entries.
    pub fn to_sql(&self, args: &mut Arguments) -> KeyringResult<Option<String>> {
        let mut parts = Vec::with_capacity(self.0.len());
        for (field, filter) in &self.0 {
            let condition = filter
                .to_condition(field, args)
                .ok_or_else(|| KeyringError::filter_unrenderable(field))?;
            parts.push(condition);
        }
        Ok((!parts.is_empty()).then(|| parts.join(" AND ")))
    }
}

impl<K: Into<String>, F: Into<Filter>> FromIterator<(K, F)> for Conditions {
    fn from_iter<I: IntoIterator<Item = (K, F)>>(iter: I) -> Self {
        let mut conditions = Conditions::new();
        for (field, filter) in iter {
            conditions.insert(field, filter);
        }
        conditions
    }
}
