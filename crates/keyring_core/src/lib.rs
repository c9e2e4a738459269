pub mod api;
pub mod entity;
pub mod error;
pub mod filter;
pub mod sequence;
pub mod sql;
pub mod value;

pub use api::*;
pub use entity::{sigtype, EntityKind, PacketCodec};
pub use error::{KeyringError, KeyringResult};
pub use filter::{Conditions, Filter, Predicate, SqlRenderable};
pub use sequence::ResultSequence;
pub use sql::{escape_like, quote_ident, Arguments, Dialect};
pub use value::{ColumnType, Record, Value};
