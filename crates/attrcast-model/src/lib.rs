pub mod error;
pub mod issue;
pub mod options;
pub mod schema;
pub mod types;
pub mod value;

pub use error::{CoerceError, Result, SchemaError};
pub use issue::{IssueKind, ParseIssue, ParseReport};
pub use options::Strictness;
pub use schema::{TypeEntry, TypeMap, TypeMapBuilder};
pub use types::AttrType;
pub use value::{AttrValue, render_timestamp};
