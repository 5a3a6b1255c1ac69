use attrcast_model::{CoerceError, SchemaError};
use thiserror::Error;

use crate::sync::SyncToken;
use crate::url::UrlError;

/// Runtime errors raised by records, collections and their persistence
/// wrappers.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("coercion failed: {0}")]
    Coerce(#[from] CoerceError),
    #[error("validation rejected the change: {0}")]
    Validation(String),
    #[error("no nested slot declared for attribute `{0}`")]
    MissingNested(String),
    #[error("attribute `{0}` holds a different kind of nested instance")]
    NestedKindMismatch(String),
    #[error("record type declares neither a url nor a url root")]
    NoUrl,
    #[error("url error: {0}")]
    Url(#[from] UrlError),
    #[error("no transport configured")]
    NoTransport,
    #[error("unknown sync token {0}")]
    UnknownSyncToken(SyncToken),
}

pub type Result<T> = std::result::Result<T, RecordError>;
