use serde_json::Value;
use thiserror::Error;

use crate::issue::{IssueKind, ParseIssue};
use crate::types::AttrType;

/// Configuration-class errors in a type map or record type declaration.
/// Always fatal, regardless of strictness.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("duplicate attribute `{0}`")]
    DuplicateAttribute(String),
    #[error("unknown type tag `{0}`")]
    UnknownTypeTag(String),
    #[error("defaults must be a JSON object")]
    InvalidDefaults,
    #[error("attribute `{attribute}` is tagged `{tag}` but has no nested declaration")]
    MissingNestedDecl { attribute: String, tag: AttrType },
    #[error("nested declaration for `{attribute}` does not match a collection/model tag")]
    NestedDeclMismatch { attribute: String },
}

/// Typed coercion failures. Strict mode aborts on these; lenient mode
/// converts the attribute-level ones into [`ParseIssue`]s and drops the
/// attribute instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoerceError {
    #[error("unknown attribute `{attribute}`")]
    UnknownAttribute { attribute: String, raw: Value },
    #[error("attribute `{attribute}`: {raw} is not numeric")]
    NotNumeric { attribute: String, raw: Value },
    #[error("attribute `{attribute}`: {raw} is not a date")]
    InvalidDate { attribute: String, raw: Value },
    #[error("attribute `{attribute}`: expected an array, got {raw}")]
    NotAnArray { attribute: String, raw: Value },
    #[error("attribute `{attribute}`: collection payload must be an array, got {raw}")]
    NotASequence { attribute: String, raw: Value },
    #[error("payload is neither an object nor promotable to the identity attribute: {raw}")]
    InvalidPayload { raw: Value },
}

impl CoerceError {
    /// Lenient-mode rendering of this error. `None` for payload-level
    /// failures, which abort under either strictness.
    pub fn to_issue(&self) -> Option<ParseIssue> {
        let (attribute, kind, raw) = match self {
            CoerceError::UnknownAttribute { attribute, raw } => {
                (attribute, IssueKind::UnknownAttribute, raw.clone())
            }
            CoerceError::NotNumeric { attribute, raw } => {
                (attribute, IssueKind::NotNumeric, raw.clone())
            }
            CoerceError::InvalidDate { attribute, raw } => {
                (attribute, IssueKind::InvalidDate, raw.clone())
            }
            CoerceError::NotAnArray { attribute, raw } => {
                (attribute, IssueKind::NotAnArray, raw.clone())
            }
            CoerceError::NotASequence { attribute, raw } => {
                (attribute, IssueKind::NotASequence, raw.clone())
            }
            CoerceError::InvalidPayload { .. } => return None,
        };
        Some(ParseIssue {
            attribute: attribute.clone(),
            kind,
            raw,
        })
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
