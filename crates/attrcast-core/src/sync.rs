use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// REST verb of a persistence request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncMethod {
    Read,
    Create,
    Update,
    Delete,
}

impl SyncMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMethod::Read => "read",
            SyncMethod::Create => "create",
            SyncMethod::Update => "update",
            SyncMethod::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One outbound persistence request handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    pub method: SyncMethod,
    pub url: String,
    /// Serialized attributes for create/update; absent for read/delete.
    pub body: Option<Value>,
}

/// Correlates a dispatched request with its completion. Tokens are unique per
/// record, so overlapping operations stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncToken(pub(crate) u64);

impl SyncToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SyncToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport failure reported by the driver on completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyncError {
    pub message: String,
}

impl SyncError {
    pub fn new(message: impl Into<String>) -> Self {
        SyncError {
            message: message.into(),
        }
    }
}

/// Completion payload delivered by the driver: the parsed response body on
/// success, the transport failure otherwise.
pub type SyncOutcome = std::result::Result<Value, SyncError>;

/// Seam to the host's network layer.
///
/// `dispatch` must not block and must not call back into the record; the
/// driver delivers the outcome later, on the same logical thread, through
/// [`Record::complete_sync`](crate::Record::complete_sync).
pub trait Transport {
    fn dispatch(&self, token: SyncToken, request: SyncRequest);
}

/// Per-call persistence options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Overrides the record type's wait default. Waiting keeps the
    /// previous-snapshot until the operation succeeds; not waiting clears it
    /// at dispatch.
    pub wait: Option<bool>,
    /// Run the response through the coercion pipeline (default true).
    pub parse: Option<bool>,
    /// Suppress change notifications when applying the response.
    pub silent: bool,
}

impl SyncOptions {
    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = Some(wait);
        self
    }

    pub fn with_parse(mut self, parse: bool) -> Self {
        self.parse = Some(parse);
        self
    }

    pub fn silenced(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// Bookkeeping for one in-flight operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingSync {
    pub(crate) token: SyncToken,
    pub(crate) method: SyncMethod,
    pub(crate) wait: bool,
    pub(crate) parse: bool,
    pub(crate) silent: bool,
}
