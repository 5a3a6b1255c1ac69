use serde::{Deserialize, Serialize};

/// How the coercion pipeline treats unknown attributes and unconvertible
/// values.
///
/// Lenient logs a warning, records a [`ParseIssue`](crate::ParseIssue) and
/// drops the offending attribute. Strict aborts the whole call with a typed
/// error before anything is written. Configuration errors (bad schema,
/// missing nested declarations) are fatal under both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    #[default]
    Lenient,
    Strict,
}

impl Strictness {
    pub fn is_strict(self) -> bool {
        matches!(self, Strictness::Strict)
    }
}
