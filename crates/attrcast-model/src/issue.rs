use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What went wrong with one attribute during lenient coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    UnknownAttribute,
    NotNumeric,
    InvalidDate,
    NotAnArray,
    NotASequence,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::UnknownAttribute => "unknown attribute",
            IssueKind::NotNumeric => "not numeric",
            IssueKind::InvalidDate => "invalid date",
            IssueKind::NotAnArray => "not an array",
            IssueKind::NotASequence => "not a sequence",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One attribute dropped during a lenient parse or set, with the raw value
/// as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub attribute: String,
    pub kind: IssueKind,
    pub raw: Value,
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.attribute, self.kind, self.raw)
    }
}

/// Diagnostics accumulated over one parse or bulk-set call. Lenient mode
/// records here what strict mode would have aborted on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseReport {
    pub issues: Vec<ParseIssue>,
}

impl ParseReport {
    pub fn push(&mut self, issue: ParseIssue) {
        self.issues.push(issue);
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn dropped_count(&self) -> usize {
        self.issues.len()
    }

    /// Issues recorded for `attribute`.
    pub fn for_attribute<'a>(&'a self, attribute: &'a str) -> impl Iterator<Item = &'a ParseIssue> {
        self.issues
            .iter()
            .filter(move |issue| issue.attribute == attribute)
    }

    pub fn merge(&mut self, other: ParseReport) {
        self.issues.extend(other.issues);
    }
}
