//! Typed attribute records with change tracking and persistence wrappers.
//!
//! This crate is the runtime for declarative record types: attributes are
//! declared once in a type map, and every assignment runs through the same
//! pipeline of coercion, validation, application and change notification.
//!
//! # Features
//!
//! - Tag-driven coercion of raw JSON into typed attribute values
//! - Per-attribute and generic change notifications
//! - Previous-snapshot capture with rollback via [`Record::restore`]
//! - Nested records and collections, materialized lazily per slot
//! - Transport-agnostic fetch/save/destroy with wait semantics
//! - Lenient or strict handling of unknown and unconvertible attributes
//!
//! # Example
//!
//! ```
//! use attrcast_core::{AttrType, Record, RecordType, TypeMap};
//! use serde_json::json;
//! use std::rc::Rc;
//!
//! let types = TypeMap::builder()
//!     .attr("id", AttrType::Number)
//!     .attr("title", AttrType::String)
//!     .attr("due", AttrType::Date)
//!     .build()
//!     .unwrap();
//! let task = Rc::new(RecordType::builder("task", types).build().unwrap());
//!
//! let mut record = Record::with_attributes(
//!     Rc::clone(&task),
//!     json!({"id": "7", "title": "write docs", "due": "2024-01-15"}),
//! )
//! .unwrap();
//!
//! // the numeric string and the date were coerced on the way in
//! assert_eq!(record.to_json()["id"], json!(7));
//! assert_eq!(record.to_json()["due"], json!("2024-01-15T00:00:00.000Z"));
//!
//! // edits are tracked against the state before the first of them
//! record.set("title", "revise docs").unwrap();
//! assert!(record.has_unsaved_changes());
//! record.restore();
//! assert_eq!(record.to_json()["title"], json!("write docs"));
//! ```
//!
//! # Strictness
//!
//! Lenient records drop what they cannot convert and report it; strict
//! records refuse the whole set:
//!
//! ```
//! use attrcast_core::{AttrType, Record, RecordError, RecordType, SetOptions, TypeMap};
//! use serde_json::json;
//! use std::rc::Rc;
//!
//! let types = TypeMap::builder().attr("age", AttrType::Number).build().unwrap();
//! let person = Rc::new(RecordType::builder("person", types).strict().build().unwrap());
//! let mut record = Record::new(person).unwrap();
//!
//! let err = record
//!     .set_json(json!({"nickname": "zed"}), SetOptions::parsed())
//!     .unwrap_err();
//! assert!(matches!(err, RecordError::Coerce(_)));
//! ```

pub mod coerce;
mod collection;
mod error;
mod events;
mod nested;
mod record;
mod sync;
mod tracker;
mod url;

// Re-export error types
pub use error::{RecordError, Result};

// Re-export the record machinery
pub use record::{
    AttrMap, Record, RecordOptions, RecordType, RecordTypeBuilder, SetOptions, Validator,
};

// Re-export collections and nested slots
pub use collection::Collection;
pub use nested::{NestedFactory, NestedInstance, NestedSlot};

// Re-export change tracking views
pub use tracker::Change;

// Re-export events
pub use events::{EventFilter, RecordEvent, Subscription};

// Re-export persistence types
pub use sync::{
    SyncError, SyncMethod, SyncOptions, SyncOutcome, SyncRequest, SyncToken, Transport,
};

// Re-export url templates
pub use url::{UrlError, UrlTemplate};

// Convenience re-exports of the definitions crate
pub use attrcast_model::{AttrType, AttrValue, ParseIssue, ParseReport, Strictness, TypeMap};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
