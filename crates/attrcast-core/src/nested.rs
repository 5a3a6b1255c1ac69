use serde_json::Value;
use std::fmt;
use std::rc::Rc;

use crate::collection::Collection;
use crate::error::Result;
use crate::record::Record;

/// Produces the instance for a pending slot on first access. Fallible
/// because record construction can run defaults through a validator.
pub type NestedFactory = Rc<dyn Fn() -> Result<NestedInstance>>;

/// A nested record or collection owned by a parent record for its lifetime.
pub enum NestedInstance {
    Record(Box<Record>),
    Collection(Box<Collection>),
}

impl NestedInstance {
    pub fn kind(&self) -> &'static str {
        match self {
            NestedInstance::Record(_) => "record",
            NestedInstance::Collection(_) => "collection",
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            NestedInstance::Record(record) => Some(record),
            NestedInstance::Collection(_) => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            NestedInstance::Record(record) => Some(record),
            NestedInstance::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            NestedInstance::Collection(collection) => Some(collection),
            NestedInstance::Record(_) => None,
        }
    }

    pub fn as_collection_mut(&mut self) -> Option<&mut Collection> {
        match self {
            NestedInstance::Collection(collection) => Some(collection),
            NestedInstance::Record(_) => None,
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        match self {
            NestedInstance::Record(record) => record.to_json(),
            NestedInstance::Collection(collection) => collection.to_json(),
        }
    }

    pub(crate) fn teardown(&mut self) {
        match self {
            NestedInstance::Record(record) => record.teardown(),
            NestedInstance::Collection(collection) => collection.teardown(),
        }
    }
}

impl fmt::Debug for NestedInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NestedInstance::Record(record) => f.debug_tuple("Record").field(record).finish(),
            NestedInstance::Collection(collection) => {
                f.debug_tuple("Collection").field(collection).finish()
            }
        }
    }
}

/// Slot state for one `collection`/`model` tagged attribute. Starts out
/// pending with the factory declared on the record type; the first access
/// materializes the instance and the transition is one-way.
pub enum NestedSlot {
    Pending(NestedFactory),
    Ready(NestedInstance),
}

impl NestedSlot {
    /// Run the factory if the slot is still pending. On factory failure the
    /// slot stays pending.
    pub(crate) fn ensure(&mut self) -> Result<()> {
        if let NestedSlot::Pending(factory) = &*self {
            let instance = factory()?;
            *self = NestedSlot::Ready(instance);
        }
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, NestedSlot::Ready(_))
    }

    pub fn ready(&self) -> Option<&NestedInstance> {
        match self {
            NestedSlot::Ready(instance) => Some(instance),
            NestedSlot::Pending(_) => None,
        }
    }

    pub(crate) fn ready_mut(&mut self) -> Option<&mut NestedInstance> {
        match self {
            NestedSlot::Ready(instance) => Some(instance),
            NestedSlot::Pending(_) => None,
        }
    }

    pub(crate) fn teardown(&mut self) {
        if let NestedSlot::Ready(instance) = self {
            instance.teardown();
        }
    }
}

impl fmt::Debug for NestedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NestedSlot::Pending(_) => f.write_str("NestedSlot::Pending"),
            NestedSlot::Ready(instance) => {
                write!(f, "NestedSlot::Ready({})", instance.kind())
            }
        }
    }
}
