use attrcast_model::AttrValue;
use std::fmt;

/// Notification delivered to listeners. Carries the event data only, never a
/// borrow of the record, so handlers cannot re-enter the mutation that is
/// emitting them.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    /// One attribute was assigned or unset through the typed setter.
    /// `value` is `None` when the attribute was unset.
    AttributeChanged {
        attribute: String,
        value: Option<AttrValue>,
    },
    /// The generic notification that closes every bulk set.
    Changed,
    /// The record was destroyed, either locally or confirmed by the server.
    Destroyed,
}

impl RecordEvent {
    /// Attribute name for per-attribute events.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            RecordEvent::AttributeChanged { attribute, .. } => Some(attribute),
            _ => None,
        }
    }
}

/// What a listener wants delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    All,
    /// Changes of one named attribute.
    Attribute(String),
    /// The generic change notification only.
    Changed,
    Destroyed,
}

impl EventFilter {
    pub fn attribute(name: impl Into<String>) -> Self {
        EventFilter::Attribute(name.into())
    }

    fn matches(&self, event: &RecordEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Attribute(name) => event.attribute() == Some(name.as_str()),
            EventFilter::Changed => matches!(event, RecordEvent::Changed),
            EventFilter::Destroyed => matches!(event, RecordEvent::Destroyed),
        }
    }
}

/// Handle returned by subscribe; pass back to `off` to detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Callback = Box<dyn FnMut(&RecordEvent)>;

struct Listener {
    id: u64,
    filter: EventFilter,
    callback: Callback,
}

/// Listener registry for one record. Listeners run in registration order;
/// detaching inside a callback takes effect from the next emission.
pub(crate) struct Emitter {
    next_id: u64,
    listeners: Vec<Listener>,
}

impl Emitter {
    pub(crate) fn new() -> Self {
        Emitter {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    pub(crate) fn on(&mut self, filter: EventFilter, callback: Callback) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            filter,
            callback,
        });
        Subscription(id)
    }

    pub(crate) fn off(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != subscription.0);
        self.listeners.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.listeners.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn emit(&mut self, event: &RecordEvent) {
        for listener in &mut self.listeners {
            if listener.filter.matches(event) {
                (listener.callback)(event);
            }
        }
    }

    pub(crate) fn emit_all(&mut self, events: &[RecordEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
