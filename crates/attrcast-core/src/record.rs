//! Typed records and their declarations.
//!
//! A [`RecordType`] is the static description of one kind of record: the
//! type map, the identity attribute, defaults, strictness, an optional
//! validator, nested slot factories and url templates. A [`Record`] is one
//! mutable instance of a type, holding coerced attribute values, lazily
//! materialized nested instances, the change tracker and the persistence
//! state.
//!
//! All mutation funnels through [`Record::set_json`], which runs the full
//! pipeline: payload promotion, snapshot capture, coercion, validation,
//! application in type-table order and change notification.

use attrcast_model::{AttrType, AttrValue, ParseReport, SchemaError, Strictness, TypeMap};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;
use tracing::warn;

use crate::coerce::{CoercedValue, coerce_attributes, promote_bare};
use crate::collection::Collection;
use crate::error::{RecordError, Result};
use crate::events::{Emitter, EventFilter, RecordEvent, Subscription};
use crate::nested::{NestedFactory, NestedInstance, NestedSlot};
use crate::sync::{PendingSync, SyncMethod, SyncOptions, SyncOutcome, SyncRequest, SyncToken, Transport};
use crate::tracker::{Change, ChangeTracker};
use crate::url::LazyUrl;

/// Attribute container: name to coerced value, in first-assignment order.
pub type AttrMap = IndexMap<String, AttrValue>;

/// Whole-record validation hook. Receives the candidate flat state a set
/// would produce (nested payloads excluded) and rejects it with a message.
pub type Validator = Rc<dyn Fn(&AttrMap) -> std::result::Result<(), String>>;

const DEFAULT_ID_ATTRIBUTE: &str = "id";

struct NestedDecl {
    attribute: String,
    factory: NestedFactory,
}

/// Static declaration shared by every record of one kind.
///
/// Built once through [`RecordType::builder`] and held behind an [`Rc`] by
/// records, collections and nested factories alike.
pub struct RecordType {
    name: String,
    types: TypeMap,
    id_attribute: String,
    defaults: Map<String, Value>,
    parse_on_create: bool,
    wait_default: bool,
    strictness: Strictness,
    validator: Option<Validator>,
    nested: Vec<NestedDecl>,
    url: Option<LazyUrl>,
    url_root: Option<LazyUrl>,
}

impl RecordType {
    pub fn builder(name: impl Into<String>, types: TypeMap) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.into(),
            types,
            id_attribute: None,
            defaults: None,
            parse_on_create: true,
            wait_default: true,
            strictness: Strictness::default(),
            validator: None,
            nested: Vec::new(),
            url: None,
            url_root: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &TypeMap {
        &self.types
    }

    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    pub fn defaults(&self) -> &Map<String, Value> {
        &self.defaults
    }

    pub fn parse_on_create(&self) -> bool {
        self.parse_on_create
    }

    pub fn wait_default(&self) -> bool {
        self.wait_default
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    pub(crate) fn factory_for(&self, name: &str) -> Option<&NestedFactory> {
        self.nested
            .iter()
            .find(|decl| decl.attribute == name)
            .map(|decl| &decl.factory)
    }

    pub(crate) fn url_spec(&self) -> Option<&LazyUrl> {
        self.url.as_ref()
    }

    pub(crate) fn url_root_spec(&self) -> Option<&LazyUrl> {
        self.url_root.as_ref()
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("id_attribute", &self.id_attribute)
            .field("attributes", &self.types.len())
            .field("strictness", &self.strictness)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RecordType`]. `build` verifies that every
/// `collection`/`model` tagged attribute has exactly one nested declaration
/// and that every declaration points at such an attribute.
pub struct RecordTypeBuilder {
    name: String,
    types: TypeMap,
    id_attribute: Option<String>,
    defaults: Option<Value>,
    parse_on_create: bool,
    wait_default: bool,
    strictness: Strictness,
    validator: Option<Validator>,
    nested: Vec<NestedDecl>,
    url: Option<String>,
    url_root: Option<String>,
}

impl RecordTypeBuilder {
    pub fn id_attribute(mut self, name: impl Into<String>) -> Self {
        self.id_attribute = Some(name.into());
        self
    }

    /// Attribute defaults merged under every construction payload. Must be a
    /// JSON object; values run through the same pipeline as the payload, so
    /// the container stays uniformly typed.
    pub fn defaults(mut self, defaults: Value) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn parse_on_create(mut self, parse: bool) -> Self {
        self.parse_on_create = parse;
        self
    }

    pub fn wait_default(mut self, wait: bool) -> Self {
        self.wait_default = wait;
        self
    }

    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn strict(self) -> Self {
        self.strictness(Strictness::Strict)
    }

    pub fn validator(
        mut self,
        validator: impl Fn(&AttrMap) -> std::result::Result<(), String> + 'static,
    ) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }

    /// Declare a `model` tagged attribute backed by a record of `rtype`.
    pub fn nested_record(self, attribute: impl Into<String>, rtype: Rc<RecordType>) -> Self {
        self.nested_with(attribute, move || {
            Record::new(Rc::clone(&rtype)).map(|record| NestedInstance::Record(Box::new(record)))
        })
    }

    /// Declare a `collection` tagged attribute backed by a collection of
    /// `rtype` rows.
    pub fn nested_collection(self, attribute: impl Into<String>, rtype: Rc<RecordType>) -> Self {
        self.nested_with(attribute, move || {
            Ok(NestedInstance::Collection(Box::new(Collection::new(
                Rc::clone(&rtype),
            ))))
        })
    }

    /// Declare a nested slot with a custom factory. The factory runs on
    /// first access to the slot, once per record.
    pub fn nested_with(
        mut self,
        attribute: impl Into<String>,
        factory: impl Fn() -> Result<NestedInstance> + 'static,
    ) -> Self {
        self.nested.push(NestedDecl {
            attribute: attribute.into(),
            factory: Rc::new(factory),
        });
        self
    }

    /// Url template resolved against the record's attributes, `:name`
    /// segments substituting the named attribute.
    pub fn url(mut self, template: impl Into<String>) -> Self {
        self.url = Some(template.into());
        self
    }

    /// Base url; the record appends `/<id>` when it has an identity.
    pub fn url_root(mut self, template: impl Into<String>) -> Self {
        self.url_root = Some(template.into());
        self
    }

    pub fn build(self) -> std::result::Result<RecordType, SchemaError> {
        let defaults = match self.defaults {
            None => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(SchemaError::InvalidDefaults),
        };
        let mut seen: Vec<&str> = Vec::new();
        for decl in &self.nested {
            let tagged = self
                .types
                .get(&decl.attribute)
                .is_some_and(|tag| tag.is_nested());
            if !tagged {
                return Err(SchemaError::NestedDeclMismatch {
                    attribute: decl.attribute.clone(),
                });
            }
            if seen.contains(&decl.attribute.as_str()) {
                return Err(SchemaError::DuplicateAttribute(decl.attribute.clone()));
            }
            seen.push(&decl.attribute);
        }
        for entry in self.types.nested() {
            if !seen.contains(&entry.name.as_str()) {
                return Err(SchemaError::MissingNestedDecl {
                    attribute: entry.name.clone(),
                    tag: entry.attr_type,
                });
            }
        }
        Ok(RecordType {
            name: self.name,
            types: self.types,
            id_attribute: self
                .id_attribute
                .unwrap_or_else(|| DEFAULT_ID_ATTRIBUTE.to_string()),
            defaults,
            parse_on_create: self.parse_on_create,
            wait_default: self.wait_default,
            strictness: self.strictness,
            validator: self.validator,
            nested: self.nested,
            url: self.url.map(LazyUrl::new),
            url_root: self.url_root.map(LazyUrl::new),
        })
    }
}

/// Per-instance overrides applied at construction.
#[derive(Default)]
pub struct RecordOptions {
    /// Run the construction payload through coercion. Defaults to the
    /// type's `parse_on_create`.
    pub parse: Option<bool>,
    pub id_attribute: Option<String>,
    pub wait_default: Option<bool>,
    pub strictness: Option<Strictness>,
    pub transport: Option<Rc<dyn Transport>>,
}

/// Per-call options for the set pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions {
    /// Coerce values and drop unknowns (default false: verbatim assignment).
    /// Governs the flat container only; nested payloads always re-parse.
    pub parse: Option<bool>,
    /// Remove the named attributes instead of assigning them.
    pub unset: bool,
    /// Suppress all change notifications for this call.
    pub silent: bool,
}

impl SetOptions {
    pub fn parsed() -> Self {
        SetOptions {
            parse: Some(true),
            ..SetOptions::default()
        }
    }

    pub fn silenced(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// One mutable instance of a [`RecordType`].
pub struct Record {
    rtype: Rc<RecordType>,
    id_attribute: String,
    wait_default: bool,
    strictness: Strictness,
    parse_on_create: bool,
    attributes: AttrMap,
    /// Mirror of the identity attribute; `None` while unset or null.
    id: Option<AttrValue>,
    nested: IndexMap<String, NestedSlot>,
    tracker: ChangeTracker,
    events: Emitter,
    transport: Option<Rc<dyn Transport>>,
    pending: Vec<PendingSync>,
    next_token: u64,
}

impl Record {
    /// Empty record: defaults applied, no snapshot, no change history.
    pub fn new(rtype: Rc<RecordType>) -> Result<Self> {
        Self::with_options(rtype, None, RecordOptions::default())
    }

    /// Record constructed from a payload, parsed per the type's
    /// `parse_on_create`.
    pub fn with_attributes(rtype: Rc<RecordType>, raw: Value) -> Result<Self> {
        Self::with_options(rtype, Some(raw), RecordOptions::default())
    }

    pub fn with_options(
        rtype: Rc<RecordType>,
        raw: Option<Value>,
        options: RecordOptions,
    ) -> Result<Self> {
        let id_attribute = options
            .id_attribute
            .unwrap_or_else(|| rtype.id_attribute().to_string());
        let parse = options.parse.unwrap_or(rtype.parse_on_create());
        let mut initial = rtype.defaults().clone();
        if let Some(raw) = raw {
            for (name, value) in promote_bare(rtype.types(), &id_attribute, raw)? {
                initial.insert(name, value);
            }
        }
        let mut nested = IndexMap::new();
        for entry in rtype.types().nested() {
            let factory = rtype
                .factory_for(&entry.name)
                .ok_or_else(|| RecordError::MissingNested(entry.name.clone()))?;
            nested.insert(entry.name.clone(), NestedSlot::Pending(Rc::clone(factory)));
        }
        let mut record = Record {
            id_attribute,
            wait_default: options.wait_default.unwrap_or(rtype.wait_default()),
            strictness: options.strictness.unwrap_or(rtype.strictness()),
            parse_on_create: rtype.parse_on_create(),
            rtype,
            attributes: AttrMap::new(),
            id: None,
            nested,
            tracker: ChangeTracker::default(),
            events: Emitter::new(),
            transport: options.transport,
            pending: Vec::new(),
            next_token: 0,
        };
        if !initial.is_empty() {
            record.set_json(
                Value::Object(initial),
                SetOptions {
                    parse: Some(parse),
                    silent: true,
                    ..SetOptions::default()
                },
            )?;
        }
        // construction is not a change
        record.tracker.reset(&record.attributes);
        Ok(record)
    }

    pub fn record_type(&self) -> &Rc<RecordType> {
        &self.rtype
    }

    pub fn id(&self) -> Option<&AttrValue> {
        self.id.as_ref()
    }

    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    /// A record is new until its identity attribute holds a non-null value.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn attributes(&self) -> &AttrMap {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// True when the attribute is present and not null.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| !value.is_null())
    }

    pub fn set_transport(&mut self, transport: Rc<dyn Transport>) {
        self.transport = Some(transport);
    }

    // ---- events ------------------------------------------------------------

    pub fn on(
        &mut self,
        filter: EventFilter,
        callback: impl FnMut(&RecordEvent) + 'static,
    ) -> Subscription {
        self.events.on(filter, Box::new(callback))
    }

    pub fn off(&mut self, subscription: Subscription) -> bool {
        self.events.off(subscription)
    }

    pub fn off_all(&mut self) {
        self.events.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.events.len()
    }

    // ---- mutation ----------------------------------------------------------

    /// Assign one attribute without coercion.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<ParseReport> {
        self.set_with(name, value, SetOptions::default())
    }

    pub fn set_with(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        options: SetOptions,
    ) -> Result<ParseReport> {
        let mut map = Map::new();
        map.insert(name.to_string(), value.into());
        self.set_json(Value::Object(map), options)
    }

    /// Remove one attribute, notifying its listeners with a `None` value.
    pub fn unset(&mut self, name: &str) -> Result<ParseReport> {
        self.set_with(
            name,
            Value::Null,
            SetOptions {
                unset: true,
                ..SetOptions::default()
            },
        )
    }

    /// The bulk set pipeline.
    ///
    /// Promotes the payload, captures the previous-snapshot if none is held,
    /// coerces the whole batch, consults the validator on the candidate
    /// state, routes nested payloads, then applies known attributes in
    /// type-table order and unknowns in input order before emitting the
    /// queued notifications. Every fallible step runs ahead of the first
    /// flat assignment: a call that returns an error has not touched the
    /// attribute container. Returns the report of attributes lenient
    /// parsing dropped.
    pub fn set_json(&mut self, raw: Value, options: SetOptions) -> Result<ParseReport> {
        let rtype = Rc::clone(&self.rtype);
        let raw_map = promote_bare(rtype.types(), &self.id_attribute, raw)?;
        self.tracker.begin_set(&self.attributes);
        self.tracker.capture_saved(&self.attributes);
        let parse = options.parse.unwrap_or(false);
        let batch = coerce_attributes(rtype.types(), raw_map, self.strictness, parse)?;
        if let Some(validator) = rtype.validator() {
            let candidate = self.validation_candidate(&batch.known, &batch.unknown, options.unset);
            validator(&candidate).map_err(RecordError::Validation)?;
        }
        let mut known = batch.known;
        // flat assignments wait until every nested payload was accepted
        let mut staged = Vec::new();
        for entry in rtype.types().entries() {
            let Some(slot) = known.shift_remove(&entry.name) else {
                continue;
            };
            match slot {
                CoercedValue::Plain(value) => {
                    let next = if options.unset { None } else { Some(value) };
                    staged.push((entry.name.as_str(), next));
                }
                CoercedValue::Nested(payload) => {
                    if !options.unset {
                        self.apply_nested(&entry.name, entry.attr_type, payload)?;
                    }
                }
            }
        }
        let mut queued = Vec::new();
        for (name, value) in staged {
            self.apply_plain(name, value, &mut queued);
        }
        for (name, value) in batch.unknown {
            let next = if options.unset {
                None
            } else {
                Some(AttrValue::from(value))
            };
            self.apply_plain(&name, next, &mut queued);
        }
        if !options.silent {
            queued.push(RecordEvent::Changed);
            self.events.emit_all(&queued);
        }
        Ok(batch.report)
    }

    fn validation_candidate(
        &self,
        known: &IndexMap<String, CoercedValue>,
        unknown: &[(String, Value)],
        unset: bool,
    ) -> AttrMap {
        let mut candidate = self.attributes.clone();
        for (name, slot) in known {
            let CoercedValue::Plain(value) = slot else {
                continue;
            };
            if unset {
                candidate.shift_remove(name);
            } else {
                candidate.insert(name.clone(), value.clone());
            }
        }
        for (name, value) in unknown {
            if unset {
                candidate.shift_remove(name);
            } else {
                candidate.insert(name.clone(), AttrValue::from(value.clone()));
            }
        }
        candidate
    }

    fn apply_plain(&mut self, name: &str, value: Option<AttrValue>, queued: &mut Vec<RecordEvent>) {
        let old = match &value {
            Some(next) => self.attributes.insert(name.to_string(), next.clone()),
            None => self.attributes.shift_remove(name),
        };
        if name == self.id_attribute {
            self.id = value.clone().filter(|next| !next.is_null());
        }
        if old != value {
            queued.push(RecordEvent::AttributeChanged {
                attribute: name.to_string(),
                value,
            });
        }
    }

    /// Nested instances always re-parse their payloads; the `parse` flag of
    /// the surrounding set only governs the flat container.
    fn apply_nested(&mut self, name: &str, tag: AttrType, payload: Value) -> Result<()> {
        let instance = self.nested_instance(name)?;
        match (tag, instance) {
            (AttrType::Collection, NestedInstance::Collection(collection)) => {
                let items = match payload {
                    Value::Array(items) => items,
                    // null resets to empty; other shapes were rejected upstream
                    _ => Vec::new(),
                };
                collection.reset(items, true)
            }
            (AttrType::Model, NestedInstance::Record(record)) => {
                if payload.is_null() {
                    return Ok(());
                }
                record.set_json(payload, SetOptions::parsed()).map(drop)
            }
            _ => Err(RecordError::NestedKindMismatch(name.to_string())),
        }
    }

    // ---- change tracking ---------------------------------------------------

    /// Attributes changed since the previous-snapshot was captured.
    pub fn changed_since_save(&self) -> IndexMap<String, Change> {
        self.tracker.changed_since_save(&self.attributes)
    }

    /// Attributes changed by the most recent set call.
    pub fn changed_since_set(&self) -> IndexMap<String, Change> {
        self.tracker.changed_since_set(&self.attributes)
    }

    pub fn previous(&self, name: &str) -> Option<&AttrValue> {
        self.tracker.previous(name)
    }

    pub fn previous_attributes(&self) -> Option<&AttrMap> {
        self.tracker.saved()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tracker.has_unsaved_changes(&self.attributes)
    }

    /// Put every snapshot attribute back, then drop the snapshot. Skips the
    /// validator: the snapshot was a valid state when captured. A record
    /// without a snapshot is left untouched.
    pub fn restore(&mut self) {
        let Some(saved) = self.tracker.saved().cloned() else {
            return;
        };
        let mut queued = Vec::new();
        for (name, previous) in &saved {
            if self.attributes.get(name) != Some(previous) {
                self.apply_plain(name, Some(previous.clone()), &mut queued);
            }
        }
        if !queued.is_empty() {
            queued.push(RecordEvent::Changed);
            self.events.emit_all(&queued);
        }
        self.tracker.reset(&self.attributes);
    }

    /// Declare the current state saved, as a successful waited sync does.
    pub fn mark_synced(&mut self) {
        self.tracker.clear_saved();
    }

    // ---- nested slots ------------------------------------------------------

    /// Mutable access to a nested instance, materializing it on first use.
    pub fn nested(&mut self, name: &str) -> Result<&mut NestedInstance> {
        self.nested_instance(name)
    }

    /// The nested instance if it was already materialized.
    pub fn peek_nested(&self, name: &str) -> Option<&NestedInstance> {
        self.nested.get(name).and_then(NestedSlot::ready)
    }

    /// Swap in a pre-built nested instance. The kind must match the
    /// attribute's tag; the displaced instance is torn down.
    pub fn replace_nested(&mut self, name: &str, instance: NestedInstance) -> Result<()> {
        let Some(tag) = self.rtype.types().get(name) else {
            return Err(RecordError::MissingNested(name.to_string()));
        };
        let matches = matches!(
            (tag, &instance),
            (AttrType::Collection, NestedInstance::Collection(_))
                | (AttrType::Model, NestedInstance::Record(_))
        );
        if !matches {
            return Err(RecordError::NestedKindMismatch(name.to_string()));
        }
        let slot = self
            .nested
            .get_mut(name)
            .ok_or_else(|| RecordError::MissingNested(name.to_string()))?;
        slot.teardown();
        *slot = NestedSlot::Ready(instance);
        Ok(())
    }

    fn nested_instance(&mut self, name: &str) -> Result<&mut NestedInstance> {
        let slot = self
            .nested
            .get_mut(name)
            .ok_or_else(|| RecordError::MissingNested(name.to_string()))?;
        slot.ensure()?;
        slot.ready_mut()
            .ok_or_else(|| RecordError::MissingNested(name.to_string()))
    }

    // ---- serialization -----------------------------------------------------

    /// Flat attributes plus the serialization of every materialized nested
    /// instance. Pending slots are omitted: they were never touched, so
    /// they carry no state worth writing.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for (name, value) in &self.attributes {
            out.insert(name.clone(), value.to_json());
        }
        for (name, slot) in &self.nested {
            if let Some(instance) = slot.ready() {
                out.insert(name.clone(), instance.to_json());
            }
        }
        Value::Object(out)
    }

    /// Fresh record of the same type built from this record's
    /// serialization. Listeners, snapshots and pending operations do not
    /// carry over.
    pub fn duplicate(&self) -> Result<Record> {
        Record::with_options(
            Rc::clone(&self.rtype),
            Some(self.to_json()),
            RecordOptions {
                parse: Some(self.parse_on_create),
                id_attribute: Some(self.id_attribute.clone()),
                wait_default: Some(self.wait_default),
                strictness: Some(self.strictness),
                transport: self.transport.clone(),
            },
        )
    }

    // ---- persistence -------------------------------------------------------

    /// Resolved url of this record: the url template when declared,
    /// otherwise the url root with `/<id>` appended for saved records.
    pub fn url(&self) -> Result<String> {
        if let Some(lazy) = self.rtype.url_spec() {
            return Ok(lazy.template()?.resolve(&self.attributes)?);
        }
        if let Some(lazy) = self.rtype.url_root_spec() {
            let base = lazy.template()?.resolve(&self.attributes)?;
            return Ok(match &self.id {
                Some(id) => format!("{}/{}", base.trim_end_matches('/'), id.to_text()),
                None => base,
            });
        }
        Err(RecordError::NoUrl)
    }

    /// Dispatch a read for this record's url. Without wait the snapshot is
    /// cleared immediately; with wait it survives until the response is
    /// applied.
    pub fn fetch(&mut self, options: SyncOptions) -> Result<SyncToken> {
        let wait = options.wait.unwrap_or(self.wait_default);
        if !wait {
            self.tracker.clear_saved();
        }
        self.dispatch(SyncMethod::Read, None, wait, options)
    }

    /// Assign `attrs` (plain, like [`Record::set_json`] without parse), then
    /// dispatch a create or update carrying the full serialization.
    pub fn save(&mut self, attrs: Option<Value>, options: SyncOptions) -> Result<SyncToken> {
        if let Some(attrs) = attrs {
            self.set_json(attrs, SetOptions::default())?;
        }
        let wait = options.wait.unwrap_or(self.wait_default);
        if !wait {
            self.tracker.clear_saved();
        }
        let method = if self.is_new() {
            SyncMethod::Create
        } else {
            SyncMethod::Update
        };
        let body = Some(self.to_json());
        self.dispatch(method, body, wait, options)
    }

    /// Delete the record server-side. A record that was never saved has
    /// nothing to delete: it emits `Destroyed` locally and returns no
    /// token. Without wait the event fires at dispatch, with wait only on
    /// confirmation.
    pub fn destroy(&mut self, options: SyncOptions) -> Result<Option<SyncToken>> {
        let wait = options.wait.unwrap_or(self.wait_default);
        if self.is_new() {
            if !options.silent {
                self.events.emit(&RecordEvent::Destroyed);
            }
            return Ok(None);
        }
        if !wait && !options.silent {
            self.events.emit(&RecordEvent::Destroyed);
        }
        let token = self.dispatch(SyncMethod::Delete, None, wait, options)?;
        Ok(Some(token))
    }

    /// Deliver the outcome of a dispatched operation.
    ///
    /// Success applies the response (read/create/update, object responses
    /// only) and, for waited operations, clears the snapshot; a waited
    /// delete emits `Destroyed`. Failure is logged and leaves the record as
    /// the operation left it, snapshot included, so the caller can still
    /// [`Record::restore`].
    pub fn complete_sync(&mut self, token: SyncToken, outcome: SyncOutcome) -> Result<()> {
        let position = self
            .pending
            .iter()
            .position(|pending| pending.token == token)
            .ok_or(RecordError::UnknownSyncToken(token))?;
        let pending = self.pending.remove(position);
        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    record = %self.rtype.name(),
                    method = %pending.method,
                    error = %err,
                    "sync failed"
                );
                return Ok(());
            }
        };
        match pending.method {
            SyncMethod::Read | SyncMethod::Create | SyncMethod::Update => {
                if response.is_object() {
                    self.set_json(
                        response,
                        SetOptions {
                            parse: Some(pending.parse),
                            silent: pending.silent,
                            unset: false,
                        },
                    )?;
                }
                if pending.wait {
                    self.tracker.clear_saved();
                }
            }
            SyncMethod::Delete => {
                if pending.wait && !pending.silent {
                    self.events.emit(&RecordEvent::Destroyed);
                }
            }
        }
        Ok(())
    }

    pub fn pending_sync_count(&self) -> usize {
        self.pending.len()
    }

    fn dispatch(
        &mut self,
        method: SyncMethod,
        body: Option<Value>,
        wait: bool,
        options: SyncOptions,
    ) -> Result<SyncToken> {
        let transport = self.transport.clone().ok_or(RecordError::NoTransport)?;
        let url = self.url()?;
        let token = self.next_sync_token();
        self.pending.push(PendingSync {
            token,
            method,
            wait,
            parse: options.parse.unwrap_or(true),
            silent: options.silent,
        });
        transport.dispatch(token, SyncRequest { method, url, body });
        Ok(token)
    }

    fn next_sync_token(&mut self) -> SyncToken {
        self.next_token += 1;
        SyncToken(self.next_token)
    }

    // ---- lifecycle ---------------------------------------------------------

    /// Detach every listener, tear down nested instances and forget
    /// in-flight operations. The record stays usable as a plain value
    /// container afterwards.
    pub fn teardown(&mut self) {
        self.events.clear();
        for slot in self.nested.values_mut() {
            slot.teardown();
        }
        self.pending.clear();
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type", &self.rtype.name())
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("nested", &self.nested)
            .finish_non_exhaustive()
    }
}
