use attrcast_model::AttrValue;
use indexmap::IndexMap;

use crate::record::AttrMap;

/// One attribute difference between a prior view and the current container.
/// `None` means the attribute was absent on that side.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub previous: Option<AttrValue>,
    pub current: Option<AttrValue>,
}

/// Consolidated change tracking for a record.
///
/// Two views over the same container: `saved` is the previous-snapshot, an
/// independent copy captured immediately before the first unsaved mutation
/// since the last load/save boundary; `last_set` is the state before the most
/// recent bulk set. Exactly one snapshot is outstanding at a time; clearing
/// nulls it rather than stacking another.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    saved: Option<AttrMap>,
    last_set: AttrMap,
}

impl ChangeTracker {
    /// Capture the snapshot unless one is already outstanding.
    pub(crate) fn capture_saved(&mut self, current: &AttrMap) {
        if self.saved.is_none() {
            self.saved = Some(current.clone());
        }
    }

    pub(crate) fn begin_set(&mut self, current: &AttrMap) {
        self.last_set = current.clone();
    }

    pub(crate) fn clear_saved(&mut self) {
        self.saved = None;
    }

    /// Load/save boundary: no snapshot, last-set view equals the container.
    pub(crate) fn reset(&mut self, current: &AttrMap) {
        self.saved = None;
        self.last_set = current.clone();
    }

    pub fn saved(&self) -> Option<&AttrMap> {
        self.saved.as_ref()
    }

    /// Snapshot value of one attribute, if a snapshot is outstanding.
    pub fn previous(&self, name: &str) -> Option<&AttrValue> {
        self.saved.as_ref().and_then(|saved| saved.get(name))
    }

    pub fn changed_since_save(&self, current: &AttrMap) -> IndexMap<String, Change> {
        match &self.saved {
            Some(saved) => diff(saved, current),
            None => IndexMap::new(),
        }
    }

    pub fn changed_since_set(&self, current: &AttrMap) -> IndexMap<String, Change> {
        diff(&self.last_set, current)
    }

    pub fn has_unsaved_changes(&self, current: &AttrMap) -> bool {
        self.saved.as_ref().is_some_and(|saved| saved != current)
    }
}

fn diff(before: &AttrMap, after: &AttrMap) -> IndexMap<String, Change> {
    let mut changes = IndexMap::new();
    for (name, previous) in before {
        let current = after.get(name);
        if current != Some(previous) {
            changes.insert(
                name.clone(),
                Change {
                    previous: Some(previous.clone()),
                    current: current.cloned(),
                },
            );
        }
    }
    for (name, current) in after {
        if !before.contains_key(name) {
            changes.insert(
                name.clone(),
                Change {
                    previous: None,
                    current: Some(current.clone()),
                },
            );
        }
    }
    changes
}
