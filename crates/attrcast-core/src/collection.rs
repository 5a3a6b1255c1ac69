use attrcast_model::AttrValue;
use serde_json::Value;
use std::rc::Rc;

use crate::error::Result;
use crate::record::{Record, RecordOptions, RecordType};

/// Homogeneous ordered set of records sharing one record type.
///
/// The host boundary for nested collections is construct, reset and
/// serialize; rows are self-contained records and can be read or mutated in
/// place.
#[derive(Debug)]
pub struct Collection {
    rtype: Rc<RecordType>,
    records: Vec<Record>,
}

impl Collection {
    pub fn new(rtype: Rc<RecordType>) -> Self {
        Collection {
            rtype,
            records: Vec::new(),
        }
    }

    pub fn record_type(&self) -> &Rc<RecordType> {
        &self.rtype
    }

    /// Replace the contents with one record per item. All records are built
    /// before the old rows are dropped, so a failing item leaves the
    /// collection untouched. Old rows are torn down to detach their
    /// listeners.
    pub fn reset(&mut self, items: Vec<Value>, parse: bool) -> Result<()> {
        let mut fresh = Vec::with_capacity(items.len());
        for item in items {
            let record = Record::with_options(
                Rc::clone(&self.rtype),
                Some(item),
                RecordOptions {
                    parse: Some(parse),
                    ..RecordOptions::default()
                },
            )?;
            fresh.push(record);
        }
        self.clear();
        self.records = fresh;
        Ok(())
    }

    /// Tear down and drop every row.
    pub fn clear(&mut self) {
        for record in &mut self.records {
            record.teardown();
        }
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.records.get_mut(index)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn find_by_id(&self, id: &AttrValue) -> Option<&Record> {
        self.records.iter().find(|record| record.id() == Some(id))
    }

    /// Array of each row's serialization, in order.
    pub fn to_json(&self) -> Value {
        Value::Array(self.records.iter().map(Record::to_json).collect())
    }

    pub fn teardown(&mut self) {
        self.clear();
    }
}
