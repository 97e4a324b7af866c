//! Local cache - last known collection per resource kind
//!
//! Collections are replaced wholesale, never merged. `replace` is the only
//! mutator and is only called with the result of a successful list call.

use std::collections::HashMap;

use crate::models::{Record, RecordId, ResourceKind, ScheduleEntry};

#[derive(Debug, Default, Clone)]
pub struct LocalCache {
    collections: HashMap<ResourceKind, Vec<Record>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection for `kind`; empty if it was never loaded
    pub fn get(&self, kind: ResourceKind) -> &[Record] {
        self.collections
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn replace(&mut self, kind: ResourceKind, records: Vec<Record>) {
        tracing::debug!(kind = %kind, count = records.len(), "Cache replaced");
        self.collections.insert(kind, records);
    }

    pub fn find(&self, kind: ResourceKind, id: RecordId) -> Option<&Record> {
        self.get(kind).iter().find(|r| r.id() == id)
    }

    /// Display field of a cached record, or empty when unknown
    pub fn resolve_display_name(&self, kind: ResourceKind, id: RecordId) -> String {
        self.find(kind, id)
            .map(|r| r.display_field().to_string())
            .unwrap_or_default()
    }

    /// Name shown for the entity `entry` references in `kind`:
    /// denormalized field, then cache lookup by id, then raw field, then "".
    pub fn reference_name(&self, entry: &ScheduleEntry, kind: ResourceKind) -> String {
        if let Some(name) = entry.denormalized(kind) {
            return name.to_string();
        }
        if let Some(record) = entry.reference(kind).and_then(|id| self.find(kind, id)) {
            return record.display_field().to_string();
        }
        entry.raw(kind).unwrap_or_default().to_string()
    }

    pub fn len(&self, kind: ResourceKind) -> usize {
        self.get(kind).len()
    }
}
