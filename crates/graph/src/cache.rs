//! Memoized property lookup over schema hierarchies.
//!
//! Each schema gets one cache per property kind. A miss scans the next
//! unscanned hierarchy level, recording every name found there; names
//! already recorded keep their first (most derived) location. Once the
//! root schema has been scanned the cache is exhausted and misses are final.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::trace;

use crate::schema::{Handle, PropertyKind, Schema};

#[derive(Debug, Default)]
struct LevelScan {
    found: HashMap<&'static str, Handle>,
    scanned: usize,
    exhausted: bool,
}

impl LevelScan {
    fn lookup(&mut self, schema: &Schema, kind: PropertyKind, name: &str) -> Option<Handle> {
        if let Some(handle) = self.found.get(name) {
            return Some(*handle);
        }
        while !self.exhausted {
            let Some(level) = schema.ancestor(self.scanned) else {
                self.exhausted = true;
                trace!(schema = schema.name(), ?kind, levels = self.scanned, "property cache exhausted");
                break;
            };
            for (index, property) in level.properties(kind).enumerate() {
                if let Entry::Vacant(slot) = self.found.entry(property) {
                    slot.insert(Handle { depth: self.scanned, index });
                }
            }
            self.scanned += 1;
            if let Some(handle) = self.found.get(name) {
                return Some(*handle);
            }
        }
        None
    }
}

/// Property caches of one traversal, keyed by schema identity.
#[derive(Debug, Default)]
pub(crate) struct PropertyCache {
    schemas: HashMap<(usize, PropertyKind), LevelScan>,
}

impl PropertyCache {
    pub(crate) fn lookup(&mut self, schema: &'static Schema, kind: PropertyKind, name: &str) -> Option<Handle> {
        let identity = std::ptr::from_ref(schema).addr();
        self.schemas.entry((identity, kind)).or_default().lookup(schema, kind, name)
    }

    #[cfg(test)]
    fn scanned(&self, schema: &'static Schema, kind: PropertyKind) -> Option<(usize, bool)> {
        let identity = std::ptr::from_ref(schema).addr();
        self.schemas.get(&(identity, kind)).map(|scan| (scan.scanned, scan.exhausted))
    }
}
