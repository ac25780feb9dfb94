//! Cross-traversal cache of binding tables.
//!
//! Tables are published behind a read-write lock and never change once
//! visible. Construction is single flight: a build lock serializes all
//! builders, and the cache is re-checked under it, so each
//! `(source kind, visitor type)` pair is constructed exactly once while
//! lookups of published tables proceed without waiting.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::binding::BindingTable;
use crate::error::BindingError;
use crate::source::SourceKind;
use crate::visitor::{Bind, VisitorType};

type TableKey = (TypeId, TypeId);
type AnyTable = Arc<dyn Any + Send + Sync>;

/// Process- or caller-owned store of binding tables, keyed by source kind
/// and visitor type.
#[derive(Default)]
pub struct Session {
    tables: RwLock<HashMap<TableKey, AnyTable>>,
    build_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached table of `V` for kind `K`, building it on first use.
    pub fn register<K: SourceKind, V: Bind<K>>(&self) -> Result<Arc<BindingTable<K>>, BindingError> {
        self.get_or_build(VisitorType::<K>::of::<V>())
    }

    /// Returns the cached table for `ty`, building and publishing it (and the
    /// tables of all statically reachable nested visitor types) on a miss.
    pub fn get_or_build<K: SourceKind>(
        &self,
        ty: VisitorType<K>,
    ) -> Result<Arc<BindingTable<K>>, BindingError> {
        if let Some(table) = self.table::<K>(ty.id()) {
            return Ok(table);
        }

        let _guard = self.build_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = self.table::<K>(ty.id()) {
            return Ok(table);
        }

        let mut pending = vec![ty];
        let mut built: Vec<(TypeId, Arc<BindingTable<K>>)> = Vec::new();
        while let Some(next) = pending.pop() {
            if built.iter().any(|(id, _)| *id == next.id()) || self.table::<K>(next.id()).is_some() {
                continue;
            }
            let result = next.build()?;
            self.builds.fetch_add(1, Ordering::Relaxed);
            debug!(
                kind = K::NAME,
                visitor = next.name(),
                bindings = result.table.len(),
                "built binding table"
            );
            pending.extend(result.nested);
            built.push((next.id(), Arc::new(result.table)));
        }

        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        for (id, table) in built {
            if let Entry::Vacant(slot) = tables.entry((TypeId::of::<K>(), id)) {
                slot.insert(table);
            }
        }
        drop(tables);

        self.table::<K>(ty.id())
            .ok_or_else(|| BindingError::invalid_key(ty.name(), "table vanished while publishing"))
    }

    /// Late registration for a visitor type first seen as a callback result.
    ///
    /// Idempotent: a type registered before is returned from the cache.
    pub fn register_runtime_type<K: SourceKind>(
        &self,
        ty: VisitorType<K>,
    ) -> Result<Arc<BindingTable<K>>, BindingError> {
        if let Some(table) = self.table::<K>(ty.id()) {
            return Ok(table);
        }
        trace!(kind = K::NAME, visitor = ty.name(), "registering visitor type discovered at run time");
        self.get_or_build(ty)
    }

    /// Published table of the visitor type `visitor` for kind `K`, if any.
    pub fn table<K: SourceKind>(&self, visitor: TypeId) -> Option<Arc<BindingTable<K>>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let table = tables.get(&(TypeId::of::<K>(), visitor))?;
        Arc::clone(table).downcast::<BindingTable<K>>().ok()
    }

    pub fn contains<K: SourceKind, V: Bind<K>>(&self) -> bool {
        self.table::<K>(TypeId::of::<V>()).is_some()
    }

    /// Drops every cached table.
    pub fn clear(&self) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        debug!(tables = tables.len(), "clearing binding tables");
        tables.clear();
    }

    /// Drops the cached tables of one source kind.
    pub fn clear_kind<K: SourceKind>(&self) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.retain(|(kind, _), _| *kind != TypeId::of::<K>());
        debug!(kind = K::NAME, remaining = tables.len(), "cleared binding tables");
    }

    /// Number of published tables across all kinds.
    pub fn len(&self) -> usize {
        self.tables.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tables constructed since the session was created.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("tables", &self.len()).field("builds", &self.builds()).finish()
    }
}
