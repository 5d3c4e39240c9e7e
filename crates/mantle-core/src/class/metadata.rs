//! Class Metadata Store
//!
//! Per-class (or per-object) bookkeeping kept in a side table keyed by the
//! target's [`ObjectId`], never on the target itself:
//! - `binds`: instance methods rebound on every construction
//! - `accessors`: last-installed getter/setter pair per member slot, used
//!   to resolve super halves when a later definition overrides an accessor
//! - `superclass`: fixed when the record is created
//!
//! A record created for a subclass links to its superclass record. Bind
//! names and accessor pairs resolve through that link live, so names the
//! superclass registers later are still seen by subclasses, and accessors
//! declared several levels up are found.
//!
//! The table only holds weak references to the objects it describes. Records
//! whose owner has been dropped are pruned once the table doubles in size
//! since the last prune, or on demand with [`MetadataStore::prune`]. A parent
//! record stays reachable from its subclass records after pruning.

use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::apid::MemberSlot;
use crate::object::{Object, ObjectId, WeakObject};
use crate::value::Value;

/// Table size below which dead records are left alone
const MIN_PRUNE_THRESHOLD: usize = 64;

/// Installed getter/setter pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessorPair {
    /// Installed getter
    pub getter: Option<Value>,
    /// Installed setter
    pub setter: Option<Value>,
}

/// Mutable part of a record
#[derive(Debug, Default)]
struct ClassMeta {
    /// Own bind names
    binds: IndexSet<String>,
    /// Installed accessor pairs
    accessors: FxHashMap<MemberSlot, AccessorPair>,
}

/// Metadata for a single class or object
#[derive(Debug)]
struct MetaRecord {
    owner: WeakObject,
    /// Superclass record; binds and accessors resolve through it
    parent: Option<Arc<MetaRecord>>,
    superclass: Option<WeakObject>,
    /// Built by the engine's class factory (runs bind application on construction)
    engine_class: bool,
    state: RwLock<ClassMeta>,
}

impl MetaRecord {
    /// This record followed by its ancestors
    fn chain(self: &Arc<Self>) -> impl Iterator<Item = Arc<MetaRecord>> {
        std::iter::successors(Some(self.clone()), |record| record.parent.clone())
    }
}

#[derive(Debug)]
struct Records {
    map: FxHashMap<ObjectId, Arc<MetaRecord>>,
    prune_at: usize,
}

impl Records {
    fn prune(&mut self) -> usize {
        let before = self.map.len();
        self.map.retain(|_, record| record.owner.is_alive());
        self.prune_at = (self.map.len() * 2).max(MIN_PRUNE_THRESHOLD);
        before - self.map.len()
    }
}

impl Default for Records {
    fn default() -> Self {
        Self {
            map: FxHashMap::default(),
            prune_at: MIN_PRUNE_THRESHOLD,
        }
    }
}

/// Side table of class/object metadata
#[derive(Debug, Default)]
pub struct MetadataStore {
    records: RwLock<Records>,
}

impl MetadataStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the record for `target` if it has none
    ///
    /// Returns true if a record was created. The check and insert happen
    /// under one write lock, so concurrent callers cannot create two records
    /// for the same target.
    pub fn ensure(
        &self,
        target: &Object,
        super_target: Option<&Object>,
        superclass: Option<&Object>,
        engine_class: bool,
    ) -> bool {
        let mut records = self.records.write();
        if records.map.contains_key(&target.id()) {
            return false;
        }
        if records.map.len() >= records.prune_at {
            let pruned = records.prune();
            tracing::trace!(pruned, "pruned class metadata");
        }
        let parent = super_target
            .filter(|obj| obj.id() != target.id())
            .and_then(|obj| records.map.get(&obj.id()).cloned());
        let record = MetaRecord {
            owner: target.downgrade(),
            parent,
            superclass: superclass.map(Object::downgrade),
            engine_class,
            state: RwLock::new(ClassMeta::default()),
        };
        records.map.insert(target.id(), Arc::new(record));
        tracing::trace!(id = %target.id(), engine_class, "created class metadata");
        true
    }

    fn record(&self, id: ObjectId) -> Option<Arc<MetaRecord>> {
        self.records.read().map.get(&id).cloned()
    }

    /// Check if a target has a record
    pub fn contains(&self, id: ObjectId) -> bool {
        self.records.read().map.contains_key(&id)
    }

    /// Declared superclass, while it is alive
    pub fn superclass(&self, id: ObjectId) -> Option<Object> {
        self.record(id)?.superclass.as_ref()?.upgrade()
    }

    /// Whether the target was built by the engine's class factory
    pub fn is_engine_class(&self, id: ObjectId) -> bool {
        self.record(id).is_some_and(|record| record.engine_class)
    }

    /// Register an instance method for per-instance binding
    pub fn register_bind(&self, id: ObjectId, name: &str) {
        if let Some(record) = self.record(id) {
            record.state.write().binds.insert(name.to_string());
        }
    }

    /// Resolved bind names: own names first, then inherited ones, without repeats
    pub fn binds(&self, id: ObjectId) -> Vec<String> {
        let mut names: IndexSet<String> = IndexSet::new();
        if let Some(record) = self.record(id) {
            for meta in record.chain() {
                names.extend(meta.state.read().binds.iter().cloned());
            }
        }
        names.into_iter().collect()
    }

    /// Whether any bind names resolve for the target
    pub fn has_binds(&self, id: ObjectId) -> bool {
        self.record(id)
            .is_some_and(|record| record.chain().any(|meta| !meta.state.read().binds.is_empty()))
    }

    /// Accessor pair for a slot, from the target's record or the nearest ancestor declaring it
    pub fn accessor(&self, id: ObjectId, slot: &MemberSlot) -> Option<AccessorPair> {
        self.record(id)?
            .chain()
            .find_map(|meta| meta.state.read().accessors.get(slot).cloned())
    }

    /// Record an installed accessor pair
    pub fn record_accessor(&self, id: ObjectId, slot: MemberSlot, pair: AccessorPair) {
        if let Some(record) = self.record(id) {
            record.state.write().accessors.insert(slot, pair);
        }
    }

    /// Drop records whose owner is gone, returning how many were removed
    pub fn prune(&self) -> usize {
        self.records.write().prune()
    }

    /// Number of records, including dead ones not yet pruned
    pub fn len(&self) -> usize {
        self.records.read().map.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.read().map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_is_idempotent() {
        let store = MetadataStore::new();
        let target = Object::ordinary(None);
        assert!(store.ensure(&target, None, None, false));
        assert!(!store.ensure(&target, None, None, true));
        assert_eq!(store.len(), 1);
        assert!(!store.is_engine_class(target.id()));
    }

    #[test]
    fn test_superclass_fixed_at_creation() {
        let store = MetadataStore::new();
        let base = Object::ordinary(None);
        let other = Object::ordinary(None);
        let class = Object::ordinary(None);
        store.ensure(&class, Some(&base), Some(&base), true);
        store.ensure(&class, Some(&other), Some(&other), true);
        assert_eq!(store.superclass(class.id()), Some(base));
    }

    #[test]
    fn test_binds_overlay_is_live() {
        let store = MetadataStore::new();
        let base = Object::ordinary(None);
        let derived = Object::ordinary(None);
        store.ensure(&base, None, None, true);
        store.ensure(&derived, Some(&base), Some(&base), true);

        store.register_bind(derived.id(), "own");
        assert_eq!(store.binds(derived.id()), vec!["own".to_string()]);

        // Registered on the parent after the child record exists
        store.register_bind(base.id(), "inherited");
        store.register_bind(base.id(), "own");
        assert_eq!(
            store.binds(derived.id()),
            vec!["own".to_string(), "inherited".to_string()]
        );
        assert_eq!(
            store.binds(base.id()),
            vec!["inherited".to_string(), "own".to_string()]
        );
        assert!(store.has_binds(derived.id()));
    }

    #[test]
    fn test_no_overlay_without_super_record() {
        let store = MetadataStore::new();
        let base = Object::ordinary(None);
        let derived = Object::ordinary(None);
        store.ensure(&derived, Some(&base), Some(&base), true);
        store.ensure(&base, None, None, true);
        store.register_bind(base.id(), "late");
        assert!(store.binds(derived.id()).is_empty());
        assert!(!store.has_binds(derived.id()));
    }

    #[test]
    fn test_self_extension_has_no_parent() {
        let store = MetadataStore::new();
        let obj = Object::ordinary(None);
        store.ensure(&obj, Some(&obj), None, false);
        store.register_bind(obj.id(), "x");
        assert_eq!(store.binds(obj.id()), vec!["x".to_string()]);
    }

    #[test]
    fn test_accessors_resolve_through_ancestors() {
        let store = MetadataStore::new();
        let a = Object::ordinary(None);
        let b = Object::ordinary(None);
        let c = Object::ordinary(None);
        store.ensure(&a, None, None, true);
        store.ensure(&b, Some(&a), Some(&a), true);
        store.ensure(&c, Some(&b), Some(&b), true);

        let pair = AccessorPair {
            getter: Some(Value::from(1)),
            setter: Some(Value::from(2)),
        };
        store.record_accessor(a.id(), MemberSlot::instance("x"), pair.clone());
        assert_eq!(store.accessor(c.id(), &MemberSlot::instance("x")), Some(pair));
        assert_eq!(store.accessor(c.id(), &MemberSlot::class("x")), None);

        // the nearest declaration wins
        let closer = AccessorPair {
            getter: Some(Value::from(3)),
            setter: None,
        };
        store.record_accessor(b.id(), MemberSlot::instance("x"), closer.clone());
        assert_eq!(store.accessor(c.id(), &MemberSlot::instance("x")), Some(closer));
    }

    #[test]
    fn test_records_do_not_keep_objects_alive() {
        let store = MetadataStore::new();
        let class = Object::ordinary(None);
        {
            let base = Object::ordinary(None);
            store.ensure(&base, None, None, true);
            store.register_bind(base.id(), "inherited");
            store.ensure(&class, Some(&base), Some(&base), true);
        }
        assert_eq!(store.superclass(class.id()), None);
        // the parent record outlives its owner while a subclass links to it
        assert_eq!(store.binds(class.id()), vec!["inherited".to_string()]);

        assert_eq!(store.prune(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.binds(class.id()), vec!["inherited".to_string()]);
    }

    #[test]
    fn test_dead_records_pruned_as_table_grows() {
        let store = MetadataStore::new();
        for _ in 0..MIN_PRUNE_THRESHOLD {
            store.ensure(&Object::ordinary(None), None, None, false);
        }
        assert_eq!(store.len(), MIN_PRUNE_THRESHOLD);

        let live = Object::ordinary(None);
        store.ensure(&live, None, None, false);
        assert_eq!(store.len(), 1);
        assert!(store.contains(live.id()));
    }
}
