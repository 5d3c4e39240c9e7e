//! Object model
//!
//! Every object is a shared handle to a cell holding:
//! - a stable identity token ([`ObjectId`]) assigned at allocation
//! - an optional prototype link
//! - an insertion-ordered property table
//! - an optional [`Callable`] (functions and classes are objects too)
//!
//! Cells use `parking_lot::RwLock` for interior mutability. Locks are only
//! held for the duration of a single table operation and never across a
//! call into user code, so reentrant calls cannot deadlock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::class::SuperDispatch;
use crate::error::EngineResult;
use crate::realm::Realm;
use crate::value::Value;

/// Host function signature: `(realm, this, args) -> result`
pub type NativeFn = dyn Fn(&Realm, &Value, &[Value]) -> EngineResult<Value> + Send + Sync;

/// Unique identifier for an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Create a new unique object ID
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ObjectId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A property slot
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// Plain stored value
    Data(Value),
    /// Computed property; either half may be missing
    Accessor {
        /// Getter function
        get: Option<Value>,
        /// Setter function
        set: Option<Value>,
    },
}

/// How a class constructor initializes a freshly allocated instance
#[derive(Clone)]
pub enum Constructor {
    /// Class built by the engine: applies bound members, then runs the initializer
    Engine,
    /// Class supplied by the host; the function receives the new instance as `this`
    Host(Arc<NativeFn>),
}

/// Invocation behavior of a function object
#[derive(Clone)]
pub enum Callable {
    /// Host closure
    Native {
        /// Implementation
        func: Arc<NativeFn>,
        /// Whether the body reads the super sentinel
        uses_super: bool,
    },
    /// Function with a fixed receiver
    Bound {
        /// Original (never itself bound) function
        target: Object,
        /// Receiver passed as `this`
        receiver: Value,
    },
    /// Wrapper exposing the super sentinel for the duration of a call
    SuperDispatch(SuperDispatch),
    /// Class constructor (only invocable through `Realm::construct`)
    Constructor(Constructor),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native { uses_super, .. } => f
                .debug_struct("Native")
                .field("uses_super", uses_super)
                .finish_non_exhaustive(),
            Callable::Bound { target, receiver } => f
                .debug_struct("Bound")
                .field("target", target)
                .field("receiver", receiver)
                .finish(),
            Callable::SuperDispatch(dispatch) => f.debug_tuple("SuperDispatch").field(dispatch).finish(),
            Callable::Constructor(Constructor::Engine) => write!(f, "Constructor(Engine)"),
            Callable::Constructor(Constructor::Host(_)) => write!(f, "Constructor(Host)"),
        }
    }
}

struct ObjectInner {
    proto: Option<Object>,
    props: IndexMap<String, Property>,
    callable: Option<Callable>,
}

struct ObjectCell {
    id: ObjectId,
    inner: RwLock<ObjectInner>,
}

/// Shared handle to an object
#[derive(Clone)]
pub struct Object(Arc<ObjectCell>);

impl Object {
    fn alloc(proto: Option<Object>, callable: Option<Callable>) -> Self {
        Object(Arc::new(ObjectCell {
            id: ObjectId::new(),
            inner: RwLock::new(ObjectInner {
                proto,
                props: IndexMap::new(),
                callable,
            }),
        }))
    }

    /// Create a plain object
    pub fn ordinary(proto: Option<Object>) -> Self {
        Self::alloc(proto, None)
    }

    /// Create a function object
    pub fn function(proto: Option<Object>, callable: Callable) -> Self {
        Self::alloc(proto, Some(callable))
    }

    /// Identity token
    #[inline]
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Non-owning handle to this object
    pub fn downgrade(&self) -> WeakObject {
        WeakObject {
            id: self.0.id,
            cell: Arc::downgrade(&self.0),
        }
    }

    /// Identity comparison
    #[inline]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Prototype link
    pub fn proto(&self) -> Option<Object> {
        self.0.inner.read().proto.clone()
    }

    /// Replace the prototype link
    pub fn set_proto(&self, proto: Option<Object>) {
        self.0.inner.write().proto = proto;
    }

    /// Invocation behavior, if this is a function
    pub fn callable(&self) -> Option<Callable> {
        self.0.inner.read().callable.clone()
    }

    /// Check if this object can be invoked
    pub fn is_callable(&self) -> bool {
        self.0.inner.read().callable.is_some()
    }

    /// Check if this is a host closure (the only kind the super analyzer wraps)
    pub fn is_native_function(&self) -> bool {
        matches!(self.0.inner.read().callable, Some(Callable::Native { .. }))
    }

    /// Whether this function declared that it reads the super sentinel
    pub fn uses_super(&self) -> bool {
        matches!(
            self.0.inner.read().callable,
            Some(Callable::Native { uses_super: true, .. })
        )
    }

    /// Original function behind a bound function
    pub fn bound_target(&self) -> Option<Object> {
        match &self.0.inner.read().callable {
            Some(Callable::Bound { target, .. }) => Some(target.clone()),
            _ => None,
        }
    }

    /// Get an own property
    pub fn get_own(&self, key: &str) -> Option<Property> {
        self.0.inner.read().props.get(key).cloned()
    }

    /// Check for an own property
    pub fn has_own(&self, key: &str) -> bool {
        self.0.inner.read().props.contains_key(key)
    }

    /// Install (or replace) an own property
    pub fn define(&self, key: &str, prop: Property) {
        self.0.inner.write().props.insert(key.to_string(), prop);
    }

    /// Install (or replace) an own data property
    pub fn define_value(&self, key: &str, value: impl Into<Value>) {
        self.define(key, Property::Data(value.into()));
    }

    /// Install one half of an accessor, keeping the other half of an existing accessor
    pub fn define_accessor(&self, key: &str, get: Option<Value>, set: Option<Value>) {
        let mut inner = self.0.inner.write();
        match inner.props.get_mut(key) {
            Some(Property::Accessor {
                get: cur_get,
                set: cur_set,
            }) => {
                if get.is_some() {
                    *cur_get = get;
                }
                if set.is_some() {
                    *cur_set = set;
                }
            }
            _ => {
                inner
                    .props
                    .insert(key.to_string(), Property::Accessor { get, set });
            }
        }
    }

    /// Remove an own property, returning it
    pub fn remove(&self, key: &str) -> Option<Property> {
        self.0.inner.write().props.shift_remove(key)
    }

    /// Own property names in insertion order
    pub fn own_keys(&self) -> Vec<String> {
        self.0.inner.read().props.keys().cloned().collect()
    }

    /// Find a property on this object or along its prototype chain
    pub fn lookup(&self, key: &str) -> Option<Property> {
        let mut current = Some(self.clone());
        while let Some(obj) = current {
            let inner = obj.0.inner.read();
            if let Some(prop) = inner.props.get(key) {
                return Some(prop.clone());
            }
            current = inner.proto.clone();
        }
        None
    }

    /// Check whether `ancestor` appears on this object's prototype chain
    pub fn inherits_from(&self, ancestor: &Object) -> bool {
        let mut current = self.proto();
        while let Some(obj) = current {
            if obj.ptr_eq(ancestor) {
                return true;
            }
            current = obj.proto();
        }
        false
    }
}

/// Non-owning object handle; does not keep the object alive
#[derive(Clone)]
pub struct WeakObject {
    id: ObjectId,
    cell: Weak<ObjectCell>,
}

impl WeakObject {
    /// Identity token of the referenced object
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Get the object back, if it is still alive
    pub fn upgrade(&self) -> Option<Object> {
        self.cell.upgrade().map(Object)
    }

    /// Check if the object is still alive
    pub fn is_alive(&self) -> bool {
        self.cell.strong_count() > 0
    }
}

impl fmt::Debug for WeakObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Weak{}", self.id)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.0.inner.read().callable {
            None => "Object",
            Some(Callable::Constructor(_)) => "Class",
            Some(_) => "Function",
        };
        write!(f, "{}{}", kind, self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Callable {
        Callable::Native {
            func: Arc::new(|_: &Realm, _: &Value, _: &[Value]| -> EngineResult<Value> { Ok(Value::Undefined) }),
            uses_super: false,
        }
    }

    #[test]
    fn test_object_id_uniqueness() {
        let id1 = ObjectId::new();
        let id2 = ObjectId::new();
        assert_ne!(id1, id2);
        assert!(id2.as_u64() > id1.as_u64());
    }

    #[test]
    fn test_own_properties() {
        let obj = Object::ordinary(None);
        obj.define_value("x", 1);
        obj.define_value("y", 2);
        assert_eq!(obj.get_own("x"), Some(Property::Data(Value::from(1))));
        assert_eq!(obj.own_keys(), vec!["x".to_string(), "y".to_string()]);

        assert!(obj.remove("x").is_some());
        assert!(!obj.has_own("x"));
        assert_eq!(obj.own_keys(), vec!["y".to_string()]);
    }

    #[test]
    fn test_prototype_chain_lookup() {
        let root = Object::ordinary(None);
        root.define_value("shared", "root");
        let mid = Object::ordinary(Some(root.clone()));
        let leaf = Object::ordinary(Some(mid.clone()));

        assert_eq!(leaf.lookup("shared"), Some(Property::Data(Value::from("root"))));
        assert_eq!(leaf.lookup("missing"), None);
        assert!(leaf.inherits_from(&root));
        assert!(!root.inherits_from(&leaf));

        mid.define_value("shared", "mid");
        assert_eq!(leaf.lookup("shared"), Some(Property::Data(Value::from("mid"))));
    }

    #[test]
    fn test_accessor_halves_merge() {
        let obj = Object::ordinary(None);
        let getter = Value::from(Object::function(None, noop()));
        let setter = Value::from(Object::function(None, noop()));

        obj.define_accessor("x", Some(getter.clone()), None);
        obj.define_accessor("x", None, Some(setter.clone()));
        assert_eq!(
            obj.get_own("x"),
            Some(Property::Accessor {
                get: Some(getter),
                set: Some(setter)
            })
        );

        obj.define_value("x", 5);
        obj.define_accessor("x", None, None);
        assert_eq!(
            obj.get_own("x"),
            Some(Property::Accessor { get: None, set: None })
        );
    }

    #[test]
    fn test_weak_handle_does_not_keep_object_alive() {
        let obj = Object::ordinary(None);
        let weak = obj.downgrade();
        assert_eq!(weak.id(), obj.id());
        assert_eq!(weak.upgrade(), Some(obj.clone()));

        drop(obj);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_callable_checks() {
        let f = Object::function(None, noop());
        assert!(f.is_callable());
        assert!(f.is_native_function());
        assert!(!f.uses_super());
        assert!(f.bound_target().is_none());

        let bound = Object::function(
            None,
            Callable::Bound {
                target: f.clone(),
                receiver: Value::Null,
            },
        );
        assert_eq!(bound.bound_target(), Some(f));
        assert!(!bound.is_native_function());
        assert!(!Object::ordinary(None).is_callable());
    }
}
