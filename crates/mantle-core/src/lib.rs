//! Mantle Core Runtime
//!
//! This crate provides a runtime class and mixin composition engine:
//! - Declarative member tables (APIDs) with `static`, `get`, `set` and `bind` modifiers
//! - Class creation with prototype inheritance and uninitialized prototypes
//! - Super dispatch through a per-call sentinel on the receiver
//! - Accessor (getter/setter) pairing across separate declarations
//! - Per-instance method binding and incremental class/object extension
//!
//! All definition work happens eagerly: a bad member table fails when the
//! class is defined, not when a member is later called.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod apid;
pub mod class;
pub mod error;
pub mod object;
pub mod options;
pub mod realm;
pub mod util;
pub mod value;

pub use apid::{Apid, ApidEntry, MemberDescriptor, MemberKey, MemberKind, MemberSlot, MemberTable, Modifier};
pub use class::{AccessorPair, MetadataStore};
pub use error::{EngineError, EngineResult};
pub use object::{Callable, Constructor, NativeFn, Object, ObjectId, Property, WeakObject};
pub use options::{EngineOptions, SuperDetection};
pub use realm::Realm;
pub use util::is_function;
pub use value::Value;
