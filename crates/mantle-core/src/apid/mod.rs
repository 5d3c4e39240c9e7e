//! API definitions (APIDs)
//!
//! An [`Apid`] is the declarative input of every class/object definition:
//! an ordered list of keyed entries. Textual keys are parsed into
//! [`MemberKey`]s as soon as they are inserted, so the rest of the engine
//! only ever sees typed descriptors.
//!
//! ## Keys
//!
//! | Key                 | Meaning                                   |
//! |---------------------|-------------------------------------------|
//! | `name`              | plain instance member                     |
//! | `$name`, `static$name` | plain static member                    |
//! | `get$name`, `set$name` | accessor halves (may be split)         |
//! | `bind$name`         | per-instance bound method                 |
//! | `superclass$`       | superclass declaration                    |
//! | `initialize$`       | static initializer, run once after definition |
//!
//! The processed [`MemberTable`] is cached on the APID; inserting a new
//! entry or calling [`Apid::invalidate`] drops the cache.

mod modifier;
mod registry;

use std::sync::Arc;

use once_cell::sync::OnceCell;

pub use modifier::{MemberKey, Modifier};
pub use registry::{MemberDescriptor, MemberKind, MemberSlot, MemberTable};

use crate::error::EngineResult;
use crate::value::Value;

/// Standalone token declaring the superclass
const SUPERCLASS_TOKEN: &str = "superclass";
/// Standalone token declaring the static initializer
const INITIALIZER_TOKEN: &str = "initialize";

/// One APID entry
#[derive(Debug, Clone)]
pub struct ApidEntry {
    /// Key as declared
    pub key: String,
    /// Parsed key
    pub member: MemberKey,
    /// Declared value
    pub value: Value,
}

/// API definition: the flat declarative member table
#[derive(Debug, Clone)]
pub struct Apid {
    delimiter: char,
    entries: Vec<ApidEntry>,
    superclass: Option<Value>,
    initializer: Option<Value>,
    cache: OnceCell<Arc<MemberTable>>,
}

impl Default for Apid {
    fn default() -> Self {
        Self::new()
    }
}

impl Apid {
    /// Create an empty APID using `$` as the key delimiter
    pub fn new() -> Self {
        Self::with_delimiter('$')
    }

    /// Create an empty APID with a custom key delimiter
    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            delimiter,
            entries: Vec::new(),
            superclass: None,
            initializer: None,
            cache: OnceCell::new(),
        }
    }

    /// Add a textual entry (builder form)
    pub fn entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add a typed entry (builder form)
    pub fn declare(mut self, member: MemberKey, value: impl Into<Value>) -> Self {
        let key = member.to_key(self.delimiter);
        self.push(key, member, value.into());
        self
    }

    /// Declare the superclass (builder form)
    pub fn superclass(mut self, class: impl Into<Value>) -> Self {
        self.superclass = Some(class.into());
        self
    }

    /// Declare the static initializer (builder form)
    pub fn static_initializer(mut self, func: impl Into<Value>) -> Self {
        self.initializer = Some(func.into());
        self
    }

    /// Add a textual entry
    ///
    /// Name-less keys are routed to the standalone declarations they denote;
    /// unknown name-less keys are kept but never installed.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let member = MemberKey::parse(&key, self.delimiter);
        let value = value.into();
        if member.is_standalone() {
            match member.modifiers.first().map(Modifier::token) {
                Some(token) if token.eq_ignore_ascii_case(SUPERCLASS_TOKEN) => {
                    self.superclass = Some(value);
                    return;
                }
                Some(token) if token.eq_ignore_ascii_case(INITIALIZER_TOKEN) => {
                    self.initializer = Some(value);
                    return;
                }
                _ => {}
            }
        }
        self.push(key, member, value);
    }

    fn push(&mut self, key: String, member: MemberKey, value: Value) {
        self.entries.push(ApidEntry { key, member, value });
        self.invalidate();
    }

    /// Key delimiter
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Entries in declaration order
    pub fn entries(&self) -> &[ApidEntry] {
        &self.entries
    }

    /// Declared superclass, if any
    pub fn superclass_value(&self) -> Option<&Value> {
        self.superclass.as_ref()
    }

    /// Declared static initializer, if any
    pub fn initializer_value(&self) -> Option<&Value> {
        self.initializer.as_ref()
    }

    /// Processed member table (computed once, then served from cache)
    pub fn members(&self) -> EngineResult<Arc<MemberTable>> {
        self.cache
            .get_or_try_init(|| MemberTable::process(&self.entries).map(Arc::new))
            .cloned()
    }

    /// Drop the cached member table
    pub fn invalidate(&mut self) {
        self.cache.take();
    }
}
