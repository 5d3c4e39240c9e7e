//! Member registry
//!
//! Turns APID entries into canonical [`MemberDescriptor`]s keyed by
//! [`MemberSlot`] (static-ness plus name). Getter and setter halves
//! declared under separate keys merge into one accessor descriptor; any
//! other second declaration for a taken slot is rejected.

use std::fmt;

use indexmap::IndexMap;

use super::modifier::Modifier;
use super::ApidEntry;
use crate::error::{EngineError, EngineResult};
use crate::value::Value;

/// Member identity: static-ness plus name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberSlot {
    /// Lives on the class rather than the prototype
    pub is_static: bool,
    /// Member name
    pub name: String,
}

impl MemberSlot {
    /// Instance slot
    pub fn instance(name: impl Into<String>) -> Self {
        Self {
            is_static: false,
            name: name.into(),
        }
    }

    /// Static slot
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            is_static: true,
            name: name.into(),
        }
    }
}

impl fmt::Display for MemberSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_static {
            write!(f, "static {}", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// How a member is installed
#[derive(Debug, Clone)]
pub enum MemberKind {
    /// Assigned as-is (after super wrapping)
    Plain(Value),
    /// Function rebound to its receiver
    Bound(Value),
    /// Computed property; unresolved halves fall back to the super chain
    Accessor {
        /// Getter declared in this APID
        getter: Option<Value>,
        /// Setter declared in this APID
        setter: Option<Value>,
    },
}

/// Canonical member description
#[derive(Debug, Clone)]
pub struct MemberDescriptor {
    /// Member name
    pub name: String,
    /// Static member?
    pub is_static: bool,
    /// First APID key that declared this slot
    pub key: String,
    /// Installation behavior
    pub kind: MemberKind,
}

impl MemberDescriptor {
    /// Slot this descriptor occupies
    pub fn slot(&self) -> MemberSlot {
        MemberSlot {
            is_static: self.is_static,
            name: self.name.clone(),
        }
    }
}

#[derive(Clone, Copy)]
enum Half {
    Get,
    Set,
}

/// Processed member table, in first-declaration order
#[derive(Debug, Default)]
pub struct MemberTable {
    members: IndexMap<MemberSlot, MemberDescriptor>,
}

impl MemberTable {
    /// Build the table for a sequence of entries
    pub fn process(entries: &[ApidEntry]) -> EngineResult<Self> {
        let mut table = Self::default();
        for entry in entries {
            table.add(entry)?;
        }
        Ok(table)
    }

    fn add(&mut self, entry: &ApidEntry) -> EngineResult<()> {
        let member = &entry.member;
        if member.is_standalone() {
            return Ok(());
        }

        let half = match (member.has(&Modifier::Get), member.has(&Modifier::Set)) {
            (true, true) => {
                return Err(EngineError::definition(
                    &entry.key,
                    "a key declares either a getter or a setter, not both",
                ))
            }
            (true, false) => Some(Half::Get),
            (false, true) => Some(Half::Set),
            (false, false) => None,
        };
        let bind = member.has(&Modifier::Bind);
        if half.is_some() && bind {
            return Err(EngineError::definition(
                &entry.key,
                "binding is not supported for getters/setters",
            ));
        }

        let slot = MemberSlot {
            is_static: member.is_static(),
            name: member.name.clone(),
        };

        let Some(half) = half else {
            if bind && !entry.value.is_callable() {
                return Err(EngineError::type_mismatch(&entry.key, "a function"));
            }
            if self.members.contains_key(&slot) {
                return Err(EngineError::DuplicateMember {
                    slot: slot.to_string(),
                    key: entry.key.clone(),
                });
            }
            let kind = if bind {
                MemberKind::Bound(entry.value.clone())
            } else {
                MemberKind::Plain(entry.value.clone())
            };
            self.insert(slot, &entry.key, kind);
            return Ok(());
        };

        if !entry.value.is_callable() {
            return Err(EngineError::type_mismatch(&entry.key, "a function"));
        }
        let value = Some(entry.value.clone());
        match self.members.get_mut(&slot) {
            Some(MemberDescriptor {
                kind: MemberKind::Accessor { getter, setter },
                ..
            }) => match half {
                Half::Get => *getter = value,
                Half::Set => *setter = value,
            },
            Some(_) => {
                return Err(EngineError::DuplicateMember {
                    slot: slot.to_string(),
                    key: entry.key.clone(),
                })
            }
            None => {
                let kind = match half {
                    Half::Get => MemberKind::Accessor {
                        getter: value,
                        setter: None,
                    },
                    Half::Set => MemberKind::Accessor {
                        getter: None,
                        setter: value,
                    },
                };
                self.insert(slot, &entry.key, kind);
            }
        }
        Ok(())
    }

    fn insert(&mut self, slot: MemberSlot, key: &str, kind: MemberKind) {
        let descriptor = MemberDescriptor {
            name: slot.name.clone(),
            is_static: slot.is_static,
            key: key.to_string(),
            kind,
        };
        self.members.insert(slot, descriptor);
    }

    /// Look up a descriptor
    pub fn get(&self, slot: &MemberSlot) -> Option<&MemberDescriptor> {
        self.members.get(slot)
    }

    /// Iterate descriptors in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &MemberDescriptor> {
        self.members.values()
    }

    /// Number of descriptors
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
