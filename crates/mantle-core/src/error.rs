//! Definition and invocation errors

use thiserror::Error;

use crate::value::Value;

/// Errors raised while defining, extending or invoking classes and objects
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A second plain definition for a member slot that is already taken
    #[error("Duplicate member definition: {slot} (key `{key}`)")]
    DuplicateMember {
        /// Slot description, e.g. `static count`
        slot: String,
        /// APID key that introduced the conflict
        key: String,
    },

    /// Modifiers that cannot be combined, or a member the target cannot honor
    #[error("Invalid member definition `{key}`: {reason}")]
    Definition {
        /// Offending APID key
        key: String,
        /// Why the definition was rejected
        reason: String,
    },

    /// A value of the wrong shape (usually a non-callable where a function is required)
    #[error("Type mismatch: {what} is not {expected}")]
    TypeMismatch {
        /// Description of the offending value
        what: String,
        /// What was expected instead
        expected: &'static str,
    },

    /// A function requires super dispatch but nothing exists to dispatch to
    #[error("No super member found for `{name}` (key `{key}`)")]
    SuperResolution {
        /// Member name
        name: String,
        /// APID key the member was declared with
        key: String,
    },

    /// The host cannot perform an operation the definition requires
    #[error("Platform capability missing: {0}")]
    PlatformCapability(String),

    /// Exception raised by user code
    #[error("Uncaught exception: {0:?}")]
    Thrown(Value),
}

impl EngineError {
    /// Shorthand for a [`EngineError::TypeMismatch`]
    pub fn type_mismatch(what: impl Into<String>, expected: &'static str) -> Self {
        EngineError::TypeMismatch {
            what: what.into(),
            expected,
        }
    }

    /// Shorthand for a [`EngineError::Definition`]
    pub fn definition(key: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Definition {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Raise a user-level exception carrying `value`
    pub fn thrown(value: impl Into<Value>) -> Self {
        EngineError::Thrown(value.into())
    }

    /// True for the DefinitionError family (duplicates and bad modifier combinations)
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            EngineError::DuplicateMember { .. } | EngineError::Definition { .. }
        )
    }
}

/// Engine operation result
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_family() {
        let dup = EngineError::DuplicateMember {
            slot: "greet".to_string(),
            key: "greet".to_string(),
        };
        assert!(dup.is_definition_error());
        assert!(EngineError::definition("bind$get$x", "bad").is_definition_error());
        assert!(!EngineError::type_mismatch("x", "a function").is_definition_error());
        assert!(!EngineError::PlatformCapability("accessors".into()).is_definition_error());
    }

    #[test]
    fn test_messages_name_the_key() {
        let err = EngineError::SuperResolution {
            name: "greet".to_string(),
            key: "greet".to_string(),
        };
        assert_eq!(err.to_string(), "No super member found for `greet` (key `greet`)");

        let err = EngineError::type_mismatch("bind$onTick", "a function");
        assert_eq!(err.to_string(), "Type mismatch: bind$onTick is not a function");
    }
}
