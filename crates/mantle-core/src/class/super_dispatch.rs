//! Super dispatch
//!
//! A function that calls `realm.call_super(this, args)` reads the super
//! sentinel (`_super` by default) from its receiver. Such functions are
//! installed behind a [`SuperDispatch`] wrapper, which for exactly one call:
//! 1. saves the receiver's own sentinel property (if any)
//! 2. sets the sentinel to the super member resolved at definition time
//! 3. invokes the original function with the original receiver and args
//! 4. restores the saved property, or removes the sentinel if there was none
//!
//! The restore runs from a drop guard, so it also happens when the call
//! fails or unwinds. Each call restores exactly what it saved, so nested and
//! recursive super chains on one receiver unwind as a stack.

use std::fmt;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::object::{Callable, Object, Property};
use crate::options::SuperDetection;
use crate::realm::Realm;
use crate::value::Value;

/// Wrapper installed in place of a super-calling function
#[derive(Clone)]
pub struct SuperDispatch {
    original: Object,
    super_fn: Value,
    /// Object that holds the sentinel instead of the receiver (primitive-wrapper superclasses)
    holder: Option<Object>,
    sentinel: Arc<str>,
}

impl fmt::Debug for SuperDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuperDispatch")
            .field("original", &self.original)
            .field("super_fn", &self.super_fn)
            .field("holder", &self.holder)
            .finish()
    }
}

impl SuperDispatch {
    /// Wrapped function
    pub fn original(&self) -> &Object {
        &self.original
    }

    /// Super member this wrapper dispatches to
    pub fn super_fn(&self) -> &Value {
        &self.super_fn
    }

    pub(crate) fn invoke(&self, realm: &Realm, this: &Value, args: &[Value]) -> EngineResult<Value> {
        let holder = match (&self.holder, this) {
            (Some(holder), _) => holder.clone(),
            (None, Value::Object(receiver)) => receiver.clone(),
            (None, other) => {
                return Err(EngineError::type_mismatch(
                    format!("super dispatch receiver ({})", other.type_name()),
                    "an object",
                ))
            }
        };
        let _guard = SentinelGuard::install(holder, self.sentinel.clone(), self.super_fn.clone());
        realm.call(&Value::Object(self.original.clone()), this.clone(), args)
    }
}

/// Restores the sentinel property on drop
struct SentinelGuard {
    holder: Object,
    sentinel: Arc<str>,
    prior: Option<Property>,
}

impl SentinelGuard {
    fn install(holder: Object, sentinel: Arc<str>, super_fn: Value) -> Self {
        let prior = holder.get_own(&sentinel);
        holder.define_value(&sentinel, super_fn);
        Self {
            holder,
            sentinel,
            prior,
        }
    }
}

impl Drop for SentinelGuard {
    fn drop(&mut self) {
        match self.prior.take() {
            Some(prop) => self.holder.define(&self.sentinel, prop),
            None => {
                self.holder.remove(&self.sentinel);
            }
        }
    }
}

/// Decide whether `func` must be wrapped for super dispatch
pub fn requires_super(mode: SuperDetection, func: &Value) -> bool {
    let Some(obj) = func.as_object().filter(|obj| obj.is_native_function()) else {
        return false;
    };
    match mode {
        SuperDetection::Flagged => obj.uses_super(),
        SuperDetection::Always => true,
        SuperDetection::Unavailable => false,
    }
}

/// Wrap `func` so it can dispatch to its super member
///
/// `resolve_super` is only consulted when wrapping is needed. A function
/// flagged as using super with nothing to dispatch to is a
/// [`EngineError::SuperResolution`]; unflagged functions wrapped under
/// [`SuperDetection::Always`] are installed as-is instead.
pub(crate) fn superify(
    realm: &Realm,
    func: Value,
    resolve_super: impl FnOnce() -> EngineResult<Option<Value>>,
    holder: Option<&Object>,
    name: &str,
    key: &str,
) -> EngineResult<Value> {
    if !requires_super(realm.options().super_detection, &func) {
        return Ok(func);
    }
    let Value::Object(original) = &func else {
        return Ok(func);
    };

    let super_fn = match resolve_super()?.filter(Value::is_callable) {
        Some(super_fn) => super_fn,
        None if original.uses_super() => {
            return Err(EngineError::SuperResolution {
                name: name.to_string(),
                key: key.to_string(),
            })
        }
        None => return Ok(func),
    };

    tracing::trace!(member = name, "wrapping for super dispatch");
    let dispatch = SuperDispatch {
        original: original.clone(),
        super_fn,
        holder: holder.cloned(),
        sentinel: Arc::from(realm.options().super_sentinel.as_str()),
    };
    Ok(Value::Object(realm.alloc_function(Callable::SuperDispatch(dispatch))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::EngineOptions;

    #[test]
    fn test_requires_super_modes() {
        let realm = Realm::new();
        let plain = Value::from(realm.function(|_, _, _| Ok(Value::Undefined)));
        let flagged = Value::from(realm.function_with_super(|_, _, _| Ok(Value::Undefined)));

        assert!(!requires_super(SuperDetection::Flagged, &plain));
        assert!(requires_super(SuperDetection::Flagged, &flagged));
        assert!(requires_super(SuperDetection::Always, &plain));
        assert!(!requires_super(SuperDetection::Unavailable, &flagged));
        assert!(!requires_super(SuperDetection::Always, &Value::from(3)));
    }

    #[test]
    fn test_missing_super_is_an_error_for_flagged_functions() {
        let realm = Realm::new();
        let flagged = Value::from(realm.function_with_super(|_, _, _| Ok(Value::Undefined)));
        let err = superify(&realm, flagged, || Ok(None), None, "greet", "greet").unwrap_err();
        assert!(matches!(err, EngineError::SuperResolution { ref name, .. } if name == "greet"));

        let err = superify(
            &realm,
            Value::from(realm.function_with_super(|_, _, _| Ok(Value::Undefined))),
            || Ok(Some(Value::from(1))),
            None,
            "greet",
            "greet",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::SuperResolution { .. }));
    }

    #[test]
    fn test_unflagged_functions_installed_as_is() {
        let realm = Realm::new();
        let plain = Value::from(realm.function(|_, _, _| Ok(Value::Undefined)));
        let mut resolved = false;
        let out = superify(
            &realm,
            plain.clone(),
            || {
                resolved = true;
                Ok(None)
            },
            None,
            "x",
            "x",
        )
        .unwrap();
        assert_eq!(out, plain);
        assert!(!resolved);
    }

    #[test]
    fn test_always_mode_tolerates_missing_super() {
        let realm = Realm::with_options(
            EngineOptions::default().with_super_detection(SuperDetection::Always),
        );
        let plain = Value::from(realm.function(|_, _, _| Ok(Value::Undefined)));
        let out = superify(&realm, plain.clone(), || Ok(None), None, "x", "x").unwrap();
        assert_eq!(out, plain);
    }

    #[test]
    fn test_sentinel_restored_after_error() {
        let realm = Realm::new();
        let base = Value::from(realm.function(|_, _, _| Ok(Value::from("base"))));
        let failing = Value::from(realm.function_with_super(|realm, this, _| {
            realm.call_super(this, &[])?;
            Err(EngineError::thrown("boom"))
        }));
        let wrapped = superify(&realm, failing, || Ok(Some(base)), None, "f", "f").unwrap();

        let receiver = realm.new_object();
        receiver.define_value("_super", "prior");
        let err = realm.call(&wrapped, Value::from(&receiver), &[]).unwrap_err();
        assert!(matches!(err, EngineError::Thrown(ref v) if *v == Value::from("boom")));
        assert_eq!(receiver.get_own("_super"), Some(Property::Data(Value::from("prior"))));
    }

    #[test]
    fn test_sentinel_removed_when_absent_before() {
        let realm = Realm::new();
        let base = Value::from(realm.function(|_, _, _| Ok(Value::from(1))));
        let derived = Value::from(realm.function_with_super(|realm, this, _| {
            realm.call_super(this, &[])
        }));
        let wrapped = superify(&realm, derived, || Ok(Some(base)), None, "f", "f").unwrap();

        let receiver = realm.new_object();
        assert_eq!(realm.call(&wrapped, Value::from(&receiver), &[]).unwrap(), Value::from(1));
        assert!(!receiver.has_own("_super"));
    }

    #[test]
    fn test_primitive_receiver_needs_holder() {
        let realm = Realm::new();
        let base = Value::from(realm.function(|_, _, _| Ok(Value::from(1))));
        let derived = Value::from(realm.function_with_super(|realm, this, _| {
            realm.call_super(this, &[])
        }));
        let wrapped =
            superify(&realm, derived.clone(), || Ok(Some(base.clone())), None, "f", "f").unwrap();
        let err = realm.call(&wrapped, Value::from(4), &[]).unwrap_err();
        assert!(matches!(err, EngineError::TypeMismatch { .. }));

        let holder = realm.number_prototype();
        let wrapped =
            superify(&realm, derived, || Ok(Some(base)), Some(&holder), "f", "f").unwrap();
        assert_eq!(realm.call(&wrapped, Value::from(4), &[]).unwrap(), Value::from(1));
        assert!(!holder.has_own("_super"));
    }
}
