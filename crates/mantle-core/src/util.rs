//! Helper operations shared by the engine and its consumers

use crate::error::{EngineError, EngineResult};
use crate::object::{Callable, Object};
use crate::realm::Realm;
use crate::value::Value;

/// Check if a value can be called
pub fn is_function(value: &Value) -> bool {
    value.is_callable()
}

impl Realm {
    /// Fix the receiver of `func`
    ///
    /// Rebinding an already bound function binds its original target, so
    /// bound wrappers never nest.
    pub fn bind(&self, func: &Value, receiver: Value) -> EngineResult<Value> {
        if receiver.is_nullish() {
            return Err(EngineError::type_mismatch(
                format!("bind receiver ({})", receiver.type_name()),
                "an object or primitive",
            ));
        }
        let Some(obj) = func.as_object().filter(|obj| obj.is_callable()) else {
            return Err(EngineError::type_mismatch(
                format!("bind target ({})", func.type_name()),
                "a function",
            ));
        };
        let target = obj.bound_target().unwrap_or_else(|| obj.clone());
        Ok(Value::Object(
            self.alloc_function(Callable::Bound { target, receiver }),
        ))
    }

    /// Shallow-copy own properties of each source onto `dst`
    ///
    /// Sources are applied in order, so later sources override earlier ones.
    /// Values are read and written through the property protocol. Only own
    /// keys are copied; enumerable keys a source inherits are skipped, and
    /// `dst` must already exist.
    pub fn extend(&self, dst: &Object, sources: &[&Object]) -> EngineResult<Object> {
        let target = Value::Object(dst.clone());
        for source in sources {
            let receiver = Value::Object((*source).clone());
            for key in source.own_keys() {
                let value = self.get(&receiver, &key)?;
                self.set(&target, &key, value)?;
            }
        }
        Ok(dst.clone())
    }
}
