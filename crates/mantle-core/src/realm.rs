//! Realm: built-ins, options and the property/call protocol
//!
//! A realm owns everything a definition needs at runtime:
//! - [`EngineOptions`]
//! - the Class Metadata Store side table
//! - the built-in root `Object` class, the primitive-wrapper classes
//!   `Number` and `String`, and the shared no-op function `nilf`
//!
//! Property reads walk the prototype chain and run getters with the
//! original receiver. Primitives resolve members through their wrapper
//! class prototype, which is how members added to `Number` or `String`
//! become callable on plain numbers and strings.

use std::sync::Arc;

use crate::class::{Construction, MetadataStore};
use crate::error::{EngineError, EngineResult};
use crate::object::{Callable, Constructor, Object, Property};
use crate::options::EngineOptions;
use crate::value::Value;

fn noop(_: &Realm, _: &Value, _: &[Value]) -> EngineResult<Value> {
    Ok(Value::Undefined)
}

/// Execution environment for class definitions
#[derive(Debug)]
pub struct Realm {
    options: EngineOptions,
    metadata: MetadataStore,
    object_prototype: Object,
    function_prototype: Object,
    object_class: Object,
    number_class: Object,
    number_prototype: Object,
    string_class: Object,
    string_prototype: Object,
    nilf: Object,
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl Realm {
    /// Create a realm with default options
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Create a realm with custom options
    pub fn with_options(options: EngineOptions) -> Self {
        let object_prototype = Object::ordinary(None);
        let function_prototype = Object::ordinary(Some(object_prototype.clone()));
        let number_prototype = Object::ordinary(Some(object_prototype.clone()));
        let string_prototype = Object::ordinary(Some(object_prototype.clone()));

        let builtin_class = |prototype: &Object| {
            let class = Object::function(
                Some(function_prototype.clone()),
                Callable::Constructor(Constructor::Host(Arc::new(noop))),
            );
            class.define_value("prototype", prototype);
            prototype.define_value("constructor", &class);
            class
        };
        let object_class = builtin_class(&object_prototype);
        let number_class = builtin_class(&number_prototype);
        let string_class = builtin_class(&string_prototype);

        let nilf = Object::function(
            Some(function_prototype.clone()),
            Callable::Native {
                func: Arc::new(noop),
                uses_super: false,
            },
        );

        Self {
            options,
            metadata: MetadataStore::new(),
            object_prototype,
            function_prototype,
            object_class,
            number_class,
            number_prototype,
            string_class,
            string_prototype,
            nilf,
        }
    }

    /// Engine options
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Class metadata side table
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Root `Object` class (default superclass)
    pub fn object_class(&self) -> Object {
        self.object_class.clone()
    }

    /// Root prototype shared by all objects
    pub fn object_prototype(&self) -> Object {
        self.object_prototype.clone()
    }

    /// Prototype of every function object
    pub fn function_prototype(&self) -> Object {
        self.function_prototype.clone()
    }

    /// `Number` primitive-wrapper class
    pub fn number_class(&self) -> Object {
        self.number_class.clone()
    }

    /// Storage for members reachable from number primitives
    pub fn number_prototype(&self) -> Object {
        self.number_prototype.clone()
    }

    /// `String` primitive-wrapper class
    pub fn string_class(&self) -> Object {
        self.string_class.clone()
    }

    /// Storage for members reachable from string primitives
    pub fn string_prototype(&self) -> Object {
        self.string_prototype.clone()
    }

    /// Shared no-op function
    pub fn nilf(&self) -> Object {
        self.nilf.clone()
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Create an empty object inheriting from the root prototype
    pub fn new_object(&self) -> Object {
        Object::ordinary(Some(self.object_prototype.clone()))
    }

    pub(crate) fn alloc_function(&self, callable: Callable) -> Object {
        Object::function(Some(self.function_prototype.clone()), callable)
    }

    /// Create a host function
    pub fn function<F>(&self, func: F) -> Object
    where
        F: Fn(&Realm, &Value, &[Value]) -> EngineResult<Value> + Send + Sync + 'static,
    {
        self.alloc_function(Callable::Native {
            func: Arc::new(func),
            uses_super: false,
        })
    }

    /// Create a host function that calls [`Realm::call_super`]
    pub fn function_with_super<F>(&self, func: F) -> Object
    where
        F: Fn(&Realm, &Value, &[Value]) -> EngineResult<Value> + Send + Sync + 'static,
    {
        self.alloc_function(Callable::Native {
            func: Arc::new(func),
            uses_super: true,
        })
    }

    /// Create a class not built by the engine
    ///
    /// `ctor` runs on every construction with the new instance as `this`.
    /// The class has an empty prototype inheriting from the root prototype.
    pub fn define_class<F>(&self, ctor: F) -> Object
    where
        F: Fn(&Realm, &Value, &[Value]) -> EngineResult<Value> + Send + Sync + 'static,
    {
        let class = self.alloc_function(Callable::Constructor(Constructor::Host(Arc::new(ctor))));
        let prototype = self.new_object();
        prototype.define_value("constructor", &class);
        class.define_value("prototype", prototype);
        class
    }

    // ========================================================================
    // Class checks
    // ========================================================================

    /// Check if `obj` is a class constructor
    pub fn is_class(&self, obj: &Object) -> bool {
        matches!(obj.callable(), Some(Callable::Constructor(_)))
    }

    /// Prototype object of a class
    pub fn class_prototype(&self, class: &Object) -> EngineResult<Object> {
        match class.get_own("prototype") {
            Some(Property::Data(Value::Object(prototype))) => Ok(prototype),
            _ => Err(EngineError::type_mismatch(format!("{:?}", class), "a class")),
        }
    }

    /// Primitive-wrapper built-in (`Number`, `String`)
    pub fn is_primitive_wrapper(&self, class: &Object) -> bool {
        class.ptr_eq(&self.number_class) || class.ptr_eq(&self.string_class)
    }

    // ========================================================================
    // Property protocol
    // ========================================================================

    fn property_holder(&self, target: &Value, key: &str) -> EngineResult<Object> {
        match target {
            Value::Object(obj) => Ok(obj.clone()),
            Value::Number(_) => Ok(self.number_prototype.clone()),
            Value::Str(_) => Ok(self.string_prototype.clone()),
            Value::Bool(_) => Ok(self.object_prototype.clone()),
            Value::Undefined | Value::Null => Err(EngineError::type_mismatch(
                format!("reading `{}` from {}", key, target.type_name()),
                "a property read on an object",
            )),
        }
    }

    /// Read a property, running a getter if one is found
    pub fn get(&self, target: &Value, key: &str) -> EngineResult<Value> {
        let holder = self.property_holder(target, key)?;
        match holder.lookup(key) {
            None => Ok(Value::Undefined),
            Some(Property::Data(value)) => Ok(value),
            Some(Property::Accessor { get: Some(getter), .. }) => self.call(&getter, target.clone(), &[]),
            Some(Property::Accessor { get: None, .. }) => Ok(Value::Undefined),
        }
    }

    /// Write a property
    ///
    /// A setter found on the chain is invoked; an accessor without a setter
    /// drops the write. Otherwise an own data property is defined. Writes to
    /// primitives are ignored.
    pub fn set(&self, target: &Value, key: &str, value: impl Into<Value>) -> EngineResult<()> {
        let obj = match target {
            Value::Object(obj) => obj,
            Value::Undefined | Value::Null => {
                return Err(EngineError::type_mismatch(
                    format!("writing `{}` to {}", key, target.type_name()),
                    "a property write on an object",
                ))
            }
            _ => return Ok(()),
        };
        match obj.lookup(key) {
            Some(Property::Accessor { set: Some(setter), .. }) => {
                self.call(&setter, target.clone(), &[value.into()])?;
            }
            Some(Property::Accessor { set: None, .. }) => {}
            _ => obj.define_value(key, value),
        }
        Ok(())
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    /// Invoke a function with an explicit receiver
    pub fn call(&self, callee: &Value, this: Value, args: &[Value]) -> EngineResult<Value> {
        let callable = callee
            .as_object()
            .and_then(Object::callable)
            .ok_or_else(|| EngineError::type_mismatch(format!("{:?}", callee), "a function"))?;
        match callable {
            Callable::Native { func, .. } => func(self, &this, args),
            Callable::Bound { target, receiver } => self.call(&Value::Object(target), receiver, args),
            Callable::SuperDispatch(dispatch) => dispatch.invoke(self, &this, args),
            Callable::Constructor(_) => Err(EngineError::type_mismatch(
                format!("{:?} called without construct", callee),
                "a plain function",
            )),
        }
    }

    /// Look up `name` on `receiver` and invoke it with `receiver` as `this`
    pub fn call_method(&self, receiver: &Value, name: &str, args: &[Value]) -> EngineResult<Value> {
        let method = self.get(receiver, name)?;
        if !method.is_callable() {
            return Err(EngineError::type_mismatch(
                format!("`{}` ({})", name, method.type_name()),
                "a function",
            ));
        }
        self.call(&method, receiver.clone(), args)
    }

    /// Invoke the super member of the currently executing wrapped function
    pub fn call_super(&self, this: &Value, args: &[Value]) -> EngineResult<Value> {
        let sentinel = self.options.super_sentinel.as_str();
        let super_fn = self.get(this, sentinel)?;
        if !super_fn.is_callable() {
            return Err(EngineError::type_mismatch(
                format!("`{}` ({})", sentinel, super_fn.type_name()),
                "a function",
            ));
        }
        self.call(&super_fn, this.clone(), args)
    }

    /// Allocate an instance of `class` and run its constructor
    pub fn construct(&self, class: &Object, args: &[Value]) -> EngineResult<Object> {
        self.instantiate(class, args, Construction::Instance)
    }

    pub(crate) fn instantiate(
        &self,
        class: &Object,
        args: &[Value],
        mode: Construction,
    ) -> EngineResult<Object> {
        let constructor = match class.callable() {
            Some(Callable::Constructor(constructor)) => constructor,
            _ => return Err(EngineError::type_mismatch(format!("{:?}", class), "a class")),
        };
        let instance = Object::ordinary(Some(self.class_prototype(class)?));
        match constructor {
            Constructor::Engine => self.run_engine_constructor(class, &instance, args, mode)?,
            Constructor::Host(ctor) => {
                ctor(self, &Value::Object(instance.clone()), args)?;
            }
        }
        Ok(instance)
    }
}
