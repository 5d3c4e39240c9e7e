//! Class Factory
//!
//! Public definition entry points: [`Realm::create_class`],
//! [`Realm::extend_class`] and [`Realm::extend_object`].
//!
//! A new class's prototype is an *uninitialized instance* of its superclass:
//! the superclass constructor runs for real (so host construction logic
//! happens), but with the initializer temporarily replaced by the realm's
//! no-op function. Bound members are not applied to the template; the
//! prototype keeps the unbound versions that instances shadow.

use crate::apid::Apid;
use crate::class::extension::{self, TargetKind};
use crate::error::{EngineError, EngineResult};
use crate::object::{Callable, Constructor, Object};
use crate::realm::Realm;
use crate::value::Value;

/// What an engine constructor is building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Construction {
    /// Regular instance: bound members are applied, then the initializer runs
    Instance,
    /// Prototype template for a subclass: bound members stay unbound
    Template,
}

impl Realm {
    /// Create a new class from an APID
    ///
    /// The superclass comes from the APID's `superclass$` declaration and
    /// defaults to the root `Object` class. A `initialize$` declaration runs
    /// once, with the new class as receiver, after all members are installed.
    pub fn create_class(&self, apid: &Apid) -> EngineResult<Object> {
        self.define_class_from(apid).inspect_err(|err| {
            tracing::debug!(error = %err, "class definition failed");
        })
    }

    fn define_class_from(&self, apid: &Apid) -> EngineResult<Object> {
        let superclass = match apid.superclass_value() {
            None => self.object_class(),
            Some(Value::Object(class)) if self.is_class(class) => class.clone(),
            Some(other) => {
                return Err(EngineError::type_mismatch(
                    format!("superclass ({})", other.type_name()),
                    "a class",
                ))
            }
        };

        let class = self.alloc_function(Callable::Constructor(Constructor::Engine));
        self.metadata()
            .ensure(&class, Some(&superclass), Some(&superclass), true);

        let prototype = self.uninitialized_instance(&superclass)?;
        prototype.define_value("constructor", &class);
        class.define_value("prototype", prototype);

        let table = apid.members()?;
        extension::apply(self, &class, &superclass, &table, TargetKind::Class)?;
        self.run_static_initializer(apid, &class)?;

        tracing::debug!(
            class = %class.id(),
            superclass = %superclass.id(),
            members = table.len(),
            "created class"
        );
        Ok(class)
    }

    /// Add members to an existing class
    ///
    /// Super dispatch in the new members reaches the class's previous
    /// definitions, so a class can be patched incrementally.
    pub fn extend_class(&self, class: &Object, apid: &Apid) -> EngineResult<Object> {
        self.extend_target(class, apid, TargetKind::Class)
            .inspect_err(|err| tracing::debug!(error = %err, class = %class.id(), "class extension failed"))
    }

    /// Add members to a plain object; static entries are ignored
    pub fn extend_object(&self, obj: &Object, apid: &Apid) -> EngineResult<Object> {
        self.extend_target(obj, apid, TargetKind::Object)
            .inspect_err(|err| tracing::debug!(error = %err, object = %obj.id(), "object extension failed"))
    }

    fn extend_target(&self, target: &Object, apid: &Apid, kind: TargetKind) -> EngineResult<Object> {
        if kind == TargetKind::Class && !self.is_class(target) {
            return Err(EngineError::type_mismatch(format!("{:?}", target), "a class"));
        }
        self.metadata().ensure(target, Some(target), None, false);

        let table = apid.members()?;
        extension::apply(self, target, target, &table, kind)?;
        self.run_static_initializer(apid, target)?;

        tracing::debug!(target_id = %target.id(), members = table.len(), ?kind, "extended");
        Ok(target.clone())
    }

    fn run_static_initializer(&self, apid: &Apid, receiver: &Object) -> EngineResult<()> {
        let Some(init) = apid.initializer_value() else {
            return Ok(());
        };
        if !init.is_callable() {
            return Err(EngineError::type_mismatch("static initializer", "a function"));
        }
        self.call(init, Value::Object(receiver.clone()), &[])?;
        Ok(())
    }

    /// Construct `class` with its initializer suppressed
    fn uninitialized_instance(&self, class: &Object) -> EngineResult<Object> {
        let prototype = self.class_prototype(class)?;
        let init_name = self.options().initializer.as_str();

        let previous = prototype.lookup(init_name);
        let own = prototype.get_own(init_name);
        prototype.define_value(init_name, self.nilf());

        let instance = self.instantiate(class, &[], Construction::Template);

        match own {
            Some(prop) => prototype.define(init_name, prop),
            None => {
                prototype.remove(init_name);
                // The initializer may be inherited and can have changed during construction
                if let Some(prop) = previous {
                    if prototype.lookup(init_name).as_ref() != Some(&prop) {
                        prototype.define(init_name, prop);
                    }
                }
            }
        }
        instance
    }

    /// Engine constructor body: bind registered methods, then run the initializer
    pub(crate) fn run_engine_constructor(
        &self,
        class: &Object,
        instance: &Object,
        args: &[Value],
        mode: Construction,
    ) -> EngineResult<()> {
        let this = Value::Object(instance.clone());

        if mode == Construction::Instance && self.metadata().has_binds(class.id()) {
            for name in self.metadata().binds(class.id()) {
                let method = self.get(&this, &name)?;
                let bound = self.bind(&method, this.clone())?;
                instance.define_value(&name, bound);
            }
        }

        let init = self.get(&this, &self.options().initializer)?;
        if init.is_callable() && init != Value::Object(self.nilf()) {
            self.call(&init, this, args)?;
        }
        Ok(())
    }
}
