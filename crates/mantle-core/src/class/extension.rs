//! Extension Applier
//!
//! Installs a processed [`MemberTable`] onto a target. For classes, static
//! members land on the class object and instance members on its prototype;
//! for plain objects everything lands on the object and static members are
//! skipped.
//!
//! Members are installed one at a time. An error aborts the call but leaves
//! members installed earlier in the same call in place.

use crate::apid::{MemberDescriptor, MemberKind, MemberTable};
use crate::class::metadata::AccessorPair;
use crate::class::super_dispatch::superify;
use crate::error::{EngineError, EngineResult};
use crate::object::{Object, Property};
use crate::realm::Realm;
use crate::value::Value;

/// What kind of target is being extended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetKind {
    /// Class constructor with a prototype
    Class,
    /// Plain object
    Object,
}

/// Where one member goes, and where its super member comes from
struct Placement {
    destination: Object,
    super_destination: Object,
    /// Sentinel holder for primitive-wrapper superclasses
    holder: Option<Object>,
}

pub(crate) fn apply(
    realm: &Realm,
    target: &Object,
    super_target: &Object,
    table: &MemberTable,
    kind: TargetKind,
) -> EngineResult<()> {
    let primitive_super = realm.is_primitive_wrapper(super_target);

    for member in table.iter() {
        if member.is_static && kind == TargetKind::Object {
            tracing::trace!(member = %member.name, "skipping static member on plain object");
            continue;
        }

        let placement = if kind == TargetKind::Class && !member.is_static {
            let super_destination = realm.class_prototype(super_target)?;
            Placement {
                destination: realm.class_prototype(target)?,
                holder: primitive_super.then(|| super_destination.clone()),
                super_destination,
            }
        } else {
            Placement {
                destination: target.clone(),
                super_destination: super_target.clone(),
                holder: None,
            }
        };

        match &member.kind {
            MemberKind::Accessor { getter, setter } => {
                install_accessor(
                    realm,
                    target,
                    super_target,
                    member,
                    getter.as_ref(),
                    setter.as_ref(),
                    &placement,
                )?
            }
            MemberKind::Bound(value) => install_bound(realm, target, kind, member, value, &placement)?,
            MemberKind::Plain(value) => {
                let value = superify(
                    realm,
                    value.clone(),
                    || super_member(realm, &placement, &member.name),
                    placement.holder.as_ref(),
                    &member.name,
                    &member.key,
                )?;
                placement.destination.define_value(&member.name, value);
            }
        }
        tracing::trace!(member = %member.slot(), "installed member");
    }
    Ok(())
}

fn super_member(realm: &Realm, placement: &Placement, name: &str) -> EngineResult<Option<Value>> {
    let value = realm.get(&Value::Object(placement.super_destination.clone()), name)?;
    Ok((!value.is_undefined()).then_some(value))
}

fn install_accessor(
    realm: &Realm,
    target: &Object,
    super_target: &Object,
    member: &MemberDescriptor,
    getter: Option<&Value>,
    setter: Option<&Value>,
    placement: &Placement,
) -> EngineResult<()> {
    let slot = member.slot();
    // Recorded pairs resolve through the superclass records; accessors the
    // host put on the chain directly are picked up as a last resort
    let inherited = realm
        .metadata()
        .accessor(super_target.id(), &slot)
        .or_else(|| match placement.super_destination.lookup(&member.name) {
            Some(Property::Accessor { get, set }) => Some(AccessorPair {
                getter: get,
                setter: set,
            }),
            _ => None,
        })
        .unwrap_or_default();

    let resolve = |own: Option<&Value>, inherited: Option<Value>| -> EngineResult<Option<Value>> {
        match own {
            Some(func) => superify(
                realm,
                func.clone(),
                || Ok(inherited),
                placement.holder.as_ref(),
                &member.name,
                &member.key,
            )
            .map(Some),
            None => Ok(inherited),
        }
    };
    let pair = AccessorPair {
        getter: resolve(getter, inherited.getter)?,
        setter: resolve(setter, inherited.setter)?,
    };

    if pair.getter.is_none() && pair.setter.is_none() {
        return Ok(());
    }
    if !realm.options().accessors {
        return Err(EngineError::PlatformCapability(format!(
            "no support for getter/setter properties (`{}`)",
            member.key
        )));
    }
    placement
        .destination
        .define_accessor(&member.name, pair.getter.clone(), pair.setter.clone());
    realm.metadata().record_accessor(target.id(), slot, pair);
    Ok(())
}

fn install_bound(
    realm: &Realm,
    target: &Object,
    kind: TargetKind,
    member: &MemberDescriptor,
    value: &Value,
    placement: &Placement,
) -> EngineResult<()> {
    if !value.is_callable() {
        return Err(EngineError::type_mismatch(&member.key, "a function"));
    }
    let value = superify(
        realm,
        value.clone(),
        || super_member(realm, placement, &member.name),
        placement.holder.as_ref(),
        &member.name,
        &member.key,
    )?;

    if kind == TargetKind::Class && !member.is_static {
        if !realm.metadata().is_engine_class(target.id()) {
            return Err(EngineError::definition(
                &member.key,
                "instance members can only be bound on classes created by the engine",
            ));
        }
        realm.metadata().register_bind(target.id(), &member.name);
        placement.destination.define_value(&member.name, value);
    } else {
        let bound = realm.bind(&value, Value::Object(placement.destination.clone()))?;
        placement.destination.define_value(&member.name, bound);
    }
    Ok(())
}
