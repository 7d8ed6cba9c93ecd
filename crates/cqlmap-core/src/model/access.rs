use crate::{
    declare::access::{GetterFn, Projection, SetterFn},
    error::ValueError,
    value::Value,
};
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

///
/// Accessor
///
/// Getter/setter pair bound to one concrete type.
///

#[derive(Clone, Default)]
pub(crate) struct Accessor {
    pub(crate) getter: Option<Arc<dyn GetterFn>>,
    pub(crate) setter: Option<Arc<dyn SetterFn>>,
}

///
/// Lineage
///
/// Child-to-parent links of a type hierarchy, with the projection that
/// reaches the embedded ancestor.
///

#[derive(Clone, Default)]
pub(crate) struct Lineage {
    links: HashMap<TypeId, (TypeId, Arc<dyn Projection>)>,
}

impl Lineage {
    pub(crate) fn link(&mut self, child: TypeId, parent: TypeId, projection: Arc<dyn Projection>) {
        self.links.entry(child).or_insert((parent, projection));
    }

    pub(crate) fn extend(&mut self, other: &Self) {
        for (child, (parent, projection)) in &other.links {
            self.link(*child, *parent, projection.clone());
        }
    }

    pub(crate) fn parent_of(&self, child: TypeId) -> Option<TypeId> {
        self.links.get(&child).map(|(parent, _)| *parent)
    }
}

///
/// AccessorTable
///
/// Accessors of one field keyed by concrete type. Lookup starts at the
/// runtime type of the instance and walks toward its ancestors until a
/// binding is found.
///

#[derive(Clone)]
pub struct AccessorTable {
    bindings: HashMap<TypeId, Accessor>,
    lineage: Arc<Lineage>,
}

impl AccessorTable {
    pub(crate) fn new(bindings: HashMap<TypeId, Accessor>, lineage: Arc<Lineage>) -> Self {
        Self { bindings, lineage }
    }

    /// Read the field; `None` when no type in the chain binds a getter.
    pub(crate) fn get(&self, object: &dyn Any) -> Option<Result<Value, ValueError>> {
        let id = Any::type_id(object);

        if let Some(getter) = self.bindings.get(&id).and_then(|a| a.getter.as_ref()) {
            return Some(getter.get(object));
        }

        let (_, projection) = self.lineage.links.get(&id)?;
        self.get(projection.project(object)?)
    }

    /// Write the field; `None` when no type in the chain binds a setter.
    pub(crate) fn set(&self, object: &mut dyn Any, value: Value) -> Option<Result<(), ValueError>> {
        let id = Any::type_id(&*object);

        if let Some(setter) = self.bindings.get(&id).and_then(|a| a.setter.as_ref()) {
            return Some(setter.set(object, value));
        }

        let (_, projection) = self.lineage.links.get(&id)?;
        self.set(projection.project_mut(object)?, value)
    }

    /// Whether any type in the chain of `id` binds a setter.
    #[must_use]
    pub fn has_setter(&self, mut id: TypeId) -> bool {
        loop {
            if self.bindings.get(&id).is_some_and(|a| a.setter.is_some()) {
                return true;
            }
            match self.lineage.parent_of(id) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    /// Whether any type in the chain of `id` binds a getter.
    #[must_use]
    pub fn has_getter(&self, mut id: TypeId) -> bool {
        loop {
            if self.bindings.get(&id).is_some_and(|a| a.getter.is_some()) {
                return true;
            }
            match self.lineage.parent_of(id) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }
}

impl fmt::Debug for AccessorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorTable")
            .field("bindings", &self.bindings.len())
            .finish_non_exhaustive()
    }
}
