use crate::{error::ValueError, types::FieldValue, value::Value};
use std::any::{Any, TypeId, type_name};

///
/// GetterFn
///
/// Type-erased read accessor bound to one concrete owner type.
///

pub(crate) trait GetterFn: Send + Sync {
    fn get(&self, object: &dyn Any) -> Result<Value, ValueError>;

    fn value_type(&self) -> (TypeId, &'static str);
}

///
/// SetterFn
///

pub(crate) trait SetterFn: Send + Sync {
    fn set(&self, object: &mut dyn Any, value: Value) -> Result<(), ValueError>;

    fn value_type(&self) -> (TypeId, &'static str);
}

///
/// Projection
///
/// Projects an instance onto the ancestor it embeds.
///

pub(crate) trait Projection: Send + Sync {
    fn project<'a>(&self, object: &'a dyn Any) -> Option<&'a dyn Any>;

    fn project_mut<'a>(&self, object: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
}

fn downcast<T: Any>(object: &dyn Any) -> Result<&T, ValueError> {
    object.downcast_ref::<T>().ok_or(ValueError::WrongObject {
        expected: type_name::<T>(),
    })
}

fn downcast_mut<T: Any>(object: &mut dyn Any) -> Result<&mut T, ValueError> {
    object.downcast_mut::<T>().ok_or(ValueError::WrongObject {
        expected: type_name::<T>(),
    })
}

fn value_type_of<V: 'static>() -> (TypeId, &'static str) {
    (TypeId::of::<V>(), type_name::<V>())
}

// direct field access

pub(crate) struct DirectGetter<T, V> {
    pub(crate) get: fn(&T) -> &V,
}

impl<T: Any, V: FieldValue> GetterFn for DirectGetter<T, V> {
    fn get(&self, object: &dyn Any) -> Result<Value, ValueError> {
        (self.get)(downcast::<T>(object)?).to_value()
    }

    fn value_type(&self) -> (TypeId, &'static str) {
        value_type_of::<V>()
    }
}

pub(crate) struct DirectSetter<T, V> {
    pub(crate) get_mut: fn(&mut T) -> &mut V,
}

impl<T: Any, V: FieldValue> SetterFn for DirectSetter<T, V> {
    fn set(&self, object: &mut dyn Any, value: Value) -> Result<(), ValueError> {
        let value = V::from_value(value)?;
        *(self.get_mut)(downcast_mut::<T>(object)?) = value;

        Ok(())
    }

    fn value_type(&self) -> (TypeId, &'static str) {
        value_type_of::<V>()
    }
}

// named methods

pub(crate) struct MethodGetter<T, V> {
    pub(crate) f: Box<dyn Fn(&T) -> V + Send + Sync>,
}

impl<T: Any, V: FieldValue> GetterFn for MethodGetter<T, V> {
    fn get(&self, object: &dyn Any) -> Result<Value, ValueError> {
        (self.f)(downcast::<T>(object)?).to_value()
    }

    fn value_type(&self) -> (TypeId, &'static str) {
        value_type_of::<V>()
    }
}

pub(crate) struct MethodSetter<T, V> {
    pub(crate) f: Box<dyn Fn(&mut T, V) + Send + Sync>,
}

impl<T: Any, V: FieldValue> SetterFn for MethodSetter<T, V> {
    fn set(&self, object: &mut dyn Any, value: Value) -> Result<(), ValueError> {
        let value = V::from_value(value)?;
        (self.f)(downcast_mut::<T>(object)?, value);

        Ok(())
    }

    fn value_type(&self) -> (TypeId, &'static str) {
        value_type_of::<V>()
    }
}

// hierarchy

pub(crate) struct ParentProjection<T, P> {
    pub(crate) up: fn(&T) -> &P,
    pub(crate) up_mut: fn(&mut T) -> &mut P,
}

impl<T: Any, P: Any> Projection for ParentProjection<T, P> {
    fn project<'a>(&self, object: &'a dyn Any) -> Option<&'a dyn Any> {
        object
            .downcast_ref::<T>()
            .map(|object| (self.up)(object) as &dyn Any)
    }

    fn project_mut<'a>(&self, object: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        object
            .downcast_mut::<T>()
            .map(|object| (self.up_mut)(object) as &mut dyn Any)
    }
}
