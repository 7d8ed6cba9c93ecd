use crate::{
    codec::CodecRegistry,
    declare::{Entity, Object},
    error::{Error, MissingKind, MissingValueError, ValidationError, ValueError},
    model::{ClassDescriptor, FieldRole},
    pipeline::Row,
    resolve,
    value::{UdtValue, Value},
};
use std::{
    any::{Any, type_name},
    collections::BTreeMap,
    sync::Arc,
};

impl ClassDescriptor {
    /// Descriptor of the concrete type of `object`: this one, or the variant
    /// registered for the object's runtime type.
    pub fn descriptor_for(&self, object: &dyn Any) -> Result<Arc<Self>, Error> {
        let id = Any::type_id(object);
        if id == self.type_id() {
            return Ok(resolve::resolve(self.type_ref)?);
        }

        match self.variants.as_ref().and_then(|v| v.by_type(id)) {
            Some(variant) => Ok(resolve::resolve(variant.type_ref)?),
            None => Err(ValidationError::statement(
                self.type_name(),
                "object is neither an instance of this type nor of a registered variant",
            )
            .into()),
        }
    }

    /// Keyspace-key values held by an instance, checked against each key's
    /// exclusion list. Keys the instance leaves empty are omitted.
    pub fn keyspace_values(&self, object: &mut dyn Any) -> Result<BTreeMap<String, String>, Error> {
        let mut values = BTreeMap::new();

        for field in self.keyspace_key_fields() {
            let value = field.get_value(object)?;
            if value.is_null() {
                continue;
            }
            field.validate_value(&value)?;

            if let (Some(key), Value::Text(text)) = (field.keyspace_key(), value) {
                values.insert(key.name().to_string(), text);
            }
        }

        Ok(values)
    }

    /// Check an explicitly bound keyspace-key value.
    pub fn check_keyspace_key(&self, name: &str, value: &str) -> Result<(), Error> {
        if !self.keyspace.keys().iter().any(|k| k == name) {
            return Err(ValidationError::statement(
                self.type_name(),
                format!("keyspace '{}' declares no key '{name}'", self.keyspace.name()),
            )
            .into());
        }

        match self
            .keyspace_key_fields()
            .find(|f| f.keyspace_key().is_some_and(|k| k.name() == name))
        {
            Some(field) => field.validate_value(&Value::text(value)),
            None => Ok(()),
        }
    }

    /// Physical keyspace name for the given keyspace-key values.
    pub fn keyspace_name(&self, values: &BTreeMap<String, String>) -> Result<String, Error> {
        self.keyspace.physical_name(values).map_err(|key| {
            ValidationError::MissingKeyspaceKey {
                class: self.type_name(),
                key,
            }
            .into()
        })
    }

    /// Instantiate and populate an object from a row of `table`. A row of a
    /// root table produces the variant named by its type key.
    pub fn decode_object(
        &self,
        table: &str,
        row: &Row,
        keyspace: &str,
        keys: &BTreeMap<String, String>,
        codecs: &CodecRegistry,
    ) -> Result<Object, Error> {
        let target = self.row_target(table, row)?;
        let Some(columns) = target.table(table) else {
            return Err(ValidationError::UnknownTable {
                class: target.type_name(),
                table: table.to_string(),
            }
            .into());
        };

        let mut object = target.new_instance();
        for column in columns.columns() {
            if let Some(value) = column.decode_value(row, keyspace, codecs)? {
                column.set_value(object.as_mut(), value)?;
            }
        }
        for field in target.keyspace_key_fields() {
            if let Some(key) = field.keyspace_key()
                && let Some(value) = keys.get(key.name())
            {
                field.set_value(object.as_mut(), Value::text(value.as_str()))?;
            }
        }

        Ok(object)
    }

    fn row_target(&self, table: &str, row: &Row) -> Result<Arc<Self>, Error> {
        let (true, Some(registry)) = (self.kind.is_root(), self.variants.as_ref()) else {
            return Ok(resolve::resolve(self.type_ref)?);
        };

        let type_key = self
            .table(table)
            .and_then(|t| t.columns().iter().find(|c| matches!(c.role(), FieldRole::TypeKey)));
        let Some(type_key) = type_key else {
            return Ok(resolve::resolve(self.type_ref)?);
        };

        let column = type_key.column_or_name();
        let Some(Value::Text(discriminator)) = row.get(column) else {
            return Err(MissingValueError {
                kind: MissingKind::TypeKey,
                class: self.type_name(),
                field: type_key.name().to_string(),
                column: column.to_string(),
            }
            .into());
        };

        match registry.by_discriminator(discriminator) {
            Some(variant) => Ok(resolve::resolve(variant.type_ref)?),
            None => Err(ValidationError::UnknownVariant {
                class: self.type_name(),
                variant: discriminator.clone(),
            }
            .into()),
        }
    }

    /// Structured value of a user-defined type instance, in column order.
    pub fn to_udt_value(&self, object: &dyn Any) -> Result<UdtValue, Error> {
        let Some(udt) = &self.udt else {
            return Err(not_udt(self));
        };

        let mut value = UdtValue::new(udt.name());
        for column in udt.columns() {
            value
                .fields
                .push((column.column_or_name().to_string(), column.peek_value(object)?));
        }

        Ok(value)
    }

    /// Build an instance of this type from a structured value. Fields the
    /// value does not carry keep their defaults.
    pub fn from_udt_value(&self, value: &UdtValue) -> Result<Object, Error> {
        let Some(udt) = &self.udt else {
            return Err(not_udt(self));
        };

        let mut object = self.new_instance();
        for column in udt.columns() {
            if let Some(field) = value.get(column.column_or_name()) {
                column.set_value(object.as_mut(), field.clone())?;
            }
        }

        Ok(object)
    }
}

fn not_udt(descriptor: &ClassDescriptor) -> Error {
    ValidationError::statement(
        descriptor.type_name(),
        format!("a {} is not a user-defined type", descriptor.kind().label()),
    )
    .into()
}

/// `FieldValue::to_value` of a mapped user-defined type.
pub fn udt_to_value<T: Entity>(object: &T) -> Result<Value, ValueError> {
    let descriptor = resolve::descriptor::<T>().map_err(|e| ValueError::from(Error::from(e)))?;

    descriptor
        .to_udt_value(object)
        .map(Value::Udt)
        .map_err(ValueError::from)
}

/// `FieldValue::from_value` of a mapped user-defined type.
pub fn udt_from_value<T: Entity>(value: Value) -> Result<T, ValueError> {
    let udt = match value {
        Value::Udt(udt) => udt,
        other => {
            return Err(ValueError::mismatch(
                format!("udt<{}>", type_name::<T>()),
                other.label(),
            ));
        }
    };
    let descriptor = resolve::descriptor::<T>().map_err(|e| ValueError::from(Error::from(e)))?;
    let object: Box<dyn Any + Send + Sync> = descriptor.from_udt_value(&udt)?;

    object
        .downcast::<T>()
        .map(|object| *object)
        .map_err(|_| ValueError::WrongObject {
            expected: type_name::<T>(),
        })
}
