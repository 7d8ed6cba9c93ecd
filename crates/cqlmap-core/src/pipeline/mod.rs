//! Field value pipeline: role-aware validation, persistence transforms and
//! codec-shaped encoding and decoding of column values.

mod object;
mod row;

#[cfg(test)]
mod tests;

use crate::{
    codec::CodecRegistry,
    declare::Persisted,
    error::{
        BoxError, ConversionError, Error, ExcludedKeyError, MissingKind, MissingValueError,
        PersistenceEncodingError, ValidationError,
    },
    model::{FieldDescriptor, FieldRole, TypeKeySource},
    resolve,
    types::DataType,
    value::{UdtValue, Value},
};
use std::any::Any;
use tracing::trace;

// re-exports
pub use object::{udt_from_value, udt_to_value};
pub use row::Row;

impl FieldDescriptor {
    /// Check an in-memory value against the field's role and data type.
    pub fn validate_value(&self, value: &Value) -> Result<(), Error> {
        if value.is_null() {
            return self.validate_null();
        }

        if let Some(key) = self.keyspace_key() {
            let Value::Text(text) = value else {
                return Err(ValidationError::KeyspaceKeyType {
                    key: key.name().to_string(),
                    found: value.label(),
                }
                .into());
            };
            if key.is_excluded(text) {
                return Err(ExcludedKeyError {
                    class: self.class_type,
                    key: key.name().to_string(),
                    value: text.clone(),
                }
                .into());
            }
            return Ok(());
        }

        if self.data_type.accepts(value)
            || self.multi_key.as_ref().is_some_and(|e| e.accepts(value))
        {
            return Ok(());
        }

        let expected = match &self.multi_key {
            Some(element) => format!("{} or {}", self.data_type.label(), element.label()),
            None => self.data_type.label(),
        };

        Err(ValidationError::TypeMismatch {
            column: self.column_or_name().to_string(),
            expected,
            found: value.label(),
        }
        .into())
    }

    fn validate_null(&self) -> Result<(), Error> {
        let column = self.column_or_name().to_string();

        let err = match &self.role {
            FieldRole::TypeKey => ValidationError::NullTypeKey { column },
            FieldRole::PartitionKey | FieldRole::ClusteringKey(_) if self.optional => {
                ValidationError::EmptyOptionalPrimaryKey { column }
            }
            FieldRole::PartitionKey | FieldRole::ClusteringKey(_) => {
                ValidationError::NullPrimaryKey { column }
            }
            FieldRole::KeyspaceKey(key) => ValidationError::MissingKeyspaceKey {
                class: self.class_type,
                key: key.name().to_string(),
            },
            _ if self.mandatory && !self.is_counter() => ValidationError::NullMandatory { column },
            _ => return Ok(()),
        };

        Err(err.into())
    }

    /// Turn a validated in-memory value into the value bound to the column:
    /// user-defined values are shaped through the keyspace's codec, then the
    /// persister runs.
    pub fn encode_value(
        &self,
        value: Value,
        keyspace: &str,
        codecs: &CodecRegistry,
    ) -> Result<Value, Error> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        // a single element bound against a multi-key column
        let data_type = match &self.multi_key {
            Some(element) if !self.data_type.accepts(&value) => element,
            _ => &self.data_type,
        };

        let mut value = if data_type.contains_udt() {
            shape(data_type, value, keyspace, codecs)?
        } else {
            value
        };
        if self.ignore_case && self.role.is_primary_key() {
            value = lowercase(value);
        }

        match &self.persisted {
            Some(persisted) => self.persist(persisted, value),
            None => Ok(value),
        }
    }

    fn persist(&self, persisted: &Persisted, value: Value) -> Result<Value, Error> {
        let persister = persisted.persister();
        let encoded = if self.persist_elements {
            map_elements(value, &mut |v| persister.encode(&v))
        } else {
            persister.encode(&value)
        };

        encoded.map_err(|source| {
            PersistenceEncodingError {
                class: self.declaring_type,
                field: self.name.clone(),
                cql_type: self.storage_type().label(),
                persister: persister.name().to_string(),
                source,
            }
            .into()
        })
    }

    /// Read this field's column from a row. `Ok(None)` when an optional
    /// column is absent from the row.
    pub fn decode_value(
        &self,
        row: &Row,
        keyspace: &str,
        codecs: &CodecRegistry,
    ) -> Result<Option<Value>, Error> {
        if !self.role.is_column() {
            return Ok(None);
        }
        let column = self.column_or_name();

        match row.get(column) {
            Some(value) if !value.is_null() => {
                self.decode_raw(value.clone(), keyspace, codecs).map(Some)
            }
            present => {
                if self.is_counter() {
                    return Ok(Some(Value::BigInt(0)));
                }
                match self.missing_kind() {
                    Some(kind) => Err(MissingValueError {
                        kind,
                        class: self.class_type,
                        field: self.name.clone(),
                        column: column.to_string(),
                    }
                    .into()),
                    None => Ok(present.cloned()),
                }
            }
        }
    }

    const fn missing_kind(&self) -> Option<MissingKind> {
        match self.role {
            FieldRole::PartitionKey => Some(MissingKind::PartitionKey),
            FieldRole::ClusteringKey(_) => Some(MissingKind::ClusteringKey),
            FieldRole::TypeKey => Some(MissingKind::TypeKey),
            _ if self.mandatory => Some(MissingKind::MandatoryColumn),
            _ => None,
        }
    }

    // Reverse the persister and the codec shaping of a stored value.
    fn decode_raw(
        &self,
        raw: Value,
        keyspace: &str,
        codecs: &CodecRegistry,
    ) -> Result<Value, Error> {
        if raw.is_null() {
            return Ok(Value::Null);
        }

        let value = match &self.persisted {
            Some(persisted) => {
                let persister = persisted.persister();
                let decoded = if self.persist_elements {
                    map_elements(raw, &mut |v| persister.decode(&v))
                } else {
                    persister.decode(&raw)
                };
                decoded.map_err(|source| {
                    self.conversion(
                        format!("failed to decode column with persister '{}'", persister.name()),
                        Some(source),
                    )
                })?
            }
            None => raw,
        };

        // multi-key rows hold one element of the key set
        let value = match &self.multi_key {
            Some(element) if !self.data_type.accepts(&value) && element.accepts(&value) => {
                Value::Set(vec![self.unshape(element, value, keyspace, codecs)?])
            }
            _ => self.unshape(&self.data_type, value, keyspace, codecs)?,
        };

        if !self.data_type.accepts(&value) {
            return Err(self.conversion(
                format!(
                    "expected {} but found {}",
                    self.data_type.label(),
                    value.label()
                ),
                None,
            ));
        }

        Ok(value)
    }

    fn unshape(
        &self,
        data_type: &DataType,
        value: Value,
        keyspace: &str,
        codecs: &CodecRegistry,
    ) -> Result<Value, Error> {
        if !data_type.contains_udt() {
            return Ok(value);
        }

        Ok(match (data_type, value) {
            (DataType::Udt(type_ref), Value::Udt(udt)) => {
                let descriptor = resolve::resolve(*type_ref)?;
                let codec = codecs.get_codec(&descriptor, keyspace)?;
                let decoded = codec
                    .decode(&udt)
                    .map_err(|e| self.conversion("invalid user-defined value", Some(e.into())))?;

                let mut out = UdtValue::new(decoded.name);
                for (name, field) in decoded.fields {
                    let field = match descriptor.udt().and_then(|u| u.column(&name)) {
                        Some(column) => column.decode_raw(field, keyspace, codecs)?,
                        None => field,
                    };
                    out.fields.push((name, field));
                }
                Value::Udt(out)
            }
            (DataType::List(e), Value::List(items)) => Value::List(
                items
                    .into_iter()
                    .map(|v| self.unshape(e, v, keyspace, codecs))
                    .collect::<Result<_, _>>()?,
            ),
            (
                DataType::Set(e) | DataType::OrderedSet(e) | DataType::SortedSet(e),
                Value::Set(items) | Value::List(items),
            ) => Value::Set(
                items
                    .into_iter()
                    .map(|v| self.unshape(e, v, keyspace, codecs))
                    .collect::<Result<_, _>>()?,
            ),
            (DataType::Map(k, v) | DataType::SortedMap(k, v), Value::Map(entries)) => Value::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| {
                        Ok::<_, Error>((
                            self.unshape(k, key, keyspace, codecs)?,
                            self.unshape(v, value, keyspace, codecs)?,
                        ))
                    })
                    .collect::<Result<_, _>>()?,
            ),
            (_, other) => other,
        })
    }

    /// Read the field from an instance. A type key is re-derived from the
    /// descriptor and written back when the instance drifted from it.
    pub fn get_value(&self, object: &mut dyn Any) -> Result<Value, Error> {
        let Some(derived) = self.discriminator(&*object)? else {
            return self.read(&*object);
        };

        let current = self.read(&*object)?;
        if current.as_text() != Some(derived.as_str()) {
            trace!(
                class = self.class_type,
                field = %self.name,
                current = %current,
                derived = %derived,
                "type key rewritten"
            );
            self.set_value(object, Value::Text(derived.clone()))?;
        }

        Ok(Value::Text(derived))
    }

    /// Read-only variant of [`get_value`](Self::get_value).
    pub fn peek_value(&self, object: &dyn Any) -> Result<Value, Error> {
        match self.discriminator(object)? {
            Some(derived) => Ok(Value::Text(derived)),
            None => self.read(object),
        }
    }

    /// Write the field on an instance. Immutable fields and fields without
    /// a setter keep their value.
    pub fn set_value(&self, object: &mut dyn Any, value: Value) -> Result<(), Error> {
        if self.frozen.is_some() {
            return Ok(());
        }

        match self.accessors.set(object, value) {
            Some(result) => {
                result.map_err(|e| self.conversion("failed to set value", Some(e.into())))
            }
            None => {
                trace!(class = self.class_type, field = %self.name, "no setter bound");
                Ok(())
            }
        }
    }

    fn read(&self, object: &dyn Any) -> Result<Value, Error> {
        if let Some(frozen) = &self.frozen {
            return Ok(frozen.clone());
        }

        match self.accessors.get(object) {
            Some(result) => {
                result.map_err(|e| self.conversion("failed to read value", Some(e.into())))
            }
            None => Err(self.conversion("no getter bound for the instance type", None)),
        }
    }

    fn discriminator(&self, object: &dyn Any) -> Result<Option<String>, Error> {
        match &self.type_key {
            None => Ok(None),
            Some(TypeKeySource::Fixed(discriminator)) => Ok(Some(discriminator.clone())),
            Some(TypeKeySource::Variants(registry)) => {
                if let Some(discriminator) = registry.discriminator_of(Any::type_id(object)) {
                    return Ok(Some(discriminator));
                }
                let current = self.read(object)?;
                Err(ValidationError::UnknownVariant {
                    class: self.class_type,
                    variant: current.as_text().unwrap_or_default().to_string(),
                }
                .into())
            }
        }
    }

    fn conversion(&self, message: impl Into<String>, source: Option<BoxError>) -> Error {
        ConversionError {
            class: self.declaring_type,
            field: self.name.clone(),
            message: message.into(),
            source,
        }
        .into()
    }
}

// Shape user-defined values through their codecs, recursing through
// collections and the columns of each composite.
fn shape(
    data_type: &DataType,
    value: Value,
    keyspace: &str,
    codecs: &CodecRegistry,
) -> Result<Value, Error> {
    Ok(match (data_type, value) {
        (DataType::Udt(type_ref), Value::Udt(udt)) => {
            let descriptor = resolve::resolve(*type_ref)?;
            let codec = codecs.get_codec(&descriptor, keyspace)?;

            let mut encoded = UdtValue::new(udt.name);
            for (name, field) in udt.fields {
                let field = match descriptor.udt().and_then(|u| u.column(&name)) {
                    Some(column) => column.encode_value(field, keyspace, codecs)?,
                    None => field,
                };
                encoded.fields.push((name, field));
            }
            Value::Udt(codec.encode(&encoded))
        }
        (DataType::List(e), Value::List(items)) => Value::List(
            items
                .into_iter()
                .map(|v| shape(e, v, keyspace, codecs))
                .collect::<Result<_, _>>()?,
        ),
        (
            DataType::Set(e) | DataType::OrderedSet(e) | DataType::SortedSet(e),
            Value::Set(items) | Value::List(items),
        ) => Value::Set(
            items
                .into_iter()
                .map(|v| shape(e, v, keyspace, codecs))
                .collect::<Result<_, _>>()?,
        ),
        (DataType::Map(k, v), Value::Map(entries))
        | (DataType::SortedMap(k, v), Value::Map(entries)) => Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| {
                    Ok::<_, Error>((
                        shape(k, key, keyspace, codecs)?,
                        shape(v, value, keyspace, codecs)?,
                    ))
                })
                .collect::<Result<_, _>>()?,
        ),
        (_, other) => other,
    })
}

// Apply `f` to each element of a collection (to map values for maps), or
// to the value itself when it is not a collection. Nulls pass through.
fn map_elements<E>(
    value: Value,
    f: &mut impl FnMut(Value) -> Result<Value, E>,
) -> Result<Value, E> {
    let mut apply = |v: Value| if v.is_null() { Ok(v) } else { f(v) };

    Ok(match value {
        Value::List(items) => {
            Value::List(items.into_iter().map(&mut apply).collect::<Result<_, _>>()?)
        }
        Value::Set(items) => {
            Value::Set(items.into_iter().map(&mut apply).collect::<Result<_, _>>()?)
        }
        Value::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| Ok((k, apply(v)?)))
                .collect::<Result<_, E>>()?,
        ),
        other => apply(other)?,
    })
}

fn lowercase(value: Value) -> Value {
    match value {
        Value::Text(text) => Value::Text(text.to_lowercase()),
        Value::List(items) => Value::List(items.into_iter().map(lowercase).collect()),
        Value::Set(items) => Value::Set(items.into_iter().map(lowercase).collect()),
        other => other,
    }
}
