use crate::{
    codec::CodecRegistry,
    declare::Object,
    error::{Error, ValidationError},
    mapper::Mapper,
    model::{ClassDescriptor, FieldDescriptor, TableDescriptor},
    statement::{Binding, Clause},
    value::Value,
};
use cqlmap_config::{ExcludedKeyPolicy, MapperConfig};
use std::{any::Any, collections::BTreeMap, sync::Arc};

///
/// Target
///
/// What a data statement operates on: a descriptor, optionally an owned
/// instance, explicit keyspace-key bindings and a table restriction.
///

#[derive(Debug)]
pub(crate) struct Target {
    mapper: Mapper,
    descriptor: Arc<ClassDescriptor>,
    object: Option<Object>,
    keyspace_keys: BTreeMap<String, String>,
    tables: Vec<String>,
    pinned: Option<String>,
}

impl Target {
    pub(crate) fn class(mapper: Mapper, descriptor: Arc<ClassDescriptor>) -> Self {
        Self {
            mapper,
            descriptor,
            object: None,
            keyspace_keys: BTreeMap::new(),
            tables: Vec::new(),
            pinned: None,
        }
    }

    /// Bind an instance; the descriptor becomes that of its concrete type.
    pub(crate) fn object(
        mapper: Mapper,
        descriptor: &ClassDescriptor,
        object: Object,
    ) -> Result<Self, Error> {
        let descriptor = descriptor.descriptor_for(object.as_ref())?;

        Ok(Self {
            object: Some(object),
            ..Self::class(mapper, descriptor)
        })
    }

    pub(crate) const fn descriptor(&self) -> &Arc<ClassDescriptor> {
        &self.descriptor
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.descriptor.type_name()
    }

    pub(crate) fn codecs(&self) -> &CodecRegistry {
        self.mapper.codecs()
    }

    pub(crate) fn config(&self) -> &MapperConfig {
        self.mapper.config()
    }

    pub(crate) fn excluded_keys(&self) -> ExcludedKeyPolicy {
        self.config().statements.excluded_keys
    }

    pub(crate) const fn has_object(&self) -> bool {
        self.object.is_some()
    }

    pub(crate) fn object_ref<T: Any>(&self) -> Option<&T> {
        self.object.as_ref()?.downcast_ref::<T>()
    }

    pub(crate) fn object_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.object.as_mut()?.downcast_mut::<T>()
    }

    pub(crate) fn bind_keyspace_key(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.keyspace_keys.insert(name.into(), value.into());
    }

    /// Use a physical keyspace chosen by the caller, as schema planning
    /// does for user-defined types shared between keyspaces.
    pub(crate) fn pin_keyspace(&mut self, keyspace: impl Into<String>) {
        self.pinned = Some(keyspace.into());
    }

    pub(crate) fn restrict_table(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.tables.contains(&name) {
            self.tables.push(name);
        }
    }

    /// Tables the statement fans out to: the restriction, or every table.
    pub(crate) fn tables(&self) -> Result<Vec<TableDescriptor>, Error> {
        if self.tables.is_empty() {
            return Ok(self.descriptor.tables().to_vec());
        }

        self.tables
            .iter()
            .map(|name| {
                self.descriptor.table(name).cloned().ok_or_else(|| {
                    ValidationError::UnknownTable {
                        class: self.type_name(),
                        table: name.clone(),
                    }
                    .into()
                })
            })
            .collect()
    }

    /// Physical keyspace name. Instance values come first, then clause
    /// bindings, then explicit bindings.
    pub(crate) fn keyspace(&mut self, clauses: &[Clause]) -> Result<String, Error> {
        if let Some(pinned) = &self.pinned {
            return Ok(pinned.clone());
        }

        let mut values = match self.object.as_mut() {
            Some(object) => self.descriptor.keyspace_values(object.as_mut())?,
            None => BTreeMap::new(),
        };

        for clause in clauses {
            clause.keyspace_bindings(&self.descriptor, &mut values)?;
        }
        for (name, value) in &self.keyspace_keys {
            self.descriptor.check_keyspace_key(name, value)?;
            values.insert(name.clone(), value.clone());
        }

        self.descriptor.keyspace_name(&values)
    }

    /// Read, validate and encode one column of the bound instance.
    pub(crate) fn column_value(
        &mut self,
        field: &FieldDescriptor,
        keyspace: &str,
    ) -> Result<Value, Error> {
        let Some(object) = self.object.as_mut() else {
            return Err(ValidationError::statement(
                self.descriptor.type_name(),
                "statement has no bound instance",
            )
            .into());
        };

        let value = field.get_value(object.as_mut())?;
        field.validate_value(&value)?;

        field.encode_value(value, keyspace, self.mapper.codecs())
    }

    /// Primary-key bindings of the bound instance in one table, one set per
    /// combination of multi-key elements.
    pub(crate) fn key_bindings(
        &mut self,
        table: &TableDescriptor,
        keyspace: &str,
    ) -> Result<Vec<Vec<Binding>>, Error> {
        let mut keys = Vec::new();
        for field in table.primary_keys() {
            let value = self.column_value(field, keyspace)?;
            keys.push((field.column_or_name().to_string(), alternatives(field, value)?));
        }

        Ok(fan_out(keys))
    }
}

// A multi-key column binds each element of its set separately.
fn alternatives(field: &FieldDescriptor, value: Value) -> Result<Vec<Value>, Error> {
    match value {
        Value::Set(items) | Value::List(items) if field.multi_key_type().is_some() => {
            if items.is_empty() {
                return Err(ValidationError::NullPrimaryKey {
                    column: field.column_or_name().to_string(),
                }
                .into());
            }
            Ok(items)
        }
        value => Ok(vec![value]),
    }
}

/// Cartesian product of per-column alternatives, in column order.
pub(crate) fn fan_out(keys: Vec<(String, Vec<Value>)>) -> Vec<Vec<Binding>> {
    let mut rows: Vec<Vec<Binding>> = vec![Vec::new()];

    for (column, alternatives) in keys {
        let mut next = Vec::with_capacity(rows.len() * alternatives.len());
        for row in &rows {
            for value in &alternatives {
                let mut row = row.clone();
                row.push(Binding::new(column.as_str(), value.clone()));
                next.push(row);
            }
        }
        rows = next;
    }

    rows
}
