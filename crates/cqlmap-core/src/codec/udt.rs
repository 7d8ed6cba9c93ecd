use crate::{
    error::{ConfigurationError, ValueError},
    model::ClassDescriptor,
    types::DataType,
    value::{UdtValue, Value},
};

///
/// UserType
///
/// Definition of a user-defined type as the store knows it: field names and
/// CQL types in definition order.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserType {
    pub keyspace: String,
    pub name: String,
    pub fields: Vec<(String, String)>,
}

impl UserType {
    #[must_use]
    pub fn new(keyspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            name: name.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, cql_type: impl Into<String>) -> Self {
        self.fields.push((name.into(), cql_type.into()));
        self
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, _)| field == name)
    }

    /// Default definition derived from a descriptor's columns.
    pub(crate) fn synthesize(
        descriptor: &ClassDescriptor,
        keyspace: &str,
    ) -> Result<Self, ConfigurationError> {
        let mut definition = Self::new(keyspace, descriptor.udt_name().unwrap_or_default());

        for column in descriptor.udt().into_iter().flat_map(|u| u.columns()) {
            definition
                .fields
                .push((column.column_or_name().to_string(), column.storage_type().to_cql()?));
        }

        Ok(definition)
    }
}

///
/// CodecSource
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CodecSource {
    Live,
    Default,
}

///
/// UdtCodec
///
/// Shapes structured values of one mapped type against one definition.
///

#[derive(Clone, Debug)]
pub struct UdtCodec {
    type_name: &'static str,
    definition: UserType,
    source: CodecSource,
    // storage types of the mapped columns, in descriptor order
    columns: Vec<(String, DataType)>,
}

impl UdtCodec {
    pub(crate) fn new(owner: &ClassDescriptor, definition: UserType, source: CodecSource) -> Self {
        let columns = owner
            .udt()
            .into_iter()
            .flat_map(|u| u.columns())
            .map(|c| (c.column_or_name().to_string(), c.storage_type()))
            .collect();

        Self {
            type_name: owner.type_name(),
            definition,
            source,
            columns,
        }
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub const fn definition(&self) -> &UserType {
        &self.definition
    }

    #[must_use]
    pub const fn source(&self) -> CodecSource {
        self.source
    }

    /// Order fields per the definition. Absent fields become null; fields
    /// the definition does not know are dropped.
    #[must_use]
    pub fn encode(&self, value: &UdtValue) -> UdtValue {
        UdtValue {
            name: self.definition.name.clone(),
            fields: self
                .definition
                .fields
                .iter()
                .map(|(name, _)| (name.clone(), value.get(name).cloned().unwrap_or(Value::Null)))
                .collect(),
        }
    }

    /// Read a stored value back into descriptor column order, type-checking
    /// every field the definition declares.
    pub fn decode(&self, value: &UdtValue) -> Result<UdtValue, ValueError> {
        let mut decoded = UdtValue::new(self.definition.name.clone());

        for (name, data_type) in &self.columns {
            let field = match value.get(name) {
                Some(field) if self.definition.has_field(name) => field.clone(),
                _ => Value::Null,
            };
            if !field.is_null() && !data_type.accepts(&field) {
                let expected = format!(
                    "{} for field '{name}' of '{}'",
                    data_type.label(),
                    self.definition.name
                );
                return Err(ValueError::mismatch(expected, field.label()));
            }
            decoded.fields.push((name.clone(), field));
        }

        Ok(decoded)
    }
}
