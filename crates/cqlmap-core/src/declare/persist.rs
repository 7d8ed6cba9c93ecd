use crate::{
    error::BoxError,
    types::{DataType, FieldValue, Scalar},
    value::Value,
};
use std::{fmt, sync::Arc};

///
/// Persister
///
/// Transforms a field value into the storage representation of its column
/// and back. `decoded_type` is the in-memory type the persister accepts;
/// `persisted_type` is the column type it produces.
///

pub trait Persister: Send + Sync + 'static {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn persisted_type(&self) -> Scalar;

    fn decoded_type(&self) -> DataType;

    fn encode(&self, value: &Value) -> Result<Value, BoxError>;

    fn decode(&self, value: &Value) -> Result<Value, BoxError>;
}

///
/// Persisted
///
/// Persistence binding declared on a field. `as_type` is the declared
/// storage type and must agree with the persister.
///

#[derive(Clone)]
pub struct Persisted {
    pub(crate) as_type: DataType,
    pub(crate) persister: Arc<dyn Persister>,
    pub(crate) arguments: Vec<String>,
}

impl Persisted {
    #[must_use]
    pub fn new(as_type: DataType, persister: impl Persister) -> Self {
        Self {
            as_type,
            persister: Arc::new(persister),
            arguments: Vec::new(),
        }
    }

    /// Free-form arguments recorded with the binding.
    #[must_use]
    pub fn arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn persister(&self) -> &dyn Persister {
        self.persister.as_ref()
    }

    #[must_use]
    pub const fn as_type(&self) -> &DataType {
        &self.as_type
    }
}

impl fmt::Debug for Persisted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persisted")
            .field("as_type", &self.as_type)
            .field("persister", &self.persister.name())
            .field("arguments", &self.arguments)
            .finish()
    }
}

///
/// JsonPersister
///
/// Stores any value as JSON text.
///

#[derive(Clone, Debug)]
pub struct JsonPersister {
    decoded: DataType,
}

impl JsonPersister {
    #[must_use]
    pub fn of<V: FieldValue>() -> Self {
        Self {
            decoded: V::data_type(),
        }
    }
}

impl Persister for JsonPersister {
    fn name(&self) -> &'static str {
        "json"
    }

    fn persisted_type(&self) -> Scalar {
        Scalar::Text
    }

    fn decoded_type(&self) -> DataType {
        self.decoded.clone()
    }

    fn encode(&self, value: &Value) -> Result<Value, BoxError> {
        Ok(Value::Text(serde_json::to_string(value)?))
    }

    fn decode(&self, value: &Value) -> Result<Value, BoxError> {
        match value {
            Value::Text(text) => Ok(serde_json::from_str(text)?),
            other => Err(format!("expected text but found {}", other.label()).into()),
        }
    }
}
