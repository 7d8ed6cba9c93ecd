//! CQL data types and the conversion contract between Rust field types and
//! [`Value`].

mod field_value;
mod wrappers;


use crate::{declare::TypeRef, error::ConfigurationError, resolve, value::Value};
use serde::{Deserialize, Serialize};
use std::fmt;

// re-exports
pub use field_value::FieldValue;
pub use wrappers::{Blob, Counter, OrderedSet};

/// Arbitrary-precision integer stored in `varint` columns.
pub type Varint = num_bigint::BigInt;

///
/// Scalar
///
/// Native CQL column types.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[remain::sorted]
pub enum Scalar {
    BigInt,
    Blob,
    Boolean,
    Counter,
    Date,
    Decimal,
    Double,
    Float,
    Int,
    SmallInt,
    Text,
    Timestamp,
    TinyInt,
    Uuid,
    Varint,
}

impl Scalar {
    /// CQL type name.
    #[must_use]
    pub const fn cql(self) -> &'static str {
        match self {
            Self::BigInt => "bigint",
            Self::Blob => "blob",
            Self::Boolean => "boolean",
            Self::Counter => "counter",
            Self::Date => "date",
            Self::Decimal => "decimal",
            Self::Double => "double",
            Self::Float => "float",
            Self::Int => "int",
            Self::SmallInt => "smallint",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
            Self::TinyInt => "tinyint",
            Self::Uuid => "uuid",
            Self::Varint => "varint",
        }
    }

    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::BigInt | Self::Counter, Value::BigInt(_))
                | (Self::Blob, Value::Blob(_))
                | (Self::Boolean, Value::Boolean(_))
                | (Self::Date, Value::Date(_))
                | (Self::Decimal, Value::Decimal(_))
                | (Self::Double, Value::Double(_))
                | (Self::Float, Value::Float(_))
                | (Self::Int, Value::Int(_))
                | (Self::SmallInt, Value::SmallInt(_))
                | (Self::Text, Value::Text(_))
                | (Self::Timestamp, Value::Timestamp(_))
                | (Self::TinyInt, Value::TinyInt(_))
                | (Self::Uuid, Value::Uuid(_))
                | (Self::Varint, Value::Varint(_))
        )
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cql())
    }
}

///
/// DataType
///
/// Data-type definition of a column: a scalar, a collection or a mapped
/// user-defined type.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataType {
    Scalar(Scalar),
    List(Box<Self>),
    Set(Box<Self>),
    OrderedSet(Box<Self>),
    SortedSet(Box<Self>),
    Map(Box<Self>, Box<Self>),
    SortedMap(Box<Self>, Box<Self>),
    Udt(TypeRef),
}

impl DataType {
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        !matches!(self, Self::Scalar(_) | Self::Udt(_))
    }

    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Self::Set(_) | Self::OrderedSet(_) | Self::SortedSet(_))
    }

    #[must_use]
    pub const fn is_counter(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Counter))
    }

    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Text))
    }

    #[must_use]
    pub const fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Scalar(scalar) => Some(*scalar),
            _ => None,
        }
    }

    /// Element type of a set-like collection.
    #[must_use]
    pub fn set_element(&self) -> Option<&Self> {
        match self {
            Self::Set(e) | Self::OrderedSet(e) | Self::SortedSet(e) => Some(e),
            _ => None,
        }
    }

    /// Every user-defined type embedded by this type, in declaration order.
    pub fn collect_udts(&self, out: &mut Vec<TypeRef>) {
        match self {
            Self::Scalar(_) => {}
            Self::List(e) | Self::Set(e) | Self::OrderedSet(e) | Self::SortedSet(e) => {
                e.collect_udts(out);
            }
            Self::Map(k, v) | Self::SortedMap(k, v) => {
                k.collect_udts(out);
                v.collect_udts(out);
            }
            Self::Udt(r) => {
                if !out.contains(r) {
                    out.push(*r);
                }
            }
        }
    }

    #[must_use]
    pub fn contains_udt(&self) -> bool {
        let mut udts = Vec::new();
        self.collect_udts(&mut udts);
        !udts.is_empty()
    }

    /// Diagnostic label that never needs descriptor resolution.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Scalar(s) => s.cql().to_string(),
            Self::List(e) => format!("list<{}>", e.label()),
            Self::Set(e) => format!("set<{}>", e.label()),
            Self::OrderedSet(e) => format!("ordered_set<{}>", e.label()),
            Self::SortedSet(e) => format!("sorted_set<{}>", e.label()),
            Self::Map(k, v) => format!("map<{}, {}>", k.label(), v.label()),
            Self::SortedMap(k, v) => format!("sorted_map<{}, {}>", k.label(), v.label()),
            Self::Udt(r) => format!("udt<{}>", r.type_name()),
        }
    }

    /// Render the CQL column type. User-defined types are always frozen, as
    /// are collections nested inside collections.
    pub fn to_cql(&self) -> Result<String, ConfigurationError> {
        self.render(false)
    }

    fn render(&self, nested: bool) -> Result<String, ConfigurationError> {
        let text = match self {
            Self::Scalar(s) => return Ok(s.cql().to_string()),
            Self::Udt(r) => {
                let descriptor = resolve::resolve(*r)?;
                return Ok(format!("frozen<{}>", descriptor.udt_name().unwrap_or_default()));
            }
            Self::List(e) => format!("list<{}>", e.render(true)?),
            Self::Set(e) | Self::OrderedSet(e) | Self::SortedSet(e) => {
                format!("set<{}>", e.render(true)?)
            }
            Self::Map(k, v) | Self::SortedMap(k, v) => {
                format!("map<{}, {}>", k.render(true)?, v.render(true)?)
            }
        };

        Ok(if nested { format!("frozen<{text}>") } else { text })
    }

    /// Structural compatibility of a non-null value with this type. User-defined
    /// values are matched on shape only; their fields are checked by the codec.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Scalar(s), v) => s.accepts(v),
            (Self::List(e), Value::List(items)) => items.iter().all(|v| e.accepts_element(v)),
            (
                Self::Set(e) | Self::OrderedSet(e) | Self::SortedSet(e),
                Value::Set(items) | Value::List(items),
            ) => items.iter().all(|v| e.accepts_element(v)),
            (Self::Map(k, v) | Self::SortedMap(k, v), Value::Map(entries)) => entries
                .iter()
                .all(|(key, value)| k.accepts_element(key) && v.accepts_element(value)),
            (Self::Udt(_), Value::Udt(_)) => true,
            _ => false,
        }
    }

    fn accepts_element(&self, value: &Value) -> bool {
        !value.is_null() && self.accepts(value)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
