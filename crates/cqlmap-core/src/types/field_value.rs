use crate::{
    error::ValueError,
    types::{Blob, Counter, DataType, OrderedSet, Scalar, Varint},
    value::Value,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    hash::Hash,
};
use ulid::Ulid;

///
/// FieldValue
///
/// Conversion contract between a Rust field type and a [`Value`]. The data
/// type of a mapped field is inferred from this trait, so every field type
/// must implement it.
///

pub trait FieldValue: Sized + Send + Sync + 'static {
    fn data_type() -> DataType;

    fn to_value(&self) -> Result<Value, ValueError>;

    fn from_value(value: Value) -> Result<Self, ValueError>;

    /// `Option<T>` wrapper: the field may hold an empty value.
    fn is_optional() -> bool {
        false
    }

    /// Machine scalars that can never be null; such fields are always
    /// mandatory.
    fn is_primitive() -> bool {
        false
    }
}

macro_rules! scalar_field_value {
    ($($ty:ty => $scalar:ident, $variant:ident, $primitive:literal);* $(;)?) => {
        $(
            #[allow(clippy::clone_on_copy)]
            impl FieldValue for $ty {
                fn data_type() -> DataType {
                    DataType::Scalar(Scalar::$scalar)
                }

                fn to_value(&self) -> Result<Value, ValueError> {
                    Ok(Value::$variant(self.clone()))
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(ValueError::mismatch(Scalar::$scalar.cql(), other.label())),
                    }
                }

                fn is_primitive() -> bool {
                    $primitive
                }
            }
        )*
    };
}

scalar_field_value! {
    bool => Boolean, Boolean, true;
    i8 => TinyInt, TinyInt, true;
    i16 => SmallInt, SmallInt, true;
    i32 => Int, Int, true;
    i64 => BigInt, BigInt, true;
    f32 => Float, Float, true;
    f64 => Double, Double, true;
    String => Text, Text, false;
    Decimal => Decimal, Decimal, false;
    Varint => Varint, Varint, false;
    NaiveDate => Date, Date, false;
    DateTime<Utc> => Timestamp, Timestamp, false;
    Ulid => Uuid, Uuid, false;
}

impl FieldValue for Blob {
    fn data_type() -> DataType {
        DataType::Scalar(Scalar::Blob)
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::Blob(self.0.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Blob(bytes) => Ok(Self(bytes)),
            other => Err(ValueError::mismatch(Scalar::Blob.cql(), other.label())),
        }
    }
}

impl FieldValue for Counter {
    fn data_type() -> DataType {
        DataType::Scalar(Scalar::Counter)
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::BigInt(self.0))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::BigInt(v) => Ok(Self(v)),
            other => Err(ValueError::mismatch(Scalar::Counter.cql(), other.label())),
        }
    }

    fn is_primitive() -> bool {
        true
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn data_type() -> DataType {
        T::data_type()
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        self.as_ref().map_or(Ok(Value::Null), T::to_value)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }

    fn is_optional() -> bool {
        true
    }
}

// Collections read back as null when empty, so null decodes to an empty
// collection.

fn elements(value: Value, expected: &DataType) -> Result<Vec<Value>, ValueError> {
    match value {
        Value::List(items) | Value::Set(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(ValueError::mismatch(expected.label(), other.label())),
    }
}

fn entries(value: Value, expected: &DataType) -> Result<Vec<(Value, Value)>, ValueError> {
    match value {
        Value::Map(entries) => Ok(entries),
        Value::Null => Ok(Vec::new()),
        other => Err(ValueError::mismatch(expected.label(), other.label())),
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn data_type() -> DataType {
        DataType::List(Box::new(T::data_type()))
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        self.iter()
            .map(T::to_value)
            .collect::<Result<_, _>>()
            .map(Value::List)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements(value, &Self::data_type())?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}

impl<T: FieldValue + Eq + Hash> FieldValue for HashSet<T> {
    fn data_type() -> DataType {
        DataType::Set(Box::new(T::data_type()))
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        self.iter()
            .map(T::to_value)
            .collect::<Result<_, _>>()
            .map(Value::Set)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements(value, &Self::data_type())?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}

impl<T: FieldValue + Ord> FieldValue for BTreeSet<T> {
    fn data_type() -> DataType {
        DataType::SortedSet(Box::new(T::data_type()))
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        self.iter()
            .map(T::to_value)
            .collect::<Result<_, _>>()
            .map(Value::Set)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements(value, &Self::data_type())?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}

impl<T: FieldValue + PartialEq> FieldValue for OrderedSet<T> {
    fn data_type() -> DataType {
        DataType::OrderedSet(Box::new(T::data_type()))
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        self.iter()
            .map(T::to_value)
            .collect::<Result<_, _>>()
            .map(Value::Set)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        elements(value, &Self::data_type())?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}

impl<K: FieldValue + Eq + Hash, V: FieldValue> FieldValue for HashMap<K, V> {
    fn data_type() -> DataType {
        DataType::Map(Box::new(K::data_type()), Box::new(V::data_type()))
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        self.iter()
            .map(|(k, v)| -> Result<_, ValueError> { Ok((k.to_value()?, v.to_value()?)) })
            .collect::<Result<_, _>>()
            .map(Value::Map)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        entries(value, &Self::data_type())?
            .into_iter()
            .map(|(k, v)| -> Result<_, ValueError> { Ok((K::from_value(k)?, V::from_value(v)?)) })
            .collect()
    }
}

impl<K: FieldValue + Ord, V: FieldValue> FieldValue for BTreeMap<K, V> {
    fn data_type() -> DataType {
        DataType::SortedMap(Box::new(K::data_type()), Box::new(V::data_type()))
    }

    fn to_value(&self) -> Result<Value, ValueError> {
        self.iter()
            .map(|(k, v)| -> Result<_, ValueError> { Ok((k.to_value()?, v.to_value()?)) })
            .collect::<Result<_, _>>()
            .map(Value::Map)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        entries(value, &Self::data_type())?
            .into_iter()
            .map(|(k, v)| -> Result<_, ValueError> { Ok((K::from_value(k)?, V::from_value(v)?)) })
            .collect()
    }
}
