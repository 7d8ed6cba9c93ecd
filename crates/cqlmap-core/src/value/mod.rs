mod tag;

#[cfg(test)]
mod tests;

use crate::types::Varint;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use ulid::Ulid;

// re-exports
pub use tag::ValueTag;

///
/// Value
///
/// A CQL value as bound to, or read from, a column. Collections keep their
/// element order; `Map` keeps entries as pairs so any key type can be used.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[remain::sorted]
pub enum Value {
    BigInt(i64),
    Blob(Vec<u8>),
    Boolean(bool),
    Date(NaiveDate),
    Decimal(Decimal),
    Double(f64),
    Float(f32),
    Int(i32),
    List(Vec<Self>),
    Map(Vec<(Self, Self)>),
    Null,
    Set(Vec<Self>),
    SmallInt(i16),
    Text(String),
    Timestamp(DateTime<Utc>),
    TinyInt(i8),
    Udt(UdtValue),
    Uuid(Ulid),
    Varint(Varint),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_udt(&self) -> Option<&UdtValue> {
        match self {
            Self::Udt(udt) => Some(udt),
            _ => None,
        }
    }

    /// Elements of a list or set value.
    #[must_use]
    pub fn as_elements(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) | Self::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Render the value as a CQL literal.
    #[must_use]
    pub fn to_cql_literal(&self) -> String {
        let mut out = String::new();
        self.write_literal(&mut out);
        out
    }

    fn write_literal(&self, out: &mut String) {
        match self {
            Self::BigInt(v) => push_display(out, v),
            Self::Blob(bytes) => {
                out.push_str("0x");
                for byte in bytes {
                    let _ = write!(out, "{byte:02x}");
                }
            }
            Self::Boolean(v) => push_display(out, v),
            Self::Date(d) => {
                let _ = write!(out, "'{}'", d.format("%Y-%m-%d"));
            }
            Self::Decimal(d) => push_display(out, d),
            Self::Double(v) => push_display(out, v),
            Self::Float(v) => push_display(out, v),
            Self::Int(v) => push_display(out, v),
            Self::List(items) => write_sequence(out, '[', ']', items),
            Self::Map(entries) => {
                out.push('{');
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    k.write_literal(out);
                    out.push_str(": ");
                    v.write_literal(out);
                }
                out.push('}');
            }
            Self::Null => out.push_str("NULL"),
            Self::Set(items) => write_sequence(out, '{', '}', items),
            Self::SmallInt(v) => push_display(out, v),
            Self::Text(s) => {
                out.push('\'');
                out.push_str(&s.replace('\'', "''"));
                out.push('\'');
            }
            Self::Timestamp(ts) => {
                let _ = write!(out, "'{}'", ts.to_rfc3339_opts(SecondsFormat::Millis, true));
            }
            Self::TinyInt(v) => push_display(out, v),
            Self::Udt(udt) => {
                out.push('{');
                for (i, (name, v)) in udt.fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(name);
                    out.push_str(": ");
                    v.write_literal(out);
                }
                out.push('}');
            }
            Self::Uuid(id) => out.push_str(&uuid_string(*id)),
            Self::Varint(v) => push_display(out, v),
        }
    }
}

fn push_display(out: &mut String, value: &impl fmt::Display) {
    let _ = write!(out, "{value}");
}

fn write_sequence(out: &mut String, open: char, close: char, items: &[Value]) {
    out.push(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.write_literal(out);
    }
    out.push(close);
}

/// Format a ULID's 128 bits in the canonical 8-4-4-4-12 UUID layout.
fn uuid_string(id: Ulid) -> String {
    let hex = format!("{:032x}", u128::from(id));

    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cql_literal())
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_value_from! {
    bool => Boolean,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Float,
    f64 => Double,
    String => Text,
    Decimal => Decimal,
    Varint => Varint,
    NaiveDate => Date,
    DateTime<Utc> => Timestamp,
    Ulid => Uuid,
    UdtValue => Udt,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

///
/// UdtValue
///
/// Structured composite value of a user-defined type. Field order follows
/// the definition the value was shaped against.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct UdtValue {
    pub name: String,
    pub fields: Vec<(String, Value)>,
}

impl UdtValue {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Set a field, replacing any previous value for the same name.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();

        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }
}
