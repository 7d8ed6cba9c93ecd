use crate::value::Value;

///
/// ValueTag
///
/// Value-variant tag used for diagnostics and type-compatibility checks.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[remain::sorted]
pub enum ValueTag {
    BigInt,
    Blob,
    Boolean,
    Date,
    Decimal,
    Double,
    Float,
    Int,
    List,
    Map,
    Null,
    Set,
    SmallInt,
    Text,
    Timestamp,
    TinyInt,
    Udt,
    Uuid,
    Varint,
}

impl ValueTag {
    /// Human-readable value kind label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BigInt => "bigint",
            Self::Blob => "blob",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Decimal => "decimal",
            Self::Double => "double",
            Self::Float => "float",
            Self::Int => "int",
            Self::List => "list",
            Self::Map => "map",
            Self::Null => "null",
            Self::Set => "set",
            Self::SmallInt => "smallint",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
            Self::TinyInt => "tinyint",
            Self::Udt => "udt",
            Self::Uuid => "uuid",
            Self::Varint => "varint",
        }
    }
}

impl Value {
    #[must_use]
    pub const fn tag(&self) -> ValueTag {
        match self {
            Self::BigInt(_) => ValueTag::BigInt,
            Self::Blob(_) => ValueTag::Blob,
            Self::Boolean(_) => ValueTag::Boolean,
            Self::Date(_) => ValueTag::Date,
            Self::Decimal(_) => ValueTag::Decimal,
            Self::Double(_) => ValueTag::Double,
            Self::Float(_) => ValueTag::Float,
            Self::Int(_) => ValueTag::Int,
            Self::List(_) => ValueTag::List,
            Self::Map(_) => ValueTag::Map,
            Self::Null => ValueTag::Null,
            Self::Set(_) => ValueTag::Set,
            Self::SmallInt(_) => ValueTag::SmallInt,
            Self::Text(_) => ValueTag::Text,
            Self::Timestamp(_) => ValueTag::Timestamp,
            Self::TinyInt(_) => ValueTag::TinyInt,
            Self::Udt(_) => ValueTag::Udt,
            Self::Uuid(_) => ValueTag::Uuid,
            Self::Varint(_) => ValueTag::Varint,
        }
    }

    /// Diagnostic label of this value's kind.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.tag().label()
    }
}
