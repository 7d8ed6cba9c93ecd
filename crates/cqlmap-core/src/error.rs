use derive_more::Display;
use thiserror::Error as ThisError;

/// Boxed cause attached to persister and conversion failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

///
/// Error
///
/// Every failure surfaced by the mapper. Each variant wraps one error kind so
/// callers can match on the class of failure without parsing messages.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    ExcludedKey(#[from] ExcludedKeyError),

    #[error(transparent)]
    MissingValue(#[from] MissingValueError),

    #[error(transparent)]
    PersistenceEncoding(#[from] PersistenceEncodingError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Cycle(#[from] CycleError),
}

impl Error {
    #[must_use]
    pub const fn is_excluded_key(&self) -> bool {
        matches!(self, Self::ExcludedKey(_))
    }

    /// Return the validation sub-kind when this is a validation failure.
    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

///
/// ConfigurationError
///
/// Raised while resolving a declared type into a descriptor. Always names
/// the offending type and, where relevant, the field, table and rule.
///

#[derive(Debug, ThisError)]
pub enum ConfigurationError {
    #[error("type '{class}' declares no entity marker")]
    MissingEntityMarker { class: &'static str },

    #[error("type '{class}' declares conflicting markers: {detail}")]
    ConflictingMarkers { class: &'static str, detail: String },

    #[error("type '{class}' is missing a keyspace declaration")]
    MissingKeyspace { class: &'static str },

    #[error("type '{class}' must declare at least one table")]
    MissingTable { class: &'static str },

    #[error("type '{class}' must declare a partition key for table '{table}'")]
    MissingPartitionKey { class: &'static str, table: String },

    #[error("type '{class}' must declare a type key field")]
    MissingTypeKey { class: &'static str },

    #[error("field '{class}.{field}' in table '{table}': {rule}")]
    Field {
        class: &'static str,
        field: String,
        table: String,
        rule: FieldRule,
    },

    #[error("type '{class}' declares duplicate column '{column}' in table '{table}'")]
    DuplicateColumn {
        class: &'static str,
        table: String,
        column: String,
    },

    #[error("type '{class}' scopes a marker to unknown table '{table}'")]
    UnknownTable { class: &'static str, table: String },

    #[error("invalid {what} name '{name}' declared by type '{class}'")]
    InvalidName {
        class: &'static str,
        what: &'static str,
        name: String,
    },

    #[error("user-defined type name '{name}' declared by type '{class}' is reserved")]
    ReservedTypeName { class: &'static str, name: String },

    #[error("type '{class}': {message}")]
    Hierarchy { class: &'static str, message: String },

    #[error(
        "two different keyspace declarations found for '{keyspace}' with types '{first}' and '{second}'"
    )]
    ConflictingKeyspace {
        keyspace: String,
        first: &'static str,
        second: &'static str,
    },
}

impl ConfigurationError {
    pub(crate) fn field(
        class: &'static str,
        field: impl Into<String>,
        table: impl Into<String>,
        rule: FieldRule,
    ) -> Self {
        Self::Field {
            class,
            field: field.into(),
            table: table.into(),
            rule,
        }
    }

    pub(crate) fn hierarchy(class: &'static str, message: impl Into<String>) -> Self {
        Self::Hierarchy {
            class,
            message: message.into(),
        }
    }
}

///
/// FieldRule
///
/// The field-level resolution rule a declaration broke.
///

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum FieldRule {
    #[display("field must be declared as a column if it is marked as {marker}")]
    ColumnRequired { marker: &'static str },

    #[display("must not be a clustering key if it is a partition key")]
    PartitionAndClustering,

    #[display("cannot be both optional and mandatory")]
    OptionalAndMandatory,

    #[display("static columns cannot be keys")]
    StaticKey,

    #[display("collection key of type '{data_type}' requires a set element type")]
    MultiKeyRequiresSet { data_type: String },

    #[display("case-insensitive keys must be of text type, found '{data_type}'")]
    CaseInsensitiveRequiresText { data_type: String },

    #[display("type key must be of text type, found '{data_type}'")]
    TypeKeyNotText { data_type: String },

    #[display("type key cannot be immutable")]
    TypeKeyImmutable,

    #[display("type key only allowed in root or type entities")]
    TypeKeyOutsideHierarchy,

    #[display("keyspace key must be of text type, found '{data_type}'")]
    KeyspaceKeyNotText { data_type: String },

    #[display("keyspace keys cannot also be columns")]
    KeyspaceKeyColumn,

    #[display("keyspace key '{name}' is not declared by the keyspace")]
    UnknownKeyspaceKey { name: String },

    #[display("user-defined type columns cannot be marked as {marker}")]
    UdtMarker { marker: &'static str },

    #[display("counter columns cannot be {what}")]
    CounterMisuse { what: &'static str },

    #[display("declares more than one {what}")]
    DuplicateMarker { what: &'static str },

    #[display("expecting {accessor} with type: {expected}")]
    AccessorMismatch {
        accessor: String,
        expected: &'static str,
    },

    #[display("no getter method or direct field access declared")]
    NoGetter,

    #[display("column type '{found}' conflicts with '{existing}' declared by another type")]
    ColumnTypeConflict { existing: String, found: String },

    #[display("invalid immutable value: {message}")]
    InvalidImmutable { message: String },

    #[display("{message}")]
    Persister { message: String },
}

///
/// ValidationError
///
/// Raised by the value pipeline and statement builders when a value or a
/// statement shape breaks the descriptor contract.
///

#[derive(Debug, ThisError)]
pub enum ValidationError {
    #[error("invalid null value for mandatory column '{column}'")]
    NullMandatory { column: String },

    #[error("invalid null value for primary key column '{column}'")]
    NullPrimaryKey { column: String },

    #[error("empty optional value for primary key column '{column}'")]
    EmptyOptionalPrimaryKey { column: String },

    #[error("invalid null value for type key column '{column}'")]
    NullTypeKey { column: String },

    #[error("invalid value for column '{column}'; expecting {expected} but found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: &'static str,
    },

    #[error("invalid value for keyspace key '{key}'; expecting text but found {found}")]
    KeyspaceKeyType { key: String, found: &'static str },

    #[error("missing value for keyspace key '{key}' of type '{class}'")]
    MissingKeyspaceKey { class: &'static str, key: String },

    #[error("unknown column '{column}' for type '{class}'")]
    UnknownColumn { class: &'static str, column: String },

    #[error("unknown table '{table}' for type '{class}'")]
    UnknownTable { class: &'static str, table: String },

    #[error("type '{class}' has no variant for '{variant}'")]
    UnknownVariant { class: &'static str, variant: String },

    #[error("invalid statement for type '{class}': {message}")]
    Statement { class: &'static str, message: String },
}

impl ValidationError {
    pub(crate) fn statement(class: &'static str, message: impl Into<String>) -> Self {
        Self::Statement {
            class,
            message: message.into(),
        }
    }
}

///
/// ExcludedKeyError
///

#[derive(Debug, ThisError)]
#[error("excluded keyspace key '{key}' value '{value}' for type: {class}")]
pub struct ExcludedKeyError {
    pub class: &'static str,
    pub key: String,
    pub value: String,
}

///
/// MissingValueError
///

#[derive(Debug, ThisError)]
#[error("missing {kind} '{column}' from result set for field '{class}.{field}'")]
pub struct MissingValueError {
    pub kind: MissingKind,
    pub class: &'static str,
    pub field: String,
    pub column: String,
}

///
/// MissingKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum MissingKind {
    #[display("partition key")]
    PartitionKey,
    #[display("clustering key")]
    ClusteringKey,
    #[display("type key")]
    TypeKey,
    #[display("mandatory column")]
    MandatoryColumn,
    #[display("column")]
    Column,
}

///
/// PersistenceEncodingError
///

#[derive(Debug, ThisError)]
#[error("failed to encode field '{class}.{field}' to {cql_type} with persister: {persister}")]
pub struct PersistenceEncodingError {
    pub class: &'static str,
    pub field: String,
    pub cql_type: String,
    pub persister: String,
    #[source]
    pub source: BoxError,
}

///
/// ConversionError
///

#[derive(Debug, ThisError)]
#[error("{message} for field '{class}.{field}'")]
pub struct ConversionError {
    pub class: &'static str,
    pub field: String,
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

///
/// CycleError
///

#[derive(Debug, ThisError)]
#[error(
    "user-defined type dependency cycle in keyspace '{keyspace}': {}",
    .types.join(", ")
)]
pub struct CycleError {
    pub keyspace: String,
    pub types: Vec<String>,
}

///
/// ValueError
///
/// Conversion failure between a Rust field type and a `Value`. The pipeline
/// wraps it into a `ConversionError` or `ValidationError` carrying the field
/// context.
///

#[derive(Debug, ThisError)]
pub enum ValueError {
    #[error("expected {expected} but found {found}")]
    Mismatch {
        expected: String,
        found: &'static str,
    },

    #[error("value {value} out of range for {target}")]
    OutOfRange { target: &'static str, value: String },

    #[error("accessor expected an instance of '{expected}'")]
    WrongObject { expected: &'static str },

    #[error(transparent)]
    Nested(Box<Error>),
}

impl ValueError {
    pub(crate) fn mismatch(expected: impl Into<String>, found: &'static str) -> Self {
        Self::Mismatch {
            expected: expected.into(),
            found,
        }
    }
}

impl From<Error> for ValueError {
    fn from(err: Error) -> Self {
        Self::Nested(Box::new(err))
    }
}
