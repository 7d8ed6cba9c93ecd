use crate::{
    declare::Entity,
    error::{Error, ValidationError},
    model::{ClassDescriptor, FieldDescriptor, TableDescriptor},
    resolve,
    statement::{Binding, Target},
    value::Value,
};
use std::{collections::BTreeMap, sync::Arc};

///
/// Relation
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Relation {
    Eq,
    In,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    ContainsKey,
}

impl Relation {
    #[must_use]
    pub const fn cql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::In => "IN",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Contains => "CONTAINS",
            Self::ContainsKey => "CONTAINS KEY",
        }
    }
}

///
/// Clause
///
/// A WHERE or IF restriction. Column names may be given as field names or
/// column names. The key clauses are delayed: they expand against the
/// statement's descriptor and table when the statement compiles.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Clause {
    Relation {
        column: String,
        relation: Relation,
        values: Vec<Value>,
    },
    KeyspaceKey {
        name: String,
        value: String,
    },
    /// Field name and value pairs, read back per table.
    PrimaryKey(Vec<(String, Value)>),
    /// Partition-key values in key order.
    PartitionKey(Vec<Value>),
}

impl Clause {
    fn relation(column: impl Into<String>, relation: Relation, values: Vec<Value>) -> Self {
        Self::Relation {
            column: column.into(),
            relation,
            values,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::relation(column, Relation::Eq, vec![value.into()])
    }

    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::relation(column, Relation::In, values.into_iter().map(Into::into).collect())
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::relation(column, Relation::Lt, vec![value.into()])
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::relation(column, Relation::Lte, vec![value.into()])
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::relation(column, Relation::Gt, vec![value.into()])
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::relation(column, Relation::Gte, vec![value.into()])
    }

    pub fn contains(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::relation(column, Relation::Contains, vec![value.into()])
    }

    pub fn contains_key(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::relation(column, Relation::ContainsKey, vec![value.into()])
    }

    pub fn keyspace_key(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::KeyspaceKey {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn partition_key<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::PartitionKey(values.into_iter().map(Into::into).collect())
    }

    pub fn primary_key<I, S, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<Value>,
    {
        Self::PrimaryKey(
            values
                .into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }

    /// Primary-key and keyspace-key values of every table of an instance.
    pub fn primary_key_of<T: Entity>(object: &T) -> Result<Self, Error> {
        let descriptor = resolve::descriptor::<T>()?;
        let mut values = Vec::new();

        for field in descriptor.fields() {
            let keyed = field.keyspace_key().is_some()
                || descriptor
                    .tables()
                    .iter()
                    .any(|t| t.field(field.name()).is_some_and(|f| f.role().is_primary_key()));
            if keyed {
                values.push((field.name().to_string(), field.peek_value(object)?));
            }
        }

        Ok(Self::PrimaryKey(values))
    }

    /// Column name this clause restricts, for table selection.
    pub(crate) fn column_name(&self) -> Option<&str> {
        match self {
            Self::Relation { column, .. } => Some(column),
            _ => None,
        }
    }

    // Expand delayed clauses until only relations and keyspace keys remain.
    pub(crate) fn expand(
        &self,
        descriptor: &ClassDescriptor,
        table: &TableDescriptor,
        out: &mut Expansion,
    ) -> Result<(), Error> {
        match self {
            Self::Relation {
                column,
                relation,
                values,
            } => {
                let field = lookup(descriptor, table, column)?;
                out.restrictions.push(Restriction {
                    field: field.clone(),
                    relation: *relation,
                    values: values.clone(),
                });
            }
            Self::KeyspaceKey { name, value } => {
                descriptor.check_keyspace_key(name, value)?;
                out.keyspace_keys.insert(name.clone(), value.clone());
            }
            Self::PrimaryKey(values) => {
                for clause in primary_key_clauses(descriptor, table, values)? {
                    clause.expand(descriptor, table, out)?;
                }
            }
            Self::PartitionKey(values) => {
                let keys: Vec<_> = table.partition_keys().collect();
                if keys.len() != values.len() {
                    return Err(ValidationError::statement(
                        descriptor.type_name(),
                        format!(
                            "table '{}' has {} partition key(s) but {} value(s) were given",
                            table.name(),
                            keys.len(),
                            values.len()
                        ),
                    )
                    .into());
                }
                for (field, value) in keys.into_iter().zip(values) {
                    Self::eq(field.name(), value.clone()).expand(descriptor, table, out)?;
                }
            }
        }

        Ok(())
    }

    /// Keyspace keys bound by this clause, independent of any table.
    pub(crate) fn keyspace_bindings(
        &self,
        descriptor: &ClassDescriptor,
        out: &mut BTreeMap<String, String>,
    ) -> Result<(), Error> {
        match self {
            Self::KeyspaceKey { name, value } => {
                descriptor.check_keyspace_key(name, value)?;
                out.insert(name.clone(), value.clone());
            }
            Self::PrimaryKey(values) => {
                for (name, value) in values {
                    let Some(field) = descriptor.field(name) else {
                        continue;
                    };
                    if let (Some(key), Value::Text(text)) = (field.keyspace_key(), value) {
                        Self::keyspace_key(key.name(), text.as_str())
                            .keyspace_bindings(descriptor, out)?;
                    }
                }
            }
            Self::Relation { .. } | Self::PartitionKey(_) => {}
        }

        Ok(())
    }
}

fn primary_key_clauses(
    descriptor: &ClassDescriptor,
    table: &TableDescriptor,
    values: &[(String, Value)],
) -> Result<Vec<Clause>, Error> {
    let find = |name: &str| values.iter().find(|(field, _)| field == name).map(|(_, v)| v);
    let mut clauses = Vec::new();

    for field in table.primary_keys() {
        let value = find(field.name()).cloned().unwrap_or(Value::Null);
        if value.is_null() {
            return Err(ValidationError::NullPrimaryKey {
                column: field.column_or_name().to_string(),
            }
            .into());
        }

        // a multi-key set restricts on its elements
        clauses.push(match value {
            Value::Set(mut items) if field.multi_key_type().is_some() => {
                if items.len() == 1 {
                    Clause::eq(field.name(), items.remove(0))
                } else {
                    Clause::in_list(field.name(), items)
                }
            }
            value => Clause::eq(field.name(), value),
        });
    }

    for field in descriptor.keyspace_key_fields() {
        if let (Some(key), Some(Value::Text(text))) = (field.keyspace_key(), find(field.name())) {
            clauses.push(Clause::keyspace_key(key.name(), text.as_str()));
        }
    }

    Ok(clauses)
}

fn lookup<'a>(
    descriptor: &ClassDescriptor,
    table: &'a TableDescriptor,
    column: &str,
) -> Result<&'a Arc<FieldDescriptor>, Error> {
    table
        .field(column)
        .or_else(|| table.column(column))
        .ok_or_else(|| {
            ValidationError::UnknownColumn {
                class: descriptor.type_name(),
                column: column.to_string(),
            }
            .into()
        })
}

///
/// Expansion
///

#[derive(Debug, Default)]
pub(crate) struct Expansion {
    pub(crate) restrictions: Vec<Restriction>,
    pub(crate) keyspace_keys: BTreeMap<String, String>,
}

impl Expansion {
    pub(crate) fn of(
        clauses: &[Clause],
        descriptor: &ClassDescriptor,
        table: &TableDescriptor,
    ) -> Result<Self, Error> {
        let mut out = Self::default();
        for clause in clauses {
            clause.expand(descriptor, table, &mut out)?;
        }

        Ok(out)
    }
}

///
/// Restriction
///
/// A fully expanded relation on one column.
///

#[derive(Clone, Debug)]
pub(crate) struct Restriction {
    pub(crate) field: Arc<FieldDescriptor>,
    pub(crate) relation: Relation,
    pub(crate) values: Vec<Value>,
}

impl Restriction {
    /// Render as `column op ?` and append the encoded values.
    pub(crate) fn render(
        &self,
        target: &Target,
        keyspace: &str,
        bindings: &mut Vec<Binding>,
    ) -> Result<String, Error> {
        let column = self.field.column_or_name();

        let encode = |value: &Value| -> Result<Value, Error> {
            match self.relation {
                Relation::Contains | Relation::ContainsKey => Ok(value.clone()),
                _ => {
                    self.field.validate_value(value)?;
                    self.field
                        .encode_value(value.clone(), keyspace, target.codecs())
                }
            }
        };

        if self.relation == Relation::In {
            let mut markers = Vec::with_capacity(self.values.len());
            for value in &self.values {
                bindings.push(Binding::new(column, encode(value)?));
                markers.push("?");
            }
            return Ok(format!("{column} IN ({})", markers.join(", ")));
        }

        let [value] = self.values.as_slice() else {
            return Err(ValidationError::statement(
                self.field.class_type(),
                format!(
                    "relation '{}' on '{column}' takes exactly one value",
                    self.relation.cql()
                ),
            )
            .into());
        };
        bindings.push(Binding::new(column, encode(value)?));

        Ok(format!("{column} {} ?", self.relation.cql()))
    }
}

/// Render restrictions joined by `AND`.
pub(crate) fn render_all(
    restrictions: &[Restriction],
    target: &Target,
    keyspace: &str,
    bindings: &mut Vec<Binding>,
) -> Result<String, Error> {
    let mut parts = Vec::with_capacity(restrictions.len());
    for restriction in restrictions {
        parts.push(restriction.render(target, keyspace, bindings)?);
    }

    Ok(parts.join(" AND "))
}
