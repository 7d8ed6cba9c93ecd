use crate::{
    codec::CodecRegistry,
    error::{Error, ValidationError},
    model::{FieldDescriptor, TableDescriptor},
    statement::{
        Binding, BuildCache, Clause, Condition, Consistencies, PrimitiveStatement, Statement,
        StatementKind, Target, Using,
        clause::{Expansion, render_all},
        cql, excluded,
    },
    types::DataType,
    value::Value,
};
use cqlmap_config::Consistency;
use std::{any::Any, sync::Arc};

///
/// Assignment
///

#[derive(Clone, Debug, PartialEq)]
pub enum Assignment {
    Set(Value),
    /// Counter increment; negative values decrement.
    Increment(i64),
    Append(Value),
    Prepend(Value),
    Add(Value),
    Remove(Value),
    Put(Value, Value),
}

///
/// Update
///
/// Without assignments, an update of a bound instance writes every
/// non-key, non-counter column. Assignments naming columns a table does not
/// have are left out of that table's statement.
///

#[derive(Debug)]
pub struct Update {
    target: Target,
    assignments: Vec<(String, Assignment)>,
    clauses: Vec<Clause>,
    if_exists: bool,
    predicates: Vec<Clause>,
    using: Using,
    consistency: Consistencies,
    cache: BuildCache,
}

impl Update {
    pub(crate) fn new(target: Target) -> Self {
        Self {
            target,
            assignments: Vec::new(),
            clauses: Vec::new(),
            if_exists: false,
            predicates: Vec::new(),
            using: Using::default(),
            consistency: Consistencies::default(),
            cache: BuildCache::default(),
        }
    }

    pub fn assign(&mut self, column: impl Into<String>, assignment: Assignment) -> &mut Self {
        self.assignments.push((column.into(), assignment));
        self.cache.invalidate();
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.assign(column, Assignment::Set(value.into()))
    }

    pub fn increment(&mut self, column: impl Into<String>, by: i64) -> &mut Self {
        self.assign(column, Assignment::Increment(by))
    }

    pub fn decrement(&mut self, column: impl Into<String>, by: i64) -> &mut Self {
        self.assign(column, Assignment::Increment(by.saturating_neg()))
    }

    pub fn append(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.assign(column, Assignment::Append(value.into()))
    }

    pub fn prepend(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.assign(column, Assignment::Prepend(value.into()))
    }

    pub fn add(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.assign(column, Assignment::Add(value.into()))
    }

    pub fn remove(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.assign(column, Assignment::Remove(value.into()))
    }

    pub fn put(
        &mut self,
        column: impl Into<String>,
        key: impl Into<Value>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.assign(column, Assignment::Put(key.into(), value.into()))
    }

    pub fn filter(&mut self, clause: Clause) -> &mut Self {
        self.clauses.push(clause);
        self.cache.invalidate();
        self
    }

    pub fn if_exists(&mut self) -> &mut Self {
        self.if_exists = true;
        self.cache.invalidate();
        self
    }

    pub fn only_if(&mut self, clause: Clause) -> &mut Self {
        self.predicates.push(clause);
        self.cache.invalidate();
        self
    }

    pub fn ttl(&mut self, seconds: u32) -> &mut Self {
        self.using.ttl = Some(seconds);
        self.cache.invalidate();
        self
    }

    pub fn timestamp(&mut self, micros: i64) -> &mut Self {
        self.using.timestamp = Some(micros);
        self.cache.invalidate();
        self
    }

    pub fn consistency(&mut self, consistency: Consistency) -> &mut Self {
        self.consistency.consistency = Some(consistency);
        self.cache.invalidate();
        self
    }

    pub fn serial_consistency(&mut self, consistency: Consistency) -> &mut Self {
        self.consistency.serial = Some(consistency);
        self.cache.invalidate();
        self
    }

    pub fn keyspace_key(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.target.bind_keyspace_key(name, value);
        self.cache.invalidate();
        self
    }

    pub fn table(&mut self, name: impl Into<String>) -> &mut Self {
        self.target.restrict_table(name);
        self.cache.invalidate();
        self
    }

    #[must_use]
    pub fn object<T: Any>(&self) -> Option<&T> {
        self.target.object_ref()
    }

    pub fn object_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.cache.invalidate();
        self.target.object_mut()
    }

    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let keyspace = self.target.keyspace(&self.clauses)?;
        let descriptor = self.target.descriptor().clone();
        let conditional = self.if_exists || !self.predicates.is_empty();
        let mut out = Vec::new();

        for table in self.target.tables()? {
            let mut set_bindings = Vec::new();
            let sets = self.assignments_for(&table, &keyspace, &mut set_bindings)?;
            if sets.is_empty() {
                continue;
            }

            let restrictions = self.restrictions_for(&table, &keyspace)?;

            let mut if_bindings = Vec::new();
            let condition = if self.predicates.is_empty() {
                self.if_exists.then_some(Condition::IfExists)
            } else {
                let expansion = Expansion::of(&self.predicates, &descriptor, &table)?;
                let mut parts = Vec::new();
                for restriction in &expansion.restrictions {
                    parts.push(restriction.render(&self.target, &keyspace, &mut if_bindings)?);
                }
                Some(Condition::If(parts))
            };

            for (where_text, where_bindings) in restrictions {
                let text = format!(
                    "UPDATE {}{} SET {} WHERE {where_text}{}",
                    cql::qualified(&keyspace, table.name()),
                    cql::using(&self.using),
                    sets.join(", "),
                    cql::condition(condition.as_ref()),
                );

                let mut primitive = PrimitiveStatement::new(StatementKind::Update, text)
                    .on(&keyspace, Some(table.name()));
                primitive.bindings = set_bindings.clone();
                primitive.bindings.extend(where_bindings);
                primitive.bindings.extend(if_bindings.iter().cloned());
                primitive.options = self
                    .consistency
                    .options(&self.target.config().statements, conditional);
                primitive.options.ttl = self.using.ttl;
                primitive.options.timestamp = self.using.timestamp;
                primitive.options.condition = condition.clone();
                out.push(primitive);
            }
        }

        if out.is_empty() {
            return Err(match self.assignments.first() {
                Some((column, _)) => ValidationError::UnknownColumn {
                    class: descriptor.type_name(),
                    column: column.clone(),
                },
                None => {
                    ValidationError::statement(descriptor.type_name(), "update assigns no columns")
                }
            }
            .into());
        }

        Ok(out)
    }

    fn assignments_for(
        &mut self,
        table: &TableDescriptor,
        keyspace: &str,
        bindings: &mut Vec<Binding>,
    ) -> Result<Vec<String>, Error> {
        let mut sets = Vec::new();

        if self.assignments.is_empty() {
            if !self.target.has_object() {
                return Ok(sets);
            }
            for field in table.non_primary_columns().filter(|f| !f.is_counter()) {
                let column = field.column_or_name();
                let value = self.target.column_value(field, keyspace)?;
                bindings.push(Binding::new(column, value));
                sets.push(format!("{column} = ?"));
            }
            return Ok(sets);
        }

        for (column, assignment) in &self.assignments {
            let Some(field) = table.field(column).or_else(|| table.column(column)) else {
                continue;
            };
            if field.role().is_primary_key() {
                return Err(ValidationError::statement(
                    field.class_type(),
                    format!("primary key column '{}' cannot be assigned", field.column_or_name()),
                )
                .into());
            }
            sets.push(assignment_cql(
                field,
                assignment,
                keyspace,
                self.target.codecs(),
                bindings,
            )?);
        }

        Ok(sets)
    }

    // WHERE text and bindings, one per key combination of the bound instance
    // or a single one built from the filter clauses.
    fn restrictions_for(
        &mut self,
        table: &TableDescriptor,
        keyspace: &str,
    ) -> Result<Vec<(String, Vec<Binding>)>, Error> {
        if self.target.has_object() {
            return Ok(self
                .target
                .key_bindings(table, keyspace)?
                .into_iter()
                .map(|key| (key_restriction(&key), key))
                .collect());
        }

        let descriptor = self.target.descriptor().clone();
        let expansion = Expansion::of(&self.clauses, &descriptor, table)?;
        if expansion.restrictions.is_empty() {
            return Err(ValidationError::statement(
                descriptor.type_name(),
                "update requires a where clause",
            )
            .into());
        }

        let mut bindings = Vec::new();
        let text = render_all(&expansion.restrictions, &self.target, keyspace, &mut bindings)?;

        Ok(vec![(text, bindings)])
    }
}

/// `a = ? AND b = ?` over key bindings.
pub(crate) fn key_restriction(key: &[Binding]) -> String {
    key.iter()
        .map(|b| format!("{} = ?", b.column))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn assignment_cql(
    field: &FieldDescriptor,
    assignment: &Assignment,
    keyspace: &str,
    codecs: &CodecRegistry,
    bindings: &mut Vec<Binding>,
) -> Result<String, Error> {
    let column = field.column_or_name();
    let incrementing = matches!(assignment, Assignment::Increment(_));

    if field.is_counter() != incrementing {
        let message = if field.is_counter() {
            format!("counter column '{column}' can only be incremented")
        } else {
            format!("column '{column}' is not a counter")
        };
        return Err(ValidationError::statement(field.class_type(), message).into());
    }

    let encode = |value: Value| -> Result<Value, Error> {
        field.validate_value(&value)?;
        field.encode_value(value, keyspace, codecs)
    };

    Ok(match assignment {
        Assignment::Set(value) => {
            bindings.push(Binding::new(column, encode(value.clone())?));
            format!("{column} = ?")
        }
        Assignment::Increment(by) => {
            bindings.push(Binding::new(column, Value::BigInt(*by)));
            format!("{column} = {column} + ?")
        }
        Assignment::Append(value) | Assignment::Add(value) => {
            let value = collection(field, value.clone())?;
            bindings.push(Binding::new(column, encode(value)?));
            format!("{column} = {column} + ?")
        }
        Assignment::Prepend(value) => {
            let value = collection(field, value.clone())?;
            bindings.push(Binding::new(column, encode(value)?));
            format!("{column} = ? + {column}")
        }
        Assignment::Remove(value) => {
            // map entries are removed by key
            let value = match (field.data_type(), value) {
                (
                    DataType::Map(..) | DataType::SortedMap(..),
                    Value::Set(keys) | Value::List(keys),
                ) => Value::Set(keys.clone()),
                (DataType::Map(..) | DataType::SortedMap(..), key) => Value::Set(vec![key.clone()]),
                (_, value) => encode(collection(field, value.clone())?)?,
            };
            bindings.push(Binding::new(column, value));
            format!("{column} = {column} - ?")
        }
        Assignment::Put(key, value) => {
            let entry = Value::Map(vec![(key.clone(), value.clone())]);
            let Value::Map(mut entries) = encode(entry)? else {
                return Err(not_collection(field));
            };
            let Some((key, value)) = entries.pop() else {
                return Err(not_collection(field));
            };
            bindings.push(Binding::new(column, key));
            bindings.push(Binding::new(column, value));
            format!("{column}[?] = ?")
        }
    })
}

// Wrap a single element into the collection shape of the column.
fn collection(field: &FieldDescriptor, value: Value) -> Result<Value, Error> {
    Ok(match (field.data_type(), value) {
        (DataType::List(_), value @ Value::List(_)) => value,
        (DataType::List(_), value) => Value::List(vec![value]),
        (data_type, Value::Set(items) | Value::List(items)) if data_type.is_set() => {
            Value::Set(items)
        }
        (data_type, value) if data_type.is_set() => Value::Set(vec![value]),
        (DataType::Map(..) | DataType::SortedMap(..), value @ Value::Map(_)) => value,
        _ => return Err(not_collection(field)),
    })
}

fn not_collection(field: &FieldDescriptor) -> Error {
    ValidationError::statement(
        field.class_type(),
        format!(
            "column '{}' of type {} does not support collection updates",
            field.column_or_name(),
            field.data_type().label()
        ),
    )
    .into()
}

impl Statement for Update {
    fn kind(&self) -> StatementKind {
        StatementKind::Update
    }

    fn build(&mut self) -> Result<Arc<[PrimitiveStatement]>, Error> {
        let type_name = Some(self.target.type_name());
        if let Some(hit) = self.cache.hit(self.kind(), type_name) {
            return Ok(hit);
        }

        let compiled = self.compile();
        let compiled = excluded(
            self.target.excluded_keys(),
            self.kind(),
            self.target.type_name(),
            compiled,
        )?;

        Ok(self.cache.store(self.kind(), type_name, compiled))
    }

    fn is_dirty(&self) -> bool {
        self.cache.is_dirty()
    }
}
