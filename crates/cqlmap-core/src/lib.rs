//! Core of cqlmap: declarations, memoized descriptors, the field value
//! pipeline, UDT codecs, statement builders and the schema planner.
#![warn(unreachable_pub)]

extern crate self as cqlmap_core;

#[macro_use]
mod macros;

// public exports are one module level down
pub mod codec;
pub mod declare;
pub mod error;
pub mod mapper;
pub mod model;
pub mod obs;
pub mod pipeline;
pub mod resolve;
pub mod schema;
pub mod statement;
pub mod types;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use error::Error;
pub use mapper::Mapper;

#[doc(hidden)]
pub use inventory;

///
/// Prelude
///
/// Declaration vocabulary and the statement surface. Errors and the
/// observability layer stay in their modules.
///

pub mod prelude {
    pub use crate::{
        declare::{Declaration, Entity, Field, Keyspace, KeyspaceKey, Persisted, Table, TypeRef},
        mapper::Mapper,
        model::ClusteringOrder,
        pipeline::Row,
        schema::ClassSet,
        statement::{Clause, PrimitiveStatement, Statement, StatementNode},
        types::{Blob, Counter, FieldValue as _, OrderedSet},
        value::Value,
    };
}
