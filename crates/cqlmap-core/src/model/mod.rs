//! Immutable descriptor graph produced by the resolver.

mod access;
mod class;
mod field;
mod keyspace;
mod table;

use serde::{Deserialize, Serialize};

// re-exports
pub use access::AccessorTable;
pub(crate) use access::{Accessor, Lineage};
pub use class::{ClassDescriptor, EntityKind, TypeVariant, UdtDescriptor, VariantRegistry};
pub use field::{FieldDescriptor, FieldRole, IndexDescriptor, TypeKeySource};
pub use keyspace::KeyspaceDescriptor;
pub use table::TableDescriptor;

///
/// ClusteringOrder
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ClusteringOrder {
    #[default]
    Asc,
    Desc,
}

impl ClusteringOrder {
    #[must_use]
    pub const fn cql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}
