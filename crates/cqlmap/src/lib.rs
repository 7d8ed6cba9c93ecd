//! ## Crate layout
//! - `config`: mapper configuration loaded from TOML.
//! - `core`: declarations, descriptors, the value pipeline, codecs,
//!   statement builders and schema planning.
//!
//! Mapped types implement [`prelude::Entity`] and are registered for
//! schema scans with [`register_entity!`].

pub use cqlmap_config as config;
pub use cqlmap_core as core;

/// re-exports
///
/// persisted fields serialize through these, so downstream crates do not
/// need to name them in their own Cargo.toml
pub mod __reexports {
    pub use serde;
    pub use serde_json;
}

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//
// re-exports
//

pub use cqlmap_core::{Error, Mapper};

//
// Macros
//

pub use cqlmap_core::{register_entity, udt_field_value};

/// Build a mapper from a TOML config file.
pub fn mapper_from_path(path: impl AsRef<std::path::Path>) -> Result<Mapper, config::ConfigError> {
    Ok(Mapper::new(config::MapperConfig::from_path(path)?))
}

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::{
        config::{Consistency, ExcludedKeyPolicy, MapperConfig, Replication},
        core::prelude::*,
        core::{
            declare::JsonPersister,
            statement::{
                Batch, CreateIndex, CreateKeyspace, CreateTable, CreateType, Delete, Group,
                Insert, Select, Sequence, StatementKind, Truncate, Update,
            },
        },
        register_entity, udt_field_value,
    };
    pub use serde::{Deserialize, Serialize};
}
