//! Schema planning across many mapped types.

mod graph;
mod plan;
mod scan;

#[cfg(test)]
mod tests;

pub use graph::DirectedGraph;
pub use plan::{CreateSchema, CreateSchemas};
pub use scan::{ClassSet, EntityRegistration};
