use crate::model::{ClusteringOrder, FieldDescriptor, FieldRole};
use std::sync::Arc;

///
/// TableDescriptor
///
/// Columns of one physical table in declaration order, with the partition
/// and clustering keys in key order.
///

#[derive(Clone, Debug)]
pub struct TableDescriptor {
    pub(crate) name: String,
    pub(crate) columns: Vec<Arc<FieldDescriptor>>,
}

impl TableDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[Arc<FieldDescriptor>] {
        &self.columns
    }

    /// Column descriptor by column name.
    #[must_use]
    pub fn column(&self, column: &str) -> Option<&Arc<FieldDescriptor>> {
        self.columns.iter().find(|f| f.column() == Some(column))
    }

    /// Column descriptor by field name.
    #[must_use]
    pub fn field(&self, field: &str) -> Option<&Arc<FieldDescriptor>> {
        self.columns.iter().find(|f| f.name() == field)
    }

    pub fn partition_keys(&self) -> impl Iterator<Item = &Arc<FieldDescriptor>> {
        self.columns.iter().filter(|f| f.is_partition_key())
    }

    pub fn clustering_keys(
        &self,
    ) -> impl Iterator<Item = (&Arc<FieldDescriptor>, ClusteringOrder)> {
        self.columns.iter().filter_map(|f| match f.role() {
            FieldRole::ClusteringKey(order) => Some((f, *order)),
            _ => None,
        })
    }

    /// Partition keys followed by clustering keys.
    pub fn primary_keys(&self) -> impl Iterator<Item = &Arc<FieldDescriptor>> {
        self.partition_keys()
            .chain(self.clustering_keys().map(|(f, _)| f))
    }

    pub fn non_primary_columns(&self) -> impl Iterator<Item = &Arc<FieldDescriptor>> {
        self.columns.iter().filter(|f| !f.role().is_primary_key())
    }

    pub fn indexes(&self) -> impl Iterator<Item = &Arc<FieldDescriptor>> {
        self.columns.iter().filter(|f| f.index().is_some())
    }

    #[must_use]
    pub fn has_counters(&self) -> bool {
        self.columns.iter().any(|f| f.is_counter())
    }
}
