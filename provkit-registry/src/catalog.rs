//! The frozen registry.

use crate::definition::Kind;
use crate::error::RegistryError;
use provkit_migrate::{MigrationError, MigrationPipeline};
use provkit_model::ResourceSchema;
use provkit_types::StateMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug)]
struct CatalogInner {
    resources: BTreeMap<String, Arc<ResourceSchema>>,
    data_sources: BTreeMap<String, Arc<ResourceSchema>>,
    pipeline: MigrationPipeline,
}

/// Read-only view of every registered schema.
///
/// Produced by [`crate::RegistryBuilder::build`]. Cloning shares the same
/// snapshot, so a catalog can be handed to any number of threads.
#[derive(Debug, Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

impl Catalog {
    pub(crate) fn new(
        resources: BTreeMap<String, Arc<ResourceSchema>>,
        data_sources: BTreeMap<String, Arc<ResourceSchema>>,
        pipeline: MigrationPipeline,
    ) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                resources,
                data_sources,
                pipeline,
            }),
        }
    }

    fn table(&self, kind: Kind) -> &BTreeMap<String, Arc<ResourceSchema>> {
        match kind {
            Kind::Resource => &self.inner.resources,
            Kind::DataSource => &self.inner.data_sources,
        }
    }

    pub fn lookup(&self, kind: Kind, name: &str) -> Option<&ResourceSchema> {
        self.table(kind).get(name).map(Arc::as_ref)
    }

    /// Like [`Self::lookup`], with an error naming the missing entry.
    pub fn get(&self, kind: Kind, name: &str) -> Result<&ResourceSchema, RegistryError> {
        self.lookup(kind, name).ok_or_else(|| RegistryError::NotFound {
            kind,
            name: name.to_string(),
        })
    }

    /// Shared handle to a schema, for callers that outlive the catalog borrow.
    pub fn schema(&self, kind: Kind, name: &str) -> Option<Arc<ResourceSchema>> {
        self.table(kind).get(name).cloned()
    }

    /// Names registered under `kind`, sorted.
    pub fn list(&self, kind: Kind) -> BTreeSet<String> {
        self.table(kind).keys().cloned().collect()
    }

    pub fn iter(&self, kind: Kind) -> impl Iterator<Item = (&str, &ResourceSchema)> {
        self.table(kind)
            .iter()
            .map(|(name, schema)| (name.as_str(), schema.as_ref()))
    }

    pub fn len(&self, kind: Kind) -> usize {
        self.table(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.resources.is_empty() && self.inner.data_sources.is_empty()
    }

    pub fn pipeline(&self) -> &MigrationPipeline {
        &self.inner.pipeline
    }

    /// Upgrades persisted state of a resource to its current schema version.
    pub fn upgrade(
        &self,
        resource: &str,
        from_version: u32,
        state: &StateMap,
    ) -> Result<StateMap, MigrationError> {
        self.inner.pipeline.upgrade(resource, from_version, state)
    }
}
