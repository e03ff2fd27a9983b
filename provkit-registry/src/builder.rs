//! Registration phase.
//!
//! Definitions are collected on an owned builder. `build()` runs every
//! factory once, validates every schema and migration chain, and freezes the
//! result into a [`Catalog`]. Nothing can be looked up before that.

use crate::catalog::Catalog;
use crate::definition::{Definition, Kind};
use crate::error::RegistryError;
use provkit_migrate::MigrationPipeline;
use provkit_model::{ModelError, ResourceSchema};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    definitions: BTreeMap<(Kind, String), Definition>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema factory under `(kind, name)`.
    pub fn register<F>(
        &mut self,
        kind: Kind,
        name: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn() -> Result<ResourceSchema, ModelError> + Send + Sync + 'static,
    {
        self.register_definition(Definition::new(kind, name, factory))
    }

    /// Registers a full definition, including its migration chain.
    ///
    /// A resource and a data source may share a name; two definitions of
    /// the same kind may not.
    pub fn register_definition(&mut self, definition: Definition) -> Result<(), RegistryError> {
        let kind = definition.kind;
        let name = definition.name.clone();

        if let Some(reason) = name_problem(&name) {
            return Err(RegistryError::InvalidName { kind, name, reason });
        }
        if kind == Kind::DataSource && !definition.migrations.is_empty() {
            return Err(RegistryError::MigrationsOnDataSource { name });
        }

        let key = (kind, name);
        if self.definitions.contains_key(&key) {
            let (kind, name) = key;
            return Err(RegistryError::DuplicateName { kind, name });
        }

        debug!(kind = %kind, name = %key.1, "Definition registered");
        self.definitions.insert(key, definition);
        Ok(())
    }

    /// Chaining form of [`Self::register_definition`].
    pub fn with(mut self, definition: Definition) -> Result<Self, RegistryError> {
        self.register_definition(definition)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Builds and validates every schema and migration chain.
    ///
    /// The first definition error aborts the build.
    pub fn build(self) -> Result<Catalog, RegistryError> {
        let mut resources = BTreeMap::new();
        let mut data_sources = BTreeMap::new();
        let mut pipeline = MigrationPipeline::new();

        for ((kind, name), definition) in self.definitions {
            let schema = (definition.factory)()
                .and_then(|schema| schema.validate_definition().map(|()| schema))
                .map_err(|source| RegistryError::Schema {
                    kind,
                    name: name.clone(),
                    source,
                })?;
            let schema = Arc::new(schema);

            match kind {
                Kind::Resource => {
                    pipeline.register(name.clone(), Arc::clone(&schema), definition.migrations)?;
                    resources.insert(name.clone(), schema);
                }
                Kind::DataSource => {
                    data_sources.insert(name.clone(), schema);
                }
            }
            debug!(kind = %kind, name = %name, "Schema built");
        }

        info!(
            resources = resources.len(),
            data_sources = data_sources.len(),
            "Catalog built"
        );
        Ok(Catalog::new(resources, data_sources, pipeline))
    }
}

fn name_problem(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        Some("name is empty")
    } else if name.chars().any(char::is_whitespace) {
        Some("name contains whitespace")
    } else {
        None
    }
}
