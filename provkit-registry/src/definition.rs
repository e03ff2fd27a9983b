//! What gets registered: a kind, a name, a schema factory and, for
//! resources, the migration chain of their persisted state.

use provkit_migrate::MigrationStep;
use provkit_model::{ModelError, ResourceSchema};
use std::fmt;

/// Which side of the provider a definition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    /// Managed entity: created, updated, deleted, persisted in state.
    Resource,
    /// Read-only lookup.
    DataSource,
}

impl Kind {
    pub const ALL: [Kind; 2] = [Kind::Resource, Kind::DataSource];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::DataSource => "data source",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a schema. Called exactly once, when the catalog is built.
pub type SchemaFactory = Box<dyn Fn() -> Result<ResourceSchema, ModelError> + Send + Sync>;

/// One registration.
pub struct Definition {
    pub(crate) kind: Kind,
    pub(crate) name: String,
    pub(crate) factory: SchemaFactory,
    pub(crate) migrations: Vec<Box<dyn MigrationStep>>,
}

impl Definition {
    pub fn new<F>(kind: Kind, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<ResourceSchema, ModelError> + Send + Sync + 'static,
    {
        Self {
            kind,
            name: name.into(),
            factory: Box::new(factory),
            migrations: Vec::new(),
        }
    }

    /// Shorthand for `Definition::new(Kind::Resource, ..)`.
    pub fn resource<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<ResourceSchema, ModelError> + Send + Sync + 'static,
    {
        Self::new(Kind::Resource, name, factory)
    }

    /// Shorthand for `Definition::new(Kind::DataSource, ..)`.
    pub fn data_source<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<ResourceSchema, ModelError> + Send + Sync + 'static,
    {
        Self::new(Kind::DataSource, name, factory)
    }

    /// Adds a step to the state migration chain.
    pub fn with_migration(mut self, step: Box<dyn MigrationStep>) -> Self {
        self.migrations.push(step);
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("migrations", &self.migrations.len())
            .finish()
    }
}
