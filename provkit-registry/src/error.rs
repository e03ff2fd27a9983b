//! Error types for the registry.

use crate::definition::Kind;
use provkit_migrate::MigrationError;
use provkit_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} already registered: {name}")]
    DuplicateName { kind: Kind, name: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: Kind, name: String },

    #[error("invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: Kind,
        name: String,
        reason: &'static str,
    },

    #[error("{kind} '{name}' has an invalid schema: {source}")]
    Schema {
        kind: Kind,
        name: String,
        #[source]
        source: ModelError,
    },

    #[error("data source '{name}' declares state migrations; only resources persist state")]
    MigrationsOnDataSource { name: String },

    #[error(transparent)]
    Migration(#[from] MigrationError),
}
