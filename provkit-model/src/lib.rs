//! Schema model for provkit.
//!
//! Defines the declarative types every resource and data source is built
//! from:
//! - [`ResourceSchema`]: attribute map, schema version and attribute groups
//! - [`SchemaAttribute`]: type, requiredness, default, validation, flags
//! - [`AttributeGroup`]: cross-attribute rules (exactly one of, ...)
//! - [`SchemaDeriver`]: read-only (data source) schemas from resource schemas
//!
//! Schemas are plain data. They are validated once when registered and then
//! shared read-only; nothing here performs I/O.

mod derive;
mod schema;

pub use derive::{derive, AttributeOverride, DeriveError, SchemaDeriver};
pub use schema::{
    AttributeGroup, AttributeType, GroupRule, NamedPredicate, Requiredness, ResourceSchema,
    SchemaAttribute, Validation, Violation, ID_ATTRIBUTE,
};

use thiserror::Error;

/// Errors raised by schema declarations and by maps checked against them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid attribute `{path}`: {reason}")]
    InvalidAttribute { path: String, reason: String },

    #[error("invalid attribute group {members:?}: {reason}")]
    InvalidGroup { members: Vec<String>, reason: String },

    #[error("state does not match schema: {}", join_violations(.violations))]
    InvalidState { violations: Vec<Violation> },

    #[error("invalid configuration: {}", join_violations(.violations))]
    InvalidConfig { violations: Vec<Violation> },

    #[error("invalid derivation: {reason}")]
    InvalidDerivation { reason: String },
}

impl ModelError {
    /// Violations carried by state/config errors; empty for definition errors.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::InvalidState { violations } | Self::InvalidConfig { violations } => violations,
            _ => &[],
        }
    }
}

/// Lets schema factories use `?` on a [`SchemaDeriver`].
impl From<DeriveError> for ModelError {
    fn from(err: DeriveError) -> Self {
        match err {
            DeriveError::Invalid(inner) => inner,
            other => Self::InvalidDerivation {
                reason: other.to_string(),
            },
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
