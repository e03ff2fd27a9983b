//! Core type definitions for provkit.
//!
//! This crate defines the plugin-agnostic value types every other provkit
//! crate builds on:
//! - Composite identifiers and their codec (the only persisted format)
//! - The persisted state value model (`StateValue`, `StateMap`)
//!
//! Schemas, derivation, migrations and the registry live in their own crates.

mod ids;
mod value;

pub use ids::{decode, encode, CompositeId, IdError, IdFormat, ID_DELIMITER, MIN_ARITY};
pub use value::{StateFormatError, StateMap, StateMapExt, StateValue};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    StateFormat(#[from] StateFormatError),

    #[error("state document must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Parses a persisted state document (a JSON object) into a [`StateMap`].
pub fn state_from_json(json: &str) -> Result<StateMap> {
    match serde_json::from_str::<StateValue>(json)? {
        StateValue::Map(map) => Ok(map),
        other => Err(Error::NotAnObject(other.type_name())),
    }
}
