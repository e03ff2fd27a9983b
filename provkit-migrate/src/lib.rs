//! Versioned state migration for provkit.
//!
//! Every resource schema carries a version. State persisted under an older
//! version is rewritten by a chain of [`MigrationStep`]s, one per version
//! bump, before it is read against the current schema:
//!
//! ```text
//! v0 state ──step(0)──▶ v1 state ──step(1)──▶ v2 state (current)
//! ```
//!
//! - [`StateUpgrader`] holds the chain of one resource and checks it is
//!   contiguous.
//! - [`MigrationPipeline`] maps resource names to their current schema and
//!   upgrader, and validates the result of every upgrade.

mod pipeline;
mod step;
mod upgrader;

pub use pipeline::MigrationPipeline;
pub use step::{migration, FnStep, MigrationStep, StepError};
pub use upgrader::StateUpgrader;

use provkit_model::ModelError;
use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, MigrationError>;

/// Errors raised while checking a migration chain or upgrading state.
///
/// `GapInChain`, `DuplicateStep`, `StepOutOfRange` and `DuplicateResource`
/// are definition errors found at startup; the others are per-upgrade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MigrationError {
    #[error("no migrations registered for resource `{resource}`")]
    UnknownResource { resource: String },

    #[error("resource `{resource}` is already registered for migration")]
    DuplicateResource { resource: String },

    #[error("resource `{resource}`: missing migration step from v{missing}")]
    GapInChain { resource: String, missing: u32 },

    #[error("resource `{resource}`: more than one migration step from v{from}")]
    DuplicateStep { resource: String, from: u32 },

    #[error("resource `{resource}`: migration step from v{from} is not below current v{current}")]
    StepOutOfRange {
        resource: String,
        from: u32,
        current: u32,
    },

    #[error("resource `{resource}`: state version v{found} is newer than current v{current}")]
    FutureVersion {
        resource: String,
        found: u32,
        current: u32,
    },

    #[error("resource `{resource}`: state version v{found} is older than the oldest supported v{oldest}")]
    UnsupportedVersion {
        resource: String,
        found: u32,
        oldest: u32,
    },

    #[error("resource `{resource}`: migration from v{from} failed: {source}")]
    StepFailed {
        resource: String,
        from: u32,
        #[source]
        source: StepError,
    },

    #[error("resource `{resource}`: upgraded state is invalid: {source}")]
    InvalidResult {
        resource: String,
        #[source]
        source: ModelError,
    },
}

impl MigrationError {
    /// True for errors that indicate a broken definition rather than bad state.
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::GapInChain { .. }
                | Self::DuplicateStep { .. }
                | Self::StepOutOfRange { .. }
                | Self::DuplicateResource { .. }
        )
    }
}
