//! Single migration steps.

use provkit_types::{IdError, StateFormatError, StateMap};
use std::fmt;
use thiserror::Error;

/// Why a step could not rewrite a state map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error(transparent)]
    State(#[from] StateFormatError),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error("{0}")]
    Other(String),
}

impl StepError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Rewrites state persisted under `from_version` into the shape of
/// `from_version + 1`.
///
/// Steps must be pure: the same input always yields the same output, and
/// nothing outside the map is read or written.
pub trait MigrationStep: Send + Sync {
    /// Version this step migrates from.
    fn from_version(&self) -> u32;

    /// Version this step produces: one above [`Self::from_version`],
    /// saturating at `u32::MAX`. Such a step never passes chain validation.
    fn to_version(&self) -> u32 {
        self.from_version().saturating_add(1)
    }

    fn migrate(&self, state: StateMap) -> Result<StateMap, StepError>;
}

/// A step backed by a closure. Build one with [`migration`].
pub struct FnStep<F> {
    from: u32,
    f: F,
}

impl<F> MigrationStep for FnStep<F>
where
    F: Fn(StateMap) -> Result<StateMap, StepError> + Send + Sync,
{
    fn from_version(&self) -> u32 {
        self.from
    }

    fn migrate(&self, state: StateMap) -> Result<StateMap, StepError> {
        (self.f)(state)
    }
}

impl<F> fmt::Debug for FnStep<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep").field("from", &self.from).finish()
    }
}

/// Shorthand for a boxed closure step from `from` to `from + 1`.
///
/// ```
/// use provkit_migrate::migration;
/// use provkit_types::{StateMap, StateMapExt};
///
/// let step = migration(0, |mut state: StateMap| {
///     state.rename_key("project_id", "project");
///     Ok(state)
/// });
/// assert_eq!(step.from_version(), 0);
/// assert_eq!(step.to_version(), 1);
/// ```
pub fn migration<F>(from: u32, f: F) -> Box<dyn MigrationStep>
where
    F: Fn(StateMap) -> Result<StateMap, StepError> + Send + Sync + 'static,
{
    Box::new(FnStep { from, f })
}
