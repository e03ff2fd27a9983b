//! The migration chain of one resource.

use crate::step::MigrationStep;
use crate::{MigrationError, Result};
use provkit_types::StateMap;
use std::fmt;
use tracing::debug;

/// Runs the steps of one resource from a persisted version up to the
/// current one.
///
/// A valid chain is contiguous and ends at `current - 1`: with current
/// version 3 the steps may be `{2}`, `{1, 2}` or `{0, 1, 2}`. The lowest
/// registered step is the oldest version still readable.
pub struct StateUpgrader {
    resource: String,
    current_version: u32,
    steps: Vec<Box<dyn MigrationStep>>,
}

impl StateUpgrader {
    pub fn new(resource: impl Into<String>, current_version: u32) -> Self {
        Self {
            resource: resource.into(),
            current_version,
            steps: Vec::new(),
        }
    }

    /// Registers a step. Steps are kept ordered by from-version.
    pub fn register(&mut self, step: Box<dyn MigrationStep>) {
        self.steps.push(step);
        self.steps.sort_by_key(|s| s.from_version());
    }

    pub fn with_step(mut self, step: Box<dyn MigrationStep>) -> Self {
        self.register(step);
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    /// Oldest state version this chain can upgrade.
    pub fn oldest_supported_version(&self) -> u32 {
        self.steps
            .first()
            .map_or(self.current_version, |s| s.from_version())
    }

    /// Registered steps as `(from, to)` pairs, in order.
    pub fn registered_steps(&self) -> Vec<(u32, u32)> {
        self.steps
            .iter()
            .map(|s| (s.from_version(), s.to_version()))
            .collect()
    }

    pub fn needs_upgrade(&self, version: u32) -> bool {
        version != self.current_version
    }

    /// Checks the chain: no duplicates, every step below the current
    /// version, no gaps, and the last step reaching the current version.
    pub fn validate(&self) -> Result<()> {
        let mut expected = self.oldest_supported_version();
        for step in &self.steps {
            let from = step.from_version();
            if from >= self.current_version {
                return Err(MigrationError::StepOutOfRange {
                    resource: self.resource.clone(),
                    from,
                    current: self.current_version,
                });
            }
            if from < expected {
                return Err(MigrationError::DuplicateStep {
                    resource: self.resource.clone(),
                    from,
                });
            }
            if from > expected {
                return Err(MigrationError::GapInChain {
                    resource: self.resource.clone(),
                    missing: expected,
                });
            }
            expected = from + 1;
        }
        if expected != self.current_version {
            return Err(MigrationError::GapInChain {
                resource: self.resource.clone(),
                missing: expected,
            });
        }
        Ok(())
    }

    /// Upgrades `state` from `from_version` to the current version.
    ///
    /// The input is never modified; on error the caller still holds the
    /// state exactly as persisted.
    pub fn upgrade(&self, from_version: u32, state: &StateMap) -> Result<StateMap> {
        if from_version > self.current_version {
            return Err(MigrationError::FutureVersion {
                resource: self.resource.clone(),
                found: from_version,
                current: self.current_version,
            });
        }
        if from_version == self.current_version {
            return Ok(state.clone());
        }
        let oldest = self.oldest_supported_version();
        if from_version < oldest {
            return Err(MigrationError::UnsupportedVersion {
                resource: self.resource.clone(),
                found: from_version,
                oldest,
            });
        }

        let mut upgraded = state.clone();
        let mut version = from_version;
        while version < self.current_version {
            let step = self
                .steps
                .iter()
                .find(|s| s.from_version() == version)
                .ok_or_else(|| MigrationError::GapInChain {
                    resource: self.resource.clone(),
                    missing: version,
                })?;

            upgraded = step
                .migrate(upgraded)
                .map_err(|source| MigrationError::StepFailed {
                    resource: self.resource.clone(),
                    from: version,
                    source,
                })?;

            debug!(
                resource = %self.resource,
                from = version,
                to = step.to_version(),
                "Applied migration step"
            );
            version = step.to_version();
        }
        Ok(upgraded)
    }
}

impl fmt::Debug for StateUpgrader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateUpgrader")
            .field("resource", &self.resource)
            .field("current_version", &self.current_version)
            .field("steps", &self.registered_steps())
            .finish()
    }
}
