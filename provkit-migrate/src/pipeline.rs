//! Upgrades across all resources of a catalog.

use crate::step::MigrationStep;
use crate::upgrader::StateUpgrader;
use crate::{MigrationError, Result};
use provkit_model::ResourceSchema;
use provkit_types::StateMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
struct Entry {
    schema: Arc<ResourceSchema>,
    upgrader: StateUpgrader,
}

/// Resource name → (current schema, migration chain).
///
/// Populated once at startup, then only read. Every upgraded map is checked
/// against the current schema before it is handed back.
#[derive(Debug, Default)]
pub struct MigrationPipeline {
    entries: BTreeMap<String, Entry>,
}

impl MigrationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource. The chain targets `schema.version` and is validated
    /// here, so a registered resource always has a usable chain.
    pub fn register(
        &mut self,
        resource: impl Into<String>,
        schema: Arc<ResourceSchema>,
        steps: Vec<Box<dyn MigrationStep>>,
    ) -> Result<()> {
        let resource = resource.into();
        if self.entries.contains_key(&resource) {
            return Err(MigrationError::DuplicateResource { resource });
        }

        let mut upgrader = StateUpgrader::new(resource.clone(), schema.version);
        for step in steps {
            upgrader.register(step);
        }
        upgrader.validate()?;

        self.entries.insert(resource, Entry { schema, upgrader });
        Ok(())
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.entries.contains_key(resource)
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn upgrader(&self, resource: &str) -> Option<&StateUpgrader> {
        self.entries.get(resource).map(|e| &e.upgrader)
    }

    pub fn current_version(&self, resource: &str) -> Option<u32> {
        self.entries.get(resource).map(|e| e.schema.version)
    }

    /// Upgrades state persisted by `resource` at `from_version`.
    ///
    /// State already at the current version is returned as is. Otherwise
    /// the steps run in order and the result must satisfy the current
    /// schema. `state` is never modified.
    pub fn upgrade(&self, resource: &str, from_version: u32, state: &StateMap) -> Result<StateMap> {
        let entry = self
            .entries
            .get(resource)
            .ok_or_else(|| MigrationError::UnknownResource {
                resource: resource.to_string(),
            })?;

        if !entry.upgrader.needs_upgrade(from_version) {
            return Ok(state.clone());
        }

        let result = entry.upgrader.upgrade(from_version, state).and_then(|upgraded| {
            entry
                .schema
                .validate_state(&upgraded)
                .map_err(|source| MigrationError::InvalidResult {
                    resource: resource.to_string(),
                    source,
                })?;
            Ok(upgraded)
        });

        match &result {
            Ok(_) => info!(
                resource = %resource,
                from = from_version,
                to = entry.schema.version,
                "State upgraded"
            ),
            Err(e) => warn!(
                resource = %resource,
                from = from_version,
                error = %e,
                "State upgrade failed"
            ),
        }
        result
    }
}
