//! Command implementations. Each returns the text to print so the binary
//! stays a thin shell over them.

use crate::sample;
use anyhow::{bail, Context, Result};
use provkit_registry::{Catalog, Kind, LintConfig, LintFinding};
use provkit_types::{decode, encode, state_from_json, StateValue};

/// One line per definition: `<kind>\t<name>`.
pub fn list(catalog: &Catalog, kind: Option<Kind>) -> Vec<String> {
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => Kind::ALL.to_vec(),
    };
    kinds
        .into_iter()
        .flat_map(|kind| {
            catalog
                .list(kind)
                .into_iter()
                .map(move |name| format!("{kind}\t{name}"))
        })
        .collect()
}

/// The schema of one definition as pretty JSON.
pub fn describe(catalog: &Catalog, kind: Kind, name: &str) -> Result<String> {
    let schema = catalog.get(kind, name)?;
    serde_json::to_string_pretty(schema).context("Failed to serialize schema")
}

pub fn lint(catalog: &Catalog, config: &LintConfig) -> Vec<LintFinding> {
    provkit_registry::lint(catalog, config)
}

/// Splits an identifier into labelled parts.
///
/// With a resource, its declared layout is used; otherwise `arity` unnamed
/// parts are expected.
pub fn decode_id(resource: Option<&str>, arity: usize, id: &str) -> Result<Vec<(String, String)>> {
    match resource {
        Some(resource) => {
            let format = id_format(resource)?;
            let parsed = format.decode(id)?;
            Ok(format
                .labels()
                .iter()
                .cloned()
                .zip(parsed.into_parts())
                .collect())
        }
        None => Ok(decode(id, arity)?
            .into_iter()
            .enumerate()
            .map(|(i, part)| (format!("part{i}"), part))
            .collect()),
    }
}

/// Joins parts into an identifier, checked against the resource layout when
/// one is given.
pub fn encode_id(resource: Option<&str>, parts: &[String]) -> Result<String> {
    match resource {
        Some(resource) => Ok(id_format(resource)?.encode(parts)?),
        None => Ok(encode(parts, parts.len())?),
    }
}

/// Upgrades a JSON state document persisted at `from_version`.
pub fn upgrade(catalog: &Catalog, resource: &str, from_version: u32, document: &str) -> Result<String> {
    let state = state_from_json(document).context("Failed to parse state document")?;
    let upgraded = catalog
        .upgrade(resource, from_version, &state)
        .with_context(|| format!("Failed to upgrade {resource} state from v{from_version}"))?;
    serde_json::to_string_pretty(&StateValue::Map(upgraded)).context("Failed to serialize state")
}

fn id_format(resource: &str) -> Result<provkit_types::IdFormat> {
    match sample::id_format(resource) {
        Some(format) => Ok(format),
        None => bail!("resource {resource} has no composite identifier"),
    }
}
