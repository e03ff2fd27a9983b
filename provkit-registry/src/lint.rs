//! Static quality checks over a built catalog, configured from
//! `provkit.toml`.
//!
//! ```toml
//! [lint]
//! require_descriptions = true
//! snake_case_names = true
//! sensitive_requires_no_default = true
//! ignore = ["gitlab_user.password"]
//! min_supported_version = 0
//! ```

use crate::catalog::Catalog;
use crate::definition::Kind;
use provkit_model::{ResourceSchema, SchemaAttribute};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// File name the CLI looks for in the working directory.
pub const CONFIG_FILE_NAME: &str = "provkit.toml";

/// Lint settings parsed from the `[lint]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LintConfig {
    #[serde(default = "enabled")]
    pub require_descriptions: bool,
    #[serde(default = "enabled")]
    pub snake_case_names: bool,
    #[serde(default = "enabled")]
    pub sensitive_requires_no_default: bool,
    /// `"<name>"` or `"<name>.<attribute path>"` entries exempt from every lint.
    #[serde(default)]
    pub ignore: BTreeSet<String>,
    /// Every resource must still read state persisted at this version.
    #[serde(default)]
    pub min_supported_version: Option<u32>,
}

fn enabled() -> bool {
    true
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            require_descriptions: true,
            snake_case_names: true,
            sensitive_requires_no_default: true,
            ignore: BTreeSet::new(),
            min_supported_version: None,
        }
    }
}

/// Raw TOML structure matching the provkit.toml format.
#[derive(Deserialize)]
struct LintFile {
    #[serde(default)]
    lint: LintConfig,
}

impl LintConfig {
    /// Parses the contents of a `provkit.toml` file.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<LintFile>(contents).map(|file| file.lint)
    }

    /// Loads lint settings from `path`.
    /// A missing, unreadable or malformed file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No lint config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded lint config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse lint config {:?}: {}. Falling back to defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read lint config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    fn is_ignored(&self, name: &str, attribute: Option<&str>) -> bool {
        self.ignore.contains(name)
            || attribute.is_some_and(|attr| self.ignore.contains(&format!("{name}.{attr}")))
    }
}

/// Which check produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LintRule {
    MissingDescription,
    NotSnakeCase,
    SensitiveDefault,
    MigrationHorizon,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintFinding {
    pub rule: LintRule,
    pub kind: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub message: String,
}

impl fmt::Display for LintFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attr) => write!(f, "{} {}.{}: {}", self.kind, self.name, attr, self.message),
            None => write!(f, "{} {}: {}", self.kind, self.name, self.message),
        }
    }
}

/// Runs every enabled lint over `catalog`.
///
/// Findings are ordered by kind, then definition name, then attribute path.
pub fn lint(catalog: &Catalog, config: &LintConfig) -> Vec<LintFinding> {
    let mut findings = Vec::new();
    for kind in Kind::ALL {
        for (name, schema) in catalog.iter(kind) {
            let mut sink = Sink {
                config,
                kind,
                name,
                findings: &mut findings,
            };
            lint_definition(&mut sink, schema);
            if kind == Kind::Resource {
                lint_horizon(&mut sink, catalog);
            }
        }
    }
    findings
}

struct Sink<'a> {
    config: &'a LintConfig,
    kind: Kind,
    name: &'a str,
    findings: &'a mut Vec<LintFinding>,
}

impl Sink<'_> {
    fn push(&mut self, rule: LintRule, attribute: Option<&str>, message: impl Into<String>) {
        if self.config.is_ignored(self.name, attribute) {
            return;
        }
        self.findings.push(LintFinding {
            rule,
            kind: self.kind.as_str(),
            name: self.name.to_string(),
            attribute: attribute.map(str::to_string),
            message: message.into(),
        });
    }
}

fn lint_definition(sink: &mut Sink<'_>, schema: &ResourceSchema) {
    let config = sink.config;
    if config.snake_case_names && !is_snake_case(sink.name) {
        sink.push(LintRule::NotSnakeCase, None, "name is not snake_case");
    }
    if config.require_descriptions && schema.description.as_deref().is_none_or(str::is_empty) {
        sink.push(LintRule::MissingDescription, None, "schema has no description");
    }
    lint_attributes(sink, "", &schema.attributes);
}

fn lint_attributes(sink: &mut Sink<'_>, prefix: &str, attributes: &BTreeMap<String, SchemaAttribute>) {
    let config = sink.config;
    for (attr_name, attr) in attributes {
        let path = format!("{prefix}{attr_name}");
        if config.snake_case_names && !is_snake_case(attr_name) {
            sink.push(LintRule::NotSnakeCase, Some(&path), "attribute name is not snake_case");
        }
        if config.require_descriptions && attr.description.trim().is_empty() {
            sink.push(LintRule::MissingDescription, Some(&path), "attribute has no description");
        }
        if config.sensitive_requires_no_default && attr.sensitive && attr.default.is_some() {
            sink.push(
                LintRule::SensitiveDefault,
                Some(&path),
                "sensitive attribute declares a default value",
            );
        }
        if let Some(attributes) = attr.attr_type.block_attributes() {
            lint_attributes(sink, &format!("{path}."), attributes);
        }
    }
}

fn lint_horizon(sink: &mut Sink<'_>, catalog: &Catalog) {
    let Some(min) = sink.config.min_supported_version else {
        return;
    };
    let Some(upgrader) = catalog.pipeline().upgrader(sink.name) else {
        return;
    };
    let oldest = upgrader.oldest_supported_version();
    if oldest > min {
        sink.push(
            LintRule::MigrationHorizon,
            None,
            format!("state before v{oldest} can no longer be read (minimum supported is v{min})"),
        );
    }
}

/// `[a-z][a-z0-9]*` segments joined by single underscores.
fn is_snake_case(name: &str) -> bool {
    !name.is_empty()
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && name
            .split('_')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
}
