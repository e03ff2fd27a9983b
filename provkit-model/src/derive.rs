//! Data-source schemas derived from resource schemas.
//!
//! A data source reads the same entity a resource manages, so its schema is
//! the resource schema seen from the read side: lookup keys keep their
//! requiredness, everything else becomes optional+computed, write-only
//! fields are dropped, and a few attributes get data-source wording.

use crate::schema::{AttributeType, Requiredness, ResourceSchema, SchemaAttribute};
use crate::ModelError;
use provkit_types::StateValue;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors in a derivation request. Always a defect in the calling definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeriveError {
    #[error("{role} `{name}` is not an attribute of the source schema")]
    UnknownAttribute { role: &'static str, name: String },

    #[error("`{name}` is excluded but also listed as {role}")]
    ExcludedAndKept { role: &'static str, name: String },

    #[error("added attribute `{name}` collides with a source attribute")]
    Collision { name: String },

    #[error("derived schema is invalid: {0}")]
    Invalid(#[from] ModelError),
}

/// Patch applied to one attribute after it has been copied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeOverride {
    pub description: Option<String>,
    pub default: Option<StateValue>,
    pub attr_type: Option<AttributeType>,
    pub requiredness: Option<Requiredness>,
}

impl AttributeOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, default: impl Into<StateValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn attr_type(mut self, attr_type: AttributeType) -> Self {
        self.attr_type = Some(attr_type);
        self
    }

    pub fn requiredness(mut self, requiredness: Requiredness) -> Self {
        self.requiredness = Some(requiredness);
        self
    }

    fn apply(&self, attr: &mut SchemaAttribute) {
        if let Some(description) = &self.description {
            attr.description.clone_from(description);
        }
        if let Some(attr_type) = &self.attr_type {
            attr.attr_type = attr_type.clone();
        }
        if let Some(requiredness) = self.requiredness {
            attr.requiredness = requiredness;
        }
        if let Some(default) = &self.default {
            attr.default = Some(default.clone());
        }
    }
}

/// Builder for a derived schema.
///
/// ```
/// use provkit_model::{ResourceSchema, SchemaAttribute, SchemaDeriver, AttributeOverride};
///
/// let user = ResourceSchema::new()
///     .with_attribute("username", SchemaAttribute::required_string())
///     .with_attribute("password", SchemaAttribute::required_string().sensitive());
///
/// let data_source = SchemaDeriver::new(&user)
///     .exclude(["password"])
///     .override_attr("username", AttributeOverride::new().description("Login to look up."))
///     .derive()
///     .unwrap();
///
/// assert!(!data_source.contains("password"));
/// ```
#[derive(Debug, Clone)]
pub struct SchemaDeriver<'a> {
    source: &'a ResourceSchema,
    description: Option<String>,
    required_keys: BTreeSet<String>,
    overrides: BTreeMap<String, AttributeOverride>,
    excluded: BTreeSet<String>,
    added: BTreeMap<String, SchemaAttribute>,
}

impl<'a> SchemaDeriver<'a> {
    pub fn new(source: &'a ResourceSchema) -> Self {
        Self {
            source,
            description: None,
            required_keys: BTreeSet::new(),
            overrides: BTreeMap::new(),
            excluded: BTreeSet::new(),
            added: BTreeMap::new(),
        }
    }

    /// Description of the derived schema (the source's is not carried over).
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attributes that keep their source requiredness (lookup keys).
    pub fn required_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn override_attr(mut self, name: impl Into<String>, patch: AttributeOverride) -> Self {
        self.overrides.insert(name.into(), patch);
        self
    }

    /// Adds an attribute the source does not have.
    pub fn add_attribute(mut self, name: impl Into<String>, attribute: SchemaAttribute) -> Self {
        self.added.insert(name.into(), attribute);
        self
    }

    pub fn derive(self) -> Result<ResourceSchema, DeriveError> {
        self.check_names()?;

        let mut attributes = BTreeMap::new();
        for (name, source_attr) in &self.source.attributes {
            if self.excluded.contains(name) {
                continue;
            }
            let mut attr = source_attr.clone();
            if self.required_keys.contains(name) {
                clear_force_new(&mut attr);
            } else {
                make_optional_computed(&mut attr);
            }
            if let Some(patch) = self.overrides.get(name) {
                patch.apply(&mut attr);
            }
            attributes.insert(name.clone(), attr);
        }

        for (name, attr) in self.added {
            if attributes.contains_key(&name) {
                return Err(DeriveError::Collision { name });
            }
            attributes.insert(name, attr);
        }

        let derived = ResourceSchema {
            description: self.description,
            version: 0,
            attributes,
            groups: Vec::new(),
            passthrough: Default::default(),
        };
        derived.validate_definition()?;
        Ok(derived)
    }

    fn check_names(&self) -> Result<(), DeriveError> {
        let lists: [(&'static str, Vec<&String>); 3] = [
            ("required key", self.required_keys.iter().collect()),
            ("override", self.overrides.keys().collect()),
            ("excluded attribute", self.excluded.iter().collect()),
        ];
        for (role, names) in lists {
            if let Some(name) = names.into_iter().find(|n| !self.source.contains(n)) {
                return Err(DeriveError::UnknownAttribute {
                    role,
                    name: name.clone(),
                });
            }
        }
        if let Some(name) = self.excluded.iter().find(|n| self.required_keys.contains(*n)) {
            return Err(DeriveError::ExcludedAndKept {
                role: "a required key",
                name: name.clone(),
            });
        }
        if let Some(name) = self.excluded.iter().find(|n| self.overrides.contains_key(*n)) {
            return Err(DeriveError::ExcludedAndKept {
                role: "an override",
                name: name.clone(),
            });
        }
        Ok(())
    }
}

/// Derives a read-only schema in one call.
///
/// `required_keys` keep their requiredness, every other retained attribute
/// becomes optional+computed, `overrides` patch attributes after copying,
/// and `excluded` attributes are dropped.
pub fn derive(
    source: &ResourceSchema,
    required_keys: &[&str],
    overrides: BTreeMap<String, AttributeOverride>,
    excluded: &[&str],
) -> Result<ResourceSchema, DeriveError> {
    let mut deriver = SchemaDeriver::new(source)
        .required_keys(required_keys.iter().copied())
        .exclude(excluded.iter().copied());
    deriver.overrides = overrides;
    deriver.derive()
}

fn clear_force_new(attr: &mut SchemaAttribute) {
    attr.force_new = false;
    if let Some(attributes) = attr.attr_type.block_attributes_mut() {
        attributes.values_mut().for_each(clear_force_new);
    }
}

// A read path never demands input and never supplies a default: the remote
// provides the value.
fn make_optional_computed(attr: &mut SchemaAttribute) {
    attr.requiredness = Requiredness::OptionalComputed;
    attr.default = None;
    attr.force_new = false;
    if let Some(attributes) = attr.attr_type.block_attributes_mut() {
        attributes.values_mut().for_each(make_optional_computed);
    }
}
