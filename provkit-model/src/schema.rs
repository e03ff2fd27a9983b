use crate::ModelError;
use provkit_types::{StateMap, StateValue};
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Name of the implicit identifier attribute every resource carries.
///
/// It is never declared in a schema; state maps may always hold it.
pub const ID_ATTRIBUTE: &str = "id";

/// Declarative description of one manageable entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Monotonic schema version, starting at 0.
    pub version: u32,
    pub attributes: BTreeMap<String, SchemaAttribute>,
    /// Cross-attribute rules, checked after individual attributes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<AttributeGroup>,
    /// Undeclared top-level state keys kept as persisted (e.g. `timeouts`).
    /// Accepted in state, never in configuration.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub passthrough: BTreeSet<String>,
}

/// One attribute of a schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaAttribute {
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    pub requiredness: Requiredness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<StateValue>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    /// Changing the value forces the entity to be recreated.
    pub force_new: bool,
    /// The value must never appear in logs or diffs.
    pub sensitive: bool,
}

/// Semantic type of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int,
    Bool,
    Float,
    List {
        element: Box<AttributeType>,
    },
    Set {
        element: Box<AttributeType>,
    },
    /// Nested block, persisted as a list of objects.
    Block {
        attributes: BTreeMap<String, SchemaAttribute>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
    },
}

/// Whether a value must, may, or cannot be supplied by the user.
///
/// `OptionalComputed` is the only legal combination: the user may set the
/// value, and the remote fills it in when they don't.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requiredness {
    Required,
    Optional,
    Computed,
    OptionalComputed,
}

/// A single-attribute validation rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Validation {
    /// Value must be one of an enumerated set (strings, or ints by their decimal form).
    OneOf { values: Vec<String> },
    /// Inclusive integer range.
    IntBetween { min: i64, max: i64 },
    /// Inclusive string length range, in characters.
    StringLength { min: usize, max: usize },
    Predicate(NamedPredicate),
}

/// A validation predicate with a name for diagnostics and schema output.
#[derive(Clone, Copy)]
pub struct NamedPredicate {
    pub name: &'static str,
    pub check: fn(&StateValue) -> bool,
}

/// Cross-attribute rule over a set of attributes of the same schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeGroup {
    pub rule: GroupRule,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRule {
    /// Exactly one member must be set.
    ExactlyOneOf,
    /// At least one member must be set.
    AtLeastOneOf,
    /// At most one member may be set.
    ConflictsWith,
    /// Either all members are set or none is.
    RequiredWith,
}

/// A single reason a state or config map does not fit its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted attribute path, e.g. `push_rules.0.regex`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

// ================================================================
// Requiredness
// ================================================================

impl Requiredness {
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(self, Self::Required)
    }

    #[must_use]
    pub fn is_optional(self) -> bool {
        matches!(self, Self::Optional | Self::OptionalComputed)
    }

    #[must_use]
    pub fn is_computed(self) -> bool {
        matches!(self, Self::Computed | Self::OptionalComputed)
    }

    /// Whether the user may put a value in config.
    #[must_use]
    pub fn accepts_input(self) -> bool {
        !matches!(self, Self::Computed)
    }
}

// ================================================================
// AttributeType
// ================================================================

impl AttributeType {
    pub fn list_of(element: AttributeType) -> Self {
        Self::List {
            element: Box::new(element),
        }
    }

    pub fn set_of(element: AttributeType) -> Self {
        Self::Set {
            element: Box::new(element),
        }
    }

    pub fn block<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (S, SchemaAttribute)>,
        S: Into<String>,
    {
        Self::Block {
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            max_items: None,
        }
    }

    /// Short type name used in diagnostics.
    #[must_use]
    /// Attributes of the block this type holds, looking through list and
    /// set elements.
    pub fn block_attributes(&self) -> Option<&BTreeMap<String, SchemaAttribute>> {
        match self {
            Self::Block { attributes, .. } => Some(attributes),
            Self::List { element } | Self::Set { element } => element.block_attributes(),
            _ => None,
        }
    }

    pub fn block_attributes_mut(&mut self) -> Option<&mut BTreeMap<String, SchemaAttribute>> {
        match self {
            Self::Block { attributes, .. } => Some(attributes),
            Self::List { element } | Self::Set { element } => element.block_attributes_mut(),
            _ => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::String => "string".into(),
            Self::Int => "int".into(),
            Self::Bool => "bool".into(),
            Self::Float => "float".into(),
            Self::List { element } => format!("list({})", element.name()),
            Self::Set { element } => format!("set({})", element.name()),
            Self::Block { .. } => "block".into(),
        }
    }
}

// ================================================================
// SchemaAttribute
// ================================================================

impl SchemaAttribute {
    pub fn new(attr_type: AttributeType, requiredness: Requiredness) -> Self {
        Self {
            attr_type,
            requiredness,
            default: None,
            description: String::new(),
            validation: None,
            force_new: false,
            sensitive: false,
        }
    }

    pub fn required(attr_type: AttributeType) -> Self {
        Self::new(attr_type, Requiredness::Required)
    }

    pub fn optional(attr_type: AttributeType) -> Self {
        Self::new(attr_type, Requiredness::Optional)
    }

    pub fn computed(attr_type: AttributeType) -> Self {
        Self::new(attr_type, Requiredness::Computed)
    }

    pub fn optional_computed(attr_type: AttributeType) -> Self {
        Self::new(attr_type, Requiredness::OptionalComputed)
    }

    /// Shorthand for a required string attribute.
    pub fn required_string() -> Self {
        Self::required(AttributeType::String)
    }

    /// Shorthand for an optional string attribute.
    pub fn optional_string() -> Self {
        Self::optional(AttributeType::String)
    }

    /// Shorthand for a computed string attribute.
    pub fn computed_string() -> Self {
        Self::computed(AttributeType::String)
    }

    /// Shorthand for an optional boolean attribute with a default.
    pub fn optional_bool(default: bool) -> Self {
        Self::optional(AttributeType::Bool).with_default(default)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default(mut self, default: impl Into<StateValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

// ================================================================
// Validation
// ================================================================

impl Validation {
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn predicate(name: &'static str, check: fn(&StateValue) -> bool) -> Self {
        Self::Predicate(NamedPredicate { name, check })
    }

    /// Checks a non-null value. Returns the failure message.
    pub fn check(&self, value: &StateValue) -> Result<(), String> {
        match self {
            Self::OneOf { values } => {
                let repr = match value {
                    StateValue::String(s) => s.clone(),
                    StateValue::Int(i) => i.to_string(),
                    other => return Err(format!("{} cannot be one of {values:?}", other.type_name())),
                };
                if values.iter().any(|v| *v == repr) {
                    Ok(())
                } else {
                    Err(format!("{repr:?} is not one of {values:?}"))
                }
            }
            Self::IntBetween { min, max } => match value.as_int() {
                Some(i) if (*min..=*max).contains(&i) => Ok(()),
                Some(i) => Err(format!("{i} is outside {min}..={max}")),
                None => Err(format!("expected int, found {}", value.type_name())),
            },
            Self::StringLength { min, max } => match value.as_str() {
                Some(s) => {
                    let len = s.chars().count();
                    if (*min..=*max).contains(&len) {
                        Ok(())
                    } else {
                        Err(format!("length {len} is outside {min}..={max}"))
                    }
                }
                None => Err(format!("expected string, found {}", value.type_name())),
            },
            Self::Predicate(p) => {
                if (p.check)(value) {
                    Ok(())
                } else {
                    Err(format!("failed check `{}`", p.name))
                }
            }
        }
    }
}

impl fmt::Debug for NamedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedPredicate").field("name", &self.name).finish()
    }
}

impl PartialEq for NamedPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Serialize for NamedPredicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("NamedPredicate", 1)?;
        s.serialize_field("name", self.name)?;
        s.end()
    }
}

// ================================================================
// AttributeGroup
// ================================================================

impl AttributeGroup {
    pub fn new<I, S>(rule: GroupRule, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rule,
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks the rule against a config map. Returns the failure message.
    pub fn check(&self, config: &StateMap) -> Result<(), String> {
        let set: Vec<&str> = self
            .members
            .iter()
            .filter(|m| config.get(m.as_str()).is_some_and(|v| !v.is_null()))
            .map(String::as_str)
            .collect();
        let ok = match self.rule {
            GroupRule::ExactlyOneOf => set.len() == 1,
            GroupRule::AtLeastOneOf => !set.is_empty(),
            GroupRule::ConflictsWith => set.len() <= 1,
            GroupRule::RequiredWith => set.is_empty() || set.len() == self.members.len(),
        };
        if ok {
            return Ok(());
        }
        let rule = match self.rule {
            GroupRule::ExactlyOneOf => "exactly one of",
            GroupRule::AtLeastOneOf => "at least one of",
            GroupRule::ConflictsWith => "at most one of",
            GroupRule::RequiredWith => "all or none of",
        };
        Err(format!(
            "{rule} [{}] must be set, found [{}]",
            self.members.join(", "),
            set.join(", ")
        ))
    }
}

// ================================================================
// ResourceSchema
// ================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    State,
    Config,
}

impl ResourceSchema {
    /// Creates an empty version-0 schema.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: SchemaAttribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn with_group(mut self, group: AttributeGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Lets state carry `key` through untouched without declaring it.
    pub fn with_passthrough(mut self, key: impl Into<String>) -> Self {
        self.passthrough.insert(key.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Attribute names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Checks the schema declaration itself.
    ///
    /// Run once at registration; a failure is a defect in the definition.
    pub fn validate_definition(&self) -> Result<(), ModelError> {
        check_attribute_defs("", &self.attributes)?;
        for key in &self.passthrough {
            let reason = if key.trim().is_empty() {
                "passthrough key is empty"
            } else if key == ID_ATTRIBUTE {
                "`id` is always carried and cannot be listed"
            } else if self.attributes.contains_key(key) {
                "passthrough key is also a declared attribute"
            } else {
                continue;
            };
            return Err(ModelError::InvalidAttribute {
                path: key.clone(),
                reason: reason.into(),
            });
        }
        for group in &self.groups {
            if group.members.len() < 2 {
                return Err(ModelError::InvalidGroup {
                    members: group.members.clone(),
                    reason: "a group needs at least two members".into(),
                });
            }
            for member in &group.members {
                if !self.attributes.contains_key(member) {
                    return Err(ModelError::InvalidGroup {
                        members: group.members.clone(),
                        reason: format!("unknown attribute `{member}`"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Checks that a persisted state map fits this schema.
    ///
    /// Every required attribute is present, every present value has the
    /// declared type, and no undeclared attribute lingers (apart from `id` and
    /// the passthrough keys).
    pub fn validate_state(&self, state: &StateMap) -> Result<(), ModelError> {
        let mut violations = Vec::new();
        check_object("", &self.attributes, &self.passthrough, state, Mode::State, &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ModelError::InvalidState { violations })
        }
    }

    /// Checks user-supplied configuration.
    ///
    /// On top of the state checks, computed-only attributes must not be set,
    /// validation rules apply, and attribute groups are checked last.
    pub fn validate_config(&self, config: &StateMap) -> Result<(), ModelError> {
        let mut violations = Vec::new();
        check_object("", &self.attributes, &BTreeSet::new(), config, Mode::Config, &mut violations);
        if violations.is_empty() {
            for group in &self.groups {
                if let Err(message) = group.check(config) {
                    violations.push(Violation {
                        path: group.members.join("|"),
                        message,
                    });
                }
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ModelError::InvalidConfig { violations })
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn check_attribute_defs(
    prefix: &str,
    attributes: &BTreeMap<String, SchemaAttribute>,
) -> Result<(), ModelError> {
    for (name, attr) in attributes {
        let path = join_path(prefix, name);
        let invalid = |reason: &str| ModelError::InvalidAttribute {
            path: path.clone(),
            reason: reason.to_string(),
        };
        if name.trim().is_empty() {
            return Err(invalid("attribute name is empty"));
        }
        if prefix.is_empty() && name == ID_ATTRIBUTE {
            return Err(invalid("`id` is implicit and cannot be declared"));
        }
        if let Some(default) = &attr.default {
            match attr.requiredness {
                Requiredness::Required => return Err(invalid("a required attribute cannot have a default")),
                Requiredness::Computed => return Err(invalid("a computed attribute cannot have a default")),
                _ => {}
            }
            let mut violations = Vec::new();
            check_value(&path, &attr.attr_type, default, Mode::State, &mut violations);
            if let Some(v) = violations.first() {
                return Err(invalid(&format!("default does not fit: {}", v.message)));
            }
        }
        if let Some(attributes) = attr.attr_type.block_attributes() {
            check_attribute_defs(&path, attributes)?;
        }
    }
    Ok(())
}

fn check_object(
    prefix: &str,
    attributes: &BTreeMap<String, SchemaAttribute>,
    carried: &BTreeSet<String>,
    map: &StateMap,
    mode: Mode,
    violations: &mut Vec<Violation>,
) {
    for (name, attr) in attributes {
        let path = join_path(prefix, name);
        let value = map.get(name).filter(|v| !v.is_null());
        match value {
            None if attr.requiredness.is_required() => violations.push(Violation {
                path,
                message: "required attribute is missing".into(),
            }),
            None => {}
            Some(_) if mode == Mode::Config && !attr.requiredness.accepts_input() => {
                violations.push(Violation {
                    path,
                    message: "computed attribute cannot be set".into(),
                })
            }
            Some(value) => {
                let before = violations.len();
                check_value(&path, &attr.attr_type, value, mode, violations);
                if mode == Mode::Config && violations.len() == before {
                    if let Some(rule) = &attr.validation {
                        if let Err(message) = rule.check(value) {
                            violations.push(Violation { path, message });
                        }
                    }
                }
            }
        }
    }

    for (key, value) in map {
        if attributes.contains_key(key) || carried.contains(key) {
            continue;
        }
        if prefix.is_empty() && key == ID_ATTRIBUTE && mode == Mode::State {
            if !value.is_null() && value.as_str().is_none() {
                violations.push(Violation {
                    path: key.clone(),
                    message: format!("expected string, found {}", value.type_name()),
                });
            }
            continue;
        }
        violations.push(Violation {
            path: join_path(prefix, key),
            message: "attribute is not declared in the schema".into(),
        });
    }
}

fn check_value(
    path: &str,
    ty: &AttributeType,
    value: &StateValue,
    mode: Mode,
    violations: &mut Vec<Violation>,
) {
    if value.is_null() {
        return;
    }
    let mismatch = |violations: &mut Vec<Violation>| {
        violations.push(Violation {
            path: path.to_string(),
            message: format!("expected {}, found {}", ty.name(), value.type_name()),
        })
    };
    match ty {
        AttributeType::String if value.as_str().is_none() => mismatch(violations),
        AttributeType::Int if value.as_int().is_none() => mismatch(violations),
        AttributeType::Float if value.as_float().is_none() => mismatch(violations),
        AttributeType::Bool if value.as_bool().is_none() => mismatch(violations),
        AttributeType::List { element } | AttributeType::Set { element } => {
            let Some(items) = value.as_list() else {
                mismatch(violations);
                return;
            };
            for (i, item) in items.iter().enumerate() {
                check_value(&format!("{path}.{i}"), element, item, mode, violations);
            }
            if matches!(ty, AttributeType::Set { .. }) {
                let duplicate = items
                    .iter()
                    .enumerate()
                    .any(|(i, item)| items[..i].contains(item));
                if duplicate {
                    violations.push(Violation {
                        path: path.to_string(),
                        message: "set holds duplicate elements".into(),
                    });
                }
            }
        }
        AttributeType::Block {
            attributes,
            max_items,
        } => {
            let Some(items) = value.as_list() else {
                mismatch(violations);
                return;
            };
            if let Some(max) = max_items {
                if items.len() > *max {
                    violations.push(Violation {
                        path: path.to_string(),
                        message: format!("at most {max} blocks allowed, found {}", items.len()),
                    });
                }
            }
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}.{i}");
                match item.as_map() {
                    Some(map) => {
                        check_object(&item_path, attributes, &BTreeSet::new(), map, mode, violations)
                    }
                    None => violations.push(Violation {
                        path: item_path,
                        message: format!("expected block, found {}", item.type_name()),
                    }),
                }
            }
        }
        _ => {}
    }
}
