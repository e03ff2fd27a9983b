//! A small GitLab-flavoured provider catalog.
//!
//! Exercises every part of the model: requiredness, defaults, validation,
//! nested blocks, attribute groups, composite identifiers, a migrated
//! resource and a derived data source.

use provkit_migrate::{migration, MigrationStep};
use provkit_model::{
    AttributeGroup, AttributeOverride, AttributeType, GroupRule, ModelError, Requiredness,
    ResourceSchema, SchemaAttribute, SchemaDeriver, Validation,
};
use provkit_registry::{Catalog, Definition, RegistryBuilder, RegistryError};
use provkit_types::{IdFormat, StateMapExt, StateValue};

pub const PROJECT: &str = "gitlab_project";
pub const PROJECT_VARIABLE: &str = "gitlab_project_variable";
pub const GROUP_LDAP_LINK: &str = "gitlab_group_ldap_link";
pub const USER: &str = "gitlab_user";

const ACCESS_LEVELS: [&str; 5] = ["guest", "reporter", "developer", "maintainer", "owner"];

/// Builds the sample catalog.
pub fn catalog() -> Result<Catalog, RegistryError> {
    RegistryBuilder::new()
        .with(Definition::resource(PROJECT, project_schema))?
        .with(Definition::data_source(PROJECT, project_data_source_schema))?
        .with(
            Definition::resource(PROJECT_VARIABLE, project_variable_schema)
                .with_migration(project_variable_v0()),
        )?
        .with(Definition::resource(GROUP_LDAP_LINK, group_ldap_link_schema))?
        .with(Definition::resource(USER, user_schema))?
        .with(Definition::data_source(USER, user_data_source_schema))?
        .build()
}

/// Identifier layout of resources whose id is composite.
pub fn id_format(resource: &str) -> Option<IdFormat> {
    match resource {
        PROJECT_VARIABLE => Some(IdFormat::new(PROJECT_VARIABLE, ["project", "key"])),
        GROUP_LDAP_LINK => Some(IdFormat::new(
            GROUP_LDAP_LINK,
            ["group", "ldap_provider", "group_access", "cn_or_filter"],
        )),
        _ => None,
    }
}

fn access_level(description: &str) -> SchemaAttribute {
    SchemaAttribute::required_string()
        .with_description(description)
        .with_validation(Validation::one_of(ACCESS_LEVELS))
}

fn project_schema() -> Result<ResourceSchema, ModelError> {
    Ok(ResourceSchema::new()
        .with_description("A GitLab project.")
        .with_attribute(
            "name",
            SchemaAttribute::required_string().with_description("The name of the project."),
        )
        .with_attribute(
            "path",
            SchemaAttribute::optional_computed(AttributeType::String)
                .with_description("The path of the repository. Defaults to the name.")
                .force_new(),
        )
        .with_attribute(
            "namespace_id",
            SchemaAttribute::optional_computed(AttributeType::Int)
                .with_description("The namespace (group or user) of the project.")
                .force_new(),
        )
        .with_attribute(
            "visibility_level",
            SchemaAttribute::optional_string()
                .with_description("Set to `public` to create a public project.")
                .with_default("private")
                .with_validation(Validation::one_of(["private", "internal", "public"])),
        )
        .with_attribute(
            "archived",
            SchemaAttribute::optional_bool(false)
                .with_description("Whether the project is in read-only mode."),
        )
        .with_attribute(
            "topics",
            SchemaAttribute::optional(AttributeType::set_of(AttributeType::String))
                .with_description("The list of topics for the project."),
        )
        .with_attribute(
            "push_rules",
            SchemaAttribute::optional(AttributeType::Block {
                attributes: [
                    (
                        "commit_message_regex".to_string(),
                        SchemaAttribute::optional_string()
                            .with_description("All commit messages must match this regex."),
                    ),
                    (
                        "max_file_size".to_string(),
                        SchemaAttribute::optional(AttributeType::Int)
                            .with_description("Maximum file size (MB).")
                            .with_default(0i64)
                            .with_validation(Validation::IntBetween { min: 0, max: 10_000 }),
                    ),
                ]
                .into(),
                max_items: Some(1),
            })
            .with_description("Push rules for the project."),
        )
        .with_attribute(
            "web_url",
            SchemaAttribute::computed_string().with_description("URL of the project page."),
        ))
}

fn project_data_source_schema() -> Result<ResourceSchema, ModelError> {
    let source = project_schema()?;
    let derived = SchemaDeriver::new(&source)
        .description("Look up a GitLab project by name.")
        .required_keys(["name"])
        .exclude(["push_rules"])
        .derive()?;
    Ok(derived)
}

fn project_variable_schema() -> Result<ResourceSchema, ModelError> {
    Ok(ResourceSchema::new()
        .with_version(1)
        .with_description("A CI/CD variable of a GitLab project.")
        .with_attribute(
            "project",
            SchemaAttribute::required_string()
                .with_description("The name or id of the project.")
                .force_new(),
        )
        .with_attribute(
            "key",
            SchemaAttribute::required_string()
                .with_description("The name of the variable.")
                .with_validation(Validation::StringLength { min: 1, max: 255 })
                .force_new(),
        )
        .with_attribute(
            "value",
            SchemaAttribute::required_string()
                .with_description("The value of the variable.")
                .sensitive(),
        )
        .with_attribute(
            "protected",
            SchemaAttribute::optional_bool(false)
                .with_description("Only expose the variable to protected branches and tags."),
        )
        .with_attribute(
            "masked",
            SchemaAttribute::optional_bool(false)
                .with_description("Mask the value in job logs."),
        )
        .with_attribute(
            "environment_scope",
            SchemaAttribute::optional_string()
                .with_description("The environment scope of the variable.")
                .with_default("*"),
        ))
}

/// v0 stored the project under `project_id` and used the bare key as id.
fn project_variable_v0() -> Box<dyn MigrationStep> {
    migration(0, |mut state| {
        let project = state.take_str("project_id")?;
        let key = state.require_str("key")?.to_string();
        let format = IdFormat::new(PROJECT_VARIABLE, ["project", "key"]);
        state.insert("id".into(), format.encode(&[project.as_str(), key.as_str()])?.into());
        state.insert("project".into(), project.into());
        Ok(state)
    })
}

fn group_ldap_link_schema() -> Result<ResourceSchema, ModelError> {
    Ok(ResourceSchema::new()
        .with_description("Links a GitLab group to an LDAP group or filter.")
        .with_attribute(
            "group",
            SchemaAttribute::required_string()
                .with_description("The id or path of the group.")
                .force_new(),
        )
        .with_attribute(
            "cn",
            SchemaAttribute::optional_string()
                .with_description("The CN of the LDAP group to link with.")
                .force_new(),
        )
        .with_attribute(
            "filter",
            SchemaAttribute::optional_string()
                .with_description("The LDAP filter for the group.")
                .force_new(),
        )
        .with_attribute(
            "group_access",
            access_level("Minimum access level for members of the LDAP group.").force_new(),
        )
        .with_attribute(
            "ldap_provider",
            SchemaAttribute::required_string()
                .with_description("The name of the LDAP provider as stored in the GitLab database.")
                .force_new(),
        )
        .with_attribute(
            "force",
            SchemaAttribute::optional_bool(false)
                .with_description("Replace an existing link with the same key."),
        )
        .with_group(AttributeGroup::new(GroupRule::ExactlyOneOf, ["cn", "filter"])))
}

fn user_schema() -> Result<ResourceSchema, ModelError> {
    Ok(ResourceSchema::new()
        .with_description("A GitLab user.")
        .with_attribute(
            "username",
            SchemaAttribute::required_string().with_description("The username of the user."),
        )
        .with_attribute(
            "password",
            SchemaAttribute::optional_string()
                .with_description("The password of the user.")
                .sensitive(),
        )
        .with_attribute(
            "reset_password",
            SchemaAttribute::optional_bool(false)
                .with_description("Send the user a password reset link."),
        )
        .with_attribute(
            "email",
            SchemaAttribute::required_string()
                .with_description("The e-mail address of the user.")
                .force_new(),
        )
        .with_attribute(
            "name",
            SchemaAttribute::required_string().with_description("The name of the user."),
        )
        .with_attribute(
            "is_admin",
            SchemaAttribute::optional_bool(false)
                .with_description("Whether the user is an administrator."),
        )
        .with_attribute(
            "state",
            SchemaAttribute::optional_string()
                .with_description("The state of the user account.")
                .with_default("active")
                .with_validation(Validation::one_of(["active", "blocked", "deactivated"])),
        )
        .with_attribute(
            "user_id",
            SchemaAttribute::computed(AttributeType::Int).with_description("The numeric id of the user."),
        )
        .with_group(AttributeGroup::new(GroupRule::ConflictsWith, ["password", "reset_password"])))
}

fn user_data_source_schema() -> Result<ResourceSchema, ModelError> {
    let source = user_schema()?;
    let derived = SchemaDeriver::new(&source)
        .description("Look up a GitLab user by username, e-mail or id.")
        .exclude(["password", "reset_password"])
        .override_attr(
            "username",
            AttributeOverride::new().description("The username to look up."),
        )
        .override_attr(
            "user_id",
            AttributeOverride::new()
                .description("The numeric id to look up.")
                .requiredness(Requiredness::OptionalComputed),
        )
        .add_attribute(
            "avatar_url",
            SchemaAttribute::computed_string().with_description("The avatar URL of the user."),
        )
        .derive()?;
    Ok(derived.with_group(AttributeGroup::new(
        GroupRule::ExactlyOneOf,
        ["username", "email", "user_id"],
    )))
}

/// A v0 state document of a project variable, as older releases wrote it.
pub fn legacy_project_variable_state() -> provkit_types::StateMap {
    [
        ("project_id", StateValue::from("7")),
        ("id", StateValue::from("API_TOKEN")),
        ("key", StateValue::from("API_TOKEN")),
        ("value", StateValue::from("s3cr3t")),
        ("protected", StateValue::from(true)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}
