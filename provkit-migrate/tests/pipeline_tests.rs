use pretty_assertions::assert_eq;
use provkit_migrate::{migration, MigrationError, MigrationPipeline, MigrationStep, StepError};
use provkit_model::{AttributeType, ResourceSchema, SchemaAttribute};
use provkit_types::{encode, StateMap, StateMapExt, StateValue};
use std::sync::Arc;

fn state(pairs: &[(&str, StateValue)]) -> StateMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// v1 of a project variable: the project moved out of the id into its own
/// attribute, and the id became `<project>:<key>`.
fn variable_schema() -> Arc<ResourceSchema> {
    Arc::new(
        ResourceSchema::new()
            .with_version(1)
            .with_attribute("project", SchemaAttribute::required_string().force_new())
            .with_attribute("key", SchemaAttribute::optional_string())
            .with_attribute("value", SchemaAttribute::optional_string().sensitive()),
    )
}

fn project_moved_into_id() -> Box<dyn MigrationStep> {
    migration(0, |mut state| {
        let project = state.take_str("project_id")?;
        let key = state.take_str("id")?;
        state.insert("id".into(), encode(&[project.as_str(), key.as_str()], 2)?.into());
        state.insert("project".into(), project.into());
        Ok(state)
    })
}

fn variable_pipeline() -> MigrationPipeline {
    let mut pipeline = MigrationPipeline::new();
    pipeline
        .register("project_variable", variable_schema(), vec![project_moved_into_id()])
        .unwrap();
    pipeline
}

// ── Concrete scenario ────────────────────────────────────────────

#[test]
fn rename_project_id_and_rebuild_composite_id() {
    let persisted = state(&[("project_id", "7".into()), ("id", "42".into())]);

    let upgraded = variable_pipeline()
        .upgrade("project_variable", 0, &persisted)
        .unwrap();

    assert_eq!(
        upgraded,
        state(&[("project", "7".into()), ("id", "7:42".into())])
    );
}

// ── Version handling ─────────────────────────────────────────────

#[test]
fn current_version_state_is_returned_unchanged() {
    let current = state(&[("project", "7".into()), ("id", "7:42".into())]);
    let upgraded = variable_pipeline()
        .upgrade("project_variable", 1, &current)
        .unwrap();
    assert_eq!(upgraded, current);
}

#[test]
fn future_version_is_rejected() {
    let err = variable_pipeline()
        .upgrade("project_variable", 2, &StateMap::new())
        .unwrap_err();
    assert_eq!(
        err,
        MigrationError::FutureVersion {
            resource: "project_variable".into(),
            found: 2,
            current: 1
        }
    );
}

#[test]
fn version_older_than_first_step_is_unsupported() {
    let schema = Arc::new(ResourceSchema::new().with_version(3));
    let mut pipeline = MigrationPipeline::new();
    pipeline
        .register("r", schema, vec![migration(2, Ok)])
        .unwrap();

    let err = pipeline.upgrade("r", 1, &StateMap::new()).unwrap_err();
    assert_eq!(
        err,
        MigrationError::UnsupportedVersion {
            resource: "r".into(),
            found: 1,
            oldest: 2
        }
    );
}

#[test]
fn unknown_resource_is_an_error() {
    let err = variable_pipeline()
        .upgrade("project_hook", 0, &StateMap::new())
        .unwrap_err();
    assert_eq!(
        err,
        MigrationError::UnknownResource {
            resource: "project_hook".into()
        }
    );
}

// ── Failure leaves the input untouched ───────────────────────────

#[test]
fn failing_step_reports_resource_and_version() {
    let persisted = state(&[("id", "42".into())]);
    let err = variable_pipeline()
        .upgrade("project_variable", 0, &persisted)
        .unwrap_err();

    let MigrationError::StepFailed { resource, from, source } = err else {
        panic!("expected StepFailed, got {err:?}");
    };
    assert_eq!(resource, "project_variable");
    assert_eq!(from, 0);
    assert!(matches!(source, StepError::State(_)));
}

#[test]
fn failed_upgrade_does_not_modify_input() {
    let persisted = state(&[("project_id", StateValue::Int(7)), ("id", "42".into())]);
    let before = persisted.clone();

    let result = variable_pipeline().upgrade("project_variable", 0, &persisted);

    assert!(result.is_err());
    assert_eq!(persisted, before);
}

#[test]
fn failure_in_a_later_step_discards_earlier_work() {
    let schema = Arc::new(ResourceSchema::new().with_version(2));
    let mut pipeline = MigrationPipeline::new();
    pipeline
        .register(
            "r",
            schema,
            vec![
                migration(0, |mut s| {
                    s.insert("touched".into(), true.into());
                    Ok(s)
                }),
                migration(1, |_| Err(StepError::other("remote format unknown"))),
            ],
        )
        .unwrap();

    let persisted = StateMap::new();
    let err = pipeline.upgrade("r", 0, &persisted).unwrap_err();

    assert!(err.to_string().contains("remote format unknown"));
    assert!(persisted.is_empty());
}

#[test]
fn result_violating_current_schema_is_invalid() {
    let schema = Arc::new(
        ResourceSchema::new()
            .with_version(1)
            .with_attribute("name", SchemaAttribute::required_string()),
    );
    let mut pipeline = MigrationPipeline::new();
    pipeline
        .register("r", schema, vec![migration(0, Ok)])
        .unwrap();

    let err = pipeline.upgrade("r", 0, &StateMap::new()).unwrap_err();
    assert!(matches!(err, MigrationError::InvalidResult { .. }));
}

#[test]
fn carried_through_key_survives_upgrade() {
    let schema = Arc::new(
        ResourceSchema::new()
            .with_version(1)
            .with_attribute("project", SchemaAttribute::required_string())
            .with_passthrough("timeouts"),
    );
    let mut pipeline = MigrationPipeline::new();
    pipeline
        .register(
            "r",
            schema,
            vec![migration(0, |mut s| {
                s.rename_key("project_id", "project");
                Ok(s)
            })],
        )
        .unwrap();

    let timeouts = StateValue::Map(state(&[("create", "10m".into()), ("delete", "5m".into())]));
    let persisted = state(&[("project_id", "7".into()), ("timeouts", timeouts.clone())]);

    let upgraded = pipeline.upgrade("r", 0, &persisted).unwrap();
    assert_eq!(
        upgraded,
        state(&[("project", "7".into()), ("timeouts", timeouts)])
    );
    assert!(persisted.contains_key("project_id"));

    let stray = state(&[("project_id", "7".into()), ("retries", 3i64.into())]);
    let err = pipeline.upgrade("r", 0, &stray).unwrap_err();
    assert!(matches!(err, MigrationError::InvalidResult { .. }));
}

#[test]
fn step_may_change_value_types() {
    let schema = Arc::new(
        ResourceSchema::new()
            .with_version(1)
            .with_attribute("port", SchemaAttribute::optional(AttributeType::Int)),
    );
    let mut pipeline = MigrationPipeline::new();
    pipeline
        .register(
            "r",
            schema,
            vec![migration(0, |mut s| {
                let port = s.take_str("port")?;
                let port: i64 = port
                    .parse()
                    .map_err(|_| StepError::other(format!("port {port:?} is not a number")))?;
                s.insert("port".into(), port.into());
                Ok(s)
            })],
        )
        .unwrap();

    let upgraded = pipeline
        .upgrade("r", 0, &state(&[("port", "8080".into())]))
        .unwrap();
    assert_eq!(upgraded.get_int("port").unwrap(), Some(8080));
}

// ── Registration ─────────────────────────────────────────────────

#[test]
fn gap_in_chain_is_rejected_at_registration() {
    let schema = Arc::new(ResourceSchema::new().with_version(3));
    let mut pipeline = MigrationPipeline::new();

    let err = pipeline
        .register("r", schema, vec![migration(0, Ok), migration(2, Ok)])
        .unwrap_err();

    assert_eq!(
        err,
        MigrationError::GapInChain {
            resource: "r".into(),
            missing: 1
        }
    );
    assert!(err.is_definition_error());
    assert!(!pipeline.contains("r"));
}

#[test]
fn duplicate_resource_is_rejected() {
    let mut pipeline = variable_pipeline();
    let err = pipeline
        .register("project_variable", variable_schema(), vec![project_moved_into_id()])
        .unwrap_err();
    assert!(matches!(err, MigrationError::DuplicateResource { .. }));
}

#[test]
fn introspection() {
    let pipeline = variable_pipeline();
    assert_eq!(pipeline.resources().collect::<Vec<_>>(), vec!["project_variable"]);
    assert_eq!(pipeline.current_version("project_variable"), Some(1));
    assert_eq!(
        pipeline.upgrader("project_variable").unwrap().registered_steps(),
        vec![(0, 1)]
    );
}

#[test]
fn pipeline_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MigrationPipeline>();
}
