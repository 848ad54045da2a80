// tests/cli.rs

mod common;
use crate::common::with_timeout;

use std::sync::Arc;

use clap::Parser;
use serde_json::{Value, json};

use airdev::cli::CliArgs;
use airdev::handlers::{self, ExecuteTaskRequest};
use airdev::state::RunStatus;
use airdev::types::TaskKind;
use airdev::{remote_client, task_from_args};
use airdev_test_utils::builders::{DevConfigBuilder, resource, server_state};
use airdev_test_utils::{MockApiClient, RecordingExecutor};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn args(argv: &[&str]) -> CliArgs {
    let mut full = vec!["airdev"];
    full.extend_from_slice(argv);
    CliArgs::try_parse_from(full).unwrap()
}

#[test]
fn sql_file_takes_its_resource_from_the_command_line() -> TestResult {
    let task = task_from_args(&args(&["queries/q.sql", "--resource", "db=warehouse"]))?;

    assert_eq!(task.kind, TaskKind::Sql);
    assert_eq!(task.slug, "q");
    assert_eq!(task.resources.len(), 1);
    assert_eq!(task.resources["db"], "warehouse");
    assert_eq!(task.kind_options["entrypoint"], json!("q.sql"));
    assert!(task.entrypoint.as_deref().is_some_and(|p| p.is_absolute()));
    Ok(())
}

#[test]
fn resource_without_alias_is_rejected() {
    let err = task_from_args(&args(&["q.sql", "--resource", "warehouse"])).unwrap_err();
    assert!(err.to_string().contains("expected KEY=VALUE"), "{err}");
}

#[test]
fn fallback_env_needs_a_remote_host() {
    let err = remote_client(&args(&["task.sh", "--env", "prod"])).unwrap_err();
    assert!(err.to_string().contains("--env prod requires --api-host"), "{err}");

    assert!(remote_client(&args(&["task.sh"])).is_ok());
    let online = args(&[
        "task.sh",
        "--api-host",
        "api.example.com",
        "--token",
        "t",
        "--env",
        "prod",
    ]);
    assert!(remote_client(&online).is_ok());
}

#[test]
fn api_key_needs_a_team() {
    let err = remote_client(&args(&["task.sh", "--api-host", "h", "--api-key", "k"])).unwrap_err();
    assert!(err.to_string().contains("--team-id"), "{err}");
}

#[tokio::test]
async fn sql_task_from_the_command_line_reaches_the_executor_with_its_resource() -> TestResult {
    let task = task_from_args(&args(&["q.sql", "--resource", "db=warehouse"]))?;
    let executor = Arc::new(RecordingExecutor::succeeding(Value::Null));
    let state = server_state(
        Arc::new(MockApiClient::new()),
        executor.clone(),
        DevConfigBuilder::new()
            .resource(resource("warehouse", "postgres"))
            .build(),
    );
    state.register_task(task);

    let run = with_timeout(handlers::execute_task(
        &state,
        ExecuteTaskRequest {
            slug: "q".into(),
            ..ExecuteTaskRequest::default()
        },
    ))
    .await?;
    assert_eq!(run.status, RunStatus::Succeeded);
    assert_eq!(run.resources["db"], resource("warehouse", "postgres").id);

    let configs = executor.configs();
    assert_eq!(configs[0].kind, TaskKind::Sql);
    assert_eq!(configs[0].alias_to_resource["db"].slug, "warehouse");
    Ok(())
}
