// tests/runtimes_and_builtins.rs

use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

use airdev::builtins::{
    BuiltinClient, FunctionSpecification, StdApiRequest, builtin_request,
    builtin_request_for_task, function_specification, is_builtin_slug,
};
use airdev::errors::AirdevError;
use airdev::fs::mock::MockFileSystem;
use airdev::runtime::{PrepareRunOptions, lookup};
use airdev::types::{TaskKind, Values};
use airdev_test_utils::builders::TaskConfigBuilder;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn values(v: Value) -> Values {
    match v {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn argv(path: &str, kind: TaskKind, params: Value, kind_options: Value) -> Vec<String> {
    let runtime = lookup(Some(Path::new(path)), kind).unwrap();
    runtime
        .prepare_run(&PrepareRunOptions {
            entrypoint: Path::new(path),
            param_values: &values(params),
            kind_options: &values(kind_options),
        })
        .unwrap()
}

#[test]
fn lookup_prefers_extension_over_kind() {
    for (path, kind, expected) in [
        ("/p/task.sh", TaskKind::Python, TaskKind::Shell),
        ("/p/task.py", TaskKind::Shell, TaskKind::Python),
        ("/p/task.ts", TaskKind::Shell, TaskKind::Node),
        ("/p/task.mjs", TaskKind::Shell, TaskKind::Node),
        ("/p/Dockerfile", TaskKind::Image, TaskKind::Image),
        ("/p/script", TaskKind::Shell, TaskKind::Shell),
    ] {
        let runtime = lookup(Some(Path::new(path)), kind).unwrap();
        assert_eq!(runtime.kind(), expected, "{path}");
    }
}

#[test]
fn kinds_without_a_runtime_are_unsupported() {
    for kind in [TaskKind::Sql, TaskKind::Rest, TaskKind::Builtin] {
        match lookup(Some(Path::new("/p/query.sql")), kind) {
            Err(AirdevError::UnsupportedFileType(name)) => assert_eq!(name, "query.sql"),
            other => panic!("expected UnsupportedFileType for {kind}, got {other:?}"),
        }
    }
    assert!(matches!(
        lookup(None, TaskKind::Rest),
        Err(AirdevError::UnsupportedFileType(name)) if name == "rest"
    ));
}

#[test]
fn image_runtime_cannot_run_locally() {
    let runtime = lookup(None, TaskKind::Image).unwrap();
    assert!(!runtime.supports_local_execution());
    assert!(lookup(None, TaskKind::Shell).unwrap().supports_local_execution());
}

#[test]
fn shell_passes_params_as_assignments() {
    let cmd = argv(
        "/p/task.sh",
        TaskKind::Shell,
        json!({"name": "Ada", "count": 3, "none": null}),
        json!({}),
    );
    assert_eq!(cmd, ["bash", "/p/task.sh", "name=Ada", "count=3", "none="]);

    let zsh = argv("/p/task.sh", TaskKind::Shell, json!({}), json!({"shell": "zsh"}));
    assert_eq!(zsh, ["zsh", "/p/task.sh"]);
}

#[test]
fn python_and_node_pass_params_as_json() {
    let py = argv("/p/task.py", TaskKind::Python, json!({"x": 1}), json!({}));
    assert_eq!(py, ["python3", "/p/task.py", r#"{"x":1}"#]);

    let js = argv("/p/task.js", TaskKind::Node, json!({"x": 1}), json!({}));
    assert_eq!(js, ["node", "/p/task.js", r#"{"x":1}"#]);

    let ts = argv("/p/task.ts", TaskKind::Node, json!({}), json!({}));
    assert_eq!(ts, ["npx", "tsx", "/p/task.ts", "{}"]);
}

#[test]
fn roots_follow_project_markers() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/requirements.txt", "requests\n");
    fs.add_file("/proj/web/package.json", "{}");

    let python = lookup(Some(Path::new("/proj/a/b/task.py")), TaskKind::Python)?;
    assert_eq!(python.root(&fs, Path::new("/proj/a/b/task.py"))?, PathBuf::from("/proj"));

    let node = lookup(Some(Path::new("/proj/web/src/task.ts")), TaskKind::Node)?;
    assert_eq!(node.root(&fs, Path::new("/proj/web/src/task.ts"))?, PathBuf::from("/proj/web"));

    // No marker: the entrypoint's own directory.
    assert_eq!(node.root(&fs, Path::new("/other/task.js"))?, PathBuf::from("/other"));

    let shell = lookup(Some(Path::new("/proj/a/task.sh")), TaskKind::Shell)?;
    assert_eq!(shell.root(&fs, Path::new("/proj/a/task.sh"))?, PathBuf::from("/proj/a"));
    Ok(())
}

#[test]
fn builtin_slug_grammar() -> TestResult {
    let spec = function_specification("airplane:sql_query")?;
    assert_eq!(
        spec,
        FunctionSpecification {
            namespace: "sql".into(),
            name: "query".into(),
        }
    );
    assert_eq!(spec.slug(), "airplane:sql_query");

    assert!(is_builtin_slug("airplane:rest_request"));
    for slug in [
        "my_task",
        "airplane:sql",
        "airplane:_query",
        "airplane:sql_",
        "airplane:sql_query_extra",
        "other:sql_query",
        "airplane:sql:query",
    ] {
        assert!(!is_builtin_slug(slug), "{slug}");
    }

    match function_specification("airplane:nope") {
        Err(AirdevError::NotFound(what)) => assert_eq!(what, "builtin task airplane:nope"),
        other => panic!("expected NotFound, got {other:?}"),
    }
    Ok(())
}

#[test]
fn builtin_requests_carry_params() -> TestResult {
    let req = builtin_request("airplane:rest_request", &values(json!({"method": "GET"})))?;
    assert_eq!(req.namespace, "rest");
    assert_eq!(req.name, "request");
    assert_eq!(req.request["method"], "GET");
    assert_eq!(req.slug(), "airplane:rest_request");
    Ok(())
}

#[test]
fn sql_tasks_read_their_query_file() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/queries/list.sql", "SELECT * FROM users WHERE id = :id");
    let task = TaskConfigBuilder::new("list_users")
        .kind(TaskKind::Sql)
        .entrypoint("/proj/queries/list_users.task.yaml")
        .kind_option("entrypoint", "list.sql")
        .kind_option("transactionMode", "auto")
        .build();

    let req = builtin_request_for_task(&fs, &task, &values(json!({"id": 7})))?.unwrap();
    assert_eq!(req.slug(), "airplane:sql_query");
    assert_eq!(req.request["query"], "SELECT * FROM users WHERE id = :id");
    assert_eq!(req.request["queryArgs"], json!({"id": 7}));
    assert_eq!(req.request["transactionMode"], "auto");
    assert!(req.request.get("entrypoint").is_none());
    Ok(())
}

#[test]
fn sql_task_without_query_file_is_a_config_error() {
    let fs = MockFileSystem::new();
    let task = TaskConfigBuilder::new("q").kind(TaskKind::Sql).build();
    assert!(matches!(
        builtin_request_for_task(&fs, &task, &Map::new()),
        Err(AirdevError::ConfigError(_))
    ));
}

#[test]
fn rest_and_builtin_kinds_map_to_requests() -> TestResult {
    let fs = MockFileSystem::new();

    let rest = TaskConfigBuilder::new("ping")
        .kind(TaskKind::Rest)
        .kind_option("method", "GET")
        .kind_option("path", "/health")
        .build();
    let req = builtin_request_for_task(&fs, &rest, &Map::new())?.unwrap();
    assert_eq!(req.slug(), "airplane:rest_request");
    assert_eq!(req.request["path"], "/health");

    let builtin = TaskConfigBuilder::new("send")
        .kind(TaskKind::Builtin)
        .kind_option("functionSpecification", json!({"namespace": "email", "name": "message"}))
        .build();
    let req = builtin_request_for_task(&fs, &builtin, &values(json!({"to": "a@b.c"})))?.unwrap();
    assert_eq!(req.slug(), "airplane:email_message");
    assert_eq!(req.request["to"], "a@b.c");

    let shell = TaskConfigBuilder::new("sh").kind(TaskKind::Shell).build();
    assert!(builtin_request_for_task(&fs, &shell, &Map::new())?.is_none());
    Ok(())
}

#[test]
fn builtin_client_requires_an_existing_binary() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/opt/builtins", "");

    let client = BuiltinClient::locate(&fs, Some(Path::new("/opt/builtins")))?;
    assert_eq!(client.binary_path(), Path::new("/opt/builtins"));

    let req = StdApiRequest::new(
        FunctionSpecification {
            namespace: "sql".into(),
            name: "query".into(),
        },
        values(json!({"query": "SELECT 1"})),
    );
    let cmd = client.command(&req)?;
    assert_eq!(cmd[0], "/opt/builtins");
    let sent: Value = serde_json::from_str(&cmd[1])?;
    assert_eq!(sent, json!({"namespace": "sql", "name": "query", "request": {"query": "SELECT 1"}}));

    assert!(matches!(
        BuiltinClient::locate(&fs, Some(Path::new("/missing"))),
        Err(AirdevError::ResolutionError(_))
    ));
    Ok(())
}

#[test]
fn task_kinds_parse_and_display() {
    assert_eq!("python".parse::<TaskKind>(), Ok(TaskKind::Python));
    assert_eq!("Docker".parse::<TaskKind>(), Ok(TaskKind::Image));
    assert!("cobol".parse::<TaskKind>().is_err());
    assert_eq!(TaskKind::Node.to_string(), "node");
    assert_eq!(serde_json::to_value(TaskKind::Sql).unwrap(), json!("sql"));
}
