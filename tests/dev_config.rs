// tests/dev_config.rs

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tempfile::NamedTempFile;

use airdev::api::{Config, Env, OfflineApiClient};
use airdev::config::model::{dev_config_id, dev_resource_id};
use airdev::config::{
    DevConfig, RawDevConfig, ServerSettings, is_valid_env_var_name, load_and_validate,
    load_or_default,
};
use airdev::errors::AirdevError;
use airdev::fs::RealFileSystem;
use airdev::fs::mock::MockFileSystem;
use airdev::state::ServerState;
use airdev_test_utils::RecordingExecutor;
use airdev_test_utils::builders::resource;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const SAMPLE: &str = r#"
[env_vars]
API_MODE = "sandbox"

[config_vars]
db_url = "postgres://localhost/dev"

[resources.my_db]
kind = "postgres"
host = "localhost"
port = 5432

[resources.billing_api]
kind = "rest"
id = "res_custom"
baseURL = "https://billing.example.com"
"#;

#[test]
fn loads_all_sections() -> TestResult {
    let mut file = NamedTempFile::new()?;
    write!(file, "{SAMPLE}")?;

    let config = load_and_validate(&RealFileSystem, file.path())?;

    assert_eq!(config.path.as_deref(), Some(file.path()));
    assert_eq!(config.env_vars["API_MODE"], "sandbox");

    let db_url = &config.config_vars["db_url"];
    assert_eq!(db_url.config.value, "postgres://localhost/dev");
    assert_eq!(db_url.config.id, dev_config_id("db_url"));
    assert!(!db_url.remote);

    let my_db = &config.resources["my_db"].resource;
    assert_eq!(my_db.id, dev_resource_id("my_db"));
    assert_eq!(my_db.kind, "postgres");
    assert_eq!(my_db.fields["host"], json!("localhost"));
    assert_eq!(my_db.fields["port"], json!(5432));

    let billing = &config.resources["billing_api"].resource;
    assert_eq!(billing.id, "res_custom");
    assert!(config.resource_by_id("res_custom").is_some());
    Ok(())
}

#[test]
fn missing_file_yields_empty_config_bound_to_path() -> TestResult {
    let fs = MockFileSystem::new();
    let config = load_or_default(&fs, "/proj/airplane.dev.toml")?;
    assert!(config.env_vars.is_empty());
    assert!(config.resources.is_empty());
    assert_eq!(config.path.as_deref(), Some(Path::new("/proj/airplane.dev.toml")));
    Ok(())
}

#[test]
fn invalid_toml_is_reported() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/airplane.dev.toml", "[env_vars\nbroken");

    match load_or_default(&fs, "/proj/airplane.dev.toml") {
        Err(AirdevError::TomlError(_)) => {}
        other => panic!("expected TomlError, got {other:?}"),
    }
}

#[test]
fn validation_rejects_bad_entries() {
    let cases = [
        ("[env_vars]\n\"1BAD\" = \"x\"\n", "not a valid environment variable name"),
        ("[config_vars]\n\" \" = \"x\"\n", "empty config name"),
        ("[resources.db]\nhost = \"x\"\n", "missing `kind`"),
        ("[resources.db]\nkind = \"postgres\"\nid = \"\"\n", "empty `id`"),
        (
            "[resources.a]\nkind = \"postgres\"\nid = \"same\"\n[resources.b]\nkind = \"mysql\"\nid = \"same\"\n",
            "reuses id",
        ),
    ];

    for (toml_text, expected) in cases {
        let raw: RawDevConfig = toml::from_str(toml_text).unwrap();
        match DevConfig::try_from(raw) {
            Err(AirdevError::ConfigError(msg)) => {
                assert!(msg.contains(expected), "{msg:?} should mention {expected:?}")
            }
            other => panic!("expected ConfigError for {toml_text:?}, got {other:?}"),
        }
    }
}

#[test]
fn env_var_names() {
    assert!(is_valid_env_var_name("API_KEY"));
    assert!(is_valid_env_var_name("_private"));
    assert!(is_valid_env_var_name("v2"));
    assert!(!is_valid_env_var_name(""));
    assert!(!is_valid_env_var_name("2FAST"));
    assert!(!is_valid_env_var_name("WITH-DASH"));
}

#[test]
fn save_writes_only_local_entries() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/airplane.dev.toml", SAMPLE);
    let mut config = load_or_default(&fs, "/proj/airplane.dev.toml")?;

    let prod = Env {
        id: "env_prod".into(),
        slug: "prod".into(),
        name: "Production".into(),
        default: false,
    };
    config.merge_remote_configs(
        [Config {
            id: "cfg_remote".into(),
            name: "remote_only".into(),
            value: "x".into(),
            ..Config::default()
        }],
        &prod,
    );
    config.set_env_var("NEW_VAR", "1");
    config.remove_config_var("db_url")?;
    config.save(&fs)?;

    let written = fs.contents("/proj/airplane.dev.toml").unwrap();
    assert!(written.contains("NEW_VAR"));
    assert!(!written.contains("db_url"));
    assert!(!written.contains("remote_only"));
    // Generated ids stay implicit, explicit ones are kept.
    assert!(!written.contains("res_dev_my_db"));
    assert!(written.contains("res_custom"));

    let reloaded = load_or_default(&fs, "/proj/airplane.dev.toml")?;
    assert_eq!(reloaded.env_vars["NEW_VAR"], "1");
    assert_eq!(reloaded.resources["my_db"].resource.fields["port"], json!(5432));
    assert_eq!(reloaded.resources["billing_api"].resource.id, "res_custom");
    Ok(())
}

#[test]
fn local_entries_win_over_remote_ones() {
    let mut config = DevConfig::default();
    config.set_config_var("shared", "local");
    config.merge_remote_configs(
        [Config {
            name: "shared".into(),
            value: "remote".into(),
            ..Config::default()
        }],
        &Env::studio(),
    );
    assert_eq!(config.config_vars["shared"].config.value, "local");
    assert!(!config.config_vars["shared"].remote);
}

#[test]
fn removing_unknown_entries_fails() {
    let mut config = DevConfig::default();
    assert!(matches!(config.remove_env_var("NOPE"), Err(AirdevError::ConfigError(_))));
    assert!(matches!(config.remove_config_var("nope"), Err(AirdevError::ConfigError(_))));
    assert!(matches!(config.remove_resource("nope"), Err(AirdevError::ConfigError(_))));
}

#[test]
fn save_without_path_is_an_error() {
    let fs = MockFileSystem::new();
    assert!(matches!(DevConfig::default().save(&fs), Err(AirdevError::ConfigError(_))));
}

#[test]
fn server_state_persists_dev_config_updates() -> TestResult {
    let fs = Arc::new(MockFileSystem::new());
    let config = load_or_default(fs.as_ref(), "/proj/airplane.dev.toml")?;
    let state = ServerState::new(
        Arc::new(OfflineApiClient),
        Arc::new(RecordingExecutor::succeeding(json!(null))),
        config,
        ServerSettings::default(),
    )
    .with_fs(fs.clone());

    state.update_dev_config(|config| {
        config.set_resource(resource("cache", "redis"));
        Ok(())
    })?;

    assert!(state.dev_config().resources.contains_key("cache"));
    let written = fs.contents("/proj/airplane.dev.toml").unwrap();
    assert!(written.contains("[resources.cache]"));

    // A failing update changes nothing.
    let result = state.update_dev_config(|config| config.remove_resource("missing"));
    assert!(result.is_err());
    assert!(state.dev_config().resources.contains_key("cache"));
    Ok(())
}
