//! Configuration layering and CLI run context wiring

use crate::integration::test_utils::with_xdg_config_home;
use docgen::cli::{ArtifactsCommands, Commands, RequestCommands, RunContext};
use docgen::config::{ConfigLoader, WORKSPACE_CONFIG_FILE};
use docgen::error::ApiError;
use std::time::Duration;
use tempfile::TempDir;

const WORKSPACE_TOML: &str = r#"
[generation]
item_timeout_secs = 0
max_retry_attempts = 2
strict_templates = true

[storage]
store_path = "data/store"

[templates.toolbox_talk]
title = "Toolbox Talk"
instructions = "Write a short safety briefing for site workers."
"#;

#[test]
fn workspace_file_drives_orchestrator_and_catalog() {
    let xdg = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    std::fs::write(workspace.path().join(WORKSPACE_CONFIG_FILE), WORKSPACE_TOML).unwrap();

    let config = with_xdg_config_home(&xdg, || ConfigLoader::load(workspace.path())).unwrap();
    assert!(config.validate().is_ok());

    let settings = config.generation.orchestrator_settings();
    assert_eq!(settings.item_timeout, None);
    assert_eq!(settings.max_retry_attempts, 2);
    assert_eq!(settings.retry_delay, Duration::from_millis(1000));

    let catalog = config.template_catalog();
    assert_eq!(catalog.resolve("toolbox_talk").unwrap().title, "Toolbox Talk");
    assert!(catalog.resolve("risk_assessment").is_ok());
    assert!(catalog.resolve("unheard_of").is_err());
}

#[test]
fn user_file_applies_when_workspace_is_silent() {
    let xdg = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    std::fs::create_dir_all(xdg.path().join("docgen")).unwrap();
    std::fs::write(
        xdg.path().join("docgen").join("config.toml"),
        "[generation]\nchannel_capacity = 8\n",
    )
    .unwrap();

    let config = with_xdg_config_home(&xdg, || ConfigLoader::load(workspace.path())).unwrap();
    assert_eq!(config.generation.channel_capacity, 8);
    assert_eq!(config.generation.item_timeout_secs, 120);
}

#[test]
fn invalid_configuration_is_rejected_before_opening_the_store() {
    let xdg = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    std::fs::write(
        workspace.path().join(WORKSPACE_CONFIG_FILE),
        "[generation]\nchannel_capacity = 0\n\n[logging]\nformat = \"xml\"\n",
    )
    .unwrap();

    let result = with_xdg_config_home(&xdg, || {
        RunContext::new(workspace.path().to_path_buf(), None, None)
    });
    match result {
        Err(ApiError::ConfigError(message)) => {
            assert!(message.contains("channel_capacity"));
            assert!(message.contains("xml"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("invalid configuration was accepted"),
    }
    assert!(!workspace.path().join(".docgen").exists());
}

#[tokio::test]
async fn run_context_opens_store_under_workspace() {
    let xdg = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    std::fs::write(workspace.path().join(WORKSPACE_CONFIG_FILE), WORKSPACE_TOML).unwrap();

    let ctx = with_xdg_config_home(&xdg, || {
        RunContext::new(workspace.path().to_path_buf(), None, None)
    })
    .unwrap();
    assert_eq!(ctx.store_path(), workspace.path().join("data/store").as_path());
    assert!(ctx.generation_service().is_ok());

    let listing = ctx
        .execute(&Commands::Request {
            command: RequestCommands::List {
                owner: "org-1".to_string(),
                format: "text".to_string(),
            },
        })
        .await
        .unwrap();
    assert!(listing.contains("No requests found for 'org-1'"));

    let missing = ctx
        .execute(&Commands::Artifacts {
            command: ArtifactsCommands::List {
                request_id: "req-unknown".to_string(),
                format: "json".to_string(),
            },
        })
        .await;
    assert!(matches!(missing, Err(ApiError::RequestNotFound(_))));
}
