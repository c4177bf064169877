//! Layered configuration driving a real workspace.

use super::test_utils::{env_lock, EnvGuard, Workspace};
use std::path::PathBuf;
use weld::config::{ConfigLoader, WeldConfig};
use weld::context::RunContext;
use weld::error::WeldError;

#[test]
fn workspace_file_changes_marker_and_output_dir() {
    let _lock = env_lock();
    let ws = Workspace::new();
    ws.write(
        "src/jobs.ts",
        "import { Clock } from './clock';\n\nexport class Jobs {\n  @Provide clock: Clock;\n}\n",
    );
    ws.write("src/clock.ts", "export interface Clock {\n  now(): Date;\n}\n");
    ws.write(
        "weld.toml",
        "[generation]\nmarker = \"Provide\"\nout_dir = \"src/services\"\nregistry_file = \"registry.ts\"\n",
    );
    let home = ws.path("home");
    let _env = EnvGuard::set(&[
        ("HOME", Some(home.to_str().unwrap())),
        ("XDG_CONFIG_HOME", None),
        ("WELD_ENV", None),
    ]);

    let config = ConfigLoader::load_validated(&ws.root, None).unwrap();
    let ctx = RunContext::open(&ws.root, config).unwrap();
    let report = ctx
        .project
        .discover_targets(&ctx.config.generation.marker, None);
    let names: Vec<&str> = report.targets.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Clock"]);
    assert_eq!(ctx.registry_path(), ws.path("src/services/registry.ts"));
    assert_eq!(
        ctx.output_path(&report.targets[0]),
        ws.path("src/services/ClockImpl.ts")
    );
}

#[test]
fn environment_overrides_workspace_file() {
    let _lock = env_lock();
    let ws = Workspace::new();
    ws.write("weld.toml", "[generation]\nmax_retries = 2\ntimeout_secs = 30\n");
    let home = ws.path("home");
    let _env = EnvGuard::set(&[
        ("HOME", Some(home.to_str().unwrap())),
        ("XDG_CONFIG_HOME", None),
        ("WELD_ENV", None),
        ("WELD__GENERATION__MAX_RETRIES", Some("7")),
    ]);

    let config = ConfigLoader::load(&ws.root).unwrap();
    assert_eq!(config.generation.max_retries, 7);
    assert_eq!(config.generation.timeout_secs, 30);
}

#[test]
fn excluded_directories_are_not_scanned() {
    let _lock = env_lock();
    let ws = Workspace::new();
    ws.write(
        "src/legacy/old.ts",
        "export class Old {\n  @Inject clock: Clock;\n}\n\nexport interface Clock {\n  now(): Date;\n}\n",
    );
    let mut config = WeldConfig::default();
    config.generation.exclude = vec![PathBuf::from("src/legacy")];

    let ctx = RunContext::open(&ws.root, config).unwrap();
    let report = ctx.project.discover_targets("Inject", None);
    let names: Vec<&str> = report.targets.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Greeter", "Repo"]);
}

#[test]
fn invalid_values_fail_validation() {
    let _lock = env_lock();
    let ws = Workspace::new();
    ws.write(
        "weld.toml",
        "[generation]\nprovider = \"nowhere\"\n\n[logging]\nlevel = \"loud\"\n",
    );
    let home = ws.path("home");
    let _env = EnvGuard::set(&[
        ("HOME", Some(home.to_str().unwrap())),
        ("XDG_CONFIG_HOME", None),
        ("WELD_ENV", None),
    ]);

    let err = ConfigLoader::load_validated(&ws.root, None).unwrap_err();
    assert!(matches!(err, WeldError::Config(_)));
    let message = err.to_string();
    assert!(message.contains("nowhere"), "{}", message);
    assert!(message.contains("loud"), "{}", message);
}
