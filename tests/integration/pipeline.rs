//! End-to-end generate runs against a mock model server.

use super::test_utils::{config_for, env_lock, greeter_impl, Workspace, REPO_IMPL};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use weld::cli::{CommandRunner, Commands};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generate(force: bool, format: &str) -> Commands {
    Commands::Generate {
        force,
        model: None,
        provider: None,
        max_retries: None,
        files: Vec::new(),
        format: format.to_string(),
    }
}

fn reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "response": text, "done": true }))
}

/// Greeter is first answered without `farewell`, then correctly. Repo is correct at once.
async fn mount_model(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("TypeScript interface 'Greeter'"))
        .respond_with(reply(&greeter_impl(false)))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("TypeScript interface 'Greeter'"))
        .respond_with(reply(&greeter_impl(true)))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("abstract class 'Repo'"))
        .respond_with(reply(REPO_IMPL))
        .mount(server)
        .await;
}

fn outcome<'a>(report: &'a Value, name: &str) -> &'a Value {
    report["outcomes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["target_name"] == name)
        .unwrap_or_else(|| panic!("no outcome for {}", name))
}

#[tokio::test]
async fn generates_repairs_and_wires_services() {
    let _lock = env_lock();
    let server = MockServer::start().await;
    mount_model(&server).await;
    let ws = Workspace::new();
    let runner = CommandRunner::new(ws.root.clone(), config_for(&server.uri()));

    let output = runner.execute(&generate(false, "json")).await.unwrap();
    assert_eq!(output.exit_code, 0, "{}", output.text);

    let report: Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(report["generated"], 2);
    assert_eq!(report["errors"], 0);
    assert_eq!(outcome(&report, "Greeter")["status"], "generated");
    assert_eq!(outcome(&report, "Greeter")["attempts"], 2);
    assert_eq!(outcome(&report, "Repo")["attempts"], 1);

    let greeter = ws.read("src/generated/GreeterImpl.ts");
    assert!(greeter.contains("import { Greeter } from '../greeter';"));
    assert!(greeter.contains("export class GreeterImpl implements Greeter"));
    assert!(greeter.contains("farewell(name: string)"));
    assert!(!greeter.contains("```"));

    let repo = ws.read("src/generated/RepoImpl.ts");
    assert!(repo.contains("import { Repo } from '../repo';"));
    assert!(repo.contains("export class RepoImpl extends Repo"));

    let registry = ws.read("src/generated/container.ts");
    assert!(registry.contains("import { GreeterImpl } from './GreeterImpl';"));
    assert!(registry.contains("import { RepoImpl } from './RepoImpl';"));
    assert!(registry.contains("  greeter: GreeterImpl;"));
    assert!(registry.contains("  repo: RepoImpl;"));
    assert!(registry.find("greeter").unwrap() < registry.find("repo").unwrap());
    assert_eq!(
        report["registry"].as_str().map(PathBuf::from),
        Some(ws.path("src/generated/container.ts"))
    );
}

#[tokio::test]
async fn second_run_skips_existing_implementations() {
    let _lock = env_lock();
    let server = MockServer::start().await;
    mount_model(&server).await;
    let ws = Workspace::new();
    let runner = CommandRunner::new(ws.root.clone(), config_for(&server.uri()));

    runner.execute(&generate(false, "json")).await.unwrap();
    let requests_after_first = server.received_requests().await.unwrap().len();

    let output = runner.execute(&generate(false, "text")).await.unwrap();
    assert_eq!(output.exit_code, 0);
    assert!(output.text.contains("0 generated, 2 skipped, 0 locked, 0 failed"));
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_first
    );
    // Both services are still wired from the files on disk
    let registry = ws.read("src/generated/container.ts");
    assert!(registry.contains("  greeter: GreeterImpl;"));
    assert!(registry.contains("  repo: RepoImpl;"));
}

#[tokio::test]
async fn locked_files_survive_forced_regeneration() {
    let _lock = env_lock();
    let server = MockServer::start().await;
    mount_model(&server).await;
    let ws = Workspace::new();
    let runner = CommandRunner::new(ws.root.clone(), config_for(&server.uri()));
    runner.execute(&generate(false, "json")).await.unwrap();

    let greeter_path = ws.path("src/generated/GreeterImpl.ts");
    let hand_edited = "import { Greeter } from '../greeter';\n\nexport class GreeterImpl implements Greeter {\n  greet(name: string): string { return 'hand ' + name; }\n  farewell(name: string): string { return 'bye ' + name; }\n}\n";
    std::fs::write(&greeter_path, hand_edited).unwrap();

    let locked = runner
        .execute(&Commands::Lock {
            paths: vec![greeter_path.clone()],
        })
        .await
        .unwrap();
    assert!(locked.text.contains("Locked 1"), "{}", locked.text);
    assert!(ws.exists(".weld/locks.json"));

    let listing = runner.execute(&Commands::Locks).await.unwrap();
    assert!(listing.text.contains("GreeterImpl.ts"));

    let output = runner.execute(&generate(true, "json")).await.unwrap();
    let report: Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(outcome(&report, "Greeter")["status"], "locked");
    assert_eq!(outcome(&report, "Repo")["status"], "generated");
    assert_eq!(std::fs::read_to_string(&greeter_path).unwrap(), hand_edited);
    assert!(ws.read("src/generated/container.ts").contains("  greeter: GreeterImpl;"));

    let unlocked = runner
        .execute(&Commands::Unlock {
            paths: vec![greeter_path],
        })
        .await
        .unwrap();
    assert!(unlocked.text.contains("Unlocked 1"), "{}", unlocked.text);
    let listing = runner.execute(&Commands::Locks).await.unwrap();
    assert!(listing.text.contains("No locked files."));
}

#[tokio::test]
async fn provider_failure_reports_errors_without_writing() {
    let _lock = env_lock();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;
    let ws = Workspace::new();
    let runner = CommandRunner::new(ws.root.clone(), config_for(&server.uri()));

    let output = runner.execute(&generate(false, "json")).await.unwrap();
    assert_eq!(output.exit_code, 1);
    let report: Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(report["errors"], 2);
    assert!(outcome(&report, "Greeter")["error"]
        .as_str()
        .unwrap()
        .contains("status 500"));
    assert!(!ws.exists("src/generated/GreeterImpl.ts"));
    assert!(!ws.exists("src/generated/RepoImpl.ts"));
}

#[tokio::test]
async fn unknown_provider_is_a_configuration_error() {
    let _lock = env_lock();
    let ws = Workspace::new();
    let runner = CommandRunner::new(ws.root.clone(), config_for("http://127.0.0.1:9"));
    let err = runner
        .execute(&Commands::Generate {
            force: false,
            model: None,
            provider: Some("missing".to_string()),
            max_retries: None,
            files: Vec::new(),
            format: "text".to_string(),
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn misnamed_class_is_repaired_before_writing() {
    let _lock = env_lock();
    let server = MockServer::start().await;
    let misnamed = greeter_impl(true).replace("GreeterImpl", "FriendlyGreeter");
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("TypeScript interface 'Greeter'"))
        .respond_with(reply(&misnamed))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("TypeScript interface 'Greeter'"))
        .respond_with(reply(&greeter_impl(true)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_string_contains("abstract class 'Repo'"))
        .respond_with(reply(REPO_IMPL))
        .mount(&server)
        .await;
    let ws = Workspace::new();
    let runner = CommandRunner::new(ws.root.clone(), config_for(&server.uri()));

    let output = runner.execute(&generate(false, "json")).await.unwrap();
    assert_eq!(output.exit_code, 0, "{}", output.text);
    let report: Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(outcome(&report, "Greeter")["status"], "generated");
    assert_eq!(outcome(&report, "Greeter")["attempts"], 2);

    let greeter = ws.read("src/generated/GreeterImpl.ts");
    assert!(greeter.contains("export class GreeterImpl implements Greeter"));
    assert!(!greeter.contains("FriendlyGreeter"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .any(|r| String::from_utf8_lossy(&r.body).contains("Cannot find class 'GreeterImpl'")));
}

#[tokio::test]
async fn provider_timeout_setting_bounds_each_request() {
    let _lock = env_lock();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(reply(&greeter_impl(true)).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    let ws = Workspace::new();
    let mut config = config_for(&server.uri());
    if let Some(provider) = config.providers.get_mut("default") {
        provider.settings.timeout_secs = Some(1);
    }
    assert_eq!(config.generation.timeout_secs, 120);
    let runner = CommandRunner::new(ws.root.clone(), config);

    let started = Instant::now();
    let output = runner.execute(&generate(false, "json")).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(2900));
    assert_eq!(output.exit_code, 1);
    let report: Value = serde_json::from_str(&output.text).unwrap();
    for name in ["Greeter", "Repo"] {
        let outcome = outcome(&report, name);
        assert_eq!(outcome["status"], "error");
        assert!(outcome["error"].as_str().unwrap().contains("timed out"), "{}", outcome);
    }
    assert!(!ws.exists("src/generated/GreeterImpl.ts"));
}
