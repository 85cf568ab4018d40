//! Integration tests that lock the binary's command surface and exit codes.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

fn temp_root(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after epoch")
        .as_nanos();
    env::temp_dir().join(format!("iskra-bin-{label}-{nanos}"))
}

fn iskra(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_iskra"))
        .args(args)
        .arg("--memory")
        .arg(root)
        .env("ISKRA_CONFIG_DIR", root.join("config"))
        .env_remove("ISKRA_MEMORY_DIR")
        .output()
        .expect("run iskra")
}

fn json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn add_archive_then_search_by_tag() {
    let root = temp_root("search");
    let added = json(&iskra(
        &root,
        &[
            "add-archive",
            "--title",
            "Ship it",
            "--type",
            "decision",
            "--content",
            "ping me at someone@example.com",
            "--tag",
            "release",
            "--confidence",
            "0.9",
        ],
    ));
    assert_eq!(added["id"], 1);
    assert_eq!(added["content"], "ping me at <EMAIL>");

    let hits = json(&iskra(&root, &["search", "--tag", "release"]));
    assert_eq!(hits.as_array().map(Vec::len), Some(1));
    assert_eq!(hits[0]["title"], "Ship it");

    let none = json(&iskra(&root, &["search", "--tag", "missing"]));
    assert_eq!(none.as_array().map(Vec::len), Some(0));
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn invalid_confidence_exits_non_zero_and_writes_nothing() {
    let root = temp_root("invalid");
    let output = iskra(
        &root,
        &[
            "add-shadow",
            "--signal",
            "s",
            "--hypothesis",
            "h",
            "--confidence",
            "1.5",
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("confidence"), "stderr: {stderr}");

    let stats = json(&iskra(&root, &["stats"]));
    assert_eq!(stats["shadow"], 0);
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn facets_order_follows_priority_table() {
    let root = temp_root("facets");
    let selection = json(&iskra(&root, &["facets", r#"{"pain": 0.9, "trust": 0.9, "clarity": 0.9}"#]));
    assert_eq!(selection["facets"], serde_json::json!(["Kain"]));
    assert_eq!(selection["primary"], "Kain");

    let calm = json(&iskra(&root, &["facets", r#"{"trust": 0.9, "clarity": 0.9}"#]));
    assert_eq!(calm["facets"], serde_json::json!([]));
    assert_eq!(calm["primary"], "Iskra");
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn phase_steps_through_guards() {
    let root = temp_root("phase");
    let run = json(&iskra(
        &root,
        &[
            "phase",
            r#"{"chaos": 0.7}"#,
            r#"{"clarity": 0.8}"#,
            r#"{"silence_mass": 0.7}"#,
        ],
    ));
    assert_eq!(
        run["phases"],
        serde_json::json!(["Transition", "Clarity", "Silence"])
    );
    assert_eq!(run["current"], "Silence");
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn phase_start_overrides_the_initial_phase() {
    let root = temp_root("phase-start");
    let run = json(&iskra(&root, &["phase", "--start", "Darkness", "{}"]));
    assert_eq!(run["phases"], serde_json::json!(["Darkness"]));

    let unknown = iskra(&root, &["phase", "--start", "Dawn", "{}"]);
    assert!(!unknown.status.success());
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn persona_run_writes_prometheus_exposition() {
    let root = temp_root("persona");
    fs::create_dir_all(&root).expect("create root");
    let transcript = root.join("transcript.txt");
    fs::write(&transcript, "first line\n\nsecond line\n").expect("write transcript");
    let exposition = root.join("persona.prom");

    let run = json(&iskra(
        &root,
        &[
            "persona",
            "--file",
            transcript.to_str().expect("utf-8 path"),
            "--metrics-out",
            exposition.to_str().expect("utf-8 path"),
        ],
    ));
    assert_eq!(run["steps"].as_array().map(Vec::len), Some(2));
    assert_eq!(run["steps"][1]["line"], 3);
    assert_eq!(run["telemetry"]["activations"], 2);

    let text = fs::read_to_string(&exposition).expect("read exposition");
    assert!(text.contains("iskra_activation_latency_seconds_count 2"), "{text}");
    assert!(text.contains("iskra_facet_switch_total{facet="), "{text}");
    assert!(text.contains("iskra_phase_switch_total{phase="), "{text}");
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn strict_validate_fails_on_corrupt_lines() {
    let root = temp_root("validate");
    json(&iskra(
        &root,
        &["add-shadow", "--signal", "s", "--hypothesis", "h"],
    ));
    let shadow = root.join("SHADOW").join("main_shadow.jsonl");
    let mut body = fs::read_to_string(&shadow).expect("read shadow log");
    body.push_str("{not json\n");
    fs::write(&shadow, body).expect("corrupt shadow log");

    let lenient = iskra(&root, &["validate"]);
    let report = json(&lenient);
    assert_eq!(report["ok"], false);
    assert_eq!(report["problems"][0]["line"], 2);

    let strict = iskra(&root, &["validate", "--strict"]);
    assert!(!strict.status.success());
    let _ = fs::remove_dir_all(&root);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let root = temp_root("config");
    let output = iskra(&root, &["--config", "/nonexistent/iskra.toml", "stats"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {stderr}");
    let _ = fs::remove_dir_all(&root);
}
