//! Integration tests for the tool-call surface via CLI.
//!
//! These tests verify that:
//! - `qd tool manifest` declares the eight reserved tools
//! - `qd tool call` acknowledges every call, including malformed and unknown
//!   ones, without creating spurious drafts
//! - control verbs resolve the pending set in bulk

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the qd binary, pointed at a temp data directory.
fn qd_in(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_qd"));
    cmd.args(["--data-dir", dir.path().to_str().unwrap()]);
    cmd
}

/// Initialize quarterdeck in a temp directory and return the temp dir.
fn init_quarterdeck() -> TempDir {
    let temp = TempDir::new().unwrap();
    qd_in(&temp).args(["system", "init"]).assert().success();
    temp
}

/// Parse the JSON result of a qd invocation.
fn json_result(output: assert_cmd::assert::Assert) -> serde_json::Value {
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    serde_json::from_str(&stdout).unwrap()
}

// === Manifest Tests ===

#[test]
fn test_manifest_declares_eight_tools() {
    let temp = TempDir::new().unwrap();

    let result = json_result(qd_in(&temp).args(["tool", "manifest"]).assert().success());
    let tools = result["tools"].as_array().unwrap();

    assert_eq!(tools.len(), 8);
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert!(names.contains(&"update_project_status"));
    assert!(names.contains(&"add_milestone"));
    assert!(names.contains(&"accept_draft_changes"));
    assert!(names.contains(&"reject_draft_changes"));
    assert!(tools.iter().all(|t| t["type"] == "function"));
}

#[test]
fn test_manifest_schema_marks_required_fields() {
    let temp = TempDir::new().unwrap();

    let result = json_result(qd_in(&temp).args(["tool", "manifest"]).assert().success());
    let milestone = result["tools"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "add_milestone")
        .unwrap();

    let required = milestone["parameters"]["required"].as_array().unwrap();
    assert_eq!(required.len(), 3);
    assert!(required.iter().any(|r| r == "timeline"));
}

// === Call Tests ===

#[test]
fn test_tool_call_creates_draft_and_acks() {
    let temp = init_quarterdeck();

    let result = json_result(
        qd_in(&temp)
            .args([
                "tool",
                "call",
                "update_project_status",
                "--args",
                r#"{"status": "Blocked"}"#,
                "--call-id",
                "call-7",
            ])
            .assert()
            .success(),
    );

    assert_eq!(result["action"], "draft_created");
    assert!(result["draft_id"].is_string());
    assert_eq!(result["ack"]["type"], "conversation.item.create");
    assert_eq!(result["ack"]["item"]["type"], "function_call_output");
    assert_eq!(result["ack"]["item"]["call_id"], "call-7");
}

#[test]
fn test_tool_call_malformed_args_acks_without_draft() {
    let temp = init_quarterdeck();

    let result = json_result(
        qd_in(&temp)
            .args([
                "tool",
                "call",
                "update_project_status",
                "--args",
                "{not json",
                "--call-id",
                "call-8",
            ])
            .assert()
            .success(),
    );

    assert_eq!(result["action"], "ignored");
    assert!(result["draft_id"].is_null());
    assert_eq!(result["ack"]["item"]["call_id"], "call-8");

    qd_in(&temp)
        .args(["draft", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"drafts\":[]"));
}

#[test]
fn test_tool_call_unknown_name_acks_without_draft() {
    let temp = init_quarterdeck();

    let result = json_result(
        qd_in(&temp)
            .args(["tool", "call", "delete_everything"])
            .assert()
            .success(),
    );

    assert_eq!(result["action"], "ignored");
    // The failure is reported inside the function_call_output payload
    let output = result["ack"]["item"]["output"].as_str().unwrap();
    assert!(output.contains("\"success\":false"));
}

#[test]
fn test_tool_call_missing_required_arg_is_ignored() {
    let temp = init_quarterdeck();

    // Well-formed JSON, wrong shape: date is required
    let result = json_result(
        qd_in(&temp)
            .args([
                "tool",
                "call",
                "add_milestone",
                "--args",
                r#"{"title": "Integration test", "timeline": "algorithm"}"#,
            ])
            .assert()
            .success(),
    );

    assert_eq!(result["action"], "ignored");
}

// === Control Verb Tests ===

#[test]
fn test_accept_verb_commits_and_acks() {
    let temp = init_quarterdeck();

    qd_in(&temp)
        .args([
            "tool",
            "call",
            "update_project_status",
            "--args",
            r#"{"status": "Blocked"}"#,
        ])
        .assert()
        .success();

    let result = json_result(
        qd_in(&temp)
            .args(["tool", "call", "accept_draft_changes"])
            .assert()
            .success(),
    );

    assert_eq!(result["action"], "accepted_all");
    let output = result["ack"]["item"]["output"].as_str().unwrap();
    assert!(output.contains("All draft changes have been accepted"));

    qd_in(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("Blocked"))
        .stdout(predicate::str::contains("\"pending_drafts\":0"));
}

#[test]
fn test_reject_verb_discards_and_acks() {
    let temp = init_quarterdeck();

    qd_in(&temp)
        .args([
            "tool",
            "call",
            "update_project_status",
            "--args",
            r#"{"status": "Blocked"}"#,
        ])
        .assert()
        .success();

    let result = json_result(
        qd_in(&temp)
            .args(["tool", "call", "reject_draft_changes"])
            .assert()
            .success(),
    );

    assert_eq!(result["action"], "rejected_all");

    qd_in(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("In Progress"))
        .stdout(predicate::str::contains("\"pending_drafts\":0"));
}

// === Error Path ===

#[test]
fn test_tool_call_without_init_fails() {
    let temp = TempDir::new().unwrap();

    qd_in(&temp)
        .args(["tool", "call", "update_project_status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not initialized"));
}
