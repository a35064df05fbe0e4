//! Action logging for Quarterdeck commands.
//!
//! Appends one JSONL row per command invocation (name, sanitized args,
//! outcome, duration) to `action.log` in the data directory. Logging never
//! fails a command: any error here is downgraded to a warning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Disable logging entirely when set to a non-empty value.
const DISABLE_ENV: &str = "QD_NO_ACTION_LOG";

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Command name (e.g., "draft accept", "tool call")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Log an action to `action.log` in the data directory.
///
/// This function never fails - it silently falls back on errors to avoid
/// breaking commands due to logging issues.
pub fn log_action(
    data_dir: &Path,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    if std::env::var(DISABLE_ENV).is_ok_and(|v| !v.is_empty()) {
        return;
    }

    let entry = ActionLog {
        timestamp: Utc::now(),
        command: command.to_string(),
        args: sanitize_args(&args),
        success,
        error,
        duration_ms,
        user: current_user(),
    };

    if let Err(e) = write_log_entry(data_dir, &entry) {
        tracing::warn!(error = %e, "failed to write action log");
    }
}

/// Append a log entry to the log file.
fn write_log_entry(data_dir: &Path, entry: &ActionLog) -> std::io::Result<()> {
    fs::create_dir_all(data_dir)?;

    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join("action.log"))?;

    writeln!(file, "{}", json)
}

/// Sanitize arguments so secrets and oversized values stay out of the log.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, value) in map {
                let key_lower = key.to_lowercase();
                if key_lower.contains("key") || key_lower.contains("secret") || key_lower.contains("token") {
                    sanitized.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    sanitized.insert(key.clone(), sanitize_args(value));
                }
            }
            serde_json::Value::Object(sanitized)
        }
        serde_json::Value::String(s) if s.len() > 200 => {
            serde_json::Value::String(format!("{}... ({} chars)", &s[..197], s.len()))
        }
        _ => args.clone(),
    }
}

/// Get the current user's username.
fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
