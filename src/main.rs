//! Quarterdeck CLI - project status tracking with voice-driven draft approvals.

use clap::Parser;
use quarterdeck::cli::{
    Cli, Commands, DraftCommands, ProjectCommands, SessionCommands, SystemCommands, ToolCommands,
};
use quarterdeck::commands::{self, Output};
use quarterdeck::{action_log, storage};
use std::path::Path;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let human = cli.human_readable;

    // Determine data dir: --data-dir flag > QD_DATA_DIR env (via clap) > platform default
    let data_dir = storage::resolve_data_dir(cli.data_dir);

    // Serialize command for logging
    let (cmd_name, args_json) = serialize_command(&cli.command);

    // Start timing
    let start = Instant::now();

    // Execute command
    let result = run_command(cli.command, &data_dir, human);

    // Calculate duration
    let duration = start.elapsed().as_millis() as u64;

    // Determine success/error
    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    // Log the action (silently falls back if logging encounters errors)
    action_log::log_action(&data_dir, &cmd_name, args_json, success, error, duration);

    // Handle result
    if let Err(e) = result {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!(r#"{{"error": "{}"}}"#, e);
        }
        process::exit(1);
    }
}

fn run_command(
    command: Option<Commands>,
    data_dir: &Path,
    human: bool,
) -> Result<(), quarterdeck::Error> {
    match command {
        Some(Commands::Project { command }) => match command {
            ProjectCommands::List => {
                let result = commands::project_list(data_dir)?;
                output(&result, human);
            }
            ProjectCommands::Show { id, canonical } => {
                let result = commands::project_show(data_dir, &id, canonical)?;
                output(&result, human);
            }
        },

        Some(Commands::Draft { command }) => match command {
            DraftCommands::List { project } => {
                let result = commands::draft_list(data_dir, project.as_deref())?;
                output(&result, human);
            }
            DraftCommands::Accept { id } => {
                let result = commands::draft_accept(data_dir, &id)?;
                output(&result, human);
            }
            DraftCommands::Reject { id } => {
                let result = commands::draft_reject(data_dir, &id)?;
                output(&result, human);
            }
            DraftCommands::AcceptAll { project } => {
                let result = commands::draft_accept_all(data_dir, project.as_deref())?;
                output(&result, human);
            }
            DraftCommands::RejectAll { project } => {
                let result = commands::draft_reject_all(data_dir, project.as_deref())?;
                output(&result, human);
            }
        },

        Some(Commands::Tool { command }) => match command {
            ToolCommands::Manifest => {
                let result = commands::tool_manifest();
                output(&result, human);
            }
            ToolCommands::Call {
                name,
                args,
                call_id,
                project,
            } => {
                let result = commands::tool_call(
                    data_dir,
                    &name,
                    args.as_deref(),
                    call_id.as_deref(),
                    project.as_deref(),
                )?;
                output(&result, human);
            }
        },

        Some(Commands::Session { command }) => match command {
            SessionCommands::Token => {
                let result = commands::session_token(data_dir)?;
                output(&result, human);
            }
        },

        Some(Commands::System { command }) => match command {
            SystemCommands::Init => {
                let result = commands::init(data_dir)?;
                output(&result, human);
            }
            SystemCommands::BuildInfo => {
                if human {
                    println!("Version: {}", quarterdeck::cli::package_version());
                    println!("Commit:  {}", quarterdeck::cli::git_commit());
                    println!("Built:   {}", quarterdeck::cli::build_timestamp());
                } else {
                    let result = serde_json::json!({
                        "version": quarterdeck::cli::package_version(),
                        "commit": quarterdeck::cli::git_commit(),
                        "built": quarterdeck::cli::build_timestamp(),
                    });
                    println!("{}", result);
                }
            }
        },

        None => {
            // Default: show status summary
            match commands::status(data_dir) {
                Ok(summary) => output(&summary, human),
                Err(quarterdeck::Error::NotInitialized) => {
                    if human {
                        println!("Quarterdeck - Not initialized.");
                        println!("Run `qd system init` to create the store and seed a sample project.");
                    } else {
                        println!(r#"{{"initialized": false, "projects": [], "pendingDrafts": 0}}"#);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Serialize command to extract name and arguments for logging.
fn serialize_command(command: &Option<Commands>) -> (String, serde_json::Value) {
    match command {
        Some(Commands::Project { command }) => match command {
            ProjectCommands::List => ("project list".to_string(), serde_json::json!({})),
            ProjectCommands::Show { id, canonical } => (
                "project show".to_string(),
                serde_json::json!({ "id": id, "canonical": canonical }),
            ),
        },

        Some(Commands::Draft { command }) => match command {
            DraftCommands::List { project } => (
                "draft list".to_string(),
                serde_json::json!({ "project": project }),
            ),
            DraftCommands::Accept { id } => {
                ("draft accept".to_string(), serde_json::json!({ "id": id }))
            }
            DraftCommands::Reject { id } => {
                ("draft reject".to_string(), serde_json::json!({ "id": id }))
            }
            DraftCommands::AcceptAll { project } => (
                "draft accept-all".to_string(),
                serde_json::json!({ "project": project }),
            ),
            DraftCommands::RejectAll { project } => (
                "draft reject-all".to_string(),
                serde_json::json!({ "project": project }),
            ),
        },

        Some(Commands::Tool { command }) => match command {
            ToolCommands::Manifest => ("tool manifest".to_string(), serde_json::json!({})),
            ToolCommands::Call {
                name,
                args,
                call_id,
                project,
            } => (
                "tool call".to_string(),
                serde_json::json!({
                    "name": name,
                    "args": args,
                    "call_id": call_id,
                    "project": project,
                }),
            ),
        },

        Some(Commands::Session { command }) => match command {
            SessionCommands::Token => ("session token".to_string(), serde_json::json!({})),
        },

        Some(Commands::System { command }) => match command {
            SystemCommands::Init => ("system init".to_string(), serde_json::json!({})),
            SystemCommands::BuildInfo => ("system build-info".to_string(), serde_json::json!({})),
        },

        None => ("status".to_string(), serde_json::json!({})),
    }
}
