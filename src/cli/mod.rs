//! CLI argument definitions for Quarterdeck.

use clap::{Parser, Subcommand};

/// Quarterdeck - project status tracking with voice-driven draft approvals.
///
/// Assistant edits land as pending drafts; review with `qd draft list`, then
/// accept or reject them.
#[derive(Parser, Debug)]
#[command(name = "qd")]
#[command(author, version, about = "Track project status with a draft/approve edit workflow", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Use <path> as the data directory instead of the platform default.
    /// Can also be set via QD_DATA_DIR environment variable.
    #[arg(short = 'D', long = "data-dir", global = true, env = "QD_DATA_DIR")]
    pub data_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project inspection commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Pending draft review commands
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },

    /// Assistant tool-call commands (the surface the voice transport drives)
    Tool {
        #[command(subcommand)]
        command: ToolCommands,
    },

    /// Realtime session commands
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// System administration commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List all projects
    List,

    /// Show a project with pending drafts overlaid
    Show {
        /// Project ID (e.g., qd-a1b2)
        id: String,

        /// Show canonical state only, without draft overlays
        #[arg(long)]
        canonical: bool,
    },
}

/// Draft subcommands
#[derive(Subcommand, Debug)]
pub enum DraftCommands {
    /// List pending drafts
    List {
        /// Only drafts for this project
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Accept a draft: commit it, then remove it from the pending set
    Accept {
        /// Draft ID
        id: String,
    },

    /// Reject a draft: remove it without committing
    Reject {
        /// Draft ID
        id: String,
    },

    /// Accept every pending draft for the active project
    AcceptAll {
        /// Project ID (defaults to the first project)
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Reject every pending draft for the active project
    RejectAll {
        /// Project ID (defaults to the first project)
        #[arg(short, long)]
        project: Option<String>,
    },
}

/// Tool subcommands
#[derive(Subcommand, Debug)]
pub enum ToolCommands {
    /// Print the tool definitions declared to the realtime session
    Manifest,

    /// Process one assistant tool call
    Call {
        /// Tool name (e.g., update_project_status)
        name: String,

        /// JSON-encoded argument object
        #[arg(short, long)]
        args: Option<String>,

        /// Correlation token echoed in the acknowledgment
        #[arg(long)]
        call_id: Option<String>,

        /// Target project ID (defaults to the first project)
        #[arg(short, long)]
        project: Option<String>,
    },
}

/// Session subcommands
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Mint an ephemeral realtime-session credential
    Token,
}

/// System subcommands
#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Initialize the store (seeds a sample project when empty)
    Init,

    /// Show build information
    BuildInfo,
}

/// Package version from Cargo.toml.
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Git commit the binary was built from.
pub fn git_commit() -> &'static str {
    env!("QD_GIT_COMMIT")
}

/// Timestamp the binary was built at.
pub fn build_timestamp() -> &'static str {
    env!("QD_BUILD_TIMESTAMP")
}
