//! Quarterdeck - project status tracking with a draft/approve edit workflow.
//!
//! This library provides the core functionality for the `qd` CLI tool:
//! canonical project records, pending draft changes proposed by a voice
//! assistant, the reconciler that overlays drafts onto canonical state, and
//! the tool-call interpreter that turns assistant commands into drafts.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod draft;
pub mod models;
pub mod session;
pub mod storage;
pub mod tools;


/// Library-level error type for Quarterdeck operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not initialized: run `qd system init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Quarterdeck operations.
pub type Result<T> = std::result::Result<T, Error>;
