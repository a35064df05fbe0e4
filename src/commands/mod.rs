//! Command implementations for the Quarterdeck CLI.
//!
//! This module contains the business logic for each CLI command. Commands
//! load state through `Storage`, run the draft reconciler, and return result
//! structs that render as JSON (default) or human-readable text behind the
//! global `-H` flag.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

use crate::config::Config;
use crate::draft::{DRAFT_ID_PREFIX, ProjectWithDrafts, apply_drafts, commit_draft};
use crate::models::{Milestone, Project, Timeline};
use crate::session::{self, SessionCredential};
use crate::storage::{PROJECT_ID_PREFIX, Storage, validate_id};
use crate::tools::{self, ToolAction, ToolCall};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

// === System ===

/// Result of `qd system init`.
#[derive(Debug, Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub seeded: bool,
    pub data_dir: String,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.initialized {
            let seeded = if self.seeded {
                " (seeded sample project)"
            } else {
                ""
            };
            format!("Initialized quarterdeck at {}{}", self.data_dir, seeded)
        } else {
            format!("Already initialized at {}", self.data_dir)
        }
    }
}

/// Initialize the store, seeding the sample project when empty.
pub fn init(data_dir: &Path) -> Result<InitResult> {
    let already = Storage::exists(data_dir);
    let mut storage = Storage::init(data_dir)?;
    let seeded = storage.seed_sample_data()?;

    Ok(InitResult {
        initialized: !already,
        seeded,
        data_dir: data_dir.display().to_string(),
    })
}

/// One project line in list/status output.
#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    pub pending_drafts: usize,
}

/// Default status summary (`qd` with no subcommand).
#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub projects: Vec<ProjectSummary>,
    pub pending_drafts: usize,
}

impl Output for StatusSummary {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "Quarterdeck - {} project(s), {} pending draft(s)\n",
            self.projects.len(),
            self.pending_drafts
        );
        for p in &self.projects {
            out.push_str(&format!(
                "  {}  {}  [{}]  {} draft(s)\n",
                p.id, p.name, p.status, p.pending_drafts
            ));
        }
        if self.pending_drafts > 0 {
            out.push_str("Review with `qd draft list`, then `qd draft accept <id>` or `qd draft reject <id>`.\n");
        }
        out.trim_end().to_string()
    }
}

/// Summarize projects and pending drafts.
pub fn status(data_dir: &Path) -> Result<StatusSummary> {
    let storage = Storage::open(data_dir)?;
    let projects = storage.load_projects()?;
    let drafts = storage.load_drafts()?;

    let summaries = projects
        .iter()
        .map(|p| ProjectSummary {
            id: p.id.clone(),
            name: p.name.clone(),
            status: p.status.clone(),
            pending_drafts: drafts.iter().filter(|d| d.project_id == p.id).count(),
        })
        .collect();

    Ok(StatusSummary {
        projects: summaries,
        pending_drafts: drafts.len(),
    })
}

// === Projects ===

/// Result of `qd project list`.
#[derive(Debug, Serialize)]
pub struct ProjectListResult {
    pub projects: Vec<ProjectSummary>,
}

impl Output for ProjectListResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects found.".to_string();
        }
        self.projects
            .iter()
            .map(|p| {
                format!(
                    "{}  {}  [{}]  {} draft(s)",
                    p.id, p.name, p.status, p.pending_drafts
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// List all projects.
pub fn project_list(data_dir: &Path) -> Result<ProjectListResult> {
    Ok(ProjectListResult {
        projects: status(data_dir)?.projects,
    })
}

/// Result of `qd project show`: the draft projection plus a pending count.
#[derive(Debug, Serialize)]
pub struct ProjectShowResult {
    #[serde(flatten)]
    pub project: ProjectWithDrafts,
    pub pending_drafts: usize,
}

impl Output for ProjectShowResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let p = &self.project;
        let mut out = format!("{} ({})\n", p.project.name, p.project.id);

        match &p.draft_status {
            Some(draft) => out.push_str(&format!(
                "Status: {} (draft: {})\n",
                p.project.status, draft
            )),
            None => out.push_str(&format!("Status: {}\n", p.project.status)),
        }
        match &p.draft_description {
            Some(draft) => out.push_str(&format!(
                "Description: {} (draft: {})\n",
                p.project.description, draft
            )),
            None => out.push_str(&format!("Description: {}\n", p.project.description)),
        }
        match &p.draft_anticipated_update {
            Some(draft) => out.push_str(&format!(
                "Anticipated next update: {} (draft: {})\n",
                p.project.anticipated_next_update, draft
            )),
            None => out.push_str(&format!(
                "Anticipated next update: {}\n",
                p.project.anticipated_next_update
            )),
        }

        out.push_str("\nRecent updates:\n");
        for update in &p.project.recent_updates {
            let marker = if update.is_draft { " [draft]" } else { "" };
            out.push_str(&format!(
                "  {}{}  {}\n",
                update.timestamp.format("%Y-%m-%d"),
                marker,
                update.content
            ));
        }

        out.push_str(&render_timeline(
            "Algorithm timeline",
            p.display_timeline(Timeline::Algorithm),
        ));
        out.push_str(&render_timeline(
            "IT deployment timeline",
            p.display_timeline(Timeline::Deployment),
        ));

        if self.pending_drafts > 0 {
            out.push_str(&format!("\n{} pending draft(s)\n", self.pending_drafts));
        }
        out.trim_end().to_string()
    }
}

/// Render one timeline block, sorted by date for display.
fn render_timeline(title: &str, milestones: &[Milestone]) -> String {
    let mut sorted: Vec<&Milestone> = milestones.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let mut out = format!("\n{}:\n", title);
    if sorted.is_empty() {
        out.push_str("  (none)\n");
        return out;
    }
    for m in sorted {
        let done = if m.completed { "[x]" } else { "[ ]" };
        let draft = if m.id.starts_with(DRAFT_ID_PREFIX) {
            " (draft)"
        } else {
            ""
        };
        out.push_str(&format!("  {} {}  {}{}\n", done, m.date, m.title, draft));
    }
    out
}

/// Show a project, as a draft projection or (with `canonical`) as stored.
pub fn project_show(data_dir: &Path, id: &str, canonical: bool) -> Result<ProjectShowResult> {
    validate_id(id, PROJECT_ID_PREFIX)?;
    let storage = Storage::open(data_dir)?;
    let project = storage.get_project(id)?;
    let drafts = storage.drafts_for(id)?;

    let projection = if canonical {
        ProjectWithDrafts::from(project)
    } else {
        apply_drafts(&project, &drafts)
    };

    Ok(ProjectShowResult {
        project: projection,
        pending_drafts: drafts.len(),
    })
}

// === Drafts ===

/// One pending draft in list output.
#[derive(Debug, Serialize)]
pub struct DraftSummary {
    pub id: String,
    pub project_id: String,
    pub kind: String,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of `qd draft list`.
#[derive(Debug, Serialize)]
pub struct DraftListResult {
    pub drafts: Vec<DraftSummary>,
}

impl Output for DraftListResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.drafts.is_empty() {
            return "No pending drafts.".to_string();
        }
        self.drafts
            .iter()
            .map(|d| format!("{}  {}  {}", d.id, d.project_id, d.summary))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// List pending drafts, optionally for one project.
pub fn draft_list(data_dir: &Path, project: Option<&str>) -> Result<DraftListResult> {
    let storage = Storage::open(data_dir)?;
    let drafts = match project {
        Some(id) => storage.drafts_for(id)?,
        None => storage.load_drafts()?,
    };

    Ok(DraftListResult {
        drafts: drafts
            .iter()
            .map(|d| DraftSummary {
                id: d.id.clone(),
                project_id: d.project_id.clone(),
                kind: d.payload.kind().to_string(),
                summary: d.payload.summary(),
                timestamp: d.timestamp,
            })
            .collect(),
    })
}

/// Result of accepting or rejecting a single draft.
#[derive(Debug, Serialize)]
pub struct DraftActionResult {
    pub id: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl Output for DraftActionResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Draft {} {}", self.id, self.action)
    }
}

/// Accept a draft: commit it to canonical state, then drop it from the
/// pending set.
pub fn draft_accept(data_dir: &Path, id: &str) -> Result<DraftActionResult> {
    let mut storage = Storage::open(data_dir)?;
    let draft = storage.get_draft(id)?;
    let project = storage.get_project(&draft.project_id)?;

    let committed = commit_draft(&project, &draft);
    storage.update_project(&committed)?;
    storage.remove_draft(id)?;

    Ok(DraftActionResult {
        id: id.to_string(),
        action: "accepted".to_string(),
        project_id: Some(draft.project_id),
    })
}

/// Reject a draft: drop it from the pending set. Always succeeds, even for
/// an unknown id.
pub fn draft_reject(data_dir: &Path, id: &str) -> Result<DraftActionResult> {
    let mut storage = Storage::open(data_dir)?;
    let project_id = storage.get_draft(id).ok().map(|d| d.project_id);
    storage.remove_draft(id)?;

    Ok(DraftActionResult {
        id: id.to_string(),
        action: "rejected".to_string(),
        project_id,
    })
}

/// Result of a bulk accept/reject.
#[derive(Debug, Serialize)]
pub struct BulkDraftResult {
    pub action: String,
    pub project_id: String,
    pub count: usize,
}

impl Output for BulkDraftResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "{} {} draft(s) for {}",
            capitalize(&self.action),
            self.count,
            self.project_id
        )
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Accept every pending draft for the active project, in insertion order.
pub fn draft_accept_all(data_dir: &Path, project: Option<&str>) -> Result<BulkDraftResult> {
    let mut storage = Storage::open(data_dir)?;
    let project = active_project(&storage, project)?;
    let drafts = storage.drafts_for(&project.id)?;

    let committed = drafts
        .iter()
        .fold(project.clone(), |acc, draft| commit_draft(&acc, draft));
    storage.update_project(&committed)?;
    let count = storage.clear_drafts(Some(&project.id))?;

    Ok(BulkDraftResult {
        action: "accepted".to_string(),
        project_id: project.id,
        count,
    })
}

/// Reject every pending draft for the active project.
pub fn draft_reject_all(data_dir: &Path, project: Option<&str>) -> Result<BulkDraftResult> {
    let mut storage = Storage::open(data_dir)?;
    let project = active_project(&storage, project)?;
    let count = storage.clear_drafts(Some(&project.id))?;

    Ok(BulkDraftResult {
        action: "rejected".to_string(),
        project_id: project.id,
        count,
    })
}

/// Resolve the active project: an explicit id, or the first stored project.
fn active_project(storage: &Storage, explicit: Option<&str>) -> Result<Project> {
    match explicit {
        Some(id) => storage.get_project(id),
        None => storage
            .load_projects()?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound("No projects found".to_string())),
    }
}

// === Tool calls ===

/// Result of `qd tool call`.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub tool: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<String>,
    /// The `conversation.item.create` acknowledgment for the transport
    pub ack: Value,
}

impl Output for ToolCallResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        match &self.draft_id {
            Some(id) => format!("{}: {} (draft {})", self.tool, self.action, id),
            None => format!("{}: {}", self.tool, self.action),
        }
    }
}

/// Process one assistant tool call against the active project.
pub fn tool_call(
    data_dir: &Path,
    name: &str,
    arguments: Option<&str>,
    call_id: Option<&str>,
    project: Option<&str>,
) -> Result<ToolCallResult> {
    let mut storage = Storage::open(data_dir)?;
    let project = active_project(&storage, project)?;

    let call = ToolCall {
        name: name.to_string(),
        arguments: arguments.unwrap_or("{}").to_string(),
        call_id: call_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
    };

    let (action, output) = tools::interpret(&call, &project.id);
    let (action_name, draft_id) = match action {
        ToolAction::CreateDraft(draft) => {
            let id = draft.id.clone();
            storage.add_draft(&draft)?;
            ("draft_created", Some(id))
        }
        ToolAction::AcceptAll => {
            let drafts = storage.drafts_for(&project.id)?;
            let committed = drafts
                .iter()
                .fold(project.clone(), |acc, draft| commit_draft(&acc, draft));
            storage.update_project(&committed)?;
            storage.clear_drafts(Some(&project.id))?;
            ("accepted_all", None)
        }
        ToolAction::RejectAll => {
            storage.clear_drafts(Some(&project.id))?;
            ("rejected_all", None)
        }
        ToolAction::Ignored => ("ignored", None),
    };

    Ok(ToolCallResult {
        tool: name.to_string(),
        action: action_name.to_string(),
        draft_id,
        ack: output.to_client_event(),
    })
}

/// Result of `qd tool manifest`.
#[derive(Debug, Serialize)]
pub struct ManifestResult {
    pub tools: Vec<Value>,
}

impl Output for ManifestResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        self.tools
            .iter()
            .map(|t| {
                format!(
                    "{}  {}",
                    t["name"].as_str().unwrap_or("?"),
                    t["description"].as_str().unwrap_or("")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Emit the tool manifest declared to the realtime session.
pub fn tool_manifest() -> ManifestResult {
    ManifestResult {
        tools: tools::tool_definitions(),
    }
}

// === Session ===

/// Result of `qd session token`.
#[derive(Debug, Serialize)]
pub struct SessionTokenResult {
    #[serde(flatten)]
    pub credential: SessionCredential,
}

impl Output for SessionTokenResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Session {} (secret expires at {})",
            self.credential.id, self.credential.client_secret.expires_at
        )
    }
}

/// Mint an ephemeral realtime-session credential.
pub fn session_token(data_dir: &Path) -> Result<SessionTokenResult> {
    let config = Config::load(data_dir)?;
    // Session failures surface as one user-visible connection error
    let credential = session::create_session(&config).map_err(|e| Error::Other(e.to_string()))?;
    Ok(SessionTokenResult { credential })
}
