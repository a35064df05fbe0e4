//! Data models for Quarterdeck entities.
//!
//! This module defines the core data structures:
//! - `Project` - Canonical status record with timelines and an update log
//! - `Milestone` - Dated timeline entry with a completion flag
//! - `Update` - Row in a project's recent-updates log
//! - `DraftChange` - Proposed, unconfirmed mutation awaiting accept/reject
//! - `DraftPayload` - Tagged payload union, one shape per change type
//!
//! Wire field names are camelCase because the record-store blobs and the
//! tool-call payloads are shared with the browser dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which milestone timeline a change targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Timeline {
    Algorithm,
    #[default]
    Deployment,
}

impl From<String> for Timeline {
    /// Anything that is not explicitly "algorithm" is deployment; the
    /// assistant occasionally emits loose timeline labels.
    fn from(value: String) -> Self {
        match value.as_str() {
            "algorithm" => Self::Algorithm,
            _ => Self::Deployment,
        }
    }
}

impl Timeline {
    /// Label used in update-log templates and human output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Algorithm => "algorithm",
            Self::Deployment => "deployment",
        }
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A dated entry on one of a project's delivery timelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// Unique within its timeline (e.g., "qdm-a1b2"). Projection artifacts
    /// carry a "draft-" prefix instead.
    pub id: String,

    /// Milestone title; "complete" operations match on this, first hit wins
    pub title: String,

    /// Target calendar date, YYYY-MM-DD
    pub date: String,

    /// Optional detail text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the milestone has been reached
    #[serde(default)]
    pub completed: bool,
}

/// A row in a project's recent-updates log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    /// Unique identifier (e.g., "qdu-a1b2")
    pub id: String,

    /// Creation timestamp
    pub timestamp: DateTime<Utc>,

    /// Free-text update content
    pub content: String,

    /// Set only on projected, not-yet-committed entries
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_draft: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A canonical project status record.
///
/// Mutated only through the reconciler's commit operation; until a draft is
/// accepted the dashboard renders a projection instead (see `crate::draft`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier (e.g., "qd-a1b2")
    pub id: String,

    /// Project name
    pub name: String,

    /// Detailed description
    pub description: String,

    /// Free-text status label (e.g., "Planning", "In Progress", "Blocked")
    pub status: String,

    /// Update log, newest first
    #[serde(default)]
    pub recent_updates: Vec<Update>,

    /// Free-text note on the next expected update
    #[serde(default)]
    pub anticipated_next_update: String,

    /// Algorithm development milestones; stored unordered, displayed by date
    #[serde(default)]
    pub algorithm_timeline: Vec<Milestone>,

    /// IT deployment milestones; stored unordered, displayed by date
    #[serde(default)]
    pub it_deployment_timeline: Vec<Milestone>,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last commit timestamp
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project with the given ID and name.
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description: String::new(),
            status: "Planning".to_string(),
            recent_updates: Vec::new(),
            anticipated_next_update: String::new(),
            algorithm_timeline: Vec::new(),
            it_deployment_timeline: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The milestones on the named timeline.
    pub fn timeline(&self, timeline: Timeline) -> &[Milestone] {
        match timeline {
            Timeline::Algorithm => &self.algorithm_timeline,
            Timeline::Deployment => &self.it_deployment_timeline,
        }
    }

    /// Mutable access to the named timeline.
    pub fn timeline_mut(&mut self, timeline: Timeline) -> &mut Vec<Milestone> {
        match timeline {
            Timeline::Algorithm => &mut self.algorithm_timeline,
            Timeline::Deployment => &mut self.it_deployment_timeline,
        }
    }
}

/// Payload for a single proposed change, one shape per change type.
///
/// Stored adjacently tagged (`{"type": ..., "data": {...}}`) so the blobs
/// the dashboard already holds keep decoding. The closed enumeration is what
/// rules out malformed-payload access: a draft that decodes is well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DraftPayload {
    /// Replace the project's status label
    StatusUpdate { status: String },

    /// Replace the project's description
    DescriptionUpdate { description: String },

    /// Replace the anticipated-next-update note
    AnticipatedUpdate {
        #[serde(rename = "nextUpdate")]
        next_update: String,
    },

    /// Add a milestone to one of the timelines
    MilestoneAdd {
        title: String,
        timeline: Timeline,
        date: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    /// Mark the first milestone with a matching title completed
    MilestoneComplete {
        #[serde(rename = "milestoneTitle")]
        milestone_title: String,
        timeline: Timeline,
    },

    /// Append an entry to the recent-updates log
    ProjectUpdate {
        #[serde(rename = "updateContent")]
        update_content: String,
    },
}

impl DraftPayload {
    /// The wire-level type tag for this payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StatusUpdate { .. } => "status_update",
            Self::DescriptionUpdate { .. } => "description_update",
            Self::AnticipatedUpdate { .. } => "anticipated_update",
            Self::MilestoneAdd { .. } => "milestone_add",
            Self::MilestoneComplete { .. } => "milestone_complete",
            Self::ProjectUpdate { .. } => "project_update",
        }
    }

    /// One-line human description for draft listings.
    pub fn summary(&self) -> String {
        match self {
            Self::StatusUpdate { status } => format!("Set status to \"{}\"", status),
            Self::DescriptionUpdate { .. } => "Update project description".to_string(),
            Self::AnticipatedUpdate { next_update } => {
                format!("Set anticipated next update to \"{}\"", next_update)
            }
            Self::MilestoneAdd { title, timeline, date, .. } => {
                format!("Add milestone \"{}\" ({}) to {} timeline", title, date, timeline)
            }
            Self::MilestoneComplete { milestone_title, timeline } => {
                format!("Complete milestone \"{}\" on {} timeline", milestone_title, timeline)
            }
            Self::ProjectUpdate { update_content } => {
                format!("Log update: \"{}\"", update_content)
            }
        }
    }
}

/// A proposed, unconfirmed mutation awaiting user accept/reject.
///
/// Drafts are append-only until accepted or rejected and never mutate
/// canonical state directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftChange {
    /// Unique identifier (UUID)
    pub id: String,

    /// The project this draft targets
    pub project_id: String,

    /// Typed change payload, tagged by change type on the wire
    #[serde(flatten)]
    pub payload: DraftPayload,

    /// Creation timestamp
    pub timestamp: DateTime<Utc>,
}

impl DraftChange {
    /// Create a new draft targeting the given project.
    pub fn new(project_id: String, payload: DraftPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id,
            payload,
            timestamp: Utc::now(),
        }
    }
}
