//! Draft reconciliation: overlaying pending drafts onto canonical projects.
//!
//! A canonical `Project` changes only through `commit_draft`. Until a draft
//! is accepted, the dashboard renders the `ProjectWithDrafts` projection
//! built by `apply_drafts`, which shadows whatever a pending draft touches
//! without mutating the canonical record.
//!
//! Accept = commit + remove, reject = remove only; removing a draft from the
//! pending set belongs to the caller, not this module.

use chrono::Utc;
use serde::Serialize;

use crate::models::{DraftChange, DraftPayload, Milestone, Project, Timeline, Update};
use crate::storage::{generate_id, MILESTONE_ID_PREFIX, UPDATE_ID_PREFIX};

/// Prefix marking projection-only milestone ids.
pub const DRAFT_ID_PREFIX: &str = "draft-";

/// A read-only merged view combining a project with its pending drafts.
///
/// Shadow fields are populated only when at least one pending draft targets
/// that field or timeline. Draft-marked update rows are prepended to
/// `recent_updates` inside the embedded (copied) project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWithDrafts {
    #[serde(flatten)]
    pub project: Project,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_anticipated_update: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_algorithm_timeline: Option<Vec<Milestone>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_it_deployment_timeline: Option<Vec<Milestone>>,
}

impl ProjectWithDrafts {
    /// Whether any shadow field is populated.
    pub fn has_draft_fields(&self) -> bool {
        self.draft_status.is_some()
            || self.draft_description.is_some()
            || self.draft_anticipated_update.is_some()
            || self.draft_algorithm_timeline.is_some()
            || self.draft_it_deployment_timeline.is_some()
            || self.project.recent_updates.iter().any(|u| u.is_draft)
    }

    /// The timeline as it should be displayed: shadow if present, else
    /// canonical.
    pub fn display_timeline(&self, timeline: Timeline) -> &[Milestone] {
        let shadow = match timeline {
            Timeline::Algorithm => &self.draft_algorithm_timeline,
            Timeline::Deployment => &self.draft_it_deployment_timeline,
        };
        shadow
            .as_deref()
            .unwrap_or_else(|| self.project.timeline(timeline))
    }
}

impl From<Project> for ProjectWithDrafts {
    fn from(project: Project) -> Self {
        Self {
            project,
            draft_status: None,
            draft_description: None,
            draft_anticipated_update: None,
            draft_algorithm_timeline: None,
            draft_it_deployment_timeline: None,
        }
    }
}

/// Copy-on-first-write overlay accumulator.
///
/// Scalar slots hold the latest draft value, so last write wins. Timeline
/// slots are copied from canonical exactly once, on first write, and every
/// later milestone draft lands on that same shadow copy. Invariant: a fresh
/// copy per draft would drop all but the last queued addition.
struct DraftOverlay<'a> {
    canonical: &'a Project,
    status: Option<String>,
    description: Option<String>,
    anticipated_update: Option<String>,
    algorithm: Option<Vec<Milestone>>,
    deployment: Option<Vec<Milestone>>,
    /// Synthetic draft-marked update rows, most recent first
    updates: Vec<Update>,
}

impl<'a> DraftOverlay<'a> {
    fn new(canonical: &'a Project) -> Self {
        Self {
            canonical,
            status: None,
            description: None,
            anticipated_update: None,
            algorithm: None,
            deployment: None,
            updates: Vec::new(),
        }
    }

    /// Shadow slot and canonical source for the named timeline.
    fn slot(&mut self, timeline: Timeline) -> (&mut Option<Vec<Milestone>>, &'a [Milestone]) {
        match timeline {
            Timeline::Algorithm => (&mut self.algorithm, &self.canonical.algorithm_timeline),
            Timeline::Deployment => (&mut self.deployment, &self.canonical.it_deployment_timeline),
        }
    }

    fn apply(&mut self, draft: &DraftChange) {
        match &draft.payload {
            DraftPayload::StatusUpdate { status } => {
                self.status = Some(status.clone());
            }
            DraftPayload::DescriptionUpdate { description } => {
                self.description = Some(description.clone());
            }
            DraftPayload::AnticipatedUpdate { next_update } => {
                self.anticipated_update = Some(next_update.clone());
            }
            DraftPayload::MilestoneAdd { title, timeline, date, description } => {
                let milestone = Milestone {
                    id: format!("{}{}", DRAFT_ID_PREFIX, draft.id),
                    title: title.clone(),
                    date: date.clone(),
                    description: description.clone(),
                    completed: false,
                };
                let (slot, canonical) = self.slot(*timeline);
                slot.get_or_insert_with(|| canonical.to_vec()).push(milestone);
            }
            DraftPayload::MilestoneComplete { milestone_title, timeline } => {
                let (slot, canonical) = self.slot(*timeline);
                // A title miss with no shadow yet must not materialize one;
                // the projection stays byte-for-byte canonical.
                if slot.is_none() && !canonical.iter().any(|m| m.title == *milestone_title) {
                    return;
                }
                let shadow = slot.get_or_insert_with(|| canonical.to_vec());
                if let Some(milestone) =
                    shadow.iter_mut().find(|m| m.title == *milestone_title)
                {
                    milestone.completed = true;
                }
            }
            DraftPayload::ProjectUpdate { update_content } => {
                // Each newer draft lands in front of earlier ones
                self.updates.insert(
                    0,
                    Update {
                        id: format!("{}{}", DRAFT_ID_PREFIX, draft.id),
                        timestamp: draft.timestamp,
                        content: update_content.clone(),
                        is_draft: true,
                    },
                );
            }
        }
    }

    fn finish(self) -> ProjectWithDrafts {
        let mut project = self.canonical.clone();
        if !self.updates.is_empty() {
            project.recent_updates.splice(0..0, self.updates);
        }
        ProjectWithDrafts {
            project,
            draft_status: self.status,
            draft_description: self.description,
            draft_anticipated_update: self.anticipated_update,
            draft_algorithm_timeline: self.algorithm,
            draft_it_deployment_timeline: self.deployment,
        }
    }
}

/// Overlay pending drafts onto a canonical project.
///
/// Drafts for other projects are ignored. Survivors apply in sequence order,
/// so later drafts of the same field override earlier ones. The canonical
/// record and its nested collections are never touched, and no decodable
/// input can make this fail.
pub fn apply_drafts(project: &Project, drafts: &[DraftChange]) -> ProjectWithDrafts {
    let mut overlay = DraftOverlay::new(project);
    for draft in drafts.iter().filter(|d| d.project_id == project.id) {
        overlay.apply(draft);
    }
    overlay.finish()
}

/// Whether any pending draft targets the given project.
pub fn has_drafts(project: &Project, drafts: &[DraftChange]) -> bool {
    drafts.iter().any(|d| d.project_id == project.id)
}

/// Apply an accepted draft to canonical state.
///
/// Returns a new, fully-updated project; the input is never mutated. Every
/// effective commit prepends exactly one human-readable row to
/// `recent_updates`. A draft routed to the wrong project, or a milestone
/// completion whose title matches nothing, is a no-op with no log row.
pub fn commit_draft(project: &Project, draft: &DraftChange) -> Project {
    let mut updated = project.clone();
    if draft.project_id != project.id {
        return updated;
    }

    let content = match &draft.payload {
        DraftPayload::StatusUpdate { status } => {
            updated.status = status.clone();
            format!("Status updated to: {}", status)
        }
        DraftPayload::DescriptionUpdate { description } => {
            updated.description = description.clone();
            "Updated project description".to_string()
        }
        DraftPayload::AnticipatedUpdate { next_update } => {
            updated.anticipated_next_update = next_update.clone();
            format!("Updated anticipated next update: {}", next_update)
        }
        DraftPayload::MilestoneAdd { title, timeline, date, description } => {
            // Fresh id here: the draft id marks a projection artifact only
            let milestone = Milestone {
                id: generate_id(MILESTONE_ID_PREFIX, title),
                title: title.clone(),
                date: date.clone(),
                description: description.clone(),
                completed: false,
            };
            updated.timeline_mut(*timeline).push(milestone);
            format!("Added milestone: {} to {} timeline", title, timeline)
        }
        DraftPayload::MilestoneComplete { milestone_title, timeline } => {
            let position = updated
                .timeline(*timeline)
                .iter()
                .position(|m| m.title == *milestone_title);
            match position {
                Some(index) => {
                    updated.timeline_mut(*timeline)[index].completed = true;
                    format!("Completed milestone: {}", milestone_title)
                }
                // Title miss: no mutation, no log row
                None => return updated,
            }
        }
        DraftPayload::ProjectUpdate { update_content } => update_content.clone(),
    };

    let now = Utc::now();
    updated.recent_updates.insert(
        0,
        Update {
            id: generate_id(UPDATE_ID_PREFIX, &content),
            timestamp: now,
            content,
            is_draft: false,
        },
    );
    updated.updated_at = now;
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> Project {
        let mut project = Project::new("qd-a1b2".to_string(), "Model rollout".to_string());
        project.description = "Recommendation model rollout".to_string();
        project.status = "Planning".to_string();
        project.anticipated_next_update = "2025-06-01 - Architecture review".to_string();
        project.recent_updates.push(Update {
            id: "qdu-0001".to_string(),
            timestamp: Utc::now(),
            content: "Project initialized".to_string(),
            is_draft: false,
        });
        project.algorithm_timeline.push(Milestone {
            id: "qdm-0001".to_string(),
            title: "Baseline model trained".to_string(),
            date: "2025-05-30".to_string(),
            description: None,
            completed: false,
        });
        project.it_deployment_timeline.push(Milestone {
            id: "qdm-0002".to_string(),
            title: "Dev environment setup".to_string(),
            date: "2025-05-25".to_string(),
            description: None,
            completed: true,
        });
        project
    }

    fn draft_for(project: &Project, payload: DraftPayload) -> DraftChange {
        DraftChange::new(project.id.clone(), payload)
    }

    #[test]
    fn test_empty_draft_set_projects_canonical() {
        let project = sample_project();
        let projection = apply_drafts(&project, &[]);

        assert_eq!(projection.project, project);
        assert!(!projection.has_draft_fields());
    }

    #[test]
    fn test_drafts_for_other_project_are_ignored() {
        let project = sample_project();
        let foreign = DraftChange::new(
            "qd-zzzz".to_string(),
            DraftPayload::StatusUpdate {
                status: "Blocked".to_string(),
            },
        );

        let projection = apply_drafts(&project, &[foreign.clone()]);
        assert_eq!(projection.project, project);
        assert!(!projection.has_draft_fields());
        assert!(!has_drafts(&project, &[foreign]));
    }

    #[test]
    fn test_status_draft_shadows_without_mutating_canonical() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::StatusUpdate {
                status: "In Progress".to_string(),
            },
        );

        let projection = apply_drafts(&project, &[draft]);
        assert_eq!(projection.draft_status.as_deref(), Some("In Progress"));
        assert_eq!(projection.project.status, "Planning");
        assert_eq!(project.status, "Planning");
    }

    #[test]
    fn test_last_write_wins_for_scalar_fields() {
        let project = sample_project();
        let first = draft_for(
            &project,
            DraftPayload::DescriptionUpdate {
                description: "first".to_string(),
            },
        );
        let second = draft_for(
            &project,
            DraftPayload::DescriptionUpdate {
                description: "second".to_string(),
            },
        );

        let projection = apply_drafts(&project, &[first, second]);
        assert_eq!(projection.draft_description.as_deref(), Some("second"));
    }

    #[test]
    fn test_two_milestone_adds_accumulate_on_one_shadow() {
        let project = sample_project();
        let drafts = vec![
            draft_for(
                &project,
                DraftPayload::MilestoneAdd {
                    title: "Integration test".to_string(),
                    timeline: Timeline::Algorithm,
                    date: "2025-07-01".to_string(),
                    description: None,
                },
            ),
            draft_for(
                &project,
                DraftPayload::MilestoneAdd {
                    title: "Load test".to_string(),
                    timeline: Timeline::Algorithm,
                    date: "2025-07-15".to_string(),
                    description: None,
                },
            ),
        ];

        let projection = apply_drafts(&project, &drafts);
        let shadow = projection.draft_algorithm_timeline.as_ref().unwrap();

        // Both additions survive on the single shadow copy
        assert_eq!(shadow.len(), project.algorithm_timeline.len() + 2);
        assert_eq!(project.algorithm_timeline.len(), 1);
        assert!(projection.draft_it_deployment_timeline.is_none());
    }

    #[test]
    fn test_milestone_add_marks_draft_origin() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::MilestoneAdd {
                title: "Integration test".to_string(),
                timeline: Timeline::Algorithm,
                date: "2025-07-01".to_string(),
                description: None,
            },
        );
        let draft_id = draft.id.clone();

        let projection = apply_drafts(&project, &[draft]);
        let shadow = projection.draft_algorithm_timeline.as_ref().unwrap();
        let added = shadow.last().unwrap();

        assert_eq!(added.id, format!("draft-{}", draft_id));
        assert!(!added.completed);
    }

    #[test]
    fn test_milestone_complete_marks_shadow_only() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::MilestoneComplete {
                milestone_title: "Baseline model trained".to_string(),
                timeline: Timeline::Algorithm,
            },
        );

        let projection = apply_drafts(&project, &[draft]);
        let shadow = projection.draft_algorithm_timeline.as_ref().unwrap();

        assert!(shadow[0].completed);
        assert!(!project.algorithm_timeline[0].completed);
    }

    #[test]
    fn test_milestone_complete_miss_leaves_projection_canonical() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::MilestoneComplete {
                milestone_title: "No such milestone".to_string(),
                timeline: Timeline::Algorithm,
            },
        );

        let projection = apply_drafts(&project, &[draft]);

        // A miss must not even materialize a shadow timeline
        assert!(projection.draft_algorithm_timeline.is_none());
        assert_eq!(projection.project, project);
    }

    #[test]
    fn test_milestone_complete_sees_earlier_add_on_same_shadow() {
        let project = sample_project();
        let drafts = vec![
            draft_for(
                &project,
                DraftPayload::MilestoneAdd {
                    title: "Integration test".to_string(),
                    timeline: Timeline::Algorithm,
                    date: "2025-07-01".to_string(),
                    description: None,
                },
            ),
            draft_for(
                &project,
                DraftPayload::MilestoneComplete {
                    milestone_title: "Integration test".to_string(),
                    timeline: Timeline::Algorithm,
                },
            ),
        ];

        let projection = apply_drafts(&project, &drafts);
        let shadow = projection.draft_algorithm_timeline.as_ref().unwrap();
        let added = shadow.iter().find(|m| m.title == "Integration test").unwrap();

        assert!(added.completed);
    }

    #[test]
    fn test_project_update_drafts_prepend_most_recent_first() {
        let project = sample_project();
        let drafts = vec![
            draft_for(
                &project,
                DraftPayload::ProjectUpdate {
                    update_content: "older note".to_string(),
                },
            ),
            draft_for(
                &project,
                DraftPayload::ProjectUpdate {
                    update_content: "newer note".to_string(),
                },
            ),
        ];

        let projection = apply_drafts(&project, &drafts);
        let updates = &projection.project.recent_updates;

        assert_eq!(updates[0].content, "newer note");
        assert_eq!(updates[1].content, "older note");
        assert!(updates[0].is_draft && updates[1].is_draft);
        // Canonical rows follow the draft-marked ones
        assert_eq!(updates[2].content, "Project initialized");
        assert!(!updates[2].is_draft);
        assert_eq!(project.recent_updates.len(), 1);
    }

    #[test]
    fn test_display_timeline_prefers_shadow() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::MilestoneAdd {
                title: "Cutover".to_string(),
                timeline: Timeline::Deployment,
                date: "2025-08-01".to_string(),
                description: None,
            },
        );

        let projection = apply_drafts(&project, &[draft]);
        assert_eq!(projection.display_timeline(Timeline::Deployment).len(), 2);
        assert_eq!(projection.display_timeline(Timeline::Algorithm).len(), 1);
    }

    #[test]
    fn test_commit_status_update_appends_one_log_row() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::StatusUpdate {
                status: "In Progress".to_string(),
            },
        );

        let committed = commit_draft(&project, &draft);

        assert_eq!(committed.status, "In Progress");
        assert_eq!(committed.recent_updates.len(), project.recent_updates.len() + 1);
        assert_eq!(
            committed.recent_updates[0].content,
            "Status updated to: In Progress"
        );
        assert!(!committed.recent_updates[0].is_draft);
        // The input is untouched
        assert_eq!(project.status, "Planning");
    }

    #[test]
    fn test_commit_wrong_project_is_noop() {
        let project = sample_project();
        let foreign = DraftChange::new(
            "qd-zzzz".to_string(),
            DraftPayload::StatusUpdate {
                status: "Blocked".to_string(),
            },
        );

        let committed = commit_draft(&project, &foreign);
        assert_eq!(committed, project);
    }

    #[test]
    fn test_commit_milestone_add_mints_fresh_id() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::MilestoneAdd {
                title: "Integration test".to_string(),
                timeline: Timeline::Algorithm,
                date: "2025-07-01".to_string(),
                description: Some("End-to-end pass".to_string()),
            },
        );

        let committed = commit_draft(&project, &draft);
        let added = committed.algorithm_timeline.last().unwrap();

        assert!(added.id.starts_with("qdm-"));
        assert_ne!(added.id, format!("draft-{}", draft.id));
        assert!(!added.completed);
        assert_eq!(
            committed.recent_updates[0].content,
            "Added milestone: Integration test to algorithm timeline"
        );
    }

    #[test]
    fn test_commit_milestone_complete_by_title() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::MilestoneComplete {
                milestone_title: "Baseline model trained".to_string(),
                timeline: Timeline::Algorithm,
            },
        );

        let committed = commit_draft(&project, &draft);

        assert!(committed.algorithm_timeline[0].completed);
        assert_eq!(
            committed.recent_updates[0].content,
            "Completed milestone: Baseline model trained"
        );
    }

    #[test]
    fn test_commit_milestone_complete_miss_emits_no_log_row() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::MilestoneComplete {
                milestone_title: "No such milestone".to_string(),
                timeline: Timeline::Deployment,
            },
        );

        let committed = commit_draft(&project, &draft);

        assert_eq!(committed.recent_updates.len(), project.recent_updates.len());
        assert_eq!(committed.it_deployment_timeline, project.it_deployment_timeline);
    }

    #[test]
    fn test_commit_project_update_logs_content_itself() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::ProjectUpdate {
                update_content: "Met with infra team".to_string(),
            },
        );

        let committed = commit_draft(&project, &draft);
        assert_eq!(committed.recent_updates[0].content, "Met with infra team");
    }

    #[test]
    fn test_accept_flow_end_to_end() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::StatusUpdate {
                status: "In Progress".to_string(),
            },
        );

        // Pending: projection shadows the status, canonical untouched
        let projection = apply_drafts(&project, std::slice::from_ref(&draft));
        assert_eq!(projection.draft_status.as_deref(), Some("In Progress"));
        assert_eq!(projection.project.status, "Planning");

        // Accept: commit, then the caller drops the draft from the pending set
        let committed = commit_draft(&project, &draft);
        assert_eq!(committed.status, "In Progress");
        assert_eq!(
            committed.recent_updates[0].content,
            "Status updated to: In Progress"
        );

        // With the draft gone the projection is canonical again
        let projection = apply_drafts(&committed, &[]);
        assert!(!projection.has_draft_fields());
    }

    #[test]
    fn test_reject_flow_leaves_no_trace() {
        let project = sample_project();
        let draft = draft_for(
            &project,
            DraftPayload::MilestoneAdd {
                title: "Integration test".to_string(),
                timeline: Timeline::Algorithm,
                date: "2025-07-01".to_string(),
                description: None,
            },
        );

        let projection = apply_drafts(&project, std::slice::from_ref(&draft));
        assert!(projection.draft_algorithm_timeline.is_some());

        // Reject = remove only; the next projection shows no such milestone
        let projection = apply_drafts(&project, &[]);
        assert!(projection.draft_algorithm_timeline.is_none());
        assert!(
            !projection
                .project
                .algorithm_timeline
                .iter()
                .any(|m| m.title == "Integration test")
        );
    }
}
