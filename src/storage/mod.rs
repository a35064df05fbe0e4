//! Storage layer for Quarterdeck data.
//!
//! Persistence is two whole-collection JSON blobs in a per-user data
//! directory:
//!
//! - `projects.json` - canonical project records
//! - `drafts.json` - pending draft changes
//!
//! Blobs are read and written in full; there is no query layer and no
//! transactional guarantee beyond write-temp-then-rename. Records that fail
//! to decode are skipped on load so a stray malformed entry never takes the
//! whole store down.

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::{DraftChange, Milestone, Project, Update};
use crate::{Error, Result};

const PROJECTS_FILE: &str = "projects.json";
const DRAFTS_FILE: &str = "drafts.json";

/// ID prefix for project records.
pub const PROJECT_ID_PREFIX: &str = "qd";
/// ID prefix for committed milestones.
pub const MILESTONE_ID_PREFIX: &str = "qdm";
/// ID prefix for update-log rows.
pub const UPDATE_ID_PREFIX: &str = "qdu";

/// Storage manager rooted at a data directory.
pub struct Storage {
    /// Root directory holding the JSON blobs
    pub root: PathBuf,
}

impl Storage {
    /// Open existing storage at the given data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        if !data_dir.join(PROJECTS_FILE).exists() {
            return Err(Error::NotInitialized);
        }
        Ok(Self {
            root: data_dir.to_path_buf(),
        })
    }

    /// Initialize storage at the given data directory.
    pub fn init(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;

        let storage = Self {
            root: data_dir.to_path_buf(),
        };

        // Create empty collection blobs
        for file in [PROJECTS_FILE, DRAFTS_FILE] {
            let path = storage.root.join(file);
            if !path.exists() {
                storage.write_blob(file, "[]")?;
            }
        }

        Ok(storage)
    }

    /// Check if storage exists at the given data directory.
    pub fn exists(data_dir: &Path) -> bool {
        data_dir.join(PROJECTS_FILE).exists()
    }

    // === Collection I/O ===

    /// Read a whole collection, skipping records that fail to decode.
    fn load_records<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let raw = fs::read_to_string(self.root.join(file))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<serde_json::Value> = serde_json::from_str(&raw)?;
        let mut records = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<T>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(file, error = %e, "skipping undecodable record");
                }
            }
        }
        Ok(records)
    }

    /// Replace a whole collection.
    fn save_records<T: Serialize>(&mut self, file: &str, records: &[T]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;
        self.write_blob(file, &json)
    }

    /// Write a blob via temp file + rename so a crash never truncates it.
    fn write_blob(&self, file: &str, contents: &str) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(self.root.join(file))
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    // === Project Operations ===

    /// Load all projects.
    pub fn load_projects(&self) -> Result<Vec<Project>> {
        self.load_records(PROJECTS_FILE)
    }

    /// Replace the project collection.
    pub fn save_projects(&mut self, projects: &[Project]) -> Result<()> {
        self.save_records(PROJECTS_FILE, projects)
    }

    /// Get a project by ID.
    pub fn get_project(&self, id: &str) -> Result<Project> {
        self.load_projects()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))
    }

    /// Insert or replace a project by ID.
    pub fn update_project(&mut self, project: &Project) -> Result<()> {
        let mut projects = self.load_projects()?;
        match projects.iter().position(|p| p.id == project.id) {
            Some(index) => projects[index] = project.clone(),
            None => projects.push(project.clone()),
        }
        self.save_projects(&projects)
    }

    // === Draft Operations ===

    /// Load all pending drafts, in insertion order.
    pub fn load_drafts(&self) -> Result<Vec<DraftChange>> {
        self.load_records(DRAFTS_FILE)
    }

    /// Replace the draft collection.
    pub fn save_drafts(&mut self, drafts: &[DraftChange]) -> Result<()> {
        self.save_records(DRAFTS_FILE, drafts)
    }

    /// Get a pending draft by ID.
    pub fn get_draft(&self, id: &str) -> Result<DraftChange> {
        self.load_drafts()?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::NotFound(format!("Draft not found: {}", id)))
    }

    /// Append a draft to the pending set.
    pub fn add_draft(&mut self, draft: &DraftChange) -> Result<()> {
        let mut drafts = self.load_drafts()?;
        drafts.push(draft.clone());
        self.save_drafts(&drafts)
    }

    /// Remove a draft from the pending set. Removal is unconditional: a
    /// missing ID is not an error.
    pub fn remove_draft(&mut self, id: &str) -> Result<()> {
        let mut drafts = self.load_drafts()?;
        drafts.retain(|d| d.id != id);
        self.save_drafts(&drafts)
    }

    /// Pending drafts targeting the given project, in insertion order.
    pub fn drafts_for(&self, project_id: &str) -> Result<Vec<DraftChange>> {
        Ok(self
            .load_drafts()?
            .into_iter()
            .filter(|d| d.project_id == project_id)
            .collect())
    }

    /// Drop every pending draft for the given project (or all drafts when
    /// `project_id` is `None`). Returns how many were removed.
    pub fn clear_drafts(&mut self, project_id: Option<&str>) -> Result<usize> {
        let drafts = self.load_drafts()?;
        let before = drafts.len();
        let kept: Vec<DraftChange> = match project_id {
            Some(pid) => drafts.into_iter().filter(|d| d.project_id != pid).collect(),
            None => Vec::new(),
        };
        let removed = before - kept.len();
        self.save_drafts(&kept)?;
        Ok(removed)
    }

    // === Seeding ===

    /// Seed the sample project when the store is empty. Returns true if a
    /// project was seeded.
    pub fn seed_sample_data(&mut self) -> Result<bool> {
        if !self.load_projects()?.is_empty() {
            return Ok(false);
        }

        let now = Utc::now();
        let mut project = Project::new(
            generate_id(PROJECT_ID_PREFIX, "sample"),
            "AI Model Deployment Project".to_string(),
        );
        project.description =
            "Developing and deploying a new recommendation algorithm for production use."
                .to_string();
        project.status = "In Progress".to_string();
        project.anticipated_next_update = "2025-06-01 - Architecture review meeting".to_string();
        project.recent_updates.push(Update {
            id: generate_id(UPDATE_ID_PREFIX, "seed"),
            timestamp: now,
            content: "Project initialized with baseline requirements".to_string(),
            is_draft: false,
        });
        project.algorithm_timeline.push(Milestone {
            id: generate_id(MILESTONE_ID_PREFIX, "baseline"),
            title: "Baseline model trained".to_string(),
            date: "2025-05-30".to_string(),
            description: Some("Initial model training completed".to_string()),
            completed: false,
        });
        project.it_deployment_timeline.push(Milestone {
            id: generate_id(MILESTONE_ID_PREFIX, "dev-env"),
            title: "Dev environment setup".to_string(),
            date: "2025-05-25".to_string(),
            description: Some("Development infrastructure configured".to_string()),
            completed: true,
        });

        self.save_projects(&[project])?;
        Ok(true)
    }
}

/// Resolve the data directory: explicit flag (or QD_DATA_DIR via clap) wins,
/// then the platform data dir.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(default_data_dir)
}

/// Platform default data directory, e.g. `~/.local/share/quarterdeck`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("QD_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir()
        .map(|d| d.join("quarterdeck"))
        .unwrap_or_else(|| PathBuf::from(".quarterdeck"))
}

/// Generate a short hash-based ID with the given prefix.
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..4])
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str, prefix: &str) -> Result<()> {
    let Some(suffix) = id.strip_prefix(&format!("{}-", prefix)) else {
        return Err(Error::InvalidId(format!(
            "ID must start with '{}-', got: {}",
            prefix, id
        )));
    };
    if suffix.len() != 4 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be 4 hex characters, got: {}",
            id
        )));
    }
    Ok(())
}
