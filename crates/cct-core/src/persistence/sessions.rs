//! Per-project session metadata (`.cct/sessions.json`).
//!
//! Each project directory gets a `.cct/` directory holding a `sessions.json`
//! with a stable `projectId` (UUID, generated once and never rewritten while
//! the file exists) and the list of sessions that should be restored on next
//! launch. The list is not a history log: rows disappear when their session
//! exits or is closed by the user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};
use uuid::Uuid;

use crate::session::SessionType;

const CONFIG_DIR: &str = ".cct";
const CONFIG_FILE: &str = "sessions.json";

/// One row of a project's persisted session list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    /// The logical session id (UUID), stable across respawns.
    pub id: String,

    /// The process-local terminal id the session had at time of last save.
    pub terminal_id: u64,

    #[serde(rename = "type")]
    pub session_type: SessionType,

    /// Resume token for agent sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_resume_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// The full contents of `.cct/sessions.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub project_id: String,
    #[serde(default)]
    pub sessions: Vec<PersistedSession>,
}

/// Write-through store of per-project session metadata, cached per project
/// path after first access.
#[derive(Default)]
pub struct ProjectSessionStore {
    cache: Mutex<HashMap<PathBuf, ProjectConfig>>,
}

impl ProjectSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stable UUID identifying a project, creating the metadata file on
    /// first access. Idempotent: an existing `projectId` is never
    /// regenerated, even when the rest of the file is malformed.
    pub fn get_or_create_project_id(&self, project_path: &str) -> String {
        self.with_config(project_path, |config| config.project_id.clone())
    }

    /// Append a session row and persist.
    pub fn record_session(
        &self,
        project_path: &str,
        session_id: &str,
        terminal_id: u64,
        session_type: SessionType,
        agent_resume_id: Option<&str>,
    ) {
        self.mutate(project_path, |config| {
            config.sessions.push(PersistedSession {
                id: session_id.to_string(),
                terminal_id,
                session_type,
                agent_resume_id: agent_resume_id.map(str::to_string),
                created_at: Utc::now(),
            });
        });
    }

    /// Remove the row for a terminal id and persist. No-op when absent.
    pub fn remove_session(&self, project_path: &str, terminal_id: u64) {
        self.mutate(project_path, |config| {
            config.sessions.retain(|s| s.terminal_id != terminal_id);
        });
    }

    /// Snapshot of the persisted session rows for a project.
    pub fn list_sessions(&self, project_path: &str) -> Vec<PersistedSession> {
        self.with_config(project_path, |config| config.sessions.clone())
    }

    /// Drop every session row (keeps `projectId` intact) and persist.
    pub fn clear_sessions(&self, project_path: &str) {
        self.mutate(project_path, |config| {
            config.sessions.clear();
        });
    }

    fn with_config<R>(&self, project_path: &str, f: impl FnOnce(&ProjectConfig) -> R) -> R {
        let mut cache = self.cache.lock().unwrap();
        let config = Self::load_into(&mut cache, project_path);
        f(config)
    }

    fn mutate(&self, project_path: &str, f: impl FnOnce(&mut ProjectConfig)) {
        let mut cache = self.cache.lock().unwrap();
        let config = Self::load_into(&mut cache, project_path);
        f(config);
        save_config(Path::new(project_path), config);
    }

    /// Load (or lazily initialize) the cached config for a project path.
    /// First load also writes the file so the `projectId` is durable from
    /// the moment it is handed out.
    fn load_into<'a>(
        cache: &'a mut HashMap<PathBuf, ProjectConfig>,
        project_path: &str,
    ) -> &'a mut ProjectConfig {
        let key = PathBuf::from(project_path);
        if !cache.contains_key(&key) {
            let config = load_config(&key);
            save_config(&key, &config);
            cache.insert(key.clone(), config);
        }
        cache.get_mut(&key).unwrap()
    }
}

fn config_file(project_path: &Path) -> PathBuf {
    project_path.join(CONFIG_DIR).join(CONFIG_FILE)
}

/// Read a project's config, recovering locally from any corruption.
///
/// A malformed `sessions` array is reset to empty while a parseable
/// `projectId` is preserved; only when nothing is salvageable is a fresh id
/// generated.
fn load_config(project_path: &Path) -> ProjectConfig {
    let path = config_file(project_path);

    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(_) => {
            return ProjectConfig {
                project_id: Uuid::new_v4().to_string(),
                sessions: Vec::new(),
            }
        }
    };

    match serde_json::from_str::<ProjectConfig>(&contents) {
        Ok(config) => config,
        Err(e) => {
            log::warn!(
                "Corrupt session metadata at {}: {}; resetting sessions",
                path.display(),
                e
            );
            let salvaged_id = serde_json::from_str::<serde_json::Value>(&contents)
                .ok()
                .and_then(|v| v.get("projectId").and_then(|id| id.as_str().map(String::from)));
            ProjectConfig {
                project_id: salvaged_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                sessions: Vec::new(),
            }
        }
    }
}

/// Write-through save: temp file + rename. Failures are logged, not fatal;
/// the cache stays ahead of disk and the next mutation retries.
fn save_config(project_path: &Path, config: &ProjectConfig) {
    let dir = project_path.join(CONFIG_DIR);
    if let Err(e) = fs::create_dir_all(&dir) {
        log::warn!("Failed to create {}: {}", dir.display(), e);
        return;
    }

    let file_path = dir.join(CONFIG_FILE);
    let temp_path = dir.join(format!("{}.tmp", CONFIG_FILE));

    let json = match serde_json::to_string_pretty(config) {
        Ok(json) => json,
        Err(e) => {
            log::warn!("Failed to serialize session metadata: {}", e);
            return;
        }
    };

    if let Err(e) = fs::write(&temp_path, &json).and_then(|_| fs::rename(&temp_path, &file_path)) {
        log::warn!(
            "Failed to write session metadata at {}: {}",
            file_path.display(),
            e
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn path_str(dir: &tempfile::TempDir) -> String {
        dir.path().to_str().unwrap().to_string()
    }

    #[test]
    fn project_id_is_created_and_stable() {
        let dir = tempdir().unwrap();
        let store = ProjectSessionStore::new();

        let first = store.get_or_create_project_id(&path_str(&dir));
        let second = store.get_or_create_project_id(&path_str(&dir));
        assert_eq!(first, second);

        // A fresh store (simulating process restart) reads the same id back.
        let fresh = ProjectSessionStore::new();
        assert_eq!(fresh.get_or_create_project_id(&path_str(&dir)), first);
    }

    #[test]
    fn first_access_writes_metadata_file() {
        let dir = tempdir().unwrap();
        let store = ProjectSessionStore::new();
        store.get_or_create_project_id(&path_str(&dir));

        assert!(dir.path().join(".cct/sessions.json").exists());
    }

    #[test]
    fn record_and_list_sessions() {
        let dir = tempdir().unwrap();
        let store = ProjectSessionStore::new();
        let project = path_str(&dir);

        store.record_session(&project, "sess-a", 1, SessionType::Agent, Some("resume-a"));
        store.record_session(&project, "sess-b", 2, SessionType::Shell, None);

        let sessions = store.list_sessions(&project);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "sess-a");
        assert_eq!(sessions[0].agent_resume_id.as_deref(), Some("resume-a"));
        assert_eq!(sessions[1].session_type, SessionType::Shell);
        assert!(sessions[1].agent_resume_id.is_none());
    }

    #[test]
    fn remove_session_by_terminal_id() {
        let dir = tempdir().unwrap();
        let store = ProjectSessionStore::new();
        let project = path_str(&dir);

        store.record_session(&project, "sess-a", 1, SessionType::Shell, None);
        store.record_session(&project, "sess-b", 2, SessionType::Shell, None);
        store.remove_session(&project, 1);

        let sessions = store.list_sessions(&project);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].terminal_id, 2);

        // Removing an unknown id is a no-op.
        store.remove_session(&project, 99);
        assert_eq!(store.list_sessions(&project).len(), 1);
    }

    #[test]
    fn clear_sessions_keeps_project_id() {
        let dir = tempdir().unwrap();
        let store = ProjectSessionStore::new();
        let project = path_str(&dir);

        let id = store.get_or_create_project_id(&project);
        store.record_session(&project, "sess-a", 1, SessionType::Shell, None);
        store.clear_sessions(&project);

        assert!(store.list_sessions(&project).is_empty());
        assert_eq!(store.get_or_create_project_id(&project), id);
    }

    #[test]
    fn mutations_are_written_through() {
        let dir = tempdir().unwrap();
        let project = path_str(&dir);

        {
            let store = ProjectSessionStore::new();
            store.record_session(&project, "sess-a", 1, SessionType::Agent, Some("r-1"));
        }

        // A different store instance sees the row on disk.
        let fresh = ProjectSessionStore::new();
        let sessions = fresh.list_sessions(&project);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "sess-a");
    }

    #[test]
    fn persisted_format_is_camel_case() {
        let dir = tempdir().unwrap();
        let store = ProjectSessionStore::new();
        let project = path_str(&dir);

        store.record_session(&project, "sess-a", 7, SessionType::Agent, Some("r-1"));

        let raw = fs::read_to_string(dir.path().join(".cct/sessions.json")).unwrap();
        assert!(raw.contains("\"projectId\""));
        assert!(raw.contains("\"terminalId\": 7"));
        assert!(raw.contains("\"type\": \"agent\""));
        assert!(raw.contains("\"agentResumeId\": \"r-1\""));
        assert!(raw.contains("\"createdAt\""));
    }

    #[test]
    fn corrupt_file_preserves_parseable_project_id() {
        let dir = tempdir().unwrap();
        let cct = dir.path().join(".cct");
        fs::create_dir_all(&cct).unwrap();
        fs::write(
            cct.join("sessions.json"),
            r#"{"projectId": "keep-me", "sessions": "not-an-array"}"#,
        )
        .unwrap();

        let store = ProjectSessionStore::new();
        let project = path_str(&dir);

        assert_eq!(store.get_or_create_project_id(&project), "keep-me");
        assert!(store.list_sessions(&project).is_empty());
    }

    #[test]
    fn unparseable_file_generates_fresh_id() {
        let dir = tempdir().unwrap();
        let cct = dir.path().join(".cct");
        fs::create_dir_all(&cct).unwrap();
        fs::write(cct.join("sessions.json"), "not json at all").unwrap();

        let store = ProjectSessionStore::new();
        let id = store.get_or_create_project_id(&path_str(&dir));
        assert!(!id.is_empty());

        // The salvaged config is re-saved, so the fresh id is now durable.
        let fresh = ProjectSessionStore::new();
        assert_eq!(fresh.get_or_create_project_id(&path_str(&dir)), id);
    }

    #[test]
    fn missing_sessions_array_is_tolerated() {
        let dir = tempdir().unwrap();
        let cct = dir.path().join(".cct");
        fs::create_dir_all(&cct).unwrap();
        fs::write(cct.join("sessions.json"), r#"{"projectId": "solo"}"#).unwrap();

        let store = ProjectSessionStore::new();
        assert_eq!(store.get_or_create_project_id(&path_str(&dir)), "solo");
        assert!(store.list_sessions(&path_str(&dir)).is_empty());
    }

    #[test]
    fn stores_are_partitioned_per_project() {
        let dir_a = tempdir().unwrap();
        let dir_b = tempdir().unwrap();
        let store = ProjectSessionStore::new();

        store.record_session(&path_str(&dir_a), "sess-a", 1, SessionType::Shell, None);
        store.record_session(&path_str(&dir_b), "sess-b", 2, SessionType::Shell, None);

        assert_eq!(store.list_sessions(&path_str(&dir_a)).len(), 1);
        assert_eq!(store.list_sessions(&path_str(&dir_b)).len(), 1);
        assert_ne!(
            store.get_or_create_project_id(&path_str(&dir_a)),
            store.get_or_create_project_id(&path_str(&dir_b))
        );
    }
}
