//! Session restore on project selection.
//!
//! When a project is (re)selected and none of its sessions are live, any
//! sessions persisted at last shutdown are re-spawned. The persisted list is
//! cleared up front so an interrupted or re-entered restore can never
//! double-spawn; each successful re-creation re-records itself through the
//! normal create path, rebuilding the list.

use std::sync::Arc;

use crate::persistence::sessions::ProjectSessionStore;
use crate::session::{CreateParams, CreateResult, SessionMultiplexer, SessionType};

/// Re-spawn every session persisted for a project.
///
/// No-op when the registry already holds a live session for the project;
/// restore only applies to a project with nothing running yet. Agent
/// sessions are reconnected to their prior conversation via the persisted
/// resume token, and every session keeps its logical `sessionId`.
///
/// Individual spawn failures are skipped: one stale entry (say, a binary no
/// longer on the search path) must not block restoring the rest.
pub fn restore_project(
    mux: &Arc<SessionMultiplexer>,
    store: &ProjectSessionStore,
    project_path: &str,
    cols: u16,
    rows: u16,
) -> Vec<CreateResult> {
    if mux.has_sessions_for(project_path) {
        return Vec::new();
    }

    let entries = store.list_sessions(project_path);
    if entries.is_empty() {
        return Vec::new();
    }

    // Clear before re-creating so a re-entrant restore sees an empty list.
    store.clear_sessions(project_path);

    let mut restored = Vec::with_capacity(entries.len());
    for entry in entries {
        let resume_id = match entry.session_type {
            SessionType::Agent => entry.agent_resume_id.clone(),
            SessionType::Shell => None,
        };

        let params = CreateParams {
            session_type: entry.session_type,
            cwd: project_path.to_string(),
            cols,
            rows,
            command: None,
            args: None,
            resume_id,
            session_id: Some(entry.id.clone()),
        };

        match mux.create(params) {
            Ok(result) => restored.push(result),
            Err(e) => {
                log::warn!(
                    "Skipping restore of session {} for {}: {}",
                    entry.id,
                    project_path,
                    e
                );
            }
        }
    }

    restored
}
