//! Active project list persistence.
//!
//! The list of projects the user has added lives in `projects.json` under the
//! application config directory. Removing a project only drops it from this
//! list; the project directory's own `.cct` metadata (and its `projectId`)
//! stays untouched so re-adding the same path recovers the same identity.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A directory the user has added. Identity (`projectId`) is owned by the
/// project's `.cct` metadata, not by this list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub path: String,
    /// Display name, derived from the path's final component.
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectRegistry {
    pub projects: Vec<Project>,
}

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Save the project list to `{dir}/projects.json` atomically.
pub fn save_project_registry(dir: &Path, registry: &ProjectRegistry) -> Result<(), ProjectError> {
    fs::create_dir_all(dir)?;

    let file_path = dir.join("projects.json");
    let temp_path = dir.join("projects.json.tmp");

    let json = serde_json::to_string_pretty(registry)?;
    fs::write(&temp_path, &json)?;
    fs::rename(&temp_path, &file_path)?;

    Ok(())
}

/// Load the project list from `{dir}/projects.json`.
/// A missing or unreadable file yields an empty registry.
pub fn load_project_registry(dir: &Path) -> ProjectRegistry {
    let path = dir.join("projects.json");
    match fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
            log::warn!("Corrupt project list at {}: {}", path.display(), e);
            ProjectRegistry::default()
        }),
        Err(_) => ProjectRegistry::default(),
    }
}

/// Find a project by path.
pub fn find_project_by_path<'a>(registry: &'a ProjectRegistry, path: &str) -> Option<&'a Project> {
    registry.projects.iter().find(|p| p.path == path)
}

/// Add a project by path, deduplicating on the path. Returns the stored
/// entry either way.
pub fn add_project<'a>(registry: &'a mut ProjectRegistry, path: &str) -> &'a Project {
    if let Some(idx) = registry.projects.iter().position(|p| p.path == path) {
        return &registry.projects[idx];
    }

    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string();
    registry.projects.push(Project {
        path: path.to_string(),
        name,
    });
    registry.projects.last().unwrap()
}

/// Remove a project from the active list. The project directory's `.cct`
/// metadata is deliberately left alone.
pub fn remove_project(registry: &mut ProjectRegistry, path: &str) {
    registry.projects.retain(|p| p.path != path);
}

// ============================================================================
// TESTS
// ============================================================================
