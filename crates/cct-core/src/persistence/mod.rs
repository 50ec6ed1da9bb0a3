//! Persistence layer.
//!
//! # Data Model Overview
//!
//! CCT persists two kinds of JSON state:
//!
//! ```text
//! <config_dir>/
//! └── projects.json           # Active project list (path + display name)
//!
//! <project>/.cct/
//! └── sessions.json           # { projectId, sessions: [...] }
//! ```
//!
//! # Design Principles
//!
//! - **Lazy loading**: per-project metadata is read on first access and cached
//! - **Write-through**: every mutation is persisted synchronously so session
//!   bookkeeping survives an abrupt process kill
//! - **Atomic writes**: write to a temp file, then rename
//! - **Local recovery**: corrupt files never escalate; `projectId` is salvaged
//!   whenever it alone is parseable

pub mod projects;
pub mod sessions;

pub use projects::{
    add_project, find_project_by_path, load_project_registry, remove_project,
    save_project_registry, Project, ProjectRegistry,
};
pub use sessions::{PersistedSession, ProjectSessionStore};
