//! Live session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a session runs: the resumable CLI agent or a plain login shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Agent,
    Shell,
}

impl Default for SessionType {
    fn default() -> Self {
        SessionType::Shell
    }
}

/// One live PTY-backed unit of interactive work.
///
/// Owned exclusively by the multiplexer registry; the project session store
/// persists only a denormalized record of it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Process-local id, monotonically increasing, never reused within a
    /// process run.
    pub id: u64,

    /// Random token stable for the logical session across respawns.
    pub session_id: String,

    /// Resume token for the agent session type; set once at first spawn and
    /// reused on every respawn of the same conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_resume_id: Option<String>,

    pub session_type: SessionType,

    /// Absolute path of the project this session is scoped to.
    pub project_path: String,

    pub cols: u16,
    pub rows: u16,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SessionType::Agent).unwrap(), "\"agent\"");
        assert_eq!(serde_json::to_string(&SessionType::Shell).unwrap(), "\"shell\"");
    }

    #[test]
    fn session_type_deserializes() {
        let t: SessionType = serde_json::from_str("\"shell\"").unwrap();
        assert_eq!(t, SessionType::Shell);
    }

    #[test]
    fn session_serializes_camel_case() {
        let session = Session {
            id: 1,
            session_id: "sess-uuid".to_string(),
            agent_resume_id: None,
            session_type: SessionType::Shell,
            project_path: "/tmp/p".to_string(),
            cols: 80,
            rows: 24,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"sessionId\":\"sess-uuid\""));
        assert!(json.contains("\"projectPath\""));
        // None resume id is omitted entirely
        assert!(!json.contains("agentResumeId"));
    }
}
