//! SessionMultiplexer - the single authority for session lifecycle.
//!
//! Maps integer session ids to PTY wrapper + batcher pairs, records every
//! session in the project session store, and delivers output/exit events
//! through the [`EventBus`]. A per-session pump thread drives the adaptive
//! batcher and is the only producer of that session's events, which makes
//! "data before exit, exit exactly once" structural rather than a convention.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc, Arc, Mutex,
    },
    thread,
    time::Instant,
};

use chrono::Utc;
use uuid::Uuid;

use crate::batcher::AdaptiveBatcher;
use crate::event_bus::{EventBus, SessionEvent};
use crate::persistence::sessions::ProjectSessionStore;
use crate::pty::{PtyMsg, PtyProcess, PtySpawnConfig, SpawnError};
use crate::shell;

use super::state::{Session, SessionType};

/// Project-scoped identifier injected into every spawned session.
pub const PROJECT_ID_ENV: &str = "CCT_PROJECT_ID";

/// Session-scoped identifier injected into every spawned session, consumable
/// by hook scripts to correlate themselves back to this session.
pub const SESSION_ID_ENV: &str = "CCT_SESSION_ID";

/// Multiplexer-wide settings.
#[derive(Debug, Clone)]
pub struct MultiplexerConfig {
    /// Name (or path) of the resumable agent binary.
    pub agent_binary: String,
}

impl Default for MultiplexerConfig {
    fn default() -> Self {
        Self {
            agent_binary: "claude".to_string(),
        }
    }
}

/// Parameters for creating a session.
#[derive(Debug, Clone, Default)]
pub struct CreateParams {
    pub session_type: SessionType,
    pub cwd: String,
    pub cols: u16,
    pub rows: u16,
    /// Override the spawned command (tests, custom shells). Agent resume
    /// flags are only appended when the command really is the agent binary.
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    /// Resume token of a prior agent conversation to reconnect to.
    pub resume_id: Option<String>,
    /// Logical session id to carry forward; used by the restore path so the
    /// `sessionId` survives respawn. Fresh creations leave this unset.
    pub session_id: Option<String>,
}

/// What the caller gets back from a successful create.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResult {
    pub id: u64,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_resume_id: Option<String>,
}

struct SessionEntry {
    pty: Arc<PtyProcess>,
    session: Session,
}

/// Owns every live session in the process.
///
/// State is partitioned per session id. The registry mutex is held only to
/// look entries up, never across PTY I/O: a write stalled on a wedged child
/// must not block `count`, other sessions, or the `kill` that unwedges it.
pub struct SessionMultiplexer {
    sessions: Mutex<HashMap<u64, SessionEntry>>,
    next_id: AtomicU64,
    shutting_down: AtomicBool,
    event_bus: Arc<EventBus>,
    store: Arc<ProjectSessionStore>,
    config: MultiplexerConfig,
}

impl SessionMultiplexer {
    pub fn new(
        event_bus: Arc<EventBus>,
        store: Arc<ProjectSessionStore>,
        config: MultiplexerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            shutting_down: AtomicBool::new(false),
            event_bus,
            store,
            config,
        })
    }

    /// Create a new session and register it.
    ///
    /// Spawn failures propagate to the caller; nothing is registered or
    /// persisted on error.
    pub fn create(self: &Arc<Self>, params: CreateParams) -> Result<CreateResult, SpawnError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let session_id = params
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let resuming = params.resume_id.is_some();
        let agent_resume_id = match params.session_type {
            SessionType::Agent => Some(
                params
                    .resume_id
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
            ),
            SessionType::Shell => None,
        };

        let project_id = self.store.get_or_create_project_id(&params.cwd);

        let (command, args) = resolve_command_line(
            params.session_type,
            params.command,
            params.args.unwrap_or_default(),
            &self.config.agent_binary,
            agent_resume_id.as_deref(),
            resuming,
        );

        let env = vec![
            (PROJECT_ID_ENV.to_string(), project_id),
            (SESSION_ID_ENV.to_string(), session_id.clone()),
        ];

        let (msg_tx, msg_rx) = mpsc::channel();
        let pty = PtyProcess::spawn(
            PtySpawnConfig {
                command: Some(command),
                args,
                cwd: params.cwd.clone(),
                cols: params.cols,
                rows: params.rows,
                env,
            },
            msg_tx,
        )?;

        let session = Session {
            id,
            session_id: session_id.clone(),
            agent_resume_id: agent_resume_id.clone(),
            session_type: params.session_type,
            project_path: params.cwd.clone(),
            cols: params.cols,
            rows: params.rows,
            created_at: Utc::now(),
        };

        self.sessions
            .lock()
            .unwrap()
            .insert(
                id,
                SessionEntry {
                    pty: Arc::new(pty),
                    session,
                },
            );

        self.store.record_session(
            &params.cwd,
            &session_id,
            id,
            params.session_type,
            agent_resume_id.as_deref(),
        );

        let mux = Arc::clone(self);
        thread::spawn(move || pump(mux, id, msg_rx));

        Ok(CreateResult {
            id,
            session_id,
            agent_resume_id,
        })
    }

    /// Write input to a session. Silent no-op for unregistered ids: a write
    /// racing an in-flight exit is normal.
    ///
    /// The registry lock is released before the write. A child that stops
    /// draining its input can block the caller here, but never the registry.
    pub fn write(&self, id: u64, data: &[u8]) {
        if let Some(pty) = self.pty_for(id) {
            pty.write(data);
        }
    }

    /// Resize a session. Silent no-op for unregistered ids.
    pub fn resize(&self, id: u64, cols: u16, rows: u16) {
        let pty = {
            let mut map = self.sessions.lock().unwrap();
            match map.get_mut(&id) {
                Some(entry) => {
                    entry.session.cols = cols;
                    entry.session.rows = rows;
                    Arc::clone(&entry.pty)
                }
                None => return,
            }
        };
        pty.resize(cols, rows);
    }

    /// Close a session on the user's behalf: forget its persisted record,
    /// then request termination. The registry entry is removed only by the
    /// subsequent exit event so the final output flush is never lost.
    pub fn kill(&self, id: u64) {
        let target = {
            let map = self.sessions.lock().unwrap();
            map.get(&id)
                .map(|entry| (Arc::clone(&entry.pty), entry.session.project_path.clone()))
        };
        if let Some((pty, project_path)) = target {
            self.store.remove_session(&project_path, id);
            pty.kill();
        }
    }

    fn pty_for(&self, id: u64) -> Option<Arc<PtyProcess>> {
        self.sessions
            .lock()
            .unwrap()
            .get(&id)
            .map(|entry| Arc::clone(&entry.pty))
    }

    /// Number of live sessions.
    pub fn count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Snapshot of all live sessions.
    pub fn list(&self) -> Vec<Session> {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .map(|e| e.session.clone())
            .collect()
    }

    /// True when at least one live session is scoped to the given project.
    pub fn has_sessions_for(&self, project_path: &str) -> bool {
        self.sessions
            .lock()
            .unwrap()
            .values()
            .any(|e| e.session.project_path == project_path)
    }

    /// Kill every live session without erasing persisted records, so the
    /// sessions believed to be running right now are exactly the ones
    /// restored on next launch.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        let ptys: Vec<Arc<PtyProcess>> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .map(|entry| Arc::clone(&entry.pty))
            .collect();
        for pty in ptys {
            pty.kill();
        }
    }

    fn handle_exit(&self, id: u64, exit_code: i32) {
        let entry = self.sessions.lock().unwrap().remove(&id);
        if let Some(entry) = entry {
            if !self.shutting_down.load(Ordering::SeqCst) {
                self.store.remove_session(&entry.session.project_path, id);
            }
        }
        self.event_bus.emit(SessionEvent::Exit { id, exit_code });
    }
}

/// Resolve what to actually spawn for a session.
///
/// Agent resume flags are a narrow two-way branch: `--resume` to reattach to
/// a prior conversation, `--session-id` to pin a fresh one. They are only
/// appended when the resolved command's file name matches the agent binary,
/// so an override command never receives flags it does not understand.
fn resolve_command_line(
    session_type: SessionType,
    command: Option<String>,
    mut args: Vec<String>,
    agent_binary: &str,
    agent_resume_id: Option<&str>,
    resuming: bool,
) -> (String, Vec<String>) {
    let command = command.unwrap_or_else(|| match session_type {
        SessionType::Agent => agent_binary.to_string(),
        SessionType::Shell => shell::login_shell(),
    });

    if session_type == SessionType::Agent
        && shell::command_file_name(&command) == shell::command_file_name(agent_binary)
    {
        if let Some(resume_id) = agent_resume_id {
            let flag = if resuming { "--resume" } else { "--session-id" };
            args.push(flag.to_string());
            args.push(resume_id.to_string());
        }
    }

    (command, args)
}

/// Per-session pump: drives the adaptive batcher from raw PTY messages.
///
/// The first chunk after an idle flush arms a deadline one batch interval
/// away; everything arriving before the deadline coalesces into one data
/// event. On exit the remaining buffer is flushed before the exit event.
fn pump(mux: Arc<SessionMultiplexer>, id: u64, rx: mpsc::Receiver<PtyMsg>) {
    let mut batcher = AdaptiveBatcher::new();

    let exit_code = 'idle: loop {
        match rx.recv() {
            Ok(PtyMsg::Data(chunk)) => batcher.push(&chunk),
            Ok(PtyMsg::Exit(code)) => break code,
            Err(_) => break -1,
        }

        let deadline = Instant::now() + batcher.interval();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(PtyMsg::Data(chunk)) => batcher.push(&chunk),
                Ok(PtyMsg::Exit(code)) => break 'idle code,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if let Some(data) = batcher.flush() {
                        mux.event_bus.emit(SessionEvent::Data { id, data });
                    }
                    continue 'idle;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break 'idle -1,
            }
        }
    };

    // Final flush: no output is lost on the terminal boundary.
    if let Some(data) = batcher.flush() {
        mux.event_bus.emit(SessionEvent::Data { id, data });
    }
    mux.handle_exit(id, exit_code);
}

// ============================================================================
// TESTS
// ============================================================================
