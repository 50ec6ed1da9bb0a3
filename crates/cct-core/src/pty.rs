//! PTY (pseudo-terminal) process wrapper.
//!
//! One [`PtyProcess`] owns one native pseudo-terminal and its child process.
//! Raw output chunks and the final exit code are delivered through a channel
//! supplied at spawn time; the reader thread sends [`PtyMsg::Exit`] exactly
//! once, after the last chunk, even when `kill` is called repeatedly or the
//! process dies on its own.

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::{
    io::{Read, Write},
    sync::{mpsc::Sender, Arc, Mutex},
    thread,
};
use thiserror::Error;

use crate::shell;

/// Messages flowing from the reader thread to the per-session pump.
#[derive(Debug)]
pub enum PtyMsg {
    /// A raw output chunk read from the PTY master.
    Data(Vec<u8>),
    /// The child terminated with this exit code. Always the last message.
    Exit(i32),
}

#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("Failed to open PTY: {0}")]
    OpenPty(String),

    #[error("Failed to spawn command '{command}': {reason}")]
    Spawn { command: String, reason: String },
}

/// Configuration for spawning a PTY-backed process.
pub struct PtySpawnConfig {
    /// Command to run; the login shell when None.
    pub command: Option<String>,
    pub args: Vec<String>,
    pub cwd: String,
    pub cols: u16,
    pub rows: u16,
    /// Per-session variables layered on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

/// Holds the PTY master, child process, and writer handle.
/// The master must be kept alive to prevent the PTY from closing.
pub struct PtyProcess {
    master: Mutex<Box<dyn MasterPty + Send>>,
    child: Arc<Mutex<Box<dyn Child + Send + Sync>>>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl PtyProcess {
    /// Spawn a process attached to a fresh PTY.
    ///
    /// Output chunks and the exit notification arrive on `msg_tx`. Spawn
    /// failures (unresolvable command, PTY allocation) are returned
    /// synchronously; nothing is left running on error.
    pub fn spawn(config: PtySpawnConfig, msg_tx: Sender<PtyMsg>) -> Result<Self, SpawnError> {
        let command = config.command.unwrap_or_else(shell::login_shell);

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: config.rows,
                cols: config.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SpawnError::OpenPty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&command);
        cmd.args(&config.args);
        cmd.cwd(&config.cwd);
        shell::apply_session_env(&mut cmd, &config.env);

        let child = pair.slave.spawn_command(cmd).map_err(|e| SpawnError::Spawn {
            command: command.clone(),
            reason: e.to_string(),
        })?;

        // Drop slave - we only need the master side
        drop(pair.slave);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| SpawnError::OpenPty(e.to_string()))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| SpawnError::OpenPty(e.to_string()))?;

        let child = Arc::new(Mutex::new(child));

        // Reader thread: drain the master to EOF, then reap the child for
        // its exit code. This is the only place PtyMsg::Exit is produced.
        let child_for_wait = Arc::clone(&child);
        thread::spawn(move || {
            let mut reader = reader;
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break, // EOF
                    Ok(n) => {
                        if msg_tx.send(PtyMsg::Data(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }

            let exit_code = match child_for_wait.lock() {
                Ok(mut child) => match child.wait() {
                    Ok(status) => status.exit_code() as i32,
                    Err(_) => -1,
                },
                Err(_) => -1,
            };
            let _ = msg_tx.send(PtyMsg::Exit(exit_code));
        });

        Ok(Self {
            master: Mutex::new(pair.master),
            child,
            writer: Mutex::new(writer),
        })
    }

    /// Write input bytes to the process.
    pub fn write(&self, data: &[u8]) {
        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writer.write_all(data).and_then(|_| writer.flush()) {
                log::debug!("PTY write after close ignored: {}", e);
            }
        }
    }

    /// Resize the terminal.
    ///
    /// Resizing a PTY whose fd already closed is a normal race with process
    /// exit and is quietly ignored.
    pub fn resize(&self, cols: u16, rows: u16) {
        if let Ok(master) = self.master.lock() {
            if let Err(e) = master.resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            }) {
                log::debug!("PTY resize after exit ignored: {}", e);
            }
        }
    }

    /// Request termination of the child process.
    ///
    /// Safe to call repeatedly and after the process has already died; the
    /// exit notification is still delivered exactly once, by the reader
    /// thread.
    pub fn kill(&self) {
        if let Ok(mut child) = self.child.lock() {
            let _ = child.kill();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
