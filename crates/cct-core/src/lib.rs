//! # cct-core
//!
//! Core session-multiplexing logic for CCT, the project-scoped terminal
//! manager.
//!
//! This crate is framework-agnostic and can be driven by:
//! - A desktop shell (via IPC commands)
//! - A daemon (via JSON-RPC)
//! - Tests (directly)
//!
//! ## Key Concepts
//!
//! - **Session**: One live PTY-backed process plus its identifiers and
//!   geometry, multiplexed by an integer id
//! - **Project**: A working directory that owns persisted session history
//! - **Restore**: Re-spawning sessions recorded as "should be running" for a
//!   project after an application restart

pub mod batcher;
pub mod event_bus;
pub mod persistence;
pub mod pty;
pub mod restore;
pub mod session;
pub mod shell;

// Re-export commonly used types
pub use event_bus::{EventBus, SessionEvent};
pub use pty::SpawnError;
pub use session::{
    CreateParams, CreateResult, MultiplexerConfig, Session, SessionMultiplexer, SessionType,
};
