//! Session multiplexing: live session state and the registry that owns it.

pub mod multiplexer;
pub mod state;

pub use multiplexer::{CreateParams, CreateResult, MultiplexerConfig, SessionMultiplexer};
pub use state::{Session, SessionType};
