//! Network Layer
//!
//! WebSocket server for real-time multiplayer. This layer is
//! **non-deterministic** - every game decision runs through `game/`; the
//! network only carries inputs in and outcomes out.

pub mod protocol;
pub mod session;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage, FighterInput, ErrorCode};
pub use session::{ArenaSession, SessionId, SessionConfig, SessionCommand, SessionError, run_session};
pub use server::{ArenaServer, ServerConfig, ServerError};
