//! Network Layer
//!
//! WebSocket server for real-time battle coordination.
//! This layer is **non-deterministic** - combat resolution itself runs
//! through `game/`.

pub mod arena;
pub mod protocol;
pub mod registry;
pub mod server;

pub use arena::{Arena, ArenaConfig, ChallengeRequest, SharedArena};
pub use protocol::{
    ClientMessage, GameUpdate, JoinMode, JoinRequest, LobbyStats, RejectReason, ServerMessage,
};
pub use registry::{ConnectionId, ConnectionRegistry, Role, SlotState};
pub use server::{ArenaServer, ArenaServerError, ServerConfig};
