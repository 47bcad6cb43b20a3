//! # Tavern Arena Server
//!
//! Authoritative battle session server: assigns participant roles over
//! live WebSocket connections, runs a two-sided turn-based combat loop
//! with server-owned dice, brokers the pvp challenge handshake, drives
//! the computer opponent on a think delay, and holds a grace window for
//! mid-match disconnects.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TAVERN ARENA SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Combat logic (deterministic under seed)   │
//! │  ├── catalog.rs  - Character roster table                    │
//! │  ├── battle.rs   - The single shared battle state            │
//! │  ├── combat.rs   - Attack resolution algorithm               │
//! │  └── dice.rs     - Xorshift128+ dice, entropy seeding        │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket accept loop                     │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── registry.rs - Connections and role slots                │
//! │  └── arena.rs    - Linearized shared state and timers        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority Guarantee
//!
//! Every outcome-bearing roll is drawn server-side. Client-supplied
//! roll values are clamped and echoed for animation timing only; they
//! never feed the resolution. All shared-state mutations are
//! linearized through one lock, and every broadcast reflects a fully
//! applied mutation.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod game;
pub mod network;

// Re-export commonly used types
pub use game::battle::{BattleMode, BattleSession, Side};
pub use game::catalog::{CharacterCatalog, CharacterProfile};
pub use game::combat::{AttackOutcome, RollHint, PROFICIENCY_BONUS};
pub use game::dice::DiceRng;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default think delay before the computer opponent acts (ms)
pub const AI_THINK_DELAY_MS: u64 = 1800;

/// Default grace window after a mid-match disconnect (seconds)
pub const GRACE_PERIOD_SECS: u64 = 30;

/// Chat lines are truncated to this many characters
pub const CHAT_MAX_LEN: usize = 100;
