//! Game Logic Module
//!
//! Combat state and resolution. Deterministic given the dice stream.
//!
//! ## Module Structure
//!
//! - `catalog`: Character roster (declarative table keyed by id)
//! - `battle`: The single shared battle state
//! - `combat`: Attack resolution algorithm
//! - `dice`: Server-owned Xorshift128+ dice

pub mod battle;
pub mod catalog;
pub mod combat;
pub mod dice;

// Re-export key types
pub use battle::{BattleMode, BattleSession, Side};
pub use catalog::{CharacterCatalog, CharacterProfile, CustomProfile};
pub use combat::{resolve_attack, AttackOutcome, LogLine, RollHint, PROFICIENCY_BONUS};
pub use dice::DiceRng;
