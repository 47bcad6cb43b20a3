//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are serialized as JSON, tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::game::battle::{BattleSession, Side};
use crate::game::catalog::CustomProfile;
use crate::game::combat::AttackOutcome;
pub use crate::network::registry::Role;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the arena in a given mode.
    JoinGame(JoinRequest),

    /// Offer a pvp challenge to whoever accepts first.
    SendChallenge(ProfileSelection),

    /// Accept the pending challenge.
    AcceptChallenge(ProfileSelection),

    /// Attack on the caller's turn.
    Attack(AttackRequest),

    /// Relay a chat line.
    SendChat {
        /// Raw chat text; trimmed and truncated server-side.
        text: String,
    },

    /// Reset the battle to its template.
    ResetGame,

    /// Reclaim a hero/enemy slot after a transport reconnect.
    CheckRejoin,
}

/// Requested join mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Fight another connection.
    Pvp,
    /// Fight the computer.
    Pve,
    /// Watch only.
    Spectate,
}

/// Join request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Requested mode.
    pub mode: JoinMode,
    /// Catalog id for the requester's combatant.
    #[serde(default)]
    pub char_id: Option<String>,
    /// Caller-defined combatant, sanitized before use.
    #[serde(default)]
    pub custom_profile: Option<CustomProfile>,
    /// Catalog id for the pve opponent.
    #[serde(default)]
    pub enemy_id: Option<String>,
}

/// Combatant selection for challenge messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSelection {
    /// Catalog id.
    #[serde(default)]
    pub char_id: Option<String>,
    /// Caller-defined combatant, sanitized before use.
    #[serde(default)]
    pub custom_profile: Option<CustomProfile>,
}

/// Attack payload. Both fields are display hints from a client-local
/// dice animation, never authoritative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AttackRequest {
    /// Claimed d20 result.
    #[serde(default)]
    pub roll: Option<i64>,
    /// Claimed damage total.
    #[serde(default)]
    pub damage: Option<i64>,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Role assignment plus current state, after join/rejoin/accept.
    Welcome {
        /// Assigned role.
        role: Role,
        /// Current battle snapshot.
        state: BattleSession,
    },

    /// Battle snapshot after an attack or reset.
    GameUpdate(GameUpdate),

    /// Lobby summary after any registry or session transition.
    LobbyStats(LobbyStats),

    /// A pvp challenge is pending.
    ChallengeReceived,

    /// The pending challenge went away.
    ChallengeCanceled,

    /// A participant's connection dropped mid-match.
    PlayerLeft {
        /// The vacated role.
        role: Role,
    },

    /// Chat relay.
    ChatMessage {
        /// Sender's capacity.
        role: ChatRole,
        /// Trimmed, truncated text.
        text: String,
    },

    /// The request was dropped without touching shared state.
    ActionRejected {
        /// Machine-readable reason.
        reason: RejectReason,
    },
}

/// Battle snapshot broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameUpdate {
    /// Full post-mutation battle state.
    pub state: BattleSession,
    /// The resolution that produced this state, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<AttackOutcome>,
    /// Set when this update is a reset to the template.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reset: bool,
}

/// Lobby summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyStats {
    /// Total live connections.
    pub connected: usize,
    /// Whether a match currently occupies the arena.
    pub game_in_progress: bool,
}

/// Chat sender capacity. Mirrors [`Role`] plus the computer opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// Hero-side participant.
    Hero,
    /// Enemy-side participant.
    Enemy,
    /// Watching connection.
    Spectator,
    /// The computer opponent.
    Bot,
}

impl From<Role> for ChatRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Hero => ChatRole::Hero,
            Role::Enemy => ChatRole::Enemy,
            Role::Spectator | Role::Unassigned => ChatRole::Spectator,
        }
    }
}

impl From<Side> for Role {
    fn from(side: Side) -> Self {
        match side {
            Side::Hero => Role::Hero,
            Side::Enemy => Role::Enemy,
        }
    }
}

/// Why a request was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Attack from a side whose turn it is not.
    NotYourTurn,
    /// Attack after the battle ended.
    GameOver,
    /// Attack or reset from a connection holding no combat role.
    NotInMatch,
    /// Accept with no challenge pending.
    NoPendingChallenge,
    /// Accept after the challenger disconnected.
    ChallengerGone,
    /// Accepting one's own challenge.
    OwnChallenge,
    /// Empty or whitespace-only chat.
    EmptyChat,
    /// Message could not be parsed.
    Malformed,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
