//! Arena Coordination
//!
//! The single shared mutable state and every transition on it: role
//! assignment, the challenge handshake, combat resolution, the
//! computer opponent's think delay, and the disconnect grace window.
//!
//! All mutations are linearized through one `Arc<RwLock<Arena>>`.
//! Handlers take the write lock, mutate, collect the messages to send,
//! release the lock, then deliver. No connection ever observes a
//! partially applied snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::game::battle::{BattleMode, BattleSession, Side};
use crate::game::catalog::{CharacterCatalog, CharacterProfile};
use crate::game::combat::{resolve_attack, RollHint};
use crate::game::dice::DiceRng;
use crate::network::protocol::{
    AttackRequest, ChatRole, ClientMessage, GameUpdate, JoinMode, JoinRequest, LobbyStats,
    ProfileSelection, RejectReason, Role, ServerMessage,
};
use crate::network::registry::{ConnectionId, ConnectionRegistry, SlotState};

/// Taunt lines for the computer opponent's chat relay.
const BOT_TAUNTS: &[&str] = &[
    "The Ogre grins and cracks its knuckles.",
    "The Ogre roars!",
    "The Ogre sizes you up for its next meal.",
    "The Ogre pounds the ground impatiently.",
];

/// Timing and limits for arena behavior.
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// Delay before the computer opponent acts. Pacing only.
    pub ai_think_delay: Duration,
    /// Window after a mid-match disconnect before the battle resets.
    pub grace_period: Duration,
    /// Chat lines longer than this are truncated.
    pub chat_max_len: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            ai_think_delay: Duration::from_millis(crate::AI_THINK_DELAY_MS),
            grace_period: Duration::from_secs(crate::GRACE_PERIOD_SECS),
            chat_max_len: crate::CHAT_MAX_LEN,
        }
    }
}

/// A pending pvp invitation. At most one exists at a time.
#[derive(Debug, Clone)]
pub struct ChallengeRequest {
    /// Connection that sent the challenge.
    pub challenger: ConnectionId,
    /// Combatant the challenger will fight as.
    pub profile: CharacterProfile,
    /// When the challenge was issued.
    pub created_at: DateTime<Utc>,
}

/// Shared handle to the arena.
pub type SharedArena = Arc<RwLock<Arena>>;

/// Outbound messages collected under the lock, sent after release.
type Deliveries = Vec<(mpsc::Sender<ServerMessage>, ServerMessage)>;

/// The process-wide arena: connection registry, battle state, pending
/// challenge, dice, and the two cancellable deferred tasks.
pub struct Arena {
    config: ArenaConfig,
    catalog: CharacterCatalog,
    registry: ConnectionRegistry,
    session: BattleSession,
    pending_challenge: Option<ChallengeRequest>,
    dice: DiceRng,
    ai_task: Option<JoinHandle<()>>,
    grace_task: Option<JoinHandle<()>>,
}

impl Arena {
    /// Create an arena with explicit config, catalog and dice.
    pub fn new(config: ArenaConfig, catalog: CharacterCatalog, dice: DiceRng) -> Self {
        let session = BattleSession::initial(&catalog);
        Self {
            config,
            catalog,
            registry: ConnectionRegistry::new(),
            session,
            pending_challenge: None,
            dice,
            ai_task: None,
            grace_task: None,
        }
    }

    /// Create an arena with the built-in catalog and entropy-seeded dice.
    pub fn with_defaults(config: ArenaConfig) -> Self {
        Self::new(config, CharacterCatalog::builtin(), DiceRng::from_entropy())
    }

    /// Wrap into the shared handle the handlers operate on.
    pub fn into_shared(self) -> SharedArena {
        Arc::new(RwLock::new(self))
    }

    /// Number of live connections.
    pub fn connected_count(&self) -> usize {
        self.registry.connected_count()
    }

    /// Current battle snapshot.
    pub fn session(&self) -> &BattleSession {
        &self.session
    }

    /// Whether a challenge is pending.
    pub fn has_pending_challenge(&self) -> bool {
        self.pending_challenge.is_some()
    }

    /// Compute the current lobby summary.
    pub fn lobby_stats(&self) -> LobbyStats {
        let game_in_progress = match self.session.mode {
            BattleMode::Pve => self.registry.slot(Side::Hero).is_engaged(),
            BattleMode::Pvp => {
                self.registry.slot(Side::Hero).is_engaged()
                    && self.registry.slot(Side::Enemy).is_engaged()
            }
        };
        LobbyStats {
            connected: self.registry.connected_count(),
            game_in_progress,
        }
    }

    fn queue_to(&self, out: &mut Deliveries, id: &ConnectionId, msg: ServerMessage) {
        if let Some(tx) = self.registry.sender(id) {
            out.push((tx, msg));
        }
    }

    fn queue_all(&self, out: &mut Deliveries, msg: ServerMessage) {
        for tx in self.registry.senders_all() {
            out.push((tx, msg.clone()));
        }
    }

    fn queue_all_except(&self, out: &mut Deliveries, skip: &ConnectionId, msg: ServerMessage) {
        for tx in self.registry.senders_except(skip) {
            out.push((tx, msg.clone()));
        }
    }

    fn queue_lobby_stats(&self, out: &mut Deliveries) {
        self.queue_all(out, ServerMessage::LobbyStats(self.lobby_stats()));
    }

    fn queue_reject(&self, out: &mut Deliveries, id: &ConnectionId, reason: RejectReason) {
        debug!(connection = %id, ?reason, "request rejected");
        self.queue_to(out, id, ServerMessage::ActionRejected { reason });
    }

    fn queue_update(&self, out: &mut Deliveries, update: GameUpdate) {
        self.queue_all(out, ServerMessage::GameUpdate(update));
    }

    fn queue_reset_update(&self, out: &mut Deliveries) {
        self.queue_update(
            out,
            GameUpdate {
                state: self.session.clone(),
                action: None,
                reset: true,
            },
        );
    }

    fn cancel_ai(&mut self) {
        if let Some(handle) = self.ai_task.take() {
            handle.abort();
        }
    }

    fn cancel_grace(&mut self) {
        if let Some(handle) = self.grace_task.take() {
            handle.abort();
        }
    }

    fn cancel_timers(&mut self) {
        self.cancel_ai();
        self.cancel_grace();
    }

    /// Resolve a profile selection against the catalog, falling back to
    /// `default`. Custom profiles are sanitized, never used raw.
    fn resolve_selection(
        &self,
        selection: &ProfileSelection,
        default: &CharacterProfile,
    ) -> CharacterProfile {
        if let Some(custom) = &selection.custom_profile {
            custom.sanitize(default)
        } else if let Some(id) = &selection.char_id {
            self.catalog.get(id).unwrap_or(default).clone()
        } else {
            default.clone()
        }
    }

    // -------------------------------------------------------------------------
    // Transitions. Each runs synchronously under the caller's write lock
    // and returns the messages to deliver once the lock is released.
    // -------------------------------------------------------------------------

    fn connect(&mut self, id: ConnectionId, sender: mpsc::Sender<ServerMessage>) -> Deliveries {
        self.registry.register(id, sender);
        info!(connection = %id, connected = self.registry.connected_count(), "connection registered");
        let mut out = Deliveries::new();
        self.queue_lobby_stats(&mut out);
        out
    }

    fn join(&mut self, id: ConnectionId, req: JoinRequest) -> Deliveries {
        let mut out = Deliveries::new();
        let selection = ProfileSelection {
            char_id: req.char_id,
            custom_profile: req.custom_profile,
        };

        match req.mode {
            JoinMode::Spectate => {
                if let Some(side) = self.registry.bound_side(&id) {
                    self.registry.release(side);
                }
                self.registry.set_spectator(&id);
                let state = self.session.clone();
                self.queue_to(&mut out, &id, ServerMessage::Welcome {
                    role: Role::Spectator,
                    state,
                });
            }
            JoinMode::Pve => {
                // A pve join claims the whole arena: fresh battle, the
                // requester as hero, the computer on the other side.
                self.cancel_timers();
                let hero = self.resolve_selection(&selection, self.catalog.default_hero());
                let enemy = req
                    .enemy_id
                    .as_deref()
                    .and_then(|eid| self.catalog.get(eid))
                    .unwrap_or(self.catalog.default_enemy())
                    .clone();
                self.session = BattleSession::fresh(BattleMode::Pve, hero, enemy);
                self.registry.release_both();
                self.registry.occupy(Side::Hero, id);
                info!(connection = %id, "pve battle started");

                let state = self.session.clone();
                self.queue_to(&mut out, &id, ServerMessage::Welcome {
                    role: Role::Hero,
                    state: state.clone(),
                });
                self.queue_all_except(
                    &mut out,
                    &id,
                    ServerMessage::GameUpdate(GameUpdate {
                        state,
                        action: None,
                        reset: true,
                    }),
                );
            }
            JoinMode::Pvp => {
                // The enemy side is never bound to a connection while a
                // pve battle owns the arena
                let pve_running = self.session.mode == BattleMode::Pve
                    && self.registry.slot(Side::Hero).is_engaged();
                if self.session.mode == BattleMode::Pve && !pve_running {
                    // Abandoned pve battle; put the arena back in pvp
                    self.session.reset_to_initial(&self.catalog);
                }
                let role = if pve_running {
                    self.registry.set_spectator(&id);
                    Role::Spectator
                } else if self.registry.slot(Side::Hero).is_empty() {
                    self.registry.occupy(Side::Hero, id);
                    self.apply_selection(Side::Hero, &selection);
                    Role::Hero
                } else if self.registry.slot(Side::Enemy).is_empty() {
                    self.registry.occupy(Side::Enemy, id);
                    self.apply_selection(Side::Enemy, &selection);
                    Role::Enemy
                } else {
                    self.registry.set_spectator(&id);
                    Role::Spectator
                };
                info!(connection = %id, ?role, "pvp join");

                let state = self.session.clone();
                self.queue_to(&mut out, &id, ServerMessage::Welcome { role, state });
            }
        }

        self.queue_lobby_stats(&mut out);
        out
    }

    /// Swap a pvp joiner's combatant in, but only while that side is
    /// still untouched; a selection cannot overwrite a battle in swing.
    fn apply_selection(&mut self, side: Side, selection: &ProfileSelection) {
        let untouched = {
            let p = self.session.profile(side);
            p.hp == p.max_hp && !self.session.game_over
        };
        if untouched {
            let resolved = {
                let default = match side {
                    Side::Hero => self.catalog.default_hero(),
                    Side::Enemy => self.catalog.default_enemy(),
                };
                self.resolve_selection(selection, default)
            };
            *self.session.profile_mut(side) = resolved;
        }
    }

    fn send_challenge(&mut self, id: ConnectionId, sel: ProfileSelection) -> Deliveries {
        let mut out = Deliveries::new();
        let profile = self.resolve_selection(&sel, self.catalog.default_hero());
        info!(connection = %id, combatant = %profile.name, "challenge sent");
        self.pending_challenge = Some(ChallengeRequest {
            challenger: id,
            profile,
            created_at: Utc::now(),
        });
        self.queue_all_except(&mut out, &id, ServerMessage::ChallengeReceived);
        out
    }

    fn accept_challenge(&mut self, id: ConnectionId, sel: ProfileSelection) -> Deliveries {
        let mut out = Deliveries::new();

        let challenge = match &self.pending_challenge {
            None => {
                self.queue_reject(&mut out, &id, RejectReason::NoPendingChallenge);
                return out;
            }
            Some(c) => c.clone(),
        };
        if challenge.challenger == id {
            self.queue_reject(&mut out, &id, RejectReason::OwnChallenge);
            return out;
        }
        if !self.registry.is_connected(&challenge.challenger) {
            self.pending_challenge = None;
            self.queue_reject(&mut out, &id, RejectReason::ChallengerGone);
            return out;
        }

        self.cancel_timers();
        let enemy = self.resolve_selection(&sel, self.catalog.default_enemy());
        self.session = BattleSession::fresh(BattleMode::Pvp, challenge.profile.clone(), enemy);
        self.registry.release_both();
        self.registry.occupy(Side::Hero, challenge.challenger);
        self.registry.occupy(Side::Enemy, id);
        self.pending_challenge = None;
        info!(
            challenger = %challenge.challenger,
            accepter = %id,
            "challenge accepted, pvp battle started"
        );

        let state = self.session.clone();
        self.queue_to(&mut out, &challenge.challenger, ServerMessage::Welcome {
            role: Role::Hero,
            state: state.clone(),
        });
        self.queue_to(&mut out, &id, ServerMessage::Welcome {
            role: Role::Enemy,
            state,
        });
        self.queue_reset_update(&mut out);
        self.queue_lobby_stats(&mut out);
        out
    }

    /// Returns the deliveries plus whether the computer side is now due
    /// to act.
    fn attack(&mut self, id: ConnectionId, req: AttackRequest) -> (Deliveries, bool) {
        let mut out = Deliveries::new();

        let side = match self.registry.role_of(&id).side() {
            Some(side) => side,
            None => {
                self.queue_reject(&mut out, &id, RejectReason::NotInMatch);
                return (out, false);
            }
        };
        if self.session.game_over {
            self.queue_reject(&mut out, &id, RejectReason::GameOver);
            return (out, false);
        }
        if self.session.turn != side {
            self.queue_reject(&mut out, &id, RejectReason::NotYourTurn);
            return (out, false);
        }

        let hint = RollHint {
            roll: req.roll,
            damage: req.damage,
        };
        let Self { session, dice, .. } = self;
        let outcome = resolve_attack(session, side, dice, Some(&hint));
        debug!(
            attacker = side.as_str(),
            roll = outcome.roll,
            damage = outcome.damage,
            hit = outcome.is_hit,
            "attack resolved"
        );

        let state = self.session.clone();
        self.queue_update(&mut out, GameUpdate {
            state,
            action: Some(outcome),
            reset: false,
        });

        let mut ai_due = false;
        if self.session.game_over {
            info!(winner = self.session.turn.as_str(), "battle over");
        } else if self.session.mode == BattleMode::Pve && self.session.turn == Side::Enemy {
            ai_due = true;
        }
        (out, ai_due)
    }

    fn chat(&self, id: ConnectionId, text: String) -> Deliveries {
        let mut out = Deliveries::new();

        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.queue_reject(&mut out, &id, RejectReason::EmptyChat);
            return out;
        }
        let text: String = trimmed.chars().take(self.config.chat_max_len).collect();
        let role = ChatRole::from(self.registry.role_of(&id));
        self.queue_all(&mut out, ServerMessage::ChatMessage { role, text });
        out
    }

    fn reset_game(&mut self, id: ConnectionId) -> Deliveries {
        let mut out = Deliveries::new();

        if self.registry.role_of(&id).side().is_none() {
            self.queue_reject(&mut out, &id, RejectReason::NotInMatch);
            return out;
        }

        self.cancel_timers();
        self.session.reset(&self.catalog);
        info!(connection = %id, "battle reset");

        self.queue_reset_update(&mut out);
        self.queue_lobby_stats(&mut out);
        out
    }

    /// Re-send the current snapshot to a returning participant.
    ///
    /// Lobby clients emit this speculatively, so a connection with no
    /// slot binding gets a silent no-op rather than a rejection.
    fn check_rejoin(&mut self, id: ConnectionId) -> Deliveries {
        let mut out = Deliveries::new();

        let side = match self.registry.bound_side(&id) {
            Some(side) => side,
            None => return out,
        };

        let reclaimed = matches!(self.registry.slot(side), SlotState::Reserved { .. });
        if reclaimed {
            self.registry.reclaim(&id);
            self.cancel_grace();
            info!(connection = %id, side = side.as_str(), "participant rejoined");
        }
        let state = self.session.clone();
        self.queue_to(&mut out, &id, ServerMessage::Welcome {
            role: side.into(),
            state,
        });
        if reclaimed {
            self.queue_lobby_stats(&mut out);
        }
        out
    }

    /// Returns the deliveries plus whether a grace timer must be armed.
    fn connection_lost(&mut self, id: ConnectionId) -> (Deliveries, bool) {
        let mut out = Deliveries::new();
        let mut grace_due = false;

        self.registry.unregister(&id);
        info!(connection = %id, connected = self.registry.connected_count(), "connection closed");

        // A challenger taking their pending invitation with them
        if self.pending_challenge.as_ref().map(|c| c.challenger) == Some(id) {
            self.pending_challenge = None;
            self.queue_all(&mut out, ServerMessage::ChallengeCanceled);
        }

        if let Some(side) = self.registry.bound_side(&id) {
            match self.session.mode {
                BattleMode::Pvp => {
                    // Hold the slot open for a grace window
                    self.registry.reserve(side);
                    self.queue_all(&mut out, ServerMessage::PlayerLeft { role: side.into() });
                    grace_due = true;
                }
                BattleMode::Pve => {
                    // No counterpart is waiting; reset immediately
                    self.cancel_timers();
                    self.registry.release_both();
                    self.session.reset_to_initial(&self.catalog);
                    self.queue_reset_update(&mut out);
                }
            }
        }

        if self.registry.connected_count() == 0 {
            self.cancel_timers();
            self.registry.release_both();
            self.session.reset_to_initial(&self.catalog);
            self.pending_challenge = None;
            grace_due = false;
        }

        self.queue_lobby_stats(&mut out);
        (out, grace_due)
    }

    /// The think delay elapsed: re-validate and act for the computer.
    fn ai_act(&mut self) -> Option<Deliveries> {
        self.ai_task = None;

        // State may have moved on while the computer was "thinking"
        if self.session.mode != BattleMode::Pve
            || self.session.game_over
            || self.session.turn != Side::Enemy
        {
            debug!("scheduled computer turn discarded");
            return None;
        }

        let mut out = Deliveries::new();
        let Self { session, dice, .. } = self;
        let outcome = resolve_attack(session, Side::Enemy, dice, None);
        let taunt = if outcome.is_crit || dice.roll(4) == 1 {
            Some(BOT_TAUNTS[(dice.roll(BOT_TAUNTS.len() as u32) - 1) as usize].to_string())
        } else {
            None
        };

        let state = self.session.clone();
        self.queue_update(&mut out, GameUpdate {
            state,
            action: Some(outcome),
            reset: false,
        });
        if let Some(text) = taunt {
            self.queue_all(&mut out, ServerMessage::ChatMessage {
                role: ChatRole::Bot,
                text,
            });
        }
        if self.session.game_over {
            info!(winner = self.session.turn.as_str(), "battle over");
        }
        Some(out)
    }

    /// The grace window closed with nobody claiming the battle: reset.
    fn grace_fire(&mut self) -> Option<Deliveries> {
        self.grace_task = None;

        if !self.registry.any_reserved() {
            return None;
        }

        info!("grace period expired, resetting battle");
        let mut out = Deliveries::new();
        self.cancel_ai();
        self.registry.release_both();
        self.session.reset_to_initial(&self.catalog);
        self.queue_reset_update(&mut out);
        self.queue_lobby_stats(&mut out);
        Some(out)
    }
}

/// Send everything collected under the lock.
async fn deliver(deliveries: Deliveries) {
    for (sender, msg) in deliveries {
        let _ = sender.send(msg).await;
    }
}

/// Register a new connection and push the lobby summary to everyone.
pub async fn handle_connect(
    arena: &SharedArena,
    id: ConnectionId,
    sender: mpsc::Sender<ServerMessage>,
) {
    let deliveries = arena.write().await.connect(id, sender);
    deliver(deliveries).await;
}

/// Dispatch one inbound message.
pub async fn handle_message(arena: &SharedArena, id: ConnectionId, msg: ClientMessage) {
    let deliveries = {
        let mut a = arena.write().await;
        match msg {
            ClientMessage::JoinGame(req) => a.join(id, req),
            ClientMessage::SendChallenge(sel) => a.send_challenge(id, sel),
            ClientMessage::AcceptChallenge(sel) => a.accept_challenge(id, sel),
            ClientMessage::Attack(req) => {
                let (out, ai_due) = a.attack(id, req);
                if ai_due {
                    schedule_ai_turn(&mut a, arena);
                }
                out
            }
            ClientMessage::SendChat { text } => a.chat(id, text),
            ClientMessage::ResetGame => a.reset_game(id),
            ClientMessage::CheckRejoin => a.check_rejoin(id),
        }
    };
    deliver(deliveries).await;
}

/// React to a connection loss.
pub async fn handle_disconnect(arena: &SharedArena, id: ConnectionId) {
    let deliveries = {
        let mut a = arena.write().await;
        let (out, grace_due) = a.connection_lost(id);
        if grace_due {
            schedule_grace(&mut a, arena);
        }
        out
    };
    deliver(deliveries).await;
}

/// Arm the computer opponent's think delay, replacing any prior one.
fn schedule_ai_turn(a: &mut Arena, shared: &SharedArena) {
    a.cancel_ai();
    let arena = shared.clone();
    let delay = a.config.ai_think_delay;
    a.ai_task = Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let deliveries = arena.write().await.ai_act();
        if let Some(out) = deliveries {
            deliver(out).await;
        }
    }));
}

/// Arm the disconnect grace timer, replacing any prior one.
fn schedule_grace(a: &mut Arena, shared: &SharedArena) {
    a.cancel_grace();
    let arena = shared.clone();
    let delay = a.config.grace_period;
    a.grace_task = Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let deliveries = arena.write().await.grace_fire();
        if let Some(out) = deliveries {
            deliver(out).await;
        }
    }));
}
