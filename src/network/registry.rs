//! Connection Registry
//!
//! Maps each live connection to the capacity it participates in and
//! tracks the two combat slots. A slot is an explicit three-state
//! machine (`Empty`, `Reserved`, `Occupied`) so the disconnect grace
//! window and reconnection have precise semantics instead of implicit
//! "first free slot" behavior.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::game::battle::Side;
use crate::network::protocol::ServerMessage;

/// Transport-level connection identifier.
pub type ConnectionId = Uuid;

/// The capacity a connection participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Fighting on the hero side.
    Hero,
    /// Fighting on the enemy side.
    Enemy,
    /// Watching.
    Spectator,
    /// Connected, not yet joined.
    Unassigned,
}

impl Role {
    /// The combat side this role fights for, if any.
    pub fn side(self) -> Option<Side> {
        match self {
            Role::Hero => Some(Side::Hero),
            Role::Enemy => Some(Side::Enemy),
            Role::Spectator | Role::Unassigned => None,
        }
    }
}

/// Lifecycle of a combat slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nobody holds the slot.
    Empty,
    /// The holder's connection dropped; the slot is held for them
    /// until the grace window closes.
    Reserved {
        /// Connection entitled to reclaim the slot.
        connection: ConnectionId,
        /// When the reservation started.
        since: Instant,
    },
    /// A live connection holds the slot.
    Occupied {
        /// The holding connection.
        connection: ConnectionId,
    },
}

impl SlotState {
    /// The connection bound to this slot, if any.
    pub fn holder(&self) -> Option<ConnectionId> {
        match self {
            SlotState::Empty => None,
            SlotState::Reserved { connection, .. } | SlotState::Occupied { connection } => {
                Some(*connection)
            }
        }
    }

    /// Whether the slot is free for a new joiner.
    pub fn is_empty(&self) -> bool {
        matches!(self, SlotState::Empty)
    }

    /// Whether the slot counts toward a match in progress.
    pub fn is_engaged(&self) -> bool {
        !self.is_empty()
    }
}

/// A live connection.
#[derive(Debug)]
struct RegisteredConnection {
    role: Role,
    sender: mpsc::Sender<ServerMessage>,
    #[allow(dead_code)]
    connected_at: Instant,
}

/// Registry of live connections and the two combat slots.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: BTreeMap<ConnectionId, RegisteredConnection>,
    hero_slot: SlotState,
    enemy_slot: SlotState,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: BTreeMap::new(),
            hero_slot: SlotState::Empty,
            enemy_slot: SlotState::Empty,
        }
    }

    /// Register a new connection as unassigned.
    pub fn register(&mut self, id: ConnectionId, sender: mpsc::Sender<ServerMessage>) {
        self.connections.insert(
            id,
            RegisteredConnection {
                role: Role::Unassigned,
                sender,
                connected_at: Instant::now(),
            },
        );
    }

    /// Remove a connection. Slots are left to the caller: a mid-match
    /// disconnect reserves rather than releases.
    pub fn unregister(&mut self, id: &ConnectionId) -> Option<Role> {
        self.connections.remove(id).map(|c| c.role)
    }

    /// Whether a connection is currently live.
    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Number of live connections.
    pub fn connected_count(&self) -> usize {
        self.connections.len()
    }

    /// The role a live connection holds.
    pub fn role_of(&self, id: &ConnectionId) -> Role {
        self.connections
            .get(id)
            .map(|c| c.role)
            .unwrap_or(Role::Unassigned)
    }

    /// Outbound channel for one connection.
    pub fn sender(&self, id: &ConnectionId) -> Option<mpsc::Sender<ServerMessage>> {
        self.connections.get(id).map(|c| c.sender.clone())
    }

    /// Outbound channels for every connection.
    pub fn senders_all(&self) -> Vec<mpsc::Sender<ServerMessage>> {
        self.connections.values().map(|c| c.sender.clone()).collect()
    }

    /// Outbound channels for every connection except one.
    pub fn senders_except(&self, skip: &ConnectionId) -> Vec<mpsc::Sender<ServerMessage>> {
        self.connections
            .iter()
            .filter(|(id, _)| *id != skip)
            .map(|(_, c)| c.sender.clone())
            .collect()
    }

    /// Current state of a combat slot.
    pub fn slot(&self, side: Side) -> SlotState {
        match side {
            Side::Hero => self.hero_slot,
            Side::Enemy => self.enemy_slot,
        }
    }

    fn slot_mut(&mut self, side: Side) -> &mut SlotState {
        match side {
            Side::Hero => &mut self.hero_slot,
            Side::Enemy => &mut self.enemy_slot,
        }
    }

    /// Bind a connection to a combat slot, demoting any previous live
    /// holder to spectator. Upholds the one-connection-per-slot
    /// invariant by construction.
    pub fn occupy(&mut self, side: Side, id: ConnectionId) {
        if let Some(prev) = self.slot(side).holder() {
            if prev != id {
                if let Some(conn) = self.connections.get_mut(&prev) {
                    conn.role = Role::Spectator;
                }
            }
        }
        *self.slot_mut(side) = SlotState::Occupied { connection: id };
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.role = match side {
                Side::Hero => Role::Hero,
                Side::Enemy => Role::Enemy,
            };
        }
    }

    /// Hold an occupied slot for its (disconnected) holder.
    pub fn reserve(&mut self, side: Side) {
        if let SlotState::Occupied { connection } = self.slot(side) {
            *self.slot_mut(side) = SlotState::Reserved {
                connection,
                since: Instant::now(),
            };
        }
    }

    /// Reclaim a reserved slot for a returning connection.
    pub fn reclaim(&mut self, id: &ConnectionId) -> Option<Side> {
        for side in [Side::Hero, Side::Enemy] {
            if let SlotState::Reserved { connection, .. } = self.slot(side) {
                if connection == *id {
                    self.occupy(side, *id);
                    return Some(side);
                }
            }
        }
        None
    }

    /// The side a connection is bound to via an occupied or reserved
    /// slot, if any.
    pub fn bound_side(&self, id: &ConnectionId) -> Option<Side> {
        [Side::Hero, Side::Enemy]
            .into_iter()
            .find(|side| self.slot(*side).holder() == Some(*id))
    }

    /// Free a slot, demoting a still-live holder to spectator.
    pub fn release(&mut self, side: Side) {
        if let Some(prev) = self.slot(side).holder() {
            if let Some(conn) = self.connections.get_mut(&prev) {
                conn.role = Role::Spectator;
            }
        }
        *self.slot_mut(side) = SlotState::Empty;
    }

    /// Free both slots.
    pub fn release_both(&mut self) {
        self.release(Side::Hero);
        self.release(Side::Enemy);
    }

    /// Whether any slot is currently reserved.
    pub fn any_reserved(&self) -> bool {
        matches!(self.hero_slot, SlotState::Reserved { .. })
            || matches!(self.enemy_slot, SlotState::Reserved { .. })
    }

    /// Mark a connection a spectator without touching the slots.
    pub fn set_spectator(&mut self, id: &ConnectionId) {
        if let Some(conn) = self.connections.get_mut(id) {
            conn.role = Role::Spectator;
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> (ConnectionId, mpsc::Sender<ServerMessage>) {
        let (tx, _rx) = mpsc::channel(8);
        (Uuid::new_v4(), tx)
    }

    #[test]
    fn test_register_unregister() {
        let mut registry = ConnectionRegistry::new();
        let (id, tx) = conn();

        registry.register(id, tx);
        assert!(registry.is_connected(&id));
        assert_eq!(registry.connected_count(), 1);
        assert_eq!(registry.role_of(&id), Role::Unassigned);

        assert_eq!(registry.unregister(&id), Some(Role::Unassigned));
        assert!(!registry.is_connected(&id));
        assert_eq!(registry.connected_count(), 0);
    }

    #[test]
    fn test_occupy_sets_role() {
        let mut registry = ConnectionRegistry::new();
        let (id, tx) = conn();
        registry.register(id, tx);

        registry.occupy(Side::Hero, id);
        assert_eq!(registry.role_of(&id), Role::Hero);
        assert_eq!(registry.slot(Side::Hero).holder(), Some(id));
        assert_eq!(registry.bound_side(&id), Some(Side::Hero));
    }

    #[test]
    fn test_occupy_demotes_previous_holder() {
        let mut registry = ConnectionRegistry::new();
        let (a, tx_a) = conn();
        let (b, tx_b) = conn();
        registry.register(a, tx_a);
        registry.register(b, tx_b);

        registry.occupy(Side::Enemy, a);
        registry.occupy(Side::Enemy, b);

        // Only one connection can hold a slot
        assert_eq!(registry.slot(Side::Enemy).holder(), Some(b));
        assert_eq!(registry.role_of(&a), Role::Spectator);
        assert_eq!(registry.role_of(&b), Role::Enemy);
    }

    #[test]
    fn test_reserve_and_reclaim() {
        let mut registry = ConnectionRegistry::new();
        let (id, tx) = conn();
        registry.register(id, tx);
        registry.occupy(Side::Hero, id);

        registry.unregister(&id);
        registry.reserve(Side::Hero);
        assert!(registry.any_reserved());
        assert!(!registry.slot(Side::Hero).is_empty());
        assert_eq!(registry.slot(Side::Hero).holder(), Some(id));

        // Same transport identifier reconnects
        let (tx2, _rx2) = mpsc::channel(8);
        registry.register(id, tx2);
        assert_eq!(registry.reclaim(&id), Some(Side::Hero));
        assert_eq!(registry.role_of(&id), Role::Hero);
        assert!(!registry.any_reserved());
    }

    #[test]
    fn test_reclaim_wrong_connection() {
        let mut registry = ConnectionRegistry::new();
        let (a, tx_a) = conn();
        let (b, tx_b) = conn();
        registry.register(a, tx_a);
        registry.occupy(Side::Hero, a);
        registry.unregister(&a);
        registry.reserve(Side::Hero);

        registry.register(b, tx_b);
        assert_eq!(registry.reclaim(&b), None);
        // Reserved slot is not free for a fresh join either
        assert!(!registry.slot(Side::Hero).is_empty());
    }

    #[test]
    fn test_reserve_requires_occupied() {
        let mut registry = ConnectionRegistry::new();
        registry.reserve(Side::Hero);
        assert!(registry.slot(Side::Hero).is_empty());
    }

    #[test]
    fn test_release_both() {
        let mut registry = ConnectionRegistry::new();
        let (a, tx_a) = conn();
        let (b, tx_b) = conn();
        registry.register(a, tx_a);
        registry.register(b, tx_b);
        registry.occupy(Side::Hero, a);
        registry.occupy(Side::Enemy, b);

        registry.release_both();
        assert!(registry.slot(Side::Hero).is_empty());
        assert!(registry.slot(Side::Enemy).is_empty());
        assert_eq!(registry.role_of(&a), Role::Spectator);
        assert_eq!(registry.role_of(&b), Role::Spectator);
    }

    #[test]
    fn test_senders_except() {
        let mut registry = ConnectionRegistry::new();
        let (a, tx_a) = conn();
        let (b, tx_b) = conn();
        registry.register(a, tx_a);
        registry.register(b, tx_b);

        assert_eq!(registry.senders_all().len(), 2);
        assert_eq!(registry.senders_except(&a).len(), 1);
    }
}
