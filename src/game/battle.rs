//! Battle State
//!
//! The single shared combat state: the two profiles in play, whose turn
//! it is, the game-over flag, and the match mode. Exactly one battle
//! exists per process; it is reset in place rather than replaced.

use serde::{Deserialize, Serialize};

use crate::game::catalog::{CharacterCatalog, CharacterProfile};

/// One of the two combat sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The player side.
    Hero,
    /// The opponent side (a connection in pvp, the computer in pve).
    Enemy,
}

impl Side {
    /// The opposing side.
    pub fn other(self) -> Side {
        match self {
            Side::Hero => Side::Enemy,
            Side::Enemy => Side::Hero,
        }
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Hero => "hero",
            Side::Enemy => "enemy",
        }
    }
}

/// Match mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleMode {
    /// Two live connections, one per side.
    Pvp,
    /// A live hero against the computer-controlled enemy.
    Pve,
}

/// The shared battle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSession {
    /// Hero-side combatant instance.
    pub hero: CharacterProfile,
    /// Enemy-side combatant instance.
    pub enemy: CharacterProfile,
    /// Side whose turn it is to act.
    pub turn: Side,
    /// Set when the most recent resolution reduced the defender to zero.
    pub game_over: bool,
    /// Current match mode.
    pub mode: BattleMode,
}

impl BattleSession {
    /// The process-start template: the default hero and opponent in pvp
    /// mode, hero to act.
    pub fn initial(catalog: &CharacterCatalog) -> Self {
        Self::fresh(
            BattleMode::Pvp,
            catalog.default_hero().clone(),
            catalog.default_enemy().clone(),
        )
    }

    /// A fresh battle in the given mode with the given combatants.
    pub fn fresh(mode: BattleMode, hero: CharacterProfile, enemy: CharacterProfile) -> Self {
        Self {
            hero,
            enemy,
            turn: Side::Hero,
            game_over: false,
            mode,
        }
    }

    /// Reset to the default template, keeping the configured mode.
    ///
    /// Idempotent: repeated resets always yield the same state.
    pub fn reset(&mut self, catalog: &CharacterCatalog) {
        *self = Self::fresh(
            self.mode,
            catalog.default_hero().clone(),
            catalog.default_enemy().clone(),
        );
    }

    /// Reset to the process-start template, discarding the mode as well.
    pub fn reset_to_initial(&mut self, catalog: &CharacterCatalog) {
        *self = Self::initial(catalog);
    }

    /// The combatant fighting for `side`.
    pub fn profile(&self, side: Side) -> &CharacterProfile {
        match side {
            Side::Hero => &self.hero,
            Side::Enemy => &self.enemy,
        }
    }

    /// Mutable access to the combatant fighting for `side`.
    pub fn profile_mut(&mut self, side: Side) -> &mut CharacterProfile {
        match side {
            Side::Hero => &mut self.hero,
            Side::Enemy => &mut self.enemy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_template() {
        let catalog = CharacterCatalog::builtin();
        let battle = BattleSession::initial(&catalog);

        assert_eq!(battle.hero.name, "Warrior");
        assert_eq!(battle.enemy.name, "Ogre");
        assert_eq!(battle.turn, Side::Hero);
        assert!(!battle.game_over);
        assert_eq!(battle.mode, BattleMode::Pvp);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let catalog = CharacterCatalog::builtin();
        let mut battle = BattleSession::initial(&catalog);

        battle.hero.hp = 3;
        battle.turn = Side::Enemy;
        battle.game_over = true;

        battle.reset(&catalog);
        let once = battle.clone();
        battle.reset(&catalog);
        assert_eq!(battle, once);

        assert_eq!(battle.hero.hp, battle.hero.max_hp);
        assert_eq!(battle.turn, Side::Hero);
        assert!(!battle.game_over);
    }

    #[test]
    fn test_reset_keeps_mode() {
        let catalog = CharacterCatalog::builtin();
        let mut battle = BattleSession::fresh(
            BattleMode::Pve,
            catalog.default_hero().clone(),
            catalog.default_enemy().clone(),
        );

        battle.reset(&catalog);
        assert_eq!(battle.mode, BattleMode::Pve);

        battle.reset_to_initial(&catalog);
        assert_eq!(battle.mode, BattleMode::Pvp);
    }

    #[test]
    fn test_side_other() {
        assert_eq!(Side::Hero.other(), Side::Enemy);
        assert_eq!(Side::Enemy.other(), Side::Hero);
    }

    #[test]
    fn test_profile_lookup() {
        let catalog = CharacterCatalog::builtin();
        let mut battle = BattleSession::initial(&catalog);

        assert_eq!(battle.profile(Side::Hero).name, "Warrior");
        assert_eq!(battle.profile(Side::Enemy).name, "Ogre");

        battle.profile_mut(Side::Enemy).hp = 1;
        assert_eq!(battle.enemy.hp, 1);
    }
}
