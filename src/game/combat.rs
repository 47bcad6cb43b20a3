//! Combat Resolution
//!
//! Turns an attack request into a hit/damage outcome and mutates the
//! battle state. Deterministic given the dice stream: all randomness
//! comes from the server-owned [`DiceRng`].

use serde::{Deserialize, Serialize};

use crate::game::battle::{BattleSession, Side};
use crate::game::dice::DiceRng;

/// Fixed proficiency constant added to every to-hit roll.
pub const PROFICIENCY_BONUS: i32 = 2;

/// Display color tags consumed by the presentation layer.
const COLOR_HIT: &str = "text-red-400";
const COLOR_MISS: &str = "text-slate-400";
const COLOR_DEFEAT: &str = "text-yellow-400";

/// Client-supplied roll values from a local dice animation.
///
/// Display pacing only. The authoritative outcome always comes from the
/// server's own draws.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RollHint {
    /// Claimed d20 result.
    pub roll: Option<i64>,
    /// Claimed damage total.
    pub damage: Option<i64>,
}

impl RollHint {
    /// Extract a displayable d20 value, clamped into `[1, 20]`.
    ///
    /// Out-of-range claims are discarded rather than clamped to an edge,
    /// so a client cannot force a persistent "20" animation.
    pub fn display_roll(&self) -> Option<u32> {
        match self.roll {
            Some(r) if (1..=20).contains(&r) => Some(r as u32),
            _ => None,
        }
    }
}

/// Human-readable description of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Headline message.
    pub msg: String,
    /// Arithmetic detail: the roll versus the target's armor class.
    pub sub: String,
    /// Display color tag.
    pub color: String,
}

/// Result of one resolved attack, broadcast alongside the new state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackOutcome {
    /// Which side attacked.
    pub attacker: Side,
    /// Server-authoritative d20 roll.
    pub roll: u32,
    /// Damage dealt (zero on a miss).
    pub damage: i32,
    /// Whether the attack landed.
    pub is_hit: bool,
    /// Whether the roll was a natural 20.
    pub is_crit: bool,
    /// Log line for the action feed.
    pub log: LogLine,
    /// Clamped client hint, echoed for animation sync only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_roll: Option<u32>,
}

/// Resolve an attack by `attacker` against the opposing side.
///
/// Draws the to-hit and damage rolls from `dice`, applies the outcome to
/// `session`, and returns the report to broadcast. The caller is
/// responsible for turn/game-over validation; this function only
/// resolves.
pub fn resolve_attack(
    session: &mut BattleSession,
    attacker: Side,
    dice: &mut DiceRng,
    hint: Option<&RollHint>,
) -> AttackOutcome {
    let to_hit = dice.d20();
    let display_roll = hint.and_then(RollHint::display_roll);
    resolve_with_to_hit(session, attacker, to_hit, dice, display_roll)
}

/// Resolve with a known to-hit roll. Damage dice still come from `dice`.
pub(crate) fn resolve_with_to_hit(
    session: &mut BattleSession,
    attacker: Side,
    to_hit: u32,
    dice: &mut DiceRng,
    display_roll: Option<u32>,
) -> AttackOutcome {
    let defender = attacker.other();

    let (attacker_name, die, modifier) = {
        let p = session.profile(attacker);
        (p.name.clone(), p.damage_die, p.damage_modifier)
    };
    let target_ac = session.profile(defender).armor_class;

    let hit_bonus = modifier + PROFICIENCY_BONUS;
    let total = to_hit as i32 + hit_bonus;
    let is_crit = to_hit == 20;
    let is_hit = is_crit || total >= target_ac;

    let mut damage = 0;
    let mut log = LogLine {
        msg: format!("{} missed! (Rolled {})", attacker_name, to_hit),
        sub: format!("Rolled {} + {} = {} vs AC {}", to_hit, hit_bonus, total, target_ac),
        color: COLOR_MISS.to_string(),
    };

    if is_hit {
        damage = dice.roll(die) as i32 + modifier;
        if is_crit {
            // Critical adds one extra damage die
            damage += dice.roll(die) as i32;
        }
        damage = damage.max(0);

        let target = session.profile_mut(defender);
        target.hp = (target.hp - damage).max(0);

        log.msg = format!("{} hits for {} damage!", attacker_name, damage);
        log.color = COLOR_HIT.to_string();
    }

    if session.profile(defender).is_defeated() {
        session.game_over = true;
        log.msg = format!("{} was defeated!", session.profile(defender).name);
        log.color = COLOR_DEFEAT.to_string();
    } else {
        session.turn = defender;
    }

    AttackOutcome {
        attacker,
        roll: to_hit,
        damage,
        is_hit,
        is_crit,
        log,
        display_roll,
    }
}
