//! Character Catalog
//!
//! Named combat profiles available for selection. One declarative table
//! keyed by character id, built once at startup; a live battle holds
//! independent mutable copies of the two selected entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default hero character id.
pub const DEFAULT_HERO_ID: &str = "warrior";

/// Default computer-controlled opponent id.
pub const DEFAULT_ENEMY_ID: &str = "ogre";

/// A combat profile.
///
/// Immutable template while in the catalog; cloned into a
/// [`BattleSession`](crate::game::battle::BattleSession) as a mutable
/// instance when a match starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Display name.
    pub name: String,
    /// Current hit points.
    pub hp: i32,
    /// Maximum hit points.
    pub max_hp: i32,
    /// Armor class a to-hit roll plus bonus must meet or exceed.
    pub armor_class: i32,
    /// Damage die size (d6, d8, ...).
    pub damage_die: u32,
    /// Flat damage modifier, also part of the hit bonus.
    pub damage_modifier: i32,
    /// Portrait reference for the presentation layer.
    pub portrait: String,
}

impl CharacterProfile {
    /// Clamp hit points into `[0, max_hp]`.
    pub fn clamp_hp(&mut self) {
        self.hp = self.hp.clamp(0, self.max_hp);
    }

    /// Whether this combatant has been reduced to zero hit points.
    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }
}

/// A caller-supplied profile, untrusted until sanitized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomProfile {
    /// Display name.
    pub name: Option<String>,
    /// Maximum hit points.
    pub max_hp: Option<i32>,
    /// Armor class.
    pub armor_class: Option<i32>,
    /// Damage die size.
    pub damage_die: Option<u32>,
    /// Damage modifier.
    pub damage_modifier: Option<i32>,
    /// Portrait reference.
    pub portrait: Option<String>,
}

/// Bounds applied to custom profiles before they enter a battle.
const NAME_MAX_LEN: usize = 24;
const HP_RANGE: std::ops::RangeInclusive<i32> = 1..=999;
const AC_RANGE: std::ops::RangeInclusive<i32> = 1..=30;
const DIE_RANGE: std::ops::RangeInclusive<u32> = 2..=20;
const MOD_RANGE: std::ops::RangeInclusive<i32> = -5..=10;

impl CustomProfile {
    /// Sanitize into a usable profile, clamping every field into a sane
    /// range and falling back to `base` for anything omitted.
    pub fn sanitize(&self, base: &CharacterProfile) -> CharacterProfile {
        let name: String = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&base.name)
            .chars()
            .take(NAME_MAX_LEN)
            .collect();

        let max_hp = self
            .max_hp
            .unwrap_or(base.max_hp)
            .clamp(*HP_RANGE.start(), *HP_RANGE.end());
        let armor_class = self
            .armor_class
            .unwrap_or(base.armor_class)
            .clamp(*AC_RANGE.start(), *AC_RANGE.end());
        let damage_die = self
            .damage_die
            .unwrap_or(base.damage_die)
            .clamp(*DIE_RANGE.start(), *DIE_RANGE.end());
        let damage_modifier = self
            .damage_modifier
            .unwrap_or(base.damage_modifier)
            .clamp(*MOD_RANGE.start(), *MOD_RANGE.end());

        CharacterProfile {
            name,
            hp: max_hp,
            max_hp,
            armor_class,
            damage_die,
            damage_modifier,
            portrait: self.portrait.clone().unwrap_or_else(|| base.portrait.clone()),
        }
    }
}

/// The character roster, keyed by character id.
#[derive(Debug, Clone)]
pub struct CharacterCatalog {
    entries: BTreeMap<String, CharacterProfile>,
}

impl CharacterCatalog {
    /// Build the built-in roster.
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();

        entries.insert(
            "warrior".to_string(),
            CharacterProfile {
                name: "Warrior".to_string(),
                hp: 50,
                max_hp: 50,
                armor_class: 15,
                damage_die: 8,
                damage_modifier: 2,
                portrait: "portraits/warrior".to_string(),
            },
        );
        entries.insert(
            "ogre".to_string(),
            CharacterProfile {
                name: "Ogre".to_string(),
                hp: 45,
                max_hp: 45,
                armor_class: 12,
                damage_die: 6,
                damage_modifier: 2,
                portrait: "portraits/ogre".to_string(),
            },
        );
        entries.insert(
            "knight".to_string(),
            CharacterProfile {
                name: "Knight".to_string(),
                hp: 60,
                max_hp: 60,
                armor_class: 17,
                damage_die: 8,
                damage_modifier: 1,
                portrait: "portraits/knight".to_string(),
            },
        );
        entries.insert(
            "rogue".to_string(),
            CharacterProfile {
                name: "Rogue".to_string(),
                hp: 40,
                max_hp: 40,
                armor_class: 14,
                damage_die: 6,
                damage_modifier: 3,
                portrait: "portraits/rogue".to_string(),
            },
        );

        Self { entries }
    }

    /// Look up a profile template by id.
    pub fn get(&self, id: &str) -> Option<&CharacterProfile> {
        self.entries.get(id)
    }

    /// The default hero template.
    pub fn default_hero(&self) -> &CharacterProfile {
        &self.entries[DEFAULT_HERO_ID]
    }

    /// The default opponent template.
    pub fn default_enemy(&self) -> &CharacterProfile {
        &self.entries[DEFAULT_ENEMY_ID]
    }

    /// Number of entries in the roster.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CharacterCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_original_profiles() {
        let catalog = CharacterCatalog::builtin();

        let warrior = catalog.get("warrior").unwrap();
        assert_eq!(warrior.name, "Warrior");
        assert_eq!(warrior.max_hp, 50);
        assert_eq!(warrior.armor_class, 15);
        assert_eq!(warrior.damage_die, 8);
        assert_eq!(warrior.damage_modifier, 2);

        let ogre = catalog.get("ogre").unwrap();
        assert_eq!(ogre.name, "Ogre");
        assert_eq!(ogre.max_hp, 45);
        assert_eq!(ogre.armor_class, 12);
        assert_eq!(ogre.damage_die, 6);
    }

    #[test]
    fn test_unknown_id() {
        let catalog = CharacterCatalog::builtin();
        assert!(catalog.get("dragon").is_none());
    }

    #[test]
    fn test_defaults_present() {
        let catalog = CharacterCatalog::builtin();
        assert_eq!(catalog.default_hero().name, "Warrior");
        assert_eq!(catalog.default_enemy().name, "Ogre");
    }

    #[test]
    fn test_sanitize_clamps_fields() {
        let catalog = CharacterCatalog::builtin();
        let custom = CustomProfile {
            name: Some("Cheater".to_string()),
            max_hp: Some(100_000),
            armor_class: Some(99),
            damage_die: Some(1),
            damage_modifier: Some(50),
            portrait: None,
        };

        let profile = custom.sanitize(catalog.default_hero());
        assert_eq!(profile.max_hp, 999);
        assert_eq!(profile.hp, 999);
        assert_eq!(profile.armor_class, 30);
        assert_eq!(profile.damage_die, 2);
        assert_eq!(profile.damage_modifier, 10);
    }

    #[test]
    fn test_sanitize_falls_back_to_base() {
        let catalog = CharacterCatalog::builtin();
        let custom = CustomProfile {
            name: None,
            max_hp: None,
            armor_class: None,
            damage_die: None,
            damage_modifier: None,
            portrait: None,
        };

        let profile = custom.sanitize(catalog.default_enemy());
        assert_eq!(profile, *catalog.default_enemy());
    }

    #[test]
    fn test_sanitize_truncates_name() {
        let catalog = CharacterCatalog::builtin();
        let custom = CustomProfile {
            name: Some("X".repeat(100)),
            max_hp: None,
            armor_class: None,
            damage_die: None,
            damage_modifier: None,
            portrait: None,
        };

        let profile = custom.sanitize(catalog.default_hero());
        assert_eq!(profile.name.len(), 24);
    }

    #[test]
    fn test_sanitize_blank_name_falls_back() {
        let catalog = CharacterCatalog::builtin();
        let custom = CustomProfile {
            name: Some("   ".to_string()),
            max_hp: Some(0),
            armor_class: None,
            damage_die: None,
            damage_modifier: Some(-20),
            portrait: None,
        };

        let profile = custom.sanitize(catalog.default_hero());
        assert_eq!(profile.name, "Warrior");
        assert_eq!(profile.max_hp, 1);
        assert_eq!(profile.damage_modifier, -5);
    }

    #[test]
    fn test_clamp_hp() {
        let mut p = CharacterCatalog::builtin().default_hero().clone();
        p.hp = -5;
        p.clamp_hp();
        assert_eq!(p.hp, 0);
        assert!(p.is_defeated());

        p.hp = 1000;
        p.clamp_hp();
        assert_eq!(p.hp, p.max_hp);
    }
}
