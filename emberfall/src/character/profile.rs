//! Character stat blocks, loaded from definition files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::animation::{AnimationSet, ClipDef};
use crate::error::DataError;

/// One entry of an enemy loot table: `chance` percent to drop between
/// `min_amount` and `max_amount` copies of the item.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LootEntry {
    pub chance: u32,
    #[serde(default = "one")]
    pub min_amount: u32,
    #[serde(default = "one")]
    pub max_amount: u32,
}

fn one() -> u32 {
    1
}

/// A character's stat block. Loaded from a definition file; mutable at
/// runtime through leveling, consumables, and equipment bonuses. Owned
/// exclusively by its character.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,

    pub full_health: i32,
    pub full_stamina: i32,
    pub full_magicka: i32,
    /// Current values. Definition files normally omit these; they are
    /// normalized to the full values on load and carried by save files.
    #[serde(default)]
    pub health: i32,
    #[serde(default)]
    pub stamina: i32,
    #[serde(default)]
    pub magicka: i32,

    pub strength: i32,
    pub dexterity: i32,
    pub intelligence: i32,
    pub luck: i32,

    /// Body collider size in pixels. Movement impulses scale with the
    /// cross-sectional area.
    pub body_width: f32,
    pub body_height: f32,

    /// Max grounded horizontal speed, pixels/s.
    pub move_speed: f32,
    /// Upward jump impulse, pixels/s of instant velocity.
    pub jump_height: f32,
    #[serde(default)]
    pub can_double_jump: bool,

    /// Melee reach in pixels (weapon sensor radius).
    pub attack_range: f32,
    pub base_melee_damage: i32,
    /// Seconds the attack flag stays up when the clip has no authored
    /// duration.
    #[serde(default = "default_attack_time")]
    pub attack_time: f32,

    #[serde(default)]
    pub stamina_cost_dodge: i32,

    #[serde(default)]
    pub sounds: HashMap<String, String>,
    pub animations: HashMap<String, ClipDef>,

    /// Item key -> starting amount.
    #[serde(default)]
    pub default_inventory: HashMap<String, u32>,
    #[serde(default)]
    pub default_skills: Vec<String>,
    /// Item key -> loot roll, applied once on death.
    #[serde(default)]
    pub dropped_items: HashMap<String, LootEntry>,

    /// NPC-only fields; ignored for the player.
    #[serde(default)]
    pub hostile: bool,
    #[serde(default)]
    pub interactable: bool,
    #[serde(default)]
    pub dialogue_tree: Option<String>,
}

fn default_attack_time() -> f32 {
    0.3
}

impl Profile {
    /// Parse a definition file. `key` is the definition's identity (its
    /// path-like asset key) and only used for error reporting here.
    pub fn from_json(key: &str, json: &str) -> Result<Self, DataError> {
        let mut profile: Profile =
            serde_json::from_str(json).map_err(|e| DataError::Malformed {
                path: key.to_string(),
                reason: e.to_string(),
            })?;
        profile.normalize();
        Ok(profile)
    }

    /// Fill in current vitals for freshly-loaded definitions.
    pub fn normalize(&mut self) {
        if self.health <= 0 {
            self.health = self.full_health;
        }
        if self.stamina <= 0 {
            self.stamina = self.full_stamina;
        }
        if self.magicka <= 0 {
            self.magicka = self.full_magicka;
        }
    }

    /// Build the animation set, falling back to the idle clip for states
    /// without authored frames. A profile without even an idle clip cannot
    /// be shown at all.
    pub fn animation_set(&self, key: &str) -> Result<AnimationSet, DataError> {
        AnimationSet::new(self.animations.clone(), "idle")
            .ok_or_else(|| DataError::MissingFallbackClip(key.to_string()))
    }

    /// Effective melee damage including the strength bonus.
    pub fn melee_damage(&self) -> i32 {
        self.base_melee_damage + self.strength / 5
    }

    pub fn sound(&self, key: &str) -> &str {
        self.sounds.get(key).map(String::as_str).unwrap_or("")
    }

    /// Movement impulses scale with body cross-sectional area, so heavier
    /// silhouettes need (and get) proportionally more push.
    pub fn body_area_factor(&self) -> f32 {
        const REFERENCE_AREA: f32 = 32.0 * 48.0;
        (self.body_width * self.body_height / REFERENCE_AREA).max(0.1)
    }

    pub fn restore_health(&mut self, amount: i32) {
        self.health = (self.health + amount).clamp(0, self.full_health);
    }

    pub fn restore_stamina(&mut self, amount: i32) {
        self.stamina = (self.stamina + amount).clamp(0, self.full_stamina);
    }

    pub fn restore_magicka(&mut self, amount: i32) {
        self.magicka = (self.magicka + amount).clamp(0, self.full_magicka);
    }
}

#[cfg(test)]
pub(crate) fn test_profile(name: &str) -> Profile {
    let mut animations = HashMap::new();
    for key in [
        "idle",
        "running",
        "jumping",
        "falling",
        "crouching",
        "attacking",
        "blocking",
        "taking_damage",
        "dodging_backward",
        "dodging_forward",
    ] {
        animations.insert(
            key.to_string(),
            ClipDef {
                frames: 4,
                frame_interval_ms: 50.0,
                looping: matches!(key, "idle" | "running" | "blocking" | "crouching"),
            },
        );
    }
    animations.insert(
        "killed".to_string(),
        ClipDef {
            frames: 6,
            frame_interval_ms: 50.0,
            looping: false,
        },
    );

    let mut profile = Profile {
        name: name.to_string(),
        full_health: 100,
        full_stamina: 50,
        full_magicka: 40,
        health: 0,
        stamina: 0,
        magicka: 0,
        strength: 10,
        dexterity: 10,
        intelligence: 10,
        luck: 5,
        body_width: 32.0,
        body_height: 48.0,
        move_speed: 180.0,
        jump_height: 380.0,
        can_double_jump: true,
        attack_range: 40.0,
        base_melee_damage: 10,
        attack_time: 0.3,
        stamina_cost_dodge: 5,
        sounds: HashMap::new(),
        animations,
        default_inventory: HashMap::new(),
        default_skills: Vec::new(),
        dropped_items: HashMap::new(),
        hostile: false,
        interactable: false,
        dialogue_tree: None,
    };
    profile.normalize();
    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "name": "Skeleton",
        "full_health": 30,
        "full_stamina": 10,
        "full_magicka": 0,
        "strength": 5,
        "dexterity": 3,
        "intelligence": 1,
        "luck": 2,
        "body_width": 28,
        "body_height": 44,
        "move_speed": 120,
        "jump_height": 300,
        "attack_range": 32,
        "base_melee_damage": 6,
        "animations": { "idle": { "frames": 2 } },
        "hostile": true,
        "dropped_items": { "item/rusty_sword": { "chance": 100 } }
    }"#;

    #[test]
    fn minimal_definition_parses_with_defaults() {
        let p = Profile::from_json("char/skeleton", MINIMAL).unwrap();
        assert_eq!(p.health, 30, "current health normalizes to full");
        assert_eq!(p.magicka, 0, "zero-magicka characters stay at zero cap");
        assert!(p.hostile);
        assert!(!p.can_double_jump);
        let loot = &p.dropped_items["item/rusty_sword"];
        assert_eq!((loot.chance, loot.min_amount, loot.max_amount), (100, 1, 1));
        // Missing frame interval falls back to the documented default.
        assert_eq!(
            p.animations["idle"].frame_interval_ms,
            crate::animation::DEFAULT_FRAME_INTERVAL_MS
        );
    }

    #[test]
    fn garbage_json_is_a_data_error() {
        assert!(Profile::from_json("char/bad", "{ nope").is_err());
    }

    #[test]
    fn animation_set_requires_an_idle_clip() {
        let mut p = Profile::from_json("char/skeleton", MINIMAL).unwrap();
        assert!(p.animation_set("char/skeleton").is_ok());
        p.animations.clear();
        assert!(matches!(
            p.animation_set("char/skeleton"),
            Err(DataError::MissingFallbackClip(_))
        ));
    }
}
