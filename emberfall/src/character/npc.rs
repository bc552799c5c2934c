//! NPC capabilities: disposition, AI strategy, interactability.
//!
//! NPCs are not a `Character` subclass. A character carries `NpcData` in its
//! role; the AI is a strategy the map drives once per frame, and
//! interactability is data consulted by the contact router.

use serde::{Deserialize, Serialize};

use crate::character::profile::Profile;
use crate::physics::category;

/// Friend/foe classification relative to the player. Decides which fixture
/// categories and masks the NPC's body and weapon get.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    #[default]
    Friendly,
    Hostile,
}

impl Disposition {
    pub fn body_category(self) -> u32 {
        match self {
            Disposition::Friendly => category::NPC,
            Disposition::Hostile => category::ENEMY,
        }
    }

    /// What this character's weapon sensor may touch.
    pub fn weapon_mask(self) -> u32 {
        match self {
            // Friendly NPCs fight alongside the player.
            Disposition::Friendly => category::ENEMY,
            Disposition::Hostile => category::PLAYER | category::NPC,
        }
    }
}

/// What the AI wants to do this frame. The map applies intents through the
/// same movement/combat entry points the player's input handler uses, so
/// all the disallowed-state gating applies identically.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AiIntent {
    /// -1.0 left, 1.0 right, None to stand still.
    pub move_dir: Option<f32>,
    pub attack: bool,
}

/// Sandbox wander + chase behavior.
#[derive(Clone, Debug)]
pub struct AiBehavior {
    /// Seconds until the next wander decision.
    wander_timer: f32,
    wander_dir: f32,
    /// Pixels within which a hostile NPC notices the player.
    pub vision_range: f32,
    /// Standing on a cliff-marker sensor; wandering reverses.
    pub on_cliff: bool,
    enabled: bool,
}

impl Default for AiBehavior {
    fn default() -> Self {
        Self {
            wander_timer: 0.0,
            wander_dir: 1.0,
            vision_range: 220.0,
            on_cliff: false,
            enabled: true,
        }
    }
}

impl AiBehavior {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Decide this frame's intent.
    ///
    /// `target_dx` is the signed pixel distance to the current lock-on (or
    /// seen) target, `target_in_attack_range` whether the weapon sensor
    /// already overlaps it.
    pub fn think(
        &mut self,
        dt: f32,
        target_dx: Option<f32>,
        target_in_attack_range: bool,
    ) -> AiIntent {
        if !self.enabled {
            return AiIntent::default();
        }

        if let Some(dx) = target_dx {
            if target_in_attack_range {
                return AiIntent {
                    move_dir: None,
                    attack: true,
                };
            }
            if dx.abs() <= self.vision_range {
                return AiIntent {
                    move_dir: Some(dx.signum()),
                    attack: false,
                };
            }
        }

        // Sandbox wander: drift one way for a while, rest, repeat.
        self.wander_timer -= dt;
        if self.wander_timer <= 0.0 {
            self.wander_timer = 1.0 + fastrand::f32() * 2.0;
            self.wander_dir = if fastrand::bool() { 1.0 } else { -1.0 };
        }
        if self.on_cliff {
            self.wander_dir = -self.wander_dir;
            self.on_cliff = false;
        }
        AiIntent {
            move_dir: Some(self.wander_dir),
            attack: false,
        }
    }
}

/// NPC role payload carried by a character.
#[derive(Clone, Debug)]
pub struct NpcData {
    /// Definition key this NPC was spawned from (loot/quest identity).
    pub profile_key: String,
    pub disposition: Disposition,
    pub ai: AiBehavior,
    /// Interactable NPCs get a fourth, interaction-sensor fixture and react
    /// to the interact action (dialogue, trading).
    pub interactable: bool,
}

impl NpcData {
    pub fn from_profile(profile_key: &str, profile: &Profile) -> Self {
        Self {
            profile_key: profile_key.to_string(),
            disposition: if profile.hostile {
                Disposition::Hostile
            } else {
                Disposition::Friendly
            },
            ai: AiBehavior::default(),
            interactable: profile.interactable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_selects_categories() {
        assert_eq!(Disposition::Hostile.body_category(), category::ENEMY);
        assert_eq!(Disposition::Friendly.body_category(), category::NPC);
        assert_ne!(
            Disposition::Hostile.weapon_mask() & category::PLAYER,
            0,
            "hostile weapons must reach the player"
        );
        assert_eq!(
            Disposition::Friendly.weapon_mask() & category::PLAYER,
            0,
            "friendly weapons must not hit the player"
        );
    }

    #[test]
    fn ai_attacks_in_range_and_chases_in_vision() {
        let mut ai = AiBehavior::default();
        let intent = ai.think(0.016, Some(-80.0), true);
        assert!(intent.attack);
        assert_eq!(intent.move_dir, None);

        let intent = ai.think(0.016, Some(-80.0), false);
        assert_eq!(intent.move_dir, Some(-1.0));
        assert!(!intent.attack);
    }

    #[test]
    fn cliff_flag_reverses_wander() {
        let mut ai = AiBehavior::default();
        // No target: wandering.
        let first = ai.think(0.016, None, false).move_dir.unwrap();
        ai.on_cliff = true;
        let second = ai.think(0.016, None, false).move_dir.unwrap();
        assert_eq!(first, -second);
    }
}
