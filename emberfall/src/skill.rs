//! Skill definitions and per-character skill instances.

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// One skill definition file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    pub name: String,
    #[serde(default)]
    pub magicka_cost: i32,
    /// Seconds the skill stays active once triggered. Zero means
    /// instantaneous.
    #[serde(default)]
    pub duration: f32,
    #[serde(default)]
    pub cooldown: f32,
    /// Toggleable skills deactivate on a second activation instead of
    /// rejecting it.
    #[serde(default)]
    pub toggleable: bool,
    /// Fork-on-activation skills spawn an independent projectile actor with
    /// its own lifetime; the caster's activation window ends on its own.
    #[serde(default)]
    pub fork_on_activation: bool,
    #[serde(default)]
    pub damage: i32,
    /// While active, melee swings hit this much harder.
    #[serde(default)]
    pub bonus_melee_damage: i32,
    #[serde(default = "default_projectile_speed")]
    pub projectile_speed: f32,
    #[serde(default = "default_projectile_lifetime")]
    pub projectile_lifetime: f32,
    #[serde(default)]
    pub activate_sound: String,
    #[serde(default)]
    pub hit_sound: String,
}

fn default_projectile_speed() -> f32 {
    420.0
}

fn default_projectile_lifetime() -> f32 {
    1.5
}

impl SkillDef {
    pub fn from_json(key: &str, json: &str) -> Result<Self, DataError> {
        serde_json::from_str(json).map_err(|e| DataError::Malformed {
            path: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// A learned skill: the definition plus live cooldown/activation tracking.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Skill {
    pub key: String,
    pub def: SkillDef,
    #[serde(default)]
    pub cooldown_remaining: f32,
    #[serde(default)]
    pub active: bool,
    /// Melee contacts observed while this skill was active. Contact routing
    /// notifies the active skill on every weapon touch.
    #[serde(default)]
    pub melee_contacts: u32,
}

impl Skill {
    pub fn new(key: impl Into<String>, def: SkillDef) -> Self {
        Self {
            key: key.into(),
            def,
            cooldown_remaining: 0.0,
            active: false,
            melee_contacts: 0,
        }
    }

    pub fn ready(&self) -> bool {
        self.cooldown_remaining <= 0.0
    }

    pub fn update(&mut self, dt: f32) {
        if self.cooldown_remaining > 0.0 {
            self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);
        }
    }

    pub fn on_activated(&mut self) {
        self.active = true;
        self.melee_contacts = 0;
        self.cooldown_remaining = self.def.cooldown;
    }

    pub fn on_deactivated(&mut self) {
        self.active = false;
    }

    pub fn on_melee_contact(&mut self) {
        if self.active {
            self.melee_contacts += 1;
        }
    }
}

#[cfg(test)]
pub(crate) fn test_fireball() -> SkillDef {
    SkillDef {
        name: "Fireball".into(),
        magicka_cost: 10,
        duration: 0.4,
        cooldown: 1.0,
        toggleable: false,
        fork_on_activation: true,
        damage: 20,
        bonus_melee_damage: 0,
        projectile_speed: 420.0,
        projectile_lifetime: 1.5,
        activate_sound: "sfx/fireball".into(),
        hit_sound: "sfx/fireball_hit".into(),
    }
}

#[cfg(test)]
pub(crate) fn test_battle_cry() -> SkillDef {
    SkillDef {
        name: "Battle Cry".into(),
        magicka_cost: 5,
        duration: 6.0,
        cooldown: 0.0,
        toggleable: true,
        fork_on_activation: false,
        damage: 0,
        bonus_melee_damage: 4,
        projectile_speed: 0.0,
        projectile_lifetime: 0.0,
        activate_sound: "sfx/battle_cry".into(),
        hit_sound: String::new(),
    }
}
