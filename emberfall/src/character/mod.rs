//! The character state machine: movement, combat, skills, possessions.
//!
//! A character never has its state assigned by input handling. Input (or
//! AI) calls the action methods below, which only flip boolean flags after
//! checking their "disallowed" predicates; `determine_state` then derives
//! the single current state from the flags and the body's velocity, every
//! frame, in a fixed priority order. The disallowed predicates are pure and
//! silent: calling an action in the wrong state is routine, not an error,
//! so handlers can fire them unconditionally every frame.

pub mod npc;
pub mod party;
pub mod player;
pub mod profile;
pub mod state;

use std::collections::HashSet;
use std::sync::Mutex;

use glam::Vec2;
use log::warn;

use crate::actor::{Actor, ActorId, Facing};
use crate::animation::{AnimationSet, Animator};
use crate::callbacks::{CallbackId, CallbackManager};
use crate::error::DataError;
use crate::events::OutputQueue;
use crate::items::{EquipmentSlots, Inventory, ItemKind};
use crate::math;
use crate::physics::{
    category, BodyBuilder, BodyKind, FixtureDef, FixtureKind, PhysicsWorld, Shape, STOP_DAMPING,
};
use crate::skill::Skill;

pub use npc::{AiIntent, Disposition, NpcData};
pub use party::PartyId;
pub use player::PlayerData;
pub use profile::Profile;
pub use state::CharacterState;

/// Horizontal impulse applied per move call, before body-area scaling.
const MOVE_IMPULSE: f32 = 4.0;
/// |vx| below this is "standing still" for state derivation.
const MOVING_EPS: f32 = 5.0;
/// Downward velocity above this reads as falling.
const FALLING_EPS: f32 = 60.0;
/// Seconds after a jump during which jump input is ignored.
const JUMP_INPUT_LOCK: f32 = 0.2;
/// Seconds of run before the start-up clip yields to the run loop.
const RUN_START_DURATION: f32 = 0.15;
/// Seconds the stop clip plays after running ends.
const RUN_STOP_DURATION: f32 = 0.12;
/// Grace period distinguishing "stopped trying to move" from "sliding".
const MOVE_GRACE: f32 = 0.1;
/// Landing speed (px/s) above which the character has to pick itself up.
const HARD_LANDING_SPEED: f32 = 620.0;
/// Horizontal dodge speed, px/s.
const DODGE_SPEED: f32 = 320.0;
const DODGE_LIFT: f32 = 80.0;

/// Player or NPC payload. Composition instead of subclassing: the map
/// drives NPC AI through the same action methods input handling uses.
#[derive(Debug)]
pub enum Role {
    Player(PlayerData),
    Npc(NpcData),
}

impl Role {
    pub fn is_player(&self) -> bool {
        matches!(self, Role::Player(_))
    }
}

/// Result of a skill activation attempt.
#[derive(Debug)]
pub enum SkillActivation {
    /// Disallowed state, unknown skill, cooldown, or not enough magicka.
    Rejected,
    /// The skill was toggleable and active; this press switched it off.
    Deactivated,
    Activated { fork: Option<SkillFork> },
}

/// A fork-on-activation skill wants an independent projectile actor.
#[derive(Clone, Debug)]
pub struct SkillFork {
    pub skill_key: String,
    pub damage: i32,
    pub speed: f32,
    pub lifetime: f32,
    pub hit_sound: String,
}

pub struct Character {
    id: ActorId,
    pub profile: Profile,
    pub role: Role,
    pub facing: Facing,

    // Contact-derived flags. The router writes these before
    // `determine_state` reads them in the same frame.
    pub(crate) is_on_ground: bool,
    pub(crate) is_on_platform: bool,
    pub(crate) ground_slope: f32,

    // Action flags.
    pub(crate) is_jumping: bool,
    pub(crate) is_double_jumping: bool,
    pub(crate) double_jump_used: bool,
    jump_locked_until: f32,
    pub(crate) is_crouching: bool,
    pub(crate) is_attacking: bool,
    attack_request: Option<CharacterState>,
    pub(crate) is_using_skill: bool,
    pub(crate) active_skill: Option<String>,
    pub(crate) is_blocking: bool,
    hit_block_remaining: f32,
    dodge: Option<CharacterState>,
    pub is_weapon_sheathed: bool,
    sheath_remaining: f32,
    unsheath_remaining: f32,
    stun_remaining: f32,
    intro_remaining: f32,
    pub(crate) is_taking_damage: bool,
    pub(crate) is_taking_damage_from_trap: bool,
    pub(crate) is_getting_up_from_fall: bool,
    pub is_invincible: bool,
    pub(crate) is_set_to_kill: bool,
    pub(crate) is_killed: bool,

    // Movement bookkeeping.
    clock: f32,
    last_move_attempt: f32,
    run_time: f32,
    stop_run_timer: f32,
    pub(crate) last_velocity: Vec2,

    // Cross-actor references, ids only.
    pub in_range_targets: HashSet<ActorId>,
    pub nearby_items: Vec<ActorId>,
    pub nearby_portals: Vec<ActorId>,
    pub nearby_interactables: Vec<ActorId>,
    pub locked_on_target: Option<ActorId>,
    pub party: Option<PartyId>,

    pub inventory: Inventory,
    pub equipment: EquipmentSlots,
    pub skills: Vec<Skill>,

    animation: AnimationSet,
    pub animator: Animator,
    state: CharacterState,
    visible: bool,

    // The only real locks in the simulation: callback cancellation may be
    // requested from outside the update context, so the pending-id sets are
    // mutex-guarded.
    cancel_attack_callback_ids: Mutex<HashSet<CallbackId>>,
    inflict_damage_callback_ids: Mutex<HashSet<CallbackId>>,
}

impl Character {
    pub fn new(id: ActorId, profile: Profile, role: Role) -> Result<Self, DataError> {
        let animation = profile.animation_set(&profile.name)?;
        let idle = animation.clip("idle").clone();
        Ok(Self {
            id,
            profile,
            role,
            facing: Facing::Right,
            is_on_ground: false,
            is_on_platform: false,
            ground_slope: 0.0,
            is_jumping: false,
            is_double_jumping: false,
            double_jump_used: false,
            jump_locked_until: 0.0,
            is_crouching: false,
            is_attacking: false,
            attack_request: None,
            is_using_skill: false,
            active_skill: None,
            is_blocking: false,
            hit_block_remaining: 0.0,
            dodge: None,
            is_weapon_sheathed: false,
            sheath_remaining: 0.0,
            unsheath_remaining: 0.0,
            stun_remaining: 0.0,
            intro_remaining: 0.0,
            is_taking_damage: false,
            is_taking_damage_from_trap: false,
            is_getting_up_from_fall: false,
            is_invincible: false,
            is_set_to_kill: false,
            is_killed: false,
            clock: 0.0,
            last_move_attempt: -1.0,
            run_time: 0.0,
            stop_run_timer: 0.0,
            last_velocity: Vec2::ZERO,
            in_range_targets: HashSet::new(),
            nearby_items: Vec::new(),
            nearby_portals: Vec::new(),
            nearby_interactables: Vec::new(),
            locked_on_target: None,
            party: None,
            inventory: Inventory::new(),
            equipment: EquipmentSlots::new(),
            skills: Vec::new(),
            animation,
            animator: Animator::new("idle", &idle),
            state: CharacterState::Idle,
            visible: true,
            cancel_attack_callback_ids: Mutex::new(HashSet::new()),
            inflict_damage_callback_ids: Mutex::new(HashSet::new()),
        })
    }

    pub fn state(&self) -> CharacterState {
        self.state
    }

    pub fn is_player(&self) -> bool {
        self.role.is_player()
    }

    pub fn npc_data(&self) -> Option<&NpcData> {
        match &self.role {
            Role::Npc(data) => Some(data),
            Role::Player(_) => None,
        }
    }

    pub fn npc_data_mut(&mut self) -> Option<&mut NpcData> {
        match &mut self.role {
            Role::Npc(data) => Some(data),
            Role::Player(_) => None,
        }
    }

    pub fn player_data(&self) -> Option<&PlayerData> {
        match &self.role {
            Role::Player(data) => Some(data),
            Role::Npc(_) => None,
        }
    }

    pub fn player_data_mut(&mut self) -> Option<&mut PlayerData> {
        match &mut self.role {
            Role::Player(data) => Some(data),
            Role::Npc(_) => None,
        }
    }

    /// Definition key identifying what this character is, for quests and
    /// loot ("the player" for the player).
    pub fn profile_key(&self) -> &str {
        match &self.role {
            Role::Player(_) => "player",
            Role::Npc(data) => &data.profile_key,
        }
    }

    // ---------------------------------------------------------------
    // Body lifecycle
    // ---------------------------------------------------------------

    fn body_category(&self) -> u32 {
        match &self.role {
            Role::Player(_) => category::PLAYER,
            Role::Npc(data) => data.disposition.body_category(),
        }
    }

    fn weapon_mask(&self) -> u32 {
        match &self.role {
            Role::Player(_) => category::ENEMY,
            Role::Npc(data) => data.disposition.weapon_mask(),
        }
    }

    /// Create the body and its three fixtures (four for interactable NPCs).
    pub fn create_body(&self, physics: &mut PhysicsWorld, position: Vec2) -> anyhow::Result<()> {
        let w = self.profile.body_width;
        let h = self.profile.body_height;
        let radius = w / 2.0;
        let half_height = ((h - w) / 2.0).max(1.0);

        let mut builder = BodyBuilder::new(BodyKind::Dynamic, position)
            .lock_rotations()
            .fixture(FixtureDef::new(
                FixtureKind::Body,
                Shape::CapsuleY {
                    half_height,
                    radius,
                },
                self.body_category(),
                category::TERRAIN
                    | category::WEAPON
                    | category::TRIGGER
                    | category::PROJECTILE,
            ))
            .fixture(
                FixtureDef::new(
                    FixtureKind::Feet,
                    Shape::Circle {
                        radius: radius * 0.8,
                    },
                    category::FEET,
                    category::GROUND
                        | category::PLATFORM
                        | category::ITEM
                        | category::PORTAL
                        | category::INTERACTION
                        | category::CLIFF_MARKER,
                )
                .offset(Vec2::new(0.0, half_height + radius * 0.5))
                .sensor(),
            )
            .fixture(
                FixtureDef::new(
                    FixtureKind::Weapon,
                    Shape::Circle {
                        radius: self.profile.attack_range,
                    },
                    category::WEAPON,
                    self.weapon_mask(),
                )
                .sensor(),
            );

        if self.npc_data().map(|n| n.interactable).unwrap_or(false) {
            builder = builder.fixture(
                FixtureDef::new(
                    FixtureKind::Interaction,
                    Shape::Box {
                        hx: w,
                        hy: h / 2.0,
                    },
                    category::INTERACTION,
                    category::FEET,
                )
                .sensor(),
            );
        }

        builder.build(physics, self.id)
    }

    /// Rebuild the body of a killed character and restore its vitals.
    pub fn resurrect(&mut self, physics: &mut PhysicsWorld, position: Vec2) -> anyhow::Result<()> {
        if !self.is_killed {
            warn!("{} is not dead; nothing to resurrect", self.profile.name);
            return Ok(());
        }
        self.is_killed = false;
        self.is_set_to_kill = false;
        self.is_taking_damage = false;
        self.is_taking_damage_from_trap = false;
        self.profile.health = self.profile.full_health;
        self.create_body(physics, position)
    }

    // ---------------------------------------------------------------
    // Derived stats
    // ---------------------------------------------------------------

    pub fn effective_move_speed(&self) -> f32 {
        self.profile.move_speed + self.equipment.total_bonus(&self.inventory).move_speed
    }

    pub fn effective_jump_height(&self) -> f32 {
        self.profile.jump_height + self.equipment.total_bonus(&self.inventory).jump_height
    }

    /// Melee damage per hit: profile, equipment, and any active skill bonus.
    pub fn melee_damage(&self) -> i32 {
        let equipment = self.equipment.total_bonus(&self.inventory).melee_damage;
        let skill = self
            .active_skill
            .as_deref()
            .and_then(|key| self.skill(key))
            .map(|s| s.def.bonus_melee_damage)
            .unwrap_or(0);
        self.profile.melee_damage() + equipment + skill
    }

    pub fn skill(&self, key: &str) -> Option<&Skill> {
        self.skills.iter().find(|s| s.key == key)
    }

    pub fn skill_mut(&mut self, key: &str) -> Option<&mut Skill> {
        self.skills.iter_mut().find(|s| s.key == key)
    }

    // ---------------------------------------------------------------
    // Disallowed-state predicates (pure, side-effect free)
    // ---------------------------------------------------------------

    pub fn is_attacking_disallowed(&self) -> bool {
        self.is_attacking
            || self.is_using_skill
            || self.is_stunned()
            || self.is_taking_damage
            || self.is_taking_damage_from_trap
            || self.is_blocking
            || self.dodge.is_some()
            || self.sheath_remaining > 0.0
            || self.unsheath_remaining > 0.0
            || self.is_weapon_sheathed
            || self.intro_remaining > 0.0
            || self.is_set_to_kill
            || self.is_killed
    }

    pub fn is_skill_activation_disallowed(&self) -> bool {
        self.is_using_skill
            || self.is_attacking
            || self.is_stunned()
            || self.is_taking_damage
            || self.is_taking_damage_from_trap
            || self.is_blocking
            || self.sheath_remaining > 0.0
            || self.unsheath_remaining > 0.0
            || self.is_set_to_kill
            || self.is_killed
    }

    pub fn is_movement_disallowed(&self) -> bool {
        self.is_crouching
            || self.is_attacking
            || self.is_stunned()
            || self.is_blocking
            || self.intro_remaining > 0.0
            || self.is_taking_damage
            || self.is_set_to_kill
            || self.is_killed
    }

    pub fn is_jump_disallowed(&self) -> bool {
        self.clock < self.jump_locked_until
            || self.is_crouching
            || self.is_attacking
            || self.is_stunned()
            || self.is_blocking
            || self.is_taking_damage
            || self.is_taking_damage_from_trap
            || self.is_using_skill
            || self.is_set_to_kill
            || self.is_killed
    }

    pub fn can_be_damaged(&self) -> bool {
        !self.is_invincible && !self.is_set_to_kill && !self.is_killed
    }

    pub fn is_stunned(&self) -> bool {
        self.stun_remaining > 0.0
    }

    pub fn is_attacking(&self) -> bool {
        self.is_attacking
    }

    pub fn is_crouching(&self) -> bool {
        self.is_crouching
    }

    pub fn is_blocking(&self) -> bool {
        self.is_blocking
    }

    pub fn is_taking_damage(&self) -> bool {
        self.is_taking_damage || self.is_taking_damage_from_trap
    }

    pub fn is_set_to_kill(&self) -> bool {
        self.is_set_to_kill
    }

    pub fn is_killed(&self) -> bool {
        self.is_killed
    }

    pub fn is_on_ground(&self) -> bool {
        self.is_on_ground
    }

    pub fn is_on_platform(&self) -> bool {
        self.is_on_platform
    }

    /// Whether a move was attempted within the grace period. Distinguishes
    /// "player let go of the key" from "body is sliding down a slope".
    pub fn is_trying_to_move_recently(&self) -> bool {
        self.clock - self.last_move_attempt < MOVE_GRACE
    }

    // ---------------------------------------------------------------
    // Movement
    // ---------------------------------------------------------------

    /// Apply one frame of horizontal movement. `dir` < 0 is left.
    pub fn move_toward(&mut self, dir: f32, physics: &mut PhysicsWorld) {
        if dir == 0.0 || self.is_movement_disallowed() {
            return;
        }
        self.facing = Facing::from_delta(dir);
        self.last_move_attempt = self.clock;

        let mut impulse = Vec2::new(
            dir.signum() * MOVE_IMPULSE * self.profile.body_area_factor(),
            0.0,
        );
        if self.is_on_ground {
            impulse = math::rotate(impulse, self.ground_slope);
        }
        // The anti-slide damping must come off before the impulse lands, or
        // this step's integration will eat it.
        physics.set_linear_damping(self.id, 0.0);
        physics.apply_impulse(self.id, impulse);
    }

    pub fn jump(&mut self, physics: &mut PhysicsWorld) -> bool {
        if self.is_jump_disallowed() {
            return false;
        }
        let airborne = !self.is_on_ground && !self.is_on_platform;
        if airborne {
            if !(self.profile.can_double_jump && self.is_jumping && !self.double_jump_used) {
                return false;
            }
            self.double_jump_used = true;
            self.is_double_jumping = true;
        } else {
            self.is_jumping = true;
        }
        self.jump_locked_until = self.clock + JUMP_INPUT_LOCK;

        // Impulse sized to leave the body rising at exactly jump_height px/s.
        physics.set_linear_damping(self.id, 0.0);
        if let (Some(mass), Some(v)) = (physics.mass(self.id), physics.linear_velocity(self.id)) {
            let dv = -self.effective_jump_height() - v.y;
            physics.apply_impulse(self.id, Vec2::new(0.0, dv * mass));
        }
        true
    }

    /// Crouch. Idempotent: crouching again while already crouched changes
    /// nothing and touches no fixtures.
    pub fn crouch(&mut self) {
        if self.is_crouching
            || self.is_jumping
            || self.is_double_jumping
            || self.dodge.is_some()
            || self.is_attacking
            || (!self.is_on_ground && !self.is_on_platform)
        {
            return;
        }
        self.is_crouching = true;
    }

    pub fn get_up_from_crouching(&mut self) {
        self.is_crouching = false;
    }

    pub fn sheathe_weapon(&mut self) {
        if self.is_weapon_sheathed || self.sheath_remaining > 0.0 || self.is_attacking {
            return;
        }
        self.sheath_remaining = self.animation.duration(CharacterState::SheathingWeapon.key());
    }

    pub fn unsheathe_weapon(&mut self) {
        if !self.is_weapon_sheathed || self.unsheath_remaining > 0.0 {
            return;
        }
        self.unsheath_remaining = self
            .animation
            .duration(CharacterState::UnsheathingWeapon.key());
    }

    pub fn block(&mut self) {
        if self.is_attacking
            || self.is_using_skill
            || self.is_stunned()
            || self.is_taking_damage
            || self.dodge.is_some()
            || (!self.is_on_ground && !self.is_on_platform)
        {
            return;
        }
        self.is_blocking = true;
    }

    pub fn unblock(&mut self) {
        self.is_blocking = false;
    }

    /// Dodge in the given direction state. Costs player stamina.
    pub fn dodge(&mut self, which: CharacterState, physics: &mut PhysicsWorld) -> bool {
        if !which.is_dodge() {
            return false;
        }
        if self.dodge.is_some()
            || self.is_crouching
            || self.is_attacking
            || self.is_using_skill
            || self.is_stunned()
            || self.is_blocking
            || self.is_taking_damage
            || (!self.is_on_ground && !self.is_on_platform)
            || self.is_set_to_kill
            || self.is_killed
        {
            return false;
        }
        if self.role.is_player() {
            let cost = self.profile.stamina_cost_dodge;
            if self.profile.stamina < cost {
                return false;
            }
            self.profile.stamina -= cost;
        }

        let sign = match which {
            CharacterState::DodgingForward => self.facing.sign(),
            _ => -self.facing.sign(),
        };
        physics.set_linear_damping(self.id, 0.0);
        if let Some(mass) = physics.mass(self.id) {
            physics.apply_impulse(
                self.id,
                Vec2::new(sign * DODGE_SPEED * mass, -DODGE_LIFT * mass),
            );
        }
        self.dodge = Some(which);
        true
    }

    pub fn stun(&mut self, duration: f32) {
        self.stun_remaining = duration.max(self.stun_remaining);
    }

    pub fn play_intro(&mut self, duration: f32) {
        self.intro_remaining = duration;
    }

    /// Clamp grounded horizontal speed to the configured maximum. Dodging,
    /// jumping, and airborne characters are exempt.
    pub fn clamp_linear_velocity(&self, physics: &mut PhysicsWorld) {
        if self.dodge.is_some() || self.is_jumping || self.is_double_jumping {
            return;
        }
        if !self.is_on_ground && !self.is_on_platform {
            return;
        }
        if let Some(v) = physics.linear_velocity(self.id) {
            let max = self.effective_move_speed();
            if v.x.abs() > max {
                physics.set_linear_velocity(self.id, Vec2::new(v.x.signum() * max, v.y));
            }
        }
    }

    // ---------------------------------------------------------------
    // Combat
    // ---------------------------------------------------------------

    /// Start an attack.
    ///
    /// `eligible` is the pre-filtered snapshot of in-range, damageable
    /// targets. Damage lands `num_times` times per target, `interval`
    /// seconds apart, through deferred callbacks that re-validate the hit
    /// when they fire. Returns false when rejected *or* when the swing had
    /// no eligible target — the latter is a miss, with the animation,
    /// flags, and sound still played.
    pub fn attack(
        &mut self,
        requested: CharacterState,
        num_times: u32,
        interval: f32,
        eligible: &[ActorId],
        callbacks: &mut CallbackManager,
        out: &mut OutputQueue,
    ) -> bool {
        if !requested.is_attack() || self.is_attacking_disallowed() {
            return false;
        }

        self.is_attacking = true;
        self.attack_request = Some(requested);

        let duration = self
            .animation
            .duration(requested.key())
            .max(self.profile.attack_time);
        let me = self.id;
        let clear_id = callbacks.run_after(duration, move |ctx| {
            if let Some(character) = ctx.map.character_mut(me) {
                character.finish_attack();
            }
        });
        self.cancel_attack_callback_ids
            .lock()
            .unwrap()
            .insert(clear_id);

        let sound_key = if self.equipment.get(crate::items::EquipmentSlot::Weapon).is_some() {
            "attack_weapon"
        } else {
            "attack_unarmed"
        };
        out.sound(self.profile.sound(sound_key));

        if eligible.is_empty() {
            return false; // swing missed, not rejected
        }

        let damage = self.melee_damage();
        let mut pending = self.inflict_damage_callback_ids.lock().unwrap();
        for &victim in eligible {
            for hit in 1..=num_times.max(1) {
                let attacker = self.id;
                let id = callbacks.run_after(interval * hit as f32, move |ctx| {
                    crate::combat::inflict_damage(ctx, attacker, victim, damage);
                });
                pending.insert(id);
            }
        }
        true
    }

    /// Clear the attacking flag and forget pending callback ids. Run by the
    /// auto-clear callback when the swing completes.
    pub(crate) fn finish_attack(&mut self) {
        self.is_attacking = false;
        self.attack_request = None;
        self.cancel_attack_callback_ids.lock().unwrap().clear();
        self.inflict_damage_callback_ids.lock().unwrap().clear();
    }

    /// Forcibly interrupt an in-flight attack, cancelling every pending
    /// auto-clear and damage callback.
    pub fn cancel_attack(&mut self, callbacks: &mut CallbackManager) {
        for id in self.cancel_attack_callback_ids.lock().unwrap().drain() {
            callbacks.cancel(id);
        }
        for id in self.inflict_damage_callback_ids.lock().unwrap().drain() {
            callbacks.cancel(id);
        }
        self.is_attacking = false;
        self.attack_request = None;
    }

    /// Number of damage callbacks still pending. Test hook.
    pub fn pending_damage_callbacks(&self) -> usize {
        self.inflict_damage_callback_ids.lock().unwrap().len()
    }

    /// Activate (or toggle off) a learned skill.
    pub fn activate_skill(
        &mut self,
        key: &str,
        callbacks: &mut CallbackManager,
        out: &mut OutputQueue,
    ) -> SkillActivation {
        let (toggle_off, ready, def) = match self.skills.iter().find(|s| s.key == key) {
            Some(skill) => (
                skill.def.toggleable && skill.active,
                skill.ready(),
                skill.def.clone(),
            ),
            None => {
                warn!("{} does not know skill `{key}`", self.profile.name);
                return SkillActivation::Rejected;
            }
        };

        if toggle_off {
            if let Some(skill) = self.skill_mut(key) {
                skill.on_deactivated();
            }
            if self.active_skill.as_deref() == Some(key) {
                self.is_using_skill = false;
                self.active_skill = None;
            }
            return SkillActivation::Deactivated;
        }

        if self.is_skill_activation_disallowed() || !ready {
            return SkillActivation::Rejected;
        }
        if self.profile.magicka < def.magicka_cost {
            return SkillActivation::Rejected;
        }
        self.profile.magicka -= def.magicka_cost;

        if let Some(skill) = self.skill_mut(key) {
            skill.on_activated();
        }
        self.is_using_skill = true;
        self.active_skill = Some(key.to_string());
        out.sound(&def.activate_sound);

        let me = self.id;
        let skill_key = key.to_string();
        callbacks.run_after(def.duration.max(0.05), move |ctx| {
            if let Some(character) = ctx.map.character_mut(me) {
                character.clear_skill(&skill_key);
            }
        });

        let fork = def.fork_on_activation.then(|| SkillFork {
            skill_key: key.to_string(),
            damage: def.damage,
            speed: def.projectile_speed,
            lifetime: def.projectile_lifetime,
            hit_sound: def.hit_sound.clone(),
        });
        SkillActivation::Activated { fork }
    }

    pub(crate) fn clear_skill(&mut self, key: &str) {
        if self.active_skill.as_deref() == Some(key) {
            self.is_using_skill = false;
            self.active_skill = None;
        }
        if let Some(skill) = self.skill_mut(key) {
            skill.on_deactivated();
        }
    }

    /// Notify the active skill that the weapon sensor touched a victim.
    pub(crate) fn notify_skill_melee_contact(&mut self) {
        if let Some(key) = self.active_skill.clone() {
            if let Some(skill) = self.skill_mut(&key) {
                skill.on_melee_contact();
            }
        }
    }

    // Damage-window mutators driven by `combat`.

    pub(crate) fn begin_damage_window(&mut self, from_trap: bool) {
        if from_trap {
            self.is_taking_damage_from_trap = true;
        } else {
            self.is_taking_damage = true;
        }
    }

    pub(crate) fn end_damage_window(&mut self) {
        self.is_taking_damage = false;
        self.is_taking_damage_from_trap = false;
    }

    pub(crate) fn begin_hit_while_blocking(&mut self) {
        self.hit_block_remaining = self
            .animation
            .duration(CharacterState::HitWhileBlocking.key())
            .max(0.1);
    }

    pub(crate) fn set_to_kill(&mut self) {
        self.is_set_to_kill = true;
    }

    pub(crate) fn mark_killed(&mut self) {
        self.is_killed = true;
    }

    /// Duration of the kill animation, used to schedule body destruction.
    pub fn killed_clip_duration(&self) -> f32 {
        self.animation.duration(CharacterState::Killed.key()).max(0.1)
    }

    // ---------------------------------------------------------------
    // Items
    // ---------------------------------------------------------------

    /// Use a consumable by key: restores vitals and consumes one.
    pub fn use_item(&mut self, key: &str, out: &mut OutputQueue) -> bool {
        let Some(item) = self.inventory.get(key) else {
            warn!("{} does not carry `{key}`", self.profile.name);
            return false;
        };
        let ItemKind::Consumable {
            restore_health,
            restore_stamina,
            restore_magicka,
            ref use_sound,
        } = item.def.kind
        else {
            warn!("`{key}` is not a consumable");
            return false;
        };
        let sound = use_sound.clone();
        self.profile.restore_health(restore_health);
        self.profile.restore_stamina(restore_stamina);
        self.profile.restore_magicka(restore_magicka);
        self.inventory.remove(key, 1);
        out.sound(sound);
        true
    }

    // ---------------------------------------------------------------
    // Per-frame update
    // ---------------------------------------------------------------

    /// Advance timers, derive the state, and drive the animator. Runs after
    /// the physics step and contact routing of the same frame.
    pub fn update(&mut self, dt: f32, physics: &mut PhysicsWorld) {
        self.clock += dt;
        for skill in &mut self.skills {
            skill.update(dt);
        }
        self.stun_remaining = (self.stun_remaining - dt).max(0.0);
        self.intro_remaining = (self.intro_remaining - dt).max(0.0);
        self.hit_block_remaining = (self.hit_block_remaining - dt).max(0.0);
        self.stop_run_timer = (self.stop_run_timer - dt).max(0.0);
        if self.sheath_remaining > 0.0 {
            self.sheath_remaining -= dt;
            if self.sheath_remaining <= 0.0 {
                self.is_weapon_sheathed = true;
            }
        }
        if self.unsheath_remaining > 0.0 {
            self.unsheath_remaining -= dt;
            if self.unsheath_remaining <= 0.0 {
                self.is_weapon_sheathed = false;
            }
        }

        let velocity = physics.linear_velocity(self.id).unwrap_or(Vec2::ZERO);

        // Run start/stop bookkeeping.
        let moving = velocity.x.abs() > MOVING_EPS;
        let was_moving = self.last_velocity.x.abs() > MOVING_EPS;
        if moving {
            self.run_time += dt;
        } else {
            if was_moving && self.is_on_ground {
                self.stop_run_timer = RUN_STOP_DURATION;
            }
            self.run_time = 0.0;
        }

        // Anti-slide: a grounded character that is not trying to move gets
        // effectively infinite damping so slopes do not drag it.
        if physics.has_body(self.id) {
            let grounded = self.is_on_ground || self.is_on_platform;
            let anchored = grounded
                && !self.is_trying_to_move_recently()
                && self.dodge.is_none()
                && !self.is_jumping
                && !self.is_double_jumping
                && !self.is_taking_damage;
            if anchored {
                physics.set_linear_damping(self.id, STOP_DAMPING);
            } else {
                physics.set_linear_damping(self.id, 0.0);
            }
            self.clamp_linear_velocity(physics);
        }

        let next = self.determine_state(velocity);
        if next != self.state {
            self.state = next;
            self.animator.play(next.key(), self.animation.clip(next.key()));
        }
        let finished = self.animator.update(dt);
        if finished {
            match self.state {
                CharacterState::DodgingBackward | CharacterState::DodgingForward => {
                    self.dodge = None;
                }
                CharacterState::GettingUpFromFall => {
                    self.is_getting_up_from_fall = false;
                }
                _ => {}
            }
        }

        self.last_velocity = velocity;
    }

    /// Derive the single current state from flags and velocity. Highest
    /// priority first; each predicate is mutually exclusive with the ones
    /// below it by construction.
    pub fn determine_state(&self, velocity: Vec2) -> CharacterState {
        use CharacterState::*;

        if self.is_set_to_kill || self.is_killed {
            return Killed;
        }
        if self.intro_remaining > 0.0 {
            return Intro;
        }
        if self.is_stunned() {
            return Stunned;
        }
        if self.is_taking_damage_from_trap {
            return TakingDamageFromTrap;
        }
        if self.is_taking_damage {
            return TakingDamage;
        }
        if self.is_getting_up_from_fall {
            return GettingUpFromFall;
        }
        if self.hit_block_remaining > 0.0 {
            return HitWhileBlocking;
        }
        if self.is_blocking {
            return Blocking;
        }
        if self.is_attacking {
            let requested = self.attack_request.unwrap_or(Attacking);
            if self.is_crouching {
                return AttackingCrouch;
            }
            if !self.is_on_ground && !self.is_on_platform {
                return if requested == AttackingMidairDownward {
                    AttackingMidairDownward
                } else {
                    AttackingMidair
                };
            }
            return requested;
        }
        if self.is_using_skill {
            return SpellCasting;
        }
        if let Some(dodge) = self.dodge {
            return dodge;
        }
        if self.sheath_remaining > 0.0 {
            return SheathingWeapon;
        }
        if self.unsheath_remaining > 0.0 {
            return UnsheathingWeapon;
        }
        if !self.is_on_ground && !self.is_on_platform {
            if velocity.y > FALLING_EPS {
                return Falling;
            }
            if self.is_double_jumping {
                return DoubleJumping;
            }
            if self.is_jumping {
                return Jumping;
            }
        }
        if self.is_crouching {
            return Crouching;
        }
        if velocity.x.abs() > MOVING_EPS {
            if self.run_time < RUN_START_DURATION {
                return RunningStart;
            }
            return if self.is_weapon_sheathed {
                RunningSheathed
            } else {
                Running
            };
        }
        if self.stop_run_timer > 0.0 {
            return RunningStop;
        }
        if self.is_weapon_sheathed {
            IdleSheathed
        } else {
            Idle
        }
    }

    /// Contact router: the character landed on ground or a platform.
    pub(crate) fn on_landed(&mut self, on_platform: bool, slope: f32) {
        if on_platform {
            self.is_on_platform = true;
        } else {
            self.is_on_ground = true;
        }
        self.ground_slope = slope;
        self.is_jumping = false;
        self.is_double_jumping = false;
        self.double_jump_used = false;
        if self.last_velocity.y > HARD_LANDING_SPEED {
            self.is_getting_up_from_fall = true;
        }
    }

    /// Contact router: the character left ground or a platform.
    pub(crate) fn on_left_surface(&mut self, on_platform: bool) {
        if on_platform {
            self.is_on_platform = false;
        } else {
            self.is_on_ground = false;
        }
    }

    /// Drop everything that only meant something in the map being left:
    /// contact-derived flags and per-map actor references. Called when the
    /// character travels to another map.
    pub fn reset_map_local_state(&mut self) {
        self.is_on_ground = false;
        self.is_on_platform = false;
        self.ground_slope = 0.0;
        self.in_range_targets.clear();
        self.nearby_items.clear();
        self.nearby_portals.clear();
        self.nearby_interactables.clear();
        self.locked_on_target = None;
    }

    /// Forget every reference to a dead or despawned actor.
    pub(crate) fn forget_actor(&mut self, actor: ActorId) {
        self.in_range_targets.remove(&actor);
        self.nearby_items.retain(|a| *a != actor);
        self.nearby_portals.retain(|a| *a != actor);
        self.nearby_interactables.retain(|a| *a != actor);
        if self.locked_on_target == Some(actor) {
            self.locked_on_target = None;
        }
    }
}

impl Actor for Character {
    fn id(&self) -> ActorId {
        self.id
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::profile::test_profile;
    use crate::events::OutputEvent;

    fn test_character() -> Character {
        Character::new(
            ActorId::from_raw(1),
            test_profile("Hero"),
            Role::Player(PlayerData::new()),
        )
        .unwrap()
    }

    #[test]
    fn idle_by_default_and_running_when_moving() {
        let mut c = test_character();
        c.is_on_ground = true;
        assert_eq!(c.determine_state(Vec2::ZERO), CharacterState::Idle);
        c.run_time = 1.0;
        assert_eq!(
            c.determine_state(Vec2::new(100.0, 0.0)),
            CharacterState::Running
        );
        c.run_time = 0.0;
        assert_eq!(
            c.determine_state(Vec2::new(100.0, 0.0)),
            CharacterState::RunningStart
        );
    }

    #[test]
    fn kill_flag_dominates_everything() {
        let mut c = test_character();
        c.is_on_ground = true;
        c.is_blocking = true;
        c.stun_remaining = 1.0;
        c.is_set_to_kill = true;
        assert_eq!(c.determine_state(Vec2::new(300.0, 0.0)), CharacterState::Killed);
    }

    #[test]
    fn airborne_states_resolve_by_velocity_sign() {
        let mut c = test_character();
        c.is_on_ground = false;
        c.is_jumping = true;
        assert_eq!(
            c.determine_state(Vec2::new(0.0, -200.0)),
            CharacterState::Jumping
        );
        assert_eq!(
            c.determine_state(Vec2::new(0.0, 200.0)),
            CharacterState::Falling
        );
    }

    #[test]
    fn crouch_is_idempotent_and_gated_by_jumping() {
        let mut c = test_character();
        c.is_on_ground = true;
        c.crouch();
        assert!(c.is_crouching());
        c.crouch();
        assert!(c.is_crouching());

        let mut jumper = test_character();
        jumper.is_on_ground = false;
        jumper.is_jumping = true;
        jumper.crouch();
        assert!(!jumper.is_crouching(), "cannot crouch mid-jump");
    }

    #[test]
    fn attack_rejects_non_attack_states_and_bad_contexts() {
        let mut c = test_character();
        let mut callbacks = CallbackManager::new();
        let mut out = OutputQueue::new();
        assert!(!c.attack(
            CharacterState::Blocking,
            1,
            0.1,
            &[],
            &mut callbacks,
            &mut out
        ));
        c.is_blocking = true;
        assert!(!c.attack(
            CharacterState::Attacking,
            1,
            0.1,
            &[],
            &mut callbacks,
            &mut out
        ));
        assert!(!c.is_attacking());
        assert_eq!(callbacks.pending(), 0, "no callbacks on rejection");
    }

    #[test]
    fn missed_swing_sets_flags_but_returns_false() {
        let mut c = test_character();
        let mut callbacks = CallbackManager::new();
        let mut out = OutputQueue::new();
        let hit = c.attack(
            CharacterState::Attacking,
            1,
            0.1,
            &[],
            &mut callbacks,
            &mut out,
        );
        assert!(!hit);
        assert!(c.is_attacking(), "miss still swings");
        assert_eq!(callbacks.pending(), 1, "only the auto-clear is scheduled");
    }

    #[test]
    fn swing_with_targets_schedules_damage_callbacks() {
        let mut c = test_character();
        let mut callbacks = CallbackManager::new();
        let mut out = OutputQueue::new();
        let victims = [ActorId::from_raw(9), ActorId::from_raw(10)];
        let hit = c.attack(
            CharacterState::Attacking,
            2,
            0.05,
            &victims,
            &mut callbacks,
            &mut out,
        );
        assert!(hit);
        assert_eq!(c.pending_damage_callbacks(), 4);
        assert_eq!(callbacks.pending(), 5);

        c.cancel_attack(&mut callbacks);
        assert!(!c.is_attacking());
        assert_eq!(callbacks.pending(), 0, "cancel sweeps every pending id");
    }

    #[test]
    fn second_attack_while_swinging_is_rejected() {
        let mut c = test_character();
        let mut callbacks = CallbackManager::new();
        let mut out = OutputQueue::new();
        c.attack(CharacterState::Attacking, 1, 0.1, &[], &mut callbacks, &mut out);
        assert!(!c.attack(
            CharacterState::AttackingForward,
            1,
            0.1,
            &[],
            &mut callbacks,
            &mut out
        ));
    }

    #[test]
    fn toggleable_skill_deactivates_on_second_activation() {
        let mut c = test_character();
        let mut callbacks = CallbackManager::new();
        let mut out = OutputQueue::new();
        c.skills.push(Skill::new("skill/cry", crate::skill::test_battle_cry()));

        assert!(matches!(
            c.activate_skill("skill/cry", &mut callbacks, &mut out),
            SkillActivation::Activated { fork: None }
        ));
        assert!(c.is_using_skill);
        assert!(matches!(
            c.activate_skill("skill/cry", &mut callbacks, &mut out),
            SkillActivation::Deactivated
        ));
        assert!(!c.is_using_skill);
    }

    #[test]
    fn skill_activation_costs_magicka_and_rejects_when_broke() {
        let mut c = test_character();
        let mut callbacks = CallbackManager::new();
        let mut out = OutputQueue::new();
        c.skills
            .push(Skill::new("skill/fireball", crate::skill::test_fireball()));
        c.profile.magicka = 25;

        match c.activate_skill("skill/fireball", &mut callbacks, &mut out) {
            SkillActivation::Activated { fork: Some(fork) } => {
                assert_eq!(fork.damage, 20);
            }
            other => panic!("expected forked activation, got {other:?}"),
        }
        assert_eq!(c.profile.magicka, 15);

        // Clear the activation window, then drain magicka below cost.
        c.clear_skill("skill/fireball");
        if let Some(s) = c.skill_mut("skill/fireball") {
            s.cooldown_remaining = 0.0;
        }
        c.profile.magicka = 5;
        assert!(matches!(
            c.activate_skill("skill/fireball", &mut callbacks, &mut out),
            SkillActivation::Rejected
        ));
    }

    #[test]
    fn use_item_restores_and_consumes() {
        let mut c = test_character();
        let mut out = OutputQueue::new();
        c.inventory.add("item/potion", &crate::items::test_potion(), 2);
        c.profile.health = 50;

        assert!(c.use_item("item/potion", &mut out));
        assert_eq!(c.profile.health, 75);
        assert_eq!(c.inventory.amount("item/potion"), 1);
        assert!(!c.use_item("item/missing", &mut out));
        assert!(out
            .events()
            .iter()
            .any(|e| matches!(e, OutputEvent::Sound(s) if s == "sfx/drink")));
    }

    #[test]
    fn landing_clears_jump_flags_and_hard_falls_need_getting_up() {
        let mut c = test_character();
        c.is_jumping = true;
        c.double_jump_used = true;
        c.last_velocity = Vec2::new(0.0, 100.0);
        c.on_landed(false, 0.0);
        assert!(c.is_on_ground);
        assert!(!c.is_jumping);
        assert!(!c.double_jump_used);
        assert!(!c.is_getting_up_from_fall);

        let mut faller = test_character();
        faller.last_velocity = Vec2::new(0.0, 900.0);
        faller.on_landed(false, 0.0);
        assert!(faller.is_getting_up_from_fall);
        assert_eq!(
            faller.determine_state(Vec2::ZERO),
            CharacterState::GettingUpFromFall
        );
    }
}
