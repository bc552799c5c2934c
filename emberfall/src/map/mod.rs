//! `GameMap`: one loaded map and every actor spawned into it.
//!
//! The map owns its actors; the physics world is owned by the manager and
//! rebuilt wholesale on map swaps, so no stale body can survive a
//! transition.

pub mod interactables;
pub mod manager;
pub mod tilemap;

use std::collections::HashMap;

use anyhow::Result;
use glam::Vec2;
use log::warn;

use crate::actor::{Actor, ActorId, ActorIdGen, DroppedItem, Projectile};
use crate::character::{Character, CharacterState, NpcData, Role, SkillActivation, SkillFork};
use crate::defs::DefLibrary;
use crate::callbacks::CallbackManager;
use crate::events::{OutputEvent, OutputQueue};
use crate::math::Rect;
use crate::physics::{category, BodyBuilder, BodyKind, FixtureDef, FixtureKind, PhysicsWorld, Shape};
use crate::scene::WorldCtx;
use crate::skill::Skill;

use interactables::{Chest, ObjectKind, ObjectStates, Portal, TriggerZone};
use tilemap::{
    MapObject, TileMapFile, LAYER_CHEST, LAYER_CLIFF_MARKER, LAYER_GROUND, LAYER_NPCS,
    LAYER_PLATFORM, LAYER_PLAYER, LAYER_PORTAL, LAYER_TRIGGER, LAYER_WALL,
};

/// A pending portal traversal, picked up by the scene after the frame's
/// reactions have been applied (map swaps never happen mid-update).
#[derive(Clone, Debug)]
pub struct PortalRequest {
    pub traveler: ActorId,
    pub target_map: String,
    pub target_portal: u32,
    /// Lateral offset to apply at the destination, when the source portal
    /// was marked `shouldAdjustOffsetX`.
    pub offset_x: Option<f32>,
}

pub struct GameMap {
    pub path: String,
    pub bounds: Rect,
    pub player_spawn: Vec2,

    characters: HashMap<ActorId, Character>,
    pub items: HashMap<ActorId, DroppedItem>,
    pub projectiles: HashMap<ActorId, Projectile>,
    pub portals: HashMap<ActorId, Portal>,
    pub chests: HashMap<ActorId, Chest>,
    pub triggers: HashMap<ActorId, TriggerZone>,

    player: Option<ActorId>,

    /// Requests surfaced to the scene at the end of the frame.
    pub requested_portal: Option<PortalRequest>,
    pub requested_map: Option<String>,
    pub requested_commands: Vec<String>,
}

impl GameMap {
    /// Build a map from its file: static collision geometry first, then
    /// interactables and NPCs. Persisted object state overrides authored
    /// defaults.
    pub fn load(
        lib: &DefLibrary,
        path: &str,
        physics: &mut PhysicsWorld,
        id_gen: &mut ActorIdGen,
        states: &ObjectStates,
    ) -> Result<Self> {
        let file: TileMapFile = lib.map(path)?.clone();
        let mut map = Self {
            path: path.to_string(),
            bounds: file.bounds(),
            player_spawn: Vec2::new(file.width / 2.0, file.height / 2.0),
            characters: HashMap::new(),
            items: HashMap::new(),
            projectiles: HashMap::new(),
            portals: HashMap::new(),
            chests: HashMap::new(),
            triggers: HashMap::new(),
            player: None,
            requested_portal: None,
            requested_map: None,
            requested_commands: Vec::new(),
        };

        for object in file.objects(LAYER_GROUND) {
            map.spawn_static(physics, id_gen, FixtureKind::Ground, category::GROUND, u32::MAX, object.rect(), false)?;
        }
        for object in file.objects(LAYER_WALL) {
            map.spawn_static(physics, id_gen, FixtureKind::Wall, category::WALL, u32::MAX, object.rect(), false)?;
        }
        for object in file.objects(LAYER_PLATFORM) {
            map.spawn_static(physics, id_gen, FixtureKind::Platform, category::PLATFORM, u32::MAX, object.rect(), false)?;
        }
        for object in file.objects(LAYER_CLIFF_MARKER) {
            map.spawn_static(physics, id_gen, FixtureKind::CliffMarker, category::CLIFF_MARKER, category::FEET, object.rect(), true)?;
        }

        for object in file.objects(LAYER_PORTAL) {
            map.spawn_portal(lib, path, physics, id_gen, states, object)?;
        }
        for object in file.objects(LAYER_TRIGGER) {
            map.spawn_trigger(path, physics, id_gen, states, object)?;
        }
        for object in file.objects(LAYER_CHEST) {
            map.spawn_chest(path, physics, id_gen, states, object)?;
        }
        for object in file.objects(LAYER_NPCS) {
            let profile_key = object.require_str(path, "profile")?.to_string();
            map.spawn_npc(lib, &profile_key, physics, id_gen, object.center())?;
        }
        if let Some(object) = file.objects(LAYER_PLAYER).first() {
            map.player_spawn = object.center();
        }

        Ok(map)
    }

    fn spawn_static(
        &mut self,
        physics: &mut PhysicsWorld,
        id_gen: &mut ActorIdGen,
        kind: FixtureKind,
        cat: u32,
        mask: u32,
        rect: Rect,
        sensor: bool,
    ) -> Result<ActorId> {
        let id = id_gen.fresh();
        let mut fixture = FixtureDef::new(
            kind,
            Shape::Box {
                hx: rect.w / 2.0,
                hy: rect.h / 2.0,
            },
            cat,
            mask,
        )
        .friction(1.0);
        if sensor {
            fixture = fixture.sensor();
        }
        BodyBuilder::new(BodyKind::Fixed, rect.center())
            .fixture(fixture)
            .build(physics, id)?;
        Ok(id)
    }

    fn spawn_portal(
        &mut self,
        _lib: &DefLibrary,
        map_path: &str,
        physics: &mut PhysicsWorld,
        id_gen: &mut ActorIdGen,
        states: &ObjectStates,
        object: &MapObject,
    ) -> Result<()> {
        let target_map = object.require_str(map_path, "targetMap")?.to_string();
        let target_portal = object.prop_u32("targetPortalId").unwrap_or(0);
        let locked = states
            .get(map_path, ObjectKind::Portal, object.id)
            .map(|unlocked| !unlocked)
            .unwrap_or_else(|| object.prop_bool("isLocked"));

        let id = id_gen.fresh();
        self.spawn_sensor_rect(physics, id, FixtureKind::Portal, category::PORTAL, category::FEET, object.rect())?;
        self.portals.insert(
            id,
            Portal::new(
                id,
                object.id,
                object.rect(),
                target_map,
                target_portal,
                locked,
                object.prop_bool("shouldAdjustOffsetX"),
                object.prop_bool("triggerOnContact"),
            ),
        );
        Ok(())
    }

    fn spawn_trigger(
        &mut self,
        map_path: &str,
        physics: &mut PhysicsWorld,
        id_gen: &mut ActorIdGen,
        states: &ObjectStates,
        object: &MapObject,
    ) -> Result<()> {
        let commands: Vec<String> = object
            .prop_str("cmds")
            .map(|s| s.split(';').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect())
            .unwrap_or_default();
        let once = object.prop_bool("canBeTriggeredOnlyOnce");
        let fired = states
            .get(map_path, ObjectKind::Trigger, object.id)
            .unwrap_or(false);

        let id = id_gen.fresh();
        self.spawn_sensor_rect(physics, id, FixtureKind::Trigger, category::TRIGGER, category::ANY_CHARACTER, object.rect())?;
        let mut trigger = TriggerZone::new(
            id,
            object.id,
            object.rect(),
            commands,
            once,
            object.prop_bool("playerOnly"),
        );
        trigger.fired = fired;
        self.triggers.insert(id, trigger);
        Ok(())
    }

    fn spawn_chest(
        &mut self,
        map_path: &str,
        physics: &mut PhysicsWorld,
        id_gen: &mut ActorIdGen,
        states: &ObjectStates,
        object: &MapObject,
    ) -> Result<()> {
        // "items" is "key:amount,key:amount".
        let contents: Vec<(String, u32)> = object
            .prop_str("items")
            .map(|s| {
                s.split(',')
                    .filter_map(|pair| {
                        let (key, amount) = pair.split_once(':')?;
                        Some((key.trim().to_string(), amount.trim().parse().ok()?))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let id = id_gen.fresh();
        self.spawn_sensor_rect(physics, id, FixtureKind::Interaction, category::INTERACTION, category::FEET, object.rect())?;
        let mut chest = Chest::new(id, object.id, object.rect(), contents);
        chest.opened = states
            .get(map_path, ObjectKind::Chest, object.id)
            .unwrap_or(false);
        self.chests.insert(id, chest);
        Ok(())
    }

    fn spawn_sensor_rect(
        &mut self,
        physics: &mut PhysicsWorld,
        id: ActorId,
        kind: FixtureKind,
        cat: u32,
        mask: u32,
        rect: Rect,
    ) -> Result<()> {
        BodyBuilder::new(BodyKind::Fixed, rect.center())
            .fixture(
                FixtureDef::new(
                    kind,
                    Shape::Box {
                        hx: rect.w / 2.0,
                        hy: rect.h / 2.0,
                    },
                    cat,
                    mask,
                )
                .sensor(),
            )
            .build(physics, id)
    }

    /// Spawn an NPC from its definition, with default inventory and skills.
    pub fn spawn_npc(
        &mut self,
        lib: &DefLibrary,
        profile_key: &str,
        physics: &mut PhysicsWorld,
        id_gen: &mut ActorIdGen,
        position: Vec2,
    ) -> Result<ActorId> {
        let profile = lib.character(profile_key)?.clone();
        let npc_data = NpcData::from_profile(profile_key, &profile);
        let id = id_gen.fresh();
        let mut character = Character::new(id, profile, Role::Npc(npc_data))?;
        fill_possessions(lib, &mut character);
        character.create_body(physics, position)?;
        self.characters.insert(id, character);
        Ok(id)
    }

    /// Insert an externally-built character (the player arriving from
    /// another map) and give it a body.
    pub fn insert_character(
        &mut self,
        character: Character,
        physics: &mut PhysicsWorld,
        position: Vec2,
    ) -> Result<ActorId> {
        let id = character.id();
        if !character.is_killed() {
            character.create_body(physics, position)?;
        }
        if character.is_player() {
            self.player = Some(id);
        }
        self.characters.insert(id, character);
        Ok(id)
    }

    pub fn remove_character(&mut self, id: ActorId) -> Option<Character> {
        if self.player == Some(id) {
            self.player = None;
        }
        self.characters.remove(&id)
    }

    pub fn player_id(&self) -> Option<ActorId> {
        self.player
    }

    pub fn character(&self, id: ActorId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn character_mut(&mut self, id: ActorId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn characters_mut(&mut self) -> impl Iterator<Item = &mut Character> {
        self.characters.values_mut()
    }

    pub fn character_ids(&self) -> Vec<ActorId> {
        self.characters.keys().copied().collect()
    }

    /// Drop every reference any character holds to `actor`.
    pub fn purge_refs(&mut self, actor: ActorId) {
        for character in self.characters.values_mut() {
            character.forget_actor(actor);
        }
    }

    /// Attack on behalf of a character: snapshot the in-range targets that
    /// are actually damageable, then hand off to the state machine.
    pub fn character_attack(
        &mut self,
        attacker: ActorId,
        requested: CharacterState,
        num_times: u32,
        interval: f32,
        callbacks: &mut CallbackManager,
        out: &mut OutputQueue,
    ) -> bool {
        let eligible: Vec<ActorId> = match self.characters.get(&attacker) {
            Some(a) => a
                .in_range_targets
                .iter()
                .copied()
                .filter(|t| {
                    self.characters
                        .get(t)
                        .map(|c| c.can_be_damaged())
                        .unwrap_or(false)
                })
                .collect(),
            None => return false,
        };
        match self.characters.get_mut(&attacker) {
            Some(a) => a.attack(requested, num_times, interval, &eligible, callbacks, out),
            None => false,
        }
    }

    /// Activate a skill, spawning the forked projectile when the skill
    /// declares one.
    pub fn character_activate_skill(
        &mut self,
        actor: ActorId,
        key: &str,
        physics: &mut PhysicsWorld,
        id_gen: &mut ActorIdGen,
        callbacks: &mut CallbackManager,
        out: &mut OutputQueue,
    ) -> bool {
        let Some(character) = self.characters.get_mut(&actor) else {
            return false;
        };
        let activation = character.activate_skill(key, callbacks, out);
        let (facing, hostile_mask) = (
            character.facing,
            match character.npc_data() {
                Some(npc) => npc.disposition.weapon_mask(),
                None => category::ENEMY,
            },
        );
        match activation {
            SkillActivation::Rejected => false,
            SkillActivation::Deactivated => true,
            SkillActivation::Activated { fork } => {
                if let Some(fork) = fork {
                    if let Err(err) =
                        self.spawn_projectile(physics, id_gen, actor, &fork, facing.sign(), hostile_mask)
                    {
                        warn!("failed to fork skill `{}`: {err}", fork.skill_key);
                    }
                }
                true
            }
        }
    }

    pub fn spawn_projectile(
        &mut self,
        physics: &mut PhysicsWorld,
        id_gen: &mut ActorIdGen,
        owner: ActorId,
        fork: &SkillFork,
        dir_sign: f32,
        hostile_mask: u32,
    ) -> Result<ActorId> {
        let origin = physics
            .position(owner)
            .ok_or_else(|| anyhow::anyhow!("projectile owner has no body"))?;
        let id = id_gen.fresh();
        let projectile = Projectile::new(id, owner, fork.damage, fork.lifetime, &fork.hit_sound);
        projectile.create_body(
            physics,
            origin + Vec2::new(dir_sign * 24.0, -8.0),
            Vec2::new(dir_sign * fork.speed, 0.0),
            hostile_mask,
        )?;
        self.projectiles.insert(id, projectile);
        Ok(id)
    }

    pub fn spawn_dropped_item(
        &mut self,
        physics: &mut PhysicsWorld,
        id_gen: &mut ActorIdGen,
        key: &str,
        amount: u32,
        position: Vec2,
    ) -> Result<ActorId> {
        let id = id_gen.fresh();
        let item = DroppedItem::new(id, key, amount);
        item.create_body(physics, position)?;
        self.items.insert(id, item);
        Ok(id)
    }

    /// Drive NPC AI through the same action entry points as player input.
    pub fn drive_npcs(
        &mut self,
        dt: f32,
        physics: &mut PhysicsWorld,
        callbacks: &mut CallbackManager,
        out: &mut OutputQueue,
    ) {
        let player = self.player;
        let mut intents = Vec::new();
        for character in self.characters.values_mut() {
            if character.is_killed() || character.is_set_to_kill() {
                continue;
            }
            let id = character.id();
            let Some(position) = physics.position(id) else {
                continue;
            };
            let target = character.locked_on_target.or(match character.npc_data() {
                Some(npc) if npc.disposition == crate::character::Disposition::Hostile => player,
                _ => None,
            });
            let (target_dx, in_range) = match target {
                Some(t) => (
                    physics.position(t).map(|p| p.x - position.x),
                    character.in_range_targets.contains(&t),
                ),
                None => (None, false),
            };
            if let Some(npc) = character.npc_data_mut() {
                let intent = npc.ai.think(dt, target_dx, in_range);
                intents.push((id, intent));
            }
        }

        for (id, intent) in intents {
            if let Some(dir) = intent.move_dir {
                if let Some(character) = self.characters.get_mut(&id) {
                    character.move_toward(dir, physics);
                }
            }
            if intent.attack {
                self.character_attack(id, CharacterState::Attacking, 1, 0.1, callbacks, out);
            }
        }
    }

    /// Per-frame actor updates: characters derive their states, projectiles
    /// age out. Runs after contact routing.
    pub fn update_actors(&mut self, dt: f32, physics: &mut PhysicsWorld) {
        for character in self.characters.values_mut() {
            character.update(dt, physics);
        }

        let mut dead_projectiles = Vec::new();
        for projectile in self.projectiles.values_mut() {
            projectile.update(dt);
            if projectile.expired {
                dead_projectiles.push(projectile.id());
            }
        }
        for id in dead_projectiles {
            physics.remove_body(id);
            self.projectiles.remove(&id);
            self.purge_refs(id);
        }
    }
}

/// Give a freshly-spawned character its default inventory and skills.
pub fn fill_possessions(lib: &DefLibrary, character: &mut Character) {
    let defaults = character.profile.default_inventory.clone();
    for (key, amount) in defaults {
        match lib.item(&key) {
            Ok(def) => character.inventory.add(&key, def, amount),
            Err(_) => warn!("unknown default item `{key}` for {}", character.profile.name),
        }
    }
    let skills = character.profile.default_skills.clone();
    for key in skills {
        match lib.skill(&key) {
            Ok(def) => character.skills.push(Skill::new(&key, def.clone())),
            Err(_) => warn!("unknown default skill `{key}` for {}", character.profile.name),
        }
    }
}

// ---------------------------------------------------------------------
// Interactions (the feet-sensor "press up/interact" surface)
// ---------------------------------------------------------------------

/// Interact with whatever is closest at the character's feet: interactable
/// objects and NPCs first, then portals, then loose items.
pub fn interact(ctx: &mut WorldCtx<'_>, who: ActorId) -> bool {
    let (interactable, portal, item) = match ctx.map.character(who) {
        Some(c) => (
            c.nearby_interactables.first().copied(),
            c.nearby_portals.first().copied(),
            c.nearby_items.first().copied(),
        ),
        None => return false,
    };
    if let Some(target) = interactable {
        return interact_with(ctx, who, target);
    }
    if let Some(portal) = portal {
        return enter_portal(ctx, who, portal);
    }
    if let Some(item) = item {
        return pick_up_item(ctx, who, item);
    }
    false
}

/// Interact with a specific interactable actor (chest or NPC).
pub fn interact_with(ctx: &mut WorldCtx<'_>, who: ActorId, target: ActorId) -> bool {
    if ctx.map.chests.contains_key(&target) {
        return open_chest(ctx, who, target);
    }
    // An interactable NPC: open its dialogue tree.
    let npc_info = ctx.map.character(target).and_then(|c| {
        c.npc_data()
            .map(|n| (n.profile_key.clone(), c.profile.dialogue_tree.clone()))
    });
    if let Some((profile_key, default_tree)) = npc_info {
        let tree = ctx
            .dialogue
            .tree_for(&profile_key, default_tree.as_deref())
            .map(str::to_string);
        if let Some(tree) = tree {
            ctx.outputs.push(OutputEvent::Dialogue {
                npc: target,
                tree,
            });
            return true;
        }
    }
    false
}

pub fn open_chest(ctx: &mut WorldCtx<'_>, _who: ActorId, chest_id: ActorId) -> bool {
    let Some(chest) = ctx.map.chests.get_mut(&chest_id) else {
        return false;
    };
    if chest.opened {
        warn!("chest {} is already open", chest.object_id);
        return false;
    }
    chest.opened = true;
    let object_id = chest.object_id;
    let contents = chest.contents.clone();
    let origin = chest.rect.center();
    let map_path = ctx.map.path.clone();
    ctx.states
        .set(&map_path, ObjectKind::Chest, object_id, true);

    for (key, amount) in contents {
        if let Err(err) =
            ctx.map
                .spawn_dropped_item(ctx.physics, ctx.id_gen, &key, amount, origin)
        {
            warn!("failed to spill `{key}` from chest {object_id}: {err}");
        }
    }
    ctx.outputs.sound("sfx/chest_open");
    true
}

/// Step through a portal: locked portals refuse; otherwise the scene gets a
/// traversal request carrying the optional lateral offset.
pub fn enter_portal(ctx: &mut WorldCtx<'_>, who: ActorId, portal_id: ActorId) -> bool {
    let Some(portal) = ctx.map.portals.get(&portal_id) else {
        return false;
    };
    if portal.locked {
        warn!("portal {} is locked", portal.object_id);
        ctx.outputs.sound("sfx/door_locked");
        return false;
    }
    let offset_x = if portal.adjust_offset_x {
        ctx.physics
            .position(who)
            .map(|p| p.x - portal.rect.center().x)
    } else {
        None
    };
    ctx.map.requested_portal = Some(PortalRequest {
        traveler: who,
        target_map: portal.target_map.clone(),
        target_portal: portal.target_portal,
        offset_x,
    });
    true
}

/// Pick up a dropped item into the character's inventory.
pub fn pick_up_item(ctx: &mut WorldCtx<'_>, who: ActorId, item_id: ActorId) -> bool {
    let Some(item) = ctx.map.items.remove(&item_id) else {
        return false;
    };
    let def = match ctx.lib.item(&item.item_key) {
        Ok(def) => def.clone(),
        Err(err) => {
            warn!("dropped item with unknown definition: {err}");
            return false;
        }
    };
    ctx.physics.remove_body(item_id);
    ctx.map.purge_refs(item_id);

    let Some(character) = ctx.map.character_mut(who) else {
        return false;
    };
    character.inventory.add(&item.item_key, &def, item.amount);
    let carried = character.inventory.amount(&item.item_key);
    if let Some(player) = character.player_data_mut() {
        player.quests.on_item_amount(&item.item_key, carried, ctx.outputs);
    }
    ctx.outputs.push(OutputEvent::ItemPickedUp {
        item: item.item_key.clone(),
        amount: item.amount,
    });
    true
}

/// Throw one unit of an item out of the inventory onto the ground.
pub fn discard_item(ctx: &mut WorldCtx<'_>, who: ActorId, key: &str) -> bool {
    let position = match ctx.physics.position(who) {
        Some(p) => p,
        None => return false,
    };
    let Some(character) = ctx.map.character_mut(who) else {
        return false;
    };
    if character.equipment.is_equipped(key) {
        warn!("cannot discard `{key}` while it is equipped");
        return false;
    }
    if !character.inventory.remove(key, 1) {
        return false;
    }
    if let Err(err) = ctx
        .map
        .spawn_dropped_item(ctx.physics, ctx.id_gen, key, 1, position)
    {
        warn!("failed to drop `{key}`: {err}");
        return false;
    }
    true
}
