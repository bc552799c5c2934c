//! `GameScene`: per-frame orchestration.
//!
//! One `update(dt)` per frame, fixed-stepping the physics world. Within a
//! step the order is strict: physics step → contact routing → reaction
//! application → due deferred callbacks → AI → per-actor updates. Contact
//! flags are therefore always current before `determine_state` runs in the
//! same frame.

use anyhow::{Context, Result};
use glam::Vec2;

use crate::actor::{Actor, ActorId, ActorIdGen};
use crate::callbacks::CallbackManager;
use crate::camera::{update_camera_follow, Camera, CameraFollow};
use crate::character::party::{PartyRegistry, WaitingLocation};
use crate::character::player::HotkeyBinding;
use crate::character::{Character, CharacterState, PlayerData, Role};
use crate::console;
use crate::contact;
use crate::defs::DefLibrary;
use crate::dialogue::DialogueMemory;
use crate::events::{OutputEvent, OutputQueue};
use crate::input::{ActionId, AxisBinding, InputMap, InputState, Key};
use crate::map::interactables::ObjectStates;
use crate::map::manager::{Arrival, GameMapManager};
use crate::map::{self, GameMap};
use crate::physics::PhysicsWorld;
use crate::save::{GameState, PartyMemberRecord, RoomRental, SAVE_VERSION};

pub const FIXED_DT: f32 = 1.0 / 60.0;

/// Seconds of each fade phase around a map swap.
const FADE_DURATION: f32 = 0.3;

/// Actors this far outside the viewport stay visible to avoid popping.
const CULL_MARGIN: f32 = 200.0;

/// Mutable view over the live world handed to deferred callbacks, contact
/// reactions, console commands, and interactions.
pub struct WorldCtx<'a> {
    pub lib: &'a DefLibrary,
    pub map: &'a mut GameMap,
    pub physics: &'a mut PhysicsWorld,
    pub callbacks: &'a mut CallbackManager,
    pub outputs: &'a mut OutputQueue,
    pub parties: &'a mut PartyRegistry,
    pub id_gen: &'a mut ActorIdGen,
    pub states: &'a mut ObjectStates,
    pub dialogue: &'a mut DialogueMemory,
}

/// Two-phase map swap in flight: fade out, swap at the midpoint, fade in.
struct MapTransition {
    target_map: String,
    arrival: Arrival,
    travelers: Vec<Character>,
    timer: f32,
    swapped: bool,
}

struct ActionSet {
    move_x: ActionId,
    jump: ActionId,
    attack: ActionId,
    block: ActionId,
    crouch: ActionId,
    dodge_backward: ActionId,
    dodge_forward: ActionId,
    interact: ActionId,
    sheathe: ActionId,
}

impl ActionSet {
    fn new() -> Self {
        Self {
            move_x: ActionId::new("move_x"),
            jump: ActionId::new("jump"),
            attack: ActionId::new("attack"),
            block: ActionId::new("block"),
            crouch: ActionId::new("crouch"),
            dodge_backward: ActionId::new("dodge_backward"),
            dodge_forward: ActionId::new("dodge_forward"),
            interact: ActionId::new("interact"),
            sheathe: ActionId::new("sheathe"),
        }
    }
}

pub struct GameScene {
    pub lib: DefLibrary,
    pub manager: GameMapManager,
    pub callbacks: CallbackManager,
    pub outputs: OutputQueue,
    pub parties: PartyRegistry,
    pub id_gen: ActorIdGen,
    pub dialogue: DialogueMemory,
    pub input: InputState,
    input_map: InputMap,
    actions: ActionSet,
    pub camera: Camera,
    follow: CameraFollow,
    player_id: ActorId,
    player_party: crate::character::PartyId,
    pub in_game_time: f64,
    pub room_rental: Option<RoomRental>,
    waiting_members: Vec<PartyMemberRecord>,
    transition: Option<MapTransition>,
    accumulator: f32,
}

impl GameScene {
    /// Start a fresh session: load the map and spawn the player at its
    /// authored spawn point.
    pub fn new(lib: DefLibrary, initial_map: &str, player_profile_key: &str) -> Result<Self> {
        let mut id_gen = ActorIdGen::new();
        let mut manager = GameMapManager::new(&lib, initial_map, &mut id_gen)?;

        let profile = lib.character(player_profile_key)?.clone();
        let player_id = id_gen.fresh();
        let mut player = Character::new(player_id, profile, Role::Player(PlayerData::new()))?;
        map::fill_possessions(&lib, &mut player);

        let mut parties = PartyRegistry::new();
        let player_party = parties.create(player_id);
        player.party = Some(player_party);

        let spawn = manager.map.player_spawn;
        manager
            .map
            .insert_character(player, &mut manager.physics, spawn)?;

        Ok(Self {
            lib,
            manager,
            callbacks: CallbackManager::new(),
            outputs: OutputQueue::new(),
            parties,
            id_gen,
            dialogue: DialogueMemory::new(),
            input: InputState::new(),
            input_map: default_input_map(),
            actions: ActionSet::new(),
            camera: Camera::new(spawn, Vec2::new(1280.0, 720.0)),
            follow: CameraFollow::new()
                .follow(player_id)
                .with_dead_zone(150.0, 100.0)
                .with_smoothing(0.1),
            player_id,
            player_party,
            in_game_time: 0.0,
            room_rental: None,
            waiting_members: Vec::new(),
            transition: None,
            accumulator: 0.0,
        })
    }

    pub fn player_id(&self) -> ActorId {
        self.player_id
    }

    pub fn player(&self) -> Option<&Character> {
        self.manager.map.character(self.player_id)
    }

    pub fn player_mut(&mut self) -> Option<&mut Character> {
        self.manager.map.character_mut(self.player_id)
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Drain the frame's observable side effects.
    pub fn drain_outputs(&mut self) -> Vec<OutputEvent> {
        self.outputs.drain()
    }

    /// Borrow the whole world as a context, for interactions and tests.
    pub fn with_ctx<R>(&mut self, f: impl FnOnce(&mut WorldCtx<'_>) -> R) -> R {
        let mut ctx = WorldCtx {
            lib: &self.lib,
            map: &mut self.manager.map,
            physics: &mut self.manager.physics,
            callbacks: &mut self.callbacks,
            outputs: &mut self.outputs,
            parties: &mut self.parties,
            id_gen: &mut self.id_gen,
            states: &mut self.manager.states,
            dialogue: &mut self.dialogue,
        };
        f(&mut ctx)
    }

    /// One engine frame.
    pub fn update(&mut self, dt: f32) -> Result<()> {
        if self.transition.is_some() {
            self.update_transition(dt)?;
            self.input.begin_frame();
            return Ok(());
        }

        self.handle_player_input();

        self.accumulator += dt;
        while self.accumulator >= FIXED_DT {
            self.accumulator -= FIXED_DT;
            self.fixed_step()?;
            if self.transition.is_some() {
                break;
            }
        }

        update_camera_follow(&mut self.camera, &self.follow, &self.manager.physics);
        self.camera.clamp_to(self.manager.map.bounds);
        self.cull_visibility();

        self.in_game_time += dt as f64;
        self.input.begin_frame();
        Ok(())
    }

    /// Convenience: run `n` frames at the fixed timestep.
    pub fn step_frames(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.update(FIXED_DT)?;
        }
        Ok(())
    }

    fn fixed_step(&mut self) -> Result<()> {
        self.manager.physics.step(FIXED_DT);
        let events = self.manager.physics.drain_contacts();
        let reactions = contact::route(&events);
        self.with_ctx(|ctx| contact::apply(ctx, reactions));

        self.callbacks.advance(FIXED_DT);
        let due = self.callbacks.take_due();
        if !due.is_empty() {
            self.with_ctx(|ctx| {
                for callback in due {
                    callback(ctx);
                }
            });
        }

        self.manager.map.drive_npcs(
            FIXED_DT,
            &mut self.manager.physics,
            &mut self.callbacks,
            &mut self.outputs,
        );
        self.manager
            .map
            .update_actors(FIXED_DT, &mut self.manager.physics);

        self.process_requests()
    }

    fn handle_player_input(&mut self) {
        let who = self.player_id;
        let move_axis = self.input_map.axis(&self.input, &self.actions.move_x);
        let jump = self.input_map.action_pressed(&self.input, &self.actions.jump);
        let attack = self.input_map.action_pressed(&self.input, &self.actions.attack);
        let block_down = self.input_map.action_down(&self.input, &self.actions.block);
        let crouch_down = self.input_map.action_down(&self.input, &self.actions.crouch);
        let dodge_backward = self
            .input_map
            .action_pressed(&self.input, &self.actions.dodge_backward);
        let dodge_forward = self
            .input_map
            .action_pressed(&self.input, &self.actions.dodge_forward);
        let interact = self
            .input_map
            .action_pressed(&self.input, &self.actions.interact);
        let sheathe = self
            .input_map
            .action_pressed(&self.input, &self.actions.sheathe);
        let hotkey_slots = self.input.pressed_hotkey_slots();

        {
            let map = &mut self.manager.map;
            let physics = &mut self.manager.physics;
            if let Some(character) = map.character_mut(who) {
                if move_axis != 0.0 {
                    character.move_toward(move_axis, physics);
                }
                if jump {
                    character.jump(physics);
                }
                if crouch_down {
                    character.crouch();
                } else if character.is_crouching() {
                    character.get_up_from_crouching();
                }
                if block_down {
                    character.block();
                } else if character.is_blocking() {
                    character.unblock();
                }
                if dodge_backward {
                    character.dodge(CharacterState::DodgingBackward, physics);
                }
                if dodge_forward {
                    character.dodge(CharacterState::DodgingForward, physics);
                }
                if sheathe {
                    if character.is_weapon_sheathed {
                        character.unsheathe_weapon();
                    } else {
                        character.sheathe_weapon();
                    }
                }
            }

            if attack {
                let requested = map
                    .character(who)
                    .map(|c| {
                        if c.is_on_ground() {
                            CharacterState::Attacking
                        } else {
                            CharacterState::AttackingMidair
                        }
                    })
                    .unwrap_or(CharacterState::Attacking);
                map.character_attack(
                    who,
                    requested,
                    1,
                    0.1,
                    &mut self.callbacks,
                    &mut self.outputs,
                );
            }
        }

        if interact || !hotkey_slots.is_empty() {
            let bindings: Vec<HotkeyBinding> = self
                .manager
                .map
                .character(who)
                .and_then(|c| c.player_data())
                .map(|data| {
                    hotkey_slots
                        .iter()
                        .filter_map(|&slot| data.hotkey(slot).cloned())
                        .collect()
                })
                .unwrap_or_default();

            self.with_ctx(|ctx| {
                if interact {
                    map::interact(ctx, who);
                }
                for binding in bindings {
                    match binding {
                        HotkeyBinding::Skill { key } => {
                            ctx.map.character_activate_skill(
                                who,
                                &key,
                                ctx.physics,
                                ctx.id_gen,
                                ctx.callbacks,
                                ctx.outputs,
                            );
                        }
                        HotkeyBinding::Consumable { key } => {
                            if let Some(character) = ctx.map.character_mut(who) {
                                character.use_item(&key, ctx.outputs);
                            }
                        }
                    }
                }
            });
        }
    }

    fn process_requests(&mut self) -> Result<()> {
        let commands = std::mem::take(&mut self.manager.map.requested_commands);
        if !commands.is_empty() {
            self.with_ctx(|ctx| {
                for line in commands {
                    if let Some(command) = console::parse(&line) {
                        console::execute(ctx, command);
                    }
                }
            });
        }

        if let Some(target) = self.manager.map.requested_map.take() {
            self.begin_transition(target, Arrival::Spawn);
            return Ok(());
        }

        if let Some(request) = self.manager.map.requested_portal.take() {
            if request.traveler == self.player_id {
                self.begin_transition(
                    request.target_map,
                    Arrival::Portal {
                        object_id: request.target_portal,
                        offset_x: request.offset_x,
                    },
                );
            }
        }
        Ok(())
    }

    /// Start the fade-out and pull the player (and non-waiting allies) out
    /// of the doomed map.
    fn begin_transition(&mut self, target_map: String, arrival: Arrival) {
        let mut travelers = Vec::new();
        if let Some(player) = self.manager.map.remove_character(self.player_id) {
            travelers.push(player);
        }

        let (traveling_allies, waiting_allies) = match self.parties.get(self.player_party) {
            Some(party) => {
                let traveling = party.traveling_members();
                let waiting: Vec<(ActorId, WaitingLocation)> = party
                    .roster()
                    .into_iter()
                    .filter_map(|m| party.waiting_location(m).map(|w| (m, w.clone())))
                    .collect();
                (traveling, waiting)
            }
            None => (Vec::new(), Vec::new()),
        };
        for ally in traveling_allies {
            if let Some(character) = self.manager.map.remove_character(ally) {
                travelers.push(character);
            }
        }
        // Waiting allies in the departing map become save-style records
        // until some future visit respawns them.
        for (ally, location) in waiting_allies {
            if let Some(character) = self.manager.map.remove_character(ally) {
                self.waiting_members.push(PartyMemberRecord {
                    profile_key: character.profile_key().to_string(),
                    waiting: Some(location),
                });
            }
        }

        self.outputs.push(OutputEvent::FadeOut);
        self.transition = Some(MapTransition {
            target_map,
            arrival,
            travelers,
            timer: 0.0,
            swapped: false,
        });
    }

    fn update_transition(&mut self, dt: f32) -> Result<()> {
        let Some(transition) = self.transition.as_mut() else {
            return Ok(());
        };
        transition.timer += dt;
        let do_swap = !transition.swapped && transition.timer >= FADE_DURATION;
        let done = transition.timer >= FADE_DURATION * 2.0;

        if do_swap {
            transition.swapped = true;
            let travelers = std::mem::take(&mut transition.travelers);
            let target = transition.target_map.clone();
            let arrival = transition.arrival.clone();

            self.manager
                .switch_map(&self.lib, &mut self.id_gen, &target, travelers, arrival)?;
            self.outputs.push(OutputEvent::FadeIn);
            if let Some(position) = self.manager.physics.position(self.player_id) {
                self.camera.position = position;
            }
        }
        if done {
            self.transition = None;
        }
        Ok(())
    }

    fn cull_visibility(&mut self) {
        let view = self.camera.viewport().inflated(CULL_MARGIN);
        let physics = &self.manager.physics;
        let map = &mut self.manager.map;

        let character_ids = map.character_ids();
        for id in character_ids {
            let visible = physics.position(id).map(|p| view.contains(p)).unwrap_or(false);
            if let Some(character) = map.character_mut(id) {
                character.set_visible(visible);
            }
        }
        for item in map.items.values_mut() {
            let id = item.id();
            let visible = physics.position(id).map(|p| view.contains(p)).unwrap_or(false);
            item.set_visible(visible);
        }
        for portal in map.portals.values_mut() {
            let visible = view.intersects(&portal.rect);
            portal.set_visible(visible);
        }
        for chest in map.chests.values_mut() {
            let visible = view.intersects(&chest.rect);
            chest.set_visible(visible);
        }
    }

    /// Recruit an NPC into the player's party.
    pub fn add_party_member(&mut self, profile_key: &str, position: Vec2) -> Result<ActorId> {
        let id = self.manager.map.spawn_npc(
            &self.lib,
            profile_key,
            &mut self.manager.physics,
            &mut self.id_gen,
            position,
        )?;
        if let Some(party) = self.parties.get_mut(self.player_party) {
            party.add_member(id);
        }
        if let Some(character) = self.manager.map.character_mut(id) {
            character.party = Some(self.player_party);
        }
        Ok(id)
    }

    /// Tell a party member to wait where it stands.
    pub fn set_member_waiting(&mut self, member: ActorId) {
        let location = self.manager.physics.position(member).map(|p| WaitingLocation {
            map: self.manager.map.path.clone(),
            position: p,
        });
        if let (Some(location), Some(party)) = (location, self.parties.get_mut(self.player_party))
        {
            party.set_waiting(member, location);
        }
    }

    // ---------------------------------------------------------------
    // Save / load
    // ---------------------------------------------------------------

    /// Snapshot the session into a save document.
    pub fn save_state(&mut self) -> Result<GameState> {
        self.manager.persist_object_states();

        let player_position = self
            .manager
            .physics
            .position(self.player_id)
            .unwrap_or(self.manager.map.player_spawn);
        let player = self
            .manager
            .map
            .character(self.player_id)
            .context("player character missing")?;
        let data = player.player_data().context("player role missing")?;

        let mut party_records = self.waiting_members.clone();
        if let Some(party) = self.parties.get(self.player_party) {
            for member in party.roster() {
                if member == self.player_id {
                    continue;
                }
                if let Some(character) = self.manager.map.character(member) {
                    party_records.push(PartyMemberRecord {
                        profile_key: character.profile_key().to_string(),
                        waiting: party.waiting_location(member).cloned(),
                    });
                }
            }
        }

        Ok(GameState {
            version: SAVE_VERSION,
            current_map: self.manager.map.path.clone(),
            player_position,
            profile: player.profile.clone(),
            inventory: player.inventory.clone(),
            equipment: player.equipment.clone(),
            skills: player.skills.clone(),
            quests: data.quests.clone(),
            hotkeys: data.hotkeys.clone(),
            party: party_records,
            in_game_time: self.in_game_time,
            room_rental: self.room_rental.clone(),
            dialogue: self.dialogue.clone(),
            object_states: self.manager.states.entries(),
        })
    }

    /// Resume a session from a save document.
    pub fn from_state(lib: DefLibrary, state: GameState) -> Result<Self> {
        let mut id_gen = ActorIdGen::new();
        let states = ObjectStates::from_entries(&state.object_states);
        let mut manager =
            GameMapManager::with_states(&lib, &state.current_map, &mut id_gen, states)?;

        let player_id = id_gen.fresh();
        let mut player = Character::new(
            player_id,
            state.profile,
            Role::Player(PlayerData {
                quests: state.quests,
                hotkeys: state.hotkeys,
            }),
        )?;
        player.inventory = state.inventory;
        player.equipment = state.equipment;
        player.skills = state.skills;

        let mut parties = PartyRegistry::new();
        let player_party = parties.create(player_id);
        player.party = Some(player_party);

        manager
            .map
            .insert_character(player, &mut manager.physics, state.player_position)?;

        let mut scene = Self {
            lib,
            manager,
            callbacks: CallbackManager::new(),
            outputs: OutputQueue::new(),
            parties,
            id_gen,
            dialogue: state.dialogue,
            input: InputState::new(),
            input_map: default_input_map(),
            actions: ActionSet::new(),
            camera: Camera::new(state.player_position, Vec2::new(1280.0, 720.0)),
            follow: CameraFollow::new()
                .follow(player_id)
                .with_dead_zone(150.0, 100.0)
                .with_smoothing(0.1),
            player_id,
            player_party,
            in_game_time: state.in_game_time,
            room_rental: state.room_rental,
            waiting_members: Vec::new(),
            transition: None,
            accumulator: 0.0,
        };

        for record in state.party {
            if record.waiting.is_some() {
                scene.waiting_members.push(record);
            } else {
                let beside = state.player_position + Vec2::new(32.0, 0.0);
                scene.add_party_member(&record.profile_key, beside)?;
            }
        }
        Ok(scene)
    }
}

fn default_input_map() -> InputMap {
    let mut map = InputMap::new();
    map.set_axis(
        ActionId::new("move_x"),
        AxisBinding {
            negative: vec![Key::KeyA],
            positive: vec![Key::KeyD],
        },
    );
    map.bind_key(ActionId::new("jump"), Key::Space);
    map.bind_key(ActionId::new("attack"), Key::KeyJ);
    map.bind_key(ActionId::new("block"), Key::KeyK);
    map.bind_key(ActionId::new("crouch"), Key::KeyS);
    map.bind_key(ActionId::new("dodge_backward"), Key::KeyQ);
    map.bind_key(ActionId::new("dodge_forward"), Key::KeyW);
    map.bind_key(ActionId::new("interact"), Key::KeyE);
    map.bind_key(ActionId::new("sheathe"), Key::KeyF);
    map
}
