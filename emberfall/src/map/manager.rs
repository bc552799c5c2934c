//! `GameMapManager`: owns the physics world and the current map, and
//! performs map swaps.
//!
//! A swap replaces the whole `PhysicsWorld` with a fresh one before the new
//! map is built, so no body from the old map can survive the transition.
//! Fading is the scene's business; the manager only does the instant part
//! between the two fade phases.

use anyhow::Result;
use glam::Vec2;
use log::info;

use crate::actor::ActorIdGen;
use crate::character::Character;
use crate::defs::DefLibrary;
use crate::physics::PhysicsWorld;

use super::interactables::{ObjectKind, ObjectStates};
use super::GameMap;

/// Where travelers land in the destination map.
#[derive(Clone, Debug)]
pub enum Arrival {
    /// At the destination portal's body position, optionally offset along
    /// X (multi-tile-wide source portals).
    Portal {
        object_id: u32,
        offset_x: Option<f32>,
    },
    /// At the map's authored player spawn.
    Spawn,
}

pub struct GameMapManager {
    pub physics: PhysicsWorld,
    pub map: GameMap,
    pub states: ObjectStates,
}

impl GameMapManager {
    pub fn new(lib: &DefLibrary, initial_map: &str, id_gen: &mut ActorIdGen) -> Result<Self> {
        let states = ObjectStates::new();
        let mut physics = PhysicsWorld::new();
        let map = GameMap::load(lib, initial_map, &mut physics, id_gen, &states)?;
        Ok(Self {
            physics,
            map,
            states,
        })
    }

    pub fn with_states(
        lib: &DefLibrary,
        initial_map: &str,
        id_gen: &mut ActorIdGen,
        states: ObjectStates,
    ) -> Result<Self> {
        let mut physics = PhysicsWorld::new();
        let map = GameMap::load(lib, initial_map, &mut physics, id_gen, &states)?;
        Ok(Self {
            physics,
            map,
            states,
        })
    }

    /// Write the current map's portal/chest/trigger flags into the
    /// process-wide table.
    pub fn persist_object_states(&mut self) {
        let path = self.map.path.clone();
        for portal in self.map.portals.values() {
            self.states
                .set(&path, ObjectKind::Portal, portal.object_id, !portal.locked);
        }
        for chest in self.map.chests.values() {
            self.states
                .set(&path, ObjectKind::Chest, chest.object_id, chest.opened);
        }
        for trigger in self.map.triggers.values() {
            self.states
                .set(&path, ObjectKind::Trigger, trigger.object_id, trigger.fired);
        }
    }

    /// Tear down the current map and build `target_map`, inserting the
    /// traveling characters at the arrival point. The first traveler is the
    /// one who touched the portal; the rest (allies) stack beside it.
    pub fn switch_map(
        &mut self,
        lib: &DefLibrary,
        id_gen: &mut ActorIdGen,
        target_map: &str,
        travelers: Vec<Character>,
        arrival: Arrival,
    ) -> Result<()> {
        self.persist_object_states();
        info!("switching map: {} -> {target_map}", self.map.path);

        // Fresh world: every old body is gone by construction.
        self.physics = PhysicsWorld::new();
        self.map = GameMap::load(lib, target_map, &mut self.physics, id_gen, &self.states)?;

        let anchor = match &arrival {
            Arrival::Portal {
                object_id,
                offset_x,
            } => {
                let portal_pos = self
                    .map
                    .portals
                    .values()
                    .find(|p| p.object_id == *object_id)
                    .map(|p| p.rect.center());
                let base = portal_pos.unwrap_or(self.map.player_spawn);
                base + Vec2::new(offset_x.unwrap_or(0.0), 0.0)
            }
            Arrival::Spawn => self.map.player_spawn,
        };

        for (i, mut traveler) in travelers.into_iter().enumerate() {
            traveler.reset_map_local_state();
            let position = anchor + Vec2::new(i as f32 * 24.0, 0.0);
            self.map
                .insert_character(traveler, &mut self.physics, position)?;
        }
        Ok(())
    }
}
