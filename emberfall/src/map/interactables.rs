//! Map-authored interactable objects and their persistent state.
//!
//! Portals, chests, and triggers are static map objects. Their mutable
//! state (unlocked, opened, fired) must survive map unload/reload within a
//! play session, so it lives in a process-wide table keyed by
//! `(map path, object kind, object id)` that is owned by the map manager
//! and serialized into save files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::actor::{Actor, ActorId};
use crate::math::Rect;

/// Which kind of map object a persisted state entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Portal,
    Chest,
    Trigger,
}

/// Flat, serializable form of one persisted object state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectStateEntry {
    pub map: String,
    pub kind: ObjectKind,
    pub object_id: u32,
    pub value: bool,
}

/// The process-wide object-state table. Lifecycle is the save file's: it
/// survives map swaps, and `GameState` carries it across process restarts.
#[derive(Clone, Debug, Default)]
pub struct ObjectStates {
    table: HashMap<(String, ObjectKind, u32), bool>,
}

impl ObjectStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, map: &str, kind: ObjectKind, object_id: u32, value: bool) {
        self.table.insert((map.to_string(), kind, object_id), value);
    }

    pub fn get(&self, map: &str, kind: ObjectKind, object_id: u32) -> Option<bool> {
        self.table
            .get(&(map.to_string(), kind, object_id))
            .copied()
    }

    pub fn entries(&self) -> Vec<ObjectStateEntry> {
        let mut entries: Vec<ObjectStateEntry> = self
            .table
            .iter()
            .map(|((map, kind, object_id), value)| ObjectStateEntry {
                map: map.clone(),
                kind: *kind,
                object_id: *object_id,
                value: *value,
            })
            .collect();
        entries.sort_by(|a, b| {
            (&a.map, a.object_id, a.kind as u8).cmp(&(&b.map, b.object_id, b.kind as u8))
        });
        entries
    }

    pub fn from_entries(entries: &[ObjectStateEntry]) -> Self {
        let mut states = Self::new();
        for e in entries {
            states.set(&e.map, e.kind, e.object_id, e.value);
        }
        states
    }
}

/// A doorway to another map.
#[derive(Clone, Debug)]
pub struct Portal {
    id: ActorId,
    pub object_id: u32,
    pub rect: Rect,
    pub target_map: String,
    pub target_portal: u32,
    pub locked: bool,
    /// Multi-tile-wide portals keep the traveler's lateral position: the
    /// destination offsets arrival by where the source portal was touched.
    pub adjust_offset_x: bool,
    /// Walk-through portals interact on contact (with a short scheduled
    /// delay) instead of waiting for the interact action.
    pub trigger_on_contact: bool,
    visible: bool,
}

impl Portal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ActorId,
        object_id: u32,
        rect: Rect,
        target_map: String,
        target_portal: u32,
        locked: bool,
        adjust_offset_x: bool,
        trigger_on_contact: bool,
    ) -> Self {
        Self {
            id,
            object_id,
            rect,
            target_map,
            target_portal,
            locked,
            adjust_offset_x,
            trigger_on_contact,
            visible: true,
        }
    }
}

impl Actor for Portal {
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

/// A lootable chest. Opens once; contents spill onto the ground.
#[derive(Clone, Debug)]
pub struct Chest {
    id: ActorId,
    pub object_id: u32,
    pub rect: Rect,
    /// (item key, amount) pairs spilled on opening.
    pub contents: Vec<(String, u32)>,
    pub opened: bool,
    visible: bool,
}

impl Chest {
    pub fn new(id: ActorId, object_id: u32, rect: Rect, contents: Vec<(String, u32)>) -> Self {
        Self {
            id,
            object_id,
            rect,
            contents,
            opened: false,
            visible: true,
        }
    }
}

impl Actor for Chest {
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

/// An invisible region that runs console commands when a character's body
/// touches it.
#[derive(Clone, Debug)]
pub struct TriggerZone {
    id: ActorId,
    pub object_id: u32,
    pub rect: Rect,
    pub commands: Vec<String>,
    pub once: bool,
    pub fired: bool,
    /// Only the player's body fires this trigger.
    pub player_only: bool,
}

impl TriggerZone {
    pub fn new(
        id: ActorId,
        object_id: u32,
        rect: Rect,
        commands: Vec<String>,
        once: bool,
        player_only: bool,
    ) -> Self {
        Self {
            id,
            object_id,
            rect,
            commands,
            once,
            fired: false,
            player_only,
        }
    }
}

impl Actor for TriggerZone {
    fn id(&self) -> ActorId {
        self.id
    }

    fn is_visible(&self) -> bool {
        false
    }

    fn set_visible(&mut self, _visible: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_table_round_trips_through_entries() {
        let mut states = ObjectStates::new();
        states.set("maps/town.json", ObjectKind::Portal, 3, false);
        states.set("maps/town.json", ObjectKind::Chest, 5, true);
        states.set("maps/cave.json", ObjectKind::Trigger, 1, true);

        let entries = states.entries();
        assert_eq!(entries.len(), 3);
        let restored = ObjectStates::from_entries(&entries);
        assert_eq!(
            restored.get("maps/town.json", ObjectKind::Chest, 5),
            Some(true)
        );
        assert_eq!(
            restored.get("maps/town.json", ObjectKind::Portal, 3),
            Some(false)
        );
        assert_eq!(restored.get("maps/cave.json", ObjectKind::Chest, 1), None);
    }

    #[test]
    fn same_object_id_does_not_collide_across_kinds() {
        let mut states = ObjectStates::new();
        states.set("m", ObjectKind::Portal, 1, true);
        states.set("m", ObjectKind::Chest, 1, false);
        assert_eq!(states.get("m", ObjectKind::Portal, 1), Some(true));
        assert_eq!(states.get("m", ObjectKind::Chest, 1), Some(false));
    }
}
