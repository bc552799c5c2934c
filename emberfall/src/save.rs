//! Save files: the whole resumable session as one JSON document.

use std::path::Path;

use anyhow::Result;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::character::party::WaitingLocation;
use crate::character::player::{HotkeyBinding, HOTKEY_SLOTS};
use crate::character::Profile;
use crate::dialogue::DialogueMemory;
use crate::items::{EquipmentSlots, Inventory};
use crate::map::interactables::ObjectStateEntry;
use crate::quest::QuestBook;
use crate::skill::Skill;

pub const SAVE_VERSION: u32 = 1;

/// A party member as saved: identified by its definition, optionally
/// waiting somewhere instead of following.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartyMemberRecord {
    pub profile_key: String,
    #[serde(default)]
    pub waiting: Option<WaitingLocation>,
}

/// Rented lodging, if any.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomRental {
    pub inn_map: String,
    pub nights_left: u32,
}

/// Everything needed to resume a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    pub version: u32,
    pub current_map: String,
    pub player_position: Vec2,

    pub profile: Profile,
    pub inventory: Inventory,
    pub equipment: EquipmentSlots,
    pub skills: Vec<Skill>,
    pub quests: QuestBook,
    pub hotkeys: [Option<HotkeyBinding>; HOTKEY_SLOTS],

    #[serde(default)]
    pub party: Vec<PartyMemberRecord>,
    pub in_game_time: f64,
    #[serde(default)]
    pub room_rental: Option<RoomRental>,
    #[serde(default)]
    pub dialogue: DialogueMemory,
    #[serde(default)]
    pub object_states: Vec<ObjectStateEntry>,
}

impl GameState {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::profile::test_profile;
    use crate::items::{test_potion, test_sword, EquipmentSlot};
    use crate::map::interactables::ObjectKind;

    fn sample_state() -> GameState {
        let mut inventory = Inventory::new();
        inventory.add("item/rusty_sword", &test_sword(), 1);
        inventory.add("item/potion", &test_potion(), 3);
        let mut equipment = EquipmentSlots::new();
        equipment.equip(&mut inventory, "item/rusty_sword");

        let mut profile = test_profile("Hero");
        profile.health = 37;
        profile.stamina = 12;
        profile.magicka = 8;

        let mut hotkeys: [Option<HotkeyBinding>; HOTKEY_SLOTS] = Default::default();
        hotkeys[0] = Some(HotkeyBinding::Consumable {
            key: "item/potion".into(),
        });

        GameState {
            version: SAVE_VERSION,
            current_map: "maps/town.json".into(),
            player_position: Vec2::new(412.0, 680.0),
            profile,
            inventory,
            equipment,
            skills: vec![Skill::new("skill/fireball", crate::skill::test_fireball())],
            quests: QuestBook::new(),
            hotkeys,
            party: vec![PartyMemberRecord {
                profile_key: "char/mercenary".into(),
                waiting: Some(WaitingLocation {
                    map: "maps/inn.json".into(),
                    position: Vec2::new(100.0, 60.0),
                }),
            }],
            in_game_time: 1234.5,
            room_rental: Some(RoomRental {
                inn_map: "maps/inn.json".into(),
                nights_left: 2,
            }),
            dialogue: DialogueMemory::new(),
            object_states: vec![ObjectStateEntry {
                map: "maps/town.json".into(),
                kind: ObjectKind::Chest,
                object_id: 4,
                value: true,
            }],
        }
    }

    #[test]
    fn json_round_trip_is_exact() {
        let state = sample_state();
        let json = state.to_json().unwrap();
        let restored = GameState::from_json(&json).unwrap();

        assert_eq!(restored.profile.health, 37);
        assert_eq!(restored.profile.stamina, 12);
        assert_eq!(restored.profile.magicka, 8);
        assert_eq!(restored.inventory.amount("item/potion"), 3);
        assert_eq!(restored.inventory.amount("item/rusty_sword"), 1);
        assert_eq!(
            restored.equipment.get(EquipmentSlot::Weapon),
            Some("item/rusty_sword")
        );
        assert_eq!(restored.skills.len(), 1);
        assert_eq!(restored.party.len(), 1);
        assert!(restored.party[0].waiting.is_some());
        assert_eq!(restored.room_rental, state.room_rental);
        assert_eq!(restored.object_states, state.object_states);
        assert_eq!(restored.player_position, state.player_position);

        // Serializing again yields the same document.
        assert_eq!(json, restored.to_json().unwrap());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slot0.json");
        let state = sample_state();
        state.save_to_file(&path).unwrap();
        let restored = GameState::load_from_file(&path).unwrap();
        assert_eq!(restored.current_map, "maps/town.json");
        assert_eq!(restored.in_game_time, 1234.5);
    }
}
