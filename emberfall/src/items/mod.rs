//! Item definitions and runtime item instances.
//!
//! An item's capabilities are a data-carrying enum, not a class hierarchy:
//! code that cares whether something is equippable or consumable matches on
//! [`ItemKind`] instead of downcasting.

pub mod inventory;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

pub use inventory::{EquipmentSlots, Inventory, EQUIPMENT_SLOT_COUNT};

/// Stat modifiers granted by equipment while worn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatBonus {
    pub health: i32,
    pub stamina: i32,
    pub magicka: i32,
    pub strength: i32,
    pub dexterity: i32,
    pub intelligence: i32,
    pub luck: i32,
    pub move_speed: f32,
    pub jump_height: f32,
    pub melee_damage: i32,
}

/// Where a piece of equipment is worn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Weapon,
    HeadGear,
    Armor,
    Gauntlets,
    Boots,
    Cape,
    Ring,
}

impl EquipmentSlot {
    pub const ALL: [EquipmentSlot; EQUIPMENT_SLOT_COUNT] = [
        EquipmentSlot::Weapon,
        EquipmentSlot::HeadGear,
        EquipmentSlot::Armor,
        EquipmentSlot::Gauntlets,
        EquipmentSlot::Boots,
        EquipmentSlot::Cape,
        EquipmentSlot::Ring,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }
}

/// Category used for inventory sectioning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Equipment,
    Consumable,
    Misc,
}

impl ItemCategory {
    pub const COUNT: usize = 3;

    pub fn index(self) -> usize {
        match self {
            ItemCategory::Equipment => 0,
            ItemCategory::Consumable => 1,
            ItemCategory::Misc => 2,
        }
    }
}

/// What an item *does*.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Equipment {
        slot: EquipmentSlot,
        #[serde(default)]
        bonus: StatBonus,
    },
    Consumable {
        #[serde(default)]
        restore_health: i32,
        #[serde(default)]
        restore_stamina: i32,
        #[serde(default)]
        restore_magicka: i32,
        #[serde(default)]
        use_sound: String,
    },
    Misc,
}

impl ItemKind {
    pub fn category(&self) -> ItemCategory {
        match self {
            ItemKind::Equipment { .. } => ItemCategory::Equipment,
            ItemKind::Consumable { .. } => ItemCategory::Consumable,
            ItemKind::Misc => ItemCategory::Misc,
        }
    }
}

/// One item definition file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub name: String,
    #[serde(flatten)]
    pub kind: ItemKind,
    #[serde(default)]
    pub price: u32,
    #[serde(default)]
    pub description: String,
}

impl ItemDef {
    pub fn from_json(key: &str, json: &str) -> Result<Self, DataError> {
        serde_json::from_str(json).map_err(|e| DataError::Malformed {
            path: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// A canonical runtime item instance.
///
/// Exactly one `Item` exists per definition key per character; quantity is
/// the `amount` on that single instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    pub def: ItemDef,
    pub amount: u32,
}

impl Item {
    pub fn new(key: impl Into<String>, def: ItemDef, amount: u32) -> Self {
        Self {
            key: key.into(),
            def,
            amount,
        }
    }

    pub fn category(&self) -> ItemCategory {
        self.def.kind.category()
    }
}

#[cfg(test)]
pub(crate) fn test_sword() -> ItemDef {
    ItemDef {
        name: "Rusty Sword".into(),
        kind: ItemKind::Equipment {
            slot: EquipmentSlot::Weapon,
            bonus: StatBonus {
                melee_damage: 5,
                ..StatBonus::default()
            },
        },
        price: 10,
        description: String::new(),
    }
}

#[cfg(test)]
pub(crate) fn test_potion() -> ItemDef {
    ItemDef {
        name: "Minor Healing Potion".into(),
        kind: ItemKind::Consumable {
            restore_health: 25,
            restore_stamina: 0,
            restore_magicka: 0,
            use_sound: "sfx/drink".into(),
        },
        price: 5,
        description: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_kind_parses_from_json() {
        let def = ItemDef::from_json(
            "item/iron_helmet",
            r#"{
                "name": "Iron Helmet",
                "type": "equipment",
                "slot": "head_gear",
                "bonus": { "health": 10 }
            }"#,
        )
        .unwrap();
        match def.kind {
            ItemKind::Equipment { slot, bonus } => {
                assert_eq!(slot, EquipmentSlot::HeadGear);
                assert_eq!(bonus.health, 10);
                assert_eq!(bonus.melee_damage, 0);
            }
            _ => panic!("expected equipment"),
        }
    }

    #[test]
    fn consumable_defaults_to_zero_restores() {
        let def = ItemDef::from_json(
            "item/bread",
            r#"{ "name": "Bread", "type": "consumable", "restore_health": 5 }"#,
        )
        .unwrap();
        assert_eq!(def.kind.category(), ItemCategory::Consumable);
    }

    #[test]
    fn slot_indices_cover_the_slot_array() {
        for (i, slot) in EquipmentSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }
}
