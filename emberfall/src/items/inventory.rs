//! Inventory and equipment slots.
//!
//! The inventory is a fixed array of ordered key lists (one per item
//! category) over a single item pool keyed by definition key. Adding an item
//! the character already owns bumps the amount on the one canonical
//! instance. Equipment slots hold keys into the same pool — equipping never
//! clones an item.

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use super::{EquipmentSlot, Item, ItemCategory, ItemDef, ItemKind, StatBonus};

pub const EQUIPMENT_SLOT_COUNT: usize = 7;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Inventory {
    /// Display order per category; holds only unequipped items.
    sections: [Vec<String>; ItemCategory::COUNT],
    /// All owned items (equipped or not), one instance per key.
    pool: HashMap<String, Item>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` of an item. Deduplicates by key: a second add of the
    /// same definition only raises the amount.
    pub fn add(&mut self, key: &str, def: &ItemDef, amount: u32) {
        if amount == 0 {
            return;
        }
        if let Some(item) = self.pool.get_mut(key) {
            item.amount += amount;
            return;
        }
        let item = Item::new(key, def.clone(), amount);
        self.sections[item.category().index()].push(key.to_string());
        self.pool.insert(key.to_string(), item);
    }

    /// Remove `amount` of an item. Removing more than owned (or an item not
    /// present) logs and removes nothing.
    pub fn remove(&mut self, key: &str, amount: u32) -> bool {
        match self.pool.get_mut(key) {
            Some(item) if item.amount >= amount => {
                item.amount -= amount;
                if item.amount == 0 {
                    let section = item.category().index();
                    self.pool.remove(key);
                    self.sections[section].retain(|k| k != key);
                }
                true
            }
            Some(item) => {
                warn!(
                    "cannot remove {amount} of `{key}`: only {} owned",
                    item.amount
                );
                false
            }
            None => {
                warn!("cannot remove `{key}`: not in inventory");
                false
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.pool.get(key)
    }

    pub fn amount(&self, key: &str) -> u32 {
        self.pool.get(key).map(|i| i.amount).unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pool.contains_key(key)
    }

    /// Unequipped items of a category, in pickup order.
    pub fn section(&self, category: ItemCategory) -> impl Iterator<Item = &Item> {
        self.sections[category.index()]
            .iter()
            .filter_map(|k| self.pool.get(k))
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Move an item out of its section list when it gets equipped. The item
    /// stays in the pool.
    fn hide_from_section(&mut self, key: &str) {
        if let Some(item) = self.pool.get(key) {
            let section = item.category().index();
            self.sections[section].retain(|k| k != key);
        }
    }

    /// Put an unequipped item back at the end of its section list.
    fn show_in_section(&mut self, key: &str) {
        if let Some(item) = self.pool.get(key) {
            let section = item.category().index();
            if !self.sections[section].iter().any(|k| k == key) {
                self.sections[section].push(key.to_string());
            }
        }
    }
}

/// Worn equipment: keys into the owning character's inventory pool.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EquipmentSlots {
    slots: [Option<String>; EQUIPMENT_SLOT_COUNT],
}

impl EquipmentSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: EquipmentSlot) -> Option<&str> {
        self.slots[slot.index()].as_deref()
    }

    pub fn is_equipped(&self, key: &str) -> bool {
        self.slots.iter().flatten().any(|k| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EquipmentSlot, &str)> {
        EquipmentSlot::ALL
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(slot, key)| key.as_deref().map(|k| (*slot, k)))
    }

    /// Equip an inventory item into its slot. Whatever was there first goes
    /// back to the inventory list. Returns false (and logs) if the key is
    /// not an owned piece of equipment.
    pub fn equip(&mut self, inventory: &mut Inventory, key: &str) -> bool {
        let slot = match inventory.get(key).map(|i| &i.def.kind) {
            Some(ItemKind::Equipment { slot, .. }) => *slot,
            Some(_) => {
                warn!("cannot equip `{key}`: not equipment");
                return false;
            }
            None => {
                warn!("cannot equip `{key}`: not in inventory");
                return false;
            }
        };

        if let Some(previous) = self.slots[slot.index()].take() {
            inventory.show_in_section(&previous);
        }
        inventory.hide_from_section(key);
        self.slots[slot.index()] = Some(key.to_string());
        true
    }

    /// Clear a slot, returning its item to the inventory list.
    pub fn unequip(&mut self, inventory: &mut Inventory, slot: EquipmentSlot) -> bool {
        match self.slots[slot.index()].take() {
            Some(key) => {
                inventory.show_in_section(&key);
                true
            }
            None => {
                warn!("nothing equipped in {slot:?}");
                false
            }
        }
    }

    /// Sum of stat bonuses across everything worn.
    pub fn total_bonus(&self, inventory: &Inventory) -> StatBonus {
        let mut total = StatBonus::default();
        for key in self.slots.iter().flatten() {
            if let Some(ItemKind::Equipment { bonus, .. }) =
                inventory.get(key).map(|i| &i.def.kind)
            {
                total.health += bonus.health;
                total.stamina += bonus.stamina;
                total.magicka += bonus.magicka;
                total.strength += bonus.strength;
                total.dexterity += bonus.dexterity;
                total.intelligence += bonus.intelligence;
                total.luck += bonus.luck;
                total.move_speed += bonus.move_speed;
                total.jump_height += bonus.jump_height;
                total.melee_damage += bonus.melee_damage;
            }
        }
        total
    }
}
