//! Player-only state: quests and hotkey bindings.

use serde::{Deserialize, Serialize};

use crate::quest::QuestBook;

pub const HOTKEY_SLOTS: usize = 8;

/// What a hotkey slot triggers. A closed variant set — binding resolution
/// matches on this instead of downcasting some generic "keybindable".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HotkeyBinding {
    Skill { key: String },
    Consumable { key: String },
}

/// State that exists only for the player character.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlayerData {
    pub quests: QuestBook,
    pub hotkeys: [Option<HotkeyBinding>; HOTKEY_SLOTS],
}

impl PlayerData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind slot `index` (0-based). Out-of-range bindings are ignored.
    pub fn bind_hotkey(&mut self, index: usize, binding: HotkeyBinding) {
        if let Some(slot) = self.hotkeys.get_mut(index) {
            *slot = Some(binding);
        }
    }

    pub fn hotkey(&self, index: usize) -> Option<&HotkeyBinding> {
        self.hotkeys.get(index).and_then(|b| b.as_ref())
    }

    pub fn clear_hotkey(&mut self, index: usize) {
        if let Some(slot) = self.hotkeys.get_mut(index) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hotkeys_bind_and_clear() {
        let mut data = PlayerData::new();
        data.bind_hotkey(
            0,
            HotkeyBinding::Skill {
                key: "skill/fireball".into(),
            },
        );
        data.bind_hotkey(
            99,
            HotkeyBinding::Consumable {
                key: "item/potion".into(),
            },
        );
        assert!(matches!(data.hotkey(0), Some(HotkeyBinding::Skill { .. })));
        assert!(data.hotkey(1).is_none());
        data.clear_hotkey(0);
        assert!(data.hotkey(0).is_none());
    }
}
