//! Per-NPC dialogue bookkeeping.
//!
//! Dialogue content itself lives in data; the simulation only remembers
//! which tree each NPC should open next, and persists that into saves.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Latest dialogue-tree pointer per NPC definition key.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DialogueMemory {
    latest: HashMap<String, String>,
}

impl DialogueMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tree this NPC opens next: a remembered override, or its
    /// profile's default.
    pub fn tree_for<'a>(&'a self, npc_key: &str, default: Option<&'a str>) -> Option<&'a str> {
        self.latest.get(npc_key).map(String::as_str).or(default)
    }

    pub fn set_latest(&mut self, npc_key: impl Into<String>, tree: impl Into<String>) {
        self.latest.insert(npc_key.into(), tree.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_profile_default() {
        let mut memory = DialogueMemory::new();
        assert_eq!(
            memory.tree_for("char/blacksmith", Some("greeting")),
            Some("greeting")
        );
        memory.set_latest("char/blacksmith", "after_quest");
        assert_eq!(
            memory.tree_for("char/blacksmith", Some("greeting")),
            Some("after_quest")
        );
        assert_eq!(memory.tree_for("char/stranger", None), None);
    }
}
