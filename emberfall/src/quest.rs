//! Quests: kill/collect objectives advanced by gameplay events.

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::events::{OutputEvent, OutputQueue};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Objective {
    /// Kill `count` characters spawned from `profile`.
    Kill { profile: String, count: u32 },
    /// Carry `amount` of `item` at once.
    Collect { item: String, amount: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestDef {
    pub title: String,
    pub objectives: Vec<Objective>,
}

impl QuestDef {
    pub fn from_json(key: &str, json: &str) -> Result<Self, DataError> {
        serde_json::from_str(json).map_err(|e| DataError::Malformed {
            path: key.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Progress through one quest: the current objective index plus a counter
/// for kill objectives.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuestState {
    pub def: QuestDef,
    pub stage: usize,
    pub kills: u32,
    pub completed: bool,
}

/// All quests a player has accepted, keyed by definition key. Serialized
/// wholesale into the save file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QuestBook {
    quests: HashMap<String, QuestState>,
}

impl QuestBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a quest. Re-accepting an in-progress or finished quest logs
    /// and changes nothing.
    pub fn start(&mut self, key: &str, def: QuestDef) -> bool {
        if self.quests.contains_key(key) {
            warn!("quest `{key}` already started");
            return false;
        }
        self.quests.insert(
            key.to_string(),
            QuestState {
                def,
                stage: 0,
                kills: 0,
                completed: false,
            },
        );
        true
    }

    pub fn get(&self, key: &str) -> Option<&QuestState> {
        self.quests.get(key)
    }

    pub fn is_completed(&self, key: &str) -> bool {
        self.quests.get(key).map(|q| q.completed).unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.quests.values().filter(|q| !q.completed).count()
    }

    /// A character spawned from `profile` died by the player's hand.
    pub fn on_kill(&mut self, profile: &str, out: &mut OutputQueue) {
        for (key, quest) in self.quests.iter_mut() {
            if quest.completed {
                continue;
            }
            if let Some(Objective::Kill { profile: wanted, count }) =
                quest.def.objectives.get(quest.stage)
            {
                if wanted == profile {
                    quest.kills += 1;
                    if quest.kills >= *count {
                        advance(key, quest, out);
                    }
                }
            }
        }
    }

    /// The player's carried amount of `item` changed.
    pub fn on_item_amount(&mut self, item: &str, carried: u32, out: &mut OutputQueue) {
        for (key, quest) in self.quests.iter_mut() {
            if quest.completed {
                continue;
            }
            if let Some(Objective::Collect { item: wanted, amount }) =
                quest.def.objectives.get(quest.stage)
            {
                if wanted == item && carried >= *amount {
                    advance(key, quest, out);
                }
            }
        }
    }
}

fn advance(key: &str, quest: &mut QuestState, out: &mut OutputQueue) {
    quest.stage += 1;
    quest.kills = 0;
    let completed = quest.stage >= quest.def.objectives.len();
    quest.completed = completed;
    out.push(OutputEvent::QuestUpdated {
        quest: key.to_string(),
        completed,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hunt_quest() -> QuestDef {
        QuestDef {
            title: "Cull the Bonewalkers".into(),
            objectives: vec![
                Objective::Kill {
                    profile: "char/skeleton".into(),
                    count: 2,
                },
                Objective::Collect {
                    item: "item/skull".into(),
                    amount: 1,
                },
            ],
        }
    }

    #[test]
    fn kill_objective_counts_and_advances() {
        let mut book = QuestBook::new();
        let mut out = OutputQueue::new();
        assert!(book.start("quest/cull", hunt_quest()));
        assert!(!book.start("quest/cull", hunt_quest()));

        book.on_kill("char/skeleton", &mut out);
        assert_eq!(book.get("quest/cull").unwrap().stage, 0);
        book.on_kill("char/wolf", &mut out);
        book.on_kill("char/skeleton", &mut out);
        assert_eq!(book.get("quest/cull").unwrap().stage, 1);
        assert!(!book.is_completed("quest/cull"));

        book.on_item_amount("item/skull", 1, &mut out);
        assert!(book.is_completed("quest/cull"));
        let events = out.drain();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, OutputEvent::QuestUpdated { .. }))
                .count(),
            2
        );
    }
}
