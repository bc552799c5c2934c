//! Observable side effects of the simulation.
//!
//! The engine surfaces this repo replaces (audio, floating combat text,
//! interaction hints, screen fades) are represented as events pushed onto a
//! queue the frontend drains once per frame. Tests assert on the same queue.

use glam::Vec2;

use crate::actor::ActorId;

/// One frontend-visible side effect.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputEvent {
    /// Play a one-shot sound, identified by the asset key from a definition
    /// file (e.g. `"sfx/sword_swing"`).
    Sound(String),
    /// Show floating damage text above an actor.
    FloatingDamage { target: ActorId, amount: i32 },
    /// Show or hide the "press to interact" hint for an interactable.
    InteractionHint { target: ActorId, visible: bool },
    /// An actor spoke or a dialogue tree was opened.
    Dialogue { npc: ActorId, tree: String },
    /// Screen fade phases around a map swap.
    FadeOut,
    FadeIn,
    /// Camera shake on heavy hits.
    CameraShake { intensity: f32 },
    /// An item actor was picked up from the ground.
    ItemPickedUp { item: String, amount: u32 },
    /// A quest advanced or completed.
    QuestUpdated { quest: String, completed: bool },
    /// An actor died at this position (used by death FX and loot spawns).
    Died { actor: ActorId, position: Vec2 },
    /// Free-form message surfaced by console commands and triggers.
    Notification(String),
}

/// Frame-scoped queue of [`OutputEvent`]s.
#[derive(Default)]
pub struct OutputQueue {
    events: Vec<OutputEvent>,
}

impl OutputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: OutputEvent) {
        self.events.push(event);
    }

    pub fn sound(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !key.is_empty() {
            self.events.push(OutputEvent::Sound(key));
        }
    }

    /// Take everything queued since the last drain.
    pub fn drain(&mut self) -> Vec<OutputEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Peek without draining. Mostly for assertions.
    pub fn events(&self) -> &[OutputEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_queue() {
        let mut q = OutputQueue::new();
        q.sound("sfx/hit");
        q.push(OutputEvent::FadeOut);
        assert_eq!(q.drain().len(), 2);
        assert!(q.is_empty());
    }

    #[test]
    fn empty_sound_keys_are_dropped() {
        let mut q = OutputQueue::new();
        q.sound("");
        assert!(q.is_empty());
    }
}
