//! Headless input: key state tracked across frames plus a data-driven
//! action/axis mapping layer.
//!
//! The simulation has no window; whatever frontend (or test script) drives
//! it feeds `press`/`release` and calls `begin_frame` once per frame.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Physical keys the simulation understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    KeyA,
    KeyD,
    KeyW,
    KeyS,
    KeyE,
    KeyF,
    KeyJ,
    KeyK,
    KeyQ,
    Space,
    ShiftLeft,
    ControlLeft,
    Enter,
    Escape,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
}

impl Key {
    /// The hotkey slot (0-based) a digit key addresses, if any.
    pub fn hotkey_slot(self) -> Option<usize> {
        Some(match self {
            Key::Digit1 => 0,
            Key::Digit2 => 1,
            Key::Digit3 => 2,
            Key::Digit4 => 3,
            Key::Digit5 => 4,
            Key::Digit6 => 5,
            Key::Digit7 => 6,
            Key::Digit8 => 7,
            _ => return None,
        })
    }
}

/// Tracks key state across frames.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    keys_down: HashSet<Key>,
    keys_pressed: HashSet<Key>,
    keys_released: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame pressed/released flags.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
    }

    pub fn press(&mut self, key: Key) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: Key) {
        if self.keys_down.remove(&key) {
            self.keys_released.insert(key);
        }
    }

    /// Returns true while the key is held.
    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true only on the frame the key went down.
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_key_released(&self, key: Key) -> bool {
        self.keys_released.contains(&key)
    }

    /// Hotkey slots pressed this frame.
    pub fn pressed_hotkey_slots(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = self
            .keys_pressed
            .iter()
            .filter_map(|k| k.hotkey_slot())
            .collect();
        slots.sort_unstable();
        slots
    }
}

/// A logical input action (e.g. "jump", "attack").
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new(name: impl Into<String>) -> Self {
        ActionId(name.into())
    }
}

/// A one-dimensional axis binding (-1..1).
#[derive(Clone, Debug)]
pub struct AxisBinding {
    pub negative: Vec<Key>,
    pub positive: Vec<Key>,
}

/// Maps actions and axes to physical keys. Game code binds once and then
/// queries actions instead of key codes.
#[derive(Clone, Debug, Default)]
pub struct InputMap {
    actions: HashMap<ActionId, Vec<Key>>,
    axes: HashMap<ActionId, AxisBinding>,
}

impl InputMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_key(&mut self, action: ActionId, key: Key) {
        self.actions.entry(action).or_default().push(key);
    }

    pub fn set_axis(&mut self, axis: ActionId, binding: AxisBinding) {
        self.axes.insert(axis, binding);
    }

    pub fn action_down(&self, input: &InputState, action: &ActionId) -> bool {
        self.actions
            .get(action)
            .map(|keys| keys.iter().any(|&k| input.is_key_down(k)))
            .unwrap_or(false)
    }

    pub fn action_pressed(&self, input: &InputState, action: &ActionId) -> bool {
        self.actions
            .get(action)
            .map(|keys| keys.iter().any(|&k| input.is_key_pressed(k)))
            .unwrap_or(false)
    }

    /// Axis value in [-1, 1]; both directions held cancel out.
    pub fn axis(&self, input: &InputState, axis: &ActionId) -> f32 {
        let Some(binding) = self.axes.get(axis) else {
            return 0.0;
        };
        let mut value = 0.0;
        if binding.negative.iter().any(|&k| input.is_key_down(k)) {
            value -= 1.0;
        }
        if binding.positive.iter().any(|&k| input.is_key_down(k)) {
            value += 1.0;
        }
        value
    }
}
