//! Emberfall — a side-scrolling action-RPG simulation core.
//!
//! Character state machines, combat over rapier2d contact events, maps with
//! persistent interactables, inventory/equipment, skills, quests, parties,
//! and JSON save files. No rendering or audio: observable side effects
//! surface as [`events::OutputEvent`]s drained once per frame.

pub mod actor;
pub mod animation;
pub mod callbacks;
pub mod camera;
pub mod character;
pub mod combat;
pub mod console;
pub mod contact;
pub mod defs;
pub mod dialogue;
pub mod error;
pub mod events;
pub mod input;
pub mod items;
pub mod map;
pub mod math;
pub mod physics;
pub mod quest;
pub mod save;
pub mod scene;
pub mod skill;

pub use crate::actor::{Actor, ActorId, ActorIdGen, Facing};
pub use crate::character::{Character, CharacterState, Profile, Role};
pub use crate::defs::DefLibrary;
pub use crate::error::DataError;
pub use crate::events::{OutputEvent, OutputQueue};
pub use crate::input::{InputMap, InputState, Key};
pub use crate::map::{manager::GameMapManager, GameMap};
pub use crate::physics::{BodyBuilder, PhysicsWorld};
pub use crate::save::GameState;
pub use crate::scene::{GameScene, WorldCtx, FIXED_DT};
