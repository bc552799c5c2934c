//! Actor identity and the lightweight world actors (dropped items,
//! projectiles) that are not full characters.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::physics::{
    category, BodyBuilder, BodyKind, FixtureDef, FixtureKind, PhysicsWorld, Shape,
};

/// Unique identifier for an actor in the world.
///
/// All cross-references between actors (lock-on targets, in-range sets,
/// party members, portal destinations) are ids, never references. An id can
/// dangle after its actor dies; lookups return `None` and callers treat that
/// as "target gone".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(u64);

impl ActorId {
    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Monotonic id allocator, owned by the scene so ids stay unique across map
/// swaps.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ActorIdGen {
    next: u64,
}

impl ActorIdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn fresh(&mut self) -> ActorId {
        let id = ActorId(self.next);
        self.next += 1;
        id
    }
}

/// Which way an actor is facing. Sprites flip on this; attack knock-back and
/// dodge impulses take their sign from it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Facing::Left => -1.0,
            Facing::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }

    pub fn from_delta(dx: f32) -> Self {
        if dx < 0.0 {
            Facing::Left
        } else {
            Facing::Right
        }
    }
}

/// Map-visibility lifecycle shared by every actor: actors outside the camera
/// viewport are hidden (their frontend representation despawns) but keep
/// simulating.
pub trait Actor {
    fn id(&self) -> ActorId;
    fn is_visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);
}

/// An item lying in the world, waiting to be picked up.
///
/// Spawned by enemy loot drops, chest opening, and `discard_item`.
#[derive(Clone, Debug)]
pub struct DroppedItem {
    id: ActorId,
    pub item_key: String,
    pub amount: u32,
    visible: bool,
}

impl DroppedItem {
    pub const SIZE: f32 = 16.0;

    pub fn new(id: ActorId, item_key: impl Into<String>, amount: u32) -> Self {
        Self {
            id,
            item_key: item_key.into(),
            amount,
            visible: true,
        }
    }

    /// Give the item a small dynamic body so it falls and rests on terrain.
    pub fn create_body(&self, physics: &mut PhysicsWorld, position: Vec2) -> anyhow::Result<()> {
        BodyBuilder::new(BodyKind::Dynamic, position)
            .lock_rotations()
            .fixture(
                FixtureDef::new(
                    FixtureKind::Item,
                    Shape::Box {
                        hx: Self::SIZE / 2.0,
                        hy: Self::SIZE / 2.0,
                    },
                    category::ITEM,
                    category::TERRAIN | category::FEET,
                )
                .friction(0.9),
            )
            .build(physics, self.id)
    }
}

impl Actor for DroppedItem {
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

/// A projectile spawned by a forked skill. Owns its own lifetime: it dies on
/// hit, on terrain contact, or when its flight time runs out.
#[derive(Clone, Debug)]
pub struct Projectile {
    id: ActorId,
    pub owner: ActorId,
    pub damage: i32,
    pub remaining: f32,
    pub expired: bool,
    pub hit_sound: String,
    visible: bool,
}

impl Projectile {
    pub fn new(
        id: ActorId,
        owner: ActorId,
        damage: i32,
        lifetime: f32,
        hit_sound: impl Into<String>,
    ) -> Self {
        Self {
            id,
            owner,
            damage,
            remaining: lifetime,
            expired: false,
            hit_sound: hit_sound.into(),
            visible: true,
        }
    }

    pub fn create_body(
        &self,
        physics: &mut PhysicsWorld,
        position: Vec2,
        velocity: Vec2,
        hostile_mask: u32,
    ) -> anyhow::Result<()> {
        BodyBuilder::new(BodyKind::Dynamic, position)
            .lock_rotations()
            .gravity_scale(0.0)
            .bullet()
            .fixture(
                FixtureDef::new(
                    FixtureKind::Projectile,
                    Shape::Circle { radius: 6.0 },
                    category::PROJECTILE,
                    hostile_mask | category::GROUND | category::WALL,
                )
                .sensor(),
            )
            .build(physics, self.id)?;
        physics.set_linear_velocity(self.id, velocity);
        Ok(())
    }

    /// Tick flight time. Returns true when the projectile just expired.
    pub fn update(&mut self, dt: f32) -> bool {
        if self.expired {
            return false;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.expired = true;
            return true;
        }
        false
    }
}

impl Actor for Projectile {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_gen_is_monotonic_and_unique() {
        let mut gen = ActorIdGen::new();
        let a = gen.fresh();
        let b = gen.fresh();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn projectile_expires_after_lifetime() {
        let mut p = Projectile::new(ActorId::from_raw(1), ActorId::from_raw(2), 5, 0.1, "");
        assert!(!p.update(0.05));
        assert!(p.update(0.06));
        assert!(p.expired);
        // Expiry only reports once.
        assert!(!p.update(0.1));
    }
}
