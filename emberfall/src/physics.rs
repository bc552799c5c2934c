//! rapier2d wrapper: world ownership, fluent body construction, collision
//! filtering, and engine-facing contact events.
//!
//! Rapier is a private implementation detail: do NOT re-export it. Everything
//! crossing this module boundary is in world pixels; conversion to meters
//! happens here and nowhere else.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use glam::Vec2;
use rapier2d::prelude::*;

use crate::actor::ActorId;

/// Pixels per physics meter.
pub const PPM: f32 = 100.0;

/// Default gravity in pixels/s², y-down like the screen.
pub const GRAVITY_PX: f32 = 980.0;

/// Linear damping applied to a grounded character that is not trying to
/// move, so it does not slide down inclines. Effectively infinite.
pub const STOP_DAMPING: f32 = 1.0e8;

/// Role of a fixture, used to dispatch contacts in `contact.rs`.
///
/// Values are distinct powers of two so the bitwise OR of any two kinds is a
/// unique, matchable key.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixtureKind {
    Body = 1 << 0,
    Feet = 1 << 1,
    Weapon = 1 << 2,
    Interaction = 1 << 3,
    Ground = 1 << 4,
    Platform = 1 << 5,
    Wall = 1 << 6,
    Item = 1 << 7,
    Portal = 1 << 8,
    Trigger = 1 << 9,
    Projectile = 1 << 10,
    CliffMarker = 1 << 11,
}

impl FixtureKind {
    pub const fn bits(self) -> u32 {
        self as u32
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        use FixtureKind::*;
        Some(match bits {
            x if x == Body.bits() => Body,
            x if x == Feet.bits() => Feet,
            x if x == Weapon.bits() => Weapon,
            x if x == Interaction.bits() => Interaction,
            x if x == Ground.bits() => Ground,
            x if x == Platform.bits() => Platform,
            x if x == Wall.bits() => Wall,
            x if x == Item.bits() => Item,
            x if x == Portal.bits() => Portal,
            x if x == Trigger.bits() => Trigger,
            x if x == Projectile.bits() => Projectile,
            x if x == CliffMarker.bits() => CliffMarker,
            _ => return None,
        })
    }
}

/// Collision-filter categories. Distinct from [`FixtureKind`]: the kind says
/// what a fixture *is*, the category/mask bits say what it may *touch*.
/// Disposition picks between `PLAYER`/`ENEMY`/`NPC` for character bodies.
pub mod category {
    pub const GROUND: u32 = 1 << 0;
    pub const PLATFORM: u32 = 1 << 1;
    pub const WALL: u32 = 1 << 2;
    pub const PLAYER: u32 = 1 << 3;
    pub const ENEMY: u32 = 1 << 4;
    pub const NPC: u32 = 1 << 5;
    pub const FEET: u32 = 1 << 6;
    pub const WEAPON: u32 = 1 << 7;
    pub const ITEM: u32 = 1 << 8;
    pub const PORTAL: u32 = 1 << 9;
    pub const TRIGGER: u32 = 1 << 10;
    pub const PROJECTILE: u32 = 1 << 11;
    pub const CLIFF_MARKER: u32 = 1 << 12;
    pub const INTERACTION: u32 = 1 << 13;
    /// Bodies of killed characters keep colliding with terrain only.
    pub const DESTROYED: u32 = 1 << 14;

    pub const TERRAIN: u32 = GROUND | PLATFORM | WALL;
    pub const ANY_CHARACTER: u32 = PLAYER | ENEMY | NPC;
}

/// Engine-facing rigid body type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Kinematic,
    Fixed,
}

/// Engine-facing collider shape, in pixels.
#[derive(Clone, Copy, Debug)]
pub enum Shape {
    Box { hx: f32, hy: f32 },
    Circle { radius: f32 },
    CapsuleY { half_height: f32, radius: f32 },
}

/// One fixture of a body under construction.
#[derive(Clone, Copy, Debug)]
pub struct FixtureDef {
    pub kind: FixtureKind,
    pub shape: Shape,
    /// Offset from the body origin, in pixels.
    pub offset: Vec2,
    pub sensor: bool,
    pub density: f32,
    pub friction: f32,
    pub category: u32,
    pub mask: u32,
}

impl FixtureDef {
    pub fn new(kind: FixtureKind, shape: Shape, category: u32, mask: u32) -> Self {
        Self {
            kind,
            shape,
            offset: Vec2::ZERO,
            sensor: false,
            density: 1.0,
            friction: 0.6,
            category,
            mask,
        }
    }

    #[must_use]
    pub fn sensor(mut self) -> Self {
        self.sensor = true;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    #[must_use]
    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }
}

/// Fluent constructor for a body plus its fixtures.
///
/// Collects everything in pixels, converts to meters in [`BodyBuilder::build`].
pub struct BodyBuilder {
    kind: BodyKind,
    position: Vec2,
    lock_rotations: bool,
    linear_damping: f32,
    gravity_scale: f32,
    bullet: bool,
    fixtures: Vec<FixtureDef>,
}

impl BodyBuilder {
    pub fn new(kind: BodyKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            lock_rotations: false,
            linear_damping: 0.0,
            gravity_scale: 1.0,
            bullet: false,
            fixtures: Vec::new(),
        }
    }

    /// Scale gravity for this body; zero makes projectiles fly flat.
    #[must_use]
    pub fn gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    #[must_use]
    pub fn lock_rotations(mut self) -> Self {
        self.lock_rotations = true;
        self
    }

    #[must_use]
    pub fn linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    /// Enable continuous collision detection (fast projectiles).
    #[must_use]
    pub fn bullet(mut self) -> Self {
        self.bullet = true;
        self
    }

    #[must_use]
    pub fn fixture(mut self, def: FixtureDef) -> Self {
        self.fixtures.push(def);
        self
    }

    /// Insert the body and all fixtures into the world under `actor`.
    pub fn build(self, world: &mut PhysicsWorld, actor: ActorId) -> Result<()> {
        world.insert_body(actor, self)
    }
}

/// Begin/end phase of a contact or sensor overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactPhase {
    Begin,
    End,
}

/// One side of a contact, resolved back to gameplay identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixtureRef {
    pub actor: ActorId,
    pub kind: FixtureKind,
}

/// Engine-facing contact event. Uses actor ids and fixture kinds only.
#[derive(Clone, Copy, Debug)]
pub struct ContactEvent {
    pub phase: ContactPhase,
    pub a: FixtureRef,
    pub b: FixtureRef,
}

fn encode_user_data(actor: ActorId, kind: FixtureKind) -> u128 {
    ((actor.raw() as u128) << 32) | kind.bits() as u128
}

fn decode_user_data(data: u128) -> Option<FixtureRef> {
    let kind = FixtureKind::from_bits((data & 0xffff_ffff) as u32)?;
    Some(FixtureRef {
        actor: ActorId::from_raw((data >> 32) as u64),
        kind,
    })
}

/// Geometry test behind one-way platforms: the moving collider may touch the
/// platform only while its lowest point is above the platform's top edge and
/// it overlaps the platform's horizontal span.
fn platform_allows_contact(
    mover_bottom: f32,
    mover_x: f32,
    mover_half_width: f32,
    platform_top: f32,
    platform_cx: f32,
    platform_half_width: f32,
) -> bool {
    const MARGIN: f32 = 0.15; // meters of forgiveness while a landing settles
    mover_bottom <= platform_top + MARGIN
        && (mover_x - platform_cx).abs() <= platform_half_width + mover_half_width
}

/// Lowest point and half-width of a collider, in meters.
fn collider_extent(collider: &Collider) -> (f32, f32) {
    let center = collider.translation();
    let (half_h, half_w) = match collider.shape().as_typed_shape() {
        TypedShape::Cuboid(c) => (c.half_extents.y, c.half_extents.x),
        TypedShape::Ball(b) => (b.radius, b.radius),
        TypedShape::Capsule(c) => (c.half_height() + c.radius, c.radius),
        _ => (0.0, 0.0),
    };
    (center.y + half_h, half_w)
}

/// Contact filter implementing one-way platforms.
struct OneWayPlatformHook;

impl OneWayPlatformHook {
    fn evaluate(&self, colliders: &ColliderSet, h1: ColliderHandle, h2: ColliderHandle) -> bool {
        let (Some(c1), Some(c2)) = (colliders.get(h1), colliders.get(h2)) else {
            return true;
        };
        let k1 = decode_user_data(c1.user_data).map(|f| f.kind);
        let k2 = decode_user_data(c2.user_data).map(|f| f.kind);

        let (platform, mover) = match (k1, k2) {
            (Some(FixtureKind::Platform), _) => (c1, c2),
            (_, Some(FixtureKind::Platform)) => (c2, c1),
            _ => return true,
        };

        let (plat_bottom, plat_half_w) = collider_extent(platform);
        let plat_height = match platform.shape().as_typed_shape() {
            TypedShape::Cuboid(c) => c.half_extents.y * 2.0,
            _ => 0.0,
        };
        let plat_top = plat_bottom - plat_height;
        let (mover_bottom, mover_half_w) = collider_extent(mover);

        platform_allows_contact(
            mover_bottom,
            mover.translation().x,
            mover_half_w,
            plat_top,
            platform.translation().x,
            plat_half_w,
        )
    }
}

impl PhysicsHooks for OneWayPlatformHook {
    fn filter_contact_pair(&self, context: &PairFilterContext) -> Option<SolverFlags> {
        if self.evaluate(context.colliders, context.collider1, context.collider2) {
            Some(SolverFlags::COMPUTE_IMPULSES)
        } else {
            None
        }
    }

    fn filter_intersection_pair(&self, context: &PairFilterContext) -> bool {
        self.evaluate(context.colliders, context.collider1, context.collider2)
    }
}

/// Owns the rapier world. Created and stepped by the map manager; all body
/// and fixture mutation happens synchronously on the update thread, after
/// `step` has returned (never inside contact processing).
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    event_recv_collision: crossbeam_channel::Receiver<CollisionEvent>,
    event_recv_contact_force: crossbeam_channel::Receiver<ContactForceEvent>,
    event_handler: ChannelEventCollector,
    hooks: OneWayPlatformHook,

    actor_to_body: HashMap<ActorId, RigidBodyHandle>,
    body_to_actor: HashMap<RigidBodyHandle, ActorId>,

    gravity: Vec2,
    pending_contacts: Vec<ContactEvent>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let (send_col, recv_col) = crossbeam_channel::unbounded();
        let (send_force, recv_force) = crossbeam_channel::unbounded();
        let event_handler = ChannelEventCollector::new(send_col, send_force);

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_recv_collision: recv_col,
            event_recv_contact_force: recv_force,
            event_handler,
            hooks: OneWayPlatformHook,
            actor_to_body: HashMap::new(),
            body_to_actor: HashMap::new(),
            gravity: Vec2::new(0.0, GRAVITY_PX),
            pending_contacts: Vec::new(),
        }
    }

    pub fn with_gravity(gravity: Vec2) -> Self {
        let mut world = Self::new();
        world.gravity = gravity;
        world
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Step the simulation by `dt` seconds and collect contact events.
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        let gravity = vector![self.gravity.x / PPM, self.gravity.y / PPM];

        self.pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &self.hooks,
            &self.event_handler,
        );

        self.query_pipeline
            .update(&self.island_manager, &self.rigid_bodies, &self.colliders);

        self.collect_contacts();
    }

    /// Contact events collected by the last `step`.
    pub fn drain_contacts(&mut self) -> Vec<ContactEvent> {
        // Contact-force events are unused but must be drained so the channel
        // does not grow without bound.
        while self.event_recv_contact_force.try_recv().is_ok() {}
        std::mem::take(&mut self.pending_contacts)
    }

    fn insert_body(&mut self, actor: ActorId, builder: BodyBuilder) -> Result<()> {
        if self.actor_to_body.contains_key(&actor) {
            return Err(anyhow!("actor {actor:?} already has a physics body"));
        }

        let body_type = match builder.kind {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Kinematic => RigidBodyType::KinematicVelocityBased,
            BodyKind::Fixed => RigidBodyType::Fixed,
        };

        let mut rb = RigidBodyBuilder::new(body_type)
            .translation(vector![builder.position.x / PPM, builder.position.y / PPM])
            .linear_damping(builder.linear_damping)
            .gravity_scale(builder.gravity_scale);
        if builder.lock_rotations {
            rb = rb.lock_rotations();
        }
        if builder.bullet {
            rb = rb.ccd_enabled(true);
        }

        let handle = self.rigid_bodies.insert(rb.build());
        self.actor_to_body.insert(actor, handle);
        self.body_to_actor.insert(handle, actor);

        for def in builder.fixtures {
            let shape = match def.shape {
                Shape::Box { hx, hy } => SharedShape::cuboid(hx / PPM, hy / PPM),
                Shape::Circle { radius } => SharedShape::ball(radius / PPM),
                Shape::CapsuleY {
                    half_height,
                    radius,
                } => SharedShape::capsule_y(half_height / PPM, radius / PPM),
            };

            let collider = ColliderBuilder::new(shape)
                .translation(vector![def.offset.x / PPM, def.offset.y / PPM])
                .sensor(def.sensor)
                .density(def.density)
                .friction(def.friction)
                .collision_groups(InteractionGroups::new(def.category, def.mask))
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .active_hooks(
                    ActiveHooks::FILTER_CONTACT_PAIRS | ActiveHooks::FILTER_INTERSECTION_PAIR,
                )
                .user_data(encode_user_data(actor, def.kind))
                .build();

            self.colliders
                .insert_with_parent(collider, handle, &mut self.rigid_bodies);
        }

        Ok(())
    }

    /// Remove an actor's body and all its fixtures. Returns whether one
    /// existed.
    pub fn remove_body(&mut self, actor: ActorId) -> bool {
        if let Some(handle) = self.actor_to_body.remove(&actor) {
            self.rigid_bodies.remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
            self.body_to_actor.remove(&handle);
            true
        } else {
            false
        }
    }

    pub fn has_body(&self, actor: ActorId) -> bool {
        self.actor_to_body.contains_key(&actor)
    }

    pub fn position(&self, actor: ActorId) -> Option<Vec2> {
        let body = self.body(actor)?;
        let t = body.translation();
        Some(Vec2::new(t.x * PPM, t.y * PPM))
    }

    pub fn set_position(&mut self, actor: ActorId, position: Vec2) {
        if let Some(body) = self.body_mut(actor) {
            body.set_translation(vector![position.x / PPM, position.y / PPM], true);
        }
    }

    pub fn linear_velocity(&self, actor: ActorId) -> Option<Vec2> {
        let body = self.body(actor)?;
        let v = body.linvel();
        Some(Vec2::new(v.x * PPM, v.y * PPM))
    }

    pub fn set_linear_velocity(&mut self, actor: ActorId, velocity: Vec2) {
        if let Some(body) = self.body_mut(actor) {
            body.set_linvel(vector![velocity.x / PPM, velocity.y / PPM], true);
        }
    }

    pub fn apply_impulse(&mut self, actor: ActorId, impulse: Vec2) {
        if let Some(body) = self.body_mut(actor) {
            body.apply_impulse(vector![impulse.x / PPM, impulse.y / PPM], true);
        }
    }

    pub fn set_linear_damping(&mut self, actor: ActorId, damping: f32) {
        if let Some(body) = self.body_mut(actor) {
            body.set_linear_damping(damping);
        }
    }

    pub fn mass(&self, actor: ActorId) -> Option<f32> {
        Some(self.body(actor)?.mass())
    }

    /// Replace the collision category of every fixture of `actor` whose kind
    /// is `kind`. Used to flip a killed character's body into the
    /// `DESTROYED` category so nothing targets the corpse.
    pub fn set_category(&mut self, actor: ActorId, kind: FixtureKind, new_category: u32) {
        let Some(&handle) = self.actor_to_body.get(&actor) else {
            return;
        };
        let collider_handles: Vec<ColliderHandle> = match self.rigid_bodies.get(handle) {
            Some(body) => body.colliders().to_vec(),
            None => return,
        };
        for ch in collider_handles {
            if let Some(collider) = self.colliders.get_mut(ch) {
                let fixture = decode_user_data(collider.user_data);
                if fixture.map(|f| f.kind) == Some(kind) {
                    let mask = collider.collision_groups().filter;
                    collider.set_collision_groups(InteractionGroups::new(new_category, mask));
                }
            }
        }
    }

    /// Current collision category bits of the first fixture of `kind`.
    pub fn category_of(&self, actor: ActorId, kind: FixtureKind) -> Option<u32> {
        let handle = *self.actor_to_body.get(&actor)?;
        let body = self.rigid_bodies.get(handle)?;
        for &ch in body.colliders() {
            let collider = self.colliders.get(ch)?;
            if decode_user_data(collider.user_data).map(|f| f.kind) == Some(kind) {
                return Some(collider.collision_groups().memberships);
            }
        }
        None
    }

    /// Normal of the terrain directly below the actor, if any within
    /// `max_dist` pixels. Drives slope-aligned movement impulses.
    pub fn ground_normal_below(&self, actor: ActorId, max_dist: f32) -> Option<Vec2> {
        let handle = *self.actor_to_body.get(&actor)?;
        let body = self.rigid_bodies.get(handle)?;
        let origin = body.translation();

        let ray = Ray::new(point![origin.x, origin.y], vector![0.0, 1.0]);
        let filter = QueryFilter::default()
            .exclude_rigid_body(handle)
            .exclude_sensors();

        let (_, intersection) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_bodies,
            &self.colliders,
            &ray,
            max_dist / PPM,
            true,
            filter,
        )?;
        Some(Vec2::new(intersection.normal.x, intersection.normal.y))
    }

    fn collect_contacts(&mut self) {
        while let Ok(event) = self.event_recv_collision.try_recv() {
            let (h1, h2, phase) = match event {
                CollisionEvent::Started(h1, h2, _) => (h1, h2, ContactPhase::Begin),
                CollisionEvent::Stopped(h1, h2, _) => (h1, h2, ContactPhase::End),
            };
            if let Some((a, b)) = self.resolve_pair(h1, h2) {
                self.pending_contacts.push(ContactEvent { phase, a, b });
            }
        }
    }

    fn resolve_pair(&self, h1: ColliderHandle, h2: ColliderHandle) -> Option<(FixtureRef, FixtureRef)> {
        let c1 = self.colliders.get(h1)?;
        let c2 = self.colliders.get(h2)?;
        Some((decode_user_data(c1.user_data)?, decode_user_data(c2.user_data)?))
    }

    fn body(&self, actor: ActorId) -> Option<&RigidBody> {
        self.rigid_bodies.get(*self.actor_to_body.get(&actor)?)
    }

    fn body_mut(&mut self, actor: ActorId) -> Option<&mut RigidBody> {
        let handle = *self.actor_to_body.get(&actor)?;
        self.rigid_bodies.get_mut(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground_fixture() -> FixtureDef {
        FixtureDef::new(
            FixtureKind::Ground,
            Shape::Box { hx: 500.0, hy: 10.0 },
            category::GROUND,
            u32::MAX,
        )
        .friction(1.0)
    }

    #[test]
    fn fixture_kind_bits_round_trip() {
        for kind in [
            FixtureKind::Body,
            FixtureKind::Feet,
            FixtureKind::Weapon,
            FixtureKind::Interaction,
            FixtureKind::Ground,
            FixtureKind::Platform,
            FixtureKind::Wall,
            FixtureKind::Item,
            FixtureKind::Portal,
            FixtureKind::Trigger,
            FixtureKind::Projectile,
            FixtureKind::CliffMarker,
        ] {
            assert_eq!(FixtureKind::from_bits(kind.bits()), Some(kind));
            assert_eq!(kind.bits().count_ones(), 1);
        }
    }

    #[test]
    fn user_data_round_trip() {
        let actor = ActorId::from_raw(77);
        let data = encode_user_data(actor, FixtureKind::Weapon);
        let fixture = decode_user_data(data).unwrap();
        assert_eq!(fixture.actor, actor);
        assert_eq!(fixture.kind, FixtureKind::Weapon);
    }

    #[test]
    fn dynamic_body_falls_under_gravity() {
        let mut world = PhysicsWorld::new();
        let actor = ActorId::from_raw(1);
        BodyBuilder::new(BodyKind::Dynamic, Vec2::new(0.0, 0.0))
            .fixture(FixtureDef::new(
                FixtureKind::Body,
                Shape::Circle { radius: 10.0 },
                category::PLAYER,
                category::TERRAIN,
            ))
            .build(&mut world, actor)
            .unwrap();

        for _ in 0..30 {
            world.step(1.0 / 60.0);
        }
        let pos = world.position(actor).unwrap();
        assert!(pos.y > 10.0, "body should have fallen, got {pos:?}");
    }

    #[test]
    fn feet_sensor_reports_ground_contact() {
        let mut world = PhysicsWorld::new();
        let ground = ActorId::from_raw(1);
        BodyBuilder::new(BodyKind::Fixed, Vec2::new(0.0, 100.0))
            .fixture(ground_fixture())
            .build(&mut world, ground)
            .unwrap();

        let walker = ActorId::from_raw(2);
        BodyBuilder::new(BodyKind::Dynamic, Vec2::new(0.0, 40.0))
            .lock_rotations()
            .fixture(FixtureDef::new(
                FixtureKind::Body,
                Shape::CapsuleY {
                    half_height: 15.0,
                    radius: 10.0,
                },
                category::PLAYER,
                category::TERRAIN,
            ))
            .fixture(
                FixtureDef::new(
                    FixtureKind::Feet,
                    Shape::Circle { radius: 6.0 },
                    category::FEET,
                    category::GROUND | category::PLATFORM,
                )
                .offset(Vec2::new(0.0, 26.0))
                .sensor(),
            )
            .build(&mut world, walker)
            .unwrap();

        let mut saw_feet_ground = false;
        for _ in 0..120 {
            world.step(1.0 / 60.0);
            for event in world.drain_contacts() {
                let kinds = (event.a.kind, event.b.kind);
                if event.phase == ContactPhase::Begin
                    && (kinds == (FixtureKind::Feet, FixtureKind::Ground)
                        || kinds == (FixtureKind::Ground, FixtureKind::Feet))
                {
                    saw_feet_ground = true;
                }
            }
        }
        assert!(saw_feet_ground, "expected a feet/ground begin contact");
    }

    #[test]
    fn destroyed_category_flip_only_touches_requested_kind() {
        let mut world = PhysicsWorld::new();
        let actor = ActorId::from_raw(3);
        BodyBuilder::new(BodyKind::Dynamic, Vec2::ZERO)
            .fixture(FixtureDef::new(
                FixtureKind::Body,
                Shape::Circle { radius: 10.0 },
                category::ENEMY,
                category::TERRAIN,
            ))
            .fixture(
                FixtureDef::new(
                    FixtureKind::Weapon,
                    Shape::Circle { radius: 20.0 },
                    category::WEAPON,
                    category::PLAYER,
                )
                .sensor(),
            )
            .build(&mut world, actor)
            .unwrap();

        world.set_category(actor, FixtureKind::Body, category::DESTROYED);
        assert_eq!(
            world.category_of(actor, FixtureKind::Body),
            Some(category::DESTROYED)
        );
        assert_eq!(
            world.category_of(actor, FixtureKind::Weapon),
            Some(category::WEAPON)
        );
    }

    #[test]
    fn one_way_platform_geometry() {
        // Above the top edge and inside the span: allowed.
        assert!(platform_allows_contact(1.0, 0.0, 0.1, 1.05, 0.0, 1.0));
        // Below the top edge: pass through.
        assert!(!platform_allows_contact(2.0, 0.0, 0.1, 1.0, 0.0, 1.0));
        // Outside the horizontal span: no landing.
        assert!(!platform_allows_contact(1.0, 5.0, 0.1, 1.05, 0.0, 1.0));
    }

    #[test]
    fn ground_normal_is_up_on_flat_floor() {
        let mut world = PhysicsWorld::new();
        let ground = ActorId::from_raw(1);
        BodyBuilder::new(BodyKind::Fixed, Vec2::new(0.0, 100.0))
            .fixture(ground_fixture())
            .build(&mut world, ground)
            .unwrap();

        let actor = ActorId::from_raw(2);
        BodyBuilder::new(BodyKind::Dynamic, Vec2::new(0.0, 50.0))
            .fixture(FixtureDef::new(
                FixtureKind::Body,
                Shape::Circle { radius: 10.0 },
                category::PLAYER,
                category::TERRAIN,
            ))
            .build(&mut world, actor)
            .unwrap();
        world.step(1.0 / 60.0);

        let normal = world.ground_normal_below(actor, 200.0).unwrap();
        assert!(normal.y < -0.9, "flat floor normal should point up: {normal:?}");
    }
}
