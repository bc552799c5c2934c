//! The contact router: the only place fixture-kind pairs are interpreted.
//!
//! `PhysicsWorld` hands over raw begin/end contact events; `route` matches
//! on the bitwise OR of the two fixtures' kind bits (every kind is a
//! distinct power of two, so keys cannot collide) and produces typed
//! [`Reaction`]s. Reactions are applied from a queue *after* the physics
//! step has fully returned — nothing here may create or destroy fixtures
//! while rapier is mid-step, which is why even "interact on contact" goes
//! through a short scheduled delay.

use log::warn;

use crate::actor::ActorId;
use crate::combat;
use crate::events::OutputEvent;
use crate::map;
use crate::math::slope_angle;
use crate::physics::{ContactEvent, ContactPhase, FixtureKind, FixtureRef};
use crate::scene::WorldCtx;

/// Delay before a contact-triggered interactable auto-interacts. Keeps the
/// resulting fixture churn out of the contact-processing pass.
const AUTO_INTERACT_DELAY: f32 = 0.1;

/// How far below a character to look for the ground slope.
const SLOPE_PROBE_DIST: f32 = 120.0;

/// One gameplay-level consequence of a contact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Reaction {
    Landed { character: ActorId, platform: bool },
    LeftSurface { character: ActorId, platform: bool },
    EnterWeaponRange { attacker: ActorId, victim: ActorId },
    LeaveWeaponRange { attacker: ActorId, victim: ActorId },
    ItemNearby { character: ActorId, item: ActorId, begin: bool },
    PortalNearby { character: ActorId, portal: ActorId, begin: bool },
    InteractableNearby { character: ActorId, target: ActorId, begin: bool },
    TriggerTouched { character: ActorId, trigger: ActorId },
    ProjectileHit { projectile: ActorId, victim: ActorId },
    ProjectileBlocked { projectile: ActorId },
    CliffContact { character: ActorId, begin: bool },
}

/// Orient a contact pair so `first` has kind `kind`. Returns (first, other).
fn oriented(a: FixtureRef, b: FixtureRef, kind: FixtureKind) -> (FixtureRef, FixtureRef) {
    if a.kind == kind {
        (a, b)
    } else {
        (b, a)
    }
}

/// Translate raw contact events into reactions. Pure: no world access.
pub fn route(events: &[ContactEvent]) -> Vec<Reaction> {
    use FixtureKind::*;

    const FEET_GROUND: u32 = Feet.bits() | Ground.bits();
    const FEET_PLATFORM: u32 = Feet.bits() | Platform.bits();
    const WEAPON_BODY: u32 = Weapon.bits() | Body.bits();
    const FEET_ITEM: u32 = Feet.bits() | Item.bits();
    const FEET_PORTAL: u32 = Feet.bits() | Portal.bits();
    const FEET_INTERACTION: u32 = Feet.bits() | Interaction.bits();
    const BODY_TRIGGER: u32 = Body.bits() | Trigger.bits();
    const PROJECTILE_BODY: u32 = Projectile.bits() | Body.bits();
    const PROJECTILE_GROUND: u32 = Projectile.bits() | Ground.bits();
    const PROJECTILE_WALL: u32 = Projectile.bits() | Wall.bits();
    const FEET_CLIFF: u32 = Feet.bits() | CliffMarker.bits();
    // Physical-only pairs: the solver handles them, gameplay does not.
    const BODY_GROUND: u32 = Body.bits() | Ground.bits();
    const BODY_PLATFORM: u32 = Body.bits() | Platform.bits();
    const BODY_WALL: u32 = Body.bits() | Wall.bits();
    const ITEM_GROUND: u32 = Item.bits() | Ground.bits();
    const ITEM_PLATFORM: u32 = Item.bits() | Platform.bits();
    const ITEM_WALL: u32 = Item.bits() | Wall.bits();

    let mut reactions = Vec::with_capacity(events.len());
    for event in events {
        let begin = event.phase == ContactPhase::Begin;
        let key = event.a.kind.bits() | event.b.kind.bits();
        match key {
            FEET_GROUND | FEET_PLATFORM => {
                let (feet, _) = oriented(event.a, event.b, Feet);
                let platform = key == FEET_PLATFORM;
                reactions.push(if begin {
                    Reaction::Landed {
                        character: feet.actor,
                        platform,
                    }
                } else {
                    Reaction::LeftSurface {
                        character: feet.actor,
                        platform,
                    }
                });
            }
            WEAPON_BODY => {
                let (weapon, body) = oriented(event.a, event.b, Weapon);
                if weapon.actor == body.actor {
                    continue;
                }
                reactions.push(if begin {
                    Reaction::EnterWeaponRange {
                        attacker: weapon.actor,
                        victim: body.actor,
                    }
                } else {
                    Reaction::LeaveWeaponRange {
                        attacker: weapon.actor,
                        victim: body.actor,
                    }
                });
            }
            FEET_ITEM => {
                let (feet, item) = oriented(event.a, event.b, Feet);
                reactions.push(Reaction::ItemNearby {
                    character: feet.actor,
                    item: item.actor,
                    begin,
                });
            }
            FEET_PORTAL => {
                let (feet, portal) = oriented(event.a, event.b, Feet);
                reactions.push(Reaction::PortalNearby {
                    character: feet.actor,
                    portal: portal.actor,
                    begin,
                });
            }
            FEET_INTERACTION => {
                let (feet, target) = oriented(event.a, event.b, Feet);
                reactions.push(Reaction::InteractableNearby {
                    character: feet.actor,
                    target: target.actor,
                    begin,
                });
            }
            BODY_TRIGGER => {
                if begin {
                    let (body, trigger) = oriented(event.a, event.b, Body);
                    reactions.push(Reaction::TriggerTouched {
                        character: body.actor,
                        trigger: trigger.actor,
                    });
                }
            }
            PROJECTILE_BODY => {
                if begin {
                    let (projectile, body) = oriented(event.a, event.b, Projectile);
                    reactions.push(Reaction::ProjectileHit {
                        projectile: projectile.actor,
                        victim: body.actor,
                    });
                }
            }
            PROJECTILE_GROUND | PROJECTILE_WALL => {
                if begin {
                    let (projectile, _) = oriented(event.a, event.b, Projectile);
                    reactions.push(Reaction::ProjectileBlocked {
                        projectile: projectile.actor,
                    });
                }
            }
            FEET_CLIFF => {
                let (feet, _) = oriented(event.a, event.b, Feet);
                reactions.push(Reaction::CliffContact {
                    character: feet.actor,
                    begin,
                });
            }
            BODY_GROUND | BODY_PLATFORM | BODY_WALL | ITEM_GROUND | ITEM_PLATFORM
            | ITEM_WALL => {}
            _ => {
                // A pair the table does not know. Every new fixture kind
                // needs its cases added here.
                warn!(
                    "unrouted contact: {:?} x {:?}",
                    event.a.kind, event.b.kind
                );
            }
        }
    }
    reactions
}

/// Apply routed reactions to the live world.
pub fn apply(ctx: &mut WorldCtx<'_>, reactions: Vec<Reaction>) {
    for reaction in reactions {
        match reaction {
            Reaction::Landed { character, platform } => {
                let slope = ctx
                    .physics
                    .ground_normal_below(character, SLOPE_PROBE_DIST)
                    .map(slope_angle)
                    .unwrap_or(0.0);
                if let Some(c) = ctx.map.character_mut(character) {
                    c.on_landed(platform, slope);
                }
            }
            Reaction::LeftSurface { character, platform } => {
                if let Some(c) = ctx.map.character_mut(character) {
                    c.on_left_surface(platform);
                }
            }
            Reaction::EnterWeaponRange { attacker, victim } => {
                if let Some(a) = ctx.map.character_mut(attacker) {
                    a.in_range_targets.insert(victim);
                    if a.locked_on_target.is_none() {
                        a.locked_on_target = Some(victim);
                    }
                    a.notify_skill_melee_contact();
                }
            }
            Reaction::LeaveWeaponRange { attacker, victim } => {
                if let Some(a) = ctx.map.character_mut(attacker) {
                    a.in_range_targets.remove(&victim);
                }
            }
            Reaction::ItemNearby { character, item, begin } => {
                if let Some(c) = ctx.map.character_mut(character) {
                    if begin {
                        if !c.nearby_items.contains(&item) {
                            c.nearby_items.push(item);
                        }
                    } else {
                        c.nearby_items.retain(|i| *i != item);
                    }
                }
            }
            Reaction::PortalNearby { character, portal, begin } => {
                let trigger_on_contact = ctx
                    .map
                    .portals
                    .get(&portal)
                    .map(|p| p.trigger_on_contact)
                    .unwrap_or(false);
                if let Some(c) = ctx.map.character_mut(character) {
                    if begin {
                        if !c.nearby_portals.contains(&portal) {
                            c.nearby_portals.push(portal);
                        }
                    } else {
                        c.nearby_portals.retain(|p| *p != portal);
                    }
                }
                if begin && trigger_on_contact {
                    ctx.callbacks.run_after(AUTO_INTERACT_DELAY, move |c| {
                        map::enter_portal(c, character, portal);
                    });
                }
            }
            Reaction::InteractableNearby { character, target, begin } => {
                if let Some(c) = ctx.map.character_mut(character) {
                    if begin {
                        if !c.nearby_interactables.contains(&target) {
                            c.nearby_interactables.push(target);
                        }
                    } else {
                        c.nearby_interactables.retain(|t| *t != target);
                    }
                }
                // Only the player sees hints.
                if ctx.map.player_id() == Some(character) {
                    ctx.outputs.push(OutputEvent::InteractionHint {
                        target,
                        visible: begin,
                    });
                }
            }
            Reaction::TriggerTouched { character, trigger } => {
                let player = ctx.map.player_id();
                if let Some(zone) = ctx.map.triggers.get_mut(&trigger) {
                    if zone.fired && zone.once {
                        continue;
                    }
                    if zone.player_only && player != Some(character) {
                        continue;
                    }
                    zone.fired = true;
                    let commands = zone.commands.clone();
                    ctx.map.requested_commands.extend(commands);
                }
            }
            Reaction::ProjectileHit { projectile, victim } => {
                let Some(p) = ctx.map.projectiles.get_mut(&projectile) else {
                    continue;
                };
                if p.owner == victim || p.expired {
                    continue; // self-hit guard
                }
                p.expired = true;
                let owner = p.owner;
                let damage = p.damage;
                let hit_sound = p.hit_sound.clone();
                ctx.outputs.sound(hit_sound);
                combat::receive_damage(ctx, Some(owner), victim, damage, combat::DAMAGE_WINDOW);
            }
            Reaction::ProjectileBlocked { projectile } => {
                if let Some(p) = ctx.map.projectiles.get_mut(&projectile) {
                    p.expired = true;
                }
            }
            Reaction::CliffContact { character, begin } => {
                if let Some(c) = ctx.map.character_mut(character) {
                    if let Some(npc) = c.npc_data_mut() {
                        if begin {
                            npc.ai.on_cliff = true;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::ContactPhase;

    fn fixture(actor: u64, kind: FixtureKind) -> FixtureRef {
        FixtureRef {
            actor: ActorId::from_raw(actor),
            kind,
        }
    }

    fn begin(a: FixtureRef, b: FixtureRef) -> ContactEvent {
        ContactEvent {
            phase: ContactPhase::Begin,
            a,
            b,
        }
    }

    fn end(a: FixtureRef, b: FixtureRef) -> ContactEvent {
        ContactEvent {
            phase: ContactPhase::End,
            a,
            b,
        }
    }

    #[test]
    fn feet_ground_maps_to_landed_either_order() {
        let feet = fixture(1, FixtureKind::Feet);
        let ground = fixture(2, FixtureKind::Ground);
        for event in [begin(feet, ground), begin(ground, feet)] {
            let reactions = route(&[event]);
            assert_eq!(
                reactions,
                vec![Reaction::Landed {
                    character: ActorId::from_raw(1),
                    platform: false
                }]
            );
        }
    }

    #[test]
    fn platform_contacts_are_distinguished_from_ground() {
        let feet = fixture(1, FixtureKind::Feet);
        let platform = fixture(3, FixtureKind::Platform);
        let reactions = route(&[end(feet, platform)]);
        assert_eq!(
            reactions,
            vec![Reaction::LeftSurface {
                character: ActorId::from_raw(1),
                platform: true
            }]
        );
    }

    #[test]
    fn weapon_body_resolves_attacker_and_victim() {
        let weapon = fixture(1, FixtureKind::Weapon);
        let body = fixture(2, FixtureKind::Body);
        let reactions = route(&[begin(body, weapon)]);
        assert_eq!(
            reactions,
            vec![Reaction::EnterWeaponRange {
                attacker: ActorId::from_raw(1),
                victim: ActorId::from_raw(2)
            }]
        );
    }

    #[test]
    fn own_weapon_touching_own_body_is_ignored() {
        let weapon = fixture(1, FixtureKind::Weapon);
        let body = fixture(1, FixtureKind::Body);
        assert!(route(&[begin(weapon, body)]).is_empty());
    }

    #[test]
    fn trigger_and_projectile_end_contacts_are_dropped() {
        let body = fixture(1, FixtureKind::Body);
        let trigger = fixture(2, FixtureKind::Trigger);
        let projectile = fixture(3, FixtureKind::Projectile);
        assert!(route(&[end(body, trigger)]).is_empty());
        assert!(route(&[end(projectile, body)]).is_empty());
        assert_eq!(route(&[begin(projectile, body)]).len(), 1);
    }

    #[test]
    fn every_kind_pair_key_is_unique() {
        // The closed table relies on OR-keys never colliding; kinds are
        // distinct powers of two, so any two distinct pairs differ.
        let kinds = [
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
        ];
        let mut seen = std::collections::HashSet::new();
        for (i, a) in kinds.iter().enumerate() {
            for b in kinds.iter().skip(i + 1) {
                assert!(seen.insert(a.bits() | b.bits()));
            }
        }
    }
}
