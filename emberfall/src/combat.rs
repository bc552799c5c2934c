//! Cross-actor combat: damage infliction, kill sequences, loot.
//!
//! `Character::attack` only schedules; everything that touches a second
//! actor funnels through here, against the live world context, so the
//! re-validation the deferred callbacks need ("is the victim still in
//! range, is the attacker still able") happens at fire time.

use glam::Vec2;
use log::debug;

use crate::actor::ActorId;
use crate::events::OutputEvent;
use crate::physics::{category, FixtureKind};
use crate::scene::WorldCtx;

/// Seconds a character is un-interactable after taking a hit.
pub const DAMAGE_WINDOW: f32 = 0.3;
/// Horizontal knock-back speed, px/s.
const KNOCKBACK_SPEED: f32 = 140.0;
const KNOCKBACK_LIFT: f32 = 60.0;

/// Deferred damage tick from an earlier swing. Re-validates the hit: the
/// attacker must still exist and not be mid-hit-stun, and the victim must
/// still be inside the attacker's weapon range. A swing that was valid when
/// scheduled lands nothing if either side moved on — that race is the
/// point.
pub fn inflict_damage(ctx: &mut WorldCtx<'_>, attacker: ActorId, victim: ActorId, damage: i32) {
    let attacker_ok = ctx
        .map
        .character(attacker)
        .map(|a| {
            !a.is_killed()
                && !a.is_set_to_kill()
                && !a.is_taking_damage()
                && a.in_range_targets.contains(&victim)
        })
        .unwrap_or(false);
    if !attacker_ok {
        debug!("damage tick dropped: attacker {attacker:?} no longer valid");
        return;
    }
    receive_damage(ctx, Some(attacker), victim, damage, DAMAGE_WINDOW);
}

/// Apply damage to a character.
///
/// No-ops when the victim is invincible or already dying, or when the
/// source is itself dying. Blocking converts the hit into a parry. Lethal
/// damage starts the kill sequence: category flip, lock-on transfer for the
/// killer and all its allies, and a deferred body destruction when the
/// kill animation completes.
pub fn receive_damage(
    ctx: &mut WorldCtx<'_>,
    source: Option<ActorId>,
    victim_id: ActorId,
    damage: i32,
    damage_window: f32,
) {
    if let Some(source_id) = source {
        match ctx.map.character(source_id) {
            Some(s) if !s.is_set_to_kill() && !s.is_killed() => {}
            _ => return,
        }
    }

    let from_trap = source.is_none();
    let (dead, hit_sound, death_sound, killed_duration) = {
        let Some(victim) = ctx.map.character_mut(victim_id) else {
            return;
        };
        if !victim.can_be_damaged() {
            return;
        }

        if victim.is_blocking() {
            victim.begin_hit_while_blocking();
            let sound = victim.profile.sound("block").to_string();
            ctx.outputs.sound(sound);
            return;
        }

        victim.profile.health = (victim.profile.health - damage).max(0);
        victim.begin_damage_window(from_trap);
        victim.cancel_attack(ctx.callbacks);
        let dead = victim.profile.health == 0;
        if dead {
            victim.set_to_kill();
        }
        (
            dead,
            victim.profile.sound("hit").to_string(),
            victim.profile.sound("death").to_string(),
            victim.killed_clip_duration(),
        )
    };

    ctx.outputs.push(OutputEvent::FloatingDamage {
        target: victim_id,
        amount: damage,
    });
    ctx.outputs.sound(hit_sound);

    ctx.callbacks.run_after(damage_window, move |c| {
        if let Some(victim) = c.map.character_mut(victim_id) {
            victim.end_damage_window();
        }
    });

    if let Some(source_id) = source {
        if let (Some(sp), Some(vp), Some(mass)) = (
            ctx.physics.position(source_id),
            ctx.physics.position(victim_id),
            ctx.physics.mass(victim_id),
        ) {
            let dir = if vp.x >= sp.x { 1.0 } else { -1.0 };
            ctx.physics.apply_impulse(
                victim_id,
                Vec2::new(dir * KNOCKBACK_SPEED * mass, -KNOCKBACK_LIFT * mass),
            );
        }
    }

    if dead {
        begin_kill_sequence(ctx, source, victim_id, death_sound, killed_duration);
    }
}

fn begin_kill_sequence(
    ctx: &mut WorldCtx<'_>,
    killer: Option<ActorId>,
    victim_id: ActorId,
    death_sound: String,
    killed_duration: f32,
) {
    // The corpse stops registering as a combat target immediately.
    ctx.physics
        .set_category(victim_id, FixtureKind::Body, category::DESTROYED);

    // The killer and every ally stop locking onto the victim.
    if let Some(killer_id) = killer {
        let party = ctx.map.character(killer_id).and_then(|c| c.party);
        let mut affected = vec![killer_id];
        affected.extend(ctx.parties.allies_of(party, killer_id));
        for ally in affected {
            if let Some(character) = ctx.map.character_mut(ally) {
                if character.locked_on_target == Some(victim_id) {
                    character.locked_on_target = None;
                }
            }
        }
    }
    ctx.map.purge_refs(victim_id);

    // Player quest progress keys off the victim's definition.
    let victim_profile_key = ctx
        .map
        .character(victim_id)
        .map(|c| c.profile_key().to_string());
    if let (Some(killer_id), Some(profile_key)) = (killer, victim_profile_key) {
        if let Some(killer_char) = ctx.map.character_mut(killer_id) {
            if let Some(player) = killer_char.player_data_mut() {
                player.quests.on_kill(&profile_key, ctx.outputs);
            }
        }
    }

    ctx.outputs.sound(death_sound);
    if let Some(position) = ctx.physics.position(victim_id) {
        ctx.outputs.push(OutputEvent::Died {
            actor: victim_id,
            position,
        });
    }

    // Body destruction and loot wait for the kill animation.
    ctx.callbacks
        .run_after(killed_duration, move |c| finish_kill(c, victim_id));
}

/// Completion of the kill animation: destroy the body, mark the character
/// killed, roll its loot table where it fell.
pub fn finish_kill(ctx: &mut WorldCtx<'_>, victim_id: ActorId) {
    let position = ctx.physics.position(victim_id);
    let drops = {
        let Some(victim) = ctx.map.character_mut(victim_id) else {
            return;
        };
        victim.mark_killed();
        victim.profile.dropped_items.clone()
    };
    ctx.physics.remove_body(victim_id);

    let Some(position) = position else { return };
    for (key, entry) in drops {
        if entry.chance < 100 && fastrand::u32(0..100) >= entry.chance {
            continue;
        }
        let amount = if entry.max_amount > entry.min_amount {
            fastrand::u32(entry.min_amount..=entry.max_amount)
        } else {
            entry.min_amount
        };
        if amount == 0 {
            continue;
        }
        if let Err(err) =
            ctx.map
                .spawn_dropped_item(ctx.physics, ctx.id_gen, &key, amount, position)
        {
            log::warn!("failed to drop `{key}`: {err}");
        }
    }
}
