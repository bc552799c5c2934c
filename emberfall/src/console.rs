//! Console commands: the string surface triggers, dialogue nodes, and
//! timed callbacks use to poke the world.
//!
//! Commands are a closed enum parsed up front, not an interpreter. Unknown
//! commands log a warning and do nothing; the game keeps running.

use log::warn;

use crate::events::OutputEvent;
use crate::map::interactables::ObjectKind;
use crate::scene::WorldCtx;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// `additem <key> [amount]`
    AddItem { key: String, amount: u32 },
    /// `removeitem <key> [amount]`
    RemoveItem { key: String, amount: u32 },
    /// `startquest <key>`
    StartQuest { key: String },
    /// `unlockportal <objectId>`
    UnlockPortal { object_id: u32 },
    /// `setmap <path>` — jump to a map's player spawn.
    SetMap { path: String },
    /// `restorehealth <amount>`
    RestoreHealth { amount: i32 },
    /// `hurt <amount>` — trap-style damage with no source actor.
    Hurt { amount: i32 },
    /// `notify <text...>`
    Notify { text: String },
}

/// Parse one command line. Returns None (with a log line) for junk.
pub fn parse(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let head = words.next()?;
    let rest: Vec<&str> = words.collect();

    let command = match head {
        "additem" | "removeitem" => {
            let key = rest.first()?.to_string();
            let amount = rest.get(1).and_then(|a| a.parse().ok()).unwrap_or(1);
            if head == "additem" {
                Command::AddItem { key, amount }
            } else {
                Command::RemoveItem { key, amount }
            }
        }
        "startquest" => Command::StartQuest {
            key: rest.first()?.to_string(),
        },
        "unlockportal" => Command::UnlockPortal {
            object_id: rest.first()?.parse().ok()?,
        },
        "setmap" => Command::SetMap {
            path: rest.first()?.to_string(),
        },
        "restorehealth" => Command::RestoreHealth {
            amount: rest.first()?.parse().ok()?,
        },
        "hurt" => Command::Hurt {
            amount: rest.first()?.parse().ok()?,
        },
        "notify" => Command::Notify {
            text: rest.join(" "),
        },
        _ => {
            warn!("unknown console command: `{line}`");
            return None;
        }
    };
    Some(command)
}

/// Execute a command against the live world. Commands that need a subject
/// act on the player.
pub fn execute(ctx: &mut WorldCtx<'_>, command: Command) {
    let player = ctx.map.player_id();
    match command {
        Command::AddItem { key, amount } => {
            let Some(player) = player else { return };
            let def = match ctx.lib.item(&key) {
                Ok(def) => def.clone(),
                Err(err) => {
                    warn!("additem: {err}");
                    return;
                }
            };
            if let Some(character) = ctx.map.character_mut(player) {
                character.inventory.add(&key, &def, amount);
                let carried = character.inventory.amount(&key);
                if let Some(data) = character.player_data_mut() {
                    data.quests.on_item_amount(&key, carried, ctx.outputs);
                }
            }
        }
        Command::RemoveItem { key, amount } => {
            if let Some(character) = player.and_then(|p| ctx.map.character_mut(p)) {
                character.inventory.remove(&key, amount);
            }
        }
        Command::StartQuest { key } => {
            let def = match ctx.lib.quest(&key) {
                Ok(def) => def.clone(),
                Err(err) => {
                    warn!("startquest: {err}");
                    return;
                }
            };
            if let Some(data) = player
                .and_then(|p| ctx.map.character_mut(p))
                .and_then(|c| c.player_data_mut())
            {
                data.quests.start(&key, def);
            }
        }
        Command::UnlockPortal { object_id } => {
            let map_path = ctx.map.path.clone();
            let mut found = false;
            for portal in ctx.map.portals.values_mut() {
                if portal.object_id == object_id {
                    portal.locked = false;
                    found = true;
                }
            }
            if found {
                ctx.states
                    .set(&map_path, ObjectKind::Portal, object_id, true);
            } else {
                warn!("unlockportal: no portal {object_id} in `{map_path}`");
            }
        }
        Command::SetMap { path } => {
            ctx.map.requested_map = Some(path);
        }
        Command::RestoreHealth { amount } => {
            if let Some(character) = player.and_then(|p| ctx.map.character_mut(p)) {
                character.profile.restore_health(amount);
            }
        }
        Command::Hurt { amount } => {
            if let Some(player) = player {
                crate::combat::receive_damage(ctx, None, player, amount, crate::combat::DAMAGE_WINDOW);
            }
        }
        Command::Notify { text } => {
            ctx.outputs.push(OutputEvent::Notification(text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(
            parse("additem item/potion 3"),
            Some(Command::AddItem {
                key: "item/potion".into(),
                amount: 3
            })
        );
        assert_eq!(
            parse("additem item/potion"),
            Some(Command::AddItem {
                key: "item/potion".into(),
                amount: 1
            })
        );
        assert_eq!(
            parse("unlockportal 7"),
            Some(Command::UnlockPortal { object_id: 7 })
        );
        assert_eq!(
            parse("notify the gate creaks open"),
            Some(Command::Notify {
                text: "the gate creaks open".into()
            })
        );
    }

    #[test]
    fn junk_parses_to_none() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("frobnicate 3"), None);
        assert_eq!(parse("unlockportal not_a_number"), None);
        assert_eq!(parse("startquest"), None);
    }
}
