//! Headless sandbox: loads the bundled data files, runs a scripted session
//! for a few hundred frames, and logs every observable event.

use std::path::Path;

use anyhow::Result;
use emberfall::events::OutputEvent;
use emberfall::{DefLibrary, GameScene, Key, FIXED_DT};
use log::info;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    let mut lib = DefLibrary::new();
    let loaded = lib.load_dir(&data_dir)?;
    info!("definitions loaded: {loaded}");

    let mut scene = GameScene::new(lib, "maps/town.json", "char/hero.json")?;

    // Scripted input: settle, run right toward the skeleton, swing a few
    // times, then keep walking to the portal and step through.
    for frame in 0..900usize {
        match frame {
            60 => scene.input.press(Key::KeyD),
            360 => scene.input.press(Key::KeyJ),
            366 => scene.input.release(Key::KeyJ),
            420 => scene.input.press(Key::KeyJ),
            426 => scene.input.release(Key::KeyJ),
            600 => scene.input.press(Key::KeyE),
            606 => scene.input.release(Key::KeyE),
            _ => {}
        }
        // Poke the interact key periodically so the portal fires whenever
        // we reach it.
        if frame > 600 && frame % 30 == 0 {
            scene.input.press(Key::KeyE);
        } else if frame > 600 && frame % 30 == 1 {
            scene.input.release(Key::KeyE);
        }

        scene.update(FIXED_DT)?;

        for event in scene.drain_outputs() {
            match event {
                OutputEvent::Sound(key) => info!("frame {frame}: sound {key}"),
                OutputEvent::FloatingDamage { target, amount } => {
                    info!("frame {frame}: {target:?} takes {amount}")
                }
                OutputEvent::Died { actor, position } => {
                    info!("frame {frame}: {actor:?} died at {position}")
                }
                other => info!("frame {frame}: {other:?}"),
            }
        }
    }

    let player = scene.player().expect("player alive");
    info!(
        "done: map={} hp={}/{} items={} state={:?}",
        scene.manager.map.path,
        player.profile.health,
        player.profile.full_health,
        player.inventory.amount("item/potion.json"),
        player.state(),
    );
    Ok(())
}
