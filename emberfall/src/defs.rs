//! Definition library: every data file the simulation consumes, keyed by
//! its asset-style path.
//!
//! The library is filled either from disk (the demo binary) or from inline
//! JSON (tests); the simulation itself never touches the filesystem.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::character::Profile;
use crate::error::DataError;
use crate::items::ItemDef;
use crate::map::tilemap::TileMapFile;
use crate::quest::QuestDef;
use crate::skill::SkillDef;

#[derive(Default)]
pub struct DefLibrary {
    characters: HashMap<String, Profile>,
    items: HashMap<String, ItemDef>,
    skills: HashMap<String, SkillDef>,
    quests: HashMap<String, QuestDef>,
    maps: HashMap<String, TileMapFile>,
}

impl DefLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_character(&mut self, key: &str, json: &str) -> Result<(), DataError> {
        let profile = Profile::from_json(key, json)?;
        self.characters.insert(key.to_string(), profile);
        Ok(())
    }

    pub fn register_item(&mut self, key: &str, json: &str) -> Result<(), DataError> {
        self.items.insert(key.to_string(), ItemDef::from_json(key, json)?);
        Ok(())
    }

    pub fn register_skill(&mut self, key: &str, json: &str) -> Result<(), DataError> {
        self.skills
            .insert(key.to_string(), SkillDef::from_json(key, json)?);
        Ok(())
    }

    pub fn register_quest(&mut self, key: &str, json: &str) -> Result<(), DataError> {
        self.quests
            .insert(key.to_string(), QuestDef::from_json(key, json)?);
        Ok(())
    }

    pub fn register_map(&mut self, key: &str, json: &str) -> Result<(), DataError> {
        self.maps
            .insert(key.to_string(), TileMapFile::from_json(key, json)?);
        Ok(())
    }

    /// Insert an already-built profile (tests).
    pub fn insert_character(&mut self, key: &str, profile: Profile) {
        self.characters.insert(key.to_string(), profile);
    }

    pub fn insert_item(&mut self, key: &str, def: ItemDef) {
        self.items.insert(key.to_string(), def);
    }

    pub fn insert_skill(&mut self, key: &str, def: SkillDef) {
        self.skills.insert(key.to_string(), def);
    }

    pub fn insert_quest(&mut self, key: &str, def: QuestDef) {
        self.quests.insert(key.to_string(), def);
    }

    pub fn insert_map(&mut self, key: &str, map: TileMapFile) {
        self.maps.insert(key.to_string(), map);
    }

    pub fn character(&self, key: &str) -> Result<&Profile, DataError> {
        self.characters
            .get(key)
            .ok_or_else(|| DataError::UnknownDefinition(key.to_string()))
    }

    pub fn item(&self, key: &str) -> Result<&ItemDef, DataError> {
        self.items
            .get(key)
            .ok_or_else(|| DataError::UnknownDefinition(key.to_string()))
    }

    pub fn skill(&self, key: &str) -> Result<&SkillDef, DataError> {
        self.skills
            .get(key)
            .ok_or_else(|| DataError::UnknownDefinition(key.to_string()))
    }

    pub fn quest(&self, key: &str) -> Result<&QuestDef, DataError> {
        self.quests
            .get(key)
            .ok_or_else(|| DataError::UnknownDefinition(key.to_string()))
    }

    pub fn map(&self, key: &str) -> Result<&TileMapFile, DataError> {
        self.maps
            .get(key)
            .ok_or_else(|| DataError::UnknownDefinition(key.to_string()))
    }

    /// Load every `.json` under `root`, registering each by its relative
    /// path. The top-level directory name picks the definition type
    /// (`char/`, `item/`, `skill/`, `quest/`, `maps/`).
    pub fn load_dir(&mut self, root: &Path) -> Result<usize> {
        let mut loaded = 0;
        for prefix in ["char", "item", "skill", "quest", "maps"] {
            let dir = root.join(prefix);
            if !dir.is_dir() {
                continue;
            }
            for entry in std::fs::read_dir(&dir)
                .with_context(|| format!("reading {}", dir.display()))?
            {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default();
                let key = format!("{prefix}/{stem}.json");
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                match prefix {
                    "char" => self.register_character(&key, &json)?,
                    "item" => self.register_item(&key, &json)?,
                    "skill" => self.register_skill(&key, &json)?,
                    "quest" => self.register_quest(&key, &json)?,
                    _ => self.register_map(&key, &json)?,
                }
                loaded += 1;
            }
        }
        info!("loaded {loaded} definitions from {}", root.display());
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_are_data_errors() {
        let lib = DefLibrary::new();
        assert!(matches!(
            lib.item("item/nope"),
            Err(DataError::UnknownDefinition(_))
        ));
    }

    #[test]
    fn register_and_fetch() {
        let mut lib = DefLibrary::new();
        lib.register_item(
            "item/bread",
            r#"{ "name": "Bread", "type": "consumable", "restore_health": 5 }"#,
        )
        .unwrap();
        assert_eq!(lib.item("item/bread").unwrap().name, "Bread");
    }
}
