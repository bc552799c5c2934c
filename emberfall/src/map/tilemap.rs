//! Tile-map files: named object layers consumed by `GameMap`.
//!
//! Maps are authored as JSON documents with a flat list of object layers.
//! Geometry layers (`Ground`, `Wall`, `Platform`) become static collision
//! bodies; entity layers (`Portal`, `Trigger`, `Npcs`, `Chest`, `Player`,
//! `CliffMarker`) drive actor spawning.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DataError;
use crate::math::Rect;

pub const LAYER_GROUND: &str = "Ground";
pub const LAYER_WALL: &str = "Wall";
pub const LAYER_PLATFORM: &str = "Platform";
pub const LAYER_PORTAL: &str = "Portal";
pub const LAYER_TRIGGER: &str = "Trigger";
pub const LAYER_NPCS: &str = "Npcs";
pub const LAYER_CHEST: &str = "Chest";
pub const LAYER_PLAYER: &str = "Player";
pub const LAYER_CLIFF_MARKER: &str = "CliffMarker";

/// One authored map object: a rectangle plus free-form properties.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MapObject {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl MapObject {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn center(&self) -> Vec2 {
        self.rect().center()
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn prop_bool(&self, key: &str) -> bool {
        self.properties
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn prop_u32(&self, key: &str) -> Option<u32> {
        self.properties
            .get(key)
            .and_then(Value::as_u64)
            .map(|v| v as u32)
    }

    /// Required string property, with a proper error naming the object.
    pub fn require_str(&self, map: &str, key: &str) -> Result<&str, DataError> {
        self.prop_str(key).ok_or_else(|| DataError::MissingProperty {
            path: map.to_string(),
            object_id: self.id,
            property: key.to_string(),
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObjectLayer {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<MapObject>,
}

/// A whole map file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileMapFile {
    /// World size in pixels.
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub layers: Vec<ObjectLayer>,
}

impl TileMapFile {
    pub fn from_json(key: &str, json: &str) -> Result<Self, DataError> {
        serde_json::from_str(json).map_err(|e| DataError::Malformed {
            path: key.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn layer(&self, name: &str) -> Option<&ObjectLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Objects of a layer, or an empty slice for maps without that layer.
    pub fn objects(&self, name: &str) -> &[MapObject] {
        self.layer(name).map(|l| l.objects.as_slice()).unwrap_or(&[])
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layers_and_properties() {
        let map = TileMapFile::from_json(
            "maps/test.json",
            r#"{
                "width": 1600, "height": 900,
                "layers": [
                    { "name": "Ground", "objects": [
                        { "id": 1, "x": 0, "y": 860, "width": 1600, "height": 40 }
                    ]},
                    { "name": "Portal", "objects": [
                        { "id": 7, "x": 100, "y": 700, "width": 64, "height": 128,
                          "properties": { "targetMap": "maps/cave.json", "targetPortalId": 2, "isLocked": true } }
                    ]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(map.objects(LAYER_GROUND).len(), 1);
        assert!(map.layer("Npcs").is_none());
        assert!(map.objects("Npcs").is_empty());

        let portal = &map.objects(LAYER_PORTAL)[0];
        assert_eq!(portal.prop_str("targetMap"), Some("maps/cave.json"));
        assert_eq!(portal.prop_u32("targetPortalId"), Some(2));
        assert!(portal.prop_bool("isLocked"));
        assert!(!portal.prop_bool("shouldAdjustOffsetX"));
        assert!(portal.require_str("maps/test.json", "nope").is_err());
    }
}
