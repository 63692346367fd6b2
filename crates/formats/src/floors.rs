use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const FLOOR_MANIFEST_VERSION: &str = "1.0";

/// `floors.json`: the building's floors and their model sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FloorManifest {
    #[serde(default = "default_version")]
    pub version: String,
    pub floors: Vec<FloorEntry>,
    /// Viewer settings overriding the defaults; interpreted by the viewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FloorEntry {
    pub id: String,
    pub name: String,
    /// Model path as authored; candidate URLs are derived from it at load time.
    #[serde(rename = "model")]
    pub model_src: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_sources: Vec<String>,
    /// Fixed room id -> model-space position table for this floor.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub positions: BTreeMap<String, [f64; 3]>,
}

fn default_version() -> String {
    FLOOR_MANIFEST_VERSION.to_string()
}

#[derive(Debug)]
pub enum ManifestError {
    Json(serde_json::Error),
    DuplicateFloor(String),
    EmptyModelSource(String),
    NonFinitePosition { floor: String, room: String },
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestError::Json(e) => write!(f, "floor manifest json: {e}"),
            ManifestError::DuplicateFloor(id) => write!(f, "duplicate floor id: {id}"),
            ManifestError::EmptyModelSource(id) => write!(f, "floor {id} has no model source"),
            ManifestError::NonFinitePosition { floor, room } => {
                write!(f, "floor {floor}: room {room} has a non-finite position")
            }
        }
    }
}

impl std::error::Error for ManifestError {}

impl FloorManifest {
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        let manifest: FloorManifest = serde_json::from_str(text).map_err(ManifestError::Json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut seen: Vec<String> = Vec::with_capacity(self.floors.len());
        for floor in &self.floors {
            let key = floor.id.to_ascii_lowercase();
            if seen.contains(&key) {
                return Err(ManifestError::DuplicateFloor(floor.id.clone()));
            }
            seen.push(key);

            if floor.model_src.trim().is_empty() {
                return Err(ManifestError::EmptyModelSource(floor.id.clone()));
            }
            if let Some((room, _)) = floor
                .positions
                .iter()
                .find(|(_, p)| p.iter().any(|v| !v.is_finite()))
            {
                return Err(ManifestError::NonFinitePosition {
                    floor: floor.id.clone(),
                    room: room.clone(),
                });
            }
        }
        Ok(())
    }

    /// Case-insensitive floor lookup.
    pub fn floor(&self, id: &str) -> Option<&FloorEntry> {
        self.floors.iter().find(|f| f.id.eq_ignore_ascii_case(id))
    }
}

impl FloorEntry {
    /// Case-insensitive lookup in the floor's position table.
    pub fn position_of(&self, room_id: &str) -> Option<[f64; 3]> {
        if let Some(p) = self.positions.get(room_id) {
            return Some(*p);
        }
        self.positions
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(room_id))
            .map(|(_, p)| *p)
    }
}
