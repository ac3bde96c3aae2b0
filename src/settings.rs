//! Engine Settings
//!
//! [`EngineSettings`] aggregates the per-subsystem settings so a whole
//! configuration can live in one JSON document. Every field is optional in
//! the document; missing values fall back to their defaults.
//!
//! ```json
//! {
//!     "time": { "initial_rate": 3600.0, "default_interpolation_duration": 0.5 },
//!     "scene": { "measure_performance": true }
//! }
//! ```

use std::path::Path;

use astrolabe_core::errors::Result;
use astrolabe_scene::SceneSettings;
use astrolabe_time::TimeSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub time: TimeSettings,
    pub scene: SceneSettings,
}

impl EngineSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading engine settings from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
