//! Scene descriptions and where they come from.

use std::path::{Path, PathBuf};

use astrolabe_core::errors::{AstrolabeError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::camera::CameraDescription;
use crate::node::NodeDescription;

/// A complete scene: its nodes, an optional initial camera placement and
/// scripts to run once everything is initialized.
///
/// Nodes may be listed in any order; a node may name a parent declared
/// further down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    #[serde(default)]
    pub camera: Option<CameraDescription>,
    #[serde(default)]
    pub post_initialization_scripts: Vec<String>,
}

impl SceneDescription {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Resolves a scene name to its description.
pub trait SceneLoader {
    fn load(&self, name: &str) -> Result<SceneDescription>;
}

/// Reads `<root>/<name>` as JSON.
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    root: PathBuf,
}

impl JsonFileLoader {
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl SceneLoader for JsonFileLoader {
    fn load(&self, name: &str) -> Result<SceneDescription> {
        let path = self.root.join(name);
        log::debug!("Reading scene description {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        SceneDescription::from_json_str(&content)
    }
}

/// Serves descriptions registered up front; handy for tests and tools.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    scenes: FxHashMap<String, SceneDescription>,
}

impl InMemoryLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, scene: SceneDescription) {
        self.scenes.insert(name.into(), scene);
    }

    #[must_use]
    pub fn with_scene(mut self, name: impl Into<String>, scene: SceneDescription) -> Self {
        self.insert(name, scene);
        self
    }
}

impl SceneLoader for InMemoryLoader {
    fn load(&self, name: &str) -> Result<SceneDescription> {
        self.scenes.get(name).cloned().ok_or_else(|| AstrolabeError::SceneLoad {
            name: name.to_string(),
            reason: "no such scene registered".to_string(),
        })
    }
}

/// Window-level frame synchronization, paused while a scene loads.
pub trait SynchronizationToggle {
    fn set_synchronization(&self, enabled: bool);
}

/// Receives scripts a scene asks to run after loading.
pub trait ScriptQueue {
    fn queue_script(&self, script: &str);
}

/// Disables synchronization for its lifetime.
pub(crate) struct SynchronizationGuard<'a> {
    toggle: Option<&'a dyn SynchronizationToggle>,
}

impl<'a> SynchronizationGuard<'a> {
    pub(crate) fn new(toggle: Option<&'a dyn SynchronizationToggle>) -> Self {
        if let Some(toggle) = toggle {
            toggle.set_synchronization(false);
        }
        Self { toggle }
    }
}

impl Drop for SynchronizationGuard<'_> {
    fn drop(&mut self) {
        if let Some(toggle) = self.toggle {
            toggle.set_synchronization(true);
        }
    }
}
