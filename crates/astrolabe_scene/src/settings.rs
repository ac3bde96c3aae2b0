use serde::{Deserialize, Serialize};

use crate::graph::DEFAULT_ROOT_NAME;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub root_name: String,
    /// Time provider, renderable and render passes of every node.
    pub measure_performance: bool,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME.to_string(),
            measure_performance: false,
        }
    }
}
