//! Scene graph for Astrolabe.
//!
//! - [`graph`]: the [`SceneGraph`] arena, hierarchy and relative transforms
//! - [`node`]: [`Node`] and its declarative [`NodeDescription`]
//! - [`providers`]: translation, rotation and scale providers
//! - [`renderable`]: drawable attachments and render bins
//! - [`camera`]: [`Camera`], output surfaces and frustum culling
//! - [`loader`]: scene descriptions and [`SceneLoader`] implementations
//! - [`scene`]: [`Scene`], which owns the graph and its command queue

pub mod camera;
pub mod graph;
pub mod loader;
pub mod node;
pub mod providers;
pub mod renderable;
pub mod scene;
pub mod settings;

slotmap::new_key_type! {
    /// Stable handle to a node in a [`SceneGraph`].
    pub struct NodeHandle;
}

pub use camera::{Camera, CameraDescription, Frustum, OutputSurface};
pub use graph::SceneGraph;
pub use loader::{
    InMemoryLoader, JsonFileLoader, SceneDescription, SceneLoader, ScriptQueue,
    SynchronizationToggle,
};
pub use node::{Node, NodeDescription, PerformanceRecord, UpdateData};
pub use providers::{
    RotationDescription, RotationProvider, ScaleDescription, ScaleProvider,
    TranslationDescription, TranslationProvider,
};
pub use renderable::{RenderBin, RenderBinName, Renderable, RenderableDescription, RenderableKind};
pub use scene::{RenderItem, Scene, SceneCommand};
pub use settings::SceneSettings;
