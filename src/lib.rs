#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod engine;
pub mod settings;

pub use engine::Engine;
pub use settings::EngineSettings;

pub use astrolabe_core::{
    ApplicationClock, AstrolabeError, EntitySnapshot, ManualClock, Result, SyncFrame, Syncable,
    TimeSnapshot, TransformData,
};
pub use astrolabe_scene::providers::{PositionSample, ScaleSample};
pub use astrolabe_scene::{
    Camera, CameraDescription, Frustum, InMemoryLoader, JsonFileLoader, Node, NodeDescription,
    NodeHandle, OutputSurface, PerformanceRecord, RenderBin, RenderItem, Renderable,
    RenderableDescription, RenderableKind, RotationDescription, ScaleDescription, Scene,
    SceneDescription, SceneGraph, SceneLoader, SceneSettings, ScriptQueue, SynchronizationToggle,
    TranslationDescription, UpdateData,
};
pub use astrolabe_time::{
    CallbackHandle, InterpolatedTime, Keyframe, TimeKeyframeData, TimeManager, TimeSettings,
    Timeline, interpolate,
};
