//! Engine Core Module
//!
//! This module contains [`Engine`], the per-process coordinator of simulation
//! time, the scene graph and the active camera. It owns no window and no GPU
//! context, so it can be driven by a cluster node, a headless tool or a test
//! in exactly the same way.
//!
//! # Frame phases
//!
//! Each frame is split into phases that must not interleave:
//!
//! 1. [`Engine::tick`]: the time manager consumes its timeline, then queued
//!    scene commands run, then every node updates against the new time.
//! 2. [`Engine::sync_frame`] (leader) or [`Engine::apply_sync_frame`]
//!    (followers): the cluster payload is captured or applied.
//! 3. [`Engine::render`]: draw lists are produced for each output.
//!
//! # Example
//!
//! ```rust,ignore
//! use astrolabe::{Engine, EngineSettings, JsonFileLoader, ManualClock};
//!
//! let clock = ManualClock::new(0.0);
//! let mut engine = Engine::new(
//!     &EngineSettings::default(),
//!     Box::new(JsonFileLoader::new("scenes")),
//!     Box::new(clock.clone()),
//! );
//! engine.scene.schedule_load("solar.json");
//!
//! loop {
//!     clock.advance(dt);
//!     engine.tick(clock.application_time(), dt)?;
//!     let items = engine.render(0);
//! }
//! ```

use astrolabe_core::clock::ApplicationClock;
use astrolabe_core::errors::Result;
use astrolabe_core::sync::{SyncFrame, Syncable};
use astrolabe_scene::{Camera, RenderBin, RenderItem, Scene, SceneLoader, UpdateData};
use astrolabe_time::TimeManager;

use crate::settings::EngineSettings;

/// The engine instance of one process.
///
/// # Components
///
/// - `time`: the authoritative simulation clock
/// - `scene`: the scene graph and its command queue
/// - `camera`: the active viewpoint, initially at the scene root
pub struct Engine {
    pub time: TimeManager,
    pub scene: Scene,
    pub camera: Camera,

    frame_count: u64,
}

impl Engine {
    #[must_use]
    pub fn new(
        settings: &EngineSettings,
        loader: Box<dyn SceneLoader>,
        clock: Box<dyn ApplicationClock>,
    ) -> Self {
        let scene = Scene::new(settings.scene.clone(), loader);
        let camera = Camera::new(scene.root());
        Self {
            time: TimeManager::new(&settings.time, clock),
            scene,
            camera,
            frame_count: 0,
        }
    }

    /// Number of completed [`tick`](Self::tick) calls.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Advances the engine to application time `now`.
    ///
    /// The scene is updated even when the time tick fails, using the time
    /// the manager kept. A freshly loaded scene moves the camera to its
    /// initial placement; a camera whose parent node is gone falls back to
    /// the root. The first error of the frame is returned.
    pub fn tick(&mut self, now: f64, dt: f64) -> Result<()> {
        self.frame_count += 1;

        let time_result = self.time.tick(now, dt);

        let data = UpdateData {
            time: self.time.time(),
            rate: self.time.effective_rate(),
            measure_performance: self.scene.settings().measure_performance,
        };
        let scene_result = self.scene.update(&data);

        // a reload or removal may have freed the camera's parent
        if !self.scene.graph().contains(self.camera.parent()) {
            log::warn!("Camera parent left the scene, moving the camera to the root");
            self.camera.set_parent(self.scene.root());
        }

        if let Some(desc) = self.scene.take_pending_camera() {
            match self.camera.apply_description(self.scene.graph(), &desc) {
                Ok(()) => log::debug!("Camera attached to '{}'", desc.parent),
                Err(err) => log::warn!("Ignoring initial camera: {err}"),
            }
        }

        time_result.and(scene_result)
    }

    /// Draw list for `output` across every render bin.
    pub fn render(&mut self, output: usize) -> Vec<RenderItem> {
        self.render_bins(output, RenderBin::all())
    }

    pub fn render_bins(&mut self, output: usize, bins: RenderBin) -> Vec<RenderItem> {
        self.scene.render(&self.camera, output, bins)
    }

    /// Captures the state followers need to render this frame.
    #[must_use]
    pub fn sync_frame(&self) -> SyncFrame {
        SyncFrame::new(self.time.snapshot(), vec![self.camera.snapshot()])
    }

    /// Decodes a leader's payload and applies it verbatim.
    pub fn apply_sync_frame(&mut self, bytes: &[u8]) -> Result<()> {
        let frame = SyncFrame::decode(bytes)?;
        self.time.apply_snapshot(&frame.time);
        if let Some(camera) = frame.entities.first() {
            self.camera.apply_snapshot(camera);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("time", &self.time)
            .field("scene", &self.scene)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}
