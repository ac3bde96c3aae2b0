use std::time::{Duration, Instant};

use astrolabe_core::errors::{AstrolabeError, Result};
use astrolabe_core::transform::TransformData;
use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::NodeHandle;
use crate::providers::{
    RotationDescription, RotationProvider, ScaleDescription, ScaleProvider,
    TranslationDescription, TranslationProvider,
};
use crate::renderable::{Renderable, RenderableDescription};

/// Per-tick input handed to every provider and renderable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateData {
    /// Simulation time in seconds.
    pub time: f64,
    /// Derivative of simulation time this tick.
    pub rate: f64,
    /// Record per-node update durations in [`PerformanceRecord`].
    pub measure_performance: bool,
}

/// Durations of the last measured update and render of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerformanceRecord {
    pub update_translation: Duration,
    pub update_rotation: Duration,
    pub update_scale: Duration,
    pub update_renderable: Duration,
    pub render: Duration,
}

/// Declarative record a node is built from.
///
/// ```rust,ignore
/// let desc = NodeDescription::new("Earth")
///     .with_parent("Sun")
///     .with_translation(TranslationDescription::Static { position: [1.5e11, 0.0, 0.0] });
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub name: String,
    /// Defaults to the scene root.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub attachment_radius: f64,
    #[serde(default)]
    pub renderable: Option<RenderableDescription>,
    #[serde(default)]
    pub translation: Option<TranslationDescription>,
    #[serde(default)]
    pub rotation: Option<RotationDescription>,
    #[serde(default)]
    pub scale: Option<ScaleDescription>,
}

impl NodeDescription {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            attachment_radius: 0.0,
            renderable: None,
            translation: None,
            rotation: None,
            scale: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn with_attachment_radius(mut self, radius: f64) -> Self {
        self.attachment_radius = radius;
        self
    }

    #[must_use]
    pub fn with_renderable(mut self, renderable: RenderableDescription) -> Self {
        self.renderable = Some(renderable);
        self
    }

    #[must_use]
    pub fn with_translation(mut self, translation: TranslationDescription) -> Self {
        self.translation = Some(translation);
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: RotationDescription) -> Self {
        self.rotation = Some(rotation);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: ScaleDescription) -> Self {
        self.scale = Some(scale);
        self
    }
}

/// A scene graph node.
///
/// # Hierarchy
///
/// Parent and children are handles into the owning
/// [`SceneGraph`](crate::graph::SceneGraph), which is the only place that
/// links or unlinks them. `depth` is derived from the parent chain and
/// maintained by the graph (root = 0).
///
/// # Transform
///
/// The local transform is read from the three providers after each
/// [`update`](Self::update); nodes do not cache world matrices.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,

    // === Hierarchy ===
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: SmallVec<[NodeHandle; 4]>,
    pub(crate) depth: usize,

    // === Spatial ===
    translation: TranslationProvider,
    rotation: RotationProvider,
    scale: ScaleProvider,
    attachment_radius: f64,
    bounding_sphere: f64,

    renderable: Option<Renderable>,
    performance: PerformanceRecord,
}

impl Node {
    /// Creates a node with static identity providers and no renderable.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: SmallVec::new(),
            depth: 0,
            translation: TranslationProvider::default(),
            rotation: RotationProvider::default(),
            scale: ScaleProvider::default(),
            attachment_radius: 0.0,
            bounding_sphere: 0.0,
            renderable: None,
            performance: PerformanceRecord::default(),
        }
    }

    /// Builds a detached node. Nothing is registered anywhere, so a failure
    /// leaves no trace.
    pub fn from_description(desc: &NodeDescription) -> Result<Self> {
        if desc.name.is_empty() {
            return Err(AstrolabeError::InvalidDescription(
                "node name must not be empty".to_string(),
            ));
        }
        if !desc.attachment_radius.is_finite() || desc.attachment_radius < 0.0 {
            return Err(AstrolabeError::InvalidDescription(format!(
                "node '{}' has invalid attachment radius {}",
                desc.name, desc.attachment_radius
            )));
        }

        let construction = |reason: String| AstrolabeError::ProviderConstruction {
            node: desc.name.clone(),
            reason,
        };

        let mut node = Node::new(desc.name.clone());
        node.attachment_radius = desc.attachment_radius;

        if let Some(renderable) = &desc.renderable {
            node.renderable = Some(Renderable::from_description(renderable).map_err(construction)?);
        }
        if let Some(translation) = &desc.translation {
            node.translation =
                TranslationProvider::from_description(translation).map_err(construction)?;
        }
        if let Some(rotation) = &desc.rotation {
            node.rotation = RotationProvider::from_description(rotation).map_err(construction)?;
        }
        if let Some(scale) = &desc.scale {
            node.scale = ScaleProvider::from_description(scale).map_err(construction)?;
        }

        log::debug!("Created scene graph node '{}'", node.name);
        Ok(node)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Safe to call repeatedly.
    pub fn initialize(&mut self) {
        if let Some(renderable) = &mut self.renderable {
            renderable.initialize();
        }
        self.translation.initialize();
        self.rotation.initialize();
        self.scale.initialize();
    }

    /// Safe to call repeatedly and on nodes that were never initialized.
    pub fn deinitialize(&mut self) {
        log::debug!("Deinitialize: {}", self.name);
        if let Some(renderable) = &mut self.renderable {
            renderable.deinitialize();
        }
        self.translation.deinitialize();
        self.rotation.deinitialize();
        self.scale.deinitialize();
        self.bounding_sphere = 0.0;
    }

    /// Updates translation, rotation and scale in that order, then the
    /// renderable if it is ready.
    pub fn update(&mut self, data: &UpdateData) {
        let measure = data.measure_performance;
        let record = &mut self.performance;

        timed(measure, &mut record.update_translation, || self.translation.update(data));
        timed(measure, &mut record.update_rotation, || self.rotation.update(data));
        timed(measure, &mut record.update_scale, || self.scale.update(data));

        if let Some(renderable) = self.renderable.as_mut().filter(|r| r.is_ready()) {
            timed(measure, &mut record.update_renderable, || renderable.update(data));
        }
    }

    pub(crate) fn record_render_time(&mut self, duration: Duration) {
        self.performance.render = duration;
    }

    /// Radius of the node's own renderable; children are not merged in.
    pub fn calculate_bounding_sphere(&mut self) -> f64 {
        self.bounding_sphere = self
            .renderable
            .as_ref()
            .map_or(0.0, Renderable::bounding_sphere);
        self.bounding_sphere
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent node handle (`None` only for the root).
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    #[must_use]
    pub fn translation(&self) -> DVec3 {
        self.translation.position()
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> DMat3 {
        self.rotation.matrix()
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale.scale()
    }

    /// The transform from this node's frame into its parent's frame.
    #[inline]
    #[must_use]
    pub fn local_transform(&self) -> TransformData {
        TransformData::new(self.translation(), self.rotation(), self.scale())
    }

    pub fn set_translation(&mut self, provider: TranslationProvider) {
        self.translation = provider;
    }

    pub fn set_rotation(&mut self, provider: RotationProvider) {
        self.rotation = provider;
    }

    pub fn set_scale(&mut self, provider: ScaleProvider) {
        self.scale = provider;
    }

    #[must_use]
    pub fn translation_provider(&self) -> &TranslationProvider {
        &self.translation
    }

    #[must_use]
    pub fn rotation_provider(&self) -> &RotationProvider {
        &self.rotation
    }

    #[must_use]
    pub fn scale_provider(&self) -> &ScaleProvider {
        &self.scale
    }

    #[must_use]
    pub fn renderable(&self) -> Option<&Renderable> {
        self.renderable.as_ref()
    }

    pub fn renderable_mut(&mut self) -> Option<&mut Renderable> {
        self.renderable.as_mut()
    }

    pub fn set_renderable(&mut self, renderable: Option<Renderable>) {
        self.renderable = renderable;
    }

    /// Radius within which a camera counts as being inside this node.
    #[inline]
    #[must_use]
    pub fn attachment_radius(&self) -> f64 {
        self.attachment_radius
    }

    pub fn set_attachment_radius(&mut self, radius: f64) {
        self.attachment_radius = radius;
    }

    /// Cached result of the last [`calculate_bounding_sphere`](Self::calculate_bounding_sphere).
    #[inline]
    #[must_use]
    pub fn bounding_sphere(&self) -> f64 {
        self.bounding_sphere
    }

    #[must_use]
    pub fn performance_record(&self) -> &PerformanceRecord {
        &self.performance
    }
}

fn timed(measure: bool, slot: &mut Duration, f: impl FnOnce()) {
    if measure {
        let start = Instant::now();
        f();
        *slot = start.elapsed();
    } else {
        f();
    }
}
