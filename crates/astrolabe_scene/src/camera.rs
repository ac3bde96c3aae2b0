use std::cell::Cell;

use astrolabe_core::sync::{EntitySnapshot, Syncable};
use glam::{DMat4, DQuat, DVec3, DVec4};
use serde::{Deserialize, Serialize};

use crate::NodeHandle;
use crate::graph::SceneGraph;

/// Camera placement record stored with a scene description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDescription {
    /// Name of the node the camera is attached to.
    pub parent: String,
    #[serde(default)]
    pub position: [f64; 3],
    /// `[x, y, z, w]`
    #[serde(default = "identity_quaternion")]
    pub rotation: [f64; 4],
}

fn identity_quaternion() -> [f64; 4] {
    DQuat::IDENTITY.to_array()
}

/// View and projection supplied by the windowing layer for one viewport.
#[derive(Debug, Clone)]
pub struct OutputSurface {
    view: DMat4,
    projection: DMat4,
}

impl OutputSurface {
    #[must_use]
    pub fn new(view: DMat4, projection: DMat4) -> Self {
        Self { view, projection }
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> DMat4 {
        self.view
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> DMat4 {
        self.projection
    }
}

/// A viewpoint attached to a scene graph node.
///
/// The camera stores an offset (position and rotation) in its parent node's
/// frame; the parent is a handle, not an owner. Matrices for a target node
/// are composed from the relative transform between target and parent.
#[derive(Debug, Clone)]
pub struct Camera {
    parent: NodeHandle,
    position: DVec3,
    rotation: DQuat,
    outputs: Vec<OutputSurface>,

    // reset whenever position or rotation change
    camera_from_parent: Cell<Option<DMat4>>,
}

impl Camera {
    /// Creates a camera at `parent`'s origin with a single identity output.
    #[must_use]
    pub fn new(parent: NodeHandle) -> Self {
        Self {
            parent,
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            outputs: vec![OutputSurface::new(DMat4::IDENTITY, DMat4::IDENTITY)],
            camera_from_parent: Cell::new(None),
        }
    }

    /// Places the camera according to `desc`, resolving the parent by name.
    pub fn apply_description(
        &mut self,
        graph: &SceneGraph,
        desc: &CameraDescription,
    ) -> astrolabe_core::errors::Result<()> {
        let parent = graph.handle(&desc.parent)?;
        self.set_parent(parent);
        self.set_position(DVec3::from_array(desc.position));
        self.set_rotation(DQuat::from_array(desc.rotation).normalize());
        Ok(())
    }

    // === Mutators ===

    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
        self.invalidate_cache();
    }

    pub fn set_rotation(&mut self, rotation: DQuat) {
        self.rotation = rotation;
        self.invalidate_cache();
    }

    /// Applies `rotation` on top of the current orientation.
    pub fn rotate(&mut self, rotation: DQuat) {
        self.rotation = rotation * self.rotation;
        self.invalidate_cache();
    }

    pub fn set_parent(&mut self, parent: NodeHandle) {
        self.parent = parent;
    }

    pub fn invalidate_cache(&self) {
        self.camera_from_parent.set(None);
    }

    // === Output surfaces ===

    /// Adds a viewport; returns its index.
    pub fn add_output(&mut self, output: OutputSurface) -> usize {
        self.outputs.push(output);
        self.outputs.len() - 1
    }

    #[must_use]
    pub fn output(&self, index: usize) -> Option<&OutputSurface> {
        self.outputs.get(index)
    }

    pub fn set_output(&mut self, index: usize, output: OutputSurface) -> bool {
        match self.outputs.get_mut(index) {
            Some(slot) => {
                *slot = output;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    // === Accessors ===

    #[inline]
    #[must_use]
    pub fn parent(&self) -> NodeHandle {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> DVec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn rotation(&self) -> DQuat {
        self.rotation
    }

    /// Maps the parent node's frame into camera space.
    #[must_use]
    pub fn camera_from_parent(&self) -> DMat4 {
        if let Some(m) = self.camera_from_parent.get() {
            return m;
        }
        let m =
            DMat4::from_quat(self.rotation.inverse()) * DMat4::from_translation(-self.position);
        self.camera_from_parent.set(Some(m));
        m
    }

    /// `output view * camera-from-parent * (target -> parent)`.
    ///
    /// `None` if `output` does not exist.
    #[must_use]
    pub fn view_matrix(
        &self,
        graph: &SceneGraph,
        target: NodeHandle,
        output: usize,
    ) -> Option<DMat4> {
        let surface = self.outputs.get(output)?;
        let target_to_parent = graph.relative_transform(target, self.parent).to_mat4();
        Some(surface.view * self.camera_from_parent() * target_to_parent)
    }

    #[must_use]
    pub fn view_projection_matrix(
        &self,
        graph: &SceneGraph,
        target: NodeHandle,
        output: usize,
    ) -> Option<DMat4> {
        let surface = self.outputs.get(output)?;
        Some(surface.projection * self.view_matrix(graph, target, output)?)
    }

    /// Frustum in `target`'s local frame.
    #[must_use]
    pub fn frustum(
        &self,
        graph: &SceneGraph,
        target: NodeHandle,
        output: usize,
    ) -> Option<Frustum> {
        self.view_projection_matrix(graph, target, output)
            .map(Frustum::from_matrix)
    }

    /// Camera position in the root frame.
    #[must_use]
    pub fn world_position(&self, graph: &SceneGraph) -> DVec3 {
        graph.world_transform(self.parent).transform_point(self.position)
    }
}

impl Syncable for Camera {
    type Snapshot = EntitySnapshot;

    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot::new(self.position, self.rotation)
    }

    fn apply_snapshot(&mut self, snapshot: &EntitySnapshot) {
        self.position = snapshot.position();
        self.rotation = snapshot.rotation();
        self.invalidate_cache();
    }
}

/// Six clip planes, `ax + by + cz + d >= 0` inside.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [DVec4; 6], // Left, Right, Bottom, Top, Near, Far
}

impl Frustum {
    /// Gribb-Hartmann extraction for a `[0, 1]` depth range projection.
    #[must_use]
    pub fn from_matrix(m: DMat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0], // Left
            rows[3] - rows[0], // Right
            rows[3] + rows[1], // Bottom
            rows[3] - rows[1], // Top
            rows[2],           // Near
            rows[3] - rows[2], // Far
        ];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > 0.0 {
                *plane /= length;
            }
        }

        Self { planes }
    }

    #[must_use]
    pub fn intersects_sphere(&self, center: DVec3, radius: f64) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }
}
