use std::collections::VecDeque;
use std::time::Instant;

use astrolabe_core::errors::{AstrolabeError, Result};
use astrolabe_core::transform::TransformData;
use glam::{DMat4, DVec3};

use crate::NodeHandle;
use crate::camera::{Camera, CameraDescription, Frustum};
use crate::graph::SceneGraph;
use crate::loader::{
    SceneDescription, SceneLoader, ScriptQueue, SynchronizationGuard, SynchronizationToggle,
};
use crate::node::{Node, NodeDescription, UpdateData};
use crate::renderable::RenderBin;
use crate::settings::SceneSettings;

/// Structural change requested between frames.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCommand {
    /// Replace the whole graph with the named scene.
    Load(String),
    AddNode(NodeDescription),
    RemoveNode(String),
}

/// One draw produced by [`Scene::render`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    pub node: NodeHandle,
    pub model_view: DMat4,
    pub model_view_projection: DMat4,
}

/// Owns the scene graph and applies structural changes at a single point
/// per tick.
///
/// Loads, additions and removals are queued and consumed in order at the
/// start of [`update`](Self::update), so a request made mid-frame never
/// interleaves with traversal or rendering.
pub struct Scene {
    graph: SceneGraph,
    commands: VecDeque<SceneCommand>,
    settings: SceneSettings,

    loader: Box<dyn SceneLoader>,
    synchronization: Option<Box<dyn SynchronizationToggle>>,
    scripts: Option<Box<dyn ScriptQueue>>,

    current_scene: Option<String>,
    initial_camera: Option<CameraDescription>,
    camera_pending: bool,
}

impl Scene {
    #[must_use]
    pub fn new(settings: SceneSettings, loader: Box<dyn SceneLoader>) -> Self {
        Self {
            graph: SceneGraph::new(&settings.root_name),
            commands: VecDeque::new(),
            settings,
            loader,
            synchronization: None,
            scripts: None,
            current_scene: None,
            initial_camera: None,
            camera_pending: false,
        }
    }

    #[must_use]
    pub fn with_synchronization(mut self, toggle: Box<dyn SynchronizationToggle>) -> Self {
        self.synchronization = Some(toggle);
        self
    }

    #[must_use]
    pub fn with_script_queue(mut self, scripts: Box<dyn ScriptQueue>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    // ========================================================================
    // Command queue
    // ========================================================================

    pub fn schedule_load(&mut self, name: impl Into<String>) {
        self.commands.push_back(SceneCommand::Load(name.into()));
    }

    pub fn schedule_add_node(&mut self, desc: NodeDescription) {
        self.commands.push_back(SceneCommand::AddNode(desc));
    }

    pub fn schedule_remove_node(&mut self, name: impl Into<String>) {
        self.commands.push_back(SceneCommand::RemoveNode(name.into()));
    }

    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    // ========================================================================
    // Per-tick update
    // ========================================================================

    /// Applies queued commands, then updates every node in tree order.
    ///
    /// A failed command is logged and does not stop the rest of the queue or
    /// the node update; the first failure is returned. A failed load leaves
    /// a root-only graph.
    pub fn update(&mut self, data: &UpdateData) -> Result<()> {
        let mut first_error = None;
        while let Some(command) = self.commands.pop_front() {
            let result = match command {
                SceneCommand::Load(name) => self.load_scene(&name),
                SceneCommand::AddNode(desc) => self.add_initialized_node(&desc).map(|_| ()),
                SceneCommand::RemoveNode(name) => self.graph.remove_node(&name),
            };
            if let Err(err) = result {
                log::error!("{err}");
                first_error.get_or_insert(err);
            }
        }

        self.graph.update(data);

        first_error.map_or(Ok(()), Err)
    }

    fn add_initialized_node(&mut self, desc: &NodeDescription) -> Result<NodeHandle> {
        let handle = self.graph.add_node(desc)?;
        if let Some(node) = self.graph.get_mut(handle) {
            node.initialize();
            node.calculate_bounding_sphere();
        }
        Ok(handle)
    }

    fn load_scene(&mut self, name: &str) -> Result<()> {
        self.graph.clear();
        self.initial_camera = None;
        self.camera_pending = false;
        self.current_scene = None;

        let _guard = SynchronizationGuard::new(self.synchronization.as_deref());

        match populate(&mut self.graph, self.loader.as_ref(), name) {
            Ok(description) => {
                if let Some(scripts) = &self.scripts {
                    for script in &description.post_initialization_scripts {
                        scripts.queue_script(script);
                    }
                }
                self.camera_pending = description.camera.is_some();
                self.initial_camera = description.camera;
                self.current_scene = Some(name.to_string());
                log::info!("Loaded {name}");
                Ok(())
            }
            Err(err) => {
                self.graph.clear();
                Err(match err {
                    err @ AstrolabeError::SceneLoad { .. } => err,
                    other => AstrolabeError::SceneLoad {
                        name: name.to_string(),
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Collects every visible, ready, enabled renderable in `bins` whose
    /// bounding sphere intersects the camera frustum of `output`.
    pub fn render(&mut self, camera: &Camera, output: usize, bins: RenderBin) -> Vec<RenderItem> {
        if !self.graph.contains(camera.parent()) {
            log::warn!("Camera parent {:?} is not part of the scene", camera.parent());
            return Vec::new();
        }
        let Some(surface) = camera.output(output) else {
            log::warn!("Camera has no output surface {output}");
            return Vec::new();
        };
        let projection = surface.projection_matrix();
        let measure = self.settings.measure_performance;

        let mut items = Vec::new();
        for handle in self.graph.nodes() {
            let Some(node) = self.graph.get(handle) else {
                continue;
            };
            let visible = node.renderable().is_some_and(|r| {
                r.visible && r.is_ready() && r.enabled && r.matches_bin_mask(bins)
            });
            if !visible {
                continue;
            }

            let start = measure.then(Instant::now);
            let radius = node.bounding_sphere();
            let Some(model_view) = camera.view_matrix(&self.graph, handle, output) else {
                continue;
            };
            let model_view_projection = projection * model_view;
            if Frustum::from_matrix(model_view_projection).intersects_sphere(DVec3::ZERO, radius) {
                items.push(RenderItem {
                    node: handle,
                    model_view,
                    model_view_projection,
                });
            }

            if let Some(start) = start
                && let Some(node) = self.graph.get_mut(handle)
            {
                node.record_render_time(start.elapsed());
            }
        }
        items
    }

    /// Finds the deepest node whose attachment radius contains the camera.
    ///
    /// Starting at `start`, climbs while the camera is outside the current
    /// node, then descends into the first child that contains it. `None` if
    /// `start` or the camera parent is not in the graph.
    #[must_use]
    pub fn innermost_containing_node(
        &self,
        camera: &Camera,
        start: NodeHandle,
    ) -> Option<NodeHandle> {
        if !self.graph.contains(start) || !self.graph.contains(camera.parent()) {
            return None;
        }
        let eye = camera.world_position(&self.graph);
        let contains = |handle: NodeHandle| {
            self.graph.get(handle).is_some_and(|node| {
                self.graph.world_position(handle).distance(eye) < node.attachment_radius()
            })
        };

        let mut current = start;
        while !contains(current)
            && let Some(parent) = self.graph.get(current).and_then(Node::parent)
        {
            current = parent;
        }

        while let Some(child) = self.graph.get(current).and_then(|node| {
            node.children().iter().copied().find(|&child| contains(child))
        }) {
            current = child;
        }
        Some(current)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    #[inline]
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.graph.root()
    }

    /// Exact-match lookup; a miss is `None`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<NodeHandle> {
        self.graph.find(name)
    }

    #[must_use]
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.graph.find(name).and_then(|h| self.graph.get(h))
    }

    /// Every node in depth-first order.
    #[must_use]
    pub fn all_nodes(&self) -> Vec<NodeHandle> {
        self.graph.nodes()
    }

    /// Relative transform between two named nodes.
    pub fn relative_transform(&self, from: &str, to: &str) -> Result<TransformData> {
        let from = self.graph.handle(from)?;
        let to = self.graph.handle(to)?;
        Ok(self.graph.relative_transform(from, to))
    }

    /// Name of the last successfully loaded scene.
    #[must_use]
    pub fn current_scene(&self) -> Option<&str> {
        self.current_scene.as_deref()
    }

    /// Camera record of the loaded scene description, if it had one.
    #[must_use]
    pub fn initial_camera(&self) -> Option<&CameraDescription> {
        self.initial_camera.as_ref()
    }

    /// Returns the initial camera once after each successful load.
    pub fn take_pending_camera(&mut self) -> Option<CameraDescription> {
        if std::mem::take(&mut self.camera_pending) {
            self.initial_camera.clone()
        } else {
            None
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("graph", &self.graph)
            .field("commands", &self.commands)
            .field("current_scene", &self.current_scene)
            .finish_non_exhaustive()
    }
}

/// Builds the described scene into an empty graph.
fn populate(
    graph: &mut SceneGraph,
    loader: &dyn SceneLoader,
    name: &str,
) -> Result<SceneDescription> {
    let description = loader.load(name)?;
    add_in_dependency_order(graph, &description.nodes)?;

    graph.initialize_all();
    graph.calculate_bounding_spheres();

    if let Some(camera) = &description.camera {
        graph.handle(&camera.parent)?;
    }
    Ok(description)
}

/// Adds nodes whose parent already exists, repeating until all are placed.
fn add_in_dependency_order(graph: &mut SceneGraph, nodes: &[NodeDescription]) -> Result<()> {
    let mut pending: Vec<&NodeDescription> = nodes.iter().collect();
    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();
        for desc in pending {
            let ready = desc
                .parent
                .as_deref()
                .is_none_or(|parent| graph.find(parent).is_some());
            if ready {
                graph.add_node(desc)?;
            } else {
                deferred.push(desc);
            }
        }
        if deferred.len() == before {
            return Err(unresolved_parents(&deferred));
        }
        pending = deferred;
    }
    Ok(())
}

/// Explains why none of `deferred` could be placed: either a parent that no
/// description declares, or a loop of parent references.
fn unresolved_parents(deferred: &[&NodeDescription]) -> AstrolabeError {
    fn parent_name(desc: &NodeDescription) -> &str {
        desc.parent.as_deref().unwrap_or_default()
    }
    let waiting = |name: &str| deferred.iter().copied().find(|d| d.name == name);

    if let Some(desc) = deferred.iter().find(|d| waiting(parent_name(d)).is_none()) {
        return AstrolabeError::MissingParent {
            node: desc.name.clone(),
            parent: parent_name(desc).to_string(),
        };
    }

    // every parent is itself waiting, so following the chain must revisit a node
    let mut chain: Vec<&str> = Vec::new();
    let mut current = deferred[0];
    while !chain.contains(&current.name.as_str()) {
        chain.push(&current.name);
        match waiting(parent_name(current)) {
            Some(next) => current = next,
            None => break,
        }
    }
    let start = chain.iter().position(|n| *n == current.name).unwrap_or(0);
    AstrolabeError::ParentCycle(chain[start..].iter().map(|n| (*n).to_string()).collect())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::f64::consts::FRAC_PI_2;
    use std::rc::Rc;

    use super::*;
    use crate::camera::OutputSurface;
    use crate::loader::InMemoryLoader;
    use crate::providers::TranslationDescription;
    use crate::renderable::{RenderableDescription, RenderableKind};

    fn at(name: &str, parent: &str, position: [f64; 3]) -> NodeDescription {
        NodeDescription::new(name)
            .with_parent(parent)
            .with_translation(TranslationDescription::Static { position })
    }

    fn sphere(radius: f64) -> RenderableDescription {
        RenderableDescription::new(RenderableKind::Sphere { radius })
    }

    fn solar_system() -> SceneDescription {
        SceneDescription {
            // Moon listed before its parent on purpose
            nodes: vec![
                at("Moon", "Earth", [2.0, 0.0, 0.0]).with_attachment_radius(0.5),
                at("Earth", "Sun", [50.0, 0.0, 0.0]).with_attachment_radius(5.0),
                at("Sun", "Root", [0.0, 0.0, 0.0]).with_attachment_radius(100.0),
            ],
            camera: Some(CameraDescription {
                parent: "Earth".to_string(),
                position: [0.0, 0.0, 10.0],
                rotation: [0.0, 0.0, 0.0, 1.0],
            }),
            post_initialization_scripts: vec!["log('solar system ready')".to_string()],
        }
    }

    fn perspective_camera(parent: NodeHandle) -> Camera {
        let mut camera = Camera::new(parent);
        let projection = DMat4::perspective_rh(FRAC_PI_2, 1.0, 0.1, 100.0);
        camera.set_output(0, OutputSurface::new(DMat4::IDENTITY, projection));
        camera
    }

    fn scene_with(name: &str, description: SceneDescription) -> Scene {
        let loader = InMemoryLoader::new().with_scene(name, description);
        Scene::new(SceneSettings::default(), Box::new(loader))
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl SynchronizationToggle for Recorder {
        fn set_synchronization(&self, enabled: bool) {
            self.0.borrow_mut().push(format!("sync:{enabled}"));
        }
    }

    impl ScriptQueue for Recorder {
        fn queue_script(&self, script: &str) {
            self.0.borrow_mut().push(format!("script:{script}"));
        }
    }

    #[test]
    fn load_resolves_parents_declared_later() {
        let mut scene = scene_with("solar", solar_system());
        scene.schedule_load("solar");
        assert_eq!(scene.graph().len(), 1);

        scene.update(&UpdateData::default()).unwrap();

        assert_eq!(scene.graph().len(), 4);
        assert_eq!(scene.current_scene(), Some("solar"));
        let moon = scene.node("Moon").unwrap();
        assert_eq!(moon.depth(), 3);
        let world = scene.relative_transform("Moon", "Root").unwrap();
        assert!(world.translation.abs_diff_eq(DVec3::new(52.0, 0.0, 0.0), 1e-12));
    }

    #[test]
    fn load_with_missing_parent_resets_to_root() {
        let mut description = solar_system();
        description.nodes.push(at("Pluto", "Nowhere", [1.0, 0.0, 0.0]));
        let mut scene = scene_with("broken", description);
        scene.schedule_load("broken");

        let err = scene.update(&UpdateData::default()).unwrap_err();
        assert!(matches!(err, AstrolabeError::SceneLoad { .. }));
        assert_eq!(scene.graph().len(), 1);
        assert!(scene.find("Sun").is_none());
        assert!(scene.current_scene().is_none());
        assert!(scene.take_pending_camera().is_none());
    }

    #[test]
    fn parent_cycle_is_reported_as_such() {
        let nodes = vec![
            at("Tail", "A", [0.0; 3]),
            at("A", "B", [0.0; 3]),
            at("B", "A", [0.0; 3]),
            at("Sun", "Root", [0.0; 3]),
        ];
        let mut graph = SceneGraph::default();
        let err = add_in_dependency_order(&mut graph, &nodes).unwrap_err();
        assert!(matches!(&err, AstrolabeError::ParentCycle(names) if names == &["A", "B"]));

        let description = SceneDescription {
            nodes,
            ..SceneDescription::default()
        };
        let mut scene = scene_with("loop", description);
        scene.schedule_load("loop");
        let err = scene.update(&UpdateData::default()).unwrap_err();
        let AstrolabeError::SceneLoad { reason, .. } = err else {
            panic!("expected a load error");
        };
        assert!(reason.contains("cycle"), "{reason}");
        assert_eq!(scene.graph().len(), 1);
    }

    #[test]
    fn missing_parent_wins_over_cycle() {
        let nodes = vec![
            at("A", "B", [0.0; 3]),
            at("B", "A", [0.0; 3]),
            at("Pluto", "Nowhere", [0.0; 3]),
        ];
        let err = add_in_dependency_order(&mut SceneGraph::default(), &nodes).unwrap_err();
        assert!(matches!(err, AstrolabeError::MissingParent { node, .. } if node == "Pluto"));
    }

    #[test]
    fn unknown_scene_reports_load_error() {
        let mut scene = scene_with("solar", solar_system());
        scene.schedule_load("missing");
        let err = scene.update(&UpdateData::default()).unwrap_err();
        assert!(matches!(err, AstrolabeError::SceneLoad { name, .. } if name == "missing"));
    }

    #[test]
    fn synchronization_is_off_while_loading_and_scripts_are_queued() {
        let recorder = Recorder::default();
        let mut scene = scene_with("solar", solar_system())
            .with_synchronization(Box::new(recorder.clone()))
            .with_script_queue(Box::new(recorder.clone()));
        scene.schedule_load("solar");
        scene.update(&UpdateData::default()).unwrap();

        assert_eq!(*recorder.0.borrow(), vec![
            "sync:false".to_string(),
            "script:log('solar system ready')".to_string(),
            "sync:true".to_string(),
        ]);
    }

    #[test]
    fn synchronization_is_restored_after_failed_load() {
        let recorder = Recorder::default();
        let mut scene =
            scene_with("solar", solar_system()).with_synchronization(Box::new(recorder.clone()));
        scene.schedule_load("missing");
        assert!(scene.update(&UpdateData::default()).is_err());
        assert_eq!(*recorder.0.borrow(), vec!["sync:false", "sync:true"]);
    }

    #[test]
    fn pending_camera_is_handed_out_once() {
        let mut scene = scene_with("solar", solar_system());
        scene.schedule_load("solar");
        scene.update(&UpdateData::default()).unwrap();

        let camera = scene.take_pending_camera().unwrap();
        assert_eq!(camera.parent, "Earth");
        assert!(scene.take_pending_camera().is_none());
        assert!(scene.initial_camera().is_some());
    }

    #[test]
    fn commands_apply_in_order_and_errors_do_not_stop_the_queue() {
        let mut scene = scene_with("solar", solar_system());
        scene.schedule_load("solar");
        scene.schedule_remove_node("Pluto");
        scene.schedule_add_node(at("Mars", "Sun", [80.0, 0.0, 0.0]));
        scene.schedule_remove_node("Earth");
        assert_eq!(scene.pending_commands(), 4);

        let err = scene.update(&UpdateData::default()).unwrap_err();
        assert!(matches!(err, AstrolabeError::NodeNotFound(name) if name == "Pluto"));
        assert_eq!(scene.pending_commands(), 0);
        assert!(scene.find("Mars").is_some());
        assert!(scene.find("Earth").is_none());
        assert!(scene.find("Moon").is_none());
    }

    #[test]
    fn reload_replaces_previous_nodes() {
        let other = SceneDescription {
            nodes: vec![at("Probe", "Root", [1.0, 0.0, 0.0])],
            ..SceneDescription::default()
        };
        let loader = InMemoryLoader::new()
            .with_scene("solar", solar_system())
            .with_scene("probe", other);
        let mut scene = Scene::new(SceneSettings::default(), Box::new(loader));

        scene.schedule_load("solar");
        scene.update(&UpdateData::default()).unwrap();
        scene.schedule_load("probe");
        scene.update(&UpdateData::default()).unwrap();

        assert_eq!(scene.graph().len(), 2);
        assert!(scene.find("Sun").is_none());
        assert!(scene.take_pending_camera().is_none());
    }

    #[test]
    fn render_culls_outside_frustum() {
        let description = SceneDescription {
            nodes: vec![
                at("Front", "Root", [0.0, 0.0, -10.0]).with_renderable(sphere(1.0)),
                at("Behind", "Root", [0.0, 0.0, 10.0]).with_renderable(sphere(1.0)),
                at("Edge", "Root", [0.0, 0.0, 1.0]).with_renderable(sphere(2.0)),
                at("Marker", "Root", [0.0, 0.0, -5.0]),
            ],
            ..SceneDescription::default()
        };
        let mut scene = scene_with("culling", description);
        scene.schedule_load("culling");
        scene.update(&UpdateData::default()).unwrap();

        let camera = perspective_camera(scene.root());
        let drawn: Vec<&str> = scene
            .render(&camera, 0, RenderBin::all())
            .iter()
            .map(|item| scene.graph().get(item.node).unwrap().name())
            .collect();
        assert_eq!(drawn, vec!["Front", "Edge"]);

        assert!(scene.render(&camera, 0, RenderBin::OVERLAY).is_empty());
        assert!(scene.render(&camera, 3, RenderBin::all()).is_empty());
    }

    #[test]
    fn render_skips_hidden_and_disabled() {
        let description = SceneDescription {
            nodes: vec![
                at("Shown", "Root", [0.0, 0.0, -10.0]).with_renderable(sphere(1.0)),
                at("Hidden", "Root", [0.0, 0.0, -10.0]).with_renderable(sphere(1.0)),
            ],
            ..SceneDescription::default()
        };
        let mut scene = scene_with("s", description);
        scene.schedule_load("s");
        scene.update(&UpdateData::default()).unwrap();
        let hidden = scene.find("Hidden").unwrap();
        scene.graph_mut().get_mut(hidden).unwrap().renderable_mut().unwrap().visible = false;

        let camera = perspective_camera(scene.root());
        let items = scene.render(&camera, 0, RenderBin::all());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].node, scene.find("Shown").unwrap());
    }

    #[test]
    fn render_with_detached_camera_draws_nothing() {
        let mut scene = scene_with("solar", solar_system());
        scene.schedule_load("solar");
        scene.update(&UpdateData::default()).unwrap();
        let camera = Camera::new(scene.find("Moon").unwrap());

        scene.schedule_remove_node("Moon");
        scene.update(&UpdateData::default()).unwrap();
        assert!(scene.render(&camera, 0, RenderBin::all()).is_empty());
    }

    #[test]
    fn innermost_containing_node_descends_and_climbs() {
        let mut scene = scene_with("solar", solar_system());
        scene.schedule_load("solar");
        scene.update(&UpdateData::default()).unwrap();
        let earth = scene.find("Earth").unwrap();
        let moon = scene.find("Moon").unwrap();
        let sun = scene.find("Sun").unwrap();

        let mut camera = Camera::new(earth);
        camera.set_position(DVec3::new(2.0, 0.0, 0.1));
        assert_eq!(scene.innermost_containing_node(&camera, scene.root()), Some(moon));

        camera.set_parent(sun);
        camera.set_position(DVec3::new(0.0, 0.0, 30.0));
        assert_eq!(scene.innermost_containing_node(&camera, moon), Some(sun));
    }
}
