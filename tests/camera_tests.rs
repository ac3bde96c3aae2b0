//! Camera Tests
//!
//! Tests for:
//! - View matrix composition through the relative transform
//! - Placement from a scene description camera record
//! - Cached camera-from-parent matrix invalidation
//! - Multiple output surfaces
//! - Frustum extraction in a target's frame
//! - Snapshot transfer through a sync frame

use std::f64::consts::FRAC_PI_2;

use astrolabe::{
    AstrolabeError, Camera, CameraDescription, NodeDescription, OutputSurface, SceneGraph,
    SyncFrame, Syncable, TimeSnapshot, TranslationDescription,
};
use glam::{DMat4, DQuat, DVec3};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f64 = 1e-9;

fn vec3_approx(a: DVec3, b: DVec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

/// Root → Earth (10,0,0) → Moon (2,0,0).
fn earth_moon() -> SceneGraph {
    let mut graph = SceneGraph::default();
    for (name, parent, position) in [
        ("Earth", None, [10.0, 0.0, 0.0]),
        ("Moon", Some("Earth"), [2.0, 0.0, 0.0]),
    ] {
        let mut desc = NodeDescription::new(name)
            .with_translation(TranslationDescription::Static { position });
        if let Some(parent) = parent {
            desc = desc.with_parent(parent);
        }
        graph.add_node(&desc).unwrap();
    }
    graph
}

// ============================================================================
// View matrices
// ============================================================================

#[test]
fn view_matrix_places_target_in_camera_space() {
    let graph = earth_moon();
    let earth = graph.find("Earth").unwrap();
    let moon = graph.find("Moon").unwrap();

    let mut camera = Camera::new(earth);
    camera.set_position(DVec3::new(0.0, 0.0, 10.0));

    let view = camera.view_matrix(&graph, moon, 0).unwrap();
    assert!(vec3_approx(view.transform_point3(DVec3::ZERO), DVec3::new(2.0, 0.0, -10.0)));

    // a target above the camera parent goes through the inverse walk
    let root_view = camera.view_matrix(&graph, graph.root(), 0).unwrap();
    assert!(vec3_approx(
        root_view.transform_point3(DVec3::ZERO),
        DVec3::new(-10.0, 0.0, -10.0)
    ));
}

#[test]
fn camera_rotation_is_inverted_in_view() {
    let graph = earth_moon();
    let earth = graph.find("Earth").unwrap();
    let moon = graph.find("Moon").unwrap();

    let mut camera = Camera::new(earth);
    camera.set_rotation(DQuat::from_rotation_z(FRAC_PI_2));

    // the camera looks along a frame turned +90° about z, so +x appears at -y
    let view = camera.view_matrix(&graph, moon, 0).unwrap();
    assert!(vec3_approx(view.transform_point3(DVec3::ZERO), DVec3::new(0.0, -2.0, 0.0)));
}

#[test]
fn output_view_matrix_is_applied_last() {
    let graph = earth_moon();
    let earth = graph.find("Earth").unwrap();
    let moon = graph.find("Moon").unwrap();

    let mut camera = Camera::new(earth);
    let shifted = OutputSurface::new(
        DMat4::from_translation(DVec3::new(0.0, 1.0, 0.0)),
        DMat4::IDENTITY,
    );
    let index = camera.add_output(shifted);
    assert_eq!(index, 1);
    assert_eq!(camera.output_count(), 2);

    let left = camera.view_matrix(&graph, moon, 0).unwrap();
    let right = camera.view_matrix(&graph, moon, 1).unwrap();
    assert!(vec3_approx(left.transform_point3(DVec3::ZERO), DVec3::new(2.0, 0.0, 0.0)));
    assert!(vec3_approx(right.transform_point3(DVec3::ZERO), DVec3::new(2.0, 1.0, 0.0)));

    assert!(camera.view_matrix(&graph, moon, 2).is_none());
    assert!(!camera.set_output(5, OutputSurface::new(DMat4::IDENTITY, DMat4::IDENTITY)));
}

#[test]
fn view_projection_and_frustum_use_the_output_projection() {
    let graph = earth_moon();
    let earth = graph.find("Earth").unwrap();
    let moon = graph.find("Moon").unwrap();

    let mut camera = Camera::new(earth);
    camera.set_position(DVec3::new(2.0, 0.0, 10.0));
    let projection = DMat4::perspective_rh(FRAC_PI_2, 1.0, 0.1, 100.0);
    camera.set_output(0, OutputSurface::new(DMat4::IDENTITY, projection));

    let view = camera.view_matrix(&graph, moon, 0).unwrap();
    let view_projection = camera.view_projection_matrix(&graph, moon, 0).unwrap();
    assert_eq!(view_projection, projection * view);

    let frustum = camera.frustum(&graph, moon, 0).unwrap();
    assert!(frustum.intersects_sphere(DVec3::ZERO, 1.0));
    assert!(!frustum.intersects_sphere(DVec3::new(0.0, 0.0, 20.0), 1.0));
}

// ============================================================================
// Placement and caching
// ============================================================================

#[test]
fn description_places_camera() {
    let graph = earth_moon();
    let mut camera = Camera::new(graph.root());
    let desc = CameraDescription {
        parent: "Moon".to_string(),
        position: [0.0, 0.0, 5.0],
        rotation: [0.0, 0.0, 0.0, 2.0],
    };
    camera.apply_description(&graph, &desc).unwrap();

    assert_eq!(camera.parent(), graph.find("Moon").unwrap());
    assert_eq!(camera.rotation(), DQuat::IDENTITY);
    assert!(vec3_approx(camera.world_position(&graph), DVec3::new(12.0, 0.0, 5.0)));
}

#[test]
fn description_with_unknown_parent_is_rejected() {
    let graph = earth_moon();
    let mut camera = Camera::new(graph.root());
    let desc = CameraDescription {
        parent: "Mars".to_string(),
        position: [1.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
    };
    let err = camera.apply_description(&graph, &desc).unwrap_err();
    assert!(matches!(err, AstrolabeError::NodeNotFound(_)));
    assert_eq!(camera.parent(), graph.root());
    assert_eq!(camera.position(), DVec3::ZERO);
}

#[test]
fn mutation_refreshes_cached_matrix() {
    let mut camera = Camera::new(earth_moon().root());
    let initial = camera.camera_from_parent();
    assert_eq!(initial, DMat4::IDENTITY);

    camera.set_position(DVec3::new(1.0, 2.0, 3.0));
    let moved = camera.camera_from_parent();
    assert!(vec3_approx(moved.transform_point3(DVec3::new(1.0, 2.0, 3.0)), DVec3::ZERO));

    camera.rotate(DQuat::from_rotation_x(0.3));
    assert_ne!(camera.camera_from_parent(), moved);
}

#[test]
fn reparenting_changes_the_reference_frame() {
    let graph = earth_moon();
    let moon = graph.find("Moon").unwrap();
    let mut camera = Camera::new(graph.root());
    camera.set_position(DVec3::new(0.0, 0.0, 1.0));
    assert!(vec3_approx(camera.world_position(&graph), DVec3::new(0.0, 0.0, 1.0)));

    camera.set_parent(moon);
    assert!(vec3_approx(camera.world_position(&graph), DVec3::new(12.0, 0.0, 1.0)));
}

// ============================================================================
// Sync
// ============================================================================

#[test]
fn camera_pose_survives_sync_frame() {
    let graph = earth_moon();
    let mut leader = Camera::new(graph.root());
    leader.set_position(DVec3::new(3.0, -4.0, 5.0));
    leader.set_rotation(DQuat::from_rotation_y(0.7));

    let frame = SyncFrame::new(TimeSnapshot::new(1.0, 1.0, false), vec![leader.snapshot()]);
    let decoded = SyncFrame::decode(&frame.encode()).unwrap();

    let mut follower = Camera::new(graph.root());
    follower.apply_snapshot(&decoded.entities[0]);
    assert_eq!(follower.position(), leader.position());
    assert_eq!(follower.camera_from_parent(), leader.camera_from_parent());
}
