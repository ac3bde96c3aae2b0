//! Relative transform tests
//!
//! Tests for:
//! - TransformData composition and inversion
//! - Relative transforms along ancestor chains and across branches
//! - Exact identity for a node against itself
//! - Inverse-composition property over every node pair
//! - Fail-fast on handles that are not in the graph

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use astrolabe::{
    NodeDescription, RotationDescription, ScaleDescription, SceneGraph, TransformData,
    TranslationDescription,
};
use glam::{DMat3, DVec3};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: DVec3, b: DVec3) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
}

fn translated(name: &str, parent: Option<&str>, position: [f64; 3]) -> NodeDescription {
    let desc = NodeDescription::new(name)
        .with_translation(TranslationDescription::Static { position });
    match parent {
        Some(parent) => desc.with_parent(parent),
        None => desc,
    }
}

/// Root → A → B with pure translations.
fn scenario_a() -> SceneGraph {
    let mut graph = SceneGraph::default();
    graph.add_node(&translated("A", None, [1.0, 0.0, 0.0])).unwrap();
    graph.add_node(&translated("B", Some("A"), [0.0, 1.0, 0.0])).unwrap();
    graph
}

/// A wider tree mixing translation, rotation and scale at several depths.
fn mixed_tree() -> SceneGraph {
    let mut graph = SceneGraph::default();
    let nodes = [
        ("Sun", None, [0.0, 0.0, 0.0], [0.0, 0.0, 0.3], 2.0),
        ("Earth", Some("Sun"), [10.0, 0.0, 0.0], [0.0, FRAC_PI_4, 0.0], 0.5),
        ("Moon", Some("Earth"), [0.0, 3.0, 0.0], [FRAC_PI_2, 0.0, 0.0], 0.25),
        ("Station", Some("Moon"), [0.0, 0.0, 1.5], [0.1, 0.2, 0.3], 1.0),
        ("Mars", Some("Sun"), [-15.0, 2.0, 0.0], [0.0, 0.0, -0.7], 0.4),
        ("Phobos", Some("Mars"), [1.0, 1.0, 1.0], [0.5, 0.0, 0.5], 3.0),
    ];
    for (name, parent, position, angles, scale) in nodes {
        let desc = translated(name, parent, position)
            .with_rotation(RotationDescription::StaticEuler { angles })
            .with_scale(ScaleDescription::Static { scale });
        graph.add_node(&desc).unwrap();
    }
    graph
}

// ============================================================================
// TransformData
// ============================================================================

#[test]
fn then_applies_inner_before_outer() {
    let inner = TransformData::from_translation(DVec3::new(1.0, 0.0, 0.0));
    let outer =
        TransformData::new(DVec3::new(0.0, 0.0, 5.0), DMat3::from_rotation_z(FRAC_PI_2), 2.0);
    let composed = inner.then(&outer);

    let p = DVec3::new(0.5, 0.0, 0.0);
    let expected = outer.transform_point(inner.transform_point(p));
    assert!(vec3_approx(composed.transform_point(p), expected));
    assert!(vec3_approx(composed.translation, DVec3::new(0.0, 2.0, 5.0)));
}

#[test]
fn inverse_undoes_transform() {
    let t = TransformData::new(DVec3::new(3.0, -1.0, 2.0), DMat3::from_rotation_y(0.8), 4.0);
    let round_trip = t.then(&t.inverse());
    assert!(round_trip.abs_diff_eq(&TransformData::IDENTITY, EPSILON));
}

// ============================================================================
// Relative transforms
// ============================================================================

#[test]
fn scenario_a_leaf_to_root() {
    let graph = scenario_a();
    let b = graph.find("B").unwrap();
    let t = graph.relative_transform(b, graph.root());
    assert!(vec3_approx(t.translation, DVec3::new(1.0, 1.0, 0.0)));
    assert_eq!(t.scale, 1.0);
}

#[test]
fn root_to_leaf_is_the_inverse() {
    let graph = scenario_a();
    let b = graph.find("B").unwrap();
    let t = graph.relative_transform(graph.root(), b);
    assert!(vec3_approx(t.translation, DVec3::new(-1.0, -1.0, 0.0)));
}

#[test]
fn self_transform_is_exact_identity() {
    let graph = mixed_tree();
    for handle in graph.nodes() {
        assert_eq!(graph.relative_transform(handle, handle), TransformData::IDENTITY);
    }
}

#[test]
fn relative_transform_maps_points_between_frames() {
    let graph = mixed_tree();
    let station = graph.find("Station").unwrap();
    let phobos = graph.find("Phobos").unwrap();

    let p = DVec3::new(0.2, -0.4, 1.1);
    let via_root = graph
        .world_transform(phobos)
        .inverse()
        .transform_point(graph.world_transform(station).transform_point(p));
    let direct = graph.relative_transform(station, phobos).transform_point(p);
    assert!(vec3_approx(direct, via_root));
}

#[test]
fn inverse_composition_is_identity_for_all_pairs() {
    let graph = mixed_tree();
    let nodes = graph.nodes();
    for &a in &nodes {
        for &b in &nodes {
            let forward = graph.relative_transform(a, b);
            let backward = graph.relative_transform(b, a);
            let composed = forward.then(&backward);
            assert!(
                composed.abs_diff_eq(&TransformData::IDENTITY, 1e-8),
                "{} <-> {} composed to {composed:?}",
                graph.get(a).unwrap().name(),
                graph.get(b).unwrap().name(),
            );
        }
    }
}

#[test]
fn ancestor_and_descendant_walks_degenerate_cleanly() {
    let graph = mixed_tree();
    let sun = graph.find("Sun").unwrap();
    let moon = graph.find("Moon").unwrap();

    // Moon origin in Earth: (0,3,0); Earth scaled 0.5 and rotated about y.
    let earth = graph.get(graph.find("Earth").unwrap()).unwrap().local_transform();
    let expected = earth.transform_point(DVec3::new(0.0, 3.0, 0.0));
    assert!(vec3_approx(graph.relative_transform(moon, sun).translation, expected));
}

#[test]
fn world_position_matches_leaf_to_root() {
    let graph = scenario_a();
    let b = graph.find("B").unwrap();
    assert!(vec3_approx(graph.world_position(b), DVec3::new(1.0, 1.0, 0.0)));
}

#[test]
fn reattached_subtree_uses_new_path() {
    let mut graph = mixed_tree();
    let moon = graph.find("Moon").unwrap();
    let mars = graph.find("Mars").unwrap();
    graph.attach(moon, mars).unwrap();

    let station = graph.find("Station").unwrap();
    assert_eq!(graph.get(station).unwrap().depth(), 4);

    let t = graph.relative_transform(moon, mars);
    assert!(vec3_approx(t.translation, DVec3::new(0.0, 3.0, 0.0)));
}

#[test]
#[should_panic(expected = "is not a node of this scene graph")]
fn stale_handle_fails_fast() {
    let mut graph = scenario_a();
    let b = graph.find("B").unwrap();
    graph.remove_node("A").unwrap();
    let _ = graph.relative_transform(b, graph.root());
}
