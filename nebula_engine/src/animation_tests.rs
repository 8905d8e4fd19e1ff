use super::*;
use crate::node::NodeGraph;

#[test]
fn linear_translation_interpolates_between_keyframes() {
    let mut graph = NodeGraph::new();
    let root = graph.init();
    let node = graph.init();
    graph.insert(root, node);

    let anim = KeyframeAnimation::new(
        vec![Sampler {
            input: vec![0.0, 1.0],
            output: Output::Translation(vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)]),
            interpolation: Interpolation::Linear,
        }],
        vec![Act {
            sampler: 0,
            target: Some(node),
        }],
    );

    anim.apply(&mut graph, 0.5);
    assert_eq!(graph.local_xform(node).translation, Vec3::new(1.0, 0.0, 0.0));
}

#[test]
fn step_interpolation_picks_nearer_keyframe() {
    let mut graph = NodeGraph::new();
    let root = graph.init();
    let node = graph.init();
    graph.insert(root, node);

    let anim = KeyframeAnimation::new(
        vec![Sampler {
            input: vec![0.0, 1.0],
            output: Output::Translation(vec![Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)]),
            interpolation: Interpolation::Step,
        }],
        vec![Act {
            sampler: 0,
            target: Some(node),
        }],
    );

    anim.apply(&mut graph, 0.9);
    assert_eq!(graph.local_xform(node).translation, Vec3::new(5.0, 0.0, 0.0));
}

#[test]
fn frame_time_outside_timeline_clamps_to_endpoints() {
    let mut graph = NodeGraph::new();
    let root = graph.init();
    let node = graph.init();
    graph.insert(root, node);

    let anim = KeyframeAnimation::new(
        vec![Sampler {
            input: vec![1.0, 2.0],
            output: Output::Translation(vec![Vec3::X, Vec3::new(9.0, 0.0, 0.0)]),
            interpolation: Interpolation::Linear,
        }],
        vec![Act {
            sampler: 0,
            target: Some(node),
        }],
    );

    anim.apply(&mut graph, -10.0);
    assert_eq!(graph.local_xform(node).translation, Vec3::X);
}

#[test]
fn apply_returns_duration_minus_frame_time() {
    let mut graph = NodeGraph::new();
    let root = graph.init();
    let node = graph.init();
    graph.insert(root, node);

    let anim = KeyframeAnimation::new(
        vec![Sampler {
            input: vec![0.0, 4.0],
            output: Output::Scale(vec![Vec3::ONE, Vec3::ONE]),
            interpolation: Interpolation::Linear,
        }],
        vec![Act {
            sampler: 0,
            target: Some(node),
        }],
    );

    let remaining = anim.apply(&mut graph, 1.5);
    assert_eq!(remaining, 2.5);
}

#[test]
fn slerp_falls_back_to_lerp_for_near_identical_quaternions() {
    let a = Quat::IDENTITY;
    let b = Quat::from_rotation_y(1e-7);
    let result = slerp(a, b, 0.5);
    assert!((result.length() - 1.0).abs() < 1e-4);
}

#[test]
fn unbound_act_is_skipped_without_panicking() {
    let mut graph = NodeGraph::new();
    let anim = KeyframeAnimation::new(
        vec![Sampler {
            input: vec![0.0, 1.0],
            output: Output::Translation(vec![Vec3::ZERO, Vec3::X]),
            interpolation: Interpolation::Linear,
        }],
        vec![Act {
            sampler: 0,
            target: None,
        }],
    );

    let remaining = anim.apply(&mut graph, 0.5);
    assert_eq!(remaining, -0.5);
}
