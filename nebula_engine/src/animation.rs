//! Keyframe animation: per-node sampling of translation/rotation/scale
//! timelines, applied directly to scene-graph nodes.

use glam::{Quat, Vec3};

use crate::node::{NodeGraph, NodeKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
}

/// The sampled value kind a sampler's output array holds, tied to the TRS
/// path its acts target.
#[derive(Debug, Clone)]
pub enum Output {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

/// One glTF-style sampler: a timeline plus the typed samples at each time.
#[derive(Debug, Clone)]
pub struct Sampler {
    pub input: Vec<f32>,
    pub output: Output,
    pub interpolation: Interpolation,
}

/// One channel: a sampler paired with the node it drives. `target` is
/// `None` for channels whose glTF node reference never resolved (e.g. the
/// referenced node was out of range) — such acts are kept but inert.
#[derive(Debug, Clone)]
pub struct Act {
    pub sampler: usize,
    pub target: Option<NodeKey>,
}

/// A complete animation: its samplers and the acts that bind them to nodes.
#[derive(Debug, Clone)]
pub struct KeyframeAnimation {
    pub samplers: Vec<Sampler>,
    pub acts: Vec<Act>,
}

impl KeyframeAnimation {
    pub fn new(samplers: Vec<Sampler>, acts: Vec<Act>) -> Self {
        Self { samplers, acts }
    }

    /// The animation's total duration: the span from the earliest to the
    /// latest timeline sample among every act with a bound target.
    pub fn duration(&self) -> f32 {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;

        for act in &self.acts {
            if act.target.is_none() {
                continue;
            }
            let Some(sampler) = self.samplers.get(act.sampler) else {
                continue;
            };
            if let (Some(&first), Some(&last)) = (sampler.input.first(), sampler.input.last()) {
                lo = lo.min(first);
                hi = hi.max(last);
            }
        }

        if hi >= lo {
            hi - lo
        } else {
            0.0
        }
    }

    /// Samples every act at `frame_time` and writes the result into the
    /// bound node's T/R/S slot. Returns `duration - frame_time`, matching
    /// the ported engine's "time remaining" convention.
    pub fn apply(&self, graph: &mut NodeGraph, frame_time: f32) -> f32 {
        for act in &self.acts {
            let Some(target) = act.target else { continue };
            let Some(sampler) = self.samplers.get(act.sampler) else {
                continue;
            };

            let mut xform = *graph.local_xform(target);
            match &sampler.output {
                Output::Translation(samples) => {
                    xform.translation = sample_vec3(&sampler.input, samples, frame_time, sampler.interpolation);
                }
                Output::Rotation(samples) => {
                    xform.rotation = sample_quat(&sampler.input, samples, frame_time, sampler.interpolation);
                }
                Output::Scale(samples) => {
                    xform.scale = sample_vec3(&sampler.input, samples, frame_time, sampler.interpolation);
                }
            }
            graph.set_local_xform(target, xform);
        }

        self.duration() - frame_time
    }
}

/// Binary-searches `input` for the bracketing keyframe pair `(i1, i2)` and
/// the interpolation fraction within them. Clamps to the first/last index
/// when `frame_time` lies outside the timeline.
fn bracket(input: &[f32], frame_time: f32) -> (usize, usize, f32) {
    if input.len() <= 1 {
        return (0, 0, 0.0);
    }
    if frame_time <= input[0] {
        return (0, 0, 0.0);
    }
    let last = input.len() - 1;
    if frame_time >= input[last] {
        return (last, last, 0.0);
    }

    let mut lo = 0usize;
    let mut hi = last;
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if input[mid] <= frame_time {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let span = (input[hi] - input[lo]).max(f32::EPSILON);
    let t = (frame_time - input[lo]) / span;
    (lo, hi, t)
}

fn sample_vec3(input: &[f32], samples: &[Vec3], frame_time: f32, interp: Interpolation) -> Vec3 {
    let (i1, i2, t) = bracket(input, frame_time);
    match interp {
        Interpolation::Step => {
            if t < 0.5 {
                samples[i1]
            } else {
                samples[i2]
            }
        }
        Interpolation::Linear => samples[i1].lerp(samples[i2], t),
    }
}

fn sample_quat(input: &[f32], samples: &[Quat], frame_time: f32, interp: Interpolation) -> Quat {
    let (i1, i2, t) = bracket(input, frame_time);
    match interp {
        Interpolation::Step => {
            if t < 0.5 {
                samples[i1]
            } else {
                samples[i2]
            }
        }
        Interpolation::Linear => slerp(samples[i1], samples[i2], t),
    }
}

fn quat_lerp_unnormalized(a: Quat, b: Quat, t: f32) -> Quat {
    let a = a.to_array();
    let b = b.to_array();
    Quat::from_array([
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ])
    .normalize()
}

/// Spherical linear interpolation between two quaternions, falling back to
/// a normalized lerp once the dot product exceeds `1 - f32::EPSILON` to
/// avoid dividing by a near-zero `sin(theta)`.
fn slerp(a: Quat, b: Quat, t: f32) -> Quat {
    let mut dot = a.dot(b);
    let b = if dot < 0.0 {
        dot = -dot;
        Quat::from_array(b.to_array().map(|v| -v))
    } else {
        b
    };

    if dot > 1.0 - f32::EPSILON {
        return quat_lerp_unnormalized(a, b, t);
    }

    let theta_0 = dot.acos();
    let theta = theta_0 * t;
    let sin_theta_0 = theta_0.sin();
    let sin_theta = theta.sin();
    let s0 = (theta_0 - theta).sin() / sin_theta_0;
    let s1 = sin_theta / sin_theta_0;

    let aa = a.to_array();
    let bb = b.to_array();
    Quat::from_array([
        aa[0] * s0 + bb[0] * s1,
        aa[1] * s0 + bb[1] * s1,
        aa[2] * s0 + bb[2] * s1,
        aa[3] * s0 + bb[3] * s1,
    ])
    .normalize()
}

#[cfg(test)]
#[path = "animation_tests.rs"]
mod tests;
