//! Light objects attachable to a scene graph node.

use glam::Vec3;

/// The kind of light, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Spot,
    Directional,
}

/// A single light source. Position/direction come from the owning node's
/// world transform at render time, not stored here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    /// Point/spot only; ignored for directional lights.
    pub range: f32,
    /// Spot only, radians.
    pub inner_angle: f32,
    /// Spot only, radians.
    pub outer_angle: f32,
}

impl Light {
    pub fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            color,
            intensity,
            range,
            inner_angle: 0.0,
            outer_angle: 0.0,
        }
    }

    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color,
            intensity,
            range: 0.0,
            inner_angle: 0.0,
            outer_angle: 0.0,
        }
    }

    pub fn spot(color: Vec3, intensity: f32, range: f32, inner_angle: f32, outer_angle: f32) -> Self {
        Self {
            kind: LightKind::Spot,
            color,
            intensity,
            range,
            inner_angle,
            outer_angle,
        }
    }
}
