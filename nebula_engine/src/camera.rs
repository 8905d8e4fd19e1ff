//! The camera: view and projection parameters a scene carries.

use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
    pub fovy_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Half-extent of the orthographic frustum on the shorter screen axis;
    /// used for the orchestrator's secondary ortho-proj block.
    pub ortho_extent: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 5.0),
            center: Vec3::ZERO,
            up: Vec3::Y,
            fovy_radians: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            ortho_extent: 5.0,
        }
    }
}

impl Camera {
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.center, self.up)
    }

    pub fn perspective(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy_radians, self.aspect, self.near, self.far)
    }

    pub fn orthographic(&self) -> Mat4 {
        let half_h = self.ortho_extent;
        let half_w = half_h * self.aspect;
        Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.perspective() * self.view()
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}
