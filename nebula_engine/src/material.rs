//! Material definitions: pure data, borrowing texture handles rather than
//! owning them.

use std::sync::Arc;

use glam::Vec4;

use crate::texture::Texture;

/// A texture reference plus the UV set it samples, as glTF materials carry.
#[derive(Clone)]
pub struct TextureRef {
    pub texture: Arc<Texture>,
    pub uv_set: u32,
}

#[derive(Clone)]
pub struct SpecularGlossiness {
    pub diffuse_factor: Vec4,
    pub specular_factor: [f32; 3],
    pub glossiness_factor: f32,
    pub diffuse: Option<TextureRef>,
    pub spec_gloss: Option<TextureRef>,
}

#[derive(Clone)]
pub struct MetallicRoughness {
    pub base_color_factor: Vec4,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub base_color: Option<TextureRef>,
    pub metal_rough: Option<TextureRef>,
}

/// The PBR workflow a material uses. A fixed, closed set dispatched by
/// `match`, not a trait object — glTF only ever asks for one of these three.
#[derive(Clone)]
pub enum PbrModel {
    SpecGloss(SpecularGlossiness),
    MetalRough(MetallicRoughness),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    Opaque,
    Blend,
    Mask,
}

#[derive(Clone)]
pub struct Material {
    pub pbr: PbrModel,
    pub normal: Option<TextureRef>,
    pub normal_scale: f32,
    pub occlusion: Option<TextureRef>,
    pub occlusion_strength: f32,
    pub emissive: Option<TextureRef>,
    pub emissive_factor: [f32; 3],
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            pbr: PbrModel::None,
            normal: None,
            normal_scale: 1.0,
            occlusion: None,
            occlusion_strength: 1.0,
            emissive: None,
            emissive_factor: [0.0, 0.0, 0.0],
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
        }
    }
}

/// A bitmask recording which of the material's texture slots are populated,
/// matching the uniform block's "texture-mask bitmap" field.
impl Material {
    pub fn texture_mask(&self) -> u32 {
        let mut mask = 0u32;
        let has = |slot: &Option<TextureRef>, bit: u32, mask: &mut u32| {
            if slot.is_some() {
                *mask |= 1 << bit;
            }
        };

        match &self.pbr {
            PbrModel::SpecGloss(sg) => {
                has(&sg.diffuse, 0, &mut mask);
                has(&sg.spec_gloss, 1, &mut mask);
            }
            PbrModel::MetalRough(mr) => {
                has(&mr.base_color, 0, &mut mask);
                has(&mr.metal_rough, 1, &mut mask);
            }
            PbrModel::None => {}
        }
        has(&self.normal, 2, &mut mask);
        has(&self.occlusion, 3, &mut mask);
        has(&self.emissive, 4, &mut mask);
        mask
    }
}

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
