//! Auto Constants
//!
//! Catalogue of uniform values the engine can fill without help from a sub
//! render state (matrices, camera, fog, surface colours), plus the per-frame
//! data source they are computed from.

use glam::{Mat4, Vec3, Vec4};

use crate::types::GpuConstType;

/// Engine-provided uniform value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutoConstant {
    WorldMatrix,
    InverseWorldMatrix,
    ViewMatrix,
    ProjectionMatrix,
    WorldViewMatrix,
    InverseTransposeWorldViewMatrix,
    WorldViewProjMatrix,
    CameraPosition,
    CameraPositionObjectSpace,
    AmbientLightColour,
    DerivedAmbientLightColour,
    DerivedSceneColour,
    SurfaceAmbientColour,
    SurfaceDiffuseColour,
    SurfaceSpecularColour,
    SurfaceEmissiveColour,
    SurfaceShininess,
    FogColour,
    FogParams,
    /// Indexed by shadow texture.
    TextureViewProjMatrix,
    /// Indexed by texture unit.
    InverseTextureSize,
    Time,
}

impl AutoConstant {
    /// Uniform name used in generated source. Indexed constants get the index
    /// appended by the program set.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::WorldMatrix => "world_matrix",
            Self::InverseWorldMatrix => "inverse_world_matrix",
            Self::ViewMatrix => "view_matrix",
            Self::ProjectionMatrix => "projection_matrix",
            Self::WorldViewMatrix => "worldview_matrix",
            Self::InverseTransposeWorldViewMatrix => "inverse_transpose_worldview_matrix",
            Self::WorldViewProjMatrix => "worldviewproj_matrix",
            Self::CameraPosition => "camera_position",
            Self::CameraPositionObjectSpace => "camera_position_object_space",
            Self::AmbientLightColour => "ambient_light_colour",
            Self::DerivedAmbientLightColour => "derived_ambient_light_colour",
            Self::DerivedSceneColour => "derived_scene_colour",
            Self::SurfaceAmbientColour => "surface_ambient_colour",
            Self::SurfaceDiffuseColour => "surface_diffuse_colour",
            Self::SurfaceSpecularColour => "surface_specular_colour",
            Self::SurfaceEmissiveColour => "surface_emissive_colour",
            Self::SurfaceShininess => "surface_shininess",
            Self::FogColour => "fog_colour",
            Self::FogParams => "fog_params",
            Self::TextureViewProjMatrix => "texture_viewproj_matrix",
            Self::InverseTextureSize => "inverse_texture_size",
            Self::Time => "time",
        }
    }

    #[must_use]
    pub fn const_type(self) -> GpuConstType {
        match self {
            Self::WorldMatrix
            | Self::InverseWorldMatrix
            | Self::ViewMatrix
            | Self::ProjectionMatrix
            | Self::WorldViewMatrix
            | Self::WorldViewProjMatrix
            | Self::TextureViewProjMatrix => GpuConstType::Matrix4x4,
            Self::InverseTransposeWorldViewMatrix => GpuConstType::Matrix3x3,
            Self::CameraPosition | Self::CameraPositionObjectSpace => GpuConstType::Float3,
            Self::SurfaceShininess | Self::Time => GpuConstType::Float1,
            _ => GpuConstType::Float4,
        }
    }

    /// Whether the constant is one of a family selected by index.
    #[must_use]
    pub fn is_indexed(self) -> bool {
        matches!(self, Self::TextureViewProjMatrix | Self::InverseTextureSize)
    }

    /// Whether the value changes per rendered object rather than per frame.
    #[must_use]
    pub fn is_per_object(self) -> bool {
        matches!(
            self,
            Self::WorldMatrix
                | Self::InverseWorldMatrix
                | Self::WorldViewMatrix
                | Self::InverseTransposeWorldViewMatrix
                | Self::WorldViewProjMatrix
                | Self::CameraPositionObjectSpace
        )
    }
}

/// Per-object data read during parameter updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderable {
    pub world: Mat4,
}

impl Default for Renderable {
    fn default() -> Self {
        Self { world: Mat4::IDENTITY }
    }
}

/// Maximum shadow textures the data source tracks.
pub const MAX_SHADOW_TEXTURES: usize = 4;

/// Camera, fog, ambient and shadow state of the frame being prepared.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoParamDataSource {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub ambient_light: Vec4,
    pub fog_colour: Vec4,
    /// `(density, start, end, 1 / (end - start))`
    pub fog_params: Vec4,
    pub shadow_view_proj: [Mat4; MAX_SHADOW_TEXTURES],
    pub shadow_texture_size: [f32; MAX_SHADOW_TEXTURES],
    pub time: f32,
}

impl Default for AutoParamDataSource {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            camera_position: Vec3::ZERO,
            ambient_light: Vec4::new(0.0, 0.0, 0.0, 1.0),
            fog_colour: Vec4::ONE,
            fog_params: Vec4::new(0.001, 0.0, 1.0, 1.0),
            shadow_view_proj: [Mat4::IDENTITY; MAX_SHADOW_TEXTURES],
            shadow_texture_size: [1024.0; MAX_SHADOW_TEXTURES],
            time: 0.0,
        }
    }
}

impl AutoParamDataSource {
    /// Sets linear fog parameters from start/end distances.
    pub fn set_fog(&mut self, colour: Vec4, density: f32, start: f32, end: f32) {
        let range = end - start;
        let inv_range = if range.abs() > f32::EPSILON { 1.0 / range } else { 0.0 };
        self.fog_colour = colour;
        self.fog_params = Vec4::new(density, start, end, inv_range);
    }

    #[inline]
    #[must_use]
    pub fn world_view(&self, renderable: &Renderable) -> Mat4 {
        self.view * renderable.world
    }

    #[inline]
    #[must_use]
    pub fn world_view_proj(&self, renderable: &Renderable) -> Mat4 {
        self.projection * self.view * renderable.world
    }

    /// Camera position in the renderable's object space.
    #[must_use]
    pub fn camera_position_object_space(&self, renderable: &Renderable) -> Vec3 {
        renderable.world.inverse().transform_point3(self.camera_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrices_are_matrix_typed() {
        assert_eq!(AutoConstant::WorldViewProjMatrix.const_type(), GpuConstType::Matrix4x4);
        assert_eq!(AutoConstant::InverseTransposeWorldViewMatrix.const_type(), GpuConstType::Matrix3x3);
        assert_eq!(AutoConstant::DerivedSceneColour.const_type(), GpuConstType::Float4);
    }

    #[test]
    fn camera_object_space_undoes_world_translation() {
        let source = AutoParamDataSource {
            camera_position: Vec3::new(0.0, 0.0, 10.0),
            ..Default::default()
        };
        let renderable = Renderable {
            world: Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0)),
        };
        let local = source.camera_position_object_space(&renderable);
        assert!((local - Vec3::new(0.0, 0.0, 6.0)).length() < 1e-5);
    }

    #[test]
    fn fog_range_is_inverted() {
        let mut source = AutoParamDataSource::default();
        source.set_fog(Vec4::ONE, 0.0, 10.0, 20.0);
        assert!((source.fog_params.w - 0.1).abs() < 1e-6);
    }
}
