//! GPU Program Parameters
//!
//! A [`UniformLayout`] is computed once per compiled program from its uniform
//! declarations and shared by every pass bound to that program. Each pass owns
//! a [`GpuProgramParameters`] block sized from the layout, so per-frame updates
//! only write into pre-allocated storage.
//!
//! Values are stored as `f32` registers: every uniform occupies whole
//! 4-component registers, matrices are column-major, and a 3x3 matrix uses
//! three padded columns.

use std::sync::Arc;

use glam::{Mat3, Mat4, Vec3, Vec4};
use slotmap::SecondaryMap;

use rtss_core::{AutoConstant, AutoParamDataSource, GpuConstType, ParameterId, Renderable};

use crate::pass::SurfaceProperties;

/// Register range of one uniform inside a parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    /// Offset in floats.
    pub offset: u32,
    /// Reserved size in floats.
    pub size: u32,
}

/// An engine-filled uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoBinding {
    pub slot: UniformSlot,
    pub constant: AutoConstant,
    pub index: u32,
}

/// Uniform storage layout of one compiled program.
#[derive(Debug, Default)]
pub struct UniformLayout {
    slots: SecondaryMap<ParameterId, UniformSlot>,
    autos: Vec<AutoBinding>,
    float_count: usize,
}

impl UniformLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves registers for a uniform. Samplers occupy no registers and
    /// are ignored.
    pub fn push(&mut self, id: ParameterId, ty: GpuConstType) -> Option<UniformSlot> {
        if ty.is_sampler() {
            return None;
        }
        if let Some(existing) = self.slots.get(id) {
            return Some(*existing);
        }
        let size = (ty.register_count() * 4) as u32;
        let slot = UniformSlot {
            offset: self.float_count as u32,
            size,
        };
        self.float_count += size as usize;
        self.slots.insert(id, slot);
        Some(slot)
    }

    pub fn push_auto(&mut self, id: ParameterId, ty: GpuConstType, constant: AutoConstant, index: u32) {
        if let Some(slot) = self.push(id, ty) {
            self.autos.push(AutoBinding { slot, constant, index });
        }
    }

    #[inline]
    #[must_use]
    pub fn slot(&self, id: ParameterId) -> Option<UniformSlot> {
        self.slots.get(id).copied()
    }

    #[inline]
    #[must_use]
    pub fn autos(&self) -> &[AutoBinding] {
        &self.autos
    }

    #[inline]
    #[must_use]
    pub fn float_count(&self) -> usize {
        self.float_count
    }

    #[inline]
    #[must_use]
    pub fn uniform_count(&self) -> usize {
        self.slots.len()
    }
}

/// Per-pass uniform values of one program.
#[derive(Debug, Clone)]
pub struct GpuProgramParameters {
    layout: Arc<UniformLayout>,
    data: Vec<f32>,
}

impl GpuProgramParameters {
    #[must_use]
    pub fn new(layout: Arc<UniformLayout>) -> Self {
        let data = vec![0.0; layout.float_count()];
        Self { layout, data }
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &Arc<UniformLayout> {
        &self.layout
    }

    /// Raw register data, ready for upload.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Registers of one uniform, `None` if the program does not use it.
    #[must_use]
    pub fn get(&self, id: ParameterId) -> Option<&[f32]> {
        let slot = self.layout.slot(id)?;
        let start = slot.offset as usize;
        self.data.get(start..start + slot.size as usize)
    }

    fn write(&mut self, id: ParameterId, values: &[f32]) -> bool {
        let Some(slot) = self.layout.slot(id) else {
            return false;
        };
        let start = slot.offset as usize;
        let len = values.len().min(slot.size as usize);
        self.data[start..start + len].copy_from_slice(&values[..len]);
        true
    }

    pub fn set_float(&mut self, id: ParameterId, value: f32) -> bool {
        self.write(id, &[value])
    }

    pub fn set_vec3(&mut self, id: ParameterId, value: Vec3) -> bool {
        self.write(id, &value.to_array())
    }

    pub fn set_vec4(&mut self, id: ParameterId, value: Vec4) -> bool {
        self.write(id, &value.to_array())
    }

    pub fn set_mat3(&mut self, id: ParameterId, value: Mat3) -> bool {
        let c = value.to_cols_array();
        self.write(id, &[c[0], c[1], c[2], 0.0, c[3], c[4], c[5], 0.0, c[6], c[7], c[8], 0.0])
    }

    pub fn set_mat4(&mut self, id: ParameterId, value: Mat4) -> bool {
        self.write(id, &value.to_cols_array())
    }

    /// Fills every engine-provided uniform of the layout.
    pub fn update_auto_params(
        &mut self,
        source: &AutoParamDataSource,
        renderable: &Renderable,
        surface: &SurfaceProperties,
    ) {
        let layout = Arc::clone(&self.layout);
        for binding in layout.autos() {
            let start = binding.slot.offset as usize;
            let dst = &mut self.data[start..start + binding.slot.size as usize];
            write_auto(dst, binding, source, renderable, surface);
        }
    }
}

fn write_auto(
    dst: &mut [f32],
    binding: &AutoBinding,
    source: &AutoParamDataSource,
    renderable: &Renderable,
    surface: &SurfaceProperties,
) {
    let derived_ambient = source.ambient_light * surface.ambient;
    match binding.constant {
        AutoConstant::WorldMatrix => copy_mat4(dst, renderable.world),
        AutoConstant::InverseWorldMatrix => copy_mat4(dst, renderable.world.inverse()),
        AutoConstant::ViewMatrix => copy_mat4(dst, source.view),
        AutoConstant::ProjectionMatrix => copy_mat4(dst, source.projection),
        AutoConstant::WorldViewMatrix => copy_mat4(dst, source.world_view(renderable)),
        AutoConstant::InverseTransposeWorldViewMatrix => {
            let m = Mat3::from_mat4(source.world_view(renderable)).inverse().transpose();
            let c = m.to_cols_array();
            for (col, chunk) in c.chunks_exact(3).zip(dst.chunks_exact_mut(4)) {
                chunk[..3].copy_from_slice(col);
                chunk[3] = 0.0;
            }
        }
        AutoConstant::WorldViewProjMatrix => copy_mat4(dst, source.world_view_proj(renderable)),
        AutoConstant::CameraPosition => copy_vec(dst, &source.camera_position.to_array()),
        AutoConstant::CameraPositionObjectSpace => {
            copy_vec(dst, &source.camera_position_object_space(renderable).to_array());
        }
        AutoConstant::AmbientLightColour => copy_vec(dst, &source.ambient_light.to_array()),
        AutoConstant::DerivedAmbientLightColour => copy_vec(dst, &derived_ambient.to_array()),
        AutoConstant::DerivedSceneColour => {
            let mut colour = derived_ambient + surface.emissive;
            colour.w = surface.diffuse.w;
            copy_vec(dst, &colour.to_array());
        }
        AutoConstant::SurfaceAmbientColour => copy_vec(dst, &surface.ambient.to_array()),
        AutoConstant::SurfaceDiffuseColour => copy_vec(dst, &surface.diffuse.to_array()),
        AutoConstant::SurfaceSpecularColour => copy_vec(dst, &surface.specular.to_array()),
        AutoConstant::SurfaceEmissiveColour => copy_vec(dst, &surface.emissive.to_array()),
        AutoConstant::SurfaceShininess => copy_vec(dst, &[surface.shininess]),
        AutoConstant::FogColour => copy_vec(dst, &source.fog_colour.to_array()),
        AutoConstant::FogParams => copy_vec(dst, &source.fog_params.to_array()),
        AutoConstant::TextureViewProjMatrix => {
            if let Some(m) = source.shadow_view_proj.get(binding.index as usize) {
                copy_mat4(dst, *m);
            }
        }
        AutoConstant::InverseTextureSize => {
            let size = source
                .shadow_texture_size
                .get(binding.index as usize)
                .copied()
                .unwrap_or(1.0)
                .max(1.0);
            copy_vec(dst, &[1.0 / size, 1.0 / size, 0.0, 0.0]);
        }
        AutoConstant::Time => copy_vec(dst, &[source.time]),
    }
}

#[inline]
fn copy_mat4(dst: &mut [f32], m: Mat4) {
    copy_vec(dst, &m.to_cols_array());
}

#[inline]
fn copy_vec(dst: &mut [f32], values: &[f32]) {
    let len = values.len().min(dst.len());
    dst[..len].copy_from_slice(&values[..len]);
}
