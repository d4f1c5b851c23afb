use std::sync::Arc;

use bitflags::bitflags;
use glam::Vec4;
use smallvec::SmallVec;

use rtss_core::LightType;

use crate::gpu_params::GpuProgramParameters;
use crate::gpu_program::GpuProgram;

bitflags! {
    /// Surface colours sourced from the per-vertex colour instead of the
    /// material uniform.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TrackVertexColour: u32 {
        const AMBIENT  = 1 << 0;
        const DIFFUSE  = 1 << 1;
        const SPECULAR = 1 << 2;
        const EMISSIVE = 1 << 3;
    }
}

bitflags! {
    /// Vertex attributes present in the geometry rendered with a pass.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct VertexFeatures: u32 {
        const POSITION  = 1 << 0;
        const NORMAL    = 1 << 1;
        const TANGENT   = 1 << 2;
        const COLOUR    = 1 << 3;
        const TEXCOORDS = 1 << 4;
    }
}

impl Default for VertexFeatures {
    fn default() -> Self {
        Self::POSITION | Self::NORMAL | Self::TEXCOORDS
    }
}

/// Fixed-function surface description of a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceProperties {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub emissive: Vec4,
    pub shininess: f32,
    pub track_vertex_colour: TrackVertexColour,
}

impl Default for SurfaceProperties {
    fn default() -> Self {
        Self {
            ambient: Vec4::ONE,
            diffuse: Vec4::ONE,
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emissive: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 0.0,
            track_vertex_colour: TrackVertexColour::empty(),
        }
    }
}

impl SurfaceProperties {
    /// Specular lighting contributes only with a non-black specular colour
    /// and a positive exponent, or when specular is tracked per vertex.
    #[must_use]
    pub fn has_specular(&self) -> bool {
        let coloured = self.specular.truncate() != glam::Vec3::ZERO && self.shininess > 0.0;
        coloured || self.track_vertex_colour.contains(TrackVertexColour::SPECULAR)
    }
}

/// How a pass is repeated for the lights affecting an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightIteration {
    #[default]
    Once,
    /// One iteration per light; `None` means any light type.
    PerLight(Option<LightType>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FogMode {
    #[default]
    None,
    Linear,
    Exp,
    Exp2,
}

/// How a sampled texture layer combines with the colour computed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayerBlend {
    #[default]
    Modulate,
    ModulateX2,
    Add,
    Replace,
}

/// What a texture unit feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureContent {
    #[default]
    Colour,
    NormalMap,
    MetalRoughness,
    /// Shadow map of the given split.
    Shadow(u32),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextureUnit {
    pub texture: String,
    pub texcoord_set: u32,
    pub content: TextureContent,
    pub blend: LayerBlend,
}

impl TextureUnit {
    #[must_use]
    pub fn colour(texture: impl Into<String>, texcoord_set: u32) -> Self {
        Self {
            texture: texture.into(),
            texcoord_set,
            ..Default::default()
        }
    }
}

/// A compiled program bound to a pass together with that pass's own
/// parameter block.
#[derive(Debug, Clone)]
pub struct BoundProgram {
    pub program: Arc<GpuProgram>,
    pub params: GpuProgramParameters,
}

#[derive(Debug, Clone, Default)]
pub struct PassPrograms {
    pub vertex: Option<BoundProgram>,
    pub fragment: Option<BoundProgram>,
}

impl PassPrograms {
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.vertex.is_some() && self.fragment.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Pass {
    pub name: String,
    pub surface: SurfaceProperties,
    pub lighting_enabled: bool,
    pub light_iteration: LightIteration,
    pub fog: FogMode,
    pub vertex_features: VertexFeatures,
    pub texture_units: SmallVec<[TextureUnit; 4]>,
    pub programs: PassPrograms,
}

impl Default for Pass {
    fn default() -> Self {
        Self {
            name: String::new(),
            surface: SurfaceProperties::default(),
            lighting_enabled: true,
            light_iteration: LightIteration::Once,
            fog: FogMode::None,
            vertex_features: VertexFeatures::default(),
            texture_units: SmallVec::new(),
            programs: PassPrograms::default(),
        }
    }
}

impl Pass {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn is_programmable(&self) -> bool {
        self.programs.vertex.is_some() || self.programs.fragment.is_some()
    }

    /// Replaces both programs at once.
    pub fn bind_programs(&mut self, vertex: BoundProgram, fragment: BoundProgram) {
        self.programs.vertex = Some(vertex);
        self.programs.fragment = Some(fragment);
    }

    pub fn clear_programs(&mut self) {
        self.programs = PassPrograms::default();
    }

    /// Splits the pass into read-only surface state and the writable
    /// parameter blocks used during per-frame updates.
    pub fn split_for_update(
        &mut self,
    ) -> (
        &SurfaceProperties,
        Option<&mut GpuProgramParameters>,
        Option<&mut GpuProgramParameters>,
    ) {
        let Pass { surface, programs, .. } = self;
        (
            surface,
            programs.vertex.as_mut().map(|b| &mut b.params),
            programs.fragment.as_mut().map(|b| &mut b.params),
        )
    }
}
