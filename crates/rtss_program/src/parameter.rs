//! Shader Parameters
//!
//! A [`Parameter`] is a typed, semantically tagged value slot of one program:
//! a vertex attribute, a varying, a uniform, a local temporary or a literal.
//! Parameters live in the arena of a [`ProgramSet`](crate::ProgramSet) and
//! are referenced by [`ParameterId`](rtss_core::ParameterId) everywhere else.

use bitflags::bitflags;

use rtss_core::{AutoConstant, GpuConstType, ShaderStage};

/// Hardware binding semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Unknown,
    Position,
    BlendIndices,
    BlendWeights,
    Normal,
    Colour,
    TexCoord,
    Binormal,
    Tangent,
}

impl Semantic {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Semantic::Unknown => "unknown",
            Semantic::Position => "position",
            Semantic::BlendIndices => "blend_indices",
            Semantic::BlendWeights => "blend_weights",
            Semantic::Normal => "normal",
            Semantic::Colour => "colour",
            Semantic::TexCoord => "texcoord",
            Semantic::Binormal => "binormal",
            Semantic::Tangent => "tangent",
        }
    }
}

/// What the value of a parameter means. Inputs, outputs and locals are
/// deduplicated by content, so two sub render states asking for the
/// view-space normal share one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Content {
    Unknown,
    PositionObjectSpace,
    PositionWorldSpace,
    PositionViewSpace,
    PositionProjectiveSpace,
    /// Position in the light space of shadow split `n`.
    PositionLightSpace(u32),
    NormalObjectSpace,
    NormalViewSpace,
    NormalTangentSpace,
    TangentObjectSpace,
    ColourDiffuse,
    ColourSpecular,
    TextureCoordinate(u32),
    /// Direction towards light slot `n`, tangent or object space.
    LightDirectionTextureSpace(u32),
    /// Vector from the vertex to light slot `n`, tangent or object space.
    PositionToLightTextureSpace(u32),
    PositionToCameraTextureSpace,
    DepthViewSpace,
    FogFactor,
}

/// Storage class of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Uniform,
    Input,
    Output,
    Local,
    Constant,
}

bitflags! {
    /// How often a uniform value changes.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Variability: u32 {
        const GLOBAL         = 1 << 0;
        const PER_OBJECT     = 1 << 1;
        const LIGHTS         = 1 << 2;
        const PASS_ITERATION = 1 << 3;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub stage: ShaderStage,
    pub scope: Scope,
    pub semantic: Semantic,
    pub index: u32,
    pub content: Content,
    pub const_type: GpuConstType,
    /// Engine-filled uniform and its index.
    pub auto: Option<(AutoConstant, u32)>,
    pub variability: Variability,
    /// Texture unit of a sampler uniform.
    pub sampler_register: Option<u32>,
    /// Literal value of a constant.
    pub value: [f32; 4],
}

impl Parameter {
    #[inline]
    #[must_use]
    pub fn is_uniform(&self) -> bool {
        self.scope == Scope::Uniform
    }

    #[inline]
    #[must_use]
    pub fn is_sampler(&self) -> bool {
        self.const_type.is_sampler()
    }

    /// Number of literal components of a constant.
    #[must_use]
    pub fn literal(&self) -> &[f32] {
        let count = self.const_type.component_count().clamp(1, 4);
        &self.value[..count]
    }
}
