use std::fmt;

/// Programmable pipeline stage a generated program targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }

    /// Short prefix used in generated program names.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VS",
            ShaderStage::Fragment => "FS",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value type of a shader parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuConstType {
    Float1,
    Float2,
    Float3,
    Float4,
    Int1,
    Int2,
    Int3,
    Int4,
    Bool,
    Matrix2x2,
    Matrix3x3,
    Matrix4x4,
    Sampler2D,
    SamplerCube,
    Sampler2DShadow,
}

impl GpuConstType {
    #[inline]
    #[must_use]
    pub fn is_sampler(self) -> bool {
        matches!(self, Self::Sampler2D | Self::SamplerCube | Self::Sampler2DShadow)
    }

    /// Number of 4-component constant registers one value occupies.
    #[must_use]
    pub fn register_count(self) -> usize {
        match self {
            Self::Matrix2x2 => 2,
            Self::Matrix3x3 => 3,
            Self::Matrix4x4 => 4,
            Self::Sampler2D | Self::SamplerCube | Self::Sampler2DShadow => 0,
            _ => 1,
        }
    }

    /// Number of scalar components actually read by the shader.
    #[must_use]
    pub fn component_count(self) -> usize {
        match self {
            Self::Float1 | Self::Int1 | Self::Bool => 1,
            Self::Float2 | Self::Int2 => 2,
            Self::Float3 | Self::Int3 => 3,
            Self::Float4 | Self::Int4 | Self::Matrix2x2 => 4,
            Self::Matrix3x3 => 9,
            Self::Matrix4x4 => 16,
            Self::Sampler2D | Self::SamplerCube | Self::Sampler2DShadow => 0,
        }
    }
}
