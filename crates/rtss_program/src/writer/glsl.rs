use std::borrow::Cow;

use rtss_core::{GpuConstType, Result, ShaderStage};

use super::{ProgramContext, ProgramWriter, ShaderLanguage, invocation_lines, literal_list, lookup, render};
use crate::parameter::{Content, Parameter, Scope, Semantic};
use crate::program_set::ProgramSet;

/// GLSL writer; the ES flavour switches to `attribute`/`varying` storage and
/// `gl_FragColor`.
#[derive(Debug, Clone)]
pub struct GlslWriter {
    version: u32,
    es: bool,
}

impl Default for GlslWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl GlslWriter {
    #[must_use]
    pub fn new() -> Self {
        Self { version: 150, es: false }
    }

    #[must_use]
    pub fn es() -> Self {
        Self { version: 100, es: true }
    }

    fn type_name(ty: GpuConstType) -> &'static str {
        match ty {
            GpuConstType::Float1 => "float",
            GpuConstType::Float2 => "vec2",
            GpuConstType::Float3 => "vec3",
            GpuConstType::Float4 => "vec4",
            GpuConstType::Int1 => "int",
            GpuConstType::Int2 => "ivec2",
            GpuConstType::Int3 => "ivec3",
            GpuConstType::Int4 => "ivec4",
            GpuConstType::Bool => "bool",
            GpuConstType::Matrix2x2 => "mat2",
            GpuConstType::Matrix3x3 => "mat3",
            GpuConstType::Matrix4x4 => "mat4",
            GpuConstType::Sampler2D => "sampler2D",
            GpuConstType::SamplerCube => "samplerCube",
            GpuConstType::Sampler2DShadow => "sampler2DShadow",
        }
    }

    fn attribute_name(param: &Parameter) -> Cow<'static, str> {
        match (param.semantic, param.index) {
            (Semantic::Position, _) => "vertex".into(),
            (Semantic::Normal, _) => "normal".into(),
            (Semantic::Tangent, _) => "tangent".into(),
            (Semantic::Binormal, _) => "binormal".into(),
            (Semantic::BlendIndices, _) => "blendIndices".into(),
            (Semantic::BlendWeights, _) => "blendWeights".into(),
            (Semantic::Colour, 0) => "colour".into(),
            (Semantic::Colour, _) => "secondary_colour".into(),
            (Semantic::TexCoord, index) => format!("uv{index}").into(),
            (Semantic::Unknown, _) => param.name.clone().into(),
        }
    }

    fn is_position_output(param: &Parameter) -> bool {
        param.stage == ShaderStage::Vertex
            && param.scope == Scope::Output
            && param.content == Content::PositionProjectiveSpace
    }

    /// Name a parameter is referred to by inside `main`.
    fn name_of<'a>(&self, param: &'a Parameter) -> Cow<'a, str> {
        match (param.stage, param.scope) {
            (_, Scope::Constant) => {
                let ty = Self::type_name(param.const_type);
                if param.const_type.component_count() == 1 {
                    literal_list(param).into()
                } else {
                    format!("{ty}({})", literal_list(param)).into()
                }
            }
            (ShaderStage::Vertex, Scope::Input) => Self::attribute_name(param),
            (ShaderStage::Vertex, Scope::Output) if Self::is_position_output(param) => "gl_Position".into(),
            (ShaderStage::Vertex, Scope::Output) | (ShaderStage::Fragment, Scope::Input) => {
                format!("v_{}{}", param.semantic.name(), param.index).into()
            }
            (ShaderStage::Fragment, Scope::Output) if self.es => "gl_FragColor".into(),
            (ShaderStage::Fragment, Scope::Output) => format!("fragColour{}", param.index).into(),
            _ => Cow::Borrowed(param.name.as_str()),
        }
    }

    fn declaration(&self, param: &Parameter) -> Option<String> {
        let ty = Self::type_name(param.const_type);
        let name = self.name_of(param);
        let qualifier = match (param.stage, param.scope) {
            (_, Scope::Uniform) => "uniform",
            (_, Scope::Local | Scope::Constant) => return Some(format!("{ty} {name}")),
            (ShaderStage::Vertex, Scope::Input) => {
                if self.es {
                    "attribute"
                } else {
                    "in"
                }
            }
            (ShaderStage::Vertex, Scope::Output) if Self::is_position_output(param) => return None,
            (ShaderStage::Fragment, Scope::Output) if self.es => return None,
            (ShaderStage::Fragment, Scope::Output) => "out",
            (ShaderStage::Vertex, Scope::Output) | (ShaderStage::Fragment, Scope::Input) => {
                if self.es {
                    "varying"
                } else if param.stage == ShaderStage::Vertex {
                    "out"
                } else {
                    "in"
                }
            }
        };
        Some(format!("{qualifier} {ty} {name}"))
    }
}

impl ProgramWriter for GlslWriter {
    fn language(&self) -> ShaderLanguage {
        if self.es { ShaderLanguage::GlslEs } else { ShaderLanguage::Glsl }
    }

    fn write(&self, set: &ProgramSet, stage: ShaderStage, program_name: &str) -> Result<String> {
        let program = set.program(stage);
        let entry = program.entry();

        let collect = |ids: &[rtss_core::ParameterId]| -> Result<Vec<String>> {
            let mut out = Vec::with_capacity(ids.len());
            for &id in ids {
                if let Some(decl) = self.declaration(lookup(set, id)?) {
                    out.push(decl);
                }
            }
            Ok(out)
        };

        let context = ProgramContext {
            name: program_name.to_owned(),
            stage: stage.name(),
            version: self.version,
            es: self.es,
            dependencies: program.dependencies().iter().map(|d| format!("{d}.glsl")).collect(),
            uniforms: collect(program.uniforms())?,
            inputs: collect(&entry.inputs)?,
            outputs: collect(&entry.outputs)?,
            locals: collect(&entry.locals)?,
            body: invocation_lines(set, stage, |p| self.name_of(p))?,
        };
        render("glsl", &context)
    }
}
