use std::borrow::Cow;

use rtss_core::{GpuConstType, ParameterId, Result, ShaderStage};

use super::{ProgramContext, ProgramWriter, ShaderLanguage, invocation_lines, literal_list, lookup, render};
use crate::parameter::{Parameter, Scope, Semantic};
use crate::program_set::ProgramSet;

/// Shader model 3 style HLSL: uniforms at file scope, interface parameters
/// as semantic-annotated arguments of `main`.
#[derive(Debug, Clone, Default)]
pub struct HlslWriter;

impl HlslWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn type_name(ty: GpuConstType) -> &'static str {
        match ty {
            GpuConstType::Float1 => "float",
            GpuConstType::Float2 => "float2",
            GpuConstType::Float3 => "float3",
            GpuConstType::Float4 => "float4",
            GpuConstType::Int1 => "int",
            GpuConstType::Int2 => "int2",
            GpuConstType::Int3 => "int3",
            GpuConstType::Int4 => "int4",
            GpuConstType::Bool => "bool",
            GpuConstType::Matrix2x2 => "float2x2",
            GpuConstType::Matrix3x3 => "float3x3",
            GpuConstType::Matrix4x4 => "float4x4",
            GpuConstType::Sampler2D | GpuConstType::Sampler2DShadow => "sampler2D",
            GpuConstType::SamplerCube => "samplerCUBE",
        }
    }

    fn semantic_name(param: &Parameter) -> Cow<'static, str> {
        let index = param.index;
        match param.semantic {
            Semantic::Position => "POSITION".into(),
            Semantic::Normal => "NORMAL".into(),
            Semantic::Tangent => "TANGENT".into(),
            Semantic::Binormal => "BINORMAL".into(),
            Semantic::BlendIndices => "BLENDINDICES".into(),
            Semantic::BlendWeights => "BLENDWEIGHT".into(),
            Semantic::Colour => format!("COLOR{index}").into(),
            Semantic::TexCoord => format!("TEXCOORD{index}").into(),
            Semantic::Unknown => format!("TEXCOORD{index}").into(),
        }
    }

    fn name_of(param: &Parameter) -> Cow<'_, str> {
        if param.scope == Scope::Constant {
            let ty = Self::type_name(param.const_type);
            if param.const_type.component_count() == 1 {
                return literal_list(param).into();
            }
            return format!("{ty}({})", literal_list(param)).into();
        }
        Cow::Borrowed(param.name.as_str())
    }

    fn declaration(param: &Parameter) -> String {
        let ty = Self::type_name(param.const_type);
        let name = &param.name;
        match param.scope {
            Scope::Uniform => match param.sampler_register {
                Some(register) => format!("{ty} {name} : register(s{register})"),
                None => format!("uniform {ty} {name}"),
            },
            Scope::Input => format!("in {ty} {name} : {}", Self::semantic_name(param)),
            Scope::Output => format!("out {ty} {name} : {}", Self::semantic_name(param)),
            Scope::Local | Scope::Constant => format!("{ty} {name}"),
        }
    }
}

impl ProgramWriter for HlslWriter {
    fn language(&self) -> ShaderLanguage {
        ShaderLanguage::Hlsl
    }

    fn write(&self, set: &ProgramSet, stage: ShaderStage, program_name: &str) -> Result<String> {
        let program = set.program(stage);
        let entry = program.entry();

        let collect = |ids: &[ParameterId]| -> Result<Vec<String>> {
            ids.iter()
                .map(|&id| lookup(set, id).map(Self::declaration))
                .collect()
        };

        let mut arguments = collect(&entry.inputs)?;
        arguments.extend(collect(&entry.outputs)?);

        let context = ProgramContext {
            name: program_name.to_owned(),
            stage: stage.name(),
            version: 3,
            es: false,
            dependencies: program.dependencies().iter().map(|d| format!("{d}.hlsl")).collect(),
            uniforms: collect(program.uniforms())?,
            inputs: arguments,
            outputs: Vec::new(),
            locals: collect(&entry.locals)?,
            body: invocation_lines(set, stage, Self::name_of)?,
        };
        render("hlsl", &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionInvocation;
    use crate::parameter::Content;

    #[test]
    fn interface_parameters_carry_semantics() {
        let mut set = ProgramSet::default();
        let f = ShaderStage::Fragment;
        let sampler = set.resolve_sampler(f, GpuConstType::Sampler2D, "gTextureSampler", 2).unwrap();
        let uv = set
            .resolve_input(f, Semantic::TexCoord, Some(1), Content::TextureCoordinate(0), GpuConstType::Float2)
            .unwrap();
        let colour = set
            .resolve_output(f, Semantic::Colour, Some(0), Content::ColourDiffuse, GpuConstType::Float4)
            .unwrap();
        let white = set.constant(f, GpuConstType::Float4, [1.0; 4]);
        set.add_invocation(f, FunctionInvocation::new("FFP_Assign", 100, 0).input(white).output(colour));
        set.add_invocation(
            f,
            FunctionInvocation::new("FFP_SampleTexture", 200, 0).input(sampler).input(uv).in_out(colour),
        );

        let source = HlslWriter::new().write(&set, f, "FS_test").unwrap();
        assert!(source.contains("sampler2D gTextureSampler2 : register(s2);"));
        assert!(source.contains("in float2 in_texcoord1 : TEXCOORD1,"));
        assert!(source.contains("out float4 out_colour0 : COLOR0"));
        assert!(source.contains("FFP_Assign(float4(1.0, 1.0, 1.0, 1.0), out_colour0);"));
        let assign = source.find("FFP_Assign").unwrap();
        let sample = source.find("FFP_SampleTexture").unwrap();
        assert!(assign < sample);
    }
}
