use std::any::Any;

use smallvec::SmallVec;

use rtss_core::{GpuConstType, ParameterId, Result, ShaderStage, StateHasher};
use rtss_program::{Content, FunctionInvocation, OperandMask, ProgramSet, Varying};
use rtss_resources::{LayerBlend, TextureContent};

use crate::factory::SubRenderStateFactory;
use crate::script::{ScriptProperty, ScriptWriter};
use crate::shader_lib::{func, group, lib, order};
use crate::sub_render_state::{InternalCounter, PreAddContext, SubRenderState, same_type, unresolved};

/// Colour texture layer of the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layer {
    register: u32,
    texcoord_set: u32,
    blend: LayerBlend,
}

#[derive(Debug, Clone, Copy)]
struct LayerParams {
    sampler: ParameterId,
    texcoord_in: ParameterId,
    texcoord: Varying,
    texel: ParameterId,
}

/// Samples every colour texture unit of the pass and blends it into the
/// fragment colour.
#[derive(Debug, Clone, Default)]
pub struct Texturing {
    layers: SmallVec<[Layer; 4]>,
    params: SmallVec<[LayerParams; 4]>,
    ps_out: Option<ParameterId>,
}

impl Texturing {
    pub const TYPE: &'static str = "FFP_Texturing";

    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl SubRenderState for Texturing {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn execution_order(&self) -> i32 {
        order::FFP_TEXTURING
    }

    fn hash_code(&self) -> u64 {
        let mut hasher = StateHasher::for_type(Self::TYPE);
        hasher.write_u32(self.layers.len() as u32);
        for layer in &self.layers {
            hasher
                .write_u32(layer.register)
                .write_u32(layer.texcoord_set)
                .write_u32(layer.blend as u32);
        }
        hasher.digest()
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) -> Result<()> {
        self.layers.clone_from(&same_type::<Self>(self, other)?.layers);
        Ok(())
    }

    fn pre_add_to_render_state(&mut self, ctx: &mut PreAddContext<'_>) -> Result<bool> {
        self.layers = ctx
            .texture_units()
            .iter()
            .enumerate()
            .filter(|(_, unit)| unit.content == TextureContent::Colour)
            .map(|(register, unit)| Layer {
                register: register as u32,
                texcoord_set: unit.texcoord_set,
                blend: unit.blend,
            })
            .collect();
        Ok(!self.layers.is_empty())
    }

    fn resolve_parameters(&mut self, set: &mut ProgramSet) -> Result<()> {
        let f = ShaderStage::Fragment;
        self.params.clear();
        for (i, layer) in self.layers.iter().enumerate() {
            let sampler = set.resolve_sampler(f, GpuConstType::Sampler2D, "gTextureSampler", layer.register)?;
            let (texcoord_in, texcoord) = super::texcoord_varying(set, layer.texcoord_set)?;
            let texel = set.resolve_local(f, &format!("texel_{i}"), Content::Unknown, GpuConstType::Float4);
            self.params.push(LayerParams {
                sampler,
                texcoord_in,
                texcoord,
                texel,
            });
        }
        self.ps_out = Some(super::ps_out_colour(set)?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, set: &mut ProgramSet) -> Result<()> {
        set.add_dependency(ShaderStage::Vertex, lib::COMMON);
        set.add_dependency(ShaderStage::Fragment, lib::COMMON);
        set.add_dependency(ShaderStage::Fragment, lib::TEXTURING);
        Ok(())
    }

    fn add_function_invocations(&mut self, set: &mut ProgramSet, counter: &mut InternalCounter) -> Result<()> {
        let ps_out = self.ps_out.ok_or_else(|| unresolved(Self::TYPE))?;
        let (v, f) = (ShaderStage::Vertex, ShaderStage::Fragment);

        for (layer, params) in self.layers.iter().zip(&self.params) {
            super::assign_once(set, v, group::VS_TEXTURING, counter, params.texcoord_in, params.texcoord.vertex_out);
            set.add_invocation(
                f,
                FunctionInvocation::new(func::SAMPLE_TEXTURE, group::PS_SAMPLING, counter.next(f))
                    .input(params.sampler)
                    .input(params.texcoord.fragment_in)
                    .output(params.texel),
            );

            let blend = match layer.blend {
                LayerBlend::Modulate => FunctionInvocation::new(func::MODULATE, group::PS_TEXTURING, counter.next(f))
                    .input(params.texel)
                    .input(ps_out)
                    .output(ps_out),
                LayerBlend::ModulateX2 => {
                    FunctionInvocation::new(func::MODULATE_X2, group::PS_TEXTURING, counter.next(f))
                        .input(params.texel)
                        .input(ps_out)
                        .output(ps_out)
                }
                LayerBlend::Add => FunctionInvocation::new(func::ADD, group::PS_TEXTURING, counter.next(f))
                    .input_masked(params.texel, OperandMask::XYZ)
                    .input_masked(ps_out, OperandMask::XYZ)
                    .output_masked(ps_out, OperandMask::XYZ),
                LayerBlend::Replace => FunctionInvocation::new(func::ASSIGN, group::PS_TEXTURING, counter.next(f))
                    .input(params.texel)
                    .output(ps_out),
            };
            set.add_invocation(f, blend);
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(Self {
            layers: self.layers.clone(),
            ..Default::default()
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `texturing_stage ffp`
#[derive(Debug, Default)]
pub struct TexturingFactory;

impl SubRenderStateFactory for TexturingFactory {
    fn type_name(&self) -> &'static str {
        Texturing::TYPE
    }

    fn create_instance_impl(&self) -> Box<dyn SubRenderState> {
        Box::new(Texturing::default())
    }

    fn create_from_property(&self, property: &ScriptProperty) -> Result<Option<Box<dyn SubRenderState>>> {
        if property.name == "texturing_stage" && property.value(0) == Some("ffp") {
            return Ok(Some(self.create_instance_impl()));
        }
        Ok(None)
    }

    fn write_instance(&self, _srs: &dyn SubRenderState, writer: &mut ScriptWriter) {
        writer.property("texturing_stage", ["ffp"]);
    }
}
