use std::any::Any;

use rtss_core::{AutoConstant, GpuConstType, ParameterId, Result, ShaderGenError, ShaderStage, StateHasher};
use rtss_program::{Content, FunctionInvocation, ProgramSet, Semantic, Varying};
use rtss_resources::FogMode;

use crate::factory::SubRenderStateFactory;
use crate::script::{ScriptProperty, ScriptWriter};
use crate::shader_lib::{func, group, lib, order};
use crate::sub_render_state::{InternalCounter, PreAddContext, SubRenderState, same_type, unresolved};

/// Where the fog factor is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FogCalcMode {
    #[default]
    PerVertex,
    PerPixel,
}

impl FogCalcMode {
    fn keyword(self) -> &'static str {
        match self {
            Self::PerVertex => "per_vertex",
            Self::PerPixel => "per_pixel",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "per_vertex" => Ok(Self::PerVertex),
            "per_pixel" => Ok(Self::PerPixel),
            _ => Err(ShaderGenError::InvalidParameters(format!("unknown fog calc mode '{raw}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FogParams {
    world_view_proj: ParameterId,
    position_in: ParameterId,
    fog_params: ParameterId,
    fog_colour: ParameterId,
    /// Fog factor (per vertex) or clip-space depth (per pixel).
    interpolated: Varying,
    ps_out: ParameterId,
}

/// Blends the fragment colour towards the fog colour with distance.
#[derive(Debug, Clone, Default)]
pub struct Fog {
    calc_mode: FogCalcMode,
    mode: FogMode,
    params: Option<FogParams>,
}

impl Fog {
    pub const TYPE: &'static str = "FFP_Fog";

    #[must_use]
    pub fn calc_mode(&self) -> FogCalcMode {
        self.calc_mode
    }

    pub fn set_calc_mode(&mut self, calc_mode: FogCalcMode) {
        self.calc_mode = calc_mode;
    }

    fn function(&self) -> &'static str {
        match (self.calc_mode, self.mode) {
            (FogCalcMode::PerVertex, FogMode::Exp) => func::FOG_EXP,
            (FogCalcMode::PerVertex, FogMode::Exp2) => func::FOG_EXP2,
            (FogCalcMode::PerVertex, _) => func::FOG_LINEAR,
            (FogCalcMode::PerPixel, FogMode::Exp) => func::PIXEL_FOG_EXP,
            (FogCalcMode::PerPixel, FogMode::Exp2) => func::PIXEL_FOG_EXP2,
            (FogCalcMode::PerPixel, _) => func::PIXEL_FOG_LINEAR,
        }
    }
}

impl SubRenderState for Fog {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn execution_order(&self) -> i32 {
        order::FFP_FOG
    }

    fn hash_code(&self) -> u64 {
        StateHasher::for_type(Self::TYPE)
            .write_u32(self.calc_mode as u32)
            .write_u32(self.mode as u32)
            .digest()
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) -> Result<()> {
        let other = same_type::<Self>(self, other)?;
        self.calc_mode = other.calc_mode;
        self.mode = other.mode;
        Ok(())
    }

    fn pre_add_to_render_state(&mut self, ctx: &mut PreAddContext<'_>) -> Result<bool> {
        self.mode = ctx.pass.fog;
        Ok(self.mode != FogMode::None)
    }

    fn resolve_parameters(&mut self, set: &mut ProgramSet) -> Result<()> {
        let (v, f) = (ShaderStage::Vertex, ShaderStage::Fragment);
        let fog_stage = match self.calc_mode {
            FogCalcMode::PerVertex => v,
            FogCalcMode::PerPixel => f,
        };
        let content = match self.calc_mode {
            FogCalcMode::PerVertex => Content::FogFactor,
            FogCalcMode::PerPixel => Content::DepthViewSpace,
        };
        self.params = Some(FogParams {
            world_view_proj: set.resolve_auto_uniform(v, AutoConstant::WorldViewProjMatrix, 0)?,
            position_in: super::vs_in_position(set)?,
            fog_params: set.resolve_auto_uniform(fog_stage, AutoConstant::FogParams, 0)?,
            fog_colour: set.resolve_auto_uniform(f, AutoConstant::FogColour, 0)?,
            interpolated: set.resolve_varying(Semantic::TexCoord, None, content, GpuConstType::Float1)?,
            ps_out: super::ps_out_colour(set)?,
        });
        Ok(())
    }

    fn resolve_dependencies(&mut self, set: &mut ProgramSet) -> Result<()> {
        set.add_dependency(ShaderStage::Vertex, lib::FOG);
        set.add_dependency(ShaderStage::Fragment, lib::COMMON);
        set.add_dependency(ShaderStage::Fragment, lib::FOG);
        Ok(())
    }

    fn add_function_invocations(&mut self, set: &mut ProgramSet, counter: &mut InternalCounter) -> Result<()> {
        let params = self.params.ok_or_else(|| unresolved(Self::TYPE))?;
        let (v, f) = (ShaderStage::Vertex, ShaderStage::Fragment);
        let fog_params = params.fog_params;

        match self.calc_mode {
            FogCalcMode::PerVertex => {
                set.add_invocation(
                    v,
                    FunctionInvocation::new(self.function(), group::VS_FOG, counter.next(v))
                        .input(params.world_view_proj)
                        .input(params.position_in)
                        .input(fog_params)
                        .output(params.interpolated.vertex_out),
                );
                set.add_invocation(
                    f,
                    FunctionInvocation::new(func::LERP_FOG, group::PS_FOG, counter.next(f))
                        .input(params.ps_out)
                        .input(params.fog_colour)
                        .input(params.interpolated.fragment_in)
                        .output(params.ps_out),
                );
            }
            FogCalcMode::PerPixel => {
                let depth = FunctionInvocation::new(func::PIXEL_FOG_DEPTH, group::VS_FOG, 0)
                    .input(params.world_view_proj)
                    .input(params.position_in)
                    .output(params.interpolated.vertex_out);
                super::add_once(set, v, counter, depth);
                set.add_invocation(
                    f,
                    FunctionInvocation::new(self.function(), group::PS_FOG, counter.next(f))
                        .input(params.interpolated.fragment_in)
                        .input(fog_params)
                        .input(params.fog_colour)
                        .input(params.ps_out)
                        .output(params.ps_out),
                );
            }
        }
        Ok(())
    }

    fn set_parameter(&mut self, name: &str, values: &[&str]) -> Result<()> {
        match (name, values) {
            ("calc_mode", [raw]) => {
                self.calc_mode = FogCalcMode::parse(raw)?;
                Ok(())
            }
            _ => Err(ShaderGenError::InvalidParameters(format!("{} has no parameter '{name}'", Self::TYPE))),
        }
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(Self {
            calc_mode: self.calc_mode,
            mode: self.mode,
            params: None,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `fog_stage ffp [per_vertex|per_pixel]`
#[derive(Debug, Default)]
pub struct FogFactory;

impl SubRenderStateFactory for FogFactory {
    fn type_name(&self) -> &'static str {
        Fog::TYPE
    }

    fn create_instance_impl(&self) -> Box<dyn SubRenderState> {
        Box::new(Fog::default())
    }

    fn create_from_property(&self, property: &ScriptProperty) -> Result<Option<Box<dyn SubRenderState>>> {
        if property.name != "fog_stage" || property.value(0) != Some("ffp") {
            return Ok(None);
        }
        let mut fog = Fog::default();
        if let Some(raw) = property.value(1) {
            fog.calc_mode = FogCalcMode::parse(raw).map_err(|e| property.error(e.to_string()))?;
        }
        Ok(Some(Box::new(fog)))
    }

    fn write_instance(&self, srs: &dyn SubRenderState, writer: &mut ScriptWriter) {
        let calc_mode = srs
            .as_any()
            .downcast_ref::<Fog>()
            .map(Fog::calc_mode)
            .unwrap_or_default();
        writer.property("fog_stage", ["ffp", calc_mode.keyword()]);
    }
}
