use std::any::Any;

use glam::Vec4;
use smallvec::SmallVec;

use rtss_core::{AutoConstant, GpuConstType, ParameterId, Result, ShaderGenError, ShaderStage, StateHasher};
use rtss_program::{Content, FunctionInvocation, ProgramSet, Scope, Semantic, Varying, Variability};
use rtss_resources::{TextureContent, TextureUnit};

use super::{MAX_CASCADES, practical_split_points};
use crate::factory::SubRenderStateFactory;
use crate::script::{ScriptProperty, ScriptWriter, parse_bool, parse_f32};
use crate::shader_lib::{func, group, lib, order};
use crate::sub_render_state::{
    InternalCounter, ParamUpdateContext, PreAddContext, StageParam, SubRenderState, same_type, unresolved,
};

const V: ShaderStage = ShaderStage::Vertex;
const F: ShaderStage = ShaderStage::Fragment;

#[derive(Debug, Clone)]
struct Split {
    texture_view_proj: ParameterId,
    light_space: Varying,
    sampler: ParameterId,
    inverse_size: ParameterId,
}

#[derive(Debug, Clone)]
struct PssmParams {
    position_in: ParameterId,
    world_view_proj: ParameterId,
    depth: Varying,
    splits: SmallVec<[Split; MAX_CASCADES]>,
    split_points: StageParam,
    ambient: ParameterId,
    shadow_factor: ParameterId,
    ps_out: ParameterId,
    specular: Option<ParameterId>,
}

/// Parallel-split shadow map receiver evaluated inside the lit programs.
///
/// The camera frustum is cut at the split points; each slice samples its own
/// shadow texture, selected per fragment by depth. The resulting factor darkens
/// the lit diffuse colour down to the ambient term and scales specular.
#[derive(Debug, Clone)]
pub struct IntegratedPssm {
    split_points: SmallVec<[f32; MAX_CASCADES + 1]>,
    debug: bool,
    shadow_registers: SmallVec<[u32; MAX_CASCADES]>,
    params: Option<PssmParams>,
}

impl Default for IntegratedPssm {
    fn default() -> Self {
        Self {
            split_points: practical_split_points(3, 1.0, 1000.0, 0.95),
            debug: false,
            shadow_registers: SmallVec::new(),
            params: None,
        }
    }
}

impl IntegratedPssm {
    pub const TYPE: &'static str = "SGX_IntegratedPSSM3";

    /// Receiver for the given split points (`near, ..., far`).
    pub fn new(split_points: &[f32]) -> Result<Self> {
        let mut pssm = Self::default();
        pssm.set_split_points(split_points)?;
        Ok(pssm)
    }

    #[must_use]
    pub fn split_points(&self) -> &[f32] {
        &self.split_points
    }

    #[must_use]
    pub fn split_count(&self) -> usize {
        self.split_points.len() - 1
    }

    /// Replaces the split points. Between 2 and `MAX_CASCADES + 1` strictly
    /// increasing, non-negative distances.
    pub fn set_split_points(&mut self, points: &[f32]) -> Result<()> {
        if !(2..=MAX_CASCADES + 1).contains(&points.len()) {
            return Err(ShaderGenError::InvalidParameters(format!(
                "{} expects 2 to {} split points, got {}",
                Self::TYPE,
                MAX_CASCADES + 1,
                points.len()
            )));
        }
        let valid = points[0] >= 0.0 && points.iter().all(|p| p.is_finite()) && points.windows(2).all(|w| w[0] < w[1]);
        if !valid {
            return Err(ShaderGenError::InvalidParameters(format!(
                "{} split points must be non-negative and strictly increasing: {points:?}",
                Self::TYPE
            )));
        }
        self.split_points = points.iter().copied().collect();
        Ok(())
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Tints each split with its own colour.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Far distances of the splits, padded with the last one.
    fn split_vector(&self) -> Vec4 {
        let far = &self.split_points[1..];
        let last = far[far.len() - 1];
        let mut v = [last; MAX_CASCADES];
        v[..far.len()].copy_from_slice(far);
        Vec4::from_array(v)
    }
}

impl SubRenderState for IntegratedPssm {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn execution_order(&self) -> i32 {
        order::INTEGRATED_SHADOW
    }

    fn hash_code(&self) -> u64 {
        let mut hasher = StateHasher::for_type(Self::TYPE);
        hasher.write_u32(self.split_points.len() as u32).write_bool(self.debug);
        for point in &self.split_points {
            hasher.write_f32(*point);
        }
        for register in &self.shadow_registers {
            hasher.write_u32(*register);
        }
        hasher.digest()
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) -> Result<()> {
        let other = same_type::<Self>(self, other)?;
        self.split_points.clone_from(&other.split_points);
        self.debug = other.debug;
        self.shadow_registers.clone_from(&other.shadow_registers);
        Ok(())
    }

    fn pre_add_to_render_state(&mut self, ctx: &mut PreAddContext<'_>) -> Result<bool> {
        if !ctx.pass.lighting_enabled {
            return Ok(false);
        }
        self.shadow_registers = (0..self.split_count() as u32)
            .map(|split| {
                ctx.add_texture_unit(TextureUnit {
                    content: TextureContent::Shadow(split),
                    ..Default::default()
                })
            })
            .collect();
        Ok(true)
    }

    fn resolve_parameters(&mut self, set: &mut ProgramSet) -> Result<()> {
        let position_in = crate::ffp::vs_in_position(set)?;
        let world_view_proj = set.resolve_auto_uniform(V, AutoConstant::WorldViewProjMatrix, 0)?;
        let depth = set.resolve_varying(Semantic::TexCoord, None, Content::DepthViewSpace, GpuConstType::Float1)?;

        let mut splits = SmallVec::new();
        for (split, &register) in self.shadow_registers.iter().enumerate() {
            let index = split as u32;
            splits.push(Split {
                texture_view_proj: set.resolve_auto_uniform(V, AutoConstant::TextureViewProjMatrix, index)?,
                light_space: set.resolve_varying(
                    Semantic::TexCoord,
                    None,
                    Content::PositionLightSpace(index),
                    GpuConstType::Float4,
                )?,
                sampler: set.resolve_sampler(F, GpuConstType::Sampler2DShadow, "gShadowMap", register)?,
                inverse_size: set.resolve_auto_uniform(F, AutoConstant::InverseTextureSize, index)?,
            });
        }
        if splits.is_empty() {
            return Err(ShaderGenError::Internal(format!("{} has no staged shadow textures", Self::TYPE)));
        }

        let split_points = StageParam::new(
            F,
            set.resolve_uniform(F, GpuConstType::Float4, "pssm_split_points", Variability::GLOBAL)?,
        );
        self.params = Some(PssmParams {
            position_in,
            world_view_proj,
            depth,
            splits,
            split_points,
            ambient: set.resolve_auto_uniform(F, AutoConstant::DerivedAmbientLightColour, 0)?,
            shadow_factor: set.resolve_local(F, "lShadowFactor", Content::Unknown, GpuConstType::Float1),
            ps_out: crate::ffp::ps_out_colour(set)?,
            // Fragment-stage lighting leaves specular in a local.
            specular: set.find_by_content(F, Scope::Local, Content::ColourSpecular),
        });
        Ok(())
    }

    fn resolve_dependencies(&mut self, set: &mut ProgramSet) -> Result<()> {
        set.add_dependency(V, lib::COMMON);
        set.add_dependency(F, lib::COMMON);
        set.add_dependency(F, lib::INTEGRATED_PSSM);
        Ok(())
    }

    fn add_function_invocations(&mut self, set: &mut ProgramSet, counter: &mut InternalCounter) -> Result<()> {
        let params = self.params.as_ref().ok_or_else(|| unresolved(Self::TYPE))?;

        let depth = FunctionInvocation::new(func::PIXEL_FOG_DEPTH, group::VS_SHADOW, 0)
            .input(params.world_view_proj)
            .input(params.position_in)
            .output(params.depth.vertex_out);
        crate::ffp::add_once(set, V, counter, depth);

        for split in &params.splits {
            set.add_invocation(
                V,
                FunctionInvocation::new(func::TRANSFORM, group::VS_SHADOW, counter.next(V))
                    .input(split.texture_view_proj)
                    .input(params.position_in)
                    .output(split.light_space.vertex_out),
            );
        }

        let mut factor = FunctionInvocation::new(func::PSSM_SHADOW_FACTOR, group::PS_SHADOW, counter.next(F))
            .input(params.depth.fragment_in)
            .input(params.split_points.id);
        for split in &params.splits {
            factor = factor
                .input(split.light_space.fragment_in)
                .input(split.sampler)
                .input(split.inverse_size);
        }
        set.add_invocation(F, factor.output(params.shadow_factor));

        set.add_invocation(
            F,
            FunctionInvocation::new(func::APPLY_SHADOW_FACTOR, group::PS_SHADOW, counter.next(F))
                .input(params.ambient)
                .input(params.ps_out)
                .input(params.shadow_factor)
                .output(params.ps_out),
        );
        if let Some(specular) = params.specular {
            set.add_invocation(
                F,
                FunctionInvocation::new(func::MODULATE_SCALAR, group::PS_SHADOW, counter.next(F))
                    .input(params.shadow_factor)
                    .input(specular)
                    .output(specular),
            );
        }
        if self.debug {
            set.add_invocation(
                F,
                FunctionInvocation::new(func::PSSM_SPLIT_DEBUG, group::PS_SHADOW, counter.next(F))
                    .input(params.depth.fragment_in)
                    .input(params.split_points.id)
                    .in_out(params.ps_out),
            );
        }
        Ok(())
    }

    fn update_gpu_programs_params(&self, ctx: &mut ParamUpdateContext<'_>) {
        if let Some(params) = &self.params {
            ctx.set_vec4(params.split_points, self.split_vector());
        }
    }

    fn set_parameter(&mut self, name: &str, values: &[&str]) -> Result<()> {
        match (name, values) {
            ("split_points", points) => {
                let points = points.iter().map(|raw| parse_f32(raw)).collect::<Result<SmallVec<[f32; 5]>>>()?;
                self.set_split_points(&points)
            }
            ("debug", [raw]) => {
                self.debug = parse_bool(raw)?;
                Ok(())
            }
            _ => Err(ShaderGenError::InvalidParameters(format!(
                "{} has no parameter '{name}'",
                Self::TYPE
            ))),
        }
    }

    fn write_properties(&self, writer: &mut ScriptWriter) {
        if self.debug {
            writer.property("debug", ["on"]);
        }
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(Self {
            split_points: self.split_points.clone(),
            debug: self.debug,
            shadow_registers: self.shadow_registers.clone(),
            params: None,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `integrated_pssm <near> <split>... <far>`
#[derive(Debug, Default, Clone, Copy)]
pub struct IntegratedPssmFactory;

impl SubRenderStateFactory for IntegratedPssmFactory {
    fn type_name(&self) -> &'static str {
        IntegratedPssm::TYPE
    }

    fn create_instance_impl(&self) -> Box<dyn SubRenderState> {
        Box::<IntegratedPssm>::default()
    }

    fn create_from_property(&self, property: &ScriptProperty) -> Result<Option<Box<dyn SubRenderState>>> {
        if property.name != "integrated_pssm" {
            return Ok(None);
        }
        let points = (0..property.values.len())
            .map(|i| property.parse_f32(i))
            .collect::<Result<SmallVec<[f32; 5]>>>()?;
        let pssm = IntegratedPssm::new(&points).map_err(|e| property.error(e.to_string()))?;
        Ok(Some(Box::new(pssm)))
    }

    fn write_instance(&self, srs: &dyn SubRenderState, writer: &mut ScriptWriter) {
        if let Some(pssm) = srs.as_any().downcast_ref::<IntegratedPssm>() {
            writer.property("integrated_pssm", pssm.split_points());
            pssm.write_properties(writer);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rtss_core::{AutoParamDataSource, Renderable};
    use rtss_resources::{GpuProgramParameters, Pass, SurfaceProperties};

    use super::*;

    fn staged(pssm: &mut IntegratedPssm, pass: &Pass) -> SmallVec<[TextureUnit; 4]> {
        let mut units = pass.texture_units.clone();
        assert!(
            pssm.pre_add_to_render_state(&mut PreAddContext::new(pass, [1, 0, 0], &mut units))
                .unwrap()
        );
        units
    }

    fn build(pssm: &mut IntegratedPssm) -> ProgramSet {
        let mut set = ProgramSet::default();
        let mut counter = InternalCounter::new();
        pssm.resolve_parameters(&mut set).unwrap();
        pssm.resolve_dependencies(&mut set).unwrap();
        pssm.add_function_invocations(&mut set, &mut counter).unwrap();
        set
    }

    #[test]
    fn one_shadow_texture_per_split() {
        let mut pass = Pass::new("p");
        pass.texture_units.push(TextureUnit::colour("albedo.png", 0));
        let mut pssm = IntegratedPssm::new(&[1.0, 10.0, 50.0, 200.0]).unwrap();
        let units = staged(&mut pssm, &pass);

        assert_eq!(units.len(), 4);
        assert_eq!(units[1].content, TextureContent::Shadow(0));
        assert_eq!(units[3].content, TextureContent::Shadow(2));
        assert_eq!(pssm.shadow_registers.as_slice(), [1, 2, 3]);
    }

    #[test]
    fn unlit_passes_receive_no_shadows() {
        let mut pass = Pass::new("p");
        pass.lighting_enabled = false;
        let mut units = SmallVec::new();
        let kept = IntegratedPssm::default()
            .pre_add_to_render_state(&mut PreAddContext::new(&pass, [1, 0, 0], &mut units))
            .unwrap();
        assert!(!kept);
        assert!(units.is_empty());
    }

    #[test]
    fn emits_light_space_positions_and_shadow_factor() {
        let mut pssm = IntegratedPssm::new(&[1.0, 20.0, 100.0]).unwrap();
        staged(&mut pssm, &Pass::new("p"));
        let set = build(&mut pssm);

        let vertex: Vec<_> = set
            .program(V)
            .entry()
            .invocations()
            .iter()
            .map(|i| i.function_name.as_ref())
            .collect();
        assert_eq!(vertex, [func::PIXEL_FOG_DEPTH, func::TRANSFORM, func::TRANSFORM]);

        let fragment: Vec<_> = set
            .program(F)
            .entry()
            .invocations()
            .iter()
            .map(|i| i.function_name.as_ref())
            .collect();
        assert_eq!(fragment, [func::PSSM_SHADOW_FACTOR, func::APPLY_SHADOW_FACTOR]);
        assert!(
            set.find_by_content(F, Scope::Input, Content::PositionLightSpace(1))
                .is_some()
        );
    }

    #[test]
    fn split_points_are_validated() {
        assert!(IntegratedPssm::new(&[1.0]).is_err());
        assert!(IntegratedPssm::new(&[1.0, 5.0, 3.0]).is_err());
        assert!(IntegratedPssm::new(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).is_err());
        assert_eq!(IntegratedPssm::new(&[0.5, 4.0]).unwrap().split_count(), 1);
    }

    #[test]
    fn split_points_are_part_of_the_hash() {
        let a = IntegratedPssm::new(&[1.0, 10.0, 100.0]).unwrap();
        let b = IntegratedPssm::new(&[1.0, 20.0, 100.0]).unwrap();
        assert_ne!(a.hash_code(), b.hash_code());
        assert_eq!(a.hash_code(), a.clone_box().hash_code());
    }

    #[test]
    fn update_pushes_far_distances() {
        let mut pssm = IntegratedPssm::new(&[1.0, 10.0, 100.0]).unwrap();
        staged(&mut pssm, &Pass::new("p"));
        let set = build(&mut pssm);
        let mut fragment = GpuProgramParameters::new(Arc::new(set.uniform_layout(F)));

        let renderable = Renderable::default();
        let source = AutoParamDataSource::default();
        let surface = SurfaceProperties::default();
        let mut ctx = ParamUpdateContext::new(&renderable, &source, &[], &surface, None, Some(&mut fragment));
        pssm.update_gpu_programs_params(&mut ctx);

        let id = pssm.params.as_ref().unwrap().split_points.id;
        assert_eq!(fragment.get(id).unwrap(), [10.0, 100.0, 100.0, 100.0]);
    }

    #[test]
    fn script_round_trip() {
        let factory = IntegratedPssmFactory;
        let mut pssm = IntegratedPssm::new(&[0.1, 15.0, 60.0, 250.0]).unwrap();
        pssm.set_debug(true);

        let mut writer = ScriptWriter::new();
        factory.write_instance(&pssm, &mut writer);
        let text = writer.finish();
        let mut lines = text.lines().enumerate();

        let (_, head) = lines.next().unwrap();
        let mut parsed = factory
            .create_from_property(&ScriptProperty::parse_line(head, 1).unwrap())
            .unwrap()
            .unwrap();
        for (n, line) in lines {
            let prop = ScriptProperty::parse_line(line, n + 1).unwrap();
            parsed.set_parameter(&prop.name, &prop.value_refs()).unwrap();
        }
        assert_eq!(parsed.hash_code(), pssm.hash_code());
    }

    #[test]
    fn malformed_script_reports_line() {
        let err = IntegratedPssmFactory
            .create_from_property(&ScriptProperty::new("integrated_pssm", &["10", "5"], 7))
            .unwrap_err();
        assert!(matches!(err, ShaderGenError::Script { line: 7, .. }));
    }
}
