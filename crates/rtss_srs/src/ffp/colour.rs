use std::any::Any;

use rtss_core::{GpuConstType, ParameterId, Result, ShaderStage, StateHasher};
use rtss_program::{Content, FunctionInvocation, OperandMask, ProgramSet, Varying};
use rtss_resources::VertexFeatures;

use crate::factory::SubRenderStateFactory;
use crate::script::{ScriptProperty, ScriptWriter};
use crate::shader_lib::{func, group, lib, order};
use crate::sub_render_state::{InternalCounter, PreAddContext, SubRenderState, same_type, unresolved};

/// Vertex colour pass-through.
///
/// Seeds the fragment colour with the interpolated diffuse colour and, at the
/// end of the colour chain, adds whichever specular colour a lighting stage
/// produced.
#[derive(Debug, Clone, Default)]
pub struct Colour {
    use_vertex_colour: bool,
    params: Option<ColourParams>,
}

#[derive(Debug, Clone, Copy)]
struct ColourParams {
    vertex_source: ParameterId,
    diffuse: Varying,
    ps_out: ParameterId,
}

impl Colour {
    pub const TYPE: &'static str = "FFP_Colour";

    #[must_use]
    pub fn uses_vertex_colour(&self) -> bool {
        self.use_vertex_colour
    }
}

impl SubRenderState for Colour {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn execution_order(&self) -> i32 {
        order::FFP_COLOUR
    }

    fn hash_code(&self) -> u64 {
        StateHasher::for_type(Self::TYPE).write_bool(self.use_vertex_colour).digest()
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) -> Result<()> {
        self.use_vertex_colour = same_type::<Self>(self, other)?.use_vertex_colour;
        Ok(())
    }

    fn pre_add_to_render_state(&mut self, ctx: &mut PreAddContext<'_>) -> Result<bool> {
        self.use_vertex_colour = ctx.pass.vertex_features.contains(VertexFeatures::COLOUR);
        Ok(true)
    }

    fn resolve_parameters(&mut self, set: &mut ProgramSet) -> Result<()> {
        let vertex_source = if self.use_vertex_colour {
            super::vs_in_colour(set)?
        } else {
            set.constant(ShaderStage::Vertex, GpuConstType::Float4, [1.0; 4])
        };
        self.params = Some(ColourParams {
            vertex_source,
            diffuse: super::diffuse_varying(set)?,
            ps_out: super::ps_out_colour(set)?,
        });
        Ok(())
    }

    fn resolve_dependencies(&mut self, set: &mut ProgramSet) -> Result<()> {
        set.add_dependency(ShaderStage::Vertex, lib::COMMON);
        set.add_dependency(ShaderStage::Fragment, lib::COMMON);
        Ok(())
    }

    fn add_function_invocations(&mut self, set: &mut ProgramSet, counter: &mut InternalCounter) -> Result<()> {
        let params = self.params.ok_or_else(|| unresolved(Self::TYPE))?;
        let (v, f) = (ShaderStage::Vertex, ShaderStage::Fragment);

        set.add_invocation(
            v,
            FunctionInvocation::new(func::ASSIGN, group::VS_COLOUR, counter.next(v))
                .input(params.vertex_source)
                .output(params.diffuse.vertex_out),
        );
        set.add_invocation(
            f,
            FunctionInvocation::new(func::ASSIGN, group::PS_COLOUR_BEGIN, counter.next(f))
                .input(params.diffuse.fragment_in)
                .output(params.ps_out),
        );

        if let Some(specular) = set.find_readable(f, Content::ColourSpecular) {
            set.add_invocation(
                f,
                FunctionInvocation::new(func::ADD, group::PS_COLOUR_END, counter.next(f))
                    .input_masked(params.ps_out, OperandMask::XYZ)
                    .input_masked(specular, OperandMask::XYZ)
                    .output_masked(params.ps_out, OperandMask::XYZ),
            );
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(Self {
            use_vertex_colour: self.use_vertex_colour,
            params: None,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `colour_stage ffp`
#[derive(Debug, Default)]
pub struct ColourFactory;

impl SubRenderStateFactory for ColourFactory {
    fn type_name(&self) -> &'static str {
        Colour::TYPE
    }

    fn create_instance_impl(&self) -> Box<dyn SubRenderState> {
        Box::new(Colour::default())
    }

    fn create_from_property(&self, property: &ScriptProperty) -> Result<Option<Box<dyn SubRenderState>>> {
        if property.name == "colour_stage" && property.value(0) == Some("ffp") {
            return Ok(Some(self.create_instance_impl()));
        }
        Ok(None)
    }

    fn write_instance(&self, _srs: &dyn SubRenderState, writer: &mut ScriptWriter) {
        writer.property("colour_stage", ["ffp"]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtss_program::Semantic;
    use rtss_resources::Pass;
    use smallvec::SmallVec;

    fn build(colour: &mut Colour, set: &mut ProgramSet) {
        let mut counter = InternalCounter::new();
        colour.resolve_parameters(set).unwrap();
        colour.resolve_dependencies(set).unwrap();
        colour.add_function_invocations(set, &mut counter).unwrap();
    }

    #[test]
    fn vertex_colour_follows_geometry() {
        let mut pass = Pass::new("p");
        pass.vertex_features |= VertexFeatures::COLOUR;
        let mut units = SmallVec::new();
        let mut colour = Colour::default();
        assert!(colour.pre_add_to_render_state(&mut PreAddContext::new(&pass, [0; 3], &mut units)).unwrap());
        assert!(colour.uses_vertex_colour());

        let mut set = ProgramSet::default();
        build(&mut colour, &mut set);
        assert!(set.find_by_content(ShaderStage::Vertex, rtss_program::Scope::Input, Content::ColourDiffuse).is_some());
    }

    #[test]
    fn specular_is_added_when_present() {
        let mut set = ProgramSet::default();
        set.resolve_varying(Semantic::Colour, Some(1), Content::ColourSpecular, GpuConstType::Float4)
            .unwrap();
        let mut colour = Colour::default();
        build(&mut colour, &mut set);

        let calls = set.program(ShaderStage::Fragment).entry().invocations();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].function_name, func::ADD);
        assert_eq!(calls[1].group_order, group::PS_COLOUR_END);
    }

    #[test]
    fn hash_reflects_vertex_colour() {
        let plain = Colour::default();
        let tracked = Colour {
            use_vertex_colour: true,
            params: None,
        };
        assert_ne!(plain.hash_code(), tracked.hash_code());
    }
}
