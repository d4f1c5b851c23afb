use std::any::Any;

use rtss_core::{AutoConstant, GpuConstType, ParameterId, Result, ShaderStage};
use rtss_program::{Content, FunctionInvocation, ProgramSet, Semantic};

use crate::factory::SubRenderStateFactory;
use crate::script::{ScriptProperty, ScriptWriter};
use crate::shader_lib::{func, group, lib, order};
use crate::sub_render_state::{InternalCounter, SubRenderState, same_type, unresolved};

/// Object space position to clip space.
#[derive(Debug, Clone, Default)]
pub struct Transform {
    params: Option<TransformParams>,
}

#[derive(Debug, Clone, Copy)]
struct TransformParams {
    world_view_proj: ParameterId,
    position_in: ParameterId,
    position_out: ParameterId,
}

impl Transform {
    pub const TYPE: &'static str = "FFP_Transform";
}

impl SubRenderState for Transform {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn execution_order(&self) -> i32 {
        order::FFP_TRANSFORM
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) -> Result<()> {
        same_type::<Self>(self, other)?;
        Ok(())
    }

    fn resolve_parameters(&mut self, set: &mut ProgramSet) -> Result<()> {
        let v = ShaderStage::Vertex;
        self.params = Some(TransformParams {
            world_view_proj: set.resolve_auto_uniform(v, AutoConstant::WorldViewProjMatrix, 0)?,
            position_in: super::vs_in_position(set)?,
            position_out: set.resolve_output(
                v,
                Semantic::Position,
                Some(0),
                Content::PositionProjectiveSpace,
                GpuConstType::Float4,
            )?,
        });
        Ok(())
    }

    fn resolve_dependencies(&mut self, set: &mut ProgramSet) -> Result<()> {
        set.add_dependency(ShaderStage::Vertex, lib::COMMON);
        set.add_dependency(ShaderStage::Vertex, lib::TRANSFORM);
        Ok(())
    }

    fn add_function_invocations(&mut self, set: &mut ProgramSet, counter: &mut InternalCounter) -> Result<()> {
        let params = self.params.ok_or_else(|| unresolved(Self::TYPE))?;
        let v = ShaderStage::Vertex;
        set.add_invocation(
            v,
            FunctionInvocation::new(func::TRANSFORM, group::VS_TRANSFORM, counter.next(v))
                .input(params.world_view_proj)
                .input(params.position_in)
                .output(params.position_out),
        );
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(Self::default())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `transform_stage ffp`
#[derive(Debug, Default)]
pub struct TransformFactory;

impl SubRenderStateFactory for TransformFactory {
    fn type_name(&self) -> &'static str {
        Transform::TYPE
    }

    fn create_instance_impl(&self) -> Box<dyn SubRenderState> {
        Box::new(Transform::default())
    }

    fn create_from_property(&self, property: &ScriptProperty) -> Result<Option<Box<dyn SubRenderState>>> {
        if property.name == "transform_stage" && property.value(0) == Some("ffp") {
            return Ok(Some(self.create_instance_impl()));
        }
        Ok(None)
    }

    fn write_instance(&self, _srs: &dyn SubRenderState, writer: &mut ScriptWriter) {
        writer.property("transform_stage", ["ffp"]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_single_transform_call() {
        let mut set = ProgramSet::default();
        let mut transform = Transform::default();
        let mut counter = InternalCounter::new();
        transform.resolve_parameters(&mut set).unwrap();
        transform.resolve_dependencies(&mut set).unwrap();
        transform.add_function_invocations(&mut set, &mut counter).unwrap();

        let calls = set.program(ShaderStage::Vertex).entry().invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function_name, func::TRANSFORM);
        assert!(set.validate().is_ok());
    }

    #[test]
    fn invocations_before_resolution_fail() {
        let mut set = ProgramSet::default();
        let mut counter = InternalCounter::new();
        assert!(Transform::default().add_function_invocations(&mut set, &mut counter).is_err());
    }
}
