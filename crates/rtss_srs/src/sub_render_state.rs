//! Sub Render State Contract
//!
//! A sub render state (SRS) is one composable unit of shader behaviour. The
//! generator drives every SRS of a render state through the same protocol:
//!
//! ```text
//! pre_add_to_render_state   (per pass, may reject the SRS)
//!   -> resolve_parameters        (all SRSs, render state order)
//!   -> resolve_dependencies      (all SRSs)
//!   -> add_function_invocations  (execution order, stable)
//!   -> compile
//! update_gpu_programs_params     (every draw, no allocation)
//! ```
//!
//! Any `Err` aborts generation for the pass; nothing partially built is ever
//! handed to the compiler.

use std::any::Any;
use std::fmt;

use rtss_core::{
    AutoParamDataSource, Light, ParameterId, Renderable, Result, ShaderGenError, ShaderStage, hash_type_name,
};
use rtss_program::ProgramSet;
use rtss_resources::{GpuProgramParameters, Pass, SurfaceProperties, TextureUnit};
use smallvec::SmallVec;

use crate::script::ScriptWriter;

/// Per-stage invocation counter threaded through
/// [`SubRenderState::add_function_invocations`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InternalCounter {
    vertex: i32,
    fragment: i32,
}

impl InternalCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next internal order of `stage`.
    pub fn next(&mut self, stage: ShaderStage) -> i32 {
        let counter = match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Fragment => &mut self.fragment,
        };
        let value = *counter;
        *counter += 1;
        value
    }
}

/// Progress of one SRS through a generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationState {
    #[default]
    Created,
    ParametersResolved,
    DependenciesResolved,
    InvocationsAdded,
    Compiled,
    Failed,
}

/// Pass data visible to [`SubRenderState::pre_add_to_render_state`].
pub struct PreAddContext<'a> {
    /// Source pass the generated technique is derived from.
    pub pass: &'a Pass,
    /// Light count of the template render state.
    pub light_count: [u32; 3],
    texture_units: &'a mut SmallVec<[TextureUnit; 4]>,
}

impl<'a> PreAddContext<'a> {
    #[must_use]
    pub fn new(pass: &'a Pass, light_count: [u32; 3], texture_units: &'a mut SmallVec<[TextureUnit; 4]>) -> Self {
        Self {
            pass,
            light_count,
            texture_units,
        }
    }

    /// Stages an extra texture unit on the generated pass and returns its
    /// sampler register.
    pub fn add_texture_unit(&mut self, unit: TextureUnit) -> u32 {
        self.texture_units.push(unit);
        (self.texture_units.len() - 1) as u32
    }

    /// Texture units staged so far, source units first.
    #[must_use]
    pub fn texture_units(&self) -> &[TextureUnit] {
        self.texture_units
    }
}

/// A uniform handle together with the stage that declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageParam {
    pub stage: ShaderStage,
    pub id: ParameterId,
}

impl StageParam {
    #[must_use]
    pub fn new(stage: ShaderStage, id: ParameterId) -> Self {
        Self { stage, id }
    }
}

/// Per-draw inputs and the pass's writable parameter blocks.
pub struct ParamUpdateContext<'a> {
    pub renderable: &'a Renderable,
    pub source: &'a AutoParamDataSource,
    pub lights: &'a [Light],
    pub surface: &'a SurfaceProperties,
    vertex: Option<&'a mut GpuProgramParameters>,
    fragment: Option<&'a mut GpuProgramParameters>,
}

impl<'a> ParamUpdateContext<'a> {
    #[must_use]
    pub fn new(
        renderable: &'a Renderable,
        source: &'a AutoParamDataSource,
        lights: &'a [Light],
        surface: &'a SurfaceProperties,
        vertex: Option<&'a mut GpuProgramParameters>,
        fragment: Option<&'a mut GpuProgramParameters>,
    ) -> Self {
        Self {
            renderable,
            source,
            lights,
            surface,
            vertex,
            fragment,
        }
    }

    pub fn params(&mut self, stage: ShaderStage) -> Option<&mut GpuProgramParameters> {
        match stage {
            ShaderStage::Vertex => self.vertex.as_deref_mut(),
            ShaderStage::Fragment => self.fragment.as_deref_mut(),
        }
    }

    pub fn set_vec4(&mut self, param: StageParam, value: glam::Vec4) {
        if let Some(params) = self.params(param.stage) {
            params.set_vec4(param.id, value);
        }
    }

    pub fn set_vec3(&mut self, param: StageParam, value: glam::Vec3) {
        if let Some(params) = self.params(param.stage) {
            params.set_vec3(param.id, value);
        }
    }
}

/// Capability set shared by every shader building block.
pub trait SubRenderState: Any {
    /// Stable type string; used for factory lookup and scripts.
    fn type_name(&self) -> &'static str;

    /// Position of this SRS's code in the assembled programs.
    fn execution_order(&self) -> i32;

    /// Pure function of the configurable state.
    fn hash_code(&self) -> u64 {
        hash_type_name(self.type_name())
    }

    /// Copies configuration from an SRS of the same type.
    fn copy_from(&mut self, other: &dyn SubRenderState) -> Result<()>;

    /// Adapts the SRS to a pass. `Ok(false)` leaves it out of the pass.
    fn pre_add_to_render_state(&mut self, _ctx: &mut PreAddContext<'_>) -> Result<bool> {
        Ok(true)
    }

    fn resolve_parameters(&mut self, set: &mut ProgramSet) -> Result<()>;

    fn resolve_dependencies(&mut self, set: &mut ProgramSet) -> Result<()>;

    fn add_function_invocations(&mut self, set: &mut ProgramSet, counter: &mut InternalCounter) -> Result<()>;

    /// Pushes live values into the bound programs. Called for every draw.
    fn update_gpu_programs_params(&self, _ctx: &mut ParamUpdateContext<'_>) {}

    /// Applies one script property.
    fn set_parameter(&mut self, name: &str, _values: &[&str]) -> Result<()> {
        Err(ShaderGenError::InvalidParameters(format!(
            "{} has no parameter '{name}'",
            self.type_name()
        )))
    }

    /// Writes the properties [`SubRenderState::set_parameter`] understands.
    fn write_properties(&self, _writer: &mut ScriptWriter) {}

    fn clone_box(&self) -> Box<dyn SubRenderState>;

    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn SubRenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubRenderState")
            .field("type", &self.type_name())
            .field("execution_order", &self.execution_order())
            .finish_non_exhaustive()
    }
}

/// Downcasts `other` for [`SubRenderState::copy_from`], rejecting a
/// different type string.
pub fn same_type<'a, T: SubRenderState>(this: &dyn SubRenderState, other: &'a dyn SubRenderState) -> Result<&'a T> {
    if this.type_name() != other.type_name() {
        return Err(ShaderGenError::InvalidParameters(format!(
            "cannot copy '{}' into '{}'",
            other.type_name(),
            this.type_name()
        )));
    }
    other.as_any().downcast_ref::<T>().ok_or_else(|| {
        ShaderGenError::InvalidParameters(format!(
            "'{}' shares a type string with an unrelated implementation",
            other.type_name()
        ))
    })
}

pub(crate) fn unresolved(type_name: &str) -> ShaderGenError {
    ShaderGenError::Internal(format!("'{type_name}' emitted invocations before resolving parameters"))
}
