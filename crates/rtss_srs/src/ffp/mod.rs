//! Fixed-function pipeline emulation stages.
//!
//! Together these reproduce the classic transform, vertex colour, texturing
//! and fog behaviour of a pass. Lighting lives in [`crate::lighting`].

mod colour;
mod fog;
mod texturing;
mod transform;

pub use colour::{Colour, ColourFactory};
pub use fog::{Fog, FogCalcMode, FogFactory};
pub use texturing::{Texturing, TexturingFactory};
pub use transform::{Transform, TransformFactory};

use rtss_core::{GpuConstType, ParameterId, Result, ShaderStage};
use rtss_program::{Content, FunctionInvocation, ProgramSet, Semantic};

pub(crate) fn vs_in_position(set: &mut ProgramSet) -> Result<ParameterId> {
    set.resolve_input(
        ShaderStage::Vertex,
        Semantic::Position,
        Some(0),
        Content::PositionObjectSpace,
        GpuConstType::Float4,
    )
}

pub(crate) fn vs_in_normal(set: &mut ProgramSet) -> Result<ParameterId> {
    set.resolve_input(
        ShaderStage::Vertex,
        Semantic::Normal,
        Some(0),
        Content::NormalObjectSpace,
        GpuConstType::Float3,
    )
}

pub(crate) fn vs_in_colour(set: &mut ProgramSet) -> Result<ParameterId> {
    set.resolve_input(
        ShaderStage::Vertex,
        Semantic::Colour,
        Some(0),
        Content::ColourDiffuse,
        GpuConstType::Float4,
    )
}

/// Final colour written by the fragment program.
pub(crate) fn ps_out_colour(set: &mut ProgramSet) -> Result<ParameterId> {
    set.resolve_output(
        ShaderStage::Fragment,
        Semantic::Colour,
        Some(0),
        Content::ColourDiffuse,
        GpuConstType::Float4,
    )
}

/// Interpolated vertex diffuse colour.
pub(crate) fn diffuse_varying(set: &mut ProgramSet) -> Result<rtss_program::Varying> {
    set.resolve_varying(Semantic::Colour, Some(0), Content::ColourDiffuse, GpuConstType::Float4)
}

/// Interpolated vertex specular colour.
pub(crate) fn specular_varying(set: &mut ProgramSet) -> Result<rtss_program::Varying> {
    set.resolve_varying(Semantic::Colour, Some(1), Content::ColourSpecular, GpuConstType::Float4)
}

/// Interpolated texture coordinate set `index`, fed from the matching vertex
/// attribute.
pub(crate) fn texcoord_varying(set: &mut ProgramSet, index: u32) -> Result<(ParameterId, rtss_program::Varying)> {
    let input = set.resolve_input(
        ShaderStage::Vertex,
        Semantic::TexCoord,
        Some(index),
        Content::TextureCoordinate(index),
        GpuConstType::Float2,
    )?;
    let varying = set.resolve_varying(
        Semantic::TexCoord,
        None,
        Content::TextureCoordinate(index),
        GpuConstType::Float2,
    )?;
    Ok((input, varying))
}

/// Emits `FFP_Assign(from, to)` unless something already writes `to`.
pub(crate) fn assign_once(
    set: &mut ProgramSet,
    stage: ShaderStage,
    group_order: i32,
    counter: &mut crate::InternalCounter,
    from: ParameterId,
    to: ParameterId,
) {
    let assign = FunctionInvocation::new(crate::shader_lib::func::ASSIGN, group_order, 0)
        .input(from)
        .output(to);
    add_once(set, stage, counter, assign);
}

/// Adds `invocation` unless an earlier invocation already writes one of its
/// outputs. Shared pass-through values (texture coordinates, depth) are
/// computed by whichever stage asks first.
pub(crate) fn add_once(
    set: &mut ProgramSet,
    stage: ShaderStage,
    counter: &mut crate::InternalCounter,
    mut invocation: FunctionInvocation,
) {
    let writes = |inv: &FunctionInvocation, param: ParameterId| {
        inv.operands.iter().any(|op| op.param == param && op.semantic.writes())
    };
    let written = set.program(stage).entry().invocations().iter().any(|existing| {
        invocation
            .operands
            .iter()
            .filter(|op| op.semantic.writes())
            .any(|op| writes(existing, op.param))
    });
    if !written {
        invocation.internal_order = counter.next(stage);
        set.add_invocation(stage, invocation);
    }
}
