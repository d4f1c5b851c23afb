//! Sub render states of the runtime shader system.
//!
//! A [`RenderState`] is an ordered list of [`SubRenderState`]s. Each one
//! contributes parameters, library dependencies and function invocations to a
//! shared [`rtss_program::ProgramSet`]; together they describe one vertex and
//! one fragment program.
//!
//! Built-in states:
//!
//! | Module | States |
//! |--------|--------|
//! | [`ffp`] | transform, vertex colour, texturing, fog |
//! | [`lighting`] | per-vertex, per-pixel, normal map and Cook-Torrance lighting |
//! | [`shadow`] | integrated parallel-split shadow maps |

pub mod factory;
pub mod ffp;
pub mod lighting;
pub mod render_state;
pub mod script;
pub mod shader_lib;
pub mod shadow;
pub mod sub_render_state;

pub use factory::{FactoryEntry, SubRenderStateFactory, SubRenderStateInstance};
pub use lighting::{Lighting, LightingFactory, LightingKind, LightingModel, MAX_LIGHTS_PER_TYPE, NormalMapSpace};
pub use render_state::RenderState;
pub use script::{ScriptProperty, ScriptWriter};
pub use shadow::{IntegratedPssm, IntegratedPssmFactory};
pub use sub_render_state::{
    GenerationState, InternalCounter, ParamUpdateContext, PreAddContext, StageParam, SubRenderState,
};
