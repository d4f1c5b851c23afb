#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

//! Runtime shader system.
//!
//! Generates vertex/fragment program pairs for material passes at runtime.
//! Each pass is described by a render state of composable sub render states
//! (transform, colour, lighting, texturing, fog, shadows); the generator
//! assembles them into a program set, writes GLSL, GLSL ES or HLSL source,
//! compiles it through a pluggable backend and shares the result between all
//! passes with the same structural hash.
//!
//! ```rust,ignore
//! use rtss::prelude::*;
//!
//! let mut generator = ShaderGenerator::new(ShaderGeneratorSettings::default(), MemoryCompiler::new())?;
//! let lighting = generator.create_sub_render_state(Lighting::PER_PIXEL_TYPE)?;
//! generator.render_state_mut("ShaderGen").add(lighting);
//! generator.create_shader_based_technique(&mut materials, "Rock", DEFAULT_SCHEME, "ShaderGen")?;
//! generator.validate_scheme(&mut materials, "ShaderGen")?;
//! ```

pub use glam;
pub use rtss_core;
pub use rtss_generator;
pub use rtss_program;
pub use rtss_resources;
pub use rtss_srs;

pub use rtss_core::{Result, ShaderGenError};
pub use rtss_generator::{DrawContext, ShaderGenerator, ShaderGeneratorSettings};

pub mod prelude {
    pub use rtss_core::{
        Attenuation, AutoParamDataSource, Light, LightType, Renderable, Result, ShaderGenError, ShaderStage,
    };
    pub use rtss_generator::{DrawContext, GeneratorStats, ShaderGenerator, ShaderGeneratorSettings};
    pub use rtss_program::{MemoryCompiler, ProgramSource, ShaderCompiler, ShaderLanguage};
    pub use rtss_resources::{
        DEFAULT_SCHEME, FogMode, LightIteration, Material, MaterialLibrary, Pass, SurfaceProperties, Technique,
        TextureUnit, VertexFeatures,
    };
    pub use rtss_srs::ffp::{Colour, Fog, Texturing, Transform};
    pub use rtss_srs::{
        IntegratedPssm, Lighting, RenderState, SubRenderState, SubRenderStateFactory, SubRenderStateInstance,
    };
}
