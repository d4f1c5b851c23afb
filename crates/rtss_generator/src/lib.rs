//! Runtime shader generator.
//!
//! Derives vertex/fragment program pairs for material passes from composable
//! sub render states, caches them by structural hash and keeps their
//! parameters up to date every draw.
//!
//! | Module | Role |
//! |--------|------|
//! | [`generator`] | [`ShaderGenerator`] context: schemes, techniques, invalidation, per-draw updates |
//! | [`builder`] | Target render state assembly, program set resolution, compilation |
//! | [`cache`] | Reference counted program cache keyed by scheme, hash and profile |
//! | [`registry`] | Sub render state factories |
//! | [`script`] | `rtshader_system` script blocks |
//! | [`settings`] | [`ShaderGeneratorSettings`] |

pub mod builder;
pub mod cache;
pub mod generator;
pub mod registry;
pub mod script;
pub mod settings;

pub use builder::{BUILTIN_STAGES, TargetBuild, build_target_render_state};
pub use cache::{CachedProgram, ProgramCache, ProgramHandle, ProgramKey};
pub use generator::{DrawContext, GeneratorStats, ShaderGenerator};
pub use registry::FactoryRegistry;
pub use settings::{ProfileKey, ShaderGeneratorSettings};
