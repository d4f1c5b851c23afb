//! Material-side data the runtime shader system reads and writes: materials,
//! techniques, passes, compiled program objects and per-pass parameter blocks.

pub mod gpu_params;
pub mod gpu_program;
pub mod material;
pub mod pass;

pub use gpu_params::{AutoBinding, GpuProgramParameters, UniformLayout, UniformSlot};
pub use gpu_program::GpuProgram;
pub use material::{DEFAULT_SCHEME, Material, MaterialLibrary, Technique};
pub use pass::{
    BoundProgram, FogMode, LayerBlend, LightIteration, Pass, PassPrograms, SurfaceProperties,
    TextureContent, TextureUnit, TrackVertexColour, VertexFeatures,
};
