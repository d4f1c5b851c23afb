//! Core types of the runtime shader system.
//!
//! Everything here is shared by the program IR, the sub render states and the
//! generator: the error type, deterministic structural hashing, the parameter
//! handle type, lights and engine-provided auto constants.

pub mod auto_param;
pub mod errors;
pub mod hash;
pub mod light;
pub mod types;

pub use auto_param::{AutoConstant, AutoParamDataSource, MAX_SHADOW_TEXTURES, Renderable};
pub use errors::{Result, ShaderGenError};
pub use hash::{StateHasher, combine_hashes, hash_type_name};
pub use light::{Attenuation, Light, LightKind, LightType, PointLight, SpotLight};
pub use types::{GpuConstType, ShaderStage};

use slotmap::new_key_type;

new_key_type! {
    /// Handle of a parameter inside a program set's arena.
    pub struct ParameterId;
}
