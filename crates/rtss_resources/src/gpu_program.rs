use std::sync::Arc;

use rtss_core::ShaderStage;

use crate::gpu_params::UniformLayout;

/// A compiled GPU program object.
///
/// The handle is owned by the compiler backend; the generator releases it
/// through the backend once the last pass referencing it lets go.
#[derive(Debug)]
pub struct GpuProgram {
    name: String,
    stage: ShaderStage,
    profile: String,
    handle: u64,
    source: String,
    layout: Arc<UniformLayout>,
}

impl GpuProgram {
    #[must_use]
    pub fn new(
        name: String,
        stage: ShaderStage,
        profile: String,
        handle: u64,
        source: String,
        layout: Arc<UniformLayout>,
    ) -> Self {
        Self {
            name,
            stage,
            profile,
            handle,
            source,
            layout,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> u64 {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &Arc<UniformLayout> {
        &self.layout
    }
}
