use std::borrow::Cow;

use rtss_core::{ParameterId, ShaderStage};

use crate::function::Function;

/// Shader program of one stage under construction.
#[derive(Debug, Clone)]
pub struct Program {
    stage: ShaderStage,
    pub(crate) uniforms: Vec<ParameterId>,
    dependencies: Vec<Cow<'static, str>>,
    pub(crate) entry: Function,
}

impl Program {
    #[must_use]
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            uniforms: Vec::new(),
            dependencies: Vec::new(),
            entry: Function::new("main"),
        }
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &[ParameterId] {
        &self.uniforms
    }

    /// Library dependencies in first-request order.
    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &[Cow<'static, str>] {
        &self.dependencies
    }

    pub fn add_dependency(&mut self, library: impl Into<Cow<'static, str>>) {
        let library = library.into();
        if !self.dependencies.contains(&library) {
            self.dependencies.push(library);
        }
    }

    #[inline]
    #[must_use]
    pub fn entry(&self) -> &Function {
        &self.entry
    }

    #[inline]
    pub fn entry_mut(&mut self) -> &mut Function {
        &mut self.entry
    }
}
