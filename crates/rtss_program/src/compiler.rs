//! Compiler Backend Seam
//!
//! The native shader compiler is an external collaborator. The generator only
//! needs two operations from it: turn source text into a program handle, and
//! release that handle once no pass uses it anymore.

use rustc_hash::FxHashMap;

use rtss_core::{Result, ShaderGenError, ShaderStage};

use crate::writer::ShaderLanguage;

/// One compile request.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSource<'a> {
    pub name: &'a str,
    pub stage: ShaderStage,
    pub language: ShaderLanguage,
    pub profile: &'a str,
    pub source: &'a str,
}

pub trait ShaderCompiler {
    /// Compiles `request`, returning a backend handle.
    fn compile(&mut self, request: &ProgramSource<'_>) -> Result<u64>;

    /// Releases a handle previously returned by [`ShaderCompiler::compile`].
    fn release(&mut self, handle: u64);
}

/// Backend that keeps sources in memory instead of compiling them.
///
/// Useful headless (tools, tests, offline source dumps). Rejects empty
/// sources so that a writer bug still surfaces as a compile failure.
#[derive(Debug, Default)]
pub struct MemoryCompiler {
    next_handle: u64,
    live: FxHashMap<u64, String>,
}

impl MemoryCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles not yet released.
    #[must_use]
    pub fn live_programs(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn source(&self, handle: u64) -> Option<&str> {
        self.live.get(&handle).map(String::as_str)
    }
}

impl ShaderCompiler for MemoryCompiler {
    fn compile(&mut self, request: &ProgramSource<'_>) -> Result<u64> {
        if request.source.trim().is_empty() {
            return Err(ShaderGenError::CompileFailed {
                program: request.name.to_owned(),
                message: "empty source".into(),
            });
        }
        self.next_handle += 1;
        self.live.insert(self.next_handle, request.source.to_owned());
        log::debug!(
            "Stored {} program '{}' ({}, {} bytes) as handle {}",
            request.stage,
            request.name,
            request.profile,
            request.source.len(),
            self.next_handle
        );
        Ok(self.next_handle)
    }

    fn release(&mut self, handle: u64) {
        if self.live.remove(&handle).is_none() {
            log::warn!("Released unknown program handle {handle}");
        }
    }
}
