//! Program Cache
//!
//! Generated programs are shared between every pass whose target render
//! state hashes to the same value. Entries are reference counted; the last
//! release hands the entry back so the caller can free the backend handles.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use rtss_resources::GpuProgram;
use rtss_srs::RenderState;

use crate::settings::ProfileKey;

new_key_type! {
    /// Handle of a cached program pair.
    pub struct ProgramHandle;
}

/// Identity of a generated program pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub scheme: String,
    pub hash: u64,
    pub profile: ProfileKey,
}

/// A compiled vertex/fragment pair and the target render state it was built
/// from. The render state drives per-draw parameter updates.
#[derive(Debug)]
pub struct CachedProgram {
    pub key: ProgramKey,
    pub vertex: Arc<GpuProgram>,
    pub fragment: Arc<GpuProgram>,
    pub target: RenderState,
    ref_count: u32,
}

impl CachedProgram {
    #[must_use]
    pub fn new(key: ProgramKey, vertex: Arc<GpuProgram>, fragment: Arc<GpuProgram>, target: RenderState) -> Self {
        Self {
            key,
            vertex,
            fragment,
            target,
            ref_count: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }
}

#[derive(Debug, Default)]
pub struct ProgramCache {
    entries: SlotMap<ProgramHandle, CachedProgram>,
    lookup: FxHashMap<ProgramKey, ProgramHandle>,
}

impl ProgramCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn find(&self, key: &ProgramKey) -> Option<ProgramHandle> {
        self.lookup.get(key).copied()
    }

    #[must_use]
    pub fn get(&self, handle: ProgramHandle) -> Option<&CachedProgram> {
        self.entries.get(handle)
    }

    /// Adds a freshly compiled entry holding one reference.
    ///
    /// # Panics
    /// Debug builds panic when the key is already cached.
    pub fn insert(&mut self, mut program: CachedProgram) -> ProgramHandle {
        debug_assert!(!self.lookup.contains_key(&program.key), "program cached twice");
        program.ref_count = 1;
        let key = program.key.clone();
        let handle = self.entries.insert(program);
        self.lookup.insert(key, handle);
        handle
    }

    /// Takes one more reference on a cached entry.
    pub fn acquire(&mut self, handle: ProgramHandle) -> bool {
        match self.entries.get_mut(handle) {
            Some(entry) => {
                entry.ref_count += 1;
                true
            }
            None => false,
        }
    }

    /// Drops one reference. Returns the entry once nothing references it.
    pub fn release(&mut self, handle: ProgramHandle) -> Option<CachedProgram> {
        let entry = self.entries.get_mut(handle)?;
        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            return None;
        }
        let entry = self.entries.remove(handle)?;
        self.lookup.remove(&entry.key);
        Some(entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProgramHandle, &CachedProgram)> {
        self.entries.iter()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rtss_core::ShaderStage;
    use rtss_program::ShaderLanguage;
    use rtss_resources::UniformLayout;

    use super::*;

    fn key(hash: u64) -> ProgramKey {
        ProgramKey {
            scheme: "Shader".into(),
            hash,
            profile: ProfileKey {
                language: ShaderLanguage::Glsl,
                vertex: "glsl150".into(),
                fragment: "glsl150".into(),
            },
        }
    }

    fn program(stage: ShaderStage, handle: u64) -> Arc<GpuProgram> {
        Arc::new(GpuProgram::new(
            format!("{}_{handle}", stage.prefix()),
            stage,
            "glsl150".into(),
            handle,
            "void main() {}".into(),
            Arc::new(UniformLayout::new()),
        ))
    }

    fn entry(hash: u64) -> CachedProgram {
        CachedProgram::new(
            key(hash),
            program(ShaderStage::Vertex, 1),
            program(ShaderStage::Fragment, 2),
            RenderState::new(),
        )
    }

    #[test]
    fn last_release_removes_entry() {
        let mut cache = ProgramCache::new();
        let handle = cache.insert(entry(7));
        assert!(cache.acquire(handle));
        assert_eq!(cache.get(handle).unwrap().ref_count(), 2);

        assert!(cache.release(handle).is_none());
        let removed = cache.release(handle).expect("second release frees the entry");
        assert_eq!(removed.key.hash, 7);
        assert!(cache.find(&key(7)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_differ_by_profile() {
        let mut cache = ProgramCache::new();
        cache.insert(entry(7));
        let mut other = key(7);
        other.profile.fragment = "glsl330".into();
        assert!(cache.find(&key(7)).is_some());
        assert!(cache.find(&other).is_none());
    }

    #[test]
    fn stale_handles_are_ignored() {
        let mut cache = ProgramCache::new();
        let handle = cache.insert(entry(1));
        cache.release(handle);
        assert!(!cache.acquire(handle));
        assert!(cache.release(handle).is_none());
    }
}
