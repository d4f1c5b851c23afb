//! Shader Generator
//!
//! [`ShaderGenerator`] owns the factory registry, the per-scheme render state
//! templates and the program cache. Materials stay with the caller and are
//! passed in by reference.
//!
//! # Lifecycle of a generated pass
//!
//! ```text
//! create_shader_based_technique   (registers the pass, marks it dirty)
//!   -> validate_scheme / notify_render_single_object
//!        build target render state -> hash -> cache hit or compile
//!        -> commit texture units, bind programs, release previous entry
//!   -> update_gpu_programs_params (every draw)
//! invalidate_*                    (marks dirty; regeneration stays lazy)
//! remove_shader_based_technique   (releases programs, drops the technique)
//! ```
//!
//! A pass whose generation fails keeps whatever programs it had bound before
//! and is not retried until it is invalidated.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use rtss_core::{AutoParamDataSource, Light, Renderable, Result, ShaderGenError};
use rtss_program::{MemoryCompiler, ShaderCompiler};
use rtss_resources::{BoundProgram, GpuProgram, GpuProgramParameters, MaterialLibrary, Pass, Technique, TextureUnit};
use rtss_srs::{GenerationState, ParamUpdateContext, RenderState, SubRenderStateFactory, SubRenderStateInstance};

use crate::builder::{assemble_program_set, build_target_render_state, compile_program_set};
use crate::cache::{CachedProgram, ProgramCache, ProgramHandle, ProgramKey};
use crate::registry::FactoryRegistry;
use crate::script::{parse_render_state, write_render_state};
use crate::settings::{ProfileKey, ShaderGeneratorSettings};

/// Per-draw inputs of [`ShaderGenerator::update_gpu_programs_params`].
#[derive(Debug, Clone, Copy)]
pub struct DrawContext<'a> {
    pub renderable: &'a Renderable,
    pub source: &'a AutoParamDataSource,
    /// Lights affecting the renderable, in scene order.
    pub lights: &'a [Light],
}

/// Running counters of a generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorStats {
    /// Program pairs handed to the compiler successfully.
    pub compiles: u64,
    /// Passes served by an already cached program pair.
    pub cache_hits: u64,
    /// Pass generations that failed.
    pub failures: u64,
}

#[derive(Debug, Default)]
struct PassEntry {
    custom: Option<RenderState>,
    program: Option<ProgramHandle>,
    dirty: bool,
    failed: bool,
}

#[derive(Debug)]
struct TechniqueEntry {
    material: String,
    source_scheme: String,
    passes: Vec<PassEntry>,
}

#[derive(Debug, Default)]
struct SchemeEntry {
    render_state: RenderState,
    techniques: Vec<TechniqueEntry>,
}

impl SchemeEntry {
    fn technique_index(&self, material: &str) -> Option<usize> {
        self.techniques.iter().position(|t| t.material == material)
    }
}

/// Runtime shader generator.
///
/// # Example
///
/// ```rust,ignore
/// let mut generator = ShaderGenerator::new(ShaderGeneratorSettings::default(), MemoryCompiler::new())?;
/// generator.create_shader_based_technique(&mut materials, "Rock", DEFAULT_SCHEME, "ShaderGen")?;
/// generator.validate_scheme(&mut materials, "ShaderGen")?;
/// ```
pub struct ShaderGenerator<C: ShaderCompiler = MemoryCompiler> {
    settings: ShaderGeneratorSettings,
    profile: ProfileKey,
    compiler: C,
    registry: FactoryRegistry,
    schemes: FxHashMap<String, SchemeEntry>,
    cache: ProgramCache,
    stats: GeneratorStats,
}

impl<C: ShaderCompiler> ShaderGenerator<C> {
    /// Creates a generator with every built-in factory registered.
    pub fn new(settings: ShaderGeneratorSettings, compiler: C) -> Result<Self> {
        settings.validate()?;
        let profile = settings.profile_key();
        log::info!(
            "Shader generator targeting {} ({} / {})",
            profile.language.name(),
            profile.vertex,
            profile.fragment
        );
        Ok(Self {
            settings,
            profile,
            compiler,
            registry: FactoryRegistry::with_builtins(),
            schemes: FxHashMap::default(),
            cache: ProgramCache::new(),
            stats: GeneratorStats::default(),
        })
    }

    // ─── Accessors ────────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ShaderGeneratorSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> GeneratorStats {
        self.stats
    }

    #[inline]
    #[must_use]
    pub fn cache(&self) -> &ProgramCache {
        &self.cache
    }

    #[inline]
    #[must_use]
    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    #[inline]
    pub fn compiler_mut(&mut self) -> &mut C {
        &mut self.compiler
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    // ─── Factories ────────────────────────────────────────────────────────────

    pub fn register_factory(&mut self, factory: Box<dyn SubRenderStateFactory>) -> Result<()> {
        self.registry.register(factory)
    }

    /// Fails with [`ShaderGenError::FactoryInUse`] while templates or cached
    /// programs still hold instances of the factory.
    pub fn remove_factory(&mut self, type_name: &str) -> Result<()> {
        self.registry.remove(type_name)
    }

    pub fn create_sub_render_state(&self, type_name: &str) -> Result<SubRenderStateInstance> {
        self.registry.create_instance(type_name)
    }

    pub fn destroy_sub_render_state(&self, instance: SubRenderStateInstance) -> Result<()> {
        self.registry.destroy_instance(instance)
    }

    // ─── Render state templates ───────────────────────────────────────────────

    /// Template render state of `scheme`, created on first access.
    ///
    /// Changes apply once the scheme is invalidated.
    pub fn render_state_mut(&mut self, scheme: &str) -> &mut RenderState {
        &mut self.schemes.entry(scheme.to_owned()).or_default().render_state
    }

    #[must_use]
    pub fn render_state(&self, scheme: &str) -> Option<&RenderState> {
        self.schemes.get(scheme).map(|s| &s.render_state)
    }

    /// Template render state of one generated pass, layered over the scheme
    /// template. The technique must have been created for `scheme`.
    pub fn pass_render_state_mut(&mut self, scheme: &str, material: &str, pass: usize) -> Result<&mut RenderState> {
        let entry = self.pass_entry_mut(scheme, material, pass)?;
        Ok(entry.custom.get_or_insert_with(RenderState::new))
    }

    /// Parses an `rtshader_system` script block with the registered factories.
    pub fn parse_script_block(&self, text: &str) -> Result<RenderState> {
        parse_render_state(&self.registry, text)
    }

    /// Script form of a pass template. A pass without one writes an empty
    /// block.
    pub fn serialize_pass_render_state(&self, scheme: &str, material: &str, pass: usize) -> Result<String> {
        let entry = self.pass_entry(scheme, material, pass)?;
        match &entry.custom {
            Some(custom) => write_render_state(&self.registry, custom),
            None => write_render_state(&self.registry, &RenderState::new()),
        }
    }

    pub fn serialize_scheme_render_state(&self, scheme: &str) -> Result<String> {
        let state = self.render_state(scheme).ok_or_else(|| scheme_not_found(scheme))?;
        write_render_state(&self.registry, state)
    }

    // ─── Shader based techniques ──────────────────────────────────────────────

    /// Adds a technique of `dst_scheme` to `material`, derived from its
    /// `src_scheme` technique. Programs are generated lazily.
    ///
    /// Returns `Ok(false)` when the material already has a `dst_scheme`
    /// technique or its source technique carries its own programs.
    pub fn create_shader_based_technique(
        &mut self,
        materials: &mut MaterialLibrary,
        material: &str,
        src_scheme: &str,
        dst_scheme: &str,
    ) -> Result<bool> {
        let target = materials
            .get_mut(material)
            .ok_or_else(|| ShaderGenError::ItemNotFound(format!("material '{material}'")))?;
        let source = target.technique(src_scheme).ok_or_else(|| {
            ShaderGenError::ItemNotFound(format!("technique '{src_scheme}' of material '{material}'"))
        })?;

        if target.technique(dst_scheme).is_some() {
            log::debug!("Material '{material}' already has a '{dst_scheme}' technique");
            return Ok(false);
        }
        if source.is_programmable() {
            log::debug!("Technique '{src_scheme}' of '{material}' is programmable, not generating");
            return Ok(false);
        }

        let mut technique = Technique::new(dst_scheme);
        technique.passes = source.passes.clone();
        technique.passes.iter_mut().for_each(Pass::clear_programs);
        let pass_count = technique.passes.len();
        target.techniques.push(technique);

        let scheme = self.schemes.entry(dst_scheme.to_owned()).or_default();
        scheme.techniques.push(TechniqueEntry {
            material: material.to_owned(),
            source_scheme: src_scheme.to_owned(),
            passes: (0..pass_count)
                .map(|_| PassEntry {
                    dirty: true,
                    ..Default::default()
                })
                .collect(),
        });
        log::debug!("Created '{dst_scheme}' technique for '{material}' ({pass_count} passes)");
        Ok(true)
    }

    /// Releases the programs of a generated technique and removes it from
    /// the material. Returns `Ok(false)` when no such technique was created.
    pub fn remove_shader_based_technique(
        &mut self,
        materials: &mut MaterialLibrary,
        material: &str,
        dst_scheme: &str,
    ) -> Result<bool> {
        let Some(scheme) = self.schemes.get_mut(dst_scheme) else {
            return Ok(false);
        };
        let Some(index) = scheme.technique_index(material) else {
            return Ok(false);
        };
        let technique = scheme.techniques.remove(index);

        if let Some(target) = materials.get_mut(material) {
            target.remove_technique(dst_scheme);
        }
        for handle in technique.passes.into_iter().filter_map(|p| p.program) {
            release_program(&mut self.cache, &mut self.compiler, handle);
        }
        log::debug!("Removed '{dst_scheme}' technique of '{material}'");
        Ok(true)
    }

    pub fn remove_all_shader_based_techniques(&mut self, materials: &mut MaterialLibrary) {
        let techniques: Vec<(String, String)> = self
            .schemes
            .iter()
            .flat_map(|(scheme, entry)| entry.techniques.iter().map(|t| (t.material.clone(), scheme.clone())))
            .collect();
        for (material, scheme) in techniques {
            if let Err(err) = self.remove_shader_based_technique(materials, &material, &scheme) {
                log::warn!("Failed to remove '{scheme}' technique of '{material}': {err}");
            }
        }
    }

    // ─── Validation & invalidation ────────────────────────────────────────────

    /// Generates every dirty pass of `scheme`. Failures are logged per pass
    /// and do not stop the others. Returns the number of passes with bound
    /// programs.
    pub fn validate_scheme(&mut self, materials: &mut MaterialLibrary, scheme: &str) -> Result<usize> {
        let entry = self.schemes.get(scheme).ok_or_else(|| scheme_not_found(scheme))?;
        let shape: Vec<usize> = entry.techniques.iter().map(|t| t.passes.len()).collect();

        let (mut bound, mut total) = (0, 0);
        for (technique, pass_count) in shape.into_iter().enumerate() {
            for pass in 0..pass_count {
                total += 1;
                if self.generate_pass(materials, scheme, technique, pass) {
                    bound += 1;
                }
            }
        }
        log::info!(
            "Validated scheme '{scheme}': {bound}/{total} passes bound, {} cached programs",
            self.cache.len()
        );
        Ok(bound)
    }

    /// Generates the dirty passes of one material. Returns whether every
    /// pass has programs bound.
    pub fn validate_material(&mut self, materials: &mut MaterialLibrary, scheme: &str, material: &str) -> Result<bool> {
        let (technique, pass_count) = {
            let entry = self.schemes.get(scheme).ok_or_else(|| scheme_not_found(scheme))?;
            let index = entry
                .technique_index(material)
                .ok_or_else(|| technique_not_found(scheme, material))?;
            (index, entry.techniques[index].passes.len())
        };
        let mut all_bound = true;
        for pass in 0..pass_count {
            all_bound &= self.generate_pass(materials, scheme, technique, pass);
        }
        Ok(all_bound)
    }

    pub fn invalidate_scheme(&mut self, scheme: &str) -> Result<()> {
        let entry = self.schemes.get_mut(scheme).ok_or_else(|| scheme_not_found(scheme))?;
        for pass in entry.techniques.iter_mut().flat_map(|t| t.passes.iter_mut()) {
            pass.dirty = true;
        }
        Ok(())
    }

    pub fn invalidate_material(&mut self, scheme: &str, material: &str) -> Result<()> {
        let entry = self.schemes.get_mut(scheme).ok_or_else(|| scheme_not_found(scheme))?;
        let index = entry
            .technique_index(material)
            .ok_or_else(|| technique_not_found(scheme, material))?;
        for pass in &mut entry.techniques[index].passes {
            pass.dirty = true;
        }
        Ok(())
    }

    pub fn invalidate_pass(&mut self, scheme: &str, material: &str, pass: usize) -> Result<()> {
        self.pass_entry_mut(scheme, material, pass)?.dirty = true;
        Ok(())
    }

    /// Whether the last generation attempt of a pass failed.
    pub fn pass_failed(&self, scheme: &str, material: &str, pass: usize) -> Result<bool> {
        Ok(self.pass_entry(scheme, material, pass)?.failed)
    }

    /// Cache handle of the program pair bound to a generated pass.
    #[must_use]
    pub fn pass_handle(&self, scheme: &str, material: &str, pass: usize) -> Option<ProgramHandle> {
        self.pass_entry(scheme, material, pass).ok()?.program
    }

    /// Cached program pair bound to a generated pass.
    #[must_use]
    pub fn pass_program(&self, scheme: &str, material: &str, pass: usize) -> Option<&CachedProgram> {
        self.cache.get(self.pass_handle(scheme, material, pass)?)
    }

    // ─── Per-draw ─────────────────────────────────────────────────────────────

    /// Pushes automatic constants and per-draw SRS values into the
    /// parameter blocks of a generated pass. Does nothing for a pass without
    /// programs.
    pub fn update_gpu_programs_params(
        &self,
        materials: &mut MaterialLibrary,
        scheme: &str,
        material: &str,
        pass: usize,
        draw: &DrawContext<'_>,
    ) -> Result<()> {
        let Some(handle) = self.pass_entry(scheme, material, pass)?.program else {
            return Ok(());
        };
        let program = self
            .cache
            .get(handle)
            .ok_or_else(|| ShaderGenError::Internal(format!("stale program handle on '{material}' pass {pass}")))?;
        let target = materials
            .pass_mut(material, scheme, pass)
            .ok_or_else(|| pass_not_found(scheme, material, pass))?;

        let (surface, mut vertex, mut fragment) = target.split_for_update();
        for params in [vertex.as_deref_mut(), fragment.as_deref_mut()].into_iter().flatten() {
            params.update_auto_params(draw.source, draw.renderable, surface);
        }
        let mut ctx = ParamUpdateContext::new(draw.renderable, draw.source, draw.lights, surface, vertex, fragment);
        for srs in program.target.sub_states() {
            srs.update_gpu_programs_params(&mut ctx);
        }
        Ok(())
    }

    /// Render-time hook: validates the pass if it is dirty, then updates its
    /// parameters.
    pub fn notify_render_single_object(
        &mut self,
        materials: &mut MaterialLibrary,
        scheme: &str,
        material: &str,
        pass: usize,
        draw: &DrawContext<'_>,
    ) -> Result<()> {
        if self.pass_entry(scheme, material, pass)?.dirty {
            let technique = self
                .schemes
                .get(scheme)
                .and_then(|entry| entry.technique_index(material))
                .ok_or_else(|| technique_not_found(scheme, material))?;
            self.generate_pass(materials, scheme, technique, pass);
        }
        self.update_gpu_programs_params(materials, scheme, material, pass, draw)
    }

    // ─── Teardown ─────────────────────────────────────────────────────────────

    /// Removes every generated technique, drops the templates and tears down
    /// the factories. Returns the compiler backend.
    ///
    /// # Panics
    /// Panics when sub render states created by the generator's factories
    /// are still alive outside of it.
    pub fn shutdown(mut self, materials: &mut MaterialLibrary) -> C {
        self.remove_all_shader_based_techniques(materials);
        self.schemes.clear();
        debug_assert!(self.cache.is_empty(), "programs outlived their techniques");
        self.registry.destroy_all();
        log::info!(
            "Shader generator shut down: {} compiles, {} cache hits, {} failures",
            self.stats.compiles,
            self.stats.cache_hits,
            self.stats.failures
        );
        self.compiler
    }

    // ─── Internals ────────────────────────────────────────────────────────────

    fn pass_entry(&self, scheme: &str, material: &str, pass: usize) -> Result<&PassEntry> {
        let entry = self.schemes.get(scheme).ok_or_else(|| scheme_not_found(scheme))?;
        let technique = entry
            .techniques
            .iter()
            .find(|t| t.material == material)
            .ok_or_else(|| technique_not_found(scheme, material))?;
        technique
            .passes
            .get(pass)
            .ok_or_else(|| pass_not_found(scheme, material, pass))
    }

    fn pass_entry_mut(&mut self, scheme: &str, material: &str, pass: usize) -> Result<&mut PassEntry> {
        let entry = self.schemes.get_mut(scheme).ok_or_else(|| scheme_not_found(scheme))?;
        let technique = entry
            .techniques
            .iter_mut()
            .find(|t| t.material == material)
            .ok_or_else(|| technique_not_found(scheme, material))?;
        technique
            .passes
            .get_mut(pass)
            .ok_or_else(|| pass_not_found(scheme, material, pass))
    }

    /// Regenerates one pass if it is dirty. Returns whether it ends up with
    /// programs bound.
    fn generate_pass(&mut self, materials: &mut MaterialLibrary, scheme: &str, technique: usize, pass: usize) -> bool {
        let Self {
            settings,
            profile,
            compiler,
            registry,
            schemes,
            cache,
            stats,
        } = self;
        let Some(scheme_entry) = schemes.get_mut(scheme) else {
            return false;
        };
        let SchemeEntry {
            render_state,
            techniques,
        } = scheme_entry;
        let Some(technique) = techniques.get_mut(technique) else {
            return false;
        };
        let Some(entry) = technique.passes.get_mut(pass) else {
            return false;
        };
        if !entry.dirty {
            return entry.program.is_some();
        }
        entry.dirty = false;

        let acquired = match materials.pass(&technique.material, &technique.source_scheme, pass) {
            Some(source) => GenerationJob {
                settings: &*settings,
                profile: &*profile,
                compiler: &mut *compiler,
                registry: &*registry,
                cache: &mut *cache,
                stats: &mut *stats,
            }
            .acquire(scheme, render_state, entry.custom.as_ref(), source),
            None => Err(pass_not_found(&technique.source_scheme, &technique.material, pass)),
        };
        let result = match acquired {
            Ok((handle, units)) => match bind_pass(materials, cache, scheme, &technique.material, pass, handle, units) {
                Ok(()) => Ok(handle),
                Err(err) => {
                    release_program(cache, compiler, handle);
                    Err(err)
                }
            },
            Err(err) => Err(err),
        };

        match result {
            Ok(handle) => {
                if let Some(previous) = entry.program.replace(handle) {
                    release_program(cache, compiler, previous);
                }
                entry.failed = false;
                true
            }
            Err(err) => {
                log::error!(
                    "Failed to generate '{scheme}' programs for '{}' pass {pass}: {err}",
                    technique.material
                );
                stats.failures += 1;
                entry.failed = true;
                entry.program.is_some()
            }
        }
    }
}

/// Borrowed generator state needed to produce one program pair.
struct GenerationJob<'a, C: ShaderCompiler> {
    settings: &'a ShaderGeneratorSettings,
    profile: &'a ProfileKey,
    compiler: &'a mut C,
    registry: &'a FactoryRegistry,
    cache: &'a mut ProgramCache,
    stats: &'a mut GeneratorStats,
}

impl<C: ShaderCompiler> GenerationJob<'_, C> {
    /// Returns a cache entry holding one new reference for this pass, plus
    /// the texture units the pass needs.
    fn acquire(
        &mut self,
        scheme: &str,
        template: &RenderState,
        custom: Option<&RenderState>,
        source: &Pass,
    ) -> Result<(ProgramHandle, SmallVec<[TextureUnit; 4]>)> {
        let mut build =
            build_target_render_state(self.registry, template, custom, source, self.settings.default_light_count)?;

        let limit = self.settings.limits.max_texture_units;
        if build.texture_units.len() > limit as usize {
            return Err(ShaderGenError::ResourceExhausted {
                stage: "fragment",
                resource: "texture units",
                limit: limit as usize,
            });
        }

        let key = ProgramKey {
            scheme: scheme.to_owned(),
            hash: build.hash_code(),
            profile: self.profile.clone(),
        };
        if let Some(handle) = self.cache.find(&key) {
            self.cache.acquire(handle);
            self.stats.cache_hits += 1;
            log::debug!("Program cache hit for '{}' ({:016x})", source.name, key.hash);
            return Ok((handle, build.texture_units));
        }

        log::debug!("Program cache miss for '{}' ({:016x})", source.name, key.hash);
        let set = assemble_program_set(&mut build.render_state, self.settings.limits)?;
        let programs = compile_program_set(&mut *self.compiler, &set, self.settings, self.profile, key.hash)?;
        for srs in build.render_state.sub_states_mut() {
            srs.set_state(GenerationState::Compiled);
        }
        self.stats.compiles += 1;

        let handle = self.cache.insert(CachedProgram::new(
            key,
            programs.vertex,
            programs.fragment,
            build.render_state,
        ));
        Ok((handle, build.texture_units))
    }
}

/// Publishes a cached program pair on the generated pass.
fn bind_pass(
    materials: &mut MaterialLibrary,
    cache: &ProgramCache,
    scheme: &str,
    material: &str,
    pass: usize,
    handle: ProgramHandle,
    texture_units: SmallVec<[TextureUnit; 4]>,
) -> Result<()> {
    let program = cache
        .get(handle)
        .ok_or_else(|| ShaderGenError::Internal("program vanished from the cache".into()))?;
    let target = materials
        .pass_mut(material, scheme, pass)
        .ok_or_else(|| pass_not_found(scheme, material, pass))?;

    let bind = |program: &Arc<GpuProgram>| BoundProgram {
        program: Arc::clone(program),
        params: GpuProgramParameters::new(Arc::clone(program.layout())),
    };
    target.texture_units = texture_units;
    target.bind_programs(bind(&program.vertex), bind(&program.fragment));
    Ok(())
}

fn release_program<C: ShaderCompiler + ?Sized>(cache: &mut ProgramCache, compiler: &mut C, handle: ProgramHandle) {
    if let Some(entry) = cache.release(handle) {
        log::debug!(
            "Releasing programs '{}' and '{}'",
            entry.vertex.name(),
            entry.fragment.name()
        );
        compiler.release(entry.vertex.handle());
        compiler.release(entry.fragment.handle());
    }
}

fn scheme_not_found(scheme: &str) -> ShaderGenError {
    ShaderGenError::ItemNotFound(format!("scheme '{scheme}'"))
}

fn technique_not_found(scheme: &str, material: &str) -> ShaderGenError {
    ShaderGenError::ItemNotFound(format!("'{scheme}' technique of material '{material}'"))
}

fn pass_not_found(scheme: &str, material: &str, pass: usize) -> ShaderGenError {
    ShaderGenError::ItemNotFound(format!("pass {pass} of the '{scheme}' technique of '{material}'"))
}

#[cfg(test)]
mod tests {
    use rtss_resources::{DEFAULT_SCHEME, Material};
    use rtss_srs::Lighting;

    use super::*;

    const SCHEME: &str = "ShaderGen";

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn library(names: &[&str]) -> MaterialLibrary {
        let mut materials = MaterialLibrary::new();
        for name in names {
            let mut pass = Pass::new("p0");
            pass.texture_units.push(TextureUnit::colour(format!("{name}.png"), 0));
            materials.insert(Material::new(*name).with_technique(Technique::new(DEFAULT_SCHEME).with_pass(pass)));
        }
        materials
    }

    fn generator() -> ShaderGenerator {
        ShaderGenerator::new(ShaderGeneratorSettings::default(), MemoryCompiler::new()).unwrap()
    }

    #[test]
    fn technique_creation_is_lazy() {
        init();
        let mut materials = library(&["Rock"]);
        let mut generator = generator();
        assert!(
            generator
                .create_shader_based_technique(&mut materials, "Rock", DEFAULT_SCHEME, SCHEME)
                .unwrap()
        );
        let pass = materials.pass("Rock", SCHEME, 0).unwrap();
        assert!(!pass.is_programmable());
        assert_eq!(generator.compiler().live_programs(), 0);

        assert_eq!(generator.validate_scheme(&mut materials, SCHEME).unwrap(), 1);
        assert!(materials.pass("Rock", SCHEME, 0).unwrap().programs.is_bound());
        assert_eq!(generator.compiler().live_programs(), 2);
    }

    #[test]
    fn technique_is_created_once() {
        let mut materials = library(&["Rock"]);
        let mut generator = generator();
        assert!(
            generator
                .create_shader_based_technique(&mut materials, "Rock", DEFAULT_SCHEME, SCHEME)
                .unwrap()
        );
        assert!(
            !generator
                .create_shader_based_technique(&mut materials, "Rock", DEFAULT_SCHEME, SCHEME)
                .unwrap()
        );
        assert_eq!(materials.get("Rock").unwrap().techniques.len(), 2);
    }

    #[test]
    fn unknown_items_are_reported() {
        let mut materials = library(&["Rock"]);
        let mut generator = generator();
        assert!(matches!(
            generator.create_shader_based_technique(&mut materials, "Sand", DEFAULT_SCHEME, SCHEME),
            Err(ShaderGenError::ItemNotFound(_))
        ));
        assert!(matches!(
            generator.create_shader_based_technique(&mut materials, "Rock", "Missing", SCHEME),
            Err(ShaderGenError::ItemNotFound(_))
        ));
        assert!(matches!(
            generator.invalidate_scheme("Missing"),
            Err(ShaderGenError::ItemNotFound(_))
        ));
        assert!(matches!(
            generator.pass_render_state_mut(SCHEME, "Rock", 0),
            Err(ShaderGenError::ItemNotFound(_))
        ));
    }

    #[test]
    fn programmable_sources_are_skipped() {
        let mut materials = library(&["Rock"]);
        let mut generator = generator();
        generator
            .create_shader_based_technique(&mut materials, "Rock", DEFAULT_SCHEME, SCHEME)
            .unwrap();
        generator.validate_scheme(&mut materials, SCHEME).unwrap();

        assert!(
            !generator
                .create_shader_based_technique(&mut materials, "Rock", SCHEME, "Other")
                .unwrap()
        );
    }

    #[test]
    fn updates_fill_auto_constants() {
        let mut materials = library(&["Rock"]);
        let mut generator = generator();
        generator
            .create_shader_based_technique(&mut materials, "Rock", DEFAULT_SCHEME, SCHEME)
            .unwrap();

        let lights = [Light::new_directional(1, glam::Vec3::NEG_Y, glam::Vec3::ONE)];
        let renderable = Renderable {
            world: glam::Mat4::from_translation(glam::Vec3::X),
        };
        let source = AutoParamDataSource::default();
        let draw = DrawContext {
            renderable: &renderable,
            source: &source,
            lights: &lights,
        };
        generator
            .notify_render_single_object(&mut materials, SCHEME, "Rock", 0, &draw)
            .unwrap();

        let pass = materials.pass("Rock", SCHEME, 0).unwrap();
        let vertex = pass.programs.vertex.as_ref().unwrap();
        assert!(vertex.params.data().iter().any(|&v| v != 0.0));
        assert_eq!(generator.stats().compiles, 1);
    }

    #[test]
    fn shutdown_releases_everything() {
        let mut materials = library(&["Rock", "Sand"]);
        let mut generator = generator();
        for name in ["Rock", "Sand"] {
            generator
                .create_shader_based_technique(&mut materials, name, DEFAULT_SCHEME, SCHEME)
                .unwrap();
        }
        let mut lighting = generator.create_sub_render_state(Lighting::PER_PIXEL_TYPE).unwrap();
        lighting.set_parameter("normalise_normals", &["on"]).unwrap();
        generator.render_state_mut(SCHEME).add(lighting);
        generator.validate_scheme(&mut materials, SCHEME).unwrap();

        let compiler = generator.shutdown(&mut materials);
        assert_eq!(compiler.live_programs(), 0);
        assert!(materials.get("Rock").unwrap().technique(SCHEME).is_none());
    }
}
