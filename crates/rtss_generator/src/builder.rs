//! Target Render State Assembly
//!
//! Turns a source pass plus the scheme and pass templates into the target
//! render state of the generated pass, assembles its program set and hands
//! the written sources to the compiler backend.
//!
//! ```text
//! build_target_render_state   (built-ins + templates, pre_add, stable sort)
//!   -> assemble_program_set   (resolve parameters, dependencies, invocations, pack varyings)
//!   -> compile_program_set    (write sources, compile both stages)
//! ```

use std::path::Path;
use std::sync::Arc;

use smallvec::SmallVec;

use rtss_core::{Result, ShaderStage};
use rtss_program::{ProgramLimits, ProgramSet, ProgramSource, ShaderCompiler, writer_for};
use rtss_resources::{GpuProgram, Pass, TextureUnit};
use rtss_srs::ffp::{Colour, Fog, Texturing, Transform};
use rtss_srs::{GenerationState, InternalCounter, Lighting, PreAddContext, RenderState, SubRenderStateInstance};

use crate::registry::FactoryRegistry;
use crate::settings::{ProfileKey, ShaderGeneratorSettings};

/// Fixed-function stages every target render state starts from.
pub const BUILTIN_STAGES: [&str; 5] = [
    Transform::TYPE,
    Colour::TYPE,
    Lighting::FFP_TYPE,
    Texturing::TYPE,
    Fog::TYPE,
];

/// Result of [`build_target_render_state`].
#[derive(Debug)]
pub struct TargetBuild {
    pub render_state: RenderState,
    /// Texture units the generated pass needs: source units first, then
    /// the units staged by the sub render states. Committed only once the
    /// programs compiled.
    pub texture_units: SmallVec<[TextureUnit; 4]>,
}

impl TargetBuild {
    /// Cache hash of the target render state.
    #[must_use]
    pub fn hash_code(&self) -> u64 {
        self.render_state.hash_code()
    }
}

/// Light count used for a pass: the pass template's if set, then the
/// scheme's, then the configured default.
#[must_use]
pub fn effective_light_count(scheme: &RenderState, custom: Option<&RenderState>, default: [u32; 3]) -> [u32; 3] {
    custom
        .map(RenderState::light_count)
        .into_iter()
        .chain([scheme.light_count()])
        .find(|count| count.iter().any(|&c| c > 0))
        .unwrap_or(default)
}

struct Candidate {
    primary: SubRenderStateInstance,
    /// Built-in stage the primary replaced; used when the primary rejects
    /// the pass.
    fallback: Option<SubRenderStateInstance>,
}

/// Builds the target render state of `pass`.
///
/// Templates of the pass override templates of the scheme with the same
/// type. A template sharing the execution order of a built-in stage replaces
/// it; should the template reject the pass, the built-in is used instead.
pub fn build_target_render_state(
    registry: &FactoryRegistry,
    scheme: &RenderState,
    custom: Option<&RenderState>,
    pass: &Pass,
    default_light_count: [u32; 3],
) -> Result<TargetBuild> {
    let light_count = effective_light_count(scheme, custom, default_light_count);

    let mut templates = scheme.clone();
    if let Some(custom) = custom {
        for srs in custom.sub_states() {
            templates.add(srs.duplicate());
        }
    }
    let mut templates = templates.take_all();

    let mut candidates: Vec<Candidate> = Vec::with_capacity(BUILTIN_STAGES.len() + templates.len());
    for type_name in BUILTIN_STAGES {
        let Some(entry) = registry.get(type_name) else {
            log::debug!("Built-in stage '{type_name}' is not registered, skipping");
            continue;
        };
        let builtin = entry.create_instance();
        let order = builtin.execution_order();
        let candidate = match templates.iter().position(|t| t.execution_order() == order) {
            Some(at) => Candidate {
                primary: templates.remove(at),
                fallback: Some(builtin),
            },
            None => Candidate {
                primary: builtin,
                fallback: None,
            },
        };
        candidates.push(candidate);
    }
    candidates.extend(templates.into_iter().map(|primary| Candidate {
        primary,
        fallback: None,
    }));
    candidates.sort_by_key(|c| c.primary.execution_order());

    let mut texture_units = pass.texture_units.clone();
    let mut render_state = RenderState::new();
    render_state.set_light_count(light_count);

    for Candidate { primary, fallback } in candidates {
        if let Some(srs) = admit(primary, pass, light_count, &mut texture_units)? {
            render_state.push(srs);
            continue;
        }
        if let Some(fallback) = fallback {
            log::debug!(
                "Pass '{}' falls back to built-in '{}'",
                pass.name,
                fallback.type_name()
            );
            if let Some(srs) = admit(fallback, pass, light_count, &mut texture_units)? {
                render_state.push(srs);
            }
        }
    }
    render_state.sort_by_execution_order();

    Ok(TargetBuild {
        render_state,
        texture_units,
    })
}

/// Runs `pre_add_to_render_state`. Units staged by a rejecting SRS are
/// withdrawn.
fn admit(
    mut srs: SubRenderStateInstance,
    pass: &Pass,
    light_count: [u32; 3],
    texture_units: &mut SmallVec<[TextureUnit; 4]>,
) -> Result<Option<SubRenderStateInstance>> {
    let staged = texture_units.len();
    let accepted = srs.pre_add_to_render_state(&mut PreAddContext::new(pass, light_count, texture_units))?;
    if accepted {
        Ok(Some(srs))
    } else {
        texture_units.truncate(staged);
        Ok(None)
    }
}

// ─── Program assembly ─────────────────────────────────────────────────────────

/// Drives every SRS of `render_state` through parameter, dependency and
/// invocation resolution and returns the validated program set.
///
/// `render_state` must already be sorted by execution order.
pub fn assemble_program_set(render_state: &mut RenderState, limits: ProgramLimits) -> Result<ProgramSet> {
    let mut set = ProgramSet::new(limits);

    run_phase(render_state, GenerationState::ParametersResolved, |srs| {
        srs.resolve_parameters(&mut set)
    })?;
    run_phase(render_state, GenerationState::DependenciesResolved, |srs| {
        srs.resolve_dependencies(&mut set)
    })?;

    let mut counter = InternalCounter::new();
    run_phase(render_state, GenerationState::InvocationsAdded, |srs| {
        srs.add_function_invocations(&mut set, &mut counter)
    })?;

    set.compact_varyings()?;
    set.sort_invocations();
    set.validate()?;
    Ok(set)
}

fn run_phase(
    render_state: &mut RenderState,
    done: GenerationState,
    mut phase: impl FnMut(&mut SubRenderStateInstance) -> Result<()>,
) -> Result<()> {
    for srs in render_state.sub_states_mut() {
        if let Err(err) = phase(srs) {
            log::warn!("'{}' failed while reaching {done:?}: {err}", srs.type_name());
            srs.set_state(GenerationState::Failed);
            return Err(err);
        }
        srs.set_state(done);
    }
    Ok(())
}

// ─── Compilation ──────────────────────────────────────────────────────────────

/// A compiled vertex/fragment pair.
#[derive(Debug)]
pub struct CompiledPrograms {
    pub vertex: Arc<GpuProgram>,
    pub fragment: Arc<GpuProgram>,
}

/// Name of a generated program.
#[must_use]
pub fn program_name(stage: ShaderStage, hash: u64) -> String {
    format!("{}_{hash:016x}", stage.prefix())
}

/// Writes both stages of `set` and compiles them. A vertex program is never
/// left behind in the backend when its fragment partner fails.
pub fn compile_program_set<C: ShaderCompiler + ?Sized>(
    compiler: &mut C,
    set: &ProgramSet,
    settings: &ShaderGeneratorSettings,
    profile: &ProfileKey,
    hash: u64,
) -> Result<CompiledPrograms> {
    let writer = writer_for(settings.language);

    let vertex = compile_stage(compiler, set, &*writer, settings, &profile.vertex, ShaderStage::Vertex, hash)?;
    let fragment = match compile_stage(
        compiler,
        set,
        &*writer,
        settings,
        &profile.fragment,
        ShaderStage::Fragment,
        hash,
    ) {
        Ok(fragment) => fragment,
        Err(err) => {
            compiler.release(vertex.handle());
            return Err(err);
        }
    };

    Ok(CompiledPrograms {
        vertex: Arc::new(vertex),
        fragment: Arc::new(fragment),
    })
}

fn compile_stage<C: ShaderCompiler + ?Sized>(
    compiler: &mut C,
    set: &ProgramSet,
    writer: &dyn rtss_program::ProgramWriter,
    settings: &ShaderGeneratorSettings,
    profile: &str,
    stage: ShaderStage,
    hash: u64,
) -> Result<GpuProgram> {
    let name = program_name(stage, hash);
    let source = match &settings.shader_cache_path {
        Some(dir) => cached_source(dir, &name, settings.language.name(), || writer.write(set, stage, &name))?,
        None => writer.write(set, stage, &name)?,
    };
    if settings.log_generated_source {
        log::debug!("Generated {stage} program '{name}':\n{source}");
    }

    let request = ProgramSource {
        name: &name,
        stage,
        language: settings.language,
        profile,
        source: &source,
    };
    let handle = compiler.compile(&request).inspect_err(|err| {
        log::error!("{err}\n--- {name} ({profile}) ---\n{source}");
    })?;

    let layout = Arc::new(set.uniform_layout(stage));
    Ok(GpuProgram::new(name, stage, profile.to_owned(), handle, source, layout))
}

/// Source of `name` from the shader cache directory. A missing file is
/// generated and written.
fn cached_source(dir: &Path, name: &str, extension: &str, generate: impl FnOnce() -> Result<String>) -> Result<String> {
    let path = dir.join(name).with_extension(extension);
    if path.is_file() {
        log::debug!("Reusing cached source {}", path.display());
        return Ok(std::fs::read_to_string(&path)?);
    }

    let source = generate()?;
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, &source)?;
    log::debug!("Wrote generated source {}", path.display());
    Ok(source)
}
