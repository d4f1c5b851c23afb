//! Shader Generator Tests
//!
//! Tests for:
//! - Deterministic program generation
//! - Program sharing and reference counting across passes
//! - Execution order of custom sub render states
//! - Lazy invalidation and failure fallback
//! - Light slot ordering, normal map and shadow texture staging
//! - Varying packing and the on-disk shader cache
//! - Script round trips through the generator

use std::any::Any;

use rtss::prelude::*;
use rtss::rtss_core::{GpuConstType, ParameterId};
use rtss::rtss_program::{Content, FunctionInvocation, ProgramSet, Semantic};
use rtss::rtss_resources::TextureContent;
use rtss::rtss_srs::InternalCounter;
use rtss::rtss_srs::sub_render_state::same_type;

const SCHEME: &str = "ShaderGen";

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn textured_pass(texture: &str) -> Pass {
    let mut pass = Pass::new("p0");
    pass.texture_units.push(TextureUnit::colour(texture, 0));
    pass
}

fn library(entries: Vec<(&str, Pass)>) -> MaterialLibrary {
    let mut materials = MaterialLibrary::new();
    for (name, pass) in entries {
        materials.insert(Material::new(name).with_technique(Technique::new(DEFAULT_SCHEME).with_pass(pass)));
    }
    materials
}

fn generator() -> ShaderGenerator {
    ShaderGenerator::new(ShaderGeneratorSettings::default(), MemoryCompiler::new()).unwrap()
}

fn adopt<C: ShaderCompiler>(generator: &mut ShaderGenerator<C>, materials: &mut MaterialLibrary, names: &[&str]) {
    for name in names {
        assert!(
            generator
                .create_shader_based_technique(materials, name, DEFAULT_SCHEME, SCHEME)
                .unwrap()
        );
    }
}

fn vertex_name<C: ShaderCompiler>(generator: &ShaderGenerator<C>, material: &str) -> String {
    generator
        .pass_program(SCHEME, material, 0)
        .map(|p| p.vertex.name().to_owned())
        .unwrap()
}

fn bound_vertex(materials: &MaterialLibrary, material: &str) -> Option<String> {
    let pass = materials.pass(material, SCHEME, 0)?;
    pass.programs.vertex.as_ref().map(|b| b.program.name().to_owned())
}

/// Position of each needle in `haystack`, panicking when one is missing.
fn positions(haystack: &str, needles: &[&str]) -> Vec<usize> {
    needles
        .iter()
        .map(|n| haystack.find(n).unwrap_or_else(|| panic!("'{n}' not found in:\n{haystack}")))
        .collect()
}

// ============================================================================
// Test sub render states and compilers
// ============================================================================

/// Writes one call named after its execution order.
#[derive(Debug, Clone)]
struct Marker {
    order: i32,
    output: Option<ParameterId>,
}

fn marker_type(order: i32) -> &'static str {
    match order {
        10 => "Test_Marker10",
        _ => "Test_Marker20",
    }
}

impl SubRenderState for Marker {
    fn type_name(&self) -> &'static str {
        marker_type(self.order)
    }

    fn execution_order(&self) -> i32 {
        self.order
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) -> Result<()> {
        self.order = same_type::<Self>(self, other)?.order;
        Ok(())
    }

    fn resolve_parameters(&mut self, set: &mut ProgramSet) -> Result<()> {
        let name = format!("lMarker{}", self.order);
        self.output = Some(set.resolve_local(ShaderStage::Vertex, &name, Content::Unknown, GpuConstType::Float4));
        Ok(())
    }

    fn resolve_dependencies(&mut self, _set: &mut ProgramSet) -> Result<()> {
        Ok(())
    }

    fn add_function_invocations(&mut self, set: &mut ProgramSet, counter: &mut InternalCounter) -> Result<()> {
        let output = self
            .output
            .ok_or_else(|| ShaderGenError::Internal("marker not resolved".into()))?;
        let v = ShaderStage::Vertex;
        set.add_invocation(
            v,
            FunctionInvocation::new(format!("Marker{}", self.order), 0, counter.next(v)).output(output),
        );
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MarkerFactory(i32);

impl SubRenderStateFactory for MarkerFactory {
    fn type_name(&self) -> &'static str {
        marker_type(self.0)
    }

    fn create_instance_impl(&self) -> Box<dyn SubRenderState> {
        Box::new(Marker {
            order: self.0,
            output: None,
        })
    }
}

/// Rejects every program set it takes part in.
#[derive(Debug, Clone)]
struct FailingStage;

impl SubRenderState for FailingStage {
    fn type_name(&self) -> &'static str {
        "Test_FailingStage"
    }

    fn execution_order(&self) -> i32 {
        250
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) -> Result<()> {
        same_type::<Self>(self, other)?;
        Ok(())
    }

    fn resolve_parameters(&mut self, _set: &mut ProgramSet) -> Result<()> {
        Err(ShaderGenError::InvalidParameters("failing stage".into()))
    }

    fn resolve_dependencies(&mut self, _set: &mut ProgramSet) -> Result<()> {
        Ok(())
    }

    fn add_function_invocations(&mut self, _set: &mut ProgramSet, _counter: &mut InternalCounter) -> Result<()> {
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct FailingStageFactory;

impl SubRenderStateFactory for FailingStageFactory {
    fn type_name(&self) -> &'static str {
        "Test_FailingStage"
    }

    fn create_instance_impl(&self) -> Box<dyn SubRenderState> {
        Box::new(FailingStage)
    }
}

/// Passes four scalars from the vertex to the fragment stage.
#[derive(Debug, Clone, Default)]
struct Scalars {
    outputs: Vec<ParameterId>,
}

impl SubRenderState for Scalars {
    fn type_name(&self) -> &'static str {
        "Test_Scalars"
    }

    fn execution_order(&self) -> i32 {
        350
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) -> Result<()> {
        same_type::<Self>(self, other)?;
        Ok(())
    }

    fn resolve_parameters(&mut self, set: &mut ProgramSet) -> Result<()> {
        self.outputs.clear();
        for light in 0..4 {
            let varying = set.resolve_varying(
                Semantic::TexCoord,
                None,
                Content::LightDirectionTextureSpace(light),
                GpuConstType::Float1,
            )?;
            self.outputs.push(varying.vertex_out);
        }
        Ok(())
    }

    fn resolve_dependencies(&mut self, set: &mut ProgramSet) -> Result<()> {
        set.program_mut(ShaderStage::Vertex).add_dependency("FFPLib_Common");
        Ok(())
    }

    fn add_function_invocations(&mut self, set: &mut ProgramSet, counter: &mut InternalCounter) -> Result<()> {
        let v = ShaderStage::Vertex;
        let half = set.constant(v, GpuConstType::Float1, [0.5; 4]);
        for &output in &self.outputs {
            set.add_invocation(
                v,
                FunctionInvocation::new("FFP_Assign", 350, counter.next(v))
                    .input(half)
                    .output(output),
            );
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ScalarsFactory;

impl SubRenderStateFactory for ScalarsFactory {
    fn type_name(&self) -> &'static str {
        "Test_Scalars"
    }

    fn create_instance_impl(&self) -> Box<dyn SubRenderState> {
        Box::new(Scalars::default())
    }
}

/// Memory backend that can be told to reject everything.
#[derive(Debug, Default)]
struct FlakyCompiler {
    inner: MemoryCompiler,
    fail: bool,
    attempts: usize,
}

impl ShaderCompiler for FlakyCompiler {
    fn compile(&mut self, request: &ProgramSource<'_>) -> Result<u64> {
        self.attempts += 1;
        if self.fail {
            return Err(ShaderGenError::CompileFailed {
                program: request.name.to_owned(),
                message: "backend unavailable".into(),
            });
        }
        self.inner.compile(request)
    }

    fn release(&mut self, handle: u64) {
        self.inner.release(handle);
    }
}

// ============================================================================
// Determinism & Sharing
// ============================================================================

#[test]
fn generation_is_deterministic() {
    init();
    let mut sources = Vec::new();
    for _ in 0..2 {
        let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
        let mut generator = generator();
        let lighting = generator.create_sub_render_state(Lighting::PER_PIXEL_TYPE).unwrap();
        generator.render_state_mut(SCHEME).add(lighting);
        adopt(&mut generator, &mut materials, &["Rock"]);
        generator.validate_scheme(&mut materials, SCHEME).unwrap();

        let program = generator.pass_program(SCHEME, "Rock", 0).unwrap();
        sources.push((
            program.key.hash,
            program.vertex.source().to_owned(),
            program.fragment.source().to_owned(),
        ));
    }
    assert_eq!(sources[0], sources[1]);
}

#[test]
fn equal_passes_share_one_program() {
    init();
    let mut materials = library(vec![
        ("Rock", textured_pass("rock.png")),
        ("Sand", textured_pass("sand.png")),
        ("Moss", textured_pass("moss.png")),
    ]);
    let mut generator = generator();
    adopt(&mut generator, &mut materials, &["Rock", "Sand", "Moss"]);
    assert_eq!(generator.validate_scheme(&mut materials, SCHEME).unwrap(), 3);

    let stats = generator.stats();
    assert_eq!(stats.compiles, 1);
    assert_eq!(stats.cache_hits, 2);
    assert_eq!(generator.cache().len(), 1);
    assert_eq!(generator.compiler().live_programs(), 2);
    assert_eq!(generator.pass_program(SCHEME, "Rock", 0).unwrap().ref_count(), 3);

    // Texture names stay per pass even though the program is shared.
    let sand = materials.pass("Sand", SCHEME, 0).unwrap();
    assert_eq!(sand.texture_units[0].texture, "sand.png");
    assert_eq!(bound_vertex(&materials, "Sand"), bound_vertex(&materials, "Rock"));
}

#[test]
fn programs_live_until_the_last_pass_lets_go() {
    init();
    let mut materials = library(vec![
        ("P1", textured_pass("a.png")),
        ("P2", textured_pass("b.png")),
    ]);
    let mut generator = generator();
    adopt(&mut generator, &mut materials, &["P1", "P2"]);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();
    assert_eq!(generator.compiler().live_programs(), 2);

    assert!(
        generator
            .remove_shader_based_technique(&mut materials, "P1", SCHEME)
            .unwrap()
    );
    assert_eq!(generator.compiler().live_programs(), 2);
    assert_eq!(generator.pass_program(SCHEME, "P2", 0).unwrap().ref_count(), 1);
    assert!(materials.get("P1").unwrap().technique(SCHEME).is_none());

    assert!(
        generator
            .remove_shader_based_technique(&mut materials, "P2", SCHEME)
            .unwrap()
    );
    assert_eq!(generator.compiler().live_programs(), 0);
    assert!(generator.cache().is_empty());
    assert!(
        !generator
            .remove_shader_based_technique(&mut materials, "P2", SCHEME)
            .unwrap()
    );
}

#[test]
fn profiles_come_from_settings() -> anyhow::Result<()> {
    let json = serde_json::json!({ "language": "hlsl", "fragment_profile": "ps_4_0" });
    let settings = ShaderGeneratorSettings::from_json(&json.to_string())?;
    let mut generator = ShaderGenerator::new(settings, MemoryCompiler::new())?;
    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    adopt(&mut generator, &mut materials, &["Rock"]);
    generator.validate_scheme(&mut materials, SCHEME)?;

    let program = generator.pass_program(SCHEME, "Rock", 0).unwrap();
    assert_eq!(program.vertex.profile(), "vs_3_0");
    assert_eq!(program.fragment.profile(), "ps_4_0");
    assert_eq!(program.key.profile.language, ShaderLanguage::Hlsl);
    Ok(())
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn custom_states_contribute_in_execution_order() {
    init();
    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    let mut generator = generator();
    generator.register_factory(Box::new(MarkerFactory(20))).unwrap();
    generator.register_factory(Box::new(MarkerFactory(10))).unwrap();

    // Inserted out of order on purpose.
    let late = generator.create_sub_render_state(marker_type(20)).unwrap();
    let early = generator.create_sub_render_state(marker_type(10)).unwrap();
    generator.render_state_mut(SCHEME).add(late);
    generator.render_state_mut(SCHEME).add(early);

    adopt(&mut generator, &mut materials, &["Rock"]);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();

    let program = generator.pass_program(SCHEME, "Rock", 0).unwrap();
    let orders: Vec<i32> = program.target.sub_states().iter().map(|s| s.execution_order()).collect();
    assert!(orders.windows(2).all(|w| w[0] <= w[1]), "{orders:?}");

    let at = positions(program.vertex.source(), &["Marker10(", "Marker20(", "FFP_Transform("]);
    assert!(at[0] < at[1] && at[1] < at[2], "{at:?}");
}

#[test]
fn light_slots_follow_canonical_type_order() {
    init();
    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    let mut generator = generator();
    generator.render_state_mut(SCHEME).set_light_count([1, 1, 1]);
    adopt(&mut generator, &mut materials, &["Rock"]);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();

    let program = generator.pass_program(SCHEME, "Rock", 0).unwrap();
    let at = positions(
        program.vertex.source(),
        &["FFP_Light_Directional", "FFP_Light_Point", "FFP_Light_Spot"],
    );
    assert!(at[0] < at[1] && at[1] < at[2], "{at:?}");
}

#[test]
fn factories_in_use_cannot_be_removed() {
    init();
    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    let mut generator = generator();
    let lighting = generator.create_sub_render_state(Lighting::PER_PIXEL_TYPE).unwrap();
    generator.render_state_mut(SCHEME).add(lighting);
    adopt(&mut generator, &mut materials, &["Rock"]);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();

    assert!(matches!(
        generator.remove_factory(Lighting::PER_PIXEL_TYPE),
        Err(ShaderGenError::FactoryInUse { .. })
    ));

    let template = generator.render_state_mut(SCHEME).remove(Lighting::PER_PIXEL_TYPE).unwrap();
    generator.destroy_sub_render_state(template).unwrap();
    // The cached program still holds the target render state.
    assert!(generator.remove_factory(Lighting::PER_PIXEL_TYPE).is_err());

    generator.remove_all_shader_based_techniques(&mut materials);
    generator.remove_factory(Lighting::PER_PIXEL_TYPE).unwrap();
}

// ============================================================================
// Invalidation & Failure
// ============================================================================

#[test]
fn invalidation_is_lazy() {
    init();
    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    let mut generator = generator();
    adopt(&mut generator, &mut materials, &["Rock"]);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();
    let before = vertex_name(&generator, "Rock");

    let lighting = generator.create_sub_render_state(Lighting::PER_PIXEL_TYPE).unwrap();
    generator.render_state_mut(SCHEME).add(lighting);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();
    assert_eq!(generator.stats().compiles, 1, "template edits wait for invalidation");

    generator.invalidate_scheme(SCHEME).unwrap();
    assert_eq!(generator.stats().compiles, 1);
    assert_eq!(bound_vertex(&materials, "Rock").as_deref(), Some(before.as_str()));

    generator.validate_material(&mut materials, SCHEME, "Rock").unwrap();
    let after = vertex_name(&generator, "Rock");
    assert_ne!(before, after);
    assert_eq!(bound_vertex(&materials, "Rock"), Some(after));
    assert_eq!(generator.stats().compiles, 2);
    assert_eq!(generator.compiler().live_programs(), 2, "previous programs are released");
}

#[test]
fn failed_generation_keeps_previous_programs() {
    init();
    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    let mut generator = ShaderGenerator::new(ShaderGeneratorSettings::default(), FlakyCompiler::default()).unwrap();
    adopt(&mut generator, &mut materials, &["Rock"]);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();
    let before = vertex_name(&generator, "Rock");

    let lighting = generator.create_sub_render_state(Lighting::PER_PIXEL_TYPE).unwrap();
    generator.render_state_mut(SCHEME).add(lighting);
    generator.invalidate_pass(SCHEME, "Rock", 0).unwrap();
    generator.compiler_mut().fail = true;

    assert_eq!(generator.validate_scheme(&mut materials, SCHEME).unwrap(), 1);
    assert!(generator.pass_failed(SCHEME, "Rock", 0).unwrap());
    assert_eq!(generator.stats().failures, 1);
    assert_eq!(bound_vertex(&materials, "Rock").as_deref(), Some(before.as_str()));
    assert_eq!(generator.compiler().inner.live_programs(), 2);

    // Not retried until invalidated.
    let attempts = generator.compiler().attempts;
    generator.validate_scheme(&mut materials, SCHEME).unwrap();
    assert_eq!(generator.compiler().attempts, attempts);

    generator.compiler_mut().fail = false;
    generator.invalidate_pass(SCHEME, "Rock", 0).unwrap();
    generator.validate_scheme(&mut materials, SCHEME).unwrap();
    assert!(!generator.pass_failed(SCHEME, "Rock", 0).unwrap());
    assert_ne!(bound_vertex(&materials, "Rock").as_deref(), Some(before.as_str()));
    assert_eq!(generator.compiler().inner.live_programs(), 2);
}

#[test]
fn failing_stage_keeps_the_bound_program() {
    init();
    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    let mut generator = generator();
    generator.register_factory(Box::new(FailingStageFactory)).unwrap();
    adopt(&mut generator, &mut materials, &["Rock"]);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();

    let handle = generator.pass_handle(SCHEME, "Rock", 0);
    assert!(handle.is_some());
    let before = vertex_name(&generator, "Rock");
    let ref_count = generator.pass_program(SCHEME, "Rock", 0).unwrap().ref_count();

    let failing = generator.create_sub_render_state("Test_FailingStage").unwrap();
    generator.render_state_mut(SCHEME).add(failing);
    generator.invalidate_scheme(SCHEME).unwrap();
    assert_eq!(generator.validate_scheme(&mut materials, SCHEME).unwrap(), 1);

    assert!(generator.pass_failed(SCHEME, "Rock", 0).unwrap());
    assert_eq!(generator.stats().failures, 1);
    assert_eq!(generator.pass_handle(SCHEME, "Rock", 0), handle);
    assert_eq!(vertex_name(&generator, "Rock"), before);
    assert_eq!(generator.pass_program(SCHEME, "Rock", 0).unwrap().ref_count(), ref_count);
    assert_eq!(bound_vertex(&materials, "Rock").as_deref(), Some(before.as_str()));
    assert_eq!(generator.compiler().live_programs(), 2);

    // Not retried until invalidated.
    let compiles = generator.stats().compiles;
    generator.validate_scheme(&mut materials, SCHEME).unwrap();
    assert_eq!(generator.stats().compiles, compiles);
    assert_eq!(generator.stats().failures, 1);
    assert_eq!(generator.pass_handle(SCHEME, "Rock", 0), handle);
}

#[test]
fn exhausted_texture_units_fail_the_pass() {
    init();
    let settings = ShaderGeneratorSettings {
        limits: rtss::rtss_program::ProgramLimits {
            max_texture_units: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut generator = ShaderGenerator::new(settings, MemoryCompiler::new()).unwrap();
    let pssm = generator.create_sub_render_state(IntegratedPssm::TYPE).unwrap();
    generator.render_state_mut(SCHEME).add(pssm);

    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    adopt(&mut generator, &mut materials, &["Rock"]);
    assert_eq!(generator.validate_scheme(&mut materials, SCHEME).unwrap(), 0);
    assert!(generator.pass_failed(SCHEME, "Rock", 0).unwrap());
    assert_eq!(materials.pass("Rock", SCHEME, 0).unwrap().texture_units.len(), 1);
}

// ============================================================================
// Lighting & Shadows
// ============================================================================

#[test]
fn normal_mapping_without_tangents_falls_back_to_ffp_lighting() {
    init();
    let mut bumpy = textured_pass("bumpy.png");
    bumpy.vertex_features |= VertexFeatures::TANGENT;
    let mut materials = library(vec![("Flat", textured_pass("flat.png")), ("Bumpy", bumpy)]);

    let mut generator = generator();
    let template = generator.parse_script_block("lighting_stage normal_map bumps.png").unwrap();
    *generator.render_state_mut(SCHEME) = template;
    adopt(&mut generator, &mut materials, &["Flat", "Bumpy"]);
    assert_eq!(generator.validate_scheme(&mut materials, SCHEME).unwrap(), 2);

    let flat = &generator.pass_program(SCHEME, "Flat", 0).unwrap().target;
    assert!(flat.contains(Lighting::FFP_TYPE));
    assert!(!flat.contains(Lighting::NORMAL_MAP_TYPE));
    let bumpy = &generator.pass_program(SCHEME, "Bumpy", 0).unwrap().target;
    assert!(bumpy.contains(Lighting::NORMAL_MAP_TYPE));
    assert_eq!(generator.stats().compiles, 2);

    let content = |material: &str| -> Vec<TextureContent> {
        let pass = materials.pass(material, SCHEME, 0).unwrap();
        pass.texture_units.iter().map(|u| u.content).collect()
    };
    assert_eq!(content("Flat"), [TextureContent::Colour]);
    assert_eq!(content("Bumpy"), [TextureContent::Colour, TextureContent::NormalMap]);
}

#[test]
fn shadow_maps_are_staged_for_lit_passes_only() {
    init();
    let mut unlit = textured_pass("sky.png");
    unlit.lighting_enabled = false;
    let mut materials = library(vec![("Rock", textured_pass("rock.png")), ("Sky", unlit)]);

    let mut generator = generator();
    let template = generator
        .parse_script_block("rtshader_system\n{\n  integrated_pssm 1 50 200 1000\n}")
        .unwrap();
    *generator.render_state_mut(SCHEME) = template;
    adopt(&mut generator, &mut materials, &["Rock", "Sky"]);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();

    let rock = materials.pass("Rock", SCHEME, 0).unwrap();
    let shadows: Vec<_> = rock.texture_units.iter().skip(1).map(|u| u.content).collect();
    assert_eq!(
        shadows,
        [TextureContent::Shadow(0), TextureContent::Shadow(1), TextureContent::Shadow(2)]
    );
    assert_eq!(materials.pass("Sky", SCHEME, 0).unwrap().texture_units.len(), 1);
    assert!(
        !generator
            .pass_program(SCHEME, "Sky", 0)
            .unwrap()
            .target
            .contains(IntegratedPssm::TYPE)
    );
}

#[test]
fn render_notification_generates_and_updates() {
    init();
    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    let mut generator = generator();
    let lighting = generator.create_sub_render_state(Lighting::PER_PIXEL_TYPE).unwrap();
    generator.render_state_mut(SCHEME).add(lighting);
    adopt(&mut generator, &mut materials, &["Rock"]);

    let lights = [
        Light::new_point(2, glam::Vec3::Y, glam::Vec3::ONE, Attenuation::default()),
        Light::new_directional(1, glam::Vec3::NEG_Y, glam::Vec3::ONE),
    ];
    let renderable = Renderable::default();
    let source = AutoParamDataSource::default();
    let draw = DrawContext {
        renderable: &renderable,
        source: &source,
        lights: &lights,
    };
    generator
        .notify_render_single_object(&mut materials, SCHEME, "Rock", 0, &draw)
        .unwrap();
    generator
        .notify_render_single_object(&mut materials, SCHEME, "Rock", 0, &draw)
        .unwrap();
    assert_eq!(generator.stats().compiles, 1);

    let pass = materials.pass("Rock", SCHEME, 0).unwrap();
    let fragment = &pass.programs.fragment.as_ref().unwrap().params;
    assert!(fragment.data().iter().any(|&v| v != 0.0), "light values reach the fragment block");
}

// ============================================================================
// Varyings & Shader Cache
// ============================================================================

#[test]
fn scalar_varyings_are_packed_into_free_texcoord_sets() {
    init();
    let settings = ShaderGeneratorSettings {
        limits: rtss::rtss_program::ProgramLimits {
            max_texcoord_sets: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut generator = ShaderGenerator::new(settings, MemoryCompiler::new()).unwrap();
    generator.register_factory(Box::new(ScalarsFactory)).unwrap();
    let scalars = generator.create_sub_render_state("Test_Scalars").unwrap();
    generator.render_state_mut(SCHEME).add(scalars);

    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    adopt(&mut generator, &mut materials, &["Rock"]);
    assert_eq!(generator.validate_scheme(&mut materials, SCHEME).unwrap(), 1);
    assert!(!generator.pass_failed(SCHEME, "Rock", 0).unwrap());

    let program = generator.pass_program(SCHEME, "Rock", 0).unwrap();
    let vertex = program.vertex.source();
    let fragment = program.fragment.source();
    assert!(vertex.contains("out vec4 v_texcoord0"), "{vertex}");
    assert!(vertex.contains("out vec4 v_texcoord1"), "{vertex}");
    assert!(!vertex.contains("v_texcoord2"), "{vertex}");
    // The texture coordinate is widest and keeps the front of the first slot.
    assert!(fragment.contains("FFP_Assign(v_texcoord0.xy, lVarying0);"), "{fragment}");
}

#[test]
fn too_many_varyings_fail_the_pass() {
    init();
    let settings = ShaderGeneratorSettings {
        limits: rtss::rtss_program::ProgramLimits {
            max_texcoord_sets: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut generator = ShaderGenerator::new(settings, MemoryCompiler::new()).unwrap();
    generator.register_factory(Box::new(ScalarsFactory)).unwrap();
    let scalars = generator.create_sub_render_state("Test_Scalars").unwrap();
    generator.render_state_mut(SCHEME).add(scalars);

    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    adopt(&mut generator, &mut materials, &["Rock"]);
    assert_eq!(generator.validate_scheme(&mut materials, SCHEME).unwrap(), 0);
    assert!(generator.pass_failed(SCHEME, "Rock", 0).unwrap());
    assert_eq!(generator.stats().compiles, 0);
}

#[test]
fn shader_cache_directory_is_written_and_reused() -> anyhow::Result<()> {
    init();
    let dir = std::env::temp_dir().join(format!("rtss-shader-cache-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let settings = ShaderGeneratorSettings {
        shader_cache_path: Some(dir.clone()),
        ..Default::default()
    };

    let mut generator = ShaderGenerator::new(settings.clone(), MemoryCompiler::new())?;
    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    adopt(&mut generator, &mut materials, &["Rock"]);
    generator.validate_scheme(&mut materials, SCHEME)?;

    let program = generator.pass_program(SCHEME, "Rock", 0).unwrap();
    let vertex_file = dir.join(format!("{}.glsl", program.vertex.name()));
    let fragment_file = dir.join(format!("{}.glsl", program.fragment.name()));
    assert_eq!(std::fs::read_to_string(&vertex_file)?, program.vertex.source());
    assert!(fragment_file.is_file());

    // A later run picks the stored source up instead of writing it again.
    let edited = format!("{}\n// edited\n", program.vertex.source());
    std::fs::write(&vertex_file, &edited)?;
    let mut generator = ShaderGenerator::new(settings, MemoryCompiler::new())?;
    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    adopt(&mut generator, &mut materials, &["Rock"]);
    generator.validate_scheme(&mut materials, SCHEME)?;
    assert_eq!(generator.pass_program(SCHEME, "Rock", 0).unwrap().vertex.source(), edited);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

// ============================================================================
// Scripts
// ============================================================================

#[test]
fn pass_render_state_round_trips_through_scripts() -> anyhow::Result<()> {
    init();
    let mut materials = library(vec![("Rock", textured_pass("rock.png"))]);
    let mut generator = generator();
    adopt(&mut generator, &mut materials, &["Rock"]);

    let state = generator.parse_script_block(
        "rtshader_system\n{\n  lighting_stage per_pixel\n  light_count 0 2 0\n  integrated_pssm 1 50 500\n}\n",
    )?;
    *generator.pass_render_state_mut(SCHEME, "Rock", 0)? = state;

    let text = generator.serialize_pass_render_state(SCHEME, "Rock", 0)?;
    let reparsed = generator.parse_script_block(&text)?;
    let original = generator.pass_render_state_mut(SCHEME, "Rock", 0)?;
    assert_eq!(reparsed.light_count(), [0, 2, 0]);
    assert_eq!(reparsed.light_count(), original.light_count());
    assert_eq!(reparsed.hash_code(), original.hash_code());
    drop(reparsed);

    generator.validate_scheme(&mut materials, SCHEME)?;
    let target = &generator.pass_program(SCHEME, "Rock", 0).unwrap().target;
    assert!(target.contains(Lighting::PER_PIXEL_TYPE));
    assert!(target.contains(IntegratedPssm::TYPE));
    Ok(())
}

#[test]
fn malformed_scripts_report_the_line() {
    let generator = generator();
    let err = generator
        .parse_script_block("rtshader_system\n{\n  lighting_stage per_pixel\n  sparkle on\n}")
        .unwrap_err();
    assert!(matches!(err, ShaderGenError::Script { line: 4, .. }), "{err}");
    assert!(err.is_configuration());
}

#[test]
fn shutdown_leaves_nothing_behind() {
    init();
    let mut materials = library(vec![
        ("Rock", textured_pass("rock.png")),
        ("Sand", textured_pass("sand.png")),
    ]);
    let mut generator = generator();
    let template = generator.parse_script_block("lighting_stage per_pixel").unwrap();
    *generator.render_state_mut(SCHEME) = template;
    adopt(&mut generator, &mut materials, &["Rock", "Sand"]);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();

    let compiler = generator.shutdown(&mut materials);
    assert_eq!(compiler.live_programs(), 0);
    for name in ["Rock", "Sand"] {
        assert_eq!(materials.get(name).unwrap().techniques.len(), 1);
    }
}
