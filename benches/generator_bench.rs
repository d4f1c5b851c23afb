use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use rtss::prelude::*;

const SCHEME: &str = "ShaderGen";

const TEMPLATES: [(&str, &str); 4] = [
    ("ffp", "lighting_stage ffp"),
    ("per_pixel", "lighting_stage per_pixel"),
    ("metal_roughness", "lighting_stage metal_roughness"),
    ("per_pixel+pssm", "lighting_stage per_pixel\nintegrated_pssm 1 40 200 1000"),
];

fn materials(count: usize) -> MaterialLibrary {
    let mut materials = MaterialLibrary::new();
    for i in 0..count {
        let mut pass = Pass::new("p0");
        pass.texture_units.push(TextureUnit::colour(format!("albedo_{i}.png"), 0));
        materials.insert(Material::new(format!("M{i}")).with_technique(Technique::new(DEFAULT_SCHEME).with_pass(pass)));
    }
    materials
}

fn prepared(script: &str, count: usize) -> (ShaderGenerator, MaterialLibrary) {
    let mut generator = ShaderGenerator::new(ShaderGeneratorSettings::default(), MemoryCompiler::new()).unwrap();
    let template = generator.parse_script_block(script).unwrap();
    *generator.render_state_mut(SCHEME) = template;
    let mut materials = materials(count);
    for i in 0..count {
        generator
            .create_shader_based_technique(&mut materials, &format!("M{i}"), DEFAULT_SCHEME, SCHEME)
            .unwrap();
    }
    (generator, materials)
}

fn bench_generation(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut group = c.benchmark_group("rtss_generation");

    // --- cold: target build, assembly, writing and compile of one pass ---
    for (name, script) in TEMPLATES {
        group.bench_with_input(BenchmarkId::new("cold", name), script, |b, script| {
            b.iter_batched(
                || prepared(script, 1),
                |(mut generator, mut materials)| {
                    let bound = generator.validate_scheme(&mut materials, SCHEME).unwrap();
                    black_box(bound);
                },
                BatchSize::SmallInput,
            );
        });
    }

    // --- cached: revalidation of passes whose programs are already cached ---
    let (mut generator, mut materials) = prepared("lighting_stage per_pixel", 64);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();
    group.bench_function("cached/64_passes", |b| {
        b.iter(|| {
            generator.invalidate_scheme(SCHEME).unwrap();
            let bound = generator.validate_scheme(black_box(&mut materials), SCHEME).unwrap();
            black_box(bound);
        });
    });

    group.finish();
}

fn bench_updates(c: &mut Criterion) {
    let (mut generator, mut materials) = prepared("lighting_stage per_pixel\nlight_count 2 1 1", 1);
    generator.validate_scheme(&mut materials, SCHEME).unwrap();

    let lights = [
        Light::new_directional(1, glam::Vec3::NEG_Y, glam::Vec3::ONE),
        Light::new_directional(2, glam::Vec3::X, glam::Vec3::splat(0.5)),
        Light::new_point(3, glam::Vec3::Y, glam::Vec3::ONE, Attenuation::default()),
    ];
    let renderable = Renderable::default();
    let source = AutoParamDataSource::default();
    let draw = DrawContext {
        renderable: &renderable,
        source: &source,
        lights: &lights,
    };

    c.bench_function("rtss_update_gpu_programs_params", |b| {
        b.iter(|| {
            generator
                .update_gpu_programs_params(&mut materials, SCHEME, "M0", 0, black_box(&draw))
                .unwrap();
        });
    });
}

fn bench_scripts(c: &mut Criterion) {
    let generator = ShaderGenerator::new(ShaderGeneratorSettings::default(), MemoryCompiler::new()).unwrap();
    let text = "rtshader_system\n{\n  light_count 2 1 0\n  lighting_stage normal_map bumps.png\n  \
                integrated_pssm 1 40 200 1000\n  fog_stage ffp per_pixel\n}\n";

    c.bench_function("rtss_parse_script_block", |b| {
        b.iter(|| {
            let state = generator.parse_script_block(black_box(text)).unwrap();
            black_box(state.hash_code());
        });
    });
}

criterion_group!(benches, bench_generation, bench_updates, bench_scripts);
criterion_main!(benches);
