use std::borrow::Cow;

use rtss_core::{AutoConstant, GpuConstType, LightType, ParameterId, Result, ShaderGenError, ShaderStage};
use rtss_program::{Content, FunctionInvocation, OperandMask, ProgramSet, Semantic, Variability};
use rtss_resources::TrackVertexColour;

use super::slots::{ColourScale, LightSlots, LightSpace};
use super::{Lighting, LightingModel, NormalMapSpace};
use crate::ffp::{diffuse_varying, ps_out_colour, specular_varying, texcoord_varying, vs_in_colour, vs_in_normal, vs_in_position};
use crate::shader_lib::{func, group, lib};
use crate::sub_render_state::{InternalCounter, StageParam};

const V: ShaderStage = ShaderStage::Vertex;
const F: ShaderStage = ShaderStage::Fragment;

/// Invocations decided while resolving parameters.
#[derive(Debug, Clone, Default)]
pub(super) struct Plan {
    /// Pass-through copies shared with other stages: `(stage, group, from, to)`.
    copies: Vec<(ShaderStage, i32, ParameterId, ParameterId)>,
    calls: Vec<(ShaderStage, FunctionInvocation)>,
}

impl Plan {
    fn push(&mut self, stage: ShaderStage, call: FunctionInvocation) {
        self.calls.push((stage, call));
    }

    /// Appends the planned invocations; internal orders are assigned here.
    pub(super) fn commit(&self, set: &mut ProgramSet, counter: &mut InternalCounter) {
        for &(stage, group_order, from, to) in &self.copies {
            crate::ffp::assign_once(set, stage, group_order, counter, from, to);
        }
        for (stage, call) in &self.calls {
            let mut call = call.clone();
            call.internal_order = counter.next(*stage);
            set.add_invocation(*stage, call);
        }
    }

    #[cfg(test)]
    pub(super) fn function_names(&self, stage: ShaderStage) -> Vec<&str> {
        self.calls
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, c)| c.function_name.as_ref())
            .collect()
    }
}

fn call(name: impl Into<Cow<'static, str>>, group_order: i32) -> FunctionInvocation {
    FunctionInvocation::new(name, group_order, 0)
}

/// Surface geometry available to the light functions.
struct Geometry {
    normal: ParameterId,
    view_position: Option<ParameterId>,
    /// Tangent (or object) space vector to the camera, fragment stage.
    to_camera: Option<ParameterId>,
    /// Object to tangent space matrix, vertex stage.
    tbn: Option<ParameterId>,
}

/// Colour targets in the lighting stage.
struct Targets {
    out_diffuse: ParameterId,
    out_specular: Option<ParameterId>,
    diffuse_acc: ParameterId,
    specular_acc: Option<ParameterId>,
    vertex_colour: Option<ParameterId>,
}

pub(super) fn dependencies(model: &LightingModel, set: &mut ProgramSet) {
    set.add_dependency(V, lib::COMMON);
    set.add_dependency(V, lib::TRANSFORM);
    match model {
        LightingModel::Ffp => set.add_dependency(V, lib::LIGHTING),
        LightingModel::PerPixel => {
            set.add_dependency(F, lib::COMMON);
            set.add_dependency(F, lib::PER_PIXEL_LIGHTING);
        }
        LightingModel::NormalMap { .. } => {
            set.add_dependency(V, lib::NORMAL_MAP_LIGHTING);
            set.add_dependency(F, lib::COMMON);
            set.add_dependency(F, lib::NORMAL_MAP_LIGHTING);
        }
        LightingModel::CookTorrance { .. } => {
            set.add_dependency(F, lib::COMMON);
            set.add_dependency(F, lib::COOK_TORRANCE);
        }
    }
}

fn light_function(model: &LightingModel, light_type: LightType, specular: bool) -> String {
    let prefix = match model {
        LightingModel::Ffp => "FFP_Light_",
        LightingModel::PerPixel => "SGX_Light_",
        LightingModel::NormalMap { .. } => "SGX_NormalMapLight_",
        LightingModel::CookTorrance { .. } => "PBR_Light_",
    };
    let kind = match light_type {
        LightType::Directional => "Directional",
        LightType::Point => "Point",
        LightType::Spot => "Spot",
    };
    match (model, specular) {
        (LightingModel::CookTorrance { .. }, _) => format!("{prefix}{kind}"),
        (_, true) => format!("{prefix}{kind}_DiffuseSpecular"),
        (_, false) => format!("{prefix}{kind}_Diffuse"),
    }
}

fn light_uniform(set: &mut ProgramSet, stage: ShaderStage, ty: GpuConstType, name: &str) -> Result<StageParam> {
    let id = set.resolve_uniform(stage, ty, name, Variability::LIGHTS)?;
    Ok(StageParam::new(stage, id))
}

/// Declares every parameter of `lighting` and plans its invocations.
pub(super) fn resolve(lighting: &Lighting, set: &mut ProgramSet) -> Result<(Plan, LightSlots)> {
    let mut plan = Plan::default();
    let model = lighting.model();
    let ls = model.lighting_stage();
    let lighting_group = if ls == V { group::VS_LIGHTING } else { group::PS_LIGHTING };
    let specular = lighting.specular_enabled();
    let track = lighting.track_vertex_colour();
    let count = lighting.active_light_count();
    let is_pbr = matches!(model, LightingModel::CookTorrance { .. });
    let needs_position = specular || count[LightType::Point.index()] + count[LightType::Spot.index()] > 0;

    let in_normal = vs_in_normal(set)?;
    let in_position = vs_in_position(set)?;

    let geometry = match model {
        LightingModel::Ffp => vertex_geometry(set, &mut plan, in_normal, in_position, lighting.normalise(), needs_position)?,
        LightingModel::PerPixel | LightingModel::CookTorrance { .. } => {
            fragment_geometry(set, &mut plan, in_normal, in_position, needs_position)?
        }
        LightingModel::NormalMap {
            space, texcoord_index, ..
        } => normal_map_geometry(set, &mut plan, lighting, *space, *texcoord_index, in_normal, in_position)?,
    };

    let targets = targets(set, ls, specular, track)?;
    let zero = set.constant(ls, GpuConstType::Float4, [0.0; 4]);
    plan.push(ls, call(func::ASSIGN, lighting_group).input(zero).output(targets.diffuse_acc));
    if let Some(acc) = targets.specular_acc {
        plan.push(ls, call(func::ASSIGN, lighting_group).input(zero).output(acc));
    }

    let material = if is_pbr {
        Some(pbr_material(set, &mut plan, lighting, track, targets.vertex_colour)?)
    } else {
        None
    };
    let shininess = if specular && !is_pbr {
        Some(set.resolve_auto_uniform(ls, AutoConstant::SurfaceShininess, 0)?)
    } else {
        None
    };
    let tracked = |flag: TrackVertexColour, name: &str, set: &mut ProgramSet| {
        (track.contains(flag) && targets.vertex_colour.is_some())
            .then(|| set.resolve_local(ls, name, Content::Unknown, GpuConstType::Float4))
    };
    let tracked_diffuse = if is_pbr { None } else { tracked(TrackVertexColour::DIFFUSE, "lTrackedDiffuse", set) };
    let tracked_specular = if specular && !is_pbr {
        tracked(TrackVertexColour::SPECULAR, "lTrackedSpecular", set)
    } else {
        None
    };

    let is_normal_map = matches!(model, LightingModel::NormalMap { .. });
    let space = if is_normal_map { LightSpace::Object } else { LightSpace::View };
    let scale = ColourScale {
        diffuse_by_surface: !is_pbr && tracked_diffuse.is_none(),
        specular_by_surface: !is_pbr && tracked_specular.is_none(),
    };
    let mut slots = LightSlots::for_count(count, space, scale);
    // Positions of normal mapped lights are consumed by the vertex stage.
    let position_stage = if is_normal_map { V } else { ls };
    let suffix = if is_normal_map { "obj_space" } else { "view_space" };

    for (index, slot) in slots.slots.iter_mut().enumerate() {
        let index = index as u32;
        let light_type = slot.light_type;
        let positional = light_type != LightType::Directional;

        let position = if positional {
            light_uniform(set, position_stage, GpuConstType::Float4, &format!("light_position_{suffix}"))?
        } else {
            light_uniform(set, position_stage, GpuConstType::Float4, &format!("light_direction_{suffix}"))?
        };
        slot.position = Some(position);
        if positional {
            slot.attenuation = Some(light_uniform(set, ls, GpuConstType::Float4, "light_attenuation")?);
        }
        if light_type == LightType::Spot {
            slot.spot_direction = Some(light_uniform(
                set,
                position_stage,
                GpuConstType::Float3,
                &format!("spot_direction_{suffix}"),
            )?);
            slot.spot_params = Some(light_uniform(set, ls, GpuConstType::Float3, "spot_params")?);
        }
        let diffuse_name = if is_pbr { "light_colour" } else { "derived_light_diffuse" };
        slot.diffuse = Some(light_uniform(set, ls, GpuConstType::Float4, diffuse_name)?);
        if specular && !is_pbr {
            slot.specular = Some(light_uniform(set, ls, GpuConstType::Float4, "derived_light_specular")?);
        }

        // Normal mapping moves light vectors into the map's space per vertex.
        let (light_vector, spot_vector) = if let LightingModel::NormalMap { .. } = model {
            normal_map_light_vectors(set, &mut plan, &geometry, index, light_type, position, slot.spot_direction, in_position)?
        } else {
            (position.id, slot.spot_direction.map(|p| p.id))
        };

        let mut invocation = call(light_function(model, light_type, specular), lighting_group).input(geometry.normal);
        match model {
            LightingModel::NormalMap { .. } => {
                if let Some(to_camera) = geometry.to_camera {
                    invocation = invocation.input(to_camera);
                }
                invocation = invocation.input(light_vector);
                if let Some(spot) = spot_vector {
                    invocation = invocation.input(spot);
                }
            }
            _ => {
                if let Some(view_position) = geometry.view_position
                    && (positional || specular)
                {
                    invocation = invocation.input(view_position);
                }
                invocation = invocation.input_masked(light_vector, OperandMask::XYZ);
                if let Some(spot) = spot_vector {
                    invocation = invocation.input(spot);
                }
            }
        }
        if let Some(attenuation) = slot.attenuation {
            invocation = invocation.input(attenuation.id);
        }
        if let Some(spot_params) = slot.spot_params {
            invocation = invocation.input(spot_params.id);
        }

        let light_diffuse = slot.diffuse.map(|p| p.id).ok_or_else(|| missing("light diffuse"))?;
        invocation = match (tracked_diffuse, targets.vertex_colour) {
            (Some(temp), Some(vertex_colour)) => {
                plan.push(ls, call(func::MODULATE, lighting_group).input(vertex_colour).input(light_diffuse).output(temp));
                invocation.input(temp)
            }
            _ => invocation.input(light_diffuse),
        };
        if let Some((base_colour, metal_roughness)) = material {
            invocation = invocation.input(base_colour).input(metal_roughness);
        } else if let (Some(light_specular), Some(shininess)) = (slot.specular, shininess) {
            invocation = match (tracked_specular, targets.vertex_colour) {
                (Some(temp), Some(vertex_colour)) => {
                    plan.push(
                        ls,
                        call(func::MODULATE, lighting_group)
                            .input(vertex_colour)
                            .input(light_specular.id)
                            .output(temp),
                    );
                    invocation.input(temp)
                }
                _ => invocation.input(light_specular.id),
            };
            invocation = invocation.input(shininess);
        }

        invocation = invocation.in_out(targets.diffuse_acc);
        if let Some(acc) = targets.specular_acc {
            invocation = invocation.in_out(acc);
        }
        plan.push(ls, invocation);
    }

    global_illumination(set, &mut plan, ls, lighting_group, track, &targets)?;

    plan.push(
        ls,
        call(func::ADD, lighting_group)
            .input_masked(targets.diffuse_acc, OperandMask::XYZ)
            .input_masked(targets.out_diffuse, OperandMask::XYZ)
            .output_masked(targets.out_diffuse, OperandMask::XYZ),
    );
    if let (Some(acc), Some(out)) = (targets.specular_acc, targets.out_specular) {
        plan.push(ls, call(func::ASSIGN, lighting_group).input(acc).output(out));
    }

    Ok((plan, slots))
}

fn missing(what: &str) -> ShaderGenError {
    ShaderGenError::Internal(format!("lighting slot without {what}"))
}

fn targets(set: &mut ProgramSet, ls: ShaderStage, specular: bool, track: TrackVertexColour) -> Result<Targets> {
    let diffuse_acc = set.resolve_local(ls, "lDiffuse", Content::Unknown, GpuConstType::Float4);
    let targets = if ls == V {
        let out_diffuse = diffuse_varying(set)?.vertex_out;
        let (specular_acc, out_specular) = if specular {
            (
                Some(set.resolve_local(V, "lSpecular", Content::Unknown, GpuConstType::Float4)),
                Some(specular_varying(set)?.vertex_out),
            )
        } else {
            (None, None)
        };
        let vertex_colour = if track.is_empty() { None } else { Some(vs_in_colour(set)?) };
        Targets {
            out_diffuse,
            out_specular,
            diffuse_acc,
            specular_acc,
            vertex_colour,
        }
    } else {
        let vertex_colour = if track.is_empty() { None } else { Some(diffuse_varying(set)?.fragment_in) };
        Targets {
            out_diffuse: ps_out_colour(set)?,
            out_specular: None,
            diffuse_acc,
            // The colour stage adds fragment specular at the end of the chain.
            specular_acc: specular
                .then(|| set.resolve_local(F, "lSpecular", Content::ColourSpecular, GpuConstType::Float4)),
            vertex_colour,
        }
    };
    Ok(targets)
}

fn vertex_geometry(
    set: &mut ProgramSet,
    plan: &mut Plan,
    in_normal: ParameterId,
    in_position: ParameterId,
    normalise: bool,
    needs_position: bool,
) -> Result<Geometry> {
    let world_view_it = set.resolve_auto_uniform(V, AutoConstant::InverseTransposeWorldViewMatrix, 0)?;
    let normal = set.resolve_local(V, "lViewNormal", Content::NormalViewSpace, GpuConstType::Float3);
    plan.push(
        V,
        call(func::TRANSFORM_NORMAL, group::VS_LIGHTING_SETUP)
            .input(world_view_it)
            .input(in_normal)
            .output(normal),
    );
    if normalise {
        plan.push(V, call(func::NORMALIZE, group::VS_LIGHTING_SETUP).input(normal).output(normal));
    }

    let view_position = if needs_position {
        let world_view = set.resolve_auto_uniform(V, AutoConstant::WorldViewMatrix, 0)?;
        let position = set.resolve_local(V, "lViewPos", Content::PositionViewSpace, GpuConstType::Float3);
        plan.push(
            V,
            call(func::TRANSFORM_POSITION, group::VS_LIGHTING_SETUP)
                .input(world_view)
                .input(in_position)
                .output(position),
        );
        Some(position)
    } else {
        None
    };

    Ok(Geometry {
        normal,
        view_position,
        to_camera: None,
        tbn: None,
    })
}

fn fragment_geometry(
    set: &mut ProgramSet,
    plan: &mut Plan,
    in_normal: ParameterId,
    in_position: ParameterId,
    needs_position: bool,
) -> Result<Geometry> {
    let world_view_it = set.resolve_auto_uniform(V, AutoConstant::InverseTransposeWorldViewMatrix, 0)?;
    let view_normal = set.resolve_varying(Semantic::TexCoord, None, Content::NormalViewSpace, GpuConstType::Float3)?;
    plan.push(
        V,
        call(func::TRANSFORM_NORMAL, group::VS_LIGHTING_SETUP)
            .input(world_view_it)
            .input(in_normal)
            .output(view_normal.vertex_out),
    );
    // Interpolation denormalises.
    let normal = set.resolve_local(F, "lViewNormal", Content::NormalViewSpace, GpuConstType::Float3);
    plan.push(
        F,
        call(func::NORMALIZE, group::PS_LIGHTING)
            .input(view_normal.fragment_in)
            .output(normal),
    );

    let view_position = if needs_position {
        let world_view = set.resolve_auto_uniform(V, AutoConstant::WorldViewMatrix, 0)?;
        let position =
            set.resolve_varying(Semantic::TexCoord, None, Content::PositionViewSpace, GpuConstType::Float3)?;
        plan.push(
            V,
            call(func::TRANSFORM_POSITION, group::VS_LIGHTING_SETUP)
                .input(world_view)
                .input(in_position)
                .output(position.vertex_out),
        );
        Some(position.fragment_in)
    } else {
        None
    };

    Ok(Geometry {
        normal,
        view_position,
        to_camera: None,
        tbn: None,
    })
}

fn normal_map_geometry(
    set: &mut ProgramSet,
    plan: &mut Plan,
    lighting: &Lighting,
    space: NormalMapSpace,
    texcoord_index: u32,
    in_normal: ParameterId,
    in_position: ParameterId,
) -> Result<Geometry> {
    let register = lighting
        .texture_register()
        .ok_or_else(|| ShaderGenError::Internal("normal map texture unit was not staged".into()))?;

    let (uv_in, uv) = texcoord_varying(set, texcoord_index)?;
    plan.copies.push((V, group::VS_TEXTURING, uv_in, uv.vertex_out));
    let sampler = set.resolve_sampler(F, GpuConstType::Sampler2D, "gNormalMapSampler", register)?;
    let content = match space {
        NormalMapSpace::Tangent => Content::NormalTangentSpace,
        NormalMapSpace::Object => Content::NormalObjectSpace,
    };
    let normal = set.resolve_local(F, "lNormal", content, GpuConstType::Float3);
    plan.push(
        F,
        call(func::FETCH_NORMAL, group::PS_LIGHTING)
            .input(sampler)
            .input(uv.fragment_in)
            .output(normal),
    );

    let tbn = match space {
        NormalMapSpace::Tangent => {
            let in_tangent = set.resolve_input(
                V,
                Semantic::Tangent,
                Some(0),
                Content::TangentObjectSpace,
                GpuConstType::Float3,
            )?;
            let tbn = set.resolve_local(V, "lMatTBN", Content::Unknown, GpuConstType::Matrix3x3);
            plan.push(
                V,
                call(func::CONSTRUCT_TBN, group::VS_LIGHTING_SETUP)
                    .input(in_normal)
                    .input(in_tangent)
                    .output(tbn),
            );
            Some(tbn)
        }
        NormalMapSpace::Object => None,
    };

    let to_camera = if lighting.specular_enabled() {
        let camera = set.resolve_auto_uniform(V, AutoConstant::CameraPositionObjectSpace, 0)?;
        let temp = set.resolve_local(V, "lToCamera", Content::Unknown, GpuConstType::Float3);
        let varying = set.resolve_varying(
            Semantic::TexCoord,
            None,
            Content::PositionToCameraTextureSpace,
            GpuConstType::Float3,
        )?;
        plan.push(
            V,
            call(func::SUBTRACT, group::VS_LIGHTING)
                .input(camera)
                .input_masked(in_position, OperandMask::XYZ)
                .output(temp),
        );
        plan.push(V, to_map_space(tbn, temp, OperandMask::empty(), varying.vertex_out));
        Some(varying.fragment_in)
    } else {
        None
    };

    Ok(Geometry {
        normal,
        view_position: None,
        to_camera,
        tbn,
    })
}

/// Object space vector into the normal map's space.
fn to_map_space(tbn: Option<ParameterId>, source: ParameterId, mask: OperandMask, target: ParameterId) -> FunctionInvocation {
    match tbn {
        Some(tbn) => call(func::TRANSFORM_NORMAL, group::VS_LIGHTING)
            .input(tbn)
            .input_masked(source, mask)
            .output(target),
        None => call(func::ASSIGN, group::VS_LIGHTING).input_masked(source, mask).output(target),
    }
}

#[allow(clippy::too_many_arguments)]
fn normal_map_light_vectors(
    set: &mut ProgramSet,
    plan: &mut Plan,
    geometry: &Geometry,
    index: u32,
    light_type: LightType,
    position: StageParam,
    spot_direction: Option<StageParam>,
    in_position: ParameterId,
) -> Result<(ParameterId, Option<ParameterId>)> {
    let light_vector = if light_type == LightType::Directional {
        let varying = set.resolve_varying(
            Semantic::TexCoord,
            None,
            Content::LightDirectionTextureSpace(index),
            GpuConstType::Float3,
        )?;
        plan.push(V, to_map_space(geometry.tbn, position.id, OperandMask::XYZ, varying.vertex_out));
        varying.fragment_in
    } else {
        let varying = set.resolve_varying(
            Semantic::TexCoord,
            None,
            Content::PositionToLightTextureSpace(index),
            GpuConstType::Float3,
        )?;
        let temp = set.resolve_local(V, "lToLight", Content::Unknown, GpuConstType::Float3);
        plan.push(
            V,
            call(func::SUBTRACT, group::VS_LIGHTING)
                .input_masked(position.id, OperandMask::XYZ)
                .input_masked(in_position, OperandMask::XYZ)
                .output(temp),
        );
        plan.push(V, to_map_space(geometry.tbn, temp, OperandMask::empty(), varying.vertex_out));
        varying.fragment_in
    };

    let spot_vector = match spot_direction {
        Some(spot) => {
            let varying = set.resolve_varying(
                Semantic::TexCoord,
                None,
                Content::LightDirectionTextureSpace(index),
                GpuConstType::Float3,
            )?;
            plan.push(V, to_map_space(geometry.tbn, spot.id, OperandMask::empty(), varying.vertex_out));
            Some(varying.fragment_in)
        }
        None => None,
    };
    Ok((light_vector, spot_vector))
}

/// Base colour and metal/roughness of the Cook-Torrance model.
fn pbr_material(
    set: &mut ProgramSet,
    plan: &mut Plan,
    lighting: &Lighting,
    track: TrackVertexColour,
    vertex_colour: Option<ParameterId>,
) -> Result<(ParameterId, ParameterId)> {
    let surface_specular = set.resolve_auto_uniform(F, AutoConstant::SurfaceSpecularColour, 0)?;
    let metal_roughness = set.resolve_local(F, "lMetalRoughness", Content::Unknown, GpuConstType::Float4);
    match lighting.texture_register() {
        Some(register) => {
            let (uv_in, uv) = texcoord_varying(set, 0)?;
            plan.copies.push((V, group::VS_TEXTURING, uv_in, uv.vertex_out));
            let sampler = set.resolve_sampler(F, GpuConstType::Sampler2D, "gMetalRoughnessSampler", register)?;
            plan.push(
                F,
                call(func::PBR_FETCH_METAL_ROUGHNESS, group::PS_LIGHTING)
                    .input(sampler)
                    .input(uv.fragment_in)
                    .input(surface_specular)
                    .output(metal_roughness),
            );
        }
        None => plan.push(
            F,
            call(func::ASSIGN, group::PS_LIGHTING)
                .input(surface_specular)
                .output(metal_roughness),
        ),
    }

    let base_colour = match vertex_colour {
        Some(colour) if track.contains(TrackVertexColour::DIFFUSE) => colour,
        _ => set.resolve_auto_uniform(F, AutoConstant::SurfaceDiffuseColour, 0)?,
    };
    Ok((base_colour, metal_roughness))
}

/// Ambient and emissive contribution written to the output colour.
fn global_illumination(
    set: &mut ProgramSet,
    plan: &mut Plan,
    ls: ShaderStage,
    lighting_group: i32,
    track: TrackVertexColour,
    targets: &Targets,
) -> Result<()> {
    let out = targets.out_diffuse;
    let vertex_colour = targets.vertex_colour;
    let ambient_tracked = track.contains(TrackVertexColour::AMBIENT) && vertex_colour.is_some();
    let emissive_tracked = track.contains(TrackVertexColour::EMISSIVE) && vertex_colour.is_some();

    if !ambient_tracked && !emissive_tracked {
        let scene = set.resolve_auto_uniform(ls, AutoConstant::DerivedSceneColour, 0)?;
        plan.push(ls, call(func::ASSIGN, lighting_group).input(scene).output(out));
        return Ok(());
    }

    match vertex_colour {
        Some(colour) if ambient_tracked => {
            let ambient = set.resolve_auto_uniform(ls, AutoConstant::AmbientLightColour, 0)?;
            plan.push(ls, call(func::MODULATE, lighting_group).input(ambient).input(colour).output(out));
        }
        _ => {
            let ambient = set.resolve_auto_uniform(ls, AutoConstant::DerivedAmbientLightColour, 0)?;
            plan.push(ls, call(func::ASSIGN, lighting_group).input(ambient).output(out));
        }
    }

    let emissive = match vertex_colour {
        Some(colour) if emissive_tracked => colour,
        _ => set.resolve_auto_uniform(ls, AutoConstant::SurfaceEmissiveColour, 0)?,
    };
    plan.push(
        ls,
        call(func::ADD, lighting_group)
            .input_masked(emissive, OperandMask::XYZ)
            .input_masked(out, OperandMask::XYZ)
            .output_masked(out, OperandMask::XYZ),
    );
    Ok(())
}
