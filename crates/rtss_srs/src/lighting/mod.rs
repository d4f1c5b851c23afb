//! Lighting Stages
//!
//! One [`Lighting`] SRS implements every lighting model; the
//! [`LightingModel`] decides which stage evaluates the lights and which
//! library functions are called.
//!
//! | Model | Type string | Evaluated in |
//! |-------|-------------|--------------|
//! | [`LightingModel::Ffp`] | `FFP_Lighting` | vertex stage |
//! | [`LightingModel::PerPixel`] | `SGX_PerPixelLighting` | fragment stage, view space |
//! | [`LightingModel::NormalMap`] | `SGX_NormalMapLighting` | fragment stage, tangent or object space |
//! | [`LightingModel::CookTorrance`] | `SGX_CookTorranceLighting` | fragment stage, metal/roughness |
//!
//! Light uniforms are laid out in canonical slot order: all directional
//! slots, then point, then spot. Every frame the visible lights are matched
//! to slots by type in scene order; unmatched slots receive
//! [`rtss_core::Light::BLANK`].

mod emit;
mod factory;
mod slots;

pub use factory::{LightingFactory, LightingKind};
pub use slots::MAX_LIGHTS_PER_TYPE;

use std::any::Any;

use rtss_core::{LightType, Result, ShaderGenError, ShaderStage, StateHasher};
use rtss_program::ProgramSet;
use rtss_resources::{LightIteration, TextureContent, TextureUnit, TrackVertexColour, VertexFeatures};

use crate::script::{ScriptWriter, parse_bool, parse_u32};
use crate::shader_lib::order;
use crate::sub_render_state::{
    InternalCounter, ParamUpdateContext, PreAddContext, SubRenderState, same_type, unresolved,
};

use self::emit::Plan;
use self::slots::LightSlots;

/// Space the normal map is authored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalMapSpace {
    #[default]
    Tangent,
    Object,
}

impl NormalMapSpace {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            Self::Tangent => "tangent_space",
            Self::Object => "object_space",
        }
    }

    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "tangent_space" => Some(Self::Tangent),
            "object_space" => Some(Self::Object),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LightingModel {
    Ffp,
    PerPixel,
    NormalMap {
        texture: String,
        space: NormalMapSpace,
        texcoord_index: u32,
    },
    CookTorrance {
        metal_roughness: Option<String>,
    },
}

impl LightingModel {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Ffp => Lighting::FFP_TYPE,
            Self::PerPixel => Lighting::PER_PIXEL_TYPE,
            Self::NormalMap { .. } => Lighting::NORMAL_MAP_TYPE,
            Self::CookTorrance { .. } => Lighting::COOK_TORRANCE_TYPE,
        }
    }

    /// Stage that evaluates the lights.
    #[must_use]
    pub fn lighting_stage(&self) -> ShaderStage {
        match self {
            Self::Ffp => ShaderStage::Vertex,
            _ => ShaderStage::Fragment,
        }
    }

    fn discriminant(&self) -> u32 {
        match self {
            Self::Ffp => 0,
            Self::PerPixel => 1,
            Self::NormalMap { .. } => 2,
            Self::CookTorrance { .. } => 3,
        }
    }
}

/// Lighting SRS shared by all lighting models.
#[derive(Debug, Clone)]
pub struct Lighting {
    model: LightingModel,
    /// `None` inherits the render state's light count.
    light_count: Option<[u32; 3]>,
    normalise: bool,

    // Derived from the pass in `pre_add_to_render_state`.
    active_count: [u32; 3],
    track_vertex_colour: TrackVertexColour,
    specular: bool,
    texture_register: Option<u32>,

    // Generation output.
    slots: LightSlots,
    plan: Option<Plan>,
}

impl Lighting {
    pub const FFP_TYPE: &'static str = "FFP_Lighting";
    pub const PER_PIXEL_TYPE: &'static str = "SGX_PerPixelLighting";
    pub const NORMAL_MAP_TYPE: &'static str = "SGX_NormalMapLighting";
    pub const COOK_TORRANCE_TYPE: &'static str = "SGX_CookTorranceLighting";

    #[must_use]
    pub fn new(model: LightingModel) -> Self {
        Self {
            model,
            light_count: None,
            normalise: false,
            active_count: [0; 3],
            track_vertex_colour: TrackVertexColour::empty(),
            specular: false,
            texture_register: None,
            slots: LightSlots::default(),
            plan: None,
        }
    }

    #[must_use]
    pub fn ffp() -> Self {
        Self::new(LightingModel::Ffp)
    }

    #[must_use]
    pub fn per_pixel() -> Self {
        Self::new(LightingModel::PerPixel)
    }

    #[must_use]
    pub fn normal_map(texture: impl Into<String>) -> Self {
        Self::new(LightingModel::NormalMap {
            texture: texture.into(),
            space: NormalMapSpace::Tangent,
            texcoord_index: 0,
        })
    }

    #[must_use]
    pub fn cook_torrance() -> Self {
        Self::new(LightingModel::CookTorrance { metal_roughness: None })
    }

    #[inline]
    #[must_use]
    pub fn model(&self) -> &LightingModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut LightingModel {
        &mut self.model
    }

    #[must_use]
    pub fn light_count(&self) -> Option<[u32; 3]> {
        self.light_count
    }

    /// Pins the light count instead of inheriting it from the render state.
    pub fn set_light_count(&mut self, light_count: [u32; 3]) {
        self.light_count = Some(light_count);
        self.active_count = light_count;
    }

    /// Light count the generated programs are built for.
    #[must_use]
    pub fn active_light_count(&self) -> [u32; 3] {
        self.active_count
    }

    #[must_use]
    pub fn normalise(&self) -> bool {
        self.normalise
    }

    pub fn set_normalise(&mut self, normalise: bool) {
        self.normalise = normalise;
    }

    #[must_use]
    pub fn specular_enabled(&self) -> bool {
        self.specular
    }

    #[must_use]
    pub fn track_vertex_colour(&self) -> TrackVertexColour {
        self.track_vertex_colour
    }

    /// Texture unit staged for the normal or metal/roughness map.
    #[must_use]
    pub fn texture_register(&self) -> Option<u32> {
        self.texture_register
    }

    fn resolve_light_count(&self, ctx: &PreAddContext<'_>) -> Result<[u32; 3]> {
        let mut count = match ctx.pass.light_iteration {
            LightIteration::Once => self.light_count.unwrap_or(ctx.light_count),
            LightIteration::PerLight(Some(light_type)) => {
                let mut single = [0; 3];
                single[light_type.index()] = 1;
                single
            }
            LightIteration::PerLight(None) => {
                return Err(ShaderGenError::InvalidParameters(format!(
                    "pass '{}' iterates per light without a light type",
                    ctx.pass.name
                )));
            }
        };
        for light_type in LightType::ALL {
            let n = &mut count[light_type.index()];
            if *n > MAX_LIGHTS_PER_TYPE {
                log::warn!(
                    "{}: clamping {} {} lights to {MAX_LIGHTS_PER_TYPE}",
                    self.type_name(),
                    n,
                    light_type.name()
                );
                *n = MAX_LIGHTS_PER_TYPE;
            }
        }
        Ok(count)
    }
}

impl SubRenderState for Lighting {
    fn type_name(&self) -> &'static str {
        self.model.type_name()
    }

    fn execution_order(&self) -> i32 {
        order::FFP_LIGHTING
    }

    fn hash_code(&self) -> u64 {
        let mut hasher = StateHasher::for_type(self.type_name());
        hasher
            .write_u32(self.model.discriminant())
            .write_bool(self.light_count.is_some())
            .write_u32(self.active_count[0])
            .write_u32(self.active_count[1])
            .write_u32(self.active_count[2])
            .write_u32(self.track_vertex_colour.bits())
            .write_bool(self.specular)
            .write_bool(self.normalise)
            .write_u32(self.texture_register.unwrap_or(u32::MAX));
        match &self.model {
            LightingModel::NormalMap {
                space, texcoord_index, ..
            } => {
                hasher.write_u32(*space as u32).write_u32(*texcoord_index);
            }
            LightingModel::CookTorrance { metal_roughness } => {
                hasher.write_bool(metal_roughness.is_some());
            }
            LightingModel::Ffp | LightingModel::PerPixel => {}
        }
        hasher.digest()
    }

    fn copy_from(&mut self, other: &dyn SubRenderState) -> Result<()> {
        let other = same_type::<Self>(self, other)?;
        self.model.clone_from(&other.model);
        self.light_count = other.light_count;
        self.normalise = other.normalise;
        self.active_count = other.active_count;
        self.track_vertex_colour = other.track_vertex_colour;
        self.specular = other.specular;
        self.texture_register = other.texture_register;
        Ok(())
    }

    fn pre_add_to_render_state(&mut self, ctx: &mut PreAddContext<'_>) -> Result<bool> {
        let pass = ctx.pass;
        if !pass.lighting_enabled {
            return Ok(false);
        }
        if !pass.vertex_features.contains(VertexFeatures::NORMAL) {
            log::warn!("{}: pass '{}' has no vertex normals", self.type_name(), pass.name);
            return Ok(false);
        }
        if let LightingModel::NormalMap {
            space: NormalMapSpace::Tangent,
            ..
        } = self.model
            && !pass.vertex_features.contains(VertexFeatures::TANGENT)
        {
            log::warn!(
                "{}: pass '{}' has no vertex tangents, tangent space normal mapping unavailable",
                self.type_name(),
                pass.name
            );
            return Ok(false);
        }

        self.active_count = self.resolve_light_count(ctx)?;

        let requested = pass.surface.track_vertex_colour;
        self.track_vertex_colour = if pass.vertex_features.contains(VertexFeatures::COLOUR) {
            requested
        } else {
            if !requested.is_empty() {
                log::debug!("Pass '{}' tracks vertex colour without vertex colours", pass.name);
            }
            TrackVertexColour::empty()
        };
        self.specular = match self.model {
            LightingModel::CookTorrance { .. } => true,
            _ => pass.surface.has_specular(),
        };

        self.texture_register = match &self.model {
            LightingModel::NormalMap {
                texture, texcoord_index, ..
            } => Some(ctx.add_texture_unit(TextureUnit {
                texture: texture.clone(),
                texcoord_set: *texcoord_index,
                content: TextureContent::NormalMap,
                ..Default::default()
            })),
            LightingModel::CookTorrance {
                metal_roughness: Some(texture),
            } => Some(ctx.add_texture_unit(TextureUnit {
                texture: texture.clone(),
                texcoord_set: 0,
                content: TextureContent::MetalRoughness,
                ..Default::default()
            })),
            _ => None,
        };
        Ok(true)
    }

    fn resolve_parameters(&mut self, set: &mut ProgramSet) -> Result<()> {
        let (plan, slots) = emit::resolve(self, set)?;
        self.plan = Some(plan);
        self.slots = slots;
        Ok(())
    }

    fn resolve_dependencies(&mut self, set: &mut ProgramSet) -> Result<()> {
        emit::dependencies(&self.model, set);
        Ok(())
    }

    fn add_function_invocations(&mut self, set: &mut ProgramSet, counter: &mut InternalCounter) -> Result<()> {
        let plan = self.plan.as_ref().ok_or_else(|| unresolved(self.type_name()))?;
        plan.commit(set, counter);
        Ok(())
    }

    fn update_gpu_programs_params(&self, ctx: &mut ParamUpdateContext<'_>) {
        self.slots.update(ctx);
    }

    fn set_parameter(&mut self, name: &str, values: &[&str]) -> Result<()> {
        match (name, values) {
            ("light_count", [d, p, s]) => {
                self.set_light_count([parse_u32(d)?, parse_u32(p)?, parse_u32(s)?]);
                Ok(())
            }
            ("normalise_normals", [raw]) => {
                self.normalise = parse_bool(raw)?;
                Ok(())
            }
            _ => Err(ShaderGenError::InvalidParameters(format!(
                "{} has no parameter '{name}' taking {} value(s)",
                self.type_name(),
                values.len()
            ))),
        }
    }

    fn write_properties(&self, writer: &mut ScriptWriter) {
        if let Some(count) = self.light_count {
            writer.property("light_count", count);
        }
        if self.normalise {
            writer.property("normalise_normals", ["on"]);
        }
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        let mut copy = Self::new(self.model.clone());
        copy.light_count = self.light_count;
        copy.normalise = self.normalise;
        copy.active_count = self.active_count;
        copy.track_vertex_colour = self.track_vertex_colour;
        copy.specular = self.specular;
        copy.texture_register = self.texture_register;
        Box::new(copy)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
