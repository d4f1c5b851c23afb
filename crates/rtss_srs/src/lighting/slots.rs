use glam::{Mat3, Mat4, Vec3, Vec4};

use rtss_core::{Light, LightType};

use crate::sub_render_state::{ParamUpdateContext, StageParam};

/// Upper bound of configured lights per type.
pub const MAX_LIGHTS_PER_TYPE: u32 = 8;

/// Space light positions and directions are pushed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) enum LightSpace {
    #[default]
    View,
    Object,
}

/// How light colours are pre-multiplied before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) struct ColourScale {
    /// Multiply by the surface diffuse colour.
    pub diffuse_by_surface: bool,
    /// Multiply by the surface specular colour.
    pub specular_by_surface: bool,
}

/// Uniform handles of one configured light.
#[derive(Debug, Clone, Copy)]
pub(super) struct LightSlot {
    pub light_type: LightType,
    /// Direction towards the light (directional) or position (point, spot).
    pub position: Option<StageParam>,
    pub attenuation: Option<StageParam>,
    pub spot_direction: Option<StageParam>,
    pub spot_params: Option<StageParam>,
    pub diffuse: Option<StageParam>,
    pub specular: Option<StageParam>,
}

impl LightSlot {
    pub(super) fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            position: None,
            attenuation: None,
            spot_direction: None,
            spot_params: None,
            diffuse: None,
            specular: None,
        }
    }
}

/// Light slots in canonical order plus the per-frame upload rules.
#[derive(Debug, Clone, Default)]
pub(super) struct LightSlots {
    pub slots: Vec<LightSlot>,
    pub space: LightSpace,
    pub scale: ColourScale,
}

impl LightSlots {
    /// Empty slots for `count` lights per type, directional first.
    pub(super) fn for_count(count: [u32; 3], space: LightSpace, scale: ColourScale) -> Self {
        let slots = LightType::ALL
            .into_iter()
            .flat_map(|t| std::iter::repeat_n(t, count[t.index()] as usize))
            .map(LightSlot::new)
            .collect();
        Self { slots, space, scale }
    }

    /// Pushes the visible lights into the slots. Allocation free.
    pub(super) fn update(&self, ctx: &mut ParamUpdateContext<'_>) {
        if self.slots.is_empty() {
            return;
        }

        let (rotation, transform) = match self.space {
            LightSpace::View => (Mat3::from_mat4(ctx.source.view), ctx.source.view),
            LightSpace::Object => {
                let inverse_world = ctx.renderable.world.inverse();
                (Mat3::from_mat4(inverse_world), inverse_world)
            }
        };
        let surface = *ctx.surface;
        let lights = ctx.lights;

        let mut cursor = [0usize; 3];
        for slot in &self.slots {
            let light = next_light(lights, slot.light_type, &mut cursor[slot.light_type.index()]);
            self.upload(ctx, slot, light, rotation, transform, surface.diffuse, surface.specular);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn upload(
        &self,
        ctx: &mut ParamUpdateContext<'_>,
        slot: &LightSlot,
        light: &Light,
        rotation: Mat3,
        transform: Mat4,
        surface_diffuse: Vec4,
        surface_specular: Vec4,
    ) {
        if let Some(param) = slot.position {
            let value = match slot.light_type {
                LightType::Directional => (rotation * -light.direction).normalize_or_zero().extend(0.0),
                LightType::Point | LightType::Spot => transform.transform_point3(light.position).extend(1.0),
            };
            ctx.set_vec4(param, value);
        }
        if let Some(param) = slot.attenuation {
            ctx.set_vec4(param, light.attenuation().to_vec4());
        }
        if let Some(param) = slot.spot_direction {
            ctx.set_vec3(param, -(rotation * light.direction).normalize_or_zero());
        }
        if let Some(param) = slot.spot_params {
            ctx.set_vec3(param, light.spot_params());
        }
        if let Some(param) = slot.diffuse {
            let mut colour = light.scaled_diffuse();
            if self.scale.diffuse_by_surface {
                colour *= surface_diffuse.truncate();
            }
            ctx.set_vec4(param, colour.extend(1.0));
        }
        if let Some(param) = slot.specular {
            let mut colour = light.scaled_specular();
            if self.scale.specular_by_surface {
                colour *= surface_specular.truncate();
            }
            ctx.set_vec4(param, colour.extend(1.0));
        }
    }

    pub(super) fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Next light of `light_type` at or after `cursor`, advancing the cursor.
/// Falls back to [`Light::BLANK`].
fn next_light<'a>(lights: &'a [Light], light_type: LightType, cursor: &mut usize) -> &'a Light {
    let start = (*cursor).min(lights.len());
    match lights[start..].iter().position(|l| l.light_type() == light_type) {
        Some(offset) => {
            let index = start + offset;
            *cursor = index + 1;
            &lights[index]
        }
        None => {
            *cursor = lights.len();
            &Light::BLANK
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtss_core::Attenuation;

    #[test]
    fn slots_are_in_canonical_order() {
        let slots = LightSlots::for_count([1, 2, 1], LightSpace::View, ColourScale::default());
        let types: Vec<_> = slots.slots.iter().map(|s| s.light_type).collect();
        assert_eq!(
            types,
            [LightType::Directional, LightType::Point, LightType::Point, LightType::Spot]
        );
    }

    #[test]
    fn lights_match_by_type_in_scene_order() {
        let spot = Light::new_spot(1, Vec3::ZERO, Vec3::NEG_Z, Vec3::ONE, Attenuation::NONE, 0.5, 1.0);
        let point_a = Light::new_point(2, Vec3::X, Vec3::ONE, Attenuation::NONE);
        let point_b = Light::new_point(3, Vec3::Y, Vec3::ONE, Attenuation::NONE);
        let lights = [spot, point_a, point_b];

        let mut cursor = 0;
        assert_eq!(next_light(&lights, LightType::Point, &mut cursor).id, 2);
        assert_eq!(next_light(&lights, LightType::Point, &mut cursor).id, 3);
        assert_eq!(next_light(&lights, LightType::Point, &mut cursor).id, Light::BLANK.id);

        let mut cursor = 0;
        assert_eq!(next_light(&lights, LightType::Directional, &mut cursor).power, 0.0);
    }
}
