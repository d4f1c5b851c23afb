use rtss_core::Result;

use super::{Lighting, LightingModel, NormalMapSpace};
use crate::factory::SubRenderStateFactory;
use crate::script::{ScriptProperty, ScriptWriter};
use crate::sub_render_state::SubRenderState;

/// Lighting model a [`LightingFactory`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingKind {
    Ffp,
    PerPixel,
    NormalMap,
    CookTorrance,
}

/// Factory for one lighting model.
///
/// Script forms, all under the `lighting_stage` property:
///
/// ```text
/// lighting_stage ffp
/// lighting_stage per_pixel
/// lighting_stage normal_map <texture> [tangent_space|object_space] [texcoord_index]
/// lighting_stage metal_roughness [texture <texture>]
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LightingFactory {
    kind: LightingKind,
}

impl LightingFactory {
    #[must_use]
    pub fn new(kind: LightingKind) -> Self {
        Self { kind }
    }

    fn keyword(&self) -> &'static str {
        match self.kind {
            LightingKind::Ffp => "ffp",
            LightingKind::PerPixel => "per_pixel",
            LightingKind::NormalMap => "normal_map",
            LightingKind::CookTorrance => "metal_roughness",
        }
    }

    fn parse(&self, property: &ScriptProperty) -> Result<Lighting> {
        let lighting = match self.kind {
            LightingKind::Ffp => Lighting::ffp(),
            LightingKind::PerPixel => Lighting::per_pixel(),
            LightingKind::NormalMap => {
                let texture = property.required(1)?.to_owned();
                let mut space = NormalMapSpace::Tangent;
                let mut texcoord_index = 0;
                let mut next = 2;
                if let Some(raw) = property.value(next)
                    && let Some(parsed) = NormalMapSpace::parse(raw)
                {
                    space = parsed;
                    next += 1;
                }
                if property.value(next).is_some() {
                    texcoord_index = property.parse_u32(next)?;
                    next += 1;
                }
                if let Some(extra) = property.value(next) {
                    return Err(property.error(format!("unexpected normal_map argument '{extra}'")));
                }
                Lighting::new(LightingModel::NormalMap {
                    texture,
                    space,
                    texcoord_index,
                })
            }
            LightingKind::CookTorrance => {
                let metal_roughness = match (property.value(1), property.value(2)) {
                    (None, _) => None,
                    (Some("texture"), Some(texture)) => Some(texture.to_owned()),
                    _ => return Err(property.error("expected 'metal_roughness [texture <name>]'")),
                };
                Lighting::new(LightingModel::CookTorrance { metal_roughness })
            }
        };
        Ok(lighting)
    }
}

impl SubRenderStateFactory for LightingFactory {
    fn type_name(&self) -> &'static str {
        match self.kind {
            LightingKind::Ffp => Lighting::FFP_TYPE,
            LightingKind::PerPixel => Lighting::PER_PIXEL_TYPE,
            LightingKind::NormalMap => Lighting::NORMAL_MAP_TYPE,
            LightingKind::CookTorrance => Lighting::COOK_TORRANCE_TYPE,
        }
    }

    fn create_instance_impl(&self) -> Box<dyn SubRenderState> {
        let lighting = match self.kind {
            LightingKind::Ffp => Lighting::ffp(),
            LightingKind::PerPixel => Lighting::per_pixel(),
            LightingKind::NormalMap => Lighting::normal_map(String::new()),
            LightingKind::CookTorrance => Lighting::cook_torrance(),
        };
        Box::new(lighting)
    }

    fn create_from_property(&self, property: &ScriptProperty) -> Result<Option<Box<dyn SubRenderState>>> {
        if property.name != "lighting_stage" || property.value(0) != Some(self.keyword()) {
            return Ok(None);
        }
        Ok(Some(Box::new(self.parse(property)?)))
    }

    fn write_instance(&self, srs: &dyn SubRenderState, writer: &mut ScriptWriter) {
        let Some(lighting) = srs.as_any().downcast_ref::<Lighting>() else {
            return;
        };
        let mut values = vec![self.keyword().to_owned()];
        match lighting.model() {
            LightingModel::NormalMap {
                texture,
                space,
                texcoord_index,
            } => {
                values.push(texture.clone());
                values.push(space.keyword().to_owned());
                values.push(texcoord_index.to_string());
            }
            LightingModel::CookTorrance {
                metal_roughness: Some(texture),
            } => {
                values.push("texture".to_owned());
                values.push(texture.clone());
            }
            _ => {}
        }
        writer.property("lighting_stage", values);
        lighting.write_properties(writer);
    }
}
