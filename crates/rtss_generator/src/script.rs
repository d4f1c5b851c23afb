//! Material Script Translation
//!
//! Reads and writes the `rtshader_system` block of a material pass:
//!
//! ```text
//! rtshader_system
//! {
//!     light_count 2 1 0
//!     lighting_stage per_pixel
//!     normalise_normals on
//!     integrated_pssm 1 40 200 1000
//! }
//! ```
//!
//! Each line is offered to the registered factories first. A line no factory
//! claims configures the most recently created SRS, and `light_count` falls
//! through to the render state itself.

use rtss_core::{Result, ShaderGenError};
use rtss_srs::{RenderState, ScriptProperty, ScriptWriter};

use crate::registry::FactoryRegistry;

/// Keyword opening a render state block.
pub const BLOCK_HEADER: &str = "rtshader_system";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    /// Bare property lines without a header.
    Bare,
    Header,
    Open,
    Closed,
}

/// Parses a script block into a render state template.
///
/// The `rtshader_system { }` wrapper is optional. Line numbers in errors are
/// 1-based and relative to `text`.
pub fn parse_render_state(registry: &FactoryRegistry, text: &str) -> Result<RenderState> {
    let mut state = RenderState::new();
    let mut block = Block::Bare;
    let mut last: Option<&'static str> = None;
    let mut last_line = 0;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let Some(property) = ScriptProperty::parse_line(raw, line) else {
            continue;
        };
        last_line = line;

        match (property.name.as_str(), block) {
            (BLOCK_HEADER, Block::Bare) if state.is_empty() && last.is_none() => {
                block = match property.value_refs().as_slice() {
                    [] => Block::Header,
                    ["{"] => Block::Open,
                    _ => return Err(property.error(format!("unexpected tokens after '{BLOCK_HEADER}'"))),
                };
                continue;
            }
            ("{", Block::Header) if property.values.is_empty() => {
                block = Block::Open;
                continue;
            }
            ("}", Block::Open) if property.values.is_empty() => {
                block = Block::Closed;
                continue;
            }
            (_, Block::Header) => return Err(property.error(format!("expected '{{' after '{BLOCK_HEADER}'"))),
            (_, Block::Closed) => return Err(property.error("content after the end of the block")),
            ("{" | "}", _) => return Err(property.error(format!("unbalanced '{}'", property.name))),
            _ => {}
        }

        apply_property(registry, &mut state, &mut last, &property)?;
    }

    if matches!(block, Block::Header | Block::Open) {
        return Err(ShaderGenError::Script {
            line: last_line,
            message: format!("unterminated '{BLOCK_HEADER}' block"),
        });
    }
    Ok(state)
}

fn apply_property(
    registry: &FactoryRegistry,
    state: &mut RenderState,
    last: &mut Option<&'static str>,
    property: &ScriptProperty,
) -> Result<()> {
    if let Some(instance) = registry.create_from_property(property)? {
        let type_name = instance.type_name();
        if state.add(instance).is_some() {
            log::warn!("Line {}: '{type_name}' declared twice, keeping the last", property.line);
        }
        *last = Some(type_name);
        return Ok(());
    }

    let values = property.value_refs();
    let rejected = match last.and_then(|type_name| state.get_mut(type_name)) {
        Some(srs) => match srs.set_parameter(&property.name, &values) {
            Ok(()) => return Ok(()),
            Err(err) => Some(err),
        },
        None => None,
    };

    if property.name == "light_count" {
        let count = [property.parse_u32(0)?, property.parse_u32(1)?, property.parse_u32(2)?];
        if values.len() != 3 {
            return Err(property.error("'light_count' expects three values"));
        }
        state.set_light_count(count);
        return Ok(());
    }

    Err(match rejected {
        Some(err) => property.error(err.to_string()),
        None => property.error(format!("unknown property '{}'", property.name)),
    })
}

/// Writes `state` as an `rtshader_system` block that parses back into an
/// equally hashing render state.
pub fn write_render_state(registry: &FactoryRegistry, state: &RenderState) -> Result<String> {
    let mut writer = ScriptWriter::new();
    writer.open_block(BLOCK_HEADER);
    if state.light_count() != [0; 3] {
        writer.property("light_count", state.light_count());
    }
    for srs in state.sub_states() {
        let entry = registry.get(srs.type_name()).ok_or_else(|| {
            ShaderGenError::ItemNotFound(format!("sub render state factory '{}'", srs.type_name()))
        })?;
        entry.write_instance(srs.as_srs(), &mut writer);
    }
    writer.close_block();
    Ok(writer.finish())
}

#[cfg(test)]
mod tests {
    use rtss_srs::ffp::Fog;
    use rtss_srs::{IntegratedPssm, Lighting};

    use super::*;

    #[test]
    fn parses_wrapped_block() {
        let registry = FactoryRegistry::with_builtins();
        let state = parse_render_state(
            &registry,
            "rtshader_system\n{\n  light_count 2 1 0\n  lighting_stage per_pixel\n}\n",
        )
        .unwrap();
        assert_eq!(state.light_count(), [2, 1, 0]);
        assert!(state.contains(Lighting::PER_PIXEL_TYPE));
    }

    #[test]
    fn bare_lines_are_accepted() {
        let registry = FactoryRegistry::with_builtins();
        let state = parse_render_state(&registry, "fog_stage ffp per_pixel\nintegrated_pssm 1 10 100").unwrap();
        assert!(state.contains(Fog::TYPE));
        assert!(state.contains(IntegratedPssm::TYPE));
        assert_eq!(state.light_count(), [0; 3]);
    }

    #[test]
    fn parameters_go_to_the_last_sub_render_state() {
        let registry = FactoryRegistry::with_builtins();
        let state = parse_render_state(
            &registry,
            "rtshader_system {\n lighting_stage per_pixel\n light_count 0 3 0\n normalise_normals on\n}",
        )
        .unwrap();
        let lighting = state.get(Lighting::PER_PIXEL_TYPE).unwrap();
        let lighting = lighting.as_any().downcast_ref::<Lighting>().unwrap();
        assert_eq!(lighting.light_count(), Some([0, 3, 0]));
        assert!(lighting.normalise());
        assert_eq!(state.light_count(), [0; 3]);
    }

    #[test]
    fn errors_carry_line_numbers() {
        let registry = FactoryRegistry::with_builtins();
        let cases = [
            ("rtshader_system\n{\n  wobble 1\n}", 3),
            ("lighting_stage per_pixel\nnormalise_normals maybe", 2),
            ("rtshader_system\n{\n  lighting_stage per_pixel\n", 3),
            ("rtshader_system\n{\n}\nlighting_stage ffp", 4),
            ("rtshader_system\nlighting_stage ffp", 2),
            ("light_count 1 x 0", 1),
        ];
        for (text, expected) in cases {
            match parse_render_state(&registry, text) {
                Err(ShaderGenError::Script { line, .. }) => assert_eq!(line, expected, "{text:?}"),
                other => panic!("{text:?}: expected a script error, got {other:?}"),
            }
        }
    }

    #[test]
    fn written_block_parses_to_the_same_hash() {
        let registry = FactoryRegistry::with_builtins();
        let text = "rtshader_system\n{\n  light_count 1 2 0\n  lighting_stage normal_map bumps.png object_space 1\n  \
                    integrated_pssm 1 40 200 1000\n  debug on\n  fog_stage ffp per_pixel\n}\n";
        let state = parse_render_state(&registry, text).unwrap();
        assert_eq!(state.len(), 3);

        let written = write_render_state(&registry, &state).unwrap();
        let reparsed = parse_render_state(&registry, &written).unwrap();
        assert_eq!(reparsed.hash_code(), state.hash_code());
        assert_eq!(reparsed.light_count(), [1, 2, 0]);
        assert_eq!(write_render_state(&registry, &reparsed).unwrap(), written);
    }
}
