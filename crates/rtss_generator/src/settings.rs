use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rtss_core::{Result, ShaderGenError};
use rtss_program::{ProgramLimits, ShaderLanguage};

/// Configuration of a [`crate::ShaderGenerator`].
///
/// # Fields
///
/// | Field                  | Description                                   | Default          |
/// |------------------------|-----------------------------------------------|------------------|
/// | `language`             | Target shading language                       | `glsl`           |
/// | `vertex_profile`       | Vertex profile, `None` uses the language's    | `None`           |
/// | `fragment_profile`     | Fragment profile, `None` uses the language's  | `None`           |
/// | `default_light_count`  | `[directional, point, spot]` for new schemes  | `[1, 0, 0]`      |
/// | `limits`               | Finite resources of the target profile        | see [`ProgramLimits`] |
/// | `log_generated_source` | Log every generated program at debug level    | `false`          |
/// | `shader_cache_path`    | Directory generated sources are written to and reused from | `None` |
///
/// # Example
///
/// ```rust,ignore
/// let settings = ShaderGeneratorSettings::from_json(r#"{ "language": "hlsl" }"#)?;
/// assert_eq!(settings.profile_key().vertex, "vs_3_0");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderGeneratorSettings {
    pub language: ShaderLanguage,
    pub vertex_profile: Option<String>,
    pub fragment_profile: Option<String>,
    pub default_light_count: [u32; 3],
    pub limits: ProgramLimits,
    pub log_generated_source: bool,
    pub shader_cache_path: Option<PathBuf>,
}

impl Default for ShaderGeneratorSettings {
    fn default() -> Self {
        Self {
            language: ShaderLanguage::Glsl,
            vertex_profile: None,
            fragment_profile: None,
            default_light_count: [1, 0, 0],
            limits: ProgramLimits::default(),
            log_generated_source: false,
            shader_cache_path: None,
        }
    }
}

/// Language and profiles a program was compiled for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    pub language: ShaderLanguage,
    pub vertex: String,
    pub fragment: String,
}

impl ShaderGeneratorSettings {
    /// Parses settings from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.limits.max_texture_units == 0 || self.limits.max_uniform_vectors == 0 {
            return Err(ShaderGenError::Settings(
                "limits must allow at least one texture unit and one uniform vector".into(),
            ));
        }
        if let Some(path) = &self.shader_cache_path
            && path.is_file()
        {
            return Err(ShaderGenError::Settings(format!(
                "shader cache path '{}' is not a directory",
                path.display()
            )));
        }
        for profile in [&self.vertex_profile, &self.fragment_profile].into_iter().flatten() {
            if profile.trim().is_empty() {
                return Err(ShaderGenError::Settings("shader profiles must not be empty".into()));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn profile_key(&self) -> ProfileKey {
        let (vertex, fragment) = self.language.default_profiles();
        ProfileKey {
            language: self.language,
            vertex: self.vertex_profile.clone().unwrap_or_else(|| vertex.to_owned()),
            fragment: self.fragment_profile.clone().unwrap_or_else(|| fragment.to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default() {
        let settings = ShaderGeneratorSettings::from_json(r#"{ "language": "hlsl" }"#).unwrap();
        assert_eq!(settings.language, ShaderLanguage::Hlsl);
        assert_eq!(settings.default_light_count, [1, 0, 0]);
        let key = settings.profile_key();
        assert_eq!((key.vertex.as_str(), key.fragment.as_str()), ("vs_3_0", "ps_3_0"));
    }

    #[test]
    fn explicit_profiles_win() {
        let settings = ShaderGeneratorSettings {
            language: ShaderLanguage::GlslEs,
            fragment_profile: Some("glsles300".into()),
            ..Default::default()
        };
        let key = settings.profile_key();
        assert_eq!(key.vertex, "glsles100");
        assert_eq!(key.fragment, "glsles300");
    }

    #[test]
    fn json_round_trip() {
        let settings = ShaderGeneratorSettings {
            default_light_count: [2, 4, 1],
            log_generated_source: true,
            shader_cache_path: Some(PathBuf::from("cache/shaders")),
            ..Default::default()
        };
        let parsed = ShaderGeneratorSettings::from_json(&settings.to_json().unwrap()).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn rejects_zero_limits() {
        let err = ShaderGeneratorSettings::from_json(r#"{ "limits": { "max_texture_units": 0 } }"#).unwrap_err();
        assert!(matches!(err, ShaderGenError::Settings(_)));
        assert!(ShaderGeneratorSettings::from_json("{ not json").is_err());
    }
}
