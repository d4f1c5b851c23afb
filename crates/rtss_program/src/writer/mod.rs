//! Program Writers
//!
//! Turns an assembled [`ProgramSet`] into shading-language source. The
//! language-specific part is small (type names, interface naming, literal
//! syntax); layout of the file comes from minijinja templates embedded in the
//! binary.
//!
//! | Language | Writer | Template |
//! |----------|--------|----------|
//! | GLSL 1.50 | [`GlslWriter`] | `glsl.jinja` |
//! | GLSL ES 1.00 | [`GlslWriter::es`] | `glsl.jinja` |
//! | HLSL SM3 | [`HlslWriter`] | `hlsl.jinja` |

mod glsl;
mod hlsl;

pub use glsl::GlslWriter;
pub use hlsl::HlslWriter;

use std::borrow::Cow;
use std::sync::OnceLock;

use minijinja::{AutoEscape, Environment, Error, ErrorKind, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};

use rtss_core::{ParameterId, Result, ShaderGenError, ShaderStage};

use crate::parameter::Parameter;
use crate::program_set::ProgramSet;

/// Target shading language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShaderLanguage {
    #[default]
    Glsl,
    GlslEs,
    Hlsl,
}

impl ShaderLanguage {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ShaderLanguage::Glsl => "glsl",
            ShaderLanguage::GlslEs => "glsles",
            ShaderLanguage::Hlsl => "hlsl",
        }
    }

    /// Default vertex and fragment profiles.
    #[must_use]
    pub fn default_profiles(self) -> (&'static str, &'static str) {
        match self {
            ShaderLanguage::Glsl => ("glsl150", "glsl150"),
            ShaderLanguage::GlslEs => ("glsles100", "glsles100"),
            ShaderLanguage::Hlsl => ("vs_3_0", "ps_3_0"),
        }
    }
}

/// Writes one stage of a program set as source text.
pub trait ProgramWriter {
    fn language(&self) -> ShaderLanguage;

    fn write(&self, set: &ProgramSet, stage: ShaderStage, program_name: &str) -> Result<String>;
}

/// Writer for `language`.
#[must_use]
pub fn writer_for(language: ShaderLanguage) -> Box<dyn ProgramWriter> {
    match language {
        ShaderLanguage::Glsl => Box::new(GlslWriter::new()),
        ShaderLanguage::GlslEs => Box::new(GlslWriter::es()),
        ShaderLanguage::Hlsl => Box::new(HlslWriter::new()),
    }
}

// ─── Template environment ─────────────────────────────────────────────────────

static WRITER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "src/writer/templates"]
struct WriterTemplates;

fn get_env() -> &'static Environment<'static> {
    WRITER_ENV.get_or_init(|| {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
            .expect("Failed to configure Jinja2 syntax");

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_loader(template_loader);

        env
    })
}

fn template_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if name.ends_with(".jinja") {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.jinja"))
    };

    match WriterTemplates::get(&filename) {
        Some(file) => match std::str::from_utf8(file.data.as_ref()) {
            Ok(source) => Ok(Some(source.to_owned())),
            Err(e) => Err(Error::new(
                ErrorKind::InvalidOperation,
                format!("Template '{filename}' is not UTF-8: {e}"),
            )),
        },
        None => Ok(None),
    }
}

/// Everything a template needs, already formatted for the target language.
#[derive(Debug, Serialize)]
pub(crate) struct ProgramContext {
    pub name: String,
    pub stage: &'static str,
    pub version: u32,
    pub es: bool,
    pub dependencies: Vec<String>,
    pub uniforms: Vec<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub locals: Vec<String>,
    pub body: Vec<String>,
}

pub(crate) fn render(template: &str, context: &ProgramContext) -> Result<String> {
    let env = get_env();
    let template = env
        .get_template(template)
        .map_err(|e| ShaderGenError::Template(e.to_string()))?;
    template
        .render(context)
        .map_err(|e| ShaderGenError::Template(e.to_string()))
}

/// Formats the sorted invocations of `stage`, naming parameters through
/// `name_of`.
pub(crate) fn invocation_lines(
    set: &ProgramSet,
    stage: ShaderStage,
    name_of: impl Fn(&Parameter) -> Cow<'_, str>,
) -> Result<Vec<String>> {
    let function = set.program(stage).entry();
    let mut lines = Vec::with_capacity(function.invocations().len());
    for invocation in function.invocations() {
        let mut args = Vec::with_capacity(invocation.operands.len());
        for operand in &invocation.operands {
            let param = lookup(set, operand.param)?;
            args.push(format!("{}{}", name_of(param), operand.mask.suffix()));
        }
        lines.push(format!("{}({});", invocation.function_name, args.join(", ")));
    }
    Ok(lines)
}

pub(crate) fn lookup(set: &ProgramSet, id: ParameterId) -> Result<&Parameter> {
    set.parameter(id)
        .ok_or_else(|| ShaderGenError::Internal("writer met a dangling parameter handle".into()))
}

/// Literal list such as `0.0, 1.0, 0.5`.
pub(crate) fn literal_list(param: &Parameter) -> String {
    param
        .literal()
        .iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}
