//! Script properties and writer shared by factories and the generator's
//! material script translator.
//!
//! A property is one `name value value...` line inside an `rtshader_system`
//! block. Values are whitespace separated; `#` and `//` start a comment.

use std::fmt::Write as _;

use rtss_core::{Result, ShaderGenError};

/// One parsed script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptProperty {
    pub name: String,
    pub values: Vec<String>,
    /// 1-based source line, for diagnostics.
    pub line: usize,
}

impl ScriptProperty {
    #[must_use]
    pub fn new(name: impl Into<String>, values: &[&str], line: usize) -> Self {
        Self {
            name: name.into(),
            values: values.iter().map(|v| (*v).to_owned()).collect(),
            line,
        }
    }

    /// Splits a script line into a property. Returns `None` for blank and
    /// comment lines.
    #[must_use]
    pub fn parse_line(text: &str, line: usize) -> Option<Self> {
        let text = strip_comment(text).trim();
        let mut tokens = text.split_whitespace();
        let name = tokens.next()?;
        Some(Self {
            name: name.to_owned(),
            values: tokens.map(str::to_owned).collect(),
            line,
        })
    }

    #[must_use]
    pub fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn value_refs(&self) -> Vec<&str> {
        self.values.iter().map(String::as_str).collect()
    }

    /// Builds a [`ShaderGenError::Script`] pointing at this line.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> ShaderGenError {
        ShaderGenError::Script {
            line: self.line,
            message: message.into(),
        }
    }

    pub fn required(&self, index: usize) -> Result<&str> {
        self.value(index)
            .ok_or_else(|| self.error(format!("'{}' expects a value at position {}", self.name, index + 1)))
    }

    pub fn parse_u32(&self, index: usize) -> Result<u32> {
        let raw = self.required(index)?;
        raw.parse()
            .map_err(|_| self.error(format!("'{}': '{raw}' is not an unsigned integer", self.name)))
    }

    pub fn parse_f32(&self, index: usize) -> Result<f32> {
        let raw = self.required(index)?;
        parse_f32(raw).map_err(|_| self.error(format!("'{}': '{raw}' is not a number", self.name)))
    }
}

fn strip_comment(text: &str) -> &str {
    let cut = [text.find('#'), text.find("//")].into_iter().flatten().min();
    match cut {
        Some(at) => &text[..at],
        None => text,
    }
}

/// Parses a script boolean: `true`/`false`, `on`/`off`, `yes`/`no`.
pub fn parse_bool(raw: &str) -> Result<bool> {
    match raw {
        "true" | "on" | "yes" => Ok(true),
        "false" | "off" | "no" => Ok(false),
        _ => Err(ShaderGenError::InvalidParameters(format!("'{raw}' is not a boolean"))),
    }
}

pub fn parse_u32(raw: &str) -> Result<u32> {
    raw.parse()
        .map_err(|_| ShaderGenError::InvalidParameters(format!("'{raw}' is not an unsigned integer")))
}

pub fn parse_f32(raw: &str) -> Result<f32> {
    raw.parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ShaderGenError::InvalidParameters(format!("'{raw}' is not a finite number")))
}

/// Indented line writer used when serialising render states.
#[derive(Debug, Default)]
pub struct ScriptWriter {
    out: String,
    depth: usize,
}

impl ScriptWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `name values...` on its own line.
    pub fn property<I, S>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: std::fmt::Display,
    {
        self.indent();
        self.out.push_str(name);
        for value in values {
            let _ = write!(self.out, " {value}");
        }
        self.out.push('\n');
    }

    pub fn open_block(&mut self, header: &str) {
        self.indent();
        self.out.push_str(header);
        self.out.push('\n');
        self.indent();
        self.out.push_str("{\n");
        self.depth += 1;
    }

    pub fn close_block(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str("}\n");
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push('\t');
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.out
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_line_skips_comments() {
        assert!(ScriptProperty::parse_line("   # only a comment", 1).is_none());
        let prop = ScriptProperty::parse_line("lighting_stage per_pixel // trailing", 4).unwrap();
        assert_eq!(prop.name, "lighting_stage");
        assert_eq!(prop.values, ["per_pixel"]);
        assert_eq!(prop.line, 4);
    }

    #[test]
    fn numeric_errors_carry_the_line() {
        let prop = ScriptProperty::new("light_count", &["1", "x"], 9);
        assert_eq!(prop.parse_u32(0).unwrap(), 1);
        assert!(matches!(prop.parse_u32(1), Err(ShaderGenError::Script { line: 9, .. })));
        assert!(matches!(prop.parse_u32(2), Err(ShaderGenError::Script { line: 9, .. })));
    }

    #[test]
    fn booleans() {
        assert!(parse_bool("on").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(parse_bool("maybe").is_err());
        assert!(parse_f32("inf").is_err());
    }

    #[test]
    fn writer_indents_blocks() {
        let mut writer = ScriptWriter::new();
        writer.open_block("rtshader_system");
        writer.property("light_count", [1, 2, 0]);
        writer.close_block();
        assert_eq!(writer.finish(), "rtshader_system\n{\n\tlight_count 1 2 0\n}\n");
    }
}
