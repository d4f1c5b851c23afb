use rustc_hash::FxHashMap;

use crate::pass::Pass;

/// Scheme of techniques authored by hand.
pub const DEFAULT_SCHEME: &str = "Default";

/// A rendering recipe for one material scheme.
#[derive(Debug, Clone, Default)]
pub struct Technique {
    pub scheme: String,
    pub passes: Vec<Pass>,
}

impl Technique {
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            passes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_pass(mut self, pass: Pass) -> Self {
        self.passes.push(pass);
        self
    }

    /// Whether any pass already carries its own programs.
    #[must_use]
    pub fn is_programmable(&self) -> bool {
        self.passes.iter().any(Pass::is_programmable)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: String,
    pub techniques: Vec<Technique>,
}

impl Material {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            techniques: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_technique(mut self, technique: Technique) -> Self {
        self.techniques.push(technique);
        self
    }

    #[must_use]
    pub fn technique(&self, scheme: &str) -> Option<&Technique> {
        self.techniques.iter().find(|t| t.scheme == scheme)
    }

    pub fn technique_mut(&mut self, scheme: &str) -> Option<&mut Technique> {
        self.techniques.iter_mut().find(|t| t.scheme == scheme)
    }

    /// Removes the first technique of `scheme`.
    pub fn remove_technique(&mut self, scheme: &str) -> Option<Technique> {
        let index = self.techniques.iter().position(|t| t.scheme == scheme)?;
        Some(self.techniques.remove(index))
    }
}

/// Name-keyed material storage owned by the caller.
#[derive(Debug, Default)]
pub struct MaterialLibrary {
    materials: FxHashMap<String, Material>,
}

impl MaterialLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a material, returning the one it replaced.
    pub fn insert(&mut self, material: Material) -> Option<Material> {
        self.materials.insert(material.name.clone(), material)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Material> {
        self.materials.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Material> {
        self.materials.remove(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.materials.keys().map(String::as_str)
    }

    /// Pass `index` of the technique of `scheme` in material `name`.
    #[must_use]
    pub fn pass(&self, name: &str, scheme: &str, index: usize) -> Option<&Pass> {
        self.get(name)?.technique(scheme)?.passes.get(index)
    }

    pub fn pass_mut(&mut self, name: &str, scheme: &str, index: usize) -> Option<&mut Pass> {
        self.get_mut(name)?.technique_mut(scheme)?.passes.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technique_lookup_by_scheme() {
        let mut library = MaterialLibrary::new();
        library.insert(
            Material::new("Rock")
                .with_technique(Technique::new(DEFAULT_SCHEME).with_pass(Pass::new("base"))),
        );

        assert!(library.pass("Rock", DEFAULT_SCHEME, 0).is_some());
        assert!(library.pass("Rock", "Other", 0).is_none());
        assert!(library.pass("Rock", DEFAULT_SCHEME, 1).is_none());

        let material = library.get_mut("Rock").unwrap();
        assert!(material.remove_technique(DEFAULT_SCHEME).is_some());
        assert!(material.techniques.is_empty());
    }
}
