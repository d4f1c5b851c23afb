//! Factory Registry
//!
//! Owns the [`FactoryEntry`]s of a generator. Lookup is by type string;
//! registration order is kept so script properties are offered to factories
//! deterministically.

use rtss_core::{Result, ShaderGenError};
use rtss_srs::ffp::{ColourFactory, FogFactory, TexturingFactory, TransformFactory};
use rtss_srs::{
    FactoryEntry, IntegratedPssmFactory, LightingFactory, LightingKind, ScriptProperty, SubRenderStateFactory,
    SubRenderStateInstance,
};

#[derive(Debug, Default)]
pub struct FactoryRegistry {
    entries: Vec<FactoryEntry>,
}

impl FactoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in factory.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [Box<dyn SubRenderStateFactory>; 9] = [
            Box::new(TransformFactory),
            Box::new(ColourFactory),
            Box::new(LightingFactory::new(LightingKind::Ffp)),
            Box::new(TexturingFactory),
            Box::new(FogFactory),
            Box::new(LightingFactory::new(LightingKind::PerPixel)),
            Box::new(LightingFactory::new(LightingKind::NormalMap)),
            Box::new(LightingFactory::new(LightingKind::CookTorrance)),
            Box::new(IntegratedPssmFactory),
        ];
        for factory in builtins {
            registry.entries.push(FactoryEntry::new(factory));
        }
        registry
    }

    pub fn register(&mut self, factory: Box<dyn SubRenderStateFactory>) -> Result<()> {
        let type_name = factory.type_name();
        if self.get(type_name).is_some() {
            return Err(ShaderGenError::DuplicateItem(format!(
                "sub render state factory '{type_name}'"
            )));
        }
        log::debug!("Registered sub render state factory '{type_name}'");
        self.entries.push(FactoryEntry::new(factory));
        Ok(())
    }

    /// Unregisters a factory. Fails while instances it created are alive.
    pub fn remove(&mut self, type_name: &str) -> Result<()> {
        let index = self.index_of(type_name)?;
        let live = self.entries[index].live_instances();
        if live > 0 {
            return Err(ShaderGenError::FactoryInUse {
                type_name: type_name.to_owned(),
                live,
            });
        }
        let entry = self.entries.remove(index);
        entry.destroy_all_instances();
        Ok(())
    }

    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&FactoryEntry> {
        self.entries.iter().find(|e| e.type_name() == type_name)
    }

    fn index_of(&self, type_name: &str) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.type_name() == type_name)
            .ok_or_else(|| not_found(type_name))
    }

    pub fn create_instance(&self, type_name: &str) -> Result<SubRenderStateInstance> {
        self.get(type_name)
            .map(FactoryEntry::create_instance)
            .ok_or_else(|| not_found(type_name))
    }

    /// Offers `property` to every factory in registration order.
    pub fn create_from_property(&self, property: &ScriptProperty) -> Result<Option<SubRenderStateInstance>> {
        for entry in &self.entries {
            if let Some(instance) = entry.create_from_property(property)? {
                return Ok(Some(instance));
            }
        }
        Ok(None)
    }

    /// Hands an instance back to the factory that created it.
    pub fn destroy_instance(&self, instance: SubRenderStateInstance) -> Result<()> {
        let entry = self.get(instance.type_name()).ok_or_else(|| not_found(instance.type_name()))?;
        // A foreign instance is dropped here after the entry logged it.
        drop(entry.destroy_instance(instance));
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FactoryEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tears down every factory. All instances must be gone.
    pub fn destroy_all(&mut self) {
        for entry in self.entries.drain(..) {
            entry.destroy_all_instances();
        }
    }
}

fn not_found(type_name: &str) -> ShaderGenError {
    ShaderGenError::ItemNotFound(format!("sub render state factory '{type_name}'"))
}

#[cfg(test)]
mod tests {
    use rtss_srs::ffp::Transform;

    use super::*;

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = FactoryRegistry::with_builtins();
        let err = registry.register(Box::new(TransformFactory)).unwrap_err();
        assert!(matches!(err, ShaderGenError::DuplicateItem(_)));
    }

    #[test]
    fn unknown_type_is_not_found() {
        let registry = FactoryRegistry::new();
        assert!(matches!(
            registry.create_instance("SGX_Missing"),
            Err(ShaderGenError::ItemNotFound(_))
        ));
    }

    #[test]
    fn factory_in_use_cannot_be_removed() {
        let mut registry = FactoryRegistry::with_builtins();
        let instance = registry.create_instance(Transform::TYPE).unwrap();
        assert!(matches!(
            registry.remove(Transform::TYPE),
            Err(ShaderGenError::FactoryInUse { live: 1, .. })
        ));

        registry.destroy_instance(instance).unwrap();
        registry.remove(Transform::TYPE).unwrap();
        assert!(registry.get(Transform::TYPE).is_none());
    }

    #[test]
    fn properties_go_to_the_first_accepting_factory() {
        let registry = FactoryRegistry::with_builtins();
        let property = ScriptProperty::new("lighting_stage", &["per_pixel"], 1);
        let instance = registry.create_from_property(&property).unwrap().unwrap();
        assert_eq!(instance.type_name(), rtss_srs::Lighting::PER_PIXEL_TYPE);

        let unknown = ScriptProperty::new("wobble", &[], 2);
        assert!(registry.create_from_property(&unknown).unwrap().is_none());
    }
}
