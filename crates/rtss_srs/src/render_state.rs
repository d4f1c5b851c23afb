use rtss_core::{LightType, combine_hashes};

use crate::factory::SubRenderStateInstance;
use crate::sub_render_state::SubRenderState;

/// Ordered collection of SRS instances plus the light layout used by the
/// lighting stages.
///
/// Scheme and pass render states act as templates; the generator builds a
/// target render state per pass from the FFP stages and the templates.
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    sub_states: Vec<SubRenderStateInstance>,
    /// `[directional, point, spot]`
    light_count: [u32; 3],
}

impl RenderState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an SRS. An SRS of the same type is replaced in place and
    /// returned.
    pub fn add(&mut self, instance: SubRenderStateInstance) -> Option<SubRenderStateInstance> {
        match self
            .sub_states
            .iter()
            .position(|s| s.type_name() == instance.type_name())
        {
            Some(at) => Some(std::mem::replace(&mut self.sub_states[at], instance)),
            None => {
                self.sub_states.push(instance);
                None
            }
        }
    }

    pub fn remove(&mut self, type_name: &str) -> Option<SubRenderStateInstance> {
        let at = self.sub_states.iter().position(|s| s.type_name() == type_name)?;
        Some(self.sub_states.remove(at))
    }

    /// Removes every SRS and returns them in order.
    pub fn take_all(&mut self) -> Vec<SubRenderStateInstance> {
        std::mem::take(&mut self.sub_states)
    }

    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&dyn SubRenderState> {
        self.sub_states
            .iter()
            .find(|s| s.type_name() == type_name)
            .map(SubRenderStateInstance::as_srs)
    }

    pub fn get_mut(&mut self, type_name: &str) -> Option<&mut SubRenderStateInstance> {
        self.sub_states.iter_mut().find(|s| s.type_name() == type_name)
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.get(type_name).is_some()
    }

    #[inline]
    #[must_use]
    pub fn sub_states(&self) -> &[SubRenderStateInstance] {
        &self.sub_states
    }

    #[inline]
    pub fn sub_states_mut(&mut self) -> &mut [SubRenderStateInstance] {
        &mut self.sub_states
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sub_states.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sub_states.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn light_count(&self) -> [u32; 3] {
        self.light_count
    }

    pub fn set_light_count(&mut self, light_count: [u32; 3]) {
        self.light_count = light_count;
    }

    #[must_use]
    pub fn light_count_of(&self, light_type: LightType) -> u32 {
        self.light_count[light_type.index()]
    }

    /// Order-sensitive combination of the light count and the member hash
    /// codes.
    #[must_use]
    pub fn hash_code(&self) -> u64 {
        let lights = self.light_count.iter().map(|&count| u64::from(count));
        combine_hashes(lights.chain(self.sub_states.iter().map(|s| s.hash_code())))
    }

    /// Stable sort by execution order; ties keep insertion order.
    pub fn sort_by_execution_order(&mut self) {
        self.sub_states.sort_by_key(|s| s.execution_order());
    }

    pub fn push(&mut self, instance: SubRenderStateInstance) {
        self.sub_states.push(instance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::FactoryEntry;
    use crate::ffp::{ColourFactory, FogFactory, TransformFactory};

    #[test]
    fn add_replaces_same_type() {
        let transforms = FactoryEntry::new(Box::new(TransformFactory));
        let mut state = RenderState::new();
        assert!(state.add(transforms.create_instance()).is_none());
        assert!(state.add(transforms.create_instance()).is_some());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn hash_depends_on_order() {
        let transforms = FactoryEntry::new(Box::new(TransformFactory));
        let colours = FactoryEntry::new(Box::new(ColourFactory));

        let mut ab = RenderState::new();
        ab.push(transforms.create_instance());
        ab.push(colours.create_instance());
        let mut ba = RenderState::new();
        ba.push(colours.create_instance());
        ba.push(transforms.create_instance());

        assert_ne!(ab.hash_code(), ba.hash_code());
        assert_eq!(ab.hash_code(), ab.clone().hash_code());
    }

    #[test]
    fn hash_depends_on_light_count() {
        let transforms = FactoryEntry::new(Box::new(TransformFactory));
        let mut state = RenderState::new();
        state.push(transforms.create_instance());
        let before = state.hash_code();

        state.set_light_count([0, 2, 0]);
        assert_ne!(state.hash_code(), before);
    }

    #[test]
    fn sorting_is_by_execution_order() {
        let transforms = FactoryEntry::new(Box::new(TransformFactory));
        let fogs = FactoryEntry::new(Box::new(FogFactory));
        let mut state = RenderState::new();
        state.push(fogs.create_instance());
        state.push(transforms.create_instance());
        state.sort_by_execution_order();
        let orders: Vec<_> = state.sub_states().iter().map(|s| s.execution_order()).collect();
        assert!(orders.windows(2).all(|w| w[0] <= w[1]));
    }
}
