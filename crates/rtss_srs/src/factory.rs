//! Sub Render State Factories
//!
//! Every SRS is created through the factory registered for its type string.
//! The factory entry hands out [`SubRenderStateInstance`]s carrying an
//! ownership ticket, which lets the entry count live instances and refuse
//! foreign ones without keeping a list of them.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use rtss_core::Result;

use crate::script::{ScriptProperty, ScriptWriter};
use crate::sub_render_state::{GenerationState, SubRenderState};

/// Type-specific half of a factory.
pub trait SubRenderStateFactory {
    /// Type string of the SRSs this factory creates.
    fn type_name(&self) -> &'static str;

    /// A fresh SRS in its default configuration.
    fn create_instance_impl(&self) -> Box<dyn SubRenderState>;

    /// Builds an SRS from a script property, or `Ok(None)` when the property
    /// is not addressed to this factory.
    fn create_from_property(&self, _property: &ScriptProperty) -> Result<Option<Box<dyn SubRenderState>>> {
        Ok(None)
    }

    /// Writes the script form of `srs`. Nothing by default.
    fn write_instance(&self, _srs: &dyn SubRenderState, _writer: &mut ScriptWriter) {}
}

/// A factory-created SRS.
///
/// Duplicating an instance keeps it owned by the same factory.
pub struct SubRenderStateInstance {
    srs: Box<dyn SubRenderState>,
    ticket: Arc<()>,
    state: GenerationState,
}

impl SubRenderStateInstance {
    /// Independent copy with the same configuration and owner.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            srs: self.srs.clone_box(),
            ticket: Arc::clone(&self.ticket),
            state: GenerationState::Created,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn set_state(&mut self, state: GenerationState) {
        self.state = state;
    }

    #[must_use]
    pub fn as_srs(&self) -> &dyn SubRenderState {
        self.srs.as_ref()
    }

    pub fn as_srs_mut(&mut self) -> &mut dyn SubRenderState {
        self.srs.as_mut()
    }

    /// Downcasts to the concrete SRS type.
    #[must_use]
    pub fn downcast_ref<T: SubRenderState>(&self) -> Option<&T> {
        self.srs.as_any().downcast_ref::<T>()
    }

    fn is_owned_by(&self, tracker: &Arc<()>) -> bool {
        Arc::ptr_eq(&self.ticket, tracker)
    }
}

impl Clone for SubRenderStateInstance {
    fn clone(&self) -> Self {
        self.duplicate()
    }
}

impl Deref for SubRenderStateInstance {
    type Target = dyn SubRenderState;

    fn deref(&self) -> &Self::Target {
        self.srs.as_ref()
    }
}

impl DerefMut for SubRenderStateInstance {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.srs.as_mut()
    }
}

impl std::fmt::Debug for SubRenderStateInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubRenderStateInstance")
            .field("type", &self.srs.type_name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// A registered factory and the bookkeeping of its live instances.
pub struct FactoryEntry {
    factory: Box<dyn SubRenderStateFactory>,
    tracker: Arc<()>,
}

impl FactoryEntry {
    #[must_use]
    pub fn new(factory: Box<dyn SubRenderStateFactory>) -> Self {
        Self {
            factory,
            tracker: Arc::new(()),
        }
    }

    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.factory.type_name()
    }

    #[inline]
    #[must_use]
    pub fn factory(&self) -> &dyn SubRenderStateFactory {
        self.factory.as_ref()
    }

    #[must_use]
    pub fn create_instance(&self) -> SubRenderStateInstance {
        self.wrap(self.factory.create_instance_impl())
    }

    pub fn create_from_property(&self, property: &ScriptProperty) -> Result<Option<SubRenderStateInstance>> {
        Ok(self.factory.create_from_property(property)?.map(|srs| self.wrap(srs)))
    }

    fn wrap(&self, srs: Box<dyn SubRenderState>) -> SubRenderStateInstance {
        debug_assert_eq!(srs.type_name(), self.type_name(), "factory produced a foreign type");
        SubRenderStateInstance {
            srs,
            ticket: Arc::clone(&self.tracker),
            state: GenerationState::Created,
        }
    }

    /// Destroys an instance created by this factory. A foreign instance is
    /// left untouched and returned.
    pub fn destroy_instance(&self, instance: SubRenderStateInstance) -> Option<SubRenderStateInstance> {
        if instance.is_owned_by(&self.tracker) {
            drop(instance);
            None
        } else {
            log::warn!(
                "Factory '{}' asked to destroy a '{}' it did not create",
                self.type_name(),
                instance.type_name()
            );
            Some(instance)
        }
    }

    #[must_use]
    pub fn owns(&self, instance: &SubRenderStateInstance) -> bool {
        instance.is_owned_by(&self.tracker)
    }

    /// Number of instances of this factory still alive anywhere.
    #[must_use]
    pub fn live_instances(&self) -> usize {
        Arc::strong_count(&self.tracker) - 1
    }

    /// Final teardown check: every instance must have been destroyed by now.
    ///
    /// # Panics
    /// Panics when instances are still alive.
    pub fn destroy_all_instances(&self) {
        let live = self.live_instances();
        assert_eq!(
            live,
            0,
            "factory '{}' torn down with {live} live instance(s)",
            self.type_name()
        );
    }

    pub fn write_instance(&self, srs: &dyn SubRenderState, writer: &mut ScriptWriter) {
        self.factory.write_instance(srs, writer);
    }
}

impl std::fmt::Debug for FactoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryEntry")
            .field("type", &self.type_name())
            .field("live", &self.live_instances())
            .finish()
    }
}
