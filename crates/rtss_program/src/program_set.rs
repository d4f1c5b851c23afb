//! Program Set
//!
//! The scratch workspace of one generation pass: a parameter arena plus the
//! vertex and fragment [`Program`]s being assembled. Every `resolve_*` method
//! deduplicates, so sub render states asking for the same value share one
//! [`ParameterId`].
//!
//! | Method | Deduplicated by |
//! |--------|-----------------|
//! | [`ProgramSet::resolve_auto_uniform`] | auto constant + index |
//! | [`ProgramSet::resolve_uniform`]      | never (unique name)   |
//! | [`ProgramSet::resolve_sampler`]      | texture unit          |
//! | [`ProgramSet::resolve_input`] / [`ProgramSet::resolve_output`] | content, then semantic + index |
//! | [`ProgramSet::resolve_varying`]      | content of the vertex output |
//! | [`ProgramSet::resolve_local`]        | content, or name when content is unknown |
//!
//! Texcoord varyings are not checked against the profile while they are
//! resolved. [`ProgramSet::compact_varyings`] packs them into the available
//! slots once every sub render state has contributed.

use std::borrow::Cow;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use smallvec::SmallVec;

use rtss_core::{AutoConstant, GpuConstType, ParameterId, Result, ShaderGenError, ShaderStage};
use rtss_resources::UniformLayout;

use crate::function::{FunctionInvocation, OperandMask};
use crate::parameter::{Content, Parameter, Scope, Semantic, Variability};
use crate::program::Program;

/// Finite resources of the target shader profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramLimits {
    pub max_texcoord_sets: u32,
    pub max_uniform_vectors: usize,
    pub max_texture_units: u32,
}

impl Default for ProgramLimits {
    fn default() -> Self {
        Self {
            max_texcoord_sets: 8,
            max_uniform_vectors: 256,
            max_texture_units: 16,
        }
    }
}

/// Library routine moving varyings in and out of shared slots.
const PACK_FUNCTION: &str = "FFP_Assign";
const PACK_LIBRARY: &str = "FFPLib_Common";

/// Vertex output and matching fragment input of an interpolated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Varying {
    pub vertex_out: ParameterId,
    pub fragment_in: ParameterId,
}

#[derive(Debug)]
pub struct ProgramSet {
    params: SlotMap<ParameterId, Parameter>,
    vertex: Program,
    fragment: Program,
    limits: ProgramLimits,
    name_counters: FxHashMap<(ShaderStage, String), u32>,
}

impl Default for ProgramSet {
    fn default() -> Self {
        Self::new(ProgramLimits::default())
    }
}

impl ProgramSet {
    #[must_use]
    pub fn new(limits: ProgramLimits) -> Self {
        Self {
            params: SlotMap::with_key(),
            vertex: Program::new(ShaderStage::Vertex),
            fragment: Program::new(ShaderStage::Fragment),
            limits,
            name_counters: FxHashMap::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn limits(&self) -> &ProgramLimits {
        &self.limits
    }

    #[inline]
    #[must_use]
    pub fn program(&self, stage: ShaderStage) -> &Program {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }

    #[inline]
    pub fn program_mut(&mut self, stage: ShaderStage) -> &mut Program {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Fragment => &mut self.fragment,
        }
    }

    #[inline]
    #[must_use]
    pub fn parameter(&self, id: ParameterId) -> Option<&Parameter> {
        self.params.get(id)
    }

    #[inline]
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    pub fn add_dependency(&mut self, stage: ShaderStage, library: impl Into<Cow<'static, str>>) {
        self.program_mut(stage).add_dependency(library);
    }

    pub fn add_invocation(&mut self, stage: ShaderStage, invocation: FunctionInvocation) {
        self.program_mut(stage).entry.add_invocation(invocation);
    }

    // ─── Uniforms ─────────────────────────────────────────────────────────────

    /// Engine-filled uniform, shared by every requester in the stage.
    pub fn resolve_auto_uniform(
        &mut self,
        stage: ShaderStage,
        constant: AutoConstant,
        index: u32,
    ) -> Result<ParameterId> {
        let existing = self
            .program(stage)
            .uniforms
            .iter()
            .copied()
            .find(|&id| self.params[id].auto == Some((constant, index)));
        if let Some(id) = existing {
            return Ok(id);
        }

        let const_type = constant.const_type();
        self.check_uniform_budget(stage, const_type)?;
        let name = if constant.is_indexed() {
            format!("{}{index}", constant.name())
        } else {
            constant.name().to_owned()
        };
        let variability = if constant.is_per_object() {
            Variability::PER_OBJECT
        } else {
            Variability::GLOBAL
        };
        let mut param = blank(stage, Scope::Uniform, name, const_type);
        param.auto = Some((constant, index));
        param.variability = variability;
        Ok(self.push_uniform(stage, param))
    }

    /// Custom uniform filled by the requesting sub render state. Each call
    /// creates a new parameter named `{name}{n}`.
    pub fn resolve_uniform(
        &mut self,
        stage: ShaderStage,
        const_type: GpuConstType,
        name: &str,
        variability: Variability,
    ) -> Result<ParameterId> {
        self.check_uniform_budget(stage, const_type)?;
        let name = self.unique_name(stage, name);
        let mut param = blank(stage, Scope::Uniform, name, const_type);
        param.variability = variability;
        Ok(self.push_uniform(stage, param))
    }

    /// Sampler bound to texture unit `register`.
    pub fn resolve_sampler(
        &mut self,
        stage: ShaderStage,
        const_type: GpuConstType,
        name: &str,
        register: u32,
    ) -> Result<ParameterId> {
        if register >= self.limits.max_texture_units {
            return Err(ShaderGenError::ResourceExhausted {
                stage: stage.name(),
                resource: "texture units",
                limit: self.limits.max_texture_units as usize,
            });
        }
        let existing = self
            .program(stage)
            .uniforms
            .iter()
            .copied()
            .find(|&id| self.params[id].sampler_register == Some(register));
        if let Some(id) = existing {
            return Ok(id);
        }
        let mut param = blank(stage, Scope::Uniform, format!("{name}{register}"), const_type);
        param.sampler_register = Some(register);
        param.variability = Variability::GLOBAL;
        Ok(self.push_uniform(stage, param))
    }

    fn check_uniform_budget(&self, stage: ShaderStage, const_type: GpuConstType) -> Result<()> {
        let used: usize = self
            .program(stage)
            .uniforms
            .iter()
            .map(|&id| self.params[id].const_type.register_count())
            .sum();
        if used + const_type.register_count() > self.limits.max_uniform_vectors {
            return Err(ShaderGenError::ResourceExhausted {
                stage: stage.name(),
                resource: "uniform vectors",
                limit: self.limits.max_uniform_vectors,
            });
        }
        Ok(())
    }

    fn push_uniform(&mut self, stage: ShaderStage, param: Parameter) -> ParameterId {
        let id = self.params.insert(param);
        self.program_mut(stage).uniforms.push(id);
        id
    }

    fn unique_name(&mut self, stage: ShaderStage, base: &str) -> String {
        let counter = self.name_counters.entry((stage, base.to_owned())).or_insert(0);
        let name = format!("{base}{counter}");
        *counter += 1;
        name
    }

    // ─── Interface parameters ─────────────────────────────────────────────────

    /// Stage input. `index: None` allocates the lowest free index of the
    /// semantic.
    pub fn resolve_input(
        &mut self,
        stage: ShaderStage,
        semantic: Semantic,
        index: Option<u32>,
        content: Content,
        const_type: GpuConstType,
    ) -> Result<ParameterId> {
        self.resolve_interface(stage, Scope::Input, semantic, index, content, const_type)
    }

    /// Stage output. `index: None` allocates the lowest free index of the
    /// semantic.
    pub fn resolve_output(
        &mut self,
        stage: ShaderStage,
        semantic: Semantic,
        index: Option<u32>,
        content: Content,
        const_type: GpuConstType,
    ) -> Result<ParameterId> {
        self.resolve_interface(stage, Scope::Output, semantic, index, content, const_type)
    }

    fn resolve_interface(
        &mut self,
        stage: ShaderStage,
        scope: Scope,
        semantic: Semantic,
        index: Option<u32>,
        content: Content,
        const_type: GpuConstType,
    ) -> Result<ParameterId> {
        if content != Content::Unknown
            && let Some(id) = self.find_by_content(stage, scope, content)
        {
            return Ok(id);
        }

        let index = match index {
            Some(index) => {
                if let Some(id) = self.find_interface(stage, scope, semantic, index) {
                    let existing = &self.params[id];
                    if existing.content == content {
                        return Ok(id);
                    }
                    return Err(ShaderGenError::InvalidParameters(format!(
                        "{stage} {} {index} already holds {:?}, requested {content:?}",
                        semantic.name(),
                        existing.content,
                    )));
                }
                index
            }
            None => self.free_index(&[(stage, scope)], semantic),
        };
        // Varying slots are checked after packing.
        if !is_varying(stage, scope) {
            self.check_texcoord(stage, semantic, index)?;
        }

        let prefix = if scope == Scope::Input { "in" } else { "out" };
        let mut param = blank(stage, scope, format!("{prefix}_{}{index}", semantic.name()), const_type);
        param.semantic = semantic;
        param.index = index;
        param.content = content;
        param.variability = Variability::PER_OBJECT;
        Ok(self.push_interface(param))
    }

    /// Value computed by the vertex stage and interpolated into the fragment
    /// stage.
    pub fn resolve_varying(
        &mut self,
        semantic: Semantic,
        index: Option<u32>,
        content: Content,
        const_type: GpuConstType,
    ) -> Result<Varying> {
        let vertex_out = match self.find_by_content(ShaderStage::Vertex, Scope::Output, content) {
            Some(id) => id,
            None => {
                let index = match index {
                    Some(index) => index,
                    None => self.free_index(
                        &[(ShaderStage::Vertex, Scope::Output), (ShaderStage::Fragment, Scope::Input)],
                        semantic,
                    ),
                };
                self.resolve_output(ShaderStage::Vertex, semantic, Some(index), content, const_type)?
            }
        };
        let (semantic, index) = {
            let out = &self.params[vertex_out];
            (out.semantic, out.index)
        };
        let fragment_in =
            self.resolve_input(ShaderStage::Fragment, semantic, Some(index), content, const_type)?;
        Ok(Varying { vertex_out, fragment_in })
    }

    fn check_texcoord(&self, stage: ShaderStage, semantic: Semantic, index: u32) -> Result<()> {
        if semantic == Semantic::TexCoord && index >= self.limits.max_texcoord_sets {
            return Err(ShaderGenError::ResourceExhausted {
                stage: stage.name(),
                resource: "texcoord sets",
                limit: self.limits.max_texcoord_sets as usize,
            });
        }
        Ok(())
    }

    fn interface_list(&self, stage: ShaderStage, scope: Scope) -> &[ParameterId] {
        let entry = &self.program(stage).entry;
        match scope {
            Scope::Input => &entry.inputs,
            Scope::Output => &entry.outputs,
            Scope::Local => &entry.locals,
            Scope::Uniform | Scope::Constant => &self.program(stage).uniforms,
        }
    }

    fn find_interface(
        &self,
        stage: ShaderStage,
        scope: Scope,
        semantic: Semantic,
        index: u32,
    ) -> Option<ParameterId> {
        self.interface_list(stage, scope)
            .iter()
            .copied()
            .find(|&id| self.params[id].semantic == semantic && self.params[id].index == index)
    }

    fn free_index(&self, lists: &[(ShaderStage, Scope)], semantic: Semantic) -> u32 {
        (0..)
            .find(|&candidate| {
                lists.iter().all(|&(stage, scope)| {
                    self.find_interface(stage, scope, semantic, candidate).is_none()
                })
            })
            .unwrap_or(0)
    }

    fn push_interface(&mut self, param: Parameter) -> ParameterId {
        let (stage, scope) = (param.stage, param.scope);
        let id = self.params.insert(param);
        let entry = &mut self.program_mut(stage).entry;
        match scope {
            Scope::Input => entry.inputs.push(id),
            Scope::Output => entry.outputs.push(id),
            _ => entry.locals.push(id),
        }
        id
    }

    /// First parameter of `scope` in `stage` holding `content`.
    #[must_use]
    pub fn find_by_content(&self, stage: ShaderStage, scope: Scope, content: Content) -> Option<ParameterId> {
        self.interface_list(stage, scope)
            .iter()
            .copied()
            .find(|&id| self.params[id].content == content)
    }

    /// Input or local of `stage` holding `content`, inputs first.
    #[must_use]
    pub fn find_readable(&self, stage: ShaderStage, content: Content) -> Option<ParameterId> {
        self.find_by_content(stage, Scope::Input, content)
            .or_else(|| self.find_by_content(stage, Scope::Local, content))
    }

    // ─── Locals & constants ───────────────────────────────────────────────────

    /// Temporary of the entry function.
    pub fn resolve_local(
        &mut self,
        stage: ShaderStage,
        name: &str,
        content: Content,
        const_type: GpuConstType,
    ) -> ParameterId {
        let locals = &self.program(stage).entry.locals;
        let existing = locals.iter().copied().find(|&id| {
            let param = &self.params[id];
            if content == Content::Unknown {
                param.content == Content::Unknown && param.name == name
            } else {
                param.content == content
            }
        });
        if let Some(id) = existing {
            return id;
        }
        let taken = locals.iter().any(|&id| self.params[id].name == name);
        let name = if taken { self.unique_name(stage, name) } else { name.to_owned() };
        let mut param = blank(stage, Scope::Local, name, const_type);
        param.content = content;
        self.push_interface(param)
    }

    /// Literal value. `values` beyond the type's width are ignored.
    pub fn constant(&mut self, stage: ShaderStage, const_type: GpuConstType, values: [f32; 4]) -> ParameterId {
        let existing = self.params.iter().find(|(_, p)| {
            p.scope == Scope::Constant
                && p.stage == stage
                && p.const_type == const_type
                && p.value.map(f32::to_bits) == values.map(f32::to_bits)
        });
        if let Some((id, _)) = existing {
            return id;
        }
        let mut param = blank(stage, Scope::Constant, String::new(), const_type);
        param.value = values;
        self.params.insert(param)
    }

    // ─── Varying packing ──────────────────────────────────────────────────────

    /// Fits the texcoord varyings into `max_texcoord_sets` slots.
    ///
    /// Nothing changes while every varying already sits below the limit.
    /// Otherwise the varyings are renumbered, widest first, and the ones
    /// narrower than four components share a slot. A shared slot becomes one
    /// `float4` interface parameter per stage; the varyings it replaces turn
    /// into locals, filled or read through masked assignments at the end of
    /// the vertex program and the start of the fragment program. A varying is
    /// never split across two slots.
    pub fn compact_varyings(&mut self) -> Result<()> {
        let limit = self.limits.max_texcoord_sets as usize;
        let mut varyings: Vec<ParameterId> = self
            .vertex
            .entry
            .outputs
            .iter()
            .copied()
            .filter(|&id| self.params[id].semantic == Semantic::TexCoord)
            .collect();
        if varyings.iter().all(|&id| (self.params[id].index as usize) < limit) {
            return Ok(());
        }

        varyings.sort_by_key(|&id| std::cmp::Reverse(slot_width(self.params[id].const_type)));
        let mut slots: Vec<PackedSlot> = Vec::new();
        for id in varyings {
            let width = slot_width(self.params[id].const_type);
            match slots.iter_mut().find(|slot| slot.used + width <= 4) {
                Some(slot) => slot.push(id, width),
                None => {
                    let mut slot = PackedSlot::default();
                    slot.push(id, width);
                    slots.push(slot);
                }
            }
        }
        if slots.len() > limit {
            return Err(ShaderGenError::ResourceExhausted {
                stage: ShaderStage::Vertex.name(),
                resource: "texcoord sets",
                limit,
            });
        }

        let inputs: FxHashMap<u32, ParameterId> = self
            .fragment
            .entry
            .inputs
            .iter()
            .copied()
            .filter(|&id| self.params[id].semantic == Semantic::TexCoord)
            .map(|id| (self.params[id].index, id))
            .collect();

        let packed: usize = slots.iter().map(|slot| slot.members.len()).sum();
        log::debug!("Packing {packed} texcoord varyings into {} slots", slots.len());
        for (index, slot) in (0u32..).zip(&slots) {
            match slot.members.as_slice() {
                [(only, _)] => {
                    let fed = inputs.get(&self.params[*only].index).copied();
                    self.renumber(*only, index);
                    if let Some(input) = fed {
                        self.renumber(input, index);
                    }
                }
                members => self.pack_slot(index, members, &inputs),
            }
        }
        Ok(())
    }

    fn renumber(&mut self, id: ParameterId, index: u32) {
        let param = &mut self.params[id];
        let prefix = if param.scope == Scope::Input { "in" } else { "out" };
        param.index = index;
        param.name = format!("{prefix}_{}{index}", param.semantic.name());
    }

    fn pack_slot(&mut self, index: u32, members: &[(ParameterId, usize)], inputs: &FxHashMap<u32, ParameterId>) {
        let packed_out = self.push_packed(ShaderStage::Vertex, Scope::Output, index);
        let mut packed_in = None;

        for (order, &(output, offset)) in (0i32..).zip(members) {
            let mask = component_mask(offset, slot_width(self.params[output].const_type));
            let input = inputs.get(&self.params[output].index).copied();

            self.demote(output);
            self.vertex.entry.add_invocation(
                FunctionInvocation::new(PACK_FUNCTION, i32::MAX, order)
                    .input(output)
                    .output_masked(packed_out, mask),
            );

            if let Some(input) = input {
                let packed = match packed_in {
                    Some(packed) => packed,
                    None => *packed_in.insert(self.push_packed(ShaderStage::Fragment, Scope::Input, index)),
                };
                self.demote(input);
                self.fragment.entry.add_invocation(
                    FunctionInvocation::new(PACK_FUNCTION, i32::MIN, order)
                        .input_masked(packed, mask)
                        .output(input),
                );
            }
        }

        self.vertex.add_dependency(PACK_LIBRARY);
        if packed_in.is_some() {
            self.fragment.add_dependency(PACK_LIBRARY);
        }
    }

    fn push_packed(&mut self, stage: ShaderStage, scope: Scope, index: u32) -> ParameterId {
        let prefix = if scope == Scope::Input { "in" } else { "out" };
        let name = format!("{prefix}_{}{index}", Semantic::TexCoord.name());
        let mut param = blank(stage, scope, name, GpuConstType::Float4);
        param.semantic = Semantic::TexCoord;
        param.index = index;
        param.variability = Variability::PER_OBJECT;
        self.push_interface(param)
    }

    /// Turns an interface parameter into a local of its stage. Operands keep
    /// referring to it.
    fn demote(&mut self, id: ParameterId) {
        let (stage, scope) = (self.params[id].stage, self.params[id].scope);
        let name = self.unique_name(stage, "lVarying");
        let entry = &mut self.program_mut(stage).entry;
        match scope {
            Scope::Output => entry.outputs.retain(|&other| other != id),
            _ => entry.inputs.retain(|&other| other != id),
        }
        entry.locals.push(id);

        let param = &mut self.params[id];
        param.scope = Scope::Local;
        param.semantic = Semantic::Unknown;
        param.index = 0;
        param.name = name;
    }

    // ─── Finalisation ─────────────────────────────────────────────────────────

    /// Sorts both entry functions into emission order.
    pub fn sort_invocations(&mut self) {
        self.vertex.entry.sort_invocations();
        self.fragment.entry.sort_invocations();
    }

    /// Checks that the assembled programs can be written: every operand
    /// belongs to its stage, the varyings fit the profile, every fragment
    /// input is fed by a vertex output, and the vertex stage writes a
    /// position.
    pub fn validate(&self) -> Result<()> {
        for stage in ShaderStage::ALL {
            for invocation in self.program(stage).entry.invocations() {
                for operand in &invocation.operands {
                    let Some(param) = self.params.get(operand.param) else {
                        return Err(ShaderGenError::Internal(format!(
                            "{stage} invocation '{}' references a missing parameter",
                            invocation.function_name
                        )));
                    };
                    if param.stage != stage {
                        return Err(ShaderGenError::Internal(format!(
                            "{stage} invocation '{}' references {} parameter '{}'",
                            invocation.function_name, param.stage, param.name
                        )));
                    }
                }
            }
        }

        for &id in &self.vertex.entry.outputs {
            let output = &self.params[id];
            self.check_texcoord(ShaderStage::Vertex, output.semantic, output.index)?;
        }

        for &id in &self.fragment.entry.inputs {
            let input = &self.params[id];
            if self
                .find_interface(ShaderStage::Vertex, Scope::Output, input.semantic, input.index)
                .is_none()
            {
                return Err(ShaderGenError::InvalidParameters(format!(
                    "fragment input '{}' has no matching vertex output",
                    input.name
                )));
            }
        }

        if self
            .find_by_content(ShaderStage::Vertex, Scope::Output, Content::PositionProjectiveSpace)
            .is_none()
        {
            return Err(ShaderGenError::InvalidParameters(
                "vertex program does not output a projective position".into(),
            ));
        }
        Ok(())
    }

    /// Register layout of the uniforms declared for `stage`.
    #[must_use]
    pub fn uniform_layout(&self, stage: ShaderStage) -> UniformLayout {
        let mut layout = UniformLayout::new();
        for &id in &self.program(stage).uniforms {
            let param = &self.params[id];
            match param.auto {
                Some((constant, index)) => layout.push_auto(id, param.const_type, constant, index),
                None => {
                    layout.push(id, param.const_type);
                }
            }
        }
        layout
    }
}

/// Texcoord varyings sharing one interpolator, with their component offsets.
#[derive(Debug, Default)]
struct PackedSlot {
    used: usize,
    members: SmallVec<[(ParameterId, usize); 4]>,
}

impl PackedSlot {
    fn push(&mut self, id: ParameterId, width: usize) {
        self.members.push((id, self.used));
        self.used += width;
    }
}

fn is_varying(stage: ShaderStage, scope: Scope) -> bool {
    matches!(
        (stage, scope),
        (ShaderStage::Vertex, Scope::Output) | (ShaderStage::Fragment, Scope::Input)
    )
}

/// Components a varying takes in a slot. Only float vectors share.
fn slot_width(const_type: GpuConstType) -> usize {
    match const_type {
        GpuConstType::Float1 | GpuConstType::Float2 | GpuConstType::Float3 => const_type.component_count(),
        _ => 4,
    }
}

fn component_mask(offset: usize, width: usize) -> OperandMask {
    OperandMask::from_bits_truncate((((1u32 << width) - 1) << offset) as u8)
}

fn blank(stage: ShaderStage, scope: Scope, name: String, const_type: GpuConstType) -> Parameter {
    Parameter {
        name,
        stage,
        scope,
        semantic: Semantic::Unknown,
        index: 0,
        content: Content::Unknown,
        const_type,
        auto: None,
        variability: Variability::GLOBAL,
        sampler_register: None,
        value: [0.0; 4],
    }
}
