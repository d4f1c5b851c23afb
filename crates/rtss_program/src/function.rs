use std::borrow::Cow;

use bitflags::bitflags;
use smallvec::SmallVec;

use rtss_core::ParameterId;

/// Direction of an invocation argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandSemantic {
    In,
    Out,
    InOut,
}

impl OperandSemantic {
    #[inline]
    #[must_use]
    pub fn writes(self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }
}

bitflags! {
    /// Component swizzle applied to an operand. Empty means the whole value.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct OperandMask: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const Z = 1 << 2;
        const W = 1 << 3;
        const XYZ = Self::X.bits() | Self::Y.bits() | Self::Z.bits();
        const XY = Self::X.bits() | Self::Y.bits();
    }
}

impl OperandMask {
    /// Swizzle suffix such as `.xyz`; empty for the full value.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        const SUFFIXES: [&str; 16] = [
            "", ".x", ".y", ".xy", ".z", ".xz", ".yz", ".xyz", ".w", ".xw", ".yw", ".xyw", ".zw",
            ".xzw", ".yzw", "",
        ];
        SUFFIXES[self.bits() as usize & 0xF]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub param: ParameterId,
    pub semantic: OperandSemantic,
    pub mask: OperandMask,
}

/// One call to a shader library subroutine.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInvocation {
    pub function_name: Cow<'static, str>,
    pub group_order: i32,
    pub internal_order: i32,
    pub operands: SmallVec<[Operand; 8]>,
}

impl FunctionInvocation {
    #[must_use]
    pub fn new(function_name: impl Into<Cow<'static, str>>, group_order: i32, internal_order: i32) -> Self {
        Self {
            function_name: function_name.into(),
            group_order,
            internal_order,
            operands: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, param: ParameterId, semantic: OperandSemantic, mask: OperandMask) -> Self {
        self.operands.push(Operand { param, semantic, mask });
        self
    }

    #[must_use]
    pub fn input(self, param: ParameterId) -> Self {
        self.arg(param, OperandSemantic::In, OperandMask::empty())
    }

    #[must_use]
    pub fn input_masked(self, param: ParameterId, mask: OperandMask) -> Self {
        self.arg(param, OperandSemantic::In, mask)
    }

    #[must_use]
    pub fn output(self, param: ParameterId) -> Self {
        self.arg(param, OperandSemantic::Out, OperandMask::empty())
    }

    #[must_use]
    pub fn output_masked(self, param: ParameterId, mask: OperandMask) -> Self {
        self.arg(param, OperandSemantic::Out, mask)
    }

    #[must_use]
    pub fn in_out(self, param: ParameterId) -> Self {
        self.arg(param, OperandSemantic::InOut, OperandMask::empty())
    }

    #[inline]
    #[must_use]
    pub fn sort_key(&self) -> (i32, i32) {
        (self.group_order, self.internal_order)
    }
}

/// Entry point of a program: interface parameters, temporaries and the
/// ordered invocation list.
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<ParameterId>,
    pub outputs: Vec<ParameterId>,
    pub locals: Vec<ParameterId>,
    invocations: Vec<FunctionInvocation>,
}

impl Function {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_invocation(&mut self, invocation: FunctionInvocation) {
        self.invocations.push(invocation);
    }

    /// Stable sort by `(group_order, internal_order)`.
    pub fn sort_invocations(&mut self) {
        self.invocations.sort_by_key(FunctionInvocation::sort_key);
    }

    #[inline]
    #[must_use]
    pub fn invocations(&self) -> &[FunctionInvocation] {
        &self.invocations
    }
}
