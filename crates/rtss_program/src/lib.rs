//! Parameter/Function IR of the runtime shader system.
//!
//! Sub render states declare [`Parameter`]s and append
//! [`FunctionInvocation`]s to a [`ProgramSet`]; a [`ProgramWriter`] then turns
//! the set into source text for a [`ShaderCompiler`].

pub mod compiler;
pub mod function;
pub mod parameter;
pub mod program;
pub mod program_set;
pub mod writer;

pub use compiler::{MemoryCompiler, ProgramSource, ShaderCompiler};
pub use function::{Function, FunctionInvocation, Operand, OperandMask, OperandSemantic};
pub use parameter::{Content, Parameter, Scope, Semantic, Variability};
pub use program::Program;
pub use program_set::{ProgramLimits, ProgramSet, Varying};
pub use writer::{GlslWriter, HlslWriter, ProgramWriter, ShaderLanguage, writer_for};
