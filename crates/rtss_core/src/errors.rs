//! Error Types
//!
//! This module defines the error type shared by every crate of the runtime
//! shader system.
//!
//! # Overview
//!
//! [`ShaderGenError`] follows the failure taxonomy of shader generation:
//! - Configuration errors (bad script attribute, unregistered type, mismatched copy)
//! - Resource exhaustion (too many parameters, lights or texture units for a profile)
//! - Backend compile failures
//! - Internal invariant violations
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ShaderGenError>`.
//!
//! ```rust,ignore
//! use rtss_core::errors::{ShaderGenError, Result};
//!
//! fn resolve() -> Result<()> {
//!     Err(ShaderGenError::ItemNotFound("SGX_Unknown".into()))
//! }
//! ```

use thiserror::Error;

/// The main error type of the runtime shader system.
#[derive(Error, Debug)]
pub enum ShaderGenError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// An item with the same key is already registered.
    #[error("Duplicate item: {0}")]
    DuplicateItem(String),

    /// The requested item (factory type, scheme, material, pass) does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// A parameter or property value is not acceptable.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// A factory cannot be removed while instances it created are alive.
    #[error("Factory '{type_name}' still owns {live} live instance(s)")]
    FactoryInUse {
        /// Type string of the factory
        type_name: String,
        /// Number of instances still referenced by render states
        live: usize,
    },

    /// Malformed material script block.
    #[error("Script error at line {line}: {message}")]
    Script {
        /// 1-based line inside the script block
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// Settings could not be loaded.
    #[error("Settings error: {0}")]
    Settings(String),

    // ========================================================================
    // Resource Exhaustion
    // ========================================================================
    /// The target profile ran out of a finite resource.
    #[error("{stage} stage exhausted {resource} (limit {limit})")]
    ResourceExhausted {
        /// Shader stage name
        stage: &'static str,
        /// Exhausted resource, e.g. "texcoord sets"
        resource: &'static str,
        /// The profile limit
        limit: usize,
    },

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// The native compiler rejected generated source.
    #[error("Failed to compile program '{program}': {message}")]
    CompileFailed {
        /// Generated program name
        program: String,
        /// Compiler diagnostics
        message: String,
    },

    /// Template rendering error while writing shader source.
    #[error("Template error: {0}")]
    Template(String),

    // ========================================================================
    // Internal Invariants
    // ========================================================================
    /// An internal invariant did not hold.
    #[error("Internal error: {0}")]
    Internal(String),

    // ========================================================================
    // I/O & Format Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ShaderGenError {
    /// Whether this error stems from configuration rather than from the
    /// backend or resource limits.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateItem(_)
                | Self::ItemNotFound(_)
                | Self::InvalidParameters(_)
                | Self::FactoryInUse { .. }
                | Self::Script { .. }
                | Self::Settings(_)
        )
    }
}

/// Alias for `Result<T, ShaderGenError>`.
pub type Result<T> = std::result::Result<T, ShaderGenError>;
