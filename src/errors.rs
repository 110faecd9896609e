//! Crate-wide error taxonomy.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, WeaveError>;

#[derive(Error, Debug)]
pub enum WeaveError {
    // === Config ===
    #[error("malformed config line {line}: {reason}")]
    ConfigParse { line: usize, reason: String },

    #[error("config key not found: {0}")]
    ConfigKeyMissing(String),

    #[error("config value for key {key} has the wrong type")]
    ConfigTypeMismatch { key: String },

    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // === Pipeline description ===
    #[error("pipeline description references unknown graphics system: {0}")]
    UnknownGraphicsSystem(String),

    #[error("graphics system {gs} has no dependency source graphics system: {src}")]
    MissingDependencySource { gs: String, src: String },

    #[error("required input `{input}` on graphics system `{gs}` could not be resolved")]
    UnresolvedInput { gs: String, input: String },

    #[error("cycle detected while computing execution groups: {0:?}")]
    ExecutionGroupCycle(Vec<String>),

    #[error("malformed pipeline description: {0}")]
    PipelineJson(#[from] serde_json::Error),

    #[error("graphics system `{gs}` has no registered flag named `{flag}`")]
    UnknownFlag { gs: String, flag: String },

    // === Inventory ===
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("`get` was called for a not-yet-present resource with no load context")]
    MissingLoadContext,

    // === Runtime GraphicsSystem ===
    #[error("graphics system `{gs}` pre_render step `{step}` failed: {reason}")]
    RuntimeGsError {
        gs: String,
        step: String,
        reason: String,
    },

    // === I/O ===
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
