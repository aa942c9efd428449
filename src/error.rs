//! Error types for rule compilation and evaluation

use crate::class::ClassId;
use crate::config::ConfigError;
use crate::feature::FeatureKind;
use thiserror::Error;

/// Configuration error raised while compiling classes and rules
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("class {0} is registered twice")]
    DuplicateClass(ClassId),

    #[error("class {class} has level {level}, expected 1 to 3")]
    InvalidLevel { class: ClassId, level: u8 },

    #[error("rule '{rule}' references unknown class {class}")]
    UnknownClass { rule: String, class: ClassId },

    #[error("selector syntax error at offset {position} in '{selector}': {message}")]
    Syntax {
        selector: String,
        position: usize,
        message: String,
    },

    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{rule}': slot {slot} is not captured by alternative {clause}")]
    UncapturedSlot {
        rule: String,
        slot: usize,
        clause: usize,
    },

    #[error("invalid template '{template}': {message}")]
    Template { template: String, message: String },

    #[error("rule '{rule}': fix has conflicting changes for key '{key}'")]
    ContradictoryFix { rule: String, key: String },

    #[error("rule '{rule}': invalid fix '{fix}': {message}")]
    InvalidFix {
        rule: String,
        fix: String,
        message: String,
    },

    #[error("rule '{rule}': invalid assertion '{text}': {message}")]
    InvalidAssertion {
        rule: String,
        text: String,
        message: String,
    },
}

/// Host contract violation at evaluation time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("expected a {expected} feature, got a {found}")]
    KindMismatch {
        expected: FeatureKind,
        found: FeatureKind,
    },
}

/// Error building an engine from configuration
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}
