//! Crate-wide error type.
//!
//! Every fatal condition is reported to the caller with enough context
//! (iteration, offending rule, configuration field) to adjust parameters.
//! Condition-evaluation failures never surface here: the parametric engine
//! turns them into non-matching productions.

use thiserror::Error;

use crate::expr::ExprError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "derivation exceeded maximum length of {limit} symbols at iteration {iteration} \
         (reached {length}); try reducing iterations"
    )]
    DerivationLength {
        iteration: usize,
        limit: usize,
        length: usize,
    },

    #[error(
        "derivation exceeded maximum of {limit} modules at iteration {iteration} \
         (reached {modules}); try reducing iterations"
    )]
    ModuleLimit {
        iteration: usize,
        limit: usize,
        modules: usize,
    },

    #[error("invalid rule `{rule}`: {reason}")]
    RuleSyntax { rule: String, reason: String },

    #[error("invalid module text `{text}`: {reason}")]
    ModuleSyntax { text: String, reason: String },

    #[error("invalid expression `{expression}`: {source}")]
    Expression {
        expression: String,
        #[source]
        source: ExprError,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("failed to build frame worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
