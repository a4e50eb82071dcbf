use thiserror::Error;

/// Errors raised by the replay memory and the normalizer.
///
/// All of these are contract violations by the caller (or a failure in the
/// tensor backend), none of them are transient.
#[derive(Debug, Error)]
pub enum ExperienceError {
    #[error("replay memory capacity must be positive")]
    ZeroCapacity,

    #[error("cannot sample {requested} transitions, only {available} stored")]
    InsufficientSamples {
        requested: usize,
        available: usize,
    },

    #[error("observation shape {found:?} does not match established shape {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("cannot build a batch from zero transitions")]
    EmptyBatch,

    #[error(transparent)]
    Tensor(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, ExperienceError>;
