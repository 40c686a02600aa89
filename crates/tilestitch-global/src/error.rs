use tilestitch_core::CoreError;

/// Hard failures of a global optimization run.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GlobalOptError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("transform dimensionality differs ({expected} vs {got})")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("normal equations are singular ({unknowns} unknowns)")]
    Singular { unknowns: usize },
}
