use crate::ViewId;

/// Errors produced by the core data types and the in-memory collaborators.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("a group must contain at least one view")]
    EmptyGroup,

    #[error("only 2D and 3D data is supported (got {0} dimensions)")]
    UnsupportedDimensionality(usize),

    #[error("pixel buffer length {len} does not match dimensions {dims:?}")]
    InvalidDimensions { dims: Vec<usize>, len: usize },

    #[error("crop [{min:?} + {size:?}] exceeds region of size {dims:?}")]
    CropOutOfBounds {
        min: Vec<i64>,
        size: Vec<usize>,
        dims: Vec<usize>,
    },

    #[error("shape mismatch (expected {expected:?}, got {got:?})")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("no pixel data for view {0}")]
    MissingView(ViewId),

    #[error("invalid affine transform: {0}")]
    InvalidTransform(String),
}
