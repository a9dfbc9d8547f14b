use thiserror::Error;

/// Errors reported before any segmentation work starts.
///
/// Empty clusters and hitting the iteration cap are not errors, they are reported through
/// [`crate::slic::IterationSummary`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("image dimensions cannot be zero")]
    ZeroDimension,

    #[error("pixel buffer length {len} does not match dimensions {width}x{height}")]
    DimensionMismatch {
        len: usize,
        width: usize,
        height: usize,
    },

    #[error("color value at index {index} is not finite")]
    NonFiniteColor { index: usize },

    #[error("number of clusters must be between 1 and {pixels} (number of pixels), got {requested}")]
    InvalidClusterCount { requested: u32, pixels: usize },

    #[error("compactness must be a finite number greater than zero, got {0}")]
    InvalidCompactness(f32),

    #[error("convergence threshold must be zero or positive, got {0}")]
    InvalidThreshold(f32),

    #[error("max_iterations must be greater than zero")]
    InvalidMaxIterations,

    #[error("min_size_factor must be a finite number, zero or positive, got {0}")]
    InvalidMinSizeFactor(f32),

    #[error("expected {expected} clusters, got {actual}")]
    ClusterCountMismatch { expected: usize, actual: usize },

    #[error("cluster at index {index} has number {number}, numbers must match the indices")]
    InvalidClusterNumber { index: usize, number: u32 },

    #[error("cluster at index {index} has its center outside of the image or a non-finite color")]
    InvalidClusterCenter { index: usize },
}
