use thiserror::Error;

/// Top-level error type for the sweepline curve kernel.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Approximation(#[from] ApproximationError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors related to segment handles and the link protocol.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("segment not found in store")]
    SegmentNotFound,

    #[error("subscription not found")]
    SubscriptionNotFound,
}

/// Errors related to curve approximation.
#[derive(Debug, Error)]
pub enum ApproximationError {
    #[error("invalid approximation parameters: {0}")]
    InvalidParameters(String),
}

/// Convenience type alias for results using [`SweepError`].
pub type Result<T> = std::result::Result<T, SweepError>;
