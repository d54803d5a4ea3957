use thiserror::Error;

/// Crate-wide error type.
///
/// Overview
/// -----------------
/// The variants fall into four families with different propagation policies:
///
/// * **Configuration errors** ([`MissingDataProducer`](TrajFlowError::MissingDataProducer),
///   [`NotEstimated`](TrajFlowError::NotEstimated),
///   [`InvalidIterParameter`](TrajFlowError::InvalidIterParameter)) — raised
///   immediately, never retried.
/// * **Shape errors** ([`ShapeMismatch`](TrajFlowError::ShapeMismatch),
///   [`EmptyInput`](TrajFlowError::EmptyInput)) — fatal and descriptive; the
///   message names the offending shape.
/// * **Recoverable estimation signal** ([`NotConverged`](TrajFlowError::NotConverged)) —
///   the only variant a pipeline stage downgrades to a logged event; estimation
///   is still considered complete.
/// * **Hard estimation failures** ([`EstimationFailed`](TrajFlowError::EstimationFailed)) —
///   abort the fit and leave the stage un-estimated.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TrajFlowError {
    #[error("no data producer configured (required by {0})")]
    MissingDataProducer(String),

    #[error("stage '{0}' is not estimated yet; fit or parametrize it first")]
    NotEstimated(String),

    #[error("invalid iteration parameter: {0}")]
    InvalidIterParameter(String),

    #[error("trajectory index {itraj} out of bounds ({n_trajectories} trajectories)")]
    TrajectoryIndexOutOfBounds { itraj: usize, n_trajectories: usize },

    #[error("input has the wrong shape: ({rows}, {cols}); expected {expected_cols} columns")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        expected_cols: usize,
    },

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("estimation did not converge: {0}")]
    NotConverged(String),

    #[error("estimation failed: {0}")]
    EstimationFailed(String),
}
