//! # Transform-model contract
//!
//! [`TransformModel`] is the narrow seam between the pipeline machinery and the
//! two collaborators it orchestrates: the concrete numeric transform (distance
//! computation, dimensionality reduction, ...) and the parameter-fitting
//! framework behind [`estimate`](TransformModel::estimate). The pipeline never
//! looks inside a model; it only fits it once and then maps chunks through it.

use std::rc::Rc;

use crate::constants::Trajectory;
use crate::data::DataProducer;
use crate::trajflow_errors::TrajFlowError;

/// One concrete per-chunk mapping with its fitting procedure.
///
/// `Clone` is a hard requirement: iterators snapshot the fitted model at
/// construction, which is what lets
/// [`transform_array`](TransformModel::transform_array) stay a pure function of
/// its input and the fitted parameters while streams are in flight.
pub trait TransformModel: Clone {
    /// Human-readable identity of this transform. Mandatory; there is no
    /// meaningful default.
    fn describe(&self) -> String;

    /// Declared output dimensionality `d` of the mapping.
    fn dimension(&self) -> usize;

    /// Map one whole (T × n) block to its (T × d) image.
    ///
    /// Must be a pure function of `x` and the fitted parameters, and must not
    /// mutate shared state. A block with an unexpected column count fails with
    /// [`TrajFlowError::ShapeMismatch`] naming the offending shape.
    fn transform_array(&self, x: &Trajectory) -> Result<Trajectory, TrajFlowError>;

    /// Fit the model's parameters by streaming over `producer` at the given
    /// `stride`.
    ///
    /// A recoverable "presumably finished" condition is reported as
    /// [`TrajFlowError::NotConverged`]; the owning stage downgrades it to a
    /// logged event. Any other error aborts the fit.
    fn estimate(
        &mut self,
        producer: Rc<dyn DataProducer>,
        stride: usize,
    ) -> Result<(), TrajFlowError>;

    /// Optional hook run immediately before [`estimate`](TransformModel::estimate).
    fn pre_estimate(&mut self) {}

    /// Optional hook run immediately after [`estimate`](TransformModel::estimate),
    /// including after a non-converged (but accepted) fit.
    fn post_estimate(&mut self) {}
}
