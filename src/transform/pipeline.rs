//! # Chains of stages
//!
//! A pipeline is a directed chain `producer → T₁ → T₂ → …` in which every
//! stage's data producer is the previous stage. The chain itself is nothing
//! more than those associations; this module adds the object-safe
//! [`PipelineStage`] view of a stage and a small [`Pipeline`] helper that wires
//! stages in order and runs the explicit head-first parametrization the chain
//! model requires (estimation is never cascaded implicitly — see
//! [`transformer`](crate::transform::transformer)).

use std::rc::Rc;

use crate::constants::{Trajectory, DEFAULT_CHUNKSIZE};
use crate::data::chunk_iterator::IterParams;
use crate::data::{DataProducer, IntoProducer};
use crate::trajflow_errors::TrajFlowError;
use crate::transform::model::TransformModel;
use crate::transform::transformer::Transformer;

/// Object-safe stage view, so heterogeneous chains (`Rc<dyn PipelineStage>`)
/// can be stored and driven uniformly.
pub trait PipelineStage {
    /// Human-readable identity of the stage.
    fn describe(&self) -> String;

    /// Whether the stage is fitted against its current producer.
    fn is_estimated(&self) -> bool;

    /// Re-wire the stage to a new upstream producer.
    fn set_data_producer(&self, dp: Rc<dyn DataProducer>);

    /// Fit the stage against its configured producer.
    fn parametrize(&self, stride: usize) -> Result<(), TrajFlowError>;

    /// Collect the stage's mapped output (see
    /// [`Transformer::get_output`](crate::transform::transformer::Transformer::get_output)).
    fn get_output(
        &self,
        dimensions: Option<&[usize]>,
        params: &IterParams,
    ) -> Result<Vec<Trajectory>, TrajFlowError>;

    /// The stage as a producer for the next stage.
    fn as_producer(self: Rc<Self>) -> Rc<dyn DataProducer>;
}

impl<M: TransformModel + 'static> PipelineStage for Transformer<M> {
    fn describe(&self) -> String {
        Transformer::describe(self)
    }

    fn is_estimated(&self) -> bool {
        Transformer::is_estimated(self)
    }

    fn set_data_producer(&self, dp: Rc<dyn DataProducer>) {
        Transformer::set_data_producer(self, dp);
    }

    fn parametrize(&self, stride: usize) -> Result<(), TrajFlowError> {
        Transformer::parametrize(self, stride)
    }

    fn get_output(
        &self,
        dimensions: Option<&[usize]>,
        params: &IterParams,
    ) -> Result<Vec<Trajectory>, TrajFlowError> {
        Transformer::get_output(self, dimensions, params)
    }

    fn as_producer(self: Rc<Self>) -> Rc<dyn DataProducer> {
        self
    }
}

/// Ordered chain of stages over one source.
///
/// [`add`](Pipeline::add) wires each new stage to the previous one (or to the
/// source), and [`parametrize`](Pipeline::parametrize) fits the chain
/// head-first — the fitting order the caller owns, packaged once.
pub struct Pipeline {
    source: Rc<dyn DataProducer>,
    stages: Vec<Rc<dyn PipelineStage>>,
}

impl Pipeline {
    /// Start a pipeline from any producer-coercible source.
    pub fn new<X: IntoProducer>(source: X) -> Result<Self, TrajFlowError> {
        Ok(Self {
            source: source.into_producer(DEFAULT_CHUNKSIZE)?,
            stages: Vec::new(),
        })
    }

    /// Append a stage, wiring its data producer to the tail of the chain.
    pub fn add(&mut self, stage: Rc<dyn PipelineStage>) {
        let upstream: Rc<dyn DataProducer> = match self.stages.last() {
            Some(prev) => Rc::clone(prev).as_producer(),
            None => Rc::clone(&self.source),
        };
        stage.set_data_producer(upstream);
        self.stages.push(stage);
    }

    /// Fit every stage, head-first, at the given stride.
    ///
    /// A failure aborts the walk; downstream stages stay un-estimated.
    pub fn parametrize(&self, stride: usize) -> Result<(), TrajFlowError> {
        for stage in &self.stages {
            stage.parametrize(stride)?;
        }
        Ok(())
    }

    /// Collect the mapped output of the last stage.
    pub fn get_output(
        &self,
        dimensions: Option<&[usize]>,
        params: &IterParams,
    ) -> Result<Vec<Trajectory>, TrajFlowError> {
        let last = self.stages.last().ok_or_else(|| {
            TrajFlowError::EmptyInput("pipeline has no stages".into())
        })?;
        last.get_output(dimensions, params)
    }

    /// Number of stages in the chain.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The stages, in chain order.
    pub fn stages(&self) -> &[Rc<dyn PipelineStage>] {
        &self.stages
    }
}
