//! # trajflow
//!
//! Lazy, chunked data-transformation pipelines for molecular-dynamics
//! trajectory analysis.
//!
//! A [`Transformer`] pulls fixed-size chunks of multi-dimensional time-series
//! data from an upstream [`DataProducer`], applies a fitted per-chunk mapping,
//! and exposes itself as a producer to the next stage — so chains of stages
//! process datasets larger than memory without ever materializing a full
//! trajectory.
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use trajflow::{IterParams, Transformer};
//! # use trajflow::{DataProducer, TrajFlowError, TransformModel, Trajectory};
//! # #[derive(Clone)] struct Projector;
//! # impl TransformModel for Projector {
//! #     fn describe(&self) -> String { "projector".into() }
//! #     fn dimension(&self) -> usize { 2 }
//! #     fn transform_array(&self, x: &Trajectory) -> Result<Trajectory, TrajFlowError> { Ok(x.clone()) }
//! #     fn estimate(&mut self, _: Rc<dyn DataProducer>, _: usize) -> Result<(), TrajFlowError> { Ok(()) }
//! # }
//! # fn demo(trajectories: Vec<Trajectory>) -> Result<(), TrajFlowError> {
//! let stage = Rc::new(Transformer::new(Projector));
//! stage.fit(trajectories)?;
//!
//! // stream in bounded chunks, two frames apart
//! let params = IterParams::builder().chunk(500).stride(2).build()?;
//! let output = stage.get_output(None, &params)?;
//! # Ok(()) }
//! ```

pub mod constants;
pub mod data;
pub mod trajflow_errors;
pub mod transform;

pub use constants::{Trajectory, DEFAULT_CHUNKSIZE};
pub use data::chunk_iterator::{Chunk, ChunkIterator, IterParams, IterParamsBuilder};
pub use data::data_in_memory::DataInMemory;
pub use data::{DataProducer, IntoProducer, TrajData};
pub use trajflow_errors::TrajFlowError;
pub use transform::model::TransformModel;
pub use transform::pipeline::{Pipeline, PipelineStage};
pub use transform::transformer::{EstimationState, Transformer};
pub use transform::transformer_iterator::TransformerIterator;
