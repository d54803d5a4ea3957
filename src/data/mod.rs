//! # Data producers: the pull side of the pipeline
//!
//! Everything that can feed frames into a transformation stage implements the
//! [`DataProducer`] trait: the in-memory store
//! ([`DataInMemory`](crate::data::data_in_memory::DataInMemory)) as well as every
//! [`Transformer`](crate::transform::transformer::Transformer) (a stage is a
//! producer for the next stage, which is what makes arbitrarily deep chains
//! possible without special-casing).
//!
//! ## Overview
//! -----------------
//! A producer owns (or lazily computes) an ordered collection of trajectories
//! and can answer the dataset-shape questions a downstream consumer needs:
//! trajectory count, per-trajectory strided/skipped lengths, total frame count,
//! and output dimensionality. It also manufactures
//! [`ChunkIterator`](crate::data::chunk_iterator::ChunkIterator)s, the lazy,
//! finite, restart-by-reconstruction cursors that move actual frame data.
//!
//! ## Sharing model
//! -----------------
//! Producers are shared as `Rc<dyn DataProducer>`: a stage *refers to* its
//! upstream producer, it does not own it, and the association is replaceable at
//! run time. The whole pipeline is single-threaded and pull-based, so interior
//! mutability (`Cell`/`RefCell`) replaces locks throughout. Producer identity
//! (`Rc::ptr_eq`) is what decides whether re-assigning an upstream source
//! invalidates a stage's fitted state.
//!
//! ## Input coercion
//! -----------------
//! User-facing entry points accept anything implementing [`IntoProducer`]: raw
//! frame matrices and lists of them are wrapped into a
//! [`DataInMemory`](crate::data::data_in_memory::DataInMemory), while existing
//! producers (including other stages) pass through untouched, preserving their
//! identity.
//!
//! ## Modules
//! -----------------
//! * [`chunk_iterator`](crate::data::chunk_iterator) – iteration parameters,
//!   the [`Chunk`](crate::data::chunk_iterator::Chunk) unit of transfer, and the
//!   iterator contract.
//! * [`data_in_memory`](crate::data::data_in_memory) – producer over matrices
//!   already resident in memory.

use std::rc::Rc;

use crate::constants::Trajectory;
use crate::data::chunk_iterator::{ChunkIterator, IterParams};
use crate::data::data_in_memory::DataInMemory;
use crate::trajflow_errors::TrajFlowError;

pub mod chunk_iterator;
pub mod data_in_memory;

/// Capability set shared by every data source in a pipeline.
///
/// Shape queries return `Result` because a producer may itself be a pipeline
/// stage whose own upstream association is not configured yet; such a stage
/// fails the delegation with
/// [`TrajFlowError::MissingDataProducer`] instead of answering independently
/// (there is a single source of truth for dataset shape: the producer at the
/// head of the chain).
pub trait DataProducer {
    /// Number of output dimensions per frame.
    fn dimension(&self) -> Result<usize, TrajFlowError>;

    /// Current chunk size used to batch-process the underlying data.
    fn chunksize(&self) -> Result<usize, TrajFlowError>;

    /// Replace the chunk size (0 means "whole trajectory at once").
    fn set_chunksize(&self, size: usize) -> Result<(), TrajFlowError>;

    /// Number of trajectories in the dataset.
    fn number_of_trajectories(&self) -> Result<usize, TrajFlowError>;

    /// Number of frames of trajectory `itraj` when read with the given
    /// `stride` after dropping `skip` leading frames.
    ///
    /// Return
    /// ----------
    /// * `ceil((len - skip) / stride)`, zero when `skip >= len`,
    /// * [`TrajFlowError::TrajectoryIndexOutOfBounds`] for an invalid index.
    fn trajectory_length(
        &self,
        itraj: usize,
        stride: usize,
        skip: usize,
    ) -> Result<usize, TrajFlowError>;

    /// Per-trajectory frame counts under the given `stride`/`skip`.
    fn trajectory_lengths(&self, stride: usize, skip: usize)
        -> Result<Vec<usize>, TrajFlowError>;

    /// Total number of frames across all trajectories under the given `stride`.
    fn n_frames_total(&self, stride: usize) -> Result<usize, TrajFlowError>;

    /// Manufacture a fresh chunk iterator over this producer.
    ///
    /// Each call starts a new pass; iterators are never restarted in place.
    fn create_iterator(
        self: Rc<Self>,
        params: &IterParams,
    ) -> Result<Box<dyn ChunkIterator>, TrajFlowError>;
}

/// Raw eager input: one frame matrix or an ordered list of them.
///
/// This is the statically-typed rendering of "a single (T × n) array or a list
/// of such arrays". Row counts may vary across list elements; column counts
/// are validated when the data is wrapped into a producer or pushed through a
/// transform.
#[derive(Debug, Clone)]
pub enum TrajData {
    /// A single trajectory.
    Single(Trajectory),
    /// An ordered list of trajectories (indices are stable identifiers).
    List(Vec<Trajectory>),
}

impl TrajData {
    /// Flatten into the list form (a single trajectory becomes a one-element list).
    pub fn into_vec(self) -> Vec<Trajectory> {
        match self {
            TrajData::Single(t) => vec![t],
            TrajData::List(ts) => ts,
        }
    }
}

impl From<Trajectory> for TrajData {
    fn from(t: Trajectory) -> Self {
        TrajData::Single(t)
    }
}

impl From<Vec<Trajectory>> for TrajData {
    fn from(ts: Vec<Trajectory>) -> Self {
        TrajData::List(ts)
    }
}

/// Coercion of user input into a shareable data producer.
///
/// Raw matrices are wrapped into a
/// [`DataInMemory`](crate::data::data_in_memory::DataInMemory) batched at
/// `chunksize`; handles to existing producers pass through unchanged, so a
/// stage fed with another stage keeps that stage's identity (and therefore its
/// estimation-invalidation semantics).
pub trait IntoProducer {
    fn into_producer(self, chunksize: usize) -> Result<Rc<dyn DataProducer>, TrajFlowError>;
}

impl IntoProducer for Rc<dyn DataProducer> {
    fn into_producer(self, _chunksize: usize) -> Result<Rc<dyn DataProducer>, TrajFlowError> {
        Ok(self)
    }
}

impl IntoProducer for Rc<DataInMemory> {
    fn into_producer(self, _chunksize: usize) -> Result<Rc<dyn DataProducer>, TrajFlowError> {
        Ok(self)
    }
}

impl IntoProducer for Trajectory {
    fn into_producer(self, chunksize: usize) -> Result<Rc<dyn DataProducer>, TrajFlowError> {
        Ok(Rc::new(DataInMemory::from_single(self, chunksize)?))
    }
}

impl IntoProducer for Vec<Trajectory> {
    fn into_producer(self, chunksize: usize) -> Result<Rc<dyn DataProducer>, TrajFlowError> {
        Ok(Rc::new(DataInMemory::new(self, chunksize)?))
    }
}

impl IntoProducer for TrajData {
    fn into_producer(self, chunksize: usize) -> Result<Rc<dyn DataProducer>, TrajFlowError> {
        self.into_vec().into_producer(chunksize)
    }
}
