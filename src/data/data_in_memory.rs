//! # In-memory data producer
//!
//! [`DataInMemory`] wraps trajectories that are already resident in memory and
//! exposes the full [`DataProducer`] capability set over them. It is the
//! producer at the head of most pipelines, and the type raw arrays are coerced
//! into when they are handed to `fit`/`estimate`.
//!
//! ## Invariants
//! -----------------
//! - At least one trajectory, each with at least one frame.
//! - All trajectories share the same column count (dimension).
//! - Trajectory order is preserved; indices are stable identifiers.
//!
//! Construction validates these invariants once; iteration relies on them.

use std::cell::Cell;
use std::rc::Rc;

use itertools::Itertools;
use nalgebra::DMatrix;

use crate::constants::Trajectory;
use crate::data::chunk_iterator::{
    chunk_count, strided_length, Chunk, ChunkIterator, IterParams,
};
use crate::data::DataProducer;
use crate::trajflow_errors::TrajFlowError;

/// Producer over an ordered, validated list of in-memory trajectories.
///
/// The chunk size is an interior-mutable association (`Cell`) because producers
/// are shared as `Rc<dyn DataProducer>` across pipeline stages and the pipeline
/// is single-threaded by design; no locking is involved.
#[derive(Debug)]
pub struct DataInMemory {
    data: Vec<Trajectory>,
    chunksize: Cell<usize>,
}

impl DataInMemory {
    /// Wrap a list of trajectories, validating the container invariants.
    ///
    /// Arguments
    /// -----------------
    /// * `data` – ordered trajectories, each (T_i × n) with T_i ≥ 1.
    /// * `chunksize` – initial batching bound (0 = whole trajectory at once).
    ///
    /// Return
    /// ----------
    /// * `Err(TrajFlowError::EmptyInput)` when the list, or any trajectory, has
    ///   no frames,
    /// * `Err(TrajFlowError::ShapeMismatch)` when column counts disagree,
    /// * `Ok(DataInMemory)` otherwise.
    pub fn new(data: Vec<Trajectory>, chunksize: usize) -> Result<Self, TrajFlowError> {
        if data.is_empty() {
            return Err(TrajFlowError::EmptyInput("no trajectories given".into()));
        }
        let expected_cols = data[0].ncols();
        for (itraj, traj) in data.iter().enumerate() {
            if traj.nrows() == 0 {
                return Err(TrajFlowError::EmptyInput(format!(
                    "trajectory {itraj} has no frames"
                )));
            }
            if traj.ncols() != expected_cols {
                return Err(TrajFlowError::ShapeMismatch {
                    rows: traj.nrows(),
                    cols: traj.ncols(),
                    expected_cols,
                });
            }
        }
        Ok(Self {
            data,
            chunksize: Cell::new(chunksize),
        })
    }

    /// Wrap a single trajectory.
    pub fn from_single(traj: Trajectory, chunksize: usize) -> Result<Self, TrajFlowError> {
        Self::new(vec![traj], chunksize)
    }

    /// Borrow the underlying trajectories.
    pub fn data(&self) -> &[Trajectory] {
        &self.data
    }
}

impl DataProducer for DataInMemory {
    fn dimension(&self) -> Result<usize, TrajFlowError> {
        Ok(self.data[0].ncols())
    }

    fn chunksize(&self) -> Result<usize, TrajFlowError> {
        Ok(self.chunksize.get())
    }

    fn set_chunksize(&self, size: usize) -> Result<(), TrajFlowError> {
        self.chunksize.set(size);
        Ok(())
    }

    fn number_of_trajectories(&self) -> Result<usize, TrajFlowError> {
        Ok(self.data.len())
    }

    fn trajectory_length(
        &self,
        itraj: usize,
        stride: usize,
        skip: usize,
    ) -> Result<usize, TrajFlowError> {
        if stride == 0 {
            return Err(TrajFlowError::InvalidIterParameter(
                "stride must be >= 1".into(),
            ));
        }
        let traj = self
            .data
            .get(itraj)
            .ok_or(TrajFlowError::TrajectoryIndexOutOfBounds {
                itraj,
                n_trajectories: self.data.len(),
            })?;
        Ok(strided_length(traj.nrows(), stride, skip))
    }

    fn trajectory_lengths(
        &self,
        stride: usize,
        skip: usize,
    ) -> Result<Vec<usize>, TrajFlowError> {
        (0..self.data.len())
            .map(|itraj| self.trajectory_length(itraj, stride, skip))
            .try_collect()
    }

    fn n_frames_total(&self, stride: usize) -> Result<usize, TrajFlowError> {
        Ok(self.trajectory_lengths(stride, 0)?.iter().sum())
    }

    fn create_iterator(
        self: Rc<Self>,
        params: &IterParams,
    ) -> Result<Box<dyn ChunkIterator>, TrajFlowError> {
        params.validate()?;
        Ok(Box::new(InMemoryIterator::new(self, *params)))
    }
}

/// Cursor over a [`DataInMemory`], honoring skip/stride/chunk bounds.
///
/// The cursor advances monotonically: trajectory by trajectory, and within a
/// trajectory in strided position order. Trajectories whose strided/skipped
/// length is zero are passed over without yielding a chunk.
pub struct InMemoryIterator {
    source: Rc<DataInMemory>,
    params: IterParams,
    /// Trajectory the next chunk will be cut from.
    itraj: usize,
    /// Strided position of the next frame within that trajectory.
    pos: usize,
    /// Trajectory of the most recently yielded chunk.
    last_itraj: usize,
    n_chunks: usize,
    closed: bool,
}

impl InMemoryIterator {
    fn new(source: Rc<DataInMemory>, params: IterParams) -> Self {
        let n_chunks = source
            .data()
            .iter()
            .map(|traj| {
                chunk_count(
                    strided_length(traj.nrows(), params.stride, params.skip),
                    params.chunk,
                )
            })
            .sum();
        Self {
            source,
            params,
            itraj: 0,
            pos: 0,
            last_itraj: 0,
            n_chunks,
            closed: false,
        }
    }
}

impl ChunkIterator for InMemoryIterator {
    fn next_chunk(&mut self) -> Result<Option<Chunk>, TrajFlowError> {
        if self.closed {
            return Ok(None);
        }
        let IterParams {
            skip,
            chunk,
            stride,
        } = self.params;

        loop {
            let Some(traj) = self.source.data().get(self.itraj) else {
                return Ok(None);
            };
            let total = strided_length(traj.nrows(), stride, skip);
            if self.pos >= total {
                self.itraj += 1;
                self.pos = 0;
                continue;
            }

            let want = if chunk == 0 {
                total - self.pos
            } else {
                chunk.min(total - self.pos)
            };
            let start = self.pos;
            let data = DMatrix::from_fn(want, traj.ncols(), |r, c| {
                traj[(skip + (start + r) * stride, c)]
            });

            self.last_itraj = self.itraj;
            self.pos += want;
            return Ok(Some(Chunk {
                itraj: self.itraj,
                data,
            }));
        }
    }

    fn current_trajindex(&self) -> usize {
        self.last_itraj
    }

    fn n_chunks(&self) -> usize {
        self.n_chunks
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

impl Drop for InMemoryIterator {
    fn drop(&mut self) {
        self.close();
    }
}
