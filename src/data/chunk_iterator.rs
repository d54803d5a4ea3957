//! # Chunked iteration: parameters, the transfer unit, and the cursor contract
//!
//! A pass over a dataset is described by an [`IterParams`] (skip / chunk size /
//! stride) and driven by a [`ChunkIterator`], which yields [`Chunk`]s in
//! trajectory order, then in within-trajectory position order. Stride and skip
//! are deterministic functions of the configuration, so two iterators built
//! with identical parameters over an unmodified producer yield identical chunk
//! sequences.
//!
//! ## Lifecycle
//! -----------------
//! An iterator is a one-pass, finite cursor: exhaustion is signaled by
//! `Ok(None)` from [`ChunkIterator::next_chunk`], and a consumer that needs to
//! restart constructs a new iterator from the producer. Resources are released
//! by [`ChunkIterator::close`], which is idempotent; every concrete iterator in
//! this crate also closes itself on `Drop`, so early abandonment and error
//! paths release resources without cooperation from the caller.

use serde::{Deserialize, Serialize};

use crate::constants::Trajectory;
use crate::trajflow_errors::TrajFlowError;

/// Parameters of one pass over a dataset.
///
/// Fields
/// -----------------
/// * `skip` – leading frames dropped from the start of **each** trajectory.
/// * `chunk` – upper bound on frames per yielded chunk; `0` yields each
///   trajectory in one piece.
/// * `stride` – sub-sampling step applied when reading frames (`>= 1`).
///
/// Construction
/// -----------------
/// `IterParams::default()` reads every frame of every trajectory in one chunk
/// per trajectory. Use [`IterParams::builder`] for a validated custom
/// configuration:
///
/// ```rust
/// use trajflow::IterParams;
///
/// let params = IterParams::builder().skip(10).chunk(500).stride(2).build().unwrap();
/// assert_eq!(params.stride, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterParams {
    pub skip: usize,
    pub chunk: usize,
    pub stride: usize,
}

impl Default for IterParams {
    fn default() -> Self {
        IterParams {
            skip: 0,
            chunk: 0,
            stride: 1,
        }
    }
}

impl IterParams {
    /// Equivalent to [`IterParams::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fluent, validating builder.
    pub fn builder() -> IterParamsBuilder {
        IterParamsBuilder::new()
    }

    /// Check the invariants a producer relies on.
    ///
    /// `stride == 0` is the one representable misconfiguration; producers
    /// re-check it so that hand-built (non-builder) parameter values cannot
    /// bypass validation.
    pub fn validate(&self) -> Result<(), TrajFlowError> {
        if self.stride == 0 {
            return Err(TrajFlowError::InvalidIterParameter(
                "stride must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`IterParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct IterParamsBuilder {
    params: IterParams,
}

impl IterParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: IterParams::default(),
        }
    }

    pub fn skip(mut self, v: usize) -> Self {
        self.params.skip = v;
        self
    }

    pub fn chunk(mut self, v: usize) -> Self {
        self.params.chunk = v;
        self
    }

    pub fn stride(mut self, v: usize) -> Self {
        self.params.stride = v;
        self
    }

    /// Finalize the builder.
    ///
    /// Return
    /// ----------
    /// * `Ok(IterParams)` when the configuration is valid,
    /// * `Err(TrajFlowError::InvalidIterParameter)` otherwise.
    pub fn build(self) -> Result<IterParams, TrajFlowError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

/// The unit of lazy transfer: a bounded contiguous block of frames from one
/// trajectory, tagged with the index of the trajectory it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Index of the originating trajectory.
    pub itraj: usize,
    /// The frames (rows) of this block, already strided/skipped.
    pub data: Trajectory,
}

/// One-pass cursor over a producer's chunks.
///
/// Contract
/// -----------------
/// * [`next_chunk`](ChunkIterator::next_chunk) returns `Ok(Some(chunk))` until
///   the pass is exhausted, then `Ok(None)` forever after. The terminal value
///   must propagate unchanged through wrapping iterators.
/// * Errors out of `next_chunk` propagate to the caller; the iterator's
///   resources stay held until [`close`](ChunkIterator::close) runs (every
///   implementation in this crate also closes on `Drop`).
/// * Cursor introspection is read-only and, for wrapping iterators, delegated
///   to the wrapped iterator so that there is a single source of truth for the
///   position.
/// * Only one logical consumer may drive a given iterator instance.
pub trait ChunkIterator {
    /// Pull the next chunk, or `Ok(None)` once the pass is exhausted.
    fn next_chunk(&mut self) -> Result<Option<Chunk>, TrajFlowError>;

    /// Index of the trajectory the most recent chunk came from (0 before the
    /// first pull).
    fn current_trajindex(&self) -> usize;

    /// Total number of chunks this pass will produce.
    fn n_chunks(&self) -> usize;

    /// Release held resources; safe to call more than once. After closing,
    /// `next_chunk` reports exhaustion.
    fn close(&mut self);
}

/// Frames remaining in a trajectory of `len` frames read with `stride` after
/// dropping `skip` leading frames.
pub(crate) fn strided_length(len: usize, stride: usize, skip: usize) -> usize {
    let effective = len.saturating_sub(skip);
    effective.div_ceil(stride)
}

/// Number of chunks needed to cover `len` frames with the given chunk bound
/// (`0` = one chunk).
pub(crate) fn chunk_count(len: usize, chunk: usize) -> usize {
    if len == 0 {
        0
    } else if chunk == 0 {
        1
    } else {
        len.div_ceil(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_zero_stride() {
        let err = IterParams::builder().stride(0).build().unwrap_err();
        assert_eq!(
            err,
            TrajFlowError::InvalidIterParameter("stride must be >= 1".into())
        );
    }

    #[test]
    fn default_reads_everything_in_one_piece() {
        let params = IterParams::default();
        assert_eq!((params.skip, params.chunk, params.stride), (0, 0, 1));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn strided_length_math() {
        assert_eq!(strided_length(100, 1, 0), 100);
        assert_eq!(strided_length(100, 2, 0), 50);
        assert_eq!(strided_length(101, 2, 0), 51);
        assert_eq!(strided_length(100, 3, 0), 34);
        assert_eq!(strided_length(100, 1, 30), 70);
        assert_eq!(strided_length(100, 7, 100), 0);
        assert_eq!(strided_length(100, 7, 250), 0);
    }

    #[test]
    fn chunk_count_math() {
        assert_eq!(chunk_count(0, 10), 0);
        assert_eq!(chunk_count(50, 0), 1);
        assert_eq!(chunk_count(100, 30), 4);
        assert_eq!(chunk_count(90, 30), 3);
        assert_eq!(chunk_count(1, 30), 1);
    }
}
