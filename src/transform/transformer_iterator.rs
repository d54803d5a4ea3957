//! # Lazily-mapped chunk stream
//!
//! [`TransformerIterator`] adapts the upstream producer's chunk iterator into
//! the mapped stream a [`Transformer`](crate::transform::transformer::Transformer)
//! exposes: every pulled chunk goes through the fitted model exactly once, and
//! nothing is materialized beyond the chunk in flight.

use crate::data::chunk_iterator::{Chunk, ChunkIterator};
use crate::trajflow_errors::TrajFlowError;
use crate::transform::model::TransformModel;

/// One-pass mapped cursor over an upstream chunk iterator.
///
/// The iterator is built from the upstream iterator (created with identical
/// parameters) plus a snapshot of the owning stage's fitted model, so the
/// mapping stays a pure function of fitted parameters for the whole pass.
/// Cursor introspection and closing are pure delegations: this iterator never
/// advances independently of its upstream, which keeps the two cursors
/// synchronized and leaves a single source of truth for the position.
pub struct TransformerIterator<M: TransformModel> {
    it: Box<dyn ChunkIterator>,
    model: M,
}

impl<M: TransformModel> TransformerIterator<M> {
    pub(crate) fn new(it: Box<dyn ChunkIterator>, model: M) -> Self {
        Self { it, model }
    }
}

impl<M: TransformModel> ChunkIterator for TransformerIterator<M> {
    /// Pull the next raw chunk and map it.
    ///
    /// Upstream exhaustion (`Ok(None)`) propagates unchanged; a mapping error
    /// propagates out and leaves the upstream iterator open until
    /// [`close`](ChunkIterator::close) (or drop) releases it.
    fn next_chunk(&mut self) -> Result<Option<Chunk>, TrajFlowError> {
        match self.it.next_chunk()? {
            None => Ok(None),
            Some(chunk) => Ok(Some(Chunk {
                itraj: chunk.itraj,
                data: self.model.transform_array(&chunk.data)?,
            })),
        }
    }

    fn current_trajindex(&self) -> usize {
        self.it.current_trajindex()
    }

    fn n_chunks(&self) -> usize {
        self.it.n_chunks()
    }

    fn close(&mut self) {
        self.it.close();
    }
}
