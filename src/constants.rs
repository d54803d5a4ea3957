//! # Constants and type definitions for trajflow
//!
//! This module centralizes the **type aliases** and **default parameters** shared
//! by the data-producer and transformation layers.
//!
//! ## Overview
//!
//! - The frame-matrix alias used throughout the crate
//! - Default batching parameters for in-memory data sources
//!
//! These definitions are used by all main modules, including the chunk
//! iterators, the in-memory producer, and the pipeline stages.

use nalgebra::DMatrix;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// One trajectory (or a contiguous block of one): a dense matrix with one row
/// per frame and one column per dimension.
pub type Trajectory = DMatrix<f64>;

// -------------------------------------------------------------------------------------------------
// Defaults
// -------------------------------------------------------------------------------------------------

/// Default chunk size used when raw arrays are wrapped into an in-memory
/// producer without an explicit batching choice.
pub const DEFAULT_CHUNKSIZE: usize = 1000;
