//! # Transformation stages
//!
//! The push-through side of the pipeline: wrap a
//! [`TransformModel`](crate::transform::model::TransformModel) into a
//! [`Transformer`](crate::transform::transformer::Transformer) stage, fit it
//! once, and stream mapped chunks to the next stage or collect them eagerly.
//!
//! Modules
//! -----------------
//! * [`model`](crate::transform::model) – the contract a concrete transform
//!   (and its fitting procedure) implements.
//! * [`transformer`](crate::transform::transformer) – the pipeline stage:
//!   lifecycle, fit/estimate entry points, eager and lazy output paths.
//! * [`transformer_iterator`](crate::transform::transformer_iterator) – the
//!   lazily-mapped chunk stream behind a stage.
//! * [`pipeline`](crate::transform::pipeline) – chain wiring and head-first
//!   fitting.
//! * *(feature `progress`)* `progress_bar` – iteration timing for the optional
//!   progress UI.

pub mod model;
pub mod pipeline;
#[cfg(feature = "progress")]
pub(crate) mod progress_bar;
pub mod transformer;
pub mod transformer_iterator;
