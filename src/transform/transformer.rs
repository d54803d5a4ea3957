//! # Pipeline stage: fit once, map lazily, produce for the next stage
//!
//! [`Transformer`] turns a raw or already-transformed data producer into a new
//! producer whose output is the per-chunk-mapped version of the input. Actual
//! computation is deferred until chunks are pulled, and the one-time
//! parametrization of the wrapped [`TransformModel`] is deferred until first
//! access.
//!
//! ## Overview
//! -----------------
//! A stage wires three things together:
//!
//! 1. a replaceable association to its **upstream producer**
//!    (`Rc<dyn DataProducer>`),
//! 2. the **model** carrying the per-chunk mapping and its fitting procedure,
//! 3. an explicit **estimation state machine**:
//!
//! ```text
//! Unconfigured ──set producer──▶ Configured ──estimate ok──▶ Estimated
//!       ▲                            ▲                           │
//!       └────────── (never) ─────────┴──── set *other* producer ─┘
//! ```
//!
//! Re-assigning a producer that differs **by identity** always lands in
//! `Configured`; re-assigning the identical producer never invalidates a fit.
//!
//! ## Laziness & composition
//! -----------------
//! A stage implements [`DataProducer`] itself, so chains
//! `producer → T₁ → T₂ → …` compose without special cases. Iterating a stage
//! pulls raw chunks from upstream and maps them one at a time; nothing is
//! materialized unless [`Transformer::get_output`] (eager collection) or the
//! in-memory mode is requested. Estimation is **not** cascaded upstream: a
//! stage only ever fits itself, against whatever producer it currently holds,
//! and iterating an un-estimated stage is a
//! [`TrajFlowError::NotEstimated`] error. Fitting a chain therefore happens
//! head-first, under the caller's control (see
//! [`Pipeline`](crate::transform::pipeline::Pipeline)).
//!
//! ## Error semantics
//! -----------------
//! * Missing producer / invalid parameters → immediate configuration errors.
//! * Shape mismatches during mapping → fatal, named shapes, never caught here.
//! * [`TrajFlowError::NotConverged`] from the model's fit → downgraded to an
//!   info-level log line; the stage still counts as estimated.
//! * Any other fitting failure aborts and leaves the stage un-estimated.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;
use tracing::{debug, info};

#[cfg(feature = "progress")]
use crate::transform::progress_bar::{fmt_dur, IterTimer};
#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::constants::{Trajectory, DEFAULT_CHUNKSIZE};
use crate::data::chunk_iterator::{ChunkIterator, IterParams};
use crate::data::data_in_memory::DataInMemory;
use crate::data::{DataProducer, IntoProducer, TrajData};
use crate::trajflow_errors::TrajFlowError;
use crate::transform::model::TransformModel;
use crate::transform::transformer_iterator::TransformerIterator;

/// Where a stage stands in its configure-then-fit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimationState {
    /// No upstream producer assigned yet.
    Unconfigured,
    /// Producer assigned, parameters not (or no longer) fitted.
    Configured,
    /// Parameters fitted against the current producer.
    Estimated,
}

/// A composable pipeline stage wrapping a [`TransformModel`].
///
/// Stages are shared as `Rc<Transformer<M>>` so that downstream stages can
/// hold them as producers; all mutating operations therefore go through
/// interior mutability (`Cell`/`RefCell`), in line with the crate's
/// single-threaded, lock-free pull model.
///
/// Example
/// -----------------
/// ```rust,no_run
/// use std::rc::Rc;
/// use trajflow::{IterParams, Transformer};
/// # use trajflow::{DataProducer, TrajFlowError, TransformModel, Trajectory};
/// # #[derive(Clone)] struct MyModel;
/// # impl TransformModel for MyModel {
/// #     fn describe(&self) -> String { "my model".into() }
/// #     fn dimension(&self) -> usize { 1 }
/// #     fn transform_array(&self, x: &Trajectory) -> Result<Trajectory, TrajFlowError> { Ok(x.clone()) }
/// #     fn estimate(&mut self, _: Rc<dyn DataProducer>, _: usize) -> Result<(), TrajFlowError> { Ok(()) }
/// # }
/// # fn demo(frames: Trajectory) -> Result<(), TrajFlowError> {
/// let stage = Rc::new(Transformer::new(MyModel));
/// let output = stage.fit(frames)?.get_output(None, &IterParams::default())?;
/// # Ok(()) }
/// ```
pub struct Transformer<M: TransformModel> {
    model: RefCell<M>,
    producer: RefCell<Option<Rc<dyn DataProducer>>>,
    state: Cell<EstimationState>,
    in_memory: Cell<bool>,
    mapped: RefCell<Option<Rc<DataInMemory>>>,
    mapping_to_mem_active: Cell<bool>,
}

impl<M: TransformModel + 'static> Transformer<M> {
    /// Wrap a model into an unconfigured stage.
    pub fn new(model: M) -> Self {
        Self {
            model: RefCell::new(model),
            producer: RefCell::new(None),
            state: Cell::new(EstimationState::Unconfigured),
            in_memory: Cell::new(false),
            mapped: RefCell::new(None),
            mapping_to_mem_active: Cell::new(false),
        }
    }

    /// Human-readable identity of this stage (delegated to the model).
    pub fn describe(&self) -> String {
        self.model.borrow().describe()
    }

    /// Borrow the wrapped model, e.g. to inspect fitted parameters.
    pub fn model(&self) -> Ref<'_, M> {
        self.model.borrow()
    }

    /// Current lifecycle state.
    pub fn estimation_state(&self) -> EstimationState {
        self.state.get()
    }

    /// Whether the model's parameters are fitted against the current producer.
    pub fn is_estimated(&self) -> bool {
        self.state.get() == EstimationState::Estimated
    }

    /// The upstream producer this stage reads from, if configured.
    pub fn data_producer(&self) -> Option<Rc<dyn DataProducer>> {
        self.producer.borrow().clone()
    }

    /// Replace the upstream association.
    ///
    /// Assigning a producer that differs by identity from the current one
    /// invalidates the fitted state (and any in-memory mapping of it);
    /// re-assigning the identical producer is a no-op for the lifecycle.
    pub fn set_data_producer(&self, dp: Rc<dyn DataProducer>) {
        let same = self
            .producer
            .borrow()
            .as_ref()
            .is_some_and(|cur| Rc::ptr_eq(cur, &dp));
        if !same {
            debug!(
                stage = %self.describe(),
                "data producer changed, resetting parametrization state"
            );
            self.state.set(EstimationState::Configured);
            self.mapped.replace(None);
        }
        self.producer.replace(Some(dp));
    }

    /// Whether this stage eagerly holds its mapped output in memory.
    pub fn in_memory(&self) -> bool {
        self.in_memory.get()
    }

    /// Toggle the in-memory mode.
    ///
    /// Enabling it on an already-estimated stage maps the output immediately;
    /// disabling it drops the mapping and reverts to streaming from upstream.
    pub fn set_in_memory(&self, on: bool) -> Result<(), TrajFlowError> {
        self.in_memory.set(on);
        if on {
            if self.is_estimated() && self.mapped.borrow().is_none() {
                self.map_to_memory()?;
            }
        } else {
            self.mapped.replace(None);
        }
        Ok(())
    }

    /// Coerce `x` into a data producer, adopt it, and fit the model.
    ///
    /// Returns `&self` so construction chains:
    /// `stage.fit(data)?.get_output(...)`.
    pub fn fit<X: IntoProducer>(&self, x: X) -> Result<&Self, TrajFlowError> {
        let dp = x.into_producer(self.chunksize_or_default())?;
        self.set_data_producer(Rc::clone(&dp));
        self.run_estimation(dp, 1)?;
        Ok(self)
    }

    /// [`fit`](Transformer::fit) followed by a full eager mapping of the same
    /// data; the convenience path for non-streaming use.
    pub fn fit_transform(&self, x: impl Into<TrajData>) -> Result<Vec<Trajectory>, TrajFlowError> {
        let mem = Rc::new(DataInMemory::new(
            x.into().into_vec(),
            self.chunksize_or_default(),
        )?);
        self.set_data_producer(Rc::clone(&mem) as Rc<dyn DataProducer>);
        self.run_estimation(Rc::clone(&mem) as Rc<dyn DataProducer>, 1)?;
        self.transform_list(mem.data())
    }

    /// Adopt `x` (wrapping raw arrays in-memory if needed) and fit the model
    /// by streaming at the given `stride`.
    pub fn estimate<X: IntoProducer>(&self, x: X, stride: usize) -> Result<(), TrajFlowError> {
        let dp = x.into_producer(self.chunksize_or_default())?;
        self.set_data_producer(Rc::clone(&dp));
        self.run_estimation(dp, stride)
    }

    /// Legacy entry point: fit against the already-configured producer.
    ///
    /// Return
    /// ----------
    /// * `Err(TrajFlowError::MissingDataProducer)` when no producer is
    ///   configured — a usage error, never retried.
    pub fn parametrize(&self, stride: usize) -> Result<(), TrajFlowError> {
        let dp = self.producer_or_err("parametrize")?;
        self.run_estimation(dp, stride)
    }

    /// Eagerly map one whole (T × n) block.
    ///
    /// Legacy next to [`fit`](Transformer::fit) /
    /// [`fit_transform`](Transformer::fit_transform), but a stable operation:
    /// the returned block has the same row count as the input and the model's
    /// declared output dimensionality as column count.
    pub fn transform(&self, x: &Trajectory) -> Result<Trajectory, TrajFlowError> {
        self.model.borrow().transform_array(x)
    }

    /// Eagerly map a list of blocks, each element independently, order
    /// preserved. Row counts may vary across elements.
    pub fn transform_list(&self, xs: &[Trajectory]) -> Result<Vec<Trajectory>, TrajFlowError> {
        let model = self.model.borrow();
        xs.iter().map(|x| model.transform_array(x)).try_collect()
    }

    /// Collect the mapped output, one matrix per trajectory.
    ///
    /// Triggers exactly one estimation pass (at `params.stride`) if the stage
    /// is configured but not yet estimated, then streams chunks through the
    /// mapping and assembles them. `dimensions` optionally selects a subset of
    /// output columns, in the given order.
    ///
    /// Arguments
    /// -----------------
    /// * `dimensions` – output columns to keep (`None` = all).
    /// * `params` – skip/chunk/stride of the collection pass.
    ///
    /// Return
    /// ----------
    /// * One (T_i × d) matrix per trajectory, in trajectory order.
    pub fn get_output(
        &self,
        dimensions: Option<&[usize]>,
        params: &IterParams,
    ) -> Result<Vec<Trajectory>, TrajFlowError> {
        params.validate()?;
        if !self.is_estimated() {
            if self.state.get() == EstimationState::Unconfigured {
                return Err(TrajFlowError::MissingDataProducer("get_output".into()));
            }
            self.parametrize(params.stride)?;
        }

        let out_dim = self.model.borrow().dimension();
        let dims: Vec<usize> = match dimensions {
            None => (0..out_dim).collect(),
            Some(sel) => {
                if let Some(&bad) = sel.iter().find(|&&d| d >= out_dim) {
                    return Err(TrajFlowError::InvalidIterParameter(format!(
                        "dimension index {bad} out of range for {out_dim} output dimensions"
                    )));
                }
                sel.to_vec()
            }
        };

        let lengths = self.trajectory_lengths(params.stride, params.skip)?;
        let mut out: Vec<Trajectory> = lengths
            .iter()
            .map(|&len| Trajectory::zeros(len, dims.len()))
            .collect();
        let mut offsets = vec![0usize; lengths.len()];

        let mut it = self.stage_iterator(params)?;

        #[cfg(feature = "progress")]
        let pb = {
            let pb = ProgressBar::new(it.n_chunks().max(1) as u64);
            pb.set_style(
                ProgressStyle::with_template(
                    "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | {per_sec} | {msg}",
                )
                .expect("indicatif template"),
            );
            pb
        };
        #[cfg(feature = "progress")]
        let mut it_timer = IterTimer::new(0.2);

        while let Some(chunk) = it.next_chunk()? {
            let t = chunk.itraj;
            let rows = chunk.data.nrows();
            for (j, &d) in dims.iter().enumerate() {
                for r in 0..rows {
                    out[t][(offsets[t] + r, j)] = chunk.data[(r, d)];
                }
            }
            offsets[t] += rows;

            #[cfg(feature = "progress")]
            {
                let last = it_timer.tick();
                pb.set_message(format!(
                    "last: {}, avg: {}",
                    fmt_dur(last),
                    fmt_dur(it_timer.avg())
                ));
                pb.inc(1);
            }
        }
        it.close();

        #[cfg(feature = "progress")]
        pb.finish_and_clear();

        Ok(out)
    }

    /// Manufacture the lazily-mapped chunk iterator of this stage.
    ///
    /// Requires an estimated stage; when the in-memory mode holds a mapping,
    /// chunks are served from it instead of re-mapping upstream data.
    pub(crate) fn stage_iterator(
        &self,
        params: &IterParams,
    ) -> Result<Box<dyn ChunkIterator>, TrajFlowError> {
        if !self.is_estimated() {
            return Err(TrajFlowError::NotEstimated(self.describe()));
        }
        if let Some(mem) = self.mapped.borrow().as_ref() {
            return Rc::clone(mem).create_iterator(params);
        }
        let upstream = self.producer_or_err("create_iterator")?;
        let it = upstream.create_iterator(params)?;
        Ok(Box::new(TransformerIterator::new(
            it,
            self.model.borrow().clone(),
        )))
    }

    fn producer_or_err(&self, ctx: &str) -> Result<Rc<dyn DataProducer>, TrajFlowError> {
        self.producer
            .borrow()
            .clone()
            .ok_or_else(|| TrajFlowError::MissingDataProducer(ctx.into()))
    }

    fn chunksize_or_default(&self) -> usize {
        self.producer
            .borrow()
            .as_ref()
            .and_then(|dp| dp.chunksize().ok())
            .unwrap_or(DEFAULT_CHUNKSIZE)
    }

    /// Run the pre/fit/post sequence and update the lifecycle.
    ///
    /// `NotConverged` is the one recoverable condition: it is logged and the
    /// fit still counts. Everything else aborts and leaves the state
    /// untouched (i.e. not estimated).
    fn run_estimation(
        &self,
        dp: Rc<dyn DataProducer>,
        stride: usize,
    ) -> Result<(), TrajFlowError> {
        if stride == 0 {
            return Err(TrajFlowError::InvalidIterParameter(
                "stride must be >= 1".into(),
            ));
        }

        let mut model = self.model.borrow_mut();
        model.pre_estimate();
        match model.estimate(dp, stride) {
            Ok(()) => {}
            Err(TrajFlowError::NotConverged(msg)) => {
                info!(stage = %model.describe(), %msg, "presumably finished estimation");
            }
            Err(e) => return Err(e),
        }
        model.post_estimate();
        drop(model);

        self.state.set(EstimationState::Estimated);

        // Memory mode? Then map all results now. The flag guards against
        // re-entrant mapping when get_output itself triggered this estimation.
        if self.in_memory.get() && !self.mapping_to_mem_active.get() {
            self.map_to_memory()?;
        }
        Ok(())
    }

    fn map_to_memory(&self) -> Result<(), TrajFlowError> {
        debug!(stage = %self.describe(), "mapping full output to memory");
        self.mapping_to_mem_active.set(true);
        let result = self
            .get_output(None, &IterParams::default())
            .and_then(|output| DataInMemory::new(output, self.chunksize_or_default()));
        self.mapping_to_mem_active.set(false);
        self.mapped.replace(Some(Rc::new(result?)));
        Ok(())
    }
}

impl<M: TransformModel> fmt::Debug for Transformer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("state", &self.state.get())
            .field("in_memory", &self.in_memory.get())
            .finish()
    }
}

impl<M: TransformModel + 'static> fmt::Display for Transformer<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

impl<M: TransformModel + 'static> DataProducer for Transformer<M> {
    /// Output dimensionality comes from the model; everything else about the
    /// dataset shape is delegated to the upstream producer, which stays the
    /// single source of truth.
    fn dimension(&self) -> Result<usize, TrajFlowError> {
        Ok(self.model.borrow().dimension())
    }

    fn chunksize(&self) -> Result<usize, TrajFlowError> {
        self.producer_or_err("chunksize")?.chunksize()
    }

    fn set_chunksize(&self, size: usize) -> Result<(), TrajFlowError> {
        self.producer_or_err("set_chunksize")?.set_chunksize(size)
    }

    fn number_of_trajectories(&self) -> Result<usize, TrajFlowError> {
        self.producer_or_err("number_of_trajectories")?
            .number_of_trajectories()
    }

    fn trajectory_length(
        &self,
        itraj: usize,
        stride: usize,
        skip: usize,
    ) -> Result<usize, TrajFlowError> {
        self.producer_or_err("trajectory_length")?
            .trajectory_length(itraj, stride, skip)
    }

    fn trajectory_lengths(
        &self,
        stride: usize,
        skip: usize,
    ) -> Result<Vec<usize>, TrajFlowError> {
        self.producer_or_err("trajectory_lengths")?
            .trajectory_lengths(stride, skip)
    }

    fn n_frames_total(&self, stride: usize) -> Result<usize, TrajFlowError> {
        self.producer_or_err("n_frames_total")?.n_frames_total(stride)
    }

    fn create_iterator(
        self: Rc<Self>,
        params: &IterParams,
    ) -> Result<Box<dyn ChunkIterator>, TrajFlowError> {
        self.stage_iterator(params)
    }
}

impl<M: TransformModel + 'static> IntoProducer for Rc<Transformer<M>> {
    fn into_producer(self, _chunksize: usize) -> Result<Rc<dyn DataProducer>, TrajFlowError> {
        Ok(self)
    }
}
