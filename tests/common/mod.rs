#![allow(dead_code)]

use std::rc::Rc;

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use trajflow::{DataProducer, IterParams, TrajFlowError, Trajectory, TransformModel};

/// Random-walk trajectory: each dimension accumulates uniform steps in
/// [-0.5, 0.5). Deterministic for a given seed.
pub fn random_walk(nrows: usize, ncols: usize, seed: u64) -> Trajectory {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut current = vec![0.0_f64; ncols];
    let mut frames = Trajectory::zeros(nrows, ncols);
    for r in 0..nrows {
        for (c, x) in current.iter_mut().enumerate() {
            *x += rng.random::<f64>() - 0.5;
            frames[(r, c)] = *x;
        }
    }
    frames
}

/// Subtracts the per-dimension mean fitted by streaming over the producer.
#[derive(Clone)]
pub struct MeanFree {
    pub dim: usize,
    pub mean: Option<DVector<f64>>,
}

impl MeanFree {
    pub fn new(dim: usize) -> Self {
        Self { dim, mean: None }
    }
}

impl TransformModel for MeanFree {
    fn describe(&self) -> String {
        format!("mean-free [{} dimensions]", self.dim)
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn transform_array(&self, x: &Trajectory) -> Result<Trajectory, TrajFlowError> {
        if x.ncols() != self.dim {
            return Err(TrajFlowError::ShapeMismatch {
                rows: x.nrows(),
                cols: x.ncols(),
                expected_cols: self.dim,
            });
        }
        let mean = self
            .mean
            .as_ref()
            .ok_or_else(|| TrajFlowError::EstimationFailed("mean not fitted".into()))?;
        let mut y = x.clone();
        for mut row in y.row_iter_mut() {
            for (j, v) in row.iter_mut().enumerate() {
                *v -= mean[j];
            }
        }
        Ok(y)
    }

    fn estimate(
        &mut self,
        producer: Rc<dyn DataProducer>,
        stride: usize,
    ) -> Result<(), TrajFlowError> {
        let params = IterParams {
            skip: 0,
            chunk: 0,
            stride,
        };
        let mut it = producer.create_iterator(&params)?;
        let mut sum = DVector::zeros(self.dim);
        let mut n = 0usize;
        while let Some(chunk) = it.next_chunk()? {
            for r in 0..chunk.data.nrows() {
                sum += chunk.data.row(r).transpose();
                n += 1;
            }
        }
        it.close();
        if n == 0 {
            return Err(TrajFlowError::EstimationFailed("no frames seen".into()));
        }
        self.mean = Some(sum / n as f64);
        Ok(())
    }
}

/// Coarse-grains by averaging adjacent dimension pairs, halving the column
/// count. Stateless mapping; nothing to fit.
#[derive(Clone)]
pub struct PairAverage {
    pub in_dim: usize,
}

impl TransformModel for PairAverage {
    fn describe(&self) -> String {
        format!(
            "pair-average [{} -> {} dimensions]",
            self.in_dim,
            self.in_dim / 2
        )
    }

    fn dimension(&self) -> usize {
        self.in_dim / 2
    }

    fn transform_array(&self, x: &Trajectory) -> Result<Trajectory, TrajFlowError> {
        if x.ncols() != self.in_dim {
            return Err(TrajFlowError::ShapeMismatch {
                rows: x.nrows(),
                cols: x.ncols(),
                expected_cols: self.in_dim,
            });
        }
        Ok(Trajectory::from_fn(x.nrows(), self.in_dim / 2, |r, j| {
            0.5 * (x[(r, 2 * j)] + x[(r, 2 * j + 1)])
        }))
    }

    fn estimate(
        &mut self,
        _producer: Rc<dyn DataProducer>,
        _stride: usize,
    ) -> Result<(), TrajFlowError> {
        Ok(())
    }
}
