use std::rc::Rc;

use approx::assert_relative_eq;

use trajflow::{IntoProducer, IterParams, Pipeline, TrajFlowError, Trajectory, Transformer};

mod common;
use common::{random_walk, MeanFree, PairAverage};

#[test]
fn two_stage_chain_end_to_end() {
    let data = vec![random_walk(200, 4, 10), random_walk(60, 4, 11)];

    let center = Rc::new(Transformer::new(MeanFree::new(4)));
    let coarse = Rc::new(Transformer::new(PairAverage { in_dim: 4 }));

    // ---------- wire and fit head-first ----------
    let mut pipe = Pipeline::new(data.clone()).unwrap();
    pipe.add(center.clone());
    pipe.add(coarse.clone());
    pipe.parametrize(1).unwrap();

    // ---------- stream in bounded chunks ----------
    let params = IterParams {
        skip: 0,
        chunk: 25,
        stride: 1,
    };
    let out = pipe.get_output(None, &params).unwrap();

    // ---------- compare against the eager composition ----------
    let eager: Vec<Trajectory> = data
        .iter()
        .map(|x| {
            let centered = center.transform(x).unwrap();
            coarse.transform(&centered).unwrap()
        })
        .collect();

    assert_eq!(out.len(), eager.len());
    for (o, e) in out.iter().zip(&eager) {
        assert_eq!(o.shape(), e.shape());
        for (a, b) in o.iter().zip(e.iter()) {
            assert_relative_eq!(*a, *b);
        }
    }
}

#[test]
fn mean_free_output_is_centered() {
    let stage = Transformer::new(MeanFree::new(3));
    stage.fit(vec![random_walk(500, 3, 12)]).unwrap();

    let out = stage.get_output(None, &IterParams::default()).unwrap();
    for c in 0..3 {
        let col_mean: f64 = out[0].column(c).iter().sum::<f64>() / out[0].nrows() as f64;
        assert_relative_eq!(col_mean, 0.0, epsilon = 1e-10);
    }
}

#[test]
fn get_output_fits_on_demand() {
    let stage = Transformer::new(MeanFree::new(2));
    stage.estimate(vec![random_walk(50, 2, 13)], 1).unwrap();
    assert!(stage.is_estimated());

    // a new producer invalidates the fit; get_output re-estimates on demand
    stage.set_data_producer(vec![random_walk(40, 2, 14)].into_producer(1000).unwrap());
    assert!(!stage.is_estimated());
    let out = stage.get_output(None, &IterParams::default()).unwrap();
    assert!(stage.is_estimated());
    assert_eq!(out[0].nrows(), 40);
}

#[test]
fn chained_construction_reads_naturally() {
    let stage = Transformer::new(PairAverage { in_dim: 4 });
    let out = stage
        .fit(vec![random_walk(30, 4, 15)])
        .unwrap()
        .get_output(None, &IterParams::default())
        .unwrap();
    assert_eq!((out[0].nrows(), out[0].ncols()), (30, 2));
}

#[test]
fn mismatched_stage_dimensions_fail_with_the_offending_shape() {
    let center = Rc::new(Transformer::new(MeanFree::new(4)));
    // wrong declared input width for the second stage
    let coarse = Rc::new(Transformer::new(PairAverage { in_dim: 6 }));

    let mut pipe = Pipeline::new(vec![random_walk(20, 4, 16)]).unwrap();
    pipe.add(center);
    pipe.add(coarse);
    pipe.parametrize(1).unwrap();

    let err = pipe.get_output(None, &IterParams::default()).unwrap_err();
    assert_eq!(
        err,
        TrajFlowError::ShapeMismatch {
            rows: 20,
            cols: 4,
            expected_cols: 6
        }
    );
}
