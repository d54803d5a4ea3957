use std::rc::Rc;

use trajflow::{DataInMemory, DataProducer, IterParams, Transformer};

mod common;
use common::{random_walk, PairAverage};

/// Pull every chunk of a fresh pass and return the concatenated frames per
/// trajectory, closing the iterator at the end.
fn drain(
    producer: Rc<dyn DataProducer>,
    params: IterParams,
) -> Vec<Vec<Vec<f64>>> {
    let n_traj = producer.number_of_trajectories().unwrap();
    let mut frames: Vec<Vec<Vec<f64>>> = vec![Vec::new(); n_traj];
    let mut it = producer.create_iterator(&params).unwrap();
    while let Some(chunk) = it.next_chunk().unwrap() {
        for r in 0..chunk.data.nrows() {
            frames[chunk.itraj].push(chunk.data.row(r).iter().copied().collect());
        }
    }
    it.close();
    frames
}

#[test]
fn chunks_reconstruct_strided_subsequences() {
    let trajs = vec![random_walk(83, 3, 1), random_walk(17, 3, 2)];
    let mem = Rc::new(DataInMemory::new(trajs.clone(), 0).unwrap());

    for skip in [0usize, 1, 9, 40] {
        for stride in [1usize, 2, 5] {
            for chunk in [0usize, 1, 13, 500] {
                let params = IterParams {
                    skip,
                    chunk,
                    stride,
                };
                let got = drain(mem.clone(), params);

                for (itraj, traj) in trajs.iter().enumerate() {
                    let expected: Vec<Vec<f64>> = (skip..traj.nrows())
                        .step_by(stride)
                        .map(|t| traj.row(t).iter().copied().collect())
                        .collect();
                    assert_eq!(
                        got[itraj], expected,
                        "trajectory {itraj}, skip={skip} stride={stride} chunk={chunk}"
                    );
                }
            }
        }
    }
}

#[test]
fn bounded_chunks_cover_both_trajectories() {
    // trajectories of lengths [100, 50], chunksize 30, a mapping that halves
    // the column count
    let stage = Rc::new(Transformer::new(PairAverage { in_dim: 4 }));
    stage
        .fit(vec![random_walk(100, 4, 3), random_walk(50, 4, 4)])
        .unwrap();

    let params = IterParams {
        skip: 0,
        chunk: 30,
        stride: 1,
    };
    let producer: Rc<dyn DataProducer> = stage.clone();
    let mut it = producer.create_iterator(&params).unwrap();

    let mut per_traj = [0usize; 2];
    while let Some(chunk) = it.next_chunk().unwrap() {
        assert!(chunk.data.nrows() <= 30);
        assert_eq!(chunk.data.ncols(), 2);
        per_traj[chunk.itraj] += chunk.data.nrows();
    }
    it.close();
    assert_eq!(per_traj, [100, 50]);

    // the eagerly collected output has the same shape
    let out = stage.get_output(None, &params).unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!((out[0].nrows(), out[0].ncols()), (100, 2));
    assert_eq!((out[1].nrows(), out[1].ncols()), (50, 2));
}

#[test]
fn stride_two_yields_fifty_frames() {
    let stage = Transformer::new(PairAverage { in_dim: 2 });
    stage.fit(vec![random_walk(100, 2, 5)]).unwrap();

    let params = IterParams {
        skip: 0,
        chunk: 30,
        stride: 2,
    };
    let out = stage.get_output(None, &params).unwrap();
    assert_eq!(out[0].nrows(), 50);
}

#[test]
fn identical_parameters_yield_identical_sequences() {
    let mem = Rc::new(DataInMemory::new(vec![random_walk(64, 2, 6)], 0).unwrap());
    let params = IterParams {
        skip: 3,
        chunk: 10,
        stride: 2,
    };

    let first = drain(mem.clone(), params);
    let second = drain(mem, params);
    assert_eq!(first, second);
}
