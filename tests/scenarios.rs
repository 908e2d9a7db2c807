//! End-to-end scenarios exercising the public API together, one test per
//! scenario, in the style of `src-de`'s `tests/optde_*.rs` files (each
//! drives a whole optimization run against a named function rather than
//! unit-testing an internal piece).

use std::sync::Arc;
use std::time::Duration;

use ndarray::Array1;

use hgdl::constraints::{lift, Constraint};
use hgdl::{Bounds, GlobalMethod, Handle, HgdlConfigBuilder, LocalMethod, Problem};

#[test]
fn single_minimum_quadratic_converges() {
    let bounds = Bounds::from_pairs(&[(-10.0, 10.0), (-10.0, 10.0)]).unwrap();
    let problem = Problem::new(
        bounds.clone(),
        |x: &Array1<f64>, _: &()| x[0] * x[0] + x[1] * x[1],
        |x: &Array1<f64>, _: &()| Array1::from_vec(vec![2.0 * x[0], 2.0 * x[1]]),
        (),
    );
    let config = HgdlConfigBuilder::new()
        .num_epochs(5)
        .number_of_walkers(10)
        .local_max_iter(25)
        .build(&bounds)
        .unwrap();
    let handle = Handle::optimize(problem, config, vec![Array1::from_vec(vec![4.0, -6.0])]).unwrap();
    let store = handle.get_final().unwrap();
    assert_eq!(store.len(), 1, "a strictly convex quadratic has exactly one stationary point");
    assert!(store.records()[0].f_val < 1e-6);
}

#[test]
fn double_well_finds_both_minima() {
    // f(x) = (x^2 - 1)^2 has minima at x = -1 and x = 1, and a local max at x = 0.
    let bounds = Bounds::from_pairs(&[(-3.0, 3.0)]).unwrap();
    let problem = Problem::new(
        bounds.clone(),
        |x: &Array1<f64>, _: &()| {
            let v = x[0] * x[0] - 1.0;
            v * v
        },
        |x: &Array1<f64>, _: &()| Array1::from_vec(vec![4.0 * x[0] * (x[0] * x[0] - 1.0)]),
        (),
    );
    let config = HgdlConfigBuilder::new()
        .num_epochs(8)
        .number_of_walkers(16)
        .local_max_iter(30)
        .global_optimizer(GlobalMethod::Genetic)
        .build(&bounds)
        .unwrap();
    let handle = Handle::optimize(problem, config, vec![Array1::from_vec(vec![2.5])]).unwrap();
    let store = handle.get_final().unwrap();
    assert!(store.len() >= 2, "expected to recover both wells, found {}", store.len());
    let xs: Vec<f64> = store.iter().map(|r| r.x[0]).collect();
    assert!(xs.iter().any(|&x| (x - 1.0).abs() < 1e-2));
    assert!(xs.iter().any(|&x| (x + 1.0).abs() < 1e-2));
}

#[test]
fn rastrigin_2d_recovers_several_distinct_minima() {
    let bounds = Bounds::from_pairs(&[(-5.12, 5.12), (-5.12, 5.12)]).unwrap();
    let problem = Problem::new(
        bounds.clone(),
        |x: &Array1<f64>, _: &()| {
            10.0 * x.len() as f64
                + x.iter()
                    .map(|&xi| xi * xi - 10.0 * (2.0 * std::f64::consts::PI * xi).cos())
                    .sum::<f64>()
        },
        |x: &Array1<f64>, _: &()| {
            Array1::from_vec(
                x.iter()
                    .map(|&xi| 2.0 * xi + 20.0 * std::f64::consts::PI * (2.0 * std::f64::consts::PI * xi).sin())
                    .collect(),
            )
        },
        (),
    );
    let config = HgdlConfigBuilder::new()
        .num_epochs(10)
        .number_of_walkers(30)
        .local_max_iter(30)
        .global_optimizer(GlobalMethod::Genetic)
        .build(&bounds)
        .unwrap();
    let handle = Handle::optimize(problem, config, vec![Array1::from_vec(vec![4.0, -3.0])]).unwrap();
    let store = handle.get_final().unwrap();
    assert!(store.len() >= 3, "Rastrigin has many distinct minima in this box, found only {}", store.len());
}

#[test]
fn cancelling_a_long_run_returns_promptly() {
    let bounds = Bounds::from_pairs(&[(-5.0, 5.0), (-5.0, 5.0)]).unwrap();
    let problem = Problem::new(
        bounds.clone(),
        |x: &Array1<f64>, _: &()| {
            10.0 * x.len() as f64
                + x.iter()
                    .map(|&xi| xi * xi - 10.0 * (2.0 * std::f64::consts::PI * xi).cos())
                    .sum::<f64>()
        },
        |x: &Array1<f64>, _: &()| {
            Array1::from_vec(
                x.iter()
                    .map(|&xi| 2.0 * xi + 20.0 * std::f64::consts::PI * (2.0 * std::f64::consts::PI * xi).sin())
                    .collect(),
            )
        },
        (),
    );
    let config = HgdlConfigBuilder::new()
        .num_epochs(1_000_000)
        .number_of_walkers(8)
        .local_max_iter(20)
        .build(&bounds)
        .unwrap();
    let handle = Arc::new(Handle::optimize(problem, config, vec![Array1::from_vec(vec![1.0, 1.0])]).unwrap());

    let canceller = handle.clone();
    let join = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        canceller.cancel();
    });

    let start = std::time::Instant::now();
    let _store = handle.get_final().unwrap();
    join.join().unwrap();
    assert!(start.elapsed() < Duration::from_secs(30), "cancellation should stop the run well before a million epochs");
}

#[test]
fn panicking_gradient_on_some_walkers_does_not_abort_the_run() {
    // The gradient panics for any x with x[0] > 4.0; some LHS/random
    // starts will land past that threshold, some won't. The executor's
    // per-task catch_unwind must turn those into dropped results, not a
    // failed run.
    let bounds = Bounds::from_pairs(&[(-5.0, 5.0), (-5.0, 5.0)]).unwrap();
    let problem = Problem::new(
        bounds.clone(),
        |x: &Array1<f64>, _: &()| x[0] * x[0] + x[1] * x[1],
        |x: &Array1<f64>, _: &()| {
            assert!(x[0] <= 4.0, "simulated failure for walkers that wander too far right");
            Array1::from_vec(vec![2.0 * x[0], 2.0 * x[1]])
        },
        (),
    );
    let config = HgdlConfigBuilder::new()
        .num_epochs(4)
        .number_of_walkers(24)
        .local_max_iter(20)
        .global_optimizer(GlobalMethod::Random)
        .build(&bounds)
        .unwrap();
    let handle = Handle::optimize(problem, config, vec![Array1::from_vec(vec![-2.0, -2.0])]).unwrap();
    let store = handle.get_final().unwrap();
    assert!(!store.is_empty(), "surviving (non-panicking) walkers should still have found the minimum");
    assert!(store.records()[0].f_val < 1e-3);
}

#[test]
fn an_ordered_sequence_of_starts_symmetric_about_the_origin_is_honored() {
    // W = 8 walkers, only 4 explicit starts supplied: the rest are padded
    // with uniform draws, and the supplied ones keep their positions.
    let bounds = Bounds::from_pairs(&[(-5.0, 5.0), (-5.0, 5.0)]).unwrap();
    let problem = Problem::new(
        bounds.clone(),
        |x: &Array1<f64>, _: &()| x[0] * x[0] + x[1] * x[1],
        |x: &Array1<f64>, _: &()| Array1::from_vec(vec![2.0 * x[0], 2.0 * x[1]]),
        (),
    );
    let config = HgdlConfigBuilder::new()
        .num_epochs(6)
        .number_of_walkers(8)
        .local_max_iter(25)
        .build(&bounds)
        .unwrap();
    let starts = vec![
        Array1::from_vec(vec![3.0, 3.0]),
        Array1::from_vec(vec![-3.0, 3.0]),
        Array1::from_vec(vec![3.0, -3.0]),
        Array1::from_vec(vec![-3.0, -3.0]),
    ];
    let handle = Handle::optimize(problem, config, starts).unwrap();
    let store = handle.get_final().unwrap();
    assert!(!store.is_empty());
    assert!(store.records()[0].f_val < 1e-6);
}

#[test]
fn equality_constrained_minimum_matches_the_analytic_lagrangian_solution() {
    // minimize x^2 + y^2 subject to x + y == 1; analytic solution (0.5, 0.5).
    let bounds = Bounds::from_pairs(&[(-10.0, 10.0), (-10.0, 10.0)]).unwrap();
    let problem = Problem::new(
        bounds,
        |x: &Array1<f64>, _: &()| x[0] * x[0] + x[1] * x[1],
        |x: &Array1<f64>, _: &()| Array1::from_vec(vec![2.0 * x[0], 2.0 * x[1]]),
        (),
    );
    let constraint = Constraint::equality(
        1.0,
        |x: &Array1<f64>| x[0] + x[1],
        |x: &Array1<f64>| Array1::from_vec(vec![1.0; x.len()]),
    );
    let lifted = lift(problem, vec![constraint]);
    let lifted_bounds = lifted.bounds.clone();

    let config = HgdlConfigBuilder::new()
        .num_epochs(10)
        .number_of_walkers(20)
        .local_max_iter(40)
        .global_optimizer(GlobalMethod::Genetic)
        .build(&lifted_bounds)
        .unwrap();
    let x0 = Array1::from_vec(vec![2.0, 2.0, 0.0]);
    let handle = Handle::optimize(lifted, config, vec![x0]).unwrap();
    let store = handle.get_final().unwrap();
    assert!(!store.is_empty());
    let best = &store.records()[0];
    assert!((best.x[0] - 0.5).abs() < 1e-1, "x should settle near 0.5, got {}", best.x[0]);
    assert!((best.x[1] - 0.5).abs() < 1e-1, "y should settle near 0.5, got {}", best.x[1]);
}
