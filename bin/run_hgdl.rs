//! Demo CLI driving the HGDL engine against a handful of standard test
//! functions. Mirrors the shape of `src-de`'s own `plot_functions`
//! binary: a `clap`-derived `Args` struct, a small registry of named
//! objective functions, and `ctrlc` wired to cooperative cancellation.

use std::f64::consts::PI;
use std::sync::Arc;

use clap::Parser;
use ndarray::Array1;

use hgdl::{Bounds, GlobalMethod, Handle, HgdlConfigBuilder, LocalMethod};

/// Run the HGDL global optimizer against a named test function.
#[derive(Parser, Debug)]
#[command(name = "run_hgdl")]
#[command(about = "Find many stationary points of a test function with HGDL")]
struct Args {
    /// Test function to search: sphere, rastrigin, or styblinski_tang.
    #[arg(short, long, default_value = "rastrigin")]
    function: String,

    /// Problem dimension.
    #[arg(short, long, default_value_t = 2)]
    dim: usize,

    /// Number of epochs to run before stopping.
    #[arg(short, long, default_value_t = 50)]
    epochs: usize,

    /// Number of parallel local searches per epoch.
    #[arg(short, long, default_value_t = 20)]
    walkers: usize,

    /// Local optimizer: dNewton, L-BFGS-B, BFGS, CG, or Newton-CG.
    #[arg(long, default_value = "dNewton")]
    local_optimizer: String,

    /// Global reseeding strategy: random, gauss, or genetic.
    #[arg(long, default_value = "genetic")]
    global_optimizer: String,

    /// How many optima to keep in the store.
    #[arg(long, default_value_t = 50)]
    number_of_optima: usize,

    /// Print per-epoch progress to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn sphere(x: &Array1<f64>, _: &()) -> f64 {
    x.iter().map(|&xi| xi * xi).sum()
}

fn sphere_grad(x: &Array1<f64>, _: &()) -> Array1<f64> {
    x.mapv(|xi| 2.0 * xi)
}

fn rastrigin(x: &Array1<f64>, _: &()) -> f64 {
    10.0 * x.len() as f64 + x.iter().map(|&xi| xi * xi - 10.0 * (2.0 * PI * xi).cos()).sum::<f64>()
}

fn rastrigin_grad(x: &Array1<f64>, _: &()) -> Array1<f64> {
    x.mapv(|xi| 2.0 * xi + 20.0 * PI * (2.0 * PI * xi).sin())
}

fn styblinski_tang(x: &Array1<f64>, _: &()) -> f64 {
    x.iter().map(|&xi| xi.powi(4) - 16.0 * xi.powi(2) + 5.0 * xi).sum::<f64>() / 2.0
}

fn styblinski_tang_grad(x: &Array1<f64>, _: &()) -> Array1<f64> {
    x.mapv(|xi| (4.0 * xi.powi(3) - 32.0 * xi + 5.0) / 2.0)
}

fn main() {
    let args = Args::parse();

    let (f, grad, bounds_pair): (fn(&Array1<f64>, &()) -> f64, fn(&Array1<f64>, &()) -> Array1<f64>, (f64, f64)) =
        match args.function.as_str() {
            "sphere" => (sphere, sphere_grad, (-5.0, 5.0)),
            "rastrigin" => (rastrigin, rastrigin_grad, (-5.12, 5.12)),
            "styblinski_tang" => (styblinski_tang, styblinski_tang_grad, (-5.0, 5.0)),
            other => {
                eprintln!("unknown function '{other}', expected sphere, rastrigin, or styblinski_tang");
                std::process::exit(1);
            }
        };

    let bounds = Bounds::from_pairs(&vec![bounds_pair; args.dim]).expect("valid bounds");
    let local_optimizer: LocalMethod<()> = LocalMethod::from_name(&args.local_optimizer).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });
    let global_optimizer = GlobalMethod::from_name(&args.global_optimizer).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });

    let config = HgdlConfigBuilder::new()
        .num_epochs(args.epochs)
        .number_of_walkers(args.walkers)
        .local_optimizer(local_optimizer)
        .global_optimizer(global_optimizer)
        .number_of_optima(args.number_of_optima)
        .verbose(args.verbose)
        .build(&bounds)
        .unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(1);
        });

    let problem = hgdl::Problem::new(bounds.clone(), f, grad, ());
    let mut rng = rand::rng();
    let x0 = bounds.sample_uniform(&mut rng);

    let handle = Handle::optimize(problem, config, vec![x0]).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1);
    });

    let handle = Arc::new(handle);
    {
        let handle = handle.clone();
        ctrlc::set_handler(move || handle.cancel()).expect("failed to install Ctrl-C handler");
    }

    let store = handle.get_final().expect("coordinator thread should not panic");
    println!("found {} stationary point(s):", store.len());
    for record in store.iter().take(20) {
        println!(
            "  f={:.6} classifier={:?} x={:?}",
            record.f_val, record.classifier, record.x.as_slice().unwrap_or(&[])
        );
    }
}
