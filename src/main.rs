//! Divide a constant dividend by a sweep of divisors under encryption and
//! report the relative error of the encrypted and plaintext evaluations.

use std::error::Error;
use std::path::PathBuf;

use ckks_division::{
    error_records, reference_divide, write_csv_file, Bounds, Ckks, CkksParams, DivisionConfig,
    DivisionEvaluator, LeveledScheme,
};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Approximate x / y over CKKS and write a per-divisor error report")]
struct Args {
    /// Dividend, copied into every slot
    #[arg(long, default_value_t = 100.0)]
    x: f64,

    /// Upper bound of the operand domain [0, max]
    #[arg(long, default_value_t = 10000.0)]
    max: f64,

    /// Newton-Schulz iterations
    #[arg(long, default_value_t = 3)]
    iterations: usize,

    /// Ring degree is 2^log_degree
    #[arg(long, default_value_t = 14)]
    log_degree: u32,

    /// Number of distinct divisors; slots past this repeat the sweep
    #[arg(long, default_value_t = 1000)]
    samples: usize,

    /// Divisor i is (i + 1) * step
    #[arg(long, default_value_t = 10.0)]
    step: f64,

    /// Seed for key generation and encryption; entropy when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// CSV path, `x_equal_<x>.csv` by default
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(false)
        .init();

    let args = Args::parse();
    if args.samples == 0 {
        return Err("--samples must be at least 1".into());
    }
    if args.x == 0.0 {
        return Err("--x must be non-zero, relative errors are taken against x / y".into());
    }

    let params = CkksParams {
        log_degree: args.log_degree,
        ..CkksParams::demo()
    };
    info!(?params, "encryption parameters");

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let ckks = Ckks::generate_keys(params, &mut rng)?;

    let slots = ckks.slot_count();
    let samples = args.samples.min(slots);
    let x = vec![args.x; slots];
    let y: Vec<f64> = (0..slots)
        .map(|i| ((i % samples) + 1) as f64 * args.step)
        .collect();
    let largest = samples as f64 * args.step;
    if largest > args.max {
        warn!(largest, max = args.max, "divisors past max will not converge");
    }

    let config = DivisionConfig {
        bounds: Bounds::new(0.0, args.max)?,
        iterations: args.iterations,
    };
    let evaluator = DivisionEvaluator::new(&ckks, config)?;
    info!(budget = ?evaluator.budget(), chain = ckks.chain_length(), "level budget");

    let quotient = evaluator.divide(&x, &y, &mut rng)?;
    info!(
        level = ckks.current_level(&quotient),
        size = quotient.size(),
        scale = quotient.scale,
        "encrypted quotient"
    );

    let encrypted = ckks.decrypt_decode(&quotient)?;
    let reference = reference_divide(&x, &y, &config.bounds, args.iterations)?;
    let records = error_records(
        &x[..samples],
        &y[..samples],
        &reference[..samples],
        &encrypted[..samples],
    )?;

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("x_equal_{}.csv", args.x)));
    write_csv_file(&path, &records)?;
    info!(path = %path.display(), rows = records.len(), "wrote error report");
    Ok(())
}
