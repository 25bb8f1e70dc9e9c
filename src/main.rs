use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use track_matrix_rs::filters::{KalmanPredictor, TrackState};
use track_matrix_rs::linalg::inverse;
use track_matrix_rs::regression::{fit, BatchFitter, BatchReport};
use track_matrix_rs::types::{Observation, PLANE_COEFFS, PLANE_COLS};
use track_matrix_rs::{EngineConfig, Matrix};

#[derive(Parser, Debug)]
#[command(name = "track_matrix")]
#[command(about = "Dense matrix engine: inversion, constant-rate Kalman tracking, least-squares fits", long_about = None)]
struct Args {
    /// Engine configuration (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Invert a square matrix: {"rows", "cols", "data"}
    Invert { file: PathBuf },
    /// Run the tracker over observations: {"state"?, "observations": [{"z", "dt"}]}
    Track { file: PathBuf },
    /// Least-squares fit: {"x": [[..], ..], "y": [..]}
    Fit { file: PathBuf },
    /// Plane fit per point-set: {"sets": [[[x, y, z], ..], ..]}
    BatchFit { file: PathBuf },
}

#[derive(Deserialize)]
struct TrackInput {
    state: Option<TrackState>,
    observations: Vec<Observation>,
}

#[derive(Serialize)]
struct TrackOutput {
    steps: Vec<TrackState>,
    final_state: TrackState,
}

#[derive(Deserialize)]
struct FitInput {
    x: Vec<Vec<f32>>,
    y: Vec<f32>,
}

#[derive(Deserialize)]
struct BatchInput {
    sets: Vec<Vec<[f32; PLANE_COLS]>>,
}

#[derive(Serialize)]
struct BatchOutput {
    coefficients: Vec<[f32; PLANE_COEFFS]>,
    report: BatchReport,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    log::debug!("config: {:?}", config);

    match &args.command {
        Command::Invert { file } => run_invert(file, args.json),
        Command::Track { file } => run_track(file, &config, args.json),
        Command::Fit { file } => run_fit(file, args.json),
        Command::BatchFit { file } => run_batch_fit(file, &config, args.json),
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn run_invert(file: &Path, json: bool) -> Result<()> {
    let m: Matrix = read_json(file)?;
    match inverse(&m)? {
        Some(inv) if json => println!("{}", serde_json::to_string_pretty(&inv)?),
        Some(inv) => print!("{}", inv),
        None => bail!("matrix in {} is singular", file.display()),
    }
    Ok(())
}

fn run_track(file: &Path, config: &EngineConfig, json: bool) -> Result<()> {
    let input: TrackInput = read_json(file)?;
    let predictor = KalmanPredictor::new(config.kalman.clone())?;
    let mut state = match input.state {
        Some(state) => {
            state.validate()?;
            state
        }
        None => TrackState::new(0.0, 0.0, 0.0, 1.0)?,
    };

    log::info!("Tracking {} observations", input.observations.len());
    let mut steps = Vec::with_capacity(input.observations.len());
    for (i, obs) in input.observations.iter().enumerate() {
        predictor
            .step(&mut state, obs)
            .with_context(|| format!("observation {}", i))?;
        steps.push(state.clone());
    }

    if json {
        let output = TrackOutput {
            steps,
            final_state: state,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for (i, step) in steps.iter().enumerate() {
        let (x, y) = step.position();
        println!(
            "{:4}  x={:10.3}  y={:10.3}  rate={:8.3}  trace(P)={:8.3}",
            i,
            x,
            y,
            step.rate(),
            step.covariance_trace()?
        );
    }
    println!("Final covariance:");
    print!("{}", state.p);
    Ok(())
}

fn run_fit(file: &Path, json: bool) -> Result<()> {
    let input: FitInput = read_json(file)?;
    let n = input.x.len();
    let k = input.x.first().map_or(0, Vec::len);
    if input.x.iter().any(|row| row.len() != k) {
        bail!("rows of x must all have {} columns", k);
    }
    let flat: Vec<f32> = input.x.into_iter().flatten().collect();
    let mut w = vec![0.0f32; k];
    fit(&flat, [n, k], &input.y, [input.y.len(), 1], &mut w)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&w)?);
    } else {
        let coeffs: Vec<String> = w.iter().map(|v| format!("{:.6}", v)).collect();
        println!("w = [{}]", coeffs.join(", "));
    }
    Ok(())
}

fn run_batch_fit(file: &Path, config: &EngineConfig, json: bool) -> Result<()> {
    let input: BatchInput = read_json(file)?;
    let fitter = BatchFitter::new(config.batch.clone())?;
    let (points, shape) = pad_sets(&input.sets);

    let mut m = vec![0.0f32; shape[0] * PLANE_COEFFS];
    let report = fitter.fit(&points, shape, &mut m)?;
    log::info!(
        "Fitted {} of {} point-sets ({} degenerate, {} singular)",
        report.fitted.len(),
        report.total(),
        report.degenerate.len(),
        report.singular.len()
    );

    let coefficients: Vec<[f32; PLANE_COEFFS]> = m
        .chunks_exact(PLANE_COEFFS)
        .map(|c| [c[0], c[1], c[2]])
        .collect();
    if json {
        let output = BatchOutput { coefficients, report };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (i, c) in coefficients.iter().enumerate() {
            println!("{:4}  a={:10.4}  b={:10.4}  c={:10.4}", i, c[0], c[1], c[2]);
        }
    }
    Ok(())
}

/// Flatten ragged point-sets into `[count, rows, 3]`, padding with empty
/// (all-zero) slots.
fn pad_sets(sets: &[Vec<[f32; PLANE_COLS]>]) -> (Vec<f32>, [usize; 3]) {
    let rows = sets.iter().map(Vec::len).max().unwrap_or(0);
    let mut points = Vec::with_capacity(sets.len() * rows * PLANE_COLS);
    for set in sets {
        points.extend(set.iter().flatten());
        points.resize(points.len() + (rows - set.len()) * PLANE_COLS, 0.0);
    }
    (points, [sets.len(), rows, PLANE_COLS])
}
