//! geodesic: extract a geodesic path between two mesh vertices.
//!
//! Loads a triangle mesh from OBJ, solves the heat-method distance field
//! from the source vertex, traces the steepest-descent path to the
//! target, and writes the polyline as a JSON artifact.
//!
//! # Logging
//!
//! Set `RUST_LOG` (or pass `-v`/`-vv`/`-vvv`) to control log output:
//! - `RUST_LOG=mesh_geodesic=info` - operation summaries
//! - `RUST_LOG=mesh_geodesic=debug` - per-stage detail
//! - `RUST_LOG=mesh_geodesic::timing=debug` - performance timing
//!
//! # Example
//!
//! ```bash
//! RUST_LOG=mesh_geodesic=info geodesic bunny.obj 12 3870 path.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mesh_geodesic::tracing_ext::log_field_stats;
use mesh_geodesic::{GeodesicError, HeatGeodesicSolver, SolverParams, TraceOutcome};

mod obj;

/// geodesic - compute a geodesic path on a triangle mesh.
///
/// Solves the heat-method distance field from SOURCE and traces the
/// steepest-descent polyline to TARGET. Vertex indices are zero-based
/// indices into the OBJ vertex list.
#[derive(Parser)]
#[command(name = "geodesic")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input mesh file (OBJ)
    mesh: PathBuf,

    /// Source vertex index
    source: usize,

    /// Target vertex index
    target: usize,

    /// Output JSON file
    #[arg(default_value = "geodesic_path.json")]
    output: PathBuf,

    /// Vertex welding tolerance
    #[arg(long, default_value_t = mesh_geodesic::DEFAULT_WELD_EPSILON)]
    weld_epsilon: f64,

    /// Multiplier on mean-edge-length squared for the diffusion time
    #[arg(long, default_value_t = 1.0)]
    time_scale: f64,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct PathPoint {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Serialize)]
struct PathArtifact {
    path: Vec<PathPoint>,
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "mesh_geodesic=info",
            2 => "mesh_geodesic=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn run(cli: &Cli) -> Result<PathArtifact> {
    let mesh = obj::load(&cli.mesh)?;

    let params = SolverParams {
        time_scale: cli.time_scale,
        weld_epsilon: cli.weld_epsilon,
    };
    let solver = HeatGeodesicSolver::with_params(&mesh.positions, &mesh.indices, &params)?;

    let source = solver
        .merged_index(cli.source)
        .ok_or_else(|| anyhow!("source vertex {} out of range", cli.source))?;
    let target = solver
        .merged_index(cli.target)
        .ok_or_else(|| anyhow!("target vertex {} out of range", cli.target))?;

    let distances = solver.compute_distance(&[source])?;
    log_field_stats(&distances, "cli");

    let path = solver.trace_path(&distances, source, target)?;

    if !cli.quiet {
        println!("{} Heat method geodesic computed.", "✓".green());
        println!("  {}: {:.6}", "Distance at target".cyan(), path.length);
        println!("  {}: {}", "Path vertices".cyan(), path.vertices.len());
        if path.outcome == TraceOutcome::Stalled {
            eprintln!(
                "{}: descent stalled before reaching the source; the path is a best-effort prefix",
                "Warning".yellow()
            );
        }
    }

    Ok(PathArtifact {
        path: path
            .polyline
            .iter()
            .map(|p| PathPoint {
                x: p.x,
                y: p.y,
                z: p.z,
            })
            .collect(),
    })
}

fn write_artifact(artifact: &PathArtifact, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(artifact)?;
    std::fs::write(output, json)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = run(&cli).and_then(|artifact| {
        write_artifact(&artifact, &cli.output)?;
        if !cli.quiet {
            println!("  {}: {}", "Path written to".cyan(), cli.output.display());
        }
        Ok(())
    });

    if let Err(e) = result {
        if let Some(geo_err) = e.downcast_ref::<GeodesicError>() {
            eprintln!("{}: {}", "Error".red().bold(), geo_err);
            eprintln!("  {}: {}", "Code".cyan(), geo_err.code());
            eprintln!(
                "  {}: {}",
                "Suggestion".green(),
                geo_err.recovery_suggestion()
            );
        } else {
            eprintln!("{}: {}", "Error".red().bold(), e);
            for cause in e.chain().skip(1) {
                eprintln!("  {}: {}", "Caused by".yellow(), cause);
            }
        }
        std::process::exit(1);
    }
}
