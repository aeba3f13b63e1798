//! Terminal front end: load a puzzle, run the amplification solver and print
//! the grid, checker statistics and outcome distribution.

mod render;
mod theme;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use starbattle_core::{
    CombineStrategy, ExecutionMode, Grid, IterationSchedule, PuzzleInput, SolverConfig,
    StarBattleSolver,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use theme::Theme;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScheduleArg {
    Standard,
    Exact,
}

impl From<ScheduleArg> for IterationSchedule {
    fn from(arg: ScheduleArg) -> Self {
        match arg {
            ScheduleArg::Standard => IterationSchedule::Standard,
            ScheduleArg::Exact => IterationSchedule::Exact,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CombineArg {
    MultiControlled,
    ToffoliTree,
}

impl From<CombineArg> for CombineStrategy {
    fn from(arg: CombineArg) -> Self {
        match arg {
            CombineArg::MultiControlled => CombineStrategy::MultiControlled,
            CombineArg::ToffoliTree => CombineStrategy::ToffoliTree,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "starbattle", version)]
#[command(about = "Solve a Star Battle puzzle by amplitude amplification", long_about = None)]
struct Args {
    /// Puzzle file (JSON with `regions`, optional `stars` and `stars_per_group`)
    puzzle: PathBuf,

    /// Solver config file, defaults to <config dir>/starbattle/config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sample this many shots instead of reading exact probabilities
    #[arg(long)]
    shots: Option<u64>,

    /// Estimated number of solutions
    #[arg(short = 'm', long)]
    solutions: Option<u64>,

    #[arg(long, value_enum)]
    schedule: Option<ScheduleArg>,

    #[arg(long, value_enum)]
    combine: Option<CombineArg>,

    /// Minimum probability of the decoded assignment
    #[arg(long)]
    threshold: Option<f64>,

    /// Backend deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Refuse checker circuits wider than this
    #[arg(long)]
    qubit_limit: Option<usize>,

    /// Seed for shot sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Skip classical elimination
    #[arg(long)]
    no_eliminate: bool,

    /// Outcomes listed in the distribution table
    #[arg(long, default_value_t = 8)]
    top: usize,

    #[arg(long)]
    light: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Command-line flags win over the config file.
    fn apply(&self, config: &mut SolverConfig) {
        if let Some(shots) = self.shots {
            config.mode = ExecutionMode::Shots(shots);
        }
        if let Some(solutions) = self.solutions {
            config.solutions = solutions;
        }
        if let Some(schedule) = self.schedule {
            config.schedule = schedule.into();
        }
        if let Some(combine) = self.combine {
            config.combine = combine.into();
        }
        if let Some(threshold) = self.threshold {
            config.confidence_threshold = threshold;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = Some(timeout_ms);
        }
        if let Some(limit) = self.qubit_limit {
            config.qubit_limit = Some(limit);
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.no_eliminate {
            config.eliminate = false;
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("starbattle").join("config.json"))
}

fn load_config(path: Option<&Path>) -> Result<SolverConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(SolverConfig::default()),
        },
    };
    let json = fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&json)
        .with_context(|| format!("parsing config {}", path.display()))?;
    debug!(path = %path.display(), "config loaded");
    Ok(config)
}

fn load_puzzle(path: &Path) -> Result<Grid> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading puzzle {}", path.display()))?;
    let input: PuzzleInput = serde_json::from_str(&json)
        .with_context(|| format!("parsing puzzle {}", path.display()))?;
    Grid::from_input(&input).with_context(|| format!("loading puzzle {}", path.display()))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    let solver = StarBattleSolver::new(config)?;
    let grid = load_puzzle(&args.puzzle)?;
    info!(size = grid.size(), stars = grid.stars().len(), "puzzle loaded");

    let theme = if args.light {
        Theme::light()
    } else {
        Theme::dark()
    };
    let mut stdout = io::stdout();

    render::render_grid(&mut stdout, &theme, &grid, render::CellLabels::Open)?;
    let compiled = solver.compile(&grid)?;
    render::render_constraints(&mut stdout, &theme, &compiled)?;
    render::render_circuit(&mut stdout, &theme, &compiled)?;

    let num_variables = compiled.constraints.num_variables();
    match solver.solve_compiled(compiled) {
        Ok(report) => render::render_report(&mut stdout, &theme, &report, args.top)?,
        Err(err) => {
            if let Some(candidates) = err.candidates() {
                render::render_candidates(&mut stdout, &theme, candidates, num_variables)?;
            }
            stdout.flush()?;
            return Err(err.into());
        }
    }
    stdout.flush()?;
    Ok(())
}
