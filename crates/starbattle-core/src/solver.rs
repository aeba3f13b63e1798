//! End-to-end pipeline: grid → constraints → checker → amplification →
//! decoded star placement.

use crate::backend::{ExecutionBackend, SparseStatevector};
use crate::circuit::{CheckerCircuit, CheckerCircuitBuilder};
use crate::config::SolverConfig;
use crate::constraints::{ConstraintExtractor, ConstraintSet, Variable};
use crate::distribution::{assignment_from_bits, Candidate, ResultDistribution};
use crate::driver::{AmplificationDriver, AmplificationPlan, CircuitStats};
use crate::error::Result;
use crate::grid::{Grid, Position, PuzzleInput};
use std::sync::Arc;
use tracing::info;

/// Everything needed before the backend is involved.
#[derive(Debug, Clone)]
pub struct CompiledPuzzle {
    /// Grid after optional classical elimination
    pub grid: Grid,
    /// Cells marked empty by elimination
    pub eliminated: usize,
    pub constraints: ConstraintSet,
    pub checker: CheckerCircuit,
}

/// Decoded result of one solve.
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub grid: Grid,
    pub eliminated: usize,
    pub variables: Vec<Variable>,
    /// Variables set to true in the decoded assignment
    pub star_variables: Vec<usize>,
    /// Cells of `star_variables`
    pub new_stars: Vec<Position>,
    /// Confirmed and decoded stars, sorted
    pub stars: Vec<Position>,
    pub best: Candidate,
    pub distribution: ResultDistribution,
    pub plan: AmplificationPlan,
    pub stats: CircuitStats,
    pub backend: String,
    /// The decoded assignment satisfies every predicate and completes a
    /// valid placement
    pub verified: bool,
}

pub struct StarBattleSolver {
    config: SolverConfig,
    backend: Arc<dyn ExecutionBackend>,
}

impl StarBattleSolver {
    /// Solver on the reference sparse state-vector backend.
    pub fn new(config: SolverConfig) -> Result<Self> {
        let backend = Arc::new(SparseStatevector::with_seed(config.seed));
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: SolverConfig, backend: Arc<dyn ExecutionBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Eliminate, extract and build the checker. Infeasible grids fail here.
    pub fn compile(&self, grid: &Grid) -> Result<CompiledPuzzle> {
        let mut grid = grid.clone();
        let eliminated = if self.config.eliminate {
            grid.eliminate()
        } else {
            0
        };
        let constraints = ConstraintExtractor::new().extract(&grid)?;

        let mut builder = CheckerCircuitBuilder::new().with_combine(self.config.combine);
        if let Some(limit) = self.config.qubit_limit {
            builder = builder.with_qubit_limit(limit);
        }
        let checker = builder.build(&constraints)?;
        Ok(CompiledPuzzle {
            grid,
            eliminated,
            constraints,
            checker,
        })
    }

    pub fn solve(&self, grid: &Grid) -> Result<SolveReport> {
        self.solve_compiled(self.compile(grid)?)
    }

    /// Run the search on an already compiled puzzle.
    pub fn solve_compiled(&self, compiled: CompiledPuzzle) -> Result<SolveReport> {
        let driver = AmplificationDriver::new(Arc::clone(&self.backend))
            .with_config(self.config.driver_config());
        let outcome = driver.run(&compiled.checker)?;

        let CompiledPuzzle {
            grid,
            eliminated,
            constraints,
            ..
        } = compiled;
        let k = constraints.num_variables();
        let assignment = assignment_from_bits(outcome.best.bits, k);
        let new_stars = constraints.star_cells(&assignment);
        let mut stars = grid.stars();
        stars.extend(&new_stars);
        stars.sort();
        let verified = constraints.evaluate(&assignment) && grid.is_valid_placement(&stars);
        info!(stars = stars.len(), verified, "solve finished");

        Ok(SolveReport {
            eliminated,
            variables: constraints.variables().to_vec(),
            star_variables: outcome.best.star_variables(),
            new_stars,
            stars,
            best: outcome.best,
            distribution: outcome.distribution,
            plan: outcome.plan,
            stats: outcome.stats,
            backend: driver.backend_name().to_string(),
            verified,
            grid,
        })
    }

    pub fn solve_input(&self, input: &PuzzleInput) -> Result<SolveReport> {
        self.solve(&Grid::from_input(input)?)
    }
}
