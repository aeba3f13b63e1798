//! Star Battle solving by amplitude amplification.
//!
//! A partially filled grid is reduced to boolean variables over its unknown
//! cells and a set of counting and exclusion predicates. The predicates are
//! compiled into a reversible checker circuit, wrapped into an amplification
//! oracle and handed to an [`ExecutionBackend`] for a single measurement.
//!
//! ```no_run
//! use starbattle_core::{Grid, SolverConfig, StarBattleSolver};
//!
//! let mut grid = Grid::new(&[
//!     vec![0, 0, 0, 0, 1],
//!     vec![0, 0, 0, 1, 1],
//!     vec![2, 2, 0, 3, 3],
//!     vec![2, 2, 2, 3, 4],
//!     vec![2, 2, 4, 4, 4],
//! ])?;
//! grid.place_star((4, 2).into())?;
//! grid.place_star((2, 3).into())?;
//!
//! let report = StarBattleSolver::new(SolverConfig::default())?.solve(&grid)?;
//! println!("stars: {:?}", report.stars);
//! # Ok::<(), starbattle_core::Error>(())
//! ```

pub mod backend;
pub mod circuit;
pub mod config;
pub mod constraints;
pub mod distribution;
pub mod driver;
pub mod error;
pub mod grid;
pub mod solver;


pub use backend::{BackendError, ExecutionBackend, ExecutionMode, Measurement, SparseStatevector};
pub use circuit::{CheckerCircuit, CheckerCircuitBuilder, Circuit, CombineStrategy, Gate, Qubit};
pub use config::SolverConfig;
pub use constraints::{ConstraintExtractor, ConstraintSet, Predicate, Variable};
pub use distribution::{Candidate, ResultDistribution};
pub use driver::{AmplificationDriver, AmplificationPlan, DriverConfig, IterationSchedule};
pub use error::{Error, Infeasibility, RegionMapError, Result};
pub use grid::{CellStatus, Grid, GroupId, Position, PuzzleInput};
pub use solver::{CompiledPuzzle, SolveReport, StarBattleSolver};
