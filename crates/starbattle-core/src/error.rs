//! Error types shared by every stage of the pipeline.

use crate::backend::BackendError;
use crate::distribution::Candidate;
use crate::grid::{GroupId, Position};
use std::time::Duration;
use thiserror::Error;

/// Result type for solver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a grid cannot be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Infeasibility {
    /// More confirmed stars than the group quota allows
    QuotaExceeded { stars: usize, quota: usize },
    /// No unknown cells left but the group still needs stars
    NoCellsLeft { target: usize },
    /// Fewer unknown cells than the stars still required
    NotEnoughCells { target: usize, unknown: usize },
    /// Two confirmed stars touch each other
    AdjacentStars { first: Position, second: Position },
}

impl std::fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded { stars, quota } => {
                write!(f, "{} confirmed stars exceed quota {}", stars, quota)
            }
            Self::NoCellsLeft { target } => {
                write!(f, "no unknown cells left but {} star(s) still required", target)
            }
            Self::NotEnoughCells { target, unknown } => write!(
                f,
                "{} star(s) required but only {} unknown cell(s) remain",
                target, unknown
            ),
            Self::AdjacentStars { first, second } => {
                write!(f, "confirmed stars at {} and {} are adjacent", first, second)
            }
        }
    }
}

/// What is wrong with a region matrix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionMapError {
    #[error("grid has no rows")]
    NoRows,

    #[error("row {row} has {len} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        len: usize,
        expected: usize,
    },

    #[error("cell {position} has region id {id}, expected 0..{size}")]
    RegionOutOfRange {
        position: Position,
        id: usize,
        size: usize,
    },

    #[error("region {region} has no cells ({size} regions required)")]
    MissingRegion { region: usize, size: usize },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid region map: {0}")]
    InvalidRegionMap(#[from] RegionMapError),

    #[error("cell {position} is outside the {size}x{size} grid")]
    CellOutOfBounds { position: Position, size: usize },

    #[error("infeasible puzzle in {group}: {reason}")]
    InfeasiblePuzzle { group: GroupId, reason: Infeasibility },

    #[error(
        "malformed constraint #{predicate}: bad reference to variable {variable} ({num_variables} variables)"
    )]
    MalformedConstraint {
        predicate: usize,
        variable: usize,
        num_variables: usize,
    },

    #[error("circuit needs {required} qubits but only {available} are available")]
    ResourceExceeded { required: usize, available: usize },

    #[error("execution backend did not respond within {elapsed:?}")]
    ExecutionTimeout { elapsed: Duration },

    #[error("execution backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("solution estimate {solutions} is outside 1..={search_space}")]
    InvalidSolutionEstimate { solutions: u64, search_space: u64 },

    #[error(
        "measurement did not concentrate: best candidate has probability {best:.4} (threshold {threshold:.4})"
    )]
    LowConfidenceResult {
        best: f64,
        threshold: f64,
        candidates: Vec<Candidate>,
    },

    #[error("invalid {field}: {reason}")]
    Config { field: &'static str, reason: String },
}

impl Error {
    /// Whether the caller may reasonably issue a fresh request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ExecutionTimeout { .. })
    }

    /// Candidates surfaced by an inconclusive measurement, if any.
    pub fn candidates(&self) -> Option<&[Candidate]> {
        match self {
            Error::LowConfidenceResult { candidates, .. } => Some(candidates),
            _ => None,
        }
    }
}
