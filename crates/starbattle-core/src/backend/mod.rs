//! Execution backend boundary.
//!
//! A backend takes a gate-level circuit, evolves the all-zero state through
//! it and reports measurement statistics for a chosen set of qubits. The
//! driver never sees amplitudes, only the final distribution.

mod statevector;

pub use statevector::SparseStatevector;

use crate::circuit::{Circuit, Qubit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// How the backend should report results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Exact outcome probabilities
    #[default]
    Exact,
    /// Empirical frequencies from a finite number of shots
    Shots(u64),
}

/// Measurement statistics keyed by outcome, bit `i` of the key being the
/// value read from `measured[i]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    Exact(BTreeMap<u64, f64>),
    Counts { counts: BTreeMap<u64, u64>, shots: u64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("circuit uses {required} qubits but the backend supports {available}")]
    TooManyQubits { required: usize, available: usize },

    #[error("cannot pack {0} measured qubits into one outcome")]
    TooManyMeasured(usize),

    #[error("qubit {qubit} is outside the {num_qubits}-qubit circuit")]
    InvalidQubit { qubit: Qubit, num_qubits: usize },

    #[error("shot count must be positive")]
    NoShots,

    #[error("simulation failed: {0}")]
    Simulation(String),
}

/// Something that can run a circuit and measure it.
pub trait ExecutionBackend: Send + Sync {
    /// Backend name for display
    fn name(&self) -> &str;

    /// Widest circuit the backend accepts
    fn max_qubits(&self) -> usize;

    /// Run `circuit` from the all-zero state and measure `measured`.
    fn execute(
        &self,
        circuit: &Circuit,
        measured: &[Qubit],
        mode: ExecutionMode,
    ) -> Result<Measurement, BackendError>;
}
