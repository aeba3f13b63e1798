//! Reference backend: sparse state-vector evolution.
//!
//! Only basis states with non-negligible amplitude are stored. Checker
//! circuits permute basis states and keep ancillas at zero between rounds,
//! so the support stays at most `2^k` for `k` superposed qubits regardless
//! of how many ancillas the circuit uses.

use super::{BackendError, ExecutionBackend, ExecutionMode, Measurement};
use crate::circuit::{Circuit, Gate, Qubit};
use num_complex::Complex64;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::f64::consts::FRAC_1_SQRT_2;
use tracing::debug;

/// Basis states are packed into a u128.
const MAX_QUBITS: usize = 128;
/// Squared magnitudes below this are treated as exact cancellation.
const PRUNE_NORM: f64 = 1e-24;

pub struct SparseStatevector {
    seed: u64,
}

impl Default for SparseStatevector {
    fn default() -> Self {
        Self::new()
    }
}

impl SparseStatevector {
    pub fn new() -> Self {
        Self { seed: 0 }
    }

    /// Seed for shot sampling.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// Evolve the all-zero state and return per-outcome probabilities.
    pub fn probabilities(
        &self,
        circuit: &Circuit,
        measured: &[Qubit],
    ) -> Result<BTreeMap<u64, f64>, BackendError> {
        validate(circuit, measured)?;
        let mut state = State::zero();
        for gate in circuit.gates() {
            state.apply(gate);
        }
        debug!(
            gates = circuit.len(),
            support = state.amps.len(),
            "statevector evolved"
        );
        Ok(state.marginal(measured))
    }
}

impl ExecutionBackend for SparseStatevector {
    fn name(&self) -> &str {
        "sparse-statevector"
    }

    fn max_qubits(&self) -> usize {
        MAX_QUBITS
    }

    fn execute(
        &self,
        circuit: &Circuit,
        measured: &[Qubit],
        mode: ExecutionMode,
    ) -> Result<Measurement, BackendError> {
        let probs = self.probabilities(circuit, measured)?;
        match mode {
            ExecutionMode::Exact => Ok(Measurement::Exact(probs)),
            ExecutionMode::Shots(0) => Err(BackendError::NoShots),
            ExecutionMode::Shots(shots) => {
                let outcomes: Vec<u64> = probs.keys().copied().collect();
                let dist = WeightedIndex::new(probs.values())
                    .map_err(|e| BackendError::Simulation(e.to_string()))?;
                let mut rng = StdRng::seed_from_u64(self.seed);
                let mut counts = BTreeMap::new();
                for _ in 0..shots {
                    *counts.entry(outcomes[dist.sample(&mut rng)]).or_insert(0) += 1;
                }
                Ok(Measurement::Counts { counts, shots })
            }
        }
    }
}

fn validate(circuit: &Circuit, measured: &[Qubit]) -> Result<(), BackendError> {
    let num_qubits = circuit.num_qubits();
    if num_qubits > MAX_QUBITS {
        return Err(BackendError::TooManyQubits {
            required: num_qubits,
            available: MAX_QUBITS,
        });
    }
    if measured.len() > 64 {
        return Err(BackendError::TooManyMeasured(measured.len()));
    }
    let touched = circuit.gates().iter().flat_map(|g| g.qubits());
    if let Some(qubit) = measured.iter().copied().chain(touched).find(|&q| q >= num_qubits) {
        return Err(BackendError::InvalidQubit { qubit, num_qubits });
    }
    Ok(())
}

#[inline]
fn mask(qubits: &[Qubit]) -> u128 {
    qubits.iter().fold(0, |m, &q| m | 1u128 << q)
}

struct State {
    amps: FxHashMap<u128, Complex64>,
}

impl State {
    fn zero() -> Self {
        let mut amps = FxHashMap::default();
        amps.insert(0, Complex64::new(1.0, 0.0));
        Self { amps }
    }

    fn apply(&mut self, gate: &Gate) {
        match gate {
            Gate::X(q) => self.permute(0, 1u128 << q),
            Gate::Cx { control, target } => self.permute(1u128 << control, 1u128 << target),
            Gate::Ccx { controls, target } => self.permute(mask(controls), 1u128 << target),
            Gate::Mcx { controls, target } => self.permute(mask(controls), 1u128 << target),
            Gate::Z(q) => self.phase_flip(1u128 << q),
            Gate::Mcz { controls, target } => self.phase_flip(mask(controls) | 1u128 << target),
            Gate::H(q) => self.hadamard(1u128 << q),
        }
    }

    /// Flip `target` on every basis state where all `controls` bits are set.
    fn permute(&mut self, controls: u128, target: u128) {
        self.amps = self
            .amps
            .drain()
            .map(|(k, a)| {
                if k & controls == controls {
                    (k ^ target, a)
                } else {
                    (k, a)
                }
            })
            .collect();
    }

    fn phase_flip(&mut self, bits: u128) {
        for (k, a) in self.amps.iter_mut() {
            if k & bits == bits {
                *a = -*a;
            }
        }
    }

    fn hadamard(&mut self, bit: u128) {
        let mut next: FxHashMap<u128, Complex64> =
            FxHashMap::with_capacity_and_hasher(self.amps.len() * 2, Default::default());
        for (k, a) in self.amps.drain() {
            let a = a * FRAC_1_SQRT_2;
            let sign = if k & bit == 0 { 1.0 } else { -1.0 };
            *next.entry(k & !bit).or_default() += a;
            *next.entry(k | bit).or_default() += a * sign;
        }
        next.retain(|_, a| a.norm_sqr() > PRUNE_NORM);
        self.amps = next;
    }

    fn marginal(&self, measured: &[Qubit]) -> BTreeMap<u64, f64> {
        let mut probs = BTreeMap::new();
        for (k, a) in &self.amps {
            let outcome = measured
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, &q)| acc | ((k >> q & 1) as u64) << i);
            *probs.entry(outcome).or_insert(0.0) += a.norm_sqr();
        }
        probs
    }
}
