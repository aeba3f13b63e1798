//! Measurement results over the variable qubits.

use crate::backend::Measurement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Expand an outcome into per-variable booleans (bit i = variable i).
pub fn assignment_from_bits(bits: u64, num_variables: usize) -> Vec<bool> {
    (0..num_variables).map(|i| bits >> i & 1 == 1).collect()
}

/// Render an outcome with variable `k-1` leftmost and variable 0 rightmost.
pub fn bitstring(bits: u64, num_variables: usize) -> String {
    (0..num_variables)
        .rev()
        .map(|i| if bits >> i & 1 == 1 { '1' } else { '0' })
        .collect()
}

/// One measured outcome and its probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub bits: u64,
    pub probability: f64,
}

impl Candidate {
    /// Variable indices set to true
    pub fn star_variables(&self) -> Vec<usize> {
        (0..64).filter(|i| self.bits >> i & 1 == 1).collect()
    }
}

/// Outcome probabilities over all `2^k` assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDistribution {
    num_variables: usize,
    probabilities: BTreeMap<u64, f64>,
    /// Set when the distribution is an empirical frequency table
    shots: Option<u64>,
}

impl ResultDistribution {
    pub fn exact(num_variables: usize, probabilities: BTreeMap<u64, f64>) -> Self {
        Self {
            num_variables,
            probabilities,
            shots: None,
        }
    }

    /// Normalize either exact probabilities or shot counts.
    pub fn from_measurement(num_variables: usize, measurement: Measurement) -> Self {
        match measurement {
            Measurement::Exact(probabilities) => Self::exact(num_variables, probabilities),
            Measurement::Counts { counts, shots } => {
                let total = shots.max(1) as f64;
                Self {
                    num_variables,
                    probabilities: counts
                        .into_iter()
                        .map(|(bits, n)| (bits, n as f64 / total))
                        .collect(),
                    shots: Some(shots),
                }
            }
        }
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn shots(&self) -> Option<u64> {
        self.shots
    }

    pub fn probabilities(&self) -> &BTreeMap<u64, f64> {
        &self.probabilities
    }

    pub fn probability(&self, bits: u64) -> f64 {
        self.probabilities.get(&bits).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.probabilities.values().sum()
    }

    /// Outcomes by descending probability, ties by ascending bits.
    pub fn top(&self, n: usize) -> Vec<Candidate> {
        let mut all: Vec<Candidate> = self
            .probabilities
            .iter()
            .map(|(&bits, &probability)| Candidate { bits, probability })
            .collect();
        all.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then(a.bits.cmp(&b.bits))
        });
        all.truncate(n);
        all
    }

    pub fn most_likely(&self) -> Option<Candidate> {
        self.top(1).into_iter().next()
    }
}
