//! Gate-level circuit description.
//!
//! A circuit is an ordered list of immutable gate records. Every gate in the
//! set is an involution, so the inverse of a record is the record itself and
//! the inverse of a circuit is its records in reverse order.

mod arena;
mod checker;
mod tally;

pub use arena::AncillaArena;
pub use checker::{CheckerCircuit, CheckerCircuitBuilder, CheckerOutcome, CombineStrategy, QubitLayout};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Qubit index within a circuit
pub type Qubit = usize;

/// A single gate application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gate {
    /// Pauli X (NOT). Self-inverse.
    X(Qubit),
    /// Hadamard. Self-inverse.
    H(Qubit),
    /// Pauli Z (phase flip). Self-inverse.
    Z(Qubit),
    /// Controlled NOT. Self-inverse.
    Cx { control: Qubit, target: Qubit },
    /// Toffoli. Self-inverse.
    Ccx {
        controls: [Qubit; 2],
        target: Qubit,
    },
    /// NOT on `target` when every control is 1. Self-inverse.
    Mcx { controls: Vec<Qubit>, target: Qubit },
    /// Phase flip when every control and `target` are 1. Self-inverse;
    /// with no controls it is a plain Z.
    Mcz { controls: Vec<Qubit>, target: Qubit },
}

impl Gate {
    /// The inverse gate. Every gate in this set is its own inverse.
    pub fn inverse(&self) -> Gate {
        self.clone()
    }

    /// Short gate-type name used in statistics
    pub fn name(&self) -> &'static str {
        match self {
            Gate::X(_) => "X",
            Gate::H(_) => "H",
            Gate::Z(_) => "Z",
            Gate::Cx { .. } => "CX",
            Gate::Ccx { .. } => "CCX",
            Gate::Mcx { .. } => "MCX",
            Gate::Mcz { .. } => "MCZ",
        }
    }

    /// All qubits touched, controls first.
    pub fn qubits(&self) -> Vec<Qubit> {
        match self {
            Gate::X(q) | Gate::H(q) | Gate::Z(q) => vec![*q],
            Gate::Cx { control, target } => vec![*control, *target],
            Gate::Ccx { controls, target } => vec![controls[0], controls[1], *target],
            Gate::Mcx { controls, target } | Gate::Mcz { controls, target } => {
                let mut qs = controls.clone();
                qs.push(*target);
                qs
            }
        }
    }

    /// Apply a classical gate to a bit vector. Returns false (leaving the
    /// bits untouched) for H, Z and MCZ.
    pub fn apply_classical(&self, bits: &mut [bool]) -> bool {
        let (target, on) = match self {
            Gate::X(q) => (*q, true),
            Gate::Cx { control, target } => (*target, bits[*control]),
            Gate::Ccx { controls, target } => (*target, bits[controls[0]] && bits[controls[1]]),
            Gate::Mcx { controls, target } => (*target, controls.iter().all(|&c| bits[c])),
            Gate::H(_) | Gate::Z(_) | Gate::Mcz { .. } => return false,
        };
        if on {
            bits[target] = !bits[target];
        }
        true
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let qs: Vec<String> = self.qubits().iter().map(|q| q.to_string()).collect();
        write!(f, "{} {}", self.name(), qs.join(","))
    }
}

/// Ordered gate records over `num_qubits` qubits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    num_qubits: usize,
    gates: Vec<Gate>,
}

impl Circuit {
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            gates: Vec::new(),
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Widen the circuit. Used once the ancilla count is known.
    pub fn set_num_qubits(&mut self, num_qubits: usize) {
        self.num_qubits = self.num_qubits.max(num_qubits);
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn push(&mut self, gate: Gate) {
        self.gates.push(gate);
    }

    /// Append every gate of `other`.
    pub fn append(&mut self, other: &Circuit) {
        self.num_qubits = self.num_qubits.max(other.num_qubits);
        self.gates.extend_from_slice(&other.gates);
    }

    /// Append the inverse of `other`: its records reversed, each inverted.
    pub fn append_inverse(&mut self, other: &Circuit) {
        self.num_qubits = self.num_qubits.max(other.num_qubits);
        self.gates.extend(other.gates.iter().rev().map(Gate::inverse));
    }

    pub fn inverse(&self) -> Circuit {
        let mut inv = Circuit::new(self.num_qubits);
        inv.append_inverse(self);
        inv
    }

    /// Number of gates of each type
    pub fn gate_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for gate in &self.gates {
            *counts.entry(gate.name()).or_insert(0) += 1;
        }
        counts
    }

    /// Run a purely classical circuit on a basis state.
    ///
    /// Returns `None` if the circuit contains a non-classical gate.
    pub fn run_classical(&self, input: &[bool]) -> Option<Vec<bool>> {
        let mut bits = input.to_vec();
        bits.resize(self.num_qubits.max(bits.len()), false);
        for gate in &self.gates {
            if !gate.apply_classical(&mut bits) {
                return None;
            }
        }
        Some(bits)
    }
}
