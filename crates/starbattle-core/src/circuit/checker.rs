//! Checker circuit compilation.
//!
//! Layout: variable qubits `0..k`, the output qubit `k`, then the ancilla
//! arena. Each predicate is computed into its own result ancilla, the results
//! are ANDed into the output, and every predicate block is replayed inverted
//! in reverse order so all ancillas end at zero.

use super::arena::AncillaArena;
use super::tally::tally_equals;
use super::{Circuit, Gate, Qubit};
use crate::constraints::{ConstraintSet, Predicate};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, info};

/// How predicate results are ANDed into the output qubit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineStrategy {
    /// One multi-controlled X over every result ancilla
    #[default]
    MultiControlled,
    /// Pairwise Toffoli tree through extra ancillas, at most two controls
    /// per gate
    ToffoliTree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QubitLayout {
    pub num_variables: usize,
    pub output: Qubit,
    pub ancillas: Range<Qubit>,
}

impl QubitLayout {
    pub fn variables(&self) -> Range<Qubit> {
        0..self.num_variables
    }

    pub fn num_ancillas(&self) -> usize {
        self.ancillas.len()
    }

    pub fn total(&self) -> usize {
        self.num_variables + 1 + self.num_ancillas()
    }
}

/// Result of running the checker on one classical assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckerOutcome {
    pub output: bool,
    /// Every ancilla returned to zero
    pub ancillas_clean: bool,
    /// Variable qubits still hold the input assignment
    pub inputs_preserved: bool,
}

/// Compiled oracle body: flips the output iff every predicate holds.
#[derive(Debug, Clone)]
pub struct CheckerCircuit {
    circuit: Circuit,
    layout: QubitLayout,
    num_predicates: usize,
}

impl CheckerCircuit {
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn layout(&self) -> &QubitLayout {
        &self.layout
    }

    pub fn num_variables(&self) -> usize {
        self.layout.num_variables
    }

    pub fn num_qubits(&self) -> usize {
        self.layout.total()
    }

    pub fn num_predicates(&self) -> usize {
        self.num_predicates
    }

    pub fn gate_counts(&self) -> BTreeMap<&'static str, usize> {
        self.circuit.gate_counts()
    }

    /// Run the checker on a basis-state input with output and ancillas at
    /// zero. `None` unless `assignment` has one entry per variable.
    pub fn evaluate(&self, assignment: &[bool]) -> Option<CheckerOutcome> {
        let k = self.layout.num_variables;
        if assignment.len() != k {
            return None;
        }
        let mut bits = vec![false; self.num_qubits()];
        bits[..k].copy_from_slice(assignment);
        for gate in self.circuit.gates() {
            // the builder emits classical gates only
            gate.apply_classical(&mut bits);
        }
        Some(CheckerOutcome {
            output: bits[self.layout.output],
            ancillas_clean: self.layout.ancillas.clone().all(|q| !bits[q]),
            inputs_preserved: bits[..k] == *assignment,
        })
    }
}

/// Compiles a constraint set into a checker circuit.
#[derive(Debug, Clone)]
pub struct CheckerCircuitBuilder {
    qubit_limit: usize,
    combine: CombineStrategy,
}

impl Default for CheckerCircuitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckerCircuitBuilder {
    pub fn new() -> Self {
        Self {
            qubit_limit: usize::MAX,
            combine: CombineStrategy::default(),
        }
    }

    /// Refuse circuits wider than `limit` qubits.
    pub fn with_qubit_limit(mut self, limit: usize) -> Self {
        self.qubit_limit = limit;
        self
    }

    pub fn with_combine(mut self, combine: CombineStrategy) -> Self {
        self.combine = combine;
        self
    }

    pub fn build(&self, constraints: &ConstraintSet) -> Result<CheckerCircuit> {
        let k = constraints.num_variables();
        validate(constraints)?;

        let output = k;
        let mut arena = AncillaArena::new(k + 1);
        let mut circuit = Circuit::new(k + 1);

        // compute
        let mut blocks = Vec::with_capacity(constraints.predicates().len());
        let mut results = Vec::with_capacity(constraints.predicates().len());
        for (i, predicate) in constraints.predicates().iter().enumerate() {
            let result = arena.alloc();
            let block = compile_predicate(predicate, result, &mut arena);
            debug!(predicate = i, result, gates = block.len(), "compiled predicate");
            circuit.append(&block);
            results.push(result);
            blocks.push(block);
        }

        // combine
        let combine = match self.combine {
            CombineStrategy::MultiControlled => and_into(&results, output),
            CombineStrategy::ToffoliTree => and_tree(&results, output, &mut arena),
        };
        circuit.append(&combine);

        // uncompute
        for block in blocks.iter().rev() {
            circuit.append_inverse(block);
        }
        arena.release_all(&results);
        debug_assert_eq!(arena.live(), 0);

        let layout = QubitLayout {
            num_variables: k,
            output,
            ancillas: arena.range(),
        };
        let required = layout.total();
        if required > self.qubit_limit {
            return Err(Error::ResourceExceeded {
                required,
                available: self.qubit_limit,
            });
        }
        circuit.set_num_qubits(required);

        info!(
            variables = k,
            ancillas = layout.num_ancillas(),
            gates = circuit.len(),
            "checker circuit built"
        );
        Ok(CheckerCircuit {
            circuit,
            layout,
            num_predicates: constraints.predicates().len(),
        })
    }
}

fn validate(constraints: &ConstraintSet) -> Result<()> {
    let k = constraints.num_variables();
    for (i, predicate) in constraints.predicates().iter().enumerate() {
        let malformed = |variable: usize| Error::MalformedConstraint {
            predicate: i,
            variable,
            num_variables: k,
        };
        let vars = predicate.variables();
        if let Some(&v) = vars.iter().find(|&&v| v >= k) {
            return Err(malformed(v));
        }
        let mut seen = vec![false; k];
        for &v in &vars {
            if std::mem::replace(&mut seen[v], true) {
                return Err(malformed(v));
            }
        }
    }
    Ok(())
}

/// Circuit setting `result` to the truth value of `predicate`.
fn compile_predicate(predicate: &Predicate, result: Qubit, arena: &mut AncillaArena) -> Circuit {
    let mut block = Circuit::new(0);
    match predicate {
        Predicate::GroupCount {
            variables, target, ..
        } => {
            let target = *target;
            match variables.as_slice() {
                _ if target > variables.len() => {}
                [] => block.push(Gate::X(result)),
                [v] => {
                    if target == 0 {
                        block.push(Gate::X(result));
                    }
                    block.push(Gate::Cx {
                        control: *v,
                        target: result,
                    });
                }
                _ => {
                    let register = arena.alloc_many(variables.len() + 1);
                    block.append(&tally_equals(variables, target, &register, result));
                    arena.release_all(&register);
                }
            }
        }
        Predicate::PairwiseExclusion { a, b } => {
            block.push(Gate::X(result));
            block.push(Gate::Ccx {
                controls: [*a, *b],
                target: result,
            });
        }
    }
    block
}

/// Flip `output` iff every control is set.
fn and_into(controls: &[Qubit], output: Qubit) -> Circuit {
    let mut circuit = Circuit::new(0);
    match controls {
        [] => circuit.push(Gate::X(output)),
        [c] => circuit.push(Gate::Cx {
            control: *c,
            target: output,
        }),
        [a, b] => circuit.push(Gate::Ccx {
            controls: [*a, *b],
            target: output,
        }),
        _ => circuit.push(Gate::Mcx {
            controls: controls.to_vec(),
            target: output,
        }),
    }
    circuit
}

/// AND via a Toffoli tree: pairs are folded into fresh ancillas level by
/// level, the last two values drive the output, and the tree is uncomputed.
fn and_tree(controls: &[Qubit], output: Qubit, arena: &mut AncillaArena) -> Circuit {
    let mut tree = Circuit::new(0);
    let mut level = controls.to_vec();
    let mut scratch = Vec::new();
    while level.len() > 2 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match pair {
                [a, b] => {
                    let q = arena.alloc();
                    tree.push(Gate::Ccx {
                        controls: [*a, *b],
                        target: q,
                    });
                    scratch.push(q);
                    next.push(q);
                }
                [a] => next.push(*a),
                _ => unreachable!(),
            }
        }
        level = next;
    }

    let mut circuit = tree.clone();
    circuit.append(&and_into(&level, output));
    circuit.append_inverse(&tree);
    arena.release_all(&scratch);
    circuit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{ConstraintExtractor, Variable};
    use crate::grid::{GroupId, Grid, Position};

    fn assignment(bits: u64, k: usize) -> Vec<bool> {
        (0..k).map(|i| bits >> i & 1 == 1).collect()
    }

    fn reduced_constraints() -> ConstraintSet {
        let mut grid = Grid::new(&[
            vec![0, 0, 0, 0, 1],
            vec![0, 0, 0, 1, 1],
            vec![2, 2, 0, 3, 3],
            vec![2, 2, 2, 3, 4],
            vec![2, 2, 4, 4, 4],
        ])
        .unwrap();
        grid.place_star(Position::new(4, 2)).unwrap();
        grid.place_star(Position::new(2, 3)).unwrap();
        grid.eliminate();
        ConstraintExtractor::new().extract(&grid).unwrap()
    }

    fn variables(k: usize) -> Vec<Variable> {
        (0..k)
            .map(|index| Variable {
                index,
                cell: Position::new(0, index),
            })
            .collect()
    }

    fn assert_matches_classical(set: &ConstraintSet, checker: &CheckerCircuit) {
        let k = set.num_variables();
        for bits in 0..1u64 << k {
            let input = assignment(bits, k);
            let outcome = checker.evaluate(&input).unwrap();
            assert_eq!(outcome.output, set.evaluate(&input), "assignment {:b}", bits);
            assert!(outcome.ancillas_clean, "dirty ancilla for {:b}", bits);
            assert!(outcome.inputs_preserved);
        }
    }

    #[test]
    fn test_checker_matches_classical_evaluation() {
        let set = reduced_constraints();
        let checker = CheckerCircuitBuilder::new().build(&set).unwrap();
        assert_eq!(checker.num_variables(), 6);
        assert_matches_classical(&set, &checker);
    }

    #[test]
    fn test_toffoli_tree_matches_classical_evaluation() {
        let set = reduced_constraints();
        let checker = CheckerCircuitBuilder::new()
            .with_combine(CombineStrategy::ToffoliTree)
            .build(&set)
            .unwrap();
        assert!(!checker.gate_counts().contains_key("MCX"));
        assert_matches_classical(&set, &checker);
    }

    #[test]
    fn test_layout() {
        let set = reduced_constraints();
        let checker = CheckerCircuitBuilder::new().build(&set).unwrap();
        let layout = checker.layout();
        assert_eq!(layout.output, 6);
        assert_eq!(layout.ancillas.start, 7);
        // tally registers are recycled, so the 15 live results set the peak
        assert_eq!(layout.num_ancillas(), 15);
        assert_eq!(checker.circuit().num_qubits(), checker.num_qubits());
    }

    #[test]
    fn test_zero_target_and_over_target() {
        let set = ConstraintSet::new(
            variables(3),
            vec![
                Predicate::GroupCount {
                    group: GroupId::Row(0),
                    variables: vec![0, 1],
                    target: 0,
                },
                Predicate::GroupCount {
                    group: GroupId::Row(1),
                    variables: vec![2],
                    target: 0,
                },
            ],
        );
        let checker = CheckerCircuitBuilder::new().build(&set).unwrap();
        assert_matches_classical(&set, &checker);

        let impossible = ConstraintSet::new(
            variables(2),
            vec![Predicate::GroupCount {
                group: GroupId::Row(0),
                variables: vec![0, 1],
                target: 3,
            }],
        );
        let checker = CheckerCircuitBuilder::new().build(&impossible).unwrap();
        assert_matches_classical(&impossible, &checker);
    }

    #[test]
    fn test_no_predicates_accepts_everything() {
        let set = ConstraintSet::new(variables(2), vec![]);
        let checker = CheckerCircuitBuilder::new().build(&set).unwrap();
        for bits in 0..4 {
            assert!(checker.evaluate(&assignment(bits, 2)).unwrap().output);
        }
    }

    #[test]
    fn test_evaluate_rejects_wrong_width() {
        let set = ConstraintSet::new(
            variables(2),
            vec![Predicate::PairwiseExclusion { a: 0, b: 1 }],
        );
        let checker = CheckerCircuitBuilder::new().build(&set).unwrap();
        assert!(checker.evaluate(&[true]).is_none());
        assert!(checker.evaluate(&[true, false, false]).is_none());
        assert!(checker.evaluate(&[true, true]).is_some_and(|o| !o.output));
    }

    #[test]
    fn test_out_of_range_variable() {
        let set = ConstraintSet::new(
            variables(2),
            vec![Predicate::PairwiseExclusion { a: 0, b: 5 }],
        );
        let err = CheckerCircuitBuilder::new().build(&set).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedConstraint {
                predicate: 0,
                variable: 5,
                num_variables: 2
            }
        ));
    }

    #[test]
    fn test_repeated_variable() {
        let set = ConstraintSet::new(
            variables(2),
            vec![Predicate::PairwiseExclusion { a: 1, b: 1 }],
        );
        assert!(matches!(
            CheckerCircuitBuilder::new().build(&set),
            Err(Error::MalformedConstraint { variable: 1, .. })
        ));
    }

    #[test]
    fn test_qubit_limit() {
        let set = reduced_constraints();
        let err = CheckerCircuitBuilder::new()
            .with_qubit_limit(10)
            .build(&set)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ResourceExceeded {
                required: 22,
                available: 10
            }
        ));
    }
}
