//! Reversible unary counter.
//!
//! With a zeroed register of `m + 1` qubits, the tally moves a single flag
//! from `register[0]` to `register[c]`, where `c` is the number of inputs set.
//! Uses one X and `m * (m + 1)` Toffolis.

use super::{Circuit, Gate, Qubit};

/// Count the inputs into a one-hot register of `inputs.len() + 1` qubits.
pub(crate) fn tally(inputs: &[Qubit], register: &[Qubit]) -> Circuit {
    debug_assert_eq!(register.len(), inputs.len() + 1);
    let mut circuit = Circuit::new(0);
    circuit.push(Gate::X(register[0]));
    for (i, &x) in inputs.iter().enumerate() {
        // the flag can be at most at position i; walk down so it moves once
        for j in (1..=i + 1).rev() {
            circuit.push(Gate::Ccx {
                controls: [x, register[j - 1]],
                target: register[j],
            });
            circuit.push(Gate::Ccx {
                controls: [x, register[j]],
                target: register[j - 1],
            });
        }
    }
    circuit
}

/// Flip `result` iff exactly `target` inputs are set, leaving the register
/// zeroed again.
pub(crate) fn tally_equals(
    inputs: &[Qubit],
    target: usize,
    register: &[Qubit],
    result: Qubit,
) -> Circuit {
    let count = tally(inputs, register);
    let mut circuit = count.clone();
    circuit.push(Gate::Cx {
        control: register[target],
        target: result,
    });
    circuit.append_inverse(&count);
    circuit
}
