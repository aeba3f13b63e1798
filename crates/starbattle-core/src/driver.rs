//! Amplitude amplification over a compiled checker.
//!
//! The driver prepares a uniform superposition over the variable qubits,
//! applies `R` rounds of oracle + diffusion, asks the backend for one
//! measurement of the variable register and decodes the most likely
//! assignment.

use crate::backend::{BackendError, ExecutionBackend, ExecutionMode, Measurement};
use crate::circuit::{CheckerCircuit, Circuit, Gate, Qubit};
use crate::distribution::{bitstring, Candidate, ResultDistribution};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Probabilities closer than this count as a tie for the top spot.
const TIE_TOLERANCE: f64 = 1e-9;

/// How the iteration count is derived from `N` and `M`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationSchedule {
    /// `floor(pi/4 * sqrt(N/M) - 1/2)`
    #[default]
    Standard,
    /// `round(pi / (4 * asin(sqrt(M/N))) - 1/2)`, closer to the optimum for
    /// small search spaces
    Exact,
}

impl IterationSchedule {
    /// Iteration count for `n` states with `m` marked, never below one.
    pub fn iterations(self, n: f64, m: f64) -> usize {
        let r = match self {
            IterationSchedule::Standard => (PI / 4.0 * (n / m).sqrt() - 0.5).floor(),
            IterationSchedule::Exact => (PI / (4.0 * (m / n).sqrt().asin()) - 0.5).round(),
        };
        if r < 1.0 {
            1
        } else {
            r as usize
        }
    }
}

/// Iteration plan for one search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmplificationPlan {
    pub num_variables: usize,
    /// `N = 2^k`, saturated at `u64::MAX`
    pub search_space: u64,
    /// Estimated number of satisfying assignments `M`
    pub solutions: u64,
    pub iterations: usize,
    pub schedule: IterationSchedule,
    /// Probability of measuring some solution if the estimate is right
    pub expected_success_probability: f64,
}

impl AmplificationPlan {
    pub fn new(num_variables: usize, solutions: u64, schedule: IterationSchedule) -> Result<Self> {
        let search_space = 1u64.checked_shl(num_variables as u32).unwrap_or(u64::MAX);
        if solutions == 0 || solutions > search_space {
            return Err(Error::InvalidSolutionEstimate {
                solutions,
                search_space,
            });
        }

        if num_variables == 0 {
            return Ok(Self {
                num_variables,
                search_space,
                solutions,
                iterations: 0,
                schedule,
                expected_success_probability: 1.0,
            });
        }

        let n = 2f64.powi(num_variables as i32);
        let m = solutions as f64;
        let iterations = schedule.iterations(n, m);
        let theta = (m / n).sqrt().asin();
        let expected_success_probability = ((2 * iterations + 1) as f64 * theta).sin().powi(2);
        Ok(Self {
            num_variables,
            search_space,
            solutions,
            iterations,
            schedule,
            expected_success_probability,
        })
    }
}

/// Knobs for one driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub solutions: u64,
    pub schedule: IterationSchedule,
    pub mode: ExecutionMode,
    /// Minimum probability of the best outcome
    pub confidence_threshold: f64,
    /// Candidates reported with a low-confidence result
    pub top_candidates: usize,
    /// Deadline for the backend call, unbounded when `None`
    pub timeout: Option<Duration>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            solutions: 1,
            schedule: IterationSchedule::default(),
            mode: ExecutionMode::default(),
            confidence_threshold: 0.5,
            top_candidates: 4,
            timeout: None,
        }
    }
}

/// Width and gate statistics of the executed circuit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitStats {
    pub variables: usize,
    pub ancillas: usize,
    pub total_qubits: usize,
    pub checker_gates: usize,
    pub checker_gate_counts: BTreeMap<&'static str, usize>,
    pub total_gates: usize,
}

/// A decoded amplification run.
#[derive(Debug, Clone)]
pub struct AmplificationOutcome {
    pub plan: AmplificationPlan,
    pub distribution: ResultDistribution,
    pub best: Candidate,
    pub stats: CircuitStats,
}

pub struct AmplificationDriver {
    backend: Arc<dyn ExecutionBackend>,
    config: DriverConfig,
}

impl AmplificationDriver {
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            backend,
            config: DriverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn plan(&self, num_variables: usize) -> Result<AmplificationPlan> {
        AmplificationPlan::new(num_variables, self.config.solutions, self.config.schedule)
    }

    /// Full search circuit: H layer, then `plan.iterations` rounds of oracle
    /// and diffusion.
    pub fn search_circuit(&self, checker: &CheckerCircuit, plan: &AmplificationPlan) -> Circuit {
        let variables: Vec<Qubit> = checker.layout().variables().collect();
        let oracle = oracle(checker);
        let diffusion = diffusion(&variables);

        let mut circuit = Circuit::new(checker.num_qubits());
        for &q in &variables {
            circuit.push(Gate::H(q));
        }
        for _ in 0..plan.iterations {
            circuit.append(&oracle);
            circuit.append(&diffusion);
        }
        circuit
    }

    /// Amplify, measure the variable register once and decode.
    pub fn run(&self, checker: &CheckerCircuit) -> Result<AmplificationOutcome> {
        let k = checker.num_variables();
        let plan = self.plan(k)?;
        info!(
            variables = k,
            search_space = plan.search_space,
            solutions = plan.solutions,
            iterations = plan.iterations,
            expected = plan.expected_success_probability,
            "amplification plan"
        );

        let layout = checker.layout();
        let mut stats = CircuitStats {
            variables: k,
            ancillas: layout.num_ancillas(),
            total_qubits: checker.num_qubits(),
            checker_gates: checker.circuit().len(),
            checker_gate_counts: checker.gate_counts(),
            total_gates: 0,
        };

        if k == 0 {
            let distribution = ResultDistribution::exact(0, BTreeMap::from([(0, 1.0)]));
            let best = Candidate {
                bits: 0,
                probability: 1.0,
            };
            return Ok(AmplificationOutcome {
                plan,
                distribution,
                best,
                stats,
            });
        }

        let available = self.backend.max_qubits();
        if checker.num_qubits() > available {
            return Err(Error::ResourceExceeded {
                required: checker.num_qubits(),
                available,
            });
        }

        let circuit = self.search_circuit(checker, &plan);
        stats.total_gates = circuit.len();
        let measured: Vec<Qubit> = layout.variables().collect();
        let measurement = self.execute(circuit, measured)?;

        let distribution = ResultDistribution::from_measurement(k, measurement);
        let best = self.decode(&distribution)?;
        info!(
            bits = %bitstring(best.bits, k),
            probability = best.probability,
            "decoded assignment"
        );
        Ok(AmplificationOutcome {
            plan,
            distribution,
            best,
            stats,
        })
    }

    /// Pick the most likely outcome. Fails when it is not likely enough or
    /// when another outcome ties with it.
    pub fn decode(&self, distribution: &ResultDistribution) -> Result<Candidate> {
        let threshold = self.config.confidence_threshold;
        let leaders = distribution.top(2);
        let best = leaders.first().copied();
        let runner_up = leaders.get(1).map_or(0.0, |c| c.probability);
        match best {
            Some(best)
                if best.probability >= threshold
                    && best.probability - runner_up > TIE_TOLERANCE =>
            {
                Ok(best)
            }
            _ => {
                let best = best.map_or(0.0, |c| c.probability);
                let tied = distribution
                    .probabilities()
                    .values()
                    .filter(|&&p| best - p <= TIE_TOLERANCE)
                    .count();
                warn!(best, threshold, tied, "measurement did not concentrate");
                Err(Error::LowConfidenceResult {
                    best,
                    threshold,
                    candidates: distribution.top(self.config.top_candidates.max(tied)),
                })
            }
        }
    }

    fn execute(&self, circuit: Circuit, measured: Vec<Qubit>) -> Result<Measurement> {
        let mode = self.config.mode;
        debug!(
            backend = self.backend.name(),
            qubits = circuit.num_qubits(),
            gates = circuit.len(),
            "submitting circuit"
        );
        let Some(timeout) = self.config.timeout else {
            return Ok(self.backend.execute(&circuit, &measured, mode)?);
        };

        let started = Instant::now();
        let backend = Arc::clone(&self.backend);
        let circuit = Arc::new(circuit);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // the receiver is gone once the deadline passed
            let _ = tx.send(backend.execute(&circuit, &measured, mode));
        });
        match rx.recv_timeout(timeout) {
            Ok(result) => Ok(result?),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let elapsed = started.elapsed();
                warn!(?elapsed, "backend timed out");
                Err(Error::ExecutionTimeout { elapsed })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::Backend(
                BackendError::Simulation("backend worker exited without a result".into()),
            )),
        }
    }
}

/// Checker, phase flip on the output, checker inverse.
fn oracle(checker: &CheckerCircuit) -> Circuit {
    let mut circuit = checker.circuit().clone();
    circuit.push(Gate::Z(checker.layout().output));
    circuit.append_inverse(checker.circuit());
    circuit
}

/// Inversion about the mean: H X MCZ X H over the variables.
fn diffusion(variables: &[Qubit]) -> Circuit {
    let mut circuit = Circuit::new(0);
    let Some((&last, rest)) = variables.split_last() else {
        return circuit;
    };
    for &q in variables {
        circuit.push(Gate::H(q));
        circuit.push(Gate::X(q));
    }
    circuit.push(Gate::Mcz {
        controls: rest.to_vec(),
        target: last,
    });
    for &q in variables {
        circuit.push(Gate::X(q));
        circuit.push(Gate::H(q));
    }
    circuit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SparseStatevector;
    use crate::circuit::CheckerCircuitBuilder;
    use crate::constraints::{ConstraintSet, Predicate, Variable};
    use crate::grid::{GroupId, Position};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn variables(k: usize) -> Vec<Variable> {
        (0..k)
            .map(|index| Variable {
                index,
                cell: Position::new(0, index),
            })
            .collect()
    }

    /// Exactly the assignment `bits` over `k` variables satisfies the set.
    fn single_solution(k: usize, bits: u64) -> CheckerCircuit {
        let predicates = (0..k)
            .map(|i| Predicate::GroupCount {
                group: GroupId::Column(i),
                variables: vec![i],
                target: (bits >> i & 1) as usize,
            })
            .collect();
        CheckerCircuitBuilder::new()
            .build(&ConstraintSet::new(variables(k), predicates))
            .unwrap()
    }

    fn driver() -> AmplificationDriver {
        AmplificationDriver::new(Arc::new(SparseStatevector::new()))
    }

    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl ExecutionBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        fn max_qubits(&self) -> usize {
            8
        }

        fn execute(
            &self,
            _circuit: &Circuit,
            _measured: &[Qubit],
            _mode: ExecutionMode,
        ) -> std::result::Result<Measurement, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Measurement::Exact(BTreeMap::from([(0, 1.0)])))
        }
    }

    struct SlowBackend;

    impl ExecutionBackend for SlowBackend {
        fn name(&self) -> &str {
            "slow"
        }

        fn max_qubits(&self) -> usize {
            128
        }

        fn execute(
            &self,
            circuit: &Circuit,
            measured: &[Qubit],
            mode: ExecutionMode,
        ) -> std::result::Result<Measurement, BackendError> {
            thread::sleep(Duration::from_millis(500));
            SparseStatevector::new().execute(circuit, measured, mode)
        }
    }

    #[test]
    fn test_standard_iterations() {
        let s = IterationSchedule::Standard;
        assert_eq!(s.iterations(4.0, 1.0), 1);
        assert_eq!(s.iterations(64.0, 1.0), 5);
        assert_eq!(s.iterations(1024.0, 1.0), 24);
        assert_eq!(s.iterations(64.0, 4.0), 2);
        // clamped
        assert_eq!(s.iterations(2.0, 2.0), 1);
    }

    #[test]
    fn test_exact_iterations() {
        let s = IterationSchedule::Exact;
        assert_eq!(s.iterations(64.0, 1.0), 6);
        assert_eq!(s.iterations(4.0, 1.0), 1);
        assert_eq!(s.iterations(8.0, 8.0), 1);
    }

    #[test]
    fn test_plan_closed_form() {
        let plan = AmplificationPlan::new(6, 1, IterationSchedule::Standard).unwrap();
        assert_eq!(plan.search_space, 64);
        assert_eq!(plan.iterations, 5);
        assert!((plan.expected_success_probability - 0.963515).abs() < 1e-5);

        let plan = AmplificationPlan::new(6, 1, IterationSchedule::Exact).unwrap();
        assert_eq!(plan.iterations, 6);
        assert!(plan.expected_success_probability > 0.99);
    }

    #[test]
    fn test_plan_rejects_bad_estimate() {
        assert!(matches!(
            AmplificationPlan::new(3, 0, IterationSchedule::Standard),
            Err(Error::InvalidSolutionEstimate {
                solutions: 0,
                search_space: 8
            })
        ));
        assert!(matches!(
            AmplificationPlan::new(3, 9, IterationSchedule::Standard),
            Err(Error::InvalidSolutionEstimate { solutions: 9, .. })
        ));
    }

    #[test]
    fn test_zero_variables_skip_backend() {
        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let driver = AmplificationDriver::new(backend.clone());
        let checker = CheckerCircuitBuilder::new()
            .build(&ConstraintSet::new(vec![], vec![]))
            .unwrap();
        let outcome = driver.run(&checker).unwrap();
        assert_eq!(outcome.plan.iterations, 0);
        assert_eq!(outcome.best.bits, 0);
        assert_eq!(outcome.best.probability, 1.0);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_two_variables_single_round_is_exact() {
        let checker = single_solution(2, 0b10);
        let outcome = driver().run(&checker).unwrap();
        assert_eq!(outcome.plan.iterations, 1);
        assert_eq!(outcome.best.bits, 0b10);
        assert!((outcome.best.probability - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_probability_matches_closed_form() {
        // k = 3 and 5 land below 0.9 with the floor schedule
        for k in [2, 4, 6, 7] {
            let checker = single_solution(k, 1);
            let outcome = driver().run(&checker).unwrap();
            assert_eq!(outcome.best.bits, 1);
            assert!(
                (outcome.best.probability - outcome.plan.expected_success_probability).abs()
                    < 1e-9,
                "k = {}",
                k
            );
            assert!(outcome.best.probability > 0.9);
        }
    }

    #[test]
    fn test_low_confidence_reports_candidates() {
        // two solutions but the driver assumes one, which spreads the
        // distribution uniformly
        let set = ConstraintSet::new(
            variables(2),
            vec![
                Predicate::GroupCount {
                    group: GroupId::Row(0),
                    variables: vec![0, 1],
                    target: 1,
                },
                Predicate::PairwiseExclusion { a: 0, b: 1 },
            ],
        );
        let checker = CheckerCircuitBuilder::new().build(&set).unwrap();
        let err = driver().run(&checker).unwrap_err();
        match &err {
            Error::LowConfidenceResult {
                best,
                threshold,
                candidates,
            } => {
                assert!((best - 0.25).abs() < 1e-9);
                assert_eq!(*threshold, 0.5);
                assert_eq!(candidates.len(), 4);
                assert!(candidates.iter().all(|c| (c.probability - 0.25).abs() < 1e-9));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!err.is_retryable());
        assert_eq!(err.candidates().map(|c| c.len()), Some(4));
    }

    #[test]
    fn test_tied_maximum_is_low_confidence() {
        // one variable cannot be amplified past one half
        let err = driver().run(&single_solution(1, 1)).unwrap_err();
        match err {
            Error::LowConfidenceResult {
                best, candidates, ..
            } => {
                assert!((best - 0.5).abs() < 1e-9);
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tie_reports_every_tied_outcome() {
        let driver = driver().with_config(DriverConfig {
            confidence_threshold: 0.0,
            top_candidates: 1,
            ..DriverConfig::default()
        });
        let dist = ResultDistribution::exact(2, BTreeMap::from([(1, 0.4), (2, 0.4), (3, 0.2)]));
        let err = driver.decode(&dist).unwrap_err();
        let bits: Vec<u64> = err.candidates().unwrap().iter().map(|c| c.bits).collect();
        assert_eq!(bits, vec![1, 2]);

        let clear = ResultDistribution::exact(2, BTreeMap::from([(1, 0.5), (2, 0.3), (3, 0.2)]));
        assert_eq!(driver.decode(&clear).unwrap().bits, 1);
    }

    #[test]
    fn test_backend_width_checked() {
        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let driver = AmplificationDriver::new(backend.clone());
        // 6 variables + output + ancillas exceeds 8 qubits
        let checker = single_solution(6, 0);
        assert!(matches!(
            driver.run(&checker),
            Err(Error::ResourceExceeded { available: 8, .. })
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_timeout() {
        let driver = AmplificationDriver::new(Arc::new(SlowBackend)).with_config(DriverConfig {
            timeout: Some(Duration::from_millis(20)),
            ..DriverConfig::default()
        });
        let err = driver.run(&single_solution(2, 1)).unwrap_err();
        assert!(matches!(err, Error::ExecutionTimeout { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_generous_timeout_returns_result() {
        let driver = driver().with_config(DriverConfig {
            timeout: Some(Duration::from_secs(30)),
            ..DriverConfig::default()
        });
        let outcome = driver.run(&single_solution(3, 0b101)).unwrap();
        assert_eq!(outcome.best.bits, 0b101);
    }

    #[test]
    fn test_diffusion_shape() {
        let d = diffusion(&[0, 1, 2]);
        let counts = d.gate_counts();
        assert_eq!(counts["H"], 6);
        assert_eq!(counts["X"], 6);
        assert_eq!(counts["MCZ"], 1);
        assert!(diffusion(&[]).is_empty());
    }
}
