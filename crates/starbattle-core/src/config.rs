//! Solver configuration.
//!
//! Every field has a default so a partial JSON object (or none at all) is a
//! valid configuration.

use crate::backend::ExecutionMode;
use crate::circuit::CombineStrategy;
use crate::driver::{DriverConfig, IterationSchedule};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Run classical elimination before extracting constraints
    pub eliminate: bool,
    /// Estimated number of solutions `M`
    pub solutions: u64,
    pub schedule: IterationSchedule,
    pub mode: ExecutionMode,
    pub confidence_threshold: f64,
    pub top_candidates: usize,
    /// Widest checker circuit to build, unbounded when absent
    pub qubit_limit: Option<usize>,
    pub combine: CombineStrategy,
    /// Deadline for the backend call in milliseconds
    pub timeout_ms: Option<u64>,
    /// Seed for shot sampling
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            eliminate: true,
            solutions: 1,
            schedule: IterationSchedule::default(),
            mode: ExecutionMode::default(),
            confidence_threshold: 0.5,
            top_candidates: 4,
            qubit_limit: None,
            combine: CombineStrategy::default(),
            timeout_ms: None,
            seed: 0,
        }
    }
}

impl SolverConfig {
    /// Reject values no run could use.
    pub fn validate(&self) -> Result<()> {
        if self.solutions == 0 {
            return Err(Error::Config {
                field: "solutions",
                reason: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::Config {
                field: "confidence_threshold",
                reason: format!("{} is outside [0, 1]", self.confidence_threshold),
            });
        }
        if self.top_candidates == 0 {
            return Err(Error::Config {
                field: "top_candidates",
                reason: "must be at least 1".into(),
            });
        }
        if self.timeout_ms == Some(0) {
            return Err(Error::Config {
                field: "timeout_ms",
                reason: "must be positive".into(),
            });
        }
        if self.mode == ExecutionMode::Shots(0) {
            return Err(Error::Config {
                field: "mode",
                reason: "shot count must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            solutions: self.solutions,
            schedule: self.schedule,
            mode: self.mode,
            confidence_threshold: self.confidence_threshold,
            top_candidates: self.top_candidates,
            timeout: self.timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert!(config.eliminate);
        assert_eq!(config.solutions, 1);
        assert_eq!(config.schedule, IterationSchedule::Standard);
        assert_eq!(config.mode, ExecutionMode::Exact);
        assert!(config.validate().is_ok());
        assert_eq!(config.driver_config(), DriverConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config: SolverConfig = serde_json::from_str(
            r#"{"schedule": "exact", "mode": {"shots": 2048}, "timeout_ms": 1500}"#,
        )
        .unwrap();
        assert_eq!(config.schedule, IterationSchedule::Exact);
        assert_eq!(config.mode, ExecutionMode::Shots(2048));
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        assert!(config.eliminate);
        assert_eq!(config.combine, CombineStrategy::MultiControlled);
    }

    #[test]
    fn test_empty_object() {
        let config: SolverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SolverConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<SolverConfig>(r#"{"iterations": 3}"#).is_err());
    }

    #[test]
    fn test_combine_names() {
        let config: SolverConfig =
            serde_json::from_str(r#"{"combine": "toffoli_tree", "qubit_limit": 40}"#).unwrap();
        assert_eq!(config.combine, CombineStrategy::ToffoliTree);
        assert_eq!(config.qubit_limit, Some(40));
    }

    #[test]
    fn test_validate() {
        let bad = [
            SolverConfig {
                solutions: 0,
                ..SolverConfig::default()
            },
            SolverConfig {
                confidence_threshold: 1.5,
                ..SolverConfig::default()
            },
            SolverConfig {
                top_candidates: 0,
                ..SolverConfig::default()
            },
            SolverConfig {
                timeout_ms: Some(0),
                ..SolverConfig::default()
            },
            SolverConfig {
                mode: ExecutionMode::Shots(0),
                ..SolverConfig::default()
            },
        ];
        let fields = [
            "solutions",
            "confidence_threshold",
            "top_candidates",
            "timeout_ms",
            "mode",
        ];
        for (config, expected) in bad.into_iter().zip(fields) {
            match config.validate() {
                Err(Error::Config { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected config error, got {:?}", other),
            }
        }
    }
}
