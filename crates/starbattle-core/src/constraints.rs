//! Constraint extraction: grid → boolean variables and predicates.
//!
//! Every unknown cell becomes one variable, numbered in row-major order.
//! Confirmed stars are folded into reduced group targets, so the predicates
//! mention unknown cells only.

use crate::error::{Error, Infeasibility, Result};
use crate::grid::{CellStatus, Grid, GroupId, Position};
use std::collections::HashMap;
use tracing::{debug, info};

/// One boolean unknown, tied to a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    /// Stable index: qubit position and bit position in measured outcomes
    pub index: usize,
    pub cell: Position,
}

/// A constraint over a subset of the variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Exactly `target` of `variables` are true
    GroupCount {
        group: GroupId,
        variables: Vec<usize>,
        target: usize,
    },
    /// `a` and `b` are not both true
    PairwiseExclusion { a: usize, b: usize },
}

impl Predicate {
    /// Variable indices referenced by this predicate
    pub fn variables(&self) -> Vec<usize> {
        match self {
            Predicate::GroupCount { variables, .. } => variables.clone(),
            Predicate::PairwiseExclusion { a, b } => vec![*a, *b],
        }
    }

    /// Classical evaluation. Out-of-range indices read as false.
    pub fn is_satisfied(&self, assignment: &[bool]) -> bool {
        let get = |v: usize| assignment.get(v).copied().unwrap_or(false);
        match self {
            Predicate::GroupCount {
                variables, target, ..
            } => variables.iter().filter(|&&v| get(v)).count() == *target,
            Predicate::PairwiseExclusion { a, b } => !(get(*a) && get(*b)),
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::GroupCount {
                group,
                variables,
                target,
            } => write!(
                f,
                "{}: cells {:?} must contain {} star(s)",
                group, variables, target
            ),
            Predicate::PairwiseExclusion { a, b } => {
                write!(f, "cells {} and {} are not both stars", a, b)
            }
        }
    }
}

/// Variables and predicates derived from one grid. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSet {
    variables: Vec<Variable>,
    predicates: Vec<Predicate>,
}

impl ConstraintSet {
    /// Assemble a set by hand. Indices are validated when the checker
    /// circuit is compiled, not here.
    pub fn new(variables: Vec<Variable>, predicates: Vec<Predicate>) -> Self {
        Self {
            variables,
            predicates,
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Whether `assignment` (indexed by variable) satisfies every predicate.
    pub fn evaluate(&self, assignment: &[bool]) -> bool {
        self.predicates.iter().all(|p| p.is_satisfied(assignment))
    }

    /// Brute-force every assignment, returning satisfying ones as bit masks
    /// (bit i = variable i). Exponential; meant for small sets. `None` when
    /// the masks would not fit in a `u64`.
    pub fn satisfying_assignments(&self) -> Option<Vec<u64>> {
        let k = self.num_variables();
        if k >= 64 {
            return None;
        }
        let satisfying = (0..1u64 << k)
            .filter(|&bits| {
                let assignment: Vec<bool> = (0..k).map(|i| bits >> i & 1 == 1).collect();
                self.evaluate(&assignment)
            })
            .collect();
        Some(satisfying)
    }

    /// Cells of the variables set to true, in variable order.
    pub fn star_cells(&self, assignment: &[bool]) -> Vec<Position> {
        self.variables
            .iter()
            .filter(|v| assignment.get(v.index).copied().unwrap_or(false))
            .map(|v| v.cell)
            .collect()
    }
}

/// Stateless extractor, all state is per-call.
pub struct ConstraintExtractor;

impl Default for ConstraintExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Derive variables and predicates from `grid`.
    ///
    /// Order is fixed: row, column and region counts, then the adjacency
    /// phase in row-major order of the first cell of each pair.
    pub fn extract(&self, grid: &Grid) -> Result<ConstraintSet> {
        let variables: Vec<Variable> = grid
            .unknown_cells()
            .into_iter()
            .enumerate()
            .map(|(index, cell)| Variable { index, cell })
            .collect();
        let index_of: HashMap<Position, usize> =
            variables.iter().map(|v| (v.cell, v.index)).collect();

        let mut predicates = Vec::new();
        for group in grid.groups() {
            if let Some(p) = self.group_predicate(grid, group, &index_of)? {
                predicates.push(p);
            }
        }

        let mut forced = vec![false; variables.len()];
        let mut force_empty = |cell: Position, star: Position, out: &mut Vec<Predicate>| {
            if let Some(&v) = index_of.get(&cell) {
                if !forced[v] {
                    forced[v] = true;
                    out.push(Predicate::GroupCount {
                        group: GroupId::Neighbourhood(star),
                        variables: vec![v],
                        target: 0,
                    });
                }
            }
        };

        let size = grid.size();
        for row in 0..size {
            for col in 0..size {
                let first = Position::new(row, col);
                for second in grid.neighbours(first) {
                    if second < first {
                        continue;
                    }
                    match (grid.status(first), grid.status(second)) {
                        (CellStatus::Unknown, CellStatus::Unknown) => {
                            predicates.push(Predicate::PairwiseExclusion {
                                a: index_of[&first],
                                b: index_of[&second],
                            });
                        }
                        (CellStatus::Star, CellStatus::Star) => {
                            return Err(Error::InfeasiblePuzzle {
                                group: GroupId::Neighbourhood(first),
                                reason: Infeasibility::AdjacentStars { first, second },
                            });
                        }
                        (CellStatus::Star, CellStatus::Unknown) => {
                            force_empty(second, first, &mut predicates)
                        }
                        (CellStatus::Unknown, CellStatus::Star) => {
                            force_empty(first, second, &mut predicates)
                        }
                        _ => {}
                    }
                }
            }
        }

        info!(
            variables = variables.len(),
            predicates = predicates.len(),
            "constraints extracted"
        );
        Ok(ConstraintSet::new(variables, predicates))
    }

    fn group_predicate(
        &self,
        grid: &Grid,
        group: GroupId,
        index_of: &HashMap<Position, usize>,
    ) -> Result<Option<Predicate>> {
        let cells = grid.group_cells(group);
        let quota = grid.quota();
        let stars = cells
            .iter()
            .filter(|&&p| grid.status(p) == CellStatus::Star)
            .count();
        if stars > quota {
            return Err(Error::InfeasiblePuzzle {
                group,
                reason: Infeasibility::QuotaExceeded { stars, quota },
            });
        }

        let target = quota - stars;
        let variables: Vec<usize> = cells
            .iter()
            .filter_map(|p| index_of.get(p).copied())
            .collect();
        if variables.is_empty() {
            if target != 0 {
                return Err(Error::InfeasiblePuzzle {
                    group,
                    reason: Infeasibility::NoCellsLeft { target },
                });
            }
            return Ok(None);
        }
        if target > variables.len() {
            return Err(Error::InfeasiblePuzzle {
                group,
                reason: Infeasibility::NotEnoughCells {
                    target,
                    unknown: variables.len(),
                },
            });
        }

        debug!(%group, target, variables = ?variables, "group count");
        Ok(Some(Predicate::GroupCount {
            group,
            variables,
            target,
        }))
    }
}
