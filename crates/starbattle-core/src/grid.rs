//! Puzzle model: region map, per-cell status and group membership.
//!
//! The grid performs no search. It answers "which cells belong to group G?"
//! and "which cells are still unknown?", and offers the classical
//! pre-elimination pass that marks cells ruled out by confirmed stars.

use crate::error::{Error, RegionMapError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stars required in every row, column and region of a standard puzzle.
pub const DEFAULT_STARS_PER_GROUP: usize = 1;

/// Offsets of the 8 neighbours of a cell, in row-major order.
const NEIGHBOUR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// A cell coordinate on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Whether two distinct cells touch, diagonals included.
    pub fn is_adjacent(&self, other: &Position) -> bool {
        self != other && self.row.abs_diff(other.row) <= 1 && self.col.abs_diff(other.col) <= 1
    }
}

impl From<(usize, usize)> for Position {
    fn from((row, col): (usize, usize)) -> Self {
        Self::new(row, col)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// What is known about a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellStatus {
    #[default]
    Unknown,
    Star,
    Empty,
}

/// A set of cells that carries a star-count constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GroupId {
    Row(usize),
    Column(usize),
    Region(usize),
    /// The 8 cells around a confirmed star, all of which must stay empty
    Neighbourhood(Position),
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupId::Row(r) => write!(f, "row {}", r),
            GroupId::Column(c) => write!(f, "column {}", c),
            GroupId::Region(id) => write!(f, "region {}", id),
            GroupId::Neighbourhood(pos) => write!(f, "neighbourhood of {}", pos),
        }
    }
}

fn default_stars_per_group() -> usize {
    DEFAULT_STARS_PER_GROUP
}

/// Serialized puzzle description: region matrix plus confirmed stars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleInput {
    pub regions: Vec<Vec<usize>>,
    #[serde(default)]
    pub stars: Vec<(usize, usize)>,
    #[serde(default = "default_stars_per_group")]
    pub stars_per_group: usize,
}

/// Star Battle grid state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    quota: usize,
    /// Region id per cell, indexed by linear cell index
    regions: Vec<usize>,
    cells: Vec<CellStatus>,
}

impl Grid {
    /// Create a standard one-star grid from a region matrix.
    pub fn new(regions: &[Vec<usize>]) -> Result<Self> {
        Self::with_quota(regions, DEFAULT_STARS_PER_GROUP)
    }

    /// Create a grid requiring `quota` stars per row, column and region.
    ///
    /// The matrix must be square with ids in `0..n`, and every id must own
    /// at least one cell.
    pub fn with_quota(regions: &[Vec<usize>], quota: usize) -> Result<Self> {
        let size = regions.len();
        if size == 0 {
            return Err(RegionMapError::NoRows.into());
        }
        if quota == 0 {
            return Err(Error::Config {
                field: "stars_per_group",
                reason: "must be at least 1".into(),
            });
        }

        let mut flat = Vec::with_capacity(size * size);
        let mut seen = vec![false; size];
        for (row, line) in regions.iter().enumerate() {
            if line.len() != size {
                return Err(RegionMapError::RaggedRow {
                    row,
                    len: line.len(),
                    expected: size,
                }
                .into());
            }
            for (col, &id) in line.iter().enumerate() {
                if id >= size {
                    return Err(RegionMapError::RegionOutOfRange {
                        position: Position::new(row, col),
                        id,
                        size,
                    }
                    .into());
                }
                seen[id] = true;
                flat.push(id);
            }
        }
        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(RegionMapError::MissingRegion {
                region: missing,
                size,
            }
            .into());
        }

        Ok(Self {
            size,
            quota,
            regions: flat,
            cells: vec![CellStatus::Unknown; size * size],
        })
    }

    /// Build a grid from its serialized description, placing every star.
    pub fn from_input(input: &PuzzleInput) -> Result<Self> {
        let mut grid = Self::with_quota(&input.regions, input.stars_per_group)?;
        for &star in &input.stars {
            grid.place_star(star.into())?;
        }
        Ok(grid)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Stars required per row, column and region
    pub fn quota(&self) -> usize {
        self.quota
    }

    #[inline]
    fn index(&self, pos: Position) -> usize {
        pos.row * self.size + pos.col
    }

    #[inline]
    fn position(&self, idx: usize) -> Position {
        Position::new(idx / self.size, idx % self.size)
    }

    fn check_bounds(&self, pos: Position) -> Result<()> {
        if pos.row < self.size && pos.col < self.size {
            Ok(())
        } else {
            Err(Error::CellOutOfBounds {
                position: pos,
                size: self.size,
            })
        }
    }

    /// Region id of a cell. Panics if `pos` is off the grid.
    pub fn region(&self, pos: Position) -> usize {
        self.regions[self.index(pos)]
    }

    /// Status of a cell. Panics if `pos` is off the grid.
    pub fn status(&self, pos: Position) -> CellStatus {
        self.cells[self.index(pos)]
    }

    /// Mark a cell as holding a star. Over-quota placements are accepted
    /// here and reported by constraint extraction.
    pub fn place_star(&mut self, pos: Position) -> Result<()> {
        self.check_bounds(pos)?;
        let idx = self.index(pos);
        self.cells[idx] = CellStatus::Star;
        Ok(())
    }

    pub fn mark_empty(&mut self, pos: Position) -> Result<()> {
        self.check_bounds(pos)?;
        let idx = self.index(pos);
        self.cells[idx] = CellStatus::Empty;
        Ok(())
    }

    /// Confirmed stars in row-major order
    pub fn stars(&self) -> Vec<Position> {
        self.cells_with(CellStatus::Star)
    }

    /// Unknown cells in row-major order. The order fixes variable indices.
    pub fn unknown_cells(&self) -> Vec<Position> {
        self.cells_with(CellStatus::Unknown)
    }

    fn cells_with(&self, status: CellStatus) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &s)| s == status)
            .map(|(idx, _)| self.position(idx))
            .collect()
    }

    /// Rows, then columns, then regions.
    pub fn groups(&self) -> Vec<GroupId> {
        (0..self.size)
            .map(GroupId::Row)
            .chain((0..self.size).map(GroupId::Column))
            .chain((0..self.size).map(GroupId::Region))
            .collect()
    }

    /// Cells belonging to a group, in row-major order.
    pub fn group_cells(&self, group: GroupId) -> Vec<Position> {
        match group {
            GroupId::Row(r) => (0..self.size).map(|c| Position::new(r, c)).collect(),
            GroupId::Column(c) => (0..self.size).map(|r| Position::new(r, c)).collect(),
            GroupId::Region(id) => (0..self.regions.len())
                .filter(|&idx| self.regions[idx] == id)
                .map(|idx| self.position(idx))
                .collect(),
            GroupId::Neighbourhood(pos) => self.neighbours(pos),
        }
    }

    /// The up to 8 cells touching `pos`, in row-major order.
    pub fn neighbours(&self, pos: Position) -> Vec<Position> {
        NEIGHBOUR_OFFSETS
            .iter()
            .filter_map(|&(dr, dc)| {
                let row = pos.row.checked_add_signed(dr)?;
                let col = pos.col.checked_add_signed(dc)?;
                (row < self.size && col < self.size).then(|| Position::new(row, col))
            })
            .collect()
    }

    /// Count cells of a group with the given status.
    pub fn count_in(&self, group: GroupId, status: CellStatus) -> usize {
        self.group_cells(group)
            .into_iter()
            .filter(|&p| self.status(p) == status)
            .count()
    }

    /// Classical pre-elimination: every unknown cell that shares a full
    /// group with confirmed stars, or touches a confirmed star, is marked
    /// empty. Returns the number of cells eliminated.
    pub fn eliminate(&mut self) -> usize {
        let mut forbidden = Vec::new();
        for group in self.groups() {
            if self.count_in(group, CellStatus::Star) >= self.quota {
                forbidden.extend(self.group_cells(group));
            }
        }
        for star in self.stars() {
            forbidden.extend(self.neighbours(star));
        }

        let mut eliminated = 0;
        for pos in forbidden {
            let idx = self.index(pos);
            if self.cells[idx] == CellStatus::Unknown {
                self.cells[idx] = CellStatus::Empty;
                eliminated += 1;
            }
        }
        debug!(
            eliminated,
            remaining = self.unknown_cells().len(),
            "classical elimination"
        );
        eliminated
    }

    /// Whether `stars` is a complete, valid placement for this grid's
    /// region map, ignoring the current cell statuses.
    pub fn is_valid_placement(&self, stars: &[Position]) -> bool {
        if stars.iter().any(|p| p.row >= self.size || p.col >= self.size) {
            return false;
        }
        let mut rows = vec![0; self.size];
        let mut cols = vec![0; self.size];
        let mut regions = vec![0; self.size];
        for &p in stars {
            rows[p.row] += 1;
            cols[p.col] += 1;
            regions[self.region(p)] += 1;
        }
        let full = |counts: &[usize]| counts.iter().all(|&n| n == self.quota);
        if !(full(&rows) && full(&cols) && full(&regions)) {
            return false;
        }
        stars
            .iter()
            .enumerate()
            .all(|(i, a)| stars[i + 1..].iter().all(|b| !a.is_adjacent(b)))
    }
}

impl std::fmt::Display for Grid {
    /// Stars as `*`, empty cells as `.`, unknown cells by region id.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.size {
            let line: Vec<String> = (0..self.size)
                .map(|col| {
                    let pos = Position::new(row, col);
                    match self.status(pos) {
                        CellStatus::Star => "*".to_string(),
                        CellStatus::Empty => ".".to_string(),
                        CellStatus::Unknown => self.region(pos).to_string(),
                    }
                })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
