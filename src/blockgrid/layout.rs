//! # Grid Layout
//!
//! Blocks live on an unbounded grid of integer cells starting at `(0, 0)`. No two
//! blocks may share a cell, so whenever a block needs a place (new block, imported
//! block landing on a taken cell) the layout engine looks for the nearest free one.
//!
//! ## Ring Search
//!
//! [`find_free_cell`] checks the requested origin first, then walks square rings
//! of growing Chebyshev radius around it:
//!
//! ```text
//!   r = 1          r = 2
//!   a b c        a b c d e
//!   d . e        f . . . g
//!   f g h        h . . . i
//!                j . . . k
//!                l m n o p
//! ```
//!
//! Each ring is scanned row by row (`dy` ascending, then `dx` ascending) and only
//! its perimeter is visited; the interior was covered by smaller rings. Candidates
//! with a negative coordinate are skipped. The first free candidate wins, which
//! makes the result deterministic for a given occupied set.
//!
//! After [`MAX_SEARCH_RADIUS`] rings the search gives up and returns the cell
//! `MAX_SEARCH_RADIUS + 1` columns right of the origin without checking it. That
//! can only collide on a grid with more than 14 000 blocks packed around one spot.
//!
//! ## Geometry
//!
//! [`GridGeometry`] carries the pixel metrics the editor draws with, so front ends
//! can turn a click position into a cell and a cell into a node rectangle.

use std::collections::HashSet;

use crate::model::Block;

pub const MAX_SEARCH_RADIUS: i64 = 60;

/// Width of the row-major pattern used for blocks that arrive without a usable
/// position.
pub const FALLBACK_ROW_WIDTH: u32 = 6;

const MAX_COORD: i64 = u32::MAX as i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub gx: u32,
    pub gy: u32,
}

impl Cell {
    pub const ORIGIN: Cell = Cell { gx: 0, gy: 0 };

    pub fn new(gx: u32, gy: u32) -> Self {
        Self { gx, gy }
    }

    /// Builds a cell from signed coordinates, clamping into the grid.
    pub fn clamped(x: i64, y: i64) -> Self {
        Self {
            gx: x.clamp(0, MAX_COORD) as u32,
            gy: y.clamp(0, MAX_COORD) as u32,
        }
    }

    /// The cell one column to the right, where children land by default.
    pub fn next_column(self) -> Self {
        Self {
            gx: self.gx.saturating_add(1),
            gy: self.gy,
        }
    }

    /// Slot `n` of the row-major fallback pattern.
    pub fn fallback(n: u32) -> Self {
        Self {
            gx: n % FALLBACK_ROW_WIDTH,
            gy: n / FALLBACK_ROW_WIDTH,
        }
    }

    /// Chebyshev distance, i.e. the ring index of `other` around `self`.
    pub fn ring_distance(self, other: Cell) -> u32 {
        self.gx.abs_diff(other.gx).max(self.gy.abs_diff(other.gy))
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.gx, self.gy)
    }
}

/// Set of taken cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupiedCells {
    cells: HashSet<Cell>,
}

impl OccupiedCells {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks<'a, I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = &'a Block>,
    {
        Self {
            cells: blocks.into_iter().map(Block::cell).collect(),
        }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    /// Returns `false` if the cell was already taken.
    pub fn insert(&mut self, cell: Cell) -> bool {
        self.cells.insert(cell)
    }

    pub fn remove(&mut self, cell: Cell) -> bool {
        self.cells.remove(&cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<Cell> for OccupiedCells {
    fn from_iter<T: IntoIterator<Item = Cell>>(iter: T) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Finds the free cell nearest to `(origin_x, origin_y)`.
///
/// Never mutates `occupied`; when placing several blocks in a batch the caller
/// records each result before asking for the next one.
pub fn find_free_cell(origin_x: i64, origin_y: i64, occupied: &OccupiedCells) -> Cell {
    let origin = Cell::clamped(origin_x, origin_y);
    if !occupied.contains(origin) {
        return origin;
    }

    let ox = i64::from(origin.gx);
    let oy = i64::from(origin.gy);

    for radius in 1..=MAX_SEARCH_RADIUS {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs() != radius && dy.abs() != radius {
                    continue;
                }

                let cx = ox + dx;
                let cy = oy + dy;
                if cx < 0 || cy < 0 || cx > MAX_COORD || cy > MAX_COORD {
                    continue;
                }

                let candidate = Cell::new(cx as u32, cy as u32);
                if !occupied.contains(candidate) {
                    return candidate;
                }
            }
        }
    }

    Cell::clamped(ox + MAX_SEARCH_RADIUS + 1, oy)
}

/// Same as [`find_free_cell`] for a cell that is already in grid range.
pub fn find_free_cell_near(origin: Cell, occupied: &OccupiedCells) -> Cell {
    find_free_cell(i64::from(origin.gx), i64::from(origin.gy), occupied)
}

/// Largest column and row in use, or `None` for an empty collection.
pub fn extent(blocks: &[Block]) -> Option<Cell> {
    let max_gx = blocks.iter().map(|b| b.gx).max()?;
    let max_gy = blocks.iter().map(|b| b.gy).max()?;
    Some(Cell::new(max_gx, max_gy))
}

/// Pixel metrics of the editor's drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub pad: f64,
    pub col: f64,
    pub row: f64,
    pub node_w: f64,
    pub node_h: f64,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            pad: 20.0,
            col: 180.0,
            row: 120.0,
            node_w: 156.0,
            node_h: 78.0,
        }
    }
}

impl GridGeometry {
    /// Top-left corner of the node drawn for `cell`.
    pub fn cell_origin(&self, cell: Cell) -> (f64, f64) {
        (
            self.pad + f64::from(cell.gx) * self.col,
            self.pad + f64::from(cell.gy) * self.row,
        )
    }

    /// Centre of the node drawn for `cell`; parent links run centre to centre.
    pub fn cell_center(&self, cell: Cell) -> (f64, f64) {
        let (x, y) = self.cell_origin(cell);
        (x + self.node_w / 2.0, y + self.node_h / 2.0)
    }

    /// The cell nearest to a point on the surface. Points left of or above the
    /// grid, and NaN input, clamp to column/row 0.
    pub fn cell_at_point(&self, x: f64, y: f64) -> Cell {
        Cell::new(
            snap(x - self.pad, self.col),
            snap(y - self.pad, self.row),
        )
    }

    /// Minimum surface size that shows every cell up to `extent`.
    pub fn surface_size(&self, extent: Cell) -> (f64, f64) {
        (
            self.pad * 2.0 + (f64::from(extent.gx) + 1.0) * self.col,
            self.pad * 2.0 + (f64::from(extent.gy) + 1.0) * self.row,
        )
    }
}

fn snap(offset: f64, step: f64) -> u32 {
    let steps = (offset / step).round();
    if steps.is_nan() || steps <= 0.0 {
        return 0;
    }
    if steps >= f64::from(u32::MAX) {
        return u32::MAX;
    }
    steps as u32
}
