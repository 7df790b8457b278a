//! Delimited-text pressure grid parser
//!
//! A frame arrives as `N` non-blank lines of `N` delimited integers:
//!
//! ```text
//! 0,0,12,40,...
//! 0,3,25,61,...
//! ```
//!
//! Shape is strict, cells are lenient: a wrong row or column count rejects
//! the frame, while a field that is not an integer reads as `0`.

use thiserror::Error;

/// Rejected grid shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedGrid {
    #[error("malformed grid: expected {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },

    #[error("malformed grid: row {row} has {found} fields, expected {expected}")]
    ColumnCount {
        /// 1-based row number among non-blank lines
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Square grid of raw sensor readings, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PressureGrid {
    size: usize,
    cells: Vec<i32>,
}

impl PressureGrid {
    /// All-zero grid of side `size`.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            cells: vec![0; size * size],
        }
    }

    /// Side length N.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells (N * N).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Row-major cell values.
    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    pub fn get(&self, row: usize, col: usize) -> Option<i32> {
        if row < self.size && col < self.size {
            Some(self.cells[row * self.size + col])
        } else {
            None
        }
    }

    /// Set one cell. Out-of-range coordinates are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: i32) {
        if row < self.size && col < self.size {
            self.cells[row * self.size + col] = value;
        }
    }

    /// Unfiltered maximum, or 0 for an empty grid.
    pub fn raw_max(&self) -> i32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }
}

/// Parse `N` lines of `N` delimited integers into a grid.
///
/// Blank and whitespace-only lines are discarded before the shape check.
/// Fields are trimmed; any field that does not parse as `i32` becomes `0`.
pub fn parse_grid(text: &str, size: usize, delimiter: char) -> Result<PressureGrid, MalformedGrid> {
    let rows: Vec<&str> = text
        .split(['\r', '\n'])
        .filter(|line| !line.trim().is_empty())
        .collect();

    if rows.len() != size {
        return Err(MalformedGrid::RowCount {
            expected: size,
            found: rows.len(),
        });
    }

    let mut cells = Vec::with_capacity(size * size);
    for (i, row) in rows.iter().enumerate() {
        let start = cells.len();
        cells.extend(row.split(delimiter).map(parse_cell));
        let found = cells.len() - start;
        if found != size {
            return Err(MalformedGrid::ColumnCount {
                row: i + 1,
                expected: size,
                found,
            });
        }
    }

    Ok(PressureGrid { size, cells })
}

fn parse_cell(field: &str) -> i32 {
    field.trim().parse().unwrap_or(0)
}
