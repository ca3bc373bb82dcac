use serde::{Deserialize, Serialize};
use std::fmt;

/// A rectangular block inside a sheet, in absolute zero-based sheet
/// coordinates. Both ranges are half-open: `start_row..end_row`,
/// `start_col..end_col`.
///
/// The first row of the block is its header row; data starts one row below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetRegion {
    pub start_row: u32,
    pub end_row: u32,
    pub start_col: u32,
    pub end_col: u32,
}

impl SheetRegion {
    pub fn new(start_row: u32, end_row: u32, start_col: u32, end_col: u32) -> Self {
        Self {
            start_row,
            end_row,
            start_col,
            end_col,
        }
    }

    pub fn height(&self) -> usize {
        self.end_row.saturating_sub(self.start_row) as usize
    }

    pub fn width(&self) -> usize {
        self.end_col.saturating_sub(self.start_col) as usize
    }

    /// Number of data rows once the header row is dropped.
    pub fn data_rows(&self) -> usize {
        self.height().saturating_sub(1)
    }

    /// True when the block is non-empty and lies within a sheet of
    /// `rows` x `cols` cells.
    pub fn fits(&self, rows: usize, cols: usize) -> bool {
        self.start_row < self.end_row
            && self.start_col < self.end_col
            && self.end_row as usize <= rows
            && self.end_col as usize <= cols
    }
}

impl fmt::Display for SheetRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows {}..{}, columns {}..{}",
            self.start_row, self.end_row, self.start_col, self.end_col
        )
    }
}
