// src/sheet/mod.rs
pub mod extract;
pub mod region;

pub use extract::extract;
pub use region::SheetRegion;

use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::error::{DashError, Result};

/// Every sheet of a spreadsheet file, read eagerly into memory.
///
/// Sheets keep the order the file declares them in.
#[derive(Debug, Clone)]
pub struct Workbook {
    path: Option<PathBuf>,
    sheets: Vec<(String, Range<Data>)>,
}

impl Workbook {
    /// Open `path` (xlsx, xlsm, xlsb, xls or ods) and read all its sheets.
    #[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path)?;

        let names = workbook.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(names.len());
        for name in names {
            let range = workbook.worksheet_range(&name)?;
            debug!(sheet = %name, size = ?range.get_size(), "read sheet");
            sheets.push((name, range));
        }
        info!(sheets = sheets.len(), "workbook loaded");

        Ok(Self {
            path: Some(path.to_path_buf()),
            sheets,
        })
    }

    /// Build a workbook from in-memory sheets.
    pub fn from_sheets<I, S>(sheets: I) -> Self
    where
        I: IntoIterator<Item = (S, Range<Data>)>,
        S: Into<String>,
    {
        Self {
            path: None,
            sheets: sheets.into_iter().map(|(n, r)| (n.into(), r)).collect(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Look up a sheet by exact name.
    pub fn sheet(&self, name: &str) -> Result<&Range<Data>> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
            .ok_or_else(|| DashError::SheetNotFound {
                sheet: name.to_string(),
                available: self.sheets.iter().map(|(n, _)| n.clone()).collect(),
            })
    }
}

/// Rows x columns of a sheet measured from cell A1, so that absolute
/// offsets can be checked against it.
pub fn sheet_extent(range: &Range<Data>) -> (usize, usize) {
    match range.end() {
        Some((row, col)) if !range.is_empty() => (row as usize + 1, col as usize + 1),
        _ => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sheet_lists_available() {
        let mut range: Range<Data> = Range::new((0, 0), (0, 0));
        range.set_value((0, 0), Data::String("Category".to_owned()));
        let wb = Workbook::from_sheets([("Sales", range)]);

        assert_eq!(wb.sheet_names(), vec!["Sales"]);
        match wb.sheet("Qty") {
            Err(DashError::SheetNotFound { sheet, available }) => {
                assert_eq!(sheet, "Qty");
                assert_eq!(available, vec!["Sales".to_string()]);
            }
            other => panic!("expected SheetNotFound, got {:?}", other),
        }
    }

    #[test]
    fn extent_counts_from_a1() {
        let mut range: Range<Data> = Range::new((2, 1), (4, 3));
        range.set_value((4, 3), Data::Int(1));
        assert_eq!(sheet_extent(&range), (5, 4));

        let empty: Range<Data> = Range::empty();
        assert_eq!(sheet_extent(&empty), (0, 0));
    }
}
