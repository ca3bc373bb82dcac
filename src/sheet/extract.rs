use arrow::array::{ArrayRef, StringArray};
use calamine::{Data, Range};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::{debug, instrument};

use super::{sheet_extent, SheetRegion, Workbook};
use crate::error::{DashError, Result};
use crate::process::utils::clean_str;
use crate::table::Table;

/// Read `sheet` from `workbook` into a raw `Table` of nullable `Utf8`
/// columns.
///
/// - With a `region`, only that block is read. Its first row is the header
///   row and is dropped; every remaining row becomes a data row.
/// - Without one, the whole used area is read and its first row is the
///   header.
/// - `names`, when given, are assigned positionally: the Nth column becomes
///   the Nth name. Otherwise the header row supplies the names.
///
/// Blank cells become nulls. No type coercion happens here.
#[instrument(level = "debug", skip(workbook, names))]
pub fn extract(
    workbook: &Workbook,
    sheet: &str,
    region: Option<SheetRegion>,
    names: Option<&[String]>,
) -> Result<Table> {
    let range = workbook.sheet(sheet)?;
    let (rows, cols) = sheet_extent(range);

    let region = match region {
        Some(r) => {
            if !r.fits(rows, cols) {
                return Err(DashError::MalformedRegion {
                    sheet: sheet.to_string(),
                    region: r,
                    rows,
                    cols,
                });
            }
            r
        }
        None => match range.start() {
            Some((r0, c0)) if rows > 0 => {
                SheetRegion::new(r0, rows as u32, c0, cols as u32)
            }
            _ => {
                // an empty sheet has neither header nor data
                return Err(DashError::MalformedRegion {
                    sheet: sheet.to_string(),
                    region: SheetRegion::new(0, 0, 0, 0),
                    rows,
                    cols,
                });
            }
        },
    };

    let headers = match names {
        Some(names) => {
            if names.len() != region.width() {
                return Err(DashError::ColumnCount {
                    sheet: sheet.to_string(),
                    expected: names.len(),
                    found: region.width(),
                });
            }
            names.to_vec()
        }
        None => header_names(range, &region),
    };

    let mut columns: Vec<(String, ArrayRef)> = Vec::with_capacity(headers.len());
    for (offset, name) in headers.into_iter().enumerate() {
        let col = region.start_col + offset as u32;
        let values: StringArray = (region.start_row + 1..region.end_row)
            .map(|row| range.get_value((row, col)).and_then(cell_text))
            .collect();
        columns.push((name, Arc::new(values) as ArrayRef));
    }

    let table = Table::from_columns(columns)?;
    debug!(sheet, %region, rows = table.num_rows(), "extracted");
    Ok(table)
}

/// Header names for `region`: blank headers get `Column<N>`, repeated ones
/// get the first `.<k>` suffix not already taken.
fn header_names(range: &Range<Data>, region: &SheetRegion) -> Vec<String> {
    let bases: Vec<String> = (region.start_col..region.end_col)
        .enumerate()
        .map(|(i, col)| {
            range
                .get_value((region.start_row, col))
                .and_then(cell_text)
                .unwrap_or_else(|| format!("Column{}", i + 1))
        })
        .collect();

    // a literal `A.1` header must survive a later `A` being renamed to it
    let mut taken: HashSet<String> = bases.iter().cloned().collect();
    let mut emitted: HashSet<String> = HashSet::with_capacity(bases.len());
    let mut next: HashMap<String, usize> = HashMap::new();
    bases
        .into_iter()
        .map(|base| {
            if emitted.insert(base.clone()) {
                return base;
            }
            let k = next.entry(base.clone()).or_insert(1);
            let mut name = format!("{}.{}", base, k);
            while taken.contains(&name) {
                *k += 1;
                name = format!("{}.{}", base, k);
            }
            *k += 1;
            taken.insert(name.clone());
            emitted.insert(name.clone());
            name
        })
        .collect()
}

/// Textual form of one cell, `None` for blanks.
pub(crate) fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let s = clean_str(s);
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        }
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Error(e) => Some(format!("#{:?}", e)),
    }
}

/// Cells of absolute `row` across the used columns, `|`-separated; blanks
/// show as empty.
pub fn cell_preview(range: &Range<Data>, row: usize) -> String {
    let (Some((_, c0)), Some((_, c1))) = (range.start(), range.end()) else {
        return String::new();
    };
    (c0..=c1)
        .map(|col| {
            range
                .get_value((row as u32, col))
                .and_then(cell_text)
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" | ")
}
