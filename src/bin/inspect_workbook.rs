use promodash::process::utils::infer_arrow_dtype;
use promodash::sheet::extract::cell_preview;
use promodash::sheet::{extract, sheet_extent, Workbook};
use std::{env, path::Path, process::exit};

fn main() {
    // Expect exactly one CLI argument: path to a workbook.
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <WORKBOOK_FILE>", args[0]);
        exit(1);
    }
    if let Err(e) = inspect_workbook(Path::new(&args[1])) {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

/// Print every sheet with its used extent and first row, so region offsets
/// can be read off without opening a spreadsheet program.
fn inspect_workbook(path: &Path) -> promodash::Result<()> {
    let workbook = Workbook::open(path)?;

    println!("=== Workbook: {} ===", path.display());
    println!("Sheets: {}", workbook.sheet_names().len());
    println!();

    for name in workbook.sheet_names() {
        let range = workbook.sheet(name)?;
        let (rows, cols) = sheet_extent(range);
        println!("--- {} ---", name);
        match (range.start(), range.end()) {
            (Some((r0, c0)), Some((r1, c1))) if !range.is_empty() => {
                println!("  used rows:    {}..{}", r0, r1 + 1);
                println!("  used columns: {}..{}", c0, c1 + 1);
                println!("  extent:       {} rows x {} columns from A1", rows, cols);
                println!("  first row:    {}", cell_preview(range, r0 as usize));
                print_columns(&workbook, name)?;
            }
            _ => println!("  <empty>"),
        }
        println!();
    }
    Ok(())
}

/// Header-row columns with the type their cells would coerce to.
fn print_columns(workbook: &Workbook, sheet: &str) -> promodash::Result<()> {
    let table = extract(workbook, sheet, None, None)?;
    println!("  columns ({} data rows):", table.num_rows());
    for name in table.column_names() {
        let cells = table.utf8_column(&name)?;
        let dtype = infer_arrow_dtype(cells.iter().flatten());
        println!("    - {:<40} {}", name, dtype);
    }
    Ok(())
}
