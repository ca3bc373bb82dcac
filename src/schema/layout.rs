//! Where each logical table lives inside a workbook, and how its headers
//! map onto the canonical columns.
//!
//! Offsets are an agreement with whoever authors the spreadsheet; they
//! cannot be discovered at runtime, so every variant is spelled out here and
//! may be overridden from the render request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use super::columns::*;
use super::types::CanonicalSchema;
use crate::error::Result;
use crate::process::{normalize, NormalizeSpec};
use crate::sheet::{self, SheetRegion, Workbook};
use crate::table::Table;

/// One logical table inside a workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub sheet: String,
    /// block to slice; the whole sheet when absent
    #[serde(default)]
    pub region: Option<SheetRegion>,
    /// positional names for the sliced columns; header row when absent
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    #[serde(flatten)]
    pub normalize: NormalizeSpec,
}

impl SheetLayout {
    pub fn whole_sheet(sheet: impl Into<String>, normalize: NormalizeSpec) -> Self {
        Self {
            sheet: sheet.into(),
            region: None,
            columns: None,
            normalize,
        }
    }

    pub fn block(
        sheet: impl Into<String>,
        region: SheetRegion,
        columns: &[&str],
        normalize: NormalizeSpec,
    ) -> Self {
        Self {
            sheet: sheet.into(),
            region: Some(region),
            columns: Some(columns.iter().map(|c| c.to_string()).collect()),
            normalize,
        }
    }

    /// Extract, normalize and conform this table to `schema`.
    #[instrument(level = "info", skip_all, fields(sheet = %self.sheet, schema = schema.name))]
    pub fn load(&self, workbook: &Workbook, schema: &CanonicalSchema) -> Result<Table> {
        let raw = sheet::extract(workbook, &self.sheet, self.region, self.columns.as_deref())?;
        let normalized = normalize(&raw, &self.normalize)?;
        let table = schema.conform(&normalized)?;
        debug!(raw = raw.num_rows(), rows = table.num_rows(), "loaded");
        Ok(table)
    }
}

fn renames(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Promo performance `Summary …` sheets, yearly or monthly. Both spellings
/// of the promo quantity and of the contribution column are accepted.
pub fn summary_layout(sheet: &str) -> SheetLayout {
    SheetLayout::whole_sheet(
        sheet,
        NormalizeSpec {
            renames: renames(&[
                ("Category", CATEGORY),
                ("Month", PERIOD),
                ("Sales Amount", SALES_AMOUNT),
                ("NOC", NOC),
                ("Visit Customer", VISIT_CUSTOMER),
                ("Jumlah Promo", QTY_PROMO),
                ("Qty Promo", QTY_PROMO),
                ("Kontribusi Promo pada Net Sales", CONTRIBUTION_RATIO),
                ("Kontribusi Sales", CONTRIBUTION_RATIO),
                ("Net Sales (by Group Category)", NET_SALES),
            ]),
            numeric_columns: strings(&[
                SALES_AMOUNT,
                NOC,
                VISIT_CUSTOMER,
                QTY_PROMO,
                CONTRIBUTION_RATIO,
                NET_SALES,
            ]),
            integer_columns: strings(&[CATEGORY]),
            required_columns: strings(&[CATEGORY]),
        },
    )
}

const ENDED_MEASURES: &[&str] = &[
    TOTAL_COUNT,
    TOTAL_CLAIM,
    NOC,
    SALES_AMOUNT,
    NET_SALES,
    CONTRIBUTION_RATIO,
    CONVERSION_CLAIM_COUNT,
    CONVERSION_COUNT_NOC,
];

/// Ended-promo `Sales` sheet, header on the first row.
pub fn ended_sales_layout() -> SheetLayout {
    SheetLayout::whole_sheet(
        "Sales",
        NormalizeSpec {
            renames: renames(&[
                ("Category", CATEGORY),
                ("Promo Name", PROMO_NAME),
                ("Total Count", TOTAL_COUNT),
                ("Total Claim", TOTAL_CLAIM),
                ("NOC", NOC),
                ("Sales Amount", SALES_AMOUNT),
                ("Net Sales (by Category)", NET_SALES),
                ("Contribution Sales", CONTRIBUTION_RATIO),
                ("Conversion Rate (Claim/Count)", CONVERSION_CLAIM_COUNT),
                ("Conversion Rate (Count/NOC)", CONVERSION_COUNT_NOC),
            ]),
            numeric_columns: strings(ENDED_MEASURES),
            integer_columns: strings(&[CATEGORY]),
            required_columns: strings(&[CATEGORY]),
        },
    )
}

/// Ended-promo `Qty` sheet. Its headers differ from `Sales`: `Cat`,
/// `Nama Promo`, and conversion labels without the space.
pub fn ended_qty_layout() -> SheetLayout {
    SheetLayout::whole_sheet(
        "Qty",
        NormalizeSpec {
            renames: renames(&[
                ("Cat", CATEGORY),
                ("Nama Promo", PROMO_NAME),
                ("Total Count", TOTAL_COUNT),
                ("Total Claim", TOTAL_CLAIM),
                ("NOC", NOC),
                ("Conversion Rate(Claim/Count)", CONVERSION_CLAIM_COUNT),
                ("Conversion Rate(Count/NOC)", CONVERSION_COUNT_NOC),
            ]),
            numeric_columns: strings(&[
                TOTAL_COUNT,
                TOTAL_CLAIM,
                NOC,
                CONVERSION_CLAIM_COUNT,
                CONVERSION_COUNT_NOC,
            ]),
            integer_columns: strings(&[CATEGORY]),
            required_columns: strings(&[CATEGORY]),
        },
    )
}

/// Per-promo block at rows 6..22 of a report sheet: one header row then one
/// row per promo, eleven columns starting at column A.
pub fn promo_block_layout(sheet: &str) -> SheetLayout {
    SheetLayout::block(
        sheet,
        SheetRegion::new(6, 22, 0, 11),
        &[
            "no",
            CATEGORY,
            PROMO_NAME,
            TOTAL_COUNT,
            TOTAL_CLAIM,
            NOC,
            SALES_AMOUNT,
            NET_SALES,
            CONTRIBUTION_RATIO,
            CONVERSION_CLAIM_COUNT,
            CONVERSION_COUNT_NOC,
        ],
        NormalizeSpec {
            numeric_columns: strings(ENDED_MEASURES),
            integer_columns: strings(&[CATEGORY]),
            required_columns: strings(&[CATEGORY]),
            ..NormalizeSpec::default()
        },
    )
}

/// Per-category block at rows 26..33 of the same report sheet. The
/// workbook's own category totals, used by the per-category view in place
/// of folding promo rows.
pub fn category_block_layout(sheet: &str) -> SheetLayout {
    SheetLayout::block(
        sheet,
        SheetRegion::new(26, 33, 0, 10),
        &[
            CATEGORY,
            PROMO_COUNT,
            TOTAL_COUNT,
            TOTAL_CLAIM,
            NOC,
            SALES_AMOUNT,
            NET_SALES,
            CONTRIBUTION_RATIO,
            CONVERSION_CLAIM_COUNT,
            CONVERSION_COUNT_NOC,
        ],
        NormalizeSpec {
            numeric_columns: strings(&[
                TOTAL_COUNT,
                TOTAL_CLAIM,
                NOC,
                SALES_AMOUNT,
                NET_SALES,
                CONTRIBUTION_RATIO,
                CONVERSION_CLAIM_COUNT,
                CONVERSION_COUNT_NOC,
            ]),
            integer_columns: strings(&[CATEGORY, PROMO_COUNT]),
            required_columns: strings(&[CATEGORY]),
            ..NormalizeSpec::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashError;
    use crate::schema::types::{CATEGORY_BLOCK, ENDED_QTY, ENDED_SALES, YEARLY_SUMMARY};
    use crate::dashboard::testutil::report_sheet;
    use calamine::{Data, Range};

    fn s(v: &str) -> Data {
        Data::String(v.to_owned())
    }

    fn yearly_sheet(qty_header: &str, contribution_header: &str) -> Range<Data> {
        let headers = [
            "Category",
            "Sales Amount",
            "NOC",
            qty_header,
            contribution_header,
            "Net Sales (by Group Category)",
            "Visit Customer",
        ];
        let mut range: Range<Data> = Range::new((0, 0), (2, 6));
        for (c, h) in headers.iter().enumerate() {
            range.set_value((0, c as u32), s(h));
        }
        let rows = [
            [11.0, 2.0e9, 1200.0, 4.0, 0.05, 4.0e10, 90000.0],
            [14.0, 5.0e8, 300.0, 2.0, 0.02, 2.5e10, 90000.0],
        ];
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                range.set_value((r as u32 + 1, c as u32), Data::Float(*v));
            }
        }
        range
    }

    #[test]
    fn both_header_spellings_reach_one_schema() {
        let a = Workbook::from_sheets([("Y", yearly_sheet("Jumlah Promo", "Kontribusi Sales"))]);
        let b = Workbook::from_sheets([(
            "Y",
            yearly_sheet("Qty Promo", "Kontribusi Promo pada Net Sales"),
        )]);
        let ta = summary_layout("Y").load(&a, &YEARLY_SUMMARY).unwrap();
        let tb = summary_layout("Y").load(&b, &YEARLY_SUMMARY).unwrap();
        assert_eq!(ta, tb);
        assert_eq!(ta.f64_values(QTY_PROMO).unwrap(), vec![Some(4.0), Some(2.0)]);
        assert_eq!(ta.i64_values(CATEGORY).unwrap(), vec![Some(11), Some(14)]);
    }

    #[test]
    fn qty_sheet_headers_are_reconciled() {
        let headers = [
            "Cat",
            "Nama Promo",
            "Total Count",
            "Total Claim",
            "NOC",
            "Conversion Rate(Claim/Count)",
            "Conversion Rate(Count/NOC)",
        ];
        let mut range: Range<Data> = Range::new((0, 0), (3, 6));
        for (c, h) in headers.iter().enumerate() {
            range.set_value((0, c as u32), s(h));
        }
        range.set_value((1, 0), Data::Float(17.0));
        range.set_value((1, 1), s("Beli 2 Gratis 1"));
        range.set_value((1, 2), Data::Float(40.0));
        range.set_value((1, 3), Data::Float(10.0));
        range.set_value((1, 4), Data::Float(800.0));
        // row 2 blank, row 3 without category
        range.set_value((3, 1), s("Total"));
        range.set_value((3, 2), Data::Float(40.0));
        let wb = Workbook::from_sheets([("Qty", range)]);

        let t = ended_qty_layout().load(&wb, &ENDED_QTY).unwrap();
        assert_eq!(t.num_rows(), 1);
        assert_eq!(
            t.utf8_values(PROMO_NAME).unwrap(),
            vec![Some("Beli 2 Gratis 1".to_string())]
        );
        assert!(t.has_column(CONVERSION_COUNT_NOC));
    }

    #[test]
    fn missing_contribution_column_is_reported() {
        let mut range: Range<Data> = Range::new((0, 0), (1, 1));
        range.set_value((0, 0), s("Category"));
        range.set_value((0, 1), s("Sales Amount"));
        range.set_value((1, 0), Data::Float(11.0));
        let wb = Workbook::from_sheets([("Y", range)]);
        assert!(matches!(
            summary_layout("Y").load(&wb, &YEARLY_SUMMARY),
            Err(DashError::MissingColumn(_))
        ));
    }

    #[test]
    fn report_sheet_blocks() {
        let wb = Workbook::from_sheets([("Report", report_sheet())]);

        let promos = promo_block_layout("Report").load(&wb, &ENDED_SALES).unwrap();
        assert_eq!(promos.num_rows(), 15);
        assert_eq!(promos.num_rows(), SheetRegion::new(6, 22, 0, 11).data_rows());

        let summary = category_block_layout("Report").load(&wb, &CATEGORY_BLOCK).unwrap();
        assert_eq!(summary.num_rows(), 6);
        assert_eq!(
            summary.i64_values(CATEGORY).unwrap(),
            vec![Some(11), Some(14), Some(17), Some(19), Some(21), Some(26)]
        );
        assert_eq!(summary.i64_values(PROMO_COUNT).unwrap(), vec![Some(1); 6]);
    }

    #[test]
    fn layout_round_trips_through_yaml() {
        let layout = promo_block_layout("Report");
        let yaml = serde_yaml::to_string(&layout).unwrap();
        let back: SheetLayout = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, layout);
    }
}
