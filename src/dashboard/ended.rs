// src/dashboard/ended.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, instrument};

use super::{category_labels, slices, Kpi, Series, Slice};
use crate::aggregate::{aggregate, column_total, derive_ratio, Agg, AggOp, GroupKey, RatioPolicy};
use crate::error::{DashError, Result};
use crate::filter::{self, categories_in, Filtered, Selection};
use crate::format::{format_compact_currency, format_count, format_currency, format_percent, CompactScale};
use crate::schema::columns::*;
use crate::schema::layout::{ended_qty_layout, ended_sales_layout};
use crate::schema::{SheetLayout, CATEGORY_BLOCK, ENDED_QTY, ENDED_SALES};
use crate::sheet::Workbook;
use crate::table::Table;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndedView {
    #[default]
    PerPromo,
    PerCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TabKind {
    Sales,
    Qty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndedLayouts {
    pub sales: SheetLayout,
    pub qty: SheetLayout,
    /// pre-aggregated sales figures per category, when the workbook has them
    #[serde(default)]
    pub category_block: Option<SheetLayout>,
}

impl Default for EndedLayouts {
    fn default() -> Self {
        Self {
            sales: ended_sales_layout(),
            qty: ended_qty_layout(),
            category_block: None,
        }
    }
}

/// Per-promo rows of the `Sales` and `Qty` sheets, in sheet order, plus the
/// workbook's own per-category sales block if one was laid out.
#[derive(Debug, Clone)]
pub struct EndedPromoDataset {
    sales: Table,
    qty: Table,
    category_block: Option<Table>,
}

impl EndedPromoDataset {
    #[instrument(level = "info", skip_all)]
    pub fn load(workbook: &Workbook, layouts: &EndedLayouts) -> Result<Self> {
        let sales = layouts.sales.load(workbook, &ENDED_SALES)?;
        let qty = layouts.qty.load(workbook, &ENDED_QTY)?;
        let category_block = layouts
            .category_block
            .as_ref()
            .map(|layout| layout.load(workbook, &CATEGORY_BLOCK))
            .transpose()?;
        info!(
            sales = sales.num_rows(),
            qty = qty.num_rows(),
            category_block = category_block.as_ref().map(Table::num_rows),
            "ended promo dataset loaded"
        );
        Ok(Self {
            sales,
            qty,
            category_block,
        })
    }

    pub fn sales(&self) -> &Table {
        &self.sales
    }

    pub fn qty(&self) -> &Table {
        &self.qty
    }

    pub fn category_block(&self) -> Option<&Table> {
        self.category_block.as_ref()
    }
}

/// One render of the ended promo dashboard; each tab has its own category
/// set, absent meaning every category present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndedRequest {
    #[serde(default)]
    pub view: EndedView,
    #[serde(default)]
    pub sales_categories: Option<BTreeSet<i64>>,
    #[serde(default)]
    pub qty_categories: Option<BTreeSet<i64>>,
    #[serde(default)]
    pub ratio_policy: RatioPolicy,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndedTab {
    pub kind: TabKind,
    pub kpis: Vec<Kpi>,
    /// sales tab only
    pub sales_ranking: Option<Series>,
    pub claim_count_ranking: Series,
    pub count_noc_ranking: Series,
    /// sales tab only
    pub contribution_share: Option<Vec<Slice>>,
    /// one row per promo or per category, with conversions derived
    #[serde(skip)]
    pub data: Table,
}

/// A tab is `None` when its category selection matched nothing.
#[derive(Debug, Clone, Serialize)]
pub struct EndedReport {
    pub view: EndedView,
    pub sales: Option<EndedTab>,
    pub qty: Option<EndedTab>,
}

#[instrument(level = "info", skip_all, fields(view = ?request.view))]
pub fn render(dataset: &EndedPromoDataset, request: &EndedRequest) -> Result<EndedReport> {
    let sales = select(dataset.sales(), request.sales_categories.as_ref())?;
    let qty = select(dataset.qty(), request.qty_categories.as_ref())?;
    if sales.is_empty() && qty.is_empty() {
        return Err(DashError::EmptyResultSet);
    }

    // the per-category sales view reads the workbook's block when present
    let sales_summary = match (request.view, dataset.category_block()) {
        (EndedView::PerCategory, Some(block)) => {
            match select(block, request.sales_categories.as_ref())? {
                Filtered::Rows(t) => Some(with_conversions(&t)?),
                Filtered::Empty(_) => None,
            }
        }
        _ => None,
    };

    let tab_for = |filtered: Filtered, kind: TabKind| -> Result<Option<EndedTab>> {
        let summary = match kind {
            TabKind::Sales => sales_summary.as_ref(),
            TabKind::Qty => None,
        };
        match filtered {
            Filtered::Rows(t) => Ok(Some(tab(
                &t,
                summary,
                kind,
                request.view,
                request.ratio_policy,
            )?)),
            Filtered::Empty(_) => {
                info!(?kind, "no rows for the selected categories");
                Ok(None)
            }
        }
    };

    Ok(EndedReport {
        view: request.view,
        sales: tab_for(sales, TabKind::Sales)?,
        qty: tab_for(qty, TabKind::Qty)?,
    })
}

fn select(table: &Table, categories: Option<&BTreeSet<i64>>) -> Result<Filtered> {
    let categories = match categories {
        Some(set) => set.clone(),
        None => categories_in(table)?,
    };
    filter::apply(table, &Selection::new(categories))
}

/// `summary`, when given, stands in for the per-category fold of `filtered`.
fn tab(
    filtered: &Table,
    summary: Option<&Table>,
    kind: TabKind,
    view: EndedView,
    policy: RatioPolicy,
) -> Result<EndedTab> {
    let by_category = match summary {
        Some(t) => t.clone(),
        None => per_category(filtered, kind)?,
    };
    let (data, labels) = match view {
        EndedView::PerPromo => {
            let data = with_conversions(filtered)?;
            let labels = data
                .utf8_values(PROMO_NAME)?
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect::<Vec<_>>();
            (data, labels)
        }
        EndedView::PerCategory => {
            let labels = category_labels("Category", &by_category.i64_values(CATEGORY)?);
            (by_category.clone(), labels)
        }
    };

    // 1) KPI cards
    let mut kpis = Vec::with_capacity(4);
    if kind == TabKind::Sales {
        kpis.push(Kpi::new(
            "Total Sales Amount",
            column_total(&data, SALES_AMOUNT, AggOp::Sum)?,
            format_currency,
        ));
    }
    let promo_count = match view {
        EndedView::PerPromo => data.num_rows() as i64,
        EndedView::PerCategory => data.i64_values(PROMO_COUNT)?.into_iter().flatten().sum(),
    };
    kpis.push(Kpi::new("Total Promo", Some(promo_count as f64), format_count));
    kpis.push(Kpi::new(
        "Conversion Claim/Count",
        policy.resolve_opt(&data, TOTAL_CLAIM, TOTAL_COUNT)?,
        |v| format_percent(v, 2),
    ));
    // NOC repeats on every promo of a category; pool it once per category
    let noc_basis = match policy {
        RatioPolicy::SumThenDivide => &by_category,
        RatioPolicy::MeanOfRows => &data,
    };
    kpis.push(Kpi::new(
        "Conversion Count/NOC",
        policy.resolve_opt(noc_basis, TOTAL_COUNT, NOC)?,
        |v| format_percent(v, 4),
    ));

    // 2) rankings, ascending
    let sales_ranking = match kind {
        TabKind::Sales => Some(
            Series::new("Sales Amount", &labels, &data.f64_values(SALES_AMOUNT)?, |v| {
                format_compact_currency(v, CompactScale::FINE)
            })
            .sorted_ascending(),
        ),
        TabKind::Qty => None,
    };
    let claim_count_ranking = Series::new(
        "Conversion Claim/Count",
        &labels,
        &data.f64_values(CONVERSION_CLAIM_COUNT)?,
        |v| format_percent(v, 2),
    )
    .sorted_ascending();
    let count_noc_ranking = Series::new(
        "Conversion Count/NOC",
        &labels,
        &data.f64_values(CONVERSION_COUNT_NOC)?,
        |v| format_percent(v, 4),
    )
    .sorted_ascending();

    // 3) contribution share
    let contribution_share = match kind {
        TabKind::Sales => Some(slices(&Series::new(
            "Contribution Sales",
            &labels,
            &data.f64_values(CONTRIBUTION_RATIO)?,
            |v| format_percent(v, 2),
        ))),
        TabKind::Qty => None,
    };

    Ok(EndedTab {
        kind,
        kpis,
        sales_ranking,
        claim_count_ranking,
        count_noc_ranking,
        contribution_share,
        data,
    })
}

/// Fold promos into one row per category. NOC and net sales are category
/// figures repeated on every promo row, so the first one is taken.
pub fn per_category(table: &Table, kind: TabKind) -> Result<Table> {
    let mut aggs = vec![
        Agg::count(PROMO_NAME).alias(PROMO_COUNT),
        Agg::sum(TOTAL_COUNT),
        Agg::sum(TOTAL_CLAIM),
        Agg::first(NOC),
    ];
    if kind == TabKind::Sales {
        aggs.extend([
            Agg::sum(SALES_AMOUNT),
            Agg::first(NET_SALES),
            Agg::sum(CONTRIBUTION_RATIO),
        ]);
    }
    with_conversions(&aggregate(table, GroupKey::Category, &aggs)?)
}

/// (Re)derive both conversion columns from the raw measures.
fn with_conversions(table: &Table) -> Result<Table> {
    let table = derive_ratio(table, TOTAL_CLAIM, TOTAL_COUNT, CONVERSION_CLAIM_COUNT)?;
    derive_ratio(&table, TOTAL_COUNT, NOC, CONVERSION_COUNT_NOC)
}
