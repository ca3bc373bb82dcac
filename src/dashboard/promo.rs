// src/dashboard/promo.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument};

use super::{category_labels, slices, Kpi, Point, Series, Slice};
use crate::aggregate::{aggregate, column_total, derive_ratio, ratio, Agg, AggOp, GroupKey, RatioPolicy};
use crate::error::Result;
use crate::export::export_file_name;
use crate::filter::{self, categories_in, Selection};
use crate::format::{
    format_compact_currency, format_count, format_currency, format_number, format_percent,
    CompactScale,
};
use crate::process::order::{month_label, short_month_label};
use crate::process::{order_by_category, order_by_period, PeriodDomain};
use crate::schema::columns::*;
use crate::schema::layout::summary_layout;
use crate::schema::{SheetLayout, MONTHLY_SUMMARY, YEARLY_SUMMARY};
use crate::sheet::Workbook;
use crate::table::Table;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetVariant {
    #[default]
    All,
    NonCigarette,
}

impl DatasetVariant {
    pub fn display_name(self) -> &'static str {
        match self {
            DatasetVariant::All => "Summary All",
            DatasetVariant::NonCigarette => "Summary Non Cigarette",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoView {
    #[default]
    Yearly,
    Monthly,
}

impl PromoView {
    pub fn display_name(self) -> &'static str {
        match self {
            PromoView::Yearly => "Yearly",
            PromoView::Monthly => "Monthly",
        }
    }
}

/// Where the four summary tables live in a promo performance workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoLayouts {
    pub all_year: SheetLayout,
    pub all_month: SheetLayout,
    pub non_cig_year: SheetLayout,
    pub non_cig_month: SheetLayout,
}

impl Default for PromoLayouts {
    fn default() -> Self {
        Self {
            all_year: summary_layout("Summary All (Year)"),
            all_month: summary_layout("Summary All (Month)"),
            non_cig_year: summary_layout("Summary Non Cigarette (Year)"),
            non_cig_month: summary_layout("Summary Non Cigarette (Month)"),
        }
    }
}

/// The four summary tables, normalized once. Yearly tables are ordered by
/// category, monthly tables by category then month.
#[derive(Debug, Clone)]
pub struct PromoDataset {
    all_year: Table,
    all_month: Table,
    non_cig_year: Table,
    non_cig_month: Table,
}

impl PromoDataset {
    #[instrument(level = "info", skip_all)]
    pub fn load(workbook: &Workbook, layouts: &PromoLayouts, domain: &PeriodDomain) -> Result<Self> {
        let yearly = |layout: &SheetLayout| -> Result<Table> {
            order_by_category(&layout.load(workbook, &YEARLY_SUMMARY)?)
        };
        let monthly = |layout: &SheetLayout| -> Result<Table> {
            order_by_period(&layout.load(workbook, &MONTHLY_SUMMARY)?, domain)
        };

        let dataset = Self {
            all_year: yearly(&layouts.all_year)?,
            all_month: monthly(&layouts.all_month)?,
            non_cig_year: yearly(&layouts.non_cig_year)?,
            non_cig_month: monthly(&layouts.non_cig_month)?,
        };
        info!(
            all_year = dataset.all_year.num_rows(),
            all_month = dataset.all_month.num_rows(),
            non_cig_year = dataset.non_cig_year.num_rows(),
            non_cig_month = dataset.non_cig_month.num_rows(),
            "promo dataset loaded"
        );
        Ok(dataset)
    }

    pub fn table(&self, variant: DatasetVariant, view: PromoView) -> &Table {
        match (variant, view) {
            (DatasetVariant::All, PromoView::Yearly) => &self.all_year,
            (DatasetVariant::All, PromoView::Monthly) => &self.all_month,
            (DatasetVariant::NonCigarette, PromoView::Yearly) => &self.non_cig_year,
            (DatasetVariant::NonCigarette, PromoView::Monthly) => &self.non_cig_month,
        }
    }
}

/// One render of the promo performance dashboard. Absent inclusion sets
/// select every value present in the table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoRequest {
    #[serde(default)]
    pub variant: DatasetVariant,
    #[serde(default)]
    pub view: PromoView,
    #[serde(default)]
    pub categories: Option<BTreeSet<i64>>,
    /// monthly view only
    #[serde(default)]
    pub periods: Option<BTreeSet<String>>,
    #[serde(default)]
    pub ratio_policy: RatioPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionSummary {
    pub average: Option<f64>,
    pub max: Option<Point>,
    pub min: Option<Point>,
}

/// Category × month grid. `values[r][c]` belongs to `rows[r]`, `columns[c]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
    /// empty string for a missing cell
    pub labels: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromoReport {
    pub variant: DatasetVariant,
    pub view: PromoView,
    pub categories: Vec<i64>,
    pub kpis: Vec<Kpi>,
    pub sales: Series,
    pub contribution: Series,
    pub noc: Series,
    pub visit_customer: Series,
    pub conversion: Series,
    pub conversion_summary: ConversionSummary,
    pub sales_distribution: Vec<Slice>,
    pub qty_promo: Series,
    pub heatmap: Option<Heatmap>,
    pub top_sales: Series,
    pub top_noc: Series,
    pub top_contribution: Series,
    pub export_name: String,
    /// the filtered rows every figure above was computed from
    #[serde(skip)]
    pub data: Table,
}

#[instrument(level = "info", skip_all, fields(variant = ?request.variant, view = ?request.view))]
pub fn render(dataset: &PromoDataset, request: &PromoRequest, domain: &PeriodDomain) -> Result<PromoReport> {
    let policy = request.ratio_policy;
    let source = dataset.table(request.variant, request.view);

    // 1) filter
    let categories = match &request.categories {
        Some(set) => set.clone(),
        None => categories_in(source)?,
    };
    let mut selection = Selection::new(categories);
    if request.view == PromoView::Monthly {
        selection.periods = request.periods.clone();
    }
    let data = filter::apply(source, &selection)?.require_rows()?;

    // 2) headline figures
    let kpis = vec![
        Kpi::new(
            "Total Sales Amount",
            column_total(&data, SALES_AMOUNT, AggOp::Sum)?,
            format_currency,
        ),
        Kpi::new("Total NOC", column_total(&data, NOC, AggOp::Sum)?, format_number),
        Kpi::new(
            "Total Qty Promo",
            column_total(&data, QTY_PROMO, AggOp::Sum)?,
            format_count,
        ),
        Kpi::new("Contribution", contribution_total(&data, policy)?, |v| {
            format_percent(v, 2)
        }),
        Kpi::new(
            "Total Net Sales",
            column_total(&data, NET_SALES, AggOp::Sum)?,
            format_currency,
        ),
    ];

    // 3) series along the x axis: months or categories
    let key = match request.view {
        PromoView::Monthly => GroupKey::Period(domain),
        PromoView::Yearly => GroupKey::Category,
    };
    let grouped = aggregate(&data, key, &measure_aggs())?;
    let grouped = derive_ratio(&grouped, NOC, VISIT_CUSTOMER, CONVERSION_NOC_VISIT)?;
    let x: Vec<String> = match request.view {
        PromoView::Monthly => grouped
            .utf8_values(PERIOD)?
            .iter()
            .map(|p| p.as_deref().map(month_label).unwrap_or_default())
            .collect(),
        PromoView::Yearly => category_labels("Cat", &grouped.i64_values(CATEGORY)?),
    };

    let sales = Series::new("Sales Amount", &x, &grouped.f64_values(SALES_AMOUNT)?, |v| {
        format_compact_currency(v, CompactScale::COARSE)
    });
    let contribution = Series::new(
        "Contribution",
        &x,
        &group_contribution(&grouped, policy)?,
        |v| format_percent(v, 2),
    );
    let noc = Series::new("NOC", &x, &grouped.f64_values(NOC)?, format_number);
    let visit_customer = Series::new(
        "Visit Customer",
        &x,
        &grouped.f64_values(VISIT_CUSTOMER)?,
        format_number,
    );
    let conversion = Series::new(
        "Conversion NOC/Visit",
        &x,
        &grouped.f64_values(CONVERSION_NOC_VISIT)?,
        |v| format_percent(v, 2),
    );
    let conversion_summary = summarize(&conversion);

    // 4) per-category breakdowns
    let by_category = aggregate(&data, GroupKey::Category, &measure_aggs())?;
    let cats = category_labels("Cat", &by_category.i64_values(CATEGORY)?);

    let category_sales = Series::new(
        "Sales Amount",
        &cats,
        &by_category.f64_values(SALES_AMOUNT)?,
        |v| format_compact_currency(v, CompactScale::COARSE),
    );
    let sales_distribution = slices(&category_sales);
    let qty_promo = Series::new(
        "Qty Promo",
        &cats,
        &by_category.f64_values(QTY_PROMO)?,
        format_count,
    )
    .sorted_ascending();
    let top_sales = category_sales.top(3);
    let top_noc = Series::new("NOC", &cats, &by_category.f64_values(NOC)?, format_number).top(3);
    let top_contribution = Series::new(
        "Contribution",
        &cats,
        &group_contribution(&by_category, policy)?,
        |v| format_percent(v, 2),
    )
    .top(3);

    // 5) monthly grid
    let heatmap = match request.view {
        PromoView::Monthly => Some(heatmap(&data, domain)?),
        PromoView::Yearly => None,
    };

    let export_name = export_file_name(
        "promo_data",
        &[request.variant.display_name(), request.view.display_name()],
    );
    info!(rows = data.num_rows(), groups = grouped.num_rows(), "promo report rendered");

    Ok(PromoReport {
        variant: request.variant,
        view: request.view,
        categories: selection.categories.into_iter().collect(),
        kpis,
        sales,
        contribution,
        noc,
        visit_customer,
        conversion,
        conversion_summary,
        sales_distribution,
        qty_promo,
        heatmap,
        top_sales,
        top_noc,
        top_contribution,
        export_name,
        data,
    })
}

/// NOC is summed but visit customer averaged: visits are a per-store
/// figure repeated on every row of a group.
fn measure_aggs() -> Vec<Agg> {
    vec![
        Agg::sum(SALES_AMOUNT),
        Agg::sum(NET_SALES),
        Agg::mean(CONTRIBUTION_RATIO),
        Agg::sum(NOC),
        Agg::mean(VISIT_CUSTOMER),
        Agg::sum(QTY_PROMO),
    ]
}

/// Contribution of promo sales to net sales over every row of `table`.
/// Sales and net sales are pooled separately; see [`RatioPolicy::resolve`].
fn contribution_total(table: &Table, policy: RatioPolicy) -> Result<Option<f64>> {
    match policy {
        RatioPolicy::SumThenDivide => policy.resolve_opt(table, SALES_AMOUNT, NET_SALES),
        RatioPolicy::MeanOfRows => column_total(table, CONTRIBUTION_RATIO, AggOp::Mean),
    }
}

/// Contribution per row of an aggregated table built with [`measure_aggs`].
fn group_contribution(grouped: &Table, policy: RatioPolicy) -> Result<Vec<Option<f64>>> {
    match policy {
        RatioPolicy::SumThenDivide => {
            let sales = grouped.f64_values(SALES_AMOUNT)?;
            let net = grouped.f64_values(NET_SALES)?;
            Ok(sales.into_iter().zip(net).map(|(s, n)| ratio(s, n)).collect())
        }
        RatioPolicy::MeanOfRows => grouped.f64_values(CONTRIBUTION_RATIO),
    }
}

/// Average, highest and lowest point; missing points are skipped and the
/// first of equal extremes wins.
pub fn summarize(series: &Series) -> ConversionSummary {
    let present: Vec<(&Point, f64)> = series
        .points
        .iter()
        .filter_map(|p| p.value.map(|v| (p, v)))
        .collect();

    let average = if present.is_empty() {
        None
    } else {
        Some(present.iter().map(|(_, v)| v).sum::<f64>() / present.len() as f64)
    };

    let mut max: Option<(&Point, f64)> = None;
    let mut min: Option<(&Point, f64)> = None;
    for &(p, v) in &present {
        if max.map_or(true, |(_, m)| v > m) {
            max = Some((p, v));
        }
        if min.map_or(true, |(_, m)| v < m) {
            min = Some((p, v));
        }
    }

    ConversionSummary {
        average,
        max: max.map(|(p, _)| p.clone()),
        min: min.map(|(p, _)| p.clone()),
    }
}

/// Sales per category and month. Columns are the months present in
/// `table`, in domain order.
fn heatmap(table: &Table, domain: &PeriodDomain) -> Result<Heatmap> {
    let cells = aggregate(
        table,
        GroupKey::CategoryPeriod(domain),
        &[Agg::sum(SALES_AMOUNT)],
    )?;
    let cats = cells.i64_values(CATEGORY)?;
    let periods = cells.utf8_values(PERIOD)?;
    let sales = cells.f64_values(SALES_AMOUNT)?;

    let months: BTreeSet<usize> = periods
        .iter()
        .flatten()
        .filter_map(|p| domain.ordinal(p))
        .collect();
    let months: Vec<usize> = months.into_iter().collect();
    let rows: BTreeSet<i64> = cats.iter().flatten().copied().collect();

    let mut grid: BTreeMap<(i64, usize), Option<f64>> = BTreeMap::new();
    for ((cat, period), value) in cats.iter().zip(&periods).zip(&sales) {
        if let (Some(cat), Some(ord)) = (cat, period.as_deref().and_then(|p| domain.ordinal(p))) {
            grid.insert((*cat, ord), *value);
        }
    }

    let values: Vec<Vec<Option<f64>>> = rows
        .iter()
        .map(|cat| {
            months
                .iter()
                .map(|m| grid.get(&(*cat, *m)).copied().flatten())
                .collect()
        })
        .collect();
    let labels: Vec<Vec<String>> = values
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| {
                    v.map(|v| format_compact_currency(v, CompactScale::COARSE))
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    Ok(Heatmap {
        rows: rows.iter().map(|c| format!("Cat {}", c)).collect(),
        columns: months
            .iter()
            .map(|&m| short_month_label(&domain.labels()[m]))
            .collect(),
        values,
        labels,
    })
}
