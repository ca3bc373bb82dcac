//! Dashboard pipelines: load → filter → aggregate → format.
//!
//! Each dashboard produces a plain serializable report (KPI cards, chart
//! series, pivot grids) plus the filtered table it was computed from.
//! Drawing is left to whoever consumes the report.

pub mod ended;
pub mod promo;

use serde::Serialize;
use std::{cmp::Ordering, path::Path, sync::Arc};

use crate::cache::WorkbookCache;
use crate::error::Result;
use crate::format::or_dash;
use crate::process::PeriodDomain;
use crate::sheet::Workbook;

pub use ended::{EndedLayouts, EndedPromoDataset, EndedReport, EndedRequest, EndedView};
pub use promo::{DatasetVariant, PromoDataset, PromoLayouts, PromoReport, PromoRequest, PromoView};

/// One headline figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub label: String,
    pub value: Option<f64>,
    pub display: String,
}

impl Kpi {
    pub fn new(label: &str, value: Option<f64>, fmt: impl FnOnce(f64) -> String) -> Self {
        Self {
            label: label.to_string(),
            value,
            display: or_dash(value, fmt),
        }
    }
}

/// One labelled value on a chart axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub label: String,
    pub value: Option<f64>,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<Point>,
}

impl Series {
    /// Zip `labels` with `values`, formatting each present value with `fmt`.
    pub fn new(
        name: &str,
        labels: &[String],
        values: &[Option<f64>],
        fmt: impl Fn(f64) -> String,
    ) -> Self {
        let points = labels
            .iter()
            .zip(values)
            .map(|(label, &value)| Point {
                label: label.clone(),
                value,
                display: or_dash(value, &fmt),
            })
            .collect();
        Self {
            name: name.to_string(),
            points,
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Ascending by value, stable; missing values sort last.
    pub fn sorted_ascending(mut self) -> Self {
        self.points.sort_by(|a, b| match (a.value, b.value) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        self
    }

    /// The `n` largest present values, descending. Ties keep input order.
    pub fn top(mut self, n: usize) -> Self {
        self.points.retain(|p| p.value.is_some());
        self.points
            .sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
        self.points.truncate(n);
        self
    }
}

/// A part of a whole, for pie and donut charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: Option<f64>,
    /// fraction of the present total
    pub share: Option<f64>,
    /// share as a percentage with two decimals
    pub display: String,
}

/// Shares of each point of `series` in the sum of its present values.
pub fn slices(series: &Series) -> Vec<Slice> {
    let total: f64 = series.points.iter().filter_map(|p| p.value).sum();
    series
        .points
        .iter()
        .map(|p| {
            let share = crate::aggregate::ratio(p.value, Some(total));
            Slice {
                label: p.label.clone(),
                value: p.value,
                share,
                display: or_dash(share, |s| crate::format::format_percent(s, 2)),
            }
        })
        .collect()
}

pub(crate) fn category_labels(prefix: &str, categories: &[Option<i64>]) -> Vec<String> {
    categories
        .iter()
        .map(|c| match c {
            Some(c) => format!("{} {}", prefix, c),
            None => prefix.to_string(),
        })
        .collect()
}

/// Shared state for rendering dashboards: the period domain, the sheet
/// layouts, and one dataset cache per dashboard.
#[derive(Debug, Default)]
pub struct AppContext {
    pub domain: PeriodDomain,
    pub promo_layouts: PromoLayouts,
    pub ended_layouts: EndedLayouts,
    promo_cache: WorkbookCache<PromoDataset>,
    ended_cache: WorkbookCache<EndedPromoDataset>,
}

impl AppContext {
    pub fn new(
        domain: PeriodDomain,
        promo_layouts: PromoLayouts,
        ended_layouts: EndedLayouts,
    ) -> Self {
        Self {
            domain,
            promo_layouts,
            ended_layouts,
            promo_cache: WorkbookCache::new(),
            ended_cache: WorkbookCache::new(),
        }
    }

    pub fn promo_dataset(&self, path: &Path) -> Result<Arc<PromoDataset>> {
        self.promo_cache.get_or_load(path, |p| {
            let workbook = Workbook::open(p)?;
            PromoDataset::load(&workbook, &self.promo_layouts, &self.domain)
        })
    }

    pub fn ended_dataset(&self, path: &Path) -> Result<Arc<EndedPromoDataset>> {
        self.ended_cache.get_or_load(path, |p| {
            let workbook = Workbook::open(p)?;
            EndedPromoDataset::load(&workbook, &self.ended_layouts)
        })
    }

    /// Forget everything loaded from `path`. Returns whether anything was cached.
    pub fn invalidate(&self, path: &Path) -> bool {
        let promo = self.promo_cache.invalidate(path);
        let ended = self.ended_cache.invalidate(path);
        promo || ended
    }

    pub fn clear(&self) {
        self.promo_cache.clear();
        self.ended_cache.clear();
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use calamine::{Data, Range};
    use tracing_subscriber::{fmt, EnvFilter};

    pub fn init_test_logging() {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,promodash=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    pub fn s(v: &str) -> Data {
        Data::String(v.to_owned())
    }

    pub fn f(v: f64) -> Data {
        Data::Float(v)
    }

    /// A report sheet: title rows, per-promo block at rows 6..22, gap, then
    /// six categories in the per-category block at rows 26..33.
    pub fn report_sheet() -> Range<Data> {
        let mut range: Range<Data> = Range::new((0, 0), (32, 10));
        range.set_value((0, 0), s("Final Summary Ended Promo"));
        for c in 0..11u32 {
            range.set_value((6, c), s(&format!("H{}", c)));
        }
        let cats = [11.0, 14.0, 17.0, 19.0, 21.0, 26.0, 27.0];
        for r in 7..22u32 {
            let cat = cats[(r as usize - 7) % cats.len()];
            range.set_value((r, 0), f((r - 6) as f64));
            range.set_value((r, 1), f(cat));
            range.set_value((r, 2), s(&format!("Promo {}", r - 6)));
            for c in 3..11u32 {
                range.set_value((r, c), f(1.0 + c as f64));
            }
        }
        for c in 0..10u32 {
            range.set_value((26, c), s(&format!("C{}", c)));
        }
        // six categories fill the block's data rows 27..33
        for (i, cat) in cats.iter().take(6).enumerate() {
            let r = 27 + i as u32;
            range.set_value((r, 0), f(*cat));
            for c in 1..10u32 {
                range.set_value((r, c), f(c as f64));
            }
        }
        range
    }

    /// A sheet with `headers` on row 0 and `rows` below it.
    pub fn sheet(headers: &[&str], rows: &[Vec<Data>]) -> Range<Data> {
        let width = headers.len().max(1) as u32;
        let mut range: Range<Data> = Range::new((0, 0), (rows.len() as u32, width - 1));
        for (c, h) in headers.iter().enumerate() {
            range.set_value((0, c as u32), s(h));
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                range.set_value((r as u32 + 1, c as u32), cell.clone());
            }
        }
        range
    }
}
