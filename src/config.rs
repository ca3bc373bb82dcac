// src/config.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use crate::aggregate::RatioPolicy;
use crate::dashboard::{
    AppContext, DatasetVariant, EndedLayouts, EndedRequest, EndedView, PromoLayouts,
    PromoRequest, PromoView,
};
use crate::process::PeriodDomain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardKind {
    Promo,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewName {
    Yearly,
    Monthly,
    PerPromo,
    PerCategory,
}

/// Replacement sheet layouts for workbooks whose offsets or headers differ
/// from the built-in ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutOverrides {
    #[serde(default)]
    pub promo: Option<PromoLayouts>,
    #[serde(default)]
    pub ended: Option<EndedLayouts>,
}

/// A YAML render request:
///
/// ```yaml
/// workbook: data/Promo_Performance_2025.xlsx
/// dashboard: promo
/// dataset: non_cigarette
/// view: monthly
/// categories: [11, 14]
/// periods: ["January 2025", "February 2025"]
/// export: out/promo.csv
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub workbook: PathBuf,
    pub dashboard: DashboardKind,
    #[serde(default)]
    pub dataset: DatasetVariant,
    /// `yearly` for promo, `per_promo` for ended when absent
    #[serde(default)]
    pub view: Option<ViewName>,
    /// promo categories, or the ended `Sales` tab categories
    #[serde(default)]
    pub categories: Option<BTreeSet<i64>>,
    /// ended `Qty` tab categories
    #[serde(default)]
    pub qty_categories: Option<BTreeSet<i64>>,
    #[serde(default)]
    pub periods: Option<BTreeSet<String>>,
    #[serde(default)]
    pub export: Option<PathBuf>,
    #[serde(default)]
    pub ratio_policy: RatioPolicy,
    /// calendar year of the period labels
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub layouts: LayoutOverrides,
}

/// A validated request for one dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Promo(PromoRequest),
    Ended(EndedRequest),
}

impl RenderRequest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading render request {:?}", path))?;
        let mut request = Self::from_yaml_str(&text)
            .with_context(|| format!("parsing render request {:?}", path))?;
        // a relative workbook path is relative to the request file
        if request.workbook.is_relative() {
            if let Some(dir) = path.parent() {
                request.workbook = dir.join(&request.workbook);
            }
        }
        Ok(request)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Check the view against the dashboard and build its request.
    pub fn job(&self) -> Result<Job> {
        match self.dashboard {
            DashboardKind::Promo => {
                let view = match self.view {
                    None | Some(ViewName::Yearly) => PromoView::Yearly,
                    Some(ViewName::Monthly) => PromoView::Monthly,
                    Some(other) => bail!("view {:?} is not a promo dashboard view", other),
                };
                if self.qty_categories.is_some() {
                    bail!("qty_categories only applies to the ended dashboard");
                }
                Ok(Job::Promo(PromoRequest {
                    variant: self.dataset,
                    view,
                    categories: self.categories.clone(),
                    periods: self.periods.clone(),
                    ratio_policy: self.ratio_policy,
                }))
            }
            DashboardKind::Ended => {
                let view = match self.view {
                    None | Some(ViewName::PerPromo) => EndedView::PerPromo,
                    Some(ViewName::PerCategory) => EndedView::PerCategory,
                    Some(other) => bail!("view {:?} is not an ended promo view", other),
                };
                if self.periods.is_some() {
                    bail!("periods only apply to the monthly promo view");
                }
                Ok(Job::Ended(EndedRequest {
                    view,
                    sales_categories: self.categories.clone(),
                    qty_categories: self.qty_categories.clone(),
                    ratio_policy: self.ratio_policy,
                }))
            }
        }
    }

    pub fn domain(&self) -> PeriodDomain {
        self.year
            .map(PeriodDomain::calendar_year)
            .unwrap_or_default()
    }

    /// Rendering context with this request's domain and layout overrides.
    pub fn context(&self) -> AppContext {
        AppContext::new(
            self.domain(),
            self.layouts.promo.clone().unwrap_or_default(),
            self.layouts.ended.clone().unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{ended, testutil::report_sheet, EndedPromoDataset};
    use crate::schema::layout::{category_block_layout, promo_block_layout};
    use crate::sheet::Workbook;

    #[test]
    fn minimal_promo_request() -> Result<()> {
        let req = RenderRequest::from_yaml_str("workbook: promo.xlsx\ndashboard: promo\n")?;
        assert_eq!(req.job()?, Job::Promo(PromoRequest::default()));
        assert_eq!(req.domain(), PeriodDomain::calendar_year(2025));
        assert!(req.export.is_none());
        Ok(())
    }

    #[test]
    fn full_promo_request() -> Result<()> {
        let yaml = r#"
workbook: promo.xlsx
dashboard: promo
dataset: non_cigarette
view: monthly
categories: [14, 11]
periods: ["March 2026"]
ratio_policy: mean_of_rows
year: 2026
export: out/promo.csv
"#;
        let req = RenderRequest::from_yaml_str(yaml)?;
        let Job::Promo(job) = req.job()? else {
            panic!("expected a promo job");
        };
        assert_eq!(job.variant, DatasetVariant::NonCigarette);
        assert_eq!(job.view, PromoView::Monthly);
        assert_eq!(job.categories, Some([11, 14].into_iter().collect()));
        assert_eq!(job.ratio_policy, RatioPolicy::MeanOfRows);
        assert_eq!(req.domain().labels()[2], "March 2026");
        Ok(())
    }

    #[test]
    fn view_must_match_dashboard() -> Result<()> {
        let req = RenderRequest::from_yaml_str(
            "workbook: a.xlsx\ndashboard: ended\nview: monthly\n",
        )?;
        assert!(req.job().is_err());
        let req = RenderRequest::from_yaml_str(
            "workbook: a.xlsx\ndashboard: promo\nview: per_category\n",
        )?;
        assert!(req.job().is_err());
        assert!(RenderRequest::from_yaml_str("workbook: a.xlsx\ndashboard: weekly\n").is_err());
        Ok(())
    }

    #[test]
    fn ended_layout_override_from_yaml() -> Result<()> {
        let overrides = LayoutOverrides {
            promo: None,
            ended: Some(EndedLayouts {
                sales: promo_block_layout("Report"),
                qty: promo_block_layout("Report"),
                category_block: Some(category_block_layout("Report")),
            }),
        };
        let mut req = RenderRequest::from_yaml_str(
            "workbook: ended.xlsx\ndashboard: ended\nview: per_category\nqty_categories: [17]\n",
        )?;
        req.layouts = overrides.clone();
        let back = RenderRequest::from_yaml_str(&serde_yaml::to_string(&req)?)?;
        assert_eq!(back.layouts, overrides);

        // the overridden layouts load and render from a single report sheet
        let ctx = back.context();
        let wb = Workbook::from_sheets([("Report", report_sheet())]);
        let dataset = EndedPromoDataset::load(&wb, &ctx.ended_layouts)?;
        assert_eq!(dataset.sales().num_rows(), 15);
        assert_eq!(dataset.category_block().map(|t| t.num_rows()), Some(6));

        let Job::Ended(job) = back.job()? else {
            panic!("expected an ended job");
        };
        assert_eq!(job.view, EndedView::PerCategory);
        assert_eq!(job.qty_categories, Some([17].into_iter().collect()));
        let report = ended::render(&dataset, &job)?;
        assert_eq!(report.sales.map(|t| t.data.num_rows()), Some(6));
        assert_eq!(report.qty.map(|t| t.data.num_rows()), Some(1));
        Ok(())
    }

    #[test]
    fn load_resolves_workbook_next_to_request() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("request.yaml");
        fs::write(&path, "workbook: promo.xlsx\ndashboard: promo\n")?;
        let req = RenderRequest::load(&path)?;
        assert_eq!(req.workbook, dir.path().join("promo.xlsx"));
        assert!(RenderRequest::load(&dir.path().join("missing.yaml")).is_err());
        Ok(())
    }
}
