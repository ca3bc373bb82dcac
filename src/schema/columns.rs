//! Canonical column names. Every sheet variant is renamed onto these once,
//! at load time; nothing downstream looks up a spreadsheet header.

pub const CATEGORY: &str = "category";
pub const PERIOD: &str = "period";
pub const PROMO_NAME: &str = "promo_name";

pub const SALES_AMOUNT: &str = "sales_amount";
pub const NET_SALES: &str = "net_sales";
pub const NOC: &str = "noc";
pub const VISIT_CUSTOMER: &str = "visit_customer";
pub const QTY_PROMO: &str = "qty_promo";
pub const TOTAL_COUNT: &str = "total_count";
pub const TOTAL_CLAIM: &str = "total_claim";

pub const CONTRIBUTION_RATIO: &str = "contribution_ratio";
/// total claim / total count
pub const CONVERSION_CLAIM_COUNT: &str = "conversion_claim_count";
/// total count / NOC
pub const CONVERSION_COUNT_NOC: &str = "conversion_count_noc";
/// NOC / visit customer
pub const CONVERSION_NOC_VISIT: &str = "conversion_noc_visit";

/// Number of promo rows folded into an aggregate group.
pub const PROMO_COUNT: &str = "promo_count";
