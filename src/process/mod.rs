// src/process/mod.rs
pub mod convert;
pub mod normalize;
pub mod order;
pub mod utils;

pub use convert::{coerce_columns, NumericKind};
pub use normalize::{normalize, NormalizeSpec};
pub use order::{order_by_category, order_by_period, PeriodDomain};
