pub mod columns;
pub mod layout;
pub mod types;

pub use layout::SheetLayout;
pub use types::{
    CanonicalSchema, Column, ColumnKind, CATEGORY_BLOCK, ENDED_QTY, ENDED_SALES,
    MONTHLY_SUMMARY, YEARLY_SUMMARY,
};
