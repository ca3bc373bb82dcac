pub mod aggregate;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod filter;
pub mod format;
pub mod process;
pub mod schema;
pub mod sheet;
pub mod table;

pub use error::{DashError, Result};
pub use table::Table;
