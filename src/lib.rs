//! Service order analytics for the field-engineer dashboard: CSV-backed
//! tables, time statistics, engineer/customer coverage and the KPI index.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod intelligence;
pub mod kpi;
pub mod leveling;
pub mod normalize;
pub mod output;
pub mod relationships;
pub mod service;
pub mod stats;
pub mod store;
pub mod types;
pub mod util;
pub mod validators;

pub use aggregator::aggregate;
pub use config::{Config, Entity};
pub use error::{AppError, Result};
pub use intelligence::customer_intelligence;
pub use kpi::{KpiCalculator, Period};
pub use leveling::leveling_report;
pub use normalize::normalize_area_group;
pub use relationships::analyze;
pub use service::AnalyticsService;
pub use stats::{engineer_statistics, machine_statistics, stock_statistics};
pub use store::{CsvStore, RecordStore};
