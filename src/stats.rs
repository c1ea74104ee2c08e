//! Summary counts over the engineer, machine and stock-part tables, plus the
//! stock lookups (low stock, parts per FSL).

use std::cmp::Ordering;

use crate::error::{AppError, Result};
use crate::types::{
    EngineerStatistics, MachineStatistics, Record, StockStatistics, ValueCounts,
};
use crate::util::{is_blank, parse_f64_safe};

/// Parts with fewer units than this count as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

fn count_by(records: &[Record], column: &str) -> ValueCounts {
    let mut counts = ValueCounts::new();
    for value in records.iter().filter_map(|r| r.get(column)) {
        if is_blank(value) {
            continue;
        }
        *counts.entry(value.trim().to_string()).or_default() += 1;
    }
    counts
}

fn qty(r: &Record) -> Option<f64> {
    parse_f64_safe(r.get("qty").map(String::as_str))
}

fn has_column(records: &[Record], column: &str) -> bool {
    records.iter().any(|r| r.contains_key(column))
}

pub fn engineer_statistics(records: &[Record]) -> EngineerStatistics {
    EngineerStatistics {
        total_engineers: records.len(),
        by_region: count_by(records, "region"),
        by_vendor: count_by(records, "vendor"),
        by_area_group: count_by(records, "area_group"),
    }
}

pub fn machine_statistics(records: &[Record]) -> MachineStatistics {
    MachineStatistics {
        total_machines: records.len(),
        by_region: count_by(records, "region"),
        by_status: count_by(records, "machine_status"),
        by_type: count_by(records, "machine_type"),
    }
}

/// `total_quantity` sums the readable `qty` cells and truncates toward zero.
pub fn stock_statistics(records: &[Record]) -> StockStatistics {
    let quantities: Vec<f64> = records.iter().filter_map(qty).collect();
    StockStatistics {
        total_parts: records.len(),
        total_quantity: quantities.iter().sum::<f64>() as i64,
        by_fsl: count_by(records, "fsl"),
        by_region: count_by(records, "region"),
        low_stock_count: quantities
            .iter()
            .filter(|q| **q < LOW_STOCK_THRESHOLD as f64)
            .count(),
    }
}

/// Parts whose quantity is below `threshold`, fewest first. Rows without a
/// readable `qty` never qualify; equal quantities keep file order.
pub fn low_stock_parts(records: &[Record], threshold: i64) -> Vec<Record> {
    let mut low: Vec<(f64, &Record)> = records
        .iter()
        .filter_map(|r| qty(r).map(|q| (q, r)))
        .filter(|(q, _)| *q < threshold as f64)
        .collect();
    low.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    low.into_iter().map(|(_, r)| r.clone()).collect()
}

/// Parts stocked at one FSL (exact match on the `fsl` cell).
pub fn parts_by_fsl(records: &[Record], fsl: &str) -> Result<Vec<Record>> {
    if !records.is_empty() && !has_column(records, "fsl") {
        return Err(AppError::Validation(
            "FSL column not found in data".to_string(),
        ));
    }
    Ok(records
        .iter()
        .filter(|r| r.get("fsl").is_some_and(|v| v == fsl))
        .cloned()
        .collect())
}
