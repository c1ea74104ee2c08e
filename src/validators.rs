//! Field checks applied before entity rows are written.

use tracing::warn;

use crate::config::Entity;
use crate::error::{AppError, Result};
use crate::types::Record;

const MACHINE_STATUSES: &[&str] = &["Active", "Inactive", "Maintenance", "Down"];

fn field<'a>(r: &'a Record, key: &str) -> &'a str {
    r.get(key).map(|v| v.trim()).unwrap_or("")
}

fn invalid(msg: &str) -> AppError {
    AppError::Validation(msg.to_string())
}

fn check_range(r: &Record, key: &str, limit: f64, label: &str) -> Result<()> {
    let raw = field(r, key);
    if raw.is_empty() {
        return Ok(());
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| AppError::Validation(format!("Invalid {} format", label.to_lowercase())))?;
    if !(-limit..=limit).contains(&value) {
        return Err(AppError::Validation(format!(
            "{} must be between -{} and {}",
            label, limit, limit
        )));
    }
    Ok(())
}

pub fn validate_engineer(r: &Record, _is_create: bool) -> Result<()> {
    if field(r, "id").is_empty() || field(r, "name").is_empty() {
        return Err(invalid("ID and name are required"));
    }
    check_range(r, "latitude", 90.0, "Latitude")?;
    check_range(r, "longitude", 180.0, "Longitude")?;
    Ok(())
}

/// An unknown `machine_status` is accepted with a warning.
pub fn validate_machine(r: &Record, _is_create: bool) -> Result<()> {
    if field(r, "wsid").is_empty() {
        return Err(invalid("WSID is required"));
    }
    if field(r, "branch_name").is_empty() {
        return Err(invalid("Branch name is required"));
    }
    let status = field(r, "machine_status");
    if !status.is_empty() && !MACHINE_STATUSES.contains(&status) {
        warn!(status, "unknown machine status");
    }
    Ok(())
}

pub fn validate_stock_part(r: &Record, _is_create: bool) -> Result<()> {
    if field(r, "part_number").is_empty() {
        return Err(invalid("Part number is required"));
    }
    if let Some(raw) = r.get("qty") {
        let qty: i64 = raw
            .trim()
            .parse()
            .map_err(|_| invalid("Invalid quantity format"))?;
        if qty < 0 {
            return Err(invalid("Quantity cannot be negative"));
        }
    }
    Ok(())
}

/// Pre-flight for a bulk import: rows present and the first row carries every
/// required field of the target entity.
pub fn validate_import(records: &[Record], entity: Entity) -> Result<()> {
    let Some(first) = records.first() else {
        return Err(invalid("CSV file is empty"));
    };
    for required in entity.required_fields() {
        if !first.contains_key(*required) {
            return Err(AppError::Validation(format!(
                "Missing required field: {}",
                required
            )));
        }
    }
    Ok(())
}
