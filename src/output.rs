use std::path::Path;

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::error::Result;

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Markdown table of the first `max_rows` rows, as a string.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}\n", title);
    println!("{}\n", render_table(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EngineerAggregate;
    use tempfile::tempdir;

    fn row(name: &str) -> EngineerAggregate {
        EngineerAggregate {
            engineer: name.to_string(),
            avg_response_time: 12.5,
            avg_repair_time: 0.0,
            avg_resolution_time: 40.0,
            count: 3,
        }
    }

    #[test]
    fn test_render_table_limits_rows() {
        let rows = vec![row("Budi"), row("Sari"), row("Andi")];
        let out = render_table(&rows, 2);
        assert!(out.contains("| Engineer"));
        assert!(out.contains("Budi"));
        assert!(out.contains("Sari"));
        assert!(!out.contains("Andi"));
    }

    #[test]
    fn test_render_table_empty() {
        let rows: Vec<EngineerAggregate> = vec![];
        assert_eq!(render_table(&rows, 5), "(no rows)");
    }

    #[test]
    fn test_write_csv_and_json() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("out.csv");
        write_csv(&csv_path, &[row("Budi")]).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert!(text.starts_with("engineer,avg_response_time"));

        let json_path = dir.path().join("out.json");
        write_json(&json_path, &row("Budi")).unwrap();
        let back: EngineerAggregate =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(back, row("Budi"));
    }
}
