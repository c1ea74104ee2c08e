// CSV-backed tabular record store.
//
// Each entity lives in one CSV file. Reads normalize the header row to
// snake_case and hand out `Record`s with blanks as empty strings; writes
// rewrite the whole file. The analytics modules only ever see `get_all`.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::{debug, info, warn};

use crate::error::{AppError, Result};
use crate::types::Record;
use crate::util::{format_int, to_snake};

/// Checks a record before it is written. The flag is `true` on create.
pub type Validator = fn(&Record, bool) -> Result<()>;

/// Field-keyed CRUD over one table.
pub trait RecordStore {
    fn get_all(&self) -> Result<Vec<Record>>;
    fn get_by_key(&self, key: &str) -> Result<Record>;
    fn create(&self, record: Record) -> Result<Record>;
    /// Only fields that already exist as columns are changed.
    fn update(&self, key: &str, changes: Record) -> Result<Record>;
    fn delete(&self, key: &str) -> Result<()>;
    /// Insert-or-replace by primary key; returns the number of input rows.
    fn bulk_upsert(&self, records: Vec<Record>) -> Result<usize>;
}

/// In-memory copy of a CSV file: column order plus rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    /// Appends any column of `record` the table does not have yet.
    fn absorb_columns(&mut self, record: &Record) {
        for key in record.keys() {
            if !self.headers.iter().any(|h| h == key) {
                self.headers.push(key.clone());
            }
        }
    }
}

/// Decode file bytes as UTF-8 (BOM stripped), falling back to Latin-1 which
/// maps every byte to a char and therefore never fails.
fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.strip_prefix('\u{feff}').unwrap_or(s).to_string(),
        Err(_) => {
            debug!("file is not valid UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Parse CSV text into a `Table`. Headers go through `to_snake`; when two
/// headers normalize to the same name the first column wins.
pub fn parse_table(text: &str) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let raw_headers = rdr.headers()?.clone();
    let mut seen = HashSet::new();
    let mut columns: Vec<(usize, String)> = Vec::new();
    for (idx, h) in raw_headers.iter().enumerate() {
        let name = to_snake(h);
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.clone()) {
            columns.push((idx, name));
        } else {
            debug!(column = %name, "dropping duplicate column");
        }
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in rdr.records().enumerate() {
        let rec: StringRecord = match result {
            Ok(r) => r,
            Err(e) => {
                skipped += 1;
                warn!(row = line + 1, error = %e, "skipping malformed row");
                continue;
            }
        };
        if rec.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let row: Record = columns
            .iter()
            .map(|(idx, name)| (name.clone(), rec.get(*idx).unwrap_or("").to_string()))
            .collect();
        rows.push(row);
    }
    if skipped > 0 {
        warn!(skipped, "rows skipped while parsing");
    }

    Ok(Table {
        headers: columns.into_iter().map(|(_, name)| name).collect(),
        rows,
    })
}

/// Read any CSV file with the same decoding and header rules as the store.
pub fn read_table(path: &Path) -> Result<Table> {
    let bytes = fs::read(path)?;
    parse_table(&decode(&bytes))
}

pub struct CsvStore {
    path: PathBuf,
    entity: String,
    primary_key: String,
    validator: Option<Validator>,
}

impl CsvStore {
    /// `entity` is the display name used in messages, e.g. `"Engineer"`.
    pub fn new(
        path: impl Into<PathBuf>,
        entity: impl Into<String>,
        primary_key: impl Into<String>,
        validator: Option<Validator>,
    ) -> Self {
        CsvStore {
            path: path.into(),
            entity: entity.into(),
            primary_key: primary_key.into(),
            validator,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn not_found_table(&self) -> AppError {
        AppError::NotFound(format!("{} data not found", self.entity))
    }

    fn not_found_key(&self, key: &str) -> AppError {
        AppError::NotFound(format!(
            "{} with {} {} not found",
            self.entity, self.primary_key, key
        ))
    }

    fn key_of<'a>(&self, row: &'a Record) -> Option<&'a str> {
        row.get(&self.primary_key).map(String::as_str)
    }

    pub fn load(&self) -> Result<Table> {
        if !self.path.exists() {
            return Err(self.not_found_table());
        }
        let table = read_table(&self.path)?;
        info!(
            entity = %self.entity,
            path = %self.path.display(),
            "loaded {} rows",
            format_int(table.rows.len())
        );
        Ok(table)
    }

    /// Like `load`, but a missing file is an empty table.
    fn load_or_empty(&self) -> Result<Table> {
        if self.path.exists() {
            self.load()
        } else {
            Ok(Table::default())
        }
    }

    fn require_key_column(&self, table: &Table) -> Result<()> {
        if table.headers.iter().any(|h| *h == self.primary_key) {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "{} {} column not found in data",
                self.entity, self.primary_key
            )))
        }
    }

    pub fn save(&self, table: &Table) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut wtr = WriterBuilder::new().from_path(&self.path)?;
        wtr.write_record(&table.headers)?;
        for row in &table.rows {
            wtr.write_record(
                table
                    .headers
                    .iter()
                    .map(|h| row.get(h).map(String::as_str).unwrap_or("")),
            )?;
        }
        wtr.flush()?;
        info!(
            entity = %self.entity,
            path = %self.path.display(),
            "saved {} rows",
            format_int(table.rows.len())
        );
        Ok(())
    }
}

impl RecordStore for CsvStore {
    fn get_all(&self) -> Result<Vec<Record>> {
        Ok(self.load()?.rows)
    }

    fn get_by_key(&self, key: &str) -> Result<Record> {
        let table = self.load()?;
        self.require_key_column(&table)?;
        table
            .rows
            .into_iter()
            .find(|r| self.key_of(r) == Some(key))
            .ok_or_else(|| self.not_found_key(key))
    }

    fn create(&self, record: Record) -> Result<Record> {
        if let Some(validate) = self.validator {
            validate(&record, true)?;
        }
        let mut table = self.load_or_empty()?;
        let key = self.key_of(&record).unwrap_or("").to_string();
        if table.rows.iter().any(|r| self.key_of(r) == Some(key.as_str())) {
            return Err(AppError::Validation(format!(
                "{} with this {} already exists",
                self.entity, self.primary_key
            )));
        }
        table.absorb_columns(&record);
        table.rows.push(record.clone());
        self.save(&table)?;
        info!(entity = %self.entity, key = %key, "created");
        Ok(record)
    }

    fn update(&self, key: &str, changes: Record) -> Result<Record> {
        let mut table = self.load()?;
        self.require_key_column(&table)?;
        let headers = table.headers.clone();
        let row = table
            .rows
            .iter_mut()
            .find(|r| r.get(&self.primary_key).map(String::as_str) == Some(key))
            .ok_or_else(|| self.not_found_key(key))?;
        for (field, value) in changes {
            if headers.contains(&field) {
                row.insert(field, value);
            }
        }
        let updated = row.clone();
        self.save(&table)?;
        info!(entity = %self.entity, key, "updated");
        Ok(updated)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut table = self.load()?;
        self.require_key_column(&table)?;
        let before = table.rows.len();
        table.rows.retain(|r| self.key_of(r) != Some(key));
        if table.rows.len() == before {
            return Err(self.not_found_key(key));
        }
        self.save(&table)?;
        info!(entity = %self.entity, key, "deleted");
        Ok(())
    }

    fn bulk_upsert(&self, records: Vec<Record>) -> Result<usize> {
        if records.is_empty() {
            return Err(AppError::Validation("No data provided".to_string()));
        }
        let count = records.len();
        let mut table = self.load_or_empty()?;
        for r in &records {
            table.absorb_columns(r);
        }

        let keyed = table.headers.iter().any(|h| *h == self.primary_key);
        table.rows.extend(records);
        if keyed {
            // Keep the last occurrence of each key, in the position of that
            // last occurrence.
            let mut seen = HashSet::new();
            let mut deduped: Vec<Record> = table
                .rows
                .into_iter()
                .rev()
                .filter(|r| seen.insert(self.key_of(r).unwrap_or("").to_string()))
                .collect();
            deduped.reverse();
            table.rows = deduped;
        }

        self.save(&table)?;
        info!(entity = %self.entity, count, "bulk upserted");
        Ok(count)
    }
}
