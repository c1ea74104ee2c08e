use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AppError;
use crate::store::{CsvStore, Validator};
use crate::validators::{validate_engineer, validate_machine, validate_stock_part};

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DATA_DIR_ENV: &str = "SO_DATA_DIR";

/// The CSV-backed tables the dashboard reads and edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Engineer,
    Machine,
    StockPart,
    ServiceOrder,
}

impl Entity {
    pub fn file_name(self) -> &'static str {
        match self {
            Entity::Engineer => "data_ce.csv",
            Entity::Machine => "data_mesin.csv",
            Entity::StockPart => "stok_part.csv",
            Entity::ServiceOrder => "so_apr_spt.csv",
        }
    }

    pub fn primary_key(self) -> &'static str {
        match self {
            Entity::Engineer => "id",
            Entity::Machine => "wsid",
            Entity::StockPart => "part_number",
            Entity::ServiceOrder => "so_number",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Entity::Engineer => "Engineer",
            Entity::Machine => "Machine",
            Entity::StockPart => "Stock part",
            Entity::ServiceOrder => "Service order",
        }
    }

    /// Service orders are imported as-is.
    pub fn validator(self) -> Option<Validator> {
        match self {
            Entity::Engineer => Some(validate_engineer),
            Entity::Machine => Some(validate_machine),
            Entity::StockPart => Some(validate_stock_part),
            Entity::ServiceOrder => None,
        }
    }

    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Entity::Engineer => &["id", "name"],
            Entity::Machine => &["wsid", "branch_name"],
            Entity::StockPart => &["part_number"],
            Entity::ServiceOrder => &["so_number"],
        }
    }
}

/// Import data-type names as used by the upload form.
impl FromStr for Entity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "engineers" => Ok(Entity::Engineer),
            "machines" => Ok(Entity::Machine),
            "stock-parts" => Ok(Entity::StockPart),
            "service-orders" => Ok(Entity::ServiceOrder),
            other => Err(AppError::Validation(format!("Unknown data type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, entity: Entity) -> PathBuf {
        self.data_dir.join(entity.file_name())
    }

    pub fn store(&self, entity: Entity) -> CsvStore {
        CsvStore::new(
            self.path_for(entity),
            entity.label(),
            entity.primary_key(),
            entity.validator(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_under_data_dir() {
        let cfg = Config::new("/srv/dash");
        assert_eq!(
            cfg.path_for(Entity::ServiceOrder),
            PathBuf::from("/srv/dash/so_apr_spt.csv")
        );
        assert_eq!(cfg.store(Entity::Machine).primary_key(), "wsid");
    }

    #[test]
    fn test_default_dir() {
        assert_eq!(Config::default().data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!("stock-parts".parse::<Entity>().unwrap(), Entity::StockPart);
        let err = "widgets".parse::<Entity>().unwrap_err();
        assert_eq!(err.public_message(), "Unknown data type: widgets");
    }
}
