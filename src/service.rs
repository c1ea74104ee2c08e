//! Request-level operations: load the right tables, run the analytics, and
//! turn load failures into the error kinds callers expect.

use chrono::NaiveDateTime;
use tracing::{error, info};

use crate::aggregator::aggregate;
use crate::config::{Config, Entity};
use crate::error::{AppError, Result};
use crate::intelligence::customer_intelligence;
use crate::kpi::{KpiCalculator, Period};
use crate::leveling::leveling_report;
use crate::relationships::analyze;
use crate::stats::{
    engineer_statistics, low_stock_parts, machine_statistics, parts_by_fsl, stock_statistics,
};
use crate::store::RecordStore;
use crate::types::{
    AggregateResult, CompetencyFlags, CustomerIntelligence, EntityStatistics, KpiOutcome,
    LevelingRow, QualitativeScores, Record, RelationshipResult,
};
use crate::util::parse_datetime_safe;
use crate::validators::validate_import;

/// Comma-separated month names, each trimmed. Blank entries are dropped and
/// an all-blank list means "no filter".
pub fn parse_months(raw: &str) -> Option<Vec<String>> {
    let months: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if months.is_empty() {
        None
    } else {
        Some(months)
    }
}

/// Optional date bound from user input; unparseable text is a client error.
pub fn parse_date_arg(raw: Option<&str>, label: &str) -> Result<Option<NaiveDateTime>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_datetime_safe(Some(s))
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid {} date: {}", label, s))),
    }
}

/// Parse a JSON object of competency flags, e.g. `{"SR": 1, "EDC": 1}`.
pub fn parse_competency(raw: &str) -> Result<CompetencyFlags> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Validation(format!("Invalid competency flags: {}", e)))
}

/// Parse a JSON object of qualitative scores; missing keys keep defaults.
pub fn parse_qualitative(raw: &str) -> Result<QualitativeScores> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Validation(format!("Invalid qualitative scores: {}", e)))
}

pub struct AnalyticsService {
    config: Config,
}

impl AnalyticsService {
    pub fn new(config: Config) -> Self {
        AnalyticsService { config }
    }

    /// Client-facing errors pass through; anything else becomes a
    /// `Processing` failure with the cause kept in the chain.
    fn load(&self, entity: Entity, context: &str) -> Result<Vec<Record>> {
        self.config
            .store(entity)
            .get_all()
            .map_err(|e| match e {
                AppError::NotFound(_) | AppError::Validation(_) => e,
                other => {
                    error!(error = %other, entity = entity.label(), "failed to load table");
                    AppError::processing(context, other)
                }
            })
    }

    pub fn engineer_stats(&self, months: Option<&str>) -> Result<AggregateResult> {
        let records = self.load(Entity::ServiceOrder, "processing SO data")?;
        let months = months.and_then(parse_months);
        Ok(aggregate(&records, months.as_deref()))
    }

    pub fn relationships(&self) -> Result<RelationshipResult> {
        let records = self.load(Entity::ServiceOrder, "analyzing engineer relationships")?;
        Ok(analyze(&records))
    }

    pub fn customer_intelligence(&self) -> Result<CustomerIntelligence> {
        let records = self.load(Entity::ServiceOrder, "building customer intelligence")?;
        Ok(customer_intelligence(&records))
    }

    pub fn engineer_kpi(
        &self,
        ce_id: &str,
        start: Option<&str>,
        end: Option<&str>,
        competency: Option<CompetencyFlags>,
        qualitative: Option<QualitativeScores>,
    ) -> Result<KpiOutcome> {
        if ce_id.trim().is_empty() {
            return Err(AppError::Validation("Engineer id is required".to_string()));
        }
        let period = Period::new(parse_date_arg(start, "start")?, parse_date_arg(end, "end")?);
        let orders = self.load(Entity::ServiceOrder, "calculating KPI")?;
        let engineers = self.load(Entity::Engineer, "calculating KPI")?;
        let calc = KpiCalculator::new(&orders, &engineers);
        Ok(calc.calculate_kpi_for_engineer(ce_id, period, competency, qualitative))
    }

    pub fn leveling(&self, start: Option<&str>, end: Option<&str>) -> Result<Vec<LevelingRow>> {
        let period = Period::new(parse_date_arg(start, "start")?, parse_date_arg(end, "end")?);
        let orders = self.load(Entity::ServiceOrder, "building leveling report")?;
        let engineers = self.load(Entity::Engineer, "building leveling report")?;
        Ok(leveling_report(&orders, &engineers, period))
    }

    /// Summary counts for the engineer, machine or stock-part table.
    pub fn statistics(&self, entity: Entity) -> Result<EntityStatistics> {
        let context = "computing statistics";
        let stats = match entity {
            Entity::Engineer => EntityStatistics::Engineer(engineer_statistics(
                &self.load(entity, context)?,
            )),
            Entity::Machine => {
                EntityStatistics::Machine(machine_statistics(&self.load(entity, context)?))
            }
            Entity::StockPart => {
                EntityStatistics::StockPart(stock_statistics(&self.load(entity, context)?))
            }
            Entity::ServiceOrder => {
                return Err(AppError::Validation(
                    "Statistics are not available for service orders".to_string(),
                ))
            }
        };
        Ok(stats)
    }

    pub fn low_stock_parts(&self, threshold: i64) -> Result<Vec<Record>> {
        let parts = self.load(Entity::StockPart, "listing low stock parts")?;
        Ok(low_stock_parts(&parts, threshold))
    }

    pub fn parts_by_fsl(&self, fsl: &str) -> Result<Vec<Record>> {
        let parts = self.load(Entity::StockPart, "listing parts by FSL")?;
        parts_by_fsl(&parts, fsl)
    }

    /// Bulk import of already-parsed rows into one table.
    pub fn import(&self, entity: Entity, records: Vec<Record>) -> Result<usize> {
        validate_import(&records, entity)?;
        let count = self.config.store(entity).bulk_upsert(records)?;
        info!(entity = entity.label(), count, "import finished");
        Ok(count)
    }
}
