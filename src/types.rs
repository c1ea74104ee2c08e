use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::normalize::normalize_area_group;
use crate::util::{parse_datetime_safe, parse_f64_safe};

/// One CSV row keyed by snake_case column name. Blank cells are `""`.
pub type Record = BTreeMap<String, String>;

/// Typed view over a service order row. Built per read; the source record is
/// never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOrder {
    pub so_number: String,
    pub engineer: String,
    pub ce_id: String,
    pub customer: String,
    /// Already passed through `normalize_area_group`.
    pub area_group: String,
    pub region: String,
    /// `None` when the row has no month column at all.
    pub month: Option<String>,
    pub response_time: Option<f64>,
    pub repair_time: Option<f64>,
    pub resolution_time: Option<f64>,
    pub status: String,
    pub created: Option<NaiveDateTime>,
    pub wsid: String,
    pub branch_name: String,
    pub service_type: String,
}

impl ServiceOrder {
    pub fn from_record(r: &Record) -> Self {
        let text = |key: &str| r.get(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let number = |key: &str| parse_f64_safe(r.get(key).map(String::as_str));
        ServiceOrder {
            so_number: text("so_number"),
            engineer: text("engineer"),
            ce_id: text("ce_id"),
            customer: text("customer"),
            area_group: normalize_area_group(r.get("area_group").map(String::as_str).unwrap_or("")),
            region: text("region"),
            month: r.get("month").or_else(|| r.get("Month")).map(|m| m.trim().to_string()),
            response_time: number("ce_response_time"),
            repair_time: number("repair_time"),
            resolution_time: number("resolution_time"),
            status: text("so_status"),
            created: parse_datetime_safe(r.get("created").map(String::as_str)),
            wsid: text("wsid"),
            branch_name: text("branch_name"),
            service_type: text("service_type"),
        }
    }

    /// At least one of the three time metrics is a usable positive value.
    pub fn has_positive_time(&self) -> bool {
        [self.response_time, self.repair_time, self.resolution_time]
            .iter()
            .any(|t| matches!(t, Some(v) if *v > 0.0))
    }
}

// ---------------------------------------------------------------------------
// SO aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct EngineerAggregate {
    #[tabled(rename = "Engineer")]
    pub engineer: String,
    #[tabled(rename = "AvgResponse")]
    pub avg_response_time: f64,
    #[tabled(rename = "AvgRepair")]
    pub avg_repair_time: f64,
    #[tabled(rename = "AvgResolution")]
    pub avg_resolution_time: f64,
    #[tabled(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketAggregate {
    pub avg_response_time: f64,
    pub avg_repair_time: f64,
    pub avg_resolution_time: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub avg_by_engineer: Vec<EngineerAggregate>,
    pub avg_response_time_overall: f64,
    pub avg_repair_time_overall: f64,
    pub avg_resolution_time_overall: f64,
    pub total_so: usize,
    pub total_engineers: usize,
    pub by_month: BTreeMap<String, BucketAggregate>,
    pub by_region: BTreeMap<String, BucketAggregate>,
    pub by_area: BTreeMap<String, BucketAggregate>,
}

// ---------------------------------------------------------------------------
// Engineer / customer relationships
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineerCustomerPair {
    pub engineer: String,
    pub customer: String,
    pub so_count: usize,
    pub avg_resolution_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub avg_customers_per_engineer: f64,
    pub avg_engineers_per_customer: f64,
    pub max_customers_per_engineer: usize,
    pub max_engineers_per_customer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleEngineerCustomer {
    pub customer: String,
    pub engineer: String,
    pub so_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub single_engineer_customers: Vec<SingleEngineerCustomer>,
    pub risk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineerDiversity {
    pub engineer: String,
    pub customer_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerCoverage {
    pub customer: String,
    pub engineer_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipResult {
    pub total_engineers: usize,
    pub total_customers: usize,
    pub total_so: usize,
    pub engineer_customer_matrix: Vec<EngineerCustomerPair>,
    pub top_pairs: Vec<EngineerCustomerPair>,
    pub coverage_stats: CoverageStats,
    pub risk_analysis: RiskAnalysis,
    pub top_diverse_engineers: Vec<EngineerDiversity>,
    pub top_covered_customers: Vec<CustomerCoverage>,
}

// ---------------------------------------------------------------------------
// Customer intelligence (per area group)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaGroupSummary {
    pub name: String,
    pub total_so: usize,
    pub customers: Vec<String>,
    pub customer_count: usize,
    pub service_types: Vec<String>,
    pub service_type_count: usize,
    pub region: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerIntelligence {
    pub total_so: usize,
    pub total_customers: usize,
    pub total_area_groups: usize,
    pub area_groups: Vec<AreaGroupSummary>,
    pub top_5_area_groups: Vec<AreaGroupSummary>,
}

// ---------------------------------------------------------------------------
// KPI index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductivityKpi {
    pub total_machine: usize,
    pub total_ce_area: usize,
    pub total_so_area: usize,
    pub so_area_per_ce_area: f64,
    pub total_so_individual: usize,
    pub index: f64,
    pub score: i64,
    pub percentage: String,
    pub kpi_achievement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTimeKpi {
    #[serde(rename = "zona_1_time")]
    pub zone_1_time: String,
    #[serde(rename = "zona_2_time")]
    pub zone_2_time: String,
    #[serde(rename = "zona_3_time")]
    pub zone_3_time: String,
    #[serde(rename = "zona_1_index")]
    pub zone_1_index: f64,
    #[serde(rename = "zona_2_index")]
    pub zone_2_index: f64,
    #[serde(rename = "zona_3_index")]
    pub zone_3_index: f64,
    pub index: f64,
    pub score: i64,
    pub percentage: String,
    pub kpi_achievement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionTimeKpi {
    pub resolution_time: String,
    pub index: f64,
    pub score: i64,
    pub percentage: String,
    pub kpi_achievement: String,
}

/// Tool mastery flags, 1 = mastered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyFlags {
    #[serde(rename = "SR", default)]
    pub sr: u8,
    #[serde(rename = "VS", default)]
    pub vs: u8,
    #[serde(rename = "TCR", default)]
    pub tcr: u8,
    #[serde(rename = "CASHSHOTER", default)]
    pub cashshoter: u8,
    #[serde(rename = "EDC", default)]
    pub edc: u8,
    #[serde(rename = "UPS", default)]
    pub ups: u8,
    #[serde(rename = "POS", default)]
    pub pos: u8,
    #[serde(rename = "MOBILE_APP", default)]
    pub mobile_app: u8,
}

impl CompetencyFlags {
    pub const TOTAL_TOOLS: usize = 8;

    pub fn mastered(&self) -> usize {
        [
            self.sr,
            self.vs,
            self.tcr,
            self.cashshoter,
            self.edc,
            self.ups,
            self.pos,
            self.mobile_app,
        ]
        .iter()
        .filter(|&&v| v == 1)
        .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyKpi {
    #[serde(flatten)]
    pub flags: CompetencyFlags,
    pub index: f64,
    pub score: i64,
    pub percentage: String,
    pub kpi_achievement: String,
}

/// Supervisor assessment on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitativeScores {
    pub analytical_thinking: f64,
    pub communication_coordination: f64,
    pub sop: f64,
    pub team_work: f64,
    pub innovation_willing_to_learn: f64,
    pub baby_parts_usage: f64,
}

impl Default for QualitativeScores {
    fn default() -> Self {
        QualitativeScores {
            analytical_thinking: 75.0,
            communication_coordination: 75.0,
            sop: 80.0,
            team_work: 80.0,
            innovation_willing_to_learn: 75.0,
            baby_parts_usage: 100.0,
        }
    }
}

impl QualitativeScores {
    pub fn values(&self) -> [f64; 6] {
        [
            self.analytical_thinking,
            self.communication_coordination,
            self.sop,
            self.team_work,
            self.innovation_willing_to_learn,
            self.baby_parts_usage,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitativeKpi {
    #[serde(flatten)]
    pub scores: QualitativeScores,
    pub index: f64,
    pub score: i64,
    pub percentage: String,
    pub kpi_achievement: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalKpi {
    pub quantitative_index: f64,
    pub qualitative_score: f64,
    pub total_kpi_achievement: String,
    pub result: String,
    pub assessment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineerKpi {
    pub name: String,
    pub ce_id: String,
    pub role: String,
    pub area_group: String,
    pub region: String,
    pub vendor: String,
    pub join_date: String,
    pub assessment_date: String,
    pub productivity: ProductivityKpi,
    pub response_time: ResponseTimeKpi,
    pub resolution_time: ResolutionTimeKpi,
    pub competency: CompetencyKpi,
    pub qualitative: QualitativeKpi,
    pub total: TotalKpi,
}

/// KPI lookup outcome. An unknown engineer is an ordinary answer for the
/// dashboard, serialized as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KpiOutcome {
    Found(Box<EngineerKpi>),
    NotFound { error: String },
}

// ---------------------------------------------------------------------------
// Entity table statistics
// ---------------------------------------------------------------------------

/// Value -> row count for one column. Blank cells are not counted.
pub type ValueCounts = BTreeMap<String, usize>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineerStatistics {
    pub total_engineers: usize,
    pub by_region: ValueCounts,
    pub by_vendor: ValueCounts,
    pub by_area_group: ValueCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStatistics {
    pub total_machines: usize,
    pub by_region: ValueCounts,
    pub by_status: ValueCounts,
    pub by_type: ValueCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockStatistics {
    pub total_parts: usize,
    pub total_quantity: i64,
    pub by_fsl: ValueCounts,
    pub by_region: ValueCounts,
    pub low_stock_count: usize,
}

/// Statistics for whichever table was asked for; serializes as the inner
/// struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntityStatistics {
    Engineer(EngineerStatistics),
    Machine(MachineStatistics),
    StockPart(StockStatistics),
}

// ---------------------------------------------------------------------------
// Leveling export
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Clone)]
pub struct LevelingRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "CE Id")]
    pub ce_id: String,
    #[serde(rename = "Role")]
    pub role: String,
    #[serde(rename = "Area Group")]
    pub area_group: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "Join Date")]
    pub join_date: String,
    #[serde(rename = "Assessment Date")]
    pub assessment_date: String,

    #[serde(rename = "Total Machine")]
    pub total_machine: usize,
    #[serde(rename = "Total CE Area")]
    pub total_ce_area: usize,
    #[serde(rename = "Total SO Area")]
    pub total_so_area: usize,
    #[serde(rename = "SO Area / CE Area")]
    pub so_area_per_ce_area: f64,
    #[serde(rename = "Total SO Individual")]
    pub total_so_individual: usize,
    #[serde(rename = "Productivity Index")]
    pub productivity_index: f64,
    #[serde(rename = "Productivity Score")]
    pub productivity_score: i64,
    #[serde(rename = "Productivity Percentage")]
    pub productivity_percentage: String,
    #[serde(rename = "Productivity KPI")]
    pub productivity_kpi: String,

    #[serde(rename = "Zona 1 Time")]
    pub zone_1_time: String,
    #[serde(rename = "Zona 2 Time")]
    pub zone_2_time: String,
    #[serde(rename = "Zona 3 Time")]
    pub zone_3_time: String,
    #[serde(rename = "Response Time Index")]
    pub response_time_index: f64,
    #[serde(rename = "Response Time Score")]
    pub response_time_score: i64,
    #[serde(rename = "Response Time Percentage")]
    pub response_time_percentage: String,
    #[serde(rename = "Response Time KPI")]
    pub response_time_kpi: String,

    #[serde(rename = "Resolution Time")]
    pub resolution_time: String,
    #[serde(rename = "Resolution Time Index")]
    pub resolution_time_index: f64,
    #[serde(rename = "Resolution Time Score")]
    pub resolution_time_score: i64,
    #[serde(rename = "Resolution Time Percentage")]
    pub resolution_time_percentage: String,
    #[serde(rename = "Resolution Time KPI")]
    pub resolution_time_kpi: String,

    #[serde(rename = "SR")]
    pub sr: u8,
    #[serde(rename = "VS")]
    pub vs: u8,
    #[serde(rename = "TCR")]
    pub tcr: u8,
    #[serde(rename = "CASHSHOTER")]
    pub cashshoter: u8,
    #[serde(rename = "EDC")]
    pub edc: u8,
    #[serde(rename = "UPS")]
    pub ups: u8,
    #[serde(rename = "POS")]
    pub pos: u8,
    #[serde(rename = "MOBILE APP")]
    pub mobile_app: u8,
    #[serde(rename = "Competency Index")]
    pub competency_index: f64,
    #[serde(rename = "Competency Score")]
    pub competency_score: i64,
    #[serde(rename = "Competency Percentage")]
    pub competency_percentage: String,
    #[serde(rename = "Competency KPI")]
    pub competency_kpi: String,

    #[serde(rename = "Analytical Thinking")]
    pub analytical_thinking: f64,
    #[serde(rename = "Communication & Coordination")]
    pub communication_coordination: f64,
    #[serde(rename = "SOP")]
    pub sop: f64,
    #[serde(rename = "Team Work")]
    pub team_work: f64,
    #[serde(rename = "Innovation & Willing to Learn")]
    pub innovation_willing_to_learn: f64,
    #[serde(rename = "BABY PARTS Usage")]
    pub baby_parts_usage: f64,
    #[serde(rename = "Qualitative Index")]
    pub qualitative_index: f64,
    #[serde(rename = "Qualitative Score")]
    pub qualitative_score: i64,
    #[serde(rename = "Qualitative Percentage")]
    pub qualitative_percentage: String,
    #[serde(rename = "Qualitative KPI")]
    pub qualitative_kpi: String,

    #[serde(rename = "Quantitative Index")]
    pub quantitative_index: f64,
    #[serde(rename = "Total KPI Achievement")]
    pub total_kpi_achievement: String,
    #[serde(rename = "Result")]
    pub result: String,
    #[serde(rename = "Assessment")]
    pub assessment: String,
}

/// Console preview of the leveling export; the full row is too wide to print.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LevelingPreviewRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "CE Id")]
    pub ce_id: String,
    #[tabled(rename = "Quantitative Index")]
    pub quantitative_index: f64,
    #[tabled(rename = "Total KPI Achievement")]
    pub total_kpi_achievement: String,
    #[tabled(rename = "Result")]
    pub result: String,
    #[tabled(rename = "Assessment")]
    pub assessment: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_service_order_from_record() {
        let r = record(&[
            ("so_number", "SO-1"),
            ("engineer", " Budi "),
            ("area_group", "jakarat 2"),
            ("ce_response_time", "45"),
            ("repair_time", "nan"),
            ("resolution_time", ""),
            ("created", "2024-04-02 10:00:00"),
        ]);
        let so = ServiceOrder::from_record(&r);
        assert_eq!(so.engineer, "Budi");
        assert_eq!(so.area_group, "Jakarta 2");
        assert_eq!(so.response_time, Some(45.0));
        assert_eq!(so.repair_time, None);
        assert_eq!(so.resolution_time, None);
        assert_eq!(so.month, None);
        assert!(so.created.is_some());
        assert!(so.has_positive_time());
    }

    #[test]
    fn test_has_positive_time_all_zero() {
        let r = record(&[
            ("ce_response_time", "0"),
            ("repair_time", "0"),
            ("resolution_time", "-5"),
        ]);
        assert!(!ServiceOrder::from_record(&r).has_positive_time());
    }

    #[test]
    fn test_competency_mastered_counts_ones_only() {
        let flags = CompetencyFlags {
            sr: 1,
            vs: 1,
            tcr: 2,
            ..Default::default()
        };
        assert_eq!(flags.mastered(), 2);
    }

    #[test]
    fn test_competency_serde_names() {
        let flags: CompetencyFlags =
            serde_json::from_str(r#"{"SR": 1, "MOBILE_APP": 1}"#).unwrap();
        assert_eq!(flags.sr, 1);
        assert_eq!(flags.mobile_app, 1);
        assert_eq!(flags.mastered(), 2);
    }

    #[test]
    fn test_qualitative_partial_json_uses_defaults() {
        let scores: QualitativeScores = serde_json::from_str(r#"{"sop": 90}"#).unwrap();
        assert_eq!(scores.sop, 90.0);
        assert_eq!(scores.baby_parts_usage, 100.0);
    }

    #[test]
    fn test_kpi_outcome_not_found_shape() {
        let outcome = KpiOutcome::NotFound {
            error: "Engineer X not found".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "Engineer X not found");
    }
}
