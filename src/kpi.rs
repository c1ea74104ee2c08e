//! Engineer KPI index.
//!
//! Five sub-scores, each on a 0-5 index with a fixed weight, combine into a
//! total achievement percentage and a leveling verdict:
//!
//! | dimension       | weight |
//! |-----------------|--------|
//! | productivity    | 40     |
//! | response time   | 25     |
//! | resolution time | 25     |
//! | competency      | 15     |
//! | qualitative     | 20     |
//!
//! Only closed service orders inside the assessment window count. The
//! weights, zone limits and targets below are business constants.

use std::collections::HashSet;

use chrono::{Local, NaiveDateTime};

use crate::types::{
    CompetencyFlags, CompetencyKpi, EngineerKpi, KpiOutcome, ProductivityKpi, QualitativeKpi,
    QualitativeScores, Record, ResolutionTimeKpi, ResponseTimeKpi, ServiceOrder, TotalKpi,
};
use crate::util::{
    average, format_percent, minutes_to_hhmm, minutes_to_hhmmss, parse_percent, round2,
    round_score,
};

pub const WEIGHT_PRODUCTIVITY: f64 = 40.0;
pub const WEIGHT_RESPONSE_TIME: f64 = 25.0;
pub const WEIGHT_RESOLUTION_TIME: f64 = 25.0;
pub const WEIGHT_COMPETENCY: f64 = 15.0;
pub const WEIGHT_QUALITATIVE: f64 = 20.0;

/// Closed SOs per assessment period that count as 100% productivity. There
/// is no per-engineer target source, so every engineer shares this one.
pub const PRODUCTIVITY_TARGET_SO: f64 = 500.0;

/// Response-time zone upper limits, in minutes (inclusive).
pub const ZONE_1_MAX_MINUTES: f64 = 90.0;
pub const ZONE_2_MAX_MINUTES: f64 = 180.0;
pub const ZONE_3_MAX_MINUTES: f64 = 1440.0;

/// Average resolution time (minutes) that earns the full index.
pub const RESOLUTION_TARGET_MINUTES: f64 = 60.0;

/// Average qualitative score treated as 100%.
pub const QUALITATIVE_TARGET_SCORE: f64 = 93.5;

const MAX_INDEX: f64 = 5.0;

/// Blend of sub-indices into the quantitative index.
const QUANTITATIVE_MIX: [f64; 4] = [0.4, 0.25, 0.25, 0.15];

/// Service-level bucket for a CE response time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// Up to 1.5 hours.
    One,
    /// Over 1.5 and up to 3 hours.
    Two,
    /// Over 3 and up to 24 hours.
    Three,
}

impl Zone {
    /// `None` for non-positive times and anything beyond 24 hours.
    pub fn classify(minutes: f64) -> Option<Zone> {
        if minutes <= 0.0 || !minutes.is_finite() {
            None
        } else if minutes <= ZONE_1_MAX_MINUTES {
            Some(Zone::One)
        } else if minutes <= ZONE_2_MAX_MINUTES {
            Some(Zone::Two)
        } else if minutes <= ZONE_3_MAX_MINUTES {
            Some(Zone::Three)
        } else {
            None
        }
    }

    fn weight(self) -> f64 {
        match self {
            Zone::One => 1.0,
            Zone::Two => 0.5,
            Zone::Three => 0.25,
        }
    }
}

/// Result and assessment labels for a total achievement percentage.
pub fn verdict(total_achievement: f64) -> (&'static str, &'static str) {
    if total_achievement >= 95.0 {
        let assessment = if total_achievement >= 98.0 {
            "Stay"
        } else {
            "Level Up"
        };
        ("Sangat Baik", assessment)
    } else if total_achievement >= 85.0 {
        ("Baik", "Stay")
    } else if total_achievement >= 70.0 {
        ("Cukup", "Review")
    } else {
        ("Kurang", "Training")
    }
}

/// Assessment window on the `created` timestamp. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Period {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl Period {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Period { start, end }
    }

    /// Rows without a parseable `created` only pass an unbounded window.
    fn contains(&self, created: Option<NaiveDateTime>) -> bool {
        match created {
            Some(ts) => {
                self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
            }
            None => self.start.is_none() && self.end.is_none(),
        }
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_uppercase()
}

/// Non-blank distinct values of one column.
fn distinct<'a, F>(orders: &[&'a ServiceOrder], field: F) -> usize
where
    F: Fn(&'a ServiceOrder) -> &'a String,
{
    orders
        .iter()
        .map(|so| field(*so))
        .filter(|v| !v.is_empty())
        .collect::<HashSet<_>>()
        .len()
}

pub struct KpiCalculator {
    orders: Vec<ServiceOrder>,
    engineers: Vec<Record>,
}

impl KpiCalculator {
    /// `so_records` rows need `ce_id`, `so_status` and `created`; engineer rows
    /// are matched on `id`.
    pub fn new(so_records: &[Record], engineer_records: &[Record]) -> Self {
        KpiCalculator {
            orders: so_records.iter().map(ServiceOrder::from_record).collect(),
            engineers: engineer_records.to_vec(),
        }
    }

    /// Distinct engineer ids present in the SO table, in first-seen order.
    pub fn engineer_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.orders
            .iter()
            .filter(|so| !so.ce_id.is_empty())
            .filter(|so| seen.insert(normalize_id(&so.ce_id)))
            .map(|so| so.ce_id.clone())
            .collect()
    }

    fn closed_orders(&self, ce_id: &str, period: Period) -> Vec<&ServiceOrder> {
        let id = normalize_id(ce_id);
        self.orders
            .iter()
            .filter(|so| normalize_id(&so.ce_id) == id)
            .filter(|so| period.contains(so.created))
            .filter(|so| so.status.eq_ignore_ascii_case("close"))
            .collect()
    }

    pub fn productivity(&self, ce_id: &str, period: Period) -> ProductivityKpi {
        let closed = self.closed_orders(ce_id, period);
        let total_machine = distinct(&closed, |so| &so.wsid);
        let total_ce_area = distinct(&closed, |so| &so.area_group);
        let total_so_area = distinct(&closed, |so| &so.branch_name);
        let total_so_individual = closed.len();

        let so_area_per_ce_area = if total_ce_area > 0 {
            total_so_area as f64 / total_ce_area as f64
        } else {
            0.0
        };
        let percentage = total_so_individual as f64 / PRODUCTIVITY_TARGET_SO * 100.0;
        let index = (percentage / 100.0 * MAX_INDEX).min(MAX_INDEX);
        let achievement = (percentage / 100.0 * WEIGHT_PRODUCTIVITY).min(WEIGHT_PRODUCTIVITY);

        ProductivityKpi {
            total_machine,
            total_ce_area,
            total_so_area,
            so_area_per_ce_area: round2(so_area_per_ce_area),
            total_so_individual,
            index: round2(index),
            score: round_score(index),
            percentage: format_percent(percentage),
            kpi_achievement: format_percent(achievement),
        }
    }

    pub fn response_time(&self, ce_id: &str, period: Period) -> ResponseTimeKpi {
        let times: Vec<f64> = self
            .closed_orders(ce_id, period)
            .iter()
            .filter_map(|so| so.response_time)
            .filter(|t| *t > 0.0)
            .collect();

        let mut minutes = [0.0f64; 3];
        let mut counts = [0usize; 3];
        let mut weighted = 0.0;
        for &t in &times {
            if let Some(zone) = Zone::classify(t) {
                let slot = zone as usize;
                minutes[slot] += t;
                counts[slot] += 1;
                weighted += zone.weight();
            }
        }

        // Times beyond zone 3 still count in the denominator.
        let index = if times.is_empty() {
            0.0
        } else {
            weighted / times.len() as f64 * MAX_INDEX
        };
        let percentage = index / MAX_INDEX * 100.0;
        let achievement = percentage / 100.0 * WEIGHT_RESPONSE_TIME;
        let flag = |on: bool| if on { 1.0 } else { 0.0 };

        ResponseTimeKpi {
            zone_1_time: minutes_to_hhmm(minutes[0]),
            zone_2_time: minutes_to_hhmm(minutes[1]),
            zone_3_time: minutes_to_hhmm(minutes[2]),
            zone_1_index: flag(counts[0] > counts[1] + counts[2]),
            zone_2_index: flag(counts[1] > counts[2]),
            zone_3_index: flag(counts[2] > 0),
            index: round2(index),
            score: round_score(index),
            percentage: format_percent(percentage),
            kpi_achievement: format_percent(achievement),
        }
    }

    pub fn resolution_time(&self, ce_id: &str, period: Period) -> ResolutionTimeKpi {
        let times: Vec<f64> = self
            .closed_orders(ce_id, period)
            .iter()
            .filter_map(|so| so.resolution_time)
            .filter(|t| *t > 0.0)
            .collect();
        let avg = average(&times);

        // Lower is better: hitting the target (or beating it) earns full marks.
        let (index, percentage) = if avg > 0.0 {
            let ratio = RESOLUTION_TARGET_MINUTES / avg;
            ((ratio * MAX_INDEX).min(MAX_INDEX), (ratio * 100.0).min(100.0))
        } else {
            (0.0, 0.0)
        };
        let achievement = percentage / 100.0 * WEIGHT_RESOLUTION_TIME;

        ResolutionTimeKpi {
            resolution_time: minutes_to_hhmmss(avg),
            index: round2(index),
            score: round_score(index),
            percentage: format_percent(percentage),
            kpi_achievement: format_percent(achievement),
        }
    }

    pub fn competency(flags: Option<CompetencyFlags>) -> CompetencyKpi {
        let flags = flags.unwrap_or_default();
        let share = flags.mastered() as f64 / CompetencyFlags::TOTAL_TOOLS as f64;
        let percentage = share * 100.0;
        let index = share * MAX_INDEX;
        CompetencyKpi {
            flags,
            index: round2(index),
            score: round_score(index),
            percentage: format_percent(percentage),
            kpi_achievement: format_percent(percentage / 100.0 * WEIGHT_COMPETENCY),
        }
    }

    pub fn qualitative(scores: Option<QualitativeScores>) -> QualitativeKpi {
        let scores = scores.unwrap_or_default();
        let avg = average(&scores.values());
        let percentage = avg / QUALITATIVE_TARGET_SCORE * 100.0;
        let index = (avg / 100.0 * MAX_INDEX).min(MAX_INDEX);
        QualitativeKpi {
            scores,
            index: round2(index),
            // The qualitative score stays on the 0-100 scale.
            score: round_score(avg),
            percentage: format_percent(percentage),
            kpi_achievement: format_percent(percentage / 100.0 * WEIGHT_QUALITATIVE),
        }
    }

    /// Sums the five achievements at their published two-decimal precision.
    pub fn total(
        productivity: &ProductivityKpi,
        response_time: &ResponseTimeKpi,
        resolution_time: &ResolutionTimeKpi,
        competency: &CompetencyKpi,
        qualitative: &QualitativeKpi,
    ) -> TotalKpi {
        let total_achievement: f64 = [
            &productivity.kpi_achievement,
            &response_time.kpi_achievement,
            &resolution_time.kpi_achievement,
            &competency.kpi_achievement,
            &qualitative.kpi_achievement,
        ]
        .iter()
        .map(|s| parse_percent(s))
        .sum();

        let indices = [
            productivity.index,
            response_time.index,
            resolution_time.index,
            competency.index,
        ];
        let quantitative_index: f64 = indices
            .iter()
            .zip(QUANTITATIVE_MIX.iter())
            .map(|(i, w)| i * w)
            .sum();

        let (result, assessment) = verdict(total_achievement);
        TotalKpi {
            quantitative_index: round2(quantitative_index),
            qualitative_score: qualitative.score as f64,
            total_kpi_achievement: format_percent(total_achievement),
            result: result.to_string(),
            assessment: assessment.to_string(),
        }
    }

    /// Full KPI sheet for one engineer. Unknown ids yield
    /// [`KpiOutcome::NotFound`] rather than an error.
    pub fn calculate_kpi_for_engineer(
        &self,
        ce_id: &str,
        period: Period,
        competency: Option<CompetencyFlags>,
        qualitative: Option<QualitativeScores>,
    ) -> KpiOutcome {
        let id = normalize_id(ce_id);
        let Some(engineer) = self
            .engineers
            .iter()
            .find(|r| r.get("id").map(|v| normalize_id(v)) == Some(id.clone()))
        else {
            return KpiOutcome::NotFound {
                error: format!("Engineer {} not found", ce_id),
            };
        };
        let field = |key: &str| engineer.get(key).cloned().unwrap_or_default();

        let productivity = self.productivity(ce_id, period);
        let response_time = self.response_time(ce_id, period);
        let resolution_time = self.resolution_time(ce_id, period);
        let competency = Self::competency(competency);
        let qualitative = Self::qualitative(qualitative);
        let total = Self::total(
            &productivity,
            &response_time,
            &resolution_time,
            &competency,
            &qualitative,
        );

        let assessment_date = period
            .end
            .map(|e| e.date())
            .unwrap_or_else(|| Local::now().date_naive())
            .format("%d-%b-%y")
            .to_string();

        KpiOutcome::Found(Box::new(EngineerKpi {
            name: field("name"),
            ce_id: ce_id.to_string(),
            role: field("role"),
            area_group: field("area_group"),
            region: field("region"),
            vendor: field("vendor"),
            join_date: field("join_date"),
            assessment_date,
            productivity,
            response_time,
            resolution_time,
            competency,
            qualitative,
            total,
        }))
    }
}
