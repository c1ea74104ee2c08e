//! Batch KPI sheet for every engineer that appears in the SO data.

use tracing::{info, warn};

use crate::kpi::{KpiCalculator, Period};
use crate::types::{EngineerKpi, KpiOutcome, LevelingPreviewRow, LevelingRow, Record};

/// One leveling row per distinct SO `ce_id`, default competency and
/// qualitative inputs. Ids missing from the engineer table are skipped.
pub fn leveling_report(
    so_records: &[Record],
    engineer_records: &[Record],
    period: Period,
) -> Vec<LevelingRow> {
    let calc = KpiCalculator::new(so_records, engineer_records);
    let ids = calc.engineer_ids();
    let mut rows = Vec::with_capacity(ids.len());
    for id in &ids {
        match calc.calculate_kpi_for_engineer(id, period, None, None) {
            KpiOutcome::Found(kpi) => rows.push(LevelingRow::from(kpi.as_ref())),
            KpiOutcome::NotFound { error } => warn!(ce_id = %id, "{}", error),
        }
    }
    info!(
        engineers = ids.len(),
        rows = rows.len(),
        "leveling report assembled"
    );
    rows
}

impl From<&EngineerKpi> for LevelingRow {
    fn from(k: &EngineerKpi) -> Self {
        let p = &k.productivity;
        let rt = &k.response_time;
        let rs = &k.resolution_time;
        let c = &k.competency;
        let q = &k.qualitative;
        LevelingRow {
            name: k.name.clone(),
            ce_id: k.ce_id.clone(),
            role: k.role.clone(),
            area_group: k.area_group.clone(),
            region: k.region.clone(),
            vendor: k.vendor.clone(),
            join_date: k.join_date.clone(),
            assessment_date: k.assessment_date.clone(),

            total_machine: p.total_machine,
            total_ce_area: p.total_ce_area,
            total_so_area: p.total_so_area,
            so_area_per_ce_area: p.so_area_per_ce_area,
            total_so_individual: p.total_so_individual,
            productivity_index: p.index,
            productivity_score: p.score,
            productivity_percentage: p.percentage.clone(),
            productivity_kpi: p.kpi_achievement.clone(),

            zone_1_time: rt.zone_1_time.clone(),
            zone_2_time: rt.zone_2_time.clone(),
            zone_3_time: rt.zone_3_time.clone(),
            response_time_index: rt.index,
            response_time_score: rt.score,
            response_time_percentage: rt.percentage.clone(),
            response_time_kpi: rt.kpi_achievement.clone(),

            resolution_time: rs.resolution_time.clone(),
            resolution_time_index: rs.index,
            resolution_time_score: rs.score,
            resolution_time_percentage: rs.percentage.clone(),
            resolution_time_kpi: rs.kpi_achievement.clone(),

            sr: c.flags.sr,
            vs: c.flags.vs,
            tcr: c.flags.tcr,
            cashshoter: c.flags.cashshoter,
            edc: c.flags.edc,
            ups: c.flags.ups,
            pos: c.flags.pos,
            mobile_app: c.flags.mobile_app,
            competency_index: c.index,
            competency_score: c.score,
            competency_percentage: c.percentage.clone(),
            competency_kpi: c.kpi_achievement.clone(),

            analytical_thinking: q.scores.analytical_thinking,
            communication_coordination: q.scores.communication_coordination,
            sop: q.scores.sop,
            team_work: q.scores.team_work,
            innovation_willing_to_learn: q.scores.innovation_willing_to_learn,
            baby_parts_usage: q.scores.baby_parts_usage,
            qualitative_index: q.index,
            qualitative_score: q.score,
            qualitative_percentage: q.percentage.clone(),
            qualitative_kpi: q.kpi_achievement.clone(),

            quantitative_index: k.total.quantitative_index,
            total_kpi_achievement: k.total.total_kpi_achievement.clone(),
            result: k.total.result.clone(),
            assessment: k.total.assessment.clone(),
        }
    }
}

impl From<&LevelingRow> for LevelingPreviewRow {
    fn from(r: &LevelingRow) -> Self {
        LevelingPreviewRow {
            name: r.name.clone(),
            ce_id: r.ce_id.clone(),
            quantitative_index: r.quantitative_index,
            total_kpi_achievement: r.total_kpi_achievement.clone(),
            result: r.result.clone(),
            assessment: r.assessment.clone(),
        }
    }
}
