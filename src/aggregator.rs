//! Response / repair / resolution time statistics over service orders.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::types::{AggregateResult, BucketAggregate, EngineerAggregate, Record, ServiceOrder};
use crate::util::{average, is_blank, round2};

#[derive(Default)]
struct Acc {
    response: Vec<f64>,
    repair: Vec<f64>,
    resolution: Vec<f64>,
    count: usize,
}

impl Acc {
    fn push(&mut self, so: &ServiceOrder) {
        // Missing values are skipped per metric; the row still counts.
        if let Some(v) = so.response_time {
            self.response.push(v);
        }
        if let Some(v) = so.repair_time {
            self.repair.push(v);
        }
        if let Some(v) = so.resolution_time {
            self.resolution.push(v);
        }
        self.count += 1;
    }

    fn finish(self, engineer: String) -> EngineerAggregate {
        EngineerAggregate {
            engineer,
            avg_response_time: round2(average(&self.response)),
            avg_repair_time: round2(average(&self.repair)),
            avg_resolution_time: round2(average(&self.resolution)),
            count: self.count,
        }
    }
}

/// Count-weighted roll-up of per-engineer rows:
/// `Σ(avg × count) / Σ count`, using the already rounded averages.
fn weighted<'a, I>(rows: I) -> BucketAggregate
where
    I: IntoIterator<Item = &'a EngineerAggregate>,
{
    let (mut response, mut repair, mut resolution, mut total) = (0.0, 0.0, 0.0, 0usize);
    for row in rows {
        let w = row.count as f64;
        response += row.avg_response_time * w;
        repair += row.avg_repair_time * w;
        resolution += row.avg_resolution_time * w;
        total += row.count;
    }
    if total == 0 {
        return BucketAggregate::default();
    }
    let total_f = total as f64;
    BucketAggregate {
        avg_response_time: round2(response / total_f),
        avg_repair_time: round2(repair / total_f),
        avg_resolution_time: round2(resolution / total_f),
        count: total,
    }
}

/// Two-level group-by: bucket x engineer, then a weighted roll-up per bucket.
/// Rows whose bucket key is `None` or blank form no bucket.
fn by_bucket<F>(orders: &[ServiceOrder], key: F) -> BTreeMap<String, BucketAggregate>
where
    F: Fn(&ServiceOrder) -> Option<&str>,
{
    let mut map: BTreeMap<(String, String), Acc> = BTreeMap::new();
    for so in orders {
        let Some(bucket) = key(so).filter(|b| !b.trim().is_empty()) else {
            continue;
        };
        map.entry((bucket.to_string(), so.engineer.clone()))
            .or_default()
            .push(so);
    }

    let mut per_bucket: BTreeMap<String, Vec<EngineerAggregate>> = BTreeMap::new();
    for ((bucket, engineer), acc) in map {
        per_bucket
            .entry(bucket)
            .or_default()
            .push(acc.finish(engineer));
    }
    per_bucket
        .into_iter()
        .map(|(bucket, rows)| (bucket, weighted(&rows)))
        .collect()
}

/// Aggregate service order times by engineer, month, region and area group.
///
/// `months` restricts the input to the listed month names (exact match) when
/// the data carries a month column; `None` or an empty list keeps every row.
/// An input that filters down to nothing yields the zero-valued result.
pub fn aggregate(records: &[Record], months: Option<&[String]>) -> AggregateResult {
    let mut orders: Vec<ServiceOrder> = records.iter().map(ServiceOrder::from_record).collect();
    let loaded = orders.len();

    let has_month = orders.iter().any(|so| so.month.is_some());
    if let Some(wanted) = months.filter(|m| !m.is_empty()) {
        if has_month {
            let wanted: HashSet<&str> = wanted.iter().map(String::as_str).collect();
            orders.retain(|so| matches!(&so.month, Some(m) if wanted.contains(m.as_str())));
        }
    }
    let after_month = orders.len();

    orders.retain(|so| !is_blank(&so.engineer) && so.has_positive_time());

    if orders.is_empty() {
        debug!(
            loaded,
            after_month_filter = after_month,
            has_month_column = has_month,
            "no service orders left after filtering"
        );
        return AggregateResult::default();
    }

    let mut per_engineer: BTreeMap<String, Acc> = BTreeMap::new();
    for so in &orders {
        per_engineer.entry(so.engineer.clone()).or_default().push(so);
    }
    let mut avg_by_engineer: Vec<EngineerAggregate> = per_engineer
        .into_iter()
        .map(|(engineer, acc)| acc.finish(engineer))
        .collect();
    // Stable sort keeps engineer-name order among equal times.
    avg_by_engineer.sort_by(|a, b| {
        a.avg_resolution_time
            .partial_cmp(&b.avg_resolution_time)
            .unwrap_or(Ordering::Equal)
    });

    let overall = weighted(&avg_by_engineer);

    let by_month = if has_month {
        by_bucket(&orders, |so| so.month.as_deref())
    } else {
        BTreeMap::new()
    };
    let by_region = by_bucket(&orders, |so| Some(so.region.as_str()));
    let by_area = by_bucket(&orders, |so| Some(so.area_group.as_str()));

    debug!(
        loaded,
        retained = orders.len(),
        engineers = avg_by_engineer.len(),
        "aggregated service orders"
    );

    AggregateResult {
        total_engineers: avg_by_engineer.len(),
        total_so: orders.len(),
        avg_response_time_overall: overall.avg_response_time,
        avg_repair_time_overall: overall.avg_repair_time,
        avg_resolution_time_overall: overall.avg_resolution_time,
        avg_by_engineer,
        by_month,
        by_region,
        by_area,
    }
}
