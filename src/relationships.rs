//! Engineer <-> customer coverage analysis.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{
    CoverageStats, CustomerCoverage, EngineerCustomerPair, EngineerDiversity, Record,
    RelationshipResult, RiskAnalysis, ServiceOrder, SingleEngineerCustomer,
};
use crate::util::{average, is_blank, round2};

const TOP_N: usize = 10;

#[derive(Default)]
struct PairAcc {
    so_count: usize,
    resolution: Vec<f64>,
}

pub fn analyze(records: &[Record]) -> RelationshipResult {
    let orders: Vec<ServiceOrder> = records
        .iter()
        .map(ServiceOrder::from_record)
        .filter(|so| !so.engineer.is_empty() && !so.customer.is_empty())
        .collect();

    let mut pairs: BTreeMap<(String, String), PairAcc> = BTreeMap::new();
    let mut customers_of: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut engineers_of: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for so in &orders {
        let acc = pairs
            .entry((so.engineer.clone(), so.customer.clone()))
            .or_default();
        acc.so_count += 1;
        if let Some(v) = so.resolution_time {
            acc.resolution.push(v);
        }
        customers_of
            .entry(so.engineer.as_str())
            .or_default()
            .insert(so.customer.as_str());
        engineers_of
            .entry(so.customer.as_str())
            .or_default()
            .insert(so.engineer.as_str());
    }

    let mut matrix: Vec<EngineerCustomerPair> = pairs
        .into_iter()
        .map(|((engineer, customer), acc)| EngineerCustomerPair {
            engineer,
            customer,
            so_count: acc.so_count,
            avg_resolution_time: if acc.resolution.is_empty() {
                None
            } else {
                Some(average(&acc.resolution))
            },
        })
        .collect();
    matrix.sort_by(|a, b| b.so_count.cmp(&a.so_count));
    let top_pairs: Vec<EngineerCustomerPair> = matrix.iter().take(TOP_N).cloned().collect();

    let customers_per_engineer: Vec<usize> = customers_of.values().map(BTreeSet::len).collect();
    let engineers_per_customer: Vec<usize> = engineers_of.values().map(BTreeSet::len).collect();
    let mean_count = |counts: &[usize]| {
        let as_f64: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
        round2(average(&as_f64))
    };
    let coverage_stats = CoverageStats {
        avg_customers_per_engineer: mean_count(customers_per_engineer.as_slice()),
        avg_engineers_per_customer: mean_count(engineers_per_customer.as_slice()),
        max_customers_per_engineer: customers_per_engineer.iter().copied().max().unwrap_or(0),
        max_engineers_per_customer: engineers_per_customer.iter().copied().max().unwrap_or(0),
    };

    let single_engineer_customers: Vec<SingleEngineerCustomer> = engineers_of
        .iter()
        .filter_map(|(customer, engineers)| {
            let mut only = engineers.iter();
            match (only.next(), only.next()) {
                (Some(engineer), None) => Some((*customer, *engineer)),
                _ => None,
            }
        })
        .map(|(customer, engineer)| SingleEngineerCustomer {
            customer: customer.to_string(),
            engineer: engineer.to_string(),
            so_count: orders
                .iter()
                .filter(|so| so.customer == customer && so.engineer == engineer)
                .count(),
        })
        .collect();

    let mut top_diverse_engineers: Vec<EngineerDiversity> = customers_of
        .iter()
        .filter(|(engineer, _)| !is_blank(engineer))
        .map(|(engineer, customers)| EngineerDiversity {
            engineer: engineer.to_string(),
            customer_count: customers.len(),
        })
        .collect();
    top_diverse_engineers.sort_by(|a, b| b.customer_count.cmp(&a.customer_count));
    top_diverse_engineers.truncate(TOP_N);

    let mut top_covered_customers: Vec<CustomerCoverage> = engineers_of
        .iter()
        .map(|(customer, engineers)| CustomerCoverage {
            customer: customer.to_string(),
            engineer_count: engineers.len(),
        })
        .collect();
    top_covered_customers.sort_by(|a, b| b.engineer_count.cmp(&a.engineer_count));
    top_covered_customers.truncate(TOP_N);

    RelationshipResult {
        total_engineers: customers_of.len(),
        total_customers: engineers_of.len(),
        total_so: orders.len(),
        engineer_customer_matrix: matrix,
        top_pairs,
        coverage_stats,
        risk_analysis: RiskAnalysis {
            risk_count: single_engineer_customers.len(),
            single_engineer_customers,
        },
        top_diverse_engineers,
        top_covered_customers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn so(engineer: &str, customer: &str, resolution: &str) -> Record {
        [
            ("engineer", engineer),
            ("customer", customer),
            ("resolution_time", resolution),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_single_engineer_customer_risk() {
        let records = vec![
            so("E1", "C1", "10"),
            so("E2", "C1", "20"),
            so("E1", "C2", "30"),
            so("E1", "C2", "50"),
        ];
        let result = analyze(&records);
        assert_eq!(result.risk_analysis.risk_count, 1);
        let risk = &result.risk_analysis.single_engineer_customers[0];
        assert_eq!(risk.customer, "C2");
        assert_eq!(risk.engineer, "E1");
        assert_eq!(risk.so_count, 2);
    }

    #[test]
    fn test_matrix_counts_and_means() {
        let records = vec![
            so("E1", "C2", "30"),
            so("E1", "C2", "50"),
            so("E1", "C1", ""),
            so("E2", "C1", "20"),
        ];
        let result = analyze(&records);
        assert_eq!(result.total_so, 4);
        assert_eq!(result.total_engineers, 2);
        assert_eq!(result.total_customers, 2);
        let first = &result.engineer_customer_matrix[0];
        assert_eq!((first.engineer.as_str(), first.customer.as_str()), ("E1", "C2"));
        assert_eq!(first.so_count, 2);
        assert_eq!(first.avg_resolution_time, Some(40.0));
        let no_times = result
            .engineer_customer_matrix
            .iter()
            .find(|p| p.engineer == "E1" && p.customer == "C1")
            .unwrap();
        assert_eq!(no_times.avg_resolution_time, None);
    }

    #[test]
    fn test_blank_engineer_or_customer_dropped() {
        let records = vec![so("", "C1", "10"), so("E1", "  ", "10"), so("E1", "C1", "10")];
        let result = analyze(&records);
        assert_eq!(result.total_so, 1);
        assert_eq!(result.engineer_customer_matrix.len(), 1);
    }

    #[test]
    fn test_coverage_stats() {
        let records = vec![
            so("E1", "C1", ""),
            so("E1", "C2", ""),
            so("E1", "C3", ""),
            so("E2", "C1", ""),
        ];
        let result = analyze(&records);
        let stats = &result.coverage_stats;
        assert_eq!(stats.avg_customers_per_engineer, 2.0);
        assert_eq!(stats.max_customers_per_engineer, 3);
        assert_eq!(stats.avg_engineers_per_customer, 1.33);
        assert_eq!(stats.max_engineers_per_customer, 2);
        assert_eq!(result.top_diverse_engineers[0].engineer, "E1");
        assert_eq!(result.top_covered_customers[0].customer, "C1");
    }

    #[test]
    fn test_nan_engineer_excluded_from_diversity_ranking() {
        let records = vec![so("nan", "C1", ""), so("nan", "C2", ""), so("E1", "C1", "")];
        let result = analyze(&records);
        assert_eq!(result.top_diverse_engineers.len(), 1);
        assert_eq!(result.top_diverse_engineers[0].engineer, "E1");
        assert_eq!(result.total_engineers, 2);
    }

    #[test]
    fn test_top_pairs_capped_at_ten() {
        let records: Vec<Record> = (0..15)
            .map(|i| so(&format!("E{}", i), "C1", "10"))
            .collect();
        let result = analyze(&records);
        assert_eq!(result.engineer_customer_matrix.len(), 15);
        assert_eq!(result.top_pairs.len(), 10);
        assert_eq!(result.top_covered_customers[0].engineer_count, 15);
    }

    #[test]
    fn test_empty_input() {
        let result = analyze(&[]);
        assert_eq!(result, RelationshipResult::default());
    }
}
