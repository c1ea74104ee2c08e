use std::collections::{BTreeMap, BTreeSet};

use crate::types::{AreaGroupSummary, CustomerIntelligence, Record, ServiceOrder};

/// Customer and service-type spread per (normalized) area group, busiest first.
pub fn customer_intelligence(records: &[Record]) -> CustomerIntelligence {
    let has_region = records.iter().any(|r| r.contains_key("region"));
    let orders: Vec<ServiceOrder> = records.iter().map(ServiceOrder::from_record).collect();

    #[derive(Default)]
    struct Acc<'a> {
        total_so: usize,
        customers: Vec<&'a str>,
        service_types: Vec<&'a str>,
        region: Option<&'a str>,
    }

    let mut map: BTreeMap<&str, Acc<'_>> = BTreeMap::new();
    for so in &orders {
        let e = map.entry(so.area_group.as_str()).or_default();
        e.total_so += 1;
        // First-seen order, like a "unique values" listing.
        if !so.customer.is_empty() && !e.customers.contains(&so.customer.as_str()) {
            e.customers.push(so.customer.as_str());
        }
        if !so.service_type.is_empty() && !e.service_types.contains(&so.service_type.as_str()) {
            e.service_types.push(so.service_type.as_str());
        }
        if e.region.is_none() {
            e.region = Some(so.region.as_str());
        }
    }

    let mut area_groups: Vec<AreaGroupSummary> = map
        .into_iter()
        .map(|(name, acc)| AreaGroupSummary {
            name: name.to_string(),
            total_so: acc.total_so,
            customer_count: acc.customers.len(),
            customers: acc.customers.into_iter().map(str::to_string).collect(),
            service_type_count: acc.service_types.len(),
            service_types: acc.service_types.into_iter().map(str::to_string).collect(),
            region: match (has_region, acc.region) {
                (true, Some(region)) => region.to_string(),
                _ => "Unknown".to_string(),
            },
        })
        .collect();
    area_groups.sort_by(|a, b| b.total_so.cmp(&a.total_so));

    let total_customers = orders
        .iter()
        .filter(|so| !so.customer.is_empty())
        .map(|so| so.customer.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    CustomerIntelligence {
        total_so: orders.len(),
        total_customers,
        total_area_groups: area_groups.len(),
        top_5_area_groups: area_groups.iter().take(5).cloned().collect(),
        area_groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn so(area: &str, customer: &str, service_type: &str) -> Record {
        [
            ("area_group", area),
            ("customer", customer),
            ("service_type", service_type),
            ("region", "Region 2"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_groups_by_normalized_area() {
        let records = vec![
            so("BAndung", "Bank A", "CM"),
            so("bandung", "Bank B", "PM"),
            so("Bandung", "Bank A", "CM"),
            so("Jakarat 1", "Bank C", "CM"),
        ];
        let result = customer_intelligence(&records);
        assert_eq!(result.total_so, 4);
        assert_eq!(result.total_customers, 3);
        assert_eq!(result.total_area_groups, 2);
        let bandung = &result.area_groups[0];
        assert_eq!(bandung.name, "Bandung");
        assert_eq!(bandung.total_so, 3);
        assert_eq!(bandung.customers, vec!["Bank A", "Bank B"]);
        assert_eq!(bandung.service_type_count, 2);
        assert_eq!(bandung.region, "Region 2");
        assert_eq!(result.area_groups[1].name, "Jakarta 1");
    }

    #[test]
    fn test_top_five_cap() {
        let records: Vec<Record> = (0..7)
            .map(|i| so(&format!("Area {}", i), "Bank", "CM"))
            .collect();
        let result = customer_intelligence(&records);
        assert_eq!(result.area_groups.len(), 7);
        assert_eq!(result.top_5_area_groups.len(), 5);
    }

    #[test]
    fn test_missing_region_column_reports_unknown() {
        let mut r = so("Medan", "Bank A", "CM");
        r.remove("region");
        let result = customer_intelligence(&[r]);
        assert_eq!(result.area_groups[0].region, "Unknown");
    }
}
