use std::fs;
use std::path::Path;

use so_analytics::output::write_csv;
use so_analytics::types::{KpiOutcome, Record};
use so_analytics::{AnalyticsService, Config, Entity, RecordStore};
use tempfile::tempdir;

const SO_CSV: &str = "\
SO Number,Engineer,CE Id,Customer,Area Group,Region,Month,CE Response Time,Repair Time,Resolution Time,SO Status,Created,WSID,Branch Name,Service Type
SO-1,Budi,E1,Bank A,jakarat 1,Region 1,April,30,20,30,Close,2024-04-02 08:00:00,WS-1,KCP Sudirman,CM
SO-2,Budi,E1,Bank A,JAKARAT 1,Region 1,April,60,25,45,Close,2024-04-05 09:30:00,WS-2,KCP Sudirman,CM
SO-3,Budi,E1,Bank B,Jakarta 1,Region 1,May,120,30,60,close,2024-05-03 10:00:00,WS-3,KC Thamrin,PM
SO-4,Sari,E2,Bank A,BAndung,Region 2,April,200,40,120,Close,2024-04-10 11:00:00,WS-4,KC Dago,CM
SO-5,Sari,E2,Bank C,bandung 2,Region 2,May,,,,Open,2024-05-11 12:00:00,WS-5,KC Dago,CM
SO-6,,E3,Bank C,semarang,Region 3,May,15,10,20,Close,2024-05-12 13:00:00,WS-6,KC Simpang,PM
";

const CE_CSV: &str = "\
ID,Name,Role,Area Group,Region,Vendor,Join Date
E1,Budi,CE,Jakarta 1,Region 1,PT Alpha,2020-01-15
E2,Sari,CE,Bandung,Region 2,PT Beta,2021-06-01
";

fn seed(dir: &Path) {
    fs::write(dir.join("so_apr_spt.csv"), SO_CSV).unwrap();
    fs::write(dir.join("data_ce.csv"), CE_CSV).unwrap();
}

#[test]
fn test_engineer_stats_from_csv() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let svc = AnalyticsService::new(Config::new(dir.path()));

    let all = svc.engineer_stats(None).unwrap();
    // SO-5 has no times, SO-6 has no engineer.
    assert_eq!(all.total_so, 4);
    assert_eq!(all.total_engineers, 2);
    let budi = all
        .avg_by_engineer
        .iter()
        .find(|e| e.engineer == "Budi")
        .unwrap();
    assert_eq!(budi.avg_resolution_time, 45.0);
    assert_eq!(budi.count, 3);
    assert_eq!(all.by_area["Jakarta 1"].count, 3);
    assert_eq!(all.by_area["Bandung"].count, 1);

    let april = svc.engineer_stats(Some("April")).unwrap();
    assert_eq!(april.total_so, 3);
    assert_eq!(april.by_month.len(), 1);
}

#[test]
fn test_relationships_and_areas_from_csv() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let svc = AnalyticsService::new(Config::new(dir.path()));

    let rel = svc.relationships().unwrap();
    // Bank B is served only by Budi.
    let risky: Vec<&str> = rel
        .risk_analysis
        .single_engineer_customers
        .iter()
        .map(|r| r.customer.as_str())
        .collect();
    assert!(risky.contains(&"Bank B"));
    assert!(!risky.contains(&"Bank A"));

    let areas = svc.customer_intelligence().unwrap();
    assert_eq!(areas.total_so, 6);
    assert_eq!(areas.area_groups[0].name, "Jakarta 1");
    assert_eq!(areas.area_groups[0].total_so, 3);
}

#[test]
fn test_kpi_for_engineer_from_csv() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let svc = AnalyticsService::new(Config::new(dir.path()));

    let outcome = svc
        .engineer_kpi("e1", Some("2024-04-01"), Some("2024-04-30"), None, None)
        .unwrap();
    let KpiOutcome::Found(kpi) = outcome else {
        panic!("E1 should be known");
    };
    assert_eq!(kpi.name, "Budi");
    assert_eq!(kpi.vendor, "PT Alpha");
    assert_eq!(kpi.assessment_date, "30-Apr-24");
    assert_eq!(kpi.productivity.total_so_individual, 2);
    assert_eq!(kpi.productivity.total_machine, 2);
    assert_eq!(kpi.productivity.total_ce_area, 1);
    assert_eq!(kpi.response_time.index, 5.0);
    assert_eq!(kpi.resolution_time.percentage, "100.00%");

    let missing = svc.engineer_kpi("E9", None, None, None, None).unwrap();
    let json = serde_json::to_value(&missing).unwrap();
    assert_eq!(json["error"], "Engineer E9 not found");

    let bad_date = svc.engineer_kpi("E1", Some("yesterday"), None, None, None);
    assert_eq!(bad_date.unwrap_err().status_code(), 400);
}

#[test]
fn test_leveling_export_from_csv() {
    let dir = tempdir().unwrap();
    seed(dir.path());
    let svc = AnalyticsService::new(Config::new(dir.path()));

    let rows = svc.leveling(None, Some("2024-05-31")).unwrap();
    // E3 is not in the engineer table.
    let ids: Vec<&str> = rows.iter().map(|r| r.ce_id.as_str()).collect();
    assert_eq!(ids, vec!["E1", "E2"]);

    let out = dir.path().join("leveling.csv");
    write_csv(&out, &rows).unwrap();
    let mut rdr = csv::Reader::from_path(&out).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(&headers[0], "Name");
    assert_eq!(&headers[headers.len() - 1], "Assessment");
    assert_eq!(rdr.records().count(), 2);
}

#[test]
fn test_import_then_crud() {
    let dir = tempdir().unwrap();
    let cfg = Config::new(dir.path());
    let svc = AnalyticsService::new(cfg.clone());

    let row = |wsid: &str, branch: &str| -> Record {
        [("wsid", wsid), ("branch_name", branch), ("machine_status", "Active")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    };
    let n = svc
        .import(Entity::Machine, vec![row("W1", "KC A"), row("W2", "KC B")])
        .unwrap();
    assert_eq!(n, 2);

    let store = cfg.store(Entity::Machine);
    assert_eq!(store.get_by_key("W2").unwrap()["branch_name"], "KC B");
    let err = store.create(row("W1", "KC Z")).unwrap_err();
    assert_eq!(err.public_message(), "Machine with this wsid already exists");
    let err = store.create(row("W3", "")).unwrap_err();
    assert_eq!(err.public_message(), "Branch name is required");

    store.delete("W1").unwrap();
    assert_eq!(store.get_all().unwrap().len(), 1);
}

#[test]
fn test_stock_lookups_from_csv() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("stok_part.csv"),
        "\
Part Number,Part Name,FSL,Region,Qty
P-1,Card Reader,FSL Jakarta,Region 1,12
P-2,Dispenser Belt,FSL Jakarta,Region 1,2
P-3,Receipt Printer,FSL Bandung,Region 2,0
P-4,Keypad,FSL Bandung,Region 2,9
",
    )
    .unwrap();
    let svc = AnalyticsService::new(Config::new(dir.path()));

    let stats = serde_json::to_value(svc.statistics(Entity::StockPart).unwrap()).unwrap();
    assert_eq!(stats["total_parts"], 4);
    assert_eq!(stats["total_quantity"], 23);
    assert_eq!(stats["low_stock_count"], 3);
    assert_eq!(stats["by_fsl"]["FSL Bandung"], 2);

    let low: Vec<String> = svc
        .low_stock_parts(10)
        .unwrap()
        .iter()
        .map(|r| r["part_number"].clone())
        .collect();
    assert_eq!(low, vec!["P-3", "P-2", "P-4"]);

    let bandung = svc.parts_by_fsl("FSL Bandung").unwrap();
    assert_eq!(bandung.len(), 2);
    assert_eq!(bandung[0]["part_name"], "Receipt Printer");
}
