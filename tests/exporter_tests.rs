// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use cohortscope::cohort;
use cohortscope::config::Settings;
use cohortscope::dataset::Dataset;
use cohortscope::export::{self, ExportFormat};
use cohortscope::models::Selection;
use cohortscope::{cli, commands::exporter, Session};
use serde_json::json;
use tempfile::tempdir;

const SALES: &str = "\
InvoiceNo,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
1001,1,2011-01-05 10:00:00,10.00,12001,United Kingdom
1002,1,2011-01-10 10:00:00,20.00,12002,France
1003,1,2011-01-20 10:00:00,30.00,12003,USA
1004,2,2011-02-03 10:00:00,5.00,12001,United Kingdom
1005,1,2011-02-15 10:00:00,5.00,12002,France
1006,1,2011-02-07 10:00:00,40.00,12004,Germany
C1007,-1,2011-02-20 10:00:00,5.00,12003,USA
1008,1,2011-03-02 10:00:00,8.00,12001,United Kingdom
";

fn session() -> Session {
    let ds = Dataset::from_reader(SALES.as_bytes()).unwrap();
    Session::from_dataset(&ds, Settings::default()).unwrap()
}

fn run_export(session: &Session, args: &[&str]) -> anyhow::Result<()> {
    let argv: Vec<&str> = ["cohortscope", "export"]
        .into_iter()
        .chain(args.iter().copied())
        .collect();
    let matches = cli::build_cli().get_matches_from(argv);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(session, export_m)
    } else {
        panic!("no export subcommand");
    }
}

#[test]
fn export_retention_writes_csv_with_blank_unobserved_cells() {
    let session = session();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("retention.csv");
    let out_str = out_path.to_string_lossy().to_string();

    run_export(
        &session,
        &["retention", "--format", "csv", "--out", &out_str],
    )
    .unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "cohort,age_0,age_1,age_2",
            "2011-01,1,0.6666666666666666,0.3333333333333333",
            "2011-02,1,0,",
        ]
    );
}

#[test]
fn export_revenue_as_tsv() {
    let session = session();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("revenue.tsv");
    let out_str = out_path.to_string_lossy().to_string();

    run_export(
        &session,
        &["revenue", "--format", "xls", "--out", &out_str],
    )
    .unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("cohort\tage_0\tage_1\tage_2"));
    assert_eq!(lines.next(), Some("2011-01\t60.00\t10.00\t8.00"));
}

#[test]
fn export_rfm_as_json_document() {
    let session = session();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("rfm.json");
    let out_str = out_path.to_string_lossy().to_string();

    run_export(&session, &["rfm", "--format", "json", "--out", &out_str]).unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed["columns"][0], json!("customer_id"));
    assert_eq!(parsed["columns"][8], json!("segment"));
    let rows = parsed["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0][0], json!("12001"));
    assert_eq!(rows[0][7].as_str().unwrap().len(), 3);
}

#[test]
fn export_scenario_includes_retention_rows() {
    let session = session();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("scenario.csv");
    let out_str = out_path.to_string_lossy().to_string();

    run_export(
        &session,
        &[
            "scenario",
            "--retention-delta",
            "-10",
            "--cohort",
            "2011-01",
            "--horizon",
            "3",
            "--format",
            "csv",
            "--out",
            &out_str,
        ],
    )
    .unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    assert!(contents.starts_with("metric,baseline,scenario,delta\n"));
    assert!(contents.contains("\nclv_per_customer,"));
    assert!(contents.contains("\nretention_age_2,"));
    assert!(!contents.contains("retention_age_3"));
}

#[test]
fn export_scenario_for_unknown_cohort_fails() {
    let session = session();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("scenario.json");
    let out_str = out_path.to_string_lossy().to_string();

    let res = run_export(
        &session,
        &["scenario", "--cohort", "1999-01", "--format", "json", "--out", &out_str],
    );
    assert!(res.is_err());
    assert!(!out_path.exists());
}

#[test]
fn export_rejects_unknown_format() {
    let session = session();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.unknown");
    let out_str = out_path.to_string_lossy().to_string();

    let res = run_export(
        &session,
        &["segments", "--format", "xml", "--out", &out_str],
    );
    assert!(res.is_err());
    assert!(!out_path.exists());
}

#[test]
fn json_marks_unobserved_cells_as_null() {
    let table = cohort::build(session().transactions(), &Selection::all());
    let text = export::to_string(&table.revenue_matrix(), ExportFormat::Json).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["rows"][1], json!(["2011-02", "40.00", "0", null]));
}

#[test]
fn format_names_are_case_insensitive() {
    assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
    assert_eq!("spreadsheet".parse::<ExportFormat>().unwrap(), ExportFormat::Tsv);
    assert!("parquet".parse::<ExportFormat>().is_err());
}

#[test]
fn export_activable_lists_only_actionable_customers() {
    let session = session();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("activable.csv");
    let out_str = out_path.to_string_lossy().to_string();

    run_export(
        &session,
        &["activable", "--format", "csv", "--out", &out_str],
    )
    .unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "customer_id,segment,recency_days,frequency,monetary,segment_code",
            "12001,Champions,1,3,28.00,554",
            "12002,Need Attention,16,2,25.00,343",
            "12003,Potential Loyalists,11,2,25.00,443",
        ]
    );
}

#[test]
fn spreadsheet_alias_writes_tabs() {
    let session = session();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("activable.tsv");
    let out_str = out_path.to_string_lossy().to_string();

    run_export(
        &session,
        &["activable", "--format", "spreadsheet", "--out", &out_str],
    )
    .unwrap();

    let contents = std::fs::read_to_string(&out_path).unwrap();
    assert!(contents.starts_with("customer_id\tsegment\t"));
    assert!(!contents.contains("12004"));
}
