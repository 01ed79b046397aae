// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use cohortscope::cohort::{self, age_bucket_for_days};
use cohortscope::dataset::Dataset;
use cohortscope::models::{Selection, Transaction, YearMonth};
use cohortscope::prepare::{prepare, PrepareOptions};
use cohortscope::DataWarning;
use rust_decimal::Decimal;

// Three customers join in January, two of them buy again in February.
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

fn transactions(raw: &str) -> Vec<Transaction> {
    let ds = Dataset::from_reader(raw.as_bytes()).unwrap();
    prepare(&ds, &PrepareOptions::default()).unwrap().transactions
}

fn month(s: &str) -> YearMonth {
    s.parse().unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn two_of_three_retained_after_one_month() {
    let table = cohort::build(&transactions(SALES), &Selection::all());
    let jan = table.cohort(month("2011-01")).unwrap();
    assert_eq!(jan.size, 3);
    assert_eq!(jan.active, vec![Some(3), Some(2), Some(1)]);
    assert!((jan.retention(1).unwrap() - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn age_zero_retention_is_always_one() {
    let table = cohort::build(&transactions(SALES), &Selection::all());
    for row in &table.rows {
        assert_eq!(row.retention(0), Some(1.0));
    }
}

#[test]
fn returns_count_in_revenue_but_not_activity() {
    let table = cohort::build(&transactions(SALES), &Selection::all());
    let jan = table.cohort(month("2011-01")).unwrap();
    assert_eq!(
        jan.revenue,
        vec![Some(dec("60")), Some(dec("10")), Some(dec("8"))]
    );
}

#[test]
fn revenue_matrix_sums_to_selected_net_amount() {
    let txns = transactions(SALES);
    let table = cohort::build(&txns, &Selection::all());
    let net: Decimal = txns.iter().map(|t| t.net_amount).sum();
    assert_eq!(table.total_revenue(), net);
    assert_eq!(table.total_revenue(), dec("118"));

    let by_age = table.revenue_by_age(None);
    assert_eq!(
        by_age,
        vec![(0, dec("100")), (1, dec("10")), (2, dec("8"))]
    );
}

#[test]
fn cells_past_the_observation_window_are_missing() {
    let table = cohort::build(&transactions(SALES), &Selection::all());
    assert_eq!(table.width, 3);
    assert_eq!(table.observed_through, Some(month("2011-03")));

    let feb = table.cohort(month("2011-02")).unwrap();
    assert_eq!(feb.active, vec![Some(1), Some(0), None]);
    assert_eq!(feb.observed_ages(), 2);

    let matrix = table.retention_matrix();
    assert_eq!(matrix.rows[1].1, vec![Some(1.0), Some(0.0), None]);
}

#[test]
fn filtered_selection_keeps_the_dataset_window() {
    let sel = Selection {
        countries: vec!["France".into()],
        ..Selection::all()
    };
    let table = cohort::build(&transactions(SALES), &sel);
    assert_eq!(table.rows.len(), 1);
    let jan = &table.rows[0];
    assert_eq!(jan.size, 1);
    assert_eq!(jan.active, vec![Some(1), Some(1), Some(0)]);
}

#[test]
fn continent_filter_groups_countries() {
    let sel = Selection {
        continent: Some("america".into()),
        ..Selection::all()
    };
    let table = cohort::build(&transactions(SALES), &sel);
    let jan = table.cohort(month("2011-01")).unwrap();
    assert_eq!(jan.size, 1);
    assert_eq!(jan.active[1], Some(0));
    assert_eq!(jan.revenue[1], Some(dec("-5")));
}

#[test]
fn cohort_filter_only_keeps_that_cohort() {
    let table = cohort::build(
        &transactions(SALES),
        &Selection::cohort(month("2011-02")),
    );
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.total_customers(), 1);
    assert_eq!(table.total_revenue(), dec("40"));
}

#[test]
fn returns_before_acquisition_are_flagged() {
    let raw = format!("{}C0999,-1,2010-12-20 10:00:00,3.00,12001,United Kingdom\n", SALES);
    let table = cohort::build(&transactions(&raw), &Selection::all());
    assert_eq!(
        table.warnings,
        vec![DataWarning::PreAcquisitionActivity { rows: 1 }]
    );
    assert!(table.cohort(month("2010-12")).is_none());
}

#[test]
fn empty_input_gives_empty_table() {
    let table = cohort::build(&[], &Selection::all());
    assert!(table.is_empty());
    assert_eq!(table.empirical_clv(None), None);
    assert!(table.average_retention(None).is_empty());
}

#[test]
fn weighted_and_plain_retention_averages() {
    let table = cohort::build(&transactions(SALES), &Selection::all());
    let avg = table.average_retention(None);
    assert_eq!(avg[0], Some(1.0));
    assert_eq!(avg[1], Some(0.5));
    assert!((avg[2].unwrap() - 1.0 / 3.0).abs() < 1e-12);
    assert!((table.mean_retention_at(1).unwrap() - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn early_revenue_and_empirical_clv() {
    let table = cohort::build(&transactions(SALES), &Selection::all());
    assert_eq!(age_bucket_for_days(0), 0);
    assert_eq!(age_bucket_for_days(30), 0);
    assert_eq!(age_bucket_for_days(31), 1);
    assert_eq!(age_bucket_for_days(90), 2);

    let jan = Some(month("2011-01"));
    assert_eq!(table.revenue_within_days(jan, 30), dec("60"));
    assert_eq!(table.revenue_within_days(jan, 90), dec("78"));
    assert_eq!(table.empirical_clv(jan), Some(dec("26")));
    assert_eq!(table.revenue_per_active(jan), Some(dec("13")));
}

#[test]
fn short_windows_are_reported_per_cohort() {
    let table = cohort::build(&transactions(SALES), &Selection::all());
    let warnings = table.window_warnings(None, 3);
    assert_eq!(
        warnings,
        vec![DataWarning::ShortObservationWindow {
            cohort: month("2011-02"),
            observed: 2,
            requested: 3,
        }]
    );
}

#[test]
fn country_filter_attributes_only_members_rows() {
    // 12001 joins in the UK and later buys in France; 12005 does the same a
    // month later. Under a France filter only 12002 belongs to a cohort.
    let raw = "\
InvoiceNo,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
2001,1,2011-01-10 10:00:00,10.00,12001,United Kingdom
2002,1,2011-02-15 10:00:00,10.00,12001,France
2003,1,2011-01-20 10:00:00,20.00,12002,France
2004,1,2011-02-15 10:00:00,5.00,12002,France
2005,1,2011-02-05 10:00:00,7.00,12005,United Kingdom
2006,1,2011-03-01 10:00:00,3.00,12005,France
";
    let sel = Selection {
        countries: vec!["France".into()],
        ..Selection::all()
    };
    let table = cohort::build(&transactions(raw), &sel);

    assert_eq!(table.rows.len(), 1);
    let jan = table.cohort(month("2011-01")).unwrap();
    assert_eq!(jan.size, 1);
    assert_eq!(jan.revenue[1], Some(dec("5.00")));
    assert!(table.cohort(month("2011-02")).is_none());
    assert_eq!(table.total_revenue(), dec("25"));
    assert_eq!(table.empirical_clv(None), Some(dec("25")));
    assert_eq!(table.revenue_per_active(None), Some(dec("12.5")));
    for row in &table.rows {
        assert!(row.size > 0);
        assert_eq!(row.retention(0), Some(1.0));
    }
}

#[test]
fn huge_revenue_saturates_instead_of_overflowing() {
    let raw = "\
InvoiceNo,Quantity,InvoiceDate,UnitPrice,CustomerID,Country
3001,1,2011-01-05 10:00:00,50000000000000000000000000000,12001,United Kingdom
3002,1,2011-01-06 10:00:00,50000000000000000000000000000,12001,United Kingdom
";
    let table = cohort::build(&transactions(raw), &Selection::all());
    assert_eq!(table.total_revenue(), Decimal::MAX);
    assert_eq!(table.empirical_clv(None), Some(Decimal::MAX));
}
