// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use cohortscope::dataset::Dataset;
use cohortscope::models::{Selection, Transaction};
use cohortscope::prepare::{prepare, PrepareOptions};
use cohortscope::rfm::{self, quantile_scores, RfmAxis, RfmOptions, Segment};
use cohortscope::DataWarning;
use rust_decimal::Decimal;

const HEADER: &str = "InvoiceNo,Quantity,InvoiceDate,UnitPrice,CustomerID,Country\n";

// Customer 1300k places k invoices on December 1..=k, each worth 10 * k.
fn ladder() -> Vec<Transaction> {
    let mut raw = String::from(HEADER);
    for k in 1..=5 {
        for day in 1..=k {
            raw.push_str(&format!(
                "{}{},1,2011-12-{:02} 12:00:00,{},1300{},United Kingdom\n",
                k,
                day,
                day,
                10 * k,
                k
            ));
        }
    }
    load(&raw)
}

fn load(raw: &str) -> Vec<Transaction> {
    let ds = Dataset::from_reader(raw.as_bytes()).unwrap();
    prepare(&ds, &PrepareOptions::default()).unwrap().transactions
}

fn as_of(y: i32, m: u32, d: u32) -> RfmOptions {
    RfmOptions {
        reference_date: NaiveDate::from_ymd_opt(y, m, d),
        ..RfmOptions::default()
    }
}

#[test]
fn best_customer_scores_555() {
    let table = rfm::compute(&ladder(), &Selection::all(), &as_of(2011, 12, 10));
    assert_eq!(table.len(), 5);

    let best = table.get("13005").unwrap();
    assert_eq!(best.recency_days, 5);
    assert_eq!(best.frequency, 5);
    assert_eq!(best.monetary, Decimal::from(250));
    assert_eq!(best.segment_code, "555");
    assert_eq!(best.segment, Segment::Champions);

    let worst = table.get("13001").unwrap();
    assert_eq!(worst.segment_code, "111");
    assert_eq!(worst.segment, Segment::Lost);

    assert_eq!(table.get("13003").unwrap().segment, Segment::NeedAttention);
    assert!(table.warnings.is_empty());
}

#[test]
fn scores_stay_in_range_and_codes_have_three_digits() {
    let table = rfm::compute(&ladder(), &Selection::all(), &RfmOptions::default());
    for p in &table.profiles {
        for s in [p.r_score, p.f_score, p.m_score] {
            assert!((1..=5).contains(&s));
        }
        assert_eq!(p.segment_code.len(), 3);
        assert_eq!(
            p.segment_code,
            format!("{}{}{}", p.r_score, p.f_score, p.m_score)
        );
    }
}

#[test]
fn reference_date_defaults_to_day_after_last_invoice() {
    let table = rfm::compute(&ladder(), &Selection::all(), &RfmOptions::default());
    assert_eq!(table.reference_date, NaiveDate::from_ymd_opt(2011, 12, 6));
    assert_eq!(table.get("13005").unwrap().recency_days, 1);
}

#[test]
fn quantile_bins_split_evenly() {
    let values: Vec<i64> = (1..=10).collect();
    let (scores, bins) = quantile_scores(&values, false);
    assert_eq!(bins, 5);
    assert_eq!(scores, vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);

    let (inverted, _) = quantile_scores(&values, true);
    assert_eq!(inverted, vec![5, 5, 4, 4, 3, 3, 2, 2, 1, 1]);
}

#[test]
fn tied_values_share_a_score() {
    let values = [10, 20, 20, 30, 40, 50, 60];
    let (scores, bins) = quantile_scores(&values, false);
    assert_eq!(bins, 5);
    assert_eq!(scores[1], scores[2]);
    assert_eq!(scores.iter().min(), Some(&1));
    assert_eq!(scores.iter().max(), Some(&5));
}

#[test]
fn constant_axis_scores_everyone_five() {
    let (scores, bins) = quantile_scores(&[3, 3, 3, 3], false);
    assert_eq!(bins, 1);
    assert_eq!(scores, vec![5, 5, 5, 5]);
    assert_eq!(quantile_scores::<i64>(&[], false), (vec![], 0));
}

#[test]
fn small_population_reports_sparse_bins() {
    let raw = format!(
        "{}1,1,2011-12-01 12:00:00,10,14001,France\n\
         2,1,2011-12-03 12:00:00,30,14002,France\n\
         3,1,2011-12-04 12:00:00,30,14002,France\n",
        HEADER
    );
    let table = rfm::compute(&load(&raw), &Selection::all(), &RfmOptions::default());
    assert_eq!(table.len(), 2);
    assert!(table.warnings.contains(&DataWarning::SparseQuantiles {
        axis: RfmAxis::Frequency,
        bins: 2,
    }));
    let top = table.get("14002").unwrap();
    assert_eq!(top.segment_code, "555");
    assert_eq!(table.get("14001").unwrap().segment_code, "444");
}

#[test]
fn returns_can_be_left_out_of_monetary() {
    let raw = format!(
        "{}1,2,2011-12-01 12:00:00,10,14001,France\n\
         C2,-1,2011-12-02 12:00:00,10,14001,France\n\
         3,1,2011-12-02 12:00:00,5,14002,France\n\
         C4,-1,2011-12-03 12:00:00,5,14002,France\n",
        HEADER
    );
    let txns = load(&raw);

    let with = rfm::compute(&txns, &Selection::all(), &RfmOptions::default());
    assert_eq!(with.get("14001").unwrap().monetary, Decimal::from(10));
    assert_eq!(with.get("14001").unwrap().frequency, 2);

    let without = rfm::compute(
        &txns,
        &Selection::all(),
        &RfmOptions {
            include_returns: false,
            ..RfmOptions::default()
        },
    );
    assert_eq!(without.get("14001").unwrap().monetary, Decimal::from(20));
    assert_eq!(without.get("14001").unwrap().frequency, 1);

    let positive = rfm::compute(
        &txns,
        &Selection::all(),
        &RfmOptions {
            positive_monetary_only: true,
            ..RfmOptions::default()
        },
    );
    assert_eq!(positive.len(), 1);
    assert!(positive.get("14002").is_none());
}

#[test]
fn segment_rules_follow_priority() {
    assert_eq!(Segment::classify(5, 5, 5), Segment::Champions);
    assert_eq!(Segment::classify(3, 4, 4), Segment::Loyal);
    assert_eq!(Segment::classify(4, 3, 3), Segment::PotentialLoyalists);
    assert_eq!(Segment::classify(5, 1, 1), Segment::New);
    assert_eq!(Segment::classify(3, 2, 3), Segment::Promising);
    assert_eq!(Segment::classify(2, 4, 4), Segment::AtRisk);
    assert_eq!(Segment::classify(1, 1, 4), Segment::Hibernating);
    assert_eq!(Segment::classify(1, 2, 2), Segment::Lost);
    assert_eq!(Segment::classify(3, 1, 1), Segment::Others);
    assert_eq!(Segment::Champions.priority(), 1);
    assert_eq!(Segment::Others.priority(), 10);
    assert_eq!(Segment::AtRisk.to_string(), "At Risk");
}

#[test]
fn segment_metrics_cover_all_revenue() {
    let txns = ladder();
    let table = rfm::compute(&txns, &Selection::all(), &RfmOptions::default());
    let metrics = rfm::segment_metrics(&txns, &Selection::all(), &table);

    let customers: usize = metrics.iter().map(|m| m.customers).sum();
    assert_eq!(customers, 5);
    let revenue: Decimal = metrics.iter().map(|m| m.revenue).sum();
    assert_eq!(revenue, Decimal::from(550));
    let share: f64 = metrics.iter().map(|m| m.share_of_revenue).sum();
    assert!((share - 100.0).abs() < 1e-9);

    let priorities: Vec<u8> = metrics.iter().map(|m| m.priority).collect();
    let mut sorted = priorities.clone();
    sorted.sort();
    assert_eq!(priorities, sorted);
    assert_eq!(metrics[0].segment, Segment::Champions);
    assert_eq!(metrics[0].customers, 2);
    assert_eq!(metrics[0].invoices, 9);
}

#[test]
fn huge_monetary_values_saturate() {
    let raw = format!(
        "{}4001,1,2011-01-05 10:00:00,50000000000000000000000000000,12001,United Kingdom\n\
         4002,1,2011-01-06 10:00:00,50000000000000000000000000000,12001,United Kingdom\n\
         4003,1,2011-01-07 10:00:00,1.00,12002,France\n",
        HEADER
    );
    let txns = load(&raw);
    let table = rfm::compute(&txns, &Selection::all(), &RfmOptions::default());
    assert_eq!(table.get("12001").unwrap().monetary, Decimal::MAX);

    let metrics = rfm::segment_metrics(&txns, &Selection::all(), &table);
    let share: f64 = metrics.iter().map(|m| m.share_of_revenue).sum();
    assert!(share.is_finite());
    assert!(metrics.iter().any(|m| m.revenue == Decimal::MAX));
}

#[test]
fn activable_list_keeps_actionable_segments() {
    assert!(Segment::Champions.is_activable());
    assert!(Segment::NeedAttention.is_activable());
    assert!(!Segment::AtRisk.is_activable());
    assert!(!Segment::New.is_activable());

    let table = rfm::compute(&ladder(), &Selection::all(), &RfmOptions::default());
    let list = table.activable();
    assert!(!list.profiles.is_empty());
    assert!(list.profiles.iter().all(|p| p.segment.is_activable()));
    let expected = table
        .profiles
        .iter()
        .filter(|p| p.segment.is_activable())
        .count();
    assert_eq!(list.profiles.len(), expected);
}
