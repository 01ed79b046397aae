// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::selection_from;
use crate::cohort::{self, CohortMatrix};
use crate::session::Session;
use crate::utils::{fmt_money, fmt_rate, maybe_print_json, pretty_table};
use anyhow::Result;
use serde::Serialize;

pub fn handle(session: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("retention", sub)) => retention(session, sub)?,
        Some(("revenue", sub)) => revenue(session, sub)?,
        Some(("summary", sub)) => summary(session, sub)?,
        _ => {}
    }
    Ok(())
}

fn matrix_rows<T>(matrix: &CohortMatrix<T>, fmt: impl Fn(&T) -> String) -> Vec<Vec<String>> {
    matrix
        .rows
        .iter()
        .map(|(cohort, cells)| {
            std::iter::once(cohort.to_string())
                .chain(cells.iter().map(|c| c.as_ref().map(&fmt).unwrap_or_default()))
                .collect()
        })
        .collect()
}

fn matrix_headers(ages: usize) -> Vec<String> {
    std::iter::once("Cohort".to_string())
        .chain((0..ages).map(|k| format!("M{}", k)))
        .collect()
}

fn retention(session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let selection = selection_from(sub)?;
    let table = cohort::build(session.transactions(), &selection);
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");

    let (ages, rows) = if sub.get_flag("counts") {
        let matrix = table.active_matrix();
        if maybe_print_json(json_flag, jsonl_flag, &matrix)? {
            return Ok(());
        }
        (matrix.ages, matrix_rows(&matrix, |n| n.to_string()))
    } else {
        let matrix = table.retention_matrix();
        if maybe_print_json(json_flag, jsonl_flag, &matrix)? {
            return Ok(());
        }
        (matrix.ages, matrix_rows(&matrix, |r| fmt_rate(Some(*r))))
    };
    let headers = matrix_headers(ages);
    let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
    println!("{}", pretty_table(&headers, rows));
    Ok(())
}

fn revenue(session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let selection = selection_from(sub)?;
    let table = cohort::build(session.transactions(), &selection);
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");

    if sub.get_flag("by-age") {
        let by_age = table.revenue_by_age(None);
        if !maybe_print_json(json_flag, jsonl_flag, &by_age)? {
            let rows = by_age
                .iter()
                .map(|(age, v)| vec![format!("M{}", age), fmt_money(v)])
                .collect();
            println!("{}", pretty_table(&["Age", "Net revenue"], rows));
        }
        return Ok(());
    }

    let matrix = table.revenue_matrix();
    if maybe_print_json(json_flag, jsonl_flag, &matrix)? {
        return Ok(());
    }
    let headers = matrix_headers(matrix.ages);
    let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
    println!("{}", pretty_table(&headers, matrix_rows(&matrix, fmt_money)));
    Ok(())
}

#[derive(Serialize)]
struct CohortSummary {
    cohort: String,
    customers: usize,
    observed_months: u32,
    retention_m1: Option<f64>,
    retention_m3: Option<f64>,
    early_revenue: rust_decimal::Decimal,
    empirical_clv: Option<rust_decimal::Decimal>,
}

fn summary(session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let selection = selection_from(sub)?;
    let table = cohort::build(session.transactions(), &selection);
    let days = session.settings.early_revenue_days;
    let data: Vec<CohortSummary> = table
        .rows
        .iter()
        .map(|r| CohortSummary {
            cohort: r.cohort.to_string(),
            customers: r.size,
            observed_months: r.observed_ages(),
            retention_m1: r.retention(1),
            retention_m3: r.retention(3),
            early_revenue: r.cumulative_revenue(cohort::age_bucket_for_days(days)),
            empirical_clv: r.empirical_clv(),
        })
        .collect();
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let rows = data
        .iter()
        .map(|s| {
            vec![
                s.cohort.clone(),
                s.customers.to_string(),
                s.observed_months.to_string(),
                fmt_rate(s.retention_m1),
                fmt_rate(s.retention_m3),
                fmt_money(&s.early_revenue),
                s.empirical_clv.map(|v| fmt_money(&v)).unwrap_or_default(),
            ]
        })
        .collect();
    let early = format!("CA {}d", days);
    println!(
        "{}",
        pretty_table(
            &["Cohort", "Customers", "Months", "M+1", "M+3", early.as_str(), "Empirical CLV"],
            rows
        )
    );
    Ok(())
}
