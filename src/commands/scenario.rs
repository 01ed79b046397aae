// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::scenario_from;
use crate::clv::{self, ClvParams, ScenarioComparison};
use crate::cohort;
use crate::models::Selection;
use crate::session::Session;
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;

/// Baseline and scenario for the arguments in `sub`; `None` when the cohort
/// filter matches nothing.
pub(crate) fn run(session: &Session, sub: &clap::ArgMatches) -> Result<Option<ScenarioComparison>> {
    let scenario = scenario_from(sub)?;
    let mut params: ClvParams = session.settings.clv_params();
    if let Some(h) = sub.get_one::<u32>("horizon") {
        params.horizon_months = (*h).max(1);
    }
    let table = cohort::build(session.transactions(), &Selection::all());
    Ok(clv::simulate(&table, &params, &scenario))
}

pub fn handle(session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let Some(cmp) = run(session, sub)? else {
        println!("No data for the selected cohort");
        return Ok(());
    };
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cmp)? {
        return Ok(());
    }

    let avg = |r: &[f64]| r.iter().skip(1).sum::<f64>() / (r.len().saturating_sub(1).max(1)) as f64;
    let line = |name: &str, b: f64, s: f64, pct: bool| {
        let f = |v: f64| {
            if pct {
                format!("{:.2}%", v * 100.0)
            } else {
                format!("{:.2}", v)
            }
        };
        vec![name.to_string(), f(b), f(s), f(s - b)]
    };
    let (b, s) = (&cmp.baseline, &cmp.scenario);
    let rows = vec![
        line("CLV per customer", b.clv_per_customer, s.clv_per_customer, false),
        line("Total CLV", b.total_clv, s.total_clv, false),
        line("Projected revenue", b.revenue, s.revenue, false),
        line("Avg retention (M1+)", avg(&b.retention), avg(&s.retention), true),
        line("Margin rate", b.margin_rate, s.margin_rate, true),
        line("Discount rate", b.discount_rate, s.discount_rate, true),
    ];
    let target = cmp
        .cohort
        .map(|c| c.to_string())
        .unwrap_or_else(|| "all cohorts".to_string());
    println!(
        "Scenario for {} ({} customers, empirical CLV {:.2})",
        target, cmp.customers, cmp.empirical_clv
    );
    println!(
        "{}",
        pretty_table(&["KPI", "Baseline", "Scenario", "Delta"], rows)
    );
    Ok(())
}
