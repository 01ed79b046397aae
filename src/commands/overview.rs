// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::selection_from;
use crate::session::Session;
use crate::utils::{fmt_money, fmt_rate, maybe_print_json, pretty_table};
use crate::{cohort, kpi, rfm};
use anyhow::Result;

pub fn handle(session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let selection = selection_from(sub)?;
    let txns = session.transactions();
    let settings = &session.settings;

    let cohorts = cohort::build(txns, &selection);
    let profiles = rfm::compute(txns, &selection, &session.rfm_options());
    let kpis = kpi::overview(
        txns,
        &selection,
        &cohorts,
        &profiles,
        &settings.clv_params(),
        settings.early_revenue_days,
    );
    if maybe_print_json(json_flag, jsonl_flag, &kpis)? {
        return Ok(());
    }

    let money = |d: Option<rust_decimal::Decimal>| d.map(|v| fmt_money(&v)).unwrap_or_default();
    let period = match (kpis.first_invoice, kpis.last_invoice) {
        (Some(a), Some(b)) => format!("{} -> {}", a.format("%d/%m/%Y"), b.format("%d/%m/%Y")),
        _ => "(no data)".to_string(),
    };
    let rows = vec![
        vec!["Period".into(), period],
        vec!["Active customers".into(), kpis.active_customers.to_string()],
        vec!["Net revenue".into(), fmt_money(&kpis.total_revenue)],
        vec!["CLV baseline".into(), money(kpis.clv_baseline)],
        vec!["Avg monthly revenue".into(), money(kpis.avg_monthly_revenue)],
        vec!["Avg revenue per cohort age".into(), money(kpis.avg_revenue_per_age)],
        vec!["RFM population".into(), kpis.rfm_population.to_string()],
        vec![
            format!("North Star ({}d revenue / customer)", kpis.early_revenue_days),
            money(kpis.north_star),
        ],
        vec!["Retention M+3".into(), fmt_rate(kpis.retention_m3)],
        vec![
            format!("Projected CLV ({} months)", settings.horizon_months),
            kpis.projected_clv
                .map(|v| format!("{:.2}", v))
                .unwrap_or_default(),
        ],
    ];
    println!("{}", pretty_table(&["KPI", "Value"], rows));

    if sub.get_flag("monthly") {
        let data = kpi::monthly_revenue(txns, &selection)
            .into_iter()
            .map(|(m, v)| vec![m.to_string(), fmt_money(&v)])
            .collect();
        println!("{}", pretty_table(&["Month", "Net revenue"], data));
    }
    Ok(())
}
