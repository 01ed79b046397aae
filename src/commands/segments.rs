// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{rfm_options_from, selection_from};
use crate::rfm;
use crate::session::Session;
use crate::utils::{fmt_money, maybe_print_json, pretty_table};
use anyhow::Result;

pub fn handle(session: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("scores", sub)) => scores(session, sub)?,
        Some(("segments", sub)) => segments(session, sub)?,
        _ => {}
    }
    Ok(())
}

fn scores(session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let selection = selection_from(sub)?;
    let opts = rfm_options_from(session, sub)?;
    let limit = *sub.get_one::<usize>("limit").unwrap_or(&20);
    let table = rfm::compute(session.transactions(), &selection, &opts);

    let mut best: Vec<&rfm::RfmProfile> = table.profiles.iter().collect();
    best.sort_by(|a, b| {
        b.score_sum()
            .cmp(&a.score_sum())
            .then_with(|| b.monetary.cmp(&a.monetary))
    });
    best.truncate(limit);
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &best)? {
        return Ok(());
    }
    let rows = best
        .iter()
        .map(|p| {
            vec![
                p.customer_id.clone(),
                p.recency_days.to_string(),
                p.frequency.to_string(),
                fmt_money(&p.monetary),
                p.segment_code.clone(),
                p.segment.to_string(),
            ]
        })
        .collect();
    if let Some(d) = table.reference_date {
        println!("Reference date: {} ({} customers profiled)", d, table.len());
    }
    println!(
        "{}",
        pretty_table(
            &["Customer", "Recency (d)", "Frequency", "Monetary", "RFM", "Segment"],
            rows
        )
    );
    Ok(())
}

fn segments(session: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let selection = selection_from(sub)?;
    let opts = rfm_options_from(session, sub)?;
    let table = rfm::compute(session.transactions(), &selection, &opts);
    let metrics = rfm::segment_metrics(session.transactions(), &selection, &table);
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &metrics)? {
        return Ok(());
    }
    let rows = metrics
        .iter()
        .map(|m| {
            vec![
                m.priority.to_string(),
                m.segment.to_string(),
                m.customers.to_string(),
                fmt_money(&m.revenue),
                format!("{:.1}%", m.share_of_revenue),
                fmt_money(&m.average_line),
                m.invoices.to_string(),
                m.action.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &[
                "Priority",
                "Segment",
                "Customers",
                "Revenue",
                "Share",
                "Avg line",
                "Invoices",
                "Action",
            ],
            rows
        )
    );
    Ok(())
}
