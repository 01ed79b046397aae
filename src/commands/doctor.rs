// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::cohort;
use crate::error::DataWarning;
use crate::models::Selection;
use crate::session::Session;
use crate::utils::pretty_table;
use anyhow::Result;

/// Every data-quality finding for the loaded dataset, preparation first.
pub fn findings(session: &Session) -> Vec<DataWarning> {
    let table = cohort::build(session.transactions(), &Selection::all());
    let mut all = session.prepared.warnings.clone();
    all.extend(table.warnings);
    all
}

pub fn handle(session: &Session) -> Result<()> {
    let prepared = &session.prepared;
    println!(
        "{} row(s) read, {} kept, {} customer(s)",
        prepared.rows_read,
        prepared.transactions.len(),
        prepared.customer_count()
    );
    if let (Some((first, last)), Some(through)) = (prepared.period(), prepared.last_invoice_month()) {
        println!(
            "{} -> {}, {} cohort(s) observed through {}",
            first.date(),
            last.date(),
            prepared.cohorts().len(),
            through
        );
    }

    let rows: Vec<Vec<String>> = findings(session)
        .iter()
        .map(|w| {
            let kind = serde_json::to_value(w)
                .ok()
                .and_then(|v| v.get("kind").and_then(|k| k.as_str()).map(str::to_string))
                .unwrap_or_default();
            vec![kind, w.to_string()]
        })
        .collect();

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
