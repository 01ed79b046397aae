// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{rfm_options_from, selection_from};
use crate::export::{write_to_path, ExportFormat};
use crate::session::Session;
use crate::{cohort, rfm};
use anyhow::{anyhow, Context, Result};
use std::path::Path;

pub fn handle(session: &Session, m: &clap::ArgMatches) -> Result<()> {
    let Some((name, sub)) = m.subcommand() else {
        return Ok(());
    };
    let fmt: ExportFormat = sub.get_one::<String>("format").unwrap().parse()?;
    let out = Path::new(sub.get_one::<String>("out").unwrap().trim());
    let txns = session.transactions();

    match name {
        "retention" => {
            let table = cohort::build(txns, &selection_from(sub)?);
            write_to_path(&table.retention_matrix(), fmt, out)
        }
        "revenue" => {
            let table = cohort::build(txns, &selection_from(sub)?);
            write_to_path(&table.revenue_matrix(), fmt, out)
        }
        "rfm" => {
            let table = rfm::compute(txns, &selection_from(sub)?, &rfm_options_from(session, sub)?);
            write_to_path(&table, fmt, out)
        }
        "activable" => {
            let table = rfm::compute(txns, &selection_from(sub)?, &rfm_options_from(session, sub)?);
            write_to_path(&table.activable(), fmt, out)
        }
        "segments" => {
            let selection = selection_from(sub)?;
            let table = rfm::compute(txns, &selection, &rfm_options_from(session, sub)?);
            let metrics = rfm::segment_metrics(txns, &selection, &table);
            write_to_path(metrics.as_slice(), fmt, out)
        }
        "scenario" => {
            let cmp = super::scenario::run(session, sub)?
                .ok_or_else(|| anyhow!("No data for the selected cohort, nothing exported"))?;
            write_to_path(&cmp, fmt, out)
        }
        other => return Err(anyhow!("Unknown export table '{}'", other)),
    }
    .with_context(|| format!("Export {} to {}", name, out.display()))?;

    println!("Exported {} to {}", name, out.display());
    Ok(())
}
