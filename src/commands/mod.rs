// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod overview;
pub mod cohorts;
pub mod segments;
pub mod scenario;
pub mod exporter;
pub mod doctor;

use crate::clv::ScenarioParams;
use crate::models::Selection;
use crate::rfm::RfmOptions;
use crate::session::Session;
use crate::utils::{parse_date, parse_month, parse_percent};
use anyhow::Result;

pub(crate) fn selection_from(sub: &clap::ArgMatches) -> Result<Selection> {
    let cohorts = sub
        .get_many::<String>("cohort")
        .map(|vals| vals.map(|v| parse_month(v)).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
    let countries = sub
        .get_many::<String>("country")
        .map(|vals| vals.map(|v| v.trim().to_string()).collect())
        .unwrap_or_default();
    Ok(Selection {
        cohorts,
        countries,
        continent: sub.get_one::<String>("continent").map(|s| s.trim().to_string()),
    })
}

pub(crate) fn rfm_options_from(session: &Session, sub: &clap::ArgMatches) -> Result<RfmOptions> {
    let mut opts = session.rfm_options();
    if let Some(raw) = sub.get_one::<String>("as-of") {
        opts.reference_date = Some(parse_date(raw.trim())?);
    }
    if sub.get_flag("exclude-returns") {
        opts.include_returns = false;
    }
    opts.positive_monetary_only = sub.get_flag("positive-only");
    Ok(opts)
}

pub(crate) fn scenario_from(sub: &clap::ArgMatches) -> Result<ScenarioParams> {
    let pct = |name: &str| -> Result<f64> {
        match sub.get_one::<String>(name) {
            Some(raw) => parse_percent(raw),
            None => Ok(0.0),
        }
    };
    Ok(ScenarioParams {
        retention_delta: pct("retention-delta")?,
        margin_delta: pct("margin-delta")?,
        discount_delta: pct("discount-delta")?,
        price_discount: pct("price-discount")?,
        cohort: sub
            .get_one::<String>("cohort")
            .map(|s| parse_month(s))
            .transpose()?,
    })
}
