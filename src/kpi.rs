// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::clv::{self, ClvParams};
use crate::cohort::CohortTable;
use crate::models::{Selection, Transaction, YearMonth};
use crate::rfm::RfmTable;
use crate::utils::saturating_sum;
use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewKpis {
    pub first_invoice: Option<NaiveDateTime>,
    pub last_invoice: Option<NaiveDateTime>,
    pub active_customers: usize,
    pub total_revenue: Decimal,
    /// Total net revenue over active customers.
    pub clv_baseline: Option<Decimal>,
    pub avg_monthly_revenue: Option<Decimal>,
    pub avg_revenue_per_age: Option<Decimal>,
    pub rfm_population: usize,
    pub early_revenue_days: u32,
    /// Average revenue per customer within `early_revenue_days` of their
    /// first purchase.
    pub north_star: Option<Decimal>,
    pub retention_m3: Option<f64>,
    pub projected_clv: Option<f64>,
}

pub fn monthly_revenue(txns: &[Transaction], selection: &Selection) -> Vec<(YearMonth, Decimal)> {
    let mut by_month: BTreeMap<YearMonth, Decimal> = BTreeMap::new();
    for t in txns.iter().filter(|t| selection.matches(t)) {
        let cell = by_month.entry(t.invoice_month).or_insert(Decimal::ZERO);
        *cell = cell.saturating_add(t.net_amount);
    }
    by_month.into_iter().collect()
}

pub fn north_star(txns: &[Transaction], selection: &Selection, days: u32) -> Option<Decimal> {
    let rows: Vec<&Transaction> = selection.apply(txns);
    let mut first: HashMap<&str, NaiveDateTime> = HashMap::new();
    for t in rows.iter().filter(|t| !t.is_return) {
        first
            .entry(t.customer_id.as_str())
            .and_modify(|d| *d = (*d).min(t.invoiced_at))
            .or_insert(t.invoiced_at);
    }
    if first.is_empty() {
        return None;
    }
    let window = Duration::days(days as i64);
    let revenue = saturating_sum(
        rows.iter()
            .filter(|t| {
                first.get(t.customer_id.as_str()).is_some_and(|f| {
                    t.invoiced_at >= *f
                        && f.checked_add_signed(window)
                            .is_none_or(|until| t.invoiced_at <= until)
                })
            })
            .map(|t| t.net_amount),
    );
    Some(revenue / Decimal::from(first.len()))
}

fn mean(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    let (n, sum) = values
        .into_iter()
        .fold((0usize, Decimal::ZERO), |(n, s), v| (n + 1, s.saturating_add(v)));
    (n > 0).then(|| sum / Decimal::from(n))
}

/// Headline figures for the whole selection.
pub fn overview(
    txns: &[Transaction],
    selection: &Selection,
    cohorts: &CohortTable,
    rfm: &RfmTable,
    params: &ClvParams,
    early_revenue_days: u32,
) -> OverviewKpis {
    let rows = selection.apply(txns);
    let customers: HashSet<&str> = rows.iter().map(|t| t.customer_id.as_str()).collect();
    let total_revenue = saturating_sum(rows.iter().map(|t| t.net_amount));
    let active_customers = customers.len();

    OverviewKpis {
        first_invoice: rows.iter().map(|t| t.invoiced_at).min(),
        last_invoice: rows.iter().map(|t| t.invoiced_at).max(),
        active_customers,
        total_revenue,
        clv_baseline: (active_customers > 0)
            .then(|| total_revenue / Decimal::from(active_customers)),
        avg_monthly_revenue: mean(monthly_revenue(txns, selection).into_iter().map(|(_, v)| v)),
        avg_revenue_per_age: mean(cohorts.revenue_by_age(None).into_iter().map(|(_, v)| v)),
        rfm_population: rfm.len(),
        early_revenue_days,
        north_star: north_star(txns, selection, early_revenue_days),
        retention_m3: cohorts.mean_retention_at(3),
        projected_clv: clv::estimate(cohorts, None, params)
            .map(|e| e.projection.clv_per_customer),
    }
}
