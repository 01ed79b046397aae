// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Acquisition cohorts: who came back, and what they spent, month by month.

use crate::error::DataWarning;
use crate::models::{Selection, Transaction, YearMonth};
use crate::utils::saturating_sum;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Age bucket (in months) that covers the first `days` days after acquisition.
pub fn age_bucket_for_days(days: u32) -> u32 {
    days.div_ceil(30).saturating_sub(1)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRow {
    pub cohort: YearMonth,
    pub size: usize,
    /// Distinct customers with a purchase at each age; `None` past the
    /// observation window.
    pub active: Vec<Option<usize>>,
    pub revenue: Vec<Option<Decimal>>,
}

impl CohortRow {
    pub fn observed_ages(&self) -> u32 {
        self.active.iter().filter(|a| a.is_some()).count() as u32
    }

    pub fn retention(&self, age: usize) -> Option<f64> {
        let active = (*self.active.get(age)?)?;
        (self.size > 0).then(|| active as f64 / self.size as f64)
    }

    pub fn retention_curve(&self) -> Vec<Option<f64>> {
        (0..self.active.len()).map(|k| self.retention(k)).collect()
    }

    pub fn total_revenue(&self) -> Decimal {
        saturating_sum(self.revenue.iter().flatten().copied())
    }

    pub fn cumulative_revenue(&self, through_age: u32) -> Decimal {
        saturating_sum(
            self.revenue
                .iter()
                .take(through_age as usize + 1)
                .flatten()
                .copied(),
        )
    }

    /// Observed net revenue per original cohort customer, undiscounted.
    pub fn empirical_clv(&self) -> Option<Decimal> {
        (self.size > 0).then(|| self.total_revenue() / Decimal::from(self.size))
    }
}

/// A cohort x age grid; `None` cells are outside the observation window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortMatrix<T> {
    pub ages: usize,
    pub rows: Vec<(YearMonth, Vec<Option<T>>)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CohortTable {
    pub rows: Vec<CohortRow>,
    /// Number of age columns, i.e. the oldest cohort's observed ages.
    pub width: usize,
    pub observed_through: Option<YearMonth>,
    pub warnings: Vec<DataWarning>,
}

#[derive(Default)]
struct Acc<'a> {
    members: HashSet<&'a str>,
    active: BTreeMap<u32, HashSet<&'a str>>,
    revenue: BTreeMap<u32, Decimal>,
}

/// Builds the cohort table for the selected rows of `txns`.
///
/// A cohort's members are the customers with a selected non-return row in
/// their acquisition month; rows of anyone else are not attributed, so
/// size, activity and revenue always describe the same people.
///
/// The observation window ends at the last invoice month of the whole
/// dataset, so a filtered selection still knows which ages were observable.
pub fn build(txns: &[Transaction], selection: &Selection) -> CohortTable {
    let Some(end) = txns.iter().map(|t| t.invoice_month).max() else {
        return CohortTable::default();
    };
    let mut warnings = Vec::new();
    let mut pre_acquisition = 0usize;
    let mut outside = 0usize;
    let selected: Vec<&Transaction> = selection.apply(txns);

    let mut cohorts: BTreeMap<YearMonth, Acc> = BTreeMap::new();
    for t in selected.iter().copied().filter(|t| !t.is_return) {
        if let Some(acq) = t.acquisition_month {
            if t.invoice_month == acq {
                cohorts
                    .entry(acq)
                    .or_default()
                    .members
                    .insert(t.customer_id.as_str());
            }
        }
    }

    for t in selected.iter().copied() {
        let Some(acq) = t.acquisition_month else {
            continue;
        };
        let age = t.invoice_month.months_since(acq);
        if age < 0 {
            pre_acquisition += 1;
            continue;
        }
        let Some(acc) = cohorts
            .get_mut(&acq)
            .filter(|acc| acc.members.contains(t.customer_id.as_str()))
        else {
            outside += 1;
            continue;
        };
        let age = age as u32;
        let cell = acc.revenue.entry(age).or_insert(Decimal::ZERO);
        *cell = cell.saturating_add(t.net_amount);
        if !t.is_return {
            acc.active
                .entry(age)
                .or_default()
                .insert(t.customer_id.as_str());
        }
    }
    if outside > 0 {
        log::debug!(
            "{} selected row(s) belong to customers acquired outside the selection",
            outside
        );
    }
    if pre_acquisition > 0 {
        DataWarning::PreAcquisitionActivity {
            rows: pre_acquisition,
        }
        .emit(&mut warnings);
    }

    let width = cohorts
        .keys()
        .map(|c| end.months_since(*c) as usize + 1)
        .max()
        .unwrap_or(0);

    let rows = cohorts
        .into_iter()
        .map(|(cohort, acc)| {
            let observed = end.months_since(cohort) as usize + 1;
            let mut active = vec![None; width];
            let mut revenue = vec![None; width];
            for age in 0..observed {
                let retained = acc.active.get(&(age as u32)).map_or(0, |ids| ids.len());
                active[age] = Some(retained);
                revenue[age] = Some(
                    acc.revenue
                        .get(&(age as u32))
                        .copied()
                        .unwrap_or(Decimal::ZERO),
                );
            }
            CohortRow {
                cohort,
                size: acc.members.len(),
                active,
                revenue,
            }
        })
        .collect::<Vec<_>>();

    log::debug!("built {} cohort(s) over {} age(s)", rows.len(), width);
    CohortTable {
        rows,
        width,
        observed_through: Some(end),
        warnings,
    }
}

impl CohortTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cohort(&self, month: YearMonth) -> Option<&CohortRow> {
        self.rows.iter().find(|r| r.cohort == month)
    }

    pub fn total_customers(&self) -> usize {
        self.rows.iter().map(|r| r.size).sum()
    }

    pub fn total_revenue(&self) -> Decimal {
        saturating_sum(self.rows.iter().map(CohortRow::total_revenue))
    }

    fn selected(&self, cohort: Option<YearMonth>) -> impl Iterator<Item = &CohortRow> {
        self.rows
            .iter()
            .filter(move |r| cohort.is_none_or(|c| r.cohort == c))
    }

    pub fn retention_matrix(&self) -> CohortMatrix<f64> {
        CohortMatrix {
            ages: self.width,
            rows: self
                .rows
                .iter()
                .map(|r| (r.cohort, r.retention_curve()))
                .collect(),
        }
    }

    pub fn active_matrix(&self) -> CohortMatrix<usize> {
        CohortMatrix {
            ages: self.width,
            rows: self.rows.iter().map(|r| (r.cohort, r.active.clone())).collect(),
        }
    }

    pub fn revenue_matrix(&self) -> CohortMatrix<Decimal> {
        CohortMatrix {
            ages: self.width,
            rows: self
                .rows
                .iter()
                .map(|r| (r.cohort, r.revenue.clone()))
                .collect(),
        }
    }

    /// Net revenue per cohort age, across all cohorts or for one.
    /// Ages that no selected cohort has reached are left out.
    pub fn revenue_by_age(&self, cohort: Option<YearMonth>) -> Vec<(u32, Decimal)> {
        let mut out = Vec::new();
        for age in 0..self.width {
            let cells: Vec<Decimal> = self
                .selected(cohort)
                .filter_map(|r| r.revenue.get(age).copied().flatten())
                .collect();
            if !cells.is_empty() {
                out.push((age as u32, saturating_sum(cells)));
            }
        }
        out
    }

    pub fn cumulative_revenue(&self, cohort: Option<YearMonth>, through_age: u32) -> Decimal {
        saturating_sum(
            self.selected(cohort)
                .map(|r| r.cumulative_revenue(through_age)),
        )
    }

    /// Revenue earned within roughly `days` days of acquisition.
    pub fn revenue_within_days(&self, cohort: Option<YearMonth>, days: u32) -> Decimal {
        self.cumulative_revenue(cohort, age_bucket_for_days(days))
    }

    /// Observed revenue per acquired customer; `None` when nothing matches.
    pub fn empirical_clv(&self, cohort: Option<YearMonth>) -> Option<Decimal> {
        let (size, revenue) = self
            .selected(cohort)
            .fold((0usize, Decimal::ZERO), |(s, v), r| {
                (s + r.size, v.saturating_add(r.total_revenue()))
            });
        (size > 0).then(|| revenue / Decimal::from(size))
    }

    /// Customer-weighted retention per age over the cohorts observed at
    /// that age.
    pub fn average_retention(&self, cohort: Option<YearMonth>) -> Vec<Option<f64>> {
        (0..self.width)
            .map(|age| {
                let (active, size) = self
                    .selected(cohort)
                    .filter_map(|r| r.active.get(age).copied().flatten().map(|a| (a, r.size)))
                    .fold((0usize, 0usize), |(a, s), (ra, rs)| (a + ra, s + rs));
                (size > 0).then(|| active as f64 / size as f64)
            })
            .collect()
    }

    /// Plain mean of the cohorts' retention at `age`.
    pub fn mean_retention_at(&self, age: usize) -> Option<f64> {
        let rates: Vec<f64> = self.rows.iter().filter_map(|r| r.retention(age)).collect();
        (!rates.is_empty()).then(|| rates.iter().sum::<f64>() / rates.len() as f64)
    }

    /// Net revenue per active customer-month.
    pub fn revenue_per_active(&self, cohort: Option<YearMonth>) -> Option<Decimal> {
        let (active, revenue) = self.selected(cohort).fold(
            (0usize, Decimal::ZERO),
            |(a, v), r| {
                (
                    a + r.active.iter().flatten().sum::<usize>(),
                    v.saturating_add(r.total_revenue()),
                )
            },
        );
        (active > 0).then(|| revenue / Decimal::from(active))
    }

    /// Flags selected cohorts observed for fewer months than `horizon`.
    pub fn window_warnings(&self, cohort: Option<YearMonth>, horizon: u32) -> Vec<DataWarning> {
        let mut out = Vec::new();
        for r in self.selected(cohort) {
            let observed = r.observed_ages();
            if observed < horizon {
                DataWarning::ShortObservationWindow {
                    cohort: r.cohort,
                    observed,
                    requested: horizon,
                }
                .emit(&mut out);
            }
        }
        out
    }
}
