// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Projected customer lifetime value and what-if scenarios on top of the
//! cohort retention curves.

use crate::cohort::CohortTable;
use crate::error::DataWarning;
use crate::models::YearMonth;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClvParams {
    pub margin_rate: f64,
    /// Per-month time-value discount.
    pub discount_rate: f64,
    pub horizon_months: u32,
}

/// Overrides applied on top of a baseline. All zero is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    /// Relative change to retention at every age past 0, e.g. `-0.10`.
    pub retention_delta: f64,
    /// Added to the margin rate.
    pub margin_delta: f64,
    /// Added to the monthly discount rate.
    pub discount_delta: f64,
    /// Commercial price reduction on every future sale, in [0, 1].
    pub price_discount: f64,
    pub cohort: Option<YearMonth>,
}

/// Retention curve and unit economics the projections start from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineCurve {
    pub cohort: Option<YearMonth>,
    pub customers: usize,
    /// One value per projected month, age 0 first.
    pub retention: Vec<f64>,
    /// Ages taken from observation; later ones are extrapolated.
    pub observed_ages: usize,
    pub revenue_per_active: f64,
    pub empirical_clv: f64,
}

impl BaselineCurve {
    /// `None` when the selection holds no cohort, so callers can tell "no
    /// data" from a zero value.
    pub fn from_cohorts(
        table: &CohortTable,
        cohort: Option<YearMonth>,
        horizon_months: u32,
    ) -> Option<Self> {
        let customers = match cohort {
            Some(c) => table.cohort(c)?.size,
            None => table.total_customers(),
        };
        if customers == 0 {
            return None;
        }

        let observed: Vec<f64> = table
            .average_retention(cohort)
            .into_iter()
            .map_while(|r| r)
            .collect();
        let last = observed.len().checked_sub(1)?;
        // geometric monthly retention from age 0 to the last observed age
        let q = if last > 0 {
            observed[last].powf(1.0 / last as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let retention = (0..horizon_months as usize)
            .map(|k| match observed.get(k) {
                Some(r) => *r,
                None => observed[last] * q.powi((k - last) as i32),
            })
            .collect();

        Some(Self {
            cohort,
            customers,
            retention,
            observed_ages: observed.len(),
            revenue_per_active: table
                .revenue_per_active(cohort)
                .and_then(|d| d.to_f64())
                .unwrap_or(0.0),
            empirical_clv: table
                .empirical_clv(cohort)
                .and_then(|d| d.to_f64())
                .unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClvProjection {
    pub clv_per_customer: f64,
    pub total_clv: f64,
    /// Projected net revenue (CA) for the selection, undiscounted and
    /// before margin.
    pub revenue: f64,
    pub retention: Vec<f64>,
    pub margin_rate: f64,
    pub discount_rate: f64,
    pub price_discount: f64,
}

impl ClvProjection {
    fn project(
        curve: &BaselineCurve,
        retention: Vec<f64>,
        margin_rate: f64,
        discount_rate: f64,
        price_discount: f64,
    ) -> Self {
        let unit = curve.revenue_per_active * (1.0 - price_discount);
        let mut clv = 0.0;
        let mut revenue = 0.0;
        for (k, r) in retention.iter().enumerate() {
            clv += r * unit * margin_rate / (1.0 + discount_rate).powi(k as i32);
            revenue += r * unit;
        }
        let customers = curve.customers as f64;
        Self {
            clv_per_customer: clv,
            total_clv: clv * customers,
            revenue: revenue * customers,
            retention,
            margin_rate,
            discount_rate,
            price_discount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClvEstimate {
    pub curve: BaselineCurve,
    pub projection: ClvProjection,
    pub warnings: Vec<DataWarning>,
}

/// Baseline projection for one cohort or for every cohort.
pub fn estimate(
    table: &CohortTable,
    cohort: Option<YearMonth>,
    params: &ClvParams,
) -> Option<ClvEstimate> {
    let curve = BaselineCurve::from_cohorts(table, cohort, params.horizon_months)?;
    let projection = ClvProjection::project(
        &curve,
        curve.retention.clone(),
        params.margin_rate,
        params.discount_rate,
        0.0,
    );
    Some(ClvEstimate {
        warnings: extrapolation_warnings(table, &curve, params.horizon_months),
        curve,
        projection,
    })
}

// The curve comes from the oldest selected cohort once younger ones run out.
fn extrapolation_warnings(
    table: &CohortTable,
    curve: &BaselineCurve,
    horizon_months: u32,
) -> Vec<DataWarning> {
    let mut out = Vec::new();
    let observed = curve.observed_ages as u32;
    if observed >= horizon_months {
        return out;
    }
    if let Some(cohort) = curve.cohort.or_else(|| table.rows.first().map(|r| r.cohort)) {
        DataWarning::ShortObservationWindow {
            cohort,
            observed,
            requested: horizon_months,
        }
        .emit(&mut out);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioComparison {
    pub cohort: Option<YearMonth>,
    pub customers: usize,
    pub empirical_clv: f64,
    pub baseline: ClvProjection,
    pub scenario: ClvProjection,
    pub clv_delta: f64,
    pub revenue_delta: f64,
    pub warnings: Vec<DataWarning>,
}

/// Clamps `requested` into `[lo, hi]`. A NaN has no place in the range and
/// is replaced by `fallback`, the value the input leaves untouched.
fn clip(
    name: &str,
    requested: f64,
    (lo, hi): (f64, f64),
    fallback: f64,
    warnings: &mut Vec<DataWarning>,
) -> f64 {
    let applied = if requested.is_nan() {
        fallback
    } else {
        requested.clamp(lo, hi)
    };
    if applied != requested {
        DataWarning::ClippedParameter {
            name: name.to_string(),
            requested,
            applied,
        }
        .emit(warnings);
    }
    applied
}

/// Recomputes the projection under `scenario` and pairs it with the
/// untouched baseline for the same cohort selection. Horizon and discounting
/// method are shared so the two are comparable.
///
/// Out-of-range results are clipped and flagged rather than rejected.
/// Returns `None` when the cohort filter matches nothing.
pub fn simulate(
    table: &CohortTable,
    params: &ClvParams,
    scenario: &ScenarioParams,
) -> Option<ScenarioComparison> {
    let curve = BaselineCurve::from_cohorts(table, scenario.cohort, params.horizon_months)?;
    let mut warnings = extrapolation_warnings(table, &curve, params.horizon_months);

    let baseline = ClvProjection::project(
        &curve,
        curve.retention.clone(),
        params.margin_rate,
        params.discount_rate,
        0.0,
    );

    let delta = clip(
        "retention_delta",
        scenario.retention_delta,
        (-1.0, f64::MAX),
        0.0,
        &mut warnings,
    );
    let retention = adjust_retention(&curve.retention, delta, &mut warnings);
    let margin = clip(
        "margin_rate",
        params.margin_rate + scenario.margin_delta,
        (0.0, 1.0),
        params.margin_rate,
        &mut warnings,
    );
    let discount = clip(
        "discount_rate",
        params.discount_rate + scenario.discount_delta,
        (0.0, 1.0),
        params.discount_rate,
        &mut warnings,
    );
    let price_discount = clip(
        "price_discount",
        scenario.price_discount,
        (0.0, 1.0),
        0.0,
        &mut warnings,
    );
    let projected = ClvProjection::project(&curve, retention, margin, discount, price_discount);

    Some(ScenarioComparison {
        cohort: scenario.cohort,
        customers: curve.customers,
        empirical_clv: curve.empirical_clv,
        clv_delta: projected.clv_per_customer - baseline.clv_per_customer,
        revenue_delta: projected.revenue - baseline.revenue,
        baseline,
        scenario: projected,
        warnings,
    })
}

/// Scales retention past age 0 by `1 + delta`, keeping every value in [0, 1].
pub fn adjust_retention(curve: &[f64], delta: f64, warnings: &mut Vec<DataWarning>) -> Vec<f64> {
    curve
        .iter()
        .enumerate()
        .map(|(age, &r)| {
            if age == 0 {
                return r;
            }
            clip(
                &format!("retention at age {}", age),
                r * (1.0 + delta),
                (0.0, 1.0),
                r,
                warnings,
            )
        })
        .collect()
}

/// Closed-form CLV for a constant per-period margin, retention and discount:
/// `m * r / (1 + d - r)`. `None` when the series does not converge.
pub fn closed_form_clv(margin: f64, retention: f64, discount: f64) -> Option<f64> {
    let denom = 1.0 + discount - retention;
    (denom > 0.0).then(|| margin * retention / denom)
}
