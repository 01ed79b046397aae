// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Recency / Frequency / Monetary profiling and quintile scoring.

use crate::error::DataWarning;
use crate::models::{Selection, Transaction};
use crate::utils::saturating_sum;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

pub const SCORE_BINS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RfmAxis {
    Recency,
    Frequency,
    Monetary,
}

impl fmt::Display for RfmAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RfmAxis::Recency => "recency",
            RfmAxis::Frequency => "frequency",
            RfmAxis::Monetary => "monetary",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Segment {
    Champions,
    Loyal,
    PotentialLoyalists,
    New,
    Promising,
    NeedAttention,
    AtRisk,
    Hibernating,
    Lost,
    Others,
}

impl Segment {
    pub fn classify(r: u8, f: u8, m: u8) -> Self {
        if r >= 4 && f >= 4 && m >= 4 {
            Segment::Champions
        } else if r >= 3 && f >= 4 && m >= 4 {
            Segment::Loyal
        } else if r >= 4 && f >= 3 && m >= 3 {
            Segment::PotentialLoyalists
        } else if r >= 4 && f <= 2 {
            Segment::New
        } else if r >= 3 && f <= 2 && m >= 3 {
            Segment::Promising
        } else if r == 3 && f >= 3 && m >= 3 {
            Segment::NeedAttention
        } else if r <= 2 && f >= 3 && m >= 3 {
            Segment::AtRisk
        } else if r <= 2 && f <= 2 && m >= 3 {
            Segment::Hibernating
        } else if r <= 2 && f <= 2 && m <= 2 {
            Segment::Lost
        } else {
            Segment::Others
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Segment::Champions => "Champions",
            Segment::Loyal => "Loyal",
            Segment::PotentialLoyalists => "Potential Loyalists",
            Segment::New => "New",
            Segment::Promising => "Promising",
            Segment::NeedAttention => "Need Attention",
            Segment::AtRisk => "At Risk",
            Segment::Hibernating => "Hibernating",
            Segment::Lost => "Lost",
            Segment::Others => "Others",
        }
    }

    /// Segments worth a marketing action now.
    pub fn is_activable(self) -> bool {
        matches!(
            self,
            Segment::Champions | Segment::Loyal | Segment::PotentialLoyalists | Segment::NeedAttention
        )
    }

    /// 1 is the most urgent segment to activate.
    pub fn priority(self) -> u8 {
        self as u8 + 1
    }

    pub fn action(self) -> &'static str {
        match self {
            Segment::Champions => "Reward, ask for reviews, upsell premium",
            Segment::Loyal => "Loyalty programme, exclusive offers",
            Segment::PotentialLoyalists => "Regular engagement, personalised offers",
            Segment::New => "Onboarding, discovery offers",
            Segment::Promising => "Targeted offers, cross-sell",
            Segment::NeedAttention => "Re-engagement campaign, satisfaction survey",
            Segment::AtRisk => "Win-back offers, limited-time discounts",
            Segment::Hibernating => "Reactivation campaign",
            Segment::Lost => "Low cost: survey or remove from list",
            Segment::Others => "Review case by case",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct RfmOptions {
    /// Defaults to the day after the last selected invoice.
    pub reference_date: Option<NaiveDate>,
    pub include_returns: bool,
    /// Drops customers whose returns outweigh their purchases.
    pub positive_monetary_only: bool,
}

impl Default for RfmOptions {
    fn default() -> Self {
        Self {
            reference_date: None,
            include_returns: true,
            positive_monetary_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfmProfile {
    pub customer_id: String,
    pub last_purchase: NaiveDate,
    pub recency_days: i64,
    pub frequency: usize,
    pub monetary: Decimal,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    pub segment_code: String,
    pub segment: Segment,
}

impl RfmProfile {
    pub fn score_sum(&self) -> u8 {
        self.r_score + self.f_score + self.m_score
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RfmTable {
    pub reference_date: Option<NaiveDate>,
    pub profiles: Vec<RfmProfile>,
    pub warnings: Vec<DataWarning>,
}

impl RfmTable {
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn get(&self, customer_id: &str) -> Option<&RfmProfile> {
        self.profiles.iter().find(|p| p.customer_id == customer_id)
    }

    pub fn activable(&self) -> ActivableList<'_> {
        ActivableList {
            profiles: self
                .profiles
                .iter()
                .filter(|p| p.segment.is_activable())
                .collect(),
        }
    }
}

/// Customers in an activable segment, in profile order.
#[derive(Debug, Clone, Default)]
pub struct ActivableList<'a> {
    pub profiles: Vec<&'a RfmProfile>,
}

pub fn default_reference_date<'a, I>(txns: I) -> Option<NaiveDate>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    txns.into_iter()
        .map(|t| t.invoiced_at.date())
        .max()
        .and_then(|d| d.checked_add_days(Days::new(1)))
}

struct Raw {
    last: NaiveDate,
    invoices: HashSet<String>,
    monetary: Decimal,
}

/// Profiles every selected customer and scores each axis into quintiles.
pub fn compute(txns: &[Transaction], selection: &Selection, opts: &RfmOptions) -> RfmTable {
    let rows: Vec<&Transaction> = txns
        .iter()
        .filter(|t| selection.matches(t))
        .filter(|t| opts.include_returns || !t.is_return)
        .collect();
    let Some(reference) = opts
        .reference_date
        .or_else(|| default_reference_date(rows.iter().copied()))
    else {
        return RfmTable::default();
    };

    let mut raw: BTreeMap<&str, Raw> = BTreeMap::new();
    for t in &rows {
        let date = t.invoiced_at.date();
        let e = raw.entry(t.customer_id.as_str()).or_insert_with(|| Raw {
            last: date,
            invoices: HashSet::new(),
            monetary: Decimal::ZERO,
        });
        e.last = e.last.max(date);
        e.invoices.insert(t.invoice_no.clone());
        e.monetary = e.monetary.saturating_add(t.net_amount);
    }
    let customers: Vec<(&str, Raw)> = raw
        .into_iter()
        .filter(|(_, r)| !opts.positive_monetary_only || r.monetary > Decimal::ZERO)
        .collect();

    let recency: Vec<i64> = customers
        .iter()
        .map(|(_, r)| (reference - r.last).num_days())
        .collect();
    let frequency: Vec<usize> = customers.iter().map(|(_, r)| r.invoices.len()).collect();
    let monetary: Vec<Decimal> = customers.iter().map(|(_, r)| r.monetary).collect();

    let mut warnings = Vec::new();
    let r_scores = scored(&recency, RfmAxis::Recency, &mut warnings);
    let f_scores = scored(&frequency, RfmAxis::Frequency, &mut warnings);
    let m_scores = scored(&monetary, RfmAxis::Monetary, &mut warnings);

    let profiles = customers
        .into_iter()
        .enumerate()
        .map(|(i, (id, r))| {
            let (rs, fs, ms) = (r_scores[i], f_scores[i], m_scores[i]);
            RfmProfile {
                customer_id: id.to_string(),
                last_purchase: r.last,
                recency_days: recency[i],
                frequency: frequency[i],
                monetary: monetary[i],
                r_score: rs,
                f_score: fs,
                m_score: ms,
                segment_code: format!("{}{}{}", rs, fs, ms),
                segment: Segment::classify(rs, fs, ms),
            }
        })
        .collect::<Vec<_>>();

    log::debug!("scored {} customer(s) as of {}", profiles.len(), reference);
    RfmTable {
        reference_date: Some(reference),
        profiles,
        warnings,
    }
}

fn scored<T: Ord>(values: &[T], axis: RfmAxis, warnings: &mut Vec<DataWarning>) -> Vec<u8> {
    let (scores, bins) = quantile_scores(values, axis == RfmAxis::Recency);
    if !values.is_empty() && bins < SCORE_BINS {
        DataWarning::SparseQuantiles { axis, bins }.emit(warnings);
    }
    scores
}

/// Scores `values` 1..=5 by ascending quantile bins.
///
/// Equal values always share a bin. Bins are widened so every one of the
/// five is non-empty when there are at least five distinct values; with
/// fewer, each distinct value gets its own bin. The best bin scores 5 either
/// way: the highest values, or the lowest when `invert` is set. Returns the
/// scores in input order and the number of bins used.
pub fn quantile_scores<T: Ord>(values: &[T], invert: bool) -> (Vec<u8>, usize) {
    let n = values.len();
    if n == 0 {
        return (Vec::new(), 0);
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].cmp(&values[b]));

    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut start = 0;
    for i in 1..=n {
        if i == n || values[order[i]] != values[order[start]] {
            groups.push((start, i));
            start = i;
        }
    }

    let k = groups.len().min(SCORE_BINS);
    let mut scores = vec![0u8; n];
    let (mut bin, mut filled, mut in_bin) = (0usize, 0usize, 0usize);
    for (g, &(lo, hi)) in groups.iter().enumerate() {
        let bins_after = k - bin - 1;
        let target_reached = filled * k >= n * (bin + 1);
        // the remaining groups must still cover every remaining bin
        let forced = groups.len() - g == bins_after;
        if in_bin > 0 && bins_after > 0 && (target_reached || forced) {
            bin += 1;
            in_bin = 0;
        }
        let score = (if invert {
            SCORE_BINS - bin
        } else {
            SCORE_BINS - (k - 1 - bin)
        }) as u8;
        for &idx in &order[lo..hi] {
            scores[idx] = score;
        }
        filled += hi - lo;
        in_bin += 1;
    }
    (scores, k)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentMetrics {
    pub segment: Segment,
    pub priority: u8,
    pub customers: usize,
    pub revenue: Decimal,
    pub share_of_revenue: f64,
    pub average_line: Decimal,
    pub invoices: usize,
    pub action: &'static str,
}

/// Business totals per named segment, most urgent first.
pub fn segment_metrics(
    txns: &[Transaction],
    selection: &Selection,
    table: &RfmTable,
) -> Vec<SegmentMetrics> {
    let by_customer: HashMap<&str, Segment> = table
        .profiles
        .iter()
        .map(|p| (p.customer_id.as_str(), p.segment))
        .collect();

    struct Acc<'a> {
        customers: HashSet<&'a str>,
        invoices: HashSet<&'a str>,
        revenue: Decimal,
        lines: usize,
    }
    let mut acc: BTreeMap<Segment, Acc> = BTreeMap::new();
    for t in txns.iter().filter(|t| selection.matches(t)) {
        let Some(&segment) = by_customer.get(t.customer_id.as_str()) else {
            continue;
        };
        let a = acc.entry(segment).or_insert_with(|| Acc {
            customers: HashSet::new(),
            invoices: HashSet::new(),
            revenue: Decimal::ZERO,
            lines: 0,
        });
        a.customers.insert(t.customer_id.as_str());
        a.invoices.insert(t.invoice_no.as_str());
        a.revenue = a.revenue.saturating_add(t.net_amount);
        a.lines += 1;
    }

    let total = saturating_sum(acc.values().map(|a| a.revenue));
    acc.into_iter()
        .map(|(segment, a)| {
            let share = a
                .revenue
                .checked_div(total)
                .and_then(|r| r.to_f64())
                .map_or(0.0, |r| r * 100.0);
            SegmentMetrics {
                segment,
                priority: segment.priority(),
                customers: a.customers.len(),
                revenue: a.revenue,
                share_of_revenue: share,
                average_line: a.revenue / Decimal::from(a.lines.max(1)),
                invoices: a.invoices.len(),
                action: segment.action(),
            }
        })
        .collect()
}
