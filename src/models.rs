// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::AnalyticsError;
use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of<D: Datelike>(date: &D) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Whole calendar months from `earlier` to `self`; negative when `self` is earlier.
    pub fn months_since(&self, earlier: YearMonth) -> i32 {
        (self.year - earlier.year) * 12 + self.month as i32 - earlier.month as i32
    }

    pub fn add_months(&self, n: u32) -> Self {
        let idx = self.year * 12 + (self.month as i32 - 1) + n as i32;
        Self {
            year: idx.div_euclid(12),
            month: idx.rem_euclid(12) as u32 + 1,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AnalyticsError::InvalidParameter {
            name: "month".into(),
            reason: format!("'{}' is not a YYYY-MM month", s),
        };
        let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).ok_or_else(invalid)
    }
}

impl From<YearMonth> for String {
    fn from(m: YearMonth) -> Self {
        m.to_string()
    }
}

impl TryFrom<String> for YearMonth {
    type Error = AnalyticsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A cleaned transaction line with its derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub invoice_no: String,
    pub customer_id: String,
    pub stock_code: Option<String>,
    pub description: Option<String>,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub invoiced_at: NaiveDateTime,
    pub country: String,
    pub net_amount: Decimal,
    pub is_return: bool,
    pub invoice_month: YearMonth,
    /// `None` for customers whose rows are all returns.
    pub acquisition_month: Option<YearMonth>,
}

impl Transaction {
    pub fn cohort_age(&self) -> Option<i32> {
        self.acquisition_month
            .map(|acq| self.invoice_month.months_since(acq))
    }
}

/// Which slice of the prepared data an analysis looks at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub cohorts: Vec<YearMonth>,
    pub countries: Vec<String>,
    pub continent: Option<String>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn cohort(month: YearMonth) -> Self {
        Self {
            cohorts: vec![month],
            ..Self::default()
        }
    }

    pub fn matches(&self, t: &Transaction) -> bool {
        if !self.cohorts.is_empty() {
            match t.acquisition_month {
                Some(acq) if self.cohorts.contains(&acq) => {}
                _ => return false,
            }
        }
        if !self.countries.is_empty() && !self.countries.iter().any(|c| c == &t.country) {
            return false;
        }
        if let Some(ref continent) = self.continent {
            if !crate::utils::continent_of(&t.country).eq_ignore_ascii_case(continent) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, txns: &'a [Transaction]) -> Vec<&'a Transaction> {
        txns.iter().filter(|t| self.matches(t)).collect()
    }
}
