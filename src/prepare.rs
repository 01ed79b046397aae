// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::dataset::{Column, Dataset};
use crate::error::{DataWarning, Result};
use crate::models::{Transaction, YearMonth};
use crate::utils::{parse_customer_id, parse_quantity, parse_timestamp, quantile};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::{BTreeSet, HashMap, HashSet};

static CANCELLATION: Lazy<Regex> = Lazy::new(|| Regex::new("^C").expect("static regex"));

#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub return_marker: Regex,
    pub drop_duplicates: bool,
    pub trim_outliers: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            return_marker: CANCELLATION.clone(),
            drop_duplicates: true,
            trim_outliers: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Prepared {
    pub transactions: Vec<Transaction>,
    pub rows_read: usize,
    pub warnings: Vec<DataWarning>,
}

impl Prepared {
    pub fn customer_count(&self) -> usize {
        self.transactions
            .iter()
            .map(|t| t.customer_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn cohorts(&self) -> BTreeSet<YearMonth> {
        self.transactions
            .iter()
            .filter_map(|t| t.acquisition_month)
            .collect()
    }

    pub fn last_invoice_month(&self) -> Option<YearMonth> {
        self.transactions.iter().map(|t| t.invoice_month).max()
    }

    pub fn period(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.transactions.iter().map(|t| t.invoiced_at).min()?;
        let last = self.transactions.iter().map(|t| t.invoiced_at).max()?;
        Some((first, last))
    }
}

struct Columns {
    invoice: usize,
    customer: usize,
    date: usize,
    quantity: usize,
    price: usize,
    country: usize,
    stock_code: Option<usize>,
    description: Option<usize>,
}

impl Columns {
    fn resolve(ds: &Dataset) -> Result<Self> {
        let [invoice, customer, date, quantity, price, country] = {
            let mut idx = [0usize; 6];
            for (slot, col) in idx.iter_mut().zip(Column::REQUIRED) {
                *slot = ds.require(col)?;
            }
            idx
        };
        Ok(Self {
            invoice,
            customer,
            date,
            quantity,
            price,
            country,
            stock_code: ds.position(Column::StockCode),
            description: ds.position(Column::Description),
        })
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

fn optional_cell(row: &[String], idx: Option<usize>) -> Option<String> {
    idx.map(|i| cell(row, i))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_price(s: &str) -> Option<Decimal> {
    s.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

/// Turns the raw table into typed transactions with net amount, return flag,
/// invoice month and acquisition month.
///
/// Only a missing required column is fatal. Rows without a customer id or
/// with unparseable values are dropped and counted in the warnings.
pub fn prepare(ds: &Dataset, opts: &PrepareOptions) -> Result<Prepared> {
    let cols = Columns::resolve(ds)?;
    let mut warnings = Vec::new();

    let mut null_customers = 0usize;
    let mut unparseable = 0usize;
    let mut duplicates = 0usize;
    let mut seen: HashSet<&[String]> = HashSet::new();
    let mut transactions = Vec::with_capacity(ds.len());

    for row in ds.rows() {
        let Some(customer_id) = parse_customer_id(cell(row, cols.customer)) else {
            null_customers += 1;
            continue;
        };
        if opts.drop_duplicates && !seen.insert(row.as_slice()) {
            duplicates += 1;
            continue;
        }
        let quantity = parse_quantity(cell(row, cols.quantity));
        let unit_price = parse_price(cell(row, cols.price));
        let invoiced_at = parse_timestamp(cell(row, cols.date));
        let (Some(quantity), Some(unit_price), Some(invoiced_at)) =
            (quantity, unit_price, invoiced_at)
        else {
            unparseable += 1;
            continue;
        };
        // an amount outside the decimal range is as unusable as a bad cell
        let Some(gross) = Decimal::from(quantity).checked_mul(unit_price) else {
            unparseable += 1;
            continue;
        };

        let invoice_no = cell(row, cols.invoice).to_string();
        let is_return = quantity < 0 || opts.return_marker.is_match(&invoice_no);
        let net_amount = if is_return { -gross.abs() } else { gross };

        transactions.push(Transaction {
            invoice_no,
            customer_id,
            stock_code: optional_cell(row, cols.stock_code),
            description: optional_cell(row, cols.description),
            quantity,
            unit_price,
            invoiced_at,
            country: cell(row, cols.country).to_string(),
            net_amount,
            is_return,
            invoice_month: YearMonth::of(&invoiced_at),
            acquisition_month: None,
        });
    }

    if null_customers > 0 {
        DataWarning::NullCustomerIds {
            dropped: null_customers,
        }
        .emit(&mut warnings);
    }
    if unparseable > 0 {
        DataWarning::UnparseableRows {
            dropped: unparseable,
        }
        .emit(&mut warnings);
    }
    if duplicates > 0 {
        DataWarning::DuplicateRows {
            removed: duplicates,
        }
        .emit(&mut warnings);
    }

    if opts.trim_outliers {
        let removed = trim_outliers(&mut transactions);
        if removed > 0 {
            DataWarning::OutliersTrimmed { removed }.emit(&mut warnings);
        }
    }

    let return_only = assign_acquisition(&mut transactions);
    if return_only > 0 {
        DataWarning::ReturnOnlyCustomers {
            customers: return_only,
        }
        .emit(&mut warnings);
    }

    log::debug!(
        "prepared {} of {} row(s)",
        transactions.len(),
        ds.len()
    );
    Ok(Prepared {
        transactions,
        rows_read: ds.len(),
        warnings,
    })
}

// Keeps sales within the 1%-99% amount quantiles; returns always stay.
fn trim_outliers(transactions: &mut Vec<Transaction>) -> usize {
    let mut sales: Vec<f64> = transactions
        .iter()
        .filter(|t| !t.is_return)
        .filter_map(|t| t.net_amount.to_f64())
        .collect();
    sales.sort_by(|a, b| a.total_cmp(b));
    let (Some(lo), Some(hi)) = (quantile(&sales, 0.01), quantile(&sales, 0.99)) else {
        return 0;
    };
    let before = transactions.len();
    transactions.retain(|t| {
        t.is_return
            || t.net_amount
                .to_f64()
                .is_some_and(|v| v >= lo && v <= hi)
    });
    before - transactions.len()
}

/// Stamps each row with its customer's first non-return month and returns
/// how many customers have none.
fn assign_acquisition(transactions: &mut [Transaction]) -> usize {
    let mut first: HashMap<String, YearMonth> = HashMap::new();
    let mut customers: HashSet<&str> = HashSet::new();
    for t in transactions.iter() {
        customers.insert(t.customer_id.as_str());
    }
    let total = customers.len();
    for t in transactions.iter().filter(|t| !t.is_return) {
        first
            .entry(t.customer_id.clone())
            .and_modify(|m| *m = (*m).min(t.invoice_month))
            .or_insert(t.invoice_month);
    }
    let acquired = first.len();
    for t in transactions.iter_mut() {
        t.acquisition_month = first.get(&t.customer_id).copied();
    }
    total - acquired
}
