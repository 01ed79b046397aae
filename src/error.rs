// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::YearMonth;
use crate::rfm::RfmAxis;
use serde::Serialize;
use thiserror::Error;

/// Fatal problems. Anything predictable about the data itself is a
/// [`DataWarning`] instead.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Required column '{0}' is missing from the dataset")]
    MissingColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Non-fatal data-quality findings, returned next to the result they concern.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataWarning {
    #[error("{dropped} row(s) without a customer id were dropped")]
    NullCustomerIds { dropped: usize },

    #[error("{dropped} row(s) with an unparseable quantity, price, date or amount were dropped")]
    UnparseableRows { dropped: usize },

    #[error("{removed} exact duplicate row(s) were removed")]
    DuplicateRows { removed: usize },

    #[error("{removed} outlier sale(s) outside the 1%-99% amount range were removed")]
    OutliersTrimmed { removed: usize },

    #[error("{customers} customer(s) only have returns and belong to no cohort")]
    ReturnOnlyCustomers { customers: usize },

    #[error("{rows} row(s) predate their customer's acquisition month and were left out of cohorts")]
    PreAcquisitionActivity { rows: usize },

    #[error("cohort {cohort} is observed for {observed} month(s), short of the {requested}-month horizon")]
    ShortObservationWindow {
        cohort: YearMonth,
        observed: u32,
        requested: u32,
    },

    #[error("{axis} only supports {bins} quantile bin(s) for this population")]
    SparseQuantiles { axis: RfmAxis, bins: usize },

    #[error("{name} of {requested} is out of range, {applied} was used")]
    ClippedParameter {
        name: String,
        requested: f64,
        applied: f64,
    },
}

impl DataWarning {
    pub(crate) fn emit(self, sink: &mut Vec<DataWarning>) {
        log::warn!("{}", self);
        sink.push(self);
    }
}
