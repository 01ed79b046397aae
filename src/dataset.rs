// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Raw, untyped transaction table as read from the cleaned CSV.

use crate::error::{AnalyticsError, Result};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    InvoiceNo,
    CustomerId,
    StockCode,
    Description,
    Quantity,
    InvoiceDate,
    UnitPrice,
    Country,
}

impl Column {
    pub const REQUIRED: [Column; 6] = [
        Column::InvoiceNo,
        Column::CustomerId,
        Column::InvoiceDate,
        Column::Quantity,
        Column::UnitPrice,
        Column::Country,
    ];

    /// Header used by the cleaned export.
    pub fn name(self) -> &'static str {
        self.aliases()[0]
    }

    // First entry is the cleaned name, the rest are raw export spellings.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::InvoiceNo => &["InvoiceNo", "Invoice"],
            Column::CustomerId => &["CustomerID", "Customer ID"],
            Column::StockCode => &["StockCode"],
            Column::Description => &["Description"],
            Column::Quantity => &["Quantity"],
            Column::InvoiceDate => &["InvoiceDate"],
            Column::UnitPrice => &["UnitPrice", "Price"],
            Column::Country => &["Country"],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Reads a headed CSV. Cells that are not valid UTF-8 are decoded as
    /// Latin-1, the encoding of the public retail export.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(rdr);
        let headers = rdr
            .byte_headers()?
            .iter()
            .map(|h| decode(h).trim().to_string())
            .collect();
        let mut rows = Vec::new();
        for rec in rdr.byte_records() {
            let rec = rec?;
            rows.push(rec.iter().map(decode).collect());
        }
        log::debug!("read {} raw row(s)", rows.len());
        Ok(Self { headers, rows })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position(&self, column: Column) -> Option<usize> {
        column
            .aliases()
            .iter()
            .find_map(|alias| self.headers.iter().position(|h| h == alias))
    }

    pub fn require(&self, column: Column) -> Result<usize> {
        self.position(column)
            .ok_or_else(|| AnalyticsError::MissingColumn(column.name().to_string()))
    }
}

fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
