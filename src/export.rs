// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::clv::ScenarioComparison;
use crate::cohort::CohortMatrix;
use crate::error::{AnalyticsError, Result};
use crate::rfm::{ActivableList, RfmTable, SegmentMetrics};
use csv::WriterBuilder;
use rust_decimal::Decimal;
use serde_json::{json, Value as Json};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    /// Tab-separated, opens directly in spreadsheet tools.
    Tsv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "tsv" | "xls" | "spreadsheet" => Ok(ExportFormat::Tsv),
            "json" => Ok(ExportFormat::Json),
            other => Err(AnalyticsError::InvalidParameter {
                name: "format".into(),
                reason: format!("unknown format '{}' (use csv|tsv|xls|spreadsheet|json)", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Decimal(Decimal),
    Float(f64),
    Missing,
}

impl Cell {
    /// Text form with full precision; floats use the shortest round-trip
    /// representation.
    pub fn render(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int(v) => v.to_string(),
            Cell::Decimal(d) => d.to_string(),
            Cell::Float(v) => v.to_string(),
            Cell::Missing => String::new(),
        }
    }

    fn to_json(&self) -> Json {
        match self {
            Cell::Text(s) => Json::String(s.clone()),
            Cell::Int(v) => json!(v),
            // decimals stay strings so no precision is lost
            Cell::Decimal(d) => Json::String(d.to_string()),
            Cell::Float(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Cell::Missing => Json::Null,
        }
    }
}

pub trait CellValue {
    fn cell(&self) -> Cell;
}

impl CellValue for f64 {
    fn cell(&self) -> Cell {
        Cell::Float(*self)
    }
}

impl CellValue for usize {
    fn cell(&self) -> Cell {
        Cell::Int(*self as i64)
    }
}

impl CellValue for Decimal {
    fn cell(&self) -> Cell {
        Cell::Decimal(*self)
    }
}

/// Anything the presentation layer can export as a grid.
pub trait Tabular {
    fn headers(&self) -> Vec<String>;
    fn rows(&self) -> Vec<Vec<Cell>>;
}

impl<T: CellValue> Tabular for CohortMatrix<T> {
    fn headers(&self) -> Vec<String> {
        std::iter::once("cohort".to_string())
            .chain((0..self.ages).map(|k| format!("age_{}", k)))
            .collect()
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        self.rows
            .iter()
            .map(|(cohort, cells)| {
                std::iter::once(Cell::Text(cohort.to_string()))
                    .chain(
                        cells
                            .iter()
                            .map(|c| c.as_ref().map(CellValue::cell).unwrap_or(Cell::Missing)),
                    )
                    .collect()
            })
            .collect()
    }
}

impl Tabular for RfmTable {
    fn headers(&self) -> Vec<String> {
        [
            "customer_id",
            "recency_days",
            "frequency",
            "monetary",
            "r_score",
            "f_score",
            "m_score",
            "segment_code",
            "segment",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        self.profiles
            .iter()
            .map(|p| {
                vec![
                    Cell::Text(p.customer_id.clone()),
                    Cell::Int(p.recency_days),
                    Cell::Int(p.frequency as i64),
                    Cell::Decimal(p.monetary),
                    Cell::Int(p.r_score as i64),
                    Cell::Int(p.f_score as i64),
                    Cell::Int(p.m_score as i64),
                    Cell::Text(p.segment_code.clone()),
                    Cell::Text(p.segment.label().to_string()),
                ]
            })
            .collect()
    }
}

impl Tabular for ActivableList<'_> {
    fn headers(&self) -> Vec<String> {
        [
            "customer_id",
            "segment",
            "recency_days",
            "frequency",
            "monetary",
            "segment_code",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        self.profiles
            .iter()
            .map(|p| {
                vec![
                    Cell::Text(p.customer_id.clone()),
                    Cell::Text(p.segment.label().to_string()),
                    Cell::Int(p.recency_days),
                    Cell::Int(p.frequency as i64),
                    Cell::Decimal(p.monetary),
                    Cell::Text(p.segment_code.clone()),
                ]
            })
            .collect()
    }
}

impl Tabular for [SegmentMetrics] {
    fn headers(&self) -> Vec<String> {
        [
            "priority",
            "segment",
            "customers",
            "revenue",
            "share_of_revenue",
            "average_line",
            "invoices",
            "action",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        self.iter()
            .map(|m| {
                vec![
                    Cell::Int(m.priority as i64),
                    Cell::Text(m.segment.label().to_string()),
                    Cell::Int(m.customers as i64),
                    Cell::Decimal(m.revenue),
                    Cell::Float(m.share_of_revenue),
                    Cell::Decimal(m.average_line),
                    Cell::Int(m.invoices as i64),
                    Cell::Text(m.action.to_string()),
                ]
            })
            .collect()
    }
}

impl Tabular for ScenarioComparison {
    fn headers(&self) -> Vec<String> {
        vec![
            "metric".into(),
            "baseline".into(),
            "scenario".into(),
            "delta".into(),
        ]
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        let line = |name: String, b: f64, s: f64| {
            vec![
                Cell::Text(name),
                Cell::Float(b),
                Cell::Float(s),
                Cell::Float(s - b),
            ]
        };
        let (b, s) = (&self.baseline, &self.scenario);
        let mut rows = vec![
            line("clv_per_customer".into(), b.clv_per_customer, s.clv_per_customer),
            line("total_clv".into(), b.total_clv, s.total_clv),
            line("revenue".into(), b.revenue, s.revenue),
            line("margin_rate".into(), b.margin_rate, s.margin_rate),
            line("discount_rate".into(), b.discount_rate, s.discount_rate),
            line("price_discount".into(), b.price_discount, s.price_discount),
        ];
        for (age, (rb, rs)) in b.retention.iter().zip(&s.retention).enumerate() {
            rows.push(line(format!("retention_age_{}", age), *rb, *rs));
        }
        rows
    }
}

pub fn write<T, W>(table: &T, format: ExportFormat, out: W) -> Result<()>
where
    T: Tabular + ?Sized,
    W: Write,
{
    match format {
        ExportFormat::Csv => write_delimited(table, b',', out),
        ExportFormat::Tsv => write_delimited(table, b'\t', out),
        ExportFormat::Json => {
            let rows: Vec<Json> = table
                .rows()
                .iter()
                .map(|r| Json::Array(r.iter().map(Cell::to_json).collect()))
                .collect();
            let doc = json!({ "columns": table.headers(), "rows": rows });
            serde_json::to_writer_pretty(out, &doc)?;
            Ok(())
        }
    }
}

fn write_delimited<T, W>(table: &T, delimiter: u8, out: W) -> Result<()>
where
    T: Tabular + ?Sized,
    W: Write,
{
    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_writer(out);
    wtr.write_record(table.headers())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(Cell::render))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_to_path<T: Tabular + ?Sized>(
    table: &T,
    format: ExportFormat,
    path: &Path,
) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut out = std::io::BufWriter::new(file);
    write(table, format, &mut out)?;
    out.flush()?;
    Ok(())
}

pub fn to_string<T: Tabular + ?Sized>(table: &T, format: ExportFormat) -> Result<String> {
    let mut buf = Vec::new();
    write(table, format, &mut buf)?;
    String::from_utf8(buf).map_err(|e| AnalyticsError::Io(std::io::Error::other(e)))
}
