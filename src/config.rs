// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::clv::ClvParams;
use crate::error::{AnalyticsError, Result};
use crate::prepare::PrepareOptions;
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Cohortscope", "cohortscope"));

/// Analysis defaults. Every field may be omitted from the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub margin_rate: f64,
    /// Monthly time-value discount applied to projected periods.
    pub discount_rate: f64,
    pub horizon_months: u32,
    /// Regex matched against invoice ids to flag cancellations.
    pub return_marker: String,
    pub early_revenue_days: u32,
    pub drop_duplicates: bool,
    pub trim_outliers: bool,
    pub include_returns_in_rfm: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            margin_rate: 0.25,
            discount_rate: 0.01,
            horizon_months: 24,
            return_marker: "^C".to_string(),
            early_revenue_days: 90,
            drop_duplicates: true,
            trim_outliers: false,
            include_returns_in_rfm: true,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from(APP.0, APP.1, APP.2).map(|p| p.config_dir().join("settings.json"))
    }

    /// Reads `path` if given, else the platform settings file when it exists,
    /// else the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        log::debug!("loading settings from {}", path.display());
        let raw = fs::read_to_string(&path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.margin_rate) {
            return Err(AnalyticsError::InvalidConfig(format!(
                "margin_rate {} must be within [0, 1]",
                self.margin_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.discount_rate) {
            return Err(AnalyticsError::InvalidConfig(format!(
                "discount_rate {} must be within [0, 1]",
                self.discount_rate
            )));
        }
        if self.horizon_months == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "horizon_months must be at least 1".into(),
            ));
        }
        Regex::new(&self.return_marker).map_err(|e| {
            AnalyticsError::InvalidConfig(format!(
                "return_marker '{}' is not a valid regex: {}",
                self.return_marker, e
            ))
        })?;
        Ok(())
    }

    pub fn prepare_options(&self) -> Result<PrepareOptions> {
        let marker = Regex::new(&self.return_marker).map_err(|e| {
            AnalyticsError::InvalidConfig(format!("return_marker: {}", e))
        })?;
        Ok(PrepareOptions {
            return_marker: marker,
            drop_duplicates: self.drop_duplicates,
            trim_outliers: self.trim_outliers,
        })
    }

    pub fn clv_params(&self) -> ClvParams {
        ClvParams {
            margin_rate: self.margin_rate,
            discount_rate: self.discount_rate,
            horizon_months: self.horizon_months,
        }
    }
}
