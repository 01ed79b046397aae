// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::Settings;
use crate::dataset::Dataset;
use crate::models::Transaction;
use crate::prepare::{prepare, Prepared};
use crate::rfm::RfmOptions;
use anyhow::{Context, Result};
use std::path::Path;

/// The prepared dataset plus the settings it was prepared with. Read-only
/// once built; every analysis borrows from it.
pub struct Session {
    pub settings: Settings,
    pub prepared: Prepared,
}

impl Session {
    pub fn open(path: &Path, settings: Settings) -> Result<Self> {
        let ds = Dataset::from_path(path)
            .with_context(|| format!("Open dataset {}", path.display()))?;
        Self::from_dataset(&ds, settings)
    }

    pub fn from_dataset(ds: &Dataset, settings: Settings) -> Result<Self> {
        let opts = settings.prepare_options()?;
        let prepared = prepare(ds, &opts).context("Prepare transactions")?;
        Ok(Self { settings, prepared })
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.prepared.transactions
    }

    pub fn rfm_options(&self) -> RfmOptions {
        RfmOptions {
            include_returns: self.settings.include_returns_in_rfm,
            ..RfmOptions::default()
        }
    }
}
