// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cli;
pub mod clv;
pub mod cohort;
pub mod commands;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod kpi;
pub mod models;
pub mod prepare;
pub mod rfm;
pub mod session;
pub mod utils;

pub use error::{AnalyticsError, DataWarning};
pub use session::Session;
