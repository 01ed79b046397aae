// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use std::path::Path;

use cohortscope::config::Settings;
use cohortscope::{cli, commands, Session};

fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();

    let level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let Some((name, sub)) = matches.subcommand() else {
        cli::build_cli().print_help()?;
        println!();
        return Ok(());
    };

    let settings = Settings::load(matches.get_one::<String>("config").map(Path::new))
        .context("Load settings")?;
    let data = matches
        .get_one::<String>("data")
        .context("--data is required")?;
    let session = Session::open(Path::new(data), settings)?;

    match name {
        "overview" => commands::overview::handle(&session, sub)?,
        "cohorts" => commands::cohorts::handle(&session, sub)?,
        "rfm" => commands::segments::handle(&session, sub)?,
        "scenario" => commands::scenario::handle(&session, sub)?,
        "export" => commands::exporter::handle(&session, sub)?,
        "doctor" => commands::doctor::handle(&session)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
