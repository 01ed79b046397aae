// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{command, value_parser, Arg, ArgAction, Command};

fn output_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print as JSON lines"),
    ]
}

fn selection_args() -> [Arg; 3] {
    [
        Arg::new("cohort")
            .long("cohort")
            .action(ArgAction::Append)
            .help("Restrict to acquisition cohort(s), YYYY-MM"),
        Arg::new("country")
            .long("country")
            .action(ArgAction::Append)
            .help("Restrict to country (repeatable)"),
        Arg::new("continent")
            .long("continent")
            .help("Restrict to a continent (Europe, America, Asia, Oceania, Other)"),
    ]
}

fn rfm_args() -> [Arg; 3] {
    [
        Arg::new("as-of")
            .long("as-of")
            .help("Reference date YYYY-MM-DD (default: day after last invoice)"),
        Arg::new("exclude-returns")
            .long("exclude-returns")
            .action(ArgAction::SetTrue)
            .help("Leave returns out of the RFM inputs"),
        Arg::new("positive-only")
            .long("positive-only")
            .action(ArgAction::SetTrue)
            .help("Drop customers whose net spend is not positive"),
    ]
}

fn percent_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .allow_hyphen_values(true)
        .help(help)
}

fn scenario_args() -> Vec<Arg> {
    vec![
        percent_arg("retention-delta", "Relative retention change in %, e.g. -10"),
        percent_arg("margin-delta", "Margin rate change in percentage points"),
        percent_arg("discount-delta", "Monthly discount rate change in percentage points"),
        percent_arg("price-discount", "Average price reduction in %"),
        Arg::new("cohort")
            .long("cohort")
            .help("Target cohort YYYY-MM (default: all cohorts)"),
        Arg::new("horizon")
            .long("horizon")
            .value_parser(value_parser!(u32))
            .help("Projection horizon in months"),
    ]
}

fn export_args() -> [Arg; 2] {
    [
        Arg::new("format")
            .long("format")
            .required(true)
            .help("csv | tsv (alias: xls, spreadsheet) | json"),
        Arg::new("out").long("out").required(true).help("Output file"),
    ]
}

pub fn build_cli() -> Command {
    command!()
        .about("Cohort retention, RFM segmentation and CLV scenarios for retail transactions")
        .arg(
            Arg::new("data")
                .long("data")
                .short('d')
                .global(true)
                .default_value("data/online_retail_II_clean.csv")
                .help("Cleaned transaction CSV"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("Settings JSON (default: platform config dir)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More log output (-v info, -vv debug)"),
        )
        .subcommand(
            Command::new("overview")
                .about("Headline KPIs")
                .args(selection_args())
                .arg(
                    Arg::new("monthly")
                        .long("monthly")
                        .action(ArgAction::SetTrue)
                        .help("Also print net revenue per month"),
                )
                .args(output_args()),
        )
        .subcommand(
            Command::new("cohorts")
                .about("Cohort retention and revenue")
                .subcommand_required(true)
                .subcommand(
                    Command::new("retention")
                        .about("Retention rate per cohort and age")
                        .args(selection_args())
                        .arg(
                            Arg::new("counts")
                                .long("counts")
                                .action(ArgAction::SetTrue)
                                .help("Show active customer counts instead of rates"),
                        )
                        .args(output_args()),
                )
                .subcommand(
                    Command::new("revenue")
                        .about("Net revenue per cohort and age")
                        .args(selection_args())
                        .arg(
                            Arg::new("by-age")
                                .long("by-age")
                                .action(ArgAction::SetTrue)
                                .help("Sum across cohorts per age"),
                        )
                        .args(output_args()),
                )
                .subcommand(
                    Command::new("summary")
                        .about("Size, early revenue and empirical CLV per cohort")
                        .args(selection_args())
                        .args(output_args()),
                ),
        )
        .subcommand(
            Command::new("rfm")
                .about("RFM scoring and segments")
                .subcommand_required(true)
                .subcommand(
                    Command::new("scores")
                        .about("Per-customer RFM scores")
                        .args(selection_args())
                        .args(rfm_args())
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(value_parser!(usize))
                                .default_value("20"),
                        )
                        .args(output_args()),
                )
                .subcommand(
                    Command::new("segments")
                        .about("Named segments with activation priority")
                        .args(selection_args())
                        .args(rfm_args())
                        .args(output_args()),
                ),
        )
        .subcommand(
            Command::new("scenario")
                .about("Project CLV under changed retention, margin or discount")
                .args(scenario_args())
                .args(output_args()),
        )
        .subcommand(
            Command::new("export")
                .about("Write a table to CSV, TSV or JSON")
                .subcommand_required(true)
                .subcommand(
                    Command::new("retention")
                        .args(selection_args())
                        .args(export_args()),
                )
                .subcommand(
                    Command::new("revenue")
                        .args(selection_args())
                        .args(export_args()),
                )
                .subcommand(
                    Command::new("rfm")
                        .args(selection_args())
                        .args(rfm_args())
                        .args(export_args()),
                )
                .subcommand(
                    Command::new("segments")
                        .args(selection_args())
                        .args(rfm_args())
                        .args(export_args()),
                )
                .subcommand(
                    Command::new("activable")
                        .about("Champions, Loyal, Potential Loyalists and Need Attention customers")
                        .args(selection_args())
                        .args(rfm_args())
                        .args(export_args()),
                )
                .subcommand(
                    Command::new("scenario")
                        .args(scenario_args())
                        .args(export_args()),
                ),
        )
        .subcommand(Command::new("doctor").about("Report data-quality findings"))
}
