//! `calcdate`: evaluate date expressions from the command line.

mod cli;
mod logging;
mod output;

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use calcdate_engine::{
    evaluate, iterate_expression, parse, parse_timezone, EvalContext, EvalOptions,
};
use chrono::{Local, TimeZone, Utc};
use clap::Parser;
use tracing::{debug, info};

use crate::cli::Cli;
use crate::logging::init_logging;
use crate::output::{starts_on_weekend, write_ranges, write_value};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.list_tz {
        let mut out = io::stdout().lock();
        for tz in chrono_tz::TZ_VARIANTS {
            writeln!(out, "{}", tz.name())?;
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let is_terminal = stdin.is_terminal();
    let expression = cli.resolve_expression(stdin.lock(), is_terminal)?;
    let expression = expression.as_str();

    // The one clock read of the whole invocation.
    let now = Utc::now();
    let options = EvalOptions {
        week_start: cli.week_start.into(),
    };

    match cli.tz.as_deref() {
        None | Some("Local" | "local") => {
            info!(tz = "Local", "evaluating");
            execute(cli, expression, EvalContext::new(now, Local).with_options(options))
        }
        Some(name) => {
            let tz = parse_timezone(name)?;
            info!(tz = name, "evaluating");
            execute(cli, expression, EvalContext::new(now, tz).with_options(options))
        }
    }
}

fn execute<Tz: TimeZone>(cli: &Cli, expression: &str, ctx: EvalContext<Tz>) -> Result<()>
where
    Tz::Offset: Display,
{
    let expr = parse(expression).with_context(|| format!("failed to parse '{expression}'"))?;
    let each = cli.each.as_deref().unwrap_or("");
    let transform = cli.transform.as_deref();
    let mut out = io::stdout().lock();

    if expr.is_range() || !each.is_empty() || transform.is_some() {
        let mut results = iterate_expression(expression, each, transform, &ctx)
            .with_context(|| format!("failed to evaluate '{expression}'"))?;
        if cli.skip_weekends {
            results.retain(|r| !starts_on_weekend(r));
        }
        debug!(count = results.len(), "printing iterations");
        write_ranges(&mut out, &cli.format, &results)
    } else {
        let value =
            evaluate(&expr, &ctx).with_context(|| format!("failed to evaluate '{expression}'"))?;
        write_value(&mut out, &cli.format, &value)
    }
}
