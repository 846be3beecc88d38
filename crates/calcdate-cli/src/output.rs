//! Rendering of evaluated instants and iteration results.

use std::fmt::{self, Display, Write as _};
use std::io::Write;
use std::str::FromStr;

use anyhow::{Context, Result};
use calcdate_engine::IterationResult;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, SecondsFormat, TimeZone, Weekday};

/// How instants are printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    /// RFC 3339 with whole seconds.
    Iso,
    /// `YYYY-MM-DD HH:MM:SS`.
    Sql,
    /// Unix timestamp in seconds.
    Timestamp,
    /// `Monday, January 2, 2006`.
    Human,
    /// `YYYYMMDD`.
    Compact,
    /// One JSON document on stdout.
    Json,
    Strftime(String),
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iso" => Ok(Self::Iso),
            "" | "sql" => Ok(Self::Sql),
            "ts" => Ok(Self::Timestamp),
            "human" => Ok(Self::Human),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            pattern if pattern.contains('%') => {
                if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                    Err(format!("invalid strftime pattern '{pattern}'"))
                } else {
                    Ok(Self::Strftime(pattern.to_string()))
                }
            }
            other => Err(format!(
                "unknown format '{other}', expected iso, sql, ts, human, compact, json or a strftime pattern"
            )),
        }
    }
}

impl OutputFormat {
    /// Render one instant in this format. JSON renders as an RFC 3339
    /// string.
    pub fn render<Tz: TimeZone>(&self, dt: &DateTime<Tz>) -> Result<String, fmt::Error>
    where
        Tz::Offset: Display,
    {
        let mut out = String::new();
        match self {
            Self::Iso | Self::Json => out.push_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::Sql => write!(out, "{}", dt.format("%Y-%m-%d %H:%M:%S"))?,
            Self::Timestamp => write!(out, "{}", dt.timestamp())?,
            Self::Human => write!(out, "{}", dt.format("%A, %B %-d, %Y"))?,
            Self::Compact => write!(out, "{}", dt.format("%Y%m%d"))?,
            Self::Strftime(pattern) => write!(out, "{}", dt.format(pattern))?,
        }
        Ok(out)
    }
}

/// Whether an iteration begins on a Saturday or Sunday, in its own zone.
pub fn starts_on_weekend<Tz: TimeZone>(result: &IterationResult<Tz>) -> bool {
    matches!(result.begin.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Print a single instant.
pub fn write_value<Tz: TimeZone, W: Write>(
    out: &mut W,
    format: &OutputFormat,
    dt: &DateTime<Tz>,
) -> Result<()>
where
    Tz::Offset: Display,
{
    if *format == OutputFormat::Json {
        serde_json::to_writer(&mut *out, dt).context("failed to serialize result")?;
        writeln!(out)?;
        return Ok(());
    }
    let text = format.render(dt).context("failed to format result")?;
    writeln!(out, "{text}")?;
    Ok(())
}

/// Print iteration results, one `begin - end` line each, or a JSON array.
pub fn write_ranges<Tz: TimeZone, W: Write>(
    out: &mut W,
    format: &OutputFormat,
    results: &[IterationResult<Tz>],
) -> Result<()>
where
    Tz::Offset: Display,
{
    if *format == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut *out, results).context("failed to serialize results")?;
        writeln!(out)?;
        return Ok(());
    }
    for result in results {
        let begin = format.render(&result.begin).context("failed to format result")?;
        let end = format.render(&result.end).context("failed to format result")?;
        writeln!(out, "{begin} - {end}")?;
    }
    Ok(())
}
