//! Command-line arguments.

use std::io::BufRead;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use calcdate_engine::WeekStartDay;
use clap::{ArgAction, Parser, ValueEnum};

use crate::output::OutputFormat;

/// Evaluate date expressions and iterate date ranges.
///
/// Examples: `calcdate "today +1d"`, `calcdate "now | +2h | round hour"`,
/// `calcdate -e 1d -t '$begin +9h, $begin +17h' "today...+1w"`.
///
/// Without EXPR the expression is read from redirected stdin, or defaults
/// to `now`.
#[derive(Parser, Debug)]
#[command(name = "calcdate", version, about, disable_version_flag = true)]
pub struct Cli {
    /// Date expression (e.g. "2024-01-15...+7d | endOfMonth").
    #[arg(value_name = "EXPR", conflicts_with = "expr")]
    pub expression: Option<String>,

    /// Date expression, as an alternative to the positional argument.
    #[arg(short = 'x', long = "expr", value_name = "EXPR")]
    pub expr: Option<String>,

    /// IANA timezone for evaluation and output ("Local" for the system zone).
    #[arg(long, env = "CALCDATE_TZ")]
    pub tz: Option<String>,

    /// Iteration interval for ranges (e.g. 1d, 1w, 1h30m, 1M, 1q).
    #[arg(short, long, value_name = "INTERVAL")]
    pub each: Option<String>,

    /// Transform applied to every iteration, as "begin, end" expressions
    /// over $begin and $end.
    #[arg(short, long, value_name = "TRANSFORM")]
    pub transform: Option<String>,

    /// Output format: iso, sql, ts, human, compact, json, or a strftime
    /// pattern containing '%'.
    #[arg(short, long, default_value = "sql")]
    pub format: OutputFormat,

    /// Drop iterations that begin on a Saturday or Sunday.
    #[arg(long)]
    pub skip_weekends: bool,

    /// First day of the week for startOfWeek / endOfWeek.
    #[arg(long, value_enum, default_value_t = WeekStart::Monday)]
    pub week_start: WeekStart,

    /// List known timezone names and exit.
    #[arg(long)]
    pub list_tz: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CALCDATE_LOG", default_value = "warn")]
    pub log_level: LogLevel,

    /// Print version.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    _version: Option<bool>,
}

impl Cli {
    /// The expression from either the positional argument or `--expr`.
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref().or(self.expr.as_deref())
    }

    /// The expression to evaluate: the argument if given, else the first
    /// non-blank line of a redirected `stdin`, else `now`.
    pub fn resolve_expression<R: BufRead>(
        &self,
        stdin: R,
        stdin_is_terminal: bool,
    ) -> Result<String> {
        if let Some(expression) = self.expression() {
            return Ok(expression.to_string());
        }
        if stdin_is_terminal {
            return Ok("now".to_string());
        }
        for line in stdin.lines() {
            let line = line.context("failed to read expression from stdin")?;
            let line = line.trim();
            if !line.is_empty() {
                return Ok(line.to_string());
            }
        }
        bail!("no expression provided via stdin")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WeekStart {
    Monday,
    Sunday,
}

impl From<WeekStart> for WeekStartDay {
    fn from(value: WeekStart) -> Self {
        match value {
            WeekStart::Monday => WeekStartDay::Monday,
            WeekStart::Sunday => WeekStartDay::Sunday,
        }
    }
}

/// Verbosity of diagnostics written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!(
                "unknown log level '{s}', expected one of: trace, debug, info, warn, error"
            )),
        }
    }
}

impl LogLevel {
    /// Convert to a tracing filter directive string.
    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positional_or_flag_expression() {
        let cli = Cli::try_parse_from(["calcdate", "today +1d"]).unwrap();
        assert_eq!(cli.expression(), Some("today +1d"));
        let cli = Cli::try_parse_from(["calcdate", "-x", "now"]).unwrap();
        assert_eq!(cli.expression(), Some("now"));
    }

    #[test]
    fn test_both_expressions_conflict() {
        assert!(Cli::try_parse_from(["calcdate", "-x", "now", "today"]).is_err());
    }

    #[test]
    fn test_argument_wins_over_stdin() {
        let cli = Cli::try_parse_from(["calcdate", "today"]).unwrap();
        let expr = cli.resolve_expression("tomorrow\n".as_bytes(), false).unwrap();
        assert_eq!(expr, "today");
    }

    #[test]
    fn test_reads_first_non_blank_stdin_line() {
        let cli = Cli::try_parse_from(["calcdate"]).unwrap();
        let expr = cli
            .resolve_expression("\n   \n  2024-01-15 +1d  \nnow\n".as_bytes(), false)
            .unwrap();
        assert_eq!(expr, "2024-01-15 +1d");
    }

    #[test]
    fn test_blank_stdin_is_an_error() {
        let cli = Cli::try_parse_from(["calcdate"]).unwrap();
        let err = cli.resolve_expression(" \n\n".as_bytes(), false).unwrap_err();
        assert_eq!(err.to_string(), "no expression provided via stdin");
    }

    #[test]
    fn test_terminal_defaults_to_now() {
        let cli = Cli::try_parse_from(["calcdate"]).unwrap();
        let expr = cli.resolve_expression("ignored\n".as_bytes(), true).unwrap();
        assert_eq!(expr, "now");
    }

    #[test]
    fn test_short_v_prints_version() {
        let err = Cli::try_parse_from(["calcdate", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["calcdate", "today"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Sql);
        assert_eq!(cli.week_start, WeekStart::Monday);
        assert!(!cli.skip_weekends);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_week_start_conversion() {
        let cli = Cli::try_parse_from(["calcdate", "--week-start", "sunday", "today"]).unwrap();
        assert_eq!(WeekStartDay::from(cli.week_start), WeekStartDay::Sunday);
    }
}
