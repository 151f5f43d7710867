use chrono::{DateTime, NaiveDate, Utc};
use clap::error::ErrorKind;
use kinship_core::error::{KinshipError, Result};

use super::OutputFormat;

/// Parse output format from string
pub fn parse_format(s: &str) -> Result<OutputFormat> {
    s.parse::<OutputFormat>()
}

/// Parse a `--since` bound: RFC 3339, or a bare date meaning midnight UTC
pub fn parse_since(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| KinshipError::invalid_argument("--since", s))
}

/// Whether raw arguments ask for JSON output.
///
/// Consulted only when clap rejects the command line, before `Cli.format`
/// exists. The last `--format` wins, as it does for clap.
pub fn requests_json<I, S>(args: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut requested = None;
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let value = match arg.as_ref().split_once('=') {
            Some(("--format", value)) => Some(value.to_string()),
            None if arg.as_ref() == "--format" => args.next().map(|v| v.as_ref().to_string()),
            _ => continue,
        };
        requested = value.and_then(|v| v.parse::<OutputFormat>().ok());
    }
    requested == Some(OutputFormat::Json)
}

/// Translate a clap rejection into the error reported under `--format json`.
///
/// Help and version requests are not failures and yield `None`.
pub fn clap_failure(err: &clap::Error) -> Option<KinshipError> {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => None,
        ErrorKind::Io | ErrorKind::Format => Some(KinshipError::Other(err.to_string())),
        _ => Some(KinshipError::UsageError(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use chrono::TimeZone;
    use clap::Parser;
    use kinship_core::error::ExitCode;

    #[test]
    fn test_requests_json() {
        assert!(requests_json(["--format", "json", "graph"]));
        assert!(requests_json(["graph", "--format=json"]));
        assert!(!requests_json(["graph"]));
        assert!(!requests_json(["--format", "human", "graph"]));
        assert!(!requests_json(["--format=json", "--format", "human"]));
        assert!(!requests_json(["--format"]));
    }

    #[test]
    fn test_clap_failure_is_usage_error() {
        let err = Cli::try_parse_from(["kinship", "graph", "--bogus-flag"]).unwrap_err();
        let failure = clap_failure(&err).unwrap();
        assert!(matches!(failure, KinshipError::UsageError(_)));
        assert_eq!(failure.exit_code(), ExitCode::Usage);
    }

    #[test]
    fn test_help_is_not_a_failure() {
        let err = Cli::try_parse_from(["kinship", "--help"]).unwrap_err();
        assert!(clap_failure(&err).is_none());
    }

    #[test]
    fn test_parse_since() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_since("2024-03-01").unwrap(), midnight);
        assert_eq!(parse_since("2024-03-01T01:00:00+01:00").unwrap(), midnight);
        assert!(parse_since("last tuesday").is_err());
    }
}
