use crate::config::{RunnerKind, UsageError};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::ffi::OsString;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Trigger a Lighthouse audit on the Lighthouse CI service",
    long_about = None
)]
pub struct Cli {
    /// URL of the page to audit
    pub url: Option<String>,

    /// Minimum passing score (0-100), enforced by the CI service
    #[arg(long, value_name = "N", value_parser = parse_score)]
    pub score: Option<f64>,

    /// Don't comment on the pull request (requires --score)
    #[arg(long, default_value_t = false)]
    pub no_comment: bool,

    /// Only run on pull-request builds
    #[arg(
        long,
        value_name = "BOOL",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub pr: bool,

    /// Audit backend
    #[arg(long, value_enum, default_value_t = RunnerKind::Chrome)]
    pub runner: RunnerKind,

    /// Output results in JSON format
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn parse_args<I, T>(argv: I) -> Result<Cli, UsageError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Ok(Cli::try_parse_from(argv)?)
}

fn parse_score(s: &str) -> Result<f64, String> {
    let score: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("`{s}` is not a number"))?;
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(format!("`{s}` must be a number between 0 and 100"));
    }
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, UsageError> {
        parse_args(std::iter::once("lighthouse-ci").chain(args.iter().copied()))
    }

    fn error_kind(args: &[&str]) -> Option<ErrorKind> {
        match parse(args) {
            Err(UsageError::Arguments(e)) => Some(e.kind()),
            _ => None,
        }
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["https://example.com"]).unwrap();
        assert_eq!(cli.url.as_deref(), Some("https://example.com"));
        assert_eq!(cli.score, None);
        assert!(!cli.no_comment);
        assert!(cli.pr);
        assert_eq!(cli.runner, RunnerKind::Chrome);
        assert!(!cli.json);
    }

    #[test]
    fn test_pr_values() {
        assert!(!parse(&["--pr=false", "u"]).unwrap().pr);
        assert!(!parse(&["--pr=no", "u"]).unwrap().pr);
        assert!(!parse(&["--pr=0", "u"]).unwrap().pr);
        assert!(parse(&["--pr=true", "u"]).unwrap().pr);
        let cli = parse(&["--pr", "https://example.com"]).unwrap();
        assert!(cli.pr);
        assert_eq!(cli.url.as_deref(), Some("https://example.com"));
        assert!(parse(&["--pr", "false"]).unwrap().pr);
    }

    #[test]
    fn test_runner_values() {
        assert_eq!(
            parse(&["--runner=wpt", "u"]).unwrap().runner,
            RunnerKind::Wpt
        );
        assert_eq!(error_kind(&["--runner=foo", "u"]), Some(ErrorKind::InvalidValue));
    }

    #[test]
    fn test_score_parsing() {
        assert_eq!(parse(&["--score=95", "u"]).unwrap().score, Some(95.0));
        assert_eq!(parse(&["--score", "72.5", "u"]).unwrap().score, Some(72.5));
        assert_eq!(error_kind(&["--score=NaN", "u"]), Some(ErrorKind::ValueValidation));
        assert_eq!(error_kind(&["--score=inf", "u"]), Some(ErrorKind::ValueValidation));
        assert_eq!(error_kind(&["--score=abc", "u"]), Some(ErrorKind::ValueValidation));
        assert_eq!(error_kind(&["--score=101", "u"]), Some(ErrorKind::ValueValidation));
    }

    #[test]
    fn test_help_is_an_error() {
        assert_eq!(error_kind(&["--help"]), Some(ErrorKind::DisplayHelp));
        assert_eq!(error_kind(&["-h", "u"]), Some(ErrorKind::DisplayHelp));
    }
}
