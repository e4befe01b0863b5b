use crate::ci;
use crate::cli::Cli;
use crate::env::Environment;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use url::Url;

pub const DEFAULT_CI_HOST: &str = "https://lighthouse-ci.appspot.com";
pub const API_KEY_VAR: &str = "LIGHTHOUSE_API_KEY";
pub const LEGACY_API_KEY_VAR: &str = "API_KEY";

/// Invalid command-line input. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error(transparent)]
    Arguments(#[from] clap::Error),
    #[error("no URL provided")]
    MissingUrl,
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("must supply a score when comments are disabled")]
    MissingScore,
    #[error("CI_HOST `{host}` is not a valid URL: {source}")]
    InvalidHost {
        host: String,
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    /// Run Lighthouse in Chrome on the CI service
    Chrome,
    /// Schedule a WebPageTest run
    Wpt,
}

impl RunnerKind {
    pub fn endpoint(self) -> &'static str {
        match self {
            RunnerKind::Chrome => "run_on_chrome",
            RunnerKind::Wpt => "run_on_wpt",
        }
    }
}

impl fmt::Display for RunnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerKind::Chrome => write!(f, "chrome"),
            RunnerKind::Wpt => write!(f, "wpt"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    pub number: Option<u64>,
    pub sha: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub owner: Option<String>,
    pub name: Option<String>,
}

/// Everything the CI service needs to know about one audit request.
///
/// Serialized as-is into the request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfiguration {
    pub test_url: String,
    pub should_run: bool,
    #[serde(rename = "addComment")]
    pub post_comment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_pass_score: Option<f64>,
    pub runner: RunnerKind,
    #[serde(rename = "pr")]
    pub pull_request: PullRequest,
    #[serde(rename = "repo")]
    pub repository: Repository,
    #[serde(skip)]
    pub ci_provider: Option<&'static str>,
}

/// Resolves parsed arguments and the CI environment into a run configuration.
pub fn resolve(cli: &Cli, env: &dyn Environment) -> Result<RunConfiguration, UsageError> {
    let raw_url = cli.url.as_deref().ok_or(UsageError::MissingUrl)?;
    let test_url = parse_test_url(raw_url)?;

    let ci = ci::detect(env);
    let is_pull_request = ci.as_ref().is_some_and(|c| c.is_pull_request);
    let should_run = !cli.pr || is_pull_request;

    let post_comment = !cli.no_comment;
    let min_pass_score = cli.score;
    if !post_comment && min_pass_score.is_none_or(|s| s == 0.0) {
        return Err(UsageError::MissingScore);
    }

    let (provider, pull_request, repository) = match ci {
        Some(c) => (Some(c.provider), c.pull_request, c.repository),
        None => (None, PullRequest::default(), Repository::default()),
    };

    Ok(RunConfiguration {
        test_url,
        should_run,
        post_comment,
        min_pass_score,
        runner: cli.runner,
        pull_request,
        repository,
        ci_provider: provider,
    })
}

/// Validates the page URL but keeps it as typed; the service reports back
/// against this exact string.
fn parse_test_url(raw: &str) -> Result<String, UsageError> {
    let raw = raw.trim();
    let invalid = |reason: String| UsageError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    Ok(raw.to_string())
}

/// Where and how to reach the CI service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub host: Url,
    pub api_key: Option<String>,
}

impl ServiceSettings {
    pub fn from_env(env: &dyn Environment) -> Result<Self, UsageError> {
        let raw_host = env
            .non_empty("CI_HOST")
            .unwrap_or_else(|| DEFAULT_CI_HOST.to_string());
        let mut host = Url::parse(&raw_host).map_err(|source| UsageError::InvalidHost {
            host: raw_host.clone(),
            source,
        })?;
        // Keep any base path when joining endpoint names onto it
        if !host.path().ends_with('/') {
            let path = format!("{}/", host.path());
            host.set_path(&path);
        }

        let legacy_key = env.non_empty(LEGACY_API_KEY_VAR);
        if legacy_key.is_some() {
            tracing::warn!(
                "{LEGACY_API_KEY_VAR} is deprecated and will be removed, use {API_KEY_VAR} instead"
            );
        }
        let api_key = env.non_empty(API_KEY_VAR).or(legacy_key);
        if api_key.is_none() {
            tracing::warn!("{API_KEY_VAR} is not set, the CI service may reject the request");
        }

        Ok(Self { host, api_key })
    }

    pub fn endpoint(&self, runner: RunnerKind) -> Url {
        // host always ends with '/', so joining a bare segment cannot fail
        self.host
            .join(runner.endpoint())
            .unwrap_or_else(|_| self.host.clone())
    }
}
