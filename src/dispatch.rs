use crate::config::{RunConfiguration, RunnerKind, ServiceSettings};
use anyhow::Result;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

const API_KEY_HEADER: &str = "X-API-KEY";

/// Result of one dispatch. Each runner has its own success shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AuditOutcome {
    /// Pull-request gating suppressed the run; nothing was sent.
    Skipped,
    Scored {
        score: f64,
    },
    /// The audit was queued; results land at `target_url` later.
    Scheduled {
        #[serde(rename = "targetUrl")]
        target_url: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("request to {url} failed: {source}")]
    Transport { url: Url, source: reqwest::Error },
    #[error("CI service responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed response from CI service: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    #[serde(flatten)]
    config: &'a RunConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
}

#[derive(Debug, Deserialize)]
struct ScheduleResponse {
    data: ScheduleData,
}

#[derive(Debug, Deserialize)]
struct ScheduleData {
    target_url: String,
}

pub struct Dispatcher {
    client: reqwest::Client,
    settings: ServiceSettings,
}

impl Dispatcher {
    pub fn new(settings: ServiceSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self { client, settings })
    }

    /// Submits `config` to the CI service, or does nothing when the run is
    /// gated off. Makes at most one request and never retries.
    pub async fn dispatch(&self, config: &RunConfiguration) -> Result<AuditOutcome, DispatchError> {
        if !config.should_run {
            tracing::info!(
                provider = config.ci_provider.unwrap_or("none"),
                "not a pull-request build, skipping run (pass --pr=false to always run)"
            );
            return Ok(AuditOutcome::Skipped);
        }

        let url = self.settings.endpoint(config.runner);
        let body = SubmitRequest {
            config,
            format: (config.runner == RunnerKind::Chrome).then_some("json"),
        };
        tracing::info!(runner = %config.runner, %url, test_url = %config.test_url, "submitting audit");

        let mut request = self.client.post(url.clone()).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let transport = |source| DispatchError::Transport {
            url: url.clone(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;
        tracing::debug!(%status, body = %text, "CI service response");

        if !status.is_success() {
            return Err(DispatchError::Status { status, body: text });
        }

        parse_response(config.runner, &text)
    }
}

fn parse_response(runner: RunnerKind, body: &str) -> Result<AuditOutcome, DispatchError> {
    let malformed = |e: serde_json::Error| DispatchError::MalformedResponse(e.to_string());
    match runner {
        RunnerKind::Chrome => {
            let res: ScoreResponse = serde_json::from_str(body).map_err(malformed)?;
            Ok(AuditOutcome::Scored { score: res.score })
        }
        RunnerKind::Wpt => {
            let res: ScheduleResponse = serde_json::from_str(body).map_err(malformed)?;
            Ok(AuditOutcome::Scheduled {
                target_url: res.data.target_url,
            })
        }
    }
}
