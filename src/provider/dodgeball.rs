use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{
    CheckpointEvent, CheckpointOptions, CheckpointResponseBody, TrackResponseBody,
};
use super::{CheckpointCall, CheckpointVerdict, ProviderError, TrackRequest, TrustProvider};

pub const DEFAULT_API_URL: &str = "https://api.dodgeballhq.com";

// HeaderName::from_static requires lowercase names
const SECRET_KEY_HEADER: &str = "dodgeball-secret-key";
const SOURCE_TOKEN_HEADER: &str = "dodgeball-source-token";
const SESSION_ID_HEADER: &str = "dodgeball-session-id";
const CUSTOMER_ID_HEADER: &str = "dodgeball-customer-id";
const VERIFICATION_ID_HEADER: &str = "dodgeball-verification-id";

#[derive(Clone)]
pub struct DodgeballConfig {
    pub api_url: String,
    pub secret_key: String,
    /// Transport-level timeout for each HTTP call
    pub http_timeout: Duration,
}

/// HTTP client for the Dodgeball trust API
#[derive(Clone)]
pub struct DodgeballClient {
    http: reqwest::Client,
    api_url: String,
    secret_key: String,
}

#[derive(Serialize)]
struct CheckpointEventWire<'a> {
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    event: &'a CheckpointEvent,
}

#[derive(Serialize)]
struct CheckpointBody<'a> {
    event: CheckpointEventWire<'a>,
    options: &'a CheckpointOptions,
}

impl DodgeballClient {
    pub fn new(config: DodgeballConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let api_url = config.api_url.trim_end_matches('/').to_string();
        info!(api_url = %api_url, "Dodgeball client configured");

        Ok(Self {
            http,
            api_url,
            secret_key: config.secret_key,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_url, path)
    }

    fn headers(
        &self,
        source_token: Option<&str>,
        session_id: Option<&str>,
        user_id: Option<&str>,
        verification_id: Option<&str>,
    ) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        insert_header(&mut headers, SECRET_KEY_HEADER, Some(&self.secret_key))?;
        insert_header(&mut headers, SOURCE_TOKEN_HEADER, source_token)?;
        insert_header(&mut headers, SESSION_ID_HEADER, session_id)?;
        insert_header(&mut headers, CUSTOMER_ID_HEADER, user_id)?;
        insert_header(&mut headers, VERIFICATION_ID_HEADER, verification_id)?;
        Ok(headers)
    }
}

/// Insert a header, skipping absent or empty values
fn insert_header(
    headers: &mut HeaderMap,
    name: &'static str,
    value: Option<&str>,
) -> Result<(), ProviderError> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(());
    };

    let value = HeaderValue::from_str(value).map_err(|_| ProviderError::InvalidHeader(name))?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

#[async_trait]
impl TrustProvider for DodgeballClient {
    #[tracing::instrument(
        skip(self, request),
        fields(event_type = %request.event.event_type)
    )]
    async fn track(&self, request: TrackRequest) -> Result<(), ProviderError> {
        let headers = self.headers(
            request.source_token.as_deref(),
            request.session_id.as_deref(),
            request.user_id.as_deref(),
            None,
        )?;

        let response = self
            .http
            .post(self.endpoint("track"))
            .headers(headers)
            .json(&request.event)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        // An empty or non-JSON 2xx body counts as accepted
        if let Ok(body) = serde_json::from_slice::<TrackResponseBody>(&bytes) {
            if !body.success {
                let reason = body
                    .errors
                    .iter()
                    .filter_map(|e| e.message.as_deref())
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(ProviderError::Rejected(reason));
            }
        }

        debug!("Tracking event accepted");
        Ok(())
    }

    #[tracing::instrument(
        skip(self, request),
        fields(
            checkpoint_name = %request.checkpoint_name,
            has_verification_id = request.use_verification_id.is_some()
        )
    )]
    async fn checkpoint(&self, request: CheckpointCall) -> Result<CheckpointVerdict, ProviderError> {
        let headers = self.headers(
            request.source_token.as_deref(),
            request.session_id.as_deref(),
            request.user_id.as_deref(),
            request.use_verification_id.as_deref(),
        )?;

        let body = CheckpointBody {
            event: CheckpointEventWire {
                event_type: &request.checkpoint_name,
                event: &request.event,
            },
            options: &request.options,
        };

        let response = self
            .http
            .post(self.endpoint("checkpoint"))
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        // Failures are normally reported in-band with success=false, so only
        // fall back to the HTTP status when the body is not a checkpoint response.
        let parsed = match serde_json::from_slice::<CheckpointResponseBody>(&bytes) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(ProviderError::Decode(e)),
            Err(_) => {
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                })
            }
        };

        if !status.is_success() {
            warn!(status = status.as_u16(), "Provider returned non-success status with checkpoint body");
        }

        let verdict = parsed.into_verdict();
        info!(verdict = verdict.label(), "Checkpoint classified");
        Ok(verdict)
    }
}
