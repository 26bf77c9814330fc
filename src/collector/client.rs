//! HTTP page source for the upstream activity API
//!
//! This module handles every upstream request, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - Mapping a page request to `GET {base-url}/{target}` with window and cursor parameters
//! - Classifying error responses into quota exhaustion vs. other upstream failures

use crate::collector::fetcher::{Page, PageRequest, PageSource};
use crate::config::{QuotaConfig, UpstreamConfig};
use crate::credentials::CredentialProvider;
use crate::{CollectorError, ConfigError, Result};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Longest error body carried into an error message
const MAX_ERROR_BODY: usize = 512;

/// Builds an HTTP client for the upstream API
pub fn build_http_client(config: &UpstreamConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page source backed by the upstream activity API
pub struct ReportsClient {
    client: Client,
    base_url: Url,
    max_results: u32,
    quota_reason: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ReportsClient {
    /// Creates a client for the configured upstream
    pub fn new(
        upstream: &UpstreamConfig,
        quota: &QuotaConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let base_url = Url::parse(&upstream.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(upstream.base_url.clone()).into());
        }

        Ok(Self {
            client: build_http_client(upstream)?,
            base_url,
            max_results: upstream.max_results,
            quota_reason: quota.error_reason.clone(),
            credentials,
        })
    }

    /// Builds the URL for one page request
    ///
    /// Window bounds are sent even with a page token; the upstream ignores them
    /// for filtering when resuming.
    pub fn page_url(&self, request: &PageRequest) -> Result<Url> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|_| ConfigError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&request.target);

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair(
                    "startTime",
                    &request.since.to_rfc3339_opts(SecondsFormat::Millis, true),
                )
                .append_pair(
                    "endTime",
                    &request.until.to_rfc3339_opts(SecondsFormat::Millis, true),
                )
                .append_pair("maxResults", &self.max_results.to_string());

            if let Some(token) = &request.page_token {
                query.append_pair("pageToken", token);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl PageSource for ReportsClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        let url = self.page_url(request)?;
        let token = self.credentials.bearer_token().await?;

        tracing::trace!("GET {}", url);

        let response = self.client.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_error(
                &request.target,
                status.as_u16(),
                &body,
                &self.quota_reason,
            ));
        }

        serde_json::from_str(&body).map_err(|e| CollectorError::Decode {
            target: request.target.clone(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Maps an error response to a collector error
///
/// A body whose `error.errors[].reason` matches `quota_reason` is quota exhaustion,
/// whatever the status code; anything else is a plain upstream failure.
fn classify_error(target: &str, status: u16, body: &str, quota_reason: &str) -> CollectorError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if envelope.error.errors.iter().any(|e| e.reason == quota_reason) => {
            CollectorError::QuotaExceeded {
                target: target.to_string(),
            }
        }
        Ok(envelope) if !envelope.error.message.is_empty() => CollectorError::Upstream {
            target: target.to_string(),
            status,
            message: envelope.error.message,
        },
        _ => CollectorError::Upstream {
            target: target.to_string(),
            status,
            message: truncate(body, MAX_ERROR_BODY),
        },
    }
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
