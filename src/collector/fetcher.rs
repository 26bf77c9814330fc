//! Paginated fetcher
//!
//! Drives repeated page requests for one target into a single accumulated result:
//! - One upstream call at a time, feeding each page's token into the next request
//! - Upstream order is preserved across pages
//! - Stops at end of results or when the per-invocation page budget is spent
//! - A daily-quota error on any page discards everything fetched so far

use crate::state::{CollectionState, FetchOutcome};
use crate::{CollectorError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Parameters of a single page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// The polled entity
    pub target: String,

    /// Inclusive window start
    pub since: DateTime<Utc>,

    /// Exclusive window end
    pub until: DateTime<Utc>,

    /// Cursor from the previous page, if resuming
    pub page_token: Option<String>,
}

impl PageRequest {
    /// Builds the base request for a state's current window and cursor
    pub fn for_state(state: &CollectionState) -> Self {
        Self {
            target: state.target.clone(),
            since: state.since,
            until: state.until,
            page_token: state.continuation_token.clone(),
        }
    }
}

/// One page of upstream results
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// Raw event objects on this page
    #[serde(default)]
    pub items: Vec<Value>,

    /// Token for the next page; absent when the results are exhausted
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// The transport the fetcher pages through
///
/// Implementations report daily quota exhaustion as
/// [`CollectorError::QuotaExceeded`]; every other error aborts the fetch.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches one page of results
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page>;
}

/// Fetches up to `page_budget` pages starting from `base`
///
/// A budget of zero is treated as one page.
///
/// # Returns
///
/// * `Ok(FetchOutcome::Drained)` - The upstream signaled end of results
/// * `Ok(FetchOutcome::Pending)` - The budget ran out while more pages remain
/// * `Ok(FetchOutcome::QuotaExceeded)` - Some page hit the daily quota; no records are kept
/// * `Err(CollectorError)` - Any other upstream failure, with accumulated records dropped
pub async fn fetch_all<S>(source: &S, base: &PageRequest, page_budget: u32) -> Result<FetchOutcome>
where
    S: PageSource + ?Sized,
{
    let budget = page_budget.max(1);
    let mut request = base.clone();
    let mut records = Vec::new();
    let mut calls = 0u32;

    loop {
        calls += 1;

        let page = match source.fetch_page(&request).await {
            Ok(page) => page,
            Err(CollectorError::QuotaExceeded { target }) => {
                tracing::info!(
                    "Quota exceeded for target {} on page {}, discarding {} fetched records",
                    target,
                    calls,
                    records.len()
                );
                return Ok(FetchOutcome::QuotaExceeded);
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(
            "Fetched page {} for target {}: {} items",
            calls,
            request.target,
            page.items.len()
        );

        records.extend(page.items);

        match page.next_page_token.filter(|token| !token.is_empty()) {
            None => return Ok(FetchOutcome::Drained { records }),
            Some(token) if calls >= budget => {
                tracing::debug!(
                    "Page budget of {} reached for target {} with more pages pending",
                    budget,
                    request.target
                );
                return Ok(FetchOutcome::Pending {
                    records,
                    continuation_token: token,
                });
            }
            Some(token) => request.page_token = Some(token),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted page source that replays canned responses and records requests
    pub(crate) struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Page>>>,
        pub(crate) requests: Mutex<Vec<PageRequest>>,
    }

    impl ScriptedSource {
        pub(crate) fn new(responses: Vec<Result<Page>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Page::default()))
        }
    }

    pub(crate) fn page(ids: &[i64], token: Option<&str>) -> Result<Page> {
        Ok(Page {
            items: ids.iter().map(|id| json!({ "id": id })).collect(),
            next_page_token: token.map(str::to_string),
        })
    }

    fn quota_error() -> Result<Page> {
        Err(CollectorError::QuotaExceeded {
            target: "login".to_string(),
        })
    }

    fn base_request() -> PageRequest {
        let since = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        PageRequest {
            target: "login".to_string(),
            since,
            until: since + chrono::Duration::minutes(1),
            page_token: None,
        }
    }

    fn ids(outcome: FetchOutcome) -> Vec<i64> {
        outcome
            .into_records()
            .iter()
            .map(|v| v["id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_drains_within_budget() {
        let source = ScriptedSource::new(vec![
            page(&[1, 2], Some("t1")),
            page(&[3], Some("t2")),
            page(&[4, 5], None),
        ]);

        let outcome = fetch_all(&source, &base_request(), 3).await.unwrap();

        assert_eq!(source.calls(), 3);
        assert!(outcome.continuation_token().is_none());
        assert_eq!(ids(outcome), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_threads_tokens_between_pages() {
        let source = ScriptedSource::new(vec![
            page(&[1], Some("t1")),
            page(&[2], Some("t2")),
            page(&[3], None),
        ]);

        fetch_all(&source, &base_request(), 5).await.unwrap();

        let requests = source.requests.lock().unwrap();
        let tokens: Vec<_> = requests.iter().map(|r| r.page_token.clone()).collect();
        assert_eq!(
            tokens,
            vec![None, Some("t1".to_string()), Some("t2".to_string())]
        );
        assert!(requests.iter().all(|r| r.since == base_request().since));
    }

    #[tokio::test]
    async fn test_budget_exhausted_returns_token() {
        let source = ScriptedSource::new(vec![
            page(&[1], Some("t1")),
            page(&[2], Some("t2")),
            page(&[3], Some("t3")),
        ]);

        let outcome = fetch_all(&source, &base_request(), 2).await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(outcome.continuation_token(), Some("t2"));
        assert_eq!(ids(outcome), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_zero_budget_means_one_page() {
        let source = ScriptedSource::new(vec![page(&[1], Some("t1")), page(&[2], None)]);

        let outcome = fetch_all(&source, &base_request(), 0).await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(outcome.continuation_token(), Some("t1"));
    }

    #[tokio::test]
    async fn test_resumes_from_base_token() {
        let source = ScriptedSource::new(vec![page(&[7], None)]);
        let mut request = base_request();
        request.page_token = Some("resume-here".to_string());

        fetch_all(&source, &request, 1).await.unwrap();

        let requests = source.requests.lock().unwrap();
        assert_eq!(requests[0].page_token.as_deref(), Some("resume-here"));
    }

    #[tokio::test]
    async fn test_empty_token_ends_results() {
        let source = ScriptedSource::new(vec![page(&[1], Some(""))]);

        let outcome = fetch_all(&source, &base_request(), 3).await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(outcome, FetchOutcome::Drained { records: vec![json!({"id": 1})] });
    }

    #[tokio::test]
    async fn test_quota_error_discards_accumulated_records() {
        let source = ScriptedSource::new(vec![page(&[1, 2], Some("t1")), quota_error()]);

        let outcome = fetch_all(&source, &base_request(), 3).await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(outcome, FetchOutcome::QuotaExceeded);
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let source = ScriptedSource::new(vec![
            page(&[1], Some("t1")),
            Err(CollectorError::Upstream {
                target: "login".to_string(),
                status: 503,
                message: "backend unavailable".to_string(),
            }),
            page(&[2], None),
        ]);

        let result = fetch_all(&source, &base_request(), 3).await;

        assert_eq!(source.calls(), 2);
        assert!(matches!(
            result,
            Err(CollectorError::Upstream { status: 503, .. })
        ));
    }

    #[test]
    fn test_page_deserializes_without_items() {
        let page: Page = serde_json::from_str(r#"{"kind": "activities"}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());

        let page: Page =
            serde_json::from_str(r#"{"items": [{"a": 1}], "nextPageToken": "abc"}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_request_for_state() {
        let since = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut state = CollectionState::new("drive", since, 60, 60);
        state.continuation_token = Some("cursor".to_string());

        let request = PageRequest::for_state(&state);
        assert_eq!(request.target, "drive");
        assert_eq!(request.since, state.since);
        assert_eq!(request.until, state.until);
        assert_eq!(request.page_token.as_deref(), Some("cursor"));
    }
}
