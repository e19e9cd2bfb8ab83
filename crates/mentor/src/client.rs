//! Mentoring API client creation and request plumbing.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::pagination::{PAGE_PARAM, Page, Query};
use crate::requester::RateLimitedRequester;
use crate::retry::RetryPolicy;

/// Default API root.
pub const DEFAULT_API_BASE: &str = "https://exercism.org/api/v2";

/// Pause after every GET.
pub const DEFAULT_GET_PACING: Duration = Duration::from_millis(200);

/// Pause after every POST or PATCH.
pub const DEFAULT_MUTATION_PACING: Duration = Duration::from_millis(500);

/// Pause after each page of mentoring requests.
pub const DEFAULT_REQUESTS_PACING: Duration = Duration::from_millis(500);

/// Pause after finishing a discussion.
pub const DEFAULT_FINISH_PACING: Duration = Duration::from_millis(200);

/// Transport-level timeout for a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a [`MentorClient`] needs, passed in explicitly at construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://exercism.org/api/v2`.
    pub base_url: String,
    /// Bearer token.
    pub token: String,
    pub get_pacing: Duration,
    pub mutation_pacing: Duration,
    pub finish_pacing: Duration,
    /// Pacing for the mentoring request queue, which is slower to serve.
    pub requests_pacing: Duration,
    pub timeout: Duration,
    /// Retry policy for idempotent JSON reads.
    pub retry: RetryPolicy,
    pub user_agent: String,
}

impl ClientConfig {
    /// A configuration with production defaults and the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            get_pacing: DEFAULT_GET_PACING,
            mutation_pacing: DEFAULT_MUTATION_PACING,
            finish_pacing: DEFAULT_FINISH_PACING,
            requests_pacing: DEFAULT_REQUESTS_PACING,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            user_agent: concat!("mentor/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set all pacing delays at once.
    ///
    /// Finishing a discussion is paced like a GET, the request queue like a
    /// mutation.
    #[must_use]
    pub fn with_pacing(mut self, get: Duration, mutation: Duration) -> Self {
        self.get_pacing = get;
        self.mutation_pacing = mutation;
        self.finish_pacing = get;
        self.requests_pacing = mutation;
        self
    }

    /// Disable pacing entirely. Mostly useful against test transports.
    #[must_use]
    pub fn without_pacing(self) -> Self {
        self.with_pacing(Duration::ZERO, Duration::ZERO)
    }
}

/// Async client for the Exercism mentoring API.
///
/// All waits (pacing, rate limiting, backoff) are cooperative `tokio` sleeps.
/// See [`crate::blocking::BlockingClient`] for a thread-blocking facade over
/// the same logic.
#[derive(Clone)]
pub struct MentorClient {
    base_url: String,
    config: ClientConfig,
    transport: Arc<dyn HttpTransport>,
    open_sessions: Arc<AtomicUsize>,
}

impl MentorClient {
    /// Create a client backed by a reqwest transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(config.timeout)
            .map_err(|e| Error::config(e.to_string()))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| Error::config(format!("invalid base URL {base_url:?}: {e}")))?;
        if config.token.trim().is_empty() {
            return Err(Error::config("API token is empty"));
        }

        Ok(Self {
            base_url,
            config,
            transport,
            open_sessions: Arc::new(AtomicUsize::new(0)),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for `endpoint` with `query` attached.
    pub fn endpoint_url(&self, endpoint: &str, query: &Query) -> Result<String> {
        let raw = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        // An empty pair list would still leave a trailing `?`.
        let parsed = if query.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, query.pairs())
        };
        let url =
            parsed.map_err(|e| Error::config(format!("invalid endpoint {endpoint:?}: {e}")))?;
        Ok(url.into())
    }

    /// Acquire a session for a sequence of related requests.
    pub(crate) fn session(&self, label: &str) -> Session {
        Session::open(
            Arc::clone(&self.transport),
            Arc::clone(&self.open_sessions),
            label,
        )
    }

    /// Number of requests or traversals currently in progress, across all
    /// clones of this client.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    fn build_request(&self, method: HttpMethod, url: String, body: Vec<u8>) -> HttpRequest {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("User-Agent".to_string(), self.config.user_agent.clone()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.config.token),
            ),
        ];
        if !body.is_empty() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    /// GET `endpoint` and decode the JSON body, retrying transient failures.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, query: &Query) -> Result<T> {
        let url = self.endpoint_url(endpoint, query)?;
        let session = self.session(endpoint);
        self.get_json_in(&session, &url, self.config.get_pacing)
            .await
    }

    async fn get_json_in<T: DeserializeOwned>(
        &self,
        session: &Session,
        url: &str,
        pacing: Duration,
    ) -> Result<T> {
        self.config
            .retry
            .run(url, || {
                let request = self.build_request(HttpMethod::Get, url.to_string(), Vec::new());
                let requester = &session.requester;
                async move {
                    let response = requester.perform(request, pacing).await?;
                    decode(url, &response)
                }
            })
            .await
    }

    /// Fetch every page of `endpoint` and concatenate the results in order.
    ///
    /// `base` is copied and its `page` parameter set to 1, 2, ... until the
    /// server reports the last page. There is no cap other than the
    /// server-reported total.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        base: &Query,
    ) -> Result<Vec<T>> {
        self.get_all_pages_paced(endpoint, base, self.config.get_pacing)
            .await
    }

    /// [`MentorClient::get_all_pages`] with `pacing` after each page instead
    /// of the GET default.
    pub async fn get_all_pages_paced<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        base: &Query,
        pacing: Duration,
    ) -> Result<Vec<T>> {
        let mut session = self.session(endpoint);
        let mut query = base.clone();
        let mut all_items: Vec<T> = Vec::new();
        let mut page = 1u32;

        loop {
            query.set(PAGE_PARAM, page.to_string());
            let url = self.endpoint_url(endpoint, &query)?;
            let response: Page<T> = self.get_json_in(&session, &url, pacing).await?;
            session.pages += 1;

            let count = response.results.len();
            let is_last = response.is_last();
            all_items.extend(response.results);

            tracing::debug!(
                endpoint,
                page,
                total_pages = response.meta.total_pages,
                count,
                total_so_far = all_items.len(),
                "Fetched page"
            );

            if is_last {
                break;
            }
            page += 1;
        }

        Ok(all_items)
    }

    /// POST a JSON body to `endpoint`.
    pub async fn post_json<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<HttpResponse> {
        let url = self.endpoint_url(endpoint, &Query::new())?;
        let body = serde_json::to_vec(body).map_err(|e| Error::config(e.to_string()))?;
        let request = self.build_request(HttpMethod::Post, url, body);
        self.session(endpoint)
            .requester
            .perform(request, self.config.mutation_pacing)
            .await
    }

    /// PATCH `endpoint` with an empty body.
    pub async fn patch(&self, endpoint: &str, pacing: Duration) -> Result<HttpResponse> {
        let url = self.endpoint_url(endpoint, &Query::new())?;
        let request = self.build_request(HttpMethod::Patch, url, Vec::new());
        self.session(endpoint)
            .requester
            .perform(request, pacing)
            .await
    }
}

/// Decode a JSON response body.
pub(crate) fn decode<T: DeserializeOwned>(url: &str, response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|source| Error::MalformedResponse {
        url: url.to_string(),
        source,
    })
}

/// One request or pagination traversal in progress.
///
/// Connections are pooled by the transport and outlive any session. What a
/// session scopes is the traversal itself: it is counted in
/// [`MentorClient::open_sessions`] from open until drop, and drop happens on
/// success, on every error path, and when the calling future is cancelled.
pub(crate) struct Session {
    requester: RateLimitedRequester,
    open: Arc<AtomicUsize>,
    label: String,
    pages: u32,
}

impl Session {
    fn open(transport: Arc<dyn HttpTransport>, open: Arc<AtomicUsize>, label: &str) -> Self {
        let count = open.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(label, open = count, "Opened session");
        Self {
            requester: RateLimitedRequester::new(transport),
            open,
            label: label.to_string(),
            pages: 0,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(label = %self.label, pages = self.pages, "Released session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockTransport, json_response};
    use serde_json::json;
    use tokio::time::Instant;

    const BASE: &str = "https://api.test/v2";

    fn client(transport: &MockTransport) -> MentorClient {
        let config = ClientConfig::new("secret").with_base_url(BASE).without_pacing();
        MentorClient::with_transport(config, Arc::new(transport.clone())).expect("client")
    }

    fn page(items: &[&str], current: u32, total: u32) -> serde_json::Value {
        json!({
            "results": items.iter().map(|u| json!({"uuid": u})).collect::<Vec<_>>(),
            "meta": {"current_page": current, "total_pages": total}
        })
    }

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Item {
        uuid: String,
    }

    #[test]
    fn config_defaults_match_original_pacing() {
        let config = ClientConfig::new("t");
        assert_eq!(config.base_url, DEFAULT_API_BASE);
        assert_eq!(config.get_pacing, Duration::from_millis(200));
        assert_eq!(config.mutation_pacing, Duration::from_millis(500));
        assert_eq!(config.finish_pacing, Duration::from_millis(200));
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.user_agent.starts_with("mentor/"));
    }

    #[test]
    fn with_transport_rejects_bad_base_url_and_empty_token() {
        let transport = Arc::new(MockTransport::new());

        let bad_url = ClientConfig::new("t").with_base_url("not a url");
        assert!(matches!(
            MentorClient::with_transport(bad_url, transport.clone()),
            Err(Error::Config(_))
        ));

        let no_token = ClientConfig::new("  ");
        assert!(matches!(
            MentorClient::with_transport(no_token, transport),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn endpoint_url_joins_and_encodes_query() {
        let transport = MockTransport::new();
        let config = ClientConfig::new("t").with_base_url("https://api.test/v2///");
        let client = MentorClient::with_transport(config, Arc::new(transport)).unwrap();

        assert_eq!(client.base_url(), "https://api.test/v2");
        assert_eq!(
            client.endpoint_url("/tracks", &Query::new()).unwrap(),
            "https://api.test/v2/tracks"
        );
        assert_eq!(
            client
                .endpoint_url(
                    "mentoring/requests",
                    &Query::new().with("track_slug", "c++").with("page", "2")
                )
                .unwrap(),
            "https://api.test/v2/mentoring/requests?track_slug=c%2B%2B&page=2"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn requests_carry_bearer_token_and_json_accept() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{BASE}/tracks"), json!({"tracks": []}));

        let _: serde_json::Value = client(&transport)
            .get_json("tracks", &Query::new())
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(
            crate::http::header_get(&request.headers, "authorization"),
            Some("Bearer secret")
        );
        assert_eq!(
            crate::http::header_get(&request.headers, "accept"),
            Some("application/json")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn get_all_pages_concatenates_in_page_order() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{BASE}/solutions?page=1"), page(&["a", "b"], 1, 3));
        transport.push_json(HttpMethod::Get, format!("{BASE}/solutions?page=2"), page(&["c"], 2, 3));
        transport.push_json(HttpMethod::Get, format!("{BASE}/solutions?page=3"), page(&["d", "e"], 3, 3));

        let items: Vec<Item> = client(&transport)
            .get_all_pages("solutions", &Query::new())
            .await
            .unwrap();

        let uuids: Vec<_> = items.iter().map(|i| i.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn get_all_pages_keeps_base_params_and_replaces_page() {
        let transport = MockTransport::new();
        let first = format!("{BASE}/mentoring/discussions?status=awaiting_student&order=oldest&page=1");
        let second = format!("{BASE}/mentoring/discussions?status=awaiting_student&order=oldest&page=2");
        transport.push_json(HttpMethod::Get, first.clone(), page(&["a"], 1, 2));
        transport.push_json(HttpMethod::Get, second.clone(), page(&["b"], 2, 2));

        let base = Query::new()
            .with("status", "awaiting_student")
            .with("order", "oldest")
            .with("page", "9");
        let items: Vec<Item> = client(&transport)
            .get_all_pages("mentoring/discussions", &base)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(transport.urls(), vec![first, second]);
        assert_eq!(base.get("page"), Some("9"));
    }

    #[tokio::test(start_paused = true)]
    async fn single_empty_page_terminates() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{BASE}/solutions?page=1"), page(&[], 1, 0));

        let items: Vec<Item> = client(&transport)
            .get_all_pages("solutions", &Query::new())
            .await
            .unwrap();

        assert!(items.is_empty());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_on_a_later_page_returns_error_not_partial_results() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{BASE}/solutions?page=1"), page(&["a"], 1, 2));
        transport.push_response(
            HttpMethod::Get,
            format!("{BASE}/solutions?page=2"),
            json_response(403, &json!({"error": "forbidden"})),
        );

        let result: Result<Vec<Item>> = client(&transport)
            .get_all_pages("solutions", &Query::new())
            .await;

        assert_eq!(result.unwrap_err().status(), Some(403));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_envelope_fields_are_malformed_and_not_retried() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{BASE}/solutions?page=1"), json!({"results": []}));

        let err = client(&transport)
            .get_all_pages::<Item>("solutions", &Query::new())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MalformedResponse { .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_page_failure_is_retried_with_backoff() {
        let transport = MockTransport::new();
        let url = format!("{BASE}/solutions?page=1");
        transport.push_transport_error(HttpMethod::Get, url.clone());
        transport.push_response(HttpMethod::Get, url.clone(), json_response(502, &json!({})));
        transport.push_json(HttpMethod::Get, url.clone(), page(&["a"], 1, 1));

        let start = Instant::now();
        let items: Vec<Item> = client(&transport)
            .get_all_pages("solutions", &Query::new())
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(transport.urls(), vec![url.clone(), url.clone(), url]);
        assert_eq!(start.elapsed(), Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn session_is_released_after_failed_traversal() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{BASE}/solutions?page=1"),
            json_response(404, &json!({})),
        );
        let client = client(&transport);

        let result = client
            .get_all_pages::<Item>("solutions", &Query::new())
            .await;

        assert!(result.is_err());
        assert_eq!(client.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn session_is_held_for_traversal_and_released_on_cancel() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{BASE}/solutions?page=1"), page(&["a"], 1, 2));
        transport.push_json(HttpMethod::Get, format!("{BASE}/solutions?page=2"), page(&["b"], 2, 2));
        let config = ClientConfig::new("t").with_base_url(BASE);
        let client = MentorClient::with_transport(config, Arc::new(transport.clone())).unwrap();
        assert_eq!(client.open_sessions(), 0);

        // Page 1 is fetched and the traversal is pacing when the timer fires.
        let query = Query::new();
        let traversal = client.get_all_pages::<Item>("solutions", &query);
        tokio::select! {
            _ = traversal => panic!("traversal should still be pacing"),
            () = tokio::time::sleep(Duration::from_millis(100)) => {
                assert_eq!(client.open_sessions(), 1);
            }
        }

        assert_eq!(client.open_sessions(), 0);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn paced_traversal_uses_given_pacing() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{BASE}/queue?page=1"), page(&["a"], 1, 2));
        transport.push_json(HttpMethod::Get, format!("{BASE}/queue?page=2"), page(&["b"], 2, 2));
        let config = ClientConfig::new("t").with_base_url(BASE);
        let client = MentorClient::with_transport(config, Arc::new(transport)).unwrap();

        let start = Instant::now();
        let items: Vec<Item> = client
            .get_all_pages_paced("queue", &Query::new(), DEFAULT_REQUESTS_PACING)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn get_pacing_is_applied_per_page() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Get, format!("{BASE}/solutions?page=1"), page(&["a"], 1, 2));
        transport.push_json(HttpMethod::Get, format!("{BASE}/solutions?page=2"), page(&["b"], 2, 2));
        let config = ClientConfig::new("t").with_base_url(BASE);
        let client = MentorClient::with_transport(config, Arc::new(transport)).unwrap();

        let start = Instant::now();
        let _: Vec<Item> = client.get_all_pages("solutions", &Query::new()).await.unwrap();

        assert_eq!(start.elapsed(), DEFAULT_GET_PACING * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn post_json_sends_body_with_content_type() {
        let transport = MockTransport::new();
        let url = format!("{BASE}/mentoring/discussions/d1/posts");
        transport.push_json(HttpMethod::Post, url.clone(), json!({}));

        client(&transport)
            .post_json("mentoring/discussions/d1/posts", &json!({"content": "hi"}))
            .await
            .unwrap();

        let request = &transport.requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, url);
        assert_eq!(
            crate::http::header_get(&request.headers, "content-type"),
            Some("application/json")
        );
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body, json!({"content": "hi"}));
    }

    #[tokio::test(start_paused = true)]
    async fn mutations_are_not_retried() {
        let transport = MockTransport::new();
        let url = format!("{BASE}/solutions/s1/sync");
        transport.push_response(HttpMethod::Patch, url, json_response(500, &json!({})));

        let err = client(&transport)
            .patch("solutions/s1/sync", Duration::ZERO)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(transport.requests().len(), 1);
    }
}
