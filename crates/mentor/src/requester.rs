//! Single HTTP calls with inline `retry-after` handling and request pacing.
//!
//! The server signals throttling with a `retry-after` header carrying a delay
//! in whole seconds. A throttled call is reissued exactly once after sleeping
//! one second longer than asked. Broader transient failures are handled a
//! layer up by [`crate::retry::RetryPolicy`].

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::http::{HttpHeaders, HttpRequest, HttpResponse, HttpTransport, header_get};

/// Header used by the API to signal rate limiting.
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Issues HTTP calls with a single rate-limit reissue and a pacing floor.
#[derive(Clone)]
pub struct RateLimitedRequester {
    transport: Arc<dyn HttpTransport>,
}

impl RateLimitedRequester {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Perform `request`, then sleep `min_delay` whatever the outcome.
    ///
    /// If the first response carries `retry-after`, sleep that many seconds
    /// plus one and reissue the identical request once. The reissued response
    /// is not checked for rate limiting again; if it is an error status it
    /// surfaces as [`Error::Http`].
    pub async fn perform(&self, request: HttpRequest, min_delay: Duration) -> Result<HttpResponse> {
        let outcome = self.send_with_reissue(request).await;
        tokio::time::sleep(min_delay).await;
        outcome
    }

    async fn send_with_reissue(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut response = self.transport.send(request.clone()).await?;

        if let Some(delay) = rate_limit_delay(&response.headers) {
            tracing::info!(
                method = request.method.as_str(),
                url = %request.url,
                delay_secs = delay.as_secs(),
                "Rate limited, sleeping before retry"
            );
            tokio::time::sleep(delay).await;
            response = self.transport.send(request.clone()).await?;
        }

        if response.is_error() {
            let body = String::from_utf8_lossy(&response.body).to_string();
            return Err(Error::http(response.status, request.url, body));
        }

        Ok(response)
    }
}

/// How long to wait before reissuing a throttled request.
///
/// Returns `None` when the response carries no `retry-after` header. The
/// wait is the advertised delay plus one second; a value that is not a
/// whole number of seconds counts as zero.
pub fn rate_limit_delay(headers: &HttpHeaders) -> Option<Duration> {
    let raw = header_get(headers, RETRY_AFTER_HEADER)?;
    let secs = raw.trim().parse::<u64>().unwrap_or(0);
    Some(Duration::from_secs(secs.saturating_add(1)))
}
