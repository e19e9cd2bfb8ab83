//! Mentor - A resilient client for the Exercism mentoring API.
//!
//! This library fetches paginated results reliably, waits out `retry-after`
//! throttling, retries transient failures with bounded exponential backoff,
//! polls for new notifications, and decides what to do with stale mentoring
//! discussions.
//!
//! All I/O goes through the [`HttpTransport`] trait. [`MentorClient`] is the
//! async client; [`BlockingClient`] drives the same logic on a private
//! runtime for callers that want plain blocking calls.
//!
//! # Example
//!
//! ```ignore
//! use mentor::{ClientConfig, DiscussionOrder, DiscussionStatus, MentorClient};
//!
//! let client = MentorClient::new(ClientConfig::new(token))?;
//!
//! let stale = client
//!     .find_stale(DiscussionStatus::AwaitingStudent, 30, DiscussionOrder::Oldest)
//!     .await?;
//! let partition = client.partition(&stale).await?;
//! client.finish_discussions(&partition.to_finish).await?;
//! client.nudge_discussions(&partition.to_nudge, None).await?;
//! ```

pub mod blocking;
pub mod client;
pub mod discussions;
pub mod error;
pub mod http;
pub mod listings;
pub mod pagination;
pub mod requester;
pub mod retry;
pub mod solutions;
pub mod types;
pub mod watcher;

pub use blocking::BlockingClient;
pub use client::{ClientConfig, DEFAULT_API_BASE, MentorClient};
pub use discussions::{FinishRule, NUDGE_MESSAGE, Partition, Verdict, classify};
pub use error::{Error, Result, short_error_message};
pub use http::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
pub use pagination::{Page, PageMeta, Query};
pub use retry::RetryPolicy;
pub use solutions::group_by_status;
pub use types::{
    Discussion, DiscussionOrder, DiscussionStatus, FailingSolution, MentorRequest, Notification,
    Post, Solution, StreamingEvent, TestsStatus, Track,
};
pub use watcher::{DEFAULT_POLL_INTERVAL, NotificationHandler, NotificationWatcher};
