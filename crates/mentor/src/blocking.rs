//! Thread-blocking facade over [`MentorClient`].
//!
//! Every call drives the async implementation to completion on a private
//! current-thread runtime, so pacing, rate-limit waits and backoff block the
//! calling thread. Must not be used from inside another tokio runtime.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientConfig, MentorClient};
use crate::discussions::{FinishRule, Partition};
use crate::error::{Error, Result};
use crate::http::HttpTransport;
use crate::pagination::Page;
use crate::types::{
    DiscussionOrder, DiscussionStatus, FailingSolution, MentorRequest, Notification, Post,
    Solution, StreamingEvent,
};
use crate::watcher::{NotificationHandler, NotificationWatcher};

pub struct BlockingClient {
    inner: MentorClient,
    runtime: Runtime,
}

impl BlockingClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = build_runtime()?;
        // reqwest binds its connection pool to the runtime it first runs on.
        let inner = runtime.block_on(async { MentorClient::new(config) })?;
        Ok(Self { inner, runtime })
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        Ok(Self {
            inner: MentorClient::with_transport(config, transport)?,
            runtime: build_runtime()?,
        })
    }

    /// The async client this facade drives.
    #[must_use]
    pub fn inner(&self) -> &MentorClient {
        &self.inner
    }

    pub fn notifications(&self) -> Result<Page<Notification>> {
        self.runtime.block_on(self.inner.notifications())
    }

    pub fn unread_notifications(&self) -> Result<Vec<Notification>> {
        self.runtime.block_on(self.inner.unread_notifications())
    }

    pub fn tracks(&self) -> Result<Vec<String>> {
        self.runtime.block_on(self.inner.tracks())
    }

    pub fn mentor_requests(&self, track: &str) -> Result<Vec<MentorRequest>> {
        self.runtime.block_on(self.inner.mentor_requests(track))
    }

    pub fn streaming_events(&self, live: bool) -> Result<Vec<StreamingEvent>> {
        self.runtime.block_on(self.inner.streaming_events(live))
    }

    pub fn future_streaming_events(&self) -> Result<Vec<StreamingEvent>> {
        self.runtime.block_on(self.inner.future_streaming_events())
    }

    pub fn solutions(&self) -> Result<Vec<Solution>> {
        self.runtime.block_on(self.inner.solutions())
    }

    pub fn sync_out_of_date(&self) -> Result<Vec<Solution>> {
        self.runtime.block_on(self.inner.sync_out_of_date())
    }

    pub fn nonpassing_solutions(&self) -> Result<Vec<Solution>> {
        self.runtime.block_on(self.inner.nonpassing_solutions())
    }

    pub fn failing_solutions(&self, track: Option<&str>) -> Result<Vec<FailingSolution>> {
        self.runtime.block_on(self.inner.failing_solutions(track))
    }

    pub fn discussion_posts(&self, uuid: &str) -> Result<Vec<Post>> {
        self.runtime.block_on(self.inner.discussion_posts(uuid))
    }

    pub fn find_stale(
        &self,
        status: DiscussionStatus,
        age_days: u32,
        order: DiscussionOrder,
    ) -> Result<Vec<String>> {
        self.runtime
            .block_on(self.inner.find_stale(status, age_days, order))
    }

    pub fn find_stale_at(
        &self,
        now: DateTime<Utc>,
        status: DiscussionStatus,
        age_days: u32,
        order: DiscussionOrder,
    ) -> Result<Vec<String>> {
        self.runtime
            .block_on(self.inner.find_stale_at(now, status, age_days, order))
    }

    pub fn partition(&self, uuids: &[String]) -> Result<Partition> {
        self.runtime.block_on(self.inner.partition(uuids))
    }

    pub fn partition_at(
        &self,
        uuids: &[String],
        now: DateTime<Utc>,
        rule: &FinishRule,
    ) -> Result<Partition> {
        self.runtime
            .block_on(self.inner.partition_at(uuids, now, rule))
    }

    pub fn finish_discussions(&self, uuids: &[String]) -> Result<()> {
        self.runtime.block_on(self.inner.finish_discussions(uuids))
    }

    pub fn nudge_discussions(&self, uuids: &[String], message: Option<&str>) -> Result<()> {
        self.runtime
            .block_on(self.inner.nudge_discussions(uuids, message))
    }

    /// Run a notification watcher on the calling thread until `cancel` fires.
    ///
    /// The token may be cancelled from any other thread.
    pub fn watch<H>(&self, handler: &H, interval: Duration, cancel: &CancellationToken) -> Result<()>
    where
        H: NotificationHandler + ?Sized,
    {
        let mut watcher = NotificationWatcher::new(self.inner.clone()).with_interval(interval);
        self.runtime.block_on(watcher.run(handler, cancel))
    }
}

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::config(format!("failed to build runtime: {e}")))
}
