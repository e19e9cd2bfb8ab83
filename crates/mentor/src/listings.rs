//! Read-only listings: notifications, tracks, mentor requests, streams.

use chrono::{DateTime, Utc};

use crate::client::MentorClient;
use crate::error::Result;
use crate::pagination::{Page, Query};
use crate::types::{MentorRequest, Notification, StreamingEvent, TracksResponse};

impl MentorClient {
    /// The first page of notifications, including the unread count.
    pub async fn notifications(&self) -> Result<Page<Notification>> {
        self.get_json("notifications", &Query::new()).await
    }

    /// Unread notifications from the first page, in server order.
    pub async fn unread_notifications(&self) -> Result<Vec<Notification>> {
        let page = self.notifications().await?;
        Ok(page.results.into_iter().filter(|n| !n.is_read).collect())
    }

    /// Slugs of all tracks.
    pub async fn tracks(&self) -> Result<Vec<String>> {
        let response: TracksResponse = self.get_json("tracks", &Query::new()).await?;
        Ok(response.tracks.into_iter().map(|t| t.slug).collect())
    }

    /// All open mentoring requests for one track, paced by
    /// [`ClientConfig::requests_pacing`](crate::ClientConfig::requests_pacing).
    pub async fn mentor_requests(&self, track: &str) -> Result<Vec<MentorRequest>> {
        let query = Query::new().with("track_slug", track.to_lowercase());
        let pacing = self.config().requests_pacing;
        self.get_all_pages_paced("mentoring/requests", &query, pacing)
            .await
    }

    /// All streaming events, sorted by start time.
    ///
    /// The API only orders within a page, so the sort happens after the full
    /// traversal.
    pub async fn streaming_events(&self, live: bool) -> Result<Vec<StreamingEvent>> {
        let mut query = Query::new();
        if live {
            query.set("live", "true");
        }
        let mut events: Vec<StreamingEvent> = self.get_all_pages("streaming_events", &query).await?;
        sort_by_start(&mut events);
        Ok(events)
    }

    /// Streaming events starting now or later, sorted by start time.
    pub async fn future_streaming_events(&self) -> Result<Vec<StreamingEvent>> {
        self.future_streaming_events_at(Utc::now()).await
    }

    /// [`MentorClient::future_streaming_events`] relative to `now`.
    pub async fn future_streaming_events_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<StreamingEvent>> {
        let events = self.streaming_events(false).await?;
        Ok(starting_from(events, now))
    }
}

fn sort_by_start(events: &mut [StreamingEvent]) {
    events.sort_by_key(|e| e.starts_at);
}

/// Keep events with `starts_at >= now`, preserving order.
pub fn starting_from(events: Vec<StreamingEvent>, now: DateTime<Utc>) -> Vec<StreamingEvent> {
    events.into_iter().filter(|e| e.starts_at >= now).collect()
}
