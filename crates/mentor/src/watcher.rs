//! Long-running notification polling.
//!
//! The watcher primes a seen-set with every notification that exists at
//! startup, then periodically fetches notifications and dispatches those that
//! are unread and not yet seen. Each notification is dispatched at most once
//! per watcher.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::client::MentorClient;
use crate::error::{Result, short_error_message};
use crate::types::Notification;

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Receives newly observed notifications.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn handle(&self, notification: &Notification);
}

pub struct NotificationWatcher {
    client: MentorClient,
    interval: Duration,
    seen: HashSet<String>,
}

impl NotificationWatcher {
    pub fn new(client: MentorClient) -> Self {
        Self {
            client,
            interval: DEFAULT_POLL_INTERVAL,
            seen: HashSet::new(),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn has_seen(&self, uuid: &str) -> bool {
        self.seen.contains(uuid)
    }

    /// Record every current notification as seen without dispatching any.
    ///
    /// Returns the number of notifications recorded.
    pub async fn prime(&mut self) -> Result<usize> {
        let page = self.client.notifications().await?;
        let count = page.results.len();
        self.seen.extend(page.results.into_iter().map(|n| n.uuid));
        tracing::info!(
            primed = count,
            unread = page.meta.unread_count.unwrap_or_default(),
            "Primed notification watcher"
        );
        Ok(count)
    }

    /// Fetch once and dispatch every unread, unseen notification in server
    /// order. Returns the dispatched notifications.
    pub async fn poll_once<H>(&mut self, handler: &H) -> Result<Vec<Notification>>
    where
        H: NotificationHandler + ?Sized,
    {
        let page = self.client.notifications().await?;

        let mut dispatched = Vec::new();
        for notification in page.results {
            if notification.is_read || self.seen.contains(&notification.uuid) {
                continue;
            }
            handler.handle(&notification).await;
            self.seen.insert(notification.uuid.clone());
            dispatched.push(notification);
        }

        if !dispatched.is_empty() {
            tracing::info!(count = dispatched.len(), "Dispatched new notifications");
        }
        Ok(dispatched)
    }

    /// Prime, then poll every interval until `cancel` fires.
    ///
    /// A priming failure is returned. Failures in later polls are logged and
    /// the loop keeps going.
    pub async fn run<H>(&mut self, handler: &H, cancel: &CancellationToken) -> Result<()>
    where
        H: NotificationHandler + ?Sized,
    {
        self.prime().await?;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }

            if let Err(e) = self.poll_once(handler).await {
                tracing::warn!(error = %short_error_message(&e), "Notification poll failed");
            }
        }

        tracing::info!(seen = self.seen.len(), "Notification watcher stopped");
        Ok(())
    }
}
