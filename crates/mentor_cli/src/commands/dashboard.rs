//! Static HTML page listing open mentoring requests per track.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use mentor::{MentorClient, MentorRequest};
use tokio_util::sync::CancellationToken;

use crate::commands::requests::queue_url;

const INBOX_URL: &str = "https://exercism.org/mentoring/inbox";

/// Everything the page shows.
pub(crate) struct Dashboard {
    pub generated_at: DateTime<Local>,
    pub has_unread: bool,
    pub tracks: Vec<(String, Vec<MentorRequest>)>,
}

impl Dashboard {
    pub(crate) async fn fetch(client: &MentorClient, tracks: &[String]) -> mentor::Result<Self> {
        let notifications = client.notifications().await?;
        let has_unread = notifications.meta.unread_count.unwrap_or(0) > 0;

        let mut sections = Vec::with_capacity(tracks.len());
        for track in tracks {
            let requests = client.mentor_requests(track).await?;
            sections.push((track.clone(), requests));
        }

        Ok(Self {
            generated_at: Local::now(),
            has_unread,
            tracks: sections,
        })
    }

    pub(crate) fn render(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        writeln!(out, "<head><title>Solutions</title></head>")?;
        writeln!(
            out,
            "Generated: {}<hr>",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        )?;

        if self.has_unread {
            writeln!(out, "<h1><a href='{INBOX_URL}'>Notifications</a></h1><hr>")?;
        }

        for (track, requests) in &self.tracks {
            writeln!(out, "<h2>{}</h2>", escape(track))?;
            writeln!(out, "<ul>")?;
            for request in requests {
                writeln!(
                    out,
                    "<li><a href='{}'>{}</a></li>",
                    escape(&queue_url(track, request)),
                    escape(&request.exercise_title)
                )?;
            }
            writeln!(out, "</ul><hr>")?;
        }

        Ok(out)
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

async fn write_once(
    client: &MentorClient,
    tracks: &[String],
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = Dashboard::fetch(client, tracks).await?;
    tokio::fs::write(path, dashboard.render()?).await?;
    tracing::info!(path = ?path, tracks = tracks.len(), "Wrote dashboard");
    Ok(())
}

/// Write the dashboard once, or every `refresh` until cancelled.
///
/// When repeating, a failed refresh is logged and the previous page is left
/// in place.
pub(crate) async fn handle_dashboard(
    client: &MentorClient,
    tracks: &[String],
    path: PathBuf,
    refresh: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(refresh) = refresh else {
        return write_once(client, tracks, &path).await;
    };

    loop {
        if let Err(e) = write_once(client, tracks, &path).await {
            tracing::warn!("Dashboard refresh failed: {}", e);
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(refresh) => {}
        }
    }
    Ok(())
}
