use mentor::{MentorClient, StreamingEvent};
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, format_time, print_json, print_rows};

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct EventRow {
    #[tabled(rename = "Starts")]
    pub starts: String,
    #[tabled(rename = "Ends")]
    pub ends: String,
    #[tabled(rename = "Title")]
    pub title: String,
}

impl From<&StreamingEvent> for EventRow {
    fn from(event: &StreamingEvent) -> Self {
        Self {
            starts: format_time(event.starts_at),
            ends: format_time(event.ends_at),
            title: event.title.clone().unwrap_or_default(),
        }
    }
}

/// List streaming events. Upcoming only unless `all` or `live` is set.
pub(crate) async fn handle_events(
    client: &MentorClient,
    live: bool,
    all: bool,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let events = if live || all {
        client.streaming_events(live).await?
    } else {
        client.future_streaming_events().await?
    };

    match output {
        OutputFormat::Json => print_json(&events),
        OutputFormat::Table => {
            let rows = events.iter().map(EventRow::from).collect();
            print_rows(rows, output, "No streaming events.")
        }
    }
}
