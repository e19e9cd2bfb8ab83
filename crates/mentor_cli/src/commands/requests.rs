use mentor::{MentorClient, MentorRequest};
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, print_json, print_rows};

/// Mentoring queue link for one exercise of a track.
pub(crate) fn queue_url(track: &str, request: &MentorRequest) -> String {
    format!(
        "https://exercism.org/mentoring/queue?track_slug={}&exercise_slug={}",
        track.to_lowercase(),
        request.exercise_slug()
    )
}

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct RequestRow {
    #[tabled(rename = "Exercise")]
    pub exercise: String,
    #[tabled(rename = "Student")]
    pub student: String,
    #[tabled(rename = "Queue")]
    pub queue: String,
}

impl RequestRow {
    fn new(track: &str, request: &MentorRequest) -> Self {
        Self {
            exercise: request.exercise_title.clone(),
            student: request.student_handle.clone().unwrap_or_default(),
            queue: queue_url(track, request),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct TrackRow {
    #[tabled(rename = "Track")]
    pub slug: String,
}

pub(crate) async fn handle_requests(
    client: &MentorClient,
    track: &str,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let requests = client.mentor_requests(track).await?;
    match output {
        OutputFormat::Json => print_json(&requests),
        OutputFormat::Table => {
            let rows = requests.iter().map(|r| RequestRow::new(track, r)).collect();
            print_rows(rows, output, "No open mentoring requests.")
        }
    }
}

pub(crate) async fn handle_tracks(
    client: &MentorClient,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let tracks = client.tracks().await?;
    let rows = tracks.into_iter().map(|slug| TrackRow { slug }).collect();
    print_rows(rows, output, "No tracks.")
}
