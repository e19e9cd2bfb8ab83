//! Exercism API data types.
//!
//! Only the fields the tools act on are modelled; unknown fields are ignored
//! (or kept in `extra` where the CLI re-emits records as JSON).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A `{ "slug": ... }` reference to a track or exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slugged {
    pub slug: String,
}

/// Head-test status of a solution's published iteration.
///
/// Statuses order by their wire name, so grouped reports sort
/// alphabetically with unknown statuses in among the known ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TestsStatus {
    Cancelled,
    Errored,
    Exceptioned,
    Failed,
    NotQueued,
    Passed,
    Queued,
    /// A status this client does not know about, kept verbatim.
    Other(String),
}

impl TestsStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            TestsStatus::Cancelled => "cancelled",
            TestsStatus::Errored => "errored",
            TestsStatus::Exceptioned => "exceptioned",
            TestsStatus::Failed => "failed",
            TestsStatus::NotQueued => "not_queued",
            TestsStatus::Passed => "passed",
            TestsStatus::Queued => "queued",
            TestsStatus::Other(raw) => raw,
        }
    }

    /// True for statuses that indicate a real test failure, i.e. neither
    /// passing nor simply never run.
    #[must_use]
    pub fn is_failing(&self) -> bool {
        !matches!(self, TestsStatus::Passed | TestsStatus::NotQueued)
    }
}

impl From<String> for TestsStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "cancelled" => TestsStatus::Cancelled,
            "errored" => TestsStatus::Errored,
            "exceptioned" => TestsStatus::Exceptioned,
            "failed" => TestsStatus::Failed,
            "not_queued" => TestsStatus::NotQueued,
            "passed" => TestsStatus::Passed,
            "queued" => TestsStatus::Queued,
            _ => TestsStatus::Other(raw),
        }
    }
}

impl From<TestsStatus> for String {
    fn from(status: TestsStatus) -> Self {
        match status {
            TestsStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl Ord for TestsStatus {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for TestsStatus {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TestsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A student's solution to one exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub uuid: String,
    pub published_iteration_head_tests_status: TestsStatus,
    #[serde(default)]
    pub is_out_of_date: bool,
    pub track: Slugged,
    pub exercise: Slugged,
    #[serde(default)]
    pub private_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Solution {
    /// `track/exercise`, as shown in reports.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}", self.track.slug, self.exercise.slug)
    }
}

/// Body returned by the solution sync endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncedSolution {
    pub solution: Solution,
}

/// A flattened row describing a solution whose tests do not pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailingSolution {
    pub uuid: String,
    pub private_url: Option<String>,
    pub published_iteration_head_tests_status: TestsStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_out_of_date: bool,
    pub track: String,
    pub exercise: String,
}

impl From<Solution> for FailingSolution {
    fn from(solution: Solution) -> Self {
        Self {
            uuid: solution.uuid,
            private_url: solution.private_url,
            published_iteration_head_tests_status: solution.published_iteration_head_tests_status,
            published_at: solution.published_at,
            completed_at: solution.completed_at,
            updated_at: solution.updated_at,
            is_out_of_date: solution.is_out_of_date,
            track: solution.track.slug,
            exercise: solution.exercise.slug,
        }
    }
}

/// Lifecycle state of a mentoring discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscussionStatus {
    AwaitingMentor,
    AwaitingStudent,
    Finished,
}

impl DiscussionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DiscussionStatus::AwaitingMentor => "awaiting_mentor",
            DiscussionStatus::AwaitingStudent => "awaiting_student",
            DiscussionStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for DiscussionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort order accepted by the discussions listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DiscussionOrder {
    #[default]
    Oldest,
    Recent,
    Exercise,
    Student,
}

impl DiscussionOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DiscussionOrder::Oldest => "oldest",
            DiscussionOrder::Recent => "recent",
            DiscussionOrder::Exercise => "exercise",
            DiscussionOrder::Student => "student",
        }
    }
}

impl fmt::Display for DiscussionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mentoring discussion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discussion {
    pub uuid: String,
    pub status: DiscussionStatus,
    pub updated_at: DateTime<Utc>,
}

/// One post within a discussion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub updated_at: DateTime<Utc>,
    pub by_student: bool,
}

/// Body returned by the discussion posts endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PostsResponse {
    pub items: Vec<Post>,
}

/// A user notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub uuid: String,
    pub is_read: bool,
    pub url: String,
    pub text: String,
}

/// A scheduled or live community stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingEvent {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A student's open request for mentoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentorRequest {
    pub exercise_title: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub track_title: Option<String>,
    #[serde(default)]
    pub student_handle: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl MentorRequest {
    /// Exercise slug derived from the display title.
    #[must_use]
    pub fn exercise_slug(&self) -> String {
        self.exercise_title.to_lowercase().replace(' ', "-")
    }
}

/// A language track.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Track {
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Body returned by the tracks endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TracksResponse {
    pub tracks: Vec<Track>,
}
