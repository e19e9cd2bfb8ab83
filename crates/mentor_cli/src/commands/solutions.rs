use mentor::{FailingSolution, MentorClient, Solution, group_by_status};
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, format_optional_time, print_rows};

#[derive(Debug, Clone, Serialize, Tabled)]
pub(crate) struct SolutionRow {
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Solution")]
    pub solution: String,
    #[tabled(rename = "Out of date")]
    pub out_of_date: bool,
    #[tabled(rename = "URL")]
    pub url: String,
}

impl From<&Solution> for SolutionRow {
    fn from(solution: &Solution) -> Self {
        Self {
            status: solution
                .published_iteration_head_tests_status
                .as_str()
                .to_uppercase(),
            solution: solution.path(),
            out_of_date: solution.is_out_of_date,
            url: solution.private_url.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct FailingRow {
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Track")]
    pub track: String,
    #[tabled(rename = "Exercise")]
    pub exercise: String,
    #[tabled(rename = "Updated")]
    pub updated: String,
    #[tabled(rename = "URL")]
    pub url: String,
}

impl From<&FailingSolution> for FailingRow {
    fn from(solution: &FailingSolution) -> Self {
        Self {
            status: solution.published_iteration_head_tests_status.to_string(),
            track: solution.track.clone(),
            exercise: solution.exercise.clone(),
            updated: format_optional_time(solution.updated_at),
            url: format!(
                "https://exercism.org/tracks/{}/exercises/{}",
                solution.track, solution.exercise
            ),
        }
    }
}

/// Rows for synced solutions, grouped by test status in alphabetical order.
pub(crate) fn sync_report_rows(updates: &[Solution]) -> Vec<SolutionRow> {
    group_by_status(updates)
        .into_values()
        .flatten()
        .map(SolutionRow::from)
        .collect()
}

pub(crate) async fn handle_failing(
    client: &MentorClient,
    track: Option<&str>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let failing = client.failing_solutions(track).await?;
    match output {
        OutputFormat::Json => crate::commands::output::print_json(&failing),
        OutputFormat::Table => {
            let rows = failing.iter().map(FailingRow::from).collect();
            print_rows(rows, output, "No failing solutions.")
        }
    }
}

pub(crate) async fn handle_nonpassing(
    client: &MentorClient,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let solutions = client.nonpassing_solutions().await?;
    let rows = solutions.iter().map(SolutionRow::from).collect();
    print_rows(rows, output, "Every solution passes.")
}

pub(crate) async fn handle_sync(
    client: &MentorClient,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let updates = client.sync_out_of_date().await?;
    print_rows(sync_report_rows(&updates), output, "No out-of-date solutions.")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn solution(uuid: &str, status: &str) -> Solution {
        serde_json::from_value(json!({
            "uuid": uuid,
            "published_iteration_head_tests_status": status,
            "is_out_of_date": false,
            "track": {"slug": "python"},
            "exercise": {"slug": uuid},
            "private_url": format!("https://exercism.org/tracks/python/exercises/{uuid}")
        }))
        .unwrap()
    }

    #[test]
    fn sync_report_groups_by_status() {
        let updates = vec![
            solution("bob", "queued"),
            solution("leap", "failed"),
            solution("anagram", "queued"),
            solution("clock", "passed"),
        ];

        let rows = sync_report_rows(&updates);
        let order: Vec<_> = rows
            .iter()
            .map(|r| format!("{} {}", r.status, r.solution))
            .collect();
        assert_eq!(
            order,
            vec![
                "FAILED python/leap",
                "PASSED python/clock",
                "QUEUED python/bob",
                "QUEUED python/anagram",
            ]
        );
    }

    #[test]
    fn unknown_status_keeps_its_name_in_reports() {
        let updates = vec![solution("bob", "smoldering"), solution("leap", "failed")];

        let rows = sync_report_rows(&updates);
        assert_eq!(rows[0].status, "FAILED");
        assert_eq!(rows[1].status, "SMOLDERING");

        let row = FailingRow::from(&FailingSolution::from(solution("bob", "smoldering")));
        assert_eq!(row.status, "smoldering");
    }

    #[test]
    fn failing_row_links_to_exercise() {
        let row = FailingRow::from(&FailingSolution::from(solution("bob", "errored")));
        assert_eq!(row.status, "errored");
        assert_eq!(row.url, "https://exercism.org/tracks/python/exercises/bob");
        assert_eq!(row.updated, "-");
    }
}
