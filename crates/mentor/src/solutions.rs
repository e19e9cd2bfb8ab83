//! Solution reports and syncing out-of-date solutions.

use std::collections::BTreeMap;

use crate::client::MentorClient;
use crate::error::{Error, Result};
use crate::pagination::Query;
use crate::types::{FailingSolution, Solution, SyncedSolution, TestsStatus};

impl MentorClient {
    /// Every solution of the authenticated user.
    pub async fn solutions(&self) -> Result<Vec<Solution>> {
        self.get_all_pages("solutions", &Query::new()).await
    }

    /// Ask the server to sync one solution to the latest exercise version.
    pub async fn sync_solution(&self, uuid: &str) -> Result<Solution> {
        let endpoint = format!("solutions/{uuid}/sync");
        let response = self.patch(&endpoint, self.config().mutation_pacing).await?;
        let url = self.endpoint_url(&endpoint, &Query::new())?;
        let synced: SyncedSolution = serde_json::from_slice(&response.body)
            .map_err(|source| Error::MalformedResponse { url, source })?;
        Ok(synced.solution)
    }

    /// Sync every out-of-date solution and return the updated records.
    ///
    /// Stops at the first failure; the solutions synced before it stay synced
    /// on the server.
    pub async fn sync_out_of_date(&self) -> Result<Vec<Solution>> {
        let solutions = self.solutions().await?;
        let stale: Vec<_> = solutions.into_iter().filter(|s| s.is_out_of_date).collect();
        tracing::info!(count = stale.len(), "Syncing out-of-date solutions");

        let mut updates = Vec::with_capacity(stale.len());
        for solution in stale {
            let updated = self.sync_solution(&solution.uuid).await?;
            tracing::debug!(
                solution = %updated.path(),
                status = %updated.published_iteration_head_tests_status,
                "Synced solution"
            );
            updates.push(updated);
        }
        Ok(updates)
    }

    /// Solutions whose published iteration does not pass its tests.
    pub async fn nonpassing_solutions(&self) -> Result<Vec<Solution>> {
        let solutions = self.solutions().await?;
        Ok(solutions
            .into_iter()
            .filter(|s| s.published_iteration_head_tests_status != TestsStatus::Passed)
            .collect())
    }

    /// Failing solutions (neither passed nor never queued), optionally
    /// restricted to one track.
    pub async fn failing_solutions(&self, track: Option<&str>) -> Result<Vec<FailingSolution>> {
        let solutions = self.solutions().await?;
        Ok(failing(solutions, track))
    }
}

fn failing(solutions: Vec<Solution>, track: Option<&str>) -> Vec<FailingSolution> {
    solutions
        .into_iter()
        .filter(|s| track.is_none_or(|t| s.track.slug == t))
        .filter(|s| s.published_iteration_head_tests_status.is_failing())
        .map(FailingSolution::from)
        .collect()
}

/// Group solutions by test status, statuses in alphabetical order and
/// solutions in input order within each group.
pub fn group_by_status(solutions: &[Solution]) -> BTreeMap<TestsStatus, Vec<&Solution>> {
    let mut groups: BTreeMap<TestsStatus, Vec<&Solution>> = BTreeMap::new();
    for solution in solutions {
        groups
            .entry(solution.published_iteration_head_tests_status.clone())
            .or_default()
            .push(solution);
    }
    groups
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::client::ClientConfig;
    use crate::http::{HttpMethod, MockTransport, json_response};

    use super::*;

    const BASE: &str = "https://api.test/v2";

    fn client(transport: &MockTransport) -> MentorClient {
        let config = ClientConfig::new("t").with_base_url(BASE).without_pacing();
        MentorClient::with_transport(config, Arc::new(transport.clone())).unwrap()
    }

    fn solution(uuid: &str, track: &str, status: &str, out_of_date: bool) -> serde_json::Value {
        json!({
            "uuid": uuid,
            "published_iteration_head_tests_status": status,
            "is_out_of_date": out_of_date,
            "track": {"slug": track},
            "exercise": {"slug": format!("ex-{uuid}")}
        })
    }

    fn push_solutions(transport: &MockTransport, items: Vec<serde_json::Value>) {
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/solutions?page=1"),
            json!({"results": items, "meta": {"current_page": 1, "total_pages": 1}}),
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sync_out_of_date_patches_only_stale_solutions() {
        let transport = MockTransport::new();
        push_solutions(
            &transport,
            vec![
                solution("a", "python", "passed", true),
                solution("b", "python", "passed", false),
                solution("c", "jq", "failed", true),
            ],
        );
        transport.push_json(
            HttpMethod::Patch,
            format!("{BASE}/solutions/a/sync"),
            json!({"solution": solution("a", "python", "queued", false)}),
        );
        transport.push_json(
            HttpMethod::Patch,
            format!("{BASE}/solutions/c/sync"),
            json!({"solution": solution("c", "jq", "passed", false)}),
        );

        let updates = client(&transport).sync_out_of_date().await.unwrap();

        let uuids: Vec<_> = updates.iter().map(|s| s.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["a", "c"]);
        assert!(updates.iter().all(|s| !s.is_out_of_date));
        let patches = transport
            .requests()
            .into_iter()
            .filter(|r| r.method == HttpMethod::Patch)
            .count();
        assert_eq!(patches, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_out_of_date_twice_is_idempotent() {
        let transport = MockTransport::new();
        push_solutions(&transport, vec![solution("a", "python", "passed", true)]);
        transport.push_json(
            HttpMethod::Patch,
            format!("{BASE}/solutions/a/sync"),
            json!({"solution": solution("a", "python", "passed", false)}),
        );
        push_solutions(&transport, vec![solution("a", "python", "passed", false)]);
        let client = client(&transport);

        assert_eq!(client.sync_out_of_date().await.unwrap().len(), 1);
        assert!(client.sync_out_of_date().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sync_failure_aborts_the_run() {
        let transport = MockTransport::new();
        push_solutions(
            &transport,
            vec![
                solution("a", "python", "passed", true),
                solution("b", "python", "passed", true),
            ],
        );
        transport.push_response(
            HttpMethod::Patch,
            format!("{BASE}/solutions/a/sync"),
            json_response(422, &json!({"error": "nope"})),
        );

        let err = client(&transport).sync_out_of_date().await.unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert!(!transport.urls().iter().any(|u| u.ends_with("/solutions/b/sync")));
    }

    #[tokio::test(start_paused = true)]
    async fn sync_response_without_solution_is_malformed() {
        let transport = MockTransport::new();
        transport.push_json(HttpMethod::Patch, format!("{BASE}/solutions/a/sync"), json!({}));

        let err = client(&transport).sync_solution("a").await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_solutions_filters_status_and_track() {
        let transport = MockTransport::new();
        push_solutions(
            &transport,
            vec![
                solution("a", "python", "passed", false),
                solution("b", "python", "not_queued", false),
                solution("c", "python", "failed", false),
                solution("d", "bash", "errored", false),
            ],
        );

        let rows = client(&transport).failing_solutions(Some("python")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].uuid, "c");
        assert_eq!(rows[0].track, "python");
    }

    #[tokio::test(start_paused = true)]
    async fn nonpassing_solutions_keeps_not_queued() {
        let transport = MockTransport::new();
        push_solutions(
            &transport,
            vec![
                solution("a", "python", "passed", false),
                solution("b", "python", "not_queued", false),
                solution("c", "awk", "failed", false),
            ],
        );

        let uuids: Vec<_> = client(&transport)
            .nonpassing_solutions()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.uuid)
            .collect();
        assert_eq!(uuids, vec!["b", "c"]);
    }

    #[test]
    fn group_by_status_orders_groups_and_keeps_input_order() {
        let solutions: Vec<Solution> = vec![
            solution("a", "python", "queued", false),
            solution("b", "python", "failed", false),
            solution("c", "jq", "queued", false),
            solution("d", "jq", "errored", false),
        ]
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap())
        .collect();

        let groups = group_by_status(&solutions);
        let statuses: Vec<_> = groups.keys().map(|s| s.as_str()).collect();
        assert_eq!(statuses, vec!["errored", "failed", "queued"]);

        let queued: Vec<_> = groups[&TestsStatus::Queued]
            .iter()
            .map(|s| s.uuid.as_str())
            .collect();
        assert_eq!(queued, vec!["a", "c"]);
    }
}
