//! Stale mentoring discussions: discovery, finish/nudge classification and
//! the actions taken on each group.
//!
//! Discovery keeps a discussion only when both its own `updated_at` and its
//! most recent post are older than the cutoff. The top-level timestamp can
//! lag behind post activity, so neither check alone is enough.
//!
//! Classification looks at the point where the conversation last changed
//! hands: the later of the first mentor post and the last student post. If
//! that point is very old and many posts pile up at or after it, the
//! discussion is considered abandoned and finished; otherwise the student
//! gets a reminder.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::client::MentorClient;
use crate::error::Result;
use crate::pagination::Query;
use crate::types::{Discussion, DiscussionOrder, DiscussionStatus, Post, PostsResponse};

/// Reminder posted to discussions that are stale but not abandoned.
pub const NUDGE_MESSAGE: &str = "It's been a while! \
How is this exercise going? Are you planning on making more changes? \
If you are ready to move on, you can free up the mentoring slot by clicking \"End discussion\". \
If you are still working on this, that is great, too! \
If you have any questions or want any help or tips, just let me know!";

/// Thresholds deciding when a stale discussion is finished outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishRule {
    /// Whole days the reference point must be older than.
    pub min_age_days: i64,
    /// Posts at or after the reference point must exceed this.
    pub min_posts: usize,
}

impl Default for FinishRule {
    fn default() -> Self {
        Self {
            min_age_days: 300,
            min_posts: 5,
        }
    }
}

/// What to do with a stale discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Finish,
    Nudge,
}

/// Stale discussions split by verdict, each list in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub to_finish: Vec<String>,
    pub to_nudge: Vec<String>,
}

impl Partition {
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_finish.len() + self.to_nudge.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Latest `updated_at` over all posts.
#[must_use]
pub fn most_recent_post(posts: &[Post]) -> Option<DateTime<Utc>> {
    posts.iter().map(|p| p.updated_at).max()
}

/// The later of the first mentor post and the last student post.
///
/// With no student post the first mentor post is used. Returns `None` when
/// the mentor never posted.
#[must_use]
pub fn reference_time(posts: &[Post]) -> Option<DateTime<Utc>> {
    let first_mentor = posts
        .iter()
        .filter(|p| !p.by_student)
        .map(|p| p.updated_at)
        .min()?;
    let last_student = posts
        .iter()
        .filter(|p| p.by_student)
        .map(|p| p.updated_at)
        .max()
        .unwrap_or(first_mentor);
    Some(first_mentor.max(last_student))
}

/// Decide between finishing and nudging a stale discussion.
///
/// A discussion without mentor posts has no reference point and is nudged.
#[must_use]
pub fn classify(posts: &[Post], now: DateTime<Utc>, rule: &FinishRule) -> Verdict {
    let Some(reference) = reference_time(posts) else {
        tracing::debug!("No mentor posts, defaulting to nudge");
        return Verdict::Nudge;
    };

    let posts_since = posts.iter().filter(|p| p.updated_at >= reference).count();
    let age_days = (now - reference).num_days();

    if age_days > rule.min_age_days && posts_since > rule.min_posts {
        Verdict::Finish
    } else {
        Verdict::Nudge
    }
}

impl MentorClient {
    /// All posts of one discussion, in server order.
    pub async fn discussion_posts(&self, uuid: &str) -> Result<Vec<Post>> {
        let endpoint = format!("mentoring/discussions/{uuid}/posts");
        let response: PostsResponse = self.get_json(&endpoint, &Query::new()).await?;
        Ok(response.items)
    }

    /// Every discussion with `status`, in the requested order.
    pub async fn discussions(
        &self,
        status: DiscussionStatus,
        order: DiscussionOrder,
    ) -> Result<Vec<Discussion>> {
        let query = Query::new()
            .with("status", status.as_str())
            .with("order", order.as_str());
        self.get_all_pages("mentoring/discussions", &query).await
    }

    /// UUIDs of discussions with no activity in the last `age_days` days.
    pub async fn find_stale(
        &self,
        status: DiscussionStatus,
        age_days: u32,
        order: DiscussionOrder,
    ) -> Result<Vec<String>> {
        self.find_stale_at(Utc::now(), status, age_days, order).await
    }

    /// [`MentorClient::find_stale`] relative to `now`.
    pub async fn find_stale_at(
        &self,
        now: DateTime<Utc>,
        status: DiscussionStatus,
        age_days: u32,
        order: DiscussionOrder,
    ) -> Result<Vec<String>> {
        // Ages past the representable range mean nothing can be that old.
        let cutoff = now
            .checked_sub_signed(Duration::days(i64::from(age_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let discussions = self.discussions(status, order).await?;
        tracing::info!(
            status = %status,
            total = discussions.len(),
            age_days,
            "Checking discussions for staleness"
        );

        let mut stale = Vec::new();
        for discussion in discussions {
            if discussion.updated_at > cutoff {
                continue;
            }

            let posts = self.discussion_posts(&discussion.uuid).await?;
            if most_recent_post(&posts).is_some_and(|latest| latest > cutoff) {
                continue;
            }

            stale.push(discussion.uuid);
        }

        tracing::info!(stale = stale.len(), "Found stale discussions");
        Ok(stale)
    }

    /// Split stale discussions into those to finish and those to nudge.
    pub async fn partition(&self, uuids: &[String]) -> Result<Partition> {
        self.partition_at(uuids, Utc::now(), &FinishRule::default())
            .await
    }

    /// [`MentorClient::partition`] relative to `now` with explicit thresholds.
    pub async fn partition_at(
        &self,
        uuids: &[String],
        now: DateTime<Utc>,
        rule: &FinishRule,
    ) -> Result<Partition> {
        let mut partition = Partition::default();
        for uuid in uuids {
            let posts = self.discussion_posts(uuid).await?;
            match classify(&posts, now, rule) {
                Verdict::Finish => partition.to_finish.push(uuid.clone()),
                Verdict::Nudge => partition.to_nudge.push(uuid.clone()),
            }
        }

        tracing::info!(
            finish = partition.to_finish.len(),
            nudge = partition.to_nudge.len(),
            "Classified stale discussions"
        );
        Ok(partition)
    }

    /// Mark each discussion as finished.
    pub async fn finish_discussions(&self, uuids: &[String]) -> Result<()> {
        for uuid in uuids {
            let endpoint = format!("mentoring/discussions/{uuid}/finish");
            self.patch(&endpoint, self.config().finish_pacing).await?;
            tracing::info!(discussion = %uuid, "Finished discussion");
        }
        Ok(())
    }

    /// Post a reminder to each discussion. An empty or missing message uses
    /// [`NUDGE_MESSAGE`].
    pub async fn nudge_discussions(&self, uuids: &[String], message: Option<&str>) -> Result<()> {
        let content = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(NUDGE_MESSAGE);
        let body = serde_json::json!({ "content": content });

        for uuid in uuids {
            let endpoint = format!("mentoring/discussions/{uuid}/posts");
            self.post_json(&endpoint, &body).await?;
            tracing::info!(discussion = %uuid, "Nudged discussion");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use serde_json::json;

    use crate::client::ClientConfig;
    use crate::http::{HttpMethod, MockTransport};

    use super::*;

    const BASE: &str = "https://api.test/v2";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        now() - Duration::days(days)
    }

    fn post(at: DateTime<Utc>, by_student: bool) -> Post {
        Post {
            updated_at: at,
            by_student,
        }
    }

    /// One mentor post at `age` days followed by `extra` posts at the same
    /// instant.
    fn cluster(age: i64, extra: usize) -> Vec<Post> {
        let at = days_ago(age);
        let mut posts = vec![post(days_ago(age + 30), true), post(at, false)];
        posts.extend((0..extra).map(|i| post(at, i % 2 == 0)));
        posts
    }

    #[test]
    fn old_reference_with_six_posts_finishes() {
        let posts = cluster(400, 5);
        assert_eq!(reference_time(&posts), Some(days_ago(400)));
        assert_eq!(classify(&posts, now(), &FinishRule::default()), Verdict::Finish);
    }

    #[test]
    fn old_reference_with_three_posts_nudges() {
        let posts = cluster(400, 2);
        assert_eq!(classify(&posts, now(), &FinishRule::default()), Verdict::Nudge);
    }

    #[test]
    fn recent_reference_nudges_regardless_of_post_count() {
        let posts = cluster(10, 40);
        assert_eq!(classify(&posts, now(), &FinishRule::default()), Verdict::Nudge);
    }

    #[test]
    fn exactly_three_hundred_days_is_not_old_enough() {
        let posts = cluster(300, 10);
        assert_eq!(classify(&posts, now(), &FinishRule::default()), Verdict::Nudge);

        let posts = cluster(301, 10);
        assert_eq!(classify(&posts, now(), &FinishRule::default()), Verdict::Finish);
    }

    #[test]
    fn no_mentor_posts_nudges() {
        let posts = vec![post(days_ago(900), true); 10];
        assert_eq!(reference_time(&posts), None);
        assert_eq!(classify(&posts, now(), &FinishRule::default()), Verdict::Nudge);
        assert_eq!(classify(&[], now(), &FinishRule::default()), Verdict::Nudge);
    }

    #[test]
    fn reference_defaults_to_first_mentor_post_without_students() {
        let posts = vec![
            post(days_ago(500), false),
            post(days_ago(600), false),
            post(days_ago(450), false),
        ];
        assert_eq!(reference_time(&posts), Some(days_ago(600)));
    }

    #[test]
    fn reference_uses_later_of_first_mentor_and_last_student() {
        let posts = vec![
            post(days_ago(700), true),
            post(days_ago(650), false),
            post(days_ago(500), true),
            post(days_ago(400), false),
        ];
        assert_eq!(reference_time(&posts), Some(days_ago(500)));
    }

    #[test]
    fn custom_rule_thresholds_apply() {
        let rule = FinishRule {
            min_age_days: 5,
            min_posts: 1,
        };
        assert_eq!(classify(&cluster(10, 1), now(), &rule), Verdict::Finish);
        assert_eq!(classify(&cluster(10, 0), now(), &rule), Verdict::Nudge);
    }

    #[test]
    fn most_recent_post_of_empty_is_none() {
        assert_eq!(most_recent_post(&[]), None);
        let posts = vec![post(days_ago(3), true), post(days_ago(1), false)];
        assert_eq!(most_recent_post(&posts), Some(days_ago(1)));
    }

    fn client(transport: &MockTransport) -> MentorClient {
        let config = ClientConfig::new("t").with_base_url(BASE).without_pacing();
        MentorClient::with_transport(config, Arc::new(transport.clone())).unwrap()
    }

    fn ts(at: DateTime<Utc>) -> String {
        at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    fn push_posts(transport: &MockTransport, uuid: &str, posts: &[Post]) {
        let items: Vec<_> = posts
            .iter()
            .map(|p| json!({"updated_at": ts(p.updated_at), "by_student": p.by_student}))
            .collect();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/mentoring/discussions/{uuid}/posts"),
            json!({"items": items}),
        );
    }

    #[tokio::test(start_paused = true)]
    async fn find_stale_requires_both_timestamps_to_be_old() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/mentoring/discussions?status=awaiting_student&order=oldest&page=1"),
            json!({
                "results": [
                    {"uuid": "fresh", "status": "awaiting_student", "updated_at": ts(days_ago(2))},
                    {"uuid": "lagging", "status": "awaiting_student", "updated_at": ts(days_ago(90))},
                    {"uuid": "stale", "status": "awaiting_student", "updated_at": ts(days_ago(90))},
                    {"uuid": "empty", "status": "awaiting_student", "updated_at": ts(days_ago(90))}
                ],
                "meta": {"current_page": 1, "total_pages": 1}
            }),
        );
        push_posts(&transport, "lagging", &[post(days_ago(100), false), post(days_ago(5), true)]);
        push_posts(&transport, "stale", &[post(days_ago(100), false), post(days_ago(60), true)]);
        push_posts(&transport, "empty", &[]);

        let stale = client(&transport)
            .find_stale_at(now(), DiscussionStatus::AwaitingStudent, 30, DiscussionOrder::Oldest)
            .await
            .unwrap();

        assert_eq!(stale, vec!["stale", "empty"]);
        assert!(!transport.urls().iter().any(|u| u.contains("/fresh/")));
    }

    #[tokio::test(start_paused = true)]
    async fn find_stale_with_out_of_range_age_finds_nothing() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            format!("{BASE}/mentoring/discussions?status=awaiting_student&order=oldest&page=1"),
            json!({
                "results": [
                    {"uuid": "ancient", "status": "awaiting_student", "updated_at": ts(days_ago(9000))}
                ],
                "meta": {"current_page": 1, "total_pages": 1}
            }),
        );

        let stale = client(&transport)
            .find_stale(DiscussionStatus::AwaitingStudent, u32::MAX, DiscussionOrder::Oldest)
            .await
            .unwrap();

        assert!(stale.is_empty());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn partition_refetches_posts_and_splits() {
        let transport = MockTransport::new();
        push_posts(&transport, "old", &cluster(400, 5));
        push_posts(&transport, "chatty", &cluster(400, 2));
        push_posts(&transport, "mute", &[post(days_ago(500), true)]);

        let uuids = vec!["old".to_string(), "chatty".to_string(), "mute".to_string()];
        let partition = client(&transport)
            .partition_at(&uuids, now(), &FinishRule::default())
            .await
            .unwrap();

        assert_eq!(partition.to_finish, vec!["old"]);
        assert_eq!(partition.to_nudge, vec!["chatty", "mute"]);
        assert_eq!(partition.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn finish_and_nudge_issue_mutations() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Patch,
            format!("{BASE}/mentoring/discussions/d1/finish"),
            json!({}),
        );
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/mentoring/discussions/d2/posts"),
            json!({}),
        );
        transport.push_json(
            HttpMethod::Post,
            format!("{BASE}/mentoring/discussions/d3/posts"),
            json!({}),
        );
        let client = client(&transport);

        client.finish_discussions(&["d1".to_string()]).await.unwrap();
        client
            .nudge_discussions(&["d2".to_string()], Some("ping?"))
            .await
            .unwrap();
        client
            .nudge_discussions(&["d3".to_string()], Some("  "))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method, HttpMethod::Patch);
        let custom: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(custom, json!({"content": "ping?"}));
        let stock: serde_json::Value = serde_json::from_slice(&requests[2].body).unwrap();
        assert_eq!(stock["content"], NUDGE_MESSAGE);
    }
}
