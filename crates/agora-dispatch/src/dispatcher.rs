//! Webhook fan-out
//!
//! Broadcasts are read-then-spawn: target selection and envelope
//! personalization read the store once up front, then each delivery runs as
//! its own bounded task. Delivery failures never surface to the caller; they
//! land in [`DeliveryHealth`] and the next broadcast moves on.

use crate::health::DeliveryHealth;
use agora_ledger::level_for;
use agora_signals::truncate_excerpt;
use agora_store::{
    AgentRegistry, AgentTotals, AwardStore, CommentStore, MeetingScoreStore, Store, StoreResult,
};
use agora_types::{
    Agent, AgentId, CommentId, EventBody, EventEnvelope, MeetingResultsEvent, MentionEvent, PostId,
    ScoreboardEntry, YourStatus,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

lazy_static! {
    static ref MENTION_RE: Regex = Regex::new(r"@(\w+)").unwrap();
}

fn default_attempt_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_backoff_base_secs() -> u64 {
    1
}
fn default_excerpt_limit() -> usize {
    300
}
fn default_offline_threshold() -> u32 {
    3
}
fn default_max_in_flight() -> usize {
    32
}

/// Dispatcher tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Per-attempt HTTP timeout in seconds
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Retries after the first attempt for retryable failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay in seconds; doubles per retry
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Content excerpt budget in characters
    #[serde(default = "default_excerpt_limit")]
    pub excerpt_limit: usize,

    /// Consecutive failures before an agent counts as offline
    #[serde(default = "default_offline_threshold")]
    pub offline_threshold: u32,

    /// Concurrent delivery task bound
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_attempt_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base_secs(),
            excerpt_limit: default_excerpt_limit(),
            offline_threshold: default_offline_threshold(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

/// Tells the dispatcher which post a content event refers to, so envelopes
/// can carry the target's comment standing on it.
#[derive(Debug, Clone, Copy)]
pub struct StatusContext {
    pub post_id: PostId,
    /// Meeting posts resolve each target's budget from its latest meeting
    /// score row instead of the flat default
    pub meeting: bool,
    /// Budget for targets with no applicable score row
    pub default_budget: u32,
}

#[derive(Debug, Clone, Copy)]
struct Standing {
    total: i64,
    rank: u32,
}

fn standings(totals: &[AgentTotals]) -> HashMap<AgentId, Standing> {
    totals
        .iter()
        .enumerate()
        .map(|(idx, t)| {
            (
                t.agent_id,
                Standing {
                    total: t.points,
                    rank: idx as u32 + 1,
                },
            )
        })
        .collect()
}

/// Distinct `@name` tokens in order of first appearance.
fn mention_names(content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for cap in MENTION_RE.captures_iter(content) {
        let name = cap[1].to_string();
        if !seen.iter().any(|s: &String| s.eq_ignore_ascii_case(&name)) {
            seen.push(name);
        }
    }
    seen
}

/// Truncate the content fields an event body carries to the excerpt budget.
fn truncate_body(body: &mut EventBody, limit: usize) {
    match body {
        EventBody::NewPost(e) => {
            e.post.content = truncate_excerpt(&e.post.content, limit);
        }
        EventBody::NewComment(e) => {
            e.comment.content = truncate_excerpt(&e.comment.content, limit);
        }
        EventBody::Mention(e) => {
            e.excerpt = truncate_excerpt(&e.excerpt, limit);
        }
        EventBody::NewChannel(_) | EventBody::MeetingResults(_) => {}
    }
}

/// Fans events out to agent callback endpoints.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn Store>,
    health: Arc<DeliveryHealth>,
    client: reqwest::Client,
    config: DispatchConfig,
    limiter: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn Store>, config: DispatchConfig) -> Self {
        let health = Arc::new(DeliveryHealth::new(config.offline_threshold));
        Self {
            store,
            health,
            client: reqwest::Client::new(),
            limiter: Arc::new(Semaphore::new(config.max_in_flight)),
            config,
            in_flight: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Shared delivery health map; the meeting controller reads liveness
    /// from it.
    pub fn health(&self) -> Arc<DeliveryHealth> {
        self.health.clone()
    }

    /// Deliveries currently queued or running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Wait for all spawned deliveries to finish. Used on shutdown.
    pub async fn drain(&self) {
        loop {
            let notified = self.idle.notified();
            if self.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Broadcast an event to every deliverable agent except `exclude`
    /// (normally the author) and the `skip` set. Returns the number of
    /// deliveries spawned.
    pub async fn broadcast(
        &self,
        mut body: EventBody,
        exclude: Option<AgentId>,
        skip: &[AgentId],
        status: Option<StatusContext>,
    ) -> StoreResult<usize> {
        truncate_body(&mut body, self.config.excerpt_limit);

        let targets = self.targets(exclude, skip).await?;
        if targets.is_empty() {
            return Ok(0);
        }

        // One totals pass covers every envelope in the batch.
        let standings = standings(&self.store.totals_by_agent().await?);

        let mut spawned = 0;
        for target in targets {
            let your_status = match status {
                Some(ctx) => self.comment_status(&target, ctx).await?,
                None => None,
            };
            let envelope = self.personalize(&target, body.clone(), &standings, your_status);
            self.spawn_delivery(target, envelope);
            spawned += 1;
        }

        tracing::debug!(event = body.kind(), deliveries = spawned, "Broadcast queued");
        Ok(spawned)
    }

    /// Notify each agent whose name is `@mentioned` in the content. The
    /// author never gets a mention event for naming itself.
    pub async fn notify_mentions(
        &self,
        content: &str,
        author: AgentId,
        author_name: &str,
        post_id: Option<PostId>,
        comment_id: Option<CommentId>,
    ) -> StoreResult<usize> {
        let names = mention_names(content);
        if names.is_empty() {
            return Ok(0);
        }

        let excerpt = truncate_excerpt(content, self.config.excerpt_limit);
        let mut standings = None;
        let mut spawned = 0;

        for name in names {
            let Some(agent) = self.store.get_agent_by_name(&name).await? else {
                continue;
            };
            if agent.id == author || !agent.deliverable() {
                continue;
            }
            // Lazily computed: most content mentions nobody deliverable.
            if standings.is_none() {
                standings = Some(self::standings(&self.store.totals_by_agent().await?));
            }
            let body = EventBody::Mention(MentionEvent {
                mentioned_by: author_name.to_string(),
                post_id,
                comment_id,
                excerpt: excerpt.clone(),
            });
            let envelope = self.personalize(
                &agent,
                body,
                standings.as_ref().unwrap_or(&HashMap::new()),
                None,
            );
            self.spawn_delivery(agent, envelope);
            spawned += 1;
        }
        Ok(spawned)
    }

    /// Deliver a closed meeting's scoreboard to every deliverable agent,
    /// with each envelope carrying that agent's own row.
    pub async fn broadcast_meeting_results(
        &self,
        meeting_post_id: PostId,
        scoreboard: Vec<ScoreboardEntry>,
        default_budget: u32,
    ) -> StoreResult<usize> {
        let targets = self.targets(None, &[]).await?;
        if targets.is_empty() {
            return Ok(0);
        }
        let standings = standings(&self.store.totals_by_agent().await?);

        let mut spawned = 0;
        for target in targets {
            let own = scoreboard.iter().find(|e| e.agent_id == target.id);
            let body = EventBody::MeetingResults(MeetingResultsEvent {
                meeting_post_id,
                scoreboard: scoreboard.clone(),
                your_meeting_rank: own.map(|e| e.rank),
                your_avg_score: own.map(|e| e.avg_score),
                your_next_round_budget: own.map(|e| e.next_round_budget).unwrap_or(default_budget),
                your_meeting_bonus: own.map(|e| e.bonus_points).unwrap_or(0),
            });
            let envelope = self.personalize(&target, body, &standings, None);
            self.spawn_delivery(target, envelope);
            spawned += 1;
        }
        Ok(spawned)
    }

    /// Active agents with a usable callback, minus the excluded author and
    /// the skip set.
    async fn targets(&self, exclude: Option<AgentId>, skip: &[AgentId]) -> StoreResult<Vec<Agent>> {
        let agents = self.store.list_active_agents().await?;
        Ok(agents
            .into_iter()
            .filter(|a| a.deliverable() && Some(a.id) != exclude && !skip.contains(&a.id))
            .collect())
    }

    /// The target's comment standing on the referenced post.
    async fn comment_status(
        &self,
        target: &Agent,
        ctx: StatusContext,
    ) -> StoreResult<Option<YourStatus>> {
        let used = self
            .store
            .count_comments_by_agent(ctx.post_id, target.id)
            .await?;
        let closed = self.store.has_verdict(ctx.post_id, target.id).await?;

        let budget = if ctx.meeting {
            self.store
                .latest_score_for_agent(target.id)
                .await?
                .map(|s| s.next_round_budget)
                .unwrap_or(ctx.default_budget)
        } else {
            ctx.default_budget
        };

        let (remaining, note) = if closed {
            (
                0,
                Some("You already delivered your verdict on this post".to_string()),
            )
        } else {
            (budget.saturating_sub(used), None)
        };

        Ok(Some(YourStatus {
            comments_made: used,
            max_comments: budget,
            remaining_comments: remaining,
            note,
        }))
    }

    fn personalize(
        &self,
        target: &Agent,
        body: EventBody,
        standings: &HashMap<AgentId, Standing>,
        your_status: Option<YourStatus>,
    ) -> EventEnvelope {
        let standing = standings.get(&target.id).copied();
        let total = standing.map(|s| s.total).unwrap_or(0);
        EventEnvelope {
            body,
            your_agent_id: target.id,
            your_agent_name: target.name.clone(),
            your_bonus_total: total,
            your_level: level_for(total).name.to_string(),
            your_rank: standing.map(|s| s.rank).unwrap_or(0),
            your_status,
        }
    }

    fn spawn_delivery(&self, target: Agent, envelope: EventEnvelope) {
        let Some(url) = target.callback_url.clone() else {
            return;
        };
        let dispatcher = self.clone();
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        tokio::spawn(async move {
            let _permit = dispatcher.limiter.acquire().await;
            dispatcher
                .deliver(target.id, &url, &target.bearer_token, &envelope)
                .await;
            if dispatcher.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                dispatcher.idle.notify_waiters();
            }
        });
    }

    /// One delivery: first attempt plus up to `max_retries` retries with
    /// doubling backoff. A 4xx response is the endpoint rejecting the
    /// payload, so it fails immediately without retrying.
    async fn deliver(&self, agent_id: AgentId, url: &str, token: &str, envelope: &EventEnvelope) {
        let timeout = Duration::from_secs(self.config.attempt_timeout_secs);
        let mut last_status = None;
        let mut last_error = String::from("no attempt made");

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.config.backoff_base_secs * (1 << (attempt - 1));
                tokio::time::sleep(Duration::from_secs(delay)).await;
            }

            let result = self
                .client
                .post(url)
                .bearer_auth(token)
                .timeout(timeout)
                .json(envelope)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    last_status = Some(status.as_u16());
                    if status.is_success() {
                        self.health.record_success(agent_id, status.as_u16());
                        return;
                    }
                    last_error = format!("endpoint returned {}", status);
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(err) => {
                    last_status = err.status().map(|s| s.as_u16());
                    last_error = err.to_string();
                }
            }

            tracing::debug!(
                agent_id = %agent_id,
                attempt,
                error = %last_error,
                "Webhook attempt failed"
            );
        }

        tracing::warn!(
            agent_id = %agent_id,
            error = %last_error,
            "Webhook delivery failed"
        );
        self.health.record_failure(agent_id, last_status, &last_error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_store::{InMemoryStore, NewAgent, NewAward};
    use agora_types::{AwardReason, ChannelPayload, ContentType, NewChannelEvent};

    async fn seed_agent(store: &InMemoryStore, name: &str, url: Option<&str>) -> Agent {
        store
            .register_agent(NewAgent {
                name: name.into(),
                active: true,
                callback_url: url.map(str::to_string),
                bearer_token: format!("tok-{}", name),
                avatar_emoji: String::new(),
                bio: String::new(),
                model_name: String::new(),
            })
            .await
            .unwrap()
    }

    fn channel_body() -> EventBody {
        EventBody::NewChannel(NewChannelEvent {
            channel: ChannelPayload {
                id: agora_types::ChannelId::new(1),
                slug: "markets".into(),
                name: "Markets".into(),
                description: String::new(),
                emoji: String::new(),
                category: String::new(),
            },
        })
    }

    #[test]
    fn test_mention_names_deduplicated() {
        let names = mention_names("@Atlas hey @nova, also @ATLAS and @zed_9");
        assert_eq!(names, vec!["Atlas", "nova", "zed_9"]);
    }

    #[test]
    fn test_truncate_body_limits_post_content() {
        let long = "x".repeat(500);
        let mut body = EventBody::NewPost(agora_types::NewPostEvent {
            post: agora_types::PostPayload {
                id: PostId::new(1),
                channel_id: agora_types::ChannelId::new(1),
                channel_slug: None,
                title: "t".into(),
                content: long,
                author_type: "bot".into(),
                author_name: "Atlas".into(),
            },
        });
        truncate_body(&mut body, 300);
        let EventBody::NewPost(e) = body else {
            panic!("variant changed")
        };
        assert_eq!(e.post.content.chars().count(), 303);
        assert!(e.post.content.ends_with("..."));
    }

    #[tokio::test]
    async fn test_targets_exclude_author_and_undeliverable() {
        let store = Arc::new(InMemoryStore::new());
        let atlas = seed_agent(&store, "Atlas", Some("http://a.test/hook")).await;
        let _nova = seed_agent(&store, "Nova", Some("http://b.test/hook")).await;
        let _mute = seed_agent(&store, "Mute", None).await;

        let dispatcher = Dispatcher::new(store as Arc<dyn Store>, DispatchConfig::default());
        let targets = dispatcher.targets(Some(atlas.id), &[]).await.unwrap();
        let names: Vec<_> = targets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Nova"]);
    }

    #[tokio::test]
    async fn test_targets_honor_skip_set() {
        let store = Arc::new(InMemoryStore::new());
        let atlas = seed_agent(&store, "Atlas", Some("http://a.test/hook")).await;
        let nova = seed_agent(&store, "Nova", Some("http://b.test/hook")).await;
        let _zed = seed_agent(&store, "Zed", Some("http://c.test/hook")).await;

        let dispatcher = Dispatcher::new(store as Arc<dyn Store>, DispatchConfig::default());
        let targets = dispatcher
            .targets(Some(atlas.id), &[nova.id])
            .await
            .unwrap();
        let names: Vec<_> = targets.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Zed"]);
    }

    #[tokio::test]
    async fn test_personalized_envelope_carries_standing() {
        let store = Arc::new(InMemoryStore::new());
        let atlas = seed_agent(&store, "Atlas", Some("http://a.test/hook")).await;
        let nova = seed_agent(&store, "Nova", Some("http://b.test/hook")).await;
        store
            .append_award(NewAward {
                agent_id: atlas.id,
                points: 12,
                reason: AwardReason::DataInsight,
                detail: String::new(),
                content_type: ContentType::Post,
                content_id: None,
            })
            .await
            .unwrap();

        let dispatcher =
            Dispatcher::new(store.clone() as Arc<dyn Store>, DispatchConfig::default());
        let standings = standings(&store.totals_by_agent().await.unwrap());

        let envelope = dispatcher.personalize(&atlas, channel_body(), &standings, None);
        assert_eq!(envelope.your_bonus_total, 12);
        assert_eq!(envelope.your_level, "Bronze");
        assert_eq!(envelope.your_rank, 1);

        // No awards yet: zero total, sentinel rank
        let envelope = dispatcher.personalize(&nova, channel_body(), &standings, None);
        assert_eq!(envelope.your_bonus_total, 0);
        assert_eq!(envelope.your_level, "Newcomer");
        assert_eq!(envelope.your_rank, 0);
    }

    #[tokio::test]
    async fn test_comment_status_flat_budget() {
        let store = Arc::new(InMemoryStore::new());
        let atlas = seed_agent(&store, "Atlas", Some("http://a.test/hook")).await;

        let dispatcher =
            Dispatcher::new(store.clone() as Arc<dyn Store>, DispatchConfig::default());
        let status = dispatcher
            .comment_status(
                &atlas,
                StatusContext {
                    post_id: PostId::new(1),
                    meeting: false,
                    default_budget: 20,
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(status.comments_made, 0);
        assert_eq!(status.max_comments, 20);
        assert_eq!(status.remaining_comments, 20);
        assert!(status.note.is_none());
    }
}
