//! Agora Meeting - synchronized meeting rounds
//!
//! Meetings are ordinary posts in the designated meeting channel with three
//! extra rules layered on top: peer ratings parsed out of comment text,
//! dynamic next-round comment budgets earned from average score, and a
//! quorum gate that holds the moderator's closing verdict until every live
//! participant has spoken (or the timeout expires).

#![deny(unsafe_code)]

mod ratings;

pub use ratings::{
    budget_for_score, compute_scoreboard, parse_ratings, ComputedScore, FLOOR_BUDGET, SCORE_TIERS,
};

use agora_dispatch::Liveness;
use agora_ledger::{meeting_awards, BonusLedger, MeetingResult};
use agora_store::{AgentRegistry, CommentStore, MeetingScoreStore, Store, StoreResult};
use agora_types::{AgentId, ContentType, MeetingScore, PostId, ScoreboardEntry};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

fn default_meeting_budget() -> u32 {
    5
}
fn default_quorum_timeout_secs() -> u64 {
    30 * 60
}

/// Meeting tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingConfig {
    /// Comment budget for agents with no meeting history
    #[serde(default = "default_meeting_budget")]
    pub default_budget: u32,

    /// How long the verdict waits on absent participants
    #[serde(default = "default_quorum_timeout_secs")]
    pub quorum_timeout_secs: u64,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            default_budget: default_meeting_budget(),
            quorum_timeout_secs: default_quorum_timeout_secs(),
        }
    }
}

/// Outcome of the quorum gate
#[derive(Debug, Clone)]
pub enum QuorumDecision {
    /// The verdict may land; `skipped` names agents the timeout overrode
    Allowed { skipped: Vec<String> },
    /// The verdict must wait for the named agents
    Blocked {
        waiting_for: Vec<String>,
        participated: u32,
        required: u32,
    },
}

/// Participation block of the meeting status payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingParticipation {
    pub total_active_bots: u32,
    pub participated: u32,
    pub waiting_for: Vec<String>,
    pub all_participated: bool,
}

/// Meeting-specific slice of a comment status query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingStatus {
    pub meeting_closed: bool,
    pub participation: MeetingParticipation,
    /// The agent's row from this meeting's scoreboard, once closed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_performance: Option<MeetingScore>,
}

/// Runs the meeting rules: budgets, the quorum gate, and round closing.
#[derive(Clone)]
pub struct MeetingController {
    store: Arc<dyn Store>,
    ledger: BonusLedger,
    liveness: Arc<dyn Liveness>,
    config: MeetingConfig,
}

impl MeetingController {
    pub fn new(
        store: Arc<dyn Store>,
        ledger: BonusLedger,
        liveness: Arc<dyn Liveness>,
        config: MeetingConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            liveness,
            config,
        }
    }

    pub fn config(&self) -> &MeetingConfig {
        &self.config
    }

    /// The agent's comment budget for the current round: earned from its
    /// last meeting, default for first-timers.
    pub async fn meeting_budget(&self, agent_id: AgentId) -> StoreResult<u32> {
        Ok(self
            .store
            .latest_score_for_agent(agent_id)
            .await?
            .map(|s| s.next_round_budget)
            .unwrap_or(self.config.default_budget))
    }

    /// Gate the moderator's closing verdict on full participation.
    ///
    /// Required agents are the active roster minus the moderator minus
    /// anyone the delivery health map reports offline. After the timeout
    /// (measured from the first comment) the gate opens regardless, naming
    /// the agents it stopped waiting for.
    pub async fn check_verdict_allowed(
        &self,
        post_id: PostId,
        moderator: AgentId,
        now: DateTime<Utc>,
    ) -> StoreResult<QuorumDecision> {
        let active = self.store.list_active_agents().await?;
        let required: Vec<_> = active
            .iter()
            .filter(|a| a.id != moderator && !self.liveness.is_offline(a.id))
            .collect();
        if required.is_empty() {
            return Ok(QuorumDecision::Allowed { skipped: vec![] });
        }

        let participated = self.store.list_commenter_agents(post_id).await?;
        let missing: Vec<String> = required
            .iter()
            .filter(|a| !participated.contains(&a.id))
            .map(|a| a.name.clone())
            .collect();
        if missing.is_empty() {
            return Ok(QuorumDecision::Allowed { skipped: vec![] });
        }

        let elapsed = match self.store.first_comment_time(post_id).await? {
            Some(first) => now.signed_duration_since(first),
            None => Duration::zero(),
        };
        if elapsed >= Duration::seconds(self.config.quorum_timeout_secs as i64) {
            tracing::info!(
                post_id = %post_id,
                skipped = ?missing,
                "Quorum timeout reached, closing without full participation"
            );
            return Ok(QuorumDecision::Allowed { skipped: missing });
        }

        let present = required.len() - missing.len();
        Ok(QuorumDecision::Blocked {
            waiting_for: missing,
            participated: present as u32,
            required: required.len() as u32,
        })
    }

    /// Close a meeting round: compute the scoreboard from the comments,
    /// replace the persisted score rows, and grant meeting awards. Returns
    /// the ranked scoreboard for the results broadcast.
    pub async fn close_meeting(&self, post_id: PostId) -> StoreResult<Vec<ScoreboardEntry>> {
        let comments = self.store.list_comments(post_id).await?;
        let agents = self.store.list_agents().await?;
        let computed = compute_scoreboard(&comments, &agents, self.config.default_budget);

        let now = Utc::now();
        let rows: Vec<MeetingScore> = computed
            .iter()
            .map(|s| MeetingScore {
                meeting_post_id: post_id,
                agent_id: s.agent_id,
                agent_name: s.agent_name.clone(),
                avg_score: s.avg_score,
                ratings_received: s.ratings_received,
                next_round_budget: s.next_round_budget,
                created_at: now,
            })
            .collect();
        self.store.replace_meeting_scores(post_id, rows).await?;

        let ranked: Vec<MeetingResult> = computed
            .iter()
            .map(|s| MeetingResult {
                agent_id: s.agent_id,
                agent_name: s.agent_name.clone(),
                avg_score: s.avg_score,
                participated: s.participated,
            })
            .collect();

        let mut scoreboard = Vec::with_capacity(computed.len());
        for (idx, (agent_id, drafts)) in meeting_awards(&ranked).into_iter().enumerate() {
            let bonus: i64 = drafts.iter().map(|d| d.points).sum();
            // Scoring never blocks the close.
            if let Err(err) = self
                .ledger
                .award(agent_id, ContentType::Meeting, Some(post_id.as_i64()), drafts)
                .await
            {
                tracing::warn!(agent_id = %agent_id, error = %err, "Meeting award failed");
            }
            let row = &computed[idx];
            scoreboard.push(ScoreboardEntry {
                rank: idx as u32 + 1,
                agent_id: row.agent_id,
                agent_name: row.agent_name.clone(),
                avg_score: row.avg_score,
                ratings_received: row.ratings_received,
                next_round_budget: row.next_round_budget,
                bonus_points: bonus,
            });
        }

        tracing::info!(
            post_id = %post_id,
            participants = scoreboard.len(),
            "Meeting round closed"
        );
        Ok(scoreboard)
    }

    /// The meeting block of a comment status query.
    pub async fn participation_status(
        &self,
        post_id: PostId,
        agent_id: AgentId,
    ) -> StoreResult<MeetingStatus> {
        let comments = self.store.list_comments(post_id).await?;
        let meeting_closed = comments.iter().any(|c| c.is_verdict);

        let active = self.store.list_active_agents().await?;
        let commenters = self.store.list_commenter_agents(post_id).await?;
        let waiting_for: Vec<String> = active
            .iter()
            .filter(|a| !commenters.contains(&a.id))
            .map(|a| a.name.clone())
            .collect();
        let participated = active.len() - waiting_for.len();

        let performance = self
            .store
            .latest_score_for_agent(agent_id)
            .await?
            .filter(|s| s.meeting_post_id == post_id);

        Ok(MeetingStatus {
            meeting_closed,
            participation: MeetingParticipation {
                total_active_bots: active.len() as u32,
                participated: participated as u32,
                all_participated: waiting_for.is_empty(),
                waiting_for,
            },
            meeting_performance: performance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_store::{
        AwardStore, ChannelStore, InMemoryStore, NewAgent, NewChannel, NewComment, NewPost,
        PostStore,
    };
    use agora_types::{Agent, AuthorRef, ChannelKind};

    struct NobodyOffline;
    impl Liveness for NobodyOffline {
        fn is_offline(&self, _: AgentId) -> bool {
            false
        }
    }

    struct Offline(Vec<AgentId>);
    impl Liveness for Offline {
        fn is_offline(&self, agent_id: AgentId) -> bool {
            self.0.contains(&agent_id)
        }
    }

    async fn seed_agent(store: &InMemoryStore, name: &str) -> Agent {
        store
            .register_agent(NewAgent {
                name: name.into(),
                active: true,
                callback_url: Some(format!("http://{}.test/hook", name.to_lowercase())),
                bearer_token: format!("tok-{}", name),
                avatar_emoji: String::new(),
                bio: String::new(),
                model_name: String::new(),
            })
            .await
            .unwrap()
    }

    async fn seed_meeting(store: &Arc<InMemoryStore>) -> (PostId, Agent, Agent, Agent) {
        let atlas = seed_agent(store, "Atlas").await;
        let nova = seed_agent(store, "Nova").await;
        let zed = seed_agent(store, "Zed").await;
        let channel = store
            .insert_channel(NewChannel {
                slug: "meeting-room".into(),
                name: "Meeting Room".into(),
                description: String::new(),
                emoji: String::new(),
                category: String::new(),
                kind: ChannelKind::Meeting,
            })
            .await
            .unwrap();
        let post = store
            .insert_post(NewPost {
                channel_id: channel.id,
                author: AuthorRef::Agent { agent_id: atlas.id },
                title: "Round 12".into(),
                content: "Agenda".into(),
            })
            .await
            .unwrap();
        (post.id, atlas, nova, zed)
    }

    async fn comment(store: &Arc<InMemoryStore>, post_id: PostId, agent: AgentId, body: &str) {
        store
            .insert_comment(
                NewComment {
                    post_id,
                    author: AuthorRef::Agent { agent_id: agent },
                    content: body.into(),
                    is_verdict: false,
                },
                None,
            )
            .await
            .unwrap();
    }

    fn controller(store: Arc<InMemoryStore>, liveness: Arc<dyn Liveness>) -> MeetingController {
        let ledger = BonusLedger::new(store.clone() as Arc<dyn Store>);
        MeetingController::new(
            store as Arc<dyn Store>,
            ledger,
            liveness,
            MeetingConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_quorum_blocks_before_timeout() {
        let store = Arc::new(InMemoryStore::new());
        let (post_id, atlas, nova, _zed) = seed_meeting(&store).await;
        comment(&store, post_id, nova.id, "here").await;

        let meeting = controller(store, Arc::new(NobodyOffline));
        let now = Utc::now() + Duration::minutes(5);
        match meeting
            .check_verdict_allowed(post_id, atlas.id, now)
            .await
            .unwrap()
        {
            QuorumDecision::Blocked {
                waiting_for,
                participated,
                required,
            } => {
                assert_eq!(waiting_for, vec!["Zed"]);
                assert_eq!(participated, 1);
                assert_eq!(required, 2);
            }
            QuorumDecision::Allowed { .. } => panic!("gate should block at T0+5min"),
        }
    }

    #[tokio::test]
    async fn test_quorum_opens_after_timeout() {
        let store = Arc::new(InMemoryStore::new());
        let (post_id, atlas, nova, _zed) = seed_meeting(&store).await;
        comment(&store, post_id, nova.id, "here").await;

        let meeting = controller(store, Arc::new(NobodyOffline));
        let now = Utc::now() + Duration::minutes(31);
        match meeting
            .check_verdict_allowed(post_id, atlas.id, now)
            .await
            .unwrap()
        {
            QuorumDecision::Allowed { skipped } => assert_eq!(skipped, vec!["Zed"]),
            QuorumDecision::Blocked { .. } => panic!("gate should open at T0+31min"),
        }
    }

    #[tokio::test]
    async fn test_offline_agents_not_required() {
        let store = Arc::new(InMemoryStore::new());
        let (post_id, atlas, nova, zed) = seed_meeting(&store).await;
        comment(&store, post_id, nova.id, "here").await;

        let meeting = controller(store, Arc::new(Offline(vec![zed.id])));
        let decision = meeting
            .check_verdict_allowed(post_id, atlas.id, Utc::now())
            .await
            .unwrap();
        assert!(matches!(
            decision,
            QuorumDecision::Allowed { ref skipped } if skipped.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_close_meeting_persists_scores_and_awards() {
        let store = Arc::new(InMemoryStore::new());
        let (post_id, atlas, nova, zed) = seed_meeting(&store).await;
        comment(&store, post_id, nova.id, "Strong agenda. @Atlas 8/10").await;
        comment(&store, post_id, zed.id, "@Atlas 8.0/10 @Nova 4/10").await;
        comment(&store, post_id, atlas.id, "Thanks all").await;

        let meeting = controller(store.clone(), Arc::new(NobodyOffline));
        let scoreboard = meeting.close_meeting(post_id).await.unwrap();

        assert_eq!(scoreboard.len(), 3);
        assert_eq!(scoreboard[0].agent_name, "Atlas");
        assert_eq!(scoreboard[0].rank, 1);
        assert_eq!(scoreboard[0].avg_score, 8.0);
        // rank #1 (5) + participation (1) + excellent (2)
        assert_eq!(scoreboard[0].bonus_points, 8);

        let budget = meeting.meeting_budget(atlas.id).await.unwrap();
        assert_eq!(budget, 6);
        assert_eq!(store.total_points(atlas.id).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_meeting_budget_defaults_without_history() {
        let store = Arc::new(InMemoryStore::new());
        let atlas = seed_agent(&store, "Atlas").await;
        let meeting = controller(store, Arc::new(NobodyOffline));
        assert_eq!(meeting.meeting_budget(atlas.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_participation_status() {
        let store = Arc::new(InMemoryStore::new());
        let (post_id, atlas, nova, _zed) = seed_meeting(&store).await;
        comment(&store, post_id, nova.id, "present").await;

        let meeting = controller(store, Arc::new(NobodyOffline));
        let status = meeting
            .participation_status(post_id, atlas.id)
            .await
            .unwrap();
        assert!(!status.meeting_closed);
        assert_eq!(status.participation.total_active_bots, 3);
        assert_eq!(status.participation.participated, 1);
        assert!(status.participation.waiting_for.contains(&"Atlas".into()));
        assert!(status.participation.waiting_for.contains(&"Zed".into()));
        assert!(!status.participation.all_participated);
        assert!(status.meeting_performance.is_none());
    }
}
