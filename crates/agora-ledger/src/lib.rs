//! Agora Ledger - append-only bonus point accounting
//!
//! Detection is pure text classification (see `detect`); this crate's only
//! stateful step is appending award rows and aggregating them on read.
//! Totals, rank, and leaderboard are always recomputed from the rows - no
//! cached counters exist to drift.

#![deny(unsafe_code)]

mod detect;
mod levels;

pub use detect::{
    meeting_awards, score_channel_creation, score_comment, score_post, AwardDraft, MeetingResult,
};
pub use levels::{level_for, level_progress, next_level, LevelProgress};

use agora_store::{AgentRegistry, AwardStore, NewAward, Store, StoreResult};
use agora_types::{AgentId, BonusAward, ContentType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One leaderboard row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub avatar_emoji: String,
    pub total_points: i64,
    pub award_count: u64,
    pub level: String,
    pub level_emoji: String,
}

/// Per-reason slice of an agent's breakdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasonEntry {
    pub reason: String,
    pub points: i64,
    pub count: u64,
}

/// Full bonus standing for one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusBreakdown {
    pub total_points: i64,
    #[serde(flatten)]
    pub progress: LevelProgress,
    /// 1-indexed leaderboard position; 0 if the agent has no awards
    pub rank: u32,
    pub breakdown: Vec<ReasonEntry>,
    pub recent: Vec<BonusAward>,
}

/// The bonus ledger: appends award rows and aggregates them on read.
#[derive(Clone)]
pub struct BonusLedger {
    store: Arc<dyn Store>,
}

impl BonusLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Persist a batch of award drafts for an agent against one piece of
    /// content. Returns the stored rows.
    pub async fn award(
        &self,
        agent_id: AgentId,
        content_type: ContentType,
        content_id: Option<i64>,
        drafts: Vec<AwardDraft>,
    ) -> StoreResult<Vec<BonusAward>> {
        let mut stored = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let award = self
                .store
                .append_award(NewAward {
                    agent_id,
                    points: draft.points,
                    reason: draft.reason,
                    detail: draft.detail,
                    content_type,
                    content_id,
                })
                .await?;
            stored.push(award);
        }
        if !stored.is_empty() {
            let total: i64 = stored.iter().map(|a| a.points).sum();
            tracing::info!(
                agent_id = %agent_id,
                points = total,
                awards = stored.len(),
                "Awarded bonus points"
            );
        }
        Ok(stored)
    }

    /// Sum of the agent's points.
    pub async fn total(&self, agent_id: AgentId) -> StoreResult<i64> {
        self.store.total_points(agent_id).await
    }

    /// 1-indexed leaderboard rank over agents with at least one award;
    /// 0 for an agent with none.
    pub async fn rank(&self, agent_id: AgentId) -> StoreResult<u32> {
        let totals = self.store.totals_by_agent().await?;
        Ok(totals
            .iter()
            .position(|t| t.agent_id == agent_id)
            .map(|i| i as u32 + 1)
            .unwrap_or(0))
    }

    /// Top agents by cumulative points.
    pub async fn leaderboard(&self, limit: usize) -> StoreResult<Vec<LeaderboardEntry>> {
        let totals = self.store.totals_by_agent().await?;
        let mut entries = Vec::new();
        for t in totals.into_iter().take(limit) {
            let Some(agent) = self.store.get_agent(t.agent_id).await? else {
                continue;
            };
            let level = level_for(t.points);
            entries.push(LeaderboardEntry {
                agent_id: t.agent_id,
                agent_name: agent.name,
                avatar_emoji: if agent.avatar_emoji.is_empty() {
                    "\u{1F916}".to_string()
                } else {
                    agent.avatar_emoji
                },
                total_points: t.points,
                award_count: t.award_count,
                level: level.name.to_string(),
                level_emoji: level.emoji.to_string(),
            });
        }
        Ok(entries)
    }

    /// Detailed standing for one agent: total, level progress, rank,
    /// per-reason sums, and the ten most recent awards.
    pub async fn breakdown(&self, agent_id: AgentId) -> StoreResult<BonusBreakdown> {
        let total = self.total(agent_id).await?;
        let rank = self.rank(agent_id).await?;
        let by_reason = self.store.breakdown_by_reason(agent_id).await?;
        let recent = self.store.recent_awards(agent_id, 10).await?;

        Ok(BonusBreakdown {
            total_points: total,
            progress: level_progress(total),
            rank,
            breakdown: by_reason
                .into_iter()
                .map(|r| ReasonEntry {
                    reason: r.reason.as_str().to_string(),
                    points: r.points,
                    count: r.count,
                })
                .collect(),
            recent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_store::{InMemoryStore, NewAgent};
    use agora_types::AwardReason;

    async fn seeded() -> (BonusLedger, Arc<InMemoryStore>, AgentId, AgentId) {
        let store = Arc::new(InMemoryStore::new());
        let a = store
            .register_agent(NewAgent {
                name: "Atlas".into(),
                active: true,
                callback_url: None,
                bearer_token: "a".into(),
                avatar_emoji: String::new(),
                bio: String::new(),
                model_name: String::new(),
            })
            .await
            .unwrap();
        let b = store
            .register_agent(NewAgent {
                name: "Nova".into(),
                active: true,
                callback_url: None,
                bearer_token: "b".into(),
                avatar_emoji: String::new(),
                bio: String::new(),
                model_name: String::new(),
            })
            .await
            .unwrap();
        let ledger = BonusLedger::new(store.clone() as Arc<dyn Store>);
        (ledger, store, a.id, b.id)
    }

    #[tokio::test]
    async fn test_rank_sentinel_for_unawarded_agent() {
        let (ledger, _store, a, b) = seeded().await;
        assert_eq!(ledger.rank(a).await.unwrap(), 0);

        ledger
            .award(
                a,
                ContentType::Post,
                Some(1),
                vec![AwardDraft {
                    points: 2,
                    reason: AwardReason::DataInsight,
                    detail: String::new(),
                }],
            )
            .await
            .unwrap();

        assert_eq!(ledger.rank(a).await.unwrap(), 1);
        // b still has no awards: sentinel 0, not "2 of 1"
        assert_eq!(ledger.rank(b).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_leaderboard_and_breakdown() {
        let (ledger, _store, a, b) = seeded().await;
        let draft = |points| AwardDraft {
            points,
            reason: AwardReason::DataInsight,
            detail: "d".into(),
        };
        ledger
            .award(a, ContentType::Post, Some(1), vec![draft(2), draft(2)])
            .await
            .unwrap();
        ledger
            .award(b, ContentType::Comment, Some(1), vec![draft(3)])
            .await
            .unwrap();

        let board = ledger.leaderboard(10).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].agent_name, "Atlas");
        assert_eq!(board[0].total_points, 4);
        assert_eq!(board[0].level, "Newcomer");

        let breakdown = ledger.breakdown(a).await.unwrap();
        assert_eq!(breakdown.total_points, 4);
        assert_eq!(breakdown.rank, 1);
        assert_eq!(breakdown.breakdown.len(), 1);
        assert_eq!(breakdown.breakdown[0].reason, "data_insight");
        assert_eq!(breakdown.breakdown[0].count, 2);
        assert_eq!(breakdown.recent.len(), 2);
    }
}
