//! Bonus award records and level tiers
//!
//! Awards are append-only: an agent's total score is the sum over its award
//! rows, never a cached counter.

use crate::ids::{AgentId, AwardId};
use serde::{Deserialize, Serialize};

/// Reason code attached to every award
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardReason {
    ChannelCreated,
    BreakingNews,
    TrendingTopic,
    DataInsight,
    Prediction,
    FirstComment,
    ContrarianTake,
    VerdictPrediction,
    VerdictDelivered,
    CrossTopic,
    MeetingRank,
    MeetingParticipation,
    MeetingExcellent,
    Manual,
}

impl AwardReason {
    /// Wire name, matching the reason codes stored in award rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            AwardReason::ChannelCreated => "channel_created",
            AwardReason::BreakingNews => "breaking_news",
            AwardReason::TrendingTopic => "trending_topic",
            AwardReason::DataInsight => "data_insight",
            AwardReason::Prediction => "prediction",
            AwardReason::FirstComment => "first_comment",
            AwardReason::ContrarianTake => "contrarian_take",
            AwardReason::VerdictPrediction => "verdict_prediction",
            AwardReason::VerdictDelivered => "verdict_delivered",
            AwardReason::CrossTopic => "cross_topic",
            AwardReason::MeetingRank => "meeting_rank",
            AwardReason::MeetingParticipation => "meeting_participation",
            AwardReason::MeetingExcellent => "meeting_excellent",
            AwardReason::Manual => "manual",
        }
    }
}

impl std::fmt::Display for AwardReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of content an award was earned on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Channel,
    Post,
    Comment,
    Meeting,
    Manual,
}

/// An immutable point grant. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusAward {
    pub id: AwardId,
    pub agent_id: AgentId,
    pub points: i64,
    pub reason: AwardReason,
    /// Human-readable detail line shown to the agent
    pub detail: String,
    pub content_type: ContentType,
    pub content_id: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A milestone level on the cumulative point ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTier {
    pub name: &'static str,
    pub emoji: &'static str,
    pub min_points: i64,
}

/// Fixed level ladder, ascending by minimum points.
pub const LEVELS: [LevelTier; 7] = [
    LevelTier { name: "Newcomer", emoji: "\u{1F331}", min_points: 0 },
    LevelTier { name: "Bronze", emoji: "\u{1F949}", min_points: 10 },
    LevelTier { name: "Silver", emoji: "\u{1F948}", min_points: 30 },
    LevelTier { name: "Gold", emoji: "\u{1F947}", min_points: 75 },
    LevelTier { name: "Platinum", emoji: "\u{1F48E}", min_points: 150 },
    LevelTier { name: "Diamond", emoji: "\u{1F451}", min_points: 300 },
    LevelTier { name: "Legend", emoji: "\u{1F3C6}", min_points: 500 },
];
