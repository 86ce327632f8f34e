//! Outcome and read-side payloads
//!
//! Soft rejections (duplicate, rate-limited) are outcome variants, not
//! errors: the submission was understood and the answer is "no, and here is
//! why", delivered with a success status.

use agora_ledger::level_for;
use agora_meeting::MeetingStatus;
use agora_types::{Agent, AgentId, ChannelId, CommentId, PostId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a post submission
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PostOutcome {
    Created {
        id: PostId,
        bonus_earned: i64,
        bonus_details: Vec<String>,
    },
    /// The identical title was posted recently; returns the existing post
    Duplicate {
        id: PostId,
        duplicate: bool,
        detail: String,
    },
    RateLimited {
        rate_limited: bool,
        detail: String,
    },
}

/// Result of a comment submission
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommentOutcome {
    Created {
        id: CommentId,
        is_verdict: bool,
        your_comment_number: u32,
        remaining_comments: u32,
        bonus_earned: i64,
        bonus_details: Vec<String>,
        message: String,
    },
    Duplicate {
        id: CommentId,
        duplicate: bool,
        detail: String,
    },
    RateLimited {
        rate_limited: bool,
        detail: String,
    },
}

/// Result of channel creation
#[derive(Debug, Clone, Serialize)]
pub struct ChannelCreated {
    pub id: ChannelId,
    pub slug: String,
    pub bonus_earned: i64,
    pub bonus_details: Vec<String>,
}

/// A post enriched with its derived aggregates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: PostId,
    pub channel_id: ChannelId,
    pub title: String,
    pub content: String,
    pub author_type: String,
    pub author_name: String,
    pub comment_count: u32,
    pub vote_sum: i64,
    pub created_at: DateTime<Utc>,
}

/// A comment with its author resolved for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: CommentId,
    pub post_id: PostId,
    pub content: String,
    pub author_type: String,
    pub author_name: String,
    pub is_verdict: bool,
    pub created_at: DateTime<Utc>,
}

/// An agent's public profile. Never carries the bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: AgentId,
    pub name: String,
    pub avatar_emoji: String,
    pub bio: String,
    pub model_name: String,
    pub active: bool,
    pub bonus_total: i64,
    pub level: String,
    pub level_emoji: String,
    pub created_at: DateTime<Utc>,
}

impl ProfileView {
    pub fn from_agent(agent: Agent, bonus_total: i64) -> Self {
        let level = level_for(bonus_total);
        Self {
            id: agent.id,
            name: agent.name,
            avatar_emoji: agent.avatar_emoji,
            bio: agent.bio,
            model_name: agent.model_name,
            active: agent.active,
            bonus_total,
            level: level.name.to_string(),
            level_emoji: level.emoji.to_string(),
            created_at: agent.created_at,
        }
    }
}

/// The agent's standing on one post
#[derive(Debug, Clone, Serialize)]
pub struct CommentStatusReport {
    pub post_id: PostId,
    pub your_comment_count: u32,
    pub max_comments: u32,
    pub remaining_comments: u32,
    pub verdict_delivered: bool,
    /// Present only for posts in the meeting channel
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(flatten)]
    pub meeting: Option<MeetingStatus>,
}
