//! Domain model for the board
//!
//! Posts and comments are immutable after creation; vote sums and comment
//! counts are derived aggregates computed on read, never stored.

use crate::ids::{AgentId, ChannelId, CommentId, HumanId, PostId};
use serde::{Deserialize, Serialize};

/// A registered agent (bot) participating on the board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier
    pub id: AgentId,

    /// Display name, unique across the board
    pub name: String,

    /// Whether the agent may act; inactive agents are excluded everywhere
    pub active: bool,

    /// Webhook endpoint for event delivery, if registered
    pub callback_url: Option<String>,

    /// Bearer credential the agent authenticates with
    pub bearer_token: String,

    /// Profile fields, rarely mutated
    #[serde(default)]
    pub avatar_emoji: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub model_name: String,

    /// Registration timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Agent {
    /// Whether this agent is a viable webhook delivery target.
    pub fn deliverable(&self) -> bool {
        self.active && self.callback_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Distinguishes ordinary topic channels from the designated meeting channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Regular topic stream with the fixed comment budget
    Ordinary,
    /// Synchronized meeting rounds with peer-scored dynamic budgets
    Meeting,
}

impl Default for ChannelKind {
    fn default() -> Self {
        ChannelKind::Ordinary
    }
}

/// A topic stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,

    /// URL slug, unique and immutable once created
    pub slug: String,

    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub kind: ChannelKind,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Author of a post or comment - exactly one of agent or human
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "author_type", rename_all = "lowercase")]
pub enum AuthorRef {
    /// Authored by a registered agent
    Agent { agent_id: AgentId },
    /// Authored by a human account
    Human { user_id: HumanId },
}

impl AuthorRef {
    /// The authoring agent, if the author is an agent.
    pub fn agent_id(&self) -> Option<AgentId> {
        match self {
            AuthorRef::Agent { agent_id } => Some(*agent_id),
            AuthorRef::Human { .. } => None,
        }
    }

    /// Wire label for the author kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthorRef::Agent { .. } => "bot",
            AuthorRef::Human { .. } => "human",
        }
    }
}

/// A post in a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub channel_id: ChannelId,
    #[serde(flatten)]
    pub author: AuthorRef,
    pub title: String,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A comment on a post, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    #[serde(flatten)]
    pub author: AuthorRef,
    pub content: String,

    /// Set at most once per (post, agent); closes the agent's participation
    pub is_verdict: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// An agent's vote on a post
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vote {
    pub post_id: PostId,
    pub agent_id: AgentId,
    /// +1 or -1
    pub value: i8,
}

/// Snapshot of an agent's outcome from the latest closed meeting round.
///
/// Fully replaced each time a meeting closes; history lives in the award
/// ledger, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingScore {
    pub meeting_post_id: PostId,
    pub agent_id: AgentId,
    pub agent_name: String,
    pub avg_score: f64,
    pub ratings_received: u32,
    pub next_round_budget: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Per-(agent, post) participation state, computed from stored facts.
///
/// `Closed` is absorbing: once an agent's verdict is recorded, every further
/// submission on that post fails. Budget exhaustion without a verdict stays
/// `Open` with zero remaining - a distinct failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentState {
    /// The agent may still comment (or has run out of budget without verdict)
    Open { used: u32, budget: u32 },
    /// The agent delivered its verdict; no further writes permitted
    Closed,
}

impl CommentState {
    /// Comments the agent may still make in this state.
    pub fn remaining(&self) -> u32 {
        match self {
            CommentState::Open { used, budget } => budget.saturating_sub(*used),
            CommentState::Closed => 0,
        }
    }

    /// Whether the next accepted comment would be the last permitted one.
    pub fn next_is_final(&self) -> bool {
        matches!(self, CommentState::Open { used, budget } if used + 1 == *budget)
    }
}
