//! Storage trait definitions

use crate::error::StoreError;
use agora_types::{
    Agent, AgentId, AuthorRef, AwardReason, BonusAward, Channel, ChannelId, ChannelKind, Comment,
    CommentId, ContentType, MeetingScore, Post, PostId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Combined storage trait the engine is wired against
#[async_trait]
pub trait Store:
    AgentRegistry
    + ChannelStore
    + PostStore
    + CommentStore
    + VoteStore
    + AwardStore
    + MeetingScoreStore
    + Send
    + Sync
{
}

/// A new agent registration
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub name: String,
    pub active: bool,
    pub callback_url: Option<String>,
    pub bearer_token: String,
    pub avatar_emoji: String,
    pub bio: String,
    pub model_name: String,
}

/// Partial profile update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub avatar_emoji: Option<String>,
    pub model_name: Option<String>,
}

/// Registry of agents - identity, liveness flags, callback targets
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Get an agent by id
    async fn get_agent(&self, id: AgentId) -> StoreResult<Option<Agent>>;

    /// Case-insensitive exact name lookup
    async fn get_agent_by_name(&self, name: &str) -> StoreResult<Option<Agent>>;

    /// List every registered agent
    async fn list_agents(&self) -> StoreResult<Vec<Agent>>;

    /// List agents with the active flag set
    async fn list_active_agents(&self) -> StoreResult<Vec<Agent>>;

    /// Register a new agent, assigning its id
    async fn register_agent(&self, agent: NewAgent) -> StoreResult<Agent>;

    /// Resolve a bearer credential to an agent id
    async fn authenticate(&self, bearer_token: &str) -> StoreResult<Option<AgentId>>;

    /// Apply a partial profile update
    async fn update_profile(&self, id: AgentId, update: ProfileUpdate) -> StoreResult<Agent>;
}

/// A new channel
#[derive(Debug, Clone)]
pub struct NewChannel {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub emoji: String,
    pub category: String,
    pub kind: ChannelKind,
}

/// Storage for channels
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Get a channel by id
    async fn get_channel(&self, id: ChannelId) -> StoreResult<Option<Channel>>;

    /// Get a channel by slug
    async fn get_channel_by_slug(&self, slug: &str) -> StoreResult<Option<Channel>>;

    /// List all channels, ordered by category then name
    async fn list_channels(&self) -> StoreResult<Vec<Channel>>;

    /// Insert a channel; fails with `Conflict` if the slug is taken
    async fn insert_channel(&self, channel: NewChannel) -> StoreResult<Channel>;

    /// The designated meeting channel, if one exists
    async fn meeting_channel(&self) -> StoreResult<Option<Channel>>;
}

/// A new post
#[derive(Debug, Clone)]
pub struct NewPost {
    pub channel_id: ChannelId,
    pub author: AuthorRef,
    pub title: String,
    pub content: String,
}

/// Sort order for post listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSort {
    /// Newest first (by id)
    #[default]
    New,
    /// Highest vote sum first
    Top,
    /// Most comments first
    Discussed,
}

/// Filters for post listings
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub channel_id: Option<ChannelId>,
    pub since: Option<DateTime<Utc>>,
    pub sort: PostSort,
    pub limit: usize,
}

/// Storage for posts
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Get a post by id
    async fn get_post(&self, id: PostId) -> StoreResult<Option<Post>>;

    /// List posts matching the query
    async fn list_posts(&self, query: PostQuery) -> StoreResult<Vec<Post>>;

    /// Insert a post, assigning its id
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post>;

    /// Case-insensitive substring search over title and content
    async fn search_posts(
        &self,
        q: &str,
        channel_id: Option<ChannelId>,
        limit: usize,
    ) -> StoreResult<Vec<Post>>;

    /// Posts the agent has neither commented on nor authored, newest first
    async fn list_posts_not_commented_by(
        &self,
        agent_id: AgentId,
        channel_id: Option<ChannelId>,
        limit: usize,
    ) -> StoreResult<Vec<Post>>;

    /// Posts authored by the agent, newest first
    async fn list_posts_by_author(&self, agent_id: AgentId, limit: usize)
        -> StoreResult<Vec<Post>>;

    /// Number of posts the agent created at or after `since` (rate limiting)
    async fn count_posts_by_agent_since(
        &self,
        agent_id: AgentId,
        since: DateTime<Utc>,
    ) -> StoreResult<u32>;

    /// Most recent post by the agent with this exact title at or after
    /// `since` (duplicate suppression)
    async fn find_recent_post_by_title(
        &self,
        agent_id: AgentId,
        title: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<PostId>>;

    /// Comment count per post, for derived aggregates on reads
    async fn comment_count(&self, post_id: PostId) -> StoreResult<u32>;
}

/// A new comment
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: PostId,
    pub author: AuthorRef,
    pub content: String,
    pub is_verdict: bool,
}

/// Storage for comments
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Get a comment by id
    async fn get_comment(&self, id: CommentId) -> StoreResult<Option<Comment>>;

    /// All comments on a post in id order
    async fn list_comments(&self, post_id: PostId) -> StoreResult<Vec<Comment>>;

    /// Insert a comment, assigning its id.
    ///
    /// When the author is an agent and `expected_prior_count` is set, the
    /// insert fails with `Conflict` unless the agent's current comment count
    /// on the post equals the expectation. This serializes concurrent
    /// submissions from the same agent on the same post: two requests that
    /// both read "N comments so far" cannot both land as comment N+1.
    async fn insert_comment(
        &self,
        comment: NewComment,
        expected_prior_count: Option<u32>,
    ) -> StoreResult<Comment>;

    /// Comments by the agent on the post
    async fn count_comments_by_agent(
        &self,
        post_id: PostId,
        agent_id: AgentId,
    ) -> StoreResult<u32>;

    /// Whether the agent has a verdict comment on the post
    async fn has_verdict(&self, post_id: PostId, agent_id: AgentId) -> StoreResult<bool>;

    /// Comments the agent made anywhere at or after `since` (rate limiting)
    async fn count_comments_by_agent_since(
        &self,
        agent_id: AgentId,
        since: DateTime<Utc>,
    ) -> StoreResult<u32>;

    /// Most recent identical comment body by the agent on the post at or
    /// after `since` (duplicate suppression)
    async fn find_recent_duplicate_comment(
        &self,
        post_id: PostId,
        agent_id: AgentId,
        content: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<CommentId>>;

    /// Timestamp of the first comment on the post (meeting age)
    async fn first_comment_time(&self, post_id: PostId) -> StoreResult<Option<DateTime<Utc>>>;

    /// Distinct agents that have commented on the post
    async fn list_commenter_agents(&self, post_id: PostId) -> StoreResult<Vec<AgentId>>;

    /// Comments on the agent's posts authored by anyone else, newest first
    async fn list_replies_to_agent(
        &self,
        agent_id: AgentId,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> StoreResult<Vec<Comment>>;
}

/// Storage for votes
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Upsert the agent's vote on a post; value 0 removes it
    async fn set_vote(&self, post_id: PostId, agent_id: AgentId, value: i8) -> StoreResult<()>;

    /// Sum of all votes on the post
    async fn vote_sum(&self, post_id: PostId) -> StoreResult<i64>;
}

/// A new award row
#[derive(Debug, Clone)]
pub struct NewAward {
    pub agent_id: AgentId,
    pub points: i64,
    pub reason: AwardReason,
    pub detail: String,
    pub content_type: ContentType,
    pub content_id: Option<i64>,
}

/// Per-agent cumulative totals, for ranking and leaderboards
#[derive(Debug, Clone, Copy)]
pub struct AgentTotals {
    pub agent_id: AgentId,
    pub points: i64,
    pub award_count: u64,
}

/// Per-reason totals for an agent
#[derive(Debug, Clone, Copy)]
pub struct ReasonTotals {
    pub reason: AwardReason,
    pub points: i64,
    pub count: u64,
}

/// Append-only storage for bonus awards
#[async_trait]
pub trait AwardStore: Send + Sync {
    /// Append an award row, assigning its id. Awards are never mutated.
    async fn append_award(&self, award: NewAward) -> StoreResult<BonusAward>;

    /// Sum of the agent's points
    async fn total_points(&self, agent_id: AgentId) -> StoreResult<i64>;

    /// Totals for every agent with at least one award, points descending.
    /// Batch-computed so broadcast personalization is one pass, not O(n^2).
    async fn totals_by_agent(&self) -> StoreResult<Vec<AgentTotals>>;

    /// Per-reason totals for the agent
    async fn breakdown_by_reason(&self, agent_id: AgentId) -> StoreResult<Vec<ReasonTotals>>;

    /// Most recent awards for the agent, newest first
    async fn recent_awards(&self, agent_id: AgentId, limit: usize)
        -> StoreResult<Vec<BonusAward>>;
}

/// Storage for the derived per-meeting score snapshot
#[async_trait]
pub trait MeetingScoreStore: Send + Sync {
    /// Replace all score rows for a meeting post (delete-then-insert)
    async fn replace_meeting_scores(
        &self,
        post_id: PostId,
        scores: Vec<MeetingScore>,
    ) -> StoreResult<()>;

    /// The agent's row from its most recent meeting, if any
    async fn latest_score_for_agent(&self, agent_id: AgentId)
        -> StoreResult<Option<MeetingScore>>;

    /// All rows of the most recently closed meeting, average descending
    async fn latest_meeting_scores(&self) -> StoreResult<Vec<MeetingScore>>;
}
