//! In-memory storage implementation

use crate::error::StoreError;
use crate::traits::*;
use agora_types::{
    Agent, AgentId, BonusAward, Channel, ChannelId, ChannelKind, Comment, CommentId, MeetingScore,
    Post, PostId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// In-memory store backing tests and the default daemon configuration.
///
/// Lock acquisition order where multiple maps are needed:
/// posts, then comments, then votes.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    agents: RwLock<HashMap<AgentId, Agent>>,
    channels: RwLock<HashMap<ChannelId, Channel>>,
    posts: RwLock<BTreeMap<PostId, Post>>,
    comments: RwLock<BTreeMap<CommentId, Comment>>,
    votes: RwLock<HashMap<(PostId, AgentId), i8>>,
    awards: RwLock<Vec<BonusAward>>,
    meeting_scores: RwLock<Vec<MeetingScore>>,

    agent_seq: AtomicI64,
    channel_seq: AtomicI64,
    post_seq: AtomicI64,
    comment_seq: AtomicI64,
    award_seq: AtomicI64,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn next(seq: &AtomicI64) -> i64 {
        seq.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Store for InMemoryStore {}

#[async_trait]
impl AgentRegistry for InMemoryStore {
    async fn get_agent(&self, id: AgentId) -> StoreResult<Option<Agent>> {
        let agents = self.agents.read().await;
        Ok(agents.get(&id).cloned())
    }

    async fn get_agent_by_name(&self, name: &str) -> StoreResult<Option<Agent>> {
        let agents = self.agents.read().await;
        Ok(agents
            .values()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn list_agents(&self) -> StoreResult<Vec<Agent>> {
        let agents = self.agents.read().await;
        let mut all: Vec<_> = agents.values().cloned().collect();
        all.sort_by_key(|a| a.id);
        Ok(all)
    }

    async fn list_active_agents(&self) -> StoreResult<Vec<Agent>> {
        let agents = self.agents.read().await;
        let mut active: Vec<_> = agents.values().filter(|a| a.active).cloned().collect();
        active.sort_by_key(|a| a.id);
        Ok(active)
    }

    async fn register_agent(&self, agent: NewAgent) -> StoreResult<Agent> {
        let mut agents = self.agents.write().await;
        if agents
            .values()
            .any(|a| a.name.eq_ignore_ascii_case(&agent.name))
        {
            return Err(StoreError::Conflict(format!(
                "Agent name {} already registered",
                agent.name
            )));
        }
        let id = AgentId::new(Self::next(&self.agent_seq));
        let stored = Agent {
            id,
            name: agent.name,
            active: agent.active,
            callback_url: agent.callback_url,
            bearer_token: agent.bearer_token,
            avatar_emoji: agent.avatar_emoji,
            bio: agent.bio,
            model_name: agent.model_name,
            created_at: Utc::now(),
        };
        agents.insert(id, stored.clone());
        Ok(stored)
    }

    async fn authenticate(&self, bearer_token: &str) -> StoreResult<Option<AgentId>> {
        let agents = self.agents.read().await;
        Ok(agents
            .values()
            .find(|a| a.bearer_token == bearer_token)
            .map(|a| a.id))
    }

    async fn update_profile(&self, id: AgentId, update: ProfileUpdate) -> StoreResult<Agent> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Agent {} not found", id)))?;
        if let Some(bio) = update.bio {
            agent.bio = bio;
        }
        if let Some(emoji) = update.avatar_emoji {
            agent.avatar_emoji = emoji;
        }
        if let Some(model) = update.model_name {
            agent.model_name = model;
        }
        Ok(agent.clone())
    }
}

#[async_trait]
impl ChannelStore for InMemoryStore {
    async fn get_channel(&self, id: ChannelId) -> StoreResult<Option<Channel>> {
        let channels = self.channels.read().await;
        Ok(channels.get(&id).cloned())
    }

    async fn get_channel_by_slug(&self, slug: &str) -> StoreResult<Option<Channel>> {
        let channels = self.channels.read().await;
        Ok(channels.values().find(|c| c.slug == slug).cloned())
    }

    async fn list_channels(&self) -> StoreResult<Vec<Channel>> {
        let channels = self.channels.read().await;
        let mut all: Vec<_> = channels.values().cloned().collect();
        all.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
        Ok(all)
    }

    async fn insert_channel(&self, channel: NewChannel) -> StoreResult<Channel> {
        let mut channels = self.channels.write().await;
        if channels.values().any(|c| c.slug == channel.slug) {
            return Err(StoreError::Conflict(format!(
                "Channel slug {} already exists",
                channel.slug
            )));
        }
        let id = ChannelId::new(Self::next(&self.channel_seq));
        let stored = Channel {
            id,
            slug: channel.slug,
            name: channel.name,
            description: channel.description,
            emoji: channel.emoji,
            category: channel.category,
            kind: channel.kind,
            created_at: Utc::now(),
        };
        channels.insert(id, stored.clone());
        Ok(stored)
    }

    async fn meeting_channel(&self) -> StoreResult<Option<Channel>> {
        let channels = self.channels.read().await;
        let mut meetings: Vec<_> = channels
            .values()
            .filter(|c| c.kind == ChannelKind::Meeting)
            .cloned()
            .collect();
        meetings.sort_by_key(|c| c.id);
        Ok(meetings.into_iter().next())
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn get_post(&self, id: PostId) -> StoreResult<Option<Post>> {
        let posts = self.posts.read().await;
        Ok(posts.get(&id).cloned())
    }

    async fn list_posts(&self, query: PostQuery) -> StoreResult<Vec<Post>> {
        let posts = self.posts.read().await;
        let comments = self.comments.read().await;
        let votes = self.votes.read().await;

        let mut matched: Vec<Post> = posts
            .values()
            .filter(|p| query.channel_id.map_or(true, |c| p.channel_id == c))
            .filter(|p| query.since.map_or(true, |s| p.created_at >= s))
            .cloned()
            .collect();

        match query.sort {
            PostSort::New => matched.sort_by(|a, b| b.id.cmp(&a.id)),
            PostSort::Top => {
                let sum = |p: &Post| -> i64 {
                    votes
                        .iter()
                        .filter(|((post_id, _), _)| *post_id == p.id)
                        .map(|(_, v)| *v as i64)
                        .sum()
                };
                matched.sort_by(|a, b| sum(b).cmp(&sum(a)).then_with(|| b.id.cmp(&a.id)));
            }
            PostSort::Discussed => {
                let count = |p: &Post| comments.values().filter(|c| c.post_id == p.id).count();
                matched.sort_by(|a, b| count(b).cmp(&count(a)).then_with(|| b.id.cmp(&a.id)));
            }
        }

        if query.limit > 0 {
            matched.truncate(query.limit);
        }
        Ok(matched)
    }

    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut posts = self.posts.write().await;
        let id = PostId::new(Self::next(&self.post_seq));
        let stored = Post {
            id,
            channel_id: post.channel_id,
            author: post.author,
            title: post.title,
            content: post.content,
            created_at: Utc::now(),
        };
        posts.insert(id, stored.clone());
        Ok(stored)
    }

    async fn search_posts(
        &self,
        q: &str,
        channel_id: Option<ChannelId>,
        limit: usize,
    ) -> StoreResult<Vec<Post>> {
        let posts = self.posts.read().await;
        let needle = q.to_lowercase();
        let mut matched: Vec<Post> = posts
            .values()
            .rev()
            .filter(|p| channel_id.map_or(true, |c| p.channel_id == c))
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.content.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        if limit > 0 {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn list_posts_not_commented_by(
        &self,
        agent_id: AgentId,
        channel_id: Option<ChannelId>,
        limit: usize,
    ) -> StoreResult<Vec<Post>> {
        let posts = self.posts.read().await;
        let comments = self.comments.read().await;
        let commented: HashSet<PostId> = comments
            .values()
            .filter(|c| c.author.agent_id() == Some(agent_id))
            .map(|c| c.post_id)
            .collect();

        let mut matched: Vec<Post> = posts
            .values()
            .rev()
            .filter(|p| channel_id.map_or(true, |c| p.channel_id == c))
            .filter(|p| !commented.contains(&p.id))
            .filter(|p| p.author.agent_id() != Some(agent_id))
            .cloned()
            .collect();
        if limit > 0 {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn list_posts_by_author(
        &self,
        agent_id: AgentId,
        limit: usize,
    ) -> StoreResult<Vec<Post>> {
        let posts = self.posts.read().await;
        let mut matched: Vec<Post> = posts
            .values()
            .rev()
            .filter(|p| p.author.agent_id() == Some(agent_id))
            .cloned()
            .collect();
        if limit > 0 {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn count_posts_by_agent_since(
        &self,
        agent_id: AgentId,
        since: DateTime<Utc>,
    ) -> StoreResult<u32> {
        let posts = self.posts.read().await;
        Ok(posts
            .values()
            .filter(|p| p.author.agent_id() == Some(agent_id) && p.created_at >= since)
            .count() as u32)
    }

    async fn find_recent_post_by_title(
        &self,
        agent_id: AgentId,
        title: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<PostId>> {
        let posts = self.posts.read().await;
        Ok(posts
            .values()
            .rev()
            .find(|p| {
                p.author.agent_id() == Some(agent_id)
                    && p.title == title
                    && p.created_at >= since
            })
            .map(|p| p.id))
    }

    async fn comment_count(&self, post_id: PostId) -> StoreResult<u32> {
        let comments = self.comments.read().await;
        Ok(comments.values().filter(|c| c.post_id == post_id).count() as u32)
    }
}

#[async_trait]
impl CommentStore for InMemoryStore {
    async fn get_comment(&self, id: CommentId) -> StoreResult<Option<Comment>> {
        let comments = self.comments.read().await;
        Ok(comments.get(&id).cloned())
    }

    async fn list_comments(&self, post_id: PostId) -> StoreResult<Vec<Comment>> {
        let comments = self.comments.read().await;
        Ok(comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn insert_comment(
        &self,
        comment: NewComment,
        expected_prior_count: Option<u32>,
    ) -> StoreResult<Comment> {
        let mut comments = self.comments.write().await;

        // Serialization guard: checked under the write lock so two racing
        // submissions from the same agent cannot both observe the same count.
        if let (Some(expected), Some(agent_id)) = (expected_prior_count, comment.author.agent_id())
        {
            let actual = comments
                .values()
                .filter(|c| c.post_id == comment.post_id && c.author.agent_id() == Some(agent_id))
                .count() as u32;
            if actual != expected {
                return Err(StoreError::Conflict(format!(
                    "Comment ordinal conflict on post {}: expected {} prior comments, found {}",
                    comment.post_id, expected, actual
                )));
            }
        }

        let id = CommentId::new(Self::next(&self.comment_seq));
        let stored = Comment {
            id,
            post_id: comment.post_id,
            author: comment.author,
            content: comment.content,
            is_verdict: comment.is_verdict,
            created_at: Utc::now(),
        };
        comments.insert(id, stored.clone());
        Ok(stored)
    }

    async fn count_comments_by_agent(
        &self,
        post_id: PostId,
        agent_id: AgentId,
    ) -> StoreResult<u32> {
        let comments = self.comments.read().await;
        Ok(comments
            .values()
            .filter(|c| c.post_id == post_id && c.author.agent_id() == Some(agent_id))
            .count() as u32)
    }

    async fn has_verdict(&self, post_id: PostId, agent_id: AgentId) -> StoreResult<bool> {
        let comments = self.comments.read().await;
        Ok(comments.values().any(|c| {
            c.post_id == post_id && c.is_verdict && c.author.agent_id() == Some(agent_id)
        }))
    }

    async fn count_comments_by_agent_since(
        &self,
        agent_id: AgentId,
        since: DateTime<Utc>,
    ) -> StoreResult<u32> {
        let comments = self.comments.read().await;
        Ok(comments
            .values()
            .filter(|c| c.author.agent_id() == Some(agent_id) && c.created_at >= since)
            .count() as u32)
    }

    async fn find_recent_duplicate_comment(
        &self,
        post_id: PostId,
        agent_id: AgentId,
        content: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<CommentId>> {
        let comments = self.comments.read().await;
        Ok(comments
            .values()
            .rev()
            .find(|c| {
                c.post_id == post_id
                    && c.author.agent_id() == Some(agent_id)
                    && c.content == content
                    && c.created_at >= since
            })
            .map(|c| c.id))
    }

    async fn first_comment_time(&self, post_id: PostId) -> StoreResult<Option<DateTime<Utc>>> {
        let comments = self.comments.read().await;
        Ok(comments
            .values()
            .find(|c| c.post_id == post_id)
            .map(|c| c.created_at))
    }

    async fn list_commenter_agents(&self, post_id: PostId) -> StoreResult<Vec<AgentId>> {
        let comments = self.comments.read().await;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for c in comments.values().filter(|c| c.post_id == post_id) {
            if let Some(agent_id) = c.author.agent_id() {
                if seen.insert(agent_id) {
                    out.push(agent_id);
                }
            }
        }
        Ok(out)
    }

    async fn list_replies_to_agent(
        &self,
        agent_id: AgentId,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> StoreResult<Vec<Comment>> {
        let posts = self.posts.read().await;
        let comments = self.comments.read().await;
        let my_posts: HashSet<PostId> = posts
            .values()
            .filter(|p| p.author.agent_id() == Some(agent_id))
            .map(|p| p.id)
            .collect();

        let mut matched: Vec<Comment> = comments
            .values()
            .rev()
            .filter(|c| my_posts.contains(&c.post_id))
            .filter(|c| c.author.agent_id() != Some(agent_id))
            .filter(|c| since.map_or(true, |s| c.created_at >= s))
            .cloned()
            .collect();
        if limit > 0 {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

#[async_trait]
impl VoteStore for InMemoryStore {
    async fn set_vote(&self, post_id: PostId, agent_id: AgentId, value: i8) -> StoreResult<()> {
        if !matches!(value, -1 | 0 | 1) {
            return Err(StoreError::InvalidData(format!(
                "Vote value must be -1, 0, or 1, got {}",
                value
            )));
        }
        let mut votes = self.votes.write().await;
        if value == 0 {
            votes.remove(&(post_id, agent_id));
        } else {
            votes.insert((post_id, agent_id), value);
        }
        Ok(())
    }

    async fn vote_sum(&self, post_id: PostId) -> StoreResult<i64> {
        let votes = self.votes.read().await;
        Ok(votes
            .iter()
            .filter(|((p, _), _)| *p == post_id)
            .map(|(_, v)| *v as i64)
            .sum())
    }
}

#[async_trait]
impl AwardStore for InMemoryStore {
    async fn append_award(&self, award: NewAward) -> StoreResult<BonusAward> {
        let mut awards = self.awards.write().await;
        let stored = BonusAward {
            id: agora_types::AwardId::new(Self::next(&self.award_seq)),
            agent_id: award.agent_id,
            points: award.points,
            reason: award.reason,
            detail: award.detail,
            content_type: award.content_type,
            content_id: award.content_id,
            created_at: Utc::now(),
        };
        awards.push(stored.clone());
        Ok(stored)
    }

    async fn total_points(&self, agent_id: AgentId) -> StoreResult<i64> {
        let awards = self.awards.read().await;
        Ok(awards
            .iter()
            .filter(|a| a.agent_id == agent_id)
            .map(|a| a.points)
            .sum())
    }

    async fn totals_by_agent(&self) -> StoreResult<Vec<AgentTotals>> {
        let awards = self.awards.read().await;
        let mut by_agent: HashMap<AgentId, (i64, u64)> = HashMap::new();
        for a in awards.iter() {
            let entry = by_agent.entry(a.agent_id).or_insert((0, 0));
            entry.0 += a.points;
            entry.1 += 1;
        }
        let mut totals: Vec<AgentTotals> = by_agent
            .into_iter()
            .map(|(agent_id, (points, award_count))| AgentTotals {
                agent_id,
                points,
                award_count,
            })
            .collect();
        totals.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.agent_id.cmp(&b.agent_id)));
        Ok(totals)
    }

    async fn breakdown_by_reason(&self, agent_id: AgentId) -> StoreResult<Vec<ReasonTotals>> {
        let awards = self.awards.read().await;
        let mut by_reason: HashMap<agora_types::AwardReason, (i64, u64)> = HashMap::new();
        for a in awards.iter().filter(|a| a.agent_id == agent_id) {
            let entry = by_reason.entry(a.reason).or_insert((0, 0));
            entry.0 += a.points;
            entry.1 += 1;
        }
        let mut totals: Vec<ReasonTotals> = by_reason
            .into_iter()
            .map(|(reason, (points, count))| ReasonTotals {
                reason,
                points,
                count,
            })
            .collect();
        totals.sort_by(|a, b| b.points.cmp(&a.points));
        Ok(totals)
    }

    async fn recent_awards(
        &self,
        agent_id: AgentId,
        limit: usize,
    ) -> StoreResult<Vec<BonusAward>> {
        let awards = self.awards.read().await;
        let mut matched: Vec<BonusAward> = awards
            .iter()
            .rev()
            .filter(|a| a.agent_id == agent_id)
            .cloned()
            .collect();
        if limit > 0 {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

#[async_trait]
impl MeetingScoreStore for InMemoryStore {
    async fn replace_meeting_scores(
        &self,
        post_id: PostId,
        scores: Vec<MeetingScore>,
    ) -> StoreResult<()> {
        let mut all = self.meeting_scores.write().await;
        all.retain(|s| s.meeting_post_id != post_id);
        all.extend(scores);
        Ok(())
    }

    async fn latest_score_for_agent(
        &self,
        agent_id: AgentId,
    ) -> StoreResult<Option<MeetingScore>> {
        let all = self.meeting_scores.read().await;
        Ok(all
            .iter()
            .filter(|s| s.agent_id == agent_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn latest_meeting_scores(&self) -> StoreResult<Vec<MeetingScore>> {
        let all = self.meeting_scores.read().await;
        let latest_post = match all.iter().max_by_key(|s| s.created_at) {
            Some(s) => s.meeting_post_id,
            None => return Ok(vec![]),
        };
        let mut rows: Vec<MeetingScore> = all
            .iter()
            .filter(|s| s.meeting_post_id == latest_post)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.avg_score.partial_cmp(&a.avg_score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(rows)
    }
}
