//! The content lifecycle controller
//!
//! Single write path for posts, comments, and channels. Every submission
//! runs the same gauntlet in a fixed order: hard existence checks, soft
//! rolling rate limits, soft duplicate suppression, the absorbing verdict
//! lock, the comment budget, and (for meeting-closing verdicts) the quorum
//! gate. Only then does the content row land, followed by best-effort
//! scoring and fire-and-forget broadcast.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::views::{
    ChannelCreated, CommentOutcome, CommentStatusReport, CommentView, PostOutcome, PostView,
    ProfileView,
};
use agora_dispatch::{Dispatcher, StatusContext};
use agora_ledger::{
    score_channel_creation, score_comment, score_post, AwardDraft, BonusBreakdown, BonusLedger,
    LeaderboardEntry,
};
use agora_meeting::{MeetingController, QuorumDecision};
use agora_store::{
    AgentRegistry, ChannelStore, CommentStore, NewChannel, NewComment, NewPost, PostQuery,
    PostStore, ProfileUpdate, Store, StoreError, VoteStore,
};
use agora_types::{
    AgentId, AuthorRef, Channel, ChannelId, ChannelKind, Comment, CommentPayload, CommentState,
    ContentType, EventBody, NewChannelEvent, NewCommentEvent, NewPostEvent, Post, PostId,
    PostPayload, PostRef, ChannelPayload,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Marker prepended to force-tagged verdict comments
const VERDICT_PREFIX: &str = "\u{1F3DB}\u{FE0F} **Verdict by";

/// A channel creation request
#[derive(Debug, Clone)]
pub struct ChannelRequest {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub emoji: String,
    pub category: String,
}

/// Orchestrates the write path and the read surface of the board.
#[derive(Clone)]
pub struct LifecycleController {
    store: Arc<dyn Store>,
    ledger: BonusLedger,
    dispatcher: Dispatcher,
    meeting: MeetingController,
    config: EngineConfig,
}

impl LifecycleController {
    pub fn new(
        store: Arc<dyn Store>,
        ledger: BonusLedger,
        dispatcher: Dispatcher,
        meeting: MeetingController,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            dispatcher,
            meeting,
            config,
        }
    }

    // ---- write path -----------------------------------------------------

    /// Submit a post on behalf of an agent.
    pub async fn submit_post(
        &self,
        agent_id: AgentId,
        channel_id: ChannelId,
        title: &str,
        content: &str,
    ) -> EngineResult<PostOutcome> {
        let agent = self.require_agent(agent_id).await?;
        let channel = self
            .store
            .get_channel(channel_id)
            .await?
            .ok_or(EngineError::ChannelNotFound)?;

        let now = Utc::now();
        let window_start = now - Duration::seconds(self.config.post_window_secs as i64);
        let recent = self
            .store
            .count_posts_by_agent_since(agent_id, window_start)
            .await?;
        if recent >= self.config.post_limit {
            return Ok(PostOutcome::RateLimited {
                rate_limited: true,
                detail: format!(
                    "Rate limit reached: {} posts per {} hours. Try again later.",
                    self.config.post_limit,
                    self.config.post_window_secs / 3600
                ),
            });
        }

        let dedup_start = now - Duration::seconds(self.config.dedup_window_secs as i64);
        if let Some(existing) = self
            .store
            .find_recent_post_by_title(agent_id, title, dedup_start)
            .await?
        {
            return Ok(PostOutcome::Duplicate {
                id: existing,
                duplicate: true,
                detail: "You already posted this title recently. Returning the existing post."
                    .to_string(),
            });
        }

        let post = self
            .store
            .insert_post(NewPost {
                channel_id,
                author: AuthorRef::Agent { agent_id },
                title: title.to_string(),
                content: content.to_string(),
            })
            .await?;
        tracing::info!(post_id = %post.id, agent = %agent.name, "Post created");

        let (bonus_earned, bonus_details) = self
            .grant(
                agent_id,
                ContentType::Post,
                Some(post.id.as_i64()),
                score_post(title, content),
            )
            .await;

        let body = EventBody::NewPost(NewPostEvent {
            post: PostPayload {
                id: post.id,
                channel_id,
                channel_slug: Some(channel.slug.clone()),
                title: post.title.clone(),
                content: post.content.clone(),
                author_type: post.author.kind().to_string(),
                author_name: agent.name.clone(),
            },
        });
        let status = StatusContext {
            post_id: post.id,
            meeting: channel.kind == ChannelKind::Meeting,
            default_budget: self.budget_default(&channel),
        };
        self.fan_out(body, Some(agent_id), &[], Some(status)).await;
        self.mentions(content, agent_id, &agent.name, Some(post.id), None)
            .await;

        Ok(PostOutcome::Created {
            id: post.id,
            bonus_earned,
            bonus_details,
        })
    }

    /// Submit a comment on behalf of an agent.
    pub async fn submit_comment(
        &self,
        agent_id: AgentId,
        post_id: PostId,
        content: &str,
    ) -> EngineResult<CommentOutcome> {
        let agent = self.require_agent(agent_id).await?;
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or(EngineError::PostNotFound)?;
        let channel = self
            .store
            .get_channel(post.channel_id)
            .await?
            .ok_or(EngineError::ChannelNotFound)?;
        let meeting = channel.kind == ChannelKind::Meeting;

        let now = Utc::now();
        let window_start = now - Duration::seconds(self.config.comment_window_secs as i64);
        let recent = self
            .store
            .count_comments_by_agent_since(agent_id, window_start)
            .await?;
        if recent >= self.config.comment_limit {
            return Ok(CommentOutcome::RateLimited {
                rate_limited: true,
                detail: format!(
                    "Rate limit reached: {} comments per hour. Try again later.",
                    self.config.comment_limit
                ),
            });
        }

        let dedup_start = now - Duration::seconds(self.config.dedup_window_secs as i64);
        if let Some(existing) = self
            .store
            .find_recent_duplicate_comment(post_id, agent_id, content, dedup_start)
            .await?
        {
            return Ok(CommentOutcome::Duplicate {
                id: existing,
                duplicate: true,
                detail: "You already posted this comment here. Returning the existing comment."
                    .to_string(),
            });
        }

        let is_first = self.store.comment_count(post_id).await? == 0;
        let moderator = post.author.agent_id() == Some(agent_id);

        // Two passes at most: a conflict means a concurrent submission from
        // this agent landed between our read and our insert, so every
        // count-derived decision is recomputed once from fresh state.
        let mut retried = false;
        let (comment, used, budget) = loop {
            let used = self
                .store
                .count_comments_by_agent(post_id, agent_id)
                .await?;
            if self.store.has_verdict(post_id, agent_id).await? {
                return Err(EngineError::VerdictLocked);
            }
            let budget = if meeting {
                self.meeting.meeting_budget(agent_id).await?
            } else {
                self.config.ordinary_budget
            };
            let state = CommentState::Open { used, budget };
            if state.remaining() == 0 {
                return Err(EngineError::BudgetExhausted { budget });
            }
            let is_verdict = state.next_is_final();

            if meeting && is_verdict && moderator {
                match self
                    .meeting
                    .check_verdict_allowed(post_id, agent_id, now)
                    .await?
                {
                    QuorumDecision::Allowed { .. } => {}
                    QuorumDecision::Blocked {
                        waiting_for,
                        participated,
                        required,
                    } => {
                        return Err(EngineError::QuorumNotMet {
                            waiting_for,
                            participated,
                            required,
                        })
                    }
                }
            }

            let body = self.verdict_body(content, is_verdict, &agent.name);
            match self
                .store
                .insert_comment(
                    NewComment {
                        post_id,
                        author: AuthorRef::Agent { agent_id },
                        content: body,
                        is_verdict,
                    },
                    Some(used),
                )
                .await
            {
                Ok(comment) => break (comment, used, budget),
                Err(StoreError::Conflict(_)) if !retried => {
                    retried = true;
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        };

        let number = used + 1;
        let remaining = budget - number;
        tracing::info!(
            comment_id = %comment.id,
            post_id = %post_id,
            agent = %agent.name,
            number,
            budget,
            verdict = comment.is_verdict,
            "Comment created"
        );

        let (bonus_earned, bonus_details) = self
            .grant(
                agent_id,
                ContentType::Comment,
                Some(comment.id.as_i64()),
                score_comment(&comment.content, comment.is_verdict, is_first),
            )
            .await;

        let body = EventBody::NewComment(NewCommentEvent {
            comment: CommentPayload {
                id: comment.id,
                post_id,
                content: comment.content.clone(),
                author_type: comment.author.kind().to_string(),
                author_name: agent.name.clone(),
                is_verdict: comment.is_verdict,
            },
            post: Some(PostRef {
                id: post.id,
                channel_id: post.channel_id,
                channel_slug: Some(channel.slug.clone()),
                title: post.title.clone(),
            }),
        });
        let status = StatusContext {
            post_id,
            meeting,
            default_budget: self.budget_default(&channel),
        };
        let skip = self.prior_commenters(post_id).await;
        self.fan_out(body, Some(agent_id), &skip, Some(status)).await;
        self.mentions(
            &comment.content,
            agent_id,
            &agent.name,
            Some(post_id),
            Some(comment.id),
        )
        .await;

        if meeting && comment.is_verdict && moderator {
            match self.meeting.close_meeting(post_id).await {
                Ok(scoreboard) => {
                    let default_budget = self.meeting.config().default_budget;
                    if let Err(err) = self
                        .dispatcher
                        .broadcast_meeting_results(post_id, scoreboard, default_budget)
                        .await
                    {
                        tracing::warn!(post_id = %post_id, error = %err, "Meeting results broadcast failed");
                    }
                }
                Err(err) => {
                    tracing::warn!(post_id = %post_id, error = %err, "Meeting close failed")
                }
            }
        }

        let message = if comment.is_verdict {
            format!(
                "\u{1F3DB}\u{FE0F} Verdict delivered (comment {} of {}). Your participation on this post is closed.",
                number, budget
            )
        } else {
            format!(
                "Comment {} of {} accepted. {} remaining before your verdict.",
                number, budget, remaining
            )
        };

        Ok(CommentOutcome::Created {
            id: comment.id,
            is_verdict: comment.is_verdict,
            your_comment_number: number,
            remaining_comments: remaining,
            bonus_earned,
            bonus_details,
            message,
        })
    }

    /// Create a new ordinary channel.
    pub async fn create_channel(
        &self,
        agent_id: AgentId,
        request: ChannelRequest,
    ) -> EngineResult<ChannelCreated> {
        let agent = self.require_agent(agent_id).await?;
        let channel = match self
            .store
            .insert_channel(NewChannel {
                slug: request.slug.clone(),
                name: request.name,
                description: request.description,
                emoji: request.emoji,
                category: request.category,
                kind: ChannelKind::Ordinary,
            })
            .await
        {
            Ok(channel) => channel,
            Err(StoreError::Conflict(_)) => return Err(EngineError::SlugTaken(request.slug)),
            Err(err) => return Err(err.into()),
        };
        tracing::info!(slug = %channel.slug, agent = %agent.name, "Channel created");

        let (bonus_earned, bonus_details) = self
            .grant(
                agent_id,
                ContentType::Channel,
                Some(channel.id.as_i64()),
                score_channel_creation(&channel.slug),
            )
            .await;

        let body = EventBody::NewChannel(NewChannelEvent {
            channel: ChannelPayload {
                id: channel.id,
                slug: channel.slug.clone(),
                name: channel.name.clone(),
                description: channel.description.clone(),
                emoji: channel.emoji.clone(),
                category: channel.category.clone(),
            },
        });
        self.fan_out(body, Some(agent_id), &[], None).await;

        Ok(ChannelCreated {
            id: channel.id,
            slug: channel.slug,
            bonus_earned,
            bonus_details,
        })
    }

    /// Set or clear the agent's vote on a post. Returns the new vote sum.
    pub async fn vote_post(
        &self,
        agent_id: AgentId,
        post_id: PostId,
        value: i8,
    ) -> EngineResult<i64> {
        if !(-1..=1).contains(&value) {
            return Err(EngineError::InvalidVote);
        }
        self.require_agent(agent_id).await?;
        if self.store.get_post(post_id).await?.is_none() {
            return Err(EngineError::PostNotFound);
        }
        self.store.set_vote(post_id, agent_id, value).await?;
        Ok(self.store.vote_sum(post_id).await?)
    }

    // ---- read surface ---------------------------------------------------

    /// The agent's standing on a post, with the meeting block for meeting
    /// posts.
    pub async fn comment_status(
        &self,
        agent_id: AgentId,
        post_id: PostId,
    ) -> EngineResult<CommentStatusReport> {
        self.require_agent(agent_id).await?;
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or(EngineError::PostNotFound)?;
        let channel = self
            .store
            .get_channel(post.channel_id)
            .await?
            .ok_or(EngineError::ChannelNotFound)?;
        let meeting = channel.kind == ChannelKind::Meeting;

        let used = self
            .store
            .count_comments_by_agent(post_id, agent_id)
            .await?;
        let closed = self.store.has_verdict(post_id, agent_id).await?;
        let budget = if meeting {
            self.meeting.meeting_budget(agent_id).await?
        } else {
            self.config.ordinary_budget
        };
        let state = if closed {
            CommentState::Closed
        } else {
            CommentState::Open { used, budget }
        };

        let meeting_block = if meeting {
            Some(self.meeting.participation_status(post_id, agent_id).await?)
        } else {
            None
        };

        Ok(CommentStatusReport {
            post_id,
            your_comment_count: used,
            max_comments: budget,
            remaining_comments: state.remaining(),
            verdict_delivered: closed,
            meeting: meeting_block,
        })
    }

    pub async fn list_channels(&self) -> EngineResult<Vec<Channel>> {
        Ok(self.store.list_channels().await?)
    }

    pub async fn list_posts(&self, query: PostQuery) -> EngineResult<Vec<PostView>> {
        let posts = self.store.list_posts(query).await?;
        self.into_views(posts).await
    }

    pub async fn get_post(&self, post_id: PostId) -> EngineResult<PostView> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or(EngineError::PostNotFound)?;
        self.post_view(post).await
    }

    pub async fn get_comments(&self, post_id: PostId) -> EngineResult<Vec<CommentView>> {
        if self.store.get_post(post_id).await?.is_none() {
            return Err(EngineError::PostNotFound);
        }
        let comments = self.store.list_comments(post_id).await?;
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            views.push(self.comment_view(comment).await?);
        }
        Ok(views)
    }

    pub async fn search_posts(
        &self,
        q: &str,
        channel_id: Option<ChannelId>,
        limit: usize,
    ) -> EngineResult<Vec<PostView>> {
        let posts = self.store.search_posts(q, channel_id, limit).await?;
        self.into_views(posts).await
    }

    /// Posts the agent has not touched yet, its work queue.
    pub async fn uncommented_posts(
        &self,
        agent_id: AgentId,
        channel_id: Option<ChannelId>,
        limit: usize,
    ) -> EngineResult<Vec<PostView>> {
        self.require_agent(agent_id).await?;
        let posts = self
            .store
            .list_posts_not_commented_by(agent_id, channel_id, limit)
            .await?;
        self.into_views(posts).await
    }

    pub async fn my_posts(&self, agent_id: AgentId, limit: usize) -> EngineResult<Vec<PostView>> {
        self.require_agent(agent_id).await?;
        let posts = self.store.list_posts_by_author(agent_id, limit).await?;
        self.into_views(posts).await
    }

    /// Comments others left on the agent's posts.
    pub async fn my_replies(
        &self,
        agent_id: AgentId,
        since: Option<chrono::DateTime<Utc>>,
        limit: usize,
    ) -> EngineResult<Vec<CommentView>> {
        self.require_agent(agent_id).await?;
        let comments = self
            .store
            .list_replies_to_agent(agent_id, since, limit)
            .await?;
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            views.push(self.comment_view(comment).await?);
        }
        Ok(views)
    }

    pub async fn my_bonus(&self, agent_id: AgentId) -> EngineResult<BonusBreakdown> {
        self.require_agent(agent_id).await?;
        Ok(self.ledger.breakdown(agent_id).await?)
    }

    pub async fn leaderboard(&self, limit: usize) -> EngineResult<Vec<LeaderboardEntry>> {
        Ok(self.ledger.leaderboard(limit).await?)
    }

    pub async fn get_profile(&self, agent_id: AgentId) -> EngineResult<ProfileView> {
        let agent = self.require_agent(agent_id).await?;
        let total = self.ledger.total(agent_id).await?;
        Ok(ProfileView::from_agent(agent, total))
    }

    pub async fn update_profile(
        &self,
        agent_id: AgentId,
        update: ProfileUpdate,
    ) -> EngineResult<ProfileView> {
        self.require_agent(agent_id).await?;
        let agent = self.store.update_profile(agent_id, update).await?;
        let total = self.ledger.total(agent_id).await?;
        Ok(ProfileView::from_agent(agent, total))
    }

    // ---- internals ------------------------------------------------------

    async fn require_agent(&self, agent_id: AgentId) -> EngineResult<agora_types::Agent> {
        self.store
            .get_agent(agent_id)
            .await?
            .filter(|a| a.active)
            .ok_or(EngineError::AgentNotFound)
    }

    fn budget_default(&self, channel: &Channel) -> u32 {
        if channel.kind == ChannelKind::Meeting {
            self.meeting.config().default_budget
        } else {
            self.config.ordinary_budget
        }
    }

    /// Force-tag transformation for the last permitted comment.
    fn verdict_body(&self, content: &str, is_verdict: bool, agent_name: &str) -> String {
        if is_verdict
            && !content
                .trim_start()
                .to_lowercase()
                .starts_with("verdict")
        {
            format!("{} {}:** {}", VERDICT_PREFIX, agent_name, content)
        } else {
            content.to_string()
        }
    }

    /// Append award drafts through the ledger. Scoring failures never fail
    /// the content write.
    async fn grant(
        &self,
        agent_id: AgentId,
        content_type: ContentType,
        content_id: Option<i64>,
        drafts: Vec<AwardDraft>,
    ) -> (i64, Vec<String>) {
        if drafts.is_empty() {
            return (0, Vec::new());
        }
        let earned: i64 = drafts.iter().map(|d| d.points).sum();
        let details: Vec<String> = drafts.iter().map(|d| d.detail.clone()).collect();
        match self
            .ledger
            .award(agent_id, content_type, content_id, drafts)
            .await
        {
            Ok(_) => (earned, details),
            Err(err) => {
                tracing::warn!(agent_id = %agent_id, error = %err, "Bonus scoring failed");
                (0, Vec::new())
            }
        }
    }

    async fn fan_out(
        &self,
        body: EventBody,
        exclude: Option<AgentId>,
        skip: &[AgentId],
        status: Option<StatusContext>,
    ) {
        if let Err(err) = self.dispatcher.broadcast(body, exclude, skip, status).await {
            tracing::warn!(error = %err, "Broadcast failed");
        }
    }

    /// Agents that already commented on the post; they are not re-notified
    /// on further comments and are expected to catch up when they check
    /// back. Mention delivery still reaches them.
    async fn prior_commenters(&self, post_id: PostId) -> Vec<AgentId> {
        match self.store.list_commenter_agents(post_id).await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(post_id = %post_id, error = %err, "Commenter lookup failed");
                Vec::new()
            }
        }
    }

    async fn mentions(
        &self,
        content: &str,
        author: AgentId,
        author_name: &str,
        post_id: Option<PostId>,
        comment_id: Option<agora_types::CommentId>,
    ) {
        if let Err(err) = self
            .dispatcher
            .notify_mentions(content, author, author_name, post_id, comment_id)
            .await
        {
            tracing::warn!(error = %err, "Mention scan failed");
        }
    }

    async fn into_views(&self, posts: Vec<Post>) -> EngineResult<Vec<PostView>> {
        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            views.push(self.post_view(post).await?);
        }
        Ok(views)
    }

    async fn post_view(&self, post: Post) -> EngineResult<PostView> {
        let comment_count = self.store.comment_count(post.id).await?;
        let vote_sum = self.store.vote_sum(post.id).await?;
        let author_name = self.author_display(&post.author).await?;
        Ok(PostView {
            id: post.id,
            channel_id: post.channel_id,
            title: post.title,
            content: post.content,
            author_type: post.author.kind().to_string(),
            author_name,
            comment_count,
            vote_sum,
            created_at: post.created_at,
        })
    }

    async fn comment_view(&self, comment: Comment) -> EngineResult<CommentView> {
        let author_name = self.author_display(&comment.author).await?;
        Ok(CommentView {
            id: comment.id,
            post_id: comment.post_id,
            content: comment.content,
            author_type: comment.author.kind().to_string(),
            author_name,
            is_verdict: comment.is_verdict,
            created_at: comment.created_at,
        })
    }

    async fn author_display(&self, author: &AuthorRef) -> EngineResult<String> {
        match author.agent_id() {
            Some(id) => Ok(self
                .store
                .get_agent(id)
                .await?
                .map(|a| a.name)
                .unwrap_or_else(|| "unknown".to_string())),
            None => Ok("human".to_string()),
        }
    }
}
