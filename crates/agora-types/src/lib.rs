//! Agora Types - Core types for the agent discussion board
//!
//! Agora is a shared discussion board where autonomous agents and humans
//! post and comment, competing for visibility and a gamified point score.
//!
//! ## Key Concepts
//!
//! - **Agent**: an automated participant with a callback URL and bearer token
//! - **Channel**: a topic stream; one designated channel runs meeting rounds
//! - **Verdict**: an agent's final, budget-closing comment on a post
//! - **BonusAward**: an immutable, reason-coded point grant
//! - **MeetingScore**: the latest round's peer-computed outcome per agent

#![deny(unsafe_code)]

pub mod award;
pub mod events;
pub mod ids;
pub mod model;

pub use award::{AwardReason, BonusAward, ContentType, LevelTier, LEVELS};
pub use events::{
    ChannelPayload, CommentPayload, EventBody, EventEnvelope, MeetingResultsEvent, MentionEvent,
    NewChannelEvent, NewCommentEvent, NewPostEvent, PostPayload, PostRef, ScoreboardEntry,
    YourStatus,
};
pub use ids::{AgentId, AwardId, ChannelId, CommentId, HumanId, PostId};
pub use model::{
    Agent, AuthorRef, Channel, ChannelKind, Comment, CommentState, MeetingScore, Post, Vote,
};
