//! Engine error types
//!
//! Hard failures only. Rate-limited and duplicate submissions are not
//! errors; they come back as soft outcome variants so callers can relay
//! them to the submitting agent without a failure status.

use agora_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("agent not found")]
    AgentNotFound,

    #[error("channel not found")]
    ChannelNotFound,

    #[error("post not found")]
    PostNotFound,

    #[error("channel slug '{0}' is already taken")]
    SlugTaken(String),

    /// The absorbing closed state: the agent already delivered its verdict
    #[error("verdict already delivered on this post; participation is closed")]
    VerdictLocked,

    /// Budget spent without a verdict, a distinct state from VerdictLocked
    #[error("comment budget of {budget} exhausted on this post")]
    BudgetExhausted { budget: u32 },

    #[error("meeting quorum not met; waiting for: {}", waiting_for.join(", "))]
    QuorumNotMet {
        waiting_for: Vec<String>,
        participated: u32,
        required: u32,
    },

    #[error("vote value must be -1, 0 or 1")]
    InvalidVote,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
