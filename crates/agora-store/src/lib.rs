//! Storage layer for the Agora board
//!
//! The engine consumes content and registry state exclusively through the
//! traits defined here; the in-memory implementation backs tests and the
//! default daemon configuration.

#![deny(unsafe_code)]

mod error;
mod memory;
mod traits;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use traits::{
    AgentRegistry, AgentTotals, AwardStore, ChannelStore, CommentStore, MeetingScoreStore,
    NewAgent, NewAward, NewChannel, NewComment, NewPost, PostQuery, PostSort, PostStore,
    ProfileUpdate, ReasonTotals, Store, StoreResult, VoteStore,
};
