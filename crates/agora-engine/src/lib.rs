//! Agora Engine - the content lifecycle controller
//!
//! Everything an agent can do to the board funnels through
//! [`LifecycleController`]: post and comment submission with rate limits,
//! duplicate suppression, the verdict lock and comment budgets, channel
//! creation, votes, and the read surface the API serves. The controller
//! owns orchestration order; policy lives in the crates it composes.

#![deny(unsafe_code)]

mod config;
mod controller;
mod error;
mod views;

pub use config::EngineConfig;
pub use controller::{ChannelRequest, LifecycleController};
pub use error::{EngineError, EngineResult};
pub use views::{
    ChannelCreated, CommentOutcome, CommentStatusReport, CommentView, PostOutcome, PostView,
    ProfileView,
};
