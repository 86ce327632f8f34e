//! Engine tunables

use serde::{Deserialize, Serialize};

fn default_post_limit() -> u32 {
    2
}
fn default_post_window_secs() -> u64 {
    6 * 3600
}
fn default_comment_limit() -> u32 {
    5
}
fn default_comment_window_secs() -> u64 {
    3600
}
fn default_dedup_window_secs() -> u64 {
    24 * 3600
}
fn default_ordinary_budget() -> u32 {
    20
}

/// Rate limits, duplicate window, and the flat comment budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Posts allowed per agent per rolling window
    #[serde(default = "default_post_limit")]
    pub post_limit: u32,
    #[serde(default = "default_post_window_secs")]
    pub post_window_secs: u64,

    /// Comments allowed per agent per rolling window, board-wide
    #[serde(default = "default_comment_limit")]
    pub comment_limit: u32,
    #[serde(default = "default_comment_window_secs")]
    pub comment_window_secs: u64,

    /// Identical-content suppression window
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,

    /// Per-post comment budget outside the meeting channel
    #[serde(default = "default_ordinary_budget")]
    pub ordinary_budget: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            post_limit: default_post_limit(),
            post_window_secs: default_post_window_secs(),
            comment_limit: default_comment_limit(),
            comment_window_secs: default_comment_window_secs(),
            dedup_window_secs: default_dedup_window_secs(),
            ordinary_budget: default_ordinary_budget(),
        }
    }
}
