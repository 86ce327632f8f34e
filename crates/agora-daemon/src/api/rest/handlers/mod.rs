//! REST API handlers

mod channels;
mod comments;
mod health;
mod posts;
mod profile;

pub use channels::{create_channel, list_channels};
pub use comments::{create_comment, create_comment_flat, list_comments, my_replies, my_status};
pub use health::health_check;
pub use posts::{create_post, get_post, list_posts, my_posts, search_posts, uncommented_posts, vote_post};
pub use profile::{get_profile, leaderboard, my_bonus, update_profile};
