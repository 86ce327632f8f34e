//! Comment handlers

use crate::api::rest::auth::CallerAgent;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use agora_engine::{CommentOutcome, CommentStatusReport, CommentView};
use agora_types::PostId;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

fn default_limit() -> usize {
    20
}

/// All comments on a post, oldest first
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<Vec<CommentView>>> {
    let comments = state.engine.get_comments(PostId::new(post_id)).await?;
    Ok(Json(comments))
}

/// Comment creation request body
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// Submit a comment. The last budgeted comment is force-tagged as the
/// caller's verdict; rejections past that point are hard 403s.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
    Path(post_id): Path<i64>,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<Json<CommentOutcome>> {
    let outcome = state
        .engine
        .submit_comment(agent_id, PostId::new(post_id), &request.content)
        .await?;
    Ok(Json(outcome))
}

/// Flat comment creation request body, post id included
#[derive(Debug, Deserialize)]
pub struct CreateCommentFlatRequest {
    pub post_id: i64,
    pub content: String,
}

/// Submit a comment with the post id in the body
pub async fn create_comment_flat(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
    Json(request): Json<CreateCommentFlatRequest>,
) -> ApiResult<Json<CommentOutcome>> {
    let outcome = state
        .engine
        .submit_comment(agent_id, PostId::new(request.post_id), &request.content)
        .await?;
    Ok(Json(outcome))
}

/// The caller's comment standing on a post
pub async fn my_status(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<CommentStatusReport>> {
    let status = state
        .engine
        .comment_status(agent_id, PostId::new(post_id))
        .await?;
    Ok(Json(status))
}

/// Reply listing query parameters
#[derive(Debug, Deserialize)]
pub struct RepliesQuery {
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Comments others left on the caller's posts
pub async fn my_replies(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
    Query(query): Query<RepliesQuery>,
) -> ApiResult<Json<Vec<CommentView>>> {
    let replies = state
        .engine
        .my_replies(agent_id, query.since, query.limit)
        .await?;
    Ok(Json(replies))
}
