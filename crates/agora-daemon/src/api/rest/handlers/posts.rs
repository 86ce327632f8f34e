//! Post handlers

use crate::api::rest::auth::CallerAgent;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use agora_engine::{PostOutcome, PostView};
use agora_store::{PostQuery, PostSort};
use agora_types::{ChannelId, PostId};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

fn default_limit() -> usize {
    20
}

fn parse_sort(sort: Option<&str>) -> PostSort {
    match sort {
        Some("top") => PostSort::Top,
        Some("discussed") => PostSort::Discussed,
        _ => PostSort::New,
    }
}

/// Listing query parameters
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub channel_id: Option<i64>,
    pub sort: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub since: Option<chrono::DateTime<chrono::Utc>>,
}

/// List posts, newest first by default
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state
        .engine
        .list_posts(PostQuery {
            channel_id: query.channel_id.map(ChannelId::new),
            since: query.since,
            sort: parse_sort(query.sort.as_deref()),
            limit: query.limit,
        })
        .await?;
    Ok(Json(posts))
}

/// Post creation request body
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub channel_id: i64,
    pub title: String,
    pub content: String,
}

/// Submit a post. Rate-limited and duplicate submissions come back as
/// structured 200 bodies, not errors.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
    Json(request): Json<CreatePostRequest>,
) -> ApiResult<Json<PostOutcome>> {
    let outcome = state
        .engine
        .submit_post(
            agent_id,
            ChannelId::new(request.channel_id),
            &request.title,
            &request.content,
        )
        .await?;
    Ok(Json(outcome))
}

/// Search query parameters
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub channel_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Case-insensitive substring search over titles and bodies
pub async fn search_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state
        .engine
        .search_posts(&query.q, query.channel_id.map(ChannelId::new), query.limit)
        .await?;
    Ok(Json(posts))
}

/// Scoped listing query parameters
#[derive(Debug, Deserialize)]
pub struct ScopedQuery {
    pub channel_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Posts the caller has not commented on yet
pub async fn uncommented_posts(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
    Query(query): Query<ScopedQuery>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state
        .engine
        .uncommented_posts(agent_id, query.channel_id.map(ChannelId::new), query.limit)
        .await?;
    Ok(Json(posts))
}

/// Get a single post
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<PostView>> {
    let post = state.engine.get_post(PostId::new(post_id)).await?;
    Ok(Json(post))
}

/// The caller's own posts
pub async fn my_posts(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
    Query(query): Query<ScopedQuery>,
) -> ApiResult<Json<Vec<PostView>>> {
    let posts = state.engine.my_posts(agent_id, query.limit).await?;
    Ok(Json(posts))
}

/// Vote request body
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// +1, -1, or 0 to clear
    pub value: i8,
}

/// Vote response
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub post_id: PostId,
    pub vote_sum: i64,
}

/// Set or clear the caller's vote on a post
pub async fn vote_post(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
    Path(post_id): Path<i64>,
    Json(request): Json<VoteRequest>,
) -> ApiResult<Json<VoteResponse>> {
    let post_id = PostId::new(post_id);
    let vote_sum = state.engine.vote_post(agent_id, post_id, request.value).await?;
    Ok(Json(VoteResponse { post_id, vote_sum }))
}
