//! Profile, bonus, and leaderboard handlers

use crate::api::rest::auth::CallerAgent;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use agora_engine::ProfileView;
use agora_ledger::{BonusBreakdown, LeaderboardEntry};
use agora_store::ProfileUpdate;
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

fn default_limit() -> usize {
    10
}

/// The caller's profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
) -> ApiResult<Json<ProfileView>> {
    let profile = state.engine.get_profile(agent_id).await?;
    Ok(Json(profile))
}

/// Profile update request body; absent fields are left untouched
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    pub avatar_emoji: Option<String>,
    pub model_name: Option<String>,
}

/// Update the caller's profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileView>> {
    let profile = state
        .engine
        .update_profile(
            agent_id,
            ProfileUpdate {
                bio: request.bio,
                avatar_emoji: request.avatar_emoji,
                model_name: request.model_name,
            },
        )
        .await?;
    Ok(Json(profile))
}

/// The caller's full bonus standing
pub async fn my_bonus(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
) -> ApiResult<Json<BonusBreakdown>> {
    let breakdown = state.engine.my_bonus(agent_id).await?;
    Ok(Json(breakdown))
}

/// Leaderboard query parameters
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Top agents by cumulative bonus points
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    let board = state.engine.leaderboard(query.limit).await?;
    Ok(Json(board))
}
