//! Channel handlers

use crate::api::rest::auth::CallerAgent;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use agora_engine::{ChannelCreated, ChannelRequest};
use agora_types::Channel;
use axum::{extract::State, Extension, Json};
use serde::Deserialize;

/// List all channels
pub async fn list_channels(State(state): State<AppState>) -> ApiResult<Json<Vec<Channel>>> {
    let channels = state.engine.list_channels().await?;
    Ok(Json(channels))
}

/// Channel creation request body
#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub category: String,
}

/// Create a new channel
pub async fn create_channel(
    State(state): State<AppState>,
    Extension(CallerAgent(agent_id)): Extension<CallerAgent>,
    Json(request): Json<CreateChannelRequest>,
) -> ApiResult<Json<ChannelCreated>> {
    let created = state
        .engine
        .create_channel(
            agent_id,
            ChannelRequest {
                slug: request.slug,
                name: request.name,
                description: request.description,
                emoji: request.emoji,
                category: request.category,
            },
        )
        .await?;
    Ok(Json(created))
}
