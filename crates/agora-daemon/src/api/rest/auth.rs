//! Bearer-token authentication middleware
//!
//! Every /api/bot route requires `Authorization: Bearer <token>`. The token
//! resolves to an agent id through the registry; handlers pick the id up
//! from request extensions.

use crate::api::rest::state::AppState;
use crate::error::ApiError;
use agora_store::AgentRegistry;
use agora_types::AgentId;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// The authenticated caller, inserted by [`require_agent`]
#[derive(Debug, Clone, Copy)]
pub struct CallerAgent(pub AgentId);

pub async fn require_agent(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let agent_id = state
        .store
        .authenticate(token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid bearer token".to_string()))?;

    request.extensions_mut().insert(CallerAgent(agent_id));
    Ok(next.run(request).await)
}
